use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use portfolio_watermark::{
    watermark_build_output, Position, Rgb, RunReport, WatermarkConfig, Watermarker,
};

#[derive(Parser)]
#[command(
    name = "portfolio-watermark",
    about = "Stamp an outlined signature onto the images of a finished site build",
    version,
    after_help = "Run once per build: images are stamped in place, and a second run\n\
                  stamps them again. Exits 0 even when files fail unless --strict is given."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Build output directory (e.g. dist)
    output_dir: PathBuf,

    /// TOML config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Signature glyph PNG (opaque strokes on transparent background)
    #[arg(long)]
    glyph: Option<PathBuf>,

    /// Asset subdirectory of the output to process
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Stamp width as a fraction of image width (0-1]
    #[arg(long)]
    scale: Option<f32>,

    /// Stamp opacity [0-1]
    #[arg(long)]
    opacity: Option<f32>,

    /// Padding from the corner in pixels
    #[arg(long)]
    padding: Option<u32>,

    /// Corner: bottom-right, bottom-left, top-right or top-left
    #[arg(long)]
    position: Option<Position>,

    /// Skip images narrower than this
    #[arg(long)]
    min_width: Option<u32>,

    /// Outline thickness in pixels
    #[arg(long)]
    border_width: Option<u32>,

    /// Outline color, r,g,b or #rrggbb
    #[arg(long)]
    border_color: Option<Rgb>,

    /// Stroke color, r,g,b or #rrggbb
    #[arg(long)]
    fill_color: Option<Rgb>,

    /// File extension to process (repeatable; replaces the configured set)
    #[arg(short = 'e', long = "extension")]
    extensions: Vec<String>,

    /// JPEG re-encode quality (1-100)
    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// Process images on all cores
    #[arg(long)]
    parallel: bool,

    /// Exit 1 if the run was skipped or any file failed
    #[arg(long)]
    strict: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn resolve_config(&self) -> portfolio_watermark::Result<WatermarkConfig> {
        let mut config = match &self.config {
            Some(path) => WatermarkConfig::load(path)?,
            None => WatermarkConfig::default(),
        };

        if let Some(glyph) = &self.glyph {
            config.watermark_path.clone_from(glyph);
        }
        if let Some(dir) = &self.assets_dir {
            config.assets_dir.clone_from(dir);
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }
        if let Some(opacity) = self.opacity {
            config.opacity = opacity;
        }
        if let Some(padding) = self.padding {
            config.padding = padding;
        }
        if let Some(position) = self.position {
            config.position = position;
        }
        if let Some(min_width) = self.min_width {
            config.min_width = min_width;
        }
        if let Some(border_width) = self.border_width {
            config.border_width = border_width;
        }
        if let Some(color) = self.border_color {
            config.border_color = color;
        }
        if let Some(color) = self.fill_color {
            config.fill_color = color;
        }
        if !self.extensions.is_empty() {
            config.extensions.clone_from(&self.extensions);
        }
        if let Some(quality) = self.jpeg_quality {
            config.jpeg_quality = quality;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("portfolio_watermark={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_parallel(cli: &Cli, config: WatermarkConfig) -> RunReport {
    match Watermarker::new(config) {
        Ok(watermarker) => watermarker.run_parallel(&cli.output_dir),
        Err(e) => {
            warn!("Watermark not available ({e}), skipping");
            RunReport::aborted(e.to_string())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose && cli.quiet {
        eprintln!("Error: Cannot specify both --verbose and --quiet");
        process::exit(1);
    }

    init_logging(cli.verbose, cli.quiet);

    let config = match cli.resolve_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if !cli.output_dir.is_dir() {
        eprintln!(
            "Error: Output directory does not exist: {}",
            cli.output_dir.display()
        );
        process::exit(1);
    }

    let report = if cli.parallel {
        run_parallel(&cli, config)
    } else {
        watermark_build_output(&cli.output_dir, &config)
    };

    if cli.strict && !report.is_clean() {
        process::exit(1);
    }
}
