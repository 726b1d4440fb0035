use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};

use yuvmark::config::{
    DEFAULT_FACTOR, DEFAULT_GAUSSIAN_BARS, DEFAULT_GAUSSIAN_INF, DEFAULT_GAUSSIAN_SUP, DEFAULT_LOW_LIMIT,
    DEFAULT_MEAN, DEFAULT_MODIFICATION_VALUE, DEFAULT_RANGE_END, DEFAULT_RANGE_INIT, DEFAULT_STD_DEVIATION,
    DEFAULT_UPPER_LIMIT,
};
use yuvmark::modifier::distribution::DiscreteFactoredGaussian;
use yuvmark::pipeline::{self, PlaneDiff};
use yuvmark::stream::{self, StreamReader};
use yuvmark::{ComparisonPlayer, Components, ModStep, ModType, ModificationSettings, WatermarkConfig};

/// yuvmark: embed DCT-domain watermarks into raw YUV video streams.
#[derive(Parser)]
#[command(name = "yuvmark", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModTypeArg {
    Absolute,
    Percentage,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModStepArg {
    Incremental,
    Uniform,
    Random,
}

impl From<ModTypeArg> for ModType {
    fn from(arg: ModTypeArg) -> Self {
        match arg {
            ModTypeArg::Absolute => ModType::Absolute,
            ModTypeArg::Percentage => ModType::Percentage,
        }
    }
}

impl From<ModStepArg> for ModStep {
    fn from(arg: ModStepArg) -> Self {
        match arg {
            ModStepArg::Incremental => ModStep::Incremental,
            ModStepArg::Uniform => ModStep::Uniform,
            ModStepArg::Random => ModStep::Random,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Watermark a raw YUV stream
    Watermark {
        /// Source stream path (.yuv)
        #[arg(short, long)]
        input: PathBuf,

        /// Watermarked output path
        #[arg(short, long)]
        output: PathBuf,

        /// First zigzag coefficient to modify (1-63)
        #[arg(long, default_value_t = DEFAULT_RANGE_INIT)]
        range_init: u8,

        /// Last zigzag coefficient to modify (range-init..63)
        #[arg(long, default_value_t = DEFAULT_RANGE_END)]
        range_end: u8,

        #[arg(long, value_enum, default_value_t = ModTypeArg::Absolute)]
        mod_type: ModTypeArg,

        #[arg(long, value_enum, default_value_t = ModStepArg::Uniform)]
        mod_step: ModStepArg,

        /// Constant added to each coefficient (uniform step); a percentage with --mod-type percentage
        #[arg(long, default_value_t = DEFAULT_MODIFICATION_VALUE, allow_hyphen_values = true)]
        value: i32,

        /// First value of the incremental sequence
        #[arg(long, default_value_t = DEFAULT_LOW_LIMIT, allow_hyphen_values = true)]
        low_limit: i32,

        /// Last value of the incremental sequence
        #[arg(long, default_value_t = DEFAULT_UPPER_LIMIT, allow_hyphen_values = true)]
        upper_limit: i32,

        /// Gaussian standard deviation (random step)
        #[arg(long, default_value_t = DEFAULT_STD_DEVIATION)]
        std_deviation: f64,

        /// Gaussian mean (random step)
        #[arg(long, default_value_t = DEFAULT_MEAN, allow_hyphen_values = true)]
        mean: f64,

        /// Scale applied to the Gaussian density (random step)
        #[arg(long, default_value_t = DEFAULT_FACTOR, allow_hyphen_values = true)]
        factor: f64,

        /// Lower bound of the sampled interval (random step)
        #[arg(long, default_value_t = DEFAULT_GAUSSIAN_INF, allow_hyphen_values = true)]
        inf: i32,

        /// Upper bound of the sampled interval (random step)
        #[arg(long, default_value_t = DEFAULT_GAUSSIAN_SUP, allow_hyphen_values = true)]
        sup: i32,

        /// Number of discretization bars (random step)
        #[arg(long, default_value_t = DEFAULT_GAUSSIAN_BARS)]
        bars: u32,

        /// Watermark the Y plane (default when no plane is chosen)
        #[arg(long)]
        y: bool,

        /// Watermark the U plane
        #[arg(long)]
        u: bool,

        /// Watermark the V plane
        #[arg(long)]
        v: bool,

        /// Seed for the random step; omitted means a fresh seed per run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show a stream's geometry and layout
    Info {
        /// Stream path (.yuv)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write one frame of a source/watermarked pair as PPM images
    Preview {
        /// Source stream path
        #[arg(short, long)]
        source: PathBuf,

        /// Watermarked stream path
        #[arg(short, long)]
        watermarked: PathBuf,

        /// Frame index (0-based)
        #[arg(short, long, default_value_t = 0)]
        frame: u64,

        /// Directory for the PPM files
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Print per-plane differences between a source and its watermarked copy
    Compare {
        /// Source stream path
        #[arg(short, long)]
        source: PathBuf,

        /// Watermarked stream path
        #[arg(short, long)]
        watermarked: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watermark {
            input,
            output,
            range_init,
            range_end,
            mod_type,
            mod_step,
            value,
            low_limit,
            upper_limit,
            std_deviation,
            mean,
            factor,
            inf,
            sup,
            bars,
            y,
            u,
            v,
            seed,
        } => {
            warn_unless_yuv(&input);

            let mut settings = match ModStep::from(mod_step) {
                ModStep::Uniform => ModificationSettings::uniform(range_init, range_end, mod_type.into(), value),
                ModStep::Incremental => ModificationSettings::incremental(range_init, range_end, low_limit, upper_limit),
                ModStep::Random => {
                    let distribution = DiscreteFactoredGaussian::new(std_deviation, mean, factor, inf, sup, bars)
                        .context("invalid Gaussian parameters")?;
                    ModificationSettings::random(range_init, range_end, Arc::new(distribution))
                }
            };
            // unsupported type/step pairs are rejected by validation
            settings.mod_type = mod_type.into();

            let components = if y || u || v {
                Components { y, u, v }
            } else {
                Components::LUMA
            };

            let cfg = WatermarkConfig {
                settings,
                components,
                seed,
                progress: true,
            };

            let summary = pipeline::watermark_file(&input, &output, &cfg)
                .with_context(|| format!("failed to watermark {}", input.display()))?;
            info!(
                "wrote {} frames ({}x{} {}) to {}",
                summary.frames,
                summary.width,
                summary.height,
                summary.format,
                output.display()
            );
        }

        Commands::Info { input } => {
            warn_unless_yuv(&input);
            let reader = StreamReader::open(&input).with_context(|| format!("failed to open {}", input.display()))?;
            println!("header:       {}", reader.header().raw);
            println!("size:         {}x{}", reader.width(), reader.height());
            println!("format:       {}", reader.format());
            println!("frame length: {} bytes", reader.frame_length());
            println!("frames:       {}", reader.frame_count());
        }

        Commands::Preview {
            source,
            watermarked,
            frame,
            out_dir,
        } => {
            let mut player = ComparisonPlayer::open(&source, &watermarked).context("failed to open streams")?;
            let pair = player.get_frame(frame)?;
            let (Some(src), Some(wm)) = (pair.source, pair.watermarked) else {
                bail!("frame {frame} is past the end of the streams ({} frames)", player.frame_count());
            };

            std::fs::create_dir_all(&out_dir)?;
            let src_path = out_dir.join(format!("frame_{frame:05}_source.ppm"));
            let wm_path = out_dir.join(format!("frame_{frame:05}_watermarked.ppm"));
            std::fs::write(&src_path, src.to_ppm()).with_context(|| format!("failed to write {}", src_path.display()))?;
            std::fs::write(&wm_path, wm.to_ppm()).with_context(|| format!("failed to write {}", wm_path.display()))?;
            info!("wrote {} and {}", src_path.display(), wm_path.display());
        }

        Commands::Compare { source, watermarked } => {
            let report = pipeline::compare_streams(&source, &watermarked)?;
            println!("frames: {} ({})", report.frames, report.format);
            if report.header_mismatches > 0 {
                println!("frame headers differing: {}", report.header_mismatches);
            }
            for (name, diff) in [("Y", &report.y), ("U", &report.u), ("V", &report.v)] {
                print_plane(name, diff);
            }
        }
    }

    Ok(())
}

fn warn_unless_yuv(path: &Path) {
    if !stream::is_yuv_path(path) {
        warn!("{} does not look like a raw YUV stream", path.display());
    }
}

fn print_plane(name: &str, diff: &PlaneDiff) {
    let psnr = diff
        .psnr()
        .map_or_else(|| "inf".to_string(), |db| format!("{db:.2} dB"));
    println!(
        "{name}: {}/{} samples changed, max |diff| {}, PSNR {psnr}",
        diff.changed, diff.samples, diff.max_abs_diff
    );
}
