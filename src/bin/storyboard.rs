use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use storyboard_continuity::{
    AnalysisStatus, AppState, DecoderLogLevel, FrameSampler, GeminiProvider, Orchestrator,
    ProgressCallback, ProgressInfo, ProviderConfig, SamplerOptions, StateObserver, VideoDecoder,
    VideoInput, fetch, sample_async,
};
use tracing_subscriber::EnvFilter;

const CLI_AFTER_HELP: &str = "Examples:\n  storyboard analyze input.mp4 --prompts\n  storyboard analyze https://example.com/clip.webm --export-dir exports\n  storyboard sample input.mp4 --out frames\n  storyboard probe input.mov --json\n  storyboard completions zsh > _storyboard";

#[derive(Debug, Parser)]
#[command(
    name = "storyboard",
    version,
    about = "Sample a video and turn it into a continuity storyboard",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Allow overwriting existing output files.
    #[arg(long, global = true)]
    overwrite: bool,

    /// FFmpeg log level (quiet, error, warning, info, debug).
    #[arg(long, global = true)]
    decoder_log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full analysis of a video.
    #[command(
        about = "Analyze a video into a storyboard",
        after_help = "Examples:\n  storyboard analyze input.mp4 --prompts\n  storyboard analyze input.mp4 --json > result.json"
    )]
    Analyze {
        /// Input video path or URL.
        input: String,

        /// Print every segment prompt and bridge.
        #[arg(long)]
        prompts: bool,

        /// Write the JSON export into this directory.
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Print the full result as JSON on stdout.
        #[arg(long)]
        json: bool,

        /// Override the provider model.
        #[arg(long)]
        model: Option<String>,
    },

    /// Write the sampled frames to a directory.
    #[command(
        about = "Sample frames without analyzing",
        after_help = "Examples:\n  storyboard sample input.mp4 --out frames\n  storyboard sample input.mp4 --out frames --samples 40 --height 720"
    )]
    Sample {
        /// Input video path or URL.
        input: String,
        /// Output directory for the JPEG frames.
        #[arg(long)]
        out: PathBuf,
        /// Number of frames to sample.
        #[arg(long)]
        samples: Option<u32>,
        /// Output height cap in pixels.
        #[arg(long)]
        height: Option<u32>,
    },

    /// Print video metadata.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Probe {
        /// Input video path or URL.
        input: String,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "storyboard_continuity=debug,storyboard=debug"
    } else {
        "storyboard_continuity=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(global.verbose);

    if let Some(level) = &global.decoder_log_level {
        let parsed = DecoderLogLevel::parse(level)
            .ok_or(format!("unsupported --decoder-log-level: {level}"))?;
        storyboard_continuity::set_decoder_log_level(parsed);
    }

    Ok(())
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn status_label(status: AnalysisStatus) -> colored::ColoredString {
    let label = status.to_string();
    if status.is_busy() {
        return label.cyan().bold();
    }
    match status {
        AnalysisStatus::Completed => label.green().bold(),
        AnalysisStatus::Error => label.red().bold(),
        _ => label.normal(),
    }
}

/// Prints lifecycle changes and rotating status phrases to stderr.
struct TerminalObserver;

impl StateObserver for TerminalObserver {
    fn on_transition(&self, state: &AppState) {
        eprintln!("{} {}", "status".bold(), status_label(state.status()));
    }

    fn on_status_message(&self, message: &str) {
        eprintln!("  {}", message.dimmed());
    }
}

/// Drives an indicatif bar from sampler progress.
struct BarProgress {
    bar: ProgressBar,
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        if let Some(seconds) = info.current_timestamp {
            self.bar.set_message(format!("at {seconds:.1}s"));
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Analyze {
            input,
            prompts,
            export_dir,
            json,
            model,
        } => {
            let mut config = ProviderConfig::from_env()?;
            if let Some(model) = model {
                config = config.with_model(model);
            }
            if let Some(directory) = &export_dir {
                ensure_writable_path(
                    &directory.join(storyboard_continuity::EXPORT_FILE_NAME),
                    cli.global.overwrite,
                )?;
            }

            let mut orchestrator =
                Orchestrator::new(GeminiProvider::new(config)?).with_observer(Arc::new(TerminalObserver));
            let state = orchestrator.submit(VideoInput::parse(&input)).await?;

            let Some(result) = state.result() else {
                let message = state.error().unwrap_or("analysis failed").to_string();
                return Err(message.into());
            };

            if json {
                println!("{}", serde_json::to_string_pretty(result)?);
            } else {
                println!("{}", "Summary".bold());
                println!("{}", result.summary);
                println!();
                println!("{}", "Emotional arc".bold());
                println!("{}", result.emotional_arc);
                println!();
                println!(
                    "{} characters, {} segments",
                    result.characters.len(),
                    result.segments.len()
                );
                for character in &result.characters {
                    println!("  {} {}", character.id.cyan(), character.name);
                }
            }

            if prompts {
                let mut stdout = io::stdout().lock();
                writeln!(stdout)?;
                orchestrator.copy_all_prompts(&mut stdout)?;
                writeln!(stdout)?;
            }

            if let Some(directory) = export_dir {
                if let Some(path) = orchestrator.download_json(&directory)? {
                    eprintln!("{} {}", "wrote".green().bold(), path.display());
                }
            }
        }
        Commands::Sample {
            input,
            out,
            samples,
            height,
        } => {
            if out.exists() && !cli.global.overwrite {
                return Err(format!(
                    "output directory already exists: {} (use --overwrite)",
                    out.display()
                )
                .into());
            }
            fs::create_dir_all(&out)?;

            let bar = ProgressBar::new(0);
            let style = ProgressStyle::with_template(
                "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
            )?;
            bar.set_style(style.progress_chars("##-"));

            let mut options = SamplerOptions::new()
                .with_progress(Arc::new(BarProgress { bar: bar.clone() }))
                .with_batch_size(5);
            if let Some(samples) = samples {
                options = options.with_max_samples(samples);
            }
            if let Some(height) = height {
                options = options.with_target_height(height);
            }

            let video = fetch::resolve(&Client::new(), &VideoInput::parse(&input)).await?;
            let batch = sample_async(Arc::new(FrameSampler::new(options)), video).await?;
            bar.finish_and_clear();

            for frame in batch.frames() {
                let path = out.join(format!(
                    "frame_{:04}.{}",
                    frame.index(),
                    frame.media_type().extension()
                ));
                fs::write(&path, frame.image_bytes())?;
                if cli.global.verbose {
                    eprintln!(
                        "{} {} ({:.2}s, {}x{})",
                        "wrote".green(),
                        path.display(),
                        frame.timestamp(),
                        frame.width(),
                        frame.height()
                    );
                }
            }

            println!(
                "Sampled {} frames ({} KiB) every {:.2}s into {}",
                batch.len(),
                batch.payload_bytes() / 1024,
                batch.interval(),
                out.display()
            );
        }
        Commands::Probe { input, json } => {
            let video = fetch::resolve(&Client::new(), &VideoInput::parse(&input)).await?;
            let metadata = VideoDecoder::probe(&video)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:.3}s", metadata.duration_seconds);
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec,
                );
                if let Some(ratio) = metadata.aspect_ratio() {
                    println!("Aspect ratio: {ratio:.3}");
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "storyboard", &mut io::stdout());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
