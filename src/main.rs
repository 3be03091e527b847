// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::MultiProgress;
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use dubwai::app_config::{self, Config};
use dubwai::app_controller::Controller;
use dubwai::speech::VoiceCatalog;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dub a video from its subtitles (default command)
    Dub(DubArgs),

    /// Translate a subtitle file without dubbing
    Translate(TranslateArgs),

    /// List the voice used for each language
    Voices {
        /// Configuration file path
        #[arg(short, long = "config", default_value = "conf.json")]
        config_path: String,
    },

    /// Generate shell completions for dubwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by every command that loads a configuration
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long = "config", default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'km', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct DubArgs {
    /// Video name (file stem inside the input directory)
    #[arg(short = 'n', long, env = "VIDEO_NAME")]
    video_name: Option<String>,

    /// Directory holding the videos and source subtitles
    #[arg(long, env = "INPUT_DIR")]
    input_dir: Option<String>,

    /// Directory for every generated file
    #[arg(long, env = "OUTPUT_DIR")]
    output_dir: Option<String>,

    #[command(flatten)]
    common: CommonArgs,

    /// Require existing target subtitles instead of translating
    #[arg(long)]
    no_translate: bool,

    /// Mux the dubbed track into a copy of the video
    #[arg(long)]
    combine_video: bool,

    /// Burn the target subtitles into a copy of the video
    #[arg(long)]
    burn_subtitles: bool,

    /// Dub every video in the input directory
    #[arg(long)]
    all: bool,
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Subtitle file to translate
    #[arg(value_name = "INPUT_SRT")]
    input: PathBuf,

    /// Output file (default: <output_dir>/<name>_<target>.srt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

/// dubwai - subtitle-synchronized dubbing
///
/// Generates speech for every subtitle cue and assembles the clips into an
/// audio track that lines up with the original video.
#[derive(Parser, Debug)]
#[command(name = "dubwai")]
#[command(version)]
#[command(about = "Subtitle-synchronized AI dubbing")]
#[command(long_about = "dubwai turns a video's subtitles into a dubbed audio track.

For a video named N it reads <input_dir>/N.<ext> and N_<src>.srt, translates the
subtitles to N_<tgt>.srt when needed, synthesizes one clip per cue and writes the
merged track to <output_dir>/N.wav.

EXAMPLES:
    dubwai -n movie                         # Dub input/movie.mp4 with the default config
    VIDEO_NAME=movie dubwai                 # Same, name from the environment
    dubwai -n movie -t fr --combine-video   # Dub into French and mux into the video
    dubwai --all -f                         # Redo every video in the input directory
    dubwai translate movie_en.srt -t km     # Translate subtitles only
    dubwai voices                           # Show the voice for each language
    dubwai completions bash > dubwai.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    dub: DubArgs,
}

/// Log file every record is mirrored to, once configured
static LOG_FILE: OnceCell<Mutex<File>> = OnceCell::new();

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    /// Mirror every record to `path`, appending
    fn mirror_to(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        let _ = LOG_FILE.set(Mutex::new(file));
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = chrono::Local::now();
        let emoji = Self::get_emoji_for_level(record.level());
        let color = Self::get_color_for_level(record.level());

        let mut stderr = std::io::stderr();
        let _ = writeln!(
            stderr,
            "{}{} {} {}\x1B[0m",
            color,
            now.format("%H:%M:%S.%3f"),
            emoji,
            record.args()
        );

        if let Some(file) = LOG_FILE.get() {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(
                    file,
                    "[{}] {:<5} {}",
                    now.format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.args()
                );
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
        if let Some(file) = LOG_FILE.get() {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger with trace so the configured level can be
    // applied later through set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "dubwai", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Voices { config_path }) => list_voices(&config_path),
        Some(Commands::Translate(args)) => run_translate(args).await,
        Some(Commands::Dub(args)) => run_dub(args).await,
        None => run_dub(cli.dub).await,
    }
}

fn apply_log_level(level: &app_config::LogLevel) {
    log::set_max_level(level.to_level_filter());
}

/// Load the configuration, creating a default file when missing, and
/// apply the shared command line overrides
fn load_config(common: &CommonArgs) -> Result<Config> {
    if let Some(level) = &common.log_level {
        apply_log_level(&level.clone().into());
    }

    let config_path = Path::new(&common.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", common.config_path);
        let config = Config::default();
        config.save_to_file(config_path)?;
        config
    };

    if let Some(source_lang) = &common.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &common.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &common.log_level {
        config.log_level = log_level.clone().into();
    }

    apply_log_level(&config.log_level);
    if let Some(log_file) = &config.log_file {
        CustomLogger::mirror_to(Path::new(log_file))?;
    }

    Ok(config)
}

async fn run_dub(args: DubArgs) -> Result<()> {
    // Checked before anything touches the filesystem
    let video_name = args.video_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    if !args.all && video_name.is_none() {
        error!("No video name given: pass --video-name <NAME> or set VIDEO_NAME (or use --all)");
        return Err(anyhow!("missing video name"));
    }

    let mut config = load_config(&args.common)?;

    if let Some(input_dir) = &args.input_dir {
        config.input_dir = input_dir.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if args.no_translate {
        config.translation.enabled = false;
    }
    if args.combine_video {
        config.media.combine_video = true;
    }
    if args.burn_subtitles {
        config.media.burn_subtitles = true;
    }

    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    if args.all {
        return controller.run_folder(args.common.force_overwrite).await;
    }

    let name = video_name.ok_or_else(|| anyhow!("missing video name"))?;
    let report = controller.run(name, args.common.force_overwrite).await?;
    for output in &report.outputs {
        info!("Success: {}", output.display());
    }
    Ok(())
}

async fn run_translate(args: TranslateArgs) -> Result<()> {
    if !args.input.is_file() {
        return Err(anyhow!("Input file does not exist: {:?}", args.input));
    }

    let config = load_config(&args.common)?;
    config.validate().context("Configuration validation failed")?;

    let output = args.output.clone().unwrap_or_else(|| {
        Controller::translated_subtitle_path(&args.input, &config.target_language, &config.output_path())
    });

    let controller = Controller::with_config(config)?;
    controller
        .translate_subtitles(&args.input, &output, args.common.force_overwrite, &MultiProgress::new())
        .await
}

fn list_voices(config_path: &str) -> Result<()> {
    // Never creates a config file
    let config = if Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    let catalog = VoiceCatalog::new(&config.speech.voice, &config.speech.voices);
    let mut stdout = std::io::stdout();
    for (language, voice) in catalog.entries() {
        writeln!(stdout, "{:<6} {}", language, voice)?;
    }
    if !config.speech.voice.trim().is_empty() {
        writeln!(stdout, "\nConfigured voice '{}' overrides every language", config.speech.voice)?;
    }
    Ok(())
}
