// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};

use linewise::app_config::{ConcurrencyMode, Config, FailurePolicy, LogLevel};
use linewise::context::SceneContext;
use linewise::prompts::PromptFormatter;
use linewise::providers::openai::OpenAiProvider;
use linewise::session::TranslationSession;
use linewise::subtitle::SubtitleTrack;

/// CLI wrapper for FailurePolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliFailurePolicy {
    Skip,
    Abort,
}

impl From<CliFailurePolicy> for FailurePolicy {
    fn from(cli_policy: CliFailurePolicy) -> Self {
        match cli_policy {
            CliFailurePolicy::Skip => FailurePolicy::Skip,
            CliFailurePolicy::Abort => FailurePolicy::AbortSession,
        }
    }
}

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// linewise - line-aligned batch subtitle translation
///
/// Translates an SRT subtitle file batch by batch through an
/// OpenAI-compatible endpoint, keeping every translation on the line it
/// belongs to.
#[derive(Parser, Debug)]
#[command(name = "linewise")]
#[command(version = "0.3.0")]
#[command(about = "Line-aligned batch subtitle translation")]
struct CommandLineOptions {
    /// Input subtitle file (SRT)
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Output subtitle file (defaults to <input>.<target>.srt)
    #[arg(short, long)]
    output_path: Option<PathBuf>,

    /// Source language name or code
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language name or code
    #[arg(short, long)]
    target_language: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// API key for the provider
    #[arg(short = 'k', long, env = "LINEWISE_API_KEY")]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Maximum lines per batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Maximum attempts per batch before it is marked failed
    #[arg(short = 'a', long)]
    max_attempts: Option<u32>,

    /// Timeout for a single provider call, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Policy when a batch exhausts its attempts
    #[arg(short = 'p', long, value_enum)]
    on_failure: Option<CliFailurePolicy>,

    /// Translate batches concurrently against a context snapshot
    #[arg(long)]
    pool_size: Option<usize>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
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
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {}\x1B[0m", color, now, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // The level is updated after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(cli_level) = &cli.log_level {
        log::set_max_level(level_filter(&cli_level.clone().into()));
    }

    // Load or create configuration
    let config_path = Path::new(&cli.config_path);
    let mut config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        warn!(
            "Config file not found at '{}', creating default config.",
            cli.config_path
        );
        let config = Config::default();
        config.save(config_path)?;
        config
    };

    // Override config with CLI options if provided
    if let Some(source_language) = &cli.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &cli.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(model) = &cli.model {
        config.provider.model = model.clone();
    }
    if let Some(api_key) = &cli.api_key {
        config.provider.api_key = api_key.clone();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.provider.endpoint = endpoint.clone();
    }
    if let Some(batch_size) = cli.batch_size {
        config.engine.max_batch_size = batch_size;
    }
    if let Some(max_attempts) = cli.max_attempts {
        config.engine.max_attempts_per_batch = max_attempts;
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        config.engine.attempt_timeout_secs = timeout_secs;
    }
    if let Some(policy) = &cli.on_failure {
        config.engine.on_batch_failure = policy.clone().into();
    }
    if let Some(pool_size) = cli.pool_size {
        config.engine.concurrency = ConcurrencyMode::PooledSnapshot { pool_size };
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    if cli.log_level.is_none() {
        log::set_max_level(level_filter(&config.log_level));
    }

    run_translate(&cli, config).await
}

async fn run_translate(cli: &CommandLineOptions, config: Config) -> Result<()> {
    if !cli.input_path.is_file() {
        return Err(anyhow!("Input path does not exist: {:?}", cli.input_path));
    }

    let track = SubtitleTrack::load_srt(&cli.input_path)?;
    if track.is_empty() {
        warn!("No subtitle lines found in {:?}", cli.input_path);
        return Ok(());
    }
    info!(
        "Translating {:?} from {} to {} ({} lines)",
        cli.input_path,
        config.source_language,
        config.target_language,
        track.len()
    );

    let provider = OpenAiProvider::with_retry_config(
        config.provider.api_key.clone(),
        config.provider.endpoint.clone(),
        config.provider.model.clone(),
        config.provider.retry_count,
        config.provider.retry_backoff_ms,
    )
    .temperature(config.provider.temperature);

    let formatter = PromptFormatter::new(&config.source_language, &config.target_language);
    let session = TranslationSession::new(Arc::new(provider), formatter, config.engine.clone());

    let total_batches = track.len().div_ceil(config.engine.max_batch_size.max(1));
    let progress_bar = ProgressBar::new(total_batches as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} batches ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );

    let bar = progress_bar.clone();
    let result = session
        .translate(&track, SceneContext::default(), move |done, _total| {
            bar.set_position(done as u64);
        })
        .await;
    progress_bar.finish_and_clear();

    let session_result = match result {
        Ok(session_result) => session_result,
        Err(error) => {
            return Err(anyhow!("Translation session failed: {}", error));
        }
    };

    let failed = session_result.failed_ordinals();
    if !failed.is_empty() {
        warn!(
            "{} of {} batches failed; their lines keep the original text",
            failed.len(),
            session_result.batches.len()
        );
        for error in session_result.batches.iter().filter_map(|report| report.to_error()) {
            warn!("{}", error);
        }
    }

    // Failed or skipped lines fall back to the original text
    let translated = SubtitleTrack::from_lines(
        session_result
            .lines
            .into_iter()
            .map(|line_result| {
                let mut line = line_result.line;
                if let Some(translation) = line_result.translation {
                    line.text = translation;
                }
                line
            })
            .collect(),
    );

    let output_path = cli.output_path.clone().unwrap_or_else(|| {
        let stem = cli
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        cli.input_path
            .with_file_name(format!("{}.{}.srt", stem, config.target_language.to_lowercase()))
    });
    translated.save_srt(&output_path)?;

    info!("Success: {:?}", output_path);
    Ok(())
}
