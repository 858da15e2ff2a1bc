use crate::{
    generate_configs, ignored_keys, load_overrides, locate_config, resolve, user_config_path,
    ConfigError, Settings, ShredError, Shredder, DEFAULT_CONFIG,
};
use clap::Parser;
use serde_yaml::Value;
use std::{
    path::{Path, PathBuf},
    sync::{atomic::AtomicBool, Arc},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

pub const NO_CONFIG_MESSAGE: &str = "No shreddit configuration file was found or provided. \
                                     Run this script with -g to generate one.";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Command-line frontend to the shreddit library.",
    long_about = None
)]
pub struct Args {
    /// Config file to use instead of the default shreddit.yml
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Write shreddit and praw config files to current directory.
    #[arg(short, long)]
    pub generate_configs: bool,
    /// User section's name from praw.ini if not default
    #[arg(short, long, default_value = "default")]
    pub user: String,
    /// Ask for the `password` entry interactively instead of reading it from the file
    #[arg(long)]
    pub ask_pass: bool,
}

/// How a run ended, for the parts of it that map onto an exit code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    DomainFailure(String),
    Aborted,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::DomainFailure(_) | Self::Aborted => 1,
        }
    }

    /// Prints failures to stderr.
    pub fn report(&self) {
        match self {
            Self::Success => {}
            Self::DomainFailure(message) => eprintln!("Error - {message}"),
            Self::Aborted => eprintln!("Shreddit aborted by user"),
        }
    }
}

impl<T> From<Result<T, ShredError>> for RunOutcome {
    fn from(result: Result<T, ShredError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(ShredError::Aborted) => Self::Aborted,
            Err(err) => Self::DomainFailure(err.to_string()),
        }
    }
}

/// Logs shreddit's own events to stderr, at debug level when `verbose`. `RUST_LOG` overrides.
pub fn init_logging(verbose: bool) {
    let directive = if verbose { "shreddit=debug" } else { "shreddit=info" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(directive.parse().expect("invalid filter"))
                .from_env_lossy(),
        )
        .try_init();
}

/// Resolves the settings for a run: defaults, then the user's file, then `--ask-pass`.
pub fn resolve_settings(args: &Args, config_path: &Path) -> Result<Settings, ConfigError> {
    let overrides = load_overrides(config_path)?;
    let mut resolved = resolve(&DEFAULT_CONFIG, &overrides);
    if args.ask_pass {
        resolved.insert(Value::from("ask_pass"), Value::Bool(true));
    }
    let settings = Settings::from_mapping(&resolved)?;

    init_logging(settings.verbose);
    for key in ignored_keys(&DEFAULT_CONFIG, &overrides) {
        debug!(key = %key, "Ignoring unknown option");
    }
    info!(config = %config_path.display(), "Loaded configuration");
    Ok(settings)
}

/// Runs the command line. Config problems are returned as errors; everything that happens
/// once shredding starts is folded into the outcome.
pub fn run(
    args: &Args,
    working_dir: &Path,
    interrupted: Arc<AtomicBool>,
) -> Result<RunOutcome, ConfigError> {
    if args.generate_configs {
        generate_configs(working_dir)?;
        return Ok(RunOutcome::Success);
    }

    let config_path =
        locate_config(args.config.as_deref(), user_config_path().as_deref(), working_dir);
    if !config_path.is_file() {
        println!("{NO_CONFIG_MESSAGE}");
        return Ok(RunOutcome::Success);
    }

    let settings = resolve_settings(args, &config_path)?;
    let result = Shredder::connect(settings, &args.user, working_dir, interrupted)
        .and_then(|mut shredder| shredder.shred());
    Ok(RunOutcome::from(result))
}
