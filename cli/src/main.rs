use clap::Parser;
use modlink_cli::commands::{cli, use_modules};
use modlink_core::config::LoggingConfig;
use modlink_core::error;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let args = cli::Args::parse();
    let cfg =
        modlink_core::config::load_default().map_err(|e| error::CliError::Config(e.to_string()))?;
    init_tracing(&cfg.logging)?;

    match args.command {
        cli::Commands::Use(use_args) => use_modules::run_use(use_args, &cfg).await,
    }
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 11: config error
    // 30: modules failed to resolve
    // 50: internal/uncategorized
    match e {
        error::CliError::Config(_) => 11,
        error::CliError::Use(_) => 30,
        error::CliError::Io(_) => 50,
        error::CliError::Command(_) => 50,
    }
}

/// Install the global subscriber described by `logging`: an EnvFilter
/// (`RUST_LOG` wins over `logging.level`), a stderr layer and an optional
/// per-process file under `logging.log_directory()`.
fn init_tracing(logging: &LoggingConfig) -> Result<(), error::CliError> {
    if !logging.enabled {
        return Ok(());
    }
    if logging.has_no_sink() {
        return Err(error::CliError::Config(
            "logging is enabled but both console and file output are off".to_string(),
        ));
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(&logging.level)
            .map_err(|e| error::CliError::Config(format!("logging.level: {e}")))?,
    };

    let file_layer = if logging.file {
        let dir = logging.log_directory();
        std::fs::create_dir_all(&dir)?;
        let appender = tracing_appender::rolling::never(dir, logging.log_file_name());
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        Some(fmt::layer().with_writer(writer).with_ansi(false))
    } else {
        None
    };

    let console_layer = logging.console.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
