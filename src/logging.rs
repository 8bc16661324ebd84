use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber: rolling log file plus a console layer.
///
/// The console always writes to stderr so command results on stdout stay
/// machine-readable; with `use_json` both layers emit JSON lines. Keep the
/// returned guard alive for the process lifetime or buffered file lines
/// are lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let appender =
        RollingFileAppender::new(rotation(&config.rotation), &config.log_dir, &config.log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let (json_layers, text_layers) = if config.use_json {
        let file = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(file_writer)
            .with_ansi(false);
        let console = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);
        (Some(file.and_then(console)), None)
    } else {
        let file = fmt::layer()
            .with_target(false)
            .with_writer(file_writer)
            .with_ansi(false);
        let console = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_ansi(true);
        (None, Some(file.and_then(console)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layers)
        .with(text_layers)
        .init();

    guard
}

/// `hourly`, `daily`, anything else never rotates
fn rotation(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    }
}

/// ethers' transport logs are noisy at info
fn default_directives(level: &str) -> String {
    format!("{},ethers=warn", level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_names() {
        assert_eq!(rotation("hourly"), Rotation::HOURLY);
        assert_eq!(rotation("daily"), Rotation::DAILY);
        assert_eq!(rotation("weekly"), Rotation::NEVER);
    }

    #[test]
    fn test_default_directives_quiet_ethers() {
        assert_eq!(default_directives("debug"), "debug,ethers=warn");
        assert!(EnvFilter::try_new(default_directives("info")).is_ok());
    }
}
