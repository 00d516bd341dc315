use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

/// Builds the logger using the environment variable 'RUST_LOG' to determine the log level. Uses the
/// passed in `level` if the environment variable is not set. Calling it more than once is harmless;
/// only the first call installs a logger.
pub fn build_logger_for_level(level: LevelFilter) {
    let start_time = Arc::new(Instant::now());

    let env = Env::default().default_filter_or(level.as_str());
    let mut builder = Builder::from_env(env);
    let _ = builder
        .format(move |buf, record| {
            let elapsed = start_time.elapsed().as_millis();
            writeln!(
                buf,
                "c {:>6}.{:<03} [{}] - {}",
                elapsed / 1000,
                elapsed % 1000,
                record.level(),
                record.args()
            )
        })
        .try_init();
}

/// Builds the logger using the environment variable 'RUST_LOG' to determine the log level. If the
/// environment variable is not set, the passed in `default_level` is increased by `verbosity` many
/// levels and the result is used as the log level.
pub fn build_logger_for_verbosity(default_level: LevelFilter, verbosity: usize) {
    let result_level = level_from_verbosity(default_level, verbosity);
    build_logger_for_level(result_level);
}

/// Maps the 0-3 verbosity scale of the command line tools onto a log level:
/// 0 is silent, 1 warnings, 2 progress, 3 debug output.
pub fn level_from_cli_verbosity(verbosity: usize) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Off,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn level_from_verbosity(default_level: LevelFilter, verbosity: usize) -> LevelFilter {
    let default_level = usize_from_level(default_level);
    try_level_from_usize(default_level + verbosity).unwrap_or(LevelFilter::Trace)
}

fn usize_from_level(value: LevelFilter) -> usize {
    match value {
        LevelFilter::Off => 0,
        LevelFilter::Error => 1,
        LevelFilter::Warn => 2,
        LevelFilter::Info => 3,
        LevelFilter::Debug => 4,
        LevelFilter::Trace => 5,
    }
}

fn try_level_from_usize(value: usize) -> Option<LevelFilter> {
    match value {
        0 => Some(LevelFilter::Off),
        1 => Some(LevelFilter::Error),
        2 => Some(LevelFilter::Warn),
        3 => Some(LevelFilter::Info),
        4 => Some(LevelFilter::Debug),
        5 => Some(LevelFilter::Trace),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(level_from_verbosity(LevelFilter::Off, 5), LevelFilter::Trace);
        assert_eq!(level_from_verbosity(LevelFilter::Warn, 1), LevelFilter::Info);
        assert_eq!(level_from_verbosity(LevelFilter::Error, 0), LevelFilter::Error);
        assert_eq!(level_from_verbosity(LevelFilter::Trace, 1), LevelFilter::Trace);
    }

    #[test]
    fn cli_verbosity() {
        assert_eq!(level_from_cli_verbosity(0), LevelFilter::Off);
        assert_eq!(level_from_cli_verbosity(2), LevelFilter::Info);
        assert_eq!(level_from_cli_verbosity(7), LevelFilter::Debug);
    }

    #[test]
    fn repeated_initialisation() {
        build_logger_for_level(LevelFilter::Warn);
        build_logger_for_verbosity(LevelFilter::Warn, 2);
    }
}
