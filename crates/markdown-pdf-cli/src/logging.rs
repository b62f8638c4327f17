//! Logger setup for the binary.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Level used when `RUST_LOG` is unset: `warn`, then one step per `-v`.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the global logger. Returns `false` when a logger was already
/// installed; that one stays active.
pub fn init(verbosity: u8) -> bool {
    let default = level_for(verbosity).to_string().to_lowercase();
    Builder::from_env(Env::default().default_filter_or(default))
        .format_timestamp(None)
        .format_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_flag_raises_the_level() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(7), LevelFilter::Trace);
    }

    #[test]
    fn second_init_keeps_the_first_logger() {
        init(0);
        assert!(!init(2));
    }
}
