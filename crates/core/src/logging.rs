//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to `default_level`
pub fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global fmt subscriber writing to stderr
///
/// Safe to call more than once; later calls are ignored.
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init("debug");
        init("info");
    }

    #[test]
    fn test_bad_level_falls_back() {
        // Must not panic on an unparsable directive
        let _ = filter("not=a=level");
    }
}
