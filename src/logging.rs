use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "MIRROR_LOG";

fn build_filter(configured_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_new(configured_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the stderr subscriber. Repeated calls are ignored.
pub fn init(configured_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(configured_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init("debug");
        init("warn");
        tracing::debug!("still logging");
    }
}
