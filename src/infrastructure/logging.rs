use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set; otherwise `debug` or `info` per config.
fn build_filter(debug: bool, env: Option<&str>) -> EnvFilter {
    let default = if debug { "debug" } else { "info" };
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

/// Install the global subscriber.
pub fn init(debug: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(debug, env.as_deref());

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
