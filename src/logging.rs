use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_target(false)
        .compact()
        .init();
}

/// Uses `rust_log` verbatim when set; otherwise `info` with noisy
/// dependencies capped at `warn`.
fn build_filter(rust_log: Option<&str>) -> EnvFilter {
    let builder = EnvFilter::builder().with_default_directive(Level::INFO.into());

    match rust_log.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directives) => builder.parse_lossy(directives),
        None => builder
            .parse_lossy("")
            .add_directive("hyper=warn".parse().expect("valid directive for hyper"))
            .add_directive("reqwest=warn".parse().expect("valid directive for reqwest"))
            .add_directive("redis=warn".parse().expect("valid directive for redis")),
    }
}
