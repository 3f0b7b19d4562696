// Tracing setup
//
// Subscriber built from LOG_LEVEL and LOG_FORMAT, with RUST_LOG taking
// precedence when set so operators can still do targeted filtering.

use tracing_subscriber::EnvFilter;

pub fn init_tracing(log_level: &str, log_format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
