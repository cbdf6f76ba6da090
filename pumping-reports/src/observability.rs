use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins; otherwise this crate logs at `default_level`. Output
/// goes to stderr so the CLI can keep stdout for report JSON.
pub fn init_tracing(default_level: &str) {
    let directive = format!("pumping_reports={default_level}");
    let filter = match directive.parse() {
        Ok(d) => EnvFilter::from_default_env().add_directive(d),
        Err(_) => EnvFilter::from_default_env(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
