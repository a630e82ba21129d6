use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global subscriber. `STAMPEDE_LOG` wins over `RUST_LOG`;
/// without either, `verbose` selects debug and `quiet` selects warn.
pub fn init_logging(verbose: bool, quiet: bool, no_color: bool) {
    let filter = std::env::var("STAMPEDE_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| EnvFilter::new(default_level(verbose, quiet)),
            |value| {
                EnvFilter::try_new(value)
                    .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, quiet)))
            },
        );

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}

const fn default_level(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}
