use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Async load-generation engine in Rust - staged ramps and scenarios, per-phase HTTP timings, and pass/fail thresholds."
)]
pub struct StampedeArgs {
    /// Path to config file (TOML or JSON). Defaults to ./stampede.toml or ./stampede.json
    #[arg(long, short)]
    pub config: Option<String>,

    /// Base URL for relative step paths and ${BASE_URL} placeholders (overrides the config)
    #[arg(long = "base-url", env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Write the structured end-of-test summary as JSON to this file
    #[arg(long = "summary-export")]
    pub summary_export: Option<String>,

    /// Do not print the text summary; only log warnings and errors
    #[arg(long, short, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable debug logging (set STAMPEDE_LOG or RUST_LOG to override)
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,
}
