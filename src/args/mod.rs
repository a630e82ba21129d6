//! Command-line arguments.
mod cli;


pub use cli::StampedeArgs;
