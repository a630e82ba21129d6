//! Presentation of a [`TestResult`](crate::engine::TestResult): JSON export
//! and the end-of-test text summary.
mod export;
mod text;


pub use export::export_summary;
pub use text::{print_summary, summary_lines};
