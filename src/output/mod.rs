mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::{export_json, write_csv_report};
pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::print_summary;

/// Prints the cycletime banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("⏱️ cycletime"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Issue cycle time report")
    );
}
