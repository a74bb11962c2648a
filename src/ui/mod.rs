// Wed Jan 15 2026 - Alex

pub mod cli;
pub mod display;
pub mod table;

pub use cli::{CliInterface, Commands};
pub use display::{segment_rows, type_rows, DisplayRenderer, LiveReport, LocateReport, SegmentRow, TypeRow};
pub use table::{Alignment, BorderStyle, TableBuilder};

pub fn print_error(message: &str) {
    use colored::Colorize;
    eprintln!("{} {}", "[ERROR]".red(), message);
}
