mod format;
pub mod spinner;
mod table;
pub mod theme;

pub use format::{OutputMode, print_json, print_success, print_error};
pub use table::{build_table, status_cell};
