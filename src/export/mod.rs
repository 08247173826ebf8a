//! Export of the live sample buffer

pub mod csv;

pub use self::csv::{export_file_name, export_to_dir, write_csv};
