//! Utility modules

pub mod file;

pub use file::{create_dir, delete_file, file_exists, fix_filename, save_bytes};
