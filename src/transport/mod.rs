/// Filesystem scanning for data files.
pub mod fs;

pub use fs::{DataFileEntry, DataFileScanner};
