//! Record files on disk

pub mod atomic;
pub mod writer;

pub use atomic::{atomic_write, remove_file};
pub use writer::FsWriter;
