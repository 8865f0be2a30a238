//! Low-level file storage helpers.

mod atomic_file;

pub use atomic_file::{write_atomic, write_atomic_sync};
