//! Store backends.
//!
//! `MemoryStore` is for tests and transient use; `FileStore` persists one
//! bincode file per record under a validated directory.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;
