//! Persistent storage backends

pub mod disk;

pub use disk::DiskCache;
