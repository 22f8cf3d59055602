//! Durable log store adapters.
//!
//! The engine talks to storage through the
//! [`LogStore`](raft::log::LogStore) trait; this crate provides the
//! implementations that outlive a process. [`FileLogStore`] keeps one
//! append-only file per partition and fsyncs every record, which satisfies
//! the synchronous-durability contract of `propose` and `commit`.

pub mod file;

pub use file::{FileLogStore, FileStoreError};
