//! Target file layout
//!
//! Every worker accesses its own set of files, named deterministically from the
//! worker id and file index and sharded into leaf directories so no directory
//! grows past the configured limit.
//!
//! # Layout
//!
//! ```text
//! base_dir/
//!   thrd000-d0000/f.0000000 .. f.0000999
//!   thrd000-d0001/f.0001000 ..
//!   thrd001-d0000/f.0000000 ..
//! ```
//!
//! Directories are not created here; the worker creates a leaf directory the
//! first time a create in it reports not-found.

pub mod naming;

pub use naming::path_for;
