//! Shared plumbing for the weir binaries.

pub mod common;
