//! chdforge - batch conversion of disc images with chdman
//!
//! This library crate holds the pieces the binary drives around the
//! supervisor, exposed for integration testing.

pub mod batch;
pub mod config;
pub mod directory;
pub mod report;
pub mod sizes;
