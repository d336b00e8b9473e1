//! Command line front end for configuration pipelines.
//!
//! The binary in `main.rs` only parses arguments and prints results; everything
//! it runs lives here so it can be exercised from tests.

pub mod commands;
pub mod config;
pub mod errors;
