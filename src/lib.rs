//! `cardio-risk` library crate.
//!
//! The binary (`cardio`) is a thin wrapper around this library so that:
//!
//! - training and serving logic is testable without spawning processes
//! - the inference service can be embedded behind any request layer
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod explain;
pub mod inference;
pub mod io;
pub mod math;
pub mod models;
pub mod preprocess;
pub mod report;

#[cfg(test)]
pub(crate) mod testutil;
