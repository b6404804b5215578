#![deny(clippy::print_stdout)]

pub mod config;
pub mod discovery;
pub mod trace;

/// Basic error type, dynamically dispatched and safe to send across threads
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
