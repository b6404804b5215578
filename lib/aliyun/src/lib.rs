//! A small client for the Alibaba Cloud RPC APIs, only the actions needed for
//! service discovery are implemented.

pub mod action;
mod client;
mod config;
mod signature;

pub use action::{Action, Product};
pub use client::{Client, Error, ErrorResponse};
pub use config::{Config, Credentials, DEFAULT_REGION, Error as ConfigError};
