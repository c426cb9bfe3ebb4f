//! Core types and trait definitions for Accord.
//!
//! This crate has no HTTP or database dependencies.
//! The store backend, the API layer and the terminal client all depend on it.

pub mod client_ip;
pub mod error;
pub mod password;
pub mod store;
pub mod terms;
pub mod user;

pub use error::{Error, Result};
