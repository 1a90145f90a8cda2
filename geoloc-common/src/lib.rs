//! # Geoloc Common Library
//!
//! Shared code for the geoloc services including:
//! - Common error type
//! - Configuration file discovery and TOML loading
//! - API key validation
//! - Tracing initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
