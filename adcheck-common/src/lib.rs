//! # adcheck Common Library
//!
//! Shared code for the adcheck compliance service:
//! - Error types
//! - Configuration loading (ENV → TOML → default)
//! - Compliance primitives (violations, severities)

pub mod config;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Severity, Violation, ViolationSource};
