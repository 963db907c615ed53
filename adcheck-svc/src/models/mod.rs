//! Request and report types for the compliance API

pub mod report;
pub mod request;

pub use report::*;
pub use request::*;
