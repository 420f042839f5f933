//! Utility functions and helpers
//!
//! ## Modules
//!
//! - [`timing`] - Duration logging around remote round trips

pub mod timing;
