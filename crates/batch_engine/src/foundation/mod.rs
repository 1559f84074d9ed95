//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and operations
//! - Packed vertex colors
//! - Logging utilities

pub mod math;
// Pod derives expand to unsafe impls
#[allow(unsafe_code)]
pub mod color;
pub mod logging;
