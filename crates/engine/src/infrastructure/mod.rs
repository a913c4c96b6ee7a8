//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod debounce;
pub mod logging;
pub mod memory;
pub mod ports;
pub mod rest;
pub mod settings;
