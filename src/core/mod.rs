//! Core infrastructure: configuration, errors, host probing and operator output

pub mod config;
pub mod error;
pub mod output;
pub mod platform;
