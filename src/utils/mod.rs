//! Utility functions and helpers

pub mod log_parser;
