//! Shared models, invocation metadata and function configuration

pub mod config;
pub mod invocation;
pub mod models;
