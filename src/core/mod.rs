//! Core library components.
//!
//! The template engine: grammar detection, token extraction, multi-account
//! resolution through an external provider, the TTL cache, per-template
//! processing and batch orchestration.

pub mod batch;
pub mod cache;
pub mod config;
pub mod constants;
pub mod diff;
pub mod env;
pub mod format;
pub mod output;
pub mod processor;
pub mod provider;
pub mod reference;
pub mod resolver;
pub mod token;
pub mod types;
