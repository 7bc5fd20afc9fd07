//! Core type definitions for tether.
//!
//! - [`config`] - Orchestrator configuration

pub mod config;

pub use config::Config;
