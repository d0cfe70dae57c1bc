//! Data models: pipeline configuration.

pub mod config;
