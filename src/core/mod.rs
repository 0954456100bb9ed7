//! Core types and cross-cutting concerns: models, configuration, logging.

pub mod config;
pub mod logging;
pub mod models;
