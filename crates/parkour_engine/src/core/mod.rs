//! Core engine settings shared by every subsystem

pub mod config;

pub use config::{ControllerConfig, EngineConfig, WorldConfig};
