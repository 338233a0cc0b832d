//! Optional JSON Schema validation of action payloads.
//!
//! Validate `action` and `request` payloads against JSON Schema 2020-12,
//! keyed by action name, before any handler sees them.
//!
//! This crate is optional. Enable the `schema` feature on
//! `framebridge-peer` when the two documents share a payload contract.

pub mod config;
pub mod error;
pub mod registry;
pub mod validator;

pub use config::RegistryConfig;
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
