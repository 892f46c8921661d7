//! Plugin Indexer Library
//!
//! This library provides the packaging pipeline behind the `plugin-indexer`
//! binary. It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Error types and exit status mapping
pub mod error;

/// Runtime module for probing native plugin modules
pub mod runtime;

/// Asset discovery and hashing
pub mod inventory;

/// Manifest document
pub mod manifest;

/// Package archive writer
pub mod package;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

/// Platform-specific utilities module
pub mod platform;
