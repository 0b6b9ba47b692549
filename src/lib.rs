//! # zbxsync
//!
//! Core library for the Zabbix template synchronization tool.
//!
//! This library exports templates from a Zabbix server's configuration
//! API to local XML files, imports local files back into the server, and
//! diffs local definitions against server state. Exported documents are
//! normalized into a comparison-stable canonical form before they are
//! stored or compared.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// JSON-RPC transport and authenticated API client
pub mod api;

/// XML normalization into a canonical, comparison-stable form
pub mod canonical;

/// YAML configuration loading and validation
pub mod config;

/// Error types shared across the crate
pub mod error;

/// Bounded, order-preserving worker pool for batch operations
pub mod runner;

/// Template-scoped facade over the configuration API
pub mod store;

/// The four sync verbs and their outcome type
pub mod sync;
