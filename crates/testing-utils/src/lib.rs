//! # Fedexec Testing Utils
//!
//! Shared testing utilities for the federated execution platform.
//! This crate provides in-memory mock implementations of the repository and
//! collaborator traits, plus builders for creating test data.
//!
//! ## Usage
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! fedexec-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

// Re-export commonly used items
pub use builders::*;
pub use helpers::*;
pub use mocks::*;
