//! # Relay Testkit
//!
//! Test utilities for Relay.
//!
//! This crate provides:
//! - Record and identity fixtures
//! - Property-based test generators using proptest
//! - A tracing initializer for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_testkit::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn coalescing_never_grows(ops in operation_sequence_strategy(0, 20)) {
//!         prop_assert!(coalesce_record_operations(&ops).len() <= ops.len());
//!     }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
