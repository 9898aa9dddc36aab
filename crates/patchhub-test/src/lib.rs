//! Shared test utilities for PatchHub.
//!
//! Mock collaborators for the hub's ports plus fixtures for registry
//! responses. Add as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! patchhub-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use patchhub_test::{MockRegistry, result_item};
//!
//! let registry = MockRegistry::new().with_items(vec![result_item("guard")]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
