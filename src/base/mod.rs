//! Foundation types for the kripke toolchain.
//!
//! This module provides fundamental types used throughout the compiler:
//! - [`Tag`] - Parse-tree node tags (bit-exact with the external parser)
//! - [`FailureKind`] - Deferred constant-evaluation error kinds
//!
//! This module has NO dependencies on other kripke modules.

mod tag;

pub use tag::{FailureKind, Tag};
