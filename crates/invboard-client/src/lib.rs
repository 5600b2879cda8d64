//! invboard-client: access to the inventory backend.
//!
//! The dashboard talks to a PuppetDB-compatible service through the
//! [`Backend`] trait. [`HttpBackend`] is the production implementation;
//! tests substitute in-memory fakes.
//!
//! # Errors
//!
//! Every call returns [`BackendResult`]. [`BackendError`] separates the
//! failure kinds callers react to differently:
//!
//! | Variant | Meaning |
//! |---|---|
//! | `Connection` | backend unreachable or timed out |
//! | `EmptyResponse` | 2xx with no content |
//! | `Http` | non-2xx status |
//! | `Other` | anything else |

pub mod backend;
pub mod error;
pub mod rest;

pub use backend::{Backend, Page, paged};
pub use error::{BackendError, BackendResult, ErrorKind};
pub use rest::{HttpBackend, HttpBackendConfig};
