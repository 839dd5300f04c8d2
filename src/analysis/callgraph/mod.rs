//! Call graph construction and call-site enumeration.
//!
//! # Components
//!
//! - [`CallGraph`]: forward and reverse direct-call edges, plus the set of
//!   functions that call through computed addresses
//! - [`CallSite`]: one direct call instruction, located by block and position
//! - [`call_sites_of`]: all call sites targeting a function, in declaration order
//!
//! The graph is a snapshot. Passes that redirect calls enumerate sites again
//! with [`call_sites_of`] rather than reusing a stale graph.

mod graph;
mod site;

pub use graph::CallGraph;
pub use site::{call_sites_of, CallSite};
