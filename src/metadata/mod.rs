//! Memoization metadata handed to downstream consumers.
//!
//! Every function the memoization pass rewrites produces one
//! [`MemoDescriptor`]: the original and memoized names, the canonical runtime
//! parameter order and the constant key fragments seen at its call sites.
//! Descriptors are delivered to a [`MetadataSink`]; how a consumer turns them
//! into lookup tables is outside this crate.
//!
//! # Sinks
//!
//! - [`CollectingSink`] - keeps descriptors in memory
//! - [`JsonLinesSink`] - writes one JSON object per line to any [`std::io::Write`]

mod descriptor;
mod sink;

pub use descriptor::MemoDescriptor;
pub use sink::{CollectingSink, JsonLinesSink, MetadataSink};
