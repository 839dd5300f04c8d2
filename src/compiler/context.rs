//! Compiler context shared by passes.
//!
//! The [`CompilerContext`] carries everything a pass produces besides the
//! mutated module itself: the [`EventLog`], the descriptors emitted so far,
//! and the optional [`MetadataSink`] that receives them.

use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::{
    compiler::events::{DerivedStats, EventKind, EventLog},
    ir::FuncId,
    metadata::{MemoDescriptor, MetadataSink},
    Result,
};

/// State shared across a pass pipeline run.
pub struct CompilerContext {
    /// Accumulated events from all passes.
    pub events: EventLog,

    /// Descriptors emitted so far, in emission order.
    descriptors: Vec<MemoDescriptor>,

    /// Downstream consumer of descriptors.
    sink: Option<Box<dyn MetadataSink>>,

    /// When the context was created.
    start_time: Instant,
}

impl Default for CompilerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompilerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerContext")
            .field("events", &self.events.len())
            .field("descriptors", &self.descriptors.len())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl CompilerContext {
    /// Creates a context without a sink; descriptors are only retained.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: EventLog::new(),
            descriptors: Vec::new(),
            sink: None,
            start_time: Instant::now(),
        }
    }

    /// Creates a context forwarding descriptors to `sink`.
    #[must_use]
    pub fn with_sink(sink: Box<dyn MetadataSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new()
        }
    }

    /// Records `descriptor` and forwards it to the sink.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if it rejects the descriptor. The descriptor
    /// is retained in the context either way.
    pub fn emit(&mut self, function: FuncId, descriptor: MemoDescriptor) -> Result<()> {
        self.events
            .record(EventKind::DescriptorEmitted)
            .function(function)
            .message(descriptor.to_string());

        let forwarded = match self.sink.as_mut() {
            Some(sink) => sink.emit(&descriptor),
            None => Ok(()),
        };
        self.descriptors.push(descriptor);
        forwarded
    }

    /// Returns the descriptors emitted so far.
    #[must_use]
    pub fn descriptors(&self) -> &[MemoDescriptor] {
        &self.descriptors
    }

    /// Removes and returns the emitted descriptors.
    pub fn take_descriptors(&mut self) -> Vec<MemoDescriptor> {
        std::mem::take(&mut self.descriptors)
    }

    /// Flushes the sink, if any.
    ///
    /// # Errors
    ///
    /// Returns the sink's flush error.
    pub fn flush(&mut self) -> Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    /// Removes the sink and returns it.
    pub fn take_sink(&mut self) -> Option<Box<dyn MetadataSink>> {
        self.sink.take()
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Computes statistics from the recorded events.
    #[must_use]
    pub fn stats(&self) -> DerivedStats {
        DerivedStats::from_log(&self.events).with_time(self.elapsed())
    }
}
