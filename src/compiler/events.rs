//! Event logging for compiler passes.
//!
//! Passes record what they decided and what they changed into an
//! [`EventLog`]. Events can be inspected after a run for testing and
//! diagnostics or safely ignored. Live trace lines go through `tracing`
//! independently; the log is the structured, queryable record.
//!
//! # Architecture
//!
//! - [`Event`] - A single recorded event (decision, change, info)
//! - [`EventLog`] - Append-only collection with query helpers
//! - [`EventBuilder`] - Fluent API for creating events
//! - [`DerivedStats`] - Counters computed from a log
//!
//! # Example
//!
//! ```rust
//! use memoscope::compiler::{EventKind, EventLog};
//! use memoscope::ir::FuncId;
//!
//! let log = EventLog::new();
//!
//! log.record(EventKind::CallSiteRewritten)
//!     .at(FuncId(3), 0)
//!     .message("call @add -> @_memoized__add");
//! log.info("module unit: 4 functions");
//!
//! assert!(log.has(EventKind::CallSiteRewritten));
//! assert_eq!(log.count_kind(EventKind::Info), 1);
//! ```

use std::{collections::HashMap, fmt, time::Duration};

use crate::ir::FuncId;

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A call site was redirected to a memoized entry point.
    CallSiteRewritten,
    /// A literal argument was folded into the memoization key.
    ConstantFolded,
    /// A memoized entry point was created.
    FunctionSynthesized,
    /// A canonical-parameter descriptor was emitted.
    DescriptorEmitted,

    /// A function was examined by the classifier.
    FunctionVisited,
    /// A function was recognized as an existing memoized entry point.
    AlreadyMemoized,
    /// A call to a side-effect free function was skipped during classification.
    PureCallSkipped,
    /// A function was rejected for memoization.
    FunctionRejected,
    /// A function was approved for memoization.
    FunctionApproved,

    /// A pass started.
    PassStarted,
    /// A pass completed.
    PassCompleted,

    /// Informational message.
    Info,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            // Transformations
            Self::CallSiteRewritten => "call site rewritten",
            Self::ConstantFolded => "constant folded",
            Self::FunctionSynthesized => "function synthesized",
            Self::DescriptorEmitted => "descriptor emitted",
            // Analysis
            Self::FunctionVisited => "function visited",
            Self::AlreadyMemoized => "already memoized",
            Self::PureCallSkipped => "pure call skipped",
            Self::FunctionRejected => "function rejected",
            Self::FunctionApproved => "function approved",
            // Engine
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            // Diagnostic
            Self::Info => "info",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// The function where the event occurred (if applicable).
    pub function: Option<FuncId>,
    /// Location within the function (block index or argument slot).
    pub location: Option<usize>,
    /// Human-readable description.
    pub message: String,
    /// Associated pass name (if from a pass).
    pub pass: Option<String>,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            function: None,
            location: None,
            message: message.into(),
            pass: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is automatically added
/// to the log when the builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    function: Option<FuncId>,
    location: Option<usize>,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            function: None,
            location: None,
            message: None,
            pass: None,
        }
    }

    /// Sets the function and location where the event occurred.
    pub fn at(mut self, function: FuncId, location: usize) -> Self {
        self.function = Some(function);
        self.location = Some(location);
        self
    }

    /// Sets only the function (for function-level events).
    pub fn function(mut self, function: FuncId) -> Self {
        self.function = Some(function);
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates this event with a specific pass.
    pub fn pass(mut self, pass_name: impl Into<String>) -> Self {
        self.pass = Some(pass_name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        let event = Event {
            kind: self.kind,
            function: self.function.take(),
            location: self.location.take(),
            message,
            pass: self.pass.take(),
        };

        self.log.events.push(event);
    }
}

/// Collection of events from a compiler run.
///
/// Provides methods for recording and querying events. Statistics are
/// derived from the events rather than tracked separately, see
/// [`DerivedStats`].
///
/// Events are appended through shared references (`&self`).
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    ///
    /// The event is automatically added when the builder is dropped.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for (_, event) in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }
}

/// Statistics derived from an EventLog.
#[derive(Debug, Clone, Default)]
pub struct DerivedStats {
    /// Number of functions examined by the classifier.
    pub functions_visited: usize,
    /// Number of functions approved.
    pub functions_approved: usize,
    /// Number of functions rejected.
    pub functions_rejected: usize,
    /// Number of functions recognized as existing memo entries.
    pub already_memoized: usize,
    /// Number of memoized entry points created.
    pub functions_synthesized: usize,
    /// Number of call sites redirected.
    pub call_sites_rewritten: usize,
    /// Number of literal arguments folded into keys.
    pub constants_folded: usize,
    /// Number of descriptors emitted.
    pub descriptors_emitted: usize,
    /// Number of scheduler iterations.
    pub iterations: usize,
    /// Processing time.
    pub total_time: Duration,
}

impl DerivedStats {
    /// Computes statistics from an event log.
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        let counts = log.count_by_kind();
        let get = |kind: EventKind| counts.get(&kind).copied().unwrap_or(0);

        Self {
            functions_visited: get(EventKind::FunctionVisited),
            functions_approved: get(EventKind::FunctionApproved),
            functions_rejected: get(EventKind::FunctionRejected),
            already_memoized: get(EventKind::AlreadyMemoized),
            functions_synthesized: get(EventKind::FunctionSynthesized),
            call_sites_rewritten: get(EventKind::CallSiteRewritten),
            constants_folded: get(EventKind::ConstantFolded),
            descriptors_emitted: get(EventKind::DescriptorEmitted),
            iterations: 0,
            total_time: Duration::ZERO,
        }
    }

    /// Sets the total processing time.
    #[must_use]
    pub fn with_time(mut self, time: Duration) -> Self {
        self.total_time = time;
        self
    }

    /// Sets the number of iterations.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Generates a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if self.functions_visited > 0 {
            parts.push(format!(
                "{} visited ({} approved, {} rejected)",
                self.functions_visited, self.functions_approved, self.functions_rejected
            ));
        }
        if self.already_memoized > 0 {
            parts.push(format!("{} already memoized", self.already_memoized));
        }
        if self.functions_synthesized > 0 {
            parts.push(format!("{} synthesized", self.functions_synthesized));
        }
        if self.call_sites_rewritten > 0 {
            parts.push(format!("{} call sites", self.call_sites_rewritten));
        }
        if self.constants_folded > 0 {
            parts.push(format!("{} constants folded", self.constants_folded));
        }
        if self.descriptors_emitted > 0 {
            parts.push(format!("{} descriptors", self.descriptors_emitted));
        }

        let stats = if parts.is_empty() {
            "no transformations".to_string()
        } else {
            parts.join(", ")
        };

        if self.total_time.as_millis() > 0 {
            format!(
                "{} in {:?} ({} iterations)",
                stats, self.total_time, self.iterations
            )
        } else {
            stats
        }
    }
}

impl fmt::Display for DerivedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
