//! Recoverable data-quality events.
//!
//! Problems the engine works around (an opcode it does not model, a method with
//! several exits, control flow that does not reduce) do not abort
//! decompilation. Each one is logged through the `log` facade and recorded in
//! an [`EventLog`], which callers can query after a run.
//!
//! The log is append-only and backed by a `boxcar::Vec`, so the workers of a
//! parallel class run push into one shared log without locking.

use std::fmt;

use log::Level;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Kinds of recoverable events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum EventKind {
    /// An opcode without IR mapping was replaced by `Nop`
    #[strum(serialize = "unknown-opcode")]
    UnknownOpcode,
    /// Several return nodes; the last node in RPO became the exit
    #[strum(serialize = "multiple-exits")]
    MultipleExits,
    /// No return node; the graph has no exit
    #[strum(serialize = "no-exit")]
    NoExit,
    /// The derived sequence stopped before reducing to a single node
    #[strum(serialize = "irreducible-flow")]
    IrreducibleFlow,
    /// Short-circuit merging hit the configured pass bound
    #[strum(serialize = "structuring-bound")]
    StructuringBound,
    /// A method could not be decompiled
    #[strum(serialize = "method-failed")]
    MethodFailed,
}

impl EventKind {
    /// Log level used when the event is recorded.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            EventKind::NoExit => Level::Debug,
            EventKind::MultipleExits | EventKind::MethodFailed => Level::Error,
            EventKind::UnknownOpcode | EventKind::IrreducibleFlow | EventKind::StructuringBound => {
                Level::Warn
            }
        }
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// What happened
    pub kind: EventKind,
    /// Method the event belongs to, as `Lclass;->name(desc)`
    pub method: Option<String>,
    /// Code offset, when the event concerns one instruction
    pub offset: Option<u32>,
    /// Human readable details
    pub message: String,
}

impl Event {
    /// Creates an event without method or offset.
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Event {
            kind,
            method: None,
            offset: None,
            message: message.into(),
        }
    }

    /// Attaches the method descriptor.
    #[must_use]
    pub fn in_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Attaches a code offset.
    #[must_use]
    pub fn at(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(method) = &self.method {
            write!(f, " {method}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " @{offset:#x}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Append-only, thread-safe collection of [`Event`]s.
///
/// # Examples
///
/// ```rust
/// use dexscope::decompiler::{Event, EventKind, EventLog};
///
/// let log = EventLog::new();
/// log.record(Event::new(EventKind::NoExit, "endless loop").in_method("LFoo;->f()V"));
///
/// assert_eq!(log.count(EventKind::NoExit), 1);
/// assert_eq!(log.summary(), vec![(EventKind::NoExit, 1)]);
/// ```
#[derive(Debug, Default)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        EventLog::default()
    }

    /// Logs the event at its kind's level and stores it.
    pub fn record(&self, event: Event) {
        log::log!(event.kind.level(), "{event}");
        self.events.push(event);
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns true when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().map(|(_, event)| event)
    }

    /// Events of one kind.
    #[must_use]
    pub fn of_kind(&self, kind: EventKind) -> Vec<&Event> {
        self.iter().filter(|e| e.kind == kind).collect()
    }

    /// Number of events of one kind.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.iter().filter(|e| e.kind == kind).count()
    }

    /// Events recorded for one method.
    #[must_use]
    pub fn for_method(&self, method: &str) -> Vec<&Event> {
        self.iter()
            .filter(|e| e.method.as_deref() == Some(method))
            .collect()
    }

    /// Per-kind counts, in declaration order, omitting kinds never seen.
    #[must_use]
    pub fn summary(&self) -> Vec<(EventKind, usize)> {
        EventKind::iter()
            .map(|kind| (kind, self.count(kind)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = Event::new(EventKind::UnknownOpcode, "invoke-custom")
            .in_method("LFoo;->f()V")
            .at(0x12);
        assert_eq!(
            event.to_string(),
            "[unknown-opcode] LFoo;->f()V @0x12: invoke-custom"
        );
    }

    #[test]
    fn test_queries() {
        let log = EventLog::new();
        log.record(Event::new(EventKind::MultipleExits, "3 returns").in_method("a"));
        log.record(Event::new(EventKind::UnknownOpcode, "x").in_method("b"));
        log.record(Event::new(EventKind::UnknownOpcode, "y").in_method("a"));

        assert_eq!(log.len(), 3);
        assert_eq!(log.count(EventKind::UnknownOpcode), 2);
        assert_eq!(log.for_method("a").len(), 2);
        assert_eq!(log.of_kind(EventKind::MultipleExits)[0].message, "3 returns");
        assert_eq!(
            log.summary(),
            vec![(EventKind::UnknownOpcode, 2), (EventKind::MultipleExits, 1)]
        );
    }

    #[test]
    fn test_concurrent_pushes() {
        use rayon::prelude::*;

        let log = EventLog::new();
        (0..64).into_par_iter().for_each(|i| {
            log.record(Event::new(EventKind::NoExit, format!("{i}")));
        });
        assert_eq!(log.len(), 64);
    }

    #[test]
    fn test_levels() {
        assert_eq!(EventKind::NoExit.level(), Level::Debug);
        assert_eq!(EventKind::MultipleExits.level(), Level::Error);
        assert_eq!(EventKind::IrreducibleFlow.level(), Level::Warn);
    }
}
