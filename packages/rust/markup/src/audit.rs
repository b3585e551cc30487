//! Audit sink for the recoverable conditions met while rendering.
//!
//! None of these stop a conversion. They are collected so a run can report
//! which parts of the corpus the renderer vocabulary does not cover.

use std::collections::BTreeMap;

use tracing::{debug, warn};

/// Which kind of reference failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Xref,
    Callout,
}

/// A recovered rendering problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    /// No renderer for this element name; rendered empty (or as plain text
    /// inside running text).
    UnknownTag { section: usize, tag: String },
    /// An expected sub-element was absent; its slot rendered empty.
    MissingChild {
        section: usize,
        parent: String,
        child: &'static str,
    },
    /// A reference target was not found; rendered with the fallback label.
    UnresolvedReference {
        section: usize,
        kind: ReferenceKind,
        target: String,
    },
}

impl AuditEvent {
    pub fn section(&self) -> usize {
        match self {
            Self::UnknownTag { section, .. }
            | Self::MissingChild { section, .. }
            | Self::UnresolvedReference { section, .. } => *section,
        }
    }
}

/// Receives audit events from the transducer.
pub trait AuditSink {
    fn record(&mut self, event: AuditEvent);
}

/// Sink that keeps every event in memory and logs it at debug level.
#[derive(Debug, Default)]
pub struct AuditLog {
    events: Vec<AuditEvent>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Unknown element names with their occurrence counts.
    pub fn skipped_tags(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            if let AuditEvent::UnknownTag { tag, .. } = event {
                *counts.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn unresolved_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AuditEvent::UnresolvedReference { .. }))
            .count()
    }

    pub fn missing_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AuditEvent::MissingChild { .. }))
            .count()
    }

    /// One warning per skipped element name.
    pub fn warn_summary(&self) {
        for (tag, count) in self.skipped_tags() {
            warn!(tag = %tag, count, "no renderer for element, skipped");
        }
    }
}

impl AuditSink for AuditLog {
    fn record(&mut self, event: AuditEvent) {
        match &event {
            AuditEvent::UnknownTag { section, tag } => {
                debug!(section, tag = %tag, "unknown tag");
            }
            AuditEvent::MissingChild {
                section,
                parent,
                child,
            } => {
                debug!(section, parent = %parent, child, "missing expected child");
            }
            AuditEvent::UnresolvedReference {
                section,
                kind,
                target,
            } => {
                debug!(section, ?kind, target = %target, "unresolved reference");
            }
        }
        self.events.push(event);
    }
}
