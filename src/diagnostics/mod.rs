//! Diagnostics for import and reconciliation problems
//!
//! Generic diagnostic system that records recoverable problems found while
//! turning external marker streams into score structures. Tuplet and span
//! reconciliation are the first customers, but the system is designed for
//! reuse with other import checks (unknown marker kinds, bad voice numbers,
//! etc.)

use serde::{Deserialize, Serialize};

use crate::models::Selector;

/// Severity level for diagnostic marks
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
}

/// A diagnostic mark highlighting an issue at a score position
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DiagnosticMark {
    /// Staff index
    pub staff: usize,
    /// Measure index within the staff
    pub measure: usize,
    /// Voice index within the measure
    pub voice: usize,
    /// Note index within the voice (-1 for measure-level)
    pub tick: i32,
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// Kind identifier (e.g., "tuplet_orphan_stop", "tuplet_double_start")
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl DiagnosticMark {
    /// Create a diagnostic mark at a selector position
    pub fn at(
        selector: &Selector,
        severity: DiagnosticSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            staff: selector.staff,
            measure: selector.measure,
            voice: selector.voice,
            tick: selector.tick,
            severity,
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Collection of diagnostic marks for one import or reconciliation pass
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Diagnostics {
    /// All diagnostic marks
    pub marks: Vec<DiagnosticMark>,
}

impl Diagnostics {
    /// Create empty diagnostics
    pub fn new() -> Self {
        Self { marks: Vec::new() }
    }

    /// Add a mark
    pub fn add(&mut self, mark: DiagnosticMark) {
        self.marks.push(mark);
    }

    /// Extend with multiple marks
    pub fn extend(&mut self, marks: impl IntoIterator<Item = DiagnosticMark>) {
        self.marks.extend(marks);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.marks
            .iter()
            .any(|m| m.severity == DiagnosticSeverity::Error)
    }

    /// Check if there are any diagnostics
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// Marks of a given kind
    pub fn of_kind(&self, kind: &str) -> Vec<&DiagnosticMark> {
        self.marks.iter().filter(|m| m.kind == kind).collect()
    }
}
