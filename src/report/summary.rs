use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::report::{RecordType, Severity};

/// Error and warning counters per record type for one run.
///
/// Counters are atomics so every task of a run can increment them without
/// locking; they are only ever incremented.
#[derive(Debug)]
pub struct ConsistencySummaryStatistics {
    errors: [AtomicU64; RecordType::COUNT],
    warnings: [AtomicU64; RecordType::COUNT],
}

impl Default for ConsistencySummaryStatistics {
    fn default() -> Self {
        Self {
            errors: std::array::from_fn(|_| AtomicU64::new(0)),
            warnings: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }
}

impl ConsistencySummaryStatistics {
    /// Creates a zeroed summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one violation.
    pub fn update(&self, record_type: RecordType, severity: Severity) {
        let counters = match severity {
            Severity::Error => &self.errors,
            Severity::Warning => &self.warnings,
        };
        counters[record_type.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Errors attributed to `record_type`.
    pub fn errors(&self, record_type: RecordType) -> u64 {
        self.errors[record_type.index()].load(Ordering::Relaxed)
    }

    /// Warnings attributed to `record_type`.
    pub fn warnings(&self, record_type: RecordType) -> u64 {
        self.warnings[record_type.index()].load(Ordering::Relaxed)
    }

    /// Errors across all record types.
    pub fn total_errors(&self) -> u64 {
        RecordType::ALL.iter().map(|ty| self.errors(*ty)).sum()
    }

    /// Warnings across all record types.
    pub fn total_warnings(&self) -> u64 {
        RecordType::ALL.iter().map(|ty| self.warnings(*ty)).sum()
    }

    /// Errors plus warnings across all record types.
    pub fn total_inconsistency_count(&self) -> u64 {
        self.total_errors() + self.total_warnings()
    }

    /// True iff nothing at all was reported.
    pub fn is_consistent(&self) -> bool {
        self.total_inconsistency_count() == 0
    }

    /// Serializable copy of the non-zero counters.
    pub fn report(&self) -> SummaryReport {
        let types = RecordType::ALL
            .iter()
            .filter_map(|ty| {
                let counts = TypeCounts {
                    record_type: *ty,
                    errors: self.errors(*ty),
                    warnings: self.warnings(*ty),
                };
                (counts.errors + counts.warnings > 0).then_some(counts)
            })
            .collect();
        SummaryReport {
            consistent: self.is_consistent(),
            errors: self.total_errors(),
            warnings: self.total_warnings(),
            types,
        }
    }
}

impl fmt::Display for ConsistencySummaryStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ConsistencySummaryStatistics{{")?;
        writeln!(f, "\tNumber of errors: {}", self.total_errors())?;
        writeln!(f, "\tNumber of warnings: {}", self.total_warnings())?;
        for ty in RecordType::ALL {
            let count = self.errors(ty) + self.warnings(ty);
            if count > 0 {
                writeln!(f, "\tNumber of {ty} inconsistencies: {count}")?;
            }
        }
        write!(f, "}}")
    }
}

/// Counters of one record type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    /// Attribution tag.
    pub record_type: RecordType,
    /// Errors reported.
    pub errors: u64,
    /// Warnings reported.
    pub warnings: u64,
}

/// Point-in-time copy of a summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummaryReport {
    /// Whether no violation was reported.
    pub consistent: bool,
    /// Errors across all record types.
    pub errors: u64,
    /// Warnings across all record types.
    pub warnings: u64,
    /// Non-zero counters, in reporting order.
    pub types: Vec<TypeCounts>,
}
