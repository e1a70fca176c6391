//! The full consistency check.
//!
//! [`FullCheck`] wires the pieces together: it layers the small-store cache
//! over the record access, checks the graph-level record, schedules one
//! [`StoreProcessorTask`] per store through the configured
//! [`TaskExecutionOrder`], runs the orphan scan, and returns the summary.

mod order;
mod processor;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::access::{
    CacheSmallStoresRecordAccess, ChangeSet, ChangeSetRecordAccess, DiffRecordAccess,
    DirectRecordAccess,
};
use crate::checking::{check_neo_store, CheckDecorator, Filter, OwnerCheck};
use crate::error::Result;
use crate::options::CheckOptions;
use crate::progress::{ProgressMonitorFactory, SilentProgress};
use crate::report::{
    ConsistencyReporter, ConsistencySummaryStatistics, MessageConsistencyLogger, RecordReport,
    RecordType, StringLogger,
};
use crate::store::{NeoStoreRecord, RecordKind, StoreAccess};

pub use order::TaskExecutionOrder;
pub use processor::{StoreProcessor, StoreProcessorTask};

/// Filters each store is walked with when it is checked in multiple passes.
/// Together they enable exactly the rules [`Filter::EVERYTHING`] enables.
pub fn store_filters(kind: RecordKind) -> &'static [Filter] {
    match kind {
        RecordKind::Node => &[Filter::PROPERTIES_ONLY, Filter::RELATIONSHIPS_ONLY],
        RecordKind::Relationship => &[
            Filter::NODES_ONLY,
            Filter::PROPERTIES_ONLY,
            Filter::RELATIONSHIPS_ONLY,
        ],
        RecordKind::Property => &[
            Filter::PROPERTIES_ONLY,
            Filter::STRINGS_ONLY,
            Filter::ARRAYS_ONLY,
        ],
        _ => &[Filter::EVERYTHING],
    }
}

/// Checks every store of a database and reports what it finds.
#[derive(Clone)]
pub struct FullCheck {
    options: CheckOptions,
    progress: Arc<dyn ProgressMonitorFactory>,
}

impl FullCheck {
    /// A check with the given options that reports no progress.
    pub fn new(options: CheckOptions) -> Self {
        Self {
            options,
            progress: Arc::new(SilentProgress),
        }
    }

    /// Reports progress of every store part to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressMonitorFactory>) -> Self {
        self.progress = progress;
        self
    }

    /// Options the check runs with.
    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Checks `stores`, rendering every violation into `logger`.
    ///
    /// Returns the summary of a completed run, consistent or not. Any read
    /// failure fails the whole run instead.
    pub fn execute(
        &self,
        stores: &StoreAccess,
        logger: &dyn StringLogger,
    ) -> Result<ConsistencySummaryStatistics> {
        self.run(DirectRecordAccess::new(stores), stores.neo_store(), logger)
    }

    /// Checks `stores` as if `changes` had been applied. Violations on changed
    /// records render both the prior and the changed image.
    pub fn execute_with_changes(
        &self,
        stores: &StoreAccess,
        changes: &ChangeSet,
        logger: &dyn StringLogger,
    ) -> Result<ConsistencySummaryStatistics> {
        let access = ChangeSetRecordAccess::new(DirectRecordAccess::new(stores), changes);
        self.run(access, stores.neo_store(), logger)
    }

    fn run<A: DiffRecordAccess>(
        &self,
        access: A,
        neo_store: Option<&NeoStoreRecord>,
        logger: &dyn StringLogger,
    ) -> Result<ConsistencySummaryStatistics> {
        let started = Instant::now();
        info!(
            order = %self.options.execution_order,
            check_property_owners = self.options.check_property_owners,
            "consistency.full_check.begin"
        );
        let result = self.check(access, neo_store, logger);
        match &result {
            Ok(summary) => {
                if !summary.is_consistent() {
                    logger.log_message(&format!("Inconsistencies found: {summary}"));
                }
                info!(
                    consistent = summary.is_consistent(),
                    errors = summary.total_errors(),
                    warnings = summary.total_warnings(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "consistency.full_check.end"
                );
            }
            Err(err) => warn!(error = %err, "consistency.full_check.incomplete"),
        }
        result
    }

    fn check<A: DiffRecordAccess>(
        &self,
        access: A,
        neo_store: Option<&NeoStoreRecord>,
        logger: &dyn StringLogger,
    ) -> Result<ConsistencySummaryStatistics> {
        let access = CacheSmallStoresRecordAccess::new(access)?;
        let summary = ConsistencySummaryStatistics::new();
        let message_logger = MessageConsistencyLogger::new(logger);
        let reporter = ConsistencyReporter::new(&message_logger, &summary);
        let owners = OwnerCheck::new(self.options.check_property_owners, &access);

        if let Some(record) = neo_store {
            let mut report = RecordReport::new(RecordType::NeoStore, 0, record, None);
            check_neo_store(record, &access, &mut report)?;
            owners.observe_neo_store(record);
            reporter.flush(report);
        }

        let everything = StoreProcessor::new(&[Filter::EVERYTHING], &owners, &reporter);
        let tasks: Vec<StoreProcessorTask<'_>> = RecordKind::ALL
            .into_iter()
            .map(|kind| {
                let processors = store_filters(kind)
                    .iter()
                    .map(|filter| StoreProcessor::new(std::slice::from_ref(filter), &owners, &reporter))
                    .collect();
                StoreProcessorTask::new(kind, processors)
            })
            .collect();

        let progress = self.progress.as_ref();
        self.options
            .execution_order
            .execute(&everything, &tasks, &access, progress)?;
        owners.scan_for_orphan_chains(&access, &reporter, progress)?;

        // Release every borrow of the summary before handing it out.
        drop(tasks);
        drop(everything);
        drop(reporter);
        Ok(summary)
    }
}

impl Default for FullCheck {
    fn default() -> Self {
        Self::new(CheckOptions::default())
    }
}

impl fmt::Debug for FullCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FullCheck")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
