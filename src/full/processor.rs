use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::debug;

use crate::access::DiffRecordAccess;
use crate::checking::{check_record, CheckDecorator, Filter, KindSet, RuleSet};
use crate::error::{ConsistencyError, Result, StoreError};
use crate::progress::{ProgressListener, ProgressMonitorFactory};
use crate::report::{ConsistencyReporter, RecordReport, RecordType};
use crate::store::{Record, RecordKind};

/// Records between two progress updates.
const PROGRESS_BATCH: u64 = 1024;

/// Streams a store through the rules of a set of filters.
///
/// Every used record is checked against the union of the rules its filters
/// enable for the record's kind, then handed to the decorator. Unused records
/// are skipped; references to them are caught from the referencing side.
pub struct StoreProcessor<'a> {
    filters: Vec<Filter>,
    targets: KindSet,
    decorator: &'a dyn CheckDecorator,
    reporter: &'a ConsistencyReporter<'a>,
}

impl<'a> StoreProcessor<'a> {
    /// Composes a processor from `filters`.
    pub fn new(
        filters: &[Filter],
        decorator: &'a dyn CheckDecorator,
        reporter: &'a ConsistencyReporter<'a>,
    ) -> Self {
        Self {
            filters: filters.to_vec(),
            targets: Filter::combined_targets(filters),
            decorator,
            reporter,
        }
    }

    /// Filters this processor was composed from.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Rules applied to records of `kind`.
    pub fn rules_for(&self, kind: RecordKind) -> RuleSet {
        self.filters
            .iter()
            .fold(RuleSet::EMPTY, |rules, filter| rules.union(filter.rules_for(kind)))
    }

    /// Checks every record of `kind`, from id zero up to the high id.
    ///
    /// Stops with [`ConsistencyError::Aborted`] once `abort` is raised, and with
    /// [`ConsistencyError::Incomplete`] on the first failed read.
    pub fn apply_filtering_processor(
        &self,
        kind: RecordKind,
        access: &dyn DiffRecordAccess,
        listener: &dyn ProgressListener,
        abort: &AtomicBool,
    ) -> Result<u64> {
        let rules = self.rules_for(kind);
        let high_id = access.high_id(kind);
        let mut checked = 0;
        let mut pending = 0;
        for id in 0..high_id {
            if abort.load(Ordering::Relaxed) {
                listener.add(pending);
                return Err(ConsistencyError::Aborted);
            }
            if let Some(record) = access.current_record(kind, id)? {
                if record.in_use() {
                    self.process(&record, rules, access)?;
                    checked += 1;
                }
            }
            pending += 1;
            if pending == PROGRESS_BATCH {
                listener.add(pending);
                pending = 0;
            }
        }
        listener.add(pending);
        Ok(checked)
    }

    fn process(
        &self,
        record: &Record,
        rules: RuleSet,
        access: &dyn DiffRecordAccess,
    ) -> std::result::Result<(), StoreError> {
        let prior = access.prior_record(record.kind(), record.id())?;
        let mut report = RecordReport::new(
            RecordType::from(record.kind()),
            record.id(),
            record,
            prior.as_ref().map(|p| p as &dyn fmt::Display),
        );
        check_record(record, rules, access, &mut report)?;
        self.decorator.observe(record, self.targets);
        self.reporter.flush(report);
        Ok(())
    }
}

impl fmt::Debug for StoreProcessor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreProcessor")
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}

/// The work scheduled for one store: a pass with a shared processor, or one
/// pass per filtered processor of its own.
pub struct StoreProcessorTask<'a> {
    kind: RecordKind,
    processors: Vec<StoreProcessor<'a>>,
}

impl<'a> StoreProcessorTask<'a> {
    /// A task over the store of `kind` with its filtered processors.
    pub fn new(kind: RecordKind, processors: Vec<StoreProcessor<'a>>) -> Self {
        Self { kind, processors }
    }

    /// Store this task walks.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// The task's own filtered processors, one per pass.
    pub fn processors(&self) -> &[StoreProcessor<'a>] {
        &self.processors
    }

    /// Walks the store once with `processor`.
    pub fn run_single_pass(
        &self,
        processor: &StoreProcessor<'_>,
        access: &dyn DiffRecordAccess,
        progress: &dyn ProgressMonitorFactory,
        abort: &AtomicBool,
    ) -> Result<()> {
        self.run(std::slice::from_ref(processor), access, progress, abort)
    }

    /// Walks the store once per filtered processor.
    pub fn run_multi_pass(
        &self,
        access: &dyn DiffRecordAccess,
        progress: &dyn ProgressMonitorFactory,
        abort: &AtomicBool,
    ) -> Result<()> {
        self.run(&self.processors, access, progress, abort)
    }

    fn run(
        &self,
        processors: &[StoreProcessor<'_>],
        access: &dyn DiffRecordAccess,
        progress: &dyn ProgressMonitorFactory,
        abort: &AtomicBool,
    ) -> Result<()> {
        let high_id = access.high_id(self.kind);
        let listener = progress.part(
            &format!("{} store", self.kind),
            high_id.saturating_mul(processors.len() as u64),
        );
        let started = Instant::now();
        debug!(
            store = %self.kind,
            high_id,
            passes = processors.len(),
            "consistency.task.begin"
        );
        let mut outcome = Ok(0u64);
        for processor in processors {
            outcome = processor.apply_filtering_processor(self.kind, access, &*listener, abort);
            if outcome.is_err() {
                break;
            }
        }
        listener.done();
        match outcome {
            Ok(checked) => {
                debug!(
                    store = %self.kind,
                    checked,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "consistency.task.end"
                );
                Ok(())
            }
            Err(err) => {
                debug!(store = %self.kind, error = %err, "consistency.task.failed");
                Err(err)
            }
        }
    }
}
