use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::{
    error::{GridError, Result},
    extents::Extents,
    grid::{Grid, GridBuilder},
    partition::Partition,
    pool::{CancelToken, Progress, TaskOutcome, WorkerPool},
    record::GridAxes,
};

/// What happens when one partition's grid cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop dispatching, discard everything, return the first failure.
    #[default]
    FailFast,
    /// Log the failure, leave that date out, keep going.
    SkipAndContinue,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "fail-fast" | "fail_fast" => Ok(FailurePolicy::FailFast),
            "skip" | "skip-and-continue" => Ok(FailurePolicy::SkipAndContinue),
            other => Err(format!("unknown failure policy '{other}'")),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailurePolicy::FailFast        => "fail-fast",
            FailurePolicy::SkipAndContinue => "skip",
        })
    }
}

/// Order of the grids handed back by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingMode {
    /// Whatever order workers finish in.
    #[default]
    Completion,
    /// Sorted by date key.
    Chronological,
}

impl FromStr for OrderingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "completion"    => Ok(OrderingMode::Completion),
            "chronological" => Ok(OrderingMode::Chronological),
            other => Err(format!("unknown ordering '{other}'")),
        }
    }
}

impl fmt::Display for OrderingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderingMode::Completion    => "completion",
            OrderingMode::Chronological => "chronological",
        })
    }
}

/// A grid together with the date it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatedGrid {
    pub date: String,
    pub grid: Grid,
}

/// A partition whose grid could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionFailure {
    pub date:   String,
    pub reason: String,
}

/// Result of one executor run.
#[derive(Debug, Clone)]
pub struct GridRun {
    pub grids:    Vec<DatedGrid>,
    pub failures: Vec<PartitionFailure>,
    pub policy:   FailurePolicy,
    pub ordering: OrderingMode,
}

impl GridRun {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Bare grid sequence, in the run's ordering.
    pub fn into_grids(self) -> Vec<Grid> {
        self.grids.into_iter().map(|g| g.grid).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    pub workers:  usize,
    pub axes:     GridAxes,
    pub policy:   FailurePolicy,
    pub ordering: OrderingMode,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers:  5,
            axes:     GridAxes::default(),
            policy:   FailurePolicy::default(),
            ordering: OrderingMode::default(),
        }
    }
}

/// Drives the grid builder over every partition on a bounded pool.
pub struct GridExecutor {
    pool:   WorkerPool,
    config: ExecutorConfig,
}

impl GridExecutor {
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        Ok(Self { pool: WorkerPool::new(config.workers)?, config })
    }

    /// Build one grid per partition. `extents` must already cover the whole
    /// record set; it is only read from here on.
    pub fn run(
        &self,
        extents:    &Extents,
        partitions: Vec<Partition<'_>>,
        progress:   &dyn Progress,
        cancel:     &CancelToken,
    ) -> Result<GridRun> {
        let builder = GridBuilder::new(extents, self.config.axes);
        let total = partitions.len();
        info!(
            partitions = total,
            workers = self.pool.workers(),
            policy = %self.config.policy,
            ordering = %self.config.ordering,
            "building grids"
        );

        // fail-fast trips this without touching the caller's token
        let abort = CancelToken::new();
        let policy = self.config.policy;

        let items = partitions.into_iter().map(|p| (p.date.to_string(), p)).collect();
        let outcomes = self.pool.map_unordered(
            items,
            |date, partition| {
                if abort.is_cancelled() {
                    return Err(GridError::Cancelled);
                }
                debug!(date = %date, records = partition.len(), "building grid");
                let res = builder.build(&partition);
                if res.is_err() && policy == FailurePolicy::FailFast {
                    abort.cancel();
                }
                res
            },
            progress,
            cancel,
        );

        let mut grids = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Done(date, Ok(grid)) => grids.push(DatedGrid { date, grid }),
                TaskOutcome::Done(_, Err(GridError::Cancelled)) | TaskOutcome::Cancelled(_) => {}
                TaskOutcome::Done(date, Err(e)) => failures.push(PartitionFailure {
                    date,
                    reason: failure_reason(e),
                }),
                TaskOutcome::Panicked(date, reason) => failures.push(PartitionFailure { date, reason }),
            }
        }

        if cancel.is_cancelled() {
            return Err(GridError::Cancelled);
        }
        match policy {
            FailurePolicy::FailFast => {
                if let Some(first) = failures.into_iter().next() {
                    return Err(GridError::TaskFailure { date: first.date, reason: first.reason });
                }
                failures = Vec::new();
            }
            FailurePolicy::SkipAndContinue => {
                for f in &failures {
                    warn!(date = %f.date, reason = %f.reason, "skipped partition");
                }
            }
        }

        if self.config.ordering == OrderingMode::Chronological {
            sort_chronologically(&mut grids);
        }

        info!(built = grids.len(), failed = failures.len(), "grids done");
        Ok(GridRun {
            grids,
            failures,
            policy,
            ordering: self.config.ordering,
        })
    }
}

fn failure_reason(e: GridError) -> String {
    match e {
        GridError::TaskFailure { reason, .. } => reason,
        other => other.to_string(),
    }
}

/// Sort by parsed day, falling back to the raw key for anything unparseable.
pub fn sort_chronologically(grids: &mut [DatedGrid]) {
    grids.sort_by_cached_key(|g| {
        (NaiveDate::parse_from_str(&g.date, "%Y-%m-%d").ok(), g.date.clone())
    });
}
