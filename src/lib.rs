//! Turn dated lat/lon event records into one N×N count grid per day.
//!
//! The flow is load → extents → partition by date → parallel grid build →
//! sink. Extents are global: every grid in a run shares the same bounds and
//! bin widths, so cell `(i, j)` means the same place on every day.

pub mod config;
pub mod error;
pub mod executor;
pub mod extents;
pub mod grid;
pub mod ingest;
pub mod partition;
pub mod pipeline;
pub mod pool;
pub mod record;
pub mod sink;

pub use config::PipelineConfig;
pub use error::{GridError, Result};
pub use executor::{
    DatedGrid, ExecutorConfig, FailurePolicy, GridExecutor, GridRun, OrderingMode, PartitionFailure,
};
pub use extents::{AxisExtent, Extents};
pub use grid::{build_grid, BinEdges, Grid, GridBuilder};
pub use partition::{partition_by_date, Partition};
pub use pipeline::build_grids;
pub use pool::{CancelToken, LogProgress, NoProgress, Progress, TaskOutcome, WorkerPool};
pub use record::{Axis, EventRecord, GridAxes, GridSize};
