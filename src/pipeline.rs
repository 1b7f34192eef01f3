use std::time::Instant;

use tracing::info;

use crate::{
    config::PipelineConfig,
    error::Result,
    executor::{GridExecutor, GridRun},
    extents::Extents,
    partition::partition_by_date,
    pool::{CancelToken, Progress},
    record::EventRecord,
};

/// Run `f` and log how long it took.
pub fn timeit<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let t0 = Instant::now();
    let out = f();
    info!(phase = label, elapsed = ?t0.elapsed(), "phase finished");
    out
}

/// Extents, then partitions, then the parallel build.
///
/// Extents are computed over all of `records` and frozen before the first
/// grid task is dispatched.
pub fn build_grids(
    records:  &[EventRecord],
    config:   &PipelineConfig,
    progress: &dyn Progress,
    cancel:   &CancelToken,
) -> Result<GridRun> {
    config.validate()?;

    let extents = timeit("extents", || Extents::compute(records, config.grid_size))?;
    info!(
        lat_min = extents.latitude.min,
        lat_max = extents.latitude.max,
        lat_step = extents.latitude.step,
        lon_min = extents.longitude.min,
        lon_max = extents.longitude.max,
        lon_step = extents.longitude.step,
        "extents"
    );

    let partitions = timeit("partition", || partition_by_date(records));
    info!(dates = partitions.len(), "partitioned records");

    let executor = GridExecutor::new(config.executor())?;
    timeit("build", || executor.run(&extents, partitions, progress, cancel))
}
