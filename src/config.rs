use crate::{
    error::{GridError, Result},
    executor::{ExecutorConfig, FailurePolicy, OrderingMode},
    record::{GridAxes, GridSize},
};

/// Knobs for one grid-building run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub grid_size:      GridSize,
    pub workers:        usize,
    pub axes:           GridAxes,
    pub ordering:       OrderingMode,
    pub failure_policy: FailurePolicy,
    /// Progress heartbeat interval, in finished grids.
    pub progress_every: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grid_size:      GridSize::default(),
            workers:        5,
            axes:           GridAxes::default(),
            ordering:       OrderingMode::default(),
            failure_policy: FailurePolicy::default(),
            progress_every: 10,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.axes.rows == self.axes.cols {
            return Err(GridError::InvalidAxis(format!(
                "{} used for both rows and columns",
                self.axes.rows
            )));
        }
        Ok(())
    }

    pub fn executor(&self) -> ExecutorConfig {
        ExecutorConfig {
            workers:  self.workers,
            axes:     self.axes,
            policy:   self.failure_policy,
            ordering: self.ordering,
        }
    }
}
