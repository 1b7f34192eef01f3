use std::{fmt, str::FromStr};

use crate::error::{GridError, Result};

/// One filtered event: where it happened and on which day.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub latitude:  f64,
    pub longitude: f64,
    /// Day-granularity key, `%Y-%m-%d` when produced by the ingest step.
    pub date:      String,
}

impl EventRecord {
    pub fn new(latitude: f64, longitude: f64, date: impl Into<String>) -> Self {
        Self { latitude, longitude, date: date.into() }
    }

    /// Coordinate of this record along `axis`.
    pub fn coord(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Latitude  => self.latitude,
            Axis::Longitude => self.longitude,
        }
    }
}

/// A coordinate column that can be bounded and binned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Latitude, Axis::Longitude];

    /// Column name as it appears in the source data.
    pub fn column(self) -> &'static str {
        match self {
            Axis::Latitude  => "Latitude",
            Axis::Longitude => "Longitude",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Axis {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latitude"  | "lat" => Ok(Axis::Latitude),
            "longitude" | "lon" => Ok(Axis::Longitude),
            _ => Err(GridError::InvalidAxis(s.to_string())),
        }
    }
}

/// Which axis indexes the grid rows (`i`) and which the columns (`j`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridAxes {
    pub rows: Axis,
    pub cols: Axis,
}

impl GridAxes {
    pub fn new(rows: Axis, cols: Axis) -> Result<Self> {
        if rows == cols {
            return Err(GridError::InvalidAxis(format!("{rows} used for both rows and columns")));
        }
        Ok(Self { rows, cols })
    }
}

impl Default for GridAxes {
    fn default() -> Self {
        Self { rows: Axis::Latitude, cols: Axis::Longitude }
    }
}

/// Side length of every grid in a run. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize(usize);

impl GridSize {
    pub fn new(n: i64) -> Result<Self> {
        if n <= 0 {
            return Err(GridError::InvalidGridSize(n));
        }
        usize::try_from(n)
            .map(GridSize)
            .map_err(|_| GridError::InvalidGridSize(n))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for GridSize {
    fn default() -> Self {
        GridSize(64)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
