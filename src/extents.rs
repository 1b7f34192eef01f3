use crate::{
    error::{GridError, Result},
    record::{Axis, EventRecord, GridSize},
};

/// Global bounds and bin width along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisExtent {
    pub min:  f64,
    pub max:  f64,
    pub step: f64,
}

impl AxisExtent {
    /// One pass over `records` for a single axis.
    pub fn compute(records: &[EventRecord], axis: Axis, size: GridSize) -> Result<Self> {
        let mut coords = records.iter().map(|r| r.coord(axis));
        let first = coords.next().ok_or(GridError::EmptyInput)?;
        let (min, max) = coords.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Ok(Self::from_bounds(min, max, size))
    }

    pub fn from_bounds(min: f64, max: f64, size: GridSize) -> Self {
        Self { min, max, step: (max - min) / size.get() as f64 }
    }
}

/// Frozen bounds shared read-only by every grid build in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub latitude:  AxisExtent,
    pub longitude: AxisExtent,
    pub size:      GridSize,
}

impl Extents {
    /// Bounds over the whole filtered record set. Must finish before any grid is built.
    pub fn compute(records: &[EventRecord], size: GridSize) -> Result<Self> {
        if records.is_empty() {
            return Err(GridError::EmptyInput);
        }
        Ok(Self {
            latitude:  AxisExtent::compute(records, Axis::Latitude, size)?,
            longitude: AxisExtent::compute(records, Axis::Longitude, size)?,
            size,
        })
    }

    pub fn axis(&self, axis: Axis) -> &AxisExtent {
        match axis {
            Axis::Latitude  => &self.latitude,
            Axis::Longitude => &self.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected() {
        let size = GridSize::new(4).unwrap();
        assert!(matches!(Extents::compute(&[], size), Err(GridError::EmptyInput)));
        assert!(matches!(AxisExtent::compute(&[], Axis::Latitude, size), Err(GridError::EmptyInput)));
    }

    #[test]
    fn single_record_has_zero_width() {
        let recs = vec![EventRecord::new(41.8, -87.6, "2018-01-01")];
        let ext = Extents::compute(&recs, GridSize::new(8).unwrap()).unwrap();
        assert_eq!(ext.latitude.min, 41.8);
        assert_eq!(ext.latitude.max, 41.8);
        assert_eq!(ext.latitude.step, 0.0);
        assert_eq!(ext.axis(Axis::Longitude).min, -87.6);
    }
}
