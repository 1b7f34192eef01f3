use crate::{
    error::{GridError, Result},
    extents::{AxisExtent, Extents},
    partition::Partition,
    record::{GridAxes, GridSize},
};

/// Square count grid stored in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    size:  usize,
    cells: Vec<u32>,
}

impl Grid {
    pub fn zeros(size: GridSize) -> Self {
        let n = size.get();
        Self { size: n, cells: vec![0; n * n] }
    }

    /// Build from nested rows. Returns `None` unless the rows form a square.
    pub fn from_rows(rows: &[Vec<u32>]) -> Option<Self> {
        let n = rows.len();
        if n == 0 || rows.iter().any(|r| r.len() != n) {
            return None;
        }
        Some(Self { size: n, cells: rows.concat() })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> u32 {
        self.cells[i * self.size + j]
    }

    pub fn row(&self, i: usize) -> &[u32] {
        &self.cells[i * self.size..(i + 1) * self.size]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.cells.chunks(self.size)
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Number of records that landed in some cell.
    pub fn total(&self) -> u64 {
        self.cells.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn to_nested(&self) -> Vec<Vec<u32>> {
        self.rows().map(<[u32]>::to_vec).collect()
    }
}

/// `N + 1` bin boundaries along one axis.
///
/// Edges are accumulated from `min` by repeated addition of `step`, never
/// past `max`, and the final edge is pinned to the global `max`. Every bin
/// is half-open, the last one included, so a value equal to `max` falls in
/// no bin.
#[derive(Debug, Clone)]
pub struct BinEdges {
    edges: Vec<f64>,
}

impl BinEdges {
    pub fn new(extent: &AxisExtent, size: GridSize) -> Self {
        let n = size.get();
        let mut edges = Vec::with_capacity(n + 1);
        let mut end = extent.min;
        edges.push(end);
        for _ in 0..n {
            end += extent.step;
            edges.push(end.min(extent.max));
        }
        edges[n] = extent.max;
        Self { edges }
    }

    pub fn bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// `[start, end)` of bin `k`.
    pub fn bounds(&self, k: usize) -> (f64, f64) {
        (self.edges[k], self.edges[k + 1])
    }

    /// Index `k` with `edges[k] <= v < edges[k + 1]`, if any.
    pub fn bin(&self, v: f64) -> Option<usize> {
        // edges are non-decreasing, so this is the count of edges <= v
        let above = self.edges.partition_point(|&e| e <= v);
        if above == 0 || above > self.bins() {
            None
        } else {
            Some(above - 1)
        }
    }
}

/// Row and column edges for one run, built once from the frozen extents.
#[derive(Debug, Clone)]
pub struct GridBuilder {
    axes: GridAxes,
    size: GridSize,
    rows: BinEdges,
    cols: BinEdges,
}

impl GridBuilder {
    pub fn new(extents: &Extents, axes: GridAxes) -> Self {
        Self {
            axes,
            size: extents.size,
            rows: BinEdges::new(extents.axis(axes.rows), extents.size),
            cols: BinEdges::new(extents.axis(axes.cols), extents.size),
        }
    }

    pub fn axes(&self) -> GridAxes {
        self.axes
    }

    pub fn row_edges(&self) -> &BinEdges {
        &self.rows
    }

    pub fn col_edges(&self) -> &BinEdges {
        &self.cols
    }

    /// Count one partition's records per cell.
    pub fn build(&self, partition: &Partition<'_>) -> Result<Grid> {
        let mut grid = Grid::zeros(self.size);
        if partition.is_empty() {
            return Ok(grid);
        }

        let n = self.size.get();
        for rec in &partition.records {
            let r = rec.coord(self.axes.rows);
            let c = rec.coord(self.axes.cols);
            if !r.is_finite() || !c.is_finite() {
                return Err(GridError::TaskFailure {
                    date:   partition.date.to_string(),
                    reason: format!(
                        "non-finite coordinate (lat {}, lon {})",
                        rec.latitude, rec.longitude
                    ),
                });
            }
            if let (Some(i), Some(j)) = (self.rows.bin(r), self.cols.bin(c)) {
                grid.cells[i * n + j] += 1;
            }
        }
        Ok(grid)
    }
}

/// One-off build without keeping the edges around.
pub fn build_grid(extents: &Extents, axes: GridAxes, partition: &Partition<'_>) -> Result<Grid> {
    GridBuilder::new(extents, axes).build(partition)
}
