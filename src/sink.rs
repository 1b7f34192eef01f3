use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    str::FromStr,
};

use csv::WriterBuilder;
use tracing::info;

use crate::{
    error::{GridError, Result},
    executor::DatedGrid,
};

pub const RAW_MAGIC: &[u8; 4] = b"EGRD";

/// Destination for a finished grid collection.
pub trait GridSink {
    fn write(&mut self, grids: &[DatedGrid]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkFormat {
    #[default]
    Csv,
    Raw,
}

impl FromStr for SinkFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(SinkFormat::Csv),
            "raw" | "bin" => Ok(SinkFormat::Raw),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// One CSV row per grid row: `date,row,c0,c1,...`.
pub struct CsvGridSink<W: Write> {
    out: W,
}

impl<W: Write> CsvGridSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> GridSink for CsvGridSink<W> {
    fn write(&mut self, grids: &[DatedGrid]) -> Result<()> {
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(&mut self.out);
        let size = grids.first().map_or(0, |g| g.grid.size());

        let mut header = vec!["date".to_string(), "row".to_string()];
        header.extend((0..size).map(|j| format!("c{j}")));
        wtr.write_record(&header)?;

        for g in grids {
            for (i, row) in g.grid.rows().enumerate() {
                let mut fields = Vec::with_capacity(row.len() + 2);
                fields.push(g.date.clone());
                fields.push(i.to_string());
                fields.extend(row.iter().map(u32::to_string));
                wtr.write_record(&fields)?;
            }
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Little-endian binary: magic, grid count, then per grid the date and a
/// `width, height, cells` block.
pub struct RawGridSink<W: Write> {
    out: W,
}

impl<W: Write> RawGridSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> GridSink for RawGridSink<W> {
    fn write(&mut self, grids: &[DatedGrid]) -> Result<()> {
        let count = u32::try_from(grids.len()).map_err(|_| too_large("grid count"))?;
        self.out.write_all(RAW_MAGIC)?;
        self.out.write_all(&count.to_le_bytes())?;

        for g in grids {
            let date = g.date.as_bytes();
            let date_len = u16::try_from(date.len()).map_err(|_| too_large("date key"))?;
            let side = u32::try_from(g.grid.size()).map_err(|_| too_large("grid size"))?;

            self.out.write_all(&date_len.to_le_bytes())?;
            self.out.write_all(date)?;
            self.out.write_all(&side.to_le_bytes())?;
            self.out.write_all(&side.to_le_bytes())?;
            for &cell in g.grid.cells() {
                self.out.write_all(&cell.to_le_bytes())?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

fn too_large(what: &str) -> GridError {
    GridError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("{what} does not fit the raw format"),
    ))
}

/// Write `grids` to `path` in `format`.
pub fn write_grids(path: &Path, format: SinkFormat, grids: &[DatedGrid]) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let mut sink: Box<dyn GridSink> = match format {
        SinkFormat::Csv => Box::new(CsvGridSink::new(file)),
        SinkFormat::Raw => Box::new(RawGridSink::new(file)),
    };
    sink.write(grids)?;
    info!(path = %path.display(), grids = grids.len(), "grids written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn sample() -> Vec<DatedGrid> {
        vec![
            DatedGrid {
                date: "2018-01-01".into(),
                grid: Grid::from_rows(&[vec![1, 0], vec![0, 2]]).unwrap(),
            },
            DatedGrid {
                date: "2018-01-02".into(),
                grid: Grid::from_rows(&[vec![0, 0], vec![3, 0]]).unwrap(),
            },
        ]
    }

    #[test]
    fn csv_sink_writes_one_line_per_row() {
        let mut buf = Vec::new();
        CsvGridSink::new(&mut buf).write(&sample()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "date,row,c0,c1",
                "2018-01-01,0,1,0",
                "2018-01-01,1,0,2",
                "2018-01-02,0,0,0",
                "2018-01-02,1,3,0",
            ]
        );
    }

    #[test]
    fn raw_sink_layout() {
        let mut buf = Vec::new();
        RawGridSink::new(&mut buf).write(&sample()).unwrap();

        assert_eq!(&buf[..4], RAW_MAGIC);
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 2);
        assert_eq!(u16::from_le_bytes(buf[8..10].try_into().unwrap()), 10);
        assert_eq!(&buf[10..20], b"2018-01-01");
        assert_eq!(u32::from_le_bytes(buf[20..24].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(buf[24..28].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(buf[28..32].try_into().unwrap()), 1);
        // header + 2 × (2 + 10 + 8 + 16)
        assert_eq!(buf.len(), 8 + 2 * 36);
    }
}
