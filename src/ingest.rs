use std::{
    io::Read,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use glob::glob;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{
    error::{GridError, Result},
    record::EventRecord,
};

/// Column names and the category to keep.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub latitude_column:  String,
    pub longitude_column: String,
    pub date_column:      String,
    pub category_column:  String,
    pub category:         String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            latitude_column:  "Latitude".into(),
            longitude_column: "Longitude".into(),
            date_column:      "Date".into(),
            category_column:  "Primary Type".into(),
            category:         "THEFT".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows_read:    usize,
    pub incomplete:   usize,
    pub filtered_out: usize,
    pub kept:         usize,
}

/// Positions of the four columns we care about.
struct Columns {
    lat:      usize,
    lon:      usize,
    date:     usize,
    category: usize,
}

impl Columns {
    fn locate(headers: &StringRecord, cfg: &IngestConfig) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| GridError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            lat:      find(cfg.latitude_column.as_str())?,
            lon:      find(cfg.longitude_column.as_str())?,
            date:     find(cfg.date_column.as_str())?,
            category: find(cfg.category_column.as_str())?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────
// Input discovery
// ─────────────────────────────────────────────────────────────────────
/// Expand a directory, glob pattern or single file into a sorted list of CSVs.
pub fn resolve_inputs(arg: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(arg);
    let mut v: Vec<PathBuf> = if path.is_dir() {
        WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect()
    } else if path.exists() {
        vec![path.to_path_buf()]
    } else {
        glob(arg)?.filter_map(|r| r.ok()).collect()
    };
    v.sort();
    Ok(v)
}

// ─────────────────────────────────────────────────────────────────────
// CSV → records
// ─────────────────────────────────────────────────────────────────────
/// Read, clean and filter every input file, then sort by date.
pub fn load_records(paths: &[PathBuf], cfg: &IngestConfig) -> Result<(Vec<EventRecord>, IngestStats)> {
    let mut records = Vec::new();
    let mut stats = IngestStats::default();
    for path in paths {
        debug!(path = %path.display(), "reading");
        let file = std::fs::File::open(path)?;
        read_records(file, cfg, &mut records, &mut stats)?;
    }
    records.sort_by(|a, b| a.date.cmp(&b.date));
    info!(
        rows = stats.rows_read,
        incomplete = stats.incomplete,
        filtered = stats.filtered_out,
        kept = stats.kept,
        "records loaded"
    );
    Ok((records, stats))
}

/// Append the usable rows of one CSV stream to `out`.
pub fn read_records<R: Read>(
    reader: R,
    cfg:    &IngestConfig,
    out:    &mut Vec<EventRecord>,
    stats:  &mut IngestStats,
) -> Result<()> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let cols = Columns::locate(rdr.headers()?, cfg)?;

    for result in rdr.records() {
        let rec = result?;
        stats.rows_read += 1;

        let Some(event) = parse_row(&rec, &cols) else {
            stats.incomplete += 1;
            continue;
        };
        if rec[cols.category].trim() != cfg.category {
            stats.filtered_out += 1;
            continue;
        }
        out.push(event);
        stats.kept += 1;
    }
    Ok(())
}

/// `None` when any field is blank or a needed field does not parse.
fn parse_row(rec: &StringRecord, cols: &Columns) -> Option<EventRecord> {
    let needed = [cols.lat, cols.lon, cols.date, cols.category];
    if needed.iter().any(|&i| i >= rec.len()) || rec.iter().any(|f| f.trim().is_empty()) {
        return None;
    }
    let latitude: f64 = rec[cols.lat].trim().parse().ok()?;
    let longitude: f64 = rec[cols.lon].trim().parse().ok()?;
    if !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    let date = normalize_date(&rec[cols.date])?;
    Some(EventRecord { latitude, longitude, date })
}

/// Cut a timestamp down to its day and re-emit it as `%Y-%m-%d`.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    let date = NaiveDate::parse_from_str(day, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(day, "%Y-%m-%d"))
        .ok()?;
    Some(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
ID,Date,Primary Type,Latitude,Longitude
1,01/02/2018 11:00:00 PM,THEFT,41.80,-87.60
2,01/01/2018 12:00:00 AM,THEFT,41.90,-87.70
3,01/01/2018 01:30:00 AM,BATTERY,41.85,-87.65
4,01/03/2018 09:00:00 AM,THEFT,,-87.61
5,garbage,THEFT,41.81,-87.62
6,01/03/2018 09:00:00 AM,THEFT,NaN,-87.61
";

    #[test]
    fn normalize_date_handles_both_layouts() {
        assert_eq!(normalize_date("01/02/2018 11:00:00 PM").as_deref(), Some("2018-01-02"));
        assert_eq!(normalize_date("2018-03-04T10:00:00").as_deref(), Some("2018-03-04"));
        assert_eq!(normalize_date("12/31/2017").as_deref(), Some("2017-12-31"));
        assert_eq!(normalize_date("soon"), None);
    }

    #[test]
    fn read_records_drops_and_filters() {
        let mut out = Vec::new();
        let mut stats = IngestStats::default();
        read_records(SAMPLE.as_bytes(), &IngestConfig::default(), &mut out, &mut stats).unwrap();

        assert_eq!(stats, IngestStats { rows_read: 6, incomplete: 3, filtered_out: 1, kept: 2 });
        assert_eq!(out[0], EventRecord::new(41.80, -87.60, "2018-01-02"));
        assert_eq!(out[1].date, "2018-01-01");
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "Date,Latitude,Longitude\n01/01/2018,1,2\n";
        let err = read_records(
            csv.as_bytes(),
            &IngestConfig::default(),
            &mut Vec::new(),
            &mut IngestStats::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GridError::MissingColumn(c) if c == "Primary Type"));
    }

    #[test]
    fn load_records_sorts_by_date_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, SAMPLE).unwrap();
        std::fs::write(
            &b,
            "Primary Type,Date,Latitude,Longitude\nTHEFT,12/31/2017 10:00:00 PM,41.7,-87.5\n",
        )
        .unwrap();

        let inputs = resolve_inputs(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(inputs, vec![a.clone(), b.clone()]);

        let (recs, stats) = load_records(&inputs, &IngestConfig::default()).unwrap();
        assert_eq!(stats.kept, 3);
        let dates: Vec<_> = recs.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, ["2017-12-31", "2018-01-01", "2018-01-02"]);
    }

    #[test]
    fn resolve_inputs_expands_globs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["x_2.csv", "x_1.csv", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/x_*.csv", dir.path().display());
        let found = resolve_inputs(&pattern).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("x_1.csv"));
    }
}
