use dashmap::DashMap;
use rayon::prelude::*;

use crate::record::EventRecord;

/// All records sharing one date key. Borrowed from the record set.
#[derive(Debug, Clone)]
pub struct Partition<'a> {
    pub date:    &'a str,
    pub records: Vec<&'a EventRecord>,
}

impl<'a> Partition<'a> {
    pub fn new(date: &'a str, records: Vec<&'a EventRecord>) -> Self {
        Self { date, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Group records by date. Partitions come back in no particular order, and
/// records inside a partition are not ordered either.
pub fn partition_by_date(records: &[EventRecord]) -> Vec<Partition<'_>> {
    let groups: DashMap<&str, Vec<&EventRecord>> = DashMap::new();
    records
        .par_iter()
        .for_each(|rec| groups.entry(rec.date.as_str()).or_default().push(rec));

    groups
        .into_iter()
        .map(|(date, records)| Partition::new(date, records))
        .collect()
}
