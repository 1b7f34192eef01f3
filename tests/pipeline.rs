use std::{
    cell::RefCell,
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use event_grids::{
    build_grids,
    ingest::{load_records, resolve_inputs, IngestConfig},
    partition_by_date,
    sink::{write_grids, SinkFormat},
    CancelToken, EventRecord, ExecutorConfig, Extents, FailurePolicy, Grid, GridError,
    GridExecutor, GridSize, NoProgress, OrderingMode, PipelineConfig,
};

fn day_records(days: u32, per_day: u32) -> Vec<EventRecord> {
    let mut out = Vec::new();
    for d in 1..=days {
        for k in 0..per_day {
            let t = f64::from(k * 7 + d) / f64::from(per_day * 7 + days);
            out.push(EventRecord::new(
                41.6 + 0.4 * t,
                -87.9 + 0.4 * (1.0 - t),
                format!("2018-{:02}-{:02}", 1 + d / 28, 1 + d % 28),
            ));
        }
    }
    out
}

fn config(n: i64) -> PipelineConfig {
    PipelineConfig { grid_size: GridSize::new(n).unwrap(), workers: 4, ..PipelineConfig::default() }
}

#[test]
fn csv_to_grids_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Crimes_-_2018.csv");
    std::fs::write(
        &input,
        "\
ID,Date,Primary Type,Latitude,Longitude
1,01/01/2018 01:00:00 AM,THEFT,0,0
2,01/01/2018 05:00:00 PM,THEFT,0,5
3,01/02/2018 09:00:00 AM,THEFT,10,0
4,01/02/2018 10:00:00 AM,BATTERY,5,2
5,01/03/2018 10:00:00 AM,THEFT,,2
",
    )
    .unwrap();

    let inputs = resolve_inputs(input.to_str().unwrap()).unwrap();
    let (records, stats) = load_records(&inputs, &IngestConfig::default()).unwrap();
    assert_eq!(stats.kept, 3);

    let cfg = PipelineConfig { ordering: OrderingMode::Chronological, ..config(2) };
    let run = build_grids(&records, &cfg, &NoProgress, &CancelToken::new()).unwrap();
    assert!(run.is_complete());

    let dates: Vec<_> = run.grids.iter().map(|g| g.date.as_str()).collect();
    assert_eq!(dates, ["2018-01-01", "2018-01-02"]);
    assert_eq!(run.grids[0].grid.to_nested(), vec![vec![1, 0], vec![0, 0]]);
    assert_eq!(run.grids[1].grid.total(), 0);
    assert_eq!(run.clone().into_grids()[0].get(0, 0), 1);

    let out = dir.path().join("matrices.csv");
    write_grids(&out, SinkFormat::Csv, &run.grids).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().count(), 1 + 2 * 2);
    assert!(text.starts_with("date,row,c0,c1"));
}

#[test]
fn repeated_runs_agree_as_multisets() {
    let records = day_records(40, 25);
    let cfg = config(16);

    let tally = |grids: Vec<event_grids::DatedGrid>| {
        let mut m: HashMap<(String, Grid), usize> = HashMap::new();
        for g in grids {
            *m.entry((g.date, g.grid)).or_default() += 1;
        }
        m
    };
    let a = build_grids(&records, &cfg, &NoProgress, &CancelToken::new()).unwrap();
    let b = build_grids(&records, &cfg, &NoProgress, &CancelToken::new()).unwrap();
    assert_eq!(a.grids.len(), 40);
    assert_eq!(tally(a.grids), tally(b.grids));
}

#[test]
fn one_grid_per_date_and_progress_reaches_total() {
    let records = day_records(12, 10);
    let calls = RefCell::new(Vec::new());
    let progress = |done: usize, total: usize| calls.borrow_mut().push((done, total));

    let run = build_grids(&records, &config(8), &progress, &CancelToken::new()).unwrap();
    assert_eq!(run.grids.len(), 12);
    assert_eq!(run.policy, FailurePolicy::FailFast);
    assert_eq!(run.ordering, OrderingMode::Completion);

    let calls = calls.into_inner();
    assert_eq!(calls.len(), 12);
    assert_eq!(calls.last(), Some(&(12, 12)));
}

#[test]
fn skip_policy_reports_failed_dates() {
    let mut records = day_records(6, 5);
    let ext = Extents::compute(&records, GridSize::new(4).unwrap()).unwrap();
    records.push(EventRecord::new(f64::NAN, -87.7, "2018-01-03"));

    let exec = GridExecutor::new(ExecutorConfig {
        workers: 3,
        policy: FailurePolicy::SkipAndContinue,
        ordering: OrderingMode::Chronological,
        ..ExecutorConfig::default()
    })
    .unwrap();
    let run = exec
        .run(&ext, partition_by_date(&records), &NoProgress, &CancelToken::new())
        .unwrap();

    assert_eq!(run.grids.len(), 5);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].date, "2018-01-03");
    assert!(run.grids.iter().all(|g| g.date != "2018-01-03"));
    assert!(run.grids.windows(2).all(|w| w[0].date < w[1].date));
}

#[test]
fn fail_fast_returns_the_task_failure() {
    let mut records = day_records(6, 5);
    let ext = Extents::compute(&records, GridSize::new(4).unwrap()).unwrap();
    records.push(EventRecord::new(41.8, f64::INFINITY, "2018-01-04"));

    let exec = GridExecutor::new(ExecutorConfig { workers: 2, ..ExecutorConfig::default() }).unwrap();
    let err = exec
        .run(&ext, partition_by_date(&records), &NoProgress, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, GridError::TaskFailure { ref date, .. } if date == "2018-01-04"));
}

#[test]
fn cancelled_run_is_reported() {
    let records = day_records(20, 5);
    let cancel = CancelToken::new();
    let seen = AtomicUsize::new(0);
    let progress = |_: usize, _: usize| {
        if seen.fetch_add(1, Ordering::SeqCst) == 2 {
            cancel.cancel();
        }
    };

    let err = build_grids(&records, &config(4), &progress, &cancel).unwrap_err();
    assert!(matches!(err, GridError::Cancelled));
}

#[test]
fn empty_input_and_bad_size_are_fatal() {
    let err = build_grids(&[], &config(4), &NoProgress, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, GridError::EmptyInput));
    assert!(matches!(GridSize::new(0), Err(GridError::InvalidGridSize(0))));
}

#[test]
fn raw_sink_writes_header_and_cells() {
    let records = day_records(3, 4);
    let run = build_grids(&records, &config(3), &NoProgress, &CancelToken::new()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("matrices.bin");
    write_grids(&out, SinkFormat::Raw, &run.grids).unwrap();
    let bytes = std::fs::read(&out).unwrap();

    assert_eq!(&bytes[..4], b"EGRD");
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 3);
    // each grid: u16 + 10-byte date + two u32 dims + 9 u32 cells
    assert_eq!(bytes.len(), 8 + 3 * (2 + 10 + 8 + 36));
}
