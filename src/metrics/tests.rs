use super::*;
use crate::error::MetricsError;

const EPSILON: f64 = 1e-9;

fn approx_eq(left: f64, right: f64) -> bool {
    (left - right).abs() < EPSILON
}

fn trend_snapshot(sink: &MetricSink, name: &str) -> Result<TrendSnapshot, String> {
    match sink.snapshot(name) {
        Some(MetricSnapshot::Trend(trend)) => Ok(trend),
        Some(other) => Err(format!("Expected trend for {}, got {:?}", name, other.kind())),
        None => Err(format!("Missing snapshot for {}", name)),
    }
}

#[test]
fn counter_sums_values() -> Result<(), String> {
    let sink = MetricSink::new();
    let counter = sink.counter("pizzas").map_err(|err| err.to_string())?;
    counter.increment(&Tags::new());
    counter.add(2.5, &Tags::new());

    match sink.snapshot("pizzas") {
        Some(MetricSnapshot::Counter(snapshot)) => {
            if !approx_eq(snapshot.count, 3.5) || snapshot.samples != 2 {
                return Err(format!("Unexpected counter snapshot: {:?}", snapshot));
            }
            Ok(())
        }
        other => Err(format!("Unexpected snapshot: {:?}", other)),
    }
}

#[test]
fn rate_counts_true_observations() -> Result<(), String> {
    let sink = MetricSink::new();
    let rate = sink.rate("errors").map_err(|err| err.to_string())?;
    for passed in [true, false, false, false] {
        rate.add(passed, &Tags::new());
    }

    match sink.snapshot("errors") {
        Some(MetricSnapshot::Rate(snapshot)) => {
            if snapshot.passes != 1 || snapshot.fails() != 3 || !approx_eq(snapshot.rate(), 0.25) {
                return Err(format!("Unexpected rate snapshot: {:?}", snapshot));
            }
            Ok(())
        }
        other => Err(format!("Unexpected snapshot: {:?}", other)),
    }
}

#[test]
fn gauge_keeps_last_value_and_bounds() -> Result<(), String> {
    let sink = MetricSink::new();
    let gauge = sink.gauge("queue").map_err(|err| err.to_string())?;
    for value in [5.0, 1.0, 9.0, 3.0] {
        gauge.set(value, &Tags::new());
    }

    match sink.snapshot("queue") {
        Some(MetricSnapshot::Gauge(snapshot)) => {
            if !approx_eq(snapshot.value, 3.0)
                || !approx_eq(snapshot.min, 1.0)
                || !approx_eq(snapshot.max, 9.0)
            {
                return Err(format!("Unexpected gauge snapshot: {:?}", snapshot));
            }
            Ok(())
        }
        other => Err(format!("Unexpected snapshot: {:?}", other)),
    }
}

#[test]
fn trend_aggregates_and_ranks() -> Result<(), String> {
    let sink = MetricSink::new();
    let trend = sink.trend("latency").map_err(|err| err.to_string())?;
    for value in [40.0, 10.0, 30.0, 20.0] {
        trend.add(value, &Tags::new());
    }
    let snapshot = trend_snapshot(&sink, "latency")?;

    if snapshot.count() != 4 {
        return Err(format!("Expected 4 values, got {}", snapshot.count()));
    }
    if !approx_eq(snapshot.avg(), 25.0) {
        return Err(format!("Unexpected avg {}", snapshot.avg()));
    }
    if !approx_eq(snapshot.min(), 10.0) || !approx_eq(snapshot.max(), 40.0) {
        return Err("Unexpected min/max".to_owned());
    }
    if !approx_eq(snapshot.med(), 25.0) {
        return Err(format!("Unexpected median {}", snapshot.med()));
    }
    // rank ceil(0.9 * 4) - 1 = 3
    if !approx_eq(snapshot.percentile(90.0), 40.0) {
        return Err(format!("Unexpected p90 {}", snapshot.percentile(90.0)));
    }
    Ok(())
}

#[test]
fn percentile_uses_ceiling_rank() -> Result<(), String> {
    let snapshot = TrendSnapshot::from_values(&[15.0, 20.0, 35.0, 40.0, 50.0]);
    let cases = [
        (0.0, 15.0),
        (5.0, 15.0),
        (30.0, 20.0),
        (40.0, 20.0),
        (50.0, 35.0),
        (100.0, 50.0),
    ];
    for (p, expected) in cases {
        let actual = snapshot.percentile(p);
        if !approx_eq(actual, expected) {
            return Err(format!("p{} expected {} got {}", p, expected, actual));
        }
    }

    let tens: Vec<f64> = (1..=10).map(f64::from).collect();
    let snapshot = TrendSnapshot::from_values(&tens);
    for (p, expected) in [(90.0, 9.0), (91.0, 10.0), (95.0, 10.0), (99.0, 10.0)] {
        let actual = snapshot.percentile(p);
        if !approx_eq(actual, expected) {
            return Err(format!("p{} of 1..=10 expected {} got {}", p, expected, actual));
        }
    }
    if !approx_eq(snapshot.med(), 5.5) {
        return Err(format!("Median of 1..=10 should be 5.5, got {}", snapshot.med()));
    }
    Ok(())
}

#[test]
fn percentiles_are_monotonic() -> Result<(), String> {
    let values: Vec<f64> = (1..=200).map(|value| f64::from(value % 37) * 3.5).collect();
    let snapshot = TrendSnapshot::from_values(&values);

    let p90 = snapshot.percentile(90.0);
    let p95 = snapshot.percentile(95.0);
    let p99 = snapshot.percentile(99.0);
    if !(p99 >= p95 && p95 >= p90 && p90 >= snapshot.avg()) {
        return Err(format!(
            "Expected p99 >= p95 >= p90 >= avg, got {} {} {} {}",
            p99,
            p95,
            p90,
            snapshot.avg()
        ));
    }

    let mut previous = snapshot.percentile(0.0);
    for p in 1..=100 {
        let current = snapshot.percentile(f64::from(p));
        if current < previous {
            return Err(format!("p{} dropped below previous percentile", p));
        }
        previous = current;
    }
    Ok(())
}

#[test]
fn trend_sorting_is_deferred_to_snapshot() -> Result<(), String> {
    let sink = MetricSink::new();
    let trend = sink.trend("ordered").map_err(|err| err.to_string())?;
    trend.add(3.0, &Tags::new());
    let first = trend_snapshot(&sink, "ordered")?;
    trend.add(1.0, &Tags::new());
    let second = trend_snapshot(&sink, "ordered")?;

    if !approx_eq(first.min(), 3.0) || !approx_eq(second.min(), 1.0) {
        return Err("Snapshots should reflect values at query time".to_owned());
    }
    if !approx_eq(second.percentile(0.0), 1.0) {
        return Err("Snapshot should be sorted".to_owned());
    }
    Ok(())
}

#[test]
fn kind_mismatch_is_rejected() -> Result<(), String> {
    let sink = MetricSink::new();
    match sink.trend(names::HTTP_REQS) {
        Err(MetricsError::KindMismatch {
            existing: MetricKind::Counter,
            requested: MetricKind::Trend,
            ..
        }) => Ok(()),
        Err(err) => Err(format!("Unexpected error: {}", err)),
        Ok(_) => Err("Expected kind mismatch".to_owned()),
    }
}

#[test]
fn invalid_metric_names_are_rejected() -> Result<(), String> {
    let sink = MetricSink::new();
    if sink.counter("").is_ok() {
        return Err("Empty name should fail".to_owned());
    }
    if sink.counter("bad name").is_ok() {
        return Err("Name with space should fail".to_owned());
    }
    Ok(())
}

#[test]
fn unrecorded_metrics_have_no_snapshot() -> Result<(), String> {
    let sink = MetricSink::new();
    if sink.snapshot(names::HTTP_REQ_DURATION).is_some() {
        return Err("Built-in metric without samples should have no snapshot".to_owned());
    }
    if sink.snapshot("never_seen").is_some() {
        return Err("Unknown metric should have no snapshot".to_owned());
    }
    if !sink.snapshot_all().is_empty() {
        return Err("snapshot_all should skip empty series".to_owned());
    }
    Ok(())
}

#[test]
fn record_accepts_samples() -> Result<(), String> {
    let sink = MetricSink::new();
    let samples = vec![
        Sample::new(MetricKind::Counter, "custom_total", 2.0, Tags::new()),
        Sample::rate("custom_ok", true, Tags::new()),
    ];
    sink.record_all(&samples).map_err(|err| err.to_string())?;

    if sink.kind_of("custom_total") != Some(MetricKind::Counter) {
        return Err("custom_total should be a counter".to_owned());
    }
    if sink.kind_of("custom_ok") != Some(MetricKind::Rate) {
        return Err("custom_ok should be a rate".to_owned());
    }
    let bad = Sample::new(MetricKind::Trend, "custom_total", 1.0, Tags::new());
    if sink.record(&bad).is_ok() {
        return Err("Recording a trend into a counter should fail".to_owned());
    }
    Ok(())
}

#[test]
fn submetrics_only_see_matching_tags() -> Result<(), String> {
    let selector: MetricSelector = "http_req_duration{status:200}"
        .parse()
        .map_err(|err: crate::error::ThresholdError| err.to_string())?;
    let sink = MetricSink::with_submetrics(vec![selector.clone()]);

    let mut ok = Tags::new();
    ok.insert("status".to_owned(), "200".to_owned());
    ok.insert("method".to_owned(), "GET".to_owned());
    let mut failed = Tags::new();
    failed.insert("status".to_owned(), "500".to_owned());

    let samples = vec![
        Sample::new(MetricKind::Trend, names::HTTP_REQ_DURATION, 10.0, ok),
        Sample::new(MetricKind::Trend, names::HTTP_REQ_DURATION, 90.0, failed),
    ];
    sink.record_all(&samples).map_err(|err| err.to_string())?;

    let parent = trend_snapshot(&sink, names::HTTP_REQ_DURATION)?;
    let child = trend_snapshot(&sink, &selector.to_string())?;
    if parent.count() != 2 || child.count() != 1 || !approx_eq(child.max(), 10.0) {
        return Err("Submetric should only contain matching samples".to_owned());
    }
    Ok(())
}

#[test]
fn selector_parsing_normalizes() -> Result<(), String> {
    let selector: MetricSelector = " http_req_duration{ status : 200 , method:GET }"
        .parse()
        .map_err(|err: crate::error::ThresholdError| err.to_string())?;
    if selector.to_string() != "http_req_duration{method:GET,status:200}" {
        return Err(format!("Unexpected canonical form {}", selector));
    }
    for bad in ["", "name{", "name{}", "{a:b}", "name{a}", "name}"] {
        if bad.parse::<MetricSelector>().is_ok() {
            return Err(format!("Selector '{}' should be rejected", bad));
        }
    }
    Ok(())
}

#[test]
fn concurrent_records_are_not_lost() -> Result<(), String> {
    const WRITERS: usize = 16;
    const PER_WRITER: usize = 2_000;

    let sink = MetricSink::new();
    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let sink = sink.clone();
            std::thread::spawn(move || -> Result<(), String> {
                let trend = sink.trend("shared").map_err(|err| err.to_string())?;
                let counter = sink.counter("shared_total").map_err(|err| err.to_string())?;
                let tags = Tags::new();
                for idx in 0..PER_WRITER {
                    trend.add((writer * PER_WRITER + idx) as f64, &tags);
                    counter.increment(&tags);
                }
                Ok(())
            })
        })
        .collect();
    for handle in handles {
        handle
            .join()
            .map_err(|_| "writer thread panicked".to_owned())??;
    }

    let trend = trend_snapshot(&sink, "shared")?;
    if trend.count() != WRITERS * PER_WRITER {
        return Err(format!("Lost trend samples: {}", trend.count()));
    }
    match sink.snapshot("shared_total") {
        Some(MetricSnapshot::Counter(counter)) if counter.samples == (WRITERS * PER_WRITER) as u64 => {
            Ok(())
        }
        other => Err(format!("Unexpected counter snapshot: {:?}", other)),
    }
}

#[test]
fn snapshots_sort_a_copy_of_the_series() -> Result<(), String> {
    const WRITES: usize = 5_000;

    let mut state = SeriesState::new(MetricKind::Trend);
    for value in [3.0, 1.0, 2.0] {
        state.add(value);
    }
    match state.clone().into_snapshot() {
        Some(MetricSnapshot::Trend(trend)) if approx_eq(trend.percentile(0.0), 1.0) => {}
        other => return Err(format!("Unexpected snapshot: {:?}", other)),
    }
    match &state {
        SeriesState::Trend { values, .. } if values.as_slice() == [3.0, 1.0, 2.0] => {}
        other => return Err(format!("Live values were reordered: {:?}", other)),
    }
    if SeriesState::new(MetricKind::Trend).into_snapshot().is_some() {
        return Err("Empty series should have no snapshot".to_owned());
    }

    let sink = MetricSink::new();
    let trend = sink.trend("busy").map_err(|err| err.to_string())?;
    let writer = std::thread::spawn(move || {
        for idx in 0..WRITES {
            trend.add(idx as f64, &Tags::new());
        }
    });
    let mut last_count = 0;
    while !writer.is_finished() {
        if let Some(MetricSnapshot::Trend(snapshot)) = sink.snapshot("busy") {
            if snapshot.count() < last_count {
                return Err("Snapshot count went backwards".to_owned());
            }
            last_count = snapshot.count();
        }
    }
    writer.join().map_err(|_| "writer thread panicked".to_owned())?;
    let finished = trend_snapshot(&sink, "busy")?;
    if finished.count() != WRITES || !approx_eq(finished.max(), (WRITES - 1) as f64) {
        return Err(format!("Lost samples during snapshots: {}", finished.count()));
    }
    Ok(())
}

#[test]
fn sink_clones_share_state() -> Result<(), String> {
    let sink = MetricSink::new();
    let clone = sink.clone();
    let counter = clone.counter("shared_clone").map_err(|err| err.to_string())?;
    counter.increment(&Tags::new());
    if sink.snapshot("shared_clone").is_none() {
        return Err("Clone should write to the same registry".to_owned());
    }
    Ok(())
}
