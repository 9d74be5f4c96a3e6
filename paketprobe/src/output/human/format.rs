use std::time::Duration;

use paketprobe_core::cache::{CacheStatus, RecordCounts, RequestOutcome};

pub(crate) fn format_ms(ms: f64) -> String {
    if ms.is_finite() {
        format!("{ms:.2}ms")
    } else {
        "n/a".to_string()
    }
}

pub(crate) fn format_duration(d: Duration) -> String {
    humantime::format_duration(d).to_string()
}

pub(crate) fn format_percent(v: f64) -> String {
    format!("{v:.1}%")
}

pub(crate) fn format_counts(counts: Option<RecordCounts>) -> String {
    match counts {
        Some(c) => format!("{}/{}", c.returned, c.total),
        None => "-".to_string(),
    }
}

/// Header text as received; recognized values are shown normalized.
pub(crate) fn format_cache_status(outcome: &RequestOutcome) -> String {
    match outcome.cache_status {
        CacheStatus::Unknown => outcome.cache_status_raw.clone(),
        status => status.to_string(),
    }
}

/// One line per request, printed as soon as it is recorded.
pub(crate) fn format_outcome_line(outcome: &RequestOutcome, total: u32) -> String {
    let seq = outcome.sequence_number;
    if outcome.status_code == 0 {
        let error = outcome.error.as_deref().unwrap_or("transport failure");
        return format!(
            "request {seq}/{total}: ERROR after {} ({error})",
            format_ms(outcome.latency_ms)
        );
    }

    format!(
        "request {seq}/{total}: status={} cache={} latency={} records={} ttl={} key={}",
        outcome.status_code,
        format_cache_status(outcome),
        format_ms(outcome.latency_ms),
        format_counts(outcome.record_counts),
        outcome.cache_ttl,
        outcome.cache_key
    )
}

/// Fixed-width table of every outcome, in request order.
pub(crate) fn format_outcome_table(outcomes: &[RequestOutcome]) -> String {
    const HEADERS: [&str; 7] = ["#", "status", "cache", "latency", "records", "ttl", "key"];

    let rows: Vec<[String; 7]> = outcomes
        .iter()
        .map(|o| {
            [
                o.sequence_number.to_string(),
                if o.status_code == 0 {
                    "-".to_string()
                } else {
                    o.status_code.to_string()
                },
                format_cache_status(o),
                format_ms(o.latency_ms),
                format_counts(o.record_counts),
                o.cache_ttl.clone(),
                o.cache_key.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(str::to_string), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 7], widths: &[usize; 7]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| format!("{cell:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}
