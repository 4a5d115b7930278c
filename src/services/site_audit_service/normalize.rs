use crate::models::{NormalizedMetric, NormalizedReport, RawAuditReport};
use crate::utils::Clock;
use std::collections::BTreeMap;

/// Score recorded when neither an aggregate nor any metric score exists.
pub const MISSING_SCORE: i64 = 0;

/// Reduces a raw report to the recognized `metrics`.
///
/// Metrics absent from `raw.audits` are left out of `results`. The overall
/// score is the engine aggregate when the report has one, otherwise the mean
/// of the extracted metric scores, otherwise [`MISSING_SCORE`]. Rounding is
/// half-up.
pub fn normalize<S: AsRef<str>>(
    raw: &RawAuditReport,
    metrics: &[S],
    clock: &dyn Clock,
) -> NormalizedReport {
    let results: BTreeMap<String, NormalizedMetric> = metrics
        .iter()
        .filter_map(|name| {
            let name: &str = name.as_ref();
            raw.audits
                .get(name)
                .map(|audit| (name.to_string(), NormalizedMetric::from(audit)))
        })
        .collect();

    let score = raw
        .aggregate_score()
        .or_else(|| mean_score(&results))
        .map(round_half_up)
        .unwrap_or(MISSING_SCORE);

    NormalizedReport {
        score,
        date: clock.now(),
        results,
    }
}

fn mean_score(results: &BTreeMap<String, NormalizedMetric>) -> Option<f64> {
    let scores: Vec<f64> = results.values().filter_map(|m| m.score).collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
