// RawSleuth - core/stats.rs
//
// Statistics aggregator: reduces the raw observations of one table entry to
// an `Aggregate`. Pure computation, no I/O.
//
// Numeric classification is all-or-nothing: one unparsable non-empty value
// turns the whole entry categorical and its numeric sample is dropped.

use crate::core::model::{Aggregate, NumericSummary};
use std::collections::HashSet;

/// Aggregate a sequence of raw observations.
///
/// `None` entries are ignored entirely. Returns `None` when nothing
/// informative remains (no values, or only empty strings).
pub fn aggregate<'a, I>(values: I) -> Option<Aggregate>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut first_value: Option<&str> = None;
    let mut count = 0usize;
    let mut distinct: HashSet<&str> = HashSet::new();
    let mut sample: Option<Vec<f64>> = Some(Vec::new());

    for value in values.into_iter().flatten() {
        first_value.get_or_insert(value);
        distinct.insert(value);
        if value.is_empty() {
            continue;
        }
        count += 1;

        if let Some(numbers) = sample.as_mut() {
            match parse_number(value) {
                Some(n) => numbers.push(n),
                None => sample = None,
            }
        }
    }

    if count == 0 {
        return None;
    }

    Some(Aggregate {
        first_value: first_value.unwrap_or_default().to_string(),
        count,
        distinct_count: distinct.len(),
        summary: sample.and_then(|numbers| summarize(&numbers)),
    })
}

/// Aggregate the value list of an observation table entry.
pub fn aggregate_strings(values: &[String]) -> Option<Aggregate> {
    aggregate(values.iter().map(|v| Some(v.as_str())))
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

/// Descriptive statistics of a numeric sample. `None` for an empty sample.
pub fn summarize(sample: &[f64]) -> Option<NumericSummary> {
    if sample.is_empty() {
        return None;
    }

    let mut sorted = sample.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mean = mean(&sorted);
    let sd = if sorted.len() > 1 {
        let sum_sq: f64 = sorted.iter().map(|x| (x - mean).powi(2)).sum();
        let sum_dev: f64 = sorted.iter().map(|x| x - mean).sum();
        ((sum_sq - sum_dev * sum_dev / n) / (n - 1.0)).sqrt()
    } else {
        0.0
    };

    Some(NumericSummary {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean,
        median: percentile(&sorted, 50.0),
        sd,
        q1: percentile(&sorted, 25.0),
        q3: percentile(&sorted, 75.0),
    })
}

/// Arithmetic mean with a second correction pass for rounding error.
fn mean(sample: &[f64]) -> f64 {
    let n = sample.len() as f64;
    let naive = sample.iter().sum::<f64>() / n;
    let correction = sample.iter().map(|x| x - naive).sum::<f64>() / n;
    naive + correction
}

/// `p`-th percentile (0 < p <= 100) of an ascending, non-empty sample.
///
/// Linear interpolation between order statistics at position
/// `p * (n + 1) / 100`, clamped to the smallest and largest value.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }

    let pos = p * (n as f64 + 1.0) / 100.0;
    if pos < 1.0 {
        return sorted[0];
    }
    if pos >= n as f64 {
        return sorted[n - 1];
    }

    let floor = pos.floor();
    let frac = pos - floor;
    let lower = sorted[floor as usize - 1];
    let upper = sorted[floor as usize];
    lower + frac * (upper - lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numeric_with_empty_value() {
        let agg = aggregate_strings(&strings(&["1.0", "2.0", "", "3.0"])).unwrap();
        assert!(agg.is_numeric());
        assert_eq!(agg.count, 3);
        assert_eq!(agg.distinct_count, 4);
        assert_eq!(agg.first_value, "1.0");

        let s = agg.summary.unwrap();
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.median, 2.0);
        assert_eq!(s.sd, 1.0);
    }

    #[test]
    fn test_categorical_values() {
        let agg = aggregate_strings(&strings(&["a", "b", "a"])).unwrap();
        assert!(!agg.is_numeric());
        assert!(agg.summary.is_none());
        assert_eq!(agg.count, 3);
        assert_eq!(agg.distinct_count, 2);
        assert_eq!(agg.first_value, "a");
    }

    #[test]
    fn test_uninformative_values_produce_nothing() {
        assert!(aggregate(vec![Some(""), Some(""), None]).is_none());
        assert!(aggregate(Vec::<Option<&str>>::new()).is_none());
        assert!(aggregate(vec![None, None]).is_none());
    }

    #[test]
    fn test_nulls_are_ignored() {
        let agg = aggregate(vec![None, Some("5"), None, Some("7")]).unwrap();
        assert_eq!(agg.count, 2);
        assert_eq!(agg.first_value, "5");
        assert_eq!(agg.summary.unwrap().mean, 6.0);
    }

    #[test]
    fn test_first_value_may_be_empty() {
        let agg = aggregate_strings(&strings(&["", "4"])).unwrap();
        assert_eq!(agg.first_value, "");
        assert_eq!(agg.count, 1);
        assert_eq!(agg.distinct_count, 2);
        assert!(agg.is_numeric());
    }

    #[test]
    fn test_late_text_flips_to_categorical() {
        let agg = aggregate_strings(&strings(&["1", "2", "3", "Off"])).unwrap();
        assert!(agg.summary.is_none());
        assert_eq!(agg.count, 4);
    }

    #[test]
    fn test_single_value() {
        let agg = aggregate_strings(&strings(&["21.5"])).unwrap();
        let s = agg.summary.unwrap();
        assert_eq!(s.min, 21.5);
        assert_eq!(s.max, 21.5);
        assert_eq!(s.mean, 21.5);
        assert_eq!(s.median, 21.5);
        assert_eq!(s.q1, 21.5);
        assert_eq!(s.q3, 21.5);
        assert_eq!(s.sd, 0.0);
    }

    #[test]
    fn test_scientific_notation_and_whitespace() {
        let agg = aggregate_strings(&strings(&["1e-5", " 2E-5 "])).unwrap();
        let s = agg.summary.unwrap();
        assert_eq!(s.min, 1e-5);
        assert_eq!(s.max, 2e-5);
    }

    #[test]
    fn test_quartiles_interpolate() {
        // n = 4: q1 at position 1.25, q3 at 3.75.
        let s = summarize(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!((s.q1 - 1.25).abs() < 1e-12);
        assert!((s.median - 2.5).abs() < 1e-12);
        assert!((s.q3 - 3.75).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_clamps_to_extremes() {
        let sorted = [10.0, 20.0];
        // position 0.75 and 2.25
        assert_eq!(percentile(&sorted, 25.0), 10.0);
        assert_eq!(percentile(&sorted, 75.0), 20.0);
    }

    #[test]
    fn test_sample_standard_deviation() {
        let s = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(s.mean, 5.0);
        assert!((s.sd - 2.138089935299395).abs() < 1e-12);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_none());
    }
}
