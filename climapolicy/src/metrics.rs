//! Derived metrics: reduction rates against a baseline group, threshold buckets and nearest
//! reference pathway classification.
//!
//! None of the functions here fail. A value that cannot be computed is carried as
//! [`Metric::NotApplicable`] so that the presentation layer renders "n/a" for that cell only.

use std::fmt::Display;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::domain::{ObservationRow, PathwayCurve};
use crate::error::{ClimateError, Result};

/// Rendering of a metric that cannot be computed
pub const NOT_APPLICABLE: &str = "n/a";

/// Why a metric is undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Undefined {
    MissingBaseline,
    NonPositiveBaseline,
    MissingValue,
    NoOverlappingYears,
    NoReferences,
}

/// A derived value, or the reason it is not computable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Metric {
    Value(f64),
    NotApplicable(Undefined),
}

impl Metric {
    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(*v),
            Metric::NotApplicable(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Value(_))
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{v:.1}"),
            Metric::NotApplicable(_) => write!(f, "{NOT_APPLICABLE}"),
        }
    }
}

fn check_operands(value: Option<f64>, baseline: Option<f64>) -> std::result::Result<(f64, f64), Undefined> {
    let baseline = baseline
        .filter(|b| b.is_finite())
        .ok_or(Undefined::MissingBaseline)?;
    if baseline <= 0.0 {
        return Err(Undefined::NonPositiveBaseline);
    }
    let value = value
        .filter(|v| v.is_finite())
        .ok_or(Undefined::MissingValue)?;
    Ok((value, baseline))
}

/// `100 * (1 - value / baseline)`, defined only for a positive baseline.
pub fn reduction_pct(value: Option<f64>, baseline: Option<f64>) -> Metric {
    match check_operands(value, baseline) {
        Ok((value, baseline)) => Metric::Value(100.0 * (1.0 - value / baseline)),
        Err(reason) => Metric::NotApplicable(reason),
    }
}

/// Absolute reduction from the baseline (the middle step of a waterfall).
pub fn absolute_reduction(value: Option<f64>, baseline: Option<f64>) -> Metric {
    match check_operands(value, baseline) {
        Ok((value, baseline)) => Metric::Value(baseline - value),
        Err(reason) => Metric::NotApplicable(reason),
    }
}

/// Reduction rate of one group within one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReductionRate {
    pub category: String,
    pub group: String,
    pub value: Option<f64>,
    pub reduction: Metric,
}

/// Computes the reduction of every non-baseline group against the baseline group of the
/// same category. Categories without a usable baseline still produce one row per group.
pub fn reduction_rates(rows: &[ObservationRow], baseline_group: &str) -> Vec<ReductionRate> {
    rows.iter()
        .filter(|row| row.group != baseline_group)
        .map(|row| {
            let baseline = rows
                .iter()
                .find(|candidate| {
                    candidate.category == row.category && candidate.group == baseline_group
                })
                .and_then(|candidate| candidate.value);
            ReductionRate {
                category: row.category.clone(),
                group: row.group.clone(),
                value: row.value,
                reduction: reduction_pct(row.value, baseline),
            }
        })
        .collect()
}

/// Orders groups with the pinned groups first (in pinned order), then by descending metric.
/// Undefined metrics go last, keeping their input order.
pub fn pinned_then_descending<T, F>(items: Vec<T>, pinned: &[&str], key: F) -> Vec<T>
where
    F: Fn(&T) -> (&str, Metric),
{
    let (mut head, tail): (Vec<T>, Vec<T>) = items
        .into_iter()
        .partition(|item| pinned.contains(&key(item).0));
    head.sort_by_key(|item| pinned.iter().position(|p| *p == key(item).0));
    let sorted_tail = tail.into_iter().sorted_by(|a, b| {
        match (key(a).1.value(), key(b).1.value()) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
    head.extend(sorted_tail);
    head
}

/// One qualitative bucket of a [`Thresholds`] scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub color: String,
}

impl Bucket {
    pub fn new(label: &str, color: &str) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
        }
    }
}

/// Cut points with inclusive lower bounds: a value equal to a cut point belongs to the bucket
/// above it. `n` cut points define `n + 1` buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdsConfig", into = "ThresholdsConfig")]
pub struct Thresholds {
    cut_points: Vec<f64>,
    buckets: Vec<Bucket>,
}

/// Serialized form of [`Thresholds`], validated on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    pub cut_points: Vec<f64>,
    pub buckets: Vec<Bucket>,
}

impl TryFrom<ThresholdsConfig> for Thresholds {
    type Error = ClimateError;

    fn try_from(value: ThresholdsConfig) -> Result<Self> {
        Thresholds::new(value.cut_points, value.buckets)
    }
}

impl From<Thresholds> for ThresholdsConfig {
    fn from(value: Thresholds) -> Self {
        Self {
            cut_points: value.cut_points,
            buckets: value.buckets,
        }
    }
}

impl Default for Thresholds {
    /// A single catch-all bucket.
    fn default() -> Self {
        Self {
            cut_points: Vec::new(),
            buckets: vec![Bucket::new(NOT_APPLICABLE, "#808080")],
        }
    }
}

impl Thresholds {
    pub fn new(cut_points: Vec<f64>, buckets: Vec<Bucket>) -> Result<Self> {
        if buckets.len() != cut_points.len() + 1 {
            return Err(ClimateError::InvalidThresholds(format!(
                "{} cut points need {} buckets, got {}",
                cut_points.len(),
                cut_points.len() + 1,
                buckets.len()
            )));
        }
        if cut_points.iter().any(|c| !c.is_finite()) {
            return Err(ClimateError::InvalidThresholds(
                "cut points must be finite".into(),
            ));
        }
        if cut_points.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ClimateError::InvalidThresholds(format!(
                "cut points must be strictly increasing: {cut_points:?}"
            )));
        }
        Ok(Self {
            cut_points,
            buckets,
        })
    }

    pub fn cut_points(&self) -> &[f64] {
        &self.cut_points
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Index of the bucket holding `value`; `None` for NaN.
    pub fn index(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        Some(self.cut_points.partition_point(|cut| *cut <= value))
    }

    pub fn bucket(&self, value: f64) -> Option<&Bucket> {
        self.index(value).map(|idx| &self.buckets[idx])
    }

    pub fn bucket_metric(&self, metric: Metric) -> Option<&Bucket> {
        metric.value().and_then(|v| self.bucket(v))
    }
}

/// Sum of squared differences over the years present in both curves. `None` when the curves
/// share no year.
pub fn squared_distance(a: &PathwayCurve, b: &PathwayCurve) -> Option<f64> {
    let mut overlap = false;
    let mut sum = 0.0;
    for (year, value) in a.points() {
        if let Some(other) = b.get(year) {
            overlap = true;
            sum += (value - other).powi(2);
        }
    }
    overlap.then_some(sum)
}

/// Outcome of matching a curve against the reference curves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Classification {
    Nearest {
        reference: String,
        distance: f64,
    },
    Undefined,
}

impl Classification {
    pub fn reference(&self) -> Option<&str> {
        match self {
            Classification::Nearest { reference, .. } => Some(reference),
            Classification::Undefined => None,
        }
    }
}

impl Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Nearest { reference, .. } => write!(f, "{reference}"),
            Classification::Undefined => write!(f, "{NOT_APPLICABLE}"),
        }
    }
}

/// Distance of the subject to each reference, in reference order.
pub fn reference_distances(
    subject: &PathwayCurve,
    references: &[PathwayCurve],
) -> Vec<(String, Metric)> {
    references
        .iter()
        .map(|reference| {
            let distance = match squared_distance(subject, reference) {
                Some(d) => Metric::Value(d),
                None => Metric::NotApplicable(Undefined::NoOverlappingYears),
            };
            (reference.name.clone(), distance)
        })
        .collect()
}

/// Picks the reference with the smallest defined distance. `references` must be given in
/// priority order (most ambitious first): ties keep the earlier reference.
pub fn nearest_reference(subject: &PathwayCurve, references: &[PathwayCurve]) -> Classification {
    let mut best: Option<(&str, f64)> = None;
    for reference in references {
        let Some(distance) = squared_distance(subject, reference) else {
            continue;
        };
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((&reference.name, distance)),
        }
    }
    match best {
        Some((reference, distance)) => Classification::Nearest {
            reference: reference.to_string(),
            distance,
        },
        None => Classification::Undefined,
    }
}

/// Reduction between two years of the same curve.
pub fn period_reduction(curve: &PathwayCurve, start: i32, end: i32) -> Metric {
    reduction_pct(curve.get(end), curve.get(start))
}

/// First year whose emissions are at or below `threshold`.
pub fn net_zero_year(curve: &PathwayCurve, threshold: f64) -> Option<i32> {
    curve
        .points()
        .find(|(_, emissions)| *emissions <= threshold)
        .map(|(year, _)| year)
}

/// Whether emissions in `year` are strictly below `limit`. `None` when the curve has no value
/// for that year.
pub fn net_zero_by(curve: &PathwayCurve, year: i32, limit: f64) -> Option<bool> {
    curve.get(year).map(|emissions| emissions < limit)
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn quarters() -> Thresholds {
        Thresholds::new(
            vec![20.0, 40.0, 60.0],
            vec![
                Bucket::new("b0", "red"),
                Bucket::new("b1", "orange"),
                Bucket::new("b2", "yellow"),
                Bucket::new("b3", "green"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn reduction_against_baseline() {
        let metric = reduction_pct(Some(436.6), Some(727.6));
        assert!(approx(metric.value().unwrap(), 39.99450247388675));
        assert!((metric.value().unwrap() - 40.0).abs() < 0.01);
        let metric = reduction_pct(Some(306.5), Some(727.6));
        assert!((metric.value().unwrap() - 57.875).abs() < 0.01);
    }

    #[test]
    fn reduction_is_undefined_without_positive_baseline() {
        assert_eq!(
            reduction_pct(Some(10.0), Some(0.0)),
            Metric::NotApplicable(Undefined::NonPositiveBaseline)
        );
        assert_eq!(
            reduction_pct(Some(10.0), None),
            Metric::NotApplicable(Undefined::MissingBaseline)
        );
        assert_eq!(
            reduction_pct(None, Some(10.0)),
            Metric::NotApplicable(Undefined::MissingValue)
        );
        assert_eq!(
            reduction_pct(Some(10.0), Some(f64::NAN)),
            Metric::NotApplicable(Undefined::MissingBaseline)
        );
        assert_eq!(reduction_pct(Some(1.0), Some(0.0)).to_string(), "n/a");
    }

    #[test]
    fn absolute_reduction_is_baseline_minus_value() {
        assert!(approx(
            absolute_reduction(Some(306.5), Some(727.6)).value().unwrap(),
            421.1
        ));
        assert!(!absolute_reduction(Some(1.0), Some(0.0)).is_defined());
    }

    #[test]
    fn reduction_rates_keep_undefined_rows() {
        let rows = vec![
            ObservationRow::new("총배출", "2018년 기준", Some(727.6)),
            ObservationRow::new("총배출", "A", Some(306.5)),
            ObservationRow::new("수송", "2018년 기준", Some(0.0)),
            ObservationRow::new("수송", "A", Some(50.0)),
            ObservationRow::new("건물", "A", Some(30.0)),
        ];
        let rates = reduction_rates(&rows, "2018년 기준");
        assert_eq!(rates.len(), 3);
        assert!((rates[0].reduction.value().unwrap() - 57.87).abs() < 0.01);
        assert_eq!(
            rates[1].reduction,
            Metric::NotApplicable(Undefined::NonPositiveBaseline)
        );
        assert_eq!(
            rates[2].reduction,
            Metric::NotApplicable(Undefined::MissingBaseline)
        );
    }

    #[test]
    fn bucketing_uses_inclusive_lower_bounds() {
        let scale = quarters();
        assert_eq!(scale.index(19.9), Some(0));
        assert_eq!(scale.index(20.0), Some(1));
        assert_eq!(scale.index(59.99), Some(2));
        assert_eq!(scale.index(60.0), Some(3));
        assert_eq!(scale.index(-5.0), Some(0));
        assert_eq!(scale.index(f64::NAN), None);
        assert_eq!(scale.bucket(45.0).unwrap().label, "b2");
        assert!(scale
            .bucket_metric(Metric::NotApplicable(Undefined::MissingBaseline))
            .is_none());
    }

    #[test]
    fn bucketing_is_monotonic() {
        let scale = quarters();
        let indices: Vec<usize> = (-20..120)
            .map(|v| scale.index(v as f64 * 0.75).unwrap())
            .collect();
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn thresholds_are_validated() {
        let buckets = vec![Bucket::new("a", "x"), Bucket::new("b", "y")];
        assert!(Thresholds::new(vec![10.0, 5.0], buckets.clone()).is_err());
        assert!(Thresholds::new(vec![f64::INFINITY], buckets.clone()).is_err());
        assert!(Thresholds::new(vec![], buckets.clone()).is_err());
        assert!(Thresholds::new(vec![10.0], buckets).is_ok());
    }

    #[test]
    fn thresholds_deserialize_with_validation() {
        let ok: Thresholds = serde_json::from_str(
            r#"{"cut_points":[30.0],"buckets":[{"label":"low","color":"red"},{"label":"high","color":"green"}]}"#,
        )
        .unwrap();
        assert_eq!(ok.cut_points(), &[30.0]);
        let bad = serde_json::from_str::<Thresholds>(
            r#"{"cut_points":[30.0, 10.0],"buckets":[]}"#,
        );
        assert!(bad.is_err());
    }

    fn curve(name: &str, points: &[(i32, f64)]) -> PathwayCurve {
        PathwayCurve::new(name, points.iter().copied()).unwrap()
    }

    #[test]
    fn identical_curve_is_nearest() {
        let references = vec![
            curve("1.5°C 경로", &[(2018, 727.6), (2030, 400.0), (2050, 0.0)]),
            curve("2°C 경로", &[(2018, 727.6), (2030, 500.0), (2050, 100.0)]),
        ];
        let subject = curve("B", &[(2018, 727.6), (2030, 500.0), (2050, 100.0)]);
        match nearest_reference(&subject, &references) {
            Classification::Nearest {
                reference,
                distance,
            } => {
                assert_eq!(reference, "2°C 경로");
                assert_eq!(distance, 0.0);
            }
            Classification::Undefined => panic!("expected a nearest reference"),
        }
    }

    #[test]
    fn classification_ignores_year_order() {
        let references = vec![
            curve("1.5°C 경로", &[(2050, 0.0), (2030, 400.0)]),
            curve("3°C 경로", &[(2030, 600.0), (2050, 300.0)]),
        ];
        let forward = curve("A", &[(2030, 450.0), (2050, 50.0)]);
        let backward = curve("A", &[(2050, 50.0), (2030, 450.0)]);
        assert_eq!(
            nearest_reference(&forward, &references),
            nearest_reference(&backward, &references)
        );
        assert_eq!(
            nearest_reference(&forward, &references).reference(),
            Some("1.5°C 경로")
        );
    }

    #[test]
    fn ties_go_to_the_earlier_reference() {
        let references = vec![
            curve("1.5°C 경로", &[(2030, 400.0)]),
            curve("2°C 경로", &[(2030, 500.0)]),
        ];
        let subject = curve("A", &[(2030, 450.0)]);
        assert_eq!(
            nearest_reference(&subject, &references).reference(),
            Some("1.5°C 경로")
        );
    }

    #[test]
    fn references_without_overlap_are_skipped() {
        let references = vec![
            curve("1.5°C 경로", &[(2040, 100.0)]),
            curve("3°C 경로", &[(2030, 900.0)]),
        ];
        let subject = curve("A", &[(2030, 450.0)]);
        assert_eq!(
            nearest_reference(&subject, &references).reference(),
            Some("3°C 경로")
        );
        let distances = reference_distances(&subject, &references);
        assert!(!distances[0].1.is_defined());
        assert!(approx(distances[1].1.value().unwrap(), 450.0f64.powi(2)));
    }

    #[test]
    fn no_overlap_at_all_is_undefined() {
        let references = vec![curve("1.5°C 경로", &[(2040, 100.0)])];
        let subject = curve("A", &[(2030, 450.0)]);
        assert_eq!(
            nearest_reference(&subject, &references),
            Classification::Undefined
        );
        assert_eq!(nearest_reference(&subject, &[]), Classification::Undefined);
        assert_eq!(Classification::Undefined.to_string(), "n/a");
    }

    #[test]
    fn net_zero_helpers() {
        let c = curve("A", &[(2018, 727.6), (2040, 15.0), (2050, 5.0)]);
        assert_eq!(net_zero_year(&c, 20.0), Some(2040));
        assert_eq!(net_zero_year(&c, 1.0), None);
        assert_eq!(net_zero_by(&c, 2050, 10.0), Some(true));
        assert_eq!(net_zero_by(&c, 2040, 10.0), Some(false));
        assert_eq!(net_zero_by(&c, 2035, 10.0), None);
        assert!((period_reduction(&c, 2018, 2050).value().unwrap() - 99.3128).abs() < 1e-3);
        assert!(!period_reduction(&c, 2030, 2050).is_defined());
    }

    #[test]
    fn pinned_groups_come_first() {
        let items = vec![
            ("A", Metric::Value(40.0)),
            ("2030 NDC", Metric::Value(40.0)),
            ("B", Metric::NotApplicable(Undefined::MissingValue)),
            ("C", Metric::Value(60.0)),
            ("2018년 기준", Metric::Value(0.0)),
        ];
        let ordered = pinned_then_descending(items, &["2018년 기준", "2030 NDC"], |item| {
            (item.0, item.1)
        });
        let names: Vec<&str> = ordered.iter().map(|item| item.0).collect();
        assert_eq!(names, vec!["2018년 기준", "2030 NDC", "C", "A", "B"]);
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(mean([1.0, 2.0, 3.0]), Some(2.0));
    }
}
