//! Typed rows produced by the normalizer and consumed by the metric calculations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::{ClimateError, Result};

/// One observation of a long form table: `category` is a sector, energy source, year or policy
/// topic and `group` is a party, scenario or pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub category: String,
    pub group: String,
    pub value: Option<f64>,
}

impl ObservationRow {
    pub fn new(category: impl Into<String>, group: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            category: category.into(),
            group: group.into(),
            value,
        }
    }
}

/// How the values of a sheet should be read. The normalizer never converts between units, it
/// only carries the label declared by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Display)]
pub enum ValueUnit {
    /// Already a percentage share
    #[strum(serialize = "%")]
    Percent,
    /// Raw generation volume
    #[strum(serialize = "TWh")]
    Volume,
    /// Emissions in million tonnes CO₂eq
    #[default]
    #[strum(serialize = "백만톤 CO₂eq")]
    MtCo2eq,
    /// Ordinal policy level
    #[strum(serialize = "level")]
    Level,
}

/// A named year-indexed emissions trajectory, either a party projection or a reference
/// (temperature) pathway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathwayCurve {
    pub name: String,
    points: BTreeMap<i32, f64>,
}

impl PathwayCurve {
    /// Builds a curve from points in any order. Repeated years are rejected.
    pub fn new(name: impl Into<String>, points: impl IntoIterator<Item = (i32, f64)>) -> Result<Self> {
        let name = name.into();
        let mut map = BTreeMap::new();
        for (year, emissions) in points {
            if map.insert(year, emissions).is_some() {
                return Err(ClimateError::DuplicateYear {
                    pathway: name,
                    year,
                });
            }
        }
        Ok(Self { name, points: map })
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.points.get(&year).copied()
    }

    /// Points in increasing year order.
    pub fn points(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.points.iter().map(|(year, value)| (*year, *value))
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.points.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Fixed ordinal scale of how much a stated policy strengthens or weakens the status quo.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
)]
pub enum PolicyLevel {
    #[strum(serialize = "완화")]
    Weakened,
    #[strum(serialize = "유지")]
    Maintained,
    #[strum(serialize = "강화(약)")]
    Mild,
    #[strum(serialize = "강화(중)")]
    Moderate,
    #[strum(serialize = "강화(강)")]
    Strong,
}

impl PolicyLevel {
    pub fn score(self) -> i8 {
        match self {
            PolicyLevel::Weakened => -2,
            PolicyLevel::Maintained => 0,
            PolicyLevel::Mild => 1,
            PolicyLevel::Moderate => 2,
            PolicyLevel::Strong => 3,
        }
    }

    pub fn from_score(score: i64) -> Option<Self> {
        match score {
            -2 => Some(PolicyLevel::Weakened),
            0 => Some(PolicyLevel::Maintained),
            1 => Some(PolicyLevel::Mild),
            2 => Some(PolicyLevel::Moderate),
            3 => Some(PolicyLevel::Strong),
            _ => None,
        }
    }

    /// Accepts integral numbers on the scale only; `2.5` or `-1` are not levels.
    pub fn from_value(value: f64) -> Option<Self> {
        if value.fract() != 0.0 || !value.is_finite() {
            return None;
        }
        Self::from_score(value as i64)
    }

    pub fn label(self) -> String {
        self.to_string()
    }
}

/// A party's stated position in one policy topic. Absence of an assessment means the party
/// stated no position, which is different from `PolicyLevel::Maintained`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyAssessment {
    pub category: String,
    pub party: String,
    pub level: PolicyLevel,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn curve_orders_points_by_year() {
        let curve = PathwayCurve::new("A", [(2050, 0.0), (2018, 727.6), (2030, 436.6)]).unwrap();
        assert_eq!(curve.years().collect::<Vec<_>>(), vec![2018, 2030, 2050]);
        assert_eq!(curve.get(2030), Some(436.6));
        assert_eq!(curve.get(2040), None);
    }

    #[test]
    fn curve_rejects_repeated_years() {
        let err = PathwayCurve::new("A", [(2030, 1.0), (2030, 2.0)]).unwrap_err();
        assert!(matches!(err, ClimateError::DuplicateYear { year: 2030, .. }));
    }

    #[test]
    fn policy_levels_are_ordered_by_score() {
        let levels: Vec<PolicyLevel> = PolicyLevel::iter().collect();
        let scores: Vec<i8> = levels.iter().map(|level| level.score()).collect();
        assert_eq!(scores, vec![-2, 0, 1, 2, 3]);
        assert!(PolicyLevel::Weakened < PolicyLevel::Maintained);
        assert!(PolicyLevel::Moderate < PolicyLevel::Strong);
    }

    #[test]
    fn policy_level_rejects_off_scale_values() {
        assert_eq!(PolicyLevel::from_value(3.0), Some(PolicyLevel::Strong));
        assert_eq!(PolicyLevel::from_value(0.0), Some(PolicyLevel::Maintained));
        assert_eq!(PolicyLevel::from_value(-1.0), None);
        assert_eq!(PolicyLevel::from_value(2.5), None);
        assert_eq!(PolicyLevel::from_value(f64::NAN), None);
    }

    #[test]
    fn policy_level_labels_round_trip() {
        assert_eq!(PolicyLevel::Mild.label(), "강화(약)");
        assert_eq!(PolicyLevel::from_str("완화").unwrap(), PolicyLevel::Weakened);
    }
}
