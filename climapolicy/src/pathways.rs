//! Temperature pathways: party projections compared with the reference curves.

use itertools::Itertools;
use log::warn;
use serde::Serialize;

use crate::config::{Config, Period, ReferencePathway};
use crate::domain::PathwayCurve;
use crate::error::Result;
use crate::metrics::{
    nearest_reference, net_zero_by, net_zero_year, period_reduction, pinned_then_descending,
    reference_distances, Classification, Metric, NOT_APPLICABLE,
};
use crate::transform::LongTable;

/// How one party projection relates to the reference curves.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathwayAnalysis {
    pub party: String,
    pub nearest: Classification,
    /// Squared distance to each reference, in priority order
    pub distances: Vec<(String, Metric)>,
    pub compliance: String,
    /// `None` when the projection has no value for the net-zero year
    pub net_zero: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReduction {
    pub pathway: String,
    pub period: Period,
    pub reduction: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetZero {
    pub pathway: String,
    /// First year at or below the net-zero threshold
    pub year: Option<i32>,
    pub emissions_at_target_year: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Pathways {
    table: LongTable,
    curves: Vec<PathwayCurve>,
    reference_names: Vec<String>,
    reference_pathways: Vec<ReferencePathway>,
    net_zero_year: i32,
    net_zero_limit: f64,
    net_zero_threshold: f64,
    periods: Vec<Period>,
}

fn parse_year(category: &str) -> Option<i32> {
    category
        .trim()
        .trim_end_matches('년')
        .parse::<f64>()
        .ok()
        .filter(|year| year.fract() == 0.0)
        .map(|year| year as i32)
}

impl Pathways {
    pub fn new(table: LongTable, config: &Config) -> Result<Self> {
        let rows = table.observations()?;
        let mut curves = Vec::new();
        let groups: Vec<&str> = rows.iter().map(|row| row.group.as_str()).unique().collect();
        for name in groups {
            let points = rows
                .iter()
                .filter(|row| row.group == name)
                .filter_map(|row| match (parse_year(&row.category), row.value) {
                    (Some(year), Some(value)) => Some((year, value)),
                    (None, _) => {
                        warn!("Pathway '{name}' has a row with year '{}'", row.category);
                        None
                    }
                    (Some(_), None) => None,
                });
            curves.push(PathwayCurve::new(name, points)?);
        }

        let names: Vec<&str> = curves.iter().map(|curve| curve.name.as_str()).collect();
        let reference_names = config
            .reference_pathways
            .iter()
            .map(|reference| reference.name.as_str())
            .filter(|name| names.contains(name))
            .chain(names.iter().copied().filter(|name| {
                name.contains(&config.reference_marker)
                    && !config
                        .reference_pathways
                        .iter()
                        .any(|reference| reference.name == *name)
            }))
            .map(String::from)
            .collect();

        Ok(Self {
            table,
            curves,
            reference_names,
            reference_pathways: config.reference_pathways.clone(),
            net_zero_year: config.net_zero_year,
            net_zero_limit: config.net_zero_limit,
            net_zero_threshold: config.net_zero_threshold,
            periods: config.periods.clone(),
        })
    }

    pub fn table(&self) -> &LongTable {
        &self.table
    }

    /// Every curve in authored order.
    pub fn curves(&self) -> &[PathwayCurve] {
        &self.curves
    }

    pub fn curve(&self, name: &str) -> Option<&PathwayCurve> {
        self.curves.iter().find(|curve| curve.name == name)
    }

    pub fn is_reference(&self, name: &str) -> bool {
        self.reference_names.iter().any(|reference| reference == name)
    }

    /// Reference curves in priority order.
    pub fn references(&self) -> Vec<PathwayCurve> {
        self.reference_names
            .iter()
            .filter_map(|name| self.curve(name).cloned())
            .collect()
    }

    /// Party projections in authored order.
    pub fn parties(&self) -> Vec<&PathwayCurve> {
        self.curves
            .iter()
            .filter(|curve| !self.is_reference(&curve.name))
            .collect()
    }

    /// The configured label of a reference, `n/a` when there is none.
    fn compliance(&self, classification: &Classification) -> String {
        classification
            .reference()
            .and_then(|reference| {
                self.reference_pathways
                    .iter()
                    .find(|candidate| candidate.name == reference)
            })
            .map(|candidate| candidate.compliance.clone())
            .unwrap_or_else(|| NOT_APPLICABLE.to_string())
    }

    pub fn analysis(&self) -> Vec<PathwayAnalysis> {
        let references = self.references();
        self.parties()
            .into_iter()
            .map(|party| {
                let nearest = nearest_reference(party, &references);
                PathwayAnalysis {
                    party: party.name.clone(),
                    distances: reference_distances(party, &references),
                    compliance: self.compliance(&nearest),
                    net_zero: net_zero_by(party, self.net_zero_year, self.net_zero_limit),
                    nearest,
                }
            })
            .collect()
    }

    /// Reduction of every curve over every configured period. References come first.
    pub fn period_reductions(&self) -> Vec<PeriodReduction> {
        let references = self.references();
        references
            .iter()
            .chain(self.parties())
            .cartesian_product(self.periods.iter())
            .map(|(curve, period)| PeriodReduction {
                pathway: curve.name.clone(),
                period: *period,
                reduction: period_reduction(curve, period.start, period.end),
            })
            .collect()
    }

    /// Curves by decreasing reduction over one period, undefined reductions last.
    pub fn ranking(&self, period: Period) -> Vec<PeriodReduction> {
        let reductions = self
            .period_reductions()
            .into_iter()
            .filter(|reduction| reduction.period == period)
            .collect();
        pinned_then_descending(reductions, &[], |reduction: &PeriodReduction| {
            (reduction.pathway.as_str(), reduction.reduction)
        })
    }

    pub fn net_zero(&self) -> Vec<NetZero> {
        self.curves
            .iter()
            .map(|curve| NetZero {
                pathway: curve.name.clone(),
                year: net_zero_year(curve, self.net_zero_threshold),
                emissions_at_target_year: curve.get(self.net_zero_year),
            })
            .collect()
    }

    pub fn net_zero_target_year(&self) -> i32 {
        self.net_zero_year
    }
}
