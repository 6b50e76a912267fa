//! Qualitative policy assessments on the fixed level scale.

use std::str::FromStr;

use itertools::Itertools;
use log::warn;
use polars::prelude::*;
use serde::Serialize;

use crate::cells::parse_number;
use crate::domain::{PolicyAssessment, PolicyLevel};
use crate::error::Result;
use crate::metrics::mean;
use crate::transform::LongTable;
use crate::COL;

/// A row that could not be read as an assessment. It is reported, not coerced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRow {
    /// Zero-based row of the normalized table
    pub row: usize,
    pub category: Option<String>,
    pub party: Option<String>,
    pub value: Option<String>,
    pub reason: String,
}

/// Mean level of a party or of a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageLevel {
    pub name: String,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct Policies {
    table: LongTable,
    assessments: Vec<PolicyAssessment>,
    rejected: Vec<RejectedRow>,
}

/// Reads a level cell given either as a score (`3`) or as its label (`강화(강)`).
pub fn parse_level(cell: &str) -> Option<PolicyLevel> {
    match parse_number(cell) {
        Some(value) => PolicyLevel::from_value(value),
        None => PolicyLevel::from_str(cell.trim()).ok(),
    }
}

impl Policies {
    pub fn new(table: LongTable) -> Result<Self> {
        let rows = table.observations_aligned()?;
        let labels = table.value_labels()?;
        let descriptions = match &table.schema.description_column {
            Some(column) => table.extra_column(column)?,
            None => None,
        }
        .unwrap_or_else(|| vec![None; rows.len()]);

        let mut assessments = Vec::new();
        let mut rejected = Vec::new();
        for (idx, ((row, label), description)) in rows
            .into_iter()
            .zip(labels)
            .zip(descriptions)
            .enumerate()
        {
            let reject = |reason: &str, category: Option<String>, party: Option<String>| {
                RejectedRow {
                    row: idx,
                    category,
                    party,
                    value: label.clone(),
                    reason: reason.to_string(),
                }
            };
            let Some(row) = row else {
                rejected.push(reject("missing category or party", None, None));
                continue;
            };
            let level = label.as_deref().and_then(parse_level);
            match (level, &label) {
                (Some(level), _) => assessments.push(PolicyAssessment {
                    category: row.category,
                    party: row.group,
                    level,
                    description,
                }),
                // An empty level cell means no stated position.
                (None, None) => {}
                (None, Some(_)) => {
                    rejected.push(reject(
                        "level is not on the scale",
                        Some(row.category),
                        Some(row.group),
                    ));
                }
            }
        }
        for row in &rejected {
            warn!(
                "Rejected policy row {}: {} ({:?})",
                row.row, row.reason, row.value
            );
        }
        Ok(Self {
            table,
            assessments,
            rejected,
        })
    }

    pub fn table(&self) -> &LongTable {
        &self.table
    }

    pub fn assessments(&self) -> &[PolicyAssessment] {
        &self.assessments
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn categories(&self) -> Vec<String> {
        self.assessments
            .iter()
            .map(|a| a.category.clone())
            .unique()
            .collect()
    }

    pub fn parties(&self) -> Vec<String> {
        self.assessments
            .iter()
            .map(|a| a.party.clone())
            .unique()
            .collect()
    }

    /// `None` when the party stated no position on the category.
    pub fn level(&self, category: &str, party: &str) -> Option<PolicyLevel> {
        self.assessments
            .iter()
            .find(|a| a.category == category && a.party == party)
            .map(|a| a.level)
    }

    pub fn for_party(&self, party: &str) -> Vec<&PolicyAssessment> {
        self.assessments
            .iter()
            .filter(|a| a.party == party)
            .collect()
    }

    pub fn for_category(&self, category: &str) -> Vec<&PolicyAssessment> {
        self.assessments
            .iter()
            .filter(|a| a.category == category)
            .collect()
    }

    /// Party by category table of level scores; null where no position was stated.
    pub fn grid(&self) -> Result<DataFrame> {
        let parties = self.parties();
        let mut columns = vec![Series::new(COL::PARTY, parties.clone())];
        for category in self.categories() {
            let scores: Vec<Option<i32>> = parties
                .iter()
                .map(|party| {
                    self.level(&category, party)
                        .map(|level| i32::from(level.score()))
                })
                .collect();
            columns.push(Series::new(&category, scores));
        }
        Ok(DataFrame::new(columns)?)
    }

    fn averages<F>(&self, names: Vec<String>, key: F) -> Vec<AverageLevel>
    where
        F: Fn(&PolicyAssessment) -> &str,
    {
        names
            .into_iter()
            .filter_map(|name| {
                let scores: Vec<f64> = self
                    .assessments
                    .iter()
                    .filter(|&a| key(a) == name)
                    .map(|a| f64::from(a.level.score()))
                    .collect();
                let count = scores.len();
                mean(scores).map(|mean| AverageLevel { name, mean, count })
            })
            .sorted_by(|a, b| b.mean.total_cmp(&a.mean))
            .collect()
    }

    /// Mean level per party, highest first.
    pub fn average_by_party(&self) -> Vec<AverageLevel> {
        self.averages(self.parties(), |a| a.party.as_str())
    }

    /// Mean level per category, highest first.
    pub fn average_by_category(&self) -> Vec<AverageLevel> {
        self.averages(self.categories(), |a| a.category.as_str())
    }

    pub fn export_frame(&self) -> Result<DataFrame> {
        self.table.to_export_frame(vec![])
    }
}
