//! Energy-mix scenarios. Values are used as authored, in the unit the schema declares.

use itertools::Itertools;
use polars::prelude::*;
use serde::Serialize;

use crate::config::Config;
use crate::domain::{ObservationRow, ValueUnit};
use crate::error::Result;
use crate::transform::LongTable;
use crate::COL;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceShare {
    pub source: String,
    pub share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioShare {
    pub scenario: String,
    /// `None` when the scenario does not list the source at all
    pub share: Option<f64>,
}

/// Shares of the renewable, fossil and clean source groups in one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceGroupTotals {
    pub scenario: String,
    pub renewable: f64,
    pub fossil: f64,
    pub clean: f64,
}

#[derive(Debug, Clone)]
pub struct EnergyMix {
    table: LongTable,
    rows: Vec<ObservationRow>,
    preferred_scenarios: Vec<String>,
    renewable_sources: Vec<String>,
    fossil_sources: Vec<String>,
    other_clean_sources: Vec<String>,
}

impl EnergyMix {
    pub fn new(table: LongTable, config: &Config) -> Result<Self> {
        let rows = table.observations()?;
        Ok(Self {
            table,
            rows,
            preferred_scenarios: config.preferred_scenarios.clone(),
            renewable_sources: config.renewable_sources.clone(),
            fossil_sources: config.fossil_sources.clone(),
            other_clean_sources: config.other_clean_sources.clone(),
        })
    }

    pub fn table(&self) -> &LongTable {
        &self.table
    }

    pub fn observations(&self) -> &[ObservationRow] {
        &self.rows
    }

    pub fn unit(&self) -> ValueUnit {
        self.table.schema.value_unit
    }

    /// Scenarios with the preferred ones first, then the others in authored order.
    pub fn scenarios(&self) -> Vec<String> {
        let authored: Vec<&str> = self.rows.iter().map(|row| row.group.as_str()).unique().collect();
        self.preferred_scenarios
            .iter()
            .map(String::as_str)
            .filter(|scenario| authored.contains(scenario))
            .chain(
                authored
                    .iter()
                    .copied()
                    .filter(|scenario| !self.preferred_scenarios.iter().any(|p| p == scenario)),
            )
            .map(String::from)
            .collect()
    }

    pub fn sources(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.category.clone())
            .unique()
            .collect()
    }

    fn share(&self, source: &str, scenario: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.category == source && row.group == scenario)
            .and_then(|row| row.value)
    }

    /// The sources listed with a value in one scenario.
    pub fn mix(&self, scenario: &str) -> Vec<SourceShare> {
        self.rows
            .iter()
            .filter(|row| row.group == scenario && row.value.is_some())
            .map(|row| SourceShare {
                source: row.category.clone(),
                share: row.value,
            })
            .collect()
    }

    /// One source in every scenario. A scenario that does not list the source gets `None`,
    /// never zero.
    pub fn source_across(&self, source: &str) -> Vec<ScenarioShare> {
        self.scenarios()
            .into_iter()
            .map(|scenario| ScenarioShare {
                share: self.share(source, &scenario),
                scenario,
            })
            .collect()
    }

    fn group_total(&self, scenario: &str, sources: &[String]) -> f64 {
        sources
            .iter()
            .filter_map(|source| self.share(source, scenario))
            .sum()
    }

    pub fn group_totals(&self) -> Vec<SourceGroupTotals> {
        self.scenarios()
            .into_iter()
            .map(|scenario| {
                let renewable = self.group_total(&scenario, &self.renewable_sources);
                SourceGroupTotals {
                    fossil: self.group_total(&scenario, &self.fossil_sources),
                    clean: renewable + self.group_total(&scenario, &self.other_clean_sources),
                    renewable,
                    scenario,
                }
            })
            .collect()
    }

    /// Source by scenario table, sources sorted by decreasing share in the first scenario.
    pub fn pivot(&self) -> Result<DataFrame> {
        let scenarios = self.scenarios();
        let mut sources = self.sources();
        if let Some(first) = scenarios.first() {
            sources = sources
                .into_iter()
                .sorted_by(|a, b| match (self.share(a, first), self.share(b, first)) {
                    (Some(x), Some(y)) => y.total_cmp(&x),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .collect();
        }
        let mut columns = vec![Series::new(COL::ENERGY_SOURCE, sources.clone())];
        for scenario in &scenarios {
            let shares: Vec<Option<f64>> = sources
                .iter()
                .map(|source| self.share(source, scenario))
                .collect();
            columns.push(Series::new(scenario, shares));
        }
        Ok(DataFrame::new(columns)?)
    }

    pub fn export_frame(&self) -> Result<DataFrame> {
        self.table.to_export_frame(vec![])
    }
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;
    use crate::schema::SheetSchema;
    use crate::transform::normalize;
    use crate::workbook::Sheet;

    fn energy() -> EnergyMix {
        let sheet = Sheet {
            name: "에너지믹스".into(),
            frame: df!(
                "에너지원" => &["석탄", "원자력", "태양광", "수소"],
                "A당" => &[Some(10.0), Some(30.0), Some(50.0), Some(10.0)],
                "2030 NDC" => &[Some(20.0), Some(32.0), Some(20.0), None],
                "2023년(현재)" => &[31.0, 30.0, 6.0, 0.0],
            )
            .unwrap(),
        };
        let table = normalize(&sheet, &SheetSchema::energy()).unwrap();
        EnergyMix::new(table, &Config::default()).unwrap()
    }

    #[test]
    fn preferred_scenarios_come_first() {
        assert_eq!(energy().scenarios(), vec!["2023년(현재)", "2030 NDC", "A당"]);
    }

    #[test]
    fn absent_source_is_none_not_zero() {
        let shares = energy().source_across("수소");
        assert_eq!(shares[0].share, Some(0.0));
        assert_eq!(shares[1].share, None);
        assert_eq!(shares[2].share, Some(10.0));
        assert_eq!(energy().mix("2030 NDC").len(), 3);
    }

    #[test]
    fn group_totals_sum_listed_sources() {
        let totals = energy().group_totals();
        let a = totals.iter().find(|t| t.scenario == "A당").unwrap();
        assert_eq!(a.renewable, 50.0);
        assert_eq!(a.fossil, 10.0);
        assert_eq!(a.clean, 80.0);
    }

    #[test]
    fn pivot_sorts_by_first_scenario() {
        let pivot = energy().pivot().unwrap();
        assert_eq!(
            pivot.get_column_names(),
            vec!["에너지원", "2023년(현재)", "2030 NDC", "A당"]
        );
        let sources: Vec<Option<&str>> = pivot
            .column("에너지원")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            sources,
            vec![Some("석탄"), Some("원자력"), Some("태양광"), Some("수소")]
        );
        assert_eq!(energy().unit(), ValueUnit::Percent);
    }
}
