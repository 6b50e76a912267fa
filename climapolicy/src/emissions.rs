//! Greenhouse-gas emissions by sector and party, with reductions against the baseline.

use itertools::Itertools;
use log::debug;
use polars::prelude::*;
use serde::Serialize;

use crate::config::Config;
use crate::domain::ObservationRow;
use crate::error::Result;
use crate::metrics::{
    absolute_reduction, pinned_then_descending, reduction_pct, Bucket, Metric, Thresholds,
};
use crate::transform::LongTable;
use crate::COL;

/// Total emissions of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalEmissions {
    pub group: String,
    pub total: Option<f64>,
    pub reduction: Metric,
    /// Summary badge for the reduction
    pub badge: Option<Bucket>,
}

/// Emissions of one group in one sector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorEmissions {
    pub sector: String,
    pub group: String,
    pub value: Option<f64>,
    pub reduction: Metric,
    pub absolute_reduction: Metric,
    /// Only set for groups other than the baseline and the target
    pub bucket: Option<Bucket>,
    /// Emissions of the sector under the target group
    pub target: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Emissions {
    table: LongTable,
    rows: Vec<ObservationRow>,
    baseline_group: String,
    target_group: String,
    total_row: String,
    reduction_scale: Thresholds,
    summary_scale: Thresholds,
}

impl Emissions {
    pub fn new(table: LongTable, config: &Config) -> Result<Self> {
        let rows = table.observations()?;
        debug!("Emissions table has {} observations", rows.len());
        Ok(Self {
            table,
            rows,
            baseline_group: config.baseline_group.clone(),
            target_group: config.target_group.clone(),
            total_row: config.total_row.clone(),
            reduction_scale: config.reduction_scale.clone(),
            summary_scale: config.summary_scale.clone(),
        })
    }

    pub fn table(&self) -> &LongTable {
        &self.table
    }

    pub fn observations(&self) -> &[ObservationRow] {
        &self.rows
    }

    /// Sectors in authored order, without the total row.
    pub fn sectors(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.category.as_str())
            .filter(|sector| *sector != self.total_row)
            .unique()
            .map(String::from)
            .collect()
    }

    /// Groups in authored order, the baseline and target included.
    pub fn groups(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.group.clone())
            .unique()
            .collect()
    }

    /// Groups other than the baseline and the target.
    pub fn parties(&self) -> Vec<String> {
        self.groups()
            .into_iter()
            .filter(|group| *group != self.baseline_group && *group != self.target_group)
            .collect()
    }

    pub fn value(&self, sector: &str, group: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.category == sector && row.group == group)
            .and_then(|row| row.value)
    }

    pub fn baseline(&self, sector: &str) -> Option<f64> {
        self.value(sector, &self.baseline_group)
    }

    /// The target marker of a sector (or of the total row).
    pub fn target(&self, sector: &str) -> Option<f64> {
        self.value(sector, &self.target_group).filter(|value| *value > 0.0)
    }

    /// The target group and its total emissions, shown as the marker of the totals chart.
    pub fn total_target(&self) -> Option<(&str, f64)> {
        self.target(&self.total_row).map(|value| (self.target_group.as_str(), value))
    }

    fn pinned(&self) -> [&str; 2] {
        [self.baseline_group.as_str(), self.target_group.as_str()]
    }

    fn total(&self, group: &str) -> TotalEmissions {
        let total = self.value(&self.total_row, group);
        let reduction = reduction_pct(total, self.baseline(&self.total_row));
        TotalEmissions {
            group: group.to_string(),
            total,
            reduction,
            badge: self.summary_scale.bucket_metric(reduction).cloned(),
        }
    }

    /// Total emissions of every group: baseline and target first, then the other groups by
    /// decreasing reduction.
    pub fn totals(&self) -> Vec<TotalEmissions> {
        let totals = self
            .groups()
            .iter()
            .filter(|group| {
                self.rows
                    .iter()
                    .any(|row| row.category == self.total_row && row.group == **group)
            })
            .map(|group| self.total(group))
            .collect();
        pinned_then_descending(totals, &self.pinned(), |total: &TotalEmissions| {
            (total.group.as_str(), total.reduction)
        })
    }

    /// Every group but the baseline whose total reduction is defined, by decreasing
    /// reduction.
    pub fn summary(&self) -> Vec<TotalEmissions> {
        let totals = self
            .groups()
            .iter()
            .filter(|group| **group != self.baseline_group)
            .map(|group| self.total(group))
            .filter(|total| total.reduction.is_defined())
            .collect();
        pinned_then_descending(totals, &[], |total: &TotalEmissions| {
            (total.group.as_str(), total.reduction)
        })
    }

    /// Emissions of the selected groups (all when empty) in one sector, or in every sector
    /// when `sector` is `None`. Groups keep the order they are given in.
    pub fn breakdown(&self, sector: Option<&str>, groups: &[String]) -> Vec<SectorEmissions> {
        let sectors = match sector {
            Some(sector) => vec![sector.to_string()],
            None => self.sectors(),
        };
        let groups = if groups.is_empty() {
            self.groups()
        } else {
            groups.to_vec()
        };
        let pinned = self.pinned();
        sectors
            .iter()
            .cartesian_product(groups.iter())
            .filter_map(|(sector, group)| {
                let row = self
                    .rows
                    .iter()
                    .find(|row| &row.category == sector && &row.group == group)?;
                let baseline = self.baseline(sector);
                let reduction = reduction_pct(row.value, baseline);
                let bucket = if pinned.contains(&group.as_str()) {
                    None
                } else {
                    self.reduction_scale.bucket_metric(reduction).cloned()
                };
                Some(SectorEmissions {
                    sector: sector.clone(),
                    group: group.clone(),
                    value: row.value,
                    reduction,
                    absolute_reduction: absolute_reduction(row.value, baseline),
                    bucket,
                    target: self.target(sector),
                })
            })
            .collect()
    }

    /// Sector by group table, the total row last.
    pub fn grid(&self) -> Result<DataFrame> {
        let mut sectors = self.sectors();
        if self.rows.iter().any(|row| row.category == self.total_row) {
            sectors.push(self.total_row.clone());
        }
        let mut columns = vec![Series::new(COL::SECTOR, sectors.clone())];
        for group in self.groups() {
            let values: Vec<Option<f64>> = sectors
                .iter()
                .map(|sector| self.value(sector, &group))
                .collect();
            columns.push(Series::new(&group, values));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// The normalized table with the reduction of every row against its sector baseline.
    pub fn export_frame(&self) -> Result<DataFrame> {
        let reductions: Vec<Option<f64>> = self
            .table
            .observations_aligned()?
            .into_iter()
            .map(|row| {
                row.and_then(|row| reduction_pct(row.value, self.baseline(&row.category)).value())
            })
            .collect();
        self.table
            .to_export_frame(vec![Series::new(COL::REDUCTION_PCT, reductions)])
    }
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;
    use crate::schema::SheetSchema;
    use crate::transform::normalize;
    use crate::workbook::Sheet;

    fn emissions() -> Emissions {
        let sheet = Sheet {
            name: "온실가스종합비교".into(),
            frame: df!(
                "부문" => &["총배출", "전환", "산업"],
                "2018년 기준" => &[727.6, 269.6, 0.0],
                "2030 NDC" => &[436.6, 145.9, 230.7],
                "A당" => &[Some(306.5), Some(300.0), Some(200.0)],
                "B당" => &[Some(600.0), None, Some(100.0)],
                "C당" => &[None, Some(100.0), None],
            )
            .unwrap(),
        };
        let config = Config::default();
        let table = normalize(&sheet, &SheetSchema::emissions()).unwrap();
        Emissions::new(table, &config).unwrap()
    }

    #[test]
    fn sectors_exclude_the_total_row() {
        let emissions = emissions();
        assert_eq!(emissions.sectors(), vec!["전환", "산업"]);
        assert_eq!(emissions.parties(), vec!["A당", "B당", "C당"]);
        assert_eq!(emissions.target("전환"), Some(145.9));
    }

    #[test]
    fn totals_pin_baseline_and_target() {
        let totals = emissions().totals();
        let order: Vec<&str> = totals.iter().map(|t| t.group.as_str()).collect();
        assert_eq!(order, vec!["2018년 기준", "2030 NDC", "A당", "B당", "C당"]);
        assert_eq!(totals[0].reduction, Metric::Value(0.0));
        let a = totals[2].reduction.value().unwrap();
        assert!((a - 57.87520615722925).abs() < 1e-9);
        assert_eq!(totals[2].badge.as_ref().unwrap().label, "우수");
        assert!(!totals[4].reduction.is_defined());
        assert_eq!(totals[4].badge, None);
    }

    #[test]
    fn summary_skips_baseline_and_undefined() {
        let summary = emissions().summary();
        let order: Vec<&str> = summary.iter().map(|t| t.group.as_str()).collect();
        assert_eq!(order, vec!["A당", "2030 NDC", "B당"]);
        assert_eq!(summary[2].badge.as_ref().unwrap().label, "미흡");
    }

    #[test]
    fn breakdown_keeps_undefined_cells() {
        let emissions = emissions();
        let rows = emissions.breakdown(Some("산업"), &[]);
        assert_eq!(rows.len(), 5);
        // A zero baseline makes every reduction undefined.
        assert!(rows.iter().all(|row| !row.reduction.is_defined()));

        let rows = emissions.breakdown(None, &["2030 NDC".to_string(), "C당".to_string()]);
        assert_eq!(rows.len(), 4);
        let transition = &rows[1];
        assert_eq!(transition.group, "C당");
        assert!((transition.absolute_reduction.value().unwrap() - 169.6).abs() < 1e-9);
        assert_eq!(transition.bucket.as_ref().unwrap().label, "60% 이상");
        assert_eq!(rows[0].bucket, None);
    }

    #[test]
    fn target_marker_follows_the_target_group() {
        let emissions = emissions();
        assert_eq!(emissions.total_target(), Some(("2030 NDC", 436.6)));
        let rows = emissions.breakdown(Some("산업"), &["A당".to_string()]);
        assert_eq!(rows[0].target, Some(230.7));
        let rows = emissions.breakdown(Some("전환"), &["B당".to_string()]);
        assert_eq!(rows[0].target, Some(145.9));
    }

    #[test]
    fn grid_and_export_frames() {
        let emissions = emissions();
        let grid = emissions.grid().unwrap();
        assert_eq!(grid.shape(), (3, 6));
        assert_eq!(
            grid.column("부문").unwrap().str().unwrap().get(2),
            Some("총배출")
        );

        let export = emissions.export_frame().unwrap();
        assert_eq!(
            export.get_column_names(),
            vec!["부문", "정당", "값", COL::REDUCTION_PCT]
        );
        let reductions = export.column(COL::REDUCTION_PCT).unwrap().f64().unwrap();
        assert_eq!(reductions.get(0), Some(0.0));
        // The 산업 baseline is zero.
        assert_eq!(reductions.get(2), None);
    }
}
