use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, Result};
use crate::metrics::{Bucket, Thresholds};
use crate::schema::{SheetKind, SheetSchema};
use crate::workbook::Source;

/// Color used for any key without an entry of its own
pub const DEFAULT_COLOR: &str = "#808080";

/// Name to color lookup with a fallback color.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColorMap {
    #[serde(default = "default_color")]
    pub default: String,
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

fn default_color() -> String {
    DEFAULT_COLOR.into()
}

impl ColorMap {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            default: default_color(),
            colors: entries
                .into_iter()
                .map(|(name, color)| (name.to_string(), color.to_string()))
                .collect(),
        }
    }

    pub fn color(&self, name: &str) -> &str {
        self.colors
            .get(name)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

/// Years whose emissions are compared by the pathway analysis.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: i32,
    pub end: i32,
}

impl Period {
    pub fn label(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// A reference (temperature) pathway and the compliance label given to a party whose
/// projection is nearest to it. The order of the list is the priority order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReferencePathway {
    pub name: String,
    pub compliance: String,
    pub color: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Workbook to read. `None` uses the built-in tables.
    pub workbook: Option<PathBuf>,
    pub emissions: SheetSchema,
    pub energy: SheetSchema,
    pub pathways: SheetSchema,
    pub policies: SheetSchema,
    pub baseline_group: String,
    pub target_group: String,
    pub total_row: String,
    pub party_colors: ColorMap,
    pub energy_colors: ColorMap,
    /// Bucketing of per-sector reduction rates
    pub reduction_scale: Thresholds,
    /// Bucketing of total reduction rates
    pub summary_scale: Thresholds,
    pub reference_pathways: Vec<ReferencePathway>,
    /// Any other pathway whose name contains this marker is a reference too
    pub reference_marker: String,
    pub net_zero_year: i32,
    /// Emissions strictly below this in `net_zero_year` count as net zero
    pub net_zero_limit: f64,
    /// The first year at or below this level is reported as the net-zero year
    pub net_zero_threshold: f64,
    pub periods: Vec<Period>,
    pub preferred_scenarios: Vec<String>,
    pub renewable_sources: Vec<String>,
    pub fossil_sources: Vec<String>,
    /// Sources counted as clean energy besides the renewable ones
    pub other_clean_sources: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workbook: Some("climate_data.xlsx".into()),
            emissions: SheetSchema::emissions(),
            energy: SheetSchema::energy(),
            pathways: SheetSchema::pathways(),
            policies: SheetSchema::policies(),
            baseline_group: "2018년 기준".into(),
            target_group: "2030 NDC".into(),
            total_row: crate::COL::TOTAL_EMISSIONS_ROW.into(),
            party_colors: ColorMap::new([
                ("국민의 힘", "#E61E2B"),
                ("더불어민주당", "#004EA2"),
                ("사회대전환", "#8B4513"),
                ("개혁신당", "#FF6B6B"),
                ("2018년 기준", "#999999"),
                ("2030 NDC", "#000000"),
            ]),
            energy_colors: ColorMap::new([
                ("석탄", "#1e1e1e"),
                ("LNG", "#4682B4"),
                ("원자력", "#FF6347"),
                ("태양광", "#FFD700"),
                ("풍력", "#32CD32"),
                ("수력", "#00BFFF"),
                ("바이오", "#8B4513"),
                ("연료전지", "#9370DB"),
                ("기타 재생", "#66CDAA"),
                ("기타", "#808080"),
            ]),
            reduction_scale: default_reduction_scale(),
            summary_scale: default_summary_scale(),
            reference_pathways: vec![
                ReferencePathway {
                    name: "1.5°C 경로".into(),
                    compliance: "매우 높음".into(),
                    color: "#32CD32".into(),
                },
                ReferencePathway {
                    name: "2°C 경로".into(),
                    compliance: "중간".into(),
                    color: "#FFA500".into(),
                },
                ReferencePathway {
                    name: "3°C 경로".into(),
                    compliance: "낮음".into(),
                    color: "#FF0000".into(),
                },
            ],
            reference_marker: "°C".into(),
            net_zero_year: 2050,
            net_zero_limit: 10.0,
            net_zero_threshold: 20.0,
            periods: vec![
                Period {
                    start: 2018,
                    end: 2030,
                },
                Period {
                    start: 2030,
                    end: 2050,
                },
                Period {
                    start: 2018,
                    end: 2050,
                },
            ],
            preferred_scenarios: vec!["2023년(현재)".into(), "2030 NDC".into()],
            renewable_sources: ["태양광", "풍력", "수력", "바이오", "연료전지", "기타 재생"]
                .map(String::from)
                .to_vec(),
            fossil_sources: ["석탄", "LNG", "석유"].map(String::from).to_vec(),
            other_clean_sources: vec!["원자력".into()],
        }
    }
}

fn scale(cut_points: Vec<f64>, buckets: &[(&str, &str)]) -> Thresholds {
    let buckets = buckets
        .iter()
        .map(|(label, color)| Bucket::new(label, color))
        .collect();
    Thresholds::new(cut_points, buckets).unwrap_or_default()
}

fn default_reduction_scale() -> Thresholds {
    scale(
        vec![0.0, 20.0, 40.0, 60.0],
        &[
            ("증가", "red"),
            ("0-20%", "orange"),
            ("20-40%", "#FFEC19"),
            ("40-60%", "lightgreen"),
            ("60% 이상", "green"),
        ],
    )
}

fn default_summary_scale() -> Thresholds {
    scale(
        vec![30.0, 50.0],
        &[("미흡", "red"), ("보통", "orange"), ("우수", "green")],
    )
}

impl Config {
    /// Where the tables come from.
    pub fn source(&self) -> Source {
        match &self.workbook {
            Some(path) => Source::Path(path.clone()),
            None => Source::Builtin,
        }
    }

    pub fn schema(&self, kind: SheetKind) -> &SheetSchema {
        match kind {
            SheetKind::Emissions => &self.emissions,
            SheetKind::Energy => &self.energy,
            SheetKind::Pathways => &self.pathways,
            SheetKind::Policies => &self.policies,
        }
    }

    /// Checks what serde cannot: schema kinds, distinct groups and distinct reference names.
    /// Threshold scales are validated while deserializing.
    pub fn validate(&self) -> Result<()> {
        for (kind, schema) in [
            (SheetKind::Emissions, &self.emissions),
            (SheetKind::Energy, &self.energy),
            (SheetKind::Pathways, &self.pathways),
            (SheetKind::Policies, &self.policies),
        ] {
            if schema.kind != kind {
                return Err(ClimateError::InvalidConfig(format!(
                    "schema for {kind} declares kind {}",
                    schema.kind
                )));
            }
            if schema.id_column == schema.group_column || schema.id_column == schema.value_column
            {
                return Err(ClimateError::InvalidConfig(format!(
                    "schema for {kind} reuses the id column '{}'",
                    schema.id_column
                )));
            }
        }
        if self.baseline_group == self.target_group {
            return Err(ClimateError::InvalidConfig(
                "baseline and target groups must differ".into(),
            ));
        }
        let mut names: Vec<&str> = self
            .reference_pathways
            .iter()
            .map(|reference| reference.name.as_str())
            .collect();
        names.sort_unstable();
        if names.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(ClimateError::InvalidConfig(
                "reference pathways must have distinct names".into(),
            ));
        }
        if !self.net_zero_limit.is_finite() || !self.net_zero_threshold.is_finite() {
            return Err(ClimateError::InvalidConfig(
                "net-zero limits must be finite".into(),
            ));
        }
        Ok(())
    }

    pub fn reference_color(&self, reference: &str) -> &str {
        self.reference_pathways
            .iter()
            .find(|candidate| candidate.name == reference)
            .map(|candidate| candidate.color.as_str())
            .unwrap_or(DEFAULT_COLOR)
    }
}
