use nonempty::{nonempty, NonEmpty};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::domain::ValueUnit;
use crate::search::{CaseSensitivity, SheetQuery};
use crate::COL;

/// The kinds of sheet a dashboard reads.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter, Display,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SheetKind {
    Emissions,
    Energy,
    Pathways,
    Policies,
}

/// Declares how a sheet of a given kind is laid out. The normalizer uses the presence of
/// `group_column` to tell a long form sheet from a wide one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSchema {
    pub kind: SheetKind,
    pub query: SheetQuery,
    /// Column holding the category of each row (sector, energy source, year, topic)
    pub id_column: String,
    /// Column naming the group in long form sheets (party, scenario, pathway)
    pub group_column: String,
    /// Column holding the value in long form sheets
    pub value_column: String,
    #[serde(default)]
    pub description_column: Option<String>,
    #[serde(default)]
    pub value_unit: ValueUnit,
    /// Whether a missing sheet aborts the whole dashboard
    #[serde(default)]
    pub required: bool,
}

impl SheetSchema {
    pub fn emissions() -> Self {
        Self {
            kind: SheetKind::Emissions,
            query: SheetQuery::new(nonempty!["배출".to_string(), "온실가스".to_string()]),
            id_column: COL::SECTOR.into(),
            group_column: COL::PARTY.into(),
            value_column: COL::EMISSIONS_VALUE.into(),
            description_column: None,
            value_unit: ValueUnit::MtCo2eq,
            required: true,
        }
    }

    pub fn energy() -> Self {
        Self {
            kind: SheetKind::Energy,
            query: SheetQuery::new(nonempty!["에너지믹스".to_string()]),
            id_column: COL::ENERGY_SOURCE.into(),
            group_column: COL::SCENARIO.into(),
            value_column: COL::SHARE.into(),
            description_column: None,
            value_unit: ValueUnit::Percent,
            required: false,
        }
    }

    pub fn pathways() -> Self {
        Self {
            kind: SheetKind::Pathways,
            query: SheetQuery::new(nonempty!["온도경로".to_string()]),
            id_column: COL::YEAR.into(),
            group_column: COL::PATHWAY.into(),
            value_column: COL::PATHWAY_EMISSIONS.into(),
            description_column: None,
            value_unit: ValueUnit::MtCo2eq,
            required: false,
        }
    }

    pub fn policies() -> Self {
        Self {
            kind: SheetKind::Policies,
            query: SheetQuery::new(nonempty!["정성평가".to_string(), "policy".to_string()])
                .with_case_sensitivity(CaseSensitivity::Insensitive),
            id_column: COL::POLICY_CATEGORY.into(),
            group_column: COL::PARTY.into(),
            value_column: COL::POLICY_LEVEL.into(),
            description_column: Some(COL::POLICY_DESCRIPTION.into()),
            value_unit: ValueUnit::Level,
            required: false,
        }
    }

    pub fn for_kind(kind: SheetKind) -> Self {
        match kind {
            SheetKind::Emissions => Self::emissions(),
            SheetKind::Energy => Self::energy(),
            SheetKind::Pathways => Self::pathways(),
            SheetKind::Policies => Self::policies(),
        }
    }

    pub fn keywords(&self) -> &NonEmpty<String> {
        &self.query.keywords
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_kind_has_a_default_schema() {
        for kind in SheetKind::iter() {
            assert_eq!(SheetSchema::for_kind(kind).kind, kind);
        }
        assert!(SheetSchema::emissions().required);
        assert!(!SheetSchema::energy().required);
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!(SheetKind::from_str("Emissions").unwrap(), SheetKind::Emissions);
        assert_eq!(SheetKind::from_str("pathways").unwrap(), SheetKind::Pathways);
        assert!(SheetKind::from_str("geometry").is_err());
        assert_eq!(SheetKind::Energy.to_string(), "energy");
    }
}
