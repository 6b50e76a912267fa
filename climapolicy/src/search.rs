//! Types and functions to find sheets in a loaded workbook by keyword.

use log::debug;
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, Result};
use crate::workbook::{Sheet, Workbook};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum CaseSensitivity {
    Insensitive,
    #[default]
    Sensitive,
}

/// Search for a sheet whose name contains any of the keywords.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SheetQuery {
    pub keywords: NonEmpty<String>,
    #[serde(default)]
    pub case_sensitivity: CaseSensitivity,
}

impl SheetQuery {
    pub fn new(keywords: NonEmpty<String>) -> Self {
        Self {
            keywords,
            case_sensitivity: CaseSensitivity::default(),
        }
    }

    pub fn with_case_sensitivity(mut self, case_sensitivity: CaseSensitivity) -> Self {
        self.case_sensitivity = case_sensitivity;
        self
    }

    /// Whether `name` contains any keyword (not a regex, the keyword may appear anywhere).
    pub fn matches(&self, name: &str) -> bool {
        match self.case_sensitivity {
            CaseSensitivity::Sensitive => self.keywords.iter().any(|k| name.contains(k.as_str())),
            CaseSensitivity::Insensitive => {
                let name = name.to_lowercase();
                self.keywords
                    .iter()
                    .any(|k| name.contains(&k.to_lowercase()))
            }
        }
    }
}

impl Workbook {
    /// Returns the first sheet, in workbook order, whose name contains any keyword of the
    /// query. The first match wins, not the best one.
    pub fn resolve(&self, query: &SheetQuery) -> Result<&Sheet> {
        debug!("Resolving sheet for {:?}", query.keywords);
        self.sheets()
            .iter()
            .find(|sheet| query.matches(&sheet.name))
            .ok_or_else(|| ClimateError::SheetNotFound {
                keywords: query.keywords.iter().cloned().collect(),
                available: self.sheet_names(),
            })
    }
}
