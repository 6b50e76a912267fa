//! Error types.

use std::path::PathBuf;

/// Structural failures of the pipeline. Metrics that cannot be computed are not errors, see
/// [`crate::metrics::Metric`].
#[derive(thiserror::Error, Debug)]
pub enum ClimateError {
    #[error("Workbook '{}' does not exist.", path.display())]
    SourceUnavailable { path: PathBuf },
    #[error("No sheet matches any of {keywords:?}. Available sheets: {available:?}")]
    SheetNotFound {
        keywords: Vec<String>,
        available: Vec<String>,
    },
    #[error("Sheet '{sheet}' has no column '{column}'. Columns: {columns:?}")]
    MissingColumn {
        sheet: String,
        column: String,
        columns: Vec<String>,
    },
    #[error("Sheet '{0}' has no rows.")]
    EmptyTable(String),
    #[error("Sheet '{sheet}' has more than one value for ({category}, {group}).")]
    DuplicateObservation {
        sheet: String,
        category: String,
        group: String,
    },
    #[error("Sheet '{sheet}' already has a column named '{column}'.")]
    ColumnConflict { sheet: String, column: String },
    #[error("Pathway '{pathway}' lists the year {year} more than once.")]
    DuplicateYear { pathway: String, year: i32 },
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Wrapped polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
    #[error("std IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Wrapped anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl ClimateError {
    /// Whether the failure only affects the section that raised it. The dashboard keeps
    /// rendering the remaining sections in that case.
    pub fn is_section_local(&self) -> bool {
        matches!(
            self,
            Self::SheetNotFound { .. }
                | Self::MissingColumn { .. }
                | Self::EmptyTable(_)
                | Self::DuplicateObservation { .. }
                | Self::ColumnConflict { .. }
                | Self::DuplicateYear { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ClimateError>;
