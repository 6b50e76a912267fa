use std::sync::Arc;

use log::{debug, info, warn};
use polars::frame::DataFrame;

use crate::config::Config;
use crate::emissions::Emissions;
use crate::energy::EnergyMix;
use crate::error::{ClimateError, Result};
use crate::pathways::Pathways;
use crate::policy::Policies;
use crate::schema::SheetKind;
use crate::transform::{normalize, LongTable};
use crate::workbook::{SheetCache, Source, Workbook};

// Re-exports
pub use column_names as COL;

// Modules
pub mod builtin;
pub mod cells;
pub mod column_names;
pub mod config;
pub mod domain;
pub mod emissions;
pub mod energy;
pub mod error;
pub mod formatters;
pub mod metrics;
pub mod pathways;
pub mod policy;
pub mod schema;
pub mod search;
pub mod transform;
pub mod workbook;

/// Outcome of one dashboard section: its data, or the section-local failure that keeps it
/// from rendering.
#[derive(Debug)]
pub enum Section<T> {
    Ready(T),
    Unavailable(ClimateError),
}

impl<T> Section<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(value) => Some(value),
            Section::Unavailable(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Section::Ready(_))
    }

    /// Section-local failures become `Unavailable` unless the section is required.
    fn from_result(result: Result<T>, kind: SheetKind, required: bool) -> Result<Self> {
        match result {
            Ok(value) => Ok(Section::Ready(value)),
            Err(err) if err.is_section_local() && !required => {
                warn!("Section {kind} unavailable: {err}");
                Ok(Section::Unavailable(err))
            }
            Err(err) => Err(err),
        }
    }
}

/// Every section of the dashboard for one source.
#[derive(Debug)]
pub struct DashboardReport {
    pub emissions: Section<Emissions>,
    pub energy: Section<EnergyMix>,
    pub pathways: Section<Pathways>,
    pub policies: Section<Policies>,
}

/// Type for climate policy data and API
#[derive(Debug)]
pub struct ClimatePolicy {
    pub config: Config,
    source: Source,
    workbook: Arc<Workbook>,
}

fn load(source: &Source, cache: &SheetCache) -> Result<Arc<Workbook>> {
    match source {
        Source::Path(path) => cache.get_or_load(path),
        Source::Builtin => Ok(Arc::new(builtin::workbook()?)),
    }
}

impl ClimatePolicy {
    /// Setup the ClimatePolicy object from the configured source, reading workbooks through
    /// `cache`
    pub fn new_with_config(config: Config, cache: &SheetCache) -> Result<Self> {
        debug!("config: {config:?}");
        config.validate()?;
        let source = config.source();
        let workbook = load(&source, cache)?;
        info!("Loaded {} sheets from {source:?}", workbook.len());
        Ok(Self {
            config,
            source,
            workbook,
        })
    }

    /// Setup the ClimatePolicy object with the built-in tables
    pub fn builtin(config: Config) -> Result<Self> {
        let config = Config {
            workbook: None,
            ..config
        };
        Self::from_workbook(config, builtin::workbook()?)
    }

    /// Setup the ClimatePolicy object with an already loaded workbook
    pub fn from_workbook(config: Config, workbook: Workbook) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source: Source::Builtin,
            workbook: Arc::new(workbook),
        })
    }

    /// Reads from another source. The cached workbook of the previous path is dropped when
    /// the path changes and the new source has loaded. A failed load keeps the current source.
    pub fn switch_source(&mut self, source: Source, cache: &SheetCache) -> Result<()> {
        let workbook = load(&source, cache)?;
        if let Source::Path(previous) = &self.source {
            if source != self.source {
                cache.invalidate(previous);
            }
        }
        self.workbook = workbook;
        self.config.workbook = match &source {
            Source::Path(path) => Some(path.clone()),
            Source::Builtin => None,
        };
        self.source = source;
        Ok(())
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Resolves and normalizes the sheet of one kind.
    pub fn normalized(&self, kind: SheetKind) -> Result<LongTable> {
        let schema = self.config.schema(kind);
        let sheet = self.workbook.resolve(&schema.query)?;
        debug!("Sheet '{}' resolved for {kind}", sheet.name);
        normalize(sheet, schema)
    }

    pub fn emissions(&self) -> Result<Emissions> {
        Emissions::new(self.normalized(SheetKind::Emissions)?, &self.config)
    }

    pub fn energy_mix(&self) -> Result<EnergyMix> {
        EnergyMix::new(self.normalized(SheetKind::Energy)?, &self.config)
    }

    pub fn pathways(&self) -> Result<Pathways> {
        Pathways::new(self.normalized(SheetKind::Pathways)?, &self.config)
    }

    pub fn policies(&self) -> Result<Policies> {
        Policies::new(self.normalized(SheetKind::Policies)?)
    }

    /// Builds every section. Failures of optional sections are reported in the section;
    /// a required section that fails, or a non section-local failure, is an error.
    pub fn report(&self) -> Result<DashboardReport> {
        let required = |kind| self.config.schema(kind).required;
        Ok(DashboardReport {
            emissions: Section::from_result(
                self.emissions(),
                SheetKind::Emissions,
                required(SheetKind::Emissions),
            )?,
            energy: Section::from_result(
                self.energy_mix(),
                SheetKind::Energy,
                required(SheetKind::Energy),
            )?,
            pathways: Section::from_result(
                self.pathways(),
                SheetKind::Pathways,
                required(SheetKind::Pathways),
            )?,
            policies: Section::from_result(
                self.policies(),
                SheetKind::Policies,
                required(SheetKind::Policies),
            )?,
        })
    }

    /// The export table of one kind, in the layout written to CSV/JSON.
    pub fn export(&self, kind: SheetKind) -> Result<DataFrame> {
        match kind {
            SheetKind::Emissions => self.emissions()?.export_frame(),
            SheetKind::Energy => self.energy_mix()?.export_frame(),
            SheetKind::Pathways => self.pathways()?.table().to_export_frame(vec![]),
            SheetKind::Policies => self.policies()?.export_frame(),
        }
    }
}
