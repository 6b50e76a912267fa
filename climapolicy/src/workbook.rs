//! Loading workbooks into name-keyed `DataFrame`s, and the cache that memoizes them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use calamine::{open_workbook_auto, Data, Range, Reader};
use log::{debug, info, warn};
use polars::prelude::*;

use crate::cells::format_number;
use crate::error::{ClimateError, Result};

/// A sheet exactly as authored: its name and its cells as a `DataFrame`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub frame: DataFrame,
}

/// All sheets of one source, in the order of the source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Builds a workbook from in-memory tables. A later sheet with an already used name
    /// replaces the earlier one in place.
    pub fn from_sheets(sheets: impl IntoIterator<Item = (String, DataFrame)>) -> Self {
        let mut workbook = Self::default();
        for (name, frame) in sheets {
            workbook.insert(name, frame);
        }
        workbook
    }

    fn insert(&mut self, name: String, frame: DataFrame) {
        match self.sheets.iter_mut().find(|sheet| sheet.name == name) {
            Some(existing) => {
                warn!("Sheet '{name}' appears twice, keeping the last one");
                existing.frame = frame;
            }
            None => self.sheets.push(Sheet { name, frame }),
        }
    }

    /// Reads every sheet of an `.xlsx`/`.xlsm`/`.xls`/`.ods` file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClimateError::SourceUnavailable {
                path: path.to_path_buf(),
            });
        }
        info!("Reading workbook {}", path.display());
        let mut source = open_workbook_auto(path)?;
        let mut workbook = Self::default();
        for name in source.sheet_names() {
            let range = source.worksheet_range(&name)?;
            let frame = range_to_frame(&range)?;
            debug!("Loaded sheet '{name}' with shape {:?}", frame.shape());
            workbook.insert(name, frame);
        }
        Ok(workbook)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

const EMPTY_CELL: &Data = &Data::Empty;

fn cell_is_empty(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        _ => None,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_number(*f)),
        Data::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Header names with blanks filled in and repeats suffixed (`값`, `값.1`, ...). A suffix never
/// reuses a name already taken by an earlier header.
fn header_names(header: &[Data]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = cell_text(cell).unwrap_or_else(|| format!("column_{idx}"));
            let mut name = base.clone();
            let mut count = 0;
            while used.contains(&name) {
                count += 1;
                name = format!("{base}.{count}");
            }
            used.insert(name.clone());
            name
        })
        .collect()
}

/// First row is the header. Columns whose non-empty cells are all numbers become `Float64`,
/// every other column becomes `String`. Fully empty rows are skipped.
fn range_to_frame(range: &Range<Data>) -> Result<DataFrame> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::default());
    };
    let names = header_names(header);
    let body: Vec<&[Data]> = rows
        .filter(|row| !row.iter().all(cell_is_empty))
        .collect();

    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(EMPTY_CELL))
                .collect();
            let numeric = cells
                .iter()
                .all(|cell| cell_is_empty(cell) || cell_number(cell).is_some());
            if numeric {
                let values: Vec<Option<f64>> = cells.iter().map(|cell| cell_number(cell)).collect();
                Series::new(name, values)
            } else {
                let values: Vec<Option<String>> = cells.iter().map(|cell| cell_text(cell)).collect();
                Series::new(name, values)
            }
        })
        .collect::<Vec<Series>>();
    Ok(DataFrame::new(columns)?)
}

/// Where a dashboard gets its tables from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Builtin,
}

/// Memoized workbooks keyed by canonical path. Each path is read at most once; entries are
/// never mutated after insertion, so they can be shared between sessions.
#[derive(Debug, Default)]
pub struct SheetCache {
    entries: Mutex<HashMap<PathBuf, Arc<Workbook>>>,
}

fn cache_key(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            ClimateError::SourceUnavailable {
                path: path.to_path_buf(),
            }
        } else {
            ClimateError::Io(err)
        }
    })
}

impl SheetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached workbook for `path`, reading it on first use. The lock is held while
    /// reading so concurrent callers never read the same file twice.
    pub fn get_or_load<P: AsRef<Path>>(&self, path: P) -> Result<Arc<Workbook>> {
        let key = cache_key(path.as_ref())?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(workbook) = entries.get(&key) {
            debug!("Workbook cache hit for {}", key.display());
            return Ok(Arc::clone(workbook));
        }
        let workbook = Arc::new(Workbook::from_path(&key)?);
        entries.insert(key, Arc::clone(&workbook));
        Ok(workbook)
    }

    /// Drops the entry for `path`. Returns whether there was one.
    pub fn invalidate<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let removed = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some();
        if removed {
            info!("Invalidated cached workbook {}", key.display());
        }
        removed
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
