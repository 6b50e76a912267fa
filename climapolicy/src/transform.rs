//! The shape normalizer: turns a sheet as authored into a long table with the canonical
//! `category`, `group` and `value` columns.

use std::collections::HashSet;
use std::sync::OnceLock;

use enum_dispatch::enum_dispatch;
use log::debug;
use polars::prelude::*;
use regex::Regex;

use crate::cells::{column_as_f64, column_as_string};
use crate::domain::ObservationRow;
use crate::error::{ClimateError, Result};
use crate::schema::SheetSchema;
use crate::workbook::Sheet;
use crate::COL;

#[enum_dispatch]
pub trait Transform {
    fn transform(&self, sheet: &Sheet, schema: &SheetSchema) -> Result<DataFrame>;
}

#[enum_dispatch(Transform)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTransform {
    PassThrough(PassThrough),
    Unpivot(Unpivot),
}

impl ShapeTransform {
    /// Long form if the sheet already has the schema's group column, wide form otherwise.
    pub fn detect(sheet: &Sheet, schema: &SheetSchema) -> Self {
        if has_column(&sheet.frame, &schema.group_column) {
            PassThrough.into()
        } else {
            Unpivot.into()
        }
    }
}

/// Long form sheets: only the id, group and value columns are renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassThrough;

/// Wide form sheets: every column other than the id column is a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unpivot;

impl Transform for PassThrough {
    fn transform(&self, sheet: &Sheet, schema: &SheetSchema) -> Result<DataFrame> {
        require_column(sheet, &schema.value_column)?;
        for (source, canonical) in [
            (&schema.id_column, COL::CATEGORY),
            (&schema.group_column, COL::GROUP),
            (&schema.value_column, COL::VALUE),
        ] {
            if source != canonical && has_column(&sheet.frame, canonical) {
                return Err(ClimateError::ColumnConflict {
                    sheet: sheet.name.clone(),
                    column: canonical.to_string(),
                });
            }
        }
        let mut frame = sheet.frame.clone();
        frame.rename(&schema.id_column, COL::CATEGORY)?;
        frame.rename(&schema.group_column, COL::GROUP)?;
        frame.rename(&schema.value_column, COL::VALUE)?;
        Ok(frame)
    }
}

impl Transform for Unpivot {
    fn transform(&self, sheet: &Sheet, schema: &SheetSchema) -> Result<DataFrame> {
        let frame = &sheet.frame;
        let ids = column_as_string(frame.column(&schema.id_column)?)?;
        let description_column = schema
            .description_column
            .as_deref()
            .filter(|column| has_column(frame, column));
        let descriptions = match description_column {
            Some(column) => Some(column_as_string(frame.column(column)?)?),
            None => None,
        };
        let group_columns: Vec<&Series> = frame
            .get_columns()
            .iter()
            .filter(|series| {
                series.name() != schema.id_column.as_str()
                    && Some(series.name()) != description_column
            })
            .collect();
        // Any text group column keeps every cell as authored, so labels like `강화(강)` survive.
        let keep_text = group_columns
            .iter()
            .any(|series| series.dtype() == &DataType::String);

        let mut categories: Vec<Option<String>> = Vec::new();
        let mut groups: Vec<String> = Vec::new();
        let mut numbers: Vec<Option<f64>> = Vec::new();
        let mut labels: Vec<Option<String>> = Vec::new();
        let mut notes: Vec<Option<String>> = Vec::new();
        // Column-major: every row of the first group, then every row of the next one.
        for series in group_columns {
            let group = clean_group_name(series.name());
            categories.extend(ids.iter().cloned());
            groups.extend(std::iter::repeat(group).take(series.len()));
            if keep_text {
                labels.extend(column_as_string(series)?);
            } else {
                numbers.extend(column_as_f64(series)?);
            }
            if let Some(descriptions) = &descriptions {
                notes.extend(descriptions.iter().cloned());
            }
        }
        let values = if keep_text {
            Series::new(COL::VALUE, labels)
        } else {
            Series::new(COL::VALUE, numbers)
        };
        let mut columns = vec![
            Series::new(COL::CATEGORY, categories),
            Series::new(COL::GROUP, groups),
            values,
        ];
        if let Some(column) = description_column {
            columns.push(Series::new(column, notes));
        }
        Ok(DataFrame::new(columns)?)
    }
}

fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.get_column_names().iter().any(|column| *column == name)
}

fn require_column(sheet: &Sheet, name: &str) -> Result<()> {
    if has_column(&sheet.frame, name) {
        Ok(())
    } else {
        Err(ClimateError::MissingColumn {
            sheet: sheet.name.clone(),
            column: name.to_string(),
            columns: sheet
                .frame
                .get_column_names()
                .iter()
                .map(|column| column.to_string())
                .collect(),
        })
    }
}

fn unit_suffix() -> &'static Regex {
    static UNIT_SUFFIX: OnceLock<Regex> = OnceLock::new();
    UNIT_SUFFIX.get_or_init(|| {
        Regex::new(r"\s*[(（][^()（）]*[)）]\s*$").expect("unit suffix pattern is valid")
    })
}

/// Strips a trailing parenthesized unit annotation from a wide header, so that
/// `"더불어민주당 (백만톤 CO₂eq)"` and `"더불어민주당"` name the same group. Parentheses
/// inside the name (`정부(실적)-2018`) are kept.
pub fn clean_group_name(header: &str) -> String {
    unit_suffix().replace(header.trim(), "").trim().to_string()
}

/// A normalized sheet: canonical columns plus the schema it was read with.
#[derive(Debug, Clone)]
pub struct LongTable {
    pub sheet: String,
    pub frame: DataFrame,
    pub schema: SheetSchema,
}

/// Reshapes `sheet` into a [`LongTable`] according to `schema`.
pub fn normalize(sheet: &Sheet, schema: &SheetSchema) -> Result<LongTable> {
    if sheet.frame.height() == 0 {
        return Err(ClimateError::EmptyTable(sheet.name.clone()));
    }
    require_column(sheet, &schema.id_column)?;
    let transform = ShapeTransform::detect(sheet, schema);
    debug!(
        "Normalizing sheet '{}' as {:?} with shape {:?}",
        sheet.name,
        transform,
        sheet.frame.shape()
    );
    let frame = transform.transform(sheet, schema)?;
    let table = LongTable {
        sheet: sheet.name.clone(),
        frame,
        schema: schema.clone(),
    };
    table.check_unique()?;
    Ok(table)
}

impl LongTable {
    fn keys(&self) -> Result<(Vec<Option<String>>, Vec<Option<String>>)> {
        Ok((
            column_as_string(self.frame.column(COL::CATEGORY)?)?,
            column_as_string(self.frame.column(COL::GROUP)?)?,
        ))
    }

    fn check_unique(&self) -> Result<()> {
        let (categories, groups) = self.keys()?;
        let mut seen = HashSet::new();
        for (category, group) in categories.into_iter().zip(groups) {
            let (Some(category), Some(group)) = (category, group) else {
                continue;
            };
            if !seen.insert((category.clone(), group.clone())) {
                return Err(ClimateError::DuplicateObservation {
                    sheet: self.sheet.clone(),
                    category,
                    group,
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// One entry per frame row, `None` where the category or the group is missing.
    pub fn observations_aligned(&self) -> Result<Vec<Option<ObservationRow>>> {
        let (categories, groups) = self.keys()?;
        let values = column_as_f64(self.frame.column(COL::VALUE)?)?;
        Ok(categories
            .into_iter()
            .zip(groups)
            .zip(values)
            .map(|((category, group), value)| {
                Some(ObservationRow::new(category?, group?, value))
            })
            .collect())
    }

    /// Rows with both a category and a group. Values that are neither numbers nor numeric
    /// text are `None`.
    pub fn observations(&self) -> Result<Vec<ObservationRow>> {
        Ok(self.observations_aligned()?.into_iter().flatten().collect())
    }

    /// The value column read as text, row aligned with the frame.
    pub fn value_labels(&self) -> Result<Vec<Option<String>>> {
        Ok(column_as_string(self.frame.column(COL::VALUE)?)?)
    }

    /// Cells of an extra column kept from a long form sheet, or `None` if there is no such
    /// column.
    pub fn extra_column(&self, name: &str) -> Result<Option<Vec<Option<String>>>> {
        if !has_column(&self.frame, name) {
            return Ok(None);
        }
        Ok(Some(column_as_string(self.frame.column(name)?)?))
    }

    pub fn categories(&self) -> Result<Vec<String>> {
        let (categories, _) = self.keys()?;
        Ok(unique_in_order(categories.into_iter().flatten()))
    }

    pub fn groups(&self) -> Result<Vec<String>> {
        let (_, groups) = self.keys()?;
        Ok(unique_in_order(groups.into_iter().flatten()))
    }

    /// The table with the schema's display names restored and `derived` columns appended
    /// after the normalized ones.
    pub fn to_export_frame(&self, derived: Vec<Series>) -> Result<DataFrame> {
        let mut frame = self.frame.clone();
        frame.rename(COL::CATEGORY, &self.schema.id_column)?;
        frame.rename(COL::GROUP, &self.schema.group_column)?;
        frame.rename(COL::VALUE, &self.schema.value_column)?;
        for series in derived {
            frame.with_column(series)?;
        }
        Ok(frame)
    }
}

pub(crate) fn unique_in_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use polars::df;

    use super::*;

    fn sheet(name: &str, frame: DataFrame) -> Sheet {
        Sheet {
            name: name.to_string(),
            frame,
        }
    }

    fn wide_emissions() -> Sheet {
        sheet(
            "온실가스종합비교",
            df!(
                "부문" => &["총배출", "전환", "산업"],
                "2018년 기준" => &[727.6, 269.6, 260.5],
                "2030 NDC (백만톤 CO₂eq)" => &[436.6, 145.9, 222.6],
                "더불어민주당" => &[Some(306.5), None, Some(200.0)],
            )
            .unwrap(),
        )
    }

    #[test]
    fn wide_sheet_yields_one_row_per_cell() {
        let sheet = wide_emissions();
        let table = normalize(&sheet, &SheetSchema::emissions()).unwrap();
        let (rows, cols) = sheet.frame.shape();
        assert_eq!(table.len(), rows * (cols - 1));

        let observations = table.observations().unwrap();
        let mut expected: Vec<f64> = vec![727.6, 269.6, 260.5, 436.6, 145.9, 222.6, 306.5, 200.0];
        let mut actual: Vec<f64> = observations.iter().filter_map(|o| o.value).collect();
        expected.sort_by(f64::total_cmp);
        actual.sort_by(f64::total_cmp);
        assert_eq!(actual, expected);
        assert_eq!(observations.iter().filter(|o| o.value.is_none()).count(), 1);
    }

    #[test]
    fn wide_sheet_unpivots_column_major() {
        let table = normalize(&wide_emissions(), &SheetSchema::emissions()).unwrap();
        let observations = table.observations().unwrap();
        assert_eq!(
            observations[0],
            ObservationRow::new("총배출", "2018년 기준", Some(727.6))
        );
        assert_eq!(
            observations[3],
            ObservationRow::new("총배출", "2030 NDC", Some(436.6))
        );
        assert_eq!(
            table.categories().unwrap(),
            vec!["총배출".to_string(), "전환".to_string(), "산업".to_string()]
        );
        assert_eq!(
            table.groups().unwrap(),
            vec!["2018년 기준", "2030 NDC", "더불어민주당"]
        );
    }

    #[test]
    fn energy_mix_example_yields_four_observations() {
        let sheet = sheet(
            "에너지믹스",
            df!(
                "에너지원" => &["석탄", "원자력"],
                "정부(실적)-2018" => &[41.9, 23.4],
                "정부(계획)-2040" => &[Some("-"), Some("30")],
            )
            .unwrap(),
        );
        let table = normalize(&sheet, &SheetSchema::energy()).unwrap();
        let observations = table.observations().unwrap();
        assert_eq!(observations.len(), 4);
        assert_eq!(observations[2], ObservationRow::new("석탄", "정부(계획)-2040", None));
        assert_eq!(
            observations[3],
            ObservationRow::new("원자력", "정부(계획)-2040", Some(30.0))
        );
    }

    #[test]
    fn long_sheet_is_renamed_only() {
        let frame = df!(
            "부문" => &["총배출", "총배출"],
            "비고" => &["a", "b"],
            "정당" => &["2018년 기준", "더불어민주당"],
            "값" => &[727.6, 306.5],
        )
        .unwrap();
        let table = normalize(&sheet("배출", frame.clone()), &SheetSchema::emissions()).unwrap();
        assert_eq!(
            table.frame.get_column_names(),
            vec![COL::CATEGORY, "비고", COL::GROUP, COL::VALUE]
        );
        assert_eq!(table.to_export_frame(vec![]).unwrap(), frame);
    }

    #[test]
    fn structural_problems_are_errors() {
        let frame = df!("분야" => &["a"], "값" => &[1.0]).unwrap();
        let err = normalize(&sheet("배출", frame), &SheetSchema::emissions()).unwrap_err();
        assert!(matches!(err, ClimateError::MissingColumn { ref column, .. } if column == "부문"));

        let frame = df!("부문" => &["a"], "정당" => &["x"]).unwrap();
        let err = normalize(&sheet("배출", frame), &SheetSchema::emissions()).unwrap_err();
        assert!(matches!(err, ClimateError::MissingColumn { ref column, .. } if column == "값"));

        let frame = DataFrame::new(vec![Series::new_empty("부문", &DataType::String)]).unwrap();
        let err = normalize(&sheet("배출", frame), &SheetSchema::emissions()).unwrap_err();
        assert!(matches!(err, ClimateError::EmptyTable(_)));

        let frame = df!(
            "부문" => &["전환", "전환"],
            "정당" => &["x", "x"],
            "값" => &[1.0, 2.0],
        )
        .unwrap();
        let err = normalize(&sheet("배출", frame), &SheetSchema::emissions()).unwrap_err();
        assert!(matches!(err, ClimateError::DuplicateObservation { .. }));
    }

    #[test]
    fn canonical_name_taken_by_another_column_is_a_conflict() {
        let frame = df!(
            "분야" => &["원자력"],
            "정당" => &["A당"],
            "강도" => &["3"],
            "value" => &["비고"],
        )
        .unwrap();
        let err = normalize(&sheet("정성평가", frame), &SheetSchema::policies()).unwrap_err();
        assert!(matches!(
            err,
            ClimateError::ColumnConflict { ref column, .. } if column == COL::VALUE
        ));
        assert!(err.is_section_local());
    }

    #[test]
    fn wide_text_cells_are_kept_as_authored() {
        let frame = df!(
            "분야" => &["원자력", "산업"],
            "A당" => &["강화(강)", "매우 강함"],
            "B당" => &[Some(2.0), None],
            "내용" => &[Some("SMR"), None],
        )
        .unwrap();
        let table = normalize(&sheet("정성평가", frame), &SheetSchema::policies()).unwrap();
        assert_eq!(table.groups().unwrap(), vec!["A당", "B당"]);
        assert_eq!(
            table.value_labels().unwrap(),
            vec![
                Some("강화(강)".to_string()),
                Some("매우 강함".to_string()),
                Some("2".to_string()),
                None
            ]
        );
        assert_eq!(
            table.extra_column("내용").unwrap().unwrap(),
            vec![Some("SMR".to_string()), None, Some("SMR".to_string()), None]
        );
        assert_eq!(table.observations().unwrap()[2].value, Some(2.0));
    }

    #[test]
    fn unit_suffixes_are_stripped() {
        let cleaned = ["비중(%)", "정부(실적)-2018", " 2030 NDC （백만톤 CO₂eq） ", "국민의 힘"]
            .iter()
            .map(|header| clean_group_name(header))
            .collect_vec();
        assert_eq!(cleaned, vec!["비중", "정부(실적)-2018", "2030 NDC", "국민의 힘"]);
    }

    #[test]
    fn export_restores_display_names_and_appends_derived() {
        let table = normalize(&wide_emissions(), &SheetSchema::emissions()).unwrap();
        let derived = Series::new(COL::REDUCTION_PCT, vec![None::<f64>; table.len()]);
        let export = table.to_export_frame(vec![derived]).unwrap();
        assert_eq!(
            export.get_column_names(),
            vec!["부문", "정당", "값", COL::REDUCTION_PCT]
        );
    }
}
