//! Helpers to read polars columns as plain Rust values, whatever dtype the loader inferred.

use polars::prelude::*;

/// Renders a number the way a spreadsheet shows it: integral values without a fraction.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Parses a text cell as a number, accepting thousands separators and surrounding spaces.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reads a column as optional numbers. Numeric columns are cast, text columns are parsed cell
/// by cell; cells that are not numbers become `None`.
pub fn column_as_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    if series.dtype().is_numeric() {
        let cast = series.cast(&DataType::Float64)?;
        Ok(cast.f64()?.into_iter().collect())
    } else if series.dtype() == &DataType::String {
        Ok(series
            .str()?
            .into_iter()
            .map(|cell| cell.and_then(parse_number))
            .collect())
    } else {
        Ok(vec![None; series.len()])
    }
}

/// Reads a column as optional strings, rendering numbers without trailing `.0`.
pub fn column_as_string(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    if series.dtype() == &DataType::String {
        Ok(series
            .str()?
            .into_iter()
            .map(|cell| cell.map(|s| s.trim().to_string()))
            .collect())
    } else if series.dtype().is_numeric() {
        let cast = series.cast(&DataType::Float64)?;
        Ok(cast
            .f64()?
            .into_iter()
            .map(|cell| cell.map(format_number))
            .collect())
    } else if series.dtype() == &DataType::Boolean {
        Ok(series
            .bool()?
            .into_iter()
            .map(|cell| cell.map(|b| b.to_string()))
            .collect())
    } else {
        Ok(vec![None; series.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_like_a_spreadsheet() {
        assert_eq!(format_number(2018.0), "2018");
        assert_eq!(format_number(727.6), "727.6");
        assert_eq!(format_number(-2.0), "-2");
    }

    #[test]
    fn text_cells_parse_as_numbers() {
        assert_eq!(parse_number(" 1,234.5 "), Some(1234.5));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn columns_read_whatever_the_dtype() -> anyhow::Result<()> {
        let years = Series::new("연도", &[2018i64, 2030]);
        assert_eq!(
            column_as_string(&years)?,
            vec![Some("2018".to_string()), Some("2030".to_string())]
        );
        let text = Series::new("값", &[Some("727.6"), Some("없음"), None]);
        assert_eq!(column_as_f64(&text)?, vec![Some(727.6), None, None]);
        let numbers = Series::new("값", &[Some(1.5f64), None]);
        assert_eq!(column_as_f64(&numbers)?, vec![Some(1.5), None]);
        Ok(())
    }
}
