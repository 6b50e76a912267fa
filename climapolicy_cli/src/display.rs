use comfy_table::{presets::NOTHING, *};
use itertools::Itertools;
use polars::prelude::{AnyValue, DataFrame};

use climapolicy::{
    cells::format_number,
    config::{ColorMap, Config, DEFAULT_COLOR},
    domain::PolicyAssessment,
    emissions::{SectorEmissions, TotalEmissions},
    energy::{ScenarioShare, SourceGroupTotals, SourceShare},
    metrics::{Bucket, Metric, NOT_APPLICABLE},
    pathways::{NetZero, PathwayAnalysis, PeriodReduction},
    policy::{AverageLevel, RejectedRow},
    schema::SheetKind,
};

fn new_table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: ToString,
{
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .into_iter()
                .map(|name| Cell::new(name.to_string()).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        )
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    table
}

/// Terminal color for a configured color, either `#RRGGBB` or one of the few names used in
/// the default scales.
pub fn terminal_color(color: &str) -> Option<Color> {
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |idx: usize| u8::from_str_radix(hex.get(idx..idx + 2)?, 16).ok();
        return Some(Color::Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        });
    }
    match color.to_ascii_lowercase().as_str() {
        "red" => Some(Color::Red),
        "green" => Some(Color::DarkGreen),
        "lightgreen" => Some(Color::Green),
        "orange" => Some(Color::Rgb {
            r: 255,
            g: 165,
            b: 0,
        }),
        _ => None,
    }
}

fn colored(text: impl ToString, color: &str) -> Cell {
    let cell = Cell::new(text.to_string());
    match terminal_color(color) {
        Some(color) => cell.fg(color),
        None => cell,
    }
}

fn bucket_cell(bucket: Option<&Bucket>) -> Cell {
    match bucket {
        Some(bucket) => colored(&bucket.label, &bucket.color),
        None => Cell::new(""),
    }
}

fn number(value: Option<f64>) -> String {
    value
        .map(format_number)
        .unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

fn percent(metric: Metric) -> String {
    match metric {
        Metric::Value(_) => format!("{metric}%"),
        Metric::NotApplicable(_) => metric.to_string(),
    }
}

/// Renders a cell of a pivoted table; nulls become `n/a`.
fn any_value_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => NOT_APPLICABLE.to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::Float64(v) => format_number(*v),
        AnyValue::Float32(v) => format_number(f64::from(*v)),
        other => other.to_string(),
    }
}

pub fn display_frame(df: &DataFrame) -> anyhow::Result<()> {
    let mut table = new_table(df.get_column_names());
    for idx in 0..df.height() {
        let row = df
            .get_columns()
            .iter()
            .map(|column| Ok(any_value_text(&column.get(idx)?)))
            .collect::<anyhow::Result<Vec<String>>>()?;
        table.add_row(row);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_sheets(
    names: &[String],
    resolved: &[(SheetKind, Option<String>)],
) -> anyhow::Result<()> {
    let mut table = new_table(["Sheet"]);
    for name in names {
        table.add_row(vec![name]);
    }
    println!("\n{}", table);

    let mut table = new_table(["Section", "Resolved sheet"]);
    for (kind, sheet) in resolved {
        table.add_row(vec![
            Cell::new(kind),
            Cell::new(sheet.as_deref().unwrap_or("not found")),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_totals(
    totals: &[TotalEmissions],
    target: Option<(&str, f64)>,
    colors: &ColorMap,
) -> anyhow::Result<()> {
    let mut table = new_table(["Group", "Total", "Reduction", "Assessment"]);
    for total in totals {
        table.add_row(vec![
            colored(&total.group, colors.color(&total.group)),
            Cell::new(number(total.total)),
            Cell::new(percent(total.reduction)),
            bucket_cell(total.badge.as_ref()),
        ]);
    }
    println!("\n{}", table);
    if let Some(line) = target_line(target) {
        println!("{line}");
    }
    Ok(())
}

fn target_line(target: Option<(&str, f64)>) -> Option<String> {
    target.map(|(group, value)| format!("Target ({group}): {}", format_number(value)))
}

pub fn display_breakdown(rows: &[SectorEmissions], colors: &ColorMap) -> anyhow::Result<()> {
    let mut table = new_table([
        "Sector",
        "Group",
        "Emissions",
        "Reduction",
        "Absolute reduction",
        "Target",
        "Bucket",
    ]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.sector),
            colored(&row.group, colors.color(&row.group)),
            Cell::new(number(row.value)),
            Cell::new(percent(row.reduction)),
            Cell::new(row.absolute_reduction),
            Cell::new(number(row.target)),
            bucket_cell(row.bucket.as_ref()),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_mix(
    scenario: &str,
    shares: &[SourceShare],
    colors: &ColorMap,
) -> anyhow::Result<()> {
    let mut table = new_table(["Source", scenario]);
    for share in shares {
        table.add_row(vec![
            colored(&share.source, colors.color(&share.source)),
            Cell::new(number(share.share)),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_source_across(source: &str, shares: &[ScenarioShare]) -> anyhow::Result<()> {
    let mut table = new_table(["Scenario", source]);
    for share in shares {
        table.add_row(vec![share.scenario.clone(), number(share.share)]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_group_totals(totals: &[SourceGroupTotals]) -> anyhow::Result<()> {
    let mut table = new_table(["Scenario", "Renewable", "Fossil", "Clean"]);
    for total in totals {
        table.add_row(vec![
            total.scenario.clone(),
            format_number(total.renewable),
            format_number(total.fossil),
            format_number(total.clean),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_pathway_analysis(
    analysis: &[PathwayAnalysis],
    net_zero_year: i32,
    config: &Config,
) -> anyhow::Result<()> {
    let references = analysis
        .first()
        .map(|first| first.distances.iter().map(|(name, _)| name.clone()).collect_vec())
        .unwrap_or_default();
    let header = ["Party", "Nearest", "Compliance"]
        .into_iter()
        .map(String::from)
        .chain(references.iter().map(|name| format!("d({name})")))
        .chain([format!("Net zero {net_zero_year}")]);
    let mut table = new_table(header);
    for party in analysis {
        let net_zero = match party.net_zero {
            Some(true) => "yes",
            Some(false) => "no",
            None => NOT_APPLICABLE,
        };
        let nearest_color = party
            .nearest
            .reference()
            .map_or(DEFAULT_COLOR, |reference| config.reference_color(reference));
        let row = [
            colored(&party.party, config.party_colors.color(&party.party)),
            colored(&party.nearest, nearest_color),
            colored(&party.compliance, nearest_color),
        ]
        .into_iter()
        .chain(
            party
                .distances
                .iter()
                .map(|(_, distance)| Cell::new(distance)),
        )
        .chain([Cell::new(net_zero)])
        .collect_vec();
        table.add_row(row);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_period_reductions(reductions: &[PeriodReduction]) -> anyhow::Result<()> {
    let mut table = new_table(["Pathway", "Period", "Reduction"]);
    for reduction in reductions {
        table.add_row(vec![
            reduction.pathway.clone(),
            reduction.period.label(),
            percent(reduction.reduction),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_net_zero(net_zero: &[NetZero], target_year: i32) -> anyhow::Result<()> {
    let mut table = new_table([
        "Pathway".to_string(),
        "Net zero year".to_string(),
        format!("Emissions in {target_year}"),
    ]);
    for curve in net_zero {
        table.add_row(vec![
            curve.pathway.clone(),
            curve
                .year
                .map(|year| year.to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            number(curve.emissions_at_target_year),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_assessments(assessments: &[&PolicyAssessment]) -> anyhow::Result<()> {
    let mut table = new_table(["Category", "Party", "Level", "Score", "Description"]);
    for assessment in assessments {
        table.add_row(vec![
            assessment.category.clone(),
            assessment.party.clone(),
            assessment.level.label(),
            assessment.level.score().to_string(),
            assessment.description.clone().unwrap_or_default(),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_averages(title: &str, averages: &[AverageLevel]) -> anyhow::Result<()> {
    let mut table = new_table([title, "Mean level", "Assessments"]);
    for average in averages {
        table.add_row(vec![
            average.name.clone(),
            format!("{:.2}", average.mean),
            average.count.to_string(),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

pub fn display_rejected(rejected: &[RejectedRow]) -> anyhow::Result<()> {
    let mut table = new_table(["Row", "Category", "Party", "Value", "Reason"]);
    for row in rejected {
        table.add_row(vec![
            row.row.to_string(),
            row.category.clone().unwrap_or_default(),
            row.party.clone().unwrap_or_default(),
            row.value.clone().unwrap_or_default(),
            row.reason.clone(),
        ]);
    }
    println!("\n{}", table);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_named_colors() {
        assert_eq!(
            terminal_color("#004EA2"),
            Some(Color::Rgb {
                r: 0,
                g: 0x4e,
                b: 0xa2
            })
        );
        assert_eq!(terminal_color("red"), Some(Color::Red));
        assert_eq!(terminal_color("#12"), None);
        assert_eq!(terminal_color("#GGGGGG"), None);
        assert_eq!(terminal_color("teal"), None);
    }

    #[test]
    fn undefined_values_render_na() {
        assert_eq!(number(None), "n/a");
        assert_eq!(number(Some(436.0)), format_number(436.0));
        assert_eq!(percent(Metric::Value(40.0)), "40.0%");
        assert_eq!(
            percent(Metric::NotApplicable(
                climapolicy::metrics::Undefined::MissingBaseline
            )),
            "n/a"
        );
        assert_eq!(any_value_text(&AnyValue::Null), "n/a");
    }

    #[test]
    fn target_annotation() {
        assert_eq!(
            target_line(Some(("2030 NDC", 436.6))),
            Some(format!("Target (2030 NDC): {}", format_number(436.6)))
        );
        assert_eq!(target_line(None), None);
    }
}
