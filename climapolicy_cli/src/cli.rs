use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumString;

use climapolicy::{
    config::{Config, Period},
    formatters::{
        CsvFormatter, JsonFormatter, JsonLinesFormatter, OutputFormatter, OutputGenerator,
    },
    schema::SheetKind,
    workbook::SheetCache,
    ClimatePolicy, Section,
};

use crate::display::{
    display_assessments, display_averages, display_breakdown, display_frame,
    display_group_totals, display_mix, display_net_zero, display_pathway_analysis,
    display_period_reductions, display_rejected, display_sheets, display_source_across,
    display_totals,
};
use crate::error::{CliError, CliResult};

/// Defines the output formats we are able to produce data in.
#[derive(Clone, Debug, Deserialize, Serialize, EnumString, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum OutputFormat {
    Csv,
    Json,
    JsonLines,
}

impl From<&OutputFormat> for OutputFormatter {
    fn from(value: &OutputFormat) -> Self {
        match value {
            OutputFormat::Csv => OutputFormatter::Csv(CsvFormatter::default()),
            OutputFormat::Json => OutputFormatter::Json(JsonFormatter),
            OutputFormat::JsonLines => OutputFormatter::JsonLines(JsonLinesFormatter),
        }
    }
}

impl From<OutputFormat> for OutputFormatter {
    fn from(value: OutputFormat) -> Self {
        Self::from(&value)
    }
}

fn write_output<T, U>(
    output_generator: T,
    mut data: DataFrame,
    output_file: Option<U>,
) -> CliResult<()>
where
    T: OutputGenerator,
    U: AsRef<Path>,
{
    if let Some(output_file) = output_file {
        let mut f = File::create(output_file).context("Failed to write output")?;
        output_generator.save(&mut f, &mut data)?;
    } else {
        let mut stdout_lock = std::io::stdout().lock();
        output_generator.save(&mut stdout_lock, &mut data)?;
    };
    Ok(())
}

/// Parses `START-END`, e.g. `2018-2050`.
fn parse_period(value: &str) -> anyhow::Result<Period> {
    let (start, end) = value
        .split_once('-')
        .ok_or_else(|| anyhow!("Expected START-END, got '{value}'"))?;
    let period = Period {
        start: start.trim().parse()?,
        end: end.trim().parse()?,
    };
    if period.start >= period.end {
        return Err(anyhow!("Period must end after it starts: '{value}'"));
    }
    Ok(period)
}

fn open(config: Config) -> CliResult<ClimatePolicy> {
    let cache = SheetCache::new();
    Ok(ClimatePolicy::new_with_config(config, &cache)?)
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    fn run(&self, config: Config) -> CliResult<()>;
}

/// The `sheets` command lists the sheets of the source and the sheet each section resolves to.
#[derive(Args, Debug)]
pub struct SheetsCommand;

impl RunCommand for SheetsCommand {
    fn run(&self, config: Config) -> CliResult<()> {
        info!("Running `sheets` subcommand");
        let climate_policy = open(config)?;
        let workbook = climate_policy.workbook();
        let resolved = SheetKind::iter()
            .map(|kind| {
                let sheet = workbook
                    .resolve(&climate_policy.config.schema(kind).query)
                    .ok()
                    .map(|sheet| sheet.name.clone());
                (kind, sheet)
            })
            .collect::<Vec<_>>();
        display_sheets(&workbook.sheet_names(), &resolved)?;
        Ok(())
    }
}

/// The `emissions` command shows total emissions by group, or the sector breakdown.
#[derive(Args, Debug)]
pub struct EmissionsCommand {
    #[arg(
        short,
        long,
        help = "Show the breakdown of one sector",
        value_name = "SECTOR"
    )]
    sector: Option<String>,
    #[arg(
        short,
        long,
        help = "Only show these groups (parties, baseline or target)",
        num_args = 0..
    )]
    group: Vec<String>,
    #[arg(long, help = "Show the breakdown of every sector")]
    breakdown: bool,
    #[arg(long, help = "Show the sector by group table")]
    grid: bool,
    #[arg(long, help = "Only show groups with a defined reduction, with their assessment")]
    summary: bool,
}

impl RunCommand for EmissionsCommand {
    fn run(&self, config: Config) -> CliResult<()> {
        info!("Running `emissions` subcommand");
        let climate_policy = open(config)?;
        let emissions = climate_policy.emissions()?;
        let colors = &climate_policy.config.party_colors;
        if self.grid {
            display_frame(&emissions.grid()?)?;
        } else if self.sector.is_some() || self.breakdown {
            if let Some(sector) = self.sector.as_deref() {
                if !emissions.sectors().iter().any(|known| known == sector) {
                    return Err(CliError::Generic(format!(
                        "Unknown sector '{sector}'. Sectors: {:?}",
                        emissions.sectors()
                    )));
                }
            }
            let rows = emissions.breakdown(self.sector.as_deref(), &self.group);
            display_breakdown(&rows, colors)?;
        } else {
            let totals = if self.summary {
                emissions.summary()
            } else {
                emissions.totals()
            };
            let totals = totals
                .into_iter()
                .filter(|total| self.group.is_empty() || self.group.contains(&total.group))
                .collect::<Vec<_>>();
            display_totals(&totals, emissions.total_target(), colors)?;
        }
        Ok(())
    }
}

/// The `energy` command shows the energy mix of the scenarios.
#[derive(Args, Debug)]
#[group(required = false, multiple = false)]
pub struct EnergyCommand {
    #[arg(long, help = "Show the mix of one scenario", value_name = "SCENARIO")]
    scenario: Option<String>,
    #[arg(long, help = "Show one source across scenarios", value_name = "SOURCE")]
    source: Option<String>,
    #[arg(long, help = "Show renewable, fossil and clean totals per scenario")]
    groups: bool,
}

impl RunCommand for EnergyCommand {
    fn run(&self, config: Config) -> CliResult<()> {
        info!("Running `energy` subcommand");
        let climate_policy = open(config)?;
        let energy = climate_policy.energy_mix()?;
        println!("Unit: {}", energy.unit());
        if let Some(scenario) = self.scenario.as_deref() {
            display_mix(
                scenario,
                &energy.mix(scenario),
                &climate_policy.config.energy_colors,
            )?;
        } else if let Some(source) = self.source.as_deref() {
            display_source_across(source, &energy.source_across(source))?;
        } else if self.groups {
            display_group_totals(&energy.group_totals())?;
        } else {
            display_frame(&energy.pivot()?)?;
        }
        Ok(())
    }
}

/// The `pathways` command compares party projections with the reference temperature
/// pathways.
#[derive(Args, Debug)]
#[group(required = false, multiple = false)]
pub struct PathwaysCommand {
    #[arg(
        long,
        help = "Rank every pathway by its reduction over a period",
        value_name = "START-END",
        value_parser = parse_period,
    )]
    period: Option<Period>,
    #[arg(long, help = "Show the reduction of every pathway over each configured period")]
    reductions: bool,
    #[arg(long, help = "Show the net-zero year of every pathway")]
    net_zero: bool,
}

impl RunCommand for PathwaysCommand {
    fn run(&self, config: Config) -> CliResult<()> {
        info!("Running `pathways` subcommand");
        let climate_policy = open(config)?;
        let pathways = climate_policy.pathways()?;
        if let Some(period) = self.period {
            display_period_reductions(&pathways.ranking(period))?;
        } else if self.reductions {
            display_period_reductions(&pathways.period_reductions())?;
        } else if self.net_zero {
            display_net_zero(&pathways.net_zero(), pathways.net_zero_target_year())?;
        } else {
            display_pathway_analysis(
                &pathways.analysis(),
                pathways.net_zero_target_year(),
                &climate_policy.config,
            )?;
        }
        Ok(())
    }
}

/// The `policies` command shows the qualitative policy assessments.
#[derive(Args, Debug)]
pub struct PoliciesCommand {
    #[arg(short, long, help = "Only show the assessments of one party")]
    party: Option<String>,
    #[arg(short, long, help = "Only show the assessments of one category")]
    category: Option<String>,
    #[arg(long, help = "Show the mean level by party and by category")]
    averages: bool,
    #[arg(long, help = "Show the rows that could not be read as assessments")]
    rejected: bool,
}

impl RunCommand for PoliciesCommand {
    fn run(&self, config: Config) -> CliResult<()> {
        info!("Running `policies` subcommand");
        let climate_policy = open(config)?;
        let policies = climate_policy.policies()?;
        if self.averages {
            display_averages("Party", &policies.average_by_party())?;
            display_averages("Category", &policies.average_by_category())?;
        } else if self.rejected {
            display_rejected(policies.rejected())?;
        } else if self.party.is_some() || self.category.is_some() {
            let assessments = policies
                .assessments()
                .iter()
                .filter(|a| self.party.as_ref().map_or(true, |party| &a.party == party))
                .filter(|a| {
                    self.category
                        .as_ref()
                        .map_or(true, |category| &a.category == category)
                })
                .collect::<Vec<_>>();
            display_assessments(&assessments)?;
        } else {
            display_frame(&policies.grid()?)?;
        }
        Ok(())
    }
}

/// The `export` command writes the table of one section with its derived columns.
#[derive(Args, Debug)]
pub struct ExportCommand {
    #[arg(index = 1, help = "Section to export: emissions, energy, pathways or policies")]
    kind: SheetKind,
    #[arg(
        short = 'f',
        long,
        value_name = "csv|json|jsonlines",
        help = "Output format for the results",
        default_value = "csv"
    )]
    output_format: OutputFormat,
    #[arg(short = 'o', long, help = "Output file to place the results")]
    output_file: Option<String>,
}

impl RunCommand for ExportCommand {
    fn run(&self, config: Config) -> CliResult<()> {
        info!("Running `export` subcommand");
        let climate_policy = open(config)?;
        let data = climate_policy.export(self.kind)?;
        debug!("{data:#?}");
        let formatter: OutputFormatter = (&self.output_format).into();
        write_output(formatter, data, self.output_file.as_deref())?;
        Ok(())
    }
}

/// The `report` command renders every section of the dashboard. Sections whose sheet is
/// missing or malformed are reported and skipped.
#[derive(Args, Debug)]
pub struct ReportCommand;

fn ready_section<'a, T>(title: &str, section: &'a Section<T>) -> Option<&'a T> {
    println!("\n== {title} ==");
    match section {
        Section::Ready(value) => Some(value),
        Section::Unavailable(err) => {
            println!("Unavailable: {err}");
            None
        }
    }
}

impl RunCommand for ReportCommand {
    fn run(&self, config: Config) -> CliResult<()> {
        info!("Running `report` subcommand");
        let climate_policy = open(config)?;
        let report = climate_policy.report()?;
        let config = &climate_policy.config;
        if let Some(emissions) = ready_section("Emissions", &report.emissions) {
            display_totals(
                &emissions.totals(),
                emissions.total_target(),
                &config.party_colors,
            )?;
        }
        if let Some(energy) = ready_section("Energy mix", &report.energy) {
            display_frame(&energy.pivot()?)?;
            display_group_totals(&energy.group_totals())?;
        }
        if let Some(pathways) = ready_section("Temperature pathways", &report.pathways) {
            display_pathway_analysis(
                &pathways.analysis(),
                pathways.net_zero_target_year(),
                config,
            )?;
            display_net_zero(&pathways.net_zero(), pathways.net_zero_target_year())?;
        }
        if let Some(policies) = ready_section("Policy assessment", &report.policies) {
            display_frame(&policies.grid()?)?;
            display_averages("Party", &policies.average_by_party())?;
        }
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="Climapolicy compares party climate pledges with the national targets.", long_about = None, name="climapolicy")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        short = 'w',
        long,
        global = true,
        help = "Workbook to read instead of the configured one",
        conflicts_with = "builtin"
    )]
    pub workbook: Option<PathBuf>,
    #[arg(long, global = true, help = "Use the built-in tables instead of a workbook")]
    pub builtin: bool,
    #[arg(
        long,
        global = true,
        help = "Config file to use instead of <config dir>/climapolicy/config.toml"
    )]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Applies the source flags on top of the loaded config.
    pub fn apply_source(&self, config: Config) -> Config {
        if self.builtin {
            Config {
                workbook: None,
                ..config
            }
        } else if let Some(workbook) = &self.workbook {
            Config {
                workbook: Some(workbook.clone()),
                ..config
            }
        } else {
            config
        }
    }
}

/// Commands contains the list of subcommands avaliable for use in the CLI.
/// Each command implements the RunCommand trait.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// List the sheets of the source and the sheet each section uses
    Sheets(SheetsCommand),
    /// Total emissions by group and reduction against the baseline
    Emissions(EmissionsCommand),
    /// Energy mix scenarios
    Energy(EnergyCommand),
    /// Party projections against the reference temperature pathways
    Pathways(PathwaysCommand),
    /// Qualitative policy assessments
    Policies(PoliciesCommand),
    /// Write the table of one section as CSV, JSON or JSON lines
    Export(ExportCommand),
    /// Every section of the dashboard
    Report(ReportCommand),
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use tempfile::NamedTempFile;

    use super::*;

    fn builtin_config() -> Config {
        Config {
            workbook: None,
            ..Config::default()
        }
    }

    #[test]
    fn test_export_command() {
        let output = NamedTempFile::new().unwrap();
        let export_command = ExportCommand {
            kind: SheetKind::Emissions,
            output_format: OutputFormat::Csv,
            output_file: Some(output.path().to_string_lossy().to_string()),
        };
        export_command.run(builtin_config()).unwrap();
        let contents = std::fs::read_to_string(output.path()).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("부문,정당,값,감축률(%)"));
        assert_eq!(lines.count(), 7 * 6);
    }

    #[test]
    fn test_export_json() {
        let output = NamedTempFile::new().unwrap();
        let export_command = ExportCommand {
            kind: SheetKind::Policies,
            output_format: OutputFormat::Json,
            output_file: Some(output.path().to_string_lossy().to_string()),
        };
        export_command.run(builtin_config()).unwrap();
        let contents = std::fs::read_to_string(output.path()).unwrap();
        let records: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(records.as_array().unwrap().len(), 21);
    }

    #[test]
    fn missing_workbook_fails_the_command() {
        let config = Config {
            workbook: Some("no/such/workbook.xlsx".into()),
            ..Config::default()
        };
        let result = ReportCommand.run(config);
        assert!(matches!(result, Err(CliError::ClimateError(_))));
    }

    #[test]
    fn unknown_sector_is_an_error() {
        let command = EmissionsCommand {
            sector: Some("우주".into()),
            group: vec![],
            breakdown: false,
            grid: false,
            summary: false,
        };
        assert!(matches!(
            command.run(builtin_config()),
            Err(CliError::Generic(_))
        ));
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(
            parse_period("2018-2050").unwrap(),
            Period {
                start: 2018,
                end: 2050
            }
        );
        assert_eq!(
            parse_period(" 2030 - 2050").unwrap(),
            Period {
                start: 2030,
                end: 2050
            }
        );
        assert!(parse_period("2050-2018").is_err());
        assert!(parse_period("2030").is_err());
        assert!(parse_period("a-b").is_err());
    }

    #[test]
    fn output_type_should_deserialize_properly() {
        let output_format = OutputFormat::from_str("CSV");
        assert_eq!(
            output_format.unwrap(),
            OutputFormat::Csv,
            "parsing should be case insensitive"
        );
        let output_format = OutputFormat::from_str("jsonlines");
        assert_eq!(
            output_format.unwrap(),
            OutputFormat::JsonLines,
            "correct variants should parse correctly"
        );
        let output_format = OutputFormat::from_str("geojson");
        assert!(output_format.is_err(), "non listed formats should fail");
    }

    #[test]
    fn source_flags_override_config() {
        let cli = Cli::parse_from(["climapolicy", "--builtin", "report"]);
        assert_eq!(cli.apply_source(Config::default()).workbook, None);

        let cli = Cli::parse_from(["climapolicy", "emissions", "-w", "other.xlsx"]);
        assert_eq!(
            cli.apply_source(Config::default()).workbook,
            Some(PathBuf::from("other.xlsx"))
        );

        let cli = Cli::parse_from(["climapolicy", "sheets"]);
        assert_eq!(
            cli.apply_source(Config::default()).workbook,
            Config::default().workbook
        );
    }

    #[test]
    fn export_kind_parses_case_insensitively() {
        let cli = Cli::parse_from(["climapolicy", "export", "Energy", "-f", "json"]);
        match cli.command {
            Some(Commands::Export(export)) => {
                assert_eq!(export.kind, SheetKind::Energy);
                assert_eq!(export.output_format, OutputFormat::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
