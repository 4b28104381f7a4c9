use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use metric_flatten::config::{
    parse_metric_ids, Config, FilterConfig, LabelMode, SentinelPolicy, AUDIT_SHEET_PREFIX,
    DEFAULT_LABEL_ROW_OFFSET, OUTCOME_SHEET_NAME,
};
use metric_flatten::exporter::{export, output_file_name, ExportFormat};
use metric_flatten::flatten::flatten;
use metric_flatten::status::Status;
use metric_flatten::workbook::{open_workbook, SheetSelector};

#[derive(Parser, Debug)]
#[command(name = "metric-flatten")]
#[command(about = "Extract metric rows from an audit workbook into a flat table", long_about = None)]
struct Cli {
    /// Path to the audit workbook (.xls, .xlsx, .xlsb, .ods)
    #[arg(long, env = "METRIC_FLATTEN_FILE")]
    file: PathBuf,

    /// Extraction preset: 'percent-median' (% and median metrics of the L sheets),
    /// 'all-sheets' (% and median metrics of every sheet, teams from column 1,
    /// forward-filled labels) or 'metric-id' (named metrics of the outcome sheet).
    /// Defaults to 'metric-id' when --metric-ids is given
    #[arg(long)]
    preset: Option<String>,

    /// Scan exactly this sheet
    #[arg(long, conflicts_with_all = ["sheet_prefix", "sheet_pattern", "all_sheets"])]
    sheet: Option<String>,

    /// Scan every sheet whose name starts with this prefix
    #[arg(long, conflicts_with_all = ["sheet_pattern", "all_sheets"])]
    sheet_prefix: Option<String>,

    /// Scan every sheet whose name matches this regex
    #[arg(long, conflicts_with = "all_sheets")]
    sheet_pattern: Option<String>,

    /// Scan every sheet
    #[arg(long)]
    all_sheets: bool,

    /// Comma-separated metric IDs (e.g. "L29.3,L32.3"), matched exactly
    #[arg(long)]
    metric_ids: Option<String>,

    /// Comma-separated data-type keywords (e.g. "%,median")
    #[arg(long)]
    keywords: Option<String>,

    /// Only keep teams from this region (e.g. "London")
    #[arg(long)]
    region: Option<String>,

    /// Quarter tag copied into every record (e.g. "2025-Q1")
    #[arg(long)]
    quarter: Option<String>,

    /// Carry metric labels down through rows with a blank label cell
    #[arg(long)]
    forward_fill_labels: bool,

    /// Row offset between a data row and the row its forward-filled label is read from
    #[arg(long, allow_negative_numbers = true, default_value_t = DEFAULT_LABEL_ROW_OFFSET)]
    label_row_offset: i64,

    /// First column (0-based) holding team metadata
    #[arg(long)]
    metadata_start_column: Option<u32>,

    /// What to do with suppressed values such as "Too few to report": 'omit' or 'null'
    #[arg(long)]
    sentinel_policy: Option<String>,

    /// Output format: csv, tsv, xlsx or json
    #[arg(long)]
    format: Option<String>,

    /// Output file path (default: derived name inside --output-dir)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output directory (default: METRIC_FLATTEN_OUTPUT_DIR or the system temp dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Load .env file if it exists (ignore errors if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let start_time = Instant::now();
    let status = Status::from_run(run(&cli, &config));
    info!("Finished in {:.2?}", start_time.elapsed());

    println!("{status}");
    if !status.is_success() {
        error!("Extraction failed");
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: &Cli, config: &Config) -> Result<(usize, PathBuf), Box<dyn Error>> {
    let filter = build_filter(cli, config)?;
    let selector = build_selector(cli, &filter)?;

    if !cli.file.exists() {
        return Err(format!("Excel file not found at: {}", cli.file.display()).into());
    }

    let mut workbook = open_workbook(&cli.file)?;
    let extraction = flatten(&mut workbook, &selector, &filter)?;
    for diagnostic in &extraction.diagnostics {
        warn!("{diagnostic}");
    }
    let extraction = extraction.require_records()?;

    let format = match &cli.format {
        Some(format) => format.parse::<ExportFormat>()?,
        None => config.export_format,
    };
    let path = match &cli.output {
        Some(path) => path.clone(),
        None => cli
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone())
            .join(output_file_name(&filter, format)),
    };

    let written = export(&extraction.records, format, &path)?;
    Ok((extraction.records.len(), written))
}

fn build_filter(cli: &Cli, config: &Config) -> Result<FilterConfig, Box<dyn Error>> {
    let metric_ids = cli
        .metric_ids
        .as_deref()
        .map(parse_metric_ids)
        .filter(|ids| !ids.is_empty());

    let preset = cli.preset.as_deref().unwrap_or(if metric_ids.is_some() {
        "metric-id"
    } else {
        "percent-median"
    });

    let mut filter = match preset {
        "percent-median" => {
            let mut filter = FilterConfig::percent_median();
            filter.metric_ids = metric_ids;
            filter
        }
        "all-sheets" => {
            let mut filter = FilterConfig::all_sheets();
            filter.metric_ids = metric_ids;
            filter
        }
        "metric-id" => {
            let ids = metric_ids.ok_or("--metric-ids is required for the metric-id preset")?;
            FilterConfig::metric_ids(ids)
        }
        other => {
            return Err(format!(
                "Invalid preset '{other}'. Valid presets: percent-median, all-sheets, metric-id"
            )
            .into());
        }
    };

    if let Some(keywords) = &cli.keywords {
        filter = filter.with_keywords(keywords.split(','));
    }
    if cli.forward_fill_labels {
        filter = filter.with_label_mode(LabelMode::ForwardFilled {
            row_offset: cli.label_row_offset,
        });
    }
    if let Some(col) = cli.metadata_start_column {
        filter.layout.metadata_start_column = col;
    }
    if let Some(policy) = &cli.sentinel_policy {
        filter = filter.with_sentinel_policy(match policy.as_str() {
            "omit" => SentinelPolicy::Omit,
            "null" => SentinelPolicy::NullValue,
            other => {
                return Err(
                    format!("Invalid sentinel policy '{other}'. Valid policies: omit, null").into(),
                );
            }
        });
    }
    if let Some(region) = cli.region.clone().or_else(|| config.region.clone()) {
        filter = filter.with_region(region);
    }
    if let Some(quarter) = cli.quarter.clone().or_else(|| config.quarter.clone()) {
        filter = filter.with_quarter(quarter);
    }

    info!(
        "Preset {}: keywords={:?} metric_ids={:?} policy={:?}",
        preset, filter.keywords, filter.metric_ids, filter.sentinel_policy
    );
    Ok(filter)
}

fn build_selector(cli: &Cli, filter: &FilterConfig) -> Result<SheetSelector, Box<dyn Error>> {
    if let Some(sheet) = &cli.sheet {
        return Ok(SheetSelector::named(sheet.clone()));
    }
    if let Some(prefix) = &cli.sheet_prefix {
        return Ok(SheetSelector::prefix(prefix.clone()));
    }
    if let Some(pattern) = &cli.sheet_pattern {
        return Ok(SheetSelector::pattern(pattern)?);
    }
    if cli.all_sheets || cli.preset.as_deref() == Some("all-sheets") {
        return Ok(SheetSelector::All);
    }

    // Metric-id runs target the outcome sheet; keyword runs sweep the L sheets
    Ok(if filter.metric_ids.is_some() && filter.keywords.is_empty() {
        SheetSelector::named(OUTCOME_SHEET_NAME)
    } else {
        SheetSelector::prefix(AUDIT_SHEET_PREFIX)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn env_config() -> Config {
        Config {
            output_dir: PathBuf::from("/tmp"),
            export_format: ExportFormat::Csv,
            quarter: None,
            region: None,
        }
    }

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["metric-flatten", "--file", "audit.xlsx"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_preset_is_percent_median_over_l_sheets() {
        let cli = parse(&[]);
        let filter = build_filter(&cli, &env_config()).unwrap();
        assert!(filter.keywords.contains("median"));
        assert!(matches!(
            build_selector(&cli, &filter).unwrap(),
            SheetSelector::Prefix(p) if p == "L"
        ));
    }

    #[test]
    fn test_metric_ids_imply_metric_preset_and_outcome_sheet() {
        let cli = parse(&["--metric-ids", "L29.3, L32.3", "--quarter", "2025-Q1"]);
        let filter = build_filter(&cli, &env_config()).unwrap();
        assert_eq!(
            filter.metric_ids,
            Some(vec!["L29.3".to_string(), "L32.3".to_string()])
        );
        assert_eq!(filter.sentinel_policy, SentinelPolicy::NullValue);
        assert_eq!(filter.quarter.as_deref(), Some("2025-Q1"));
        assert!(matches!(
            build_selector(&cli, &filter).unwrap(),
            SheetSelector::Named(name) if name == OUTCOME_SHEET_NAME
        ));
    }

    #[test]
    fn test_all_sheets_preset_scans_every_sheet() {
        let cli = parse(&["--preset", "all-sheets"]);
        let filter = build_filter(&cli, &env_config()).unwrap();
        assert_eq!(filter.layout.metadata_start_column, 1);
        assert_eq!(filter.label_mode, LabelMode::forward_filled());
        assert!(matches!(
            build_selector(&cli, &filter).unwrap(),
            SheetSelector::All
        ));

        let cli = parse(&["--preset", "all-sheets", "--sheet-prefix", "L"]);
        assert!(matches!(
            build_selector(&cli, &filter).unwrap(),
            SheetSelector::Prefix(p) if p == "L"
        ));
    }

    #[test]
    fn test_metric_preset_requires_ids() {
        let cli = parse(&["--preset", "metric-id"]);
        assert!(build_filter(&cli, &env_config()).is_err());
    }

    #[test]
    fn test_invalid_preset() {
        let cli = parse(&["--preset", "everything"]);
        assert!(build_filter(&cli, &env_config()).is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&[
            "--forward-fill-labels",
            "--label-row-offset",
            "-1",
            "--metadata-start-column",
            "1",
            "--sentinel-policy",
            "null",
            "--keywords",
            "Median",
            "--all-sheets",
        ]);
        let filter = build_filter(&cli, &env_config()).unwrap();
        assert_eq!(filter.label_mode, LabelMode::ForwardFilled { row_offset: -1 });
        assert_eq!(filter.layout.metadata_start_column, 1);
        assert_eq!(filter.sentinel_policy, SentinelPolicy::NullValue);
        assert_eq!(filter.keywords.len(), 1);
        assert!(matches!(
            build_selector(&cli, &filter).unwrap(),
            SheetSelector::All
        ));
    }

    #[test]
    fn test_region_falls_back_to_environment_config() {
        let cli = parse(&[]);
        let config = Config {
            region: Some("London".to_string()),
            ..env_config()
        };
        let filter = build_filter(&cli, &config).unwrap();
        assert_eq!(filter.region.as_deref(), Some("London"));
    }

    #[test]
    fn test_sheet_flags_conflict() {
        let result = Cli::try_parse_from([
            "metric-flatten",
            "--file",
            "a.xlsx",
            "--sheet",
            "L1",
            "--all-sheets",
        ]);
        assert!(result.is_err());
    }
}
