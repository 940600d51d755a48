//! CLI definition and dispatch.

use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::adapters::csv_bar_adapter::{bar_file_path, read_bars, write_bars, CsvBarFeed};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::csv_store_adapter::CsvStoreAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::bars::{refresh_bars, BarRefreshReport, DEFAULT_BAR_COUNT, DEFAULT_EXCHANGE};
use crate::domain::config_validation::validate_update_config;
use crate::domain::error::CotError;
use crate::domain::filter::DEFAULT_EXCLUDE_TOKEN;
use crate::domain::instrument::Instrument;
use crate::domain::ohlcv::{self, Interval};
use crate::domain::reconcile::{update_cot_reports, CotUpdateReport, MergePolicy};
use crate::domain::report::ReportType;
use crate::domain::settings::{
    SourceKind, StoreKind, UpdateConfig, DEFAULT_BAR_DIR, DEFAULT_CFTC_BASE_URL, DEFAULT_OUTPUT_DIR,
    DEFAULT_START_YEAR, DEFAULT_STORE_PATH, DEFAULT_TIMEOUT_SECS,
};
use crate::domain::spread::{compute_spreads, SpreadPoint};
use crate::domain::table::CotTable;
use crate::ports::bar_port::BarFeed;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportSource;
use crate::ports::store_port::TableStore;

#[derive(Parser, Debug)]
#[command(name = "soycot", about = "Soybean-complex COT and price data pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch COT reports and price bars, merging them into the local stores
    Update {
        #[arg(short, long)]
        config: PathBuf,
        /// Only update the COT store
        #[arg(long, conflicts_with = "bars_only")]
        cot_only: bool,
        /// Only refresh the OHLCV bar files
        #[arg(long)]
        bars_only: bool,
    },
    /// Summarise the stored COT table
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start_year: Option<i32>,
        #[arg(long)]
        end_year: Option<i32>,
    },
    /// Compute crush spread and oil share from the stored bars
    Spreads {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        start_year: Option<i32>,
        #[arg(long)]
        end_year: Option<i32>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Which halves of an update to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateMode {
    pub cot: bool,
    pub bars: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    let current_year = chrono::Local::now().year();
    match cli.command {
        Command::Update {
            config,
            cot_only,
            bars_only,
        } => {
            let mode = UpdateMode {
                cot: !bars_only,
                bars: !cot_only,
            };
            run_update(&config, mode, current_year)
        }
        Command::Info {
            config,
            start_year,
            end_year,
        } => run_info(&config, start_year, end_year, current_year),
        Command::Spreads {
            config,
            start_year,
            end_year,
            output,
        } => run_spreads(&config, start_year, end_year, output.as_deref(), current_year),
        Command::Validate { config } => run_validate(&config, current_year),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = CotError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        error!("{err}");
        ExitCode::from(&err)
    })
}

/// Validate and freeze the configuration for one run.
pub fn build_update_config(
    adapter: &dyn ConfigPort,
    current_year: i32,
) -> Result<UpdateConfig, CotError> {
    validate_update_config(adapter, current_year)?;

    let start_year = adapter
        .get_string("cot", "start_year")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_START_YEAR);
    let report_type = adapter
        .get_string("cot", "report_type")
        .and_then(|s| ReportType::parse(&s))
        .unwrap_or(ReportType::LegacyFutures);
    let exclude_token = adapter
        .get_string("cot", "exclude_token")
        .unwrap_or_else(|| DEFAULT_EXCLUDE_TOKEN.to_string());
    let merge_policy = adapter
        .get_string("cot", "merge_policy")
        .and_then(|s| MergePolicy::parse(&s))
        .unwrap_or_default();

    let source_kind = adapter
        .get_string("source", "kind")
        .unwrap_or_else(|| "cftc".to_string())
        .trim()
        .to_lowercase();
    let source = if source_kind == "csv" {
        SourceKind::Csv {
            dir: PathBuf::from(adapter.get_string("source", "dir").unwrap_or_default()),
        }
    } else {
        SourceKind::Cftc {
            base_url: adapter
                .get_string("source", "base_url")
                .unwrap_or_else(|| DEFAULT_CFTC_BASE_URL.to_string()),
            timeout: Duration::from_secs(
                adapter
                    .get_int("source", "timeout_secs", DEFAULT_TIMEOUT_SECS)
                    .max(1) as u64,
            ),
        }
    };

    let store_kind = match adapter.get_string("store", "kind").map(|s| s.trim().to_lowercase()) {
        Some(k) if k == "sqlite" => StoreKind::Sqlite,
        _ => StoreKind::Csv,
    };

    Ok(UpdateConfig {
        start_year,
        report_type,
        exclude_token,
        merge_policy,
        source,
        store_kind,
        store_path: PathBuf::from(
            adapter
                .get_string("store", "path")
                .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string()),
        ),
        bar_dir: PathBuf::from(
            adapter
                .get_string("bars", "dir")
                .unwrap_or_else(|| DEFAULT_BAR_DIR.to_string()),
        ),
        exchange: adapter
            .get_string("bars", "exchange")
            .unwrap_or_else(|| DEFAULT_EXCHANGE.to_string()),
        interval: adapter
            .get_string("bars", "interval")
            .and_then(|s| Interval::parse(&s))
            .unwrap_or_default(),
        n_bars: adapter.get_int("bars", "n_bars", DEFAULT_BAR_COUNT as i64) as usize,
        output_dir: PathBuf::from(
            adapter
                .get_string("bars", "output_dir")
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
        ),
    })
}

pub fn open_source(config: &UpdateConfig) -> Result<Box<dyn ReportSource>, CotError> {
    match &config.source {
        SourceKind::Csv { dir } => Ok(Box::new(CsvReportAdapter::new(
            dir.clone(),
            config.report_type,
        ))),
        #[cfg(feature = "http")]
        SourceKind::Cftc { base_url, timeout } => {
            use crate::adapters::cftc_http_adapter::CftcHttpAdapter;
            Ok(Box::new(CftcHttpAdapter::new(
                base_url,
                config.report_type,
                *timeout,
            )?))
        }
        #[cfg(not(feature = "http"))]
        SourceKind::Cftc { .. } => Err(CotError::ConfigInvalid {
            section: "source".into(),
            key: "kind".into(),
            reason: "http feature is required for kind = cftc".into(),
        }),
    }
}

pub fn open_store(config: &UpdateConfig) -> Result<Box<dyn TableStore>, CotError> {
    match config.store_kind {
        StoreKind::Csv => Ok(Box::new(CsvStoreAdapter::new(config.store_path.clone()))),
        #[cfg(feature = "sqlite")]
        StoreKind::Sqlite => {
            use crate::adapters::sqlite_store_adapter::SqliteStoreAdapter;
            Ok(Box::new(SqliteStoreAdapter::open(config.store_path.clone())?))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreKind::Sqlite => Err(CotError::ConfigInvalid {
            section: "store".into(),
            key: "kind".into(),
            reason: "sqlite feature is required for kind = sqlite".into(),
        }),
    }
}

fn config_or_exit(path: &Path, current_year: i32) -> Result<UpdateConfig, ExitCode> {
    let adapter = load_config(path)?;
    build_update_config(&adapter, current_year).map_err(|e| {
        error!("{e}");
        ExitCode::from(&e)
    })
}

fn run_update(config_path: &Path, mode: UpdateMode, current_year: i32) -> ExitCode {
    info!("Loading config from {}", config_path.display());
    let config = match config_or_exit(config_path, current_year) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let source = match open_source(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            return (&e).into();
        }
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            return (&e).into();
        }
    };
    let feed = CsvBarFeed::new(config.bar_dir.clone());

    run_update_pipeline(
        source.as_ref(),
        store.as_ref(),
        &feed,
        &config,
        mode,
        current_year,
    )
}

/// COT reconciliation followed by the bar refresh, over injected ports.
pub fn run_update_pipeline(
    source: &dyn ReportSource,
    store: &dyn TableStore,
    feed: &dyn BarFeed,
    config: &UpdateConfig,
    mode: UpdateMode,
    current_year: i32,
) -> ExitCode {
    if mode.cot {
        match update_cot(source, store, config, current_year) {
            Ok(report) => print_cot_summary(&report, store),
            Err(e) => {
                error!("{e}");
                return (&e).into();
            }
        }
    }

    if mode.bars {
        match update_bars(feed, config) {
            Ok(report) => {
                for (instrument, count) in &report.written {
                    println!(
                        "OHLCV data for {} saved to {} ({} bars)",
                        instrument,
                        bar_file_path(&config.output_dir, instrument.key(), config.interval)
                            .display(),
                        count
                    );
                }
                for (instrument, reason) in &report.failed {
                    eprintln!("warning: no bars for {}: {}", instrument, reason);
                }
            }
            Err(e) => {
                error!("{e}");
                return (&e).into();
            }
        }
    }

    ExitCode::SUCCESS
}

pub fn update_cot(
    source: &dyn ReportSource,
    store: &dyn TableStore,
    config: &UpdateConfig,
    current_year: i32,
) -> Result<CotUpdateReport, CotError> {
    info!(
        start_year = config.start_year,
        end_year = current_year,
        store = %store.describe(),
        "updating COT reports"
    );
    update_cot_reports(
        source,
        store,
        &config.aggregate_request(current_year),
        config.merge_policy,
    )
}

pub fn update_bars(feed: &dyn BarFeed, config: &UpdateConfig) -> Result<BarRefreshReport, CotError> {
    let request = config.bar_request();
    refresh_bars(feed, &request, &mut |instrument, bars| {
        let path = bar_file_path(&config.output_dir, instrument.key(), config.interval);
        write_bars(&path, bars)
    })
}

fn print_cot_summary(report: &CotUpdateReport, store: &dyn TableStore) {
    for skip in &report.skipped {
        match skip.instrument {
            Some(instrument) => warn!(year = skip.year, %instrument, "no rows: {:?}", skip.reason),
            None => warn!(year = skip.year, "year skipped: {:?}", skip.reason),
        }
    }
    let s = &report.summary;
    println!(
        "COT data for soybean products saved to {} ({} rows: {} existing, {} fetched, {} duplicates dropped)",
        store.describe(),
        s.total_rows,
        s.existing_rows,
        s.fresh_rows,
        s.duplicates_dropped
    );
}

fn resolve_years(
    start_year: Option<i32>,
    end_year: Option<i32>,
    config: &UpdateConfig,
    current_year: i32,
) -> (i32, i32) {
    (
        start_year.unwrap_or(config.start_year),
        end_year.unwrap_or(current_year),
    )
}

fn run_info(
    config_path: &Path,
    start_year: Option<i32>,
    end_year: Option<i32>,
    current_year: i32,
) -> ExitCode {
    let config = match config_or_exit(config_path, current_year) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            return (&e).into();
        }
    };

    let table = match store.load() {
        Ok(Some(t)) => t,
        Ok(None) => {
            eprintln!("No COT store at {} (run `soycot update` first)", store.describe());
            return ExitCode::from(5);
        }
        Err(e) => {
            error!("{e}");
            return (&e).into();
        }
    };

    let (start, end) = resolve_years(start_year, end_year, &config, current_year);
    print!("{}", format_table_summary(&table.filter_years(start, end), start, end));
    ExitCode::SUCCESS
}

/// Human-readable summary of a COT table: row count, date span and
/// per-column range.
pub fn format_table_summary(table: &CotTable, start_year: i32, end_year: i32) -> String {
    let mut out = format!("COT store, {}..={}\n", start_year, end_year);
    match table.date_range() {
        Some((first, last)) => {
            out += &format!("  rows: {}, {} to {}\n", table.len(), first, last);
        }
        None => {
            out += "  rows: 0\n";
            return out;
        }
    }
    for stats in table.column_stats() {
        out += &format!(
            "  {}: {} values, min {:.1}%, max {:.1}%, last {:.1}% on {}\n",
            stats.column, stats.count, stats.min, stats.max, stats.last, stats.last_date
        );
    }
    out
}

fn run_spreads(
    config_path: &Path,
    start_year: Option<i32>,
    end_year: Option<i32>,
    output: Option<&Path>,
    current_year: i32,
) -> ExitCode {
    let config = match config_or_exit(config_path, current_year) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let (start, end) = resolve_years(start_year, end_year, &config, current_year);

    let points = match load_spreads(&config, start, end) {
        Ok(p) => p,
        Err(e) => {
            error!("{e}");
            return (&e).into();
        }
    };
    if points.is_empty() {
        eprintln!("No dates common to ZS, ZL and ZM in {}..={}", start, end);
    }

    let csv = match spreads_to_csv(&points) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("{e}");
            return (&e).into();
        }
    };

    let written = match output {
        Some(path) => fs::write(path, &csv).map(|_| {
            eprintln!("{} spread rows written to {}", points.len(), path.display());
        }),
        None => std::io::stdout().write_all(&csv),
    };
    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let err = CotError::from(e);
            error!("failed to write spreads: {err}");
            (&err).into()
        }
    }
}

/// Read the stored ZS/ZL/ZM bar files and derive the spread series for the
/// given years.
pub fn load_spreads(
    config: &UpdateConfig,
    start_year: i32,
    end_year: i32,
) -> Result<Vec<SpreadPoint>, CotError> {
    let load = |instrument: Instrument| -> Result<_, CotError> {
        let path = bar_file_path(&config.output_dir, instrument.key(), config.interval);
        Ok(ohlcv::filter_years(&read_bars(&path)?, start_year, end_year))
    };
    let soybeans = load(Instrument::Zs)?;
    let oil = load(Instrument::Zl)?;
    let meal = load(Instrument::Zm)?;
    Ok(compute_spreads(&soybeans, &oil, &meal))
}

pub fn spreads_to_csv(points: &[SpreadPoint]) -> Result<Vec<u8>, CotError> {
    let io_err = |e: csv::Error| CotError::Io(std::io::Error::other(e));
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["datetime", "ZS1!", "ZL1!", "ZM1!", "crush_spread", "oil_share"])
        .map_err(io_err)?;
    for p in points {
        wtr.write_record([
            p.date.to_string(),
            p.soybeans.to_string(),
            p.oil.to_string(),
            p.meal.to_string(),
            p.crush_spread.to_string(),
            p.oil_share.map(|v| v.to_string()).unwrap_or_default(),
        ])
        .map_err(io_err)?;
    }
    wtr.into_inner()
        .map_err(|e| CotError::Io(std::io::Error::other(e.to_string())))
}

fn run_validate(config_path: &Path, current_year: i32) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match config_or_exit(config_path, current_year) {
        Ok(c) => c,
        Err(code) => return code,
    };

    println!("  start_year:    {}", config.start_year);
    println!("  report_type:   {}", config.report_type.file_prefix());
    println!("  exclude_token: {}", config.exclude_token);
    println!("  merge_policy:  {:?}", config.merge_policy);
    match &config.source {
        SourceKind::Cftc { base_url, timeout } => {
            println!("  source:        cftc {} ({}s timeout)", base_url, timeout.as_secs())
        }
        SourceKind::Csv { dir } => println!("  source:        csv {}", dir.display()),
    }
    println!(
        "  store:         {:?} {}",
        config.store_kind,
        config.store_path.display()
    );
    println!(
        "  bars:          {} {} x{} from {} into {}",
        config.exchange,
        config.interval,
        config.n_bars,
        config.bar_dir.display(),
        config.output_dir.display()
    );
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
