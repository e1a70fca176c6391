//! Binary entry point for the Sombra consistency checker.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sombra_consistency::report::SummaryReport;
use sombra_consistency::{
    CheckOptions, ConsistencySummaryStatistics, FullCheck, InMemoryLogger, StoreSnapshot,
    TaskExecutionOrder, WriterLogger,
};
use tracing_subscriber::EnvFilter;

use config::CliConfig;
use ui::{Theme, Ui};

const EXIT_INCONSISTENT: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "sombra-check",
    version,
    about = "Offline consistency checker for Sombra record stores",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for the check report"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = ThemeArg::Auto,
        help = "Colour theme for text output"
    )]
    theme: ThemeArg,

    #[arg(
        long,
        global = true,
        help = "Print only violations; no progress or summary decoration"
    )]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every store of a snapshot for inconsistencies.
    Check(CheckCmd),
}

#[derive(Args, Debug)]
struct CheckCmd {
    #[arg(value_name = "SNAPSHOT", help = "JSON store snapshot to check")]
    snapshot: PathBuf,

    #[arg(long, value_enum, help = "How store tasks are scheduled")]
    order: Option<OrderArg>,

    #[arg(long, help = "Report orphan chains and chains with several owners")]
    check_property_owners: bool,

    #[arg(
        long,
        value_name = "FILE",
        env = "SOMBRA_CHECK_CONFIG",
        help = "Checker settings file (TOML)"
    )]
    config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OrderArg {
    SingleThreaded,
    MultiThreaded,
    MultiPass,
}

impl From<OrderArg> for TaskExecutionOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::SingleThreaded => TaskExecutionOrder::SingleThreaded,
            OrderArg::MultiThreaded => TaskExecutionOrder::MultiThreaded,
            OrderArg::MultiPass => TaskExecutionOrder::MultiPass,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ThemeArg {
    Auto,
    Light,
    Dark,
    Plain,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Auto => Theme::Auto,
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Plain => Theme::Plain,
        }
    }
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    snapshot: &'a Path,
    config: Option<&'a Path>,
    options: CheckOptions,
    summary: SummaryReport,
    messages: Vec<String>,
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}

fn run() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    let ui = Ui::new(cli.theme.into(), cli.quiet);
    match cli.command {
        Command::Check(cmd) => run_check(&cmd, cli.format, &ui),
    }
}

fn resolve_options(cmd: &CheckCmd) -> Result<(CheckOptions, Option<PathBuf>), Box<dyn Error>> {
    let config = CliConfig::load(cmd.config.clone())?;
    let mut options = config.check_options();
    if cmd.check_property_owners {
        options = options.with_property_owners(true);
    }
    if let Some(order) = cmd.order {
        options = options.with_execution_order(order.into());
    }
    Ok((options, config.path().map(Path::to_path_buf)))
}

fn run_check(cmd: &CheckCmd, format: OutputFormat, ui: &Ui) -> Result<ExitCode, Box<dyn Error>> {
    let (options, config_path) = resolve_options(cmd)?;
    let stores = StoreSnapshot::read(&cmd.snapshot)?.into_store_access();

    let summary = match format {
        OutputFormat::Text => {
            let progress = ui.progress();
            let check = FullCheck::new(options).with_progress(Arc::new(progress));
            let logger = WriterLogger::new(io::stdout());
            let summary = check.execute(&stores, &logger)?;
            print_summary_text(ui, &cmd.snapshot, config_path.as_deref(), &options, &summary);
            summary
        }
        OutputFormat::Json => {
            let logger = InMemoryLogger::new();
            let summary = FullCheck::new(options).execute(&stores, &logger)?;
            let output = CheckOutput {
                snapshot: &cmd.snapshot,
                config: config_path.as_deref(),
                options,
                summary: summary.report(),
                messages: logger.messages(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            summary
        }
    };

    if summary.is_consistent() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_INCONSISTENT))
    }
}

fn print_summary_text(
    ui: &Ui,
    snapshot: &Path,
    config: Option<&Path>,
    options: &CheckOptions,
    summary: &ConsistencySummaryStatistics,
) {
    if ui.is_quiet() {
        return;
    }
    let report = summary.report();
    let mut rows = vec![
        ("snapshot", snapshot.display().to_string()),
        (
            "config",
            config.map_or_else(|| "defaults".to_string(), |path| path.display().to_string()),
        ),
        ("order", options.execution_order.to_string()),
        (
            "property owners",
            options.check_property_owners.to_string(),
        ),
        ("errors", report.errors.to_string()),
        ("warnings", report.warnings.to_string()),
    ];
    for counts in &report.types {
        rows.push((
            counts.record_type.as_str(),
            format!("{} errors, {} warnings", counts.errors, counts.warnings),
        ));
    }
    ui.section("Consistency check", rows);
    if report.consistent {
        ui.success("No inconsistencies found");
    } else {
        ui.warn("Inconsistencies found");
    }
}
