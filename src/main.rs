use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process;

use sge_accounting::analyzer::{AccountingAnalyzer, ReportOptions};
use sge_accounting::config::{init_config, Config};
use sge_accounting::logging::init_logging;
use sge_accounting::report::ReportKind;

#[derive(Parser)]
#[command(name = "sge-accounting")]
#[command(about = "Core-hour usage reports from Grid Engine accounting files")]
#[command(version)]
struct Cli {
    /// Date range: A, A-, -B or A-B with A/B as YYYY[MM[DD[hh[mm[ss]]]]]
    #[arg(long)]
    date: Option<String>,

    /// Accounting file to read (repeatable)
    #[arg(long = "accountingfile", value_name = "PATH")]
    accounting_files: Vec<PathBuf>,

    /// Only include jobs from these queues
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    queues: Vec<String>,

    /// Exclude jobs from these queues
    #[arg(long = "skipqueues", num_args = 1.., value_delimiter = ',')]
    skip_queues: Vec<String>,

    /// Only include jobs belonging to these owners
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    owners: Vec<String>,

    /// Exclude jobs belonging to these owners
    #[arg(long = "skipowners", num_args = 1.., value_delimiter = ',')]
    skip_owners: Vec<String>,

    /// Restrict to the configured core owners (replaces --owners)
    #[arg(long = "coreowners")]
    core_owners: bool,

    /// Show only the top N users in user reports
    #[arg(long = "limitusers")]
    limit_users: Option<usize>,

    /// Cores available over the window, for utilization figures
    #[arg(long)]
    cores: Option<u64>,

    /// Reports to print: header, totals, owners, users, usersbyowner
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    reports: Vec<ReportKind>,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = cli.json;

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => init_config(config),
        Err(e) => handle_error(e, json),
    };
    let _log_guard = init_logging(&config.logging, &config.paths.log_directory);

    let analyzer = match AccountingAnalyzer::new(config) {
        Ok(analyzer) => analyzer,
        Err(e) => handle_error(e, json),
    };

    let options = ReportOptions {
        date: cli.date,
        accounting_files: cli.accounting_files,
        queues: cli.queues,
        skip_queues: cli.skip_queues,
        owners: cli.owners,
        skip_owners: cli.skip_owners,
        core_owners: cli.core_owners,
        limit_users: cli.limit_users,
        cores: cli.cores,
        reports: cli.reports,
        json_output: json,
    };

    match analyzer.run(&options) {
        Ok(()) => Ok(()),
        Err(e) => handle_error(e, json),
    }
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
