use std::fs::File;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use graham_screen::{
    analysis::GrahamScreener,
    database::DatabaseManager,
    export::{export_financials_csv, export_report_csv},
    models::{
        graham_value::{DebtClause, ScreeningCriteria, ScreeningReport},
        Config,
    },
    pipeline::{run_batch, BatchConfig},
    source::JsonDirectorySource,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Graham value screening over stored financial statements", long_about = None)]
struct Cli {
    /// SQLite database file (overrides DATABASE_PATH)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Directory holding raw <TICKER>.json bundles (overrides RAW_DATA_PATH)
    #[arg(long, global = true)]
    raw_dir: Option<String>,

    /// Number of concurrent ingestion workers (overrides WORKER_COUNT)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Reading of the liquidity debt clause: literal or working-capital
    #[arg(long, global = true)]
    debt_clause: Option<DebtClause>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize raw bundles, store them and screen each company
    Ingest {
        /// Tickers to ingest; all bundles in the raw directory when omitted
        tickers: Vec<String>,
    },
    /// Screen one stored company
    Evaluate {
        company: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored companies
    List,
    /// Write a company's yearly records (or its screening report) to CSV
    Export {
        company: String,
        path: String,
        #[arg(long)]
        report: bool,
    },
    /// Remove a company and its financials
    Delete { company: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("graham_screen=info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let mut config = Config::from_env()?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    if let Some(raw_dir) = cli.raw_dir {
        config.raw_data_path = raw_dir;
    }
    if let Some(workers) = cli.workers {
        config.worker_count = workers;
    }
    if let Some(debt_clause) = cli.debt_clause {
        config.debt_clause = debt_clause;
    }

    let criteria = ScreeningCriteria {
        debt_clause: config.debt_clause,
        ..Default::default()
    };
    let database = Arc::new(DatabaseManager::new(&config.database_path).await?);

    match cli.command {
        Command::Ingest { tickers } => {
            let source = Arc::new(JsonDirectorySource::new(&config.raw_data_path));
            let batch = BatchConfig {
                worker_count: config.worker_count,
                criteria,
                companies: tickers,
                max_companies: None,
            };
            let result = run_batch(source, Arc::clone(&database), batch).await?;

            for (company, report) in &result.reports {
                println!(
                    "{:<12} {}/{} rules passed",
                    company,
                    report.passed_count(),
                    report.len()
                );
            }
            for (company, reason) in &result.failures {
                println!("{:<12} FAILED: {}", company, reason);
            }
            println!(
                "Ingested {} of {} companies ({} failed, {} yearly records)",
                result.processed, result.total, result.failed, result.total_records
            );
        }
        Command::Evaluate { company, json } => {
            let report = evaluate(&database, &criteria, &company).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&company, &report);
            }
        }
        Command::List => {
            let companies = database.list_companies().await?;
            if companies.is_empty() {
                println!("No companies stored in {}", config.database_path);
            }
            for company in companies {
                println!(
                    "{:<12} {:<30} {:<12} {:>3} years  {}",
                    company.name,
                    company.industry.as_deref().unwrap_or("-"),
                    company.country.as_deref().unwrap_or("-"),
                    company.years,
                    company
                        .last_update
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "never".to_string())
                );
            }
        }
        Command::Export {
            company,
            path,
            report,
        } => {
            let file = File::create(&path).with_context(|| format!("creating {}", path))?;
            if report {
                let screening = evaluate(&database, &criteria, &company).await?;
                export_report_csv(&company, &screening, file)?;
            } else {
                let records = database.get_financials(&company, None).await?;
                if records.is_empty() {
                    bail!("No financials stored for {}", company);
                }
                export_financials_csv(&records, file)?;
            }
            info!("Exported {} to {}", company, path);
        }
        Command::Delete { company } => {
            if database.delete_company(&company).await? {
                println!("Deleted {}", company);
            } else {
                bail!("Company '{}' not found", company);
            }
        }
    }

    database.close().await;
    Ok(())
}

async fn evaluate(
    database: &DatabaseManager,
    criteria: &ScreeningCriteria,
    company: &str,
) -> Result<ScreeningReport> {
    let records = database.get_financials(company, None).await?;
    if records.is_empty() {
        bail!("No financials stored for {}", company);
    }
    Ok(GrahamScreener::new(criteria.clone()).evaluate(&records))
}

fn print_report(company: &str, report: &ScreeningReport) {
    println!("Graham screening for {}", company);
    println!("{}", "=".repeat(60));
    for (rule, verdict) in report.iter() {
        println!(
            "{:<11} {:<5} {}",
            rule.label(),
            if verdict.passed { "PASS" } else { "FAIL" },
            verdict.description
        );
        println!("{:<17} {}", "", verdict.value);
    }
    println!("{}", "=".repeat(60));
    println!("{}/{} rules passed", report.passed_count(), report.len());
}
