use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rufous_core::{AccountType, Transaction, TransactionId};
use rufous_finance::{
    Categorizer, IntentResolver, LedgerStore, QueryExecutor, QueryIntent, RecategorizeScope, SortOrder,
    SqliteLedger, TransactionFilter, export_csv, recategorize,
};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod ingest_cmd;
mod state;

use config::{Config, InitOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "rufous",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("RUFOUS_GIT_REVISION"), ")"),
    about = "Bank statement ledger: ingest statements, ask questions"
)]
struct Cli {
    /// Ledger file (overrides [ledger] path in config.toml)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest statement text files (pages separated by form feeds) or CSV exports
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Account type: debit or credit
        #[arg(long)]
        account: AccountType,

        /// Statement layout (see `rufous layouts`)
        #[arg(long, default_value = "generic")]
        layout: String,

        /// Year for layouts whose rows omit it (default: this year)
        #[arg(long)]
        year: Option<i32>,

        /// Treat the files as CSV exports
        #[arg(long, default_value_t = false)]
        csv: bool,

        /// Print summaries as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Answer a question from a model completion
    Ask {
        #[arg(long)]
        question: String,

        /// Model completion text
        #[arg(long, conflicts_with = "completion_file")]
        completion: Option<String>,

        /// File holding the model completion
        #[arg(long)]
        completion_file: Option<PathBuf>,

        /// Reference date for relative periods (default: today in query.timezone)
        #[arg(long)]
        now: Option<NaiveDate>,
    },

    /// Print the instruction text to send to a model for a question
    Prompt {
        #[arg(long)]
        question: String,

        #[arg(long)]
        now: Option<NaiveDate>,
    },

    /// List categories in priority order, or explain one description
    Categories {
        #[arg(long)]
        explain: Option<String>,
    },

    /// List built-in statement layouts
    Layouts,

    /// Find transactions mentioning a word in description, merchant, category or location
    Search {
        term: String,

        /// Only rows whose location contains this
        #[arg(long)]
        location: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Row and statement counts, date span, spending and income
    Stats,

    /// Re-run the category rules over stored transactions
    Recategorize {
        /// Also relabel rows that already have a category
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Set one transaction's category by hand
    SetCategory {
        #[arg(long)]
        id: u64,

        #[arg(long)]
        category: String,
    },

    /// Write the ledger as CSV (stdout by default)
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Configuration file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.rufous/config.toml with defaults
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = state::config_path()?;
    let cfg = Config::load(&config_path)?;

    match cli.command {
        Command::Ingest { files, account, layout, year, csv, json } => {
            let ledger = open_ledger(&cfg, cli.db)?;
            let opts = ingest_cmd::IngestOptions { account, layout, year, csv };
            let results = ingest_cmd::run(files, opts, ledger, cfg.category_set()).await?;
            ingest_cmd::report(&results, json)?;
        }

        Command::Ask { question, completion, completion_file, now } => {
            let completion = match (completion, completion_file) {
                (Some(text), _) => text,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))?,
                (None, None) => bail!("pass --completion or --completion-file"),
            };
            let now = match now {
                Some(d) => d,
                None => today(&cfg)?,
            };
            ask(&cfg, cli.db, &question, &completion, now)?;
        }

        Command::Prompt { question, now } => {
            let now = match now {
                Some(d) => d,
                None => today(&cfg)?,
            };
            let resolver = IntentResolver::new(cfg.category_set());
            print!("{}", resolver.completion_prompt(&question, now));
        }

        Command::Categories { explain } => {
            let set = cfg.category_set();
            match explain {
                Some(description) => {
                    let categorizer = rufous_finance::Categorizer::new(&set);
                    let explanation = categorizer.explain(&description);
                    println!("{}", serde_json::to_string_pretty(&explanation)?);
                }
                None => {
                    for (i, c) in set.iter().enumerate() {
                        let sub = c.subcategory.as_deref().unwrap_or("-");
                        println!("{:>2}. {} / {} | {}", i + 1, c.label, sub, c.keywords.join(", "));
                    }
                }
            }
        }

        Command::Layouts => {
            for layout in rufous_ingest::builtin_layouts() {
                println!("{}", layout.name);
            }
            println!("{}", rufous_finance::CSV_LAYOUT);
        }

        Command::Search { term, location, limit } => {
            let ledger = open_ledger(&cfg, cli.db)?;
            let rows = match location {
                None => ledger.search(&term, limit)?,
                Some(place) => ledger.query(&TransactionFilter {
                    search: Some(term),
                    location: Some(place),
                    exclude_transfers: true,
                    order: SortOrder::DateDescending,
                    limit: Some(limit),
                    ..Default::default()
                })?,
            };
            if rows.is_empty() {
                println!("No matching transactions.");
            }
            for t in &rows {
                print_row(t);
            }
        }

        Command::Stats => {
            let ledger = open_ledger(&cfg, cli.db)?;
            println!("{}", serde_json::to_string_pretty(&ledger.stats()?)?);
        }

        Command::Recategorize { all } => {
            let ledger = open_ledger(&cfg, cli.db)?;
            let scope = if all { RecategorizeScope::All } else { RecategorizeScope::Uncategorized };
            let summary = recategorize(&ledger, &Categorizer::new(&cfg.category_set()), scope)?;
            println!("examined={} changed={}", summary.examined, summary.changed);
        }

        Command::SetCategory { id, category } => {
            let set = cfg.category_set();
            let Some(label) = set.canonical_label(&category) else {
                bail!("unknown category {category:?} (see `rufous categories`)");
            };
            let ledger = open_ledger(&cfg, cli.db)?;
            if !ledger.set_category(TransactionId(id), label)? {
                bail!("no transaction with id {id}");
            }
            println!("#{id} -> {label}");
        }

        Command::Export { out } => {
            let ledger = open_ledger(&cfg, cli.db)?;
            let filter = TransactionFilter::default();
            let written = match out {
                Some(path) => {
                    let file = fs::File::create(&path).with_context(|| format!("create {}", path.display()))?;
                    let n = export_csv(&ledger, &filter, file)?;
                    eprintln!("Wrote {n} transactions to {}", path.display());
                    n
                }
                None => export_csv(&ledger, &filter, io::stdout().lock())?,
            };
            tracing::debug!(written, "export finished");
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => match Config::init(&config_path)? {
                InitOutcome::Written => println!("Wrote {}", config_path.display()),
                InitOutcome::AlreadyPresent => println!("Config already exists: {}", config_path.display()),
            },
            ConfigCommand::Show => print!("{}", toml::to_string_pretty(&cfg)?),
        },
    }

    Ok(())
}

fn open_ledger(cfg: &Config, db: Option<PathBuf>) -> Result<SqliteLedger> {
    let path = match db {
        Some(p) => p,
        None => cfg.ledger_path()?,
    };
    SqliteLedger::open(&path).with_context(|| format!("open ledger {}", path.display()))
}

fn print_row(t: &Transaction) {
    let place = t.location.as_deref().unwrap_or("-");
    println!(
        "{:>6}  {}  {:>10}  {:<18}  {}  [{place}]",
        t.id.to_string(),
        t.date,
        t.amount.to_string(),
        t.category,
        t.description
    );
}

fn today(cfg: &Config) -> Result<NaiveDate> {
    let tz = cfg.timezone()?;
    Ok(Utc::now().with_timezone(&tz).date_naive())
}

fn ask(cfg: &Config, db: Option<PathBuf>, question: &str, completion: &str, now: NaiveDate) -> Result<()> {
    let resolver = IntentResolver::new(cfg.category_set());
    let intent = resolver.resolve(question, completion, now);
    if let QueryIntent::Unrecognized { reason } = &intent {
        println!("Could not understand the question ({reason}).");
        println!("Try something like \"How much did I spend on food last month?\"");
        return Ok(());
    }

    let ledger = open_ledger(cfg, db)?;
    let executor = QueryExecutor::new(cfg.executor_config());
    let result = executor.execute(&intent, &ledger)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", serde_json::to_string_pretty(&intent)?)?;
    if result.is_empty() {
        writeln!(stdout, "No matching transactions.")?;
    }
    writeln!(stdout, "{}", serde_json::to_string_pretty(&result)?)?;
    Ok(())
}
