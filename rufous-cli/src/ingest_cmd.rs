use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use rufous_core::{AccountType, CategorySet};
use rufous_finance::{IngestError, Ingestor, SqliteLedger, StatementInput, StatementSummary};
use rufous_ingest::split_pages;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::error;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub account: AccountType,
    pub layout: String,
    pub year: Option<i32>,
    pub csv: bool,
}

/// One result per file, in argument order.
pub type FileResult = (PathBuf, Result<StatementSummary, IngestError>);

/// Ingest every file on its own blocking worker. All workers share the
/// ledger connection; the store settles duplicate races.
pub async fn run(
    files: Vec<PathBuf>,
    opts: IngestOptions,
    ledger: SqliteLedger,
    categories: CategorySet,
) -> Result<Vec<FileResult>> {
    let ingestor = Arc::new(Ingestor::new(&categories).context("compile statement layouts")?);
    let now = Local::now().naive_local();

    let mut workers = JoinSet::new();
    for (index, path) in files.into_iter().enumerate() {
        let ingestor = Arc::clone(&ingestor);
        let ledger = ledger.clone();
        let opts = opts.clone();
        workers.spawn_blocking(move || {
            let result = ingest_file(&ingestor, &ledger, &path, &opts, now);
            (index, path, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = workers.join_next().await {
        let (index, path, result) = joined.context("ingest worker panicked")?;
        results.push((index, path, result?));
    }
    results.sort_by_key(|(index, _, _)| *index);
    Ok(results.into_iter().map(|(_, path, result)| (path, result)).collect())
}

/// Read errors abort the command; ingest errors are reported per file.
fn ingest_file(
    ingestor: &Ingestor,
    ledger: &SqliteLedger,
    path: &Path,
    opts: &IngestOptions,
    now: NaiveDateTime,
) -> Result<Result<StatementSummary, IngestError>> {
    let source_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if opts.csv {
        let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
        return Ok(ingestor.ingest_csv(&source_name, file, opts.account, ledger, now));
    }

    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let input = StatementInput {
        source_name,
        account_type: opts.account,
        layout: opts.layout.clone(),
        pages: split_pages(&text).into_iter().map(str::to_string).collect(),
        statement_year: opts.year,
    };
    Ok(ingestor.ingest(input, ledger, now))
}

pub fn report(results: &[FileResult], json: bool) -> Result<()> {
    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(summary) if json => println!("{}", serde_json::to_string(summary)?),
            Ok(summary) => print_summary(summary),
            Err(e) => {
                failed += 1;
                error!(file = %path.display(), "{e}");
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} files failed", results.len());
    }
    Ok(())
}

fn print_summary(s: &StatementSummary) {
    println!(
        "{} [{}] statement #{}: pages={} (empty {}) extracted={} inserted={} duplicates={} failures={} zero={}",
        s.source_name,
        s.layout,
        s.statement_id,
        s.pages,
        s.empty_pages,
        s.extracted,
        s.inserted,
        s.duplicates,
        s.parse_failures,
        s.zero_amount_skipped,
    );
    for warning in &s.warnings {
        println!("  warning: {warning}");
    }
    for failure in &s.failures {
        println!("  skipped {failure}");
    }
}
