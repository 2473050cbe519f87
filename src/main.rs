use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use driver_ledger::application::engine::LedgerEngine;
use driver_ledger::config::LedgerConfig;
use driver_ledger::domain::ports::{DepositStoreRef, PaymentStoreRef};
use driver_ledger::infrastructure::in_memory::{InMemoryDepositStore, InMemoryPaymentStore};
use driver_ledger::interfaces::csv::action_reader::ActionReader;
use driver_ledger::interfaces::csv::report_writer::ReportWriter;

/// Replays an action-journal CSV against the ledger and prints the
/// pending-settlements report to stdout.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input action-journal CSV file
    input: PathBuf,

    /// Path to persistent database (optional). Requires the
    /// `storage-rocksdb` feature.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[cfg(feature = "storage-rocksdb")]
fn build_stores(db_path: Option<PathBuf>) -> Result<(PaymentStoreRef, DepositStoreRef)> {
    use driver_ledger::infrastructure::rocksdb::RocksDbStore;

    if let Some(path) = db_path {
        let store = RocksDbStore::open(path).into_diagnostic()?;
        Ok((Arc::new(store.clone()), Arc::new(store)))
    } else {
        Ok((
            Arc::new(InMemoryPaymentStore::new()),
            Arc::new(InMemoryDepositStore::new()),
        ))
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_stores(db_path: Option<PathBuf>) -> Result<(PaymentStoreRef, DepositStoreRef)> {
    if db_path.is_some() {
        tracing::warn!(
            "persistent storage requested via --db-path, but the 'storage-rocksdb' feature \
             is not enabled; falling back to in-memory storage"
        );
    }
    Ok((
        Arc::new(InMemoryPaymentStore::new()),
        Arc::new(InMemoryDepositStore::new()),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // The report goes to stdout, so logging goes to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LedgerConfig::from_env();

    let (payments, deposits) = build_stores(cli.db_path)?;
    let engine = LedgerEngine::new(payments, deposits, config);

    // Replay the journal. Row-level failures are logged and skipped; the
    // ledger guarantees a failed action mutates nothing.
    let file = File::open(&cli.input).into_diagnostic()?;
    for action in ActionReader::new(file).actions() {
        match action {
            Ok(action) => {
                if let Err(e) = engine.apply(action).await {
                    tracing::warn!(error = %e, "skipping failed action");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable action row");
            }
        }
    }

    let pending = engine.pending_settlements().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_batches(&pending).into_diagnostic()?;

    Ok(())
}
