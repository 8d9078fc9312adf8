use super::common::GlobalArgs;
use super::Host;
use crate::Result;
use crate::catalog::{BatchSummary, ingest_directory};
use crate::store::{Store, StoreObserver};
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::IntoAppError;
use owo_colors::OwoColorize;
use std::io::Write;
use std::sync::Arc;

/// Store file name used when `--store` is not given
pub const DEFAULT_STORE_NAME: &str = "binary.bin";

#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// Directory containing the SLHA files to ingest
    #[arg(value_name = "DIR")]
    pub dir: Utf8PathBuf,

    /// Store file to ingest into (default is `binary.bin` inside DIR)
    #[arg(long, short = 's', value_name = "PATH")]
    pub store: Option<Utf8PathBuf>,
}

#[derive(Debug)]
struct IngestOutcome {
    summary: BatchSummary,
    files_used: u32,
    variables_used: u32,
    inconsistency_log: Utf8PathBuf,
}

pub async fn process_ingest<H: Host>(host: &mut H, global: &GlobalArgs, args: &IngestArgs) -> Result<()> {
    let config = global.prepare()?;
    let store_path = args.store.clone().unwrap_or_else(|| args.dir.join(DEFAULT_STORE_NAME));
    let dir = args.dir.clone();

    let progress = global.progress_reporter();
    progress.set_phase("Ingesting");
    let observer: Arc<dyn StoreObserver> = Arc::clone(&progress) as Arc<dyn StoreObserver>;

    let result = tokio::task::spawn_blocking(move || {
        let mut store = Store::open_with(store_path.as_std_path(), config, vec![observer])?;

        let mut summary = store.reconciled().clone();
        summary.absorb(ingest_directory(&mut store, dir.as_std_path())?);

        let outcome = IngestOutcome {
            summary,
            files_used: store.files_used(),
            variables_used: store.variables_used(),
            inconsistency_log: Utf8PathBuf::from(store.inconsistency_log_path().to_string_lossy().into_owned()),
        };
        store.close()?;
        Ok::<_, ohno::AppError>(outcome)
    })
    .await
    .into_app_err("ingestion task panicked")?;

    progress.done();
    let outcome = result?;
    let summary = &outcome.summary;
    let use_colors = global.color.use_colors();

    let headline = format!("Ingested {} files, updated {}", summary.ingested, summary.updated);
    if use_colors {
        let _ = writeln!(host.output(), "{}", headline.green().bold());
    } else {
        let _ = writeln!(host.output(), "{headline}");
    }
    let _ = writeln!(
        host.output(),
        "Store holds {} files and {} variables",
        outcome.files_used,
        outcome.variables_used
    );

    if summary.inconsistencies > 0 {
        let _ = writeln!(
            host.output(),
            "{} inconsistencies logged to '{}'",
            summary.inconsistencies,
            outcome.inconsistency_log
        );
    }

    if !summary.skipped.is_empty() {
        let _ = writeln!(host.error(), "Skipped {} files: {}", summary.skipped.len(), summary.skipped.join(", "));
    }

    Ok(())
}
