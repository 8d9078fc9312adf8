use super::Host;
use super::common::{GlobalArgs, StoreArgs, open_store};
use crate::Result;
use crate::store::Capacities;
use clap::Parser;
use ohno::IntoAppError;
use owo_colors::OwoColorize;
use std::io::Write;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug)]
struct StoreInfo {
    capacities: Capacities,
    variables_used: u32,
    files_used: u32,
    total_len: u64,
    files: Vec<(String, String)>,
}

pub async fn process_info<H: Host>(host: &mut H, global: &GlobalArgs, args: &InfoArgs) -> Result<()> {
    let config = global.prepare()?;
    let progress = global.progress_reporter();
    progress.set_phase("Opening");

    let store = open_store(args.store.store.clone(), config, Arc::clone(&progress)).await;
    progress.done();
    let store = store?;

    let info = StoreInfo {
        capacities: store.capacities(),
        variables_used: store.variables_used(),
        files_used: store.files_used(),
        total_len: store.layout().total_len(),
        files: store
            .files()
            .map(|(name, info)| (name.to_string(), info.last_modified.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string()))
            .collect(),
    };

    tokio::task::spawn_blocking(move || store.close())
        .await
        .into_app_err("store task panicked")??;

    let title = format!("Store '{}'", args.store.store);
    if global.color.use_colors() {
        let _ = writeln!(host.output(), "{}", title.bold());
    } else {
        let _ = writeln!(host.output(), "{title}");
    }

    let _ = writeln!(
        host.output(),
        "  variables: {} of {}\n  files:     {} of {}\n  size:      {} bytes",
        info.variables_used,
        info.capacities.variables,
        info.files_used,
        info.capacities.files,
        info.total_len
    );

    for (slot, (name, modified)) in info.files.iter().enumerate() {
        let _ = writeln!(host.output(), "  {slot:>6}  {name:<25}  {modified}");
    }

    Ok(())
}
