use super::Host;
use super::common::{GlobalArgs, StoreArgs, open_store};
use crate::Result;
use crate::export::VariableSelector;
use clap::Parser;
use ohno::IntoAppError;
use std::io::Write;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct VariablesArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

/// Lists every stored variable in the `BLOCK:PDG` form accepted by `export --var`.
pub async fn process_variables<H: Host>(host: &mut H, global: &GlobalArgs, args: &VariablesArgs) -> Result<()> {
    let config = global.prepare()?;
    let progress = global.progress_reporter();
    progress.set_phase("Opening");

    let store = open_store(args.store.store.clone(), config, Arc::clone(&progress)).await;
    progress.done();
    let store = store?;

    let lines: Vec<String> = store
        .variables()
        .iter()
        .map(|variable| {
            let selector = VariableSelector::from(variable).to_string();
            if variable.description().is_empty() {
                selector
            } else {
                format!("{selector:<30}  {}", variable.description())
            }
        })
        .collect();

    tokio::task::spawn_blocking(move || store.close())
        .await
        .into_app_err("store task panicked")??;

    for line in lines {
        let _ = writeln!(host.output(), "{line}");
    }

    Ok(())
}
