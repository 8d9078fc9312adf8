use super::Host;
use super::common::{GlobalArgs, StoreArgs, open_store};
use crate::Result;
use crate::export::{ExportFormat, VariableSelector, export};
use crate::model::Variable;
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::IntoAppError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Variable to export, as BLOCK:PDG1[,PDG2[,PDG3]] (repeatable, column order follows)
    #[arg(long = "var", short = 'v', value_name = "VARIABLE", required = true)]
    pub vars: Vec<String>,

    /// File to write
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Utf8PathBuf,

    /// Layout of the output file
    #[arg(long, value_name = "FORMAT", default_value = "dat")]
    pub format: ExportFormat,
}

pub async fn process_export<H: Host>(host: &mut H, global: &GlobalArgs, args: &ExportArgs) -> Result<()> {
    let config = global.prepare()?;

    let variables = args
        .vars
        .iter()
        .map(|text| text.parse::<VariableSelector>().map(|selector| selector.to_variable()))
        .collect::<Result<Vec<Variable>>>()?;

    let progress = global.progress_reporter();
    progress.set_phase("Opening");
    let store = open_store(args.store.store.clone(), config, Arc::clone(&progress)).await;
    progress.done();
    let store = store?;

    let output = args.output.clone();
    let format = args.format;
    let rows = tokio::task::spawn_blocking(move || {
        let file = File::create(&output).into_app_err_with(|| format!("creating export file '{output}'"))?;
        let rows = export(&store, &variables, BufWriter::new(file), format)?;
        store.close()?;
        Ok::<_, ohno::AppError>(rows)
    })
    .await
    .into_app_err("export task panicked")??;

    let _ = writeln!(host.output(), "Exported {rows} rows to '{}'", args.output);
    Ok(())
}
