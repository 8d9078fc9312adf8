//! Command dispatch logic for slha-store

use super::{
    ExportArgs, GlobalArgs, InfoArgs, IngestArgs, VariablesArgs, process_export, process_info, process_ingest, process_variables,
};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "slha-store", version, long_about = None)]
#[command(about = "Store collections of SLHA files in a single random-access binary table")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: StoreSubcommand,
}

#[derive(Subcommand, Debug)]
enum StoreSubcommand {
    /// Ingest every SLHA file in a directory into a store
    Ingest(IngestArgs),
    /// Show the capacities and contents of a store
    Info(InfoArgs),
    /// List the variables held by a store
    Variables(VariablesArgs),
    /// Write selected variables for every stored file
    Export(ExportArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);

    match &cli.command {
        StoreSubcommand::Ingest(ingest_args) => process_ingest(host, &cli.global, ingest_args).await,
        StoreSubcommand::Info(info_args) => process_info(host, &cli.global, info_args).await,
        StoreSubcommand::Variables(variables_args) => process_variables(host, &cli.global, variables_args).await,
        StoreSubcommand::Export(export_args) => process_export(host, &cli.global, export_args).await,
    }
}
