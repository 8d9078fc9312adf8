//! Writing selected variables out of a store, one line per stored file.

mod selector;

pub use selector::VariableSelector;

use crate::Result;
use crate::model::{SENTINEL, Variable};
use crate::store::Store;
use clap::ValueEnum;
use ohno::{IntoAppError, bail};
use std::io::Write;

/// Log target for export
const LOG_TARGET: &str = "    export";

/// Layout of an export file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Whitespace-separated scientific notation, one column per variable
    Dat,

    /// Comma-separated values with a header row and the file name in the first column
    Csv,
}

/// Writes the values of `variables` for every stored file, in slot order.
///
/// Reads go straight to disk, so the store should be synced first. Returns the number of rows
/// written.
///
/// # Errors
///
/// Fails if a selected variable is not in the store or the output cannot be written.
pub fn export(store: &Store, variables: &[Variable], writer: impl Write, format: ExportFormat) -> Result<usize> {
    if variables.is_empty() {
        bail!("no variables selected for export");
    }

    for variable in variables {
        if store.variable_offset(variable).is_none() {
            bail!("variable {} not found in store '{}'", VariableSelector::from(variable), store.path().display());
        }
    }

    let rows = match format {
        ExportFormat::Dat => export_dat(store, variables, writer)?,
        ExportFormat::Csv => export_csv(store, variables, writer)?,
    };

    log::info!(target: LOG_TARGET, "Exported {} variables for {rows} files", variables.len());
    Ok(rows)
}

fn export_dat(store: &Store, variables: &[Variable], mut writer: impl Write) -> Result<usize> {
    let mut rows = 0;
    for (_, info) in store.files() {
        let mut line = String::new();
        for variable in variables {
            let value = store.value(variable, info.slot);
            if value >= 0.0 {
                line.push(' ');
            }
            line.push_str(&format_scientific(value));
            line.push_str("    ");
        }
        writeln!(writer, "{line}").into_app_err("writing export row")?;
        rows += 1;
    }

    writer.flush().into_app_err("flushing export output")?;
    Ok(rows)
}

fn export_csv(store: &Store, variables: &[Variable], writer: impl Write) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["file".to_string()];
    header.extend(variables.iter().map(|variable| VariableSelector::from(variable).to_string()));
    csv.write_record(&header).into_app_err("writing export header")?;

    let mut rows = 0;
    for (name, info) in store.files() {
        let mut record = vec![name.to_string()];
        for variable in variables {
            let value = store.value(variable, info.slot);
            // Missing values are left empty rather than shown as the sentinel
            record.push(if value == SENTINEL { String::new() } else { value.to_string() });
        }
        csv.write_record(&record).into_app_err("writing export row")?;
        rows += 1;
    }

    csv.flush().into_app_err("flushing export output")?;
    Ok(rows)
}

/// Formats a value as `d.dddddddd` followed by `E` and an exponent of at least two digits.
#[must_use]
pub fn format_scientific(value: f64) -> String {
    let formatted = format!("{value:.8e}");
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };

    match exponent.strip_prefix('-') {
        Some(digits) => format!("{mantissa}E-{digits:0>2}"),
        None => format!("{mantissa}E{exponent:0>2}"),
    }
}
