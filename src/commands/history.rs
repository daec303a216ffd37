use super::AppContext;
use crate::cli::HistoryCommand;
use crate::error::{ElysiaError, Result};
use crate::transfer::{TransferFormat, TransferStatus};
use colored::Colorize;

/// Handle history commands
pub fn handle_history(ctx: &AppContext, command: HistoryCommand) -> Result<()> {
    let transfer = ctx.transfer();

    let outcome = match command {
        HistoryCommand::Export { path, format } => format
            .parse::<TransferFormat>()
            .and_then(|format| transfer.export_to_path(&path, format)),
        HistoryCommand::Import { path, append } => transfer
            .import_from_path(&path, !append)
            .map(|count| TransferStatus::Imported {
                count,
                replaced: !append,
            }),
        HistoryCommand::Clear => {
            let count = ctx.storage.count()?;
            ctx.storage.clear()?;
            println!("{}", format!("Deleted {} messages", count).green());
            return Ok(());
        }
    };

    match outcome {
        Ok(status @ TransferStatus::NothingToExport) => {
            println!("{}", status.to_string().yellow());
            Ok(())
        }
        Ok(status) => {
            println!("{}", status.to_string().green());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", TransferStatus::from(&e).to_string().red());
            Err(ElysiaError::Transfer(e).into())
        }
    }
}
