//! Ledger command implementation.

use super::Session;
use crate::cli::LedgerCommand;
use crate::error::Result;
use crate::output::Formatter;
use ratchet_assurance::AssuranceError;

/// Execute a ledger command.
///
/// A diverging chain is printed and then returned as an integrity error so
/// the process exits non-zero.
pub fn execute_ledger(
    command: LedgerCommand,
    session: &Session,
    formatter: &Formatter,
) -> Result<()> {
    let engine = &session.engine;
    match command {
        LedgerCommand::Verify { from, to } => {
            let report = match (from, to) {
                (None, None) => engine.verify_all()?,
                (from, to) => {
                    let to = match to {
                        Some(to) => to,
                        None => engine.chain_head()?.seq,
                    };
                    engine.verify_chain(from.unwrap_or(1), to)?
                }
            };
            println!("{}", formatter.format_report(&report)?);
            if let Some(divergence) = report.divergence {
                return Err(AssuranceError::Integrity(format!(
                    "ledger diverges at seq {}",
                    divergence.seq
                ))
                .into());
            }
        }
        LedgerCommand::History { entity } => {
            let entries = engine.history_for_entity(&entity)?;
            println!("{}", formatter.format_entries(&entries)?);
        }
        LedgerCommand::Audit { reconcile } => {
            let findings = engine.find_unaudited()?;
            println!("{}", formatter.format_unaudited(&findings)?);
            if reconcile && !findings.is_empty() {
                let entries = engine.reconcile_unaudited(session.actor()?)?;
                println!("{}", formatter.format_entries(&entries)?);
            }
        }
    }
    Ok(())
}
