//! Graph command implementation.

use super::Session;
use crate::cli::GraphArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use ratchet_assurance::GraphOptions;
use ratchet_domain::ProjectRef;

/// Execute the graph command.
pub fn execute_graph(args: GraphArgs, session: &Session, formatter: &Formatter) -> Result<()> {
    let project = ProjectRef::new(args.project.as_str())
        .map_err(|e| CliError::InvalidInput(format!("Invalid project '{}': {}", args.project, e)))?;
    let options = GraphOptions {
        include_history: args.provenance,
        include_tombstoned: args.all,
    };
    let graph = session.engine.build_evidence_graph(&project, options)?;
    println!("{}", formatter.format_graph(&graph)?);
    Ok(())
}
