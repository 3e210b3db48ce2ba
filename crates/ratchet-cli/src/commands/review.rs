//! Review command implementation.

use super::{parse_claim_id, parse_review_id, Session};
use crate::cli::ReviewCommand;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use ratchet_domain::ActorRef;

/// Execute a review command.
pub fn execute_review(
    command: ReviewCommand,
    session: &Session,
    formatter: &Formatter,
) -> Result<()> {
    let engine = &session.engine;
    match command {
        ReviewCommand::Assign {
            claim,
            reviewer,
            kind,
        } => {
            let reviewer = ActorRef::new(reviewer.as_str()).map_err(|e| {
                CliError::InvalidInput(format!("Invalid reviewer '{}': {}", reviewer, e))
            })?;
            let review = engine.assign_review(
                session.actor()?,
                parse_claim_id(&claim)?,
                reviewer,
                kind.into(),
            )?;
            println!("{}", formatter.format_reviews(&[review])?);
        }
        ReviewCommand::Decide {
            review,
            decision,
            score,
            comment,
        } => {
            let outcome = engine.record_decision(
                session.actor()?,
                parse_review_id(&review)?,
                decision.into(),
                score,
                comment,
            )?;
            println!("{}", formatter.format_outcome(&outcome)?);
        }
        ReviewCommand::List { claim } => {
            let reviews = engine.reviews_for_claim(parse_claim_id(&claim)?)?;
            println!("{}", formatter.format_reviews(&reviews)?);
        }
    }
    Ok(())
}
