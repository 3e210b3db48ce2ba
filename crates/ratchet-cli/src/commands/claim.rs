//! Claim command implementation.

use super::{parse_claim_id, parse_json, Session};
use crate::cli::{ClaimCommand, CreateArgs, UpdateArgs};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use ratchet_domain::{ClaimDraft, ClaimUpdate, ProjectRef};
use std::io::{self, Write};

/// Execute a claim command.
pub fn execute_claim(
    command: ClaimCommand,
    session: &Session,
    formatter: &Formatter,
) -> Result<()> {
    let engine = &session.engine;
    match command {
        ClaimCommand::Create(args) => {
            let draft = draft_from_args(args)?;
            let claim = engine.create_claim(session.actor()?, draft)?;
            println!("{}", formatter.format_claim(&claim)?);
        }
        ClaimCommand::Get { id } => {
            let claim = engine.get_claim(parse_claim_id(&id)?)?;
            println!("{}", formatter.format_claim(&claim)?);
        }
        ClaimCommand::List { project, all } => {
            let project = parse_project(&project)?;
            let claims = engine.list_claims_by_project(&project, all)?;
            println!("{}", formatter.format_claims(&claims)?);
        }
        ClaimCommand::Update(args) => {
            let id = parse_claim_id(&args.id)?;
            let update = update_from_args(args)?;
            let claim = engine.update_claim(session.actor()?, id, update)?;
            println!("{}", formatter.format_claim(&claim)?);
        }
        ClaimCommand::Submit { id } => {
            let claim = engine.submit_claim(session.actor()?, parse_claim_id(&id)?)?;
            println!("{}", formatter.format_claim(&claim)?);
        }
        ClaimCommand::Reopen { id } => {
            let claim = engine.reopen_claim(session.actor()?, parse_claim_id(&id)?)?;
            println!("{}", formatter.format_claim(&claim)?);
        }
        ClaimCommand::Tombstone { id, yes } => {
            let claim_id = parse_claim_id(&id)?;
            let actor = session.actor()?;

            if !yes {
                print!("Tombstone claim {} and all of its evidence and reviews? [y/N] ", claim_id);
                io::stdout().flush()?;

                let mut response = String::new();
                io::stdin().read_line(&mut response)?;

                if !response.trim().eq_ignore_ascii_case("y") {
                    println!("{}", formatter.info("Operation cancelled"));
                    return Ok(());
                }
            }

            let claim = engine.tombstone_claim(actor, claim_id)?;
            if formatter.is_quiet() {
                println!("{}", claim.id);
            } else {
                println!("{}", formatter.success(&format!("Claim tombstoned: {}", claim.id)));
            }
        }
    }
    Ok(())
}

fn parse_project(input: &str) -> Result<ProjectRef> {
    ProjectRef::new(input)
        .map_err(|e| CliError::InvalidInput(format!("Invalid project '{}': {}", input, e)))
}

fn draft_from_args(args: CreateArgs) -> Result<ClaimDraft> {
    Ok(ClaimDraft {
        project: parse_project(&args.project)?,
        indicator: args.indicator,
        value: args.value,
        unit: args.unit,
        method: args.method,
        calculation: parse_json("calculation", &args.calculation)?,
        sdg_targets: args.sdg_targets.into_iter().collect(),
    })
}

fn update_from_args(args: UpdateArgs) -> Result<ClaimUpdate> {
    let calculation = args
        .calculation
        .as_deref()
        .map(|c| parse_json("calculation", c))
        .transpose()?;
    let sdg_targets = if args.sdg_targets.is_empty() {
        None
    } else {
        Some(args.sdg_targets.into_iter().collect())
    };

    Ok(ClaimUpdate {
        indicator: args.indicator,
        value: args.value,
        unit: args.unit,
        method: args.method,
        calculation,
        sdg_targets,
    })
}
