//! Evidence command implementation.

use super::{parse_claim_id, parse_evidence_id, parse_json, Session};
use crate::cli::{AttachArgs, EvidenceCommand};
use crate::error::Result;
use crate::output::Formatter;
use ratchet_domain::traits::ContentSource;
use ratchet_domain::EvidenceContent;
use std::fs;
use std::path::PathBuf;

/// Reads evidence content from the local filesystem
///
/// Source descriptors are plain paths or `file://` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl FileSource {
    fn resolve(source: &str) -> PathBuf {
        PathBuf::from(source.strip_prefix("file://").unwrap_or(source))
    }
}

impl ContentSource for FileSource {
    type Error = std::io::Error;

    fn fetch(&self, source: &str) -> std::result::Result<Vec<u8>, Self::Error> {
        fs::read(Self::resolve(source))
    }
}

/// Execute an evidence command.
pub fn execute_evidence(
    command: EvidenceCommand,
    session: &Session,
    formatter: &Formatter,
) -> Result<()> {
    let engine = &session.engine;
    match command {
        EvidenceCommand::Attach(args) => {
            let claim_id = parse_claim_id(&args.claim)?;
            let metadata = parse_json("metadata", &args.metadata)?;
            let content = content_from_args(&args)?;
            let evidence = engine.attach_evidence(
                session.actor()?,
                claim_id,
                args.kind.into(),
                args.source,
                content,
                metadata,
            )?;
            println!("{}", formatter.format_evidence(&[evidence])?);
        }
        EvidenceCommand::List { claim } => {
            let evidence = engine.evidence_for_claim(parse_claim_id(&claim)?)?;
            println!("{}", formatter.format_evidence(&evidence)?);
        }
        EvidenceCommand::Verify { id } => {
            let (evidence, content) =
                engine.retrieve_evidence(parse_evidence_id(&id)?, &FileSource)?;
            if formatter.is_quiet() {
                println!("{}", evidence.id);
            } else {
                println!(
                    "{}",
                    formatter.success(&format!(
                        "Evidence {} matches its digest ({} bytes)",
                        evidence.id,
                        content.len()
                    ))
                );
            }
        }
    }
    Ok(())
}

fn content_from_args(args: &AttachArgs) -> Result<EvidenceContent> {
    match &args.digest {
        Some(hex) => Ok(EvidenceContent::PrecomputedDigest(hex.clone())),
        None => Ok(EvidenceContent::Bytes(FileSource.fetch(&args.source)?)),
    }
}
