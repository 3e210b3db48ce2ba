//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use ratchet_assurance::{DecisionOutcome, EvidenceGraph};
use ratchet_domain::{AssuranceState, Claim, Evidence, Review, Tier};
use ratchet_ledger::{ChainReport, LedgerEntry};
use ratchet_store::UnauditedEntity;
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format claims output.
    pub fn format_claims(&self, claims: &[Claim]) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(claims),
            OutputFormat::Quiet => Ok(ids(claims.iter().map(|c| c.id.to_string()))),
            OutputFormat::Table => {
                if claims.is_empty() {
                    return Ok(self.colorize("No claims found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["ID", "Indicator", "Value", "State", "Tier", "Round"]);
                for claim in claims {
                    builder.push_record([
                        short_id(&claim.id.to_string()),
                        claim.indicator.clone(),
                        format!("{} {}", claim.value, claim.unit),
                        self.state(claim.state),
                        self.tier(claim.tier()),
                        claim.review_round.to_string(),
                    ]);
                }
                Ok(render(builder))
            }
        }
    }

    /// Format a single claim.
    pub fn format_claim(&self, claim: &Claim) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(claim),
            OutputFormat::Quiet => Ok(claim.id.to_string()),
            OutputFormat::Table => {
                let sdg = claim
                    .sdg_targets
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                builder.push_record(["ID".to_string(), claim.id.to_string()]);
                builder.push_record(["Project".to_string(), claim.project.to_string()]);
                builder.push_record(["Indicator".to_string(), claim.indicator.clone()]);
                builder.push_record([
                    "Value".to_string(),
                    format!("{} {}", claim.value, claim.unit),
                ]);
                builder.push_record(["Method".to_string(), claim.method.clone()]);
                builder.push_record(["SDG targets".to_string(), sdg]);
                builder.push_record(["State".to_string(), self.state(claim.state)]);
                builder.push_record(["Tier".to_string(), self.tier(claim.tier())]);
                builder.push_record(["Round".to_string(), claim.review_round.to_string()]);
                builder.push_record(["Calculation".to_string(), claim.calculation.to_string()]);
                Ok(render(builder))
            }
        }
    }

    /// Format evidence output.
    pub fn format_evidence(&self, evidence: &[Evidence]) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(evidence),
            OutputFormat::Quiet => Ok(ids(evidence.iter().map(|e| e.id.to_string()))),
            OutputFormat::Table => {
                if evidence.is_empty() {
                    return Ok(self.colorize("No evidence found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["ID", "Kind", "Source", "Digest"]);
                for item in evidence {
                    let digest = item.digest.to_hex();
                    builder.push_record([
                        short_id(&item.id.to_string()),
                        item.kind.as_str().to_string(),
                        item.source.clone(),
                        digest[..16].to_string(),
                    ]);
                }
                Ok(render(builder))
            }
        }
    }

    /// Format reviews output.
    pub fn format_reviews(&self, reviews: &[Review]) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(reviews),
            OutputFormat::Quiet => Ok(ids(reviews.iter().map(|r| r.id.to_string()))),
            OutputFormat::Table => {
                if reviews.is_empty() {
                    return Ok(self.colorize("No reviews found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["ID", "Reviewer", "Kind", "Decision", "Score", "Round"]);
                for review in reviews {
                    builder.push_record([
                        short_id(&review.id.to_string()),
                        review.reviewer.to_string(),
                        review.kind.as_str().to_string(),
                        review.decision.as_str().to_string(),
                        review
                            .score
                            .map(|s| s.value().to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        review.round.to_string(),
                    ]);
                }
                Ok(render(builder))
            }
        }
    }

    /// Format the outcome of a recorded decision.
    pub fn format_outcome(&self, outcome: &DecisionOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(&serde_json::json!({
                "review": outcome.review,
                "claim": outcome.claim,
                "verdict": outcome.verdict,
                "state_changed": outcome.transition.is_some_and(|t| t.is_change()),
            })),
            OutputFormat::Quiet => Ok(outcome.claim.state.to_string()),
            OutputFormat::Table => {
                let message = format!(
                    "Decision recorded: {} -> claim {} is {} ({})",
                    outcome.review.decision.as_str(),
                    short_id(&outcome.claim.id.to_string()),
                    outcome.claim.state,
                    outcome.claim.tier().as_str(),
                );
                Ok(self.success(&message))
            }
        }
    }

    /// Format ledger entries.
    pub fn format_entries(&self, entries: &[LedgerEntry]) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(entries),
            OutputFormat::Quiet => Ok(ids(entries.iter().map(|e| e.seq.to_string()))),
            OutputFormat::Table => {
                if entries.is_empty() {
                    return Ok(self.colorize("No ledger entries found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Seq", "Action", "Entity", "Actor", "Timestamp"]);
                for entry in entries {
                    builder.push_record([
                        entry.seq.to_string(),
                        entry.action.as_str().to_string(),
                        format!(
                            "{}:{}",
                            entry.entity.kind.as_str(),
                            short_id(&entry.entity.id)
                        ),
                        entry.actor.to_string(),
                        entry.timestamp.to_string(),
                    ]);
                }
                Ok(render(builder))
            }
        }
    }

    /// Format a chain verification report.
    pub fn format_report(&self, report: &ChainReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(report),
            OutputFormat::Quiet => Ok(if report.is_intact() {
                "intact".to_string()
            } else {
                "diverged".to_string()
            }),
            OutputFormat::Table => match &report.divergence {
                None => Ok(self.success(&format!(
                    "Ledger intact: {} entries verified ({}..{})",
                    report.verified, report.from_seq, report.to_seq
                ))),
                Some(divergence) => Ok(self.error(&format!(
                    "Ledger diverges at seq {} ({:?}); {} entries verified before it",
                    divergence.seq, divergence.kind, report.verified
                ))),
            },
        }
    }

    /// Format entities missing from the ledger.
    pub fn format_unaudited(&self, findings: &[UnauditedEntity]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let rows: Vec<_> = findings
                    .iter()
                    .map(|f| {
                        serde_json::json!({
                            "entity": f.entity,
                            "claim_id": f.claim_id.to_string(),
                        })
                    })
                    .collect();
                json(&rows)
            }
            OutputFormat::Quiet => Ok(ids(findings.iter().map(|f| f.entity.id.clone()))),
            OutputFormat::Table => {
                if findings.is_empty() {
                    return Ok(self.success("Every entity has a ledger entry"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Kind", "Entity", "Claim"]);
                for finding in findings {
                    builder.push_record([
                        finding.entity.kind.as_str().to_string(),
                        finding.entity.id.clone(),
                        finding.claim_id.to_string(),
                    ]);
                }
                Ok(format!(
                    "{}\n{}",
                    self.warning(&format!("{} unaudited entit(ies)", findings.len())),
                    render(builder)
                ))
            }
        }
    }

    /// Format an evidence graph.
    pub fn format_graph(&self, graph: &EvidenceGraph) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(graph),
            OutputFormat::Quiet => Ok(ids(graph.nodes.iter().map(|n| n.id.clone()))),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Source", "Relation", "Target"]);
                for edge in &graph.edges {
                    let relation = serde_json::to_value(&edge.kind)?
                        .get("relation")
                        .and_then(|r| r.as_str())
                        .unwrap_or_default()
                        .to_string();
                    builder.push_record([short_id(&edge.source), relation, short_id(&edge.target)]);
                }
                let summary = format!(
                    "{}: {} nodes, {} edges in {} ms",
                    graph.project, graph.stats.node_count, graph.stats.edge_count,
                    graph.stats.elapsed_ms
                );
                let summary = if graph.stats.over_budget {
                    self.warning(&format!("{} (over budget)", summary))
                } else {
                    self.info(&summary)
                };
                Ok(format!("{}\n{}", summary, render(builder)))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Whether the formatter only prints identifiers.
    pub fn is_quiet(&self) -> bool {
        self.format == OutputFormat::Quiet
    }

    fn state(&self, state: AssuranceState) -> String {
        let color = match state {
            AssuranceState::Rejected => "red",
            AssuranceState::ConditionallyApproved => "yellow",
            AssuranceState::PeerApproved | AssuranceState::ThirdPartyVerified => "green",
            _ => "cyan",
        };
        self.colorize(&state.to_string(), color)
    }

    fn tier(&self, tier: Tier) -> String {
        let color = match tier {
            Tier::SelfDeclared => "yellow",
            Tier::PeerReviewed => "blue",
            Tier::Verified => "green",
        };
        self.colorize(tier.as_str(), color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn ids(values: impl Iterator<Item = String>) -> String {
    values.collect::<Vec<_>>().join("\n")
}

fn render(builder: Builder) -> String {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

/// Truncate an identifier for table display
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_domain::{ClaimDraft, ProjectRef};
    use serde_json::json;

    fn create_test_claim() -> Claim {
        Claim::new(
            ClaimDraft {
                project: ProjectRef::new("project:riverbank").unwrap(),
                indicator: "litres treated".to_string(),
                value: 1200.0,
                unit: "L".to_string(),
                method: "flow meter".to_string(),
                calculation: json!({"readings": 30}),
                sdg_targets: ["6.3".to_string()].into_iter().collect(),
            },
            1_700_000_000_000,
        )
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_claims(&[create_test_claim()]).unwrap();
        assert!(output.contains("indicator"));
        assert!(output.contains("litres treated"));
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let claim = create_test_claim();
        let output = formatter.format_claims(&[claim.clone()]).unwrap();
        assert_eq!(output, claim.id.to_string());
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_claims(&[create_test_claim()]).unwrap();
        assert!(output.contains("Indicator"));
        assert!(output.contains("1200 L"));
        assert!(output.contains("self"));
    }

    #[test]
    fn test_empty_claims() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_claims(&[]).unwrap();
        assert!(output.contains("No claims found"));
    }

    #[test]
    fn test_intact_report() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let report = ChainReport {
            from_seq: 1,
            to_seq: 4,
            verified: 4,
            divergence: None,
        };
        let output = formatter.format_report(&report).unwrap();
        assert_eq!(output, "✓ Ledger intact: 4 entries verified (1..4)");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
        assert_eq!(formatter.warning("test"), "⚠ test");
    }
}
