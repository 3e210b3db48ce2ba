//! CLI command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};
use ratchet_domain::{Decision, EvidenceKind, ReviewKind};

/// Ratchet CLI - Progressive assurance for impact claims.
#[derive(Debug, Parser)]
#[command(name = "ratchet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Database file, overriding the config
    #[arg(long, global = true, env = "RATCHET_DB")]
    pub db: Option<String>,

    /// Actor recorded on mutations (e.g. user:alice)
    #[arg(short, long, global = true, env = "RATCHET_ACTOR")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create, inspect and move claims through the lifecycle
    #[command(subcommand)]
    Claim(ClaimCommand),

    /// Attach, list and verify evidence
    #[command(subcommand)]
    Evidence(EvidenceCommand),

    /// Assign reviews and record decisions
    #[command(subcommand)]
    Review(ReviewCommand),

    /// Verify and inspect the audit ledger
    #[command(subcommand)]
    Ledger(LedgerCommand),

    /// Build the evidence graph of a project
    Graph(GraphArgs),
}

/// Claim commands.
#[derive(Debug, Subcommand)]
pub enum ClaimCommand {
    /// Create a draft claim
    Create(CreateArgs),

    /// Show a claim
    Get {
        /// Claim ID
        id: String,
    },

    /// List the claims of a project
    List {
        /// Project reference
        project: String,

        /// Include tombstoned claims
        #[arg(long)]
        all: bool,
    },

    /// Edit a draft claim
    Update(UpdateArgs),

    /// Submit a draft claim for review
    Submit {
        /// Claim ID
        id: String,
    },

    /// Reopen a rejected claim (administrators only)
    Reopen {
        /// Claim ID
        id: String,
    },

    /// Tombstone a claim and everything it owns (administrators only)
    Tombstone {
        /// Claim ID
        id: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Arguments for claim creation.
#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Project reference (e.g. project:riverbank)
    #[arg(short, long)]
    pub project: String,

    /// Indicator measured
    #[arg(short, long)]
    pub indicator: String,

    /// Measured value
    #[arg(short, long, allow_negative_numbers = true)]
    pub value: f64,

    /// Unit of the value
    #[arg(short, long)]
    pub unit: String,

    /// Measurement method
    #[arg(short, long)]
    pub method: String,

    /// Calculation payload as JSON
    #[arg(long, default_value = "{}")]
    pub calculation: String,

    /// SDG target (repeatable, e.g. --sdg 6.3)
    #[arg(long = "sdg")]
    pub sdg_targets: Vec<String>,
}

/// Arguments for claim updates.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Claim ID
    pub id: String,

    /// New indicator
    #[arg(short, long)]
    pub indicator: Option<String>,

    /// New value
    #[arg(short, long, allow_negative_numbers = true)]
    pub value: Option<f64>,

    /// New unit
    #[arg(short, long)]
    pub unit: Option<String>,

    /// New method
    #[arg(short, long)]
    pub method: Option<String>,

    /// New calculation payload as JSON
    #[arg(long)]
    pub calculation: Option<String>,

    /// Replace the SDG targets (repeatable)
    #[arg(long = "sdg")]
    pub sdg_targets: Vec<String>,
}

/// Evidence commands.
#[derive(Debug, Subcommand)]
pub enum EvidenceCommand {
    /// Attach evidence to a claim
    Attach(AttachArgs),

    /// List the evidence of a claim
    List {
        /// Claim ID
        claim: String,
    },

    /// Re-read evidence content and check it against its digest
    Verify {
        /// Evidence ID
        id: String,
    },
}

/// Arguments for evidence attachment.
#[derive(Debug, Args)]
pub struct AttachArgs {
    /// Claim ID
    pub claim: String,

    /// Kind of evidence
    #[arg(short, long, value_enum)]
    pub kind: EvidenceKindArg,

    /// Source descriptor; a local path or file:// URI is read for hashing
    #[arg(short, long)]
    pub source: String,

    /// Pre-computed SHA-256 digest (hex) instead of reading the source
    #[arg(long)]
    pub digest: Option<String>,

    /// Metadata as a JSON object
    #[arg(long, default_value = "{}")]
    pub metadata: String,
}

/// Review commands.
#[derive(Debug, Subcommand)]
pub enum ReviewCommand {
    /// Assign a reviewer to a claim
    Assign {
        /// Claim ID
        claim: String,

        /// Reviewer actor reference
        #[arg(short, long)]
        reviewer: String,

        /// Kind of review
        #[arg(short, long, value_enum, default_value = "peer")]
        kind: ReviewKindArg,
    },

    /// Record a reviewer's decision
    Decide {
        /// Review ID
        review: String,

        /// Decision
        #[arg(short, long, value_enum)]
        decision: DecisionArg,

        /// Score (0-10)
        #[arg(short, long)]
        score: u8,

        /// Comment
        #[arg(long)]
        comment: Option<String>,
    },

    /// List the reviews of a claim
    List {
        /// Claim ID
        claim: String,
    },
}

/// Ledger commands.
#[derive(Debug, Subcommand)]
pub enum LedgerCommand {
    /// Recompute the hash chain
    Verify {
        /// First sequence number (defaults to 1)
        #[arg(long)]
        from: Option<u64>,

        /// Last sequence number (defaults to the head)
        #[arg(long)]
        to: Option<u64>,
    },

    /// Show the audit history of an entity
    History {
        /// Claim, evidence or review ID
        entity: String,
    },

    /// Find entities written without a ledger entry
    Audit {
        /// Record reconciliation entries for every finding
        #[arg(long)]
        reconcile: bool,
    },
}

/// Arguments for the graph command.
#[derive(Debug, Args)]
pub struct GraphArgs {
    /// Project reference
    pub project: String,

    /// Include ledger entries as audit nodes
    #[arg(long)]
    pub provenance: bool,

    /// Include tombstoned claims
    #[arg(long)]
    pub all: bool,
}

/// Evidence kind argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum EvidenceKindArg {
    /// Report, certificate, contract
    Document,
    /// Dataset or measurement export
    Data,
    /// Photograph or scan
    Image,
    /// Video recording
    Video,
}

/// Review kind argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ReviewKindArg {
    /// Peer practitioner
    Peer,
    /// Subject-matter expert
    Expert,
    /// Independent third party
    ThirdParty,
}

/// Decision argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum DecisionArg {
    /// Accept the claim
    Approved,
    /// Refuse the claim
    Rejected,
    /// Accept subject to remediation evidence
    Conditional,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<EvidenceKindArg> for EvidenceKind {
    fn from(kind: EvidenceKindArg) -> Self {
        match kind {
            EvidenceKindArg::Document => EvidenceKind::Document,
            EvidenceKindArg::Data => EvidenceKind::Data,
            EvidenceKindArg::Image => EvidenceKind::Image,
            EvidenceKindArg::Video => EvidenceKind::Video,
        }
    }
}

impl From<ReviewKindArg> for ReviewKind {
    fn from(kind: ReviewKindArg) -> Self {
        match kind {
            ReviewKindArg::Peer => ReviewKind::Peer,
            ReviewKindArg::Expert => ReviewKind::Expert,
            ReviewKindArg::ThirdParty => ReviewKind::ThirdParty,
        }
    }
}

impl From<DecisionArg> for Decision {
    fn from(decision: DecisionArg) -> Self {
        match decision {
            DecisionArg::Approved => Decision::Approved,
            DecisionArg::Rejected => Decision::Rejected,
            DecisionArg::Conditional => Decision::Conditional,
        }
    }
}
