use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "trato")]
#[command(about = "Negotiate marketplace deals from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name for endpoint/identity configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure the active profile's endpoints
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Store the signed-in identity for the active profile
    Login {
        /// Your marketplace user id
        #[arg(long, value_name = "ID")]
        user_id: i64,
        /// Bearer token issued by the identity provider
        #[arg(long, value_name = "TOKEN")]
        token: String,
    },
    /// Forget the stored identity for the active profile
    Logout,
    /// Show the active profile and sign-in state
    Status,
    /// List your negotiation threads
    Conversations {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open an interactive chat on one conversation
    Chat {
        /// Conversation id
        conversation: i64,
    },
    /// Manage proposals on a conversation
    Proposal {
        #[command(subcommand)]
        command: ProposalCommands,
    },
    /// Validate an exchange after the agreed meeting
    Validate {
        /// Exchange id
        exchange: i64,
        /// The exchange went through
        #[arg(long, conflicts_with = "failed")]
        ok: bool,
        /// The exchange did not happen
        #[arg(long)]
        failed: bool,
        /// Free-form comment
        #[arg(long)]
        comment: Option<String>,
        /// 1-5 rating of the counterpart
        #[arg(long)]
        rating: Option<u8>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize the profile with endpoint URLs
    Init {
        /// Base URL of the marketplace API
        #[arg(long, value_name = "URL")]
        api_url: String,
        /// WebSocket endpoint for realtime delivery (derived when omitted)
        #[arg(long, value_name = "URL")]
        realtime_url: Option<String>,
    },
    /// Print the stored profile configuration
    Show,
    /// Make this profile the default
    Use,
}

#[derive(Subcommand)]
pub enum ProposalCommands {
    /// List proposals on a conversation
    List {
        /// Conversation id
        conversation: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Open a new proposal (buyer side)
    Create {
        /// Conversation id
        conversation: i64,
        /// Proposal kind
        #[arg(long, value_enum, default_value_t = ProposalKindArg::Price)]
        kind: ProposalKindArg,
        /// What you are offering
        #[arg(long)]
        description: String,
        /// Offered price, for price proposals
        #[arg(long)]
        price: Option<f64>,
        /// Extra conditions
        #[arg(long)]
        conditions: Option<String>,
    },
    /// Accept a pending proposal (seller side)
    Accept {
        /// Conversation id
        conversation: i64,
        /// Proposal id
        proposal: i64,
        /// Meeting date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        date: String,
        /// Meeting time (HH:MM)
        #[arg(long, value_name = "TIME")]
        time: Option<String>,
        /// Meeting place
        #[arg(long)]
        place: String,
        /// Free-form notes for the acceptance message
        #[arg(long)]
        notes: Option<String>,
    },
    /// Reject a pending proposal (seller side)
    Reject {
        /// Conversation id
        conversation: i64,
        /// Proposal id
        proposal: i64,
        /// Optional rejection reason
        #[arg(long)]
        reason: Option<String>,
    },
    /// Counter a pending proposal with new terms
    Counter {
        /// Conversation id
        conversation: i64,
        /// Proposal id to supersede
        proposal: i64,
        /// Proposal kind
        #[arg(long, value_enum, default_value_t = ProposalKindArg::Price)]
        kind: ProposalKindArg,
        /// The counter-offer terms
        #[arg(long)]
        description: String,
        /// Offered price, for price proposals
        #[arg(long)]
        price: Option<f64>,
        /// Extra conditions
        #[arg(long)]
        conditions: Option<String>,
    },
    /// Withdraw your own pending proposal
    Cancel {
        /// Conversation id
        conversation: i64,
        /// Proposal id
        proposal: i64,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProposalKindArg {
    Price,
    Exchange,
    Meeting,
    Terms,
    Other,
}

impl ProposalKindArg {
    pub const fn into_kind(self) -> trato_core::models::ProposalKind {
        use trato_core::models::ProposalKind;
        match self {
            Self::Price => ProposalKind::Price,
            Self::Exchange => ProposalKind::Exchange,
            Self::Meeting => ProposalKind::Meeting,
            Self::Terms => ProposalKind::Terms,
            Self::Other => ProposalKind::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
