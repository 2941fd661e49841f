//! Shared context and formatting helpers for CLI commands.

use std::sync::Arc;

use trato_core::api::ApiClient;
use trato_core::config::ClientConfig;
use trato_core::models::{Message, Proposal, UserId};
use trato_core::session::{Session, SessionProvider, StaticSessionProvider};

use crate::error::CliError;
use crate::profiles::CliProfile;

/// Everything a remote-calling command needs, built from the active profile
pub struct Context {
    pub config: ClientConfig,
    pub session: Arc<dyn SessionProvider>,
    pub api: Arc<ApiClient>,
    pub user_id: UserId,
}

pub fn build_context(profile: &CliProfile) -> Result<Context, CliError> {
    let api_base = profile.api_base_url().ok_or_else(|| {
        CliError::Config(
            "profile has no API endpoint; run `trato config init --api-url <url>` first"
                .to_string(),
        )
    })?;
    let mut config = ClientConfig::new(api_base)?;
    config.realtime_url = profile.realtime_url();
    config.validate()?;

    let user_id = profile.user_id.map(UserId).ok_or(CliError::NotSignedIn)?;
    let token = profile.access_token().ok_or(CliError::NotSignedIn)?;
    let session: Arc<dyn SessionProvider> =
        Arc::new(StaticSessionProvider::new(Session::new(user_id, token)));
    let api = Arc::new(ApiClient::new(&config, Arc::clone(&session))?);

    Ok(Context {
        config,
        session,
        api,
        user_id,
    })
}

pub fn format_message_line(message: &Message, me: UserId) -> String {
    let who = if message.sender_id == me {
        "yo".to_string()
    } else {
        format!("user {}", message.sender_id)
    };
    let body = message.content.as_deref().map_or_else(
        || format!("[{}]", message.kind.label()),
        ToString::to_string,
    );
    let marker = if message.is_pending() { " (sending)" } else { "" };
    format!(
        "[{}] {who}: {body}{marker}",
        message.sent_at.format("%Y-%m-%d %H:%M")
    )
}

pub fn format_proposal_line(proposal: &Proposal) -> String {
    let mut line = format!(
        "#{} [{}] {} - {}",
        proposal.id,
        proposal.status.label(),
        proposal.kind.label(),
        proposal.description
    );
    if let Some(price) = proposal.proposed_price {
        line.push_str(&format!(" ({price})"));
    }
    if let Some(meeting) = &proposal.meeting {
        line.push_str(&format!(" @ {} {}", meeting.wire_date(), meeting.place));
    }
    line
}
