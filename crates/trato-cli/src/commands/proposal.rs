use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use trato_core::models::{
    ConversationId, ExchangeId, ExchangeStatus, MeetingDetails, ProposalDraft, ProposalId,
    ValidationInput,
};
use trato_core::proposals::{MessageSink, NegotiationBackend, ProposalEngine};

use crate::cli::ProposalCommands;
use crate::commands::common::{format_proposal_line, Context};
use crate::error::CliError;

fn engine(context: &Context) -> ProposalEngine {
    ProposalEngine::new(
        Arc::clone(&context.api) as Arc<dyn NegotiationBackend>,
        Arc::clone(&context.api) as Arc<dyn MessageSink>,
        Arc::clone(&context.session),
    )
}

pub async fn run(context: &Context, command: ProposalCommands) -> Result<(), CliError> {
    match command {
        ProposalCommands::List { conversation, json } => {
            run_list(context, ConversationId(conversation), json).await
        }
        ProposalCommands::Create {
            conversation,
            kind,
            description,
            price,
            conditions,
        } => {
            let draft = ProposalDraft {
                kind: kind.into_kind(),
                description,
                proposed_price: price,
                conditions,
                meeting: None,
            };
            run_create(context, ConversationId(conversation), draft).await
        }
        ProposalCommands::Accept {
            conversation,
            proposal,
            date,
            time,
            place,
            notes,
        } => {
            let meeting = parse_meeting(&date, time.as_deref(), place, notes)?;
            run_accept(
                context,
                ConversationId(conversation),
                ProposalId(proposal),
                meeting,
            )
            .await
        }
        ProposalCommands::Reject {
            conversation,
            proposal,
            reason,
        } => {
            let update = engine(context)
                .reject(ConversationId(conversation), ProposalId(proposal), reason)
                .await?;
            println!("{}", format_proposal_line(&update.proposal));
            Ok(())
        }
        ProposalCommands::Counter {
            conversation,
            proposal,
            kind,
            description,
            price,
            conditions,
        } => {
            let draft = ProposalDraft {
                kind: kind.into_kind(),
                description,
                proposed_price: price,
                conditions,
                meeting: None,
            };
            let update = engine(context)
                .counter(ConversationId(conversation), ProposalId(proposal), draft)
                .await?;
            println!("Superseded: {}", format_proposal_line(&update.superseded));
            println!("New offer:  {}", format_proposal_line(&update.proposal));
            Ok(())
        }
        ProposalCommands::Cancel {
            conversation,
            proposal,
        } => {
            let cancelled = engine(context)
                .cancel(ConversationId(conversation), ProposalId(proposal))
                .await?;
            println!("{}", format_proposal_line(&cancelled));
            Ok(())
        }
    }
}

pub async fn run_validate(
    context: &Context,
    exchange: i64,
    ok: bool,
    failed: bool,
    comment: Option<String>,
    rating: Option<u8>,
) -> Result<(), CliError> {
    if ok == failed {
        return Err(CliError::InvalidInput(
            "pass exactly one of --ok or --failed".to_string(),
        ));
    }
    let input = ValidationInput {
        is_successful: ok,
        comment,
        rating,
        aspects: None,
    };
    let outcome = engine(context).validate(ExchangeId(exchange), input).await?;
    if outcome.is_repeat() {
        println!("You had already validated this exchange; nothing changed.");
    }
    match outcome.exchange().status {
        ExchangeStatus::PendingValidation => {
            println!("Validation recorded; waiting for the other party.");
        }
        ExchangeStatus::Completed => println!("Exchange completed. Deal closed!"),
        ExchangeStatus::Failed => {
            println!("Exchange failed; the listing is available again.");
        }
    }
    Ok(())
}

async fn run_list(
    context: &Context,
    conversation: ConversationId,
    as_json: bool,
) -> Result<(), CliError> {
    let proposals = engine(context).list(conversation).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&proposals)?);
        return Ok(());
    }

    let thread = context.api.fetch_conversation(conversation).await?;
    let role = trato_core::resolve_role(
        context.user_id,
        trato_core::roles::ExchangeParticipants {
            proposer_id: thread.buyer_id,
            receiver_id: thread.seller_id,
        },
    );
    match role {
        Some(role) => println!("Your side: {}", role.label()),
        None => println!("You are not a participant in this conversation"),
    }

    if proposals.is_empty() {
        println!("No proposals on conversation {conversation}");
    } else {
        for proposal in &proposals {
            println!("{}", format_proposal_line(proposal));
        }
    }
    Ok(())
}

async fn run_create(
    context: &Context,
    conversation: ConversationId,
    draft: ProposalDraft,
) -> Result<(), CliError> {
    let thread = context.api.fetch_conversation(conversation).await?;
    let proposal = engine(context).create(&thread, draft).await?;
    println!("{}", format_proposal_line(&proposal));
    Ok(())
}

async fn run_accept(
    context: &Context,
    conversation: ConversationId,
    proposal: ProposalId,
    meeting: MeetingDetails,
) -> Result<(), CliError> {
    let update = engine(context)
        .accept(conversation, proposal, Some(meeting))
        .await?;
    println!("{}", format_proposal_line(&update.proposal));
    if let Some(exchange) = update.exchange {
        println!(
            "Exchange {} opened; both parties must validate after the meeting.",
            exchange.id
        );
    }
    Ok(())
}

fn parse_meeting(
    date: &str,
    time: Option<&str>,
    place: String,
    notes: Option<String>,
) -> Result<MeetingDetails, CliError> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidInput(format!("invalid --date {date:?}, expected YYYY-MM-DD")))?;
    let time = time
        .map(|raw| {
            NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
                CliError::InvalidInput(format!("invalid --time {raw:?}, expected HH:MM"))
            })
        })
        .transpose()?;
    Ok(MeetingDetails {
        date,
        time,
        place,
        notes,
    })
}
