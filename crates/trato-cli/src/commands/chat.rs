//! Interactive chat session driving the full messaging engine:
//! optimistic sends, realtime push, and the catch-up poll.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use trato_core::chat::{ChatBackend, ChatClient, ChatEvent, ChatHandle};
use trato_core::models::{ConversationId, MessageKind};
use trato_core::realtime::{RealtimeTransport, WsTransport};

use crate::commands::common::{format_message_line, Context};
use crate::error::CliError;

pub async fn run(context: &Context, conversation: ConversationId) -> Result<(), CliError> {
    let transport = Arc::new(WsTransport::new(context.config.resolved_realtime_url())?);
    let mut client = ChatClient::new(
        Arc::clone(&context.api) as Arc<dyn ChatBackend>,
        transport as Arc<dyn RealtimeTransport>,
        Arc::clone(&context.session),
        context.config.clone(),
    );

    let handle = client.open(conversation).await?;
    let mut events = handle.subscribe();

    let snapshot = handle.snapshot().await?;
    let mut seen = HashSet::new();
    for message in &snapshot.messages {
        println!("{}", format_message_line(message, context.user_id));
        seen.insert(message.id);
    }
    handle.mark_read().await?;

    println!("-- connected to conversation {conversation}; /file <path> to attach, /quit to leave --");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    None => break,
                    Some(line) if line.trim() == "/quit" => break,
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) if line.trim_start().starts_with("/file ") => {
                        let path = line.trim_start().trim_start_matches("/file").trim().to_string();
                        if let Err(error) = send_file(context, handle, &path).await {
                            eprintln!("!! {error}");
                        }
                    }
                    Some(line) => {
                        if let Err(error) = handle.send_text(&line).await {
                            eprintln!("!! {error}");
                        }
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(ChatEvent::Updated(snapshot)) => {
                        for message in &snapshot.messages {
                            // Echo only what arrived from the other side; the
                            // user already sees their own input line.
                            if message.sender_id != context.user_id && seen.insert(message.id) {
                                println!("{}", format_message_line(message, context.user_id));
                            }
                        }
                    }
                    Ok(ChatEvent::SendFailed { reason, draft }) => {
                        eprintln!("!! send failed ({reason}); draft restored:");
                        eprintln!("   {draft}");
                    }
                    Err(_) => break,
                }
            }
        }
    }

    client.close();
    Ok(())
}

/// Upload a local file and send it as an image or file attachment.
async fn send_file(context: &Context, handle: &ChatHandle, path: &str) -> Result<(), CliError> {
    let bytes = tokio::fs::read(path).await?;
    let size = bytes.len() as u64;
    let name = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("adjunto")
        .to_string();
    let content_type = mime_guess::from_path(path).first_or_octet_stream().to_string();

    let url = context
        .api
        .upload_attachment(&name, &content_type, bytes)
        .await?;
    let kind = if content_type.starts_with("image/") {
        MessageKind::Image { url }
    } else {
        MessageKind::File {
            url,
            name,
            size: Some(size),
        }
    };
    handle.send_attachment(kind, None).await?;
    Ok(())
}
