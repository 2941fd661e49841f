use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run(context: &Context, as_json: bool) -> Result<(), CliError> {
    let conversations = context.api.list_conversations().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!("No conversations yet");
        return Ok(());
    }

    for conversation in conversations {
        let counterpart = conversation
            .counterpart(context.user_id)
            .map_or_else(|| "?".to_string(), |user| user.to_string());
        let preview = conversation.last_message.as_deref().unwrap_or("(empty)");
        let unread = if conversation.unread_count > 0 {
            format!(" [{} unread]", conversation.unread_count)
        } else {
            String::new()
        };
        println!(
            "#{} with user {counterpart}{unread}: {preview}",
            conversation.id
        );
    }
    Ok(())
}
