//! Support conversation commands.
//!
//! REST surface only: open, read and close conversations. Live messaging
//! runs over a separate transport and is not part of this client.

use pawmart_core::ConversationId;

use super::{CliError, Context};

/// Open a new support conversation.
pub async fn start() -> Result<(), CliError> {
    let ctx = Context::load()?;
    let conversation = ctx.client.start_conversation().await?;

    println!(
        "Conversation #{} opened ({}, priority {}).",
        conversation.id, conversation.status, conversation.priority
    );
    Ok(())
}

/// Show a conversation and its transcript.
pub async fn show(id: i64) -> Result<(), CliError> {
    let ctx = Context::load()?;
    let conversation = ctx.client.get_conversation(ConversationId::new(id)).await?;

    println!(
        "Conversation #{} - {} (priority {}, opened {})",
        conversation.id,
        conversation.status,
        conversation.priority,
        conversation.created_at.format("%Y-%m-%d %H:%M")
    );

    if conversation.messages.is_empty() {
        println!("No messages yet.");
        return Ok(());
    }

    for message in &conversation.messages {
        let who = if message.is_from_agent { "agent" } else { "you" };
        println!(
            "[{}] {}: {}",
            message.created_at.format("%H:%M"),
            who,
            message.content
        );
    }
    Ok(())
}

/// Close a conversation.
pub async fn close(id: i64) -> Result<(), CliError> {
    let ctx = Context::load()?;
    ctx.client.close_conversation(ConversationId::new(id)).await?;
    println!("Conversation #{id} closed.");
    Ok(())
}
