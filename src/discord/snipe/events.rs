use crate::core::snipe::{Mention, SnipedMessage};
use crate::discord::Data;
use anyhow::Result;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{self as serenity, Context};

/// Remember pings so the mentioned member can look them up later.
pub async fn handle_message(_ctx: &Context, data: &Data, message: &serenity::Message) -> Result<()> {
    if message.author.bot {
        return Ok(());
    }
    let guild_id = match message.guild_id {
        Some(id) => id.get(),
        None => return Ok(()),
    };

    for user in message.mentions.iter().filter(|u| !u.bot) {
        let mention = Mention {
            guild_id,
            channel_id: message.channel_id.get(),
            message_id: message.id.get(),
            author_id: message.author.id.get(),
            author_name: message.author.name.clone(),
            mentioned_user_id: user.id.get(),
            jump_url: Mention::jump_url(guild_id, message.channel_id.get(), message.id.get()),
            mentioned_at: to_utc(&message.timestamp),
        };
        data.snipe.record_mention(mention);
    }

    Ok(())
}

pub async fn handle_message_delete(
    ctx: &Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
    guild_id: Option<serenity::GuildId>,
) -> Result<()> {
    let Some(guild) = guild_id else {
        return Ok(());
    };
    if !is_snipeable(ctx, guild, channel_id) {
        return Ok(());
    }
    let guild_id = guild.get();

    // Only messages seen while the bot was online can be sniped.
    let snapshot = ctx
        .cache
        .message(channel_id, message_id)
        .and_then(|message| {
            if message.author.bot {
                return None;
            }
            Some(snapshot(&message, guild_id))
        });

    if let Some(snapshot) = snapshot {
        if data.snipe.record_deleted(snapshot) {
            tracing::debug!(
                channel_id = channel_id.get(),
                message_id = message_id.get(),
                "Recorded deleted message"
            );
        }
    }
    Ok(())
}

pub async fn handle_message_update(
    ctx: &Context,
    data: &Data,
    old: Option<&serenity::Message>,
    new: Option<&serenity::Message>,
    event: &serenity::MessageUpdateEvent,
) -> Result<()> {
    let Some(guild) = event.guild_id else {
        return Ok(());
    };
    if !is_snipeable(ctx, guild, event.channel_id) {
        return Ok(());
    }
    let guild_id = guild.get();

    // Without the cached original there is nothing to show.
    let old_msg = match old {
        Some(m) => m,
        None => return Ok(()),
    };
    if old_msg.author.bot {
        return Ok(());
    }

    let before = snapshot(old_msg, guild_id);
    let after = match (new, &event.content) {
        (Some(new_msg), _) => snapshot(new_msg, guild_id),
        (None, Some(content)) => SnipedMessage {
            content: content.clone(),
            ..before.clone()
        },
        (None, None) => return Ok(()),
    };

    if data.snipe.record_edited(before, after) {
        tracing::debug!(
            channel_id = event.channel_id.get(),
            message_id = event.id.get(),
            "Recorded edited message"
        );
    }
    Ok(())
}

/// Text (announcement included), voice (text-in-voice) and thread channels.
/// Forum, stage and DM channels are left alone.
fn snipeable_kind(kind: serenity::ChannelType) -> bool {
    matches!(
        kind,
        serenity::ChannelType::Text
            | serenity::ChannelType::News
            | serenity::ChannelType::Voice
            | serenity::ChannelType::PublicThread
            | serenity::ChannelType::PrivateThread
            | serenity::ChannelType::NewsThread
    )
}

// A channel missing from the cache is given the benefit of the doubt.
fn is_snipeable(ctx: &Context, guild_id: serenity::GuildId, channel_id: serenity::ChannelId) -> bool {
    let kind = ctx.cache.guild(guild_id).and_then(|guild| {
        guild
            .channels
            .get(&channel_id)
            .map(|channel| channel.kind)
            .or_else(|| {
                guild
                    .threads
                    .iter()
                    .find(|thread| thread.id == channel_id)
                    .map(|thread| thread.kind)
            })
    });
    kind.map_or(true, snipeable_kind)
}

fn snapshot(message: &serenity::Message, guild_id: u64) -> SnipedMessage {
    SnipedMessage {
        message_id: message.id.get(),
        guild_id,
        channel_id: message.channel_id.get(),
        author_id: message.author.id.get(),
        author_name: message.author.name.clone(),
        avatar_url: message.author.avatar_url(),
        content: message.content.clone(),
        attachments: message.attachments.iter().map(|a| a.url.clone()).collect(),
        created_at: to_utc(&message.timestamp),
    }
}

fn to_utc(timestamp: &serenity::Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now)
}
