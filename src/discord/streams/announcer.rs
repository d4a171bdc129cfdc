use crate::core::streams::{Stream, StreamAnnouncement};
use poise::serenity_prelude as serenity;

const ANNOUNCEMENT_HEADER: &str = "Some new streams have started:";
/// Links per message, so the post stays readable.
const STREAMS_PER_MESSAGE: usize = 10;

/// Post newly started streams to their channels. Failures are logged per
/// message and never stop the rest from going out.
pub async fn send_announcements(http: &serenity::Http, announcements: Vec<StreamAnnouncement>) {
    for (channel_id, streams) in group_by_channel(announcements) {
        let channel = serenity::ChannelId::new(channel_id);
        for content in build_messages(&streams) {
            if let Err(err) = channel
                .send_message(http, serenity::CreateMessage::new().content(content))
                .await
            {
                tracing::warn!(
                    channel_id,
                    error = %err,
                    "Failed to send stream announcement"
                );
            }
        }
    }
}

/// Groups announcements per channel, keeping first-seen channel order and
/// the stream order inside each channel.
fn group_by_channel(announcements: Vec<StreamAnnouncement>) -> Vec<(u64, Vec<Stream>)> {
    let mut grouped: Vec<(u64, Vec<Stream>)> = Vec::new();
    for announcement in announcements {
        match grouped
            .iter_mut()
            .find(|(channel_id, _)| *channel_id == announcement.channel_id)
        {
            Some((_, streams)) => streams.push(announcement.stream),
            None => grouped.push((announcement.channel_id, vec![announcement.stream])),
        }
    }
    grouped
}

fn build_messages(streams: &[Stream]) -> Vec<String> {
    streams
        .chunks(STREAMS_PER_MESSAGE)
        .map(|chunk| {
            let links: Vec<String> = chunk.iter().map(Stream::url).collect();
            format!("{}\n{}", ANNOUNCEMENT_HEADER, links.join("\n"))
        })
        .collect()
}
