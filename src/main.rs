// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (Twitch HTTP API)
// - `discord/` = Discord-specific adapters (events, announcements)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register event handlers and background pollers

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use stream_snipe_bot::config::{Settings, TwitchCredentials};
use stream_snipe_bot::core::snipe::SnipeService;
use stream_snipe_bot::core::streams::{GameMemo, QuotaTracker, StreamFetcher, StreamMonitor};
use stream_snipe_bot::discord::announcer::send_announcements;
use stream_snipe_bot::discord::events as snipe_events;
use stream_snipe_bot::discord::{Data, Error};
use stream_snipe_bot::infra::twitch::TwitchApiClient;

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = snipe_events::handle_message(ctx, data, new_message).await {
                tracing::error!("Error recording mentions: {}", e);
            }
        }
        serenity::FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            guild_id,
        } => {
            if let Err(e) = snipe_events::handle_message_delete(
                ctx,
                data,
                *channel_id,
                *deleted_message_id,
                *guild_id,
            )
            .await
            {
                tracing::error!("Error handling message delete: {}", e);
            }
        }
        serenity::FullEvent::MessageUpdate {
            old_if_available,
            new,
            event,
        } => {
            if let Err(e) = snipe_events::handle_message_update(
                ctx,
                data,
                old_if_available.as_ref(),
                new.as_ref(),
                event,
            )
            .await
            {
                tracing::error!("Error handling message update: {}", e);
            }
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let settings = Settings::from_env()
        .expect("Invalid configuration! Check your .env file (DISCORD_TOKEN, TWITCH_CLIENT_ID, ...).");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let twitch_client = match &settings.twitch_credentials {
        TwitchCredentials::AccessToken(token) => {
            TwitchApiClient::new(&settings.twitch_client_id, token)
                .expect("Failed to create Twitch API client")
        }
        TwitchCredentials::ClientSecret(secret) => {
            let client = TwitchApiClient::with_app_credentials(&settings.twitch_client_id, secret)
                .expect("Failed to create Twitch API client");
            // Fail fast on bad credentials; later renewals happen on demand.
            client
                .renew_token()
                .await
                .expect("Failed to obtain a Twitch app access token");
            client
        }
    };

    // One tracker per quota bucket. Every Helix call shares it.
    let quota = Arc::new(QuotaTracker::new());
    let fetcher = Arc::new(StreamFetcher::new(
        twitch_client,
        Arc::clone(&quota),
        settings.fetch.clone(),
    ));
    let games = Arc::new(GameMemo::new(Arc::clone(&fetcher)));
    let stream_monitor = Arc::new(StreamMonitor::new(games, fetcher));

    let snipe_service = Arc::new(SnipeService::new(settings.snipe_capacity));

    let data = Data {
        snipe: Arc::clone(&snipe_service),
        streams: Arc::clone(&stream_monitor),
        stream_alerts: Arc::new(settings.stream_alerts.clone()),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS;

    let poll_interval = settings.poll_interval;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, _framework| {
            Box::pin(async move {
                tracing::info!("Bot is ready");

                // Background stream poller. The first pass only records a baseline.
                if data.stream_alerts.is_empty() {
                    tracing::info!("No STREAM_ALERTS configured, stream poller disabled");
                } else {
                    let monitor = Arc::clone(&data.streams);
                    let alerts = Arc::clone(&data.stream_alerts);
                    let http = ctx.http.clone();
                    tokio::spawn(async move {
                        loop {
                            tracing::debug!("Starting background stream poll...");
                            let announcements = monitor.poll(&alerts).await;
                            if !announcements.is_empty() {
                                tracing::info!("Found {} new streams", announcements.len());
                                send_announcements(&http, announcements).await;
                            }

                            tokio::time::sleep(poll_interval).await;
                        }
                    });
                }

                Ok(data)
            })
        })
        .build();

    // Snipes come from the message cache, so keep plenty of it.
    let mut cache_settings = serenity::cache::Settings::default();
    cache_settings.max_messages = 10000;

    let mut client = serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .cache_settings(cache_settings)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
