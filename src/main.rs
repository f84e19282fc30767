use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use jukebox::commands::music::utils::{
    announcer::{EventBridge, HttpAnnouncer},
    event_handlers::{self, run_event_pump},
    music_manager::{EngineSettings, MusicManager},
};
use jukebox::config::BotConfig;
use jukebox::{Data, Error, events};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jukebox=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    // Panics inside spawned tasks are logged and the bot keeps serving
    std::panic::set_hook(Box::new(|info| error!("Panic: {}", info)));

    let config = BotConfig::from_env()?;
    info!("Loaded configuration: {:?}", config);

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let songbird = Songbird::serenity();
    let (events_tx, events_rx) = event_handlers::channel();
    let engine = MusicManager::new(
        songbird.clone(),
        reqwest::Client::new(),
        events_tx,
        EngineSettings::from(&config),
    );

    let token = config.token.clone();
    let empty_channel_policy = config.empty_channel_policy;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(events::on_error(error)),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: None,
                mention_as_prefix: false,
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, _framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);

                let bridge = EventBridge::new(HttpAnnouncer::new(ctx.http.clone()), empty_channel_policy);
                tokio::spawn(run_event_pump(events_rx, Arc::new(bridge)));

                Ok(Data {
                    config,
                    engine: Arc::new(engine),
                })
            })
        })
        .build();

    let mut client = ClientBuilder::new(token, intents)
        .framework(framework)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.map_err(Into::into)
}
