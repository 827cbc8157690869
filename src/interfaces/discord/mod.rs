mod handlers;
mod reminders;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::Client;
use serenity::all::{Context, EventHandler, GatewayIntents, Message, Ready};
use tracing::{error, info};

use crate::core::answer::AnswerClient;
use crate::core::commands;
use crate::core::config::Config;
use crate::core::confirm::ConfirmationTracker;
use crate::core::store::ActivityStore;

const GENERIC_FAILURE_REPLY: &str = "Something went wrong while processing your command.";

/// Shared handles for every command invocation and the reminder loop.
pub struct BotContext {
    pub store: ActivityStore,
    pub answers: AnswerClient,
    pub confirmations: ConfirmationTracker,
}

struct Handler {
    bot: Arc<BotContext>,
    scheduler_started: AtomicBool,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.name);

        // ready fires again on reconnect; the reminder loop starts at most once.
        if !self.scheduler_started.swap(true, Ordering::SeqCst) {
            reminders::spawn(self.bot.clone(), ctx.http.clone());
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let content = msg.content.trim();
        if content.is_empty() {
            return;
        }

        // An open clear dialogue consumes this user's confirm/cancel answers
        // before command parsing sees them.
        let user_id = msg.author.id.get();
        let channel_id = msg.channel_id.get();
        if self
            .bot
            .confirmations
            .try_resolve(user_id, channel_id, content)
            .await
        {
            return;
        }

        let Some(invocation) = commands::parse_invocation(content) else {
            return;
        };
        // Unknown command names are ignored silently.
        let Some(spec) = commands::resolve(invocation.name) else {
            return;
        };
        let args = match spec.parse_args(invocation.arg_text) {
            Ok(args) => args,
            Err(usage) => {
                reply(&ctx, &msg, &usage.to_string()).await;
                return;
            }
        };

        info!("Received ~{} from {}", spec.name, msg.author.name);

        // Each invocation is an isolated failure domain: an error is logged
        // and answered, never propagated into the event loop.
        if let Err(e) = handlers::dispatch(&self.bot, &ctx, &msg, spec.command, args).await {
            error!("Command ~{} failed: {:#}", spec.name, e);
            reply(&ctx, &msg, GENERIC_FAILURE_REPLY).await;
        }
    }
}

pub(super) async fn reply(ctx: &Context, msg: &Message, text: &str) {
    if let Err(e) = msg.channel_id.say(&ctx.http, text).await {
        error!("Failed to send reply: {}", e);
    }
}

pub async fn run(config: Config) -> Result<()> {
    let store = ActivityStore::connect(&config.mongodb_uri).await?;
    let answers = AnswerClient::new(config.openai_api_key, config.openai_model)
        .context("failed to build answer client")?;

    let bot = Arc::new(BotContext {
        store,
        answers,
        confirmations: ConfirmationTracker::new(),
    });

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(Handler {
            bot,
            scheduler_started: AtomicBool::new(false),
        })
        .await
        .context("failed to create Discord client")?;

    client.start().await.context("Discord client error")?;
    Ok(())
}
