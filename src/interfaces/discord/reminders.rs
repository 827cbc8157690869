use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serenity::all::{CreateMessage, Http, UserId};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::BotContext;

const REMINDER_PERIOD: Duration = Duration::from_secs(86_400);

/// Spawns the daily reminder loop. The first tick fires immediately; each
/// tick is awaited to completion, so ticks never overlap.
pub(super) fn spawn(bot: Arc<BotContext>, http: Arc<Http>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REMINDER_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Reminder loop started (period {:?})", REMINDER_PERIOD);

        loop {
            interval.tick().await;
            if let Err(e) = tick(&bot, &http).await {
                error!("Reminder tick failed: {:#}", e);
            }
        }
    });
}

async fn tick(bot: &BotContext, http: &Arc<Http>) -> Result<()> {
    let user_ids = bot.store.users_with_pending().await?;
    debug!("Reminder tick: {} user(s) with pending tasks", user_ids.len());

    for user_id in user_ids {
        let user = match http.get_user(UserId::new(user_id as u64)).await {
            Ok(user) => user,
            // Users who left or cannot be resolved are skipped silently.
            Err(_) => continue,
        };

        let pending = bot.store.list(user_id, false).await?;
        if pending.is_empty() {
            continue;
        }

        let descriptions: Vec<&str> = pending.iter().map(|a| a.activity.as_str()).collect();
        let text = format_reminder(&descriptions);
        if let Err(e) = user
            .direct_message(http, CreateMessage::new().content(text))
            .await
        {
            error!("Failed to DM reminder to {}: {}", user_id, e);
        }
    }
    Ok(())
}

fn format_reminder(descriptions: &[&str]) -> String {
    format!(
        "Reminder: You have pending tasks: {}",
        descriptions.join(", ")
    )
}
