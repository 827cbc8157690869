use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serenity::all::{Context, Message, UserId};

use super::{BotContext, reply};
use crate::core::commands::{Args, Command};
use crate::core::confirm::{CONFIRMATION_WINDOW, ClearOutcome};
use crate::core::store::Activity;

const DATE_FORMAT: &str = "%Y-%m-%d";
const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const ANSWER_MAX_TOKENS: u32 = 500;
const UNKNOWN_USER: &str = "Unknown User";

const CLEAR_WARNING: &str = "**⚠️ Warning: This action will fully clear all your activities, both pending and completed.**\n\
This will also reset your position on the leaderboard, and **this action cannot be undone.**\n\
If you're sure you want to proceed, type `confirm` to continue, or `cancel` to stop.";

const HELP_TEXT: &str = "**📋 Available Commands:**\n\
\n\
**Activities Management:**\n\
- `~addactivity <YYYY-MM-DD> <Activity Description>`\n\
  ➡️ *Add a new activity with a specific due date.* Example: `~addactivity 2024-10-01 Finish report.`\n\
- `~complete <Activity Description>`\n\
  ➡️ *Mark an activity as completed.* Example: `~complete Finish report.`\n\
- `~viewactive`\n\
  ➡️ *View all your current pending activities.*\n\
- `~viewcompleted`\n\
  ➡️ *View all your completed activities.*\n\
- `~clear`\n\
  ➡️ *Clear all your activities (both pending and completed). This will also reset your leaderboard progress.*\n\
  **⚠️ Warning:** You will be asked to confirm this action, as it cannot be undone.\n\
\n\
**Fun and AI Features:**\n\
- `~ask <Your Question>`\n\
  ➡️ *Ask any question and get an AI-generated response powered by OpenAI.* Example: `~ask What is the meaning of life?`\n\
\n\
**Leaderboard:**\n\
- `~leaderboard`\n\
  ➡️ *View the leaderboard of users with the most completed activities.*\n\
\n\
**Bot Assistance:**\n\
- `~help`\n\
  ➡️ *Show this help message.*\n\
\n\
**Command Usage Quick Reference:**\n\
- To add an activity: `~addactivity 2024-10-01 Finish report.`\n\
- To mark an activity as complete: `~complete Finish report.`\n\
- To view your pending tasks: `~viewactive`\n\
- To view your completed tasks: `~viewcompleted`\n\
- To clear all tasks: `~clear`\n\
- To ask an AI question: `~ask What's the weather like today?`\n\
- To see the leaderboard: `~leaderboard`\n\
- To see this help message: `~help`";

pub(super) async fn dispatch(
    bot: &BotContext,
    ctx: &Context,
    msg: &Message,
    command: Command,
    args: Args,
) -> Result<()> {
    match command {
        Command::AddActivity => add_activity(bot, ctx, msg, args).await,
        Command::Complete => complete(bot, ctx, msg, args).await,
        Command::Clear => clear(bot, ctx, msg).await,
        Command::ViewActive => view(bot, ctx, msg, false).await,
        Command::ViewCompleted => view(bot, ctx, msg, true).await,
        Command::Leaderboard => leaderboard(bot, ctx, msg).await,
        Command::Ask => ask(bot, ctx, msg, args).await,
        Command::Help => {
            reply(ctx, msg, HELP_TEXT).await;
            Ok(())
        }
    }
}

fn author_id(msg: &Message) -> i64 {
    msg.author.id.get() as i64
}

/// Accepts exactly YYYY-MM-DD, normalized to midnight UTC.
fn parse_due_date(date_str: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).ok()?;
    Some(date.and_time(NaiveTime::MIN).and_utc())
}

async fn add_activity(bot: &BotContext, ctx: &Context, msg: &Message, args: Args) -> Result<()> {
    let date_str = &args.fixed[0];
    let description = args.trailing.unwrap_or_default();

    let Some(due_date) = parse_due_date(date_str) else {
        reply(ctx, msg, "Error: Date format should be YYYY-MM-DD.").await;
        return Ok(());
    };

    bot.store
        .add(Activity {
            user_id: author_id(msg),
            activity: description.clone(),
            completed: false,
            due_date,
        })
        .await?;

    reply(
        ctx,
        msg,
        &format!(
            "Activity \"{}\" added successfully with due date {}!",
            description,
            due_date.format(DATE_FORMAT)
        ),
    )
    .await;
    Ok(())
}

async fn complete(bot: &BotContext, ctx: &Context, msg: &Message, args: Args) -> Result<()> {
    let description = args.trailing.unwrap_or_default();

    let text = if bot.store.mark_completed(author_id(msg), &description).await? {
        format!("Activity \"{}\" marked as completed!", description)
    } else {
        format!(
            "Error: Activity \"{}\" not found or already completed.",
            description
        )
    };
    reply(ctx, msg, &text).await;
    Ok(())
}

async fn clear(bot: &BotContext, ctx: &Context, msg: &Message) -> Result<()> {
    let user_id = msg.author.id.get();
    let channel_id = msg.channel_id.get();

    // Register the waiter before the warning goes out so an immediate answer
    // cannot slip past it.
    let pending = bot.confirmations.begin(user_id, channel_id).await;
    reply(ctx, msg, CLEAR_WARNING).await;

    match bot
        .confirmations
        .await_outcome(pending, CONFIRMATION_WINDOW)
        .await
    {
        ClearOutcome::Confirmed => {
            bot.store.clear_user(author_id(msg)).await?;
            reply(
                ctx,
                msg,
                "✅ All your activities have been fully cleared, and your leaderboard progress has been reset.",
            )
            .await;
        }
        ClearOutcome::Cancelled => {
            reply(ctx, msg, "❌ Activity clearing has been canceled.").await;
        }
        ClearOutcome::TimedOut => {
            reply(
                ctx,
                msg,
                "⏳ Time out! Activity clearing request has been canceled.",
            )
            .await;
        }
    }
    Ok(())
}

async fn view(bot: &BotContext, ctx: &Context, msg: &Message, completed: bool) -> Result<()> {
    let items = bot.store.list(author_id(msg), completed).await?;
    reply(ctx, msg, &render_view(&items, completed)).await;
    Ok(())
}

fn render_view(items: &[Activity], completed: bool) -> String {
    if items.is_empty() {
        return if completed {
            "No completed activities found."
        } else {
            "No pending activities found."
        }
        .to_string();
    }

    let header = if completed {
        "**Your Completed Activities:**"
    } else {
        "**Your Pending Activities:**"
    };
    let label = if completed { "Completed on" } else { "Due on" };

    let lines: Vec<String> = items
        .iter()
        .map(|a| {
            format!(
                "• {} - {} {}",
                a.activity,
                label,
                a.due_date.format(DATE_FORMAT)
            )
        })
        .collect();
    format!("{}\n{}", header, lines.join("\n"))
}

async fn leaderboard(bot: &BotContext, ctx: &Context, msg: &Message) -> Result<()> {
    let entries = bot.store.leaderboard().await?;

    let mut named = Vec::with_capacity(entries.len());
    for entry in entries {
        named.push((lookup_display_name(ctx, entry.user_id).await, entry.count));
    }

    reply(ctx, msg, &render_leaderboard(&named)).await;
    Ok(())
}

async fn lookup_display_name(ctx: &Context, user_id: i64) -> String {
    match ctx.http.get_user(UserId::new(user_id as u64)).await {
        Ok(user) => user.name,
        Err(_) => UNKNOWN_USER.to_string(),
    }
}

fn render_leaderboard(entries: &[(String, i64)]) -> String {
    let mut out = String::from("Leaderboard:\n");
    for (index, (name, count)) in entries.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} - {} activities completed\n",
            index + 1,
            name,
            count
        ));
    }
    out
}

async fn ask(bot: &BotContext, ctx: &Context, msg: &Message, args: Args) -> Result<()> {
    let question = args.trailing.unwrap_or_default();

    let text = match bot
        .answers
        .complete(SYSTEM_PROMPT, &question, ANSWER_MAX_TOKENS)
        .await
    {
        Ok(answer) => answer,
        Err(e) => format!("An error occurred: {}", e),
    };
    reply(ctx, msg, &text).await;
    Ok(())
}
