use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};

pub const CONFIRMATION_WINDOW: Duration = Duration::from_secs(30);

/// Terminal outcome of one clear sub-dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Confirmed,
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DialogueKey {
    user_id: u64,
    channel_id: u64,
}

struct Waiter {
    generation: u64,
    sender: oneshot::Sender<ClearOutcome>,
}

/// Handle held by the invocation that opened the dialogue.
pub struct PendingConfirmation {
    key: DialogueKey,
    generation: u64,
    receiver: oneshot::Receiver<ClearOutcome>,
}

#[derive(Default)]
struct TrackerInner {
    waiters: HashMap<DialogueKey, Waiter>,
    next_generation: u64,
}

/// Short-lived confirm/cancel dialogues, keyed by (user, channel). Messages
/// from other users or channels, or with any other content, never resolve a
/// dialogue and never reset its window.
#[derive(Default)]
pub struct ConfirmationTracker {
    inner: Mutex<TrackerInner>,
}

impl ConfirmationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for the next qualifying message from this user in
    /// this channel. An earlier waiter for the same pair is superseded and
    /// resolves as Cancelled.
    pub async fn begin(&self, user_id: u64, channel_id: u64) -> PendingConfirmation {
        let key = DialogueKey {
            user_id,
            channel_id,
        };
        let (sender, receiver) = oneshot::channel();
        let mut inner = self.inner.lock().await;
        inner.next_generation += 1;
        let generation = inner.next_generation;
        if let Some(old) = inner.waiters.insert(key, Waiter { generation, sender }) {
            let _ = old.sender.send(ClearOutcome::Cancelled);
        }
        PendingConfirmation {
            key,
            generation,
            receiver,
        }
    }

    /// Routes an inbound message to its dialogue, if one is open. Returns
    /// true when the message was consumed as a confirmation answer.
    pub async fn try_resolve(&self, user_id: u64, channel_id: u64, content: &str) -> bool {
        let outcome = match content.trim().to_lowercase().as_str() {
            "confirm" => ClearOutcome::Confirmed,
            "cancel" => ClearOutcome::Cancelled,
            _ => return false,
        };
        let key = DialogueKey {
            user_id,
            channel_id,
        };
        let waiter = self.inner.lock().await.waiters.remove(&key);
        match waiter {
            Some(w) => {
                let _ = w.sender.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Waits for the dialogue to resolve, timing out after `window`. On
    /// expiry the waiter is deregistered; the generation check keeps a
    /// superseding dialogue's waiter intact.
    pub async fn await_outcome(
        &self,
        pending: PendingConfirmation,
        window: Duration,
    ) -> ClearOutcome {
        match tokio::time::timeout(window, pending.receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => ClearOutcome::Cancelled,
            Err(_) => {
                let mut inner = self.inner.lock().await;
                if inner
                    .waiters
                    .get(&pending.key)
                    .is_some_and(|w| w.generation == pending.generation)
                {
                    inner.waiters.remove(&pending.key);
                }
                ClearOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: u64 = 11;
    const CHANNEL: u64 = 22;
    const WINDOW: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn confirm_resolves_the_dialogue() {
        let tracker = ConfirmationTracker::new();
        let pending = tracker.begin(USER, CHANNEL).await;
        assert!(tracker.try_resolve(USER, CHANNEL, "confirm").await);
        assert_eq!(
            tracker.await_outcome(pending, WINDOW).await,
            ClearOutcome::Confirmed
        );
    }

    #[tokio::test]
    async fn cancel_resolves_the_dialogue() {
        let tracker = ConfirmationTracker::new();
        let pending = tracker.begin(USER, CHANNEL).await;
        assert!(tracker.try_resolve(USER, CHANNEL, "cancel").await);
        assert_eq!(
            tracker.await_outcome(pending, WINDOW).await,
            ClearOutcome::Cancelled
        );
    }

    #[tokio::test]
    async fn answers_are_case_insensitive_and_trimmed() {
        let tracker = ConfirmationTracker::new();
        let pending = tracker.begin(USER, CHANNEL).await;
        assert!(tracker.try_resolve(USER, CHANNEL, "  CONFIRM ").await);
        assert_eq!(
            tracker.await_outcome(pending, WINDOW).await,
            ClearOutcome::Confirmed
        );
    }

    #[tokio::test]
    async fn other_users_channels_and_content_do_not_count() {
        let tracker = ConfirmationTracker::new();
        let pending = tracker.begin(USER, CHANNEL).await;

        assert!(!tracker.try_resolve(USER + 1, CHANNEL, "confirm").await);
        assert!(!tracker.try_resolve(USER, CHANNEL + 1, "confirm").await);
        assert!(!tracker.try_resolve(USER, CHANNEL, "yes please").await);
        assert!(!tracker.try_resolve(USER, CHANNEL, "confirm it").await);

        // The dialogue is still open afterwards.
        assert!(tracker.try_resolve(USER, CHANNEL, "cancel").await);
        assert_eq!(
            tracker.await_outcome(pending, WINDOW).await,
            ClearOutcome::Cancelled
        );
    }

    #[tokio::test]
    async fn answer_without_open_dialogue_is_not_consumed() {
        let tracker = ConfirmationTracker::new();
        assert!(!tracker.try_resolve(USER, CHANNEL, "confirm").await);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_deregisters_the_waiter() {
        let tracker = ConfirmationTracker::new();
        let pending = tracker.begin(USER, CHANNEL).await;
        assert_eq!(
            tracker.await_outcome(pending, WINDOW).await,
            ClearOutcome::TimedOut
        );
        // A late answer finds nothing to resolve.
        assert!(!tracker.try_resolve(USER, CHANNEL, "confirm").await);
    }

    #[tokio::test]
    async fn second_dialogue_supersedes_and_cancels_the_first() {
        let tracker = ConfirmationTracker::new();
        let first = tracker.begin(USER, CHANNEL).await;
        let second = tracker.begin(USER, CHANNEL).await;

        assert_eq!(
            tracker.await_outcome(first, WINDOW).await,
            ClearOutcome::Cancelled
        );
        assert!(tracker.try_resolve(USER, CHANNEL, "confirm").await);
        assert_eq!(
            tracker.await_outcome(second, WINDOW).await,
            ClearOutcome::Confirmed
        );
    }

    #[tokio::test]
    async fn dead_invocation_does_not_block_a_new_dialogue() {
        let tracker = ConfirmationTracker::new();
        let first = tracker.begin(USER, CHANNEL).await;
        drop(first);

        let second = tracker.begin(USER, CHANNEL).await;
        assert!(tracker.try_resolve(USER, CHANNEL, "confirm").await);
        assert_eq!(
            tracker.await_outcome(second, WINDOW).await,
            ClearOutcome::Confirmed
        );
    }

    #[tokio::test]
    async fn dialogues_in_different_channels_are_independent() {
        let tracker = ConfirmationTracker::new();
        let here = tracker.begin(USER, CHANNEL).await;
        let there = tracker.begin(USER, CHANNEL + 1).await;

        assert!(tracker.try_resolve(USER, CHANNEL, "confirm").await);
        assert!(tracker.try_resolve(USER, CHANNEL + 1, "cancel").await);
        assert_eq!(
            tracker.await_outcome(here, WINDOW).await,
            ClearOutcome::Confirmed
        );
        assert_eq!(
            tracker.await_outcome(there, WINDOW).await,
            ClearOutcome::Cancelled
        );
    }
}
