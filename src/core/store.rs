use anyhow::{Context, Result};
use bson::{Document, doc};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

const DATABASE: &str = "reminders";
const COLLECTION: &str = "activities";
const LEADERBOARD_SIZE: i64 = 10;

/// One tracked task. Field names match the persisted document schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub user_id: i64,
    pub activity: String,
    pub completed: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
}

/// Completed-count ranking row, computed by aggregation at query time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "_id")]
    pub user_id: i64,
    pub count: i64,
}

/// Typed wrapper over the `activities` collection. Holds no business logic
/// and no cached state; the driver's connection pool is safe to share.
#[derive(Clone)]
pub struct ActivityStore {
    activities: Collection<Activity>,
}

impl ActivityStore {
    pub async fn connect(uri: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .context("failed to connect to MongoDB")?;
        Ok(Self {
            activities: client.database(DATABASE).collection(COLLECTION),
        })
    }

    pub async fn add(&self, activity: Activity) -> Result<()> {
        self.activities
            .insert_one(activity)
            .await
            .context("failed to insert activity")?;
        Ok(())
    }

    /// Flips the first pending match to completed. Returns false when no
    /// pending activity with this description exists for the user.
    pub async fn mark_completed(&self, user_id: i64, description: &str) -> Result<bool> {
        let result = self
            .activities
            .update_one(
                pending_activity_filter(user_id, description),
                doc! { "$set": { "completed": true } },
            )
            .await
            .context("failed to update activity")?;
        Ok(result.modified_count > 0)
    }

    /// Deletes every document owned by the user, pending and completed, in
    /// one bulk call.
    pub async fn clear_user(&self, user_id: i64) -> Result<u64> {
        let result = self
            .activities
            .delete_many(doc! { "user_id": user_id })
            .await
            .context("failed to clear activities")?;
        Ok(result.deleted_count)
    }

    pub async fn list(&self, user_id: i64, completed: bool) -> Result<Vec<Activity>> {
        let cursor = self
            .activities
            .find(user_filter(user_id, completed))
            .sort(view_sort())
            .await
            .context("failed to query activities")?;
        cursor
            .try_collect()
            .await
            .context("failed to read activity cursor")
    }

    pub async fn users_with_pending(&self) -> Result<Vec<i64>> {
        let values = self
            .activities
            .distinct("user_id", doc! { "completed": false })
            .await
            .context("failed to query users with pending activities")?;
        Ok(values
            .into_iter()
            .filter_map(|v| v.as_i64().or_else(|| v.as_i32().map(i64::from)))
            .collect())
    }

    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let cursor = self
            .activities
            .aggregate(leaderboard_pipeline(LEADERBOARD_SIZE))
            .await
            .context("failed to run leaderboard aggregation")?;
        cursor
            .with_type::<LeaderboardEntry>()
            .try_collect()
            .await
            .context("failed to read leaderboard cursor")
    }
}

fn user_filter(user_id: i64, completed: bool) -> Document {
    doc! { "user_id": user_id, "completed": completed }
}

fn pending_activity_filter(user_id: i64, description: &str) -> Document {
    doc! { "user_id": user_id, "activity": description, "completed": false }
}

// Deterministic view order: due date ascending, then description.
fn view_sort() -> Document {
    doc! { "due_date": 1, "activity": 1 }
}

fn leaderboard_pipeline(limit: i64) -> Vec<Document> {
    vec![
        doc! { "$match": { "completed": true } },
        doc! { "$group": { "_id": "$user_id", "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1, "_id": 1 } },
        doc! { "$limit": limit },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn pending_filter_only_matches_open_activities() {
        let filter = pending_activity_filter(42, "Finish report");
        assert_eq!(
            filter,
            doc! { "user_id": 42i64, "activity": "Finish report", "completed": false }
        );
    }

    #[test]
    fn view_filter_partitions_by_user_and_state() {
        assert_eq!(
            user_filter(7, true),
            doc! { "user_id": 7i64, "completed": true }
        );
        assert_eq!(
            user_filter(7, false),
            doc! { "user_id": 7i64, "completed": false }
        );
    }

    #[test]
    fn leaderboard_pipeline_counts_completed_descending_top_ten() {
        let pipeline = leaderboard_pipeline(10);
        assert_eq!(pipeline.len(), 4);
        assert_eq!(pipeline[0], doc! { "$match": { "completed": true } });
        assert_eq!(
            pipeline[1],
            doc! { "$group": { "_id": "$user_id", "count": { "$sum": 1 } } }
        );
        assert_eq!(pipeline[2], doc! { "$sort": { "count": -1, "_id": 1 } });
        assert_eq!(pipeline[3], doc! { "$limit": 10i64 });
    }

    #[test]
    fn activity_serializes_due_date_as_bson_datetime() {
        let due = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        let activity = Activity {
            user_id: 1,
            activity: "Finish report".to_string(),
            completed: false,
            due_date: due,
        };

        let document = bson::to_document(&activity).unwrap();
        assert_eq!(
            document.get_datetime("due_date").unwrap().to_chrono(),
            due
        );
        assert_eq!(document.get_str("activity").unwrap(), "Finish report");
        assert!(!document.get_bool("completed").unwrap());
    }

    #[test]
    fn leaderboard_entry_deserializes_from_group_output() {
        let entry: LeaderboardEntry =
            bson::from_document(doc! { "_id": 99i64, "count": 3i32 }).unwrap();
        assert_eq!(
            entry,
            LeaderboardEntry {
                user_id: 99,
                count: 3
            }
        );
    }
}
