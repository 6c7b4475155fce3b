//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use plant_tracker::{
    models::Plant,
    notifier::Notifier,
    storage::{JsonStore, RecordStore},
    user_models::User,
    PlantError, PlantResult,
};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Records every message. Recipients in `fail_for` get an error, and
/// recipients in `hang_for` never complete.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<SentMessage>>,
    pub fail_for: HashSet<String>,
    pub hang_for: HashSet<String>,
}

impl RecordingNotifier {
    pub async fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> PlantResult<()> {
        if self.hang_for.contains(recipient) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_for.contains(recipient) {
            return Err(PlantError::Notification("mailbox unavailable".to_string()));
        }
        self.sent.lock().await.push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Wraps an in-memory store and fails plant listings for chosen owners.
pub struct FlakyStore {
    pub inner: JsonStore,
    pub broken_owners: HashSet<String>,
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn insert_plant(&self, plant: Plant) -> PlantResult<Plant> {
        self.inner.insert_plant(plant).await
    }

    async fn get_plant(&self, owner_id: &str, plant_id: &str) -> PlantResult<Option<Plant>> {
        self.inner.get_plant(owner_id, plant_id).await
    }

    async fn list_plants(&self, owner_id: &str) -> PlantResult<Vec<Plant>> {
        if self.broken_owners.contains(owner_id) {
            return Err(PlantError::Store("connection reset".to_string()));
        }
        self.inner.list_plants(owner_id).await
    }

    async fn update_plant(&self, plant: &Plant) -> PlantResult<bool> {
        self.inner.update_plant(plant).await
    }

    async fn delete_plant(&self, owner_id: &str, plant_id: &str) -> PlantResult<bool> {
        self.inner.delete_plant(owner_id, plant_id).await
    }

    async fn insert_user(&self, user: User) -> PlantResult<User> {
        self.inner.insert_user(user).await
    }

    async fn get_user_by_id(&self, user_id: &str) -> PlantResult<Option<User>> {
        self.inner.get_user_by_id(user_id).await
    }

    async fn get_user_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> PlantResult<Option<User>> {
        self.inner.get_user_by_username_or_email(username, email).await
    }

    async fn list_users(&self) -> PlantResult<Vec<User>> {
        self.inner.list_users().await
    }
}

pub async fn add_user(store: &dyn RecordStore, username: &str) -> User {
    store
        .insert_user(User::new(
            username.to_string(),
            format!("{}@example.com", username),
            "not-a-real-hash".to_string(),
        ))
        .await
        .unwrap()
}

pub async fn add_plant(store: &dyn RecordStore, owner: &User, name: &str, days: i32, last: NaiveDate) -> Plant {
    store
        .insert_plant(Plant::new(owner.id.clone(), name.to_string(), days, last))
        .await
        .unwrap()
}
