use anyhow::Context;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::error::{PlantError, PlantResult};
use crate::models::Plant;
use crate::user_models::User;

const USERS_FILE: &str = "users.json";
const PLANTS_FILE: &str = "plants.json";

/// Durable storage for users and plants.
///
/// Every plant accessor that takes an owner filters on the owner and the
/// plant id together; there is no lookup by plant id alone.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_plant(&self, plant: Plant) -> PlantResult<Plant>;

    async fn get_plant(&self, owner_id: &str, plant_id: &str) -> PlantResult<Option<Plant>>;

    /// Plants of one owner in insertion order.
    async fn list_plants(&self, owner_id: &str) -> PlantResult<Vec<Plant>>;

    /// Replaces the stored plant with the same `(owner_id, id)`.
    /// Returns `false` when no such plant exists.
    async fn update_plant(&self, plant: &Plant) -> PlantResult<bool>;

    /// Returns `false` when no such plant exists.
    async fn delete_plant(&self, owner_id: &str, plant_id: &str) -> PlantResult<bool>;

    /// Fails with `Conflict` if the username or email is taken.
    async fn insert_user(&self, user: User) -> PlantResult<User>;

    async fn get_user_by_id(&self, user_id: &str) -> PlantResult<Option<User>>;

    /// Matches `username` against usernames only and `email` against
    /// emails only. A `None` side never matches.
    async fn get_user_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> PlantResult<Option<User>>;

    async fn list_users(&self) -> PlantResult<Vec<User>>;
}

/// JSON-file backed store. The whole data set lives in memory and each
/// write rewrites the affected file.
pub struct JsonStore {
    data_dir: Option<PathBuf>,
    users: RwLock<Vec<User>>,
    plants: RwLock<Vec<Plant>>,
}

impl JsonStore {
    pub fn open(data_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let users: Vec<User> = load_file(&data_dir.join(USERS_FILE))?;
        let plants: Vec<Plant> = load_file(&data_dir.join(PLANTS_FILE))?;
        tracing::info!(
            users = users.len(),
            plants = plants.len(),
            dir = %data_dir.display(),
            "Loaded record store"
        );

        Ok(Self {
            data_dir: Some(data_dir),
            users: RwLock::new(users),
            plants: RwLock::new(plants),
        })
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            users: RwLock::new(Vec::new()),
            plants: RwLock::new(Vec::new()),
        }
    }

    fn save_to_disk<T: Serialize>(&self, file: &str, records: &[T]) -> PlantResult<()> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        let path = dir.join(file);
        let json = serde_json::to_string_pretty(records)
            .with_context(|| format!("Failed to serialize {}", file))
            .map_err(store_error)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write to {}", path.display()))
            .map_err(store_error)?;
        Ok(())
    }
}

fn load_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}

fn store_error(err: anyhow::Error) -> PlantError {
    PlantError::Store(format!("{:#}", err))
}

#[async_trait]
impl RecordStore for JsonStore {
    async fn insert_plant(&self, plant: Plant) -> PlantResult<Plant> {
        let mut plants = self.plants.write().await;
        let mut next = plants.clone();
        next.push(plant.clone());
        self.save_to_disk(PLANTS_FILE, &next)?;
        *plants = next;
        Ok(plant)
    }

    async fn get_plant(&self, owner_id: &str, plant_id: &str) -> PlantResult<Option<Plant>> {
        let plants = self.plants.read().await;
        Ok(plants
            .iter()
            .find(|p| p.id == plant_id && p.owner_id == owner_id)
            .cloned())
    }

    async fn list_plants(&self, owner_id: &str) -> PlantResult<Vec<Plant>> {
        let plants = self.plants.read().await;
        Ok(plants.iter().filter(|p| p.owner_id == owner_id).cloned().collect())
    }

    async fn update_plant(&self, plant: &Plant) -> PlantResult<bool> {
        let mut plants = self.plants.write().await;
        let Some(index) = plants
            .iter()
            .position(|p| p.id == plant.id && p.owner_id == plant.owner_id)
        else {
            return Ok(false);
        };

        let mut next = plants.clone();
        next[index] = plant.clone();
        self.save_to_disk(PLANTS_FILE, &next)?;
        *plants = next;
        Ok(true)
    }

    async fn delete_plant(&self, owner_id: &str, plant_id: &str) -> PlantResult<bool> {
        let mut plants = self.plants.write().await;
        let mut next = plants.clone();
        next.retain(|p| !(p.id == plant_id && p.owner_id == owner_id));
        if next.len() == plants.len() {
            return Ok(false);
        }
        self.save_to_disk(PLANTS_FILE, &next)?;
        *plants = next;
        Ok(true)
    }

    async fn insert_user(&self, user: User) -> PlantResult<User> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.username == user.username) {
            return Err(PlantError::Conflict("Username already exists".to_string()));
        }
        if users.iter().any(|u| u.email == user.email) {
            return Err(PlantError::Conflict("Email already registered".to_string()));
        }

        let mut next = users.clone();
        next.push(user.clone());
        self.save_to_disk(USERS_FILE, &next)?;
        *users = next;
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: &str) -> PlantResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn get_user_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> PlantResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| username.is_some_and(|n| u.username == n) || email.is_some_and(|e| u.email == e))
            .cloned())
    }

    async fn list_users(&self) -> PlantResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.clone())
    }
}
