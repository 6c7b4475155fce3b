use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{PlantError, PlantResult};
use crate::storage::RecordStore;
use crate::user_models::User;

const MIN_PASSWORD_LEN: usize = 6;

pub fn validate_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    regex.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration and password checks over the store's user records.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn RecordStore>,
    hash_cost: u32,
}

impl AccountService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_hash_cost(store, bcrypt::DEFAULT_COST)
    }

    pub fn with_hash_cost(store: Arc<dyn RecordStore>, hash_cost: u32) -> Self {
        Self { store, hash_cost }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> PlantResult<User> {
        let username = username.trim();
        let email = normalize_email(email);

        if username.is_empty() {
            return Err(PlantError::Validation("Username cannot be empty".to_string()));
        }
        // Logins containing '@' are treated as email addresses.
        if username.contains('@') {
            return Err(PlantError::Validation("Username cannot contain '@'".to_string()));
        }
        if !validate_email(&email) {
            return Err(PlantError::Validation("Invalid email address".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(PlantError::Validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LEN
            )));
        }

        if let Some(existing) = self
            .store
            .get_user_by_username_or_email(Some(username), Some(&email))
            .await?
        {
            let msg = if existing.username == username {
                "Username already exists"
            } else {
                "Email already registered"
            };
            return Err(PlantError::Conflict(msg.to_string()));
        }

        let password_hash = bcrypt::hash(password, self.hash_cost)
            .map_err(|e| PlantError::Store(format!("Failed to hash password: {}", e)))?;

        let user = self
            .store
            .insert_user(User::new(username.to_string(), email, password_hash))
            .await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// `login` is looked up as an email address if it contains '@' and as a
    /// username otherwise.
    pub async fn authenticate(&self, login: &str, password: &str) -> PlantResult<User> {
        let login = login.trim();
        let found = if login.contains('@') {
            let email = normalize_email(login);
            self.store.get_user_by_username_or_email(None, Some(&email)).await?
        } else {
            self.store.get_user_by_username_or_email(Some(login), None).await?
        };
        let user = found.ok_or(PlantError::InvalidCredentials)?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|e| PlantError::Store(format!("Failed to verify password: {}", e)))?;
        if !valid {
            return Err(PlantError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> PlantResult<User> {
        self.store
            .get_user_by_id(user_id)
            .await?
            .ok_or(PlantError::NotFound("User"))
    }
}

/// Bearer tokens issued at login, valid for the life of the process.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, user_id: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(token.clone(), user_id.to_string());
        token
    }

    pub async fn resolve(&self, token: &str) -> Option<String> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}
