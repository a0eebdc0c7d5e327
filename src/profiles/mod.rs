//! # Commander Profiles
//!
//! Wallet-keyed player profiles with a score leaderboard. Backed by a
//! hosted PostgREST table in production and an in-memory map otherwise.

pub mod postgrest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::MemeError;

pub use postgrest::PostgrestStore;

/// Rank given to every new profile.
pub const STARTING_RANK: &str = "Recruit";
/// Leaderboard size when the caller does not ask for one.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommanderProfile {
    pub id: Uuid,
    pub wallet_address: String,
    #[serde(default)]
    pub commander_name: Option<String>,
    pub rank: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub missions_completed: Option<u32>,
    #[serde(default)]
    pub total_score: Option<u64>,
}

/// Partial update. Identity and timestamps are not writable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commander_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missions_completed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<u64>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &ProfileUpdate::default()
    }
}

/// Leaderboard order: highest score first, missions break ties. Missing
/// values sort after every recorded one.
pub fn leaderboard_order(a: &CommanderProfile, b: &CommanderProfile) -> std::cmp::Ordering {
    // `None < Some(_)`, so descending puts missing values last.
    b.total_score
        .cmp(&a.total_score)
        .then_with(|| b.missions_completed.cmp(&a.missions_completed))
}

fn validate_name(name: &str) -> Result<&str, MemeError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MemeError::validation("Commander name is required"));
    }
    Ok(name)
}

/// Persistence for commander profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn exists(&self, wallet: &str) -> Result<bool, MemeError>;

    /// Create a profile. Fails if the wallet already has one or the name is
    /// taken.
    async fn create(&self, wallet: &str, commander_name: &str) -> Result<CommanderProfile, MemeError>;

    async fn get(&self, wallet: &str) -> Result<Option<CommanderProfile>, MemeError>;

    async fn update(&self, wallet: &str, update: ProfileUpdate) -> Result<CommanderProfile, MemeError>;

    async fn delete(&self, wallet: &str) -> Result<(), MemeError>;

    async fn is_name_available(&self, commander_name: &str) -> Result<bool, MemeError>;

    async fn leaderboard(&self, limit: usize) -> Result<Vec<CommanderProfile>, MemeError>;
}

/// Profiles kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<String, CommanderProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_taken(profiles: &HashMap<String, CommanderProfile>, name: &str, except_wallet: Option<&str>) -> bool {
    profiles.values().any(|p| {
        p.commander_name.as_deref() == Some(name) && Some(p.wallet_address.as_str()) != except_wallet
    })
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn exists(&self, wallet: &str) -> Result<bool, MemeError> {
        Ok(self.profiles.read().await.contains_key(wallet))
    }

    async fn create(&self, wallet: &str, commander_name: &str) -> Result<CommanderProfile, MemeError> {
        let name = validate_name(commander_name)?;
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(wallet) {
            return Err(MemeError::validation("A profile already exists for this wallet"));
        }
        if name_taken(&profiles, name, None) {
            return Err(MemeError::validation("Commander name is already taken"));
        }
        let now = Utc::now();
        let profile = CommanderProfile {
            id: Uuid::new_v4(),
            wallet_address: wallet.to_string(),
            commander_name: Some(name.to_string()),
            rank: STARTING_RANK.to_string(),
            created_at: now,
            updated_at: now,
            missions_completed: Some(0),
            total_score: Some(0),
        };
        profiles.insert(wallet.to_string(), profile.clone());
        Ok(profile)
    }

    async fn get(&self, wallet: &str) -> Result<Option<CommanderProfile>, MemeError> {
        Ok(self.profiles.read().await.get(wallet).cloned())
    }

    async fn update(&self, wallet: &str, update: ProfileUpdate) -> Result<CommanderProfile, MemeError> {
        let mut profiles = self.profiles.write().await;
        if let Some(name) = update.commander_name.as_deref() {
            let name = validate_name(name)?;
            if name_taken(&profiles, name, Some(wallet)) {
                return Err(MemeError::validation("Commander name is already taken"));
            }
        }
        let profile = profiles
            .get_mut(wallet)
            .ok_or_else(|| MemeError::NotFound(format!("profile for wallet {}", wallet)))?;
        if let Some(name) = update.commander_name {
            profile.commander_name = Some(name.trim().to_string());
        }
        if let Some(rank) = update.rank {
            profile.rank = rank;
        }
        if let Some(missions) = update.missions_completed {
            profile.missions_completed = Some(missions);
        }
        if let Some(score) = update.total_score {
            profile.total_score = Some(score);
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn delete(&self, wallet: &str) -> Result<(), MemeError> {
        self.profiles.write().await.remove(wallet);
        Ok(())
    }

    async fn is_name_available(&self, commander_name: &str) -> Result<bool, MemeError> {
        let profiles = self.profiles.read().await;
        Ok(!name_taken(&profiles, commander_name.trim(), None))
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<CommanderProfile>, MemeError> {
        let mut all: Vec<CommanderProfile> = self.profiles.read().await.values().cloned().collect();
        all.sort_by(leaderboard_order);
        all.truncate(limit);
        Ok(all)
    }
}
