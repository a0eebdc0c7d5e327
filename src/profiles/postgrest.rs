//! PostgREST-backed [`ProfileStore`] (the hosted `commander_profiles` table).

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{CommanderProfile, ProfileStore, ProfileUpdate, STARTING_RANK};
use crate::error::MemeError;

const TABLE: &str = "commander_profiles";

#[derive(Serialize)]
struct NewProfile<'a> {
    wallet_address: &'a str,
    commander_name: &'a str,
    rank: &'a str,
    missions_completed: u32,
    total_score: u64,
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

pub struct PostgrestStore {
    http: reqwest::Client,
    table_url: Url,
}

impl PostgrestStore {
    /// Connect to `{base_url}/rest/v1/commander_profiles` with an API key.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, MemeError> {
        let table_url = table_url(base_url)?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| MemeError::Profile(format!("Invalid profile store key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| MemeError::Profile(format!("Invalid profile store key: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { http, table_url })
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.http.request(method, self.table_url.clone())
    }

    async fn rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, MemeError> {
        let response = request
            .send()
            .await
            .map_err(|e| MemeError::Profile(format!("Profile store unreachable: {}", e)))?;
        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(MemeError::validation("Commander name is already taken"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(target: "profiles", "Profile store returned {}: {}", status, body);
            return Err(MemeError::Profile(format!("Profile store returned HTTP {}", status)));
        }
        response
            .json()
            .await
            .map_err(|e| MemeError::Profile(format!("Malformed profile response: {}", e)))
    }

    async fn first(&self, request: RequestBuilder) -> Result<Option<CommanderProfile>, MemeError> {
        Ok(self.rows(request).await?.into_iter().next())
    }
}

/// REST endpoint for the profiles table under a hosted project URL.
pub fn table_url(base_url: &str) -> Result<Url, MemeError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| MemeError::Profile(format!("Invalid profile store URL '{}': {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| MemeError::Profile(format!("Profile store URL cannot be a base: {}", base_url)))?
        .pop_if_empty()
        .extend(["rest", "v1", TABLE]);
    Ok(url)
}

#[async_trait]
impl ProfileStore for PostgrestStore {
    async fn exists(&self, wallet: &str) -> Result<bool, MemeError> {
        let request = self
            .request(Method::GET)
            .query(&[("select", "id".to_string()), ("wallet_address", eq(wallet))]);
        Ok(!self.rows::<IgnoredAny>(request).await?.is_empty())
    }

    async fn create(&self, wallet: &str, commander_name: &str) -> Result<CommanderProfile, MemeError> {
        let name = super::validate_name(commander_name)?;
        if self.exists(wallet).await? {
            return Err(MemeError::validation("A profile already exists for this wallet"));
        }
        if !self.is_name_available(name).await? {
            return Err(MemeError::validation("Commander name is already taken"));
        }
        let body = NewProfile {
            wallet_address: wallet,
            commander_name: name,
            rank: STARTING_RANK,
            missions_completed: 0,
            total_score: 0,
        };
        let request = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&body);
        debug!(target: "profiles", "Creating profile for {}", wallet);
        self.first(request)
            .await?
            .ok_or_else(|| MemeError::Profile("Profile store returned no row on insert".to_string()))
    }

    async fn get(&self, wallet: &str) -> Result<Option<CommanderProfile>, MemeError> {
        let request = self
            .request(Method::GET)
            .query(&[("select", "*".to_string()), ("wallet_address", eq(wallet))]);
        self.first(request).await
    }

    async fn update(&self, wallet: &str, update: ProfileUpdate) -> Result<CommanderProfile, MemeError> {
        let request = self
            .request(Method::PATCH)
            .query(&[("wallet_address", eq(wallet))])
            .header("Prefer", "return=representation")
            .json(&update);
        self.first(request)
            .await?
            .ok_or_else(|| MemeError::NotFound(format!("profile for wallet {}", wallet)))
    }

    async fn delete(&self, wallet: &str) -> Result<(), MemeError> {
        let request = self
            .request(Method::DELETE)
            .query(&[("wallet_address", eq(wallet))])
            .header("Prefer", "return=representation");
        self.rows::<IgnoredAny>(request).await?;
        Ok(())
    }

    async fn is_name_available(&self, commander_name: &str) -> Result<bool, MemeError> {
        let request = self
            .request(Method::GET)
            .query(&[("select", "id".to_string()), ("commander_name", eq(commander_name.trim()))]);
        Ok(self.rows::<IgnoredAny>(request).await?.is_empty())
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<CommanderProfile>, MemeError> {
        let request = self.request(Method::GET).query(&[
            ("select", "*".to_string()),
            ("order", LEADERBOARD_ORDER.to_string()),
            ("limit", limit.to_string()),
        ]);
        self.rows(request).await
    }
}

/// Same order as [`leaderboard_order`](super::leaderboard_order).
const LEADERBOARD_ORDER: &str = "total_score.desc.nullslast,missions_completed.desc.nullslast";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_leaderboard_puts_nulls_last() {
        assert!(LEADERBOARD_ORDER.split(',').all(|column| column.ends_with(".desc.nullslast")));
    }

    #[test]
    fn test_table_url() {
        assert_eq!(
            table_url("https://abc.supabase.co").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/commander_profiles"
        );
        assert_eq!(
            table_url("https://abc.supabase.co/").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/commander_profiles"
        );
        assert!(table_url("not a url").is_err());
    }

    #[test]
    fn test_new_rejects_bad_key() {
        assert!(PostgrestStore::new("https://abc.supabase.co", "bad\nkey", Duration::from_secs(1)).is_err());
        assert!(PostgrestStore::new("https://abc.supabase.co", "anon-key", Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_new_profile_body() {
        let body = NewProfile {
            wallet_address: "w",
            commander_name: "Ace",
            rank: STARTING_RANK,
            missions_completed: 0,
            total_score: 0,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "wallet_address": "w",
                "commander_name": "Ace",
                "rank": "Recruit",
                "missions_completed": 0,
                "total_score": 0
            })
        );
    }
}
