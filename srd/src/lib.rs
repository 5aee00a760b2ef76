//! Minimal D&D 5e SRD API client.
//!
//! This crate provides a focused read-only client for the public SRD API
//! (<https://www.dnd5eapi.co>) with:
//! - Typed GET endpoints for classes, races, spells, skills, features,
//!   proficiencies, subclasses and equipment categories
//! - An append-only in-memory response cache keyed by exact URL
//!
//! The cache is never invalidated: records on the SRD API are static for the
//! lifetime of a session, so repeated identical requests are idempotent cache
//! reads. There is no retry logic; callers decide how to surface failures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub mod types;

use types::{
    ApiList, ApiRef, ClassDetail, ClassLevel, EquipmentCategory, FeatureDetail, ProficiencyDetail,
    RaceDetail, SkillDetail, SpellDetail, SpellSummary, SubclassDetail, SubclassLevel,
};

/// Base URL of the public SRD API.
pub const DEFAULT_BASE_URL: &str = "https://www.dnd5eapi.co";

/// Errors that can occur when talking to the SRD API.
#[derive(Debug, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {path}")]
    Api { status: u16, path: String },

    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// SRD API client.
///
/// Cheap to clone; clones share one HTTP connection pool and one cache.
/// Construct a single instance at startup and pass it to whoever fetches, or
/// build a per-test instance pointed at a stub server via [`with_base_url`].
///
/// [`with_base_url`]: SrdClient::with_base_url
#[derive(Clone)]
pub struct SrdClient {
    client: reqwest::Client,
    base_url: String,
    cache: Arc<Mutex<HashMap<String, Arc<Value>>>>,
}

impl Default for SrdClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SrdClient {
    /// Create a client against the public SRD API.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Point the client at a different base URL (tests, mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Number of cached responses.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().expect("cache lock poisoned").len()
    }

    /// Fetch a path (e.g. `/api/classes/fighter`), going through the cache.
    async fn get_json(&self, path: &str) -> Result<Arc<Value>, Error> {
        let url = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };

        if let Some(cached) = self.cache.lock().expect("cache lock poisoned").get(&url) {
            return Ok(Arc::clone(cached));
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        let value = Arc::new(value);
        self.cache
            .lock()
            .expect("cache lock poisoned")
            .insert(url, Arc::clone(&value));
        Ok(value)
    }

    /// Fetch a path and deserialize it into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let value = self.get_json(path).await?;
        serde_json::from_value((*value).clone()).map_err(|e| Error::Parse(e.to_string()))
    }

    async fn list(&self, path: &str) -> Result<Vec<ApiRef>, Error> {
        let list: ApiList<ApiRef> = self.get(path).await?;
        Ok(list.results)
    }

    // ========================================================================
    // List endpoints
    // ========================================================================

    pub async fn classes(&self) -> Result<Vec<ApiRef>, Error> {
        self.list("/api/classes").await
    }

    pub async fn races(&self) -> Result<Vec<ApiRef>, Error> {
        self.list("/api/races").await
    }

    pub async fn spells(&self) -> Result<Vec<ApiRef>, Error> {
        self.list("/api/spells").await
    }

    pub async fn ability_scores(&self) -> Result<Vec<ApiRef>, Error> {
        self.list("/api/ability-scores").await
    }

    pub async fn skills(&self) -> Result<Vec<ApiRef>, Error> {
        self.list("/api/skills").await
    }

    pub async fn proficiencies(&self) -> Result<Vec<ApiRef>, Error> {
        self.list("/api/proficiencies").await
    }

    // ========================================================================
    // Detail endpoints
    // ========================================================================

    pub async fn class(&self, index: &str) -> Result<ClassDetail, Error> {
        self.get(&format!("/api/classes/{index}")).await
    }

    /// All twenty levels of a class progression, sorted by level.
    ///
    /// The API has served this both as an array and as an object keyed by
    /// level number; both are normalized here.
    pub async fn class_levels(&self, index: &str) -> Result<Vec<ClassLevel>, Error> {
        let value = self.get_json(&format!("/api/classes/{index}/levels")).await?;

        let raw: Vec<Value> = match (*value).clone() {
            Value::Array(items) => items,
            Value::Object(map) => map.into_values().collect(),
            other => {
                return Err(Error::Parse(format!(
                    "unexpected class levels payload: {other}"
                )))
            }
        };

        let mut levels: Vec<ClassLevel> = raw
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        levels.sort_by_key(|l| l.level);
        Ok(levels)
    }

    /// A single class level (e.g. level 1 spellcasting numbers).
    pub async fn class_level(&self, index: &str, level: u8) -> Result<ClassLevel, Error> {
        self.get(&format!("/api/classes/{index}/levels/{level}"))
            .await
    }

    /// Spells available to a class, cantrips included (level 0).
    pub async fn class_spells(&self, index: &str) -> Result<Vec<SpellSummary>, Error> {
        let list: ApiList<SpellSummary> = self.get(&format!("/api/classes/{index}/spells")).await?;
        Ok(list.results)
    }

    pub async fn subclass(&self, index: &str) -> Result<SubclassDetail, Error> {
        self.get(&format!("/api/subclasses/{index}")).await
    }

    pub async fn subclass_levels(&self, index: &str) -> Result<Vec<SubclassLevel>, Error> {
        self.get(&format!("/api/subclasses/{index}/levels")).await
    }

    pub async fn feature(&self, index: &str) -> Result<FeatureDetail, Error> {
        self.get(&format!("/api/features/{index}")).await
    }

    pub async fn race(&self, index: &str) -> Result<RaceDetail, Error> {
        self.get(&format!("/api/races/{index}")).await
    }

    pub async fn spell(&self, index: &str) -> Result<SpellDetail, Error> {
        self.get(&format!("/api/spells/{index}")).await
    }

    pub async fn proficiency(&self, index: &str) -> Result<ProficiencyDetail, Error> {
        self.get(&format!("/api/proficiencies/{index}")).await
    }

    /// Skill detail, indexed without the `skill-` proficiency prefix.
    pub async fn skill(&self, index: &str) -> Result<SkillDetail, Error> {
        self.get(&format!("/api/skills/{index}")).await
    }

    pub async fn equipment_category(&self, index: &str) -> Result<EquipmentCategory, Error> {
        self.get(&format!("/api/equipment-categories/{index}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_client(path: &str, value: Value) -> SrdClient {
        let client = SrdClient::new();
        let url = format!("{DEFAULT_BASE_URL}{path}");
        client
            .cache
            .lock()
            .unwrap()
            .insert(url, Arc::new(value));
        client
    }

    #[tokio::test]
    async fn cached_responses_are_served_without_network() {
        let client = seeded_client(
            "/api/classes",
            serde_json::json!({
                "count": 2,
                "results": [
                    {"index": "fighter", "name": "Fighter", "url": "/api/classes/fighter"},
                    {"index": "wizard", "name": "Wizard", "url": "/api/classes/wizard"}
                ]
            }),
        );

        let classes = client.classes().await.unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].index, "fighter");
        assert_eq!(client.cache_len(), 1);

        // Second read hits the same entry, nothing new is cached.
        let again = client.classes().await.unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(client.cache_len(), 1);
    }

    #[tokio::test]
    async fn class_levels_accept_array_payloads() {
        let client = seeded_client(
            "/api/classes/wizard/levels",
            serde_json::json!([
                {"level": 2, "prof_bonus": 2, "features": []},
                {"level": 1, "prof_bonus": 2, "features": []}
            ]),
        );

        let levels = client.class_levels("wizard").await.unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].level, 1);
        assert_eq!(levels[1].level, 2);
    }

    #[tokio::test]
    async fn class_levels_accept_object_payloads() {
        let client = seeded_client(
            "/api/classes/fighter/levels",
            serde_json::json!({
                "2": {"level": 2, "prof_bonus": 2, "features": []},
                "1": {"level": 1, "prof_bonus": 2, "features": []}
            }),
        );

        let levels = client.class_levels("fighter").await.unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].level, 1);
    }

    #[tokio::test]
    async fn parse_failures_surface_as_parse_errors() {
        let client = seeded_client("/api/races/elf", serde_json::json!("not an object"));

        let err = client.race("elf").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = SrdClient::new().with_base_url("http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
    }
}
