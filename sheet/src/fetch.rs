//! Background fetch worker.
//!
//! All network work happens on one task that receives requests over a
//! channel and sends results back. Every request carries the app's
//! generation number at the time it was made; the app bumps its generation
//! whenever the dependency context changes (a selection changed, a screen
//! was left) and drops any response stamped with an older generation. That
//! keeps stale responses from ever being applied, without cancellation
//! plumbing inside the worker.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::debug;

use srd::types::{ApiRef, ClassDetail, ClassLevel, FeatureDetail, LevelSpellcasting, RaceDetail,
    SpellSummary};
use srd::SrdClient;

/// A request for upstream data.
#[derive(Debug)]
pub enum FetchRequest {
    RaceList,
    ClassList,
    RaceDetail { index: String },
    ClassDetail { index: String },
    /// Descriptions for `skill-*` proficiency indices.
    SkillDescriptions { indices: Vec<String> },
    EquipmentCategory { index: String },
    ClassSpells { index: String },
    /// Level-1 spellcasting numbers for the wizard's spell step.
    LevelOne { index: String },
    /// Class hit die plus the full 1-20 progression.
    ClassLevels { index: String },
    /// Feature details; the refs provide fallback names on fetch failure.
    Features { refs: Vec<ApiRef> },
}

/// A completed fetch.
#[derive(Debug)]
pub enum FetchPayload {
    RaceList(Vec<ApiRef>),
    ClassList(Vec<ApiRef>),
    RaceDetail(Box<RaceDetail>),
    ClassDetail(Box<ClassDetail>),
    /// Proficiency index -> joined description paragraphs.
    SkillDescriptions(HashMap<String, String>),
    EquipmentCategory { index: String, items: Vec<ApiRef> },
    ClassSpells(Vec<SpellSummary>),
    LevelOne(Option<LevelSpellcasting>),
    ClassLevels { hit_die: u8, levels: Vec<ClassLevel> },
    Features(Vec<FeatureDetail>),
    /// The request failed; `what` names it for the status line.
    Failed { what: &'static str, error: String },
}

/// A response tagged with the generation of the request that produced it.
#[derive(Debug)]
pub struct Fetched {
    pub generation: u64,
    pub payload: FetchPayload,
}

/// Spawn the worker. Returns the request sender and the response receiver.
pub fn spawn(
    client: SrdClient,
) -> (
    mpsc::Sender<(u64, FetchRequest)>,
    mpsc::Receiver<Fetched>,
) {
    let (request_tx, mut request_rx) = mpsc::channel::<(u64, FetchRequest)>(32);
    let (response_tx, response_rx) = mpsc::channel::<Fetched>(32);

    tokio::spawn(async move {
        while let Some((generation, request)) = request_rx.recv().await {
            debug!(?request, generation, "fetching");
            let payload = handle(&client, request).await;
            if response_tx
                .send(Fetched {
                    generation,
                    payload,
                })
                .await
                .is_err()
            {
                break;
            }
        }
    });

    (request_tx, response_rx)
}

async fn handle(client: &SrdClient, request: FetchRequest) -> FetchPayload {
    match request {
        FetchRequest::RaceList => match client.races().await {
            Ok(races) => FetchPayload::RaceList(races),
            Err(e) => failed("races", e),
        },
        FetchRequest::ClassList => match client.classes().await {
            Ok(classes) => FetchPayload::ClassList(classes),
            Err(e) => failed("classes", e),
        },
        FetchRequest::RaceDetail { index } => match client.race(&index).await {
            Ok(race) => FetchPayload::RaceDetail(Box::new(race)),
            Err(e) => failed("race detail", e),
        },
        FetchRequest::ClassDetail { index } => match client.class(&index).await {
            Ok(class) => FetchPayload::ClassDetail(Box::new(class)),
            Err(e) => failed("class detail", e),
        },
        FetchRequest::SkillDescriptions { indices } => {
            // Best-effort: a skill that fails to load simply has no tooltip.
            let mut descriptions = HashMap::new();
            for prof_index in indices {
                let skill_index = prof_index.trim_start_matches("skill-");
                if let Ok(skill) = client.skill(skill_index).await {
                    if !skill.desc.is_empty() {
                        descriptions.insert(prof_index, skill.desc.join("\n\n"));
                    }
                }
            }
            FetchPayload::SkillDescriptions(descriptions)
        }
        FetchRequest::EquipmentCategory { index } => {
            match client.equipment_category(&index).await {
                Ok(category) => FetchPayload::EquipmentCategory {
                    index,
                    items: category.equipment,
                },
                Err(e) => failed("equipment category", e),
            }
        }
        FetchRequest::ClassSpells { index } => match client.class_spells(&index).await {
            Ok(spells) => FetchPayload::ClassSpells(spells),
            Err(e) => failed("class spells", e),
        },
        FetchRequest::LevelOne { index } => match client.class_level(&index, 1).await {
            Ok(level) => FetchPayload::LevelOne(level.spellcasting),
            // The spell step just shows nothing to pick.
            Err(_) => FetchPayload::LevelOne(None),
        },
        FetchRequest::ClassLevels { index } => {
            let class = client.class(&index).await;
            let levels = client.class_levels(&index).await;
            match (class, levels) {
                (Ok(class), Ok(levels)) => FetchPayload::ClassLevels {
                    hit_die: class.hit_die,
                    levels,
                },
                (Err(e), _) | (_, Err(e)) => failed("class levels", e),
            }
        }
        FetchRequest::Features { refs } => {
            let mut features = Vec::with_capacity(refs.len());
            for reference in refs {
                match client.feature(&reference.index).await {
                    Ok(feature) => features.push(feature),
                    // Keep the name from the ref, with no description.
                    Err(_) => features.push(FeatureDetail {
                        index: reference.index,
                        name: reference.name,
                        url: reference.url,
                        desc: Vec::new(),
                        level: None,
                        class: None,
                        subclass: None,
                    }),
                }
            }
            FetchPayload::Features(features)
        }
    }
}

fn failed(what: &'static str, error: srd::Error) -> FetchPayload {
    FetchPayload::Failed {
        what,
        error: error.to_string(),
    }
}
