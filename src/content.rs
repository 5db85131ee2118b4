//! Stage content seam.
//!
//! Adventure stages carry enemies, NPCs, and rewards as opaque data. A
//! `ContentGenerator` fills empty stages on first visit; the engine never
//! cares where the content came from. `MockGenerator` is the canned,
//! deterministic implementation used until a real generation backend
//! exists.

use crate::progress::{AdventureStage, StageReward};
use serde::{Deserialize, Serialize};

// ============================================================================
// Opaque Content Types
// ============================================================================

/// An AI-controlled stage boss with its dialogue script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub level: u32,
    pub personality: String,
    pub battle_dialogue: Vec<String>,
    pub defeat_dialogue: Vec<String>,
}

/// Role of a stage NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcRole {
    Merchant,
    Trainer,
    Guide,
    Questgiver,
}

/// Service offered by an NPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NpcService {
    Heal { cost: u32 },
    Shop { items: Vec<ShopItem> },
    Train,
    Evolve,
    Quest,
}

/// Item sold by a merchant NPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cost: u32,
    pub kind: ItemKind,
    pub effect: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Potion,
    Equipment,
    EvolutionStone,
    ShadowEgg,
}

/// A stage NPC with its dialogue script and services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    pub role: NpcRole,
    pub personality: String,
    pub dialogue: Vec<String>,
    pub services: Vec<NpcService>,
}

impl NpcSpec {
    /// Fetch a dialogue line by position, for the UI to step through.
    pub fn dialogue_line(&self, index: usize) -> Option<&str> {
        self.dialogue.get(index).map(String::as_str)
    }
}

// ============================================================================
// Generator Seam
// ============================================================================

/// Produces stage content. Implementations may be canned, procedural, or
/// eventually backed by a real generation service.
pub trait ContentGenerator {
    fn enemies_for(&self, stage: &AdventureStage) -> Vec<EnemySpec>;
    fn npcs_for(&self, stage: &AdventureStage) -> Vec<NpcSpec>;

    /// Default clear rewards for a stage.
    fn rewards_for(&self, _stage: &AdventureStage) -> Vec<StageReward> {
        vec![
            StageReward::Experience { amount: 100 },
            StageReward::ShadowTokens { amount: 25 },
        ]
    }
}

/// Canned content generator. Every stage gets the same cast.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockGenerator;

impl ContentGenerator for MockGenerator {
    fn enemies_for(&self, stage: &AdventureStage) -> Vec<EnemySpec> {
        vec![
            EnemySpec {
                id: format!("enemy_{}_1", stage.id),
                name: "Shadow Sentinel".to_string(),
                description: "A guardian of the ancient forest, corrupted by dark magic."
                    .to_string(),
                level: 5,
                personality: "Stoic and determined".to_string(),
                battle_dialogue: vec![
                    "You dare enter these sacred grounds?".to_string(),
                    "The shadows will consume you!".to_string(),
                    "Your journey ends here, mortal.".to_string(),
                ],
                defeat_dialogue: vec![
                    "How... is this possible?".to_string(),
                    "The darkness... it fades...".to_string(),
                    "Perhaps you are the one foretold...".to_string(),
                ],
            },
            EnemySpec {
                id: format!("enemy_{}_2", stage.id),
                name: "Mist Weaver".to_string(),
                description: "A mysterious entity that manipulates the mists and shadows."
                    .to_string(),
                level: 6,
                personality: "Enigmatic and cunning".to_string(),
                battle_dialogue: vec![
                    "The mist reveals all truths...".to_string(),
                    "Your fears will become reality!".to_string(),
                    "Dance with the shadows, if you dare.".to_string(),
                ],
                defeat_dialogue: vec![
                    "The mist... it clears...".to_string(),
                    "You have strength I did not foresee.".to_string(),
                    "This is but one battle in a greater war.".to_string(),
                ],
            },
        ]
    }

    fn npcs_for(&self, stage: &AdventureStage) -> Vec<NpcSpec> {
        vec![
            NpcSpec {
                id: format!("npc_{}_1", stage.id),
                name: "Elder Whisper".to_string(),
                description: "An ancient keeper of forest lore and shadow magic.".to_string(),
                role: NpcRole::Guide,
                personality: "Wise and mysterious".to_string(),
                dialogue: vec![
                    "Welcome, shadow walker. Few venture this deep into the Whispering Woods."
                        .to_string(),
                    "The shadows here have grown restless since the Blood Moon appeared."
                        .to_string(),
                    "If you seek to restore balance, you must first defeat the corrupted guardians."
                        .to_string(),
                    "Take this knowledge with you: shadows fear not the light, but the truth it reveals."
                        .to_string(),
                ],
                services: Vec::new(),
            },
            NpcSpec {
                id: format!("npc_{}_2", stage.id),
                name: "Raven Merchant".to_string(),
                description: "A traveling merchant who deals in rare shadow artifacts."
                    .to_string(),
                role: NpcRole::Merchant,
                personality: "Shrewd and knowledgeable".to_string(),
                dialogue: vec![
                    "Ah, a customer! Rare to find the living in these parts.".to_string(),
                    "I have wares from across the shadow realms. What catches your eye?"
                        .to_string(),
                    "These potions? Made from the essence of moonlight and shadow. Very potent."
                        .to_string(),
                    "Return when you have more shadow tokens. I might have... special items for a discerning collector."
                        .to_string(),
                ],
                services: vec![NpcService::Shop {
                    items: vec![
                        ShopItem {
                            id: "health_potion".to_string(),
                            name: "Shadow Essence Potion".to_string(),
                            description: "Restores 50 health to a shadow".to_string(),
                            cost: 15,
                            kind: ItemKind::Potion,
                            effect: Some("heal_50".to_string()),
                        },
                        ShopItem {
                            id: "mana_potion".to_string(),
                            name: "Moonlight Vial".to_string(),
                            description: "Restores 30 mana to a shadow".to_string(),
                            cost: 12,
                            kind: ItemKind::Potion,
                            effect: Some("mana_30".to_string()),
                        },
                    ],
                }],
            },
        ]
    }
}

/// Fill in any missing content on a stage. Idempotent: populated lists are
/// left alone, so a stage keeps its cast across visits.
pub fn populate_stage(stage: &mut AdventureStage, generator: &dyn ContentGenerator) {
    if stage.enemies.is_empty() {
        stage.enemies = generator.enemies_for(stage);
    }
    if stage.npcs.is_empty() {
        stage.npcs = generator.npcs_for(stage);
    }
    if stage.rewards.is_empty() {
        stage.rewards = generator.rewards_for(stage);
    }
}
