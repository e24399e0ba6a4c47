//! Read-only content lookups.
//!
//! The kernel never owns item, enemy or spell definitions; it asks a
//! [`ContentTables`] implementation for them by id. [`Catalog`] is an
//! in-memory implementation that can be loaded from JSON, and
//! [`Catalog::standard`] carries a small built-in data set.

use crate::character::{Ability, AbilityScores, Character, CharacterClass, Companion, Skill};
use crate::dice::{DiceExpression, DiceTerm, DieType};
use crate::encounter::{EncounterDefinition, EnemyTemplate};
use crate::items::{ArmorCategory, DamageType, Item, ItemEffect, ItemKind, WeaponProperty};
use crate::status::{ActionKind, EffectDuration, StatusEffect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A castable spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mana_cost: i32,
    /// Damage dealt to the current target on a confirmed hit.
    #[serde(default)]
    pub damage: Option<DiceExpression>,
    #[serde(default = "default_spell_damage_type")]
    pub damage_type: DamageType,
    /// Healing applied to the caster when cast.
    #[serde(default)]
    pub healing: Option<DiceExpression>,
    /// Status effect id applied to the caster when cast.
    #[serde(default)]
    pub applies: Option<String>,
}

fn default_spell_damage_type() -> DamageType {
    DamageType::Force
}

impl SpellDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mana_cost: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mana_cost,
            damage: None,
            damage_type: default_spell_damage_type(),
            healing: None,
            applies: None,
        }
    }

    pub fn with_damage(mut self, damage: DiceExpression, damage_type: DamageType) -> Self {
        self.damage = Some(damage);
        self.damage_type = damage_type;
        self
    }

    pub fn with_healing(mut self, healing: DiceExpression) -> Self {
        self.healing = Some(healing);
        self
    }

    pub fn applying(mut self, effect_id: impl Into<String>) -> Self {
        self.applies = Some(effect_id.into());
        self
    }
}

/// Lookup of static game content by id.
pub trait ContentTables: Send + Sync {
    fn enemy_template(&self, id: &str) -> Option<EnemyTemplate>;
    fn encounter(&self, id: &str) -> Option<EncounterDefinition>;
    fn item(&self, id: &str) -> Option<Item>;
    fn status_effect(&self, id: &str) -> Option<StatusEffect>;
    fn spell(&self, id: &str) -> Option<SpellDefinition>;
    fn companion(&self, id: &str) -> Option<Companion>;
}

/// Ids from the narrator arrive in varying case and spacing.
pub fn normalize_id(id: &str) -> String {
    id.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// On-disk shape of a catalog: plain lists keyed by each record's id.
#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    enemies: Vec<EnemyTemplate>,
    #[serde(default)]
    encounters: Vec<EncounterDefinition>,
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    status_effects: Vec<StatusEffect>,
    #[serde(default)]
    spells: Vec<SpellDefinition>,
    #[serde(default)]
    companions: Vec<Companion>,
}

/// In-memory content tables.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    enemies: BTreeMap<String, EnemyTemplate>,
    encounters: BTreeMap<String, EncounterDefinition>,
    items: BTreeMap<String, Item>,
    status_effects: BTreeMap<String, StatusEffect>,
    spells: BTreeMap<String, SpellDefinition>,
    companions: BTreeMap<String, Companion>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the built-in data set.
    pub fn standard() -> Self {
        STANDARD_CATALOG.clone()
    }

    /// Parse a catalog from JSON with optional `enemies`, `encounters`,
    /// `items`, `status_effects`, `spells` and `companions` arrays.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Self::new().merged(file))
    }

    /// Layer JSON content over this catalog; later entries replace earlier ones.
    pub fn extend_from_json(self, json: &str) -> Result<Self, serde_json::Error> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(self.merged(file))
    }

    fn merged(self, file: CatalogFile) -> Self {
        let mut catalog = self;
        catalog = file.enemies.into_iter().fold(catalog, Self::with_enemy);
        catalog = file.encounters.into_iter().fold(catalog, Self::with_encounter);
        catalog = file.items.into_iter().fold(catalog, Self::with_item);
        catalog = file
            .status_effects
            .into_iter()
            .fold(catalog, Self::with_status_effect);
        catalog = file.spells.into_iter().fold(catalog, Self::with_spell);
        file.companions.into_iter().fold(catalog, Self::with_companion)
    }

    pub fn with_enemy(mut self, template: EnemyTemplate) -> Self {
        self.enemies.insert(normalize_id(&template.id), template);
        self
    }

    pub fn with_encounter(mut self, encounter: EncounterDefinition) -> Self {
        self.encounters.insert(normalize_id(&encounter.id), encounter);
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.insert(normalize_id(&item.id), item);
        self
    }

    pub fn with_status_effect(mut self, effect: StatusEffect) -> Self {
        self.status_effects.insert(normalize_id(&effect.id), effect);
        self
    }

    pub fn with_spell(mut self, spell: SpellDefinition) -> Self {
        self.spells.insert(normalize_id(&spell.id), spell);
        self
    }

    pub fn with_companion(mut self, companion: Companion) -> Self {
        self.companions.insert(normalize_id(&companion.id), companion);
        self
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }
}

impl ContentTables for Catalog {
    fn enemy_template(&self, id: &str) -> Option<EnemyTemplate> {
        self.enemies.get(&normalize_id(id)).cloned()
    }

    fn encounter(&self, id: &str) -> Option<EncounterDefinition> {
        self.encounters.get(&normalize_id(id)).cloned()
    }

    fn item(&self, id: &str) -> Option<Item> {
        self.items.get(&normalize_id(id)).cloned()
    }

    fn status_effect(&self, id: &str) -> Option<StatusEffect> {
        self.status_effects.get(&normalize_id(id)).cloned()
    }

    fn spell(&self, id: &str) -> Option<SpellDefinition> {
        self.spells.get(&normalize_id(id)).cloned()
    }

    fn companion(&self, id: &str) -> Option<Companion> {
        self.companions.get(&normalize_id(id)).cloned()
    }
}

// ============================================================================
// Built-in data
// ============================================================================

fn dice(count: u32, die_type: DieType, modifier: i32) -> DiceExpression {
    DiceExpression {
        terms: vec![DiceTerm { count, die_type }],
        modifier,
    }
}

lazy_static::lazy_static! {
    static ref STANDARD_CATALOG: Catalog = standard_catalog();
}

fn standard_catalog() -> Catalog {
    let items = [
        Item::weapon("longsword", "Longsword", dice(1, DieType::D8, 0), DamageType::Slashing)
            .with_value(1_500),
        Item::weapon("greatsword", "Greatsword", dice(2, DieType::D6, 0), DamageType::Slashing)
            .with_properties([WeaponProperty::TwoHanded])
            .with_value(5_000),
        Item::weapon("dagger", "Dagger", dice(1, DieType::D4, 0), DamageType::Piercing)
            .with_properties([WeaponProperty::Finesse, WeaponProperty::Light])
            .with_value(200),
        Item::weapon("shortbow", "Shortbow", dice(1, DieType::D6, 0), DamageType::Piercing)
            .with_properties([WeaponProperty::Ranged, WeaponProperty::TwoHanded])
            .with_value(2_500),
        Item::armor("leather_armor", "Leather Armor", 11).with_value(1_000),
        Item::armor("scale_mail", "Scale Mail", 14).with_value(5_000),
        Item::armor("chain_mail", "Chain Mail", 16)
            .with_category(ArmorCategory::Heavy)
            .with_value(7_500),
        Item::shield("shield", "Shield", 2).with_value(1_000),
        Item::new(
            "healing_potion",
            "Potion of Healing",
            ItemKind::Consumable {
                effect: ItemEffect::Heal {
                    dice: dice(2, DieType::D4, 2),
                },
            },
        )
        .with_value(5_000),
        Item::new(
            "mana_potion",
            "Potion of Clarity",
            ItemKind::Consumable {
                effect: ItemEffect::RestoreMana { amount: 10 },
            },
        )
        .with_value(5_000),
        Item::new(
            "antitoxin",
            "Antitoxin",
            ItemKind::Consumable {
                effect: ItemEffect::ApplyStatus {
                    effect_id: "fortified".to_string(),
                },
            },
        )
        .with_value(5_000),
        Item::new("wolf_pelt", "Wolf Pelt", ItemKind::Misc).with_value(200),
        Item::new("rusty_key", "Rusty Key", ItemKind::Misc),
    ];

    let enemies = [
        EnemyTemplate::new("bandit", "Bandit", 11, 12, dice(1, DieType::D6, 1))
            .with_damage_type(DamageType::Slashing)
            .with_challenge_rating(0.125)
            .with_xp(25),
        EnemyTemplate::new("goblin", "Goblin", 7, 15, dice(1, DieType::D6, 2))
            .with_damage_type(DamageType::Slashing)
            .with_challenge_rating(0.25)
            .with_xp(50)
            .with_loot("dagger"),
        EnemyTemplate::new("wolf", "Wolf", 11, 13, dice(2, DieType::D4, 2))
            .with_damage_type(DamageType::Piercing)
            .with_challenge_rating(0.25)
            .with_speed(40)
            .with_xp(50)
            .with_loot("wolf_pelt"),
        EnemyTemplate::new("orc", "Orc", 15, 13, dice(1, DieType::D12, 3))
            .with_damage_type(DamageType::Slashing)
            .with_challenge_rating(0.5)
            .with_xp(100)
            .with_loot("healing_potion"),
        EnemyTemplate::new("ogre", "Ogre", 59, 11, dice(2, DieType::D8, 4))
            .with_damage_type(DamageType::Bludgeoning)
            .with_challenge_rating(2.0)
            .with_speed(40)
            .with_xp(450),
    ];

    let encounters = [
        EncounterDefinition {
            id: "goblin_ambush".to_string(),
            name: "Goblin Ambush".to_string(),
            enemies: vec!["goblin".into(), "goblin".into(), "goblin".into()],
        },
        EncounterDefinition {
            id: "wolf_pack".to_string(),
            name: "Wolf Pack".to_string(),
            enemies: vec!["wolf".into(), "wolf".into()],
        },
        EncounterDefinition {
            id: "bandit_camp".to_string(),
            name: "Bandit Camp".to_string(),
            enemies: vec!["bandit".into(), "bandit".into(), "orc".into()],
        },
    ];

    let effects = [
        StatusEffect::new("poisoned", "Poisoned", EffectDuration::Turns(3)).with_health_per_turn(-2),
        StatusEffect::new("burning", "Burning", EffectDuration::Turns(2))
            .with_health_per_turn(-3)
            .with_vulnerability(DamageType::Cold),
        StatusEffect::new("regeneration", "Regeneration", EffectDuration::Turns(3))
            .with_health_per_turn(3),
        StatusEffect::new("blessed", "Blessed", EffectDuration::Turns(5)).with_damage(1),
        StatusEffect::new("haste", "Haste", EffectDuration::Turns(3))
            .with_speed(10)
            .with_armor_class(2),
        StatusEffect::new("shielded", "Shielded", EffectDuration::Turns(2)).with_armor_class(5),
        StatusEffect::new("fortified", "Fortified", EffectDuration::Turns(5))
            .with_resistance(DamageType::Poison),
        StatusEffect::new("silenced", "Silenced", EffectDuration::Turns(2))
            .disabling(ActionKind::CastSpell),
        StatusEffect::new("stunned", "Stunned", EffectDuration::Turns(1))
            .disabling(ActionKind::Attack),
        StatusEffect::new("exhausted", "Exhausted", EffectDuration::Permanent)
            .with_stamina_per_turn(-1),
    ];

    let spells = [
        SpellDefinition::new("fire_bolt", "Fire Bolt", 0)
            .with_damage(dice(1, DieType::D10, 0), DamageType::Fire),
        SpellDefinition::new("magic_missile", "Magic Missile", 3)
            .with_damage(dice(3, DieType::D4, 3), DamageType::Force),
        SpellDefinition::new("ray_of_frost", "Ray of Frost", 1)
            .with_damage(dice(1, DieType::D8, 0), DamageType::Cold),
        SpellDefinition::new("healing_word", "Healing Word", 2).with_healing(dice(1, DieType::D4, 2)),
        SpellDefinition::new("shield", "Shield", 2).applying("shielded"),
    ];

    let companions = [
        Companion::new("brenna", "Brenna the Sellsword", 18)
            .with_armor_class(16)
            .with_attack(5, dice(1, DieType::D8, 3)),
        Companion::new("kit", "Kit Quickfingers", 12)
            .with_armor_class(14)
            .with_attack(4, dice(1, DieType::D6, 2)),
        Companion::new("grey", "Grey the Hound", 10)
            .with_armor_class(12)
            .with_attack(3, dice(1, DieType::D6, 1)),
    ];

    let catalog = items.into_iter().fold(Catalog::new(), Catalog::with_item);
    let catalog = enemies.into_iter().fold(catalog, Catalog::with_enemy);
    let catalog = encounters.into_iter().fold(catalog, Catalog::with_encounter);
    let catalog = effects.into_iter().fold(catalog, Catalog::with_status_effect);
    let catalog = spells.into_iter().fold(catalog, Catalog::with_spell);
    companions.into_iter().fold(catalog, Catalog::with_companion)
}

// ============================================================================
// Pregenerated characters
// ============================================================================

/// A level 1 fighter with a longsword, chain mail and a shield.
pub fn sample_fighter(name: &str) -> Character {
    let catalog = Catalog::standard();
    let mut character = Character::new(name, CharacterClass::Fighter)
        .with_race("Human")
        .with_background("Soldier")
        .with_ability_scores(AbilityScores::new(16, 14, 14, 10, 12, 8))
        .with_health(12)
        .with_stamina(12)
        .with_skill(Skill::Athletics)
        .with_skill(Skill::Perception);

    for item_id in ["longsword", "chain_mail", "shield"] {
        if let Some(item) = catalog.item(item_id) {
            if let Ok(equipped) = character.equipment.clone().equip(item, None) {
                character.equipment = equipped.equipment;
            }
        }
    }
    if let Some(potion) = catalog.item("healing_potion") {
        character = character.with_item(potion);
    }
    character
}

/// A level 1 wizard who knows a few spells.
pub fn sample_wizard(name: &str) -> Character {
    let catalog = Catalog::standard();
    let mut character = Character::new(name, CharacterClass::Wizard)
        .with_race("Elf")
        .with_background("Sage")
        .with_ability_scores(AbilityScores::new(8, 14, 12, 16, 12, 10))
        .with_health(8)
        .with_mana(12)
        .with_stamina(8)
        .with_skill(Skill::Arcana)
        .with_saving_throw(Ability::Intelligence)
        .with_spell("fire_bolt")
        .with_spell("magic_missile")
        .with_spell("healing_word")
        .with_spell("shield");
    if let Some(dagger) = catalog.item("dagger") {
        if let Ok(equipped) = character.equipment.clone().equip(dagger, None) {
            character.equipment = equipped.equipment;
        }
    }
    if let Some(potion) = catalog.item("mana_potion") {
        character = character.with_item(potion);
    }
    character
}
