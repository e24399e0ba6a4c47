//! Character and companion records.
//!
//! Ability scores, skills and classes, bounded resources, and the
//! player character itself. Values are built with `with_*` methods and
//! handed through the kernel by value; every component returns a new
//! `Character` rather than editing a shared one.

use crate::dice::{DiceExpression, DieType};
use crate::items::{Equipment, Item};
use crate::status::StatusEffect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Maximum number of companions that may be active at the same time.
pub const MAX_ACTIVE_COMPANIONS: usize = 4;

// ============================================================================
// Ability Scores
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }

    /// Lenient parse used for narrator-supplied modifier maps.
    pub fn from_name(name: &str) -> Option<Ability> {
        match name.trim().to_lowercase().as_str() {
            "str" | "strength" => Some(Ability::Strength),
            "dex" | "dexterity" => Some(Ability::Dexterity),
            "con" | "constitution" => Some(Ability::Constitution),
            "int" | "intelligence" => Some(Ability::Intelligence),
            "wis" | "wisdom" => Some(Ability::Wisdom),
            "cha" | "charisma" => Some(Ability::Charisma),
            _ => None,
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Ability score modifier for a raw score (8-9 = -1, 10-11 = 0, 12-13 = +1).
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// Base ability scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn standard_array() -> Self {
        Self::new(15, 14, 13, 12, 10, 8)
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.get(ability) as i32)
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

// ============================================================================
// Skills
// ============================================================================

/// Skills, each governed by one ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Skill {
    Athletics,
    Acrobatics,
    SleightOfHand,
    Stealth,
    Arcana,
    History,
    Investigation,
    Nature,
    Religion,
    AnimalHandling,
    Insight,
    Medicine,
    Perception,
    Survival,
    Deception,
    Intimidation,
    Performance,
    Persuasion,
}

impl Skill {
    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }

    pub fn all() -> [Skill; 18] {
        [
            Skill::Athletics,
            Skill::Acrobatics,
            Skill::SleightOfHand,
            Skill::Stealth,
            Skill::Arcana,
            Skill::History,
            Skill::Investigation,
            Skill::Nature,
            Skill::Religion,
            Skill::AnimalHandling,
            Skill::Insight,
            Skill::Medicine,
            Skill::Perception,
            Skill::Survival,
            Skill::Deception,
            Skill::Intimidation,
            Skill::Performance,
            Skill::Persuasion,
        ]
    }
}

// ============================================================================
// Classes
// ============================================================================

/// Character classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Barbarian,
    Bard,
    Cleric,
    Druid,
    Fighter,
    Monk,
    Paladin,
    Ranger,
    Rogue,
    Sorcerer,
    Warlock,
    Wizard,
}

impl CharacterClass {
    pub fn hit_die(&self) -> DieType {
        match self {
            CharacterClass::Barbarian => DieType::D12,
            CharacterClass::Fighter | CharacterClass::Paladin | CharacterClass::Ranger => {
                DieType::D10
            }
            CharacterClass::Bard
            | CharacterClass::Cleric
            | CharacterClass::Druid
            | CharacterClass::Monk
            | CharacterClass::Rogue
            | CharacterClass::Warlock => DieType::D8,
            CharacterClass::Sorcerer | CharacterClass::Wizard => DieType::D6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Barbarian => "Barbarian",
            CharacterClass::Bard => "Bard",
            CharacterClass::Cleric => "Cleric",
            CharacterClass::Druid => "Druid",
            CharacterClass::Fighter => "Fighter",
            CharacterClass::Monk => "Monk",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Ranger => "Ranger",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Sorcerer => "Sorcerer",
            CharacterClass::Warlock => "Warlock",
            CharacterClass::Wizard => "Wizard",
        }
    }

    /// The ability that governs spell save DC and spell attacks.
    pub fn spellcasting_ability(&self) -> Option<Ability> {
        match self {
            CharacterClass::Bard
            | CharacterClass::Paladin
            | CharacterClass::Sorcerer
            | CharacterClass::Warlock => Some(Ability::Charisma),
            CharacterClass::Cleric | CharacterClass::Druid | CharacterClass::Ranger => {
                Some(Ability::Wisdom)
            }
            CharacterClass::Wizard => Some(Ability::Intelligence),
            CharacterClass::Barbarian | CharacterClass::Fighter | CharacterClass::Monk
            | CharacterClass::Rogue => None,
        }
    }

    /// Saving throws every member of the class is proficient in.
    pub fn saving_throws(&self) -> [Ability; 2] {
        match self {
            CharacterClass::Barbarian | CharacterClass::Fighter => {
                [Ability::Strength, Ability::Constitution]
            }
            CharacterClass::Bard => [Ability::Dexterity, Ability::Charisma],
            CharacterClass::Cleric | CharacterClass::Paladin | CharacterClass::Warlock => {
                [Ability::Wisdom, Ability::Charisma]
            }
            CharacterClass::Druid | CharacterClass::Wizard => {
                [Ability::Intelligence, Ability::Wisdom]
            }
            CharacterClass::Monk | CharacterClass::Ranger => {
                [Ability::Strength, Ability::Dexterity]
            }
            CharacterClass::Rogue => [Ability::Dexterity, Ability::Intelligence],
            CharacterClass::Sorcerer => [Ability::Constitution, Ability::Charisma],
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Resources
// ============================================================================

/// A bounded `current / max` pool (health, mana, stamina).
///
/// Every constructor and mutation clamps, so `0 <= current <= max` holds
/// for any value produced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub current: i32,
    pub max: i32,
}

impl Resource {
    /// A full pool.
    pub fn new(max: i32) -> Self {
        let max = max.max(0);
        Self { current: max, max }
    }

    pub fn with_current(self, current: i32) -> Self {
        Self { current, ..self }.clamped()
    }

    /// Restore the `0 <= current <= max` invariant.
    pub fn clamped(self) -> Self {
        let max = self.max.max(0);
        Self {
            current: self.current.clamp(0, max),
            max,
        }
    }

    /// Apply a signed delta, clamping the result.
    pub fn adjust(self, delta: i32) -> Self {
        Self {
            current: self.current.saturating_add(delta),
            ..self
        }
        .clamped()
    }

    /// Raise the maximum by `amount` (current is unchanged).
    pub fn grow(self, amount: i32) -> Self {
        Self {
            max: self.max.saturating_add(amount),
            ..self
        }
        .clamped()
    }

    pub fn refill(self) -> Self {
        Self {
            current: self.max,
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current <= 0
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current, self.max)
    }
}

/// Which pool a delta targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    Health,
    Mana,
    Stamina,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Health => "health",
            ResourceKind::Mana => "mana",
            ResourceKind::Stamina => "stamina",
        }
    }
}

// ============================================================================
// Companions
// ============================================================================

/// An ally who fights alongside the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Companion {
    pub id: String,
    pub name: String,
    pub hp: Resource,
    pub armor_class: i32,
    pub attack_bonus: i32,
    pub damage: DiceExpression,
    pub loyalty: i32,
    pub active: bool,
}

impl Companion {
    pub fn new(id: impl Into<String>, name: impl Into<String>, max_hp: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hp: Resource::new(max_hp),
            armor_class: 12,
            attack_bonus: 3,
            damage: DiceExpression::single(DieType::D6),
            loyalty: 50,
            active: true,
        }
    }

    pub fn with_armor_class(mut self, ac: i32) -> Self {
        self.armor_class = ac;
        self
    }

    pub fn with_attack(mut self, attack_bonus: i32, damage: DiceExpression) -> Self {
        self.attack_bonus = attack_bonus;
        self.damage = damage;
        self
    }

    pub fn with_loyalty(mut self, loyalty: i32) -> Self {
        self.loyalty = loyalty;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Active and still standing.
    pub fn can_fight(&self) -> bool {
        self.active && self.hp.current > 0
    }
}

// ============================================================================
// Character
// ============================================================================

/// The player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub race: String,
    pub class: CharacterClass,
    pub level: u8,
    pub background: String,

    pub ability_scores: AbilityScores,

    pub health: Resource,
    pub mana: Resource,
    pub stamina: Resource,
    pub base_speed: i32,

    pub equipment: Equipment,
    pub feats: BTreeSet<String>,
    pub status_effects: Vec<StatusEffect>,
    pub inventory: Vec<Item>,
    pub known_spells: Vec<String>,

    pub skill_proficiencies: BTreeSet<Skill>,
    pub saving_throw_proficiencies: BTreeSet<Ability>,

    pub experience: u32,
    /// Smallest denomination (copper).
    pub currency: i64,
    pub companions: Vec<Companion>,
}

impl Character {
    pub fn new(name: impl Into<String>, class: CharacterClass) -> Self {
        Self {
            name: name.into(),
            race: "Human".to_string(),
            class,
            level: 1,
            background: "Wanderer".to_string(),
            ability_scores: AbilityScores::default(),
            health: Resource::new(10),
            mana: Resource::new(0),
            stamina: Resource::new(10),
            base_speed: 30,
            equipment: Equipment::default(),
            feats: BTreeSet::new(),
            status_effects: Vec::new(),
            inventory: Vec::new(),
            known_spells: Vec::new(),
            skill_proficiencies: BTreeSet::new(),
            saving_throw_proficiencies: BTreeSet::new(),
            experience: 0,
            currency: 0,
            companions: Vec::new(),
        }
    }

    pub fn with_race(mut self, race: impl Into<String>) -> Self {
        self.race = race.into();
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level.clamp(1, 20);
        self
    }

    pub fn with_ability_scores(mut self, scores: AbilityScores) -> Self {
        self.ability_scores = scores;
        self
    }

    pub fn with_health(mut self, max: i32) -> Self {
        self.health = Resource::new(max);
        self
    }

    pub fn with_mana(mut self, max: i32) -> Self {
        self.mana = Resource::new(max);
        self
    }

    pub fn with_stamina(mut self, max: i32) -> Self {
        self.stamina = Resource::new(max);
        self
    }

    pub fn with_equipment(mut self, equipment: Equipment) -> Self {
        self.equipment = equipment;
        self
    }

    pub fn with_feat(mut self, feat: impl Into<String>) -> Self {
        self.feats.insert(feat.into());
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.inventory.push(item);
        self
    }

    pub fn with_spell(mut self, spell_id: impl Into<String>) -> Self {
        self.known_spells.push(spell_id.into());
        self
    }

    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skill_proficiencies.insert(skill);
        self
    }

    pub fn with_saving_throw(mut self, ability: Ability) -> Self {
        self.saving_throw_proficiencies.insert(ability);
        self
    }

    pub fn with_companion(mut self, companion: Companion) -> Self {
        self.companions.push(companion);
        self
    }

    pub fn with_experience(mut self, xp: u32) -> Self {
        self.experience = xp;
        self
    }

    pub fn with_currency(mut self, currency: i64) -> Self {
        self.currency = currency.max(0);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health.current > 0
    }

    pub fn has_feat(&self, feat: &str) -> bool {
        self.feats.contains(feat)
    }

    pub fn has_effect(&self, effect_id: &str) -> bool {
        self.status_effects.iter().any(|e| e.id == effect_id)
    }

    pub fn knows_spell(&self, spell_id: &str) -> bool {
        self.known_spells.iter().any(|s| s == spell_id)
    }

    pub fn resource(&self, kind: ResourceKind) -> Resource {
        match kind {
            ResourceKind::Health => self.health,
            ResourceKind::Mana => self.mana,
            ResourceKind::Stamina => self.stamina,
        }
    }

    /// Apply a delta to one pool, clamped to its bounds.
    pub fn adjust_resource(mut self, kind: ResourceKind, delta: i32) -> Self {
        match kind {
            ResourceKind::Health => self.health = self.health.adjust(delta),
            ResourceKind::Mana => self.mana = self.mana.adjust(delta),
            ResourceKind::Stamina => self.stamina = self.stamina.adjust(delta),
        }
        self
    }

    /// Add a (possibly negative) amount of currency; the balance never drops below zero.
    pub fn adjust_currency(mut self, delta: i64) -> Self {
        self.currency = self.currency.saturating_add(delta).max(0);
        self
    }

    pub fn active_companion_count(&self) -> usize {
        self.companions.iter().filter(|c| c.active).count()
    }

    /// Clamp every bounded value back into range.
    pub fn normalized(self) -> Self {
        self.normalized_with_cap(MAX_ACTIVE_COMPANIONS)
    }

    /// [`Character::normalized`] with a custom active-companion cap.
    pub fn normalized_with_cap(mut self, max_active: usize) -> Self {
        self.health = self.health.clamped();
        self.mana = self.mana.clamped();
        self.stamina = self.stamina.clamped();
        self.currency = self.currency.max(0);
        let mut active = 0;
        for companion in &mut self.companions {
            companion.hp = companion.hp.clamped();
            if companion.hp.is_empty() {
                companion.active = false;
            }
            if companion.active {
                active += 1;
                // Past the cap, later companions wait in reserve.
                companion.active = active <= max_active;
            }
        }
        self
    }
}
