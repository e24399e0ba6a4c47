//! Derived statistics.
//!
//! [`derive_stats`] is a pure function of the character value: effective
//! ability scores, armor class, attack and damage, saves, skills, spellcasting
//! numbers, carry capacity and speed. It has no side effects and returns the
//! same result for the same input, so it is re-run whenever equipment or
//! status effects change.

use crate::character::{Ability, AbilityScores, Character, Skill};
use crate::dice::{DiceExpression, RollSource};
use crate::items::{ArmorCategory, DamageType, ItemKind};
use crate::status::ActionKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Feat that raises the medium-armor DEX cap from 2 to 3.
pub const FEAT_MEDIUM_ARMOR_MASTER: &str = "medium_armor_master";
/// Feat granting +1 AC while wielding two weapons.
pub const FEAT_DUAL_WIELDER: &str = "dual_wielder";

const MEDIUM_DEX_CAP: i32 = 2;
const MEDIUM_DEX_CAP_MASTER: i32 = 3;
const UNARMORED_BASE: i32 = 10;

/// A damage roll: dice plus a flat bonus, never dealing less than zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageFormula {
    pub dice: DiceExpression,
    pub bonus: i32,
    pub damage_type: DamageType,
}

impl DamageFormula {
    pub fn new(dice: DiceExpression, bonus: i32, damage_type: DamageType) -> Self {
        Self {
            dice,
            bonus,
            damage_type,
        }
    }

    pub fn roll<R: RollSource + ?Sized>(&self, rolls: &mut R) -> i32 {
        self.dice.roll(rolls).total.saturating_add(self.bonus).max(0)
    }
}

impl std::fmt::Display for DamageFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let expr = self.dice.clone().with_bonus(self.bonus);
        write!(f, "{expr} {}", self.damage_type)
    }
}

/// Everything [`derive_stats`] computes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedStats {
    pub abilities: AbilityScores,
    pub armor_class: i32,
    pub proficiency_bonus: i32,
    pub attack_bonus: i32,
    pub damage: DamageFormula,
    pub saving_throws: BTreeMap<Ability, i32>,
    pub skills: BTreeMap<Skill, i32>,
    pub spellcasting_ability: Option<Ability>,
    pub spell_save_dc: Option<i32>,
    pub spell_attack_bonus: Option<i32>,
    pub carry_capacity: i32,
    pub speed: i32,
    pub resistances: BTreeSet<DamageType>,
    pub vulnerabilities: BTreeSet<DamageType>,
    pub disabled_actions: BTreeSet<ActionKind>,
}

impl DerivedStats {
    pub fn modifier(&self, ability: Ability) -> i32 {
        self.abilities.modifier(ability)
    }

    pub fn is_disabled(&self, kind: ActionKind) -> bool {
        self.disabled_actions.contains(&kind)
    }

    /// Damage for a spell: its dice plus the casting modifier.
    pub fn spell_damage(&self, dice: &DiceExpression, damage_type: DamageType) -> DamageFormula {
        let bonus = self.spellcasting_ability.map_or(0, |a| self.modifier(a));
        DamageFormula::new(dice.clone(), bonus, damage_type)
    }

    /// Damage after resistance (halved, rounded down) or vulnerability (doubled).
    ///
    /// Having both cancels out.
    pub fn damage_taken(&self, amount: i32, damage_type: Option<DamageType>) -> i32 {
        let amount = amount.max(0);
        let Some(damage_type) = damage_type else {
            return amount;
        };
        match (
            self.resistances.contains(&damage_type),
            self.vulnerabilities.contains(&damage_type),
        ) {
            (true, false) => amount / 2,
            (false, true) => amount.saturating_mul(2),
            _ => amount,
        }
    }
}

/// Proficiency bonus for a level: `ceil(level / 4) + 1`.
pub fn proficiency_bonus(level: u8) -> i32 {
    (level.max(1) as i32 + 3) / 4 + 1
}

/// Compute derived stats for `character`.
pub fn derive_stats(character: &Character) -> DerivedStats {
    let abilities = effective_abilities(character);
    let dex = abilities.modifier(Ability::Dexterity);
    let str_mod = abilities.modifier(Ability::Strength);
    let proficiency = proficiency_bonus(character.level);
    let effects = &character.status_effects;

    let armor_class = armor_class(character, dex);

    let (weapon_ability, dice, damage_type) = match character.equipment.main_hand() {
        Some(item) => match &item.kind {
            ItemKind::Weapon {
                damage,
                damage_type,
                ..
            } => {
                let ability = if item.is_ranged() || (item.is_finesse() && dex > str_mod) {
                    Ability::Dexterity
                } else {
                    Ability::Strength
                };
                (ability, damage.clone(), *damage_type)
            }
            _ => unarmed(),
        },
        None => unarmed(),
    };
    let weapon_mod = abilities.modifier(weapon_ability);
    let status_damage = saturating_sum(effects.iter().filter_map(|e| e.payload.damage));

    let proficient_saves: BTreeSet<Ability> = character
        .saving_throw_proficiencies
        .iter()
        .copied()
        .chain(character.class.saving_throws())
        .collect();
    let saving_throws = Ability::all()
        .into_iter()
        .map(|a| {
            let bonus = if proficient_saves.contains(&a) {
                proficiency
            } else {
                0
            };
            (a, abilities.modifier(a) + bonus)
        })
        .collect();
    let skills = Skill::all()
        .into_iter()
        .map(|s| {
            let bonus = if character.skill_proficiencies.contains(&s) {
                proficiency
            } else {
                0
            };
            (s, abilities.modifier(s.ability()) + bonus)
        })
        .collect();

    let spellcasting_ability = character.class.spellcasting_ability();
    let casting_mod = spellcasting_ability.map(|a| abilities.modifier(a));

    let speed = character
        .base_speed
        .saturating_add(saturating_sum(effects.iter().filter_map(|e| e.payload.speed)))
        .max(0);

    DerivedStats {
        armor_class,
        proficiency_bonus: proficiency,
        attack_bonus: proficiency.saturating_add(weapon_mod),
        damage: DamageFormula::new(dice, weapon_mod.saturating_add(status_damage), damage_type),
        saving_throws,
        skills,
        spellcasting_ability,
        spell_save_dc: casting_mod.map(|m| 8 + proficiency + m),
        spell_attack_bonus: casting_mod.map(|m| proficiency + m),
        carry_capacity: 15 * abilities.strength as i32,
        speed,
        resistances: effects
            .iter()
            .flat_map(|e| e.payload.resistances.iter().copied())
            .collect(),
        vulnerabilities: effects
            .iter()
            .flat_map(|e| e.payload.vulnerabilities.iter().copied())
            .collect(),
        disabled_actions: effects.iter().filter_map(|e| e.payload.disables).collect(),
        abilities,
    }
}

fn saturating_sum(values: impl Iterator<Item = i32>) -> i32 {
    values.fold(0, i32::saturating_add)
}

fn unarmed() -> (Ability, DiceExpression, DamageType) {
    (Ability::Strength, DiceExpression::flat(1), DamageType::Bludgeoning)
}

/// Base scores plus equipment and status bonuses, clamped to 1..=30.
fn effective_abilities(character: &Character) -> AbilityScores {
    let score = |ability: Ability| -> u8 {
        let items = saturating_sum(
            character
                .equipment
                .items()
                .filter_map(|(_, item)| item.ability_bonuses.get(&ability).copied()),
        );
        let effects = saturating_sum(
            character
                .status_effects
                .iter()
                .filter_map(|e| e.payload.ability_modifiers.get(&ability).copied()),
        );
        (character.ability_scores.get(ability) as i32)
            .saturating_add(items)
            .saturating_add(effects)
            .clamp(1, 30) as u8
    };
    AbilityScores::new(
        score(Ability::Strength),
        score(Ability::Dexterity),
        score(Ability::Constitution),
        score(Ability::Intelligence),
        score(Ability::Wisdom),
        score(Ability::Charisma),
    )
}

fn armor_class(character: &Character, dex: i32) -> i32 {
    let equipment = &character.equipment;

    let mut ac = match equipment.body().map(|item| &item.kind) {
        Some(ItemKind::Armor {
            armor_class,
            category,
        }) => match category.unwrap_or_else(|| ArmorCategory::from_rating(*armor_class)) {
            ArmorCategory::Light => armor_class.saturating_add(dex),
            ArmorCategory::Medium => {
                let cap = if character.has_feat(FEAT_MEDIUM_ARMOR_MASTER) {
                    MEDIUM_DEX_CAP_MASTER
                } else {
                    MEDIUM_DEX_CAP
                };
                armor_class.saturating_add(dex.min(cap))
            }
            ArmorCategory::Heavy => *armor_class,
        },
        _ => UNARMORED_BASE.saturating_add(dex),
    };

    if let Some(ItemKind::Shield { armor_class }) = equipment.off_hand().map(|item| &item.kind) {
        ac = ac.saturating_add(*armor_class);
    }

    let dual_wielding = equipment.main_hand().is_some_and(|i| i.is_weapon())
        && equipment.off_hand().is_some_and(|i| i.is_weapon());
    if dual_wielding && character.has_feat(FEAT_DUAL_WIELDER) {
        ac += 1;
    }

    ac = ac.saturating_add(saturating_sum(
        character.status_effects.iter().filter_map(|e| e.payload.armor_class),
    ));

    ac.max(1)
}
