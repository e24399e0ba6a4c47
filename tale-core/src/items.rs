//! Items and equipment slots.
//!
//! Items are plain data looked up from content tables. `Equipment` holds at
//! most one item per slot and refuses an off-hand item while the main hand
//! holds a two-handed weapon.

use crate::character::Ability;
use crate::dice::DiceExpression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Damage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Slashing,
    Piercing,
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Thunder,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Force,
    Psychic,
}

impl DamageType {
    pub fn name(&self) -> &'static str {
        match self {
            DamageType::Slashing => "slashing",
            DamageType::Piercing => "piercing",
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Thunder => "thunder",
            DamageType::Acid => "acid",
            DamageType::Poison => "poison",
            DamageType::Necrotic => "necrotic",
            DamageType::Radiant => "radiant",
            DamageType::Force => "force",
            DamageType::Psychic => "psychic",
        }
    }

    pub fn from_name(name: &str) -> Option<DamageType> {
        let all = [
            DamageType::Slashing,
            DamageType::Piercing,
            DamageType::Bludgeoning,
            DamageType::Fire,
            DamageType::Cold,
            DamageType::Lightning,
            DamageType::Thunder,
            DamageType::Acid,
            DamageType::Poison,
            DamageType::Necrotic,
            DamageType::Radiant,
            DamageType::Force,
            DamageType::Psychic,
        ];
        let name = name.trim().to_lowercase();
        all.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Armor weight class; decides how much DEX applies to AC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorCategory {
    Light,
    Medium,
    Heavy,
}

impl ArmorCategory {
    /// Classification for armor that carries no explicit tag.
    pub fn from_rating(armor_class: i32) -> Self {
        match armor_class {
            ac if ac >= 16 => ArmorCategory::Heavy,
            ac if ac >= 13 => ArmorCategory::Medium,
            _ => ArmorCategory::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponProperty {
    Finesse,
    Ranged,
    TwoHanded,
    Light,
}

/// What a consumable does when used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEffect {
    Heal { dice: DiceExpression },
    RestoreMana { amount: i32 },
    RestoreStamina { amount: i32 },
    ApplyStatus { effect_id: String },
}

/// Item category and category-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Weapon {
        damage: DiceExpression,
        damage_type: DamageType,
        #[serde(default)]
        properties: Vec<WeaponProperty>,
    },
    Armor {
        armor_class: i32,
        #[serde(default)]
        category: Option<ArmorCategory>,
    },
    Shield {
        armor_class: i32,
    },
    /// Rings, amulets, cloaks: worn in a fixed slot.
    Wearable {
        slot: EquipSlot,
    },
    Consumable {
        effect: ItemEffect,
    },
    Misc,
}

/// An item instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub ability_bonuses: BTreeMap<Ability, i32>,
    /// Value in the smallest currency denomination.
    #[serde(default)]
    pub value: i64,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            ability_bonuses: BTreeMap::new(),
            value: 0,
        }
    }

    pub fn weapon(
        id: impl Into<String>,
        name: impl Into<String>,
        damage: DiceExpression,
        damage_type: DamageType,
    ) -> Self {
        Self::new(
            id,
            name,
            ItemKind::Weapon {
                damage,
                damage_type,
                properties: Vec::new(),
            },
        )
    }

    pub fn armor(id: impl Into<String>, name: impl Into<String>, armor_class: i32) -> Self {
        Self::new(
            id,
            name,
            ItemKind::Armor {
                armor_class,
                category: None,
            },
        )
    }

    pub fn shield(id: impl Into<String>, name: impl Into<String>, armor_class: i32) -> Self {
        Self::new(id, name, ItemKind::Shield { armor_class })
    }

    pub fn with_properties(mut self, props: impl IntoIterator<Item = WeaponProperty>) -> Self {
        if let ItemKind::Weapon { properties, .. } = &mut self.kind {
            properties.extend(props);
        }
        self
    }

    pub fn with_category(mut self, tag: ArmorCategory) -> Self {
        if let ItemKind::Armor { category, .. } = &mut self.kind {
            *category = Some(tag);
        }
        self
    }

    pub fn with_bonus(mut self, ability: Ability, bonus: i32) -> Self {
        let entry = self.ability_bonuses.entry(ability).or_insert(0);
        *entry = entry.saturating_add(bonus);
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = value;
        self
    }

    fn has_property(&self, property: WeaponProperty) -> bool {
        matches!(&self.kind, ItemKind::Weapon { properties, .. } if properties.contains(&property))
    }

    pub fn is_weapon(&self) -> bool {
        matches!(self.kind, ItemKind::Weapon { .. })
    }

    pub fn is_finesse(&self) -> bool {
        self.has_property(WeaponProperty::Finesse)
    }

    pub fn is_ranged(&self) -> bool {
        self.has_property(WeaponProperty::Ranged)
    }

    pub fn is_two_handed(&self) -> bool {
        self.has_property(WeaponProperty::TwoHanded)
    }

    /// The slot an item goes to when no slot is requested.
    pub fn default_slot(&self) -> Option<EquipSlot> {
        match &self.kind {
            ItemKind::Weapon { .. } => Some(EquipSlot::MainHand),
            ItemKind::Armor { .. } => Some(EquipSlot::Body),
            ItemKind::Shield { .. } => Some(EquipSlot::OffHand),
            ItemKind::Wearable { slot } => Some(*slot),
            ItemKind::Consumable { .. } | ItemKind::Misc => None,
        }
    }

    fn fits(&self, slot: EquipSlot) -> bool {
        match &self.kind {
            ItemKind::Weapon { .. } => match slot {
                EquipSlot::MainHand => true,
                EquipSlot::OffHand => !self.is_two_handed(),
                _ => false,
            },
            ItemKind::Armor { .. } => slot == EquipSlot::Body,
            ItemKind::Shield { .. } => slot == EquipSlot::OffHand,
            ItemKind::Wearable { slot: own } => *own == slot,
            ItemKind::Consumable { .. } | ItemKind::Misc => false,
        }
    }
}

/// Equipment slots, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    MainHand,
    OffHand,
    Body,
    Head,
    Hands,
    Feet,
    Neck,
    Ring,
}

impl EquipSlot {
    pub fn name(&self) -> &'static str {
        match self {
            EquipSlot::MainHand => "main hand",
            EquipSlot::OffHand => "off hand",
            EquipSlot::Body => "body",
            EquipSlot::Head => "head",
            EquipSlot::Hands => "hands",
            EquipSlot::Feet => "feet",
            EquipSlot::Neck => "neck",
            EquipSlot::Ring => "ring",
        }
    }
}

impl fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Why an item could not be equipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EquipError {
    #[error("{0} cannot be equipped")]
    NotEquippable(String),

    #[error("{item} does not fit the {slot} slot")]
    WrongSlot { item: String, slot: EquipSlot },

    #[error("{main_hand} needs both hands")]
    HandsFull { main_hand: String },
}

/// Items currently worn or wielded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    slots: BTreeMap<EquipSlot, Item>,
}

/// Result of a successful equip: the new loadout and whatever it pushed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Equipped {
    pub equipment: Equipment,
    pub displaced: Vec<Item>,
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: EquipSlot) -> Option<&Item> {
        self.slots.get(&slot)
    }

    pub fn main_hand(&self) -> Option<&Item> {
        self.get(EquipSlot::MainHand)
    }

    pub fn off_hand(&self) -> Option<&Item> {
        self.get(EquipSlot::OffHand)
    }

    pub fn body(&self) -> Option<&Item> {
        self.get(EquipSlot::Body)
    }

    pub fn items(&self) -> impl Iterator<Item = (EquipSlot, &Item)> {
        self.slots.iter().map(|(slot, item)| (*slot, item))
    }

    /// Equip `item` into `slot` (or its default slot).
    ///
    /// A two-handed main-hand weapon also pushes out the off-hand item.
    pub fn equip(self, item: Item, slot: Option<EquipSlot>) -> Result<Equipped, EquipError> {
        let slot = match slot.or_else(|| item.default_slot()) {
            Some(slot) => slot,
            None => return Err(EquipError::NotEquippable(item.name)),
        };
        if !item.fits(slot) {
            return Err(EquipError::WrongSlot {
                item: item.name,
                slot,
            });
        }
        if slot == EquipSlot::OffHand {
            if let Some(main) = self.main_hand().filter(|m| m.is_two_handed()) {
                return Err(EquipError::HandsFull {
                    main_hand: main.name.clone(),
                });
            }
        }

        let mut slots = self.slots;
        let mut displaced = Vec::new();
        if slot == EquipSlot::MainHand && item.is_two_handed() {
            displaced.extend(slots.remove(&EquipSlot::OffHand));
        }
        displaced.extend(slots.insert(slot, item));

        Ok(Equipped {
            equipment: Self { slots },
            displaced,
        })
    }

    /// Remove whatever is in `slot`.
    pub fn unequip(self, slot: EquipSlot) -> (Equipment, Option<Item>) {
        let mut slots = self.slots;
        let removed = slots.remove(&slot);
        (Self { slots }, removed)
    }
}
