//! Dice notation and roll sources.
//!
//! Supports the notation used by weapons, enemies and spells: `XdY+Z`,
//! several dice terms (`2d6+1d4+3`) and bare flat values (`1`).
//!
//! Every roll in the kernel goes through a [`RollSource`] so that combat,
//! flee checks and level-ups can be replayed with scripted results.

use rand::rngs::{StdRng, ThreadRng};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
    #[error("Too many dice in one term: {0} (max 100)")]
    TooManyDice(u32),
}

/// Largest dice count a single `XdY` term may ask for.
pub const MAX_DICE_PER_TERM: u32 = 100;

/// Something that can roll a single die.
///
/// Implemented for the `rand` generators used at runtime and for
/// `testing::ScriptedRolls` in tests.
pub trait RollSource {
    /// Roll one die, returning a value in `1..=sides`.
    fn roll_die(&mut self, sides: u32) -> u32;

    fn d20(&mut self) -> u32 {
        self.roll_die(20)
    }

    /// Percentile check that succeeds with `percent`% probability.
    fn chance(&mut self, percent: u32) -> bool {
        self.roll_die(100) <= percent
    }

    /// Uniform index into a collection of `len` elements (`len > 0`).
    fn pick(&mut self, len: usize) -> usize {
        let len = len.max(1) as u32;
        (self.roll_die(len) - 1) as usize
    }
}

impl RollSource for StdRng {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.gen_range(1..=sides.max(1))
    }
}

impl RollSource for ThreadRng {
    fn roll_die(&mut self, sides: u32) -> u32 {
        self.gen_range(1..=sides.max(1))
    }
}

/// Standard die types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
            DieType::D100 => 100,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            100 => Some(DieType::D100),
            _ => None,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// One `XdY` term of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceTerm {
    pub count: u32,
    pub die_type: DieType,
}

/// A parsed dice expression (e.g. `2d6+3`).
///
/// Serializes as its notation string so content tables and saves stay
/// readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceExpression {
    pub terms: Vec<DiceTerm>,
    pub modifier: i32,
}

impl DiceExpression {
    /// Parse a dice notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut terms = Vec::new();
        let mut modifier: i32 = 0;
        let mut current = String::new();
        let mut sign: i32 = 1;
        let mut saw_value = false;

        for ch in notation.chars() {
            match ch {
                '+' | '-' => {
                    if !current.is_empty() {
                        Self::parse_term(&current, sign, &mut terms, &mut modifier)?;
                        saw_value = true;
                        current.clear();
                    }
                    sign = if ch == '+' { 1 } else { -1 };
                }
                ' ' => continue,
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            Self::parse_term(&current, sign, &mut terms, &mut modifier)?;
            saw_value = true;
        }

        if !saw_value {
            return Err(DiceError::NoDice);
        }

        Ok(Self { terms, modifier })
    }

    fn parse_term(
        s: &str,
        sign: i32,
        terms: &mut Vec<DiceTerm>,
        modifier: &mut i32,
    ) -> Result<(), DiceError> {
        let Some(d_pos) = s.find('d') else {
            let value: i32 = s
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
            *modifier = value
                .checked_mul(sign)
                .and_then(|v| modifier.checked_add(v))
                .ok_or_else(|| DiceError::InvalidNotation(s.to_string()))?;
            return Ok(());
        };

        // Negative dice terms have no meaning for damage rolls.
        if sign < 0 {
            return Err(DiceError::InvalidNotation(s.to_string()));
        }

        let count_str = &s[..d_pos];
        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
        };
        let sides: u32 = s[d_pos + 1..]
            .parse()
            .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
        let die_type = DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))?;
        if count > MAX_DICE_PER_TERM {
            return Err(DiceError::TooManyDice(count));
        }

        if count > 0 {
            terms.push(DiceTerm { count, die_type });
        }
        Ok(())
    }

    /// A flat value with no dice.
    pub fn flat(value: i32) -> Self {
        Self {
            terms: Vec::new(),
            modifier: value,
        }
    }

    /// A single `1dY` term.
    pub fn single(die_type: DieType) -> Self {
        Self {
            terms: vec![DiceTerm { count: 1, die_type }],
            modifier: 0,
        }
    }

    /// The same dice with `bonus` added to the flat modifier.
    pub fn with_bonus(mut self, bonus: i32) -> Self {
        self.modifier = self.modifier.saturating_add(bonus);
        self
    }

    pub fn has_dice(&self) -> bool {
        !self.terms.is_empty()
    }

    pub fn min(&self) -> i32 {
        self.terms
            .iter()
            .fold(0i32, |acc, t| acc.saturating_add(clamp_count(t.count as i64)))
            .saturating_add(self.modifier)
    }

    pub fn max(&self) -> i32 {
        self.terms
            .iter()
            .fold(0i32, |acc, t| {
                acc.saturating_add(clamp_count(t.count as i64 * t.die_type.sides() as i64))
            })
            .saturating_add(self.modifier)
    }

    /// Roll the expression.
    pub fn roll<R: RollSource + ?Sized>(&self, rolls: &mut R) -> RollResult {
        let mut dice = Vec::new();
        for term in &self.terms {
            for _ in 0..term.count.min(MAX_DICE_PER_TERM) {
                dice.push(rolls.roll_die(term.die_type.sides()));
            }
        }

        let dice_total = dice
            .iter()
            .fold(0i32, |acc, &r| acc.saturating_add(clamp_count(r as i64)));
        let single_d20 = self.terms.len() == 1
            && self.terms[0].count == 1
            && self.terms[0].die_type == DieType::D20;

        RollResult {
            natural_20: single_d20 && dice.first() == Some(&20),
            natural_1: single_d20 && dice.first() == Some(&1),
            total: dice_total.saturating_add(self.modifier),
            modifier: self.modifier,
            dice,
        }
    }
}

fn clamp_count(value: i64) -> i32 {
    value.clamp(0, i32::MAX as i64) as i32
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl TryFrom<String> for DiceExpression {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DiceExpression::parse(&value)
    }
}

impl From<DiceExpression> for String {
    fn from(expr: DiceExpression) -> Self {
        expr.to_string()
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .terms
            .iter()
            .map(|t| format!("{}{}", t.count, t.die_type))
            .collect();
        let dice = terms.join("+");

        match (dice.is_empty(), self.modifier) {
            (true, m) => write!(f, "{m}"),
            (false, 0) => write!(f, "{dice}"),
            (false, m) if m > 0 => write!(f, "{dice}+{m}"),
            (false, m) => write!(f, "{dice}-{}", m.unsigned_abs()),
        }
    }
}

/// Result of rolling an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub dice: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
    pub natural_20: bool,
    pub natural_1: bool,
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dice: Vec<String> = self.dice.iter().map(|r| r.to_string()).collect();
        match self.modifier {
            0 => write!(f, "[{}] = {}", dice.join(", "), self.total),
            m if m > 0 => write!(f, "[{}] + {} = {}", dice.join(", "), m, self.total),
            m => write!(f, "[{}] - {} = {}", dice.join(", "), m.unsigned_abs(), self.total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRolls;
    use rand::SeedableRng;

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpression::parse("1d20").unwrap();
        assert_eq!(expr.terms.len(), 1);
        assert_eq!(expr.terms[0].count, 1);
        assert_eq!(expr.terms[0].die_type, DieType::D20);
        assert_eq!(expr.modifier, 0);
    }

    #[test]
    fn test_parse_with_modifier() {
        assert_eq!(DiceExpression::parse("1d8+5").unwrap().modifier, 5);
        assert_eq!(DiceExpression::parse("2d6-2").unwrap().modifier, -2);
        assert_eq!(DiceExpression::parse(" 1D6 + 1 ").unwrap().modifier, 1);
    }

    #[test]
    fn test_parse_flat_and_multi() {
        let flat = DiceExpression::parse("1").unwrap();
        assert!(!flat.has_dice());
        assert_eq!(flat.modifier, 1);

        let multi = DiceExpression::parse("2d6+1d4+3").unwrap();
        assert_eq!(multi.terms.len(), 2);
        assert_eq!(multi.modifier, 3);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(DiceExpression::parse(""), Err(DiceError::NoDice));
        assert_eq!(DiceExpression::parse("1d7"), Err(DiceError::InvalidDieSize(7)));
        assert!(DiceExpression::parse("xd6").is_err());
        assert!(DiceExpression::parse("3-1d6").is_err());
    }

    #[test]
    fn test_parse_rejects_overflow_and_huge_counts() {
        assert!(matches!(
            DiceExpression::parse("2147483647+1"),
            Err(DiceError::InvalidNotation(_))
        ));
        assert!(DiceExpression::parse("1d6-2147483647-5").is_err());
        assert_eq!(
            DiceExpression::parse("999999999d20"),
            Err(DiceError::TooManyDice(999_999_999))
        );
        assert!(DiceExpression::parse("100d20").is_ok());
    }

    #[test]
    fn test_extreme_modifiers_saturate() {
        let expr = DiceExpression::flat(i32::MAX).with_bonus(5);
        assert_eq!(expr.modifier, i32::MAX);
        assert_eq!(expr.max(), i32::MAX);

        let mut rolls = ScriptedRolls::new([6]);
        let result = DiceExpression::parse("1d6+2147483647").unwrap().roll(&mut rolls);
        assert_eq!(result.total, i32::MAX);

        let low = DiceExpression::parse("1d4").unwrap().with_bonus(i32::MIN);
        assert_eq!(low.to_string(), "1d4-2147483648");
    }

    #[test]
    fn test_display_round_trips_notation() {
        assert_eq!(DiceExpression::parse("1d8+2").unwrap().to_string(), "1d8+2");
        assert_eq!(DiceExpression::parse("2d6-1").unwrap().to_string(), "2d6-1");
        assert_eq!(DiceExpression::flat(3).to_string(), "3");
    }

    #[test]
    fn test_with_bonus_keeps_dice() {
        let expr = DiceExpression::parse("1d6+1").unwrap().with_bonus(2);
        assert_eq!(expr.to_string(), "1d6+3");
        assert_eq!(expr.terms[0].die_type, DieType::D6);
    }

    #[test]
    fn test_roll_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let expr = DiceExpression::parse("1d20+5").unwrap();
        for _ in 0..200 {
            let result = expr.roll(&mut rng);
            assert!(result.total >= 6 && result.total <= 25);
        }
    }

    #[test]
    fn test_scripted_roll() {
        let mut rolls = ScriptedRolls::new([4, 6]);
        let result = DiceExpression::parse("2d6+1").unwrap().roll(&mut rolls);
        assert_eq!(result.dice, vec![4, 6]);
        assert_eq!(result.total, 11);
    }

    #[test]
    fn test_natural_twenty_detection() {
        let mut rolls = ScriptedRolls::new([20]);
        let result = DiceExpression::single(DieType::D20).roll(&mut rolls);
        assert!(result.natural_20);
        assert!(!result.natural_1);
    }

    #[test]
    fn test_serde_as_string() {
        let expr = DiceExpression::parse("1d10+4").unwrap();
        let json = serde_json::to_string(&expr).unwrap();
        assert_eq!(json, "\"1d10+4\"");
        let back: DiceExpression = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expr);
    }
}
