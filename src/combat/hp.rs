//! Hit point parsing and change requests
//!
//! Monster stat blocks store hit points as free text such as
//! "82 (10d11 + 26)": the average followed by the dice expression. Combat
//! only needs the leading average.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{FieldError, FieldErrors};

/// Longest notes accepted on an HP change
pub const MAX_NOTES_LEN: usize = 200;

/// ASCII digits only; `\d` would also accept other Unicode digit classes
static LEADING_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+").unwrap());

/// Extract the leading integer from a monster's hit point text.
///
/// Missing, blank or non-numeric text yields 0 rather than an error so a
/// badly entered stat block never blocks combat from starting. A number too
/// large for `i32` saturates at `i32::MAX`.
///
/// ```
/// use trackerd::combat::parse_monster_hp;
///
/// assert_eq!(parse_monster_hp(Some("82 (10d11 + 26)")), 82);
/// assert_eq!(parse_monster_hp(Some("invalid")), 0);
/// assert_eq!(parse_monster_hp(None), 0);
/// ```
pub fn parse_monster_hp(hit_points: Option<&str>) -> i32 {
    let Some(text) = hit_points else {
        return 0;
    };

    match LEADING_DIGITS.find(text.trim()) {
        // Only overflow can fail once the regex matched
        Some(m) => m.as_str().parse::<i32>().unwrap_or(i32::MAX),
        None => 0,
    }
}

/// Direction of a hit point change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HpChangeKind {
    Damage,
    Healing,
}

impl HpChangeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "damage" => Some(HpChangeKind::Damage),
            "healing" => Some(HpChangeKind::Healing),
            _ => None,
        }
    }
}

impl fmt::Display for HpChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HpChangeKind::Damage => write!(f, "damage"),
            HpChangeKind::Healing => write!(f, "healing"),
        }
    }
}

/// A requested damage or healing change, as submitted by the caller.
///
/// `change_type` and `amount` stay untyped until [`HpChange::validate`] so
/// that a wrong value becomes a field error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HpChange {
    #[serde(default)]
    pub change_type: Option<Value>,
    #[serde(default)]
    pub amount: Option<Value>,
    /// Flavor text ("Fireball", "Cure Wounds"); recorded in logs only
    #[serde(default)]
    pub notes: Option<String>,
}

impl HpChange {
    pub fn damage(amount: i64) -> Self {
        Self {
            change_type: Some(Value::from("damage")),
            amount: Some(Value::from(amount)),
            notes: None,
        }
    }

    pub fn healing(amount: i64) -> Self {
        Self {
            change_type: Some(Value::from("healing")),
            amount: Some(Value::from(amount)),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check the request and return the change kind and a positive amount
    pub fn validate(&self) -> Result<(HpChangeKind, u32), Vec<FieldError>> {
        let mut errors = FieldErrors::new();

        let kind = match &self.change_type {
            None | Some(Value::Null) => {
                errors.push("change_type", "This field is required.");
                None
            }
            Some(Value::String(s)) => {
                let kind = HpChangeKind::parse(s);
                if kind.is_none() {
                    errors.push(
                        "change_type",
                        format!("Select a valid choice. {} is not one of the available choices.", s),
                    );
                }
                kind
            }
            Some(_) => {
                errors.push("change_type", "Select a valid choice.");
                None
            }
        };

        let amount = match errors.whole_number("amount", self.amount.as_ref()) {
            None => None,
            Some(a) if a < 1 => {
                errors.push("amount", "Ensure this value is greater than or equal to 1.");
                None
            }
            Some(a) => match u32::try_from(a) {
                Ok(a) => Some(a),
                Err(_) => {
                    errors.push("amount", "Ensure this value is a reasonable number.");
                    None
                }
            },
        };

        if let Some(notes) = &self.notes {
            errors.max_length("notes", notes, MAX_NOTES_LEN);
        }

        errors.finish()?;

        match (kind, amount) {
            (Some(kind), Some(amount)) => Ok((kind, amount)),
            _ => Err(vec![FieldError::new("amount", "This field is required.")]),
        }
    }
}

/// Result of applying a hit point change to a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum HpOutcome {
    /// Took damage and is still standing
    Damaged {
        name: String,
        amount: u32,
        current_hp: i32,
    },
    /// Damage brought hit points to zero
    Killed { name: String, amount: u32 },
    /// Healed; always leaves the participant alive
    Healed {
        name: String,
        amount: u32,
        current_hp: i32,
    },
}

impl fmt::Display for HpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HpOutcome::Damaged {
                name,
                amount,
                current_hp,
            } => write!(f, "{} takes {} damage. Current HP: {}", name, amount, current_hp),
            HpOutcome::Killed { name, amount } => {
                write!(f, "{} takes {} damage and is now dead!", name, amount)
            }
            HpOutcome::Healed {
                name,
                amount,
                current_hp,
            } => write!(f, "{} is healed for {} HP. Current HP: {}", name, amount, current_hp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_monster_hp() {
        assert_eq!(parse_monster_hp(Some("82 (10d11 + 26)")), 82);
        assert_eq!(parse_monster_hp(Some("")), 0);
        assert_eq!(parse_monster_hp(None), 0);
        assert_eq!(parse_monster_hp(Some("invalid")), 0);
        assert_eq!(parse_monster_hp(Some("7")), 7);
    }

    #[test]
    fn test_parse_monster_hp_edges() {
        // Leading whitespace is trimmed
        assert_eq!(parse_monster_hp(Some("  45 (6d10 + 12)")), 45);
        // Only a leading number counts
        assert_eq!(parse_monster_hp(Some("HP 45")), 0);
        assert_eq!(parse_monster_hp(Some("+5")), 0);
        // Non-ASCII digits are not decimal digits here
        assert_eq!(parse_monster_hp(Some("٣٣")), 0);
        // Overflow saturates
        assert_eq!(parse_monster_hp(Some("99999999999999")), i32::MAX);
        assert_eq!(parse_monster_hp(Some("2147483648 (huge)")), i32::MAX);
        assert_eq!(parse_monster_hp(Some("2147483647")), i32::MAX);
    }

    #[test]
    fn test_validate_hp_change() {
        let (kind, amount) = HpChange::damage(12).validate().unwrap();
        assert_eq!(kind, HpChangeKind::Damage);
        assert_eq!(amount, 12);

        let errors = HpChange::healing(0).validate().unwrap_err();
        assert_eq!(errors[0].field, "amount");
    }

    #[test]
    fn test_validate_hp_change_required_fields() {
        let errors = HpChange::default().validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["change_type", "amount"]);
    }

    #[test]
    fn test_validate_hp_change_notes_optional_but_bounded() {
        assert!(HpChange::damage(3).with_notes("Fireball").validate().is_ok());

        let errors = HpChange::damage(3)
            .with_notes("x".repeat(MAX_NOTES_LEN + 1))
            .validate()
            .unwrap_err();
        assert_eq!(errors[0].field, "notes");
    }

    #[test]
    fn test_hp_change_from_json() {
        let change: HpChange = serde_json::from_value(serde_json::json!({
            "change_type": "healing",
            "amount": 8,
            "notes": "Cure Wounds"
        }))
        .unwrap();
        assert_eq!(change.validate().unwrap(), (HpChangeKind::Healing, 8));
    }

    #[test]
    fn test_validate_hp_change_rejects_wrong_types() {
        let change: HpChange = serde_json::from_value(serde_json::json!({
            "change_type": "damage",
            "amount": "five"
        }))
        .unwrap();
        let errors = change.validate().unwrap_err();
        assert_eq!(errors, vec![FieldError::new("amount", "Enter a whole number.")]);

        let change: HpChange = serde_json::from_value(serde_json::json!({
            "change_type": "poison",
            "amount": 2.5
        }))
        .unwrap();
        let errors = change.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["change_type", "amount"]);
        assert!(errors[0].message.starts_with("Select a valid choice."));

        // Integer strings are accepted
        let change: HpChange = serde_json::from_value(serde_json::json!({
            "change_type": "damage",
            "amount": "4"
        }))
        .unwrap();
        assert_eq!(change.validate().unwrap(), (HpChangeKind::Damage, 4));
    }

    #[test]
    fn test_outcome_messages() {
        let killed = HpOutcome::Killed {
            name: "Goblin".into(),
            amount: 7,
        };
        assert_eq!(killed.to_string(), "Goblin takes 7 damage and is now dead!");

        let healed = HpOutcome::Healed {
            name: "Ana".into(),
            amount: 4,
            current_hp: 10,
        };
        assert_eq!(healed.to_string(), "Ana is healed for 4 HP. Current HP: 10");
    }
}
