//! Combat participants and turn ordering

use std::cmp::Reverse;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::hp::{HpChangeKind, HpOutcome};
use super::initiative::Initiative;
use crate::roster::{Monster, Player};

/// Participant variant.
///
/// Declaration order is the tie-break between equal initiatives: players act
/// before monsters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Player,
    Monster,
}

impl ParticipantKind {
    /// Stored form
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantKind::Player => "player",
            ParticipantKind::Monster => "monster",
        }
    }

    /// Parse the stored form
    pub fn parse(s: &str) -> Option<ParticipantKind> {
        match s {
            "player" => Some(ParticipantKind::Player),
            "monster" => Some(ParticipantKind::Monster),
            _ => None,
        }
    }
}

/// The stat record a participant was drawn from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatRef {
    pub id: String,
    pub name: String,
    pub armor_class: i32,
}

/// Who is fighting: a player character or a monster, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Combatant {
    Player(StatRef),
    Monster(StatRef),
}

impl Combatant {
    pub fn kind(&self) -> ParticipantKind {
        match self {
            Combatant::Player(_) => ParticipantKind::Player,
            Combatant::Monster(_) => ParticipantKind::Monster,
        }
    }

    pub fn stat_ref(&self) -> &StatRef {
        match self {
            Combatant::Player(r) | Combatant::Monster(r) => r,
        }
    }

    /// ID of the underlying player or monster record
    pub fn record_id(&self) -> &str {
        &self.stat_ref().id
    }

    pub fn name(&self) -> &str {
        &self.stat_ref().name
    }

    pub fn armor_class(&self) -> i32 {
        self.stat_ref().armor_class
    }
}

impl From<&Player> for Combatant {
    fn from(player: &Player) -> Self {
        Combatant::Player(StatRef {
            id: player.id.clone(),
            name: player.character_name.clone(),
            armor_class: player.armor_class,
        })
    }
}

impl From<&Monster> for Combatant {
    fn from(monster: &Monster) -> Self {
        Combatant::Monster(StatRef {
            id: monster.id.clone(),
            name: monster.name.clone(),
            armor_class: monster.armor_class,
        })
    }
}

/// One combatant's turn-tracking record within a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombatParticipant {
    pub id: String,
    pub session_id: String,
    /// Enrollment order, the final tie-break in turn order
    #[serde(skip)]
    pub seq: i64,
    pub combatant: Combatant,
    pub initiative: Initiative,
    pub current_hp: i32,
    pub max_hp: i32,
    pub is_dead: bool,
    pub turn_completed: bool,
}

impl CombatParticipant {
    /// Enroll a combatant in a session at full (seeded) hit points
    pub fn enlist(
        session_id: &str,
        seq: i64,
        combatant: Combatant,
        initiative: Initiative,
        hit_points: i32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            seq,
            combatant,
            initiative,
            current_hp: hit_points,
            max_hp: hit_points,
            is_dead: false,
            turn_completed: false,
        }
    }

    pub fn name(&self) -> &str {
        self.combatant.name()
    }

    pub fn armor_class(&self) -> i32 {
        self.combatant.armor_class()
    }

    pub fn kind(&self) -> ParticipantKind {
        self.combatant.kind()
    }

    /// Sort key: initiative descending, then players first, then enrollment
    pub fn turn_order_key(&self) -> (Reverse<Initiative>, ParticipantKind, i64) {
        (Reverse(self.initiative), self.kind(), self.seq)
    }

    /// Apply damage or healing.
    ///
    /// Damage floors hit points at zero and marks the participant dead once
    /// they reach it. Healing is capped at `max_hp` and always clears the
    /// dead flag, so it doubles as a revive.
    pub fn apply_hp_change(&mut self, kind: HpChangeKind, amount: u32) -> HpOutcome {
        let delta = i32::try_from(amount).unwrap_or(i32::MAX);

        match kind {
            HpChangeKind::Damage => {
                self.current_hp = self.current_hp.saturating_sub(delta);
                if self.current_hp <= 0 {
                    self.current_hp = 0;
                    self.is_dead = true;
                    HpOutcome::Killed {
                        name: self.name().to_string(),
                        amount,
                    }
                } else {
                    HpOutcome::Damaged {
                        name: self.name().to_string(),
                        amount,
                        current_hp: self.current_hp,
                    }
                }
            }
            HpChangeKind::Healing => {
                self.current_hp = self.current_hp.saturating_add(delta).min(self.max_hp);
                self.is_dead = false;
                HpOutcome::Healed {
                    name: self.name().to_string(),
                    amount,
                    current_hp: self.current_hp,
                }
            }
        }
    }
}

impl fmt::Display for CombatParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Initiative: {})", self.name(), self.initiative)
    }
}

/// Sort participants into turn order in place
pub fn sort_turn_order(participants: &mut [CombatParticipant]) {
    participants.sort_by_key(|p| p.turn_order_key());
}

/// Indices of living participants, in turn order.
///
/// Always recomputed from the current dead flags; a death between turns
/// shifts everyone after it down by one.
pub fn alive_order(participants: &[CombatParticipant]) -> Vec<usize> {
    let mut order: Vec<usize> = participants
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_dead)
        .map(|(i, _)| i)
        .collect();
    order.sort_by_key(|&i| participants[i].turn_order_key());
    order
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn monster(name: &str, initiative: u8, hp: i32) -> CombatParticipant {
        let combatant = Combatant::Monster(StatRef {
            id: format!("m-{}", name),
            name: name.to_string(),
            armor_class: 13,
        });
        CombatParticipant::enlist("s1", 0, combatant, Initiative::new(initiative.into()).unwrap(), hp)
    }

    pub(crate) fn player(name: &str, initiative: u8) -> CombatParticipant {
        let combatant = Combatant::Player(StatRef {
            id: format!("p-{}", name),
            name: name.to_string(),
            armor_class: 16,
        });
        CombatParticipant::enlist("s1", 0, combatant, Initiative::new(initiative.into()).unwrap(), 0)
    }

    #[test]
    fn test_damage_to_zero_kills() {
        let mut p = monster("Ogre", 10, 20);

        let outcome = p.apply_hp_change(HpChangeKind::Damage, 20);
        assert!(matches!(outcome, HpOutcome::Killed { amount: 20, .. }));
        assert_eq!(p.current_hp, 0);
        assert!(p.is_dead);

        // Hitting a corpse keeps HP floored at zero
        p.apply_hp_change(HpChangeKind::Damage, 5);
        assert_eq!(p.current_hp, 0);
        assert!(p.is_dead);
    }

    #[test]
    fn test_damage_below_zero_clamps() {
        let mut p = monster("Kobold", 10, 5);
        p.apply_hp_change(HpChangeKind::Damage, 12);
        assert_eq!(p.current_hp, 0);
        assert!(p.is_dead);
    }

    #[test]
    fn test_partial_damage_keeps_alive() {
        let mut p = monster("Ogre", 10, 59);
        let outcome = p.apply_hp_change(HpChangeKind::Damage, 9);
        assert_eq!(p.current_hp, 50);
        assert!(!p.is_dead);
        assert_eq!(outcome.to_string(), "Ogre takes 9 damage. Current HP: 50");
    }

    #[test]
    fn test_healing_revives_the_dead() {
        let mut p = monster("Troll", 10, 30);
        p.current_hp = 0;
        p.is_dead = true;

        p.apply_hp_change(HpChangeKind::Healing, 10);
        assert!(!p.is_dead);
        assert_eq!(p.current_hp, 10);
    }

    #[test]
    fn test_healing_clamps_to_max() {
        let mut p = monster("Troll", 10, 30);
        p.current_hp = 25;

        p.apply_hp_change(HpChangeKind::Healing, 100);
        assert_eq!(p.current_hp, 30);
    }

    #[test]
    fn test_healing_clears_dead_flag_even_when_alive() {
        // Healing always clears the flag, even on a living target
        let mut p = monster("Troll", 10, 30);
        p.apply_hp_change(HpChangeKind::Healing, 1);
        assert!(!p.is_dead);
        assert_eq!(p.current_hp, 30);
    }

    #[test]
    fn test_player_hp_is_not_tracked() {
        let mut p = player("Ana", 12);

        p.apply_hp_change(HpChangeKind::Healing, 10);
        assert_eq!((p.current_hp, p.max_hp), (0, 0));

        // Any damage to an untracked 0/0 pool drops the player
        p.apply_hp_change(HpChangeKind::Damage, 1);
        assert!(p.is_dead);
    }

    #[test]
    fn test_turn_order_ties_players_first() {
        let mut participants = vec![
            monster("Goblin", 15, 7),
            player("Ana", 15),
            monster("Wolf", 20, 11),
        ];
        sort_turn_order(&mut participants);

        let names: Vec<&str> = participants.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Wolf", "Ana", "Goblin"]);
    }

    #[test]
    fn test_turn_order_ties_by_enrollment() {
        let mut a = monster("A", 10, 5);
        let mut b = monster("B", 10, 5);
        a.seq = 1;
        b.seq = 0;
        let mut participants = vec![a, b];
        sort_turn_order(&mut participants);
        assert_eq!(participants[0].name(), "B");
    }

    #[test]
    fn test_alive_order_skips_dead() {
        let mut participants = vec![
            monster("C", 10, 5),
            monster("A", 30, 5),
            monster("B", 20, 5),
        ];
        participants[2].is_dead = true;

        let order = alive_order(&participants);
        let names: Vec<&str> = order.iter().map(|&i| participants[i].name()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_display() {
        let p = monster("Goblin", 14, 7);
        assert_eq!(p.to_string(), "Goblin (Initiative: 14)");
        assert_eq!(p.armor_class(), 13);
        assert_eq!(p.kind(), ParticipantKind::Monster);
    }

    #[test]
    fn test_serialized_shape() {
        let p = player("Ana", 12);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["combatant"]["type"], "player");
        assert_eq!(json["combatant"]["name"], "Ana");
        assert_eq!(json["initiative"], 12);
        assert!(json.get("seq").is_none());
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(ParticipantKind::parse("player"), Some(ParticipantKind::Player));
        assert_eq!(ParticipantKind::parse(ParticipantKind::Monster.as_str()), Some(ParticipantKind::Monster));
        assert_eq!(ParticipantKind::parse("npc"), None);
    }
}
