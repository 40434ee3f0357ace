//! XP, levels and point awards.
//!
//! Level is a pure function of cumulative XP through a [`LevelUpTable`]. The
//! [`ProgressionLedger`] is the only thing that mutates a player's
//! [`ProgressionState`], and it only does so by taking in XP or spending
//! points.

use ahash::AHashMap;
use aura_common::AuraError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::curve::{LevelCurve, ScalableFloat};

/// Progression error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    /// Level table has no levels
    #[error("level-up table is empty")]
    Empty,
    /// Requirements are not strictly ascending
    #[error("level {level} requires {requirement} XP, not above level {prev_level} ({previous})")]
    NonMonotonic {
        /// Offending level
        level: u32,
        /// Its requirement
        requirement: u32,
        /// Previous level
        prev_level: u32,
        /// Previous requirement
        previous: u32,
    },
    /// Nothing to spend
    #[error("no {0} points available")]
    NoPointsAvailable(PointKind),
}

/// Result type for progression operations.
pub type ProgressionResult<T> = Result<T, ProgressionError>;

impl From<ProgressionError> for AuraError {
    fn from(err: ProgressionError) -> Self {
        Self::Progression(err.to_string())
    }
}

/// Kind of spendable point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointKind {
    /// Spent on primary attributes
    Attribute,
    /// Spent on abilities
    Spell,
}

impl std::fmt::Display for PointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attribute => f.write_str("attribute"),
            Self::Spell => f.write_str("spell"),
        }
    }
}

// ============================================================================
// Level-Up Table
// ============================================================================

/// Requirement and awards for reaching one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelUpInfo {
    /// Cumulative XP needed for this level
    pub requirement: u32,
    /// Attribute points awarded on reaching it
    pub attribute_point_award: u32,
    /// Spell points awarded on reaching it
    pub spell_point_award: u32,
}

impl LevelUpInfo {
    /// Level with the default award of one point of each kind.
    #[must_use]
    pub const fn new(requirement: u32) -> Self {
        Self {
            requirement,
            attribute_point_award: 1,
            spell_point_award: 1,
        }
    }

    /// Sets the awards.
    #[must_use]
    pub const fn with_awards(mut self, attribute: u32, spell: u32) -> Self {
        self.attribute_point_award = attribute;
        self.spell_point_award = spell;
        self
    }
}

/// Ascending XP thresholds. Index 0 is level 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelUpTable {
    levels: Vec<LevelUpInfo>,
}

impl LevelUpTable {
    /// Validates and builds a table.
    pub fn new(levels: Vec<LevelUpInfo>) -> ProgressionResult<Self> {
        if levels.is_empty() {
            return Err(ProgressionError::Empty);
        }
        for (i, pair) in levels.windows(2).enumerate() {
            if pair[1].requirement <= pair[0].requirement {
                let prev_level = level_of_index(i);
                return Err(ProgressionError::NonMonotonic {
                    level: prev_level + 1,
                    requirement: pair[1].requirement,
                    prev_level,
                    previous: pair[0].requirement,
                });
            }
        }
        Ok(Self { levels })
    }

    /// Builds a table from bare requirements with one point of each kind per level.
    pub fn from_requirements(requirements: &[u32]) -> ProgressionResult<Self> {
        Self::new(requirements.iter().map(|r| LevelUpInfo::new(*r)).collect())
    }

    /// Highest level in the table.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        level_of_index(self.levels.len() - 1)
    }

    /// Info for a level, if it exists.
    #[must_use]
    pub fn info(&self, level: u32) -> Option<&LevelUpInfo> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.levels.get(index)
    }

    /// Highest level whose requirement is at most `xp`. Never below 1.
    #[must_use]
    pub fn find_level_for_xp(&self, xp: u32) -> u32 {
        let reached = self.levels.partition_point(|l| l.requirement <= xp);
        level_of_index(reached.saturating_sub(1))
    }

    /// Fraction of the way from the current level's requirement to the next.
    ///
    /// Returns 1.0 at max level.
    #[must_use]
    pub fn xp_progress(&self, xp: u32) -> f32 {
        let level = self.find_level_for_xp(xp);
        let (Some(current), Some(next)) = (self.info(level), self.info(level + 1)) else {
            return 1.0;
        };
        let span = next.requirement - current.requirement;
        let into = xp.saturating_sub(current.requirement);
        #[allow(clippy::cast_precision_loss)]
        let progress = into as f32 / span as f32;
        progress.clamp(0.0, 1.0)
    }
}

impl Default for LevelUpTable {
    /// Forty levels on a quadratic curve, one point of each kind per level.
    fn default() -> Self {
        let levels = (0..40u32)
            .map(|i| LevelUpInfo::new(150 * i * i + 150 * i))
            .collect();
        Self { levels }
    }
}

fn level_of_index(index: usize) -> u32 {
    u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(1))
}

// ============================================================================
// Ledger
// ============================================================================

/// Player progression values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    /// Cumulative XP
    pub xp: u32,
    /// Current level
    pub level: u32,
    /// Unspent attribute points
    pub attribute_points: u32,
    /// Unspent spell points
    pub spell_points: u32,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            attribute_points: 0,
            spell_points: 0,
        }
    }
}

/// Outcome of one XP grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelUpResult {
    /// XP after the grant
    pub xp: u32,
    /// Level before the grant
    pub old_level: u32,
    /// Level after the grant
    pub new_level: u32,
    /// Number of levels gained
    pub levels_gained: u32,
    /// Attribute points awarded by this grant
    pub attribute_points_awarded: u32,
    /// Spell points awarded by this grant
    pub spell_points_awarded: u32,
}

impl LevelUpResult {
    /// Whether at least one level was gained.
    #[must_use]
    pub const fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }
}

/// Owns a player's progression state and applies XP against a table.
#[derive(Debug, Clone)]
pub struct ProgressionLedger {
    state: ProgressionState,
    table: Arc<LevelUpTable>,
}

impl ProgressionLedger {
    /// Creates a level-1 ledger with no XP.
    #[must_use]
    pub fn new(table: Arc<LevelUpTable>) -> Self {
        Self {
            state: ProgressionState::default(),
            table,
        }
    }

    /// Creates a ledger at the start of `level`, clamped to the table.
    #[must_use]
    pub fn at_level(table: Arc<LevelUpTable>, level: u32) -> Self {
        let level = level.clamp(1, table.max_level());
        let xp = table.info(level).map_or(0, |i| i.requirement);
        Self {
            state: ProgressionState {
                xp,
                level,
                ..ProgressionState::default()
            },
            table,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &ProgressionState {
        &self.state
    }

    /// The level table.
    #[must_use]
    pub fn table(&self) -> &LevelUpTable {
        &self.table
    }

    /// Adds XP, awarding points for every level reached.
    pub fn grant_xp(&mut self, amount: u32) -> LevelUpResult {
        let old_level = self.state.level;
        let new_xp = self.state.xp.saturating_add(amount);
        let new_level = self.table.find_level_for_xp(new_xp).max(old_level);

        let mut result = LevelUpResult {
            xp: new_xp,
            old_level,
            new_level,
            ..LevelUpResult::default()
        };

        for level in (old_level + 1)..=new_level {
            if let Some(info) = self.table.info(level) {
                result.attribute_points_awarded += info.attribute_point_award;
                result.spell_points_awarded += info.spell_point_award;
            }
            result.levels_gained += 1;
        }

        if result.leveled_up() {
            self.state.level = new_level;
            self.state.attribute_points += result.attribute_points_awarded;
            self.state.spell_points += result.spell_points_awarded;
            info!(
                "Level up {old_level} -> {new_level} (+{} attribute, +{} spell points)",
                result.attribute_points_awarded, result.spell_points_awarded
            );
        }
        self.state.xp = new_xp;
        result
    }

    /// Fraction of the way to the next level.
    #[must_use]
    pub fn xp_progress(&self) -> f32 {
        self.table.xp_progress(self.state.xp)
    }

    /// Spends one attribute point. Returns the points left.
    pub fn spend_attribute_point(&mut self) -> ProgressionResult<u32> {
        Self::spend(&mut self.state.attribute_points, PointKind::Attribute)
    }

    /// Spends one spell point. Returns the points left.
    pub fn spend_spell_point(&mut self) -> ProgressionResult<u32> {
        Self::spend(&mut self.state.spell_points, PointKind::Spell)
    }

    fn spend(points: &mut u32, kind: PointKind) -> ProgressionResult<u32> {
        *points = points
            .checked_sub(1)
            .ok_or(ProgressionError::NoPointsAvailable(kind))?;
        Ok(*points)
    }
}

// ============================================================================
// Kill Rewards
// ============================================================================

/// Character archetype, used for kill rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    /// Caster
    Elementalist,
    /// Melee fighter
    Warrior,
    /// Archer
    Ranger,
}

/// XP awarded for killing a character, by class and level.
#[derive(Debug, Clone)]
pub struct XpRewardTable {
    rewards: AHashMap<CharacterClass, ScalableFloat>,
}

impl Default for XpRewardTable {
    fn default() -> Self {
        let base = LevelCurve::new(vec![(1.0, 20.0), (10.0, 110.0), (40.0, 500.0)]);
        let mut table = Self::empty();
        table.set(CharacterClass::Elementalist, ScalableFloat::curved(1.0, base.clone()));
        table.set(CharacterClass::Warrior, ScalableFloat::curved(1.25, base.clone()));
        table.set(CharacterClass::Ranger, ScalableFloat::curved(1.1, base));
        table
    }
}

impl XpRewardTable {
    /// A table with no classes.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rewards: AHashMap::new(),
        }
    }

    /// Sets the reward curve for a class.
    pub fn set(&mut self, class: CharacterClass, reward: ScalableFloat) {
        self.rewards.insert(class, reward);
    }

    /// XP for killing a `class` character at `level`. Unknown classes give 0.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn reward(&self, class: CharacterClass, level: u32) -> u32 {
        let Some(curve) = self.rewards.get(&class) else {
            warn!("No XP reward configured for {class:?}");
            return 0;
        };
        let value = curve.value_at_level(level as f32).round();
        value.clamp(0.0, u32::MAX as f32) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table() -> Arc<LevelUpTable> {
        Arc::new(LevelUpTable::from_requirements(&[0, 100, 300, 600]).expect("valid table"))
    }

    #[test]
    fn test_table_validation() {
        assert_eq!(LevelUpTable::new(Vec::new()), Err(ProgressionError::Empty));
        assert!(matches!(
            LevelUpTable::from_requirements(&[0, 100, 100]),
            Err(ProgressionError::NonMonotonic { level: 3, .. })
        ));
        assert_eq!(table().max_level(), 4);
    }

    #[test]
    fn test_default_table_is_valid() {
        let table = LevelUpTable::default();
        assert_eq!(LevelUpTable::new(table.levels.clone()), Ok(table.clone()));
        assert_eq!(table.max_level(), 40);
        assert_eq!(table.find_level_for_xp(300), 2);
    }

    #[test]
    fn test_find_level_for_xp() {
        let table = table();
        assert_eq!(table.find_level_for_xp(0), 1);
        assert_eq!(table.find_level_for_xp(99), 1);
        assert_eq!(table.find_level_for_xp(100), 2);
        assert_eq!(table.find_level_for_xp(350), 3);
        assert_eq!(table.find_level_for_xp(10_000), 4);

        let offset = LevelUpTable::from_requirements(&[50, 100]).expect("valid");
        assert_eq!(offset.find_level_for_xp(0), 1);
    }

    #[test]
    fn test_xp_progress() {
        let table = table();
        assert_eq!(table.xp_progress(0), 0.0);
        assert_eq!(table.xp_progress(200), 0.5);
        assert_eq!(table.xp_progress(600), 1.0);
        assert_eq!(table.xp_progress(9_999), 1.0);
    }

    #[test]
    fn test_grant_crosses_two_levels() {
        let table = Arc::new(
            LevelUpTable::new(vec![
                LevelUpInfo::new(0),
                LevelUpInfo::new(100).with_awards(1, 1),
                LevelUpInfo::new(300).with_awards(2, 1),
                LevelUpInfo::new(600),
            ])
            .expect("valid"),
        );
        let mut ledger = ProgressionLedger::new(table);
        let first = ledger.grant_xp(50);
        assert!(!first.leveled_up());
        assert_eq!(ledger.state().xp, 50);

        let result = ledger.grant_xp(300);
        assert_eq!(result.xp, 350);
        assert_eq!(result.old_level, 1);
        assert_eq!(result.new_level, 3);
        assert_eq!(result.levels_gained, 2);
        assert_eq!(result.attribute_points_awarded, 3);
        assert_eq!(result.spell_points_awarded, 2);
        assert_eq!(
            *ledger.state(),
            ProgressionState {
                xp: 350,
                level: 3,
                attribute_points: 3,
                spell_points: 2,
            }
        );
    }

    #[test]
    fn test_zero_grant_changes_nothing() {
        let mut ledger = ProgressionLedger::at_level(table(), 2);
        let before = *ledger.state();
        let result = ledger.grant_xp(0);
        assert!(!result.leveled_up());
        assert_eq!(*ledger.state(), before);
    }

    #[test]
    fn test_max_level_stops_leveling_but_keeps_xp() {
        let mut ledger = ProgressionLedger::at_level(table(), 4);
        let result = ledger.grant_xp(5_000);
        assert_eq!(result.levels_gained, 0);
        assert_eq!(ledger.state().xp, 5_600);
        assert_eq!(ledger.xp_progress(), 1.0);
    }

    #[test]
    fn test_spending_points() {
        let mut ledger = ProgressionLedger::new(table());
        assert_eq!(
            ledger.spend_spell_point(),
            Err(ProgressionError::NoPointsAvailable(PointKind::Spell))
        );
        ledger.grant_xp(100);
        assert_eq!(ledger.spend_attribute_point(), Ok(0));
        assert_eq!(ledger.spend_spell_point(), Ok(0));
        assert!(ledger.spend_attribute_point().is_err());
    }

    #[test]
    fn test_xp_rewards() {
        let rewards = XpRewardTable::default();
        assert_eq!(rewards.reward(CharacterClass::Elementalist, 1), 20);
        assert_eq!(rewards.reward(CharacterClass::Warrior, 1), 25);
        assert!(rewards.reward(CharacterClass::Ranger, 10) > rewards.reward(CharacterClass::Ranger, 1));
        assert_eq!(XpRewardTable::empty().reward(CharacterClass::Warrior, 5), 0);
    }

    #[test]
    fn test_error_into_aura_error() {
        let err: AuraError = ProgressionError::Empty.into();
        assert_eq!(err.to_string(), "Progression error: level-up table is empty");
    }

    proptest! {
        #[test]
        fn prop_level_lookup_is_monotonic(
            steps in proptest::collection::vec(1u32..500, 1..30),
            x in 0u32..20_000,
            y in 0u32..20_000,
        ) {
            let mut steps = steps;
            let mut requirement = 0;
            for step in &mut steps {
                requirement += *step;
                *step = requirement;
            }
            let table = LevelUpTable::from_requirements(&steps).expect("ascending");
            let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
            prop_assert!(table.find_level_for_xp(lo) <= table.find_level_for_xp(hi));
            prop_assert!(table.find_level_for_xp(lo) >= 1);
        }

        #[test]
        fn prop_grants_never_lower_level(grants in proptest::collection::vec(0u32..400, 0..20)) {
            let mut ledger = ProgressionLedger::new(table());
            let mut last = ledger.state().level;
            for amount in grants {
                ledger.grant_xp(amount);
                prop_assert!(ledger.state().level >= last);
                last = ledger.state().level;
            }
        }
    }
}
