//! Ability metadata and per-player ability status.
//!
//! Lookups by unknown tag are not fatal: they log and return a blank
//! [`AbilityInfo`] so that UI consumers keep working with degraded data.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error};

/// Hierarchical ability tag, e.g. `Abilities.Fire.FireBolt`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AbilityTag(String);

impl AbilityTag {
    /// Creates a tag.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Tag name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the tag is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AbilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AbilityTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Where an ability stands for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AbilityStatus {
    /// Level too low
    #[default]
    Locked,
    /// Can be unlocked with a spell point
    Eligible,
    /// Unlocked but not on a hotbar slot
    Unlocked,
    /// Unlocked and slotted
    Equipped,
}

impl AbilityStatus {
    /// Tag name, e.g. `Abilities.Status.Locked`.
    #[must_use]
    pub const fn tag_name(self) -> &'static str {
        match self {
            Self::Locked => "Abilities.Status.Locked",
            Self::Eligible => "Abilities.Status.Eligible",
            Self::Unlocked => "Abilities.Status.Unlocked",
            Self::Equipped => "Abilities.Status.Equipped",
        }
    }
}

/// Ability status transition errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbilityError {
    /// Ability is not in the book
    #[error("unknown ability {0}")]
    Unknown(AbilityTag),
    /// Transition not allowed from the current status
    #[error("cannot move {ability} from {from:?} to {to:?}")]
    InvalidTransition {
        /// Ability
        ability: AbilityTag,
        /// Current status
        from: AbilityStatus,
        /// Requested status
        to: AbilityStatus,
    },
}

/// Result type for ability operations.
pub type AbilityResult<T> = Result<T, AbilityError>;

/// Display and unlock data for one ability.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AbilityInfo {
    /// Ability tag
    pub tag: AbilityTag,
    /// Display name
    pub name: String,
    /// Menu description
    pub description: String,
    /// Player level needed to become eligible
    pub level_requirement: u32,
    /// Cooldown in seconds
    pub cooldown: f32,
}

impl AbilityInfo {
    /// Creates an info record.
    #[must_use]
    pub fn new(tag: impl Into<AbilityTag>, name: &str, level_requirement: u32) -> Self {
        Self {
            tag: tag.into(),
            name: name.to_string(),
            description: String::new(),
            level_requirement,
            cooldown: 0.0,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Sets the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.cooldown = seconds;
        self
    }
}

/// Lookup table of ability metadata.
#[derive(Debug, Clone, Default)]
pub struct AbilityInfoRegistry {
    infos: AHashMap<AbilityTag, AbilityInfo>,
}

impl AbilityInfoRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the stock spells.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            AbilityInfo::new("Abilities.Fire.FireBolt", "Fire Bolt", 1)
                .with_description("Launches a bolt of fire that may ignite the target.")
                .with_cooldown(1.0),
        );
        registry.register(
            AbilityInfo::new("Abilities.Lightning.Electrocute", "Electrocute", 2)
                .with_description("Channels a beam that may stun the target.")
                .with_cooldown(2.0),
        );
        registry.register(
            AbilityInfo::new("Abilities.Arcane.ArcaneShards", "Arcane Shards", 4)
                .with_description("Erupts arcane shards beneath the target.")
                .with_cooldown(4.0),
        );
        registry
    }

    /// Adds or replaces an entry.
    pub fn register(&mut self, info: AbilityInfo) {
        self.infos.insert(info.tag.clone(), info);
    }

    /// Looks up an ability. Unknown tags return a blank record.
    #[must_use]
    pub fn find(&self, tag: &AbilityTag, log_not_found: bool) -> AbilityInfo {
        if let Some(info) = self.infos.get(tag) {
            return info.clone();
        }
        if log_not_found {
            error!("Can't find info for ability tag [{tag}]");
        }
        AbilityInfo::default()
    }

    /// All registered abilities.
    pub fn iter(&self) -> impl Iterator<Item = &AbilityInfo> {
        self.infos.values()
    }

    /// Number of registered abilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

/// Per-player ability statuses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbilityBook {
    statuses: BTreeMap<AbilityTag, AbilityStatus>,
}

impl AbilityBook {
    /// A book with every registered ability locked.
    #[must_use]
    pub fn new(registry: &AbilityInfoRegistry) -> Self {
        Self {
            statuses: registry
                .iter()
                .filter(|info| !info.tag.is_empty())
                .map(|info| (info.tag.clone(), AbilityStatus::Locked))
                .collect(),
        }
    }

    /// Status of an ability; unknown abilities read as locked.
    #[must_use]
    pub fn status(&self, tag: &AbilityTag) -> AbilityStatus {
        self.statuses.get(tag).copied().unwrap_or_default()
    }

    /// Marks locked abilities whose requirement `level` meets as eligible.
    ///
    /// Returns the abilities that changed, in tag order.
    pub fn update_statuses(
        &mut self,
        level: u32,
        registry: &AbilityInfoRegistry,
    ) -> Vec<(AbilityTag, AbilityStatus)> {
        let mut changed = Vec::new();
        for (tag, status) in &mut self.statuses {
            if *status != AbilityStatus::Locked {
                continue;
            }
            let info = registry.find(tag, true);
            if !info.tag.is_empty() && level >= info.level_requirement {
                *status = AbilityStatus::Eligible;
                debug!("{tag} is now eligible at level {level}");
                changed.push((tag.clone(), AbilityStatus::Eligible));
            }
        }
        changed
    }

    /// Moves an eligible ability to unlocked.
    pub fn unlock(&mut self, tag: &AbilityTag) -> AbilityResult<AbilityStatus> {
        self.transition(tag, AbilityStatus::Eligible, AbilityStatus::Unlocked)
    }

    /// Moves an unlocked ability to equipped.
    pub fn equip(&mut self, tag: &AbilityTag) -> AbilityResult<AbilityStatus> {
        self.transition(tag, AbilityStatus::Unlocked, AbilityStatus::Equipped)
    }

    fn transition(
        &mut self,
        tag: &AbilityTag,
        from: AbilityStatus,
        to: AbilityStatus,
    ) -> AbilityResult<AbilityStatus> {
        let status = self
            .statuses
            .get_mut(tag)
            .ok_or_else(|| AbilityError::Unknown(tag.clone()))?;
        if *status != from {
            return Err(AbilityError::InvalidTransition {
                ability: tag.clone(),
                from: *status,
                to,
            });
        }
        *status = to;
        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_and_unknown() {
        let registry = AbilityInfoRegistry::with_defaults();
        let bolt = registry.find(&"Abilities.Fire.FireBolt".into(), true);
        assert_eq!(bolt.name, "Fire Bolt");
        assert_eq!(bolt.level_requirement, 1);

        let missing = registry.find(&"Abilities.Nope".into(), true);
        assert_eq!(missing, AbilityInfo::default());
        assert!(missing.description.is_empty());
    }

    #[test]
    fn test_status_progression() {
        let registry = AbilityInfoRegistry::with_defaults();
        let mut book = AbilityBook::new(&registry);
        let bolt = AbilityTag::from("Abilities.Fire.FireBolt");
        let shards = AbilityTag::from("Abilities.Arcane.ArcaneShards");

        let changed = book.update_statuses(2, &registry);
        assert_eq!(changed.len(), 2);
        assert_eq!(book.status(&bolt), AbilityStatus::Eligible);
        assert_eq!(book.status(&shards), AbilityStatus::Locked);

        // Already eligible abilities are not reported again
        assert!(book.update_statuses(3, &registry).is_empty());
        assert_eq!(book.update_statuses(4, &registry), vec![(shards, AbilityStatus::Eligible)]);

        assert_eq!(book.unlock(&bolt), Ok(AbilityStatus::Unlocked));
        assert_eq!(book.equip(&bolt), Ok(AbilityStatus::Equipped));
        assert!(matches!(
            book.unlock(&bolt),
            Err(AbilityError::InvalidTransition {
                from: AbilityStatus::Equipped,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_ability_transitions() {
        let mut book = AbilityBook::default();
        let tag = AbilityTag::from("Abilities.Unknown");
        assert_eq!(book.status(&tag), AbilityStatus::Locked);
        assert_eq!(book.unlock(&tag), Err(AbilityError::Unknown(tag)));
    }
}
