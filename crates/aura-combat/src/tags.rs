//! Gameplay tags, damage types and the tag registry.
//!
//! Tags are plain enums instead of hierarchical strings. The registry that
//! maps damage types to debuffs and resistances is an explicit value passed
//! to whoever needs it; nothing here lives in process-wide state.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::attributes::Attribute;

// ============================================================================
// Damage and Debuff Kinds
// ============================================================================

/// Elemental category of incoming damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DamageType {
    /// Fire damage, applies Burn
    Fire,
    /// Lightning damage, applies Stun
    Lightning,
    /// Arcane damage
    Arcane,
    /// Physical damage
    Physical,
}

impl DamageType {
    /// All damage types in wire order.
    pub const ALL: [Self; 4] = [Self::Fire, Self::Lightning, Self::Arcane, Self::Physical];

    /// Tag name, e.g. `Damage.Fire`.
    #[must_use]
    pub const fn tag_name(self) -> &'static str {
        match self {
            Self::Fire => "Damage.Fire",
            Self::Lightning => "Damage.Lightning",
            Self::Arcane => "Damage.Arcane",
            Self::Physical => "Damage.Physical",
        }
    }

    /// Stable wire index.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Fire => 0,
            Self::Lightning => 1,
            Self::Arcane => 2,
            Self::Physical => 3,
        }
    }

    /// Inverse of [`DamageType::index`].
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Fire),
            1 => Some(Self::Lightning),
            2 => Some(Self::Arcane),
            3 => Some(Self::Physical),
            _ => None,
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// Debuff applied by a successful debuff roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DebuffKind {
    /// Periodic fire damage
    Burn,
    /// Periodic damage plus input blocking
    Stun,
    /// Periodic arcane damage
    Arcane,
    /// Periodic physical damage
    Physical,
}

impl DebuffKind {
    /// Tag name, e.g. `Debuff.Burn`.
    #[must_use]
    pub const fn tag_name(self) -> &'static str {
        match self {
            Self::Burn => "Debuff.Burn",
            Self::Stun => "Debuff.Stun",
            Self::Arcane => "Debuff.Arcane",
            Self::Physical => "Debuff.Physical",
        }
    }

    /// Extra tags granted for the lifetime of the debuff.
    ///
    /// Only stun blocks input; every other kind grants nothing beyond its own tag.
    #[must_use]
    pub const fn extra_tags(self) -> &'static [GameplayTag] {
        match self {
            Self::Stun => &[
                GameplayTag::BlockCursorTrace,
                GameplayTag::BlockInputPressed,
                GameplayTag::BlockInputHeld,
                GameplayTag::BlockInputReleased,
            ],
            Self::Burn | Self::Arcane | Self::Physical => &[],
        }
    }
}

impl fmt::Display for DebuffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// Input channel that a stun can block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputBlock {
    /// Cursor trace under the mouse
    CursorTrace,
    /// Ability input pressed
    Pressed,
    /// Ability input held
    Held,
    /// Ability input released
    Released,
}

impl InputBlock {
    /// Tag that blocks this channel.
    #[must_use]
    pub const fn tag(self) -> GameplayTag {
        match self {
            Self::CursorTrace => GameplayTag::BlockCursorTrace,
            Self::Pressed => GameplayTag::BlockInputPressed,
            Self::Held => GameplayTag::BlockInputHeld,
            Self::Released => GameplayTag::BlockInputReleased,
        }
    }
}

// ============================================================================
// Gameplay Tags
// ============================================================================

/// Runtime state tag carried by a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GameplayTag {
    /// Active debuff of the given kind
    Debuff(DebuffKind),
    /// Hit-react request tag
    HitReact,
    /// Blocks cursor tracing
    BlockCursorTrace,
    /// Blocks input pressed
    BlockInputPressed,
    /// Blocks input held
    BlockInputHeld,
    /// Blocks input released
    BlockInputReleased,
    /// Target is channelling shock; suppresses hit-react
    BeingShocked,
}

impl GameplayTag {
    /// Dotted tag name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Debuff(kind) => kind.tag_name(),
            Self::HitReact => "Effects.HitReact",
            Self::BlockCursorTrace => "Player.Block.CursorTrace",
            Self::BlockInputPressed => "Player.Block.InputPressed",
            Self::BlockInputHeld => "Player.Block.InputHeld",
            Self::BlockInputReleased => "Player.Block.InputReleased",
            Self::BeingShocked => "State.BeingShocked",
        }
    }
}

impl fmt::Display for GameplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Tag Container
// ============================================================================

/// Reference-counted set of tags.
///
/// A tag granted twice has to be revoked twice before it disappears.
#[derive(Debug, Clone, Default)]
pub struct TagContainer {
    counts: AHashMap<GameplayTag, u32>,
}

impl TagContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one reference to a tag.
    pub fn grant(&mut self, tag: GameplayTag) {
        *self.counts.entry(tag).or_insert(0) += 1;
    }

    /// Removes one reference. Returns true if the tag is now gone.
    pub fn revoke(&mut self, tag: GameplayTag) -> bool {
        match self.counts.get_mut(&tag) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            },
            Some(_) => {
                self.counts.remove(&tag);
                true
            },
            None => false,
        }
    }

    /// Checks whether the tag is present.
    #[must_use]
    pub fn has(&self, tag: GameplayTag) -> bool {
        self.counts.contains_key(&tag)
    }

    /// Reference count of a tag.
    #[must_use]
    pub fn count(&self, tag: GameplayTag) -> u32 {
        self.counts.get(&tag).copied().unwrap_or(0)
    }

    /// Returns true if no tags are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Present tags in a stable order.
    #[must_use]
    pub fn tags(&self) -> Vec<GameplayTag> {
        let mut tags: Vec<_> = self.counts.keys().copied().collect();
        tags.sort();
        tags
    }
}

// ============================================================================
// Tag Registry
// ============================================================================

/// Damage type lookups used by mitigation and debuffs.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    debuffs: AHashMap<DamageType, DebuffKind>,
    resistances: AHashMap<DamageType, Attribute>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DamageType::Fire, DebuffKind::Burn, Attribute::FireResistance);
        registry.register(
            DamageType::Lightning,
            DebuffKind::Stun,
            Attribute::LightningResistance,
        );
        registry.register(DamageType::Arcane, DebuffKind::Arcane, Attribute::ArcaneResistance);
        registry.register(
            DamageType::Physical,
            DebuffKind::Physical,
            Attribute::PhysicalResistance,
        );
        registry
    }
}

impl TagRegistry {
    /// Creates a registry with no mappings.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            debuffs: AHashMap::new(),
            resistances: AHashMap::new(),
        }
    }

    /// Registers the debuff and resistance for a damage type.
    pub fn register(&mut self, damage_type: DamageType, debuff: DebuffKind, resistance: Attribute) {
        self.debuffs.insert(damage_type, debuff);
        self.resistances.insert(damage_type, resistance);
    }

    /// Debuff applied by this damage type.
    #[must_use]
    pub fn debuff_for(&self, damage_type: DamageType) -> Option<DebuffKind> {
        self.debuffs.get(&damage_type).copied()
    }

    /// Resistance attribute that mitigates this damage type.
    #[must_use]
    pub fn resistance_for(&self, damage_type: DamageType) -> Option<Attribute> {
        self.resistances.get(&damage_type).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_mappings() {
        let registry = TagRegistry::default();
        assert_eq!(registry.debuff_for(DamageType::Fire), Some(DebuffKind::Burn));
        assert_eq!(registry.debuff_for(DamageType::Lightning), Some(DebuffKind::Stun));
        assert_eq!(registry.debuff_for(DamageType::Arcane), Some(DebuffKind::Arcane));
        assert_eq!(
            registry.resistance_for(DamageType::Physical),
            Some(Attribute::PhysicalResistance)
        );
        assert_eq!(TagRegistry::empty().debuff_for(DamageType::Fire), None);
    }

    #[test]
    fn test_tag_container_ref_counting() {
        let mut tags = TagContainer::new();
        let burn = GameplayTag::Debuff(DebuffKind::Burn);
        tags.grant(burn);
        tags.grant(burn);
        assert_eq!(tags.count(burn), 2);

        assert!(!tags.revoke(burn));
        assert!(tags.has(burn));
        assert!(tags.revoke(burn));
        assert!(!tags.has(burn));
        assert!(!tags.revoke(burn));
        assert!(tags.is_empty());
    }

    #[test]
    fn test_only_stun_blocks_input() {
        assert_eq!(DebuffKind::Stun.extra_tags().len(), 4);
        assert!(DebuffKind::Burn.extra_tags().is_empty());
        assert_eq!(InputBlock::Held.tag().name(), "Player.Block.InputHeld");
    }

    #[test]
    fn test_damage_type_index() {
        for damage_type in DamageType::ALL {
            assert_eq!(DamageType::from_index(damage_type.index()), Some(damage_type));
        }
        assert_eq!(DamageType::from_index(9), None);
    }
}
