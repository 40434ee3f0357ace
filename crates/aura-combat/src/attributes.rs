//! Per-entity attribute storage with clamping and top-off hooks.
//!
//! Every write goes through [`AttributeStore::set`], which runs the
//! pre-change clamp and the post-change max handling. There is no other way
//! to mutate a value.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Attributes
// ============================================================================

/// A named numeric stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    // Primary
    /// Physical power
    Strength,
    /// Magical power
    Intelligence,
    /// Armor and penetration scaling
    Resilience,
    /// Health scaling
    Vigor,

    // Secondary
    /// Flat damage reduction input
    Armor,
    /// Ignores a share of the target's armor
    ArmorPenetration,
    /// Percent chance to halve incoming damage
    BlockChance,
    /// Percent chance to crit
    CriticalHitChance,
    /// Bonus damage added on crit
    CriticalHitDamage,
    /// Reduces the attacker's crit chance
    CriticalHitResistance,
    /// Health restored per second
    HealthRegeneration,
    /// Mana restored per second
    ManaRegeneration,
    /// Upper bound for Health
    MaxHealth,
    /// Upper bound for Mana
    MaxMana,

    // Resistance
    /// Percent fire reduction
    FireResistance,
    /// Percent lightning reduction
    LightningResistance,
    /// Percent arcane reduction
    ArcaneResistance,
    /// Percent physical reduction
    PhysicalResistance,

    // Vital
    /// Current health
    Health,
    /// Current mana
    Mana,
}

impl Attribute {
    /// Number of attributes.
    pub const COUNT: usize = 20;

    /// All attributes in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Strength,
        Self::Intelligence,
        Self::Resilience,
        Self::Vigor,
        Self::Armor,
        Self::ArmorPenetration,
        Self::BlockChance,
        Self::CriticalHitChance,
        Self::CriticalHitDamage,
        Self::CriticalHitResistance,
        Self::HealthRegeneration,
        Self::ManaRegeneration,
        Self::MaxHealth,
        Self::MaxMana,
        Self::FireResistance,
        Self::LightningResistance,
        Self::ArcaneResistance,
        Self::PhysicalResistance,
        Self::Health,
        Self::Mana,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Tag name, e.g. `Attributes.Vital.Health`.
    #[must_use]
    pub const fn tag_name(self) -> &'static str {
        match self {
            Self::Strength => "Attributes.Primary.Strength",
            Self::Intelligence => "Attributes.Primary.Intelligence",
            Self::Resilience => "Attributes.Primary.Resilience",
            Self::Vigor => "Attributes.Primary.Vigor",
            Self::Armor => "Attributes.Secondary.Armor",
            Self::ArmorPenetration => "Attributes.Secondary.ArmorPenetration",
            Self::BlockChance => "Attributes.Secondary.BlockChance",
            Self::CriticalHitChance => "Attributes.Secondary.CriticalHitChance",
            Self::CriticalHitDamage => "Attributes.Secondary.CriticalHitDamage",
            Self::CriticalHitResistance => "Attributes.Secondary.CriticalHitResistance",
            Self::HealthRegeneration => "Attributes.Secondary.HealthRegeneration",
            Self::ManaRegeneration => "Attributes.Secondary.ManaRegeneration",
            Self::MaxHealth => "Attributes.Secondary.MaxHealth",
            Self::MaxMana => "Attributes.Secondary.MaxMana",
            Self::FireResistance => "Attributes.Resistance.Fire",
            Self::LightningResistance => "Attributes.Resistance.Lightning",
            Self::ArcaneResistance => "Attributes.Resistance.Arcane",
            Self::PhysicalResistance => "Attributes.Resistance.Physical",
            Self::Health => "Attributes.Vital.Health",
            Self::Mana => "Attributes.Vital.Mana",
        }
    }

    /// Whether attribute points can be spent on this attribute.
    #[must_use]
    pub const fn is_primary(self) -> bool {
        matches!(
            self,
            Self::Strength | Self::Intelligence | Self::Resilience | Self::Vigor
        )
    }

    /// The max attribute bounding this one, for Health and Mana.
    #[must_use]
    pub const fn max_pair(self) -> Option<Self> {
        match self {
            Self::Health => Some(Self::MaxHealth),
            Self::Mana => Some(Self::MaxMana),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// A committed change to one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Changed attribute
    pub attribute: Attribute,
    /// Value before the write
    pub old: f32,
    /// Value after the write
    pub new: f32,
}

// ============================================================================
// Attribute Store
// ============================================================================

/// Attribute values owned by a single entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeStore {
    values: [f32; Attribute::COUNT],
    top_off_health: bool,
    top_off_mana: bool,
    #[serde(skip)]
    journal: Vec<AttributeChange>,
}

impl Default for AttributeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeStore {
    /// Creates a store with 100 health and 50 mana, everything else zero.
    #[must_use]
    pub fn new() -> Self {
        Self::zeroed().with_vitals(100.0, 50.0)
    }

    /// Creates a store where every attribute is zero.
    #[must_use]
    pub fn zeroed() -> Self {
        Self {
            values: [0.0; Attribute::COUNT],
            top_off_health: false,
            top_off_mana: false,
            journal: Vec::new(),
        }
    }

    /// Sets both maxima and fills the current values to them.
    #[must_use]
    pub fn with_vitals(mut self, max_health: f32, max_mana: f32) -> Self {
        self.set(Attribute::MaxHealth, max_health);
        self.set(Attribute::MaxMana, max_mana);
        self.set(Attribute::Health, max_health);
        self.set(Attribute::Mana, max_mana);
        self.journal.clear();
        self
    }

    /// Sets an attribute during construction.
    ///
    /// Goes through the same hooks as [`AttributeStore::set`], so set maxima
    /// before the vitals they bound.
    #[must_use]
    pub fn with_attribute(mut self, attribute: Attribute, value: f32) -> Self {
        self.set(attribute, value);
        self.journal.clear();
        self
    }

    /// Current value of an attribute.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> f32 {
        self.values[attribute.index()]
    }

    /// Writes an attribute through the pre- and post-change hooks.
    ///
    /// Returns the change, or `None` if the committed value equals the old one.
    /// Cascaded writes made by the post-change hook land in the journal only.
    #[allow(clippy::float_cmp)]
    pub fn set(&mut self, attribute: Attribute, value: f32) -> Option<AttributeChange> {
        let new = self.pre_change(attribute, value);
        let old = self.get(attribute);
        if new == old {
            return None;
        }

        self.values[attribute.index()] = new;
        let change = AttributeChange {
            attribute,
            old,
            new,
        };
        self.journal.push(change);
        self.post_change(attribute);
        Some(change)
    }

    /// Adds `delta` to an attribute through [`AttributeStore::set`].
    pub fn modify(&mut self, attribute: Attribute, delta: f32) -> Option<AttributeChange> {
        self.set(attribute, self.get(attribute) + delta)
    }

    /// Flags both vitals to fill up on the next max change.
    pub fn request_top_off(&mut self) {
        self.top_off_health = true;
        self.top_off_mana = true;
    }

    /// Whether a health top-off is pending.
    #[must_use]
    pub const fn top_off_pending(&self) -> bool {
        self.top_off_health || self.top_off_mana
    }

    /// Fills any vital whose top-off is still pending and clears the flag.
    pub fn apply_pending_top_off(&mut self) {
        if std::mem::take(&mut self.top_off_health) {
            self.set(Attribute::Health, self.get(Attribute::MaxHealth));
        }
        if std::mem::take(&mut self.top_off_mana) {
            self.set(Attribute::Mana, self.get(Attribute::MaxMana));
        }
    }

    /// Applies one regeneration step of `dt` seconds.
    ///
    /// A pending top-off is honored first.
    pub fn regenerate(&mut self, dt: f32) {
        self.apply_pending_top_off();
        let health = self.get(Attribute::HealthRegeneration) * dt;
        if health != 0.0 {
            self.modify(Attribute::Health, health);
        }
        let mana = self.get(Attribute::ManaRegeneration) * dt;
        if mana != 0.0 {
            self.modify(Attribute::Mana, mana);
        }
    }

    /// Takes every change committed since the last drain.
    pub fn drain_changes(&mut self) -> Vec<AttributeChange> {
        std::mem::take(&mut self.journal)
    }

    /// Health as a fraction of max health.
    #[must_use]
    pub fn health_percent(&self) -> f32 {
        let max = self.get(Attribute::MaxHealth);
        if max > 0.0 {
            self.get(Attribute::Health) / max
        } else {
            0.0
        }
    }

    fn pre_change(&self, attribute: Attribute, value: f32) -> f32 {
        let value = if value.is_nan() { 0.0 } else { value };
        match attribute.max_pair() {
            Some(max) => value.clamp(0.0, self.get(max).max(0.0)),
            None => value,
        }
    }

    fn post_change(&mut self, attribute: Attribute) {
        let (current, flag) = match attribute {
            Attribute::MaxHealth => (Attribute::Health, &mut self.top_off_health),
            Attribute::MaxMana => (Attribute::Mana, &mut self.top_off_mana),
            _ => return,
        };

        if std::mem::take(flag) {
            self.set(current, self.get(attribute));
        } else {
            // Re-clamp against the new max.
            self.set(current, self.get(current));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_store() {
        let store = AttributeStore::new();
        assert_eq!(store.get(Attribute::Health), 100.0);
        assert_eq!(store.get(Attribute::MaxHealth), 100.0);
        assert_eq!(store.get(Attribute::Mana), 50.0);
        assert_eq!(store.get(Attribute::Armor), 0.0);
    }

    #[test]
    fn test_only_primaries_take_points() {
        let primaries: Vec<_> = Attribute::ALL.iter().filter(|a| a.is_primary()).collect();
        assert_eq!(primaries.len(), 4);
        assert!(!Attribute::Health.is_primary());
        assert!(!Attribute::MaxHealth.is_primary());
    }

    #[test]
    fn test_health_clamped_on_write() {
        let mut store = AttributeStore::new();
        let change = store.set(Attribute::Health, -50.0);
        assert_eq!(
            change,
            Some(AttributeChange {
                attribute: Attribute::Health,
                old: 100.0,
                new: 0.0,
            })
        );

        store.set(Attribute::Health, 500.0);
        assert_eq!(store.get(Attribute::Health), 100.0);
    }

    #[test]
    fn test_unchanged_write_reports_nothing() {
        let mut store = AttributeStore::new();
        assert!(store.set(Attribute::Health, 150.0).is_none());
        assert!(store.drain_changes().is_empty());
    }

    #[test]
    fn test_top_off_on_max_change() {
        let mut store = AttributeStore::new();
        store.set(Attribute::Health, 40.0);
        store.request_top_off();
        store.set(Attribute::MaxHealth, 120.0);
        assert_eq!(store.get(Attribute::Health), 120.0);

        // Flag was consumed; the next max change leaves health alone.
        store.set(Attribute::Health, 60.0);
        store.set(Attribute::MaxHealth, 130.0);
        assert_eq!(store.get(Attribute::Health), 60.0);

        // Mana flag is still pending
        store.set(Attribute::MaxMana, 80.0);
        assert_eq!(store.get(Attribute::Mana), 80.0);
        assert!(!store.top_off_pending());
    }

    #[test]
    fn test_shrinking_max_reclamps_current() {
        let mut store = AttributeStore::new();
        store.set(Attribute::MaxHealth, 30.0);
        assert_eq!(store.get(Attribute::Health), 30.0);

        let changes = store.drain_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].attribute, Attribute::Health);
    }

    #[test]
    fn test_regeneration() {
        let mut store = AttributeStore::new()
            .with_attribute(Attribute::HealthRegeneration, 2.0)
            .with_attribute(Attribute::ManaRegeneration, 1.0);
        store.set(Attribute::Health, 50.0);
        store.set(Attribute::Mana, 10.0);

        store.regenerate(2.5);
        assert_eq!(store.get(Attribute::Health), 55.0);
        assert_eq!(store.get(Attribute::Mana), 12.5);

        store.regenerate(100.0);
        assert_eq!(store.get(Attribute::Health), 100.0);
    }

    #[test]
    fn test_pending_top_off_applies_on_regen_tick() {
        let mut store = AttributeStore::new();
        store.set(Attribute::Health, 10.0);
        store.set(Attribute::Mana, 5.0);
        store.request_top_off();

        store.regenerate(0.0);
        assert_eq!(store.get(Attribute::Health), 100.0);
        assert_eq!(store.get(Attribute::Mana), 50.0);
        assert!(!store.top_off_pending());
    }

    #[test]
    fn test_nan_write_treated_as_zero() {
        let mut store = AttributeStore::new();
        store.set(Attribute::Health, f32::NAN);
        assert_eq!(store.get(Attribute::Health), 0.0);
    }

    fn any_attribute() -> impl Strategy<Value = Attribute> {
        (0..Attribute::COUNT).prop_map(|i| Attribute::ALL[i])
    }

    proptest! {
        #[test]
        fn prop_vitals_stay_within_max(
            writes in proptest::collection::vec((any_attribute(), -500.0f32..500.0), 0..64),
            top_off in any::<bool>(),
        ) {
            let mut store = AttributeStore::new();
            if top_off {
                store.request_top_off();
            }
            for (attribute, value) in writes {
                store.set(attribute, value);
                let health = store.get(Attribute::Health);
                let mana = store.get(Attribute::Mana);
                prop_assert!(health >= 0.0);
                prop_assert!(health <= store.get(Attribute::MaxHealth).max(0.0));
                prop_assert!(mana >= 0.0);
                prop_assert!(mana <= store.get(Attribute::MaxMana).max(0.0));
            }
        }
    }
}
