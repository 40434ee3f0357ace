//! Outcome rolls and damage mitigation.
//!
//! Rolls decide the block, critical and debuff flags when a spec is made.
//! Mitigation turns a rolled spec into the final health delta using the
//! attacker's and defender's secondary attributes.

use crate::attributes::{Attribute, AttributeStore};
use crate::config::CombatConfig;
use crate::effect::{EffectOrigin, EffectSpec};
use crate::tags::{DamageType, TagRegistry};

/// Result of the outcome rolls for one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RollOutcome {
    /// Target blocked the hit
    pub blocked: bool,
    /// Source landed a critical hit
    pub critical: bool,
    /// First damage type whose debuff roll succeeded
    pub debuff: Option<DamageType>,
}

/// Uniform integer roll in `1..=100`, compared strictly against percent chances.
#[allow(clippy::cast_precision_loss)]
fn roll_percent(rng: &mut fastrand::Rng) -> f32 {
    rng.u32(1..=100) as f32
}

fn resistance(target: &AttributeStore, registry: &TagRegistry, damage_type: DamageType) -> f32 {
    registry
        .resistance_for(damage_type)
        .map_or(0.0, |attr| target.get(attr).clamp(0.0, 100.0))
}

/// Rolls block, critical and per-type debuff outcomes.
///
/// `debuff_chances` lists each damage type with its percent debuff chance.
/// Types are rolled in order; the first success wins.
pub fn roll_outcomes(
    debuff_chances: &[(DamageType, f32)],
    source: &AttributeStore,
    target: &AttributeStore,
    registry: &TagRegistry,
    config: &CombatConfig,
    rng: &mut fastrand::Rng,
) -> RollOutcome {
    let blocked = roll_percent(rng) < target.get(Attribute::BlockChance);

    let crit_chance = source.get(Attribute::CriticalHitChance)
        - target.get(Attribute::CriticalHitResistance) * config.crit_resistance_coefficient;
    let critical = roll_percent(rng) < crit_chance;

    let mut debuff = None;
    for &(damage_type, chance) in debuff_chances {
        if chance <= 0.0 {
            continue;
        }
        let effective = chance * (100.0 - resistance(target, registry, damage_type)) / 100.0;
        if roll_percent(rng) < effective && debuff.is_none() {
            debuff = Some(damage_type);
        }
    }

    RollOutcome {
        blocked,
        critical,
        debuff,
    }
}

/// Final damage of a spec against a target.
///
/// Periodic specs skip mitigation and return their raw sum. The result is
/// never negative.
pub fn mitigate(
    spec: &EffectSpec,
    source: Option<&AttributeStore>,
    target: &AttributeStore,
    registry: &TagRegistry,
    config: &CombatConfig,
) -> f32 {
    if spec.origin() == EffectOrigin::Periodic {
        return spec.total_damage().max(0.0);
    }

    let mut damage: f32 = spec
        .damage_by_type()
        .iter()
        .map(|(damage_type, amount)| {
            amount * (100.0 - resistance(target, registry, *damage_type)) / 100.0
        })
        .sum();

    if spec.is_blocked() {
        damage /= 2.0;
    }

    let penetration = source.map_or(0.0, |s| s.get(Attribute::ArmorPenetration));
    let effective_armor = target.get(Attribute::Armor)
        * (100.0 - penetration * config.armor_penetration_coefficient)
        / 100.0;
    damage *= (100.0 - effective_armor * config.effective_armor_coefficient) / 100.0;

    // Crits only amplify damage that got through.
    if damage <= 0.0 {
        return 0.0;
    }

    if spec.is_critical() {
        let bonus = source.map_or(0.0, |s| s.get(Attribute::CriticalHitDamage));
        damage = 2.0 * damage + bonus;
    }

    damage.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_common::EntityId;

    fn spec(damage: f32) -> crate::effect::EffectSpecBuilder {
        EffectSpec::builder(EntityId::from_raw(1), EntityId::from_raw(2))
            .damage(DamageType::Fire, damage)
    }

    #[test]
    fn test_unmitigated_damage() {
        let config = CombatConfig::default();
        let registry = TagRegistry::default();
        let target = AttributeStore::new();
        assert_eq!(mitigate(&spec(40.0).build(), None, &target, &registry, &config), 40.0);
    }

    #[test]
    fn test_resistance_and_block() {
        let config = CombatConfig::default();
        let registry = TagRegistry::default();
        let target = AttributeStore::new().with_attribute(Attribute::FireResistance, 25.0);
        let damage = mitigate(&spec(40.0).blocked(true).build(), None, &target, &registry, &config);
        assert_eq!(damage, 15.0);

        // Resistance above 100 cannot heal
        let immune = AttributeStore::new().with_attribute(Attribute::FireResistance, 250.0);
        assert_eq!(mitigate(&spec(40.0).build(), None, &immune, &registry, &config), 0.0);
    }

    #[test]
    fn test_armor_and_penetration() {
        let mut config = CombatConfig::default();
        config.armor_penetration_coefficient = 0.5;
        config.effective_armor_coefficient = 0.5;
        let registry = TagRegistry::default();
        let target = AttributeStore::new().with_attribute(Attribute::Armor, 40.0);
        let source = AttributeStore::new().with_attribute(Attribute::ArmorPenetration, 100.0);

        // effective armor = 40 * (100 - 50) / 100 = 20; factor = (100 - 10) / 100
        let damage = mitigate(&spec(100.0).build(), Some(&source), &target, &registry, &config);
        assert!((damage - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_critical_bonus() {
        let config = CombatConfig::default();
        let registry = TagRegistry::default();
        let target = AttributeStore::new();
        let source = AttributeStore::new().with_attribute(Attribute::CriticalHitDamage, 5.0);
        let damage = mitigate(&spec(10.0).critical(true).build(), Some(&source), &target, &registry, &config);
        assert_eq!(damage, 25.0);
    }

    #[test]
    fn test_critical_bonus_needs_damage() {
        let config = CombatConfig::default();
        let registry = TagRegistry::default();
        let source = AttributeStore::new().with_attribute(Attribute::CriticalHitDamage, 5.0);

        let empty = spec(0.0).critical(true).build();
        assert_eq!(mitigate(&empty, Some(&source), &AttributeStore::new(), &registry, &config), 0.0);

        let immune = AttributeStore::new().with_attribute(Attribute::FireResistance, 100.0);
        let resisted = spec(30.0).critical(true).build();
        assert_eq!(mitigate(&resisted, Some(&source), &immune, &registry, &config), 0.0);
    }

    #[test]
    fn test_periodic_bypasses_mitigation() {
        let config = CombatConfig::default();
        let registry = TagRegistry::default();
        let target = AttributeStore::new()
            .with_attribute(Attribute::Armor, 90.0)
            .with_attribute(Attribute::FireResistance, 100.0);
        let tick = EffectSpec::periodic(EntityId::from_raw(1), EntityId::from_raw(2), DamageType::Fire, 3.0);
        assert_eq!(mitigate(&tick, None, &target, &registry, &config), 3.0);
    }

    #[test]
    fn test_rolls_with_certain_and_impossible_chances() {
        let config = CombatConfig::default();
        let registry = TagRegistry::default();
        let source = AttributeStore::new().with_attribute(Attribute::CriticalHitChance, 101.0);
        let target = AttributeStore::new().with_attribute(Attribute::BlockChance, 101.0);
        let mut rng = fastrand::Rng::with_seed(11);

        let rolls = roll_outcomes(
            &[(DamageType::Fire, 0.0), (DamageType::Lightning, 101.0)],
            &source,
            &target,
            &registry,
            &config,
            &mut rng,
        );
        assert!(rolls.blocked);
        assert!(rolls.critical);
        assert_eq!(rolls.debuff, Some(DamageType::Lightning));

        let resistant = AttributeStore::new().with_attribute(Attribute::LightningResistance, 100.0);
        let rolls = roll_outcomes(
            &[(DamageType::Lightning, 101.0)],
            &AttributeStore::new(),
            &resistant,
            &registry,
            &config,
            &mut rng,
        );
        assert_eq!(rolls, RollOutcome::default());
    }
}
