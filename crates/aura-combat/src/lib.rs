//! # Aura Combat
//!
//! Damage resolution and progression for the Aura action RPG.
//!
//! This crate provides the engine-independent combat core:
//! - Attributes with clamping and top-off hooks
//! - Damage effect construction with block, crit and debuff rolls
//! - Mitigation by resistance, armor and critical hits
//! - Effect resolution with death, hit-react and knockback
//! - Periodic debuffs with tag-based input blocking
//! - XP, levels, kill rewards and ability statuses
//! - Effect context wire format
//! - Event bus for UI and animation consumers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod abilities;
pub mod attributes;
pub mod codec;
pub mod config;
pub mod curve;
pub mod debuff;
pub mod effect;
pub mod events;
pub mod mitigation;
pub mod progression;
pub mod resolver;
pub mod tags;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::abilities::*;
    pub use crate::attributes::*;
    pub use crate::codec::*;
    pub use crate::config::*;
    pub use crate::curve::*;
    pub use crate::debuff::*;
    pub use crate::effect::*;
    pub use crate::events::*;
    pub use crate::mitigation::*;
    pub use crate::progression::*;
    pub use crate::resolver::*;
    pub use crate::tags::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_round_trip() {
        let config = CombatConfig {
            rng_seed: Some(7),
            ..CombatConfig::default()
        };
        let mut world = CombatWorld::new(config);
        let hero = world.spawn(CombatantDesc::player("Hero", CharacterClass::Elementalist));
        let target = world.spawn(CombatantDesc::enemy("Dummy", CharacterClass::Warrior, 2));

        let params = DamageEffectParams::new()
            .with_damage_type(DamageType::Arcane, DamageTypeParams::flat(12.0));
        let outcome = world
            .apply_damage_effect(hero, target, &params)
            .expect("resolves");
        assert_eq!(outcome.amount(), 12.0);

        let events = world.events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::DamageNumber { observer, .. } if *observer == hero
        )));
    }

    #[test]
    fn test_context_survives_wire() {
        let spec = EffectSpec::builder(aura_common::EntityId::from_raw(1), aura_common::EntityId::from_raw(2))
            .damage(DamageType::Fire, 5.0)
            .critical(true)
            .build();
        let context = EffectContext::for_spec(&spec);
        let bytes = context.to_wire().expect("encodes");
        assert_eq!(EffectContext::from_wire(&bytes).expect("decodes"), context);
    }
}
