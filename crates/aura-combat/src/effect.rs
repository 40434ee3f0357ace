//! Effect specs, effect contexts, and the factory that builds them.
//!
//! An [`EffectSpec`] is the immutable "what happens" of a damage effect. Its
//! [`EffectContext`] carries the out-of-band data (impulses, debuff
//! parameters, cosmetic flags) that also travels to clients.

use aura_common::EntityId;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::attributes::AttributeStore;
use crate::config::CombatConfig;
use crate::curve::ScalableFloat;
use crate::mitigation;
use crate::tags::{DamageType, TagRegistry};

// ============================================================================
// Effect Spec
// ============================================================================

/// Where an effect spec came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectOrigin {
    /// Cast by an ability; damage is mitigated
    #[default]
    Ability,
    /// Debuff tick; damage bypasses mitigation
    Periodic,
}

/// Immutable description of a pending damage application.
///
/// Built through [`EffectSpecBuilder`]. Damage values are pre-mitigation and
/// never negative.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSpec {
    source: EntityId,
    target: EntityId,
    damage_by_type: BTreeMap<DamageType, f32>,
    ability_level: u32,
    is_critical: bool,
    is_blocked: bool,
    is_successful_debuff: bool,
    origin: EffectOrigin,
}

impl EffectSpec {
    /// Starts building a spec.
    #[must_use]
    pub fn builder(source: EntityId, target: EntityId) -> EffectSpecBuilder {
        EffectSpecBuilder::new(source, target)
    }

    /// A single-type periodic spec produced by a debuff tick.
    #[must_use]
    pub fn periodic(source: EntityId, target: EntityId, damage_type: DamageType, damage: f32) -> Self {
        Self::builder(source, target)
            .damage(damage_type, damage)
            .origin(EffectOrigin::Periodic)
            .build()
    }

    /// Entity that caused the effect.
    #[must_use]
    pub const fn source(&self) -> EntityId {
        self.source
    }

    /// Entity receiving the effect.
    #[must_use]
    pub const fn target(&self) -> EntityId {
        self.target
    }

    /// Pre-mitigation damage per type.
    #[must_use]
    pub const fn damage_by_type(&self) -> &BTreeMap<DamageType, f32> {
        &self.damage_by_type
    }

    /// Sum of all damage types before mitigation.
    #[must_use]
    pub fn total_damage(&self) -> f32 {
        self.damage_by_type.values().sum()
    }

    /// Level of the ability that produced the effect.
    #[must_use]
    pub const fn ability_level(&self) -> u32 {
        self.ability_level
    }

    /// Whether the critical roll succeeded.
    #[must_use]
    pub const fn is_critical(&self) -> bool {
        self.is_critical
    }

    /// Whether the block roll succeeded.
    #[must_use]
    pub const fn is_blocked(&self) -> bool {
        self.is_blocked
    }

    /// Whether a debuff roll succeeded.
    #[must_use]
    pub const fn is_successful_debuff(&self) -> bool {
        self.is_successful_debuff
    }

    /// Where the effect came from.
    #[must_use]
    pub const fn origin(&self) -> EffectOrigin {
        self.origin
    }
}

/// Builder for [`EffectSpec`].
#[derive(Debug, Clone)]
pub struct EffectSpecBuilder {
    spec: EffectSpec,
}

impl EffectSpecBuilder {
    /// Creates a builder with no damage at level 1.
    #[must_use]
    pub fn new(source: EntityId, target: EntityId) -> Self {
        Self {
            spec: EffectSpec {
                source,
                target,
                damage_by_type: BTreeMap::new(),
                ability_level: 1,
                is_critical: false,
                is_blocked: false,
                is_successful_debuff: false,
                origin: EffectOrigin::Ability,
            },
        }
    }

    /// Adds damage of a type. Negative or NaN amounts count as zero.
    #[must_use]
    pub fn damage(mut self, damage_type: DamageType, amount: f32) -> Self {
        let amount = if amount > 0.0 { amount } else { 0.0 };
        *self.spec.damage_by_type.entry(damage_type).or_insert(0.0) += amount;
        self
    }

    /// Sets the ability level.
    #[must_use]
    pub fn ability_level(mut self, level: u32) -> Self {
        self.spec.ability_level = level;
        self
    }

    /// Sets the critical flag.
    #[must_use]
    pub fn critical(mut self, critical: bool) -> Self {
        self.spec.is_critical = critical;
        self
    }

    /// Sets the blocked flag.
    #[must_use]
    pub fn blocked(mut self, blocked: bool) -> Self {
        self.spec.is_blocked = blocked;
        self
    }

    /// Sets the debuff success flag.
    #[must_use]
    pub fn successful_debuff(mut self, success: bool) -> Self {
        self.spec.is_successful_debuff = success;
        self
    }

    /// Sets the origin.
    #[must_use]
    pub fn origin(mut self, origin: EffectOrigin) -> Self {
        self.spec.origin = origin;
        self
    }

    /// Builds the effect spec.
    #[must_use]
    pub fn build(self) -> EffectSpec {
        self.spec
    }
}

// ============================================================================
// Effect Context
// ============================================================================

/// Debuff parameters carried by a context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DebuffParams {
    /// Percent chance before resistance
    pub chance: f32,
    /// Damage per tick
    pub damage: f32,
    /// Total duration in seconds
    pub duration: f32,
    /// Seconds between ticks
    pub frequency: f32,
}

/// Out-of-band data attached to one effect application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectContext {
    /// Damage type that drives the debuff
    pub damage_type: Option<DamageType>,
    /// Debuff parameters
    pub debuff: DebuffParams,
    /// Impulse applied on death
    pub death_impulse: Vec3,
    /// Knockback force; zero when the knockback roll failed
    pub knockback: Vec3,
    /// Mirrors the effect spec's block flag for cosmetic replay
    pub is_blocked: bool,
    /// Mirrors the effect spec's critical flag for cosmetic replay
    pub is_critical: bool,
    /// Mirrors the effect spec's debuff flag
    pub is_successful_debuff: bool,
}

impl EffectContext {
    /// A context whose flags mirror the effect spec and carries nothing else.
    #[must_use]
    pub fn for_spec(spec: &EffectSpec) -> Self {
        Self {
            damage_type: spec.damage_by_type().keys().next().copied(),
            is_blocked: spec.is_blocked(),
            is_critical: spec.is_critical(),
            is_successful_debuff: spec.is_successful_debuff(),
            ..Self::default()
        }
    }

    /// Sets the damage type and debuff parameters.
    #[must_use]
    pub fn with_debuff(mut self, damage_type: DamageType, params: DebuffParams) -> Self {
        self.damage_type = Some(damage_type);
        self.debuff = params;
        self
    }

    /// Sets the death impulse.
    #[must_use]
    pub fn with_death_impulse(mut self, impulse: Vec3) -> Self {
        self.death_impulse = impulse;
        self
    }

    /// Sets the knockback force.
    #[must_use]
    pub fn with_knockback(mut self, force: Vec3) -> Self {
        self.knockback = force;
        self
    }
}

// ============================================================================
// Damage Effect Params
// ============================================================================

/// Damage and debuff settings for one damage type of an ability.
///
/// Every value scales with the ability level.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageTypeParams {
    /// Damage
    pub damage: ScalableFloat,
    /// Percent debuff chance
    pub debuff_chance: ScalableFloat,
    /// Debuff damage per tick
    pub debuff_damage: ScalableFloat,
    /// Debuff duration in seconds
    pub debuff_duration: ScalableFloat,
    /// Seconds between debuff ticks
    pub debuff_frequency: ScalableFloat,
}

impl DamageTypeParams {
    /// Constant damage without a debuff.
    #[must_use]
    pub fn flat(damage: f32) -> Self {
        Self {
            damage: ScalableFloat::constant(damage),
            ..Self::default()
        }
    }

    /// Adds a debuff that ignores level.
    #[must_use]
    pub fn with_debuff(self, chance: f32, damage: f32, duration: f32, frequency: f32) -> Self {
        self.with_scaled_debuff(
            ScalableFloat::constant(chance),
            ScalableFloat::constant(damage),
            ScalableFloat::constant(duration),
            ScalableFloat::constant(frequency),
        )
    }

    /// Adds a debuff whose values scale with the ability level.
    #[must_use]
    pub fn with_scaled_debuff(
        mut self,
        chance: ScalableFloat,
        damage: ScalableFloat,
        duration: ScalableFloat,
        frequency: ScalableFloat,
    ) -> Self {
        self.debuff_chance = chance;
        self.debuff_damage = damage;
        self.debuff_duration = duration;
        self.debuff_frequency = frequency;
        self
    }

    /// Debuff values evaluated at `level`.
    #[must_use]
    pub fn debuff_params(&self, level: f32) -> DebuffParams {
        DebuffParams {
            chance: self.debuff_chance.value_at_level(level),
            damage: self.debuff_damage.value_at_level(level),
            duration: self.debuff_duration.value_at_level(level),
            frequency: self.debuff_frequency.value_at_level(level),
        }
    }
}

/// Ability-side description of a damage effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageEffectParams {
    /// Per-type damage and debuff settings
    pub damage_types: BTreeMap<DamageType, DamageTypeParams>,
    /// Ability level used for scaling
    pub ability_level: u32,
    /// Magnitude of the impulse applied on death
    pub death_impulse_magnitude: f32,
    /// Percent chance to knock back on a non-fatal hit
    pub knockback_chance: f32,
    /// Magnitude of the knockback force
    pub knockback_magnitude: f32,
}

impl Default for DamageEffectParams {
    fn default() -> Self {
        Self {
            damage_types: BTreeMap::new(),
            ability_level: 1,
            death_impulse_magnitude: 0.0,
            knockback_chance: 0.0,
            knockback_magnitude: 0.0,
        }
    }
}

impl DamageEffectParams {
    /// Creates empty params at level 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a damage type.
    #[must_use]
    pub fn with_damage_type(mut self, damage_type: DamageType, params: DamageTypeParams) -> Self {
        self.damage_types.insert(damage_type, params);
        self
    }

    /// Sets the ability level.
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.ability_level = level;
        self
    }

    /// Sets the death impulse magnitude.
    #[must_use]
    pub fn with_death_impulse(mut self, magnitude: f32) -> Self {
        self.death_impulse_magnitude = magnitude;
        self
    }

    /// Sets the knockback chance and magnitude.
    #[must_use]
    pub fn with_knockback(mut self, chance: f32, magnitude: f32) -> Self {
        self.knockback_chance = chance;
        self.knockback_magnitude = magnitude;
        self
    }
}

// ============================================================================
// Effect Factory
// ============================================================================

/// One side of an effect application, as seen by the factory.
#[derive(Debug, Clone, Copy)]
pub struct Participant<'a> {
    /// Entity ID
    pub id: EntityId,
    /// World position
    pub position: Vec3,
    /// Current attributes
    pub attributes: &'a AttributeStore,
}

/// Turns [`DamageEffectParams`] into a spec and context, rolling outcomes.
#[derive(Debug, Clone, Copy)]
pub struct EffectFactory<'a> {
    config: &'a CombatConfig,
    registry: &'a TagRegistry,
}

impl<'a> EffectFactory<'a> {
    /// Creates a factory.
    #[must_use]
    pub const fn new(config: &'a CombatConfig, registry: &'a TagRegistry) -> Self {
        Self { config, registry }
    }

    /// Builds the effect spec and context for one hit.
    #[must_use]
    pub fn make_damage_effect(
        &self,
        params: &DamageEffectParams,
        source: Participant<'_>,
        target: Participant<'_>,
        rng: &mut fastrand::Rng,
    ) -> (EffectSpec, EffectContext) {
        #[allow(clippy::cast_precision_loss)]
        let level = params.ability_level as f32;

        let chances: Vec<(DamageType, f32)> = params
            .damage_types
            .iter()
            .map(|(damage_type, p)| (*damage_type, p.debuff_chance.value_at_level(level)))
            .collect();
        let rolls = mitigation::roll_outcomes(
            &chances,
            source.attributes,
            target.attributes,
            self.registry,
            self.config,
            rng,
        );

        let mut builder = EffectSpec::builder(source.id, target.id)
            .ability_level(params.ability_level)
            .blocked(rolls.blocked)
            .critical(rolls.critical)
            .successful_debuff(rolls.debuff.is_some());
        for (damage_type, p) in &params.damage_types {
            builder = builder.damage(*damage_type, p.damage.value_at_level(level));
        }
        let spec = builder.build();

        let mut context = EffectContext::for_spec(&spec);
        let debuff_source = rolls
            .debuff
            .or_else(|| params.damage_types.keys().next().copied());
        if let Some(damage_type) = debuff_source {
            if let Some(p) = params.damage_types.get(&damage_type) {
                context = context.with_debuff(damage_type, p.debuff_params(level));
            }
        }

        let death_dir =
            pitched_direction(source.position, target.position, self.config.death_impulse_pitch_degrees);
        context = context.with_death_impulse(death_dir * params.death_impulse_magnitude);

        #[allow(clippy::cast_precision_loss)]
        let knockback_roll = rng.u32(1..=100) as f32;
        if knockback_roll < params.knockback_chance {
            let dir =
                pitched_direction(source.position, target.position, self.config.knockback_pitch_degrees);
            context = context.with_knockback(dir * params.knockback_magnitude);
        }

        (spec, context)
    }
}

/// Unit vector from `from` toward `to` with its pitch forced to `pitch_degrees`.
///
/// Z is up. Only the horizontal heading of `to - from` is kept; when the two
/// points are stacked vertically the heading defaults to +X.
#[must_use]
pub fn pitched_direction(from: Vec3, to: Vec3, pitch_degrees: f32) -> Vec3 {
    let flat = (to - from).truncate();
    let heading = flat.try_normalize().unwrap_or(glam::Vec2::X);
    let pitch = pitch_degrees.to_radians();
    Vec3::new(heading.x * pitch.cos(), heading.y * pitch.cos(), pitch.sin())
}
