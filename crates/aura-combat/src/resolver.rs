//! Effect resolution: turns an [`EffectSpec`] into health loss and side effects.
//!
//! The resolver is stateless apart from its tuning data. Everything it
//! touches is reached through the [`CombatHost`] seam, the [`DebuffEngine`]
//! and the [`EventBus`], so it can run against the in-memory world or any
//! other host simulation.

use aura_common::{AuraError, EntityId};
use glam::Vec3;
use thiserror::Error;
use tracing::{debug, info};

use crate::abilities::AbilityError;
use crate::attributes::{Attribute, AttributeStore};
use crate::config::CombatConfig;
use crate::debuff::{DebuffApplication, DebuffEngine};
use crate::effect::{EffectContext, EffectSpec};
use crate::events::{EventBus, GameEvent};
use crate::mitigation;
use crate::progression::{CharacterClass, ProgressionError, XpRewardTable};
use crate::tags::{GameplayTag, TagRegistry};

/// Combat system error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatError {
    /// Resolution attempted on a non-authoritative instance
    #[error("effects resolve only on the authoritative instance")]
    NotAuthority,
    /// Target has no attribute store
    #[error("entity {0} has no attribute store")]
    MissingAttributes(EntityId),
    /// Entity not found
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),
    /// Entity does not track XP
    #[error("entity {0} has no progression")]
    NoProgression(EntityId),
    /// Attribute points only go into primary attributes
    #[error("{0:?} cannot be upgraded with attribute points")]
    NotUpgradable(Attribute),
    /// Point spending failed
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    /// Ability status change failed
    #[error(transparent)]
    Ability(#[from] AbilityError),
}

/// Result type for combat operations.
pub type CombatResult<T> = Result<T, CombatError>;

impl From<CombatError> for AuraError {
    fn from(err: CombatError) -> Self {
        Self::Combat(err.to_string())
    }
}

// ============================================================================
// Host Seam
// ============================================================================

/// What the resolver needs to know about a combatant besides its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatantProfile {
    /// Character class, for kill rewards
    pub class: CharacterClass,
    /// Character level, for kill rewards
    pub level: u32,
    /// Controlled by a player, so it can show floating numbers
    pub is_player: bool,
    /// Already dead
    pub is_dead: bool,
}

/// Host simulation the resolver acts on.
pub trait CombatHost {
    /// Attribute store of an entity.
    fn attributes(&self, entity: EntityId) -> Option<&AttributeStore>;

    /// Mutable attribute store of an entity.
    fn attributes_mut(&mut self, entity: EntityId) -> Option<&mut AttributeStore>;

    /// Profile of an entity.
    fn profile(&self, entity: EntityId) -> Option<CombatantProfile>;

    /// Whether the entity is channelling a shock, which suppresses hit-react.
    fn is_being_shocked(&self, entity: EntityId) -> bool;

    /// Transitions an entity to dead and applies the death impulse.
    fn mark_dead(&mut self, entity: EntityId, impulse: Vec3);

    /// Launches an entity with a knockback force.
    fn launch(&mut self, entity: EntityId, force: Vec3);
}

// ============================================================================
// Outcome
// ============================================================================

/// Why an effect did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Target was already dead
    TargetDead,
    /// Final damage was zero
    NoDamage,
}

/// What applying an effect did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectOutcome {
    /// Nothing changed
    Ignored(IgnoreReason),
    /// Target survived
    Damaged {
        /// Damage dealt
        amount: f32,
        /// Health afterwards
        health: f32,
        /// A hit-react was requested
        hit_react: bool,
        /// Knockback force applied, if any
        knockback: Option<Vec3>,
        /// Debuff applied or refreshed, if any
        debuff: Option<DebuffApplication>,
    },
    /// Target died
    Killed {
        /// Damage dealt
        amount: f32,
        /// Impulse applied to the corpse
        death_impulse: Vec3,
        /// XP owed to the source
        xp_reward: u32,
    },
}

impl EffectOutcome {
    /// Damage dealt, zero when ignored.
    #[must_use]
    pub const fn amount(&self) -> f32 {
        match self {
            Self::Ignored(_) => 0.0,
            Self::Damaged { amount, .. } | Self::Killed { amount, .. } => *amount,
        }
    }

    /// Whether the effect killed the target.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Killed { .. })
    }
}

/// Whether every component of `v` is within `tolerance` of zero.
fn is_nearly_zero(v: Vec3, tolerance: f32) -> bool {
    v.abs().max_element() <= tolerance
}

// ============================================================================
// Resolver
// ============================================================================

/// Applies effect specs against a host.
#[derive(Debug, Clone)]
pub struct EffectResolver {
    config: CombatConfig,
    registry: TagRegistry,
    xp_rewards: XpRewardTable,
}

impl EffectResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(config: CombatConfig, registry: TagRegistry, xp_rewards: XpRewardTable) -> Self {
        Self {
            config,
            registry,
            xp_rewards,
        }
    }

    /// Tuning in use.
    #[must_use]
    pub const fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Tag registry in use.
    #[must_use]
    pub const fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Kill reward table in use.
    #[must_use]
    pub const fn xp_rewards(&self) -> &XpRewardTable {
        &self.xp_rewards
    }

    /// Applies one effect. The effect spec is consumed.
    pub fn apply<H: CombatHost>(
        &self,
        spec: EffectSpec,
        context: &EffectContext,
        host: &mut H,
        debuffs: &mut DebuffEngine,
        bus: &EventBus,
    ) -> CombatResult<EffectOutcome> {
        if !self.config.role.has_authority() {
            return Err(CombatError::NotAuthority);
        }

        let source = spec.source();
        let target = spec.target();
        let target_profile = host.profile(target).ok_or(CombatError::EntityNotFound(target))?;
        let target_attrs = host
            .attributes(target)
            .ok_or(CombatError::MissingAttributes(target))?;

        if target_profile.is_dead {
            debug!("Ignoring effect on dead target {target}");
            return Ok(EffectOutcome::Ignored(IgnoreReason::TargetDead));
        }

        let damage = mitigation::mitigate(
            &spec,
            host.attributes(source),
            target_attrs,
            &self.registry,
            &self.config,
        );
        if damage <= 0.0 {
            debug!("Ignoring zero-damage effect on {target}");
            return Ok(EffectOutcome::Ignored(IgnoreReason::NoDamage));
        }

        let attrs = host
            .attributes_mut(target)
            .ok_or(CombatError::MissingAttributes(target))?;
        attrs.modify(Attribute::Health, -damage);
        let health = attrs.get(Attribute::Health);
        for change in attrs.drain_changes() {
            bus.publish(GameEvent::AttributeChanged {
                entity: target,
                attribute: change.attribute,
                old: change.old,
                new: change.new,
            });
        }

        if health <= 0.0 {
            let outcome =
                self.handle_death(source, target, damage, target_profile, context, host, debuffs, bus);
            self.show_damage_number(source, target, damage, &spec, host, bus);
            return Ok(outcome);
        }

        let (hit_react, knockback) = self.handle_hit(target, context, host, debuffs, bus);
        self.show_damage_number(source, target, damage, &spec, host, bus);
        let debuff = self.apply_debuff(source, target, context, debuffs, bus);

        Ok(EffectOutcome::Damaged {
            amount: damage,
            health,
            hit_react,
            knockback,
            debuff,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_death<H: CombatHost>(
        &self,
        source: EntityId,
        target: EntityId,
        amount: f32,
        profile: CombatantProfile,
        context: &EffectContext,
        host: &mut H,
        debuffs: &mut DebuffEngine,
        bus: &EventBus,
    ) -> EffectOutcome {
        host.mark_dead(target, context.death_impulse);
        debuffs.clear_target(target, bus);
        let orphaned = debuffs.remove_from_source(target, bus);
        if orphaned > 0 {
            debug!("Removed {orphaned} debuffs applied by {target}");
        }
        bus.publish(GameEvent::Died {
            entity: target,
            killer: source,
            impulse: context.death_impulse,
        });

        let xp_reward = self.xp_rewards.reward(profile.class, profile.level);
        bus.publish(GameEvent::XpRewarded {
            recipient: source,
            victim: target,
            amount: xp_reward,
        });
        info!("{source} killed {target}, awarding {xp_reward} XP");

        EffectOutcome::Killed {
            amount,
            death_impulse: context.death_impulse,
            xp_reward,
        }
    }

    /// Hit-react and knockback for a surviving target.
    fn handle_hit<H: CombatHost>(
        &self,
        target: EntityId,
        context: &EffectContext,
        host: &mut H,
        debuffs: &DebuffEngine,
        bus: &EventBus,
    ) -> (bool, Option<Vec3>) {
        let hit_react = !debuffs.is_stunned(target) && !host.is_being_shocked(target);
        if hit_react {
            bus.publish(GameEvent::HitReactRequested {
                entity: target,
                tag: GameplayTag::HitReact,
            });
        }

        if is_nearly_zero(context.knockback, self.config.knockback_tolerance) {
            return (hit_react, None);
        }
        host.launch(target, context.knockback);
        bus.publish(GameEvent::KnockedBack {
            entity: target,
            force: context.knockback,
        });
        (hit_react, Some(context.knockback))
    }

    fn show_damage_number<H: CombatHost>(
        &self,
        source: EntityId,
        target: EntityId,
        amount: f32,
        spec: &EffectSpec,
        host: &H,
        bus: &EventBus,
    ) {
        if source == target {
            return;
        }
        let is_player = |id| host.profile(id).is_some_and(|p| p.is_player);
        let observer = if is_player(source) {
            source
        } else if is_player(target) {
            target
        } else {
            return;
        };
        bus.publish(GameEvent::DamageNumber {
            observer,
            source,
            target,
            amount,
            blocked: spec.is_blocked(),
            critical: spec.is_critical(),
        });
    }

    fn apply_debuff(
        &self,
        source: EntityId,
        target: EntityId,
        context: &EffectContext,
        debuffs: &mut DebuffEngine,
        bus: &EventBus,
    ) -> Option<DebuffApplication> {
        if !context.is_successful_debuff {
            return None;
        }
        let damage_type = context.damage_type?;
        debuffs.apply_debuff(source, target, damage_type, context.debuff, &self.registry, bus)
    }
}
