//! Time-limited periodic debuffs.
//!
//! Debuffs aggregate by source with a stack limit of one: a second
//! application from the same source refreshes the existing instance, while
//! applications from different sources coexist. Each active debuff holds a
//! reference on its tags in the target's [`TagContainer`].

use ahash::AHashMap;
use aura_common::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::effect::DebuffParams;
use crate::events::{EventBus, GameEvent, RemovalReason};
use crate::tags::{DamageType, DebuffKind, GameplayTag, InputBlock, TagContainer, TagRegistry};

/// Slack for float accumulation when checking expiry.
const TIME_EPSILON: f32 = 1e-4;

/// Slack on the tick quotient, relative to one period.
const TICK_EPSILON: f32 = 1e-4;

/// Shortest allowed seconds between periodic ticks.
pub const MIN_DEBUFF_FREQUENCY: f32 = 0.05;

type DebuffKey = (EntityId, EntityId, DebuffKind);

/// A debuff currently running on a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDebuff {
    /// Entity that applied the debuff
    pub source: EntityId,
    /// Debuffed entity
    pub target: EntityId,
    /// Debuff kind
    pub kind: DebuffKind,
    /// Damage type of the ticks
    pub damage_type: DamageType,
    /// Damage, duration and frequency
    pub params: DebuffParams,
    /// Seconds since application or last refresh
    pub elapsed: f32,
    /// Ticks already fired
    pub ticks_fired: u32,
}

impl ActiveDebuff {
    /// Seconds until expiry.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        (self.params.duration - self.elapsed).max(0.0)
    }

    fn is_expired(&self) -> bool {
        self.elapsed + TIME_EPSILON >= self.params.duration
    }

    /// Ticks owed at the current elapsed time, capped at the duration.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn ticks_due(&self) -> u32 {
        if self.params.frequency <= 0.0 {
            return 0;
        }
        let window = self.elapsed.min(self.params.duration);
        (window / self.params.frequency + TICK_EPSILON).floor().max(0.0) as u32
    }
}

/// Result of [`DebuffEngine::apply_debuff`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebuffApplication {
    /// Debuff kind
    pub kind: DebuffKind,
    /// Damage type that mapped to the kind
    pub damage_type: DamageType,
    /// An existing instance from the same source was refreshed
    pub refreshed: bool,
}

/// One periodic damage tick owed to a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebuffTick {
    /// Entity that applied the debuff
    pub source: EntityId,
    /// Debuffed entity
    pub target: EntityId,
    /// Damage type
    pub damage_type: DamageType,
    /// Damage to route through the resolver
    pub damage: f32,
}

/// Tracks active debuffs and the tags they grant.
#[derive(Debug, Default)]
pub struct DebuffEngine {
    active: BTreeMap<DebuffKey, ActiveDebuff>,
    tags: AHashMap<EntityId, TagContainer>,
}

impl DebuffEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies or refreshes a debuff from `source` on `target`.
    ///
    /// A positive frequency is raised to [`MIN_DEBUFF_FREQUENCY`].
    /// Returns `None` when the damage type has no debuff mapping.
    pub fn apply_debuff(
        &mut self,
        source: EntityId,
        target: EntityId,
        damage_type: DamageType,
        mut params: DebuffParams,
        registry: &TagRegistry,
        bus: &EventBus,
    ) -> Option<DebuffApplication> {
        let Some(kind) = registry.debuff_for(damage_type) else {
            warn!("No debuff mapped for {damage_type}, skipping");
            return None;
        };

        if params.frequency > 0.0 && params.frequency < MIN_DEBUFF_FREQUENCY {
            warn!(
                "Debuff frequency {}s below minimum, using {MIN_DEBUFF_FREQUENCY}s",
                params.frequency
            );
            params.frequency = MIN_DEBUFF_FREQUENCY;
        }

        let key = (target, source, kind);
        let refreshed = if let Some(existing) = self.active.get_mut(&key) {
            existing.params = params;
            existing.damage_type = damage_type;
            existing.elapsed = 0.0;
            existing.ticks_fired = 0;
            debug!("Refreshed {kind} on {target} from {source}");
            true
        } else {
            self.active.insert(
                key,
                ActiveDebuff {
                    source,
                    target,
                    kind,
                    damage_type,
                    params,
                    elapsed: 0.0,
                    ticks_fired: 0,
                },
            );
            let tags = self.tags.entry(target).or_default();
            tags.grant(GameplayTag::Debuff(kind));
            for tag in kind.extra_tags() {
                tags.grant(*tag);
            }
            debug!(
                "Applied {kind} on {target} from {source} for {}s",
                params.duration
            );
            false
        };

        bus.publish(GameEvent::DebuffApplied {
            target,
            source,
            kind,
            refreshed,
        });

        Some(DebuffApplication {
            kind,
            damage_type,
            refreshed,
        })
    }

    /// Advances every debuff by `dt` seconds.
    ///
    /// Returns the periodic damage owed, in a stable order. Expired debuffs
    /// are removed after their final tick.
    pub fn tick(&mut self, dt: f32, bus: &EventBus) -> Vec<DebuffTick> {
        let mut ticks = Vec::new();
        let mut expired = Vec::new();

        for (key, debuff) in &mut self.active {
            debuff.elapsed += dt.max(0.0);
            let due = debuff.ticks_due();
            while debuff.ticks_fired < due {
                debuff.ticks_fired += 1;
                if debuff.params.damage > 0.0 {
                    ticks.push(DebuffTick {
                        source: debuff.source,
                        target: debuff.target,
                        damage_type: debuff.damage_type,
                        damage: debuff.params.damage,
                    });
                }
            }
            if debuff.is_expired() {
                expired.push(*key);
            }
        }

        for key in expired {
            self.remove(key, RemovalReason::Expired, bus);
        }
        ticks
    }

    /// Removes every debuff applied by `source`. Returns how many were removed.
    pub fn remove_from_source(&mut self, source: EntityId, bus: &EventBus) -> usize {
        let keys: Vec<_> = self
            .active
            .keys()
            .filter(|(_, s, _)| *s == source)
            .copied()
            .collect();
        for key in &keys {
            self.remove(*key, RemovalReason::SourceRemoved, bus);
        }
        keys.len()
    }

    /// Removes every debuff on `target`. Returns how many were removed.
    pub fn clear_target(&mut self, target: EntityId, bus: &EventBus) -> usize {
        let keys: Vec<_> = self
            .active
            .range((target, EntityId::NULL, DebuffKind::Burn)..)
            .take_while(|(k, _)| k.0 == target)
            .map(|(k, _)| *k)
            .collect();
        for key in &keys {
            self.remove(*key, RemovalReason::TargetDied, bus);
        }
        keys.len()
    }

    fn remove(&mut self, key: DebuffKey, reason: RemovalReason, bus: &EventBus) {
        let Some(debuff) = self.active.remove(&key) else {
            return;
        };
        if let Some(tags) = self.tags.get_mut(&debuff.target) {
            tags.revoke(GameplayTag::Debuff(debuff.kind));
            for tag in debuff.kind.extra_tags() {
                tags.revoke(*tag);
            }
            if tags.is_empty() {
                self.tags.remove(&debuff.target);
            }
        }
        debug!("Removed {} on {} ({reason:?})", debuff.kind, debuff.target);
        bus.publish(GameEvent::DebuffRemoved {
            target: debuff.target,
            source: debuff.source,
            kind: debuff.kind,
            reason,
        });
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Tags currently granted to `target` by debuffs.
    #[must_use]
    pub fn tags(&self, target: EntityId) -> Option<&TagContainer> {
        self.tags.get(&target)
    }

    /// Whether `target` carries a debuff of `kind` from any source.
    #[must_use]
    pub fn has_debuff(&self, target: EntityId, kind: DebuffKind) -> bool {
        self.has_tag(target, GameplayTag::Debuff(kind))
    }

    /// Whether `target` is stunned.
    #[must_use]
    pub fn is_stunned(&self, target: EntityId) -> bool {
        self.has_debuff(target, DebuffKind::Stun)
    }

    /// Whether the given input channel is blocked on `target`.
    #[must_use]
    pub fn is_input_blocked(&self, target: EntityId, input: InputBlock) -> bool {
        self.has_tag(target, input.tag())
    }

    /// Active debuffs on `target`.
    #[must_use]
    pub fn active_for(&self, target: EntityId) -> Vec<&ActiveDebuff> {
        self.active.values().filter(|d| d.target == target).collect()
    }

    /// Total number of active debuffs.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    fn has_tag(&self, target: EntityId, tag: GameplayTag) -> bool {
        self.tags.get(&target).is_some_and(|t| t.has(tag))
    }
}
