//! In-memory combat simulation.
//!
//! [`CombatWorld`] owns the combatants, the resolver, the debuff engine and
//! the event bus, and wires them together: ability hits go through the
//! effect factory and resolver, debuff ticks come back in as periodic
//! effects, and kill rewards flow into the killer's progression.

use aura_common::EntityId;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::abilities::{AbilityBook, AbilityInfoRegistry, AbilityStatus, AbilityTag};
use crate::attributes::{Attribute, AttributeStore};
use crate::config::CombatConfig;
use crate::debuff::DebuffEngine;
use crate::effect::{DamageEffectParams, EffectContext, EffectFactory, EffectSpec, Participant};
use crate::events::{EventBus, GameEvent};
use crate::progression::{
    CharacterClass, LevelUpResult, LevelUpTable, PointKind, ProgressionError, ProgressionLedger,
    XpRewardTable,
};
use crate::resolver::{
    CombatError, CombatHost, CombatResult, CombatantProfile, EffectOutcome, EffectResolver,
};
use crate::tags::{InputBlock, TagRegistry};

// ============================================================================
// Combatants
// ============================================================================

/// Who drives a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    /// Human player
    Player,
    /// AI
    Ai,
}

/// Everything needed to spawn a combatant.
#[derive(Debug, Clone)]
pub struct CombatantDesc {
    /// Display name
    pub name: String,
    /// Character class
    pub class: CharacterClass,
    /// Starting level
    pub level: u32,
    /// Who drives it
    pub controller: Controller,
    /// World position
    pub position: Vec3,
    /// Starting attributes
    pub attributes: AttributeStore,
}

impl CombatantDesc {
    /// A level-1 player.
    #[must_use]
    pub fn player(name: &str, class: CharacterClass) -> Self {
        Self {
            name: name.to_string(),
            class,
            level: 1,
            controller: Controller::Player,
            position: Vec3::ZERO,
            attributes: AttributeStore::new(),
        }
    }

    /// An AI enemy at the given level.
    #[must_use]
    pub fn enemy(name: &str, class: CharacterClass, level: u32) -> Self {
        Self {
            name: name.to_string(),
            class,
            level,
            controller: Controller::Ai,
            position: Vec3::ZERO,
            attributes: AttributeStore::new(),
        }
    }

    /// Sets the position.
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeStore) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the level.
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }
}

/// A spawned combatant.
#[derive(Debug, Clone)]
pub struct Combatant {
    id: EntityId,
    name: String,
    class: CharacterClass,
    level: u32,
    controller: Controller,
    position: Vec3,
    velocity: Vec3,
    attributes: AttributeStore,
    alive: bool,
    being_shocked: bool,
    progression: Option<ProgressionLedger>,
    abilities: Option<AbilityBook>,
}

impl Combatant {
    /// Entity ID.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Character class.
    #[must_use]
    pub const fn class(&self) -> CharacterClass {
        self.class
    }

    /// Current level; players read it from their progression.
    #[must_use]
    pub fn level(&self) -> u32 {
        self.progression
            .as_ref()
            .map_or(self.level, |p| p.state().level)
    }

    /// Whether a player drives this combatant.
    #[must_use]
    pub fn is_player(&self) -> bool {
        self.controller == Controller::Player
    }

    /// World position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Accumulated launch and death impulses.
    #[must_use]
    pub const fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Attribute values.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Whether the combatant is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Progression, for players.
    #[must_use]
    pub const fn progression(&self) -> Option<&ProgressionLedger> {
        self.progression.as_ref()
    }

    /// Ability statuses, for players.
    #[must_use]
    pub const fn abilities(&self) -> Option<&AbilityBook> {
        self.abilities.as_ref()
    }
}

/// Combatant registry the resolver operates on.
#[derive(Debug, Default)]
pub struct Roster {
    combatants: BTreeMap<EntityId, Combatant>,
}

impl Roster {
    /// Looks up a combatant.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    /// All combatants in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    /// Number of combatants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }
}

impl CombatHost for Roster {
    fn attributes(&self, entity: EntityId) -> Option<&AttributeStore> {
        self.combatants.get(&entity).map(|c| &c.attributes)
    }

    fn attributes_mut(&mut self, entity: EntityId) -> Option<&mut AttributeStore> {
        self.combatants.get_mut(&entity).map(|c| &mut c.attributes)
    }

    fn profile(&self, entity: EntityId) -> Option<CombatantProfile> {
        self.combatants.get(&entity).map(|c| CombatantProfile {
            class: c.class,
            level: c.level(),
            is_player: c.is_player(),
            is_dead: !c.alive,
        })
    }

    fn is_being_shocked(&self, entity: EntityId) -> bool {
        self.combatants.get(&entity).is_some_and(|c| c.being_shocked)
    }

    fn mark_dead(&mut self, entity: EntityId, impulse: Vec3) {
        if let Some(c) = self.combatants.get_mut(&entity) {
            c.alive = false;
            c.being_shocked = false;
            c.velocity = impulse;
        }
    }

    fn launch(&mut self, entity: EntityId, force: Vec3) {
        if let Some(c) = self.combatants.get_mut(&entity) {
            c.velocity += force;
        }
    }
}

// ============================================================================
// World
// ============================================================================

/// The in-memory combat simulation.
#[derive(Debug)]
pub struct CombatWorld {
    roster: Roster,
    resolver: EffectResolver,
    debuffs: DebuffEngine,
    bus: EventBus,
    rng: fastrand::Rng,
    level_table: Arc<LevelUpTable>,
    ability_registry: AbilityInfoRegistry,
}

impl CombatWorld {
    /// Creates a world with stock tables. The config is validated first.
    #[must_use]
    pub fn new(mut config: CombatConfig) -> Self {
        config.validate();
        let rng = config.make_rng();
        let bus = EventBus::new(config.event_bus_capacity);
        Self {
            roster: Roster::default(),
            resolver: EffectResolver::new(config, TagRegistry::default(), XpRewardTable::default()),
            debuffs: DebuffEngine::new(),
            bus,
            rng,
            level_table: Arc::new(LevelUpTable::default()),
            ability_registry: AbilityInfoRegistry::with_defaults(),
        }
    }

    /// Replaces the level table used for players spawned afterwards.
    #[must_use]
    pub fn with_level_table(mut self, table: LevelUpTable) -> Self {
        self.level_table = Arc::new(table);
        self
    }

    /// Replaces the kill reward table.
    #[must_use]
    pub fn with_xp_rewards(mut self, rewards: XpRewardTable) -> Self {
        self.resolver = EffectResolver::new(
            self.resolver.config().clone(),
            self.resolver.registry().clone(),
            rewards,
        );
        self
    }

    /// Replaces the ability registry used for players spawned afterwards.
    #[must_use]
    pub fn with_abilities(mut self, registry: AbilityInfoRegistry) -> Self {
        self.ability_registry = registry;
        self
    }

    /// Combat tuning in use.
    #[must_use]
    pub const fn config(&self) -> &CombatConfig {
        self.resolver.config()
    }

    /// Combatant registry.
    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Looks up a combatant.
    #[must_use]
    pub fn combatant(&self, id: EntityId) -> Option<&Combatant> {
        self.roster.get(id)
    }

    /// Active debuffs and their tags.
    #[must_use]
    pub const fn debuffs(&self) -> &DebuffEngine {
        &self.debuffs
    }

    /// Whether an input channel is blocked on an entity.
    #[must_use]
    pub fn is_input_blocked(&self, entity: EntityId, input: InputBlock) -> bool {
        self.debuffs.is_input_blocked(entity, input)
    }

    /// Drains pending events.
    pub fn events(&self) -> Vec<GameEvent> {
        self.bus.drain()
    }

    /// Spawns a combatant and returns its ID.
    pub fn spawn(&mut self, desc: CombatantDesc) -> EntityId {
        let id = EntityId::new();
        let (progression, abilities) = match desc.controller {
            Controller::Player => {
                let ledger = ProgressionLedger::at_level(Arc::clone(&self.level_table), desc.level);
                let mut book = AbilityBook::new(&self.ability_registry);
                book.update_statuses(ledger.state().level, &self.ability_registry);
                (Some(ledger), Some(book))
            },
            Controller::Ai => (None, None),
        };

        info!("Spawned {} {id} ({:?}, level {})", desc.name, desc.class, desc.level);
        self.roster.combatants.insert(
            id,
            Combatant {
                id,
                name: desc.name,
                class: desc.class,
                level: desc.level,
                controller: desc.controller,
                position: desc.position,
                velocity: Vec3::ZERO,
                attributes: desc.attributes,
                alive: true,
                being_shocked: false,
                progression,
                abilities,
            },
        );
        id
    }

    /// Sets whether an entity is channelling a shock.
    pub fn set_being_shocked(&mut self, entity: EntityId, shocked: bool) -> CombatResult<()> {
        let c = self
            .roster
            .combatants
            .get_mut(&entity)
            .ok_or(CombatError::EntityNotFound(entity))?;
        c.being_shocked = shocked;
        Ok(())
    }

    /// Builds and applies one ability hit from `source` on `target`.
    pub fn apply_damage_effect(
        &mut self,
        source: EntityId,
        target: EntityId,
        params: &DamageEffectParams,
    ) -> CombatResult<EffectOutcome> {
        let src = self
            .roster
            .get(source)
            .ok_or(CombatError::EntityNotFound(source))?;
        let tgt = self
            .roster
            .get(target)
            .ok_or(CombatError::EntityNotFound(target))?;

        let factory = EffectFactory::new(self.resolver.config(), self.resolver.registry());
        let (spec, context) = factory.make_damage_effect(
            params,
            Participant {
                id: source,
                position: src.position,
                attributes: &src.attributes,
            },
            Participant {
                id: target,
                position: tgt.position,
                attributes: &tgt.attributes,
            },
            &mut self.rng,
        );
        self.apply_effect(spec, &context)
    }

    /// Applies a prepared effect and routes any kill reward.
    pub fn apply_effect(
        &mut self,
        spec: EffectSpec,
        context: &EffectContext,
    ) -> CombatResult<EffectOutcome> {
        let source = spec.source();
        let outcome =
            self.resolver
                .apply(spec, context, &mut self.roster, &mut self.debuffs, &self.bus)?;

        if let EffectOutcome::Killed { xp_reward, .. } = outcome {
            let tracks_xp = self
                .roster
                .get(source)
                .is_some_and(|c| c.progression.is_some());
            if tracks_xp && xp_reward > 0 {
                self.grant_xp(source, xp_reward)?;
            }
        }
        Ok(outcome)
    }

    /// Advances debuffs and regeneration by `dt` seconds.
    ///
    /// Returns how many periodic ticks were applied.
    pub fn tick(&mut self, dt: f32) -> CombatResult<usize> {
        let ticks = self.debuffs.tick(dt, &self.bus);
        let mut applied = 0;
        for tick in ticks {
            if self.roster.get(tick.target).is_none() {
                debug!("Dropping debuff tick for despawned {}", tick.target);
                continue;
            }
            // An earlier tick this frame may have killed the source.
            if self.roster.get(tick.source).is_some_and(|c| !c.alive) {
                continue;
            }
            let spec = EffectSpec::periodic(tick.source, tick.target, tick.damage_type, tick.damage);
            let context = EffectContext::for_spec(&spec);
            if !matches!(self.apply_effect(spec, &context)?, EffectOutcome::Ignored(_)) {
                applied += 1;
            }
        }

        for c in self.roster.combatants.values_mut().filter(|c| c.alive) {
            c.attributes.regenerate(dt);
            publish_changes(&self.bus, c.id, &mut c.attributes);
        }
        Ok(applied)
    }

    /// Grants XP to a player and handles any level-ups.
    pub fn grant_xp(&mut self, entity: EntityId, amount: u32) -> CombatResult<LevelUpResult> {
        let health_per_level = self.resolver.config().max_health_per_level;
        let mana_per_level = self.resolver.config().max_mana_per_level;

        let c = self
            .roster
            .combatants
            .get_mut(&entity)
            .ok_or(CombatError::EntityNotFound(entity))?;
        let ledger = c
            .progression
            .as_mut()
            .ok_or(CombatError::NoProgression(entity))?;

        let result = ledger.grant_xp(amount);
        self.bus.publish(GameEvent::XpChanged {
            entity,
            xp: result.xp,
            progress: ledger.xp_progress(),
        });

        if result.leveled_up() {
            let state = *ledger.state();
            self.bus.publish(GameEvent::LevelChanged {
                entity,
                level: state.level,
            });
            self.bus.publish(GameEvent::AttributePointsChanged {
                entity,
                points: state.attribute_points,
            });
            self.bus.publish(GameEvent::SpellPointsChanged {
                entity,
                points: state.spell_points,
            });

            #[allow(clippy::cast_precision_loss)]
            let gained = result.levels_gained as f32;
            c.attributes.request_top_off();
            c.attributes
                .modify(Attribute::MaxHealth, health_per_level * gained);
            c.attributes.modify(Attribute::MaxMana, mana_per_level * gained);
            publish_changes(&self.bus, entity, &mut c.attributes);

            if let Some(book) = c.abilities.as_mut() {
                for (ability, status) in book.update_statuses(state.level, &self.ability_registry) {
                    self.bus.publish(GameEvent::AbilityStatusChanged {
                        entity,
                        ability,
                        status,
                    });
                }
            }
        }
        Ok(result)
    }

    /// Spends one attribute point on a primary attribute.
    ///
    /// Returns the attribute's new value.
    pub fn upgrade_attribute(
        &mut self,
        entity: EntityId,
        attribute: Attribute,
    ) -> CombatResult<f32> {
        if !attribute.is_primary() {
            return Err(CombatError::NotUpgradable(attribute));
        }
        let c = self
            .roster
            .combatants
            .get_mut(&entity)
            .ok_or(CombatError::EntityNotFound(entity))?;
        let ledger = c
            .progression
            .as_mut()
            .ok_or(CombatError::NoProgression(entity))?;

        let points = ledger.spend_attribute_point()?;
        c.attributes.modify(attribute, 1.0);
        publish_changes(&self.bus, entity, &mut c.attributes);
        self.bus
            .publish(GameEvent::AttributePointsChanged { entity, points });

        let value = c.attributes.get(attribute);
        debug!("{entity} raised {} to {value}, {points} points left", attribute.tag_name());
        Ok(value)
    }

    /// Spends one spell point to unlock an eligible ability.
    ///
    /// Nothing is spent when the ability is not eligible.
    pub fn unlock_ability(
        &mut self,
        entity: EntityId,
        ability: &AbilityTag,
    ) -> CombatResult<AbilityStatus> {
        let c = self
            .roster
            .combatants
            .get_mut(&entity)
            .ok_or(CombatError::EntityNotFound(entity))?;
        let (Some(ledger), Some(book)) = (c.progression.as_mut(), c.abilities.as_mut()) else {
            return Err(CombatError::NoProgression(entity));
        };

        if ledger.state().spell_points == 0 {
            return Err(ProgressionError::NoPointsAvailable(PointKind::Spell).into());
        }
        let status = book.unlock(ability)?;
        let points = ledger.spend_spell_point()?;

        self.bus.publish(GameEvent::SpellPointsChanged { entity, points });
        self.bus.publish(GameEvent::AbilityStatusChanged {
            entity,
            ability: ability.clone(),
            status,
        });
        info!("{entity} unlocked {ability}, {points} spell points left");
        Ok(status)
    }
}

fn publish_changes(bus: &EventBus, entity: EntityId, attributes: &mut AttributeStore) {
    for change in attributes.drain_changes() {
        bus.publish(GameEvent::AttributeChanged {
            entity,
            attribute: change.attribute,
            old: change.old,
            new: change.new,
        });
    }
}
