//! Scripted arena fight.
//!
//! One player faces a line of enemies. The player casts Fire Bolt at the
//! nearest living enemy on a fixed interval and the enemies hit back in
//! melee. Everything runs on a fixed timestep so a seeded run is
//! reproducible.

use aura_combat::{
    Attribute, AttributeStore, CharacterClass, CombatError, CombatResult, CombatWorld, CombatantDesc,
    DamageEffectParams, DamageType, DamageTypeParams, EffectOutcome, GameEvent, LevelCurve,
    ScalableFloat,
};
use aura_common::EntityId;
use glam::Vec3;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SimConfig;

/// Spacing between enemies along the X axis.
const ENEMY_SPACING: f32 = 150.0;

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    /// Fixed ticks simulated
    pub ticks: u32,
    /// Simulated seconds
    pub elapsed: f32,
    /// Fire Bolts cast
    pub casts: u32,
    /// Enemies killed
    pub kills: u32,
    /// Damage dealt by the player, including burns
    pub damage_dealt: f32,
    /// Damage taken by the player
    pub damage_taken: f32,
    /// Critical hits landed by anyone
    pub critical_hits: u32,
    /// Debuffs applied or refreshed
    pub debuffs_applied: u32,
    /// Player survived
    pub player_alive: bool,
    /// Player level at the end
    pub player_level: u32,
    /// Player XP at the end
    pub player_xp: u32,
    /// Events drained from the bus
    pub events: usize,
}

/// A running scenario.
#[derive(Debug)]
pub struct Scenario {
    config: SimConfig,
    world: CombatWorld,
    player: EntityId,
    enemies: Vec<EntityId>,
    fire_bolt: DamageEffectParams,
    melee: DamageEffectParams,
}

impl Scenario {
    /// Spawns the player and enemies.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let mut world = CombatWorld::new(config.combat.clone());

        let player = world.spawn(
            CombatantDesc::player("Player", config.player_class).with_attributes(
                AttributeStore::new()
                    .with_attribute(Attribute::CriticalHitChance, 10.0)
                    .with_attribute(Attribute::CriticalHitDamage, 5.0)
                    .with_attribute(Attribute::HealthRegeneration, 0.5)
                    .with_attribute(Attribute::ManaRegeneration, 1.0),
            ),
        );

        let enemies = (0..config.enemy_count)
            .map(|i| {
                let position = Vec3::new(ENEMY_SPACING * (i + 1) as f32, 0.0, 0.0);
                world.spawn(
                    CombatantDesc::enemy(
                        &format!("Goblin {}", i + 1),
                        CharacterClass::Warrior,
                        config.enemy_level,
                    )
                    .with_position(position)
                    .with_attributes(
                        AttributeStore::new()
                            .with_vitals(config.enemy_health, 0.0)
                            .with_attribute(Attribute::Armor, 4.0)
                            .with_attribute(Attribute::BlockChance, 5.0),
                    ),
                )
            })
            .collect();

        let fire_bolt = DamageEffectParams::new()
            .with_damage_type(
                DamageType::Fire,
                DamageTypeParams {
                    damage: ScalableFloat::curved(
                        1.0,
                        LevelCurve::new(vec![(1.0, 15.0), (10.0, 60.0)]),
                    ),
                    ..DamageTypeParams::flat(0.0)
                }
                .with_scaled_debuff(
                    ScalableFloat::constant(20.0),
                    ScalableFloat::curved(1.0, LevelCurve::new(vec![(1.0, 3.0), (10.0, 8.0)])),
                    ScalableFloat::constant(3.0),
                    ScalableFloat::constant(1.0),
                ),
            )
            .with_death_impulse(600.0)
            .with_knockback(15.0, 300.0);

        let melee = DamageEffectParams::new()
            .with_damage_type(DamageType::Physical, DamageTypeParams::flat(config.enemy_damage))
            .with_death_impulse(300.0);

        Self {
            config,
            world,
            player,
            enemies,
            fire_bolt,
            melee,
        }
    }

    /// The world being simulated.
    #[must_use]
    pub const fn world(&self) -> &CombatWorld {
        &self.world
    }

    /// Player entity.
    #[must_use]
    pub const fn player(&self) -> EntityId {
        self.player
    }

    /// Runs to completion and returns the summary.
    pub fn run(&mut self) -> CombatResult<ScenarioReport> {
        let dt = self.config.fixed_dt();
        let total_ticks = self.config.total_ticks();
        let mut report = ScenarioReport {
            ticks: 0,
            elapsed: 0.0,
            casts: 0,
            kills: 0,
            damage_dealt: 0.0,
            damage_taken: 0.0,
            critical_hits: 0,
            debuffs_applied: 0,
            player_alive: true,
            player_level: 1,
            player_xp: 0,
            events: 0,
        };

        let mut cast_timer = 0.0_f32;
        let mut attack_timer = 0.0_f32;

        info!(
            "Scenario start: {} enemies, {total_ticks} ticks at {} Hz",
            self.enemies.len(),
            self.config.tick_rate
        );

        while report.ticks < total_ticks {
            if !self.is_alive(self.player) || self.living_enemy().is_none() {
                break;
            }

            cast_timer += dt;
            if cast_timer >= self.config.cast_interval {
                cast_timer -= self.config.cast_interval;
                if let Some(target) = self.living_enemy() {
                    self.cast_fire_bolt(target)?;
                    report.casts += 1;
                }
            }

            attack_timer += dt;
            if attack_timer >= self.config.enemy_attack_interval {
                attack_timer -= self.config.enemy_attack_interval;
                self.enemy_attacks()?;
            }

            self.world.tick(dt)?;
            report.ticks += 1;
            self.tally_events(&mut report);
        }

        report.elapsed = report.ticks as f32 * dt;
        report.player_alive = self.is_alive(self.player);
        if let Some(state) = self
            .world
            .combatant(self.player)
            .and_then(|c| c.progression())
            .map(|p| *p.state())
        {
            report.player_level = state.level;
            report.player_xp = state.xp;
        }

        info!(
            "Scenario end after {:.1}s: {} kills, {:.0} dealt, {:.0} taken, player {}",
            report.elapsed,
            report.kills,
            report.damage_dealt,
            report.damage_taken,
            if report.player_alive { "alive" } else { "dead" }
        );
        Ok(report)
    }

    fn is_alive(&self, entity: EntityId) -> bool {
        self.world.combatant(entity).is_some_and(|c| c.is_alive())
    }

    fn living_enemy(&self) -> Option<EntityId> {
        self.enemies.iter().copied().find(|e| self.is_alive(*e))
    }

    fn cast_fire_bolt(&mut self, target: EntityId) -> CombatResult<EffectOutcome> {
        let level = self
            .world
            .combatant(self.player)
            .ok_or(CombatError::EntityNotFound(self.player))?
            .level();
        let params = self.fire_bolt.clone().with_level(level);
        let outcome = self.world.apply_damage_effect(self.player, target, &params)?;
        debug!("Fire Bolt on {target}: {outcome:?}");
        Ok(outcome)
    }

    fn enemy_attacks(&mut self) -> CombatResult<()> {
        let attackers: Vec<EntityId> = self
            .enemies
            .iter()
            .copied()
            .filter(|e| self.is_alive(*e))
            .collect();
        for enemy in attackers {
            if !self.is_alive(self.player) {
                break;
            }
            let outcome = self.world.apply_damage_effect(enemy, self.player, &self.melee)?;
            debug!("{enemy} hits player: {outcome:?}");
        }
        Ok(())
    }

    fn tally_events(&self, report: &mut ScenarioReport) {
        let events = self.world.events();
        report.events += events.len();
        for event in &events {
            match event {
                GameEvent::DamageNumber {
                    source,
                    target,
                    amount,
                    critical,
                    ..
                } => {
                    if *source == self.player {
                        report.damage_dealt += amount;
                    } else if *target == self.player {
                        report.damage_taken += amount;
                    }
                    if *critical {
                        report.critical_hits += 1;
                    }
                },
                GameEvent::Died { entity, killer, .. } => {
                    info!("{entity} died, killed by {killer}");
                    if *killer == self.player {
                        report.kills += 1;
                    }
                },
                GameEvent::DebuffApplied { .. } => report.debuffs_applied += 1,
                GameEvent::LevelChanged { entity, level } => {
                    info!("{entity} reached level {level}");
                },
                _ => {},
            }
            debug!(kind = event.kind(), "event");
        }
    }
}
