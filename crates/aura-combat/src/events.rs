//! Event bus carrying combat notifications to UI, animation and AI consumers.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use aura_common::EntityId;

use crate::abilities::{AbilityStatus, AbilityTag};
use crate::attributes::Attribute;
use crate::tags::{DebuffKind, GameplayTag};

/// Why a debuff ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    /// Duration ran out
    Expired,
    /// Source removed its debuffs
    SourceRemoved,
    /// Target died
    TargetDied,
}

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An attribute value changed
    AttributeChanged {
        /// Entity ID
        entity: EntityId,
        /// Attribute
        attribute: Attribute,
        /// Previous value
        old: f32,
        /// New value
        new: f32,
    },
    /// Floating damage number for a player's screen
    DamageNumber {
        /// Player who should see the number
        observer: EntityId,
        /// Damage dealer
        source: EntityId,
        /// Damage receiver
        target: EntityId,
        /// Damage amount
        amount: f32,
        /// Hit was blocked
        blocked: bool,
        /// Hit was critical
        critical: bool,
    },
    /// Hit-react ability should play
    HitReactRequested {
        /// Entity reacting
        entity: EntityId,
        /// Tag of the ability to activate
        tag: GameplayTag,
    },
    /// Entity was launched by a knockback
    KnockedBack {
        /// Entity ID
        entity: EntityId,
        /// Launch force
        force: Vec3,
    },
    /// Entity died
    Died {
        /// Entity ID
        entity: EntityId,
        /// Entity that dealt the killing blow
        killer: EntityId,
        /// Impulse applied to the corpse
        impulse: Vec3,
    },
    /// Kill reward owed to a combatant
    XpRewarded {
        /// Entity receiving XP
        recipient: EntityId,
        /// Entity that died
        victim: EntityId,
        /// XP amount
        amount: u32,
    },
    /// Player XP changed
    XpChanged {
        /// Entity ID
        entity: EntityId,
        /// Total XP
        xp: u32,
        /// Fraction of the way to the next level
        progress: f32,
    },
    /// Player level changed
    LevelChanged {
        /// Entity ID
        entity: EntityId,
        /// New level
        level: u32,
    },
    /// Unspent attribute points changed
    AttributePointsChanged {
        /// Entity ID
        entity: EntityId,
        /// Unspent points
        points: u32,
    },
    /// Unspent spell points changed
    SpellPointsChanged {
        /// Entity ID
        entity: EntityId,
        /// Unspent points
        points: u32,
    },
    /// Debuff applied or refreshed
    DebuffApplied {
        /// Debuffed entity
        target: EntityId,
        /// Entity that applied it
        source: EntityId,
        /// Debuff kind
        kind: DebuffKind,
        /// An existing debuff from this source was refreshed
        refreshed: bool,
    },
    /// Debuff ended
    DebuffRemoved {
        /// Debuffed entity
        target: EntityId,
        /// Entity that applied it
        source: EntityId,
        /// Debuff kind
        kind: DebuffKind,
        /// Why it ended
        reason: RemovalReason,
    },
    /// Ability status changed
    AbilityStatusChanged {
        /// Entity ID
        entity: EntityId,
        /// Ability
        ability: AbilityTag,
        /// New status
        status: AbilityStatus,
    },
}

impl GameEvent {
    /// Short name of the event kind, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AttributeChanged { .. } => "attribute_changed",
            Self::DamageNumber { .. } => "damage_number",
            Self::HitReactRequested { .. } => "hit_react_requested",
            Self::KnockedBack { .. } => "knocked_back",
            Self::Died { .. } => "died",
            Self::XpRewarded { .. } => "xp_rewarded",
            Self::XpChanged { .. } => "xp_changed",
            Self::LevelChanged { .. } => "level_changed",
            Self::AttributePointsChanged { .. } => "attribute_points_changed",
            Self::SpellPointsChanged { .. } => "spell_points_changed",
            Self::DebuffApplied { .. } => "debuff_applied",
            Self::DebuffRemoved { .. } => "debuff_removed",
            Self::AbilityStatusChanged { .. } => "ability_status_changed",
        }
    }
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity, at least one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event to the bus.
    ///
    /// Never blocks. Returns false if the bus was full and the event dropped.
    pub fn publish(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Event bus full, dropping {}", e.into_inner().kind());
                false
            },
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        let entity = EntityId::from_raw(5);
        assert!(bus.publish(GameEvent::LevelChanged { entity, level: 2 }));
        assert!(bus.publish(GameEvent::SpellPointsChanged { entity, points: 1 }));
        assert_eq!(bus.pending_count(), 2);

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], GameEvent::LevelChanged { entity, level: 2 });
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_without_blocking() {
        let bus = EventBus::new(1);
        let entity = EntityId::from_raw(1);
        assert!(bus.publish(GameEvent::LevelChanged { entity, level: 2 }));
        assert!(!bus.publish(GameEvent::LevelChanged { entity, level: 3 }));
        assert_eq!(bus.capacity(), 1);
        assert_eq!(bus.drain().len(), 1);
    }

    #[test]
    fn test_zero_capacity_still_holds_one() {
        let bus = EventBus::new(0);
        assert_eq!(bus.capacity(), 1);
        assert!(bus.publish(GameEvent::LevelChanged {
            entity: EntityId::from_raw(1),
            level: 2,
        }));
        assert_eq!(bus.drain().len(), 1);
    }

    #[test]
    fn test_sender_handle_feeds_bus() {
        let bus = EventBus::default();
        let sender = bus.sender();
        sender
            .send(GameEvent::KnockedBack {
                entity: EntityId::from_raw(2),
                force: Vec3::X,
            })
            .expect("send");
        assert_eq!(bus.drain()[0].kind(), "knocked_back");
    }

    #[test]
    fn test_events_serialize_to_json() {
        let event = GameEvent::DebuffApplied {
            target: EntityId::from_raw(1),
            source: EntityId::from_raw(2),
            kind: DebuffKind::Burn,
            refreshed: false,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        let back: GameEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, event);
    }
}
