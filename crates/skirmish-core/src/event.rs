//! Tick events for game-mode collaborators.
//!
//! The core does not score kills or award anything; it records what
//! happened and the outer driver drains the log once per tick
//! (see [`Simulation::drain_events`](crate::Simulation::drain_events)).

use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;

/// Something observable that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TickEvent {
    /// Contact damage was applied.
    Damaged {
        /// Tick of the exchange
        tick: u64,
        /// Entity that lost health
        target: EntityRef,
        /// Entity that dealt the damage
        source: EntityRef,
        /// Health removed
        amount: f32,
    },
    /// A living entity's health reached zero.
    Killed {
        /// Tick of the killing blow
        tick: u64,
        /// Entity that died
        victim: EntityRef,
        /// Entity that dealt the final damage
        source: EntityRef,
        /// Top of the source's live owner chain (the tank behind a bullet)
        killer: EntityRef,
    },
    /// A deletion animation finished and the entity left the table.
    Removed {
        /// Tick of removal
        tick: u64,
        /// The removed entity
        entity: EntityRef,
    },
}

impl TickEvent {
    /// Tick the event happened on.
    #[must_use]
    pub fn tick(&self) -> u64 {
        match self {
            Self::Damaged { tick, .. } | Self::Killed { tick, .. } | Self::Removed { tick, .. } => {
                *tick
            }
        }
    }
}

/// Append-only event buffer owned by the simulation.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<TickEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event.
    pub fn push(&mut self, event: TickEvent) {
        self.events.push(event);
    }

    /// Removes and returns every recorded event, oldest first.
    pub fn drain(&mut self) -> Vec<TickEvent> {
        std::mem::take(&mut self.events)
    }

    /// Recorded events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TickEvent> {
        self.events.iter()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
