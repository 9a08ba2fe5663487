//! Collision pipeline and integration.
//!
//! Every unique broad-phase pair goes through the narrow phase
//! ([`contact::is_colliding`]). Confirmed contacts are handed to each
//! registered [`Resolver`] in order; the default pipeline is
//! [`KnockbackResolver`] followed by [`DamageResolver`]. After all pairs are
//! resolved, [`PhysicsResolver`] integrates every physical entity.
//!
//! # Invariants
//!
//! - Resolvers see pairs in the grid's deterministic order with `a < b`
//! - Any randomness comes from [`TickContext::rng`], never from a global source
//! - Resolvers look entities up by id and tolerate slots emptied mid-tick

pub mod combat;
pub mod contact;
pub mod knockback;
pub mod physics;

pub use combat::DamageResolver;
pub use knockback::KnockbackResolver;
pub use physics::PhysicsResolver;

use rand_chacha::ChaCha8Rng;
use sieve::Occupancy;

use crate::entity::EntityId;
use crate::event::EventLog;
use crate::table::EntityTable;

/// A confirmed contact between two entities, `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// Lower id
    pub a: EntityId,
    /// Higher id
    pub b: EntityId,
}

/// Mutable world state lent to resolvers for the collision phase.
pub struct TickContext<'a> {
    /// Current tick
    pub tick: u64,
    /// The world's entities
    pub table: &'a mut EntityTable,
    /// The world's deterministic RNG
    pub rng: &'a mut ChaCha8Rng,
    /// Event sink
    pub events: &'a mut EventLog,
}

impl Occupancy for TickContext<'_> {
    fn is_live(&self, id: u16) -> bool {
        self.table.is_live(id)
    }
}

/// Applies the effect of a confirmed contact.
///
/// # Example
///
/// ```
/// use skirmish_core::resolver::{Contact, Resolver, TickContext};
///
/// struct CountContacts;
///
/// impl Resolver for CountContacts {
///     fn name(&self) -> &'static str {
///         "count"
///     }
///
///     fn resolve(&self, _contact: Contact, _ctx: &mut TickContext<'_>) {}
/// }
/// ```
pub trait Resolver: Send + Sync {
    /// Short name used in traces.
    fn name(&self) -> &'static str;

    /// Applies this resolver's effect to both sides of `contact`.
    fn resolve(&self, contact: Contact, ctx: &mut TickContext<'_>);
}
