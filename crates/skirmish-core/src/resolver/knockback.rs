//! Knockback: colliding entities push each other apart.
//!
//! Each contact fires two directed effects, A experiencing B and then B
//! experiencing A. For a target T hit by a source S:
//!
//! - the push angle points from S to T (random when they coincide exactly)
//! - the magnitude is `T.absorption_factor * S.push_factor`
//! - walls and bases damp T's velocity and boost the push to compensate,
//!   unless T can move through walls
//! - a solid wall destroys an owned projectile of another team outright
//! - rectangular sources push along one of their four local cardinal
//!   directions, whichever the contact angle is most aligned with
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use skirmish_core::entity::Entity;
//! use skirmish_core::event::EventLog;
//! use skirmish_core::resolver::{Contact, KnockbackResolver, Resolver, TickContext};
//! use skirmish_core::table::EntityTable;
//!
//! let mut table = EntityTable::with_capacity(4);
//! let a = table.allocate(Entity::circle(Vec2::ZERO, 10.0)).unwrap();
//! let b = table.allocate(Entity::circle(Vec2::new(15.0, 0.0), 10.0)).unwrap();
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(1);
//! let mut events = EventLog::new();
//! let mut ctx = TickContext { tick: 1, table: &mut table, rng: &mut rng, events: &mut events };
//! KnockbackResolver::default().resolve(Contact { a: a.id(), b: b.id() }, &mut ctx);
//!
//! assert!(table.get(a.id()).unwrap().velocity.x < 0.0);
//! assert!(table.get(b.id()).unwrap().velocity.x > 0.0);
//! ```

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;
use rand::Rng;

use crate::config::PhysicsConfig;
use crate::entity::{EntityId, Physics, PhysicsFlags, Position, PositionFlags, TeamId};

use super::{Contact, Resolver, TickContext};

/// What a target needs to know about the entity pushing it.
#[derive(Debug, Clone, Copy)]
struct Pusher {
    position: Position,
    physics: Physics,
    team: TeamId,
}

/// Resolver applying mutual knockback.
#[derive(Debug, Clone)]
pub struct KnockbackResolver {
    wall_damping: f32,
}

impl Default for KnockbackResolver {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}

impl KnockbackResolver {
    /// Creates a resolver using the configured wall damping.
    #[must_use]
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            wall_damping: config.wall_damping,
        }
    }

    /// Applies the knockback `target` receives from `source`.
    fn experience(&self, ctx: &mut TickContext<'_>, target: EntityId, source: EntityId) {
        let Some(pusher) = ctx.table.get(source).map(|s| Pusher {
            position: s.position,
            physics: s.physics,
            team: s.relations.team,
        }) else {
            return;
        };
        let Some(owner_alive) = ctx
            .table
            .get(target)
            .map(|t| t.relations.owner.is_some_and(|o| ctx.table.exists(o)))
        else {
            return;
        };
        let Some(entity) = ctx.table.get_mut(target) else {
            return;
        };

        let mut magnitude = entity.physics.absorption_factor * pusher.physics.push_factor;
        let offset = entity.position.coords - pusher.position.coords;
        // Coincident entities get a random direction so they do not stack.
        let angle = if offset == Vec2::ZERO {
            ctx.rng.gen_range(0.0..TAU)
        } else {
            offset.y.atan2(offset.x)
        };

        let passthrough = entity
            .position
            .flags
            .contains(PositionFlags::CAN_MOVE_THROUGH_WALLS);
        let is_wall = pusher.physics.flags.contains(PhysicsFlags::IS_SOLID_WALL);
        let is_base = pusher.physics.flags.contains(PhysicsFlags::IS_BASE);

        if (is_wall || is_base) && !passthrough {
            let team = entity.relations.team;
            if is_wall && team != pusher.team && team != TeamId::WORLD && owner_alive {
                entity.velocity = Vec2::ZERO;
                entity.begin_deletion();
                tracing::trace!(%target, %source, "projectile stopped by wall");
                return;
            }
            entity.velocity *= self.wall_damping;
            magnitude /= self.wall_damping;
        }

        let push_angle = if pusher.physics.is_rect() {
            if passthrough {
                return;
            }
            rect_push_angle(angle, &pusher)
        } else {
            angle
        };
        entity.velocity += Vec2::from_angle(push_angle) * magnitude;
    }
}

/// Snaps a contact angle to the rectangle's nearest local cardinal direction.
///
/// The angle is taken into the rectangle's frame, compared against its
/// proportions, and the chosen axis is turned back into world space.
fn rect_push_angle(angle: f32, rect: &Pusher) -> f32 {
    let rotation = rect.position.angle;
    let local = angle + rotation;
    let along_size = local.cos() / rect.physics.size;
    let along_width = local.sin() / rect.physics.width;

    let cardinal = if along_size.abs() <= along_width.abs() {
        if along_width < 0.0 {
            3.0 * FRAC_PI_2
        } else {
            FRAC_PI_2
        }
    } else if along_size < 0.0 {
        PI
    } else {
        0.0
    };
    cardinal - rotation
}

impl Resolver for KnockbackResolver {
    fn name(&self) -> &'static str {
        "knockback"
    }

    fn resolve(&self, contact: Contact, ctx: &mut TickContext<'_>) {
        self.experience(ctx, contact.a, contact.b);
        self.experience(ctx, contact.b, contact.a);
    }
}
