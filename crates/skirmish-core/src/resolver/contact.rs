//! Narrow phase: decides whether a broad-phase pair is really touching.
//!
//! Filters run in a fixed order and the first rejection wins:
//!
//! 1. either side has zero sides (markers never collide)
//! 2. either side is mid-deletion
//! 3. same non-zero team, and either side opts out of own-team contact, or
//!    the owners differ and either side only collides with same-owner mates
//! 4. a base against a world-team entity
//! 5. the shape test
//!
//! Shapes ignore rotation. Two rectangles never collide; a rectangle and a
//! circle use the closest point of the box to the circle's center; two
//! circles compare squared distance against the summed radii. Touching
//! counts as colliding.

use glam::Vec2;

use crate::entity::{Entity, EntityId, PhysicsFlags, TeamId};
use crate::table::EntityTable;

/// Looks both ids up and runs [`entities_collide`].
///
/// Empty slots, self-pairs and non-physical entities never collide.
#[must_use]
pub fn is_colliding(table: &EntityTable, a: EntityId, b: EntityId) -> bool {
    if a == b {
        return false;
    }
    match (table.get(a), table.get(b)) {
        (Some(ea), Some(eb)) => {
            ea.hierarchy.is_physical && eb.hierarchy.is_physical && entities_collide(ea, eb)
        }
        _ => false,
    }
}

/// Narrow-phase test between two entities.
#[must_use]
pub fn entities_collide(a: &Entity, b: &Entity) -> bool {
    if a.physics.sides == 0 || b.physics.sides == 0 {
        return false;
    }
    if a.is_deleting() || b.is_deleting() {
        return false;
    }
    if !team_rules_allow(a, b) {
        return false;
    }
    if base_ignores(a, b) || base_ignores(b, a) {
        return false;
    }
    shapes_touch(a, b)
}

fn team_rules_allow(a: &Entity, b: &Entity) -> bool {
    if !a.relations.team.is_ally_of(b.relations.team) {
        return true;
    }
    let either = |flag| a.physics.flags.contains(flag) || b.physics.flags.contains(flag);
    if either(PhysicsFlags::NO_OWN_TEAM_COLLISION) {
        return false;
    }
    !(a.relations.owner != b.relations.owner && either(PhysicsFlags::ONLY_SAME_OWNER_COLLISION))
}

fn base_ignores(base: &Entity, other: &Entity) -> bool {
    base.physics.flags.contains(PhysicsFlags::IS_BASE) && other.relations.team == TeamId::WORLD
}

fn shapes_touch(a: &Entity, b: &Entity) -> bool {
    match (a.physics.is_rect(), b.physics.is_rect()) {
        (true, true) => false,
        (true, false) => rect_touches_circle(a, b),
        (false, true) => rect_touches_circle(b, a),
        (false, false) => {
            let reach = a.physics.size + b.physics.size;
            a.position.coords.distance_squared(b.position.coords) <= reach * reach
        }
    }
}

fn rect_touches_circle(rect: &Entity, circle: &Entity) -> bool {
    let half = Vec2::new(rect.physics.size / 2.0, rect.physics.width / 2.0);
    let center = rect.position.coords;
    let point = circle.position.coords;
    let closest = point.clamp(center - half, center + half);
    let radius = circle.physics.size;
    closest.distance_squared(point) <= radius * radius
}
