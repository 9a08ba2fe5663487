//! Contact damage between living entities.
//!
//! The `DamageResolver` handles:
//! - Mutual damage exchange when two living entities touch
//! - Death detection and killer attribution through the owner chain
//! - The per-tick damage blink on [`StyleFlags::HAS_BEEN_DAMAGED`]
//!
//! # Exchange
//!
//! Both sides share one multiplier, `max(min multipliers) * min(max
//! multipliers)`. Each side's raw output is its `damage_per_tick` times that
//! multiplier times the opponent's `damage_reduction`. Both outputs are then
//! scaled by one common factor so that neither pool is driven below zero by
//! this exchange alone. A side whose raw output is zero imposes no limit on
//! that factor.
//!
//! A pair trades at most once per tick; the record is cleared during
//! integration.

use crate::entity::{EntityId, EntityRef, StyleFlags};
use crate::event::TickEvent;
use crate::table::EntityTable;

use super::{Contact, Resolver, TickContext};

/// Health at or below this counts as dead.
pub const DEATH_THRESHOLD: f32 = 0.0001;

/// Resolver exchanging contact damage.
#[derive(Debug, Clone, Copy, Default)]
pub struct DamageResolver;

impl DamageResolver {
    /// Creates a damage resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Resolver for DamageResolver {
    fn name(&self) -> &'static str {
        "damage"
    }

    fn resolve(&self, contact: Contact, ctx: &mut TickContext<'_>) {
        let Some(exchange) = plan_exchange(ctx.table, contact.a, contact.b) else {
            return;
        };
        receive_damage(ctx, contact.a, exchange.b_ref, exchange.to_a);
        receive_damage(ctx, contact.b, exchange.a_ref, exchange.to_b);
    }
}

/// Damage each side will take from one exchange.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Exchange {
    a_ref: EntityRef,
    b_ref: EntityRef,
    to_a: f32,
    to_b: f32,
}

fn plan_exchange(table: &EntityTable, a: EntityId, b: EntityId) -> Option<Exchange> {
    let (ea, eb) = (table.get(a)?, table.get(b)?);
    let (ha, hb) = (ea.health.as_ref()?, eb.health.as_ref()?);

    if ea.relations.team.is_ally_of(eb.relations.team) {
        return None;
    }
    if ha.health <= 0.0 || hb.health <= 0.0 {
        return None;
    }
    if ha.exchanged_with.contains(&b) || hb.exchanged_with.contains(&a) {
        return None;
    }
    if ha.damage_reduction == 0.0 && hb.damage_reduction == 0.0 {
        return None;
    }
    let inert = |dpt: f32, push: f32| dpt == 0.0 && push == 0.0;
    if inert(ha.damage_per_tick, ea.physics.push_factor)
        && inert(hb.damage_per_tick, eb.physics.push_factor)
    {
        return None;
    }

    let multiplier = ha.min_damage_multiplier.max(hb.min_damage_multiplier)
        * ha.max_damage_multiplier.min(hb.max_damage_multiplier);
    let raw_a = ha.damage_per_tick * multiplier * hb.damage_reduction;
    let raw_b = hb.damage_per_tick * multiplier * ha.damage_reduction;
    let scale = clamp_scale(ha.health, hb.health, raw_a, raw_b);

    Some(Exchange {
        a_ref: ea.entity_ref()?,
        b_ref: eb.entity_ref()?,
        to_a: raw_b * scale,
        to_b: raw_a * scale,
    })
}

/// Common factor keeping both pools at or above zero.
///
/// `raw_a` is what A deals to B, `raw_b` what B deals to A.
fn clamp_scale(health_a: f32, health_b: f32, raw_a: f32, raw_b: f32) -> f32 {
    let mut scale = 1.0f32;
    if raw_b > 0.0 {
        scale = scale.min(health_a / raw_b);
    }
    if raw_a > 0.0 {
        scale = scale.min(health_b / raw_a);
    }
    scale
}

/// Applies `amount` of damage from `source` to `target`.
///
/// Already-dead targets snap to zero and ignore the hit. Otherwise the
/// source is recorded as traded with, the damage blink toggles at most once
/// per tick, and a [`TickEvent::Damaged`] is logged; reaching zero logs
/// [`TickEvent::Killed`] with the killer found by following live owners.
pub fn receive_damage(ctx: &mut TickContext<'_>, target: EntityId, source: EntityRef, amount: f32) {
    let tick = ctx.tick;
    let Some(entity) = ctx.table.get_mut(target) else {
        return;
    };
    let Some(victim) = entity.entity_ref() else {
        return;
    };
    let Some(health) = entity.health.as_mut() else {
        return;
    };

    if health.health <= DEATH_THRESHOLD {
        health.health = 0.0;
        return;
    }

    health.exchanged_with.push(source.id());
    if health.last_indicator_tick != Some(tick)
        && !entity.style.flags.contains(StyleFlags::HAS_NO_DMG_INDICATOR)
    {
        entity.style.flags.toggle(StyleFlags::HAS_BEEN_DAMAGED);
        health.last_indicator_tick = Some(tick);
    }

    health.last_damage_tick = tick;
    health.health -= amount;
    let killed = health.health <= DEATH_THRESHOLD;
    if killed {
        health.health = 0.0;
    }

    ctx.events.push(TickEvent::Damaged {
        tick,
        target: victim,
        source,
        amount,
    });

    if killed {
        let killer = owner_chain_root(ctx.table, source);
        tracing::debug!(?victim, ?killer, tick, "entity killed");
        ctx.events.push(TickEvent::Killed {
            tick,
            victim,
            source,
            killer,
        });
    }
}

/// Follows `owner` links through live entities.
#[must_use]
pub fn owner_chain_root(table: &EntityTable, start: EntityRef) -> EntityRef {
    let mut current = start;
    for _ in 0..table.capacity() {
        match table
            .resolve(current)
            .and_then(|e| e.relations.owner)
            .filter(|&owner| table.exists(owner))
        {
            Some(owner) => current = owner,
            None => break,
        }
    }
    current
}
