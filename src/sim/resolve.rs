//! Collision and damage resolution
//!
//! Runs once per tick after movement, in a fixed order:
//! 1. projectiles vs obstacles
//! 2. projectiles vs chains (one segment per projectile per tick)
//! 3. pickups vs player and projectiles
//! 4. player vs chains, plus breaches reported by movement and still standing
//!    after the shots above
//!
//! Each pass only looks at entities still active after the earlier passes.
//! Dead projectiles and pickups are compacted at the end, never mid-pass.

use glam::{IVec2, Vec2};
use rand::Rng;

use super::chain::split_chain_at;
use super::collision::Aabb;
use super::effects::{self, roll_pickup_kind};
use super::wave;
use super::state::{EnemyChain, GameEvent, GamePhase, ObstacleField, Pickup, Projectile, World};
use crate::consts::BREACH_ROW;
use crate::{cell_center, cell_of};

pub fn resolve(world: &mut World, breaches: &[u32]) {
    projectiles_vs_obstacles(world);
    projectiles_vs_chains(world);
    collect_pickups(world);
    player_vs_chains(world, breaches);
    cleanup(world);
}

fn projectiles_vs_obstacles(world: &mut World) {
    for i in 0..world.projectiles.len() {
        let projectile = &world.projectiles[i];
        if !projectile.active {
            continue;
        }
        let Some(cell) = first_obstacle_hit(&world.obstacles, projectile) else {
            continue;
        };
        let damage = projectile.damage;
        world.projectiles[i].spend_hit(cell);
        damage_obstacle(world, cell, damage);
    }
}

/// Lowest overlapping obstacle (the one an upward shot meets first), skipping
/// the cell this projectile already damaged
fn first_obstacle_hit(obstacles: &ObstacleField, projectile: &Projectile) -> Option<IVec2> {
    let bounds = projectile.bounds();
    let lo = cell_of(bounds.min);
    let hi = cell_of(bounds.max);
    (lo.y..=hi.y).rev().find_map(|y| {
        (lo.x..=hi.x).map(|x| IVec2::new(x, y)).find(|&cell| {
            Some(cell) != projectile.last_hit_cell
                && obstacles.is_occupied(cell)
                && Aabb::from_cell(cell).overlaps(&bounds)
        })
    })
}

pub(crate) fn damage_obstacle(world: &mut World, cell: IVec2, damage: u8) {
    let Some(obstacle) = world.obstacles.get_mut(cell) else {
        return;
    };
    obstacle.hp = obstacle.hp.saturating_sub(damage);
    if obstacle.hp == 0 {
        destroy_obstacle(world, cell);
    }
}

/// Remove an obstacle, score it and roll for a pickup
pub(crate) fn destroy_obstacle(world: &mut World, cell: IVec2) {
    if world.obstacles.remove(cell).is_none() {
        return;
    }
    world.award(world.tuning.obstacle_score);
    world.emit(GameEvent::ObstacleDestroyed { cell });
    let chance = world.tuning.obstacle_drop_chance;
    roll_drop(world, cell_center(cell), chance);
}

fn projectiles_vs_chains(world: &mut World) {
    for i in 0..world.projectiles.len() {
        if !world.projectiles[i].active {
            continue;
        }
        let bounds = world.projectiles[i].bounds();
        let Some((chain_index, segment_index)) = find_segment_hit(&world.chains, &bounds) else {
            continue;
        };
        // The scan above is finished, so the chains can be restructured
        let cell = world.chains[chain_index].segments[segment_index].cell;
        world.projectiles[i].spend_hit(cell);
        destroy_segment(world, chain_index, segment_index);
    }
}

/// First segment (by chain order, then segment order) overlapping `bounds`
fn find_segment_hit(chains: &[EnemyChain], bounds: &Aabb) -> Option<(usize, usize)> {
    chains.iter().enumerate().find_map(|(ci, chain)| {
        chain
            .segments
            .iter()
            .position(|s| s.hitbox().overlaps_aabb(bounds))
            .map(|si| (ci, si))
    })
}

fn destroy_segment(world: &mut World, chain_index: usize, segment_index: usize) {
    let Some(segment) = split_chain_at(world, chain_index, segment_index) else {
        return;
    };

    let base = if segment.head {
        world.tuning.head_score
    } else {
        world.tuning.segment_score
    };
    world.award(base);
    world.emit(GameEvent::SegmentDestroyed {
        cell: segment.cell,
        head: segment.head,
    });

    let chance = world.tuning.segment_drop_chance;
    roll_drop(world, segment.center(), chance);

    let regrow: f32 = world.rng.random();
    if regrow < world.tuning.obstacle_regrow_chance
        && !Aabb::from_cell(segment.cell).overlaps(&world.player.bounds())
    {
        let hp = world.tuning.obstacle_hp;
        world.obstacles.insert(segment.cell, hp);
    }
}

/// Roll once against `chance`; on success drop a random pickup at `pos`
fn roll_drop(world: &mut World, pos: Vec2, chance: f32) -> bool {
    let roll: f32 = world.rng.random();
    if roll >= chance {
        return false;
    }
    let kind = roll_pickup_kind(&mut world.rng);
    let id = world.next_entity_id();
    log::debug!("Dropped {:?} at {:?}", kind, pos);
    world.pickups.push(Pickup {
        id,
        kind,
        pos,
        vel: Vec2::new(0.0, world.tuning.pickup_fall_speed),
        ttl: world.tuning.pickup_lifetime,
        active: true,
    });
    true
}

fn collect_pickups(world: &mut World) {
    let player_box = world.player.bounds();
    let mut collected = Vec::new();

    for pickup in world.pickups.iter_mut().filter(|p| p.active) {
        let hitbox = pickup.hitbox();
        let touched = hitbox.overlaps_aabb(&player_box)
            || world
                .projectiles
                .iter()
                .any(|p| p.active && hitbox.overlaps_aabb(&p.bounds()));
        if touched {
            pickup.active = false;
            collected.push(pickup.kind);
        }
    }

    for kind in collected {
        effects::apply(world, kind);
    }
}

fn player_vs_chains(world: &mut World, breaches: &[u32]) {
    let player_box = world.player.bounds();
    let touched = world
        .chains
        .iter()
        .flat_map(|c| &c.segments)
        .any(|s| s.hitbox().overlaps_aabb(&player_box));

    // Breaches were reported before any shot landed this tick; only chains
    // still holding a segment on the bottom row get through
    let breaching: Vec<usize> = if breaches.is_empty() {
        Vec::new()
    } else {
        world
            .chains
            .iter()
            .enumerate()
            .filter(|(_, c)| c.segments.iter().any(|s| s.cell.y >= BREACH_ROW))
            .map(|(i, _)| i)
            .collect()
    };
    if !touched && breaching.is_empty() {
        return;
    }

    // A chain that got through re-enters at the top whatever happens to the
    // player, so an absorbed breach never clears the wave
    for &i in &breaching {
        log::debug!("Chain {} breached", world.chains[i].id);
        wave::return_to_top(&mut world.chains[i]);
    }

    if world.player.invulnerable_for > 0.0 {
        return;
    }
    if effects::consume_shield(world) {
        world.player.invulnerable_for = world.tuning.shield_grace;
        world.emit(GameEvent::ShieldAbsorbed);
        return;
    }
    lose_life(world);
}

fn lose_life(world: &mut World) {
    world.lives = world.lives.saturating_sub(1);
    world.emit(GameEvent::LifeLost {
        lives_left: world.lives,
    });

    if world.lives == 0 {
        let summary = world.run_summary();
        log::info!(
            "Game over: score {} at level {}",
            summary.score,
            summary.level
        );
        world.phase = GamePhase::GameOver;
        world.emit(GameEvent::GameOver(summary));
    } else {
        log::info!("Life lost, {} left", world.lives);
        wave::reset_wave(world);
    }
}

fn cleanup(world: &mut World) {
    world.projectiles.retain(|p| p.active);
    world.pickups.retain(|p| p.active);
    world.chains.retain(|c| !c.is_empty());
}
