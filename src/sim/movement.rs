//! Per-tick movement
//!
//! Player and projectiles integrate continuously; chains advance in discrete
//! grid steps driven by a per-chain accumulator.

use glam::{IVec2, Vec2};

use super::collision::Aabb;
use super::state::{EnemyChain, ObstacleField, Projectile, World};
use super::tick::TickInput;
use crate::consts::*;

/// Move the player by the input direction, blocked by obstacles and the
/// player band, and run down its timers
pub fn move_player(world: &mut World, input: &TickInput, dt: f32) {
    let dir = Vec2::new(input.move_x as f32, input.move_y as f32).normalize_or_zero();
    let speed = world.player.base_speed * world.modifiers.speed_factor;
    let delta = dir * speed * dt;
    let half = world.player.half_size;

    // Resolve one axis at a time so the player can slide along an obstacle
    let mut pos = world.player.pos;
    let moved_x = Vec2::new(
        (pos.x + delta.x).clamp(half.x, PLAYFIELD_WIDTH - half.x),
        pos.y,
    );
    if !overlaps_obstacle(&world.obstacles, Aabb::from_center(moved_x, half)) {
        pos = moved_x;
    }
    let moved_y = Vec2::new(
        pos.x,
        (pos.y + delta.y).clamp(PLAYER_ZONE_TOP, PLAYER_FLOOR),
    );
    if !overlaps_obstacle(&world.obstacles, Aabb::from_center(moved_y, half)) {
        pos = moved_y;
    }
    world.player.pos = pos;

    let player = &mut world.player;
    player.fire_countdown = (player.fire_countdown - dt).max(0.0);
    player.turret_countdown = (player.turret_countdown - dt).max(0.0);
    player.invulnerable_for = (player.invulnerable_for - dt).max(0.0);
}

fn overlaps_obstacle(obstacles: &ObstacleField, bounds: Aabb) -> bool {
    let lo = crate::cell_of(bounds.min);
    let hi = crate::cell_of(bounds.max);
    (lo.y..=hi.y).any(|y| {
        (lo.x..=hi.x).any(|x| {
            let cell = IVec2::new(x, y);
            obstacles.is_occupied(cell) && Aabb::from_cell(cell).overlaps(&bounds)
        })
    })
}

/// Fire on input when the shot timer allows it, and let the auto turret fire
/// on its own timer
pub fn player_fire(world: &mut World, input: &TickInput) {
    if input.fire && world.player.fire_countdown <= 0.0 {
        spawn_volley(world);
        world.player.fire_countdown =
            world.player.base_fire_interval * world.modifiers.fire_interval_factor;
    }

    if let Some(interval) = world.modifiers.auto_fire_interval {
        if world.player.turret_countdown <= 0.0 {
            spawn_volley(world);
            world.player.turret_countdown = interval;
        }
    }
}

/// Fan of `spread_count` shots centered on straight up
pub fn spawn_volley(world: &mut World) {
    let shots = world.modifiers.spread_count.max(1);
    let step = world.tuning.spread_angle_step;
    let first = -((shots - 1) as f32) * step / 2.0;
    let origin = world.player.pos - Vec2::new(0.0, world.player.half_size.y);
    let speed = world.tuning.projectile_speed;

    for i in 0..shots {
        let angle = first + i as f32 * step;
        let id = world.next_entity_id();
        world.projectiles.push(Projectile {
            id,
            pos: origin,
            vel: Vec2::new(angle.sin(), -angle.cos()) * speed,
            pierce: world.modifiers.pierce_count,
            damage: world.modifiers.projectile_damage,
            active: true,
            last_hit_cell: None,
        });
    }
}

/// Integrate projectiles; ones that leave the playfield are flagged inactive
/// and removed by the resolver's cleanup pass
pub fn move_projectiles(world: &mut World, dt: f32) {
    for projectile in world.projectiles.iter_mut().filter(|p| p.active) {
        projectile.pos += projectile.vel * dt;
        let p = projectile.pos;
        if p.x < -PROJECTILE_MARGIN
            || p.x > PLAYFIELD_WIDTH + PROJECTILE_MARGIN
            || p.y < -PROJECTILE_MARGIN
            || p.y > PLAYFIELD_HEIGHT + PROJECTILE_MARGIN
        {
            projectile.active = false;
        }
    }
}

/// Drift pickups toward the floor (or the player, under Magnet) and age them
pub fn move_pickups(world: &mut World, dt: f32) {
    let target = world.player.pos;
    let magnet = world.modifiers.magnet_radius;
    let pull = world.tuning.magnet_pull_speed;

    for pickup in world.pickups.iter_mut().filter(|p| p.active) {
        pickup.pos += pickup.vel * dt;

        if let Some(radius) = magnet {
            let to_player = target - pickup.pos;
            let dist = to_player.length();
            if dist < radius && dist > f32::EPSILON {
                pickup.pos += to_player / dist * (pull * dt).min(dist);
            }
        }

        // Settle on the player's lane so grounded pickups stay reachable
        pickup.pos.y = pickup.pos.y.min(PLAYER_FLOOR);
        pickup.ttl -= dt;
        if pickup.ttl <= 0.0 {
            pickup.active = false;
        }
    }
}

/// Advance every chain's accumulator and take the whole steps it has earned.
/// Returns the ids of chains that reached the breach row.
pub fn advance_chains(world: &mut World, dt: f32) -> Vec<u32> {
    let mut breaches = Vec::new();
    if world.modifiers.chains_frozen {
        return breaches;
    }

    let factor = world.modifiers.chain_interval_factor;
    for chain in &mut world.chains {
        let interval = (chain.step_interval * factor).max(f32::EPSILON);
        chain.accumulator += dt / interval;

        let mut steps = 0;
        while chain.accumulator >= 1.0 && steps < MAX_CHAIN_STEPS_PER_TICK {
            chain.accumulator -= 1.0;
            steps += 1;
            if step_chain(chain, &world.obstacles) {
                breaches.push(chain.id);
                break;
            }
        }
        // Catch-up is bounded; any backlog beyond it is dropped
        if chain.accumulator >= 1.0 {
            chain.accumulator = chain.accumulator.fract();
        }
    }
    breaches
}

/// One discrete grid step. Returns true if any segment reached the breach row.
pub fn step_chain(chain: &mut EnemyChain, obstacles: &ObstacleField) -> bool {
    let Some(head) = chain.head().map(|s| s.cell) else {
        return false;
    };

    let candidate = head + IVec2::new(chain.direction, 0);
    let blocked = !(0..GRID_COLS).contains(&candidate.x) || obstacles.is_occupied(candidate);

    let next = if blocked {
        chain.direction = -chain.direction;
        drop_target(head, obstacles)
    } else {
        candidate
    };

    let previous: Vec<IVec2> = chain.segments.iter().map(|s| s.cell).collect();
    chain.segments[0].cell = next;
    for (segment, &cell) in chain.segments.iter_mut().skip(1).zip(&previous) {
        segment.cell = cell;
    }

    chain.segments.iter().any(|s| s.cell.y >= BREACH_ROW)
}

/// First free row below `head` in the same column, trying a bounded number of
/// rows; if every one is occupied the last candidate is accepted
fn drop_target(head: IVec2, obstacles: &ObstacleField) -> IVec2 {
    let mut target = head;
    for rows in 1..=MAX_DROP_RETRIES {
        target = IVec2::new(head.x, (head.y + rows).min(BREACH_ROW));
        if !obstacles.is_occupied(target) {
            return target;
        }
    }
    log::warn!(
        "Chain head at {:?} found no free row within {} drops",
        head,
        MAX_DROP_RETRIES
    );
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::GamePhase;
    use proptest::prelude::*;

    fn empty_world() -> World {
        let mut world = World::new(11);
        world.obstacles.clear();
        world.phase = GamePhase::Playing;
        world
    }

    fn row_chain(head: IVec2, len: i32, direction: i32) -> EnemyChain {
        let cells: Vec<IVec2> = (0..len)
            .map(|i| head - IVec2::new(direction * i, 0))
            .collect();
        EnemyChain::new(1, &cells, direction, 0.1)
    }

    #[test]
    fn test_unblocked_step_moves_head_and_follows() {
        let obstacles = ObstacleField::default();
        let mut chain = row_chain(IVec2::new(10, 3), 3, 1);
        let before: Vec<IVec2> = chain.segments.iter().map(|s| s.cell).collect();

        assert!(!step_chain(&mut chain, &obstacles));
        assert_eq!(chain.segments[0].cell, IVec2::new(11, 3));
        assert_eq!(chain.segments[1].cell, before[0]);
        assert_eq!(chain.segments[2].cell, before[1]);
        assert_eq!(chain.direction, 1);
    }

    #[test]
    fn test_wall_turns_and_drops() {
        let obstacles = ObstacleField::default();
        let mut chain = row_chain(IVec2::new(GRID_COLS - 1, 3), 2, 1);
        step_chain(&mut chain, &obstacles);
        assert_eq!(chain.direction, -1);
        assert_eq!(chain.segments[0].cell, IVec2::new(GRID_COLS - 1, 4));
        assert_eq!(chain.segments[1].cell, IVec2::new(GRID_COLS - 1, 3));

        // Next step heads back left
        step_chain(&mut chain, &obstacles);
        assert_eq!(chain.segments[0].cell, IVec2::new(GRID_COLS - 2, 4));
    }

    #[test]
    fn test_obstacle_turns_chain() {
        let mut obstacles = ObstacleField::default();
        obstacles.insert(IVec2::new(6, 3), 4);
        let mut chain = row_chain(IVec2::new(5, 3), 1, 1);
        step_chain(&mut chain, &obstacles);
        assert_eq!(chain.direction, -1);
        assert_eq!(chain.segments[0].cell, IVec2::new(5, 4));
    }

    #[test]
    fn test_drop_skips_occupied_rows() {
        let mut obstacles = ObstacleField::default();
        obstacles.insert(IVec2::new(6, 3), 4);
        obstacles.insert(IVec2::new(5, 4), 4);
        let mut chain = row_chain(IVec2::new(5, 3), 1, 1);
        step_chain(&mut chain, &obstacles);
        assert_eq!(chain.segments[0].cell, IVec2::new(5, 5));
    }

    #[test]
    fn test_drop_gives_up_after_retry_budget() {
        let mut obstacles = ObstacleField::default();
        obstacles.insert(IVec2::new(6, 3), 4);
        for row in 4..=3 + MAX_DROP_RETRIES {
            obstacles.insert(IVec2::new(5, row), 4);
        }
        let mut chain = row_chain(IVec2::new(5, 3), 1, 1);
        step_chain(&mut chain, &obstacles);
        assert_eq!(chain.segments[0].cell, IVec2::new(5, 3 + MAX_DROP_RETRIES));
    }

    #[test]
    fn test_breach_reported_at_bottom() {
        let obstacles = ObstacleField::default();
        let mut chain = row_chain(IVec2::new(0, BREACH_ROW - 1), 2, -1);
        assert!(step_chain(&mut chain, &obstacles));
    }

    #[test]
    fn test_accumulator_steps_once_per_interval() {
        let mut world = empty_world();
        world.chains.push(row_chain(IVec2::new(10, 3), 3, 1));

        advance_chains(&mut world, 0.05);
        assert_eq!(world.chains[0].segments[0].cell, IVec2::new(10, 3));
        advance_chains(&mut world, 0.06);
        assert_eq!(world.chains[0].segments[0].cell, IVec2::new(11, 3));
    }

    #[test]
    fn test_catch_up_steps_are_bounded() {
        let mut world = empty_world();
        world.chains.push(row_chain(IVec2::new(10, 3), 1, 1));
        // 100 steps worth of time
        advance_chains(&mut world, 10.0);
        assert_eq!(
            world.chains[0].segments[0].cell,
            IVec2::new(10 + MAX_CHAIN_STEPS_PER_TICK as i32, 3)
        );
        assert!(world.chains[0].accumulator < 1.0);
    }

    #[test]
    fn test_frozen_chains_do_not_accumulate() {
        let mut world = empty_world();
        world.chains.push(row_chain(IVec2::new(10, 3), 1, 1));
        world.modifiers.chains_frozen = true;
        advance_chains(&mut world, 1.0);
        assert_eq!(world.chains[0].segments[0].cell, IVec2::new(10, 3));
        assert_eq!(world.chains[0].accumulator, 0.0);
    }

    #[test]
    fn test_slowdown_stretches_interval() {
        let mut world = empty_world();
        world.chains.push(row_chain(IVec2::new(10, 3), 1, 1));
        world.modifiers.chain_interval_factor = 2.0;
        advance_chains(&mut world, 0.15);
        assert_eq!(world.chains[0].segments[0].cell, IVec2::new(10, 3));
        advance_chains(&mut world, 0.06);
        assert_eq!(world.chains[0].segments[0].cell, IVec2::new(11, 3));
    }

    #[test]
    fn test_diagonal_input_is_normalized() {
        let mut world = empty_world();
        world.player.pos = Vec2::new(400.0, 560.0);
        let input = TickInput {
            move_x: 1,
            move_y: -1,
            ..Default::default()
        };
        move_player(&mut world, &input, 0.1);
        let moved = world.player.pos - Vec2::new(400.0, 560.0);
        assert!((moved.length() - world.player.base_speed * 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_player_clamped_to_band() {
        let mut world = empty_world();
        let input = TickInput {
            move_x: -1,
            move_y: -1,
            ..Default::default()
        };
        for _ in 0..100 {
            move_player(&mut world, &input, 0.05);
        }
        assert_eq!(world.player.pos.x, world.player.half_size.x);
        assert_eq!(world.player.pos.y, PLAYER_ZONE_TOP);
    }

    #[test]
    fn test_player_blocked_by_obstacle() {
        let mut world = empty_world();
        let start = world.player.pos;
        let right = crate::cell_of(start) + IVec2::new(1, 0);
        world.obstacles.insert(right, 4);
        let input = TickInput {
            move_x: 1,
            ..Default::default()
        };
        move_player(&mut world, &input, 0.1);
        assert!(!Aabb::from_cell(right).overlaps(&world.player.bounds()));
    }

    #[test]
    fn test_spread_volley_fans_out() {
        let mut world = empty_world();
        world.modifiers.spread_count = 3;
        world.modifiers.pierce_count = 2;
        spawn_volley(&mut world);
        assert_eq!(world.projectiles.len(), 3);
        assert!(world.projectiles[0].vel.x < 0.0);
        assert!(world.projectiles[1].vel.x.abs() < 1e-4);
        assert!(world.projectiles[2].vel.x > 0.0);
        assert!(world.projectiles.iter().all(|p| p.vel.y < 0.0 && p.pierce == 2));
    }

    #[test]
    fn test_fire_respects_countdown() {
        let mut world = empty_world();
        let input = TickInput {
            fire: true,
            ..Default::default()
        };
        player_fire(&mut world, &input);
        player_fire(&mut world, &input);
        assert_eq!(world.projectiles.len(), 1);
        assert!(world.player.fire_countdown > 0.0);
    }

    #[test]
    fn test_projectile_flagged_when_leaving_field() {
        let mut world = empty_world();
        spawn_volley(&mut world);
        move_projectiles(&mut world, 5.0);
        assert_eq!(world.projectiles.len(), 1);
        assert!(!world.projectiles[0].active);
    }

    proptest! {
        #[test]
        fn prop_followers_take_predecessor_cells(
            len in 1i32..15,
            head_x in 0i32..GRID_COLS,
            row in 0i32..20,
            right in any::<bool>(),
            blockers in proptest::collection::vec((0i32..GRID_COLS, 0i32..25), 0..30),
        ) {
            let mut obstacles = ObstacleField::default();
            for (x, y) in blockers {
                obstacles.insert(IVec2::new(x, y), 4);
            }
            let direction = if right { 1 } else { -1 };
            let cells: Vec<IVec2> = (0..len)
                .map(|i| IVec2::new(head_x - direction * i, row))
                .collect();
            let mut chain = EnemyChain::new(1, &cells, direction, 0.1);

            let before: Vec<IVec2> = chain.segments.iter().map(|s| s.cell).collect();
            step_chain(&mut chain, &obstacles);
            for i in 1..chain.segments.len() {
                prop_assert_eq!(chain.segments[i].cell, before[i - 1]);
            }
            prop_assert_eq!(chain.len(), len as usize);
        }
    }
}
