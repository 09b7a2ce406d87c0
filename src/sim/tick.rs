//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use super::state::{GamePhase, World};
use super::{effects, movement, resolve, wave};
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Horizontal stick: -1, 0 or +1
    pub move_x: i8,
    /// Vertical stick: -1 (up), 0 or +1 (down)
    pub move_y: i8,
    /// Fire held
    pub fire: bool,
    /// Start a run from the title or game-over screen
    pub start: bool,
    /// Pause toggle
    pub pause: bool,
    /// Skip to next wave (debug/testing)
    pub skip_wave: bool,
    /// Idle/demo mode - AI plays the game
    pub idle_mode: bool,
}

/// Advance the world by `dt` seconds. Elapsed time is clamped to
/// [`MAX_FRAME_DT`]; anything longer than [`SIM_DT`] is simulated as equal
/// sub-steps no longer than `SIM_DT`, so shots cannot jump over a cell.
pub fn tick(world: &mut World, input: &TickInput, dt: f32) {
    let dt = dt.clamp(0.0, MAX_FRAME_DT);

    if input.start && matches!(world.phase, GamePhase::Ready | GamePhase::GameOver) {
        wave::start_run(world);
    }

    // Handle pause toggle
    if input.pause {
        match world.phase {
            GamePhase::Playing => {
                world.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => world.phase = GamePhase::Playing,
            _ => {}
        }
    }

    let substeps = (dt / SIM_DT).ceil().max(1.0) as u32;
    let step_dt = dt / substeps as f32;
    let mut input = input.clone();
    for _ in 0..substeps {
        if world.phase != GamePhase::Playing {
            return;
        }
        step(world, &input, step_dt);
        input.skip_wave = false;
    }
}

/// One sub-step of play
fn step(world: &mut World, input: &TickInput, dt: f32) {
    // One clock sample per step; expiry and durations all read this value
    world.time += dt as f64;

    let mut input = input.clone();
    if input.idle_mode {
        autopilot(world, &mut input);
    }

    if input.skip_wave {
        log::info!("Skipping level {}", world.level);
        world.chains.clear();
    }

    wave::check_wave_cleared(world);

    movement::move_player(world, &input, dt);
    movement::player_fire(world, &input);
    movement::move_projectiles(world, dt);
    movement::move_pickups(world, dt);
    let breaches = movement::advance_chains(world, dt);

    resolve::resolve(world, &breaches);

    effects::update(world);
    world.normalize_order();
}

/// Demo player: grab low pickups, otherwise sit under the lowest segment and
/// keep firing
fn autopilot(world: &World, input: &mut TickInput) {
    const DEADZONE: f32 = 4.0;
    const PICKUP_REACH: f32 = PLAYER_ZONE_TOP - CELL_SIZE * 3.0;

    let player = world.player.pos;
    let pickup = world
        .pickups
        .iter()
        .filter(|p| p.pos.y >= PICKUP_REACH)
        .min_by(|a, b| {
            (a.pos.x - player.x)
                .abs()
                .partial_cmp(&(b.pos.x - player.x).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

    // Lowest row first, nearest column on ties
    let segment = world
        .chains
        .iter()
        .flat_map(|c| &c.segments)
        .max_by_key(|s| (s.cell.y, -(s.center().x - player.x).abs() as i32));

    let target_x = pickup
        .map(|p| p.pos.x)
        .or_else(|| segment.map(|s| s.center().x));

    input.move_x = match target_x {
        Some(x) if x > player.x + DEADZONE => 1,
        Some(x) if x < player.x - DEADZONE => -1,
        _ => 0,
    };
    input.move_y = if pickup.is_some() { 1 } else { 0 };
    input.fire = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::effects::EffectKind;
    use crate::sim::state::{EnemyChain, GameEvent, Projectile};
    use glam::{IVec2, Vec2};

    fn started(seed: u64) -> World {
        let mut world = World::new(seed);
        let start = TickInput {
            start: true,
            ..Default::default()
        };
        tick(&mut world, &start, SIM_DT);
        world
    }

    #[test]
    fn test_ready_waits_for_start() {
        let mut world = World::new(12345);
        tick(&mut world, &TickInput::default(), SIM_DT);
        assert_eq!(world.phase, GamePhase::Ready);
        assert_eq!(world.time, 0.0);
        assert!(world.chains.is_empty());

        let world = started(12345);
        assert_eq!(world.phase, GamePhase::Playing);
        assert_eq!(world.chains.len(), 1);
        assert!(world.time > 0.0);
    }

    #[test]
    fn test_tick_pause() {
        let mut world = started(12345);
        let time = world.time;

        let input = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut world, &input, SIM_DT);
        assert_eq!(world.phase, GamePhase::Paused);

        // Nothing advances while paused
        tick(&mut world, &TickInput::default(), SIM_DT);
        assert_eq!(world.time, time);

        // Unpause
        tick(&mut world, &input, SIM_DT);
        assert_eq!(world.phase, GamePhase::Playing);
        assert!(world.time > time);
    }

    #[test]
    fn test_long_frame_is_clamped() {
        let mut world = started(3);
        let before = world.time;
        tick(&mut world, &TickInput::default(), 5.0);
        assert!((world.time - before - MAX_FRAME_DT as f64).abs() < 1e-6);
    }

    #[test]
    fn test_long_frame_does_not_tunnel_through_obstacles() {
        let mut world = started(3);
        world.obstacles.clear();
        let cell = IVec2::new(10, 11);
        world.obstacles.insert(cell, 4);
        let id = world.next_entity_id();
        world.projectiles.push(Projectile {
            id,
            pos: Vec2::new(210.0, 251.0),
            vel: Vec2::new(0.0, -520.0),
            pierce: 0,
            damage: 1,
            active: true,
            last_hit_cell: None,
        });

        tick(&mut world, &TickInput::default(), MAX_FRAME_DT);

        assert_eq!(world.obstacles.get(cell).map(|o| o.hp), Some(3));
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn test_absorbed_breach_does_not_clear_wave() {
        let mut world = started(3);
        world.obstacles.clear();
        crate::sim::effects::apply(&mut world, EffectKind::Shield);
        world.chains.clear();
        let id = world.next_entity_id();
        let cells = [
            IVec2::new(GRID_COLS - 1, BREACH_ROW - 1),
            IVec2::new(GRID_COLS - 2, BREACH_ROW - 1),
        ];
        world.chains.push(EnemyChain::new(id, &cells, 1, 0.001));

        tick(&mut world, &TickInput::default(), SIM_DT);
        tick(&mut world, &TickInput::default(), SIM_DT);

        assert_eq!(world.level, 1);
        assert_eq!(world.lives, 3);
        assert_eq!(world.score, 0);
        assert_eq!(world.chains.len(), 1);
        assert_eq!(world.chains[0].id, id);
        assert!(world.drain_events().contains(&GameEvent::ShieldAbsorbed));
    }

    #[test]
    fn test_skip_wave_advances_level() {
        let mut world = started(3);
        let input = TickInput {
            skip_wave: true,
            ..Default::default()
        };
        tick(&mut world, &input, SIM_DT);
        assert_eq!(world.level, 2);
        assert_eq!(world.chains.len(), 1);
        assert!(world
            .drain_events()
            .contains(&GameEvent::WaveCleared { level: 1 }));
    }

    #[test]
    fn test_game_over_freezes_until_restart() {
        let mut world = started(3);
        world.phase = GamePhase::GameOver;
        world.score = 250;
        let time = world.time;

        tick(&mut world, &TickInput::default(), SIM_DT);
        assert_eq!(world.time, time);
        assert_eq!(world.score, 250);

        let start = TickInput {
            start: true,
            ..Default::default()
        };
        tick(&mut world, &start, SIM_DT);
        assert_eq!(world.phase, GamePhase::Playing);
        assert_eq!(world.score, 0);
    }

    #[test]
    fn test_autopilot_fires() {
        let mut world = started(77);
        let idle = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        for _ in 0..10 {
            tick(&mut world, &idle, SIM_DT);
        }
        assert!(!world.projectiles.is_empty() || world.score > 0);
    }

    #[test]
    fn test_determinism() {
        // Two worlds with the same seed and inputs stay identical
        let mut world1 = started(99999);
        let mut world2 = started(99999);

        let idle = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        for _ in 0..3000 {
            tick(&mut world1, &idle, SIM_DT);
            tick(&mut world2, &idle, SIM_DT);
        }

        let a = serde_json::to_string(&world1.snapshot()).unwrap();
        let b = serde_json::to_string(&world2.snapshot()).unwrap();
        assert_eq!(a, b);
        assert_eq!(world1.drain_events(), world2.drain_events());
    }

    #[test]
    fn test_collections_stay_sorted_by_id() {
        let mut world = started(4242);
        let idle = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        for _ in 0..2000 {
            tick(&mut world, &idle, SIM_DT);
            assert!(world.chains.windows(2).all(|w| w[0].id < w[1].id));
            assert!(world.projectiles.windows(2).all(|w| w[0].id < w[1].id));
            assert!(world.pickups.windows(2).all(|w| w[0].id < w[1].id));
        }
    }
}
