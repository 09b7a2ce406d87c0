//! Wave and level progression
//!
//! A wave is one obstacle field plus one chain. Clearing every chain advances
//! the level; losing a life restarts the wave at the same level.

use glam::IVec2;
use rand::Rng;

use super::effects;
use super::state::{EnemyChain, GameEvent, GamePhase, Player, World};
use crate::cell_of;
use crate::consts::*;
use crate::player_spawn;

/// Advance the level if every chain is gone. Returns true when it did.
pub fn check_wave_cleared(world: &mut World) -> bool {
    if world.phase != GamePhase::Playing || !world.chains.is_empty() {
        return false;
    }
    advance_level(world);
    true
}

/// Next level: new field, new chain. Running effects carry over.
pub fn advance_level(world: &mut World) {
    let cleared = world.level;
    world.level += 1;
    world.emit(GameEvent::WaveCleared { level: cleared });

    regenerate_obstacles(world);
    spawn_chain(world);

    log::info!(
        "Level {} cleared, starting level {} ({} obstacles, chain of {})",
        cleared,
        world.level,
        world.obstacles.len(),
        world.total_segments()
    );
}

/// Lay out a fresh obstacle field sized for the current level
pub fn regenerate_obstacles(world: &mut World) {
    world.obstacles.clear();

    let target = world.tuning.field_count_for_level(world.level) as usize;
    let hp = world.tuning.obstacle_hp;
    let mut attempts = target * 4;

    while world.obstacles.len() < target && attempts > 0 {
        attempts -= 1;
        let cell = IVec2::new(
            world.rng.random_range(0..GRID_COLS),
            world.rng.random_range(OBSTACLE_ROW_MIN..OBSTACLE_ROW_MAX),
        );
        if in_spawn_footprint(cell) {
            continue;
        }
        world.obstacles.insert(cell, hp);
    }

    if world.obstacles.len() < target {
        log::warn!(
            "Obstacle field under-filled: {} of {}",
            world.obstacles.len(),
            target
        );
    }
}

/// Enter a new chain along the top row, head first, heading right
pub fn spawn_chain(world: &mut World) {
    let len = world.tuning.chain_length_for_level(world.level) as usize;
    let cells = entry_cells(len);

    let id = world.next_entity_id();
    let interval = world.tuning.chain_interval_for_level(world.level);
    world.chains.push(EnemyChain::new(id, &cells, 1, interval));
}

/// Send a chain that got past the player back to the entry row. It keeps its
/// id, length and pace.
pub fn return_to_top(chain: &mut EnemyChain) {
    let cells = entry_cells(chain.len());
    for (segment, cell) in chain.segments.iter_mut().zip(cells) {
        segment.cell = cell;
    }
    chain.direction = 1;
    chain.accumulator = 0.0;
}

/// Top-row cells, head first at the right end, for a chain of `len`
fn entry_cells(len: usize) -> Vec<IVec2> {
    let len = len.clamp(1, GRID_COLS as usize) as i32;
    (0..len).map(|i| IVec2::new(len - 1 - i, 0)).collect()
}

/// Restart the current level after a life was lost. The obstacle field stays,
/// minus anything sitting where the player or the chain reappears.
pub fn reset_wave(world: &mut World) {
    world.projectiles.clear();
    world.pickups.clear();
    world.chains.clear();
    world.effects.clear();
    world.player.reset();
    effects::refresh_modifiers(world);

    let blocked: Vec<IVec2> = world
        .obstacles
        .iter()
        .map(|o| o.cell)
        .filter(|&cell| in_spawn_footprint(cell))
        .collect();
    for cell in blocked {
        world.obstacles.remove(cell);
    }

    spawn_chain(world);
}

/// Begin a new run from level 1
pub fn start_run(world: &mut World) {
    world.score = 0;
    world.lives = world.tuning.starting_lives;
    world.level = 1;
    world.projectiles.clear();
    world.pickups.clear();
    world.chains.clear();
    world.effects.clear();
    world.player = Player::new(&world.tuning);
    effects::refresh_modifiers(world);

    regenerate_obstacles(world);
    spawn_chain(world);
    world.phase = GamePhase::Playing;

    log::info!("Run started (seed {})", world.seed);
}

/// Cells kept free of obstacles: the chain's entry rows and the area around
/// the player spawn
pub fn in_spawn_footprint(cell: IVec2) -> bool {
    if cell.y < OBSTACLE_ROW_MIN {
        return true;
    }
    let spawn = cell_of(player_spawn());
    let d = (cell - spawn).abs();
    d.x <= SPAWN_FOOTPRINT_CELLS && d.y <= SPAWN_FOOTPRINT_CELLS
}
