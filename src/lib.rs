//! Neon Centipede - simulation core for a segmented-chain arcade shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (movement, collisions, chains, power-ups, waves)
//! - `tuning`: Data-driven game balance
//! - `highscores`: Leaderboard collaborator fed with the end-of-run summary
//! - `error`: Errors for the fallible (data loading) surfaces

pub mod error;
pub mod highscores;
pub mod sim;
pub mod tuning;

pub use error::ConfigError;
pub use highscores::HighScores;
pub use tuning::Tuning;

use glam::{IVec2, Vec2};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest elapsed time a single tick will integrate (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Playfield grid
    pub const CELL_SIZE: f32 = 20.0;
    pub const GRID_COLS: i32 = 40;
    pub const GRID_ROWS: i32 = 30;
    pub const PLAYFIELD_WIDTH: f32 = GRID_COLS as f32 * CELL_SIZE;
    pub const PLAYFIELD_HEIGHT: f32 = GRID_ROWS as f32 * CELL_SIZE;

    /// Player vertical band (pixel y of the player's center)
    pub const PLAYER_ZONE_TOP: f32 = PLAYFIELD_HEIGHT - CELL_SIZE * 4.0;
    pub const PLAYER_FLOOR: f32 = PLAYFIELD_HEIGHT - CELL_SIZE * 1.5;
    pub const PLAYER_SIZE: f32 = CELL_SIZE;

    /// Projectile hitbox and the margin past the playfield before it is culled
    pub const PROJECTILE_WIDTH: f32 = 4.0;
    pub const PROJECTILE_HEIGHT: f32 = 10.0;
    pub const PROJECTILE_MARGIN: f32 = 20.0;

    /// Segment collision circle radius
    pub const SEGMENT_RADIUS: f32 = CELL_SIZE * 0.45;
    /// Pickup collision circle radius
    pub const PICKUP_RADIUS: f32 = 8.0;

    /// Chain stepping bounds
    pub const MAX_CHAIN_STEPS_PER_TICK: u32 = 4;
    pub const MAX_DROP_RETRIES: i32 = 3;
    /// Row at which a chain segment counts as having breached the defenses
    pub const BREACH_ROW: i32 = GRID_ROWS - 1;

    /// Obstacle field rows (min inclusive, max exclusive)
    pub const OBSTACLE_ROW_MIN: i32 = 2;
    pub const OBSTACLE_ROW_MAX: i32 = GRID_ROWS - 6;
    /// Cells around the player spawn kept clear of obstacles
    pub const SPAWN_FOOTPRINT_CELLS: i32 = 2;
}

/// Pixel center of a grid cell
#[inline]
pub fn cell_center(cell: IVec2) -> Vec2 {
    use consts::CELL_SIZE;
    Vec2::new(
        (cell.x as f32 + 0.5) * CELL_SIZE,
        (cell.y as f32 + 0.5) * CELL_SIZE,
    )
}

/// Grid cell containing a pixel position
#[inline]
pub fn cell_of(pos: Vec2) -> IVec2 {
    use consts::CELL_SIZE;
    IVec2::new(
        (pos.x / CELL_SIZE).floor() as i32,
        (pos.y / CELL_SIZE).floor() as i32,
    )
}

/// Whether a cell lies inside the playfield grid
#[inline]
pub fn in_grid(cell: IVec2) -> bool {
    use consts::{GRID_COLS, GRID_ROWS};
    (0..GRID_COLS).contains(&cell.x) && (0..GRID_ROWS).contains(&cell.y)
}

/// Canonical player spawn point
#[inline]
pub fn player_spawn() -> Vec2 {
    Vec2::new(consts::PLAYFIELD_WIDTH / 2.0, consts::PLAYER_FLOOR)
}
