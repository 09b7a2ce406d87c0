//! World state and core simulation types
//!
//! All entity collections and global counters live in a single owned
//! [`World`]; the subsystems borrow it mutably one at a time.

use glam::{IVec2, Vec2};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, Circle};
use super::effects::{ActiveEffect, EffectKind, EffectManager, Modifiers};
use crate::consts::*;
use crate::tuning::Tuning;
use crate::{cell_center, in_grid, player_spawn};

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, nothing simulates until start
    Ready,
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Lives exhausted
    GameOver,
}

/// The player's ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Center position (pixels)
    pub pos: Vec2,
    pub half_size: Vec2,
    pub base_speed: f32,
    pub base_fire_interval: f32,
    /// Seconds until the next manual shot is allowed
    pub fire_countdown: f32,
    /// Seconds until the auto turret fires again
    pub turret_countdown: f32,
    /// Mirrors the Shield stack count
    pub shield_charges: u32,
    /// Grace period after a shield absorbed a hit
    pub invulnerable_for: f32,
}

impl Player {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            pos: player_spawn(),
            half_size: Vec2::splat(PLAYER_SIZE / 2.0),
            base_speed: tuning.player_speed,
            base_fire_interval: tuning.fire_interval,
            fire_countdown: 0.0,
            turret_countdown: 0.0,
            shield_charges: 0,
            invulnerable_for: 0.0,
        }
    }

    /// Back to the spawn point with fresh timers
    pub fn reset(&mut self) {
        self.pos = player_spawn();
        self.fire_countdown = 0.0;
        self.turret_countdown = 0.0;
        self.invulnerable_for = 0.0;
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.pos, self.half_size)
    }
}

/// A shot fired by the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Hits left before the projectile is consumed (0 = consumed on first hit)
    pub pierce: u32,
    pub damage: u8,
    /// Cleared when the projectile leaves the playfield or is consumed
    pub active: bool,
    /// Cell of the last thing this projectile damaged
    pub last_hit_cell: Option<IVec2>,
}

impl Projectile {
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(
            self.pos,
            Vec2::new(PROJECTILE_WIDTH / 2.0, PROJECTILE_HEIGHT / 2.0),
        )
    }

    /// Spend one hit; returns true if the projectile survives it
    pub fn spend_hit(&mut self, cell: IVec2) -> bool {
        self.last_hit_cell = Some(cell);
        if self.pierce > 0 {
            self.pierce -= 1;
            true
        } else {
            self.active = false;
            false
        }
    }
}

/// A destructible cell occupant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub cell: IVec2,
    pub hp: u8,
}

/// Grid of obstacles. Storage is one slot per cell, so two obstacles can
/// never share a cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleField {
    cells: Vec<Option<Obstacle>>,
    count: usize,
}

impl Default for ObstacleField {
    fn default() -> Self {
        Self {
            cells: vec![None; (GRID_COLS * GRID_ROWS) as usize],
            count: 0,
        }
    }
}

impl ObstacleField {
    fn slot(cell: IVec2) -> Option<usize> {
        in_grid(cell).then(|| (cell.y * GRID_COLS + cell.x) as usize)
    }

    pub fn get(&self, cell: IVec2) -> Option<&Obstacle> {
        Self::slot(cell).and_then(|i| self.cells[i].as_ref())
    }

    pub fn get_mut(&mut self, cell: IVec2) -> Option<&mut Obstacle> {
        Self::slot(cell).and_then(|i| self.cells[i].as_mut())
    }

    pub fn is_occupied(&self, cell: IVec2) -> bool {
        self.get(cell).is_some()
    }

    /// Place an obstacle; refused if the cell is taken or off the grid
    pub fn insert(&mut self, cell: IVec2, hp: u8) -> bool {
        let Some(i) = Self::slot(cell) else {
            return false;
        };
        if self.cells[i].is_some() {
            return false;
        }
        self.cells[i] = Some(Obstacle { cell, hp });
        self.count += 1;
        true
    }

    pub fn remove(&mut self, cell: IVec2) -> Option<Obstacle> {
        let removed = Self::slot(cell).and_then(|i| self.cells[i].take());
        if removed.is_some() {
            self.count -= 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
        self.count = 0;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Obstacles in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.cells.iter().flatten()
    }
}

/// One unit of an enemy chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub cell: IVec2,
    pub head: bool,
}

impl Segment {
    pub fn center(&self) -> Vec2 {
        cell_center(self.cell)
    }

    pub fn hitbox(&self) -> Circle {
        Circle::new(self.center(), SEGMENT_RADIUS)
    }
}

/// An ordered run of segments moving as one unit (head = index 0)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyChain {
    pub id: u32,
    pub segments: Vec<Segment>,
    /// Horizontal travel direction, +1 or -1
    pub direction: i32,
    /// Fractional progress toward the next grid step
    pub accumulator: f32,
    /// Seconds per grid step before slowdown is applied
    pub step_interval: f32,
}

impl EnemyChain {
    /// Build a chain from cells ordered head first
    pub fn new(id: u32, cells: &[IVec2], direction: i32, step_interval: f32) -> Self {
        let segments = cells
            .iter()
            .enumerate()
            .map(|(i, &cell)| Segment { cell, head: i == 0 })
            .collect();
        Self {
            id,
            segments,
            direction,
            accumulator: 0.0,
            step_interval,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn head(&self) -> Option<&Segment> {
        self.segments.first()
    }
}

/// A collectible that grants a power-up on contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub id: u32,
    pub kind: EffectKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Seconds left before it vanishes unclaimed
    pub ttl: f32,
    pub active: bool,
}

impl Pickup {
    pub fn hitbox(&self) -> Circle {
        Circle::new(self.pos, PICKUP_RADIUS)
    }
}

/// Final result of a run, handed to the high-score collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub score: u64,
    pub level: u32,
}

/// Things that happened during a tick, for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    /// A pickup was claimed; the host decides how long to show the card
    PickupCollected {
        kind: EffectKind,
        title: &'static str,
        description: &'static str,
        duration_hint: Option<f32>,
    },
    EffectExpired { kind: EffectKind },
    ObstacleDestroyed { cell: IVec2 },
    SegmentDestroyed { cell: IVec2, head: bool },
    ChainSplit { parent: u32, tail: u32 },
    ShieldAbsorbed,
    LifeLost { lives_left: u32 },
    WaveCleared { level: u32 },
    GameOver(RunSummary),
}

/// Read-only view of everything a renderer needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub phase: GamePhase,
    pub time: f64,
    pub score: u64,
    pub lives: u32,
    pub level: u32,
    pub player: Player,
    pub projectiles: Vec<Projectile>,
    pub obstacles: Vec<Obstacle>,
    pub chains: Vec<EnemyChain>,
    pub pickups: Vec<Pickup>,
    pub effects: Vec<ActiveEffect>,
    pub modifiers: Modifiers,
}

/// Complete simulation state
#[derive(Debug, Clone)]
pub struct World {
    pub tuning: Tuning,
    /// Run seed for reproducibility
    pub seed: u64,
    /// The only source of randomness in the simulation
    pub rng: Pcg32,
    pub phase: GamePhase,
    /// Simulation clock (seconds); sampled once per tick
    pub time: f64,
    pub score: u64,
    pub lives: u32,
    pub level: u32,
    pub player: Player,
    /// Sorted by id
    pub projectiles: Vec<Projectile>,
    pub obstacles: ObstacleField,
    /// Sorted by id
    pub chains: Vec<EnemyChain>,
    /// Sorted by id
    pub pickups: Vec<Pickup>,
    pub effects: EffectManager,
    /// Derived from `effects` at the end of every tick
    pub modifiers: Modifiers,
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl World {
    /// Create a world with default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    /// Create a world in the Ready phase with its first obstacle field laid out
    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        let mut world = Self {
            player: Player::new(&tuning),
            lives: tuning.starting_lives,
            tuning,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Ready,
            time: 0.0,
            score: 0,
            level: 1,
            projectiles: Vec::new(),
            obstacles: ObstacleField::default(),
            chains: Vec::new(),
            pickups: Vec::new(),
            effects: EffectManager::default(),
            modifiers: Modifiers::default(),
            events: Vec::new(),
            next_id: 1,
        };

        super::wave::regenerate_obstacles(&mut world);

        world
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add points scaled by the active score multiplier
    pub fn award(&mut self, base: u64) {
        self.score += base * self.modifiers.score_multiplier as u64;
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every event produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn total_segments(&self) -> usize {
        self.chains.iter().map(EnemyChain::len).sum()
    }

    pub fn run_summary(&self) -> RunSummary {
        RunSummary {
            score: self.score,
            level: self.level,
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            phase: self.phase,
            time: self.time,
            score: self.score,
            lives: self.lives,
            level: self.level,
            player: self.player.clone(),
            projectiles: self.projectiles.clone(),
            obstacles: self.obstacles.iter().copied().collect(),
            chains: self.chains.clone(),
            pickups: self.pickups.clone(),
            effects: self.effects.iter().cloned().collect(),
            modifiers: self.modifiers.clone(),
        }
    }

    /// Ensure collections are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.projectiles.sort_by_key(|p| p.id);
        self.chains.sort_by_key(|c| c.id);
        self.pickups.sort_by_key(|p| p.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_world_is_ready_with_field() {
        let world = World::new(7);
        assert_eq!(world.phase, GamePhase::Ready);
        assert_eq!(world.level, 1);
        assert_eq!(world.lives, 3);
        assert!(!world.obstacles.is_empty());
        assert!(world.chains.is_empty());
    }

    #[test]
    fn test_obstacle_field_rejects_duplicates() {
        let mut field = ObstacleField::default();
        let cell = IVec2::new(3, 4);
        assert!(field.insert(cell, 4));
        assert!(!field.insert(cell, 2));
        assert_eq!(field.len(), 1);
        assert_eq!(field.get(cell).map(|o| o.hp), Some(4));
    }

    #[test]
    fn test_obstacle_field_rejects_off_grid() {
        let mut field = ObstacleField::default();
        assert!(!field.insert(IVec2::new(-1, 0), 4));
        assert!(!field.insert(IVec2::new(0, GRID_ROWS), 4));
        assert!(field.is_empty());
    }

    #[test]
    fn test_obstacle_field_remove_updates_count() {
        let mut field = ObstacleField::default();
        field.insert(IVec2::new(1, 1), 4);
        field.insert(IVec2::new(2, 1), 4);
        assert!(field.remove(IVec2::new(1, 1)).is_some());
        assert!(field.remove(IVec2::new(1, 1)).is_none());
        assert_eq!(field.len(), 1);
        assert_eq!(field.iter().count(), 1);
    }

    #[test]
    fn test_chain_head_flags() {
        let cells = [IVec2::new(5, 0), IVec2::new(4, 0), IVec2::new(3, 0)];
        let chain = EnemyChain::new(1, &cells, 1, 0.2);
        assert!(chain.segments[0].head);
        assert!(!chain.segments[1].head);
        assert!(!chain.segments[2].head);
    }

    #[test]
    fn test_projectile_spend_hit() {
        let mut p = Projectile {
            id: 1,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            pierce: 1,
            damage: 1,
            active: true,
            last_hit_cell: None,
        };
        assert!(p.spend_hit(IVec2::new(1, 1)));
        assert!(p.active);
        assert!(!p.spend_hit(IVec2::new(1, 2)));
        assert!(!p.active);
        assert_eq!(p.last_hit_cell, Some(IVec2::new(1, 2)));
    }

    #[test]
    fn test_snapshot_serializes() {
        let world = World::new(3);
        let json = serde_json::to_string(&world.snapshot()).unwrap();
        assert!(json.contains("\"phase\":\"Ready\""));
    }

    #[test]
    fn test_drain_events_empties_queue() {
        let mut world = World::new(3);
        world.emit(GameEvent::ShieldAbsorbed);
        assert_eq!(world.drain_events(), vec![GameEvent::ShieldAbsorbed]);
        assert!(world.drain_events().is_empty());
    }
}
