//! Power-up effects
//!
//! Each [`EffectKind`] resolves through a static table to its presentation
//! text and activation style. Timed kinds keep one shared timer per kind:
//! collecting again adds a stack (magnitude) and pushes the timer out, it
//! never starts a second timer. Modifiers are derived from the stack counts
//! by a pure function, so recomputing is always idempotent.

use std::collections::BTreeMap;

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::state::{GameEvent, World};
use crate::cell_center;
use crate::consts::CELL_SIZE;
use crate::tuning::Tuning;

/// Power-up types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EffectKind {
    RapidFire,
    Shield,
    ExtraLife,
    Slowdown,
    Spread,
    Pierce,
    ScoreSurge,
    Thruster,
    PulseBomb,
    Stasis,
    AutoTurret,
    Magnet,
}

/// How collecting a power-up takes effect
#[derive(Clone, Copy)]
pub enum Activation {
    /// Runs once on collection and is never stored
    Instant(fn(&mut World)),
    /// Stacks; every collection refreshes the kind's single timer
    Timed,
    /// Stacks as charges that are spent one at a time, no timer
    Charges,
}

/// Static description of a power-up
pub struct EffectSpec {
    pub kind: EffectKind,
    pub title: &'static str,
    pub description: &'static str,
    pub activation: Activation,
    /// Relative chance of being picked when a pickup drops
    pub drop_weight: u32,
}

// Indexed by `EffectKind as usize`
static EFFECTS: [EffectSpec; 12] = [
    EffectSpec {
        kind: EffectKind::RapidFire,
        title: "Rapid Fire",
        description: "Blazing shots reduce cooldown.",
        activation: Activation::Timed,
        drop_weight: 10,
    },
    EffectSpec {
        kind: EffectKind::Shield,
        title: "Quantum Shield",
        description: "Absorbs one hit per stack.",
        activation: Activation::Charges,
        drop_weight: 8,
    },
    EffectSpec {
        kind: EffectKind::ExtraLife,
        title: "Extra Life",
        description: "Bonus life awarded instantly.",
        activation: Activation::Instant(grant_extra_life),
        drop_weight: 3,
    },
    EffectSpec {
        kind: EffectKind::Slowdown,
        title: "Temporal Drag",
        description: "Chains crawl slower.",
        activation: Activation::Timed,
        drop_weight: 8,
    },
    EffectSpec {
        kind: EffectKind::Spread,
        title: "Neon Spread",
        description: "Two extra shots per stack.",
        activation: Activation::Timed,
        drop_weight: 10,
    },
    EffectSpec {
        kind: EffectKind::Pierce,
        title: "Ion Pierce",
        description: "Shots punch through foes.",
        activation: Activation::Timed,
        drop_weight: 8,
    },
    EffectSpec {
        kind: EffectKind::ScoreSurge,
        title: "Score Surge",
        description: "Score multiplier boosts rewards.",
        activation: Activation::Timed,
        drop_weight: 8,
    },
    EffectSpec {
        kind: EffectKind::Thruster,
        title: "Thruster Boost",
        description: "Player speed intensifies.",
        activation: Activation::Timed,
        drop_weight: 8,
    },
    EffectSpec {
        kind: EffectKind::PulseBomb,
        title: "Pulse Bomb",
        description: "Nearby obstacles vaporize.",
        activation: Activation::Instant(pulse_bomb),
        drop_weight: 4,
    },
    EffectSpec {
        kind: EffectKind::Stasis,
        title: "Stasis Field",
        description: "Chains freeze in place.",
        activation: Activation::Timed,
        drop_weight: 5,
    },
    EffectSpec {
        kind: EffectKind::AutoTurret,
        title: "Auto Turret",
        description: "Automatic precision firing.",
        activation: Activation::Timed,
        drop_weight: 6,
    },
    EffectSpec {
        kind: EffectKind::Magnet,
        title: "Pickup Magnet",
        description: "Power-ups drift toward you.",
        activation: Activation::Timed,
        drop_weight: 6,
    },
];

impl EffectKind {
    pub const ALL: [EffectKind; 12] = [
        EffectKind::RapidFire,
        EffectKind::Shield,
        EffectKind::ExtraLife,
        EffectKind::Slowdown,
        EffectKind::Spread,
        EffectKind::Pierce,
        EffectKind::ScoreSurge,
        EffectKind::Thruster,
        EffectKind::PulseBomb,
        EffectKind::Stasis,
        EffectKind::AutoTurret,
        EffectKind::Magnet,
    ];

    pub fn spec(self) -> &'static EffectSpec {
        &EFFECTS[self as usize]
    }

    /// Timer length for timed kinds
    pub fn duration(self, tuning: &Tuning) -> Option<f32> {
        let d = &tuning.durations;
        match self {
            EffectKind::RapidFire => Some(d.rapid_fire),
            EffectKind::Slowdown => Some(d.slowdown),
            EffectKind::Spread => Some(d.spread),
            EffectKind::Pierce => Some(d.pierce),
            EffectKind::ScoreSurge => Some(d.score_surge),
            EffectKind::Thruster => Some(d.thruster),
            EffectKind::Stasis => Some(d.stasis),
            EffectKind::AutoTurret => Some(d.auto_turret),
            EffectKind::Magnet => Some(d.magnet),
            EffectKind::Shield | EffectKind::ExtraLife | EffectKind::PulseBomb => None,
        }
    }
}

/// A currently applied power-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub kind: EffectKind,
    /// Always >= 1 while stored
    pub stacks: u32,
    /// Absent for charge-based kinds
    pub expires_at: Option<f64>,
}

/// Active effects keyed by kind (at most one entry, and one timer, per kind)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectManager {
    active: BTreeMap<EffectKind, ActiveEffect>,
}

impl EffectManager {
    /// Add a stack (up to `max_stacks`) and set the shared expiry.
    /// Returns the new stack count.
    pub fn stack(&mut self, kind: EffectKind, expires_at: Option<f64>, max_stacks: u32) -> u32 {
        let entry = self.active.entry(kind).or_insert(ActiveEffect {
            kind,
            stacks: 0,
            expires_at,
        });
        entry.stacks = (entry.stacks + 1).min(max_stacks.max(1));
        entry.expires_at = expires_at;
        entry.stacks
    }

    pub fn stacks(&self, kind: EffectKind) -> u32 {
        self.active.get(&kind).map_or(0, |e| e.stacks)
    }

    pub fn is_active(&self, kind: EffectKind) -> bool {
        self.active.contains_key(&kind)
    }

    pub fn get(&self, kind: EffectKind) -> Option<&ActiveEffect> {
        self.active.get(&kind)
    }

    /// Spend one stack; the entry disappears with its last stack
    pub fn consume_charge(&mut self, kind: EffectKind) -> bool {
        let Some(entry) = self.active.get_mut(&kind) else {
            return false;
        };
        entry.stacks -= 1;
        if entry.stacks == 0 {
            self.active.remove(&kind);
        }
        true
    }

    /// Drop every timed entry whose expiry is at or before `now`
    pub fn expire(&mut self, now: f64) -> Vec<EffectKind> {
        let expired: Vec<EffectKind> = self
            .active
            .values()
            .filter(|e| e.expires_at.is_some_and(|t| t <= now))
            .map(|e| e.kind)
            .collect();
        for kind in &expired {
            self.active.remove(kind);
        }
        expired
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.active.values()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Gameplay modifiers derived from the active effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    pub fire_interval_factor: f32,
    pub speed_factor: f32,
    pub spread_count: u32,
    pub pierce_count: u32,
    pub projectile_damage: u8,
    pub score_multiplier: u32,
    /// Multiplies every chain's step interval
    pub chain_interval_factor: f32,
    pub chains_frozen: bool,
    /// Seconds between automatic shots while the turret runs
    pub auto_fire_interval: Option<f32>,
    pub magnet_radius: Option<f32>,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            fire_interval_factor: 1.0,
            speed_factor: 1.0,
            spread_count: 1,
            pierce_count: 0,
            projectile_damage: 1,
            score_multiplier: 1,
            chain_interval_factor: 1.0,
            chains_frozen: false,
            auto_fire_interval: None,
            magnet_radius: None,
        }
    }
}

/// Derive modifiers from stack counts
pub fn recompute_modifiers(effects: &EffectManager, tuning: &Tuning) -> Modifiers {
    let rapid = effects.stacks(EffectKind::RapidFire);
    let thruster = effects.stacks(EffectKind::Thruster);
    let spread = effects.stacks(EffectKind::Spread);
    let pierce = effects.stacks(EffectKind::Pierce);
    let surge = effects.stacks(EffectKind::ScoreSurge);
    let slow = effects.stacks(EffectKind::Slowdown);
    let turret = effects.stacks(EffectKind::AutoTurret);

    // Diminishing returns with a floor
    let fire_interval_factor = if rapid == 0 {
        1.0
    } else {
        tuning
            .rapid_fire_factor
            .powi(rapid as i32)
            .max(tuning.fire_interval_floor)
    };

    let speed_factor =
        (1.0 + tuning.thruster_per_stack * thruster as f32).min(tuning.thruster_cap.max(1.0));

    let spread_count = if spread == 0 {
        1
    } else {
        (1 + 2 * spread).min(tuning.spread_cap.max(1))
    };

    let (pierce_count, projectile_damage) = if pierce == 0 {
        (0, 1)
    } else {
        ((1 + pierce).min(tuning.pierce_cap), tuning.pierce_damage.max(1))
    };

    Modifiers {
        fire_interval_factor,
        speed_factor,
        spread_count,
        pierce_count,
        projectile_damage,
        score_multiplier: 1 + surge,
        chain_interval_factor: 1.0 + tuning.slowdown_per_stack * slow as f32,
        chains_frozen: effects.is_active(EffectKind::Stasis),
        auto_fire_interval: (turret > 0).then(|| {
            tuning.auto_fire_interval / (1.0 + tuning.auto_fire_per_stack * turret as f32)
        }),
        magnet_radius: effects
            .is_active(EffectKind::Magnet)
            .then_some(tuning.magnet_radius),
    }
}

/// Collect a power-up: announce it, then run or store it
pub fn apply(world: &mut World, kind: EffectKind) {
    let spec = kind.spec();
    let duration_hint = kind.duration(&world.tuning);
    world.emit(GameEvent::PickupCollected {
        kind,
        title: spec.title,
        description: spec.description,
        duration_hint,
    });

    match spec.activation {
        Activation::Instant(run) => {
            log::debug!("{} fired", spec.title);
            run(world);
        }
        Activation::Timed => {
            let expires_at = world.time + duration_hint.unwrap_or(0.0) as f64;
            let stacks = world
                .effects
                .stack(kind, Some(expires_at), world.tuning.max_stacks);
            log::debug!("{} x{} until {:.2}s", spec.title, stacks, expires_at);
        }
        Activation::Charges => {
            let stacks = world
                .effects
                .stack(kind, None, world.tuning.shield_max_charges);
            world.player.shield_charges = stacks;
            log::debug!("{} charges: {}", spec.title, stacks);
        }
    }
}

/// Spend one shield charge if any are left
pub fn consume_shield(world: &mut World) -> bool {
    let spent = world.effects.consume_charge(EffectKind::Shield);
    if spent {
        world.player.shield_charges = world.effects.stacks(EffectKind::Shield);
    }
    spent
}

/// Expire timed effects against this tick's clock sample, then rederive modifiers
pub fn update(world: &mut World) {
    for kind in world.effects.expire(world.time) {
        log::debug!("{} expired", kind.spec().title);
        on_expire(world, kind);
        world.emit(GameEvent::EffectExpired { kind });
    }
    refresh_modifiers(world);
}

pub fn refresh_modifiers(world: &mut World) {
    world.modifiers = recompute_modifiers(&world.effects, &world.tuning);
    world.player.shield_charges = world.effects.stacks(EffectKind::Shield);
}

/// Deactivation side-effects for state held outside the manager
fn on_expire(world: &mut World, kind: EffectKind) {
    if kind == EffectKind::AutoTurret {
        world.player.turret_countdown = 0.0;
    }
}

/// Weighted pick of a pickup type
pub fn roll_pickup_kind(rng: &mut Pcg32) -> EffectKind {
    let total: u32 = EFFECTS.iter().map(|e| e.drop_weight).sum();
    let mut roll = rng.random_range(0..total);
    for spec in &EFFECTS {
        if roll < spec.drop_weight {
            return spec.kind;
        }
        roll -= spec.drop_weight;
    }
    EffectKind::RapidFire
}

fn grant_extra_life(world: &mut World) {
    let cap = world.tuning.max_lives.max(world.lives);
    world.lives = (world.lives + 1).min(cap);
}

fn pulse_bomb(world: &mut World) {
    let radius = world.tuning.bomb_radius_cells * CELL_SIZE;
    let origin = world.player.pos;
    let doomed: Vec<_> = world
        .obstacles
        .iter()
        .filter(|o| cell_center(o.cell).distance(origin) < radius)
        .map(|o| o.cell)
        .collect();
    log::debug!("Pulse bomb clears {} obstacles", doomed.len());
    for cell in doomed {
        super::resolve::destroy_obstacle(world, cell);
    }
}
