//! Game balance values
//!
//! Every number that shapes difficulty lives here so a run can be retuned
//! from a JSON document without recompiling. Missing keys fall back to the
//! defaults, so a file only needs the values it changes.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Durations (seconds) of the timed power-ups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectDurations {
    pub rapid_fire: f32,
    pub slowdown: f32,
    pub spread: f32,
    pub pierce: f32,
    pub score_surge: f32,
    pub thruster: f32,
    pub stasis: f32,
    pub auto_turret: f32,
    pub magnet: f32,
}

impl Default for EffectDurations {
    fn default() -> Self {
        Self {
            rapid_fire: 12.0,
            slowdown: 8.0,
            spread: 10.0,
            pierce: 10.0,
            score_surge: 12.0,
            thruster: 12.0,
            stasis: 5.0,
            auto_turret: 10.0,
            magnet: 10.0,
        }
    }
}

/// Tunable gameplay parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Player ===
    /// Base movement speed (pixels/s)
    pub player_speed: f32,
    /// Base time between shots (seconds)
    pub fire_interval: f32,
    pub starting_lives: u32,
    pub max_lives: u32,

    // === Projectiles ===
    pub projectile_speed: f32,
    /// Angle between neighbouring shots of a spread volley (radians)
    pub spread_angle_step: f32,

    // === Obstacles ===
    pub obstacle_hp: u8,
    pub field_base_count: u32,
    pub field_per_level: u32,
    pub field_max_count: u32,

    // === Chains ===
    pub chain_base_length: u32,
    pub chain_length_per_level: u32,
    pub chain_max_length: u32,
    /// Seconds per grid step at level 1
    pub chain_base_interval: f32,
    pub chain_interval_per_level: f32,
    pub chain_min_interval: f32,
    /// Step interval multiplier applied to a detached tail
    pub split_speedup: f32,

    // === Scoring ===
    pub obstacle_score: u64,
    pub segment_score: u64,
    pub head_score: u64,

    // === Drops ===
    pub obstacle_drop_chance: f32,
    pub segment_drop_chance: f32,
    pub obstacle_regrow_chance: f32,
    pub pickup_fall_speed: f32,
    pub pickup_lifetime: f32,

    // === Power-up magnitudes ===
    pub max_stacks: u32,
    pub rapid_fire_factor: f32,
    pub fire_interval_floor: f32,
    pub thruster_per_stack: f32,
    pub thruster_cap: f32,
    pub spread_cap: u32,
    pub pierce_cap: u32,
    pub pierce_damage: u8,
    pub slowdown_per_stack: f32,
    pub shield_max_charges: u32,
    /// Invulnerability after a shield absorbs a hit (seconds)
    pub shield_grace: f32,
    pub auto_fire_interval: f32,
    pub auto_fire_per_stack: f32,
    pub magnet_radius: f32,
    pub magnet_pull_speed: f32,
    pub bomb_radius_cells: f32,

    pub durations: EffectDurations,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player_speed: 220.0,
            fire_interval: 0.26,
            starting_lives: 3,
            max_lives: 9,

            projectile_speed: 520.0,
            spread_angle_step: 0.15,

            obstacle_hp: 4,
            field_base_count: 35,
            field_per_level: 3,
            field_max_count: 120,

            chain_base_length: 12,
            chain_length_per_level: 2,
            chain_max_length: 30,
            chain_base_interval: 0.18,
            chain_interval_per_level: 0.01,
            chain_min_interval: 0.06,
            split_speedup: 0.95,

            obstacle_score: 5,
            segment_score: 10,
            head_score: 100,

            obstacle_drop_chance: 0.32,
            segment_drop_chance: 0.2,
            obstacle_regrow_chance: 0.8,
            pickup_fall_speed: 30.0,
            pickup_lifetime: 8.0,

            max_stacks: 5,
            rapid_fire_factor: 0.75,
            fire_interval_floor: 0.3,
            thruster_per_stack: 0.35,
            thruster_cap: 2.4,
            spread_cap: 7,
            pierce_cap: 4,
            pierce_damage: 2,
            slowdown_per_stack: 0.45,
            shield_max_charges: 3,
            shield_grace: 1.0,
            auto_fire_interval: 0.22,
            auto_fire_per_stack: 0.5,
            magnet_radius: 100.0,
            magnet_pull_speed: 100.0,
            bomb_radius_cells: 6.0,

            durations: EffectDurations::default(),
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) tuning document and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("obstacle_drop_chance", self.obstacle_drop_chance),
            ("segment_drop_chance", self.segment_drop_chance),
            ("obstacle_regrow_chance", self.obstacle_regrow_chance),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, value, "a probability in [0, 1]"));
            }
        }

        let positives = [
            ("player_speed", self.player_speed),
            ("fire_interval", self.fire_interval),
            ("projectile_speed", self.projectile_speed),
            ("chain_base_interval", self.chain_base_interval),
            ("chain_min_interval", self.chain_min_interval),
            ("split_speedup", self.split_speedup),
            ("pickup_lifetime", self.pickup_lifetime),
            ("auto_fire_interval", self.auto_fire_interval),
        ];
        for (name, value) in positives {
            if value <= 0.0 || !value.is_finite() {
                return Err(invalid(name, value, "a positive number"));
            }
        }

        if self.obstacle_hp == 0 {
            return Err(invalid("obstacle_hp", 0.0, "at least 1"));
        }
        if self.starting_lives == 0 {
            return Err(invalid("starting_lives", 0.0, "at least 1"));
        }
        if self.chain_base_length == 0 {
            return Err(invalid("chain_base_length", 0.0, "at least 1"));
        }
        if self.max_stacks == 0 {
            return Err(invalid("max_stacks", 0.0, "at least 1"));
        }
        if !(0.0..1.0).contains(&self.rapid_fire_factor) || self.rapid_fire_factor == 0.0 {
            return Err(invalid(
                "rapid_fire_factor",
                self.rapid_fire_factor,
                "a factor in (0, 1)",
            ));
        }
        Ok(())
    }

    /// Seconds per chain step for a fresh chain at `level`
    pub fn chain_interval_for_level(&self, level: u32) -> f32 {
        let faster = self.chain_interval_per_level * level.saturating_sub(1) as f32;
        (self.chain_base_interval - faster).max(self.chain_min_interval)
    }

    /// Segment count for a fresh chain at `level`
    pub fn chain_length_for_level(&self, level: u32) -> u32 {
        let longer = self.chain_length_per_level * level.saturating_sub(1);
        (self.chain_base_length + longer).min(self.chain_max_length.max(1))
    }

    /// Obstacles requested for the field at `level`
    pub fn field_count_for_level(&self, level: u32) -> u32 {
        (self.field_base_count + self.field_per_level * level).min(self.field_max_count)
    }
}

fn invalid(name: &'static str, value: impl Into<f64>, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.into(),
        expected,
    }
}
