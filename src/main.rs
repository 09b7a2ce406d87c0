//! Neon Centipede entry point
//!
//! The simulation has no window of its own. Natively this runs a headless
//! demo: the autopilot plays one run and the event stream is logged.
//!
//! Usage: `neon-centipede [seed] [tuning.json] [scores.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();

    if let Err(err) = demo::run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Hosts embed the library directly; nothing to run here
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use neon_centipede::sim::{FixedStepper, GameEvent, GamePhase, TickInput, World};
    use neon_centipede::{ConfigError, HighScores, Tuning};

    /// Host frame rate the demo pretends to run at
    const FRAME_DT: f32 = 1.0 / 60.0;
    /// Give up after ten simulated minutes
    const MAX_FRAMES: u32 = 60 * 60 * 10;

    pub fn run() -> Result<(), ConfigError> {
        let mut args = std::env::args().skip(1);
        let seed = args
            .next()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or_else(|| now_ms() as u64);
        let tuning = match args.next() {
            Some(path) => {
                let tuning = Tuning::from_json(&std::fs::read_to_string(&path)?)?;
                log::info!("Loaded tuning from {}", path);
                tuning
            }
            None => Tuning::default(),
        };
        let scores_path = args.next().map(PathBuf::from);

        log::info!("Neon Centipede (native) starting, seed {}", seed);

        let mut world = World::with_tuning(seed, tuning);
        let mut stepper = FixedStepper::new();
        let mut input = TickInput {
            start: true,
            idle_mode: true,
            ..Default::default()
        };

        let mut frames = 0;
        while world.phase != GamePhase::GameOver && frames < MAX_FRAMES {
            stepper.advance(&mut world, &input, FRAME_DT);
            input.start = false;
            frames += 1;

            for event in world.drain_events() {
                report(&event);
            }
        }

        let summary = world.run_summary();
        if world.phase != GamePhase::GameOver {
            log::warn!("Demo stopped after {} frames without a game over", frames);
        }
        println!(
            "Run finished: score {} at level {} after {:.1}s",
            summary.score, summary.level, world.time
        );

        if let Some(path) = scores_path {
            let mut scores = HighScores::load(&path)?;
            match scores.add_run(&summary, now_ms()) {
                Some(rank) => println!("New high score, rank #{}", rank),
                None => println!("No high score this time"),
            }
            scores.save(&path)?;
            for (i, entry) in scores.entries.iter().enumerate() {
                println!("{:>2}. {:>8}  level {}", i + 1, entry.score, entry.level);
            }
        }

        Ok(())
    }

    fn report(event: &GameEvent) {
        match event {
            GameEvent::PickupCollected {
                title,
                description,
                duration_hint,
                ..
            } => match duration_hint {
                Some(secs) => log::info!("{} ({}s): {}", title, secs, description),
                None => log::info!("{}: {}", title, description),
            },
            GameEvent::ShieldAbsorbed => log::info!("Shield took the hit"),
            other => log::debug!("{:?}", other),
        }
    }

    fn now_ms() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}
