//! Neon Survivors - headless runner
//!
//! Plays one autopiloted run at a virtual 60 fps, picking the first card of
//! every upgrade offer, and prints the result.
//!
//! Usage: `neon-survivors [seed]`. Reads `tuning.json` and `settings.json`
//! from the working directory when present.

use std::path::Path;

use neon_survivors::meta::format_time;
use neon_survivors::persistence::MetaStore;
use neon_survivors::sim::{GameEvent, TickInput};
use neon_survivors::{Session, Settings, Tuning};

/// Virtual frame rate of the headless loop
const FRAME_RATE: f64 = 60.0;
/// Hard stop in case a run never ends
const MAX_FRAMES: u64 = 60 * 60 * 30;

fn main() {
    env_logger::init();
    log::info!("Neon Survivors (headless) starting...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u64>().ok())
        .unwrap_or_else(rand::random::<u64>);

    let tuning = Tuning::load_from(Path::new("tuning.json"));
    let settings = Settings::load_from(Path::new("settings.json"));
    let mut session = Session::new(tuning, settings, Some(MetaStore::default()), seed);

    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };

    let mut summary = None;
    let mut frame = 0u64;
    while summary.is_none() && frame < MAX_FRAMES {
        session.frame(frame as f64 / FRAME_RATE, &input);
        frame += 1;

        for event in session.drain_events() {
            match event {
                GameEvent::UpgradeOffer(offer) => {
                    if let Some(card) = offer.options.first() {
                        log::info!("Picked {} ({})", card.title, card.description);
                    }
                    session.choose_upgrade(0);
                }
                GameEvent::Evolved { id } => log::info!("Evolved: {}", id.title()),
                GameEvent::RunEnded(run) => summary = Some(run),
                _ => {}
            }
        }
    }

    match summary {
        Some(run) => {
            println!("Seed:     {}", seed);
            println!("Outcome:  {:?}", run.outcome);
            println!("Survived: {}", format_time(run.elapsed as u32));
            println!("Level:    {}", run.level);
            println!("Kills:    {}", run.kills);
            println!("Coins:    {}", run.coins);
            println!(
                "Best:     {}{}",
                format_time(run.best_time),
                if run.new_best { " (new!)" } else { "" }
            );
            println!("Bank:     {}", session.meta().bank);
        }
        None => println!("Run did not finish after {} frames", frame),
    }
}
