//! Headless autoplay run -- drops fruit automatically and prints progress.
//!
//! Run with:
//!   cargo run --example headless_autoplay -p suika-engine -- [SEED] [SECONDS] [CONFIG.json]
//!
//! The container is shaken for a few seconds halfway through and tumbled
//! once near the end. Set `RUST_LOG=suika_engine=debug` to follow merges.

use anyhow::Context;
use suika_engine::prelude::*;

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = match args.next() {
        Some(s) => s.parse().context("SEED must be an unsigned integer")?,
        None => 42,
    };
    let seconds: u64 = match args.next() {
        Some(s) => s.parse().context("SECONDS must be an unsigned integer")?,
        None => 60,
    };
    let config = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read config file {path}"))?;
            GameConfig::from_json_str(&json)?
        }
        None => GameConfig::default(),
    };

    let ticks_per_second = (1.0 / config.physics.interval).round() as u64;
    let mut game = Game::new(config, seed)?;
    game.toggle_autoplay();

    let shake_from = seconds / 2;
    let tumble_at = seconds.saturating_sub(8);
    let mut merges = 0usize;

    for second in 0..seconds {
        if second == shake_from {
            game.shake_auto();
        } else if second == shake_from + 3 {
            game.shake_stop();
        } else if second == tumble_at && second > shake_from + 3 {
            game.tumble_once();
        }

        for _ in 0..ticks_per_second {
            let report = game.tick()?;
            merges += report.merges.len();
            if report.gameover {
                break;
            }
        }

        let snapshot = game.snapshot()?;
        println!(
            "t={:>3}s  score={:>5}  fruit={:>3}  merges={:>4}  hash={}",
            second + 1,
            snapshot.score,
            game.fruits().in_play(),
            merges,
            &snapshot.hash[..16],
        );
        if game.is_gameover() {
            println!("game over after {} ticks", game.tick_count());
            break;
        }
    }

    println!("final score: {}", game.score());
    Ok(())
}
