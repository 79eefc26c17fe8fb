//! End-to-end tests of the game loop: determinism, drops, overflow and the
//! container moving with fruit inside.

use suika_engine::prelude::*;

const TICKS_PER_SECOND: u64 = 120;

fn autoplay_game(seed: u64) -> Game {
    let mut game = Game::new(GameConfig::default(), seed).unwrap();
    game.toggle_autoplay();
    game
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn same_seed_gives_identical_snapshots() {
    let mut a = autoplay_game(11);
    let mut b = autoplay_game(11);

    for _ in 0..10 {
        a.run_ticks(TICKS_PER_SECOND / 2).unwrap();
        b.run_ticks(TICKS_PER_SECOND / 2).unwrap();
        let sa = a.snapshot().unwrap();
        let sb = b.snapshot().unwrap();
        assert_eq!(sa.hash, sb.hash, "diverged at tick {}", sa.tick);
    }
    assert!(a.fruits().in_play() > 0);
}

#[test]
fn different_seeds_diverge() {
    let mut a = autoplay_game(1);
    let mut b = autoplay_game(2);
    a.run_ticks(TICKS_PER_SECOND).unwrap();
    b.run_ticks(TICKS_PER_SECOND).unwrap();
    assert_ne!(a.snapshot().unwrap().hash, b.snapshot().unwrap().hash);
}

#[test]
fn reset_replays_the_same_game() {
    let mut game = autoplay_game(5);
    game.run_ticks(TICKS_PER_SECOND).unwrap();
    let first = game.snapshot().unwrap();

    game.reset();
    assert_eq!(game.tick_count(), 0);
    assert_eq!(game.score(), 0);
    assert_eq!(game.fruits().in_play(), 0);

    game.toggle_autoplay();
    game.run_ticks(TICKS_PER_SECOND).unwrap();
    assert_eq!(game.snapshot().unwrap().hash, first.hash);
}

// ---------------------------------------------------------------------------
// Drops
// ---------------------------------------------------------------------------

#[test]
fn dropped_fruit_falls_and_settles() {
    let mut game = Game::new(GameConfig::default(), 3).unwrap();
    let id = game.drop_at(700.0).unwrap();
    let body = game.fruits().get(id).unwrap().body().unwrap();
    let start = game.physics().position(body).unwrap();

    game.run_ticks(3 * TICKS_PER_SECOND).unwrap();

    let end = game.physics().position(body).unwrap();
    assert!(end.y < start.y - 500.0, "fruit should have fallen: {start:?} -> {end:?}");
    let fruit = game.fruits().get(id).unwrap();
    assert_eq!(fruit.state(), FruitState::Normal);
    assert!(game.countdown().remaining().is_none());
}

#[test]
fn drop_consumes_the_preview_in_order() {
    let mut game = Game::new(GameConfig::default(), 8).unwrap();
    let upcoming = game.preview();
    game.drop_at(700.0).unwrap();
    let waiting = game.fruits().peek_next().unwrap().kind();
    assert_eq!(waiting, upcoming[0]);
    assert_eq!(game.preview()[..2], upcoming[1..]);
}

struct LeftmostPolicy {
    seen: usize,
}

impl DropPolicy for LeftmostPolicy {
    fn choose_drop(&mut self, fruits: &[(Position, FruitKind)], _available_width: f64) -> Option<f64> {
        self.seen = fruits.len();
        Some(0.0)
    }
}

struct SkipPolicy;

impl DropPolicy for SkipPolicy {
    fn choose_drop(&mut self, _fruits: &[(Position, FruitKind)], _available_width: f64) -> Option<f64> {
        None
    }
}

#[test]
fn policy_chooses_the_drop_point() {
    let mut game = Game::new(GameConfig::default(), 4).unwrap();
    assert_eq!(game.drop_with_policy(&mut SkipPolicy), None);

    let mut policy = LeftmostPolicy { seen: 0 };
    let id = game.drop_with_policy(&mut policy).unwrap();
    assert_eq!(policy.seen, 0);

    let fruit = game.fruits().get(id).unwrap();
    let pos = game.physics().position(fruit.body().unwrap()).unwrap();
    let margin = fruit.kind().radius() + game.config().container.wall_thickness / 2.0 + 1.0;
    let left_wall = 700.0 - game.bocal().width() / 2.0;
    assert!((pos.x - (left_wall + margin)).abs() < 1e-3, "x = {}", pos.x);

    game.run_ticks(10).unwrap();
    game.drop_with_policy(&mut policy).unwrap();
    assert_eq!(policy.seen, 1);
}

// ---------------------------------------------------------------------------
// Overflow
// ---------------------------------------------------------------------------

fn cramped_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.container.window_width = 400.0;
    config.container.window_height = 600.0;
    config.timing.autoplay_initial_rate = 20;
    config.timing.gameover_delay = 1.0;
    config
}

#[test]
fn overflowing_container_ends_the_game() {
    let mut game = Game::new(cramped_config(), 21).unwrap();
    assert_eq!(game.bocal().width(), 300.0);
    game.toggle_autoplay();

    let mut ended_at = None;
    for _ in 0..60 * TICKS_PER_SECOND {
        let report = game.tick().unwrap();
        if report.gameover {
            ended_at = Some(report.tick);
            break;
        }
    }

    assert!(ended_at.is_some(), "container never overflowed");
    assert!(game.is_gameover());
    assert!(!game.autoplayer().is_enabled());
    assert_eq!(game.drop_random(), None);
    assert!(game.countdown().expired());

    // The finale clears the container one fruit at a time.
    let mut exploded = Vec::new();
    for _ in 0..60 * TICKS_PER_SECOND {
        exploded.extend(game.tick().unwrap().exploded);
    }
    assert!(!exploded.is_empty());
    assert_eq!(game.fruits().in_play(), 0);
}

#[test]
fn shot_fruit_leaves_play() {
    let mut game = Game::new(GameConfig::default(), 9).unwrap();
    let id = game.drop_at(700.0).unwrap();
    game.run_ticks(2 * TICKS_PER_SECOND).unwrap();
    let pos = game
        .physics()
        .position(game.fruits().get(id).unwrap().body().unwrap())
        .unwrap();

    assert_eq!(game.shoot_at(pos.x, pos.y), Some(id));
    assert_eq!(game.shoot_at(pos.x, pos.y), None);
    game.run_ticks(TICKS_PER_SECOND).unwrap();
    assert!(game.fruits().get(id).is_none());
    assert_eq!(game.fruits().in_play(), 0);
}

// ---------------------------------------------------------------------------
// Pointer: autofire and drag
// ---------------------------------------------------------------------------

#[test]
fn holding_the_button_autofires_under_the_cursor() {
    let mut game = Game::new(GameConfig::default(), 5).unwrap();
    assert!(game.press(500.0, 1700.0).is_some());

    let mut drops = Vec::new();
    for _ in 0..2 * TICKS_PER_SECOND {
        let report = game.tick().unwrap();
        for id in report.dropped {
            let body = game.fruits().get(id).unwrap().body().unwrap();
            drops.push(game.physics().position(body).unwrap());
        }
    }
    assert!(game.autoplayer().is_enabled());
    assert!(drops.len() >= 5, "only {} autofire drops", drops.len());
    for p in &drops {
        assert!((p.x - 500.0).abs() < 1e-3, "dropped at x = {}", p.x);
    }

    // Releasing keeps autofire on; the next press only stops it.
    game.release();
    game.run_ticks(TICKS_PER_SECOND / 2).unwrap();
    assert!(game.autoplayer().is_enabled());
    assert_eq!(game.press(500.0, 1700.0), None);
    assert!(!game.autoplayer().is_enabled());
    game.release();
    for _ in 0..TICKS_PER_SECOND {
        assert!(game.tick().unwrap().dropped.is_empty());
    }
}

#[test]
fn short_click_drops_a_single_fruit() {
    let mut game = Game::new(GameConfig::default(), 6).unwrap();
    assert!(game.press(700.0, 1700.0).is_some());
    game.run_ticks(10).unwrap();
    game.release();
    for _ in 0..2 * TICKS_PER_SECOND {
        assert!(game.tick().unwrap().dropped.is_empty());
    }
    assert_eq!(game.fruits().in_play(), 1);
    assert!(!game.autoplayer().is_enabled());
}

#[test]
fn dragged_fruit_follows_the_cursor() {
    let mut game = Game::new(GameConfig::default(), 9).unwrap();
    let id = game.drop_at(700.0).unwrap();
    game.run_ticks(3 * TICKS_PER_SECOND).unwrap();
    let body = game.fruits().get(id).unwrap().body().unwrap();
    let rest = game.physics().position(body).unwrap();

    assert_eq!(game.drag_start(rest.x, rest.y), Some(id));
    assert_eq!(game.dragged(), Some(id));
    let target = Position::new(900.0, 900.0);
    game.cursor(target.x, target.y);
    game.run_ticks(10).unwrap();
    let held = game.physics().position(body).unwrap();
    assert!(held.distance(target) < 0.1, "held at {held:?}");

    game.drag_stop();
    assert_eq!(game.dragged(), None);
    assert_eq!(game.fruits().get(id).unwrap().state(), FruitState::Normal);
    game.run_ticks(TICKS_PER_SECOND).unwrap();
    assert!(game.physics().position(body).unwrap().y < target.y - 100.0);
}

#[test]
fn drag_needs_a_fruit_under_the_cursor() {
    let mut game = Game::new(GameConfig::default(), 9).unwrap();
    assert_eq!(game.drag_start(700.0, 400.0), None);
    game.cursor(800.0, 400.0);
    game.run_ticks(10).unwrap();
    assert_eq!(game.dragged(), None);
}

// ---------------------------------------------------------------------------
// Container motion
// ---------------------------------------------------------------------------

#[test]
fn tumble_with_fruit_returns_upright() {
    let mut game = autoplay_game(13);
    game.run_ticks(TICKS_PER_SECOND).unwrap();
    game.toggle_autoplay();
    game.tumble_once();
    assert!(game.bocal().is_tumbling());

    game.run_ticks(5 * TICKS_PER_SECOND).unwrap();
    assert!(!game.bocal().is_tumbling());
    assert_eq!(game.bocal().pose().angle, 0.0);
    assert!(!game.is_gameover());
}

#[test]
fn shake_moves_the_walls_and_stops_cleanly() {
    let mut game = autoplay_game(17);
    game.shake_auto();
    let mut max_offset: f64 = 0.0;
    for _ in 0..2 * TICKS_PER_SECOND {
        game.tick().unwrap();
        let x = game.bocal().pose().position.x;
        max_offset = max_offset.max((x - 700.0).abs());
    }
    assert!(max_offset > 40.0 && max_offset <= 50.0 + 1e-6, "offset {max_offset}");

    game.shake_stop();
    game.run_ticks(2 * TICKS_PER_SECOND).unwrap();
    assert_eq!(game.bocal().shake_mode(), ShakeMode::Off);
    assert_eq!(game.bocal().pose().position, game.bocal().position_ref());
}

#[test]
fn growing_window_keeps_fruit_inside() {
    let mut game = autoplay_game(19);
    game.run_ticks(2 * TICKS_PER_SECOND).unwrap();
    game.toggle_autoplay();
    game.resize(1600.0, 1800.0);
    game.run_ticks(3 * TICKS_PER_SECOND).unwrap();

    let bocal = game.bocal();
    let half = bocal.width() / 2.0;
    for fruit in game.fruits().iter().filter(|f| f.state() == FruitState::Normal) {
        let pos = game.physics().position(fruit.body().unwrap()).unwrap();
        let local = bocal.to_bocal(pos);
        assert!(local.x.abs() < half, "fruit {} escaped at {local:?}", fruit.id());
    }
}
