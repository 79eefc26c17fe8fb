//! The game loop.
//!
//! [`Game`] wires the physics world, the container, the fruit store and the
//! collision helper together and advances them one fixed step per
//! [`Game::tick`]:
//!
//! 1. a dragged fruit is steered toward the cursor, collision buffers are
//!    reset;
//! 2. rapier steps, contact handlers fill the buffers;
//! 3. the collision helper resolves merges and runs the queued actions;
//! 4. the container integrates its reference body and re-targets its walls;
//! 5. fruit timers advance and finished fruit are removed;
//! 6. due merge spawns appear, converted from container-local coordinates
//!    through the container's current pose;
//! 7. the overflow countdown advances (not while tumbling); after game over
//!    the finale explodes the remaining fruit one at a time;
//! 8. the autoplayer drops its share of fruit, under the cursor when the
//!    drop button has been held long enough (autofire).
//!
//! Given the same configuration, seed and inputs, two games produce the same
//! sequence of [`GameSnapshot`] hashes.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use suika_core::action::FruitHost;
use suika_core::config::{ContainerConfig, GameConfig};
use suika_core::contact::MergeDecision;
use suika_core::kind::{FruitId, FruitKind, Position};
use tracing::{debug, info};

use crate::autoplay::{Autoplayer, Pointer, PreviewQueue};
use crate::bocal::Bocal;
use crate::collision::CollisionHelper;
use crate::countdown::Countdown;
use crate::fruit::{FruitContext, FruitState, FruitStore};
use crate::physics::PhysicsWorld;
use crate::policy::DropPolicy;
use crate::schedule::{Scheduler, SpawnRequest};
use crate::snapshot::{ContainerSnapshot, FruitSnapshot, GameSnapshot};
use crate::GameError;

// ---------------------------------------------------------------------------
// Container geometry
// ---------------------------------------------------------------------------

/// Container placement derived from the window size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerGeometry {
    pub center: Position,
    pub width: f64,
    pub height: f64,
}

/// Fit the container inside a `window_w` by `window_h` window, keeping the
/// configured margins and never shrinking below the minimum size.
pub fn container_geometry(window_w: f64, window_h: f64, c: &ContainerConfig) -> ContainerGeometry {
    let width = (window_w - 2.0 * c.margin_side).max(c.min_width);
    let height = (window_h - c.margin_top - c.margin_bottom).max(c.min_height);
    ContainerGeometry {
        center: Position::new(window_w / 2.0, c.margin_bottom + height / 2.0),
        width,
        height,
    }
}

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Tick counter after this tick.
    pub tick: u64,
    pub merges: Vec<MergeDecision>,
    /// Merged fruit that appeared this tick.
    pub spawned: Vec<FruitId>,
    /// Fruit dropped by the autoplayer this tick.
    pub dropped: Vec<FruitId>,
    /// Fruit exploded by the game-over finale this tick.
    pub exploded: Vec<FruitId>,
    /// The game ended during this tick.
    pub gameover: bool,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// One game: the simulation plus the player-facing controls.
pub struct Game {
    config: GameConfig,
    seed: u64,
    window: (f64, f64),
    physics: PhysicsWorld,
    bocal: Bocal,
    fruits: FruitStore,
    collisions: CollisionHelper,
    spawns: Scheduler<SpawnRequest>,
    /// Next step of the game-over finale.
    finale: Scheduler<()>,
    preview: PreviewQueue,
    autoplayer: Autoplayer,
    pointer: Pointer,
    dragged: Option<FruitId>,
    countdown: Countdown,
    rng: Pcg32,
    tick: u64,
    paused: bool,
    gameover: bool,
}

impl Game {
    /// Start a game in the configured window, with every random draw taken
    /// from `seed`.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, GameError> {
        config.validate()?;
        let window = (config.container.window_width, config.container.window_height);
        Ok(Self::build(config, seed, window))
    }

    fn build(config: GameConfig, seed: u64, window: (f64, f64)) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut physics = PhysicsWorld::new(&config.physics);
        let geometry = container_geometry(window.0, window.1, &config.container);
        let bocal = Bocal::new(
            &mut physics,
            geometry.center,
            geometry.width,
            geometry.height,
            &config,
        );
        let t = &config.timing;
        let preview = PreviewQueue::new(t.preview_count, t.drop_kinds, &mut rng);
        let mut game = Self {
            fruits: FruitStore::new(&config),
            collisions: CollisionHelper::new(t.blink_delay, t.spawn_delay),
            spawns: Scheduler::new(),
            finale: Scheduler::new(),
            preview,
            autoplayer: Autoplayer::new(t.autoplay_initial_rate),
            pointer: Pointer::new(t.autofire_delay),
            dragged: None,
            countdown: Countdown::new(t.gameover_delay),
            rng,
            tick: 0,
            paused: false,
            gameover: false,
            physics,
            bocal,
            window,
            seed,
            config,
        };
        game.prepare_next();
        game
    }

    /// Throw everything away and start over with the same seed and window.
    pub fn reset(&mut self) {
        info!(seed = self.seed, "game reset");
        *self = Self::build(self.config.clone(), self.seed, self.window);
    }

    // -- Accessors ----------------------------------------------------------

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn score(&self) -> u32 {
        self.fruits.score()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_gameover(&self) -> bool {
        self.gameover
    }

    pub fn bocal(&self) -> &Bocal {
        &self.bocal
    }

    pub fn fruits(&self) -> &FruitStore {
        &self.fruits
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn autoplayer(&self) -> &Autoplayer {
        &self.autoplayer
    }

    /// Upcoming kinds after the waiting fruit, next first.
    pub fn preview(&self) -> Vec<FruitKind> {
        self.preview.kinds().collect()
    }

    /// Merged fruit not spawned yet, in scheduling order.
    pub fn pending_spawns(&self) -> Vec<SpawnRequest> {
        self.spawns.pending().copied().collect()
    }

    /// The fruit under the cursor while a drag is active.
    pub fn dragged(&self) -> Option<FruitId> {
        self.dragged
    }

    fn clock(&self) -> f64 {
        self.tick as f64 * self.config.physics.interval
    }

    // -- Simulation ---------------------------------------------------------

    /// Advance the game by one fixed step. A paused game does not move.
    pub fn tick(&mut self) -> Result<TickReport, GameError> {
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };
        if self.paused {
            return Ok(report);
        }
        let dt = self.config.physics.interval;
        let tick = self.tick;

        if let Some(id) = self.dragged {
            let still_dragged = self
                .fruits
                .get(id)
                .is_some_and(|f| matches!(f.state(), FruitState::Dragged { .. }));
            if !still_dragged {
                self.dragged = None;
            }
        }
        self.fruits.steer_dragged(&mut self.physics, dt);

        self.collisions.reset();
        self.physics.step(dt, &mut self.collisions);

        let bocal = &self.bocal;
        let mut host = FruitContext::new(&mut self.fruits, &mut self.physics);
        let step = self
            .collisions
            .process(&mut host, |p| bocal.to_bocal(p), &mut self.spawns)
            .map_err(|source| GameError::Collision { tick, source })?;
        report.merges = step.merges;

        self.bocal.step(&mut self.physics, dt);
        self.fruits.update(&mut self.physics, dt);

        for request in self.spawns.advance(dt) {
            let position = self.bocal.to_world(request.local);
            let id = self
                .fruits
                .spawn_merged(&mut self.physics, request.kind, position);
            report.spawned.push(id);
        }

        if !self.gameover && !self.bocal.is_tumbling() {
            let on_line = self.bocal.fruits_on_maxline(&self.physics);
            self.countdown.update(dt, !on_line.is_empty());
            if self.countdown.expired() {
                self.end_game();
                report.gameover = true;
            }
        }

        if self.gameover {
            self.run_finale(dt, &mut report);
        } else {
            self.autoplay(dt, &mut report);
        }

        self.tick += 1;
        report.tick = self.tick;
        Ok(report)
    }

    /// Run `n` ticks, stopping at the first error.
    pub fn run_ticks(&mut self, n: u64) -> Result<(), GameError> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    fn autoplay(&mut self, dt: f64, report: &mut TickReport) {
        let n = self.autoplayer.step(dt);
        let now = self.clock();
        let cursor_x = if self.pointer.autofire(now) {
            self.autoplayer.enable();
            match self.pointer.position() {
                Some(cursor) => Some(cursor.x),
                None => return,
            }
        } else if self.autoplayer.is_enabled() {
            None
        } else {
            return;
        };
        for _ in 0..n {
            match self.drop_with(cursor_x) {
                Some(id) => report.dropped.push(id),
                None => break,
            }
        }
    }

    /// End the game now. Drops and shots are ignored afterwards, and the
    /// remaining fruit explode one by one once the finale starts.
    pub fn end_game(&mut self) {
        if self.gameover {
            return;
        }
        self.gameover = true;
        self.autoplayer.disable();
        self.pointer.stop_autofire();
        self.finale
            .schedule_once(self.config.timing.gameover_animation_start, ());
        info!(tick = self.tick, score = self.score(), "game over");
    }

    /// Explode the oldest active fruit at each finale step. The finale keeps
    /// going while fruit remain in play or merged fruit are still to spawn.
    fn run_finale(&mut self, dt: f64, report: &mut TickReport) {
        for _ in self.finale.advance(dt) {
            let oldest = self
                .fruits
                .iter()
                .find(|f| f.state().is_active())
                .map(|f| f.id());
            if let Some(id) = oldest {
                FruitContext::new(&mut self.fruits, &mut self.physics).explode(id);
                report.exploded.push(id);
            }
            let remaining = self.fruits.iter().filter(|f| f.state().is_active()).count();
            if remaining > 0 || !self.spawns.is_empty() {
                self.finale
                    .schedule_once(self.config.timing.gameover_animation_interval, ());
            } else {
                debug!(tick = self.tick, "finale over");
            }
        }
    }

    /// Toggle pause and return the new state. A finished game stays as is.
    pub fn toggle_pause(&mut self) -> bool {
        if !self.gameover {
            self.paused = !self.paused;
            info!(paused = self.paused, "pause toggled");
        }
        self.paused
    }

    // -- Drops --------------------------------------------------------------

    fn prepare_next(&mut self) {
        let kind = self.preview.next_kind(&mut self.rng);
        self.fruits.prepare_next(kind);
    }

    fn drop_with(&mut self, cursor_x: Option<f64>) -> Option<FruitId> {
        if self.gameover || self.paused {
            return None;
        }
        let kind = self.fruits.peek_next()?.kind();
        let margin = kind.radius() + self.config.container.wall_thickness / 2.0 + 1.0;
        let position = match cursor_x {
            Some(x) => self.bocal.drop_point_cursor(x, margin)?,
            None => self.bocal.drop_point_random(margin, &mut self.rng),
        };
        let id = self.fruits.drop_next(&mut self.physics, position)?;
        self.prepare_next();
        Some(id)
    }

    /// Drop the waiting fruit under a cursor at world abscissa `cursor_x`.
    /// Nothing happens when the cursor is outside the container.
    pub fn drop_at(&mut self, cursor_x: f64) -> Option<FruitId> {
        self.drop_with(Some(cursor_x))
    }

    /// Drop button pressed at a world point.
    ///
    /// The press drops the waiting fruit under the cursor, unless it stops a
    /// running autofire. Keeping the button down past the autofire delay
    /// starts autofire.
    pub fn press(&mut self, x: f64, y: f64) -> Option<FruitId> {
        let now = self.clock();
        if self.pointer.press(now, Position::new(x, y)) {
            self.autoplayer.disable();
            return None;
        }
        self.drop_at(x)
    }

    /// Drop button released.
    pub fn release(&mut self) {
        self.pointer.release();
    }

    /// Cursor moved to a world point. A dragged fruit follows it.
    pub fn cursor(&mut self, x: f64, y: f64) {
        self.pointer.motion(Position::new(x, y));
        self.drag_to(x, y);
    }

    /// Drop the waiting fruit at a random point of the drop line.
    pub fn drop_random(&mut self) -> Option<FruitId> {
        self.drop_with(None)
    }

    /// Let `policy` choose where to drop the waiting fruit.
    pub fn drop_with_policy(&mut self, policy: &mut dyn DropPolicy) -> Option<FruitId> {
        let fruits: Vec<(Position, FruitKind)> = self
            .fruits
            .iter()
            .filter(|f| f.state().is_active())
            .filter_map(|f| {
                let world = self.physics.position(f.body()?)?;
                Some((self.bocal.to_bocal(world), f.kind()))
            })
            .collect();
        let width = self.bocal.width();
        let x = policy.choose_drop(&fruits, width)?;
        let cursor = self.bocal.to_world(Position::new(x - width / 2.0, 0.0));
        self.drop_at(cursor.x)
    }

    /// The active fruit under a world point.
    fn fruit_at(&self, point: Position) -> Option<FruitId> {
        self.physics
            .colliders_at_point(point)
            .into_iter()
            .filter_map(|tag| tag.fruit)
            .map(|f| f.id)
            .find(|&id| self.fruits.get(id).is_some_and(|f| f.state().is_active()))
    }

    /// Explode the fruit under a world point.
    pub fn shoot_at(&mut self, x: f64, y: f64) -> Option<FruitId> {
        if self.gameover {
            return None;
        }
        let target = self.fruit_at(Position::new(x, y))?;
        debug!(fruit = %target, x, y, "shot");
        FruitContext::new(&mut self.fruits, &mut self.physics).explode(target);
        Some(target)
    }

    // -- Drag ---------------------------------------------------------------

    /// Grab the settled fruit under a world point. It then follows
    /// [`Game::drag_to`] and [`Game::cursor`] until [`Game::drag_stop`].
    pub fn drag_start(&mut self, x: f64, y: f64) -> Option<FruitId> {
        if self.gameover {
            return None;
        }
        self.drag_stop();
        let point = Position::new(x, y);
        let id = self.fruit_at(point)?;
        if !self.fruits.drag_start(&mut self.physics, id, point) {
            return None;
        }
        self.dragged = Some(id);
        Some(id)
    }

    /// Move the dragged fruit's target to a world point.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        if let Some(id) = self.dragged {
            self.fruits.drag_to(id, Position::new(x, y));
        }
    }

    /// Let go of the dragged fruit.
    pub fn drag_stop(&mut self) {
        if let Some(id) = self.dragged.take() {
            self.fruits.drag_stop(&mut self.physics, id);
        }
    }

    // -- Container ----------------------------------------------------------

    pub fn shake_auto(&mut self) {
        self.bocal.shake_auto();
    }

    pub fn shake_mouse(&mut self) {
        self.bocal.shake_mouse();
    }

    pub fn shake_stop(&mut self) {
        self.bocal.shake_stop();
    }

    pub fn tumble_once(&mut self) {
        self.bocal.tumble_once();
    }

    pub fn mouse_motion(&mut self, dx: f64, dy: f64) {
        self.bocal.on_mouse_motion(dx, dy);
    }

    /// Fit the container to a new window size.
    pub fn resize(&mut self, window_w: f64, window_h: f64) {
        self.window = (window_w, window_h);
        let g = container_geometry(window_w, window_h, &self.config.container);
        debug!(window_w, window_h, width = g.width, height = g.height, "resize");
        self.bocal
            .on_resize(&mut self.physics, g.center, g.width, g.height);
    }

    // -- Autoplay -----------------------------------------------------------

    pub fn toggle_autoplay(&mut self) {
        self.autoplayer.toggle();
    }

    pub fn adjust_autoplay_rate(&mut self, adj: i32) {
        self.autoplayer.adjust_rate(adj);
    }

    // -- Snapshot -----------------------------------------------------------

    pub fn snapshot(&self) -> Result<GameSnapshot, GameError> {
        let pose = self.bocal.pose();
        let container = ContainerSnapshot {
            position: pose.position,
            angle: pose.angle,
            width: self.bocal.width(),
            height: self.bocal.height(),
            shake: self.bocal.shake_mode(),
            tumble: self.bocal.tumble_mode(),
        };
        let fruits = self
            .fruits
            .iter()
            .map(|f| FruitSnapshot {
                id: f.id(),
                kind: f.kind(),
                state: f.state(),
                blink: f.blink(),
                position: f.body().and_then(|b| self.physics.position(b)),
            })
            .collect();
        Ok(GameSnapshot::new(
            self.tick,
            self.score(),
            self.gameover,
            container,
            fruits,
            self.pending_spawns(),
        )?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
