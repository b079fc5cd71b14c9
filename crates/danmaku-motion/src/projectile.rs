//! Pooled projectile and its per-tick phase machine.
//!
//! This module provides:
//! - Spawn parameters and one-shot initialization
//! - Summon delay, phase advance, looping and end of motion
//! - Forced phase jumps
//! - Pool hooks that drop owner references on release

use crate::accel::{AccelCallbacks, NoCallbacks};
use crate::continuity::{instantaneous_velocity, seed_for, PhaseFrame};
use crate::integrator::{step_cartesian, step_cartesian_polar, step_polar, step_rotation, StepInput};
use crate::movement::{MotionKind, MovementDescriptor, MovementMode};
use crate::pool::Poolable;
use crate::time_scale::{ScaleSnapshot, TimeCategory};
use ahash::AHashMap;
use danmaku_common::{normalize_degrees, to_polar, ActorId, PatternId};
use glam::Vec2;
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Context
// ============================================================================

/// Live positions of actors, used for origins that follow their owner.
pub trait ActorPositions {
    /// Current position of an actor, `None` if it no longer exists.
    fn position(&self, actor: ActorId) -> Option<Vec2>;
}

/// Actor source with no actors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActors;

impl ActorPositions for NoActors {
    fn position(&self, _actor: ActorId) -> Option<Vec2> {
        None
    }
}

impl ActorPositions for AHashMap<ActorId, Vec2> {
    fn position(&self, actor: ActorId) -> Option<Vec2> {
        self.get(&actor).copied()
    }
}

/// Everything a tick reads besides the projectile itself.
#[derive(Clone, Copy)]
pub struct MotionContext<'a> {
    /// Time-scale factors for this tick.
    pub scales: ScaleSnapshot,
    /// Actor positions.
    pub actors: &'a dyn ActorPositions,
    /// Acceleration callbacks.
    pub callbacks: &'a dyn AccelCallbacks,
}

impl<'a> MotionContext<'a> {
    /// Create a context.
    #[must_use]
    pub fn new(
        scales: ScaleSnapshot,
        actors: &'a dyn ActorPositions,
        callbacks: &'a dyn AccelCallbacks,
    ) -> Self {
        Self {
            scales,
            actors,
            callbacks,
        }
    }
}

impl MotionContext<'static> {
    /// Context with unit time scales, no actors and no callbacks.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(ScaleSnapshot::UNIT, &NoActors, &NoCallbacks)
    }
}

// ============================================================================
// Spawn parameters
// ============================================================================

/// Actor owning a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    /// Actor identity.
    pub actor: ActorId,
    /// Clock the actor's projectiles run on.
    pub category: TimeCategory,
}

impl Owner {
    /// Enemy-owned.
    #[must_use]
    pub const fn enemy(actor: ActorId) -> Self {
        Self {
            actor,
            category: TimeCategory::Enemy,
        }
    }

    /// Player-owned.
    #[must_use]
    pub const fn player(actor: ActorId) -> Self {
        Self {
            actor,
            category: TimeCategory::Player,
        }
    }
}

/// Parameters for [`Projectile::initialize`].
#[derive(Debug, Clone)]
pub struct SpawnParams {
    /// Initial position.
    pub position: Vec2,
    /// Origin of polar phases.
    pub polar_origin: Vec2,
    /// Initial rotation in degrees.
    pub rotation: f32,
    /// Owning actor.
    pub owner: Option<Owner>,
    /// Pattern that fired this projectile.
    pub pattern: Option<PatternId>,
    /// Phases, in order.
    pub movements: Arc<[MovementDescriptor]>,
    /// Whether the polar origin follows the owner's position.
    pub origin_tracks_owner: bool,
    /// Restart from the first phase after the last one ends.
    pub looping: bool,
    /// Seconds spent invisible before motion starts.
    pub summon_time: Option<f32>,
}

impl SpawnParams {
    /// Spawn at `position` with the given phases. The polar origin defaults
    /// to the spawn position.
    #[must_use]
    pub fn new(position: Vec2, movements: impl Into<Arc<[MovementDescriptor]>>) -> Self {
        Self {
            position,
            polar_origin: position,
            rotation: 0.0,
            owner: None,
            pattern: None,
            movements: movements.into(),
            origin_tracks_owner: false,
            looping: false,
            summon_time: None,
        }
    }

    /// Set the polar origin.
    #[must_use]
    pub fn with_polar_origin(mut self, origin: Vec2) -> Self {
        self.polar_origin = origin;
        self
    }

    /// Set the initial rotation.
    #[must_use]
    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    /// Set the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set the firing pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: PatternId) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Make the polar origin follow the owner.
    #[must_use]
    pub fn tracking_owner(mut self, tracks: bool) -> Self {
        self.origin_tracks_owner = tracks;
        self
    }

    /// Loop the phases.
    #[must_use]
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Delay motion by a summon window.
    #[must_use]
    pub fn with_summon_time(mut self, seconds: f32) -> Self {
        self.summon_time = Some(seconds);
        self
    }
}

// ============================================================================
// Tick results
// ============================================================================

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not initialized.
    Inactive,
    /// Scaled delta was zero, nothing changed.
    Frozen,
    /// Still inside the summon window.
    Summoning,
    /// Summon window just elapsed.
    Summoned,
    /// Before the first phase starts.
    Waiting,
    /// Position and heading were integrated.
    Moved,
    /// Current phase ended, a later phase is pending.
    Idle,
    /// Last phase ended without looping.
    Finished,
}

/// A phase switch during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    /// Phase left.
    pub from: usize,
    /// Phase entered.
    pub to: usize,
}

/// Result of [`Projectile::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// What happened.
    pub outcome: TickOutcome,
    /// Net phase switch, if any.
    pub phase_change: Option<PhaseChange>,
    /// Whether the phases wrapped to the first one.
    pub looped: bool,
}

impl TickReport {
    const fn new(outcome: TickOutcome) -> Self {
        Self {
            outcome,
            phase_change: None,
            looped: false,
        }
    }

    fn record_change(&mut self, from: usize, to: usize) {
        let from = self.phase_change.map_or(from, |c| c.from);
        self.phase_change = Some(PhaseChange { from, to });
    }
}

// ============================================================================
// State
// ============================================================================

/// Mutable per-projectile state.
#[derive(Debug, Clone, Default, PartialEq)]
struct ProjectileState {
    position: Vec2,
    rotation: f32,
    polar_origin: Vec2,
    origin_tracks_owner: bool,
    frame: PhaseFrame,
    elapsed: f32,
    summoning: bool,
    /// Scaled seconds of summon window still to run.
    summon_left: f32,
    owner: Option<Owner>,
    pattern: Option<PatternId>,
    looping: bool,
}

impl ProjectileState {
    fn refresh_polar(&mut self) {
        let (radius, angle) = to_polar(self.polar_origin, self.position);
        self.frame = PhaseFrame {
            polar_radius: radius,
            polar_angle: angle,
        };
    }

    fn category(&self) -> TimeCategory {
        self.owner.map_or(TimeCategory::Unscaled, |o| o.category)
    }
}

/// Immutable phases plus the working copies the integrator mutates.
#[derive(Debug, Clone, Default)]
struct MotionTrack {
    original: Option<Arc<[MovementDescriptor]>>,
    working: Vec<MovementDescriptor>,
    phase: usize,
}

impl MotionTrack {
    fn pristine(&self) -> &[MovementDescriptor] {
        self.original.as_deref().unwrap_or_default()
    }

    fn load(&mut self, movements: Arc<[MovementDescriptor]>) {
        self.working.clear();
        self.working.extend(movements.iter().cloned());
        self.original = Some(movements);
        self.phase = 0;
    }

    fn unload(&mut self) {
        self.original = None;
        self.working.clear();
        self.phase = 0;
    }

    fn reset(&mut self, index: usize) {
        if let (Some(pristine), Some(working)) =
            (self.original.as_deref().and_then(|o| o.get(index)), self.working.get_mut(index))
        {
            working.reset_from(pristine);
        }
    }

    fn len(&self) -> usize {
        self.working.len()
    }

    fn is_last(&self) -> bool {
        self.phase + 1 >= self.working.len()
    }
}

// ============================================================================
// Projectile
// ============================================================================

/// A bullet driven by a sequence of movement phases.
#[derive(Debug, Clone, Default)]
pub struct Projectile {
    state: ProjectileState,
    track: MotionTrack,
    initialized: bool,
}

impl Projectile {
    /// Create an uninitialized projectile, typically used as a pool template.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the projectile. A second call before release is ignored.
    pub fn initialize(&mut self, params: SpawnParams) -> bool {
        if self.initialized {
            warn!("Projectile already initialized, ignoring");
            return false;
        }

        let movements: Arc<[MovementDescriptor]> = if params.movements.is_empty() {
            warn!("Projectile spawned without movements, using a stationary phase");
            Arc::from([MovementDescriptor::none()])
        } else {
            params.movements
        };

        let summon_time = params.summon_time.filter(|t| t.is_finite() && *t > 0.0);
        self.state = ProjectileState {
            position: params.position,
            rotation: normalize_degrees(params.rotation),
            polar_origin: params.polar_origin,
            origin_tracks_owner: params.origin_tracks_owner,
            frame: PhaseFrame::default(),
            elapsed: 0.0,
            summoning: summon_time.is_some(),
            summon_left: summon_time.unwrap_or(0.0),
            owner: params.owner,
            pattern: params.pattern,
            looping: params.looping,
        };
        self.state.refresh_polar();
        self.track.load(movements);
        self.initialized = true;
        true
    }

    /// Advance by one frame of raw (unscaled) time.
    ///
    /// A tracked origin follows its owner on every tick that runs, including
    /// summon and idle ticks. A frozen tick changes nothing, so owner movement
    /// during a pause is picked up by the next running tick.
    pub fn tick(&mut self, raw_dt: f32, ctx: &MotionContext<'_>) -> TickReport {
        if !self.initialized {
            return TickReport::new(TickOutcome::Inactive);
        }

        let dt = ctx.scales.scale(self.state.category(), raw_dt);
        if dt.is_nan() || dt <= 0.0 {
            return TickReport::new(TickOutcome::Frozen);
        }

        let origin_shift = self.follow_owner(ctx);
        if self.state.summoning {
            self.state.summon_left -= dt;
            self.carry_with_origin(origin_shift);
            if self.state.summon_left > 0.0 {
                return TickReport::new(TickOutcome::Summoning);
            }
            // Elapsed did not run during the summon, so a phase jumped to
            // meanwhile starts at its own start time.
            self.state.summoning = false;
            self.state.summon_left = 0.0;
            return TickReport::new(TickOutcome::Summoned);
        }

        self.state.elapsed += dt;

        let mut report = TickReport::new(TickOutcome::Moved);

        while !self.track.is_last()
            && self.state.elapsed >= self.track.pristine()[self.track.phase + 1].start_time
        {
            let from = self.track.phase;
            self.enter_phase(from + 1, Some(from));
            report.record_change(from, from + 1);
        }

        let current = &self.track.working[self.track.phase];
        if current.has_ended_at(self.state.elapsed) {
            if self.track.is_last() && self.state.looping {
                let from = self.track.phase;
                self.enter_phase(0, Some(from));
                self.state.elapsed = self.track.working[0].start_time;
                report.looped = true;
                if from != 0 {
                    report.record_change(from, 0);
                }
            } else {
                report.outcome = if self.track.is_last() {
                    TickOutcome::Finished
                } else {
                    TickOutcome::Idle
                };
                self.carry_with_origin(origin_shift);
                return report;
            }
        }

        let start_time = self.track.working[self.track.phase].start_time;
        if self.track.phase == 0 && self.state.elapsed < start_time {
            report.outcome = TickOutcome::Waiting;
            self.carry_with_origin(origin_shift);
            return report;
        }

        self.integrate(dt, self.state.elapsed - start_time, origin_shift, ctx);
        report
    }

    /// Move a tracked origin to the owner's position. Returns how far it moved.
    fn follow_owner(&mut self, ctx: &MotionContext<'_>) -> Vec2 {
        if !self.state.origin_tracks_owner {
            return Vec2::ZERO;
        }
        let Some(origin) = self.state.owner.and_then(|o| ctx.actors.position(o.actor)) else {
            return Vec2::ZERO;
        };
        let shift = origin - self.state.polar_origin;
        self.state.polar_origin = origin;
        shift
    }

    /// Apply an origin move on a tick that does not integrate. Polar phases
    /// ride along with the origin; other modes only refresh the polar cache.
    fn carry_with_origin(&mut self, shift: Vec2) {
        if shift == Vec2::ZERO {
            return;
        }
        let polar = self
            .track
            .working
            .get(self.track.phase)
            .is_some_and(|m| m.mode() == MovementMode::Polar);
        if polar {
            self.state.position += shift;
        }
        self.state.refresh_polar();
    }

    fn integrate(&mut self, dt: f32, phase_time: f32, origin_shift: Vec2, ctx: &MotionContext<'_>) {
        let state = &mut self.state;
        let movement = &mut self.track.working[self.track.phase];

        let input = StepInput {
            dt,
            phase_time,
            limit_speed: movement.limit_speed,
            callbacks: ctx.callbacks,
        };
        let step = match &mut movement.kind {
            MotionKind::Cartesian(c) => step_cartesian(c, input),
            MotionKind::CartesianPolar(c) => step_cartesian_polar(c, input),
            MotionKind::Polar(p) => step_polar(p, &mut state.frame, origin_shift, input),
        };

        if movement.face_to_moving_direction {
            if let Some(heading) = step.heading {
                state.rotation = normalize_degrees(heading);
            }
        } else {
            state.rotation = step_rotation(
                state.rotation,
                &mut movement.rotation,
                dt,
                phase_time,
                ctx.callbacks,
            );
        }

        state.position += step.displacement;
        if movement.mode() != MovementMode::Polar && state.origin_tracks_owner {
            state.refresh_polar();
        }
        movement.update_count += 1;
    }

    /// Make `index` the active phase, resetting it and optionally seeding it
    /// from `source`'s current velocity.
    fn enter_phase(&mut self, index: usize, source: Option<usize>) {
        let inherits = self
            .track
            .pristine()
            .get(index)
            .is_some_and(MovementDescriptor::set_speed_to_prev_movement);
        let velocity = source
            .filter(|_| inherits)
            .and_then(|s| self.track.working.get(s))
            .map(|prev| instantaneous_velocity(prev, &self.state.frame));

        self.track.reset(index);
        self.track.phase = index;

        let mode = self.track.working[index].mode();
        if mode == MovementMode::Polar {
            self.state.refresh_polar();
        }
        if let Some(velocity) = velocity {
            seed_for(mode, velocity, &self.state.frame).apply_to(&mut self.track.working[index]);
        }
        debug!("Projectile entered phase {} ({:?})", index, mode);
    }

    /// Jump straight to phase `index`.
    ///
    /// Every phase between the current one and the target (target included)
    /// is reset. A target that inherits speed syncs against its neighbour in
    /// the direction of travel. Elapsed time becomes the target's start.
    pub fn force_move_to_phase(&mut self, index: usize) -> bool {
        if !self.initialized {
            warn!("Phase jump on an uninitialized projectile, ignoring");
            return false;
        }
        let from = self.track.phase;
        if index >= self.track.len() {
            warn!(
                "Phase jump to {} out of range ({} phases), ignoring",
                index,
                self.track.len()
            );
            return false;
        }
        if index == from {
            warn!("Phase jump to already active phase {}, ignoring", index);
            return false;
        }

        let (low, high, neighbour) = if index > from {
            (from + 1, index - 1, index - 1)
        } else {
            (index + 1, from - 1, index + 1)
        };
        for between in low..=high {
            self.track.reset(between);
        }

        self.enter_phase(index, Some(neighbour));
        self.state.elapsed = self.track.working[index].start_time;
        true
    }

    /// Jump to the next phase, wrapping to the first one when looping.
    pub fn force_move_to_next_phase(&mut self) -> bool {
        if !self.initialized {
            warn!("Phase jump on an uninitialized projectile, ignoring");
            return false;
        }
        if !self.track.is_last() {
            return self.force_move_to_phase(self.track.phase + 1);
        }
        if !self.state.looping || self.track.len() < 2 {
            warn!("No phase after {}, ignoring", self.track.phase);
            return false;
        }

        let from = self.track.phase;
        self.enter_phase(0, Some(from));
        self.state.elapsed = self.track.working[0].start_time;
        true
    }

    /// Working copy of the active phase.
    #[must_use]
    pub fn current_movement(&self) -> Option<&MovementDescriptor> {
        self.track.working.get(self.track.phase)
    }

    /// Working copies of all phases.
    #[must_use]
    pub fn movements(&self) -> &[MovementDescriptor] {
        &self.track.working
    }

    /// Check if the projectile was initialized since its last release.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.state.position
    }

    /// Rotation in degrees.
    #[must_use]
    pub const fn rotation(&self) -> f32 {
        self.state.rotation
    }

    /// Origin of polar phases.
    #[must_use]
    pub const fn polar_origin(&self) -> Vec2 {
        self.state.polar_origin
    }

    /// Cached distance from the polar origin.
    #[must_use]
    pub const fn polar_radius(&self) -> f32 {
        self.state.frame.polar_radius
    }

    /// Cached angle around the polar origin.
    #[must_use]
    pub const fn polar_angle(&self) -> f32 {
        self.state.frame.polar_angle
    }

    /// Active phase index.
    #[must_use]
    pub const fn phase(&self) -> usize {
        self.track.phase
    }

    /// Number of phases.
    #[must_use]
    pub fn phase_count(&self) -> usize {
        self.track.len()
    }

    /// Scaled seconds of motion time. Does not run during the summon window.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.state.elapsed
    }

    /// Check if the projectile is still in its summon window.
    #[must_use]
    pub const fn is_summoning(&self) -> bool {
        self.state.summoning
    }

    /// Check if the projectile can be seen and collided with.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.initialized && !self.state.summoning
    }

    /// Owning actor.
    #[must_use]
    pub const fn owner(&self) -> Option<Owner> {
        self.state.owner
    }

    /// Firing pattern.
    #[must_use]
    pub const fn pattern(&self) -> Option<PatternId> {
        self.state.pattern
    }

    /// Whether the phases loop.
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.state.looping
    }
}

impl Poolable for Projectile {
    fn on_release(&mut self) {
        self.state = ProjectileState::default();
        self.track.unload();
        self.initialized = false;
    }
}
