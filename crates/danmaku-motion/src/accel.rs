//! Time-parameterized acceleration functions.
//!
//! Every acceleration field of a movement phase is a function of the time
//! elapsed since the phase started. Instead of capturing closures inside
//! descriptors, a phase stores one of:
//! - a constant value
//! - a sampled curve (piecewise linear keyframes)
//! - a handle to a callback registered in an [`AccelCallbacks`] implementation

use ahash::{AHashMap, AHashSet};
use danmaku_common::CallbackId;
use glam::Vec2;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Values that can be interpolated between curve keys.
pub trait Interpolate: Copy {
    /// Linear interpolation from `a` to `b` by `s` in `[0, 1]`.
    fn lerp(a: Self, b: Self, s: f32) -> Self;
}

impl Interpolate for f32 {
    fn lerp(a: Self, b: Self, s: f32) -> Self {
        a + (b - a) * s
    }
}

impl Interpolate for Vec2 {
    fn lerp(a: Self, b: Self, s: f32) -> Self {
        a.lerp(b, s)
    }
}

/// A keyframe of a sampled curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveKey<T> {
    /// Time since phase start.
    pub time: f32,
    /// Value at that time.
    pub value: T,
}

/// Piecewise linear curve, held at its end values outside the key range.
///
/// Keys are shared, so cloning a curve never allocates.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledCurve<T> {
    keys: Arc<[CurveKey<T>]>,
}

impl<T: Interpolate> SampledCurve<T> {
    /// Build a curve from `(time, value)` pairs. Keys are sorted by time;
    /// keys with a non-finite time are dropped.
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = (f32, T)>) -> Self {
        let mut keys: Vec<CurveKey<T>> = keys
            .into_iter()
            .filter(|(time, _)| time.is_finite())
            .map(|(time, value)| CurveKey { time, value })
            .collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys: keys.into() }
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the curve has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sample the curve, or `None` when it has no keys.
    #[must_use]
    pub fn sample(&self, t: f32) -> Option<T> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        if t <= first.time {
            return Some(first.value);
        }
        if t >= last.time {
            return Some(last.value);
        }
        // First key strictly after t; guaranteed to be in 1..len here.
        let upper = self.keys.partition_point(|k| k.time <= t);
        let a = self.keys[upper - 1];
        let b = self.keys[upper];
        let span = b.time - a.time;
        if span <= f32::EPSILON {
            return Some(b.value);
        }
        Some(T::lerp(a.value, b.value, (t - a.time) / span))
    }
}

/// Source of externally registered acceleration callbacks.
pub trait AccelCallbacks {
    /// Evaluate a scalar callback, `None` if the handle is unknown.
    fn scalar(&self, id: CallbackId, t: f32) -> Option<f32>;

    /// Evaluate a vector callback, `None` if the handle is unknown.
    fn vector(&self, id: CallbackId, t: f32) -> Option<Vec2>;
}

/// Callback source with nothing registered. Every handle evaluates to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCallbacks;

impl AccelCallbacks for NoCallbacks {
    fn scalar(&self, _id: CallbackId, _t: f32) -> Option<f32> {
        None
    }

    fn vector(&self, _id: CallbackId, _t: f32) -> Option<Vec2> {
        None
    }
}

type ScalarFn = Arc<dyn Fn(f32) -> f32 + Send + Sync>;
type VectorFn = Arc<dyn Fn(f32) -> Vec2 + Send + Sync>;

/// Registry of named acceleration callbacks.
///
/// A lookup of an unknown handle is logged once per handle.
#[derive(Default)]
pub struct CallbackRegistry {
    scalars: AHashMap<CallbackId, ScalarFn>,
    vectors: AHashMap<CallbackId, VectorFn>,
    unknown: Mutex<AHashSet<CallbackId>>,
    next_id: u32,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("scalars", &self.scalars.len())
            .field("vectors", &self.vectors.len())
            .field("unknown", &self.unknown_handles())
            .finish()
    }
}

impl CallbackRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> CallbackId {
        self.next_id += 1;
        CallbackId::new(self.next_id)
    }

    /// Register a scalar callback.
    pub fn register_scalar(
        &mut self,
        f: impl Fn(f32) -> f32 + Send + Sync + 'static,
    ) -> CallbackId {
        let id = self.allocate_id();
        self.scalars.insert(id, Arc::new(f));
        id
    }

    /// Register a vector callback.
    pub fn register_vector(
        &mut self,
        f: impl Fn(f32) -> Vec2 + Send + Sync + 'static,
    ) -> CallbackId {
        let id = self.allocate_id();
        self.vectors.insert(id, Arc::new(f));
        id
    }

    /// Remove a callback, returns true if it existed.
    pub fn unregister(&mut self, id: CallbackId) -> bool {
        self.scalars.remove(&id).is_some() | self.vectors.remove(&id).is_some()
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scalars.len() + self.vectors.len()
    }

    /// Check if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct unknown handles looked up so far.
    #[must_use]
    pub fn unknown_handles(&self) -> usize {
        self.unknown.lock().len()
    }

    fn note_unknown(&self, kind: &str, id: CallbackId) {
        if self.unknown.lock().insert(id) {
            warn!("Unknown {} acceleration callback {}, sampling zero", kind, id.raw());
        }
    }
}

impl AccelCallbacks for CallbackRegistry {
    fn scalar(&self, id: CallbackId, t: f32) -> Option<f32> {
        let value = self.scalars.get(&id).map(|f| f(t));
        if value.is_none() {
            self.note_unknown("scalar", id);
        }
        value
    }

    fn vector(&self, id: CallbackId, t: f32) -> Option<Vec2> {
        let value = self.vectors.get(&id).map(|f| f(t));
        if value.is_none() {
            self.note_unknown("vector", id);
        }
        value
    }
}

/// Scalar acceleration (tangential, normal, radial, angular, rotational).
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarAccel {
    /// Same value at every time.
    Constant(f32),
    /// Keyframed curve over phase time.
    Sampled(SampledCurve<f32>),
    /// Registered callback.
    Callback(CallbackId),
}

impl Default for ScalarAccel {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<f32> for ScalarAccel {
    fn from(value: f32) -> Self {
        Self::Constant(value)
    }
}

impl ScalarAccel {
    /// No acceleration.
    pub const ZERO: Self = Self::Constant(0.0);

    /// Evaluate at `t` seconds since phase start.
    ///
    /// Unknown callbacks and empty curves evaluate to zero.
    #[must_use]
    pub fn sample(&self, t: f32, callbacks: &dyn AccelCallbacks) -> f32 {
        match self {
            Self::Constant(value) => *value,
            Self::Sampled(curve) => curve.sample(t).unwrap_or(0.0),
            Self::Callback(id) => callbacks.scalar(*id, t).unwrap_or(0.0),
        }
    }
}

/// Vector acceleration for Cartesian phases.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorAccel {
    /// Same value at every time.
    Constant(Vec2),
    /// Keyframed curve over phase time.
    Sampled(SampledCurve<Vec2>),
    /// Registered callback.
    Callback(CallbackId),
}

impl Default for VectorAccel {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Vec2> for VectorAccel {
    fn from(value: Vec2) -> Self {
        Self::Constant(value)
    }
}

impl VectorAccel {
    /// No acceleration.
    pub const ZERO: Self = Self::Constant(Vec2::ZERO);

    /// Evaluate at `t` seconds since phase start.
    #[must_use]
    pub fn sample(&self, t: f32, callbacks: &dyn AccelCallbacks) -> Vec2 {
        match self {
            Self::Constant(value) => *value,
            Self::Sampled(curve) => curve.sample(t).unwrap_or(Vec2::ZERO),
            Self::Callback(id) => callbacks.vector(*id, t).unwrap_or(Vec2::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_interpolates_and_holds_ends() {
        let curve = SampledCurve::new([(2.0, 10.0_f32), (0.0, 0.0)]);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.sample(-1.0), Some(0.0));
        assert_eq!(curve.sample(1.0), Some(5.0));
        assert_eq!(curve.sample(5.0), Some(10.0));
    }

    #[test]
    fn test_curve_multiple_segments() {
        let curve = SampledCurve::new([(0.0, 0.0_f32), (1.0, 10.0), (3.0, -10.0)]);
        assert_eq!(curve.sample(1.0), Some(10.0));
        assert_eq!(curve.sample(2.0), Some(0.0));
    }

    #[test]
    fn test_empty_curve_samples_zero() {
        let accel = ScalarAccel::Sampled(SampledCurve::new(Vec::<(f32, f32)>::new()));
        assert_eq!(accel.sample(1.0, &NoCallbacks), 0.0);
    }

    #[test]
    fn test_vector_curve() {
        let curve = SampledCurve::new([(0.0, Vec2::ZERO), (2.0, Vec2::new(2.0, -4.0))]);
        let accel = VectorAccel::Sampled(curve);
        assert_eq!(accel.sample(1.0, &NoCallbacks), Vec2::new(1.0, -2.0));
    }

    #[test]
    fn test_registry_callbacks() {
        let mut registry = CallbackRegistry::new();
        let wobble = registry.register_scalar(|t| t * 2.0);
        let drift = registry.register_vector(|t| Vec2::new(t, 1.0));

        assert_eq!(ScalarAccel::Callback(wobble).sample(3.0, &registry), 6.0);
        assert_eq!(
            VectorAccel::Callback(drift).sample(0.5, &registry),
            Vec2::new(0.5, 1.0)
        );
        assert_ne!(wobble, drift);

        assert!(registry.unregister(wobble));
        assert_eq!(ScalarAccel::Callback(wobble).sample(3.0, &registry), 0.0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_handle_reported_once() {
        let mut registry = CallbackRegistry::new();
        let drift = registry.register_vector(|_| Vec2::X);
        let stale = registry.register_scalar(|t| t);
        registry.unregister(stale);

        for i in 0..100 {
            let t = i as f32 / 60.0;
            assert_eq!(ScalarAccel::Callback(stale).sample(t, &registry), 0.0);
            assert_eq!(VectorAccel::Callback(drift).sample(t, &registry), Vec2::X);
        }
        assert_eq!(registry.unknown_handles(), 1);

        assert_eq!(VectorAccel::Callback(stale).sample(0.0, &registry), Vec2::ZERO);
        assert_eq!(registry.unknown_handles(), 1);
    }
}
