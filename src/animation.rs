use std::time::Duration;

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    CubicOut,
    CubicInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Values a [`Tween`] can interpolate between.
pub trait Interpolate: Clone {
    fn interpolate(&self, to: &Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Interpolate for Vec3 {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        self.lerp(*to, t)
    }
}

impl Interpolate for LinearRgba {
    fn interpolate(&self, to: &Self, t: f32) -> Self {
        LinearRgba::new(
            self.red.interpolate(&to.red, t),
            self.green.interpolate(&to.green, t),
            self.blue.interpolate(&to.blue, t),
            self.alpha.interpolate(&to.alpha, t),
        )
    }
}

/// A timed interpolation from one value to another.
#[derive(Debug, Clone)]
pub struct Tween<T> {
    from: T,
    to: T,
    duration: Duration,
    elapsed: Duration,
    easing: Easing,
}

impl<T: Interpolate> Tween<T> {
    pub fn new(from: T, to: T, duration: Duration, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            easing,
        }
    }

    pub fn target(&self) -> &T {
        &self.to
    }

    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_nanos() as f64 / self.duration.as_nanos() as f64).min(1.0) as f32
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn value(&self) -> T {
        if self.is_finished() {
            return self.to.clone();
        }
        self.from
            .interpolate(&self.to, self.easing.apply(self.progress()))
    }

    pub fn tick(&mut self, delta: Duration) -> T {
        self.elapsed = (self.elapsed + delta).min(self.duration);
        self.value()
    }
}

/// Frame output of an [`AnimationSlot`].
#[derive(Debug, Clone, PartialEq)]
pub struct Step<T> {
    pub value: T,
    pub finished: bool,
}

/// Holds at most one in-flight tween for a property. Starting a new tween
/// replaces the current one, so the last request wins.
#[derive(Debug, Clone)]
pub struct AnimationSlot<T> {
    active: Option<Tween<T>>,
}

impl<T> Default for AnimationSlot<T> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<T: Interpolate> AnimationSlot<T> {
    pub fn start(&mut self, tween: Tween<T>) {
        self.active = Some(tween);
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn target(&self) -> Option<&T> {
        self.active.as_ref().map(Tween::target)
    }

    /// Advances the active tween. The slot empties once the tween finishes;
    /// that final step carries the exact target value.
    pub fn tick(&mut self, delta: Duration) -> Option<Step<T>> {
        let tween = self.active.as_mut()?;
        let value = tween.tick(delta);
        let finished = tween.is_finished();
        if finished {
            self.active = None;
        }
        Some(Step { value, finished })
    }
}
