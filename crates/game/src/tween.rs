//! One-shot property tweens.
//!
//! A tween runs 60 key frames at 60 fps scaled by a speed ratio, so it lasts
//! `1 / speed_ratio` seconds. The start value is captured on the first
//! `advance`, which is the first frame after the tween was started.

use engine_core::{Quat, Vec3};

/// Key frames in every tween.
pub const TWEEN_FRAMES: f32 = 60.0;
/// Frames per second at speed ratio 1.
pub const TWEEN_FRAME_RATE: f32 = 60.0;

/// Values a tween can interpolate.
pub trait Lerp: Copy {
    fn lerp_to(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp_to(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp_to(self, to: Self, t: f32) -> Self {
        self.lerp(to, t)
    }
}

impl Lerp for Quat {
    fn lerp_to(self, to: Self, t: f32) -> Self {
        self.slerp(to, t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    CubicInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tween<T: Lerp> {
    from: Option<T>,
    to: T,
    /// Seconds.
    duration: f32,
    elapsed: f32,
    easing: Easing,
}

impl<T: Lerp> Tween<T> {
    /// Tween toward `to` at the given speed ratio.
    pub fn new(to: T, speed_ratio: f32) -> Self {
        let duration = TWEEN_FRAMES / (TWEEN_FRAME_RATE * speed_ratio.max(f32::EPSILON));
        Self {
            from: None,
            to,
            duration,
            elapsed: 0.0,
            easing: Easing::default(),
        }
    }

    /// Start from an explicit value instead of the first observed one.
    pub fn starting_at(mut self, from: T) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Step by `dt` seconds and return the value to apply this frame.
    pub fn advance(&mut self, current: T, dt: f32) -> T {
        let from = *self.from.get_or_insert(current);
        self.elapsed = (self.elapsed + dt).min(self.duration);
        from.lerp_to(self.to, self.easing.apply(self.progress()))
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            self.elapsed / self.duration
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn target(&self) -> T {
        self.to
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_ratio_shortens_duration() {
        let normal: Tween<f32> = Tween::new(1.0, 1.0);
        let fast: Tween<f32> = Tween::new(1.0, 3.0);
        assert!((normal.duration() - 1.0).abs() < 1e-6);
        assert!((fast.duration() - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn captures_start_on_first_advance_and_lands_on_target() {
        let mut tween = Tween::new(10.0_f32, 1.0);
        let first = tween.advance(2.0, 0.0);
        assert_eq!(first, 2.0);
        let mut value = first;
        for _ in 0..70 {
            // A different "current" value must not move the captured start.
            value = tween.advance(value + 100.0, 1.0 / 60.0);
        }
        assert!(tween.is_finished());
        assert!((value - 10.0).abs() < 1e-5);
    }

    #[test]
    fn cubic_ease_is_symmetric() {
        let e = Easing::CubicInOut;
        assert_eq!(e.apply(0.0), 0.0);
        assert_eq!(e.apply(1.0), 1.0);
        assert!((e.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((e.apply(0.25) + e.apply(0.75) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn linear_easing_tracks_progress() {
        let mut tween = Tween::new(4.0_f32, 2.0).starting_at(0.0).with_easing(Easing::Linear);
        let halfway = tween.advance(0.0, 0.25);
        assert!((halfway - 2.0).abs() < 1e-5);
        assert!(!tween.is_finished());
    }

    #[test]
    fn vec3_tween_moves_monotonically() {
        let mut tween = Tween::new(Vec3::new(0.0, -5.0, 0.0), 1.0).starting_at(Vec3::ZERO);
        let mut last = 0.0;
        while !tween.is_finished() {
            let y = tween.advance(Vec3::ZERO, 0.1).y;
            assert!(y <= last);
            last = y;
        }
        assert!((last + 5.0).abs() < 1e-5);
    }
}
