//! Lift model: turns attitude into a planar force.

use engine_core::Vec3;

/// Smallest magnitude the speed ratio is allowed to reach, so reversal
/// amplification (`1 / ratio`) stays finite near max speed.
const MIN_RATIO: f32 = 0.05;

/// Axial lift for one axis.
///
/// While velocity and angle agree, lift fades as speed approaches
/// `max_speed`; when they disagree it is amplified to turn around quickly.
pub fn axial_lift(speed: f32, angle: f32, max_speed: f32, coefficient: f32) -> f32 {
    let max_speed = max_speed.max(f32::EPSILON);
    let mut ratio = (max_speed - speed.abs()) / max_speed;
    if ratio.abs() < MIN_RATIO {
        ratio = MIN_RATIO.copysign(ratio);
    }

    let same_direction = (speed > 0.0 && angle > 0.0) || (speed < 0.0 && angle < 0.0);
    let factor = if same_direction { ratio } else { 1.0 / ratio };
    angle * factor * coefficient
}

/// Force for the current velocity and `(pitch, roll)`. X follows negated
/// roll, Y follows pitch, and there is never a depth component.
pub fn lift_force(velocity: Vec3, pitch: f32, roll: f32, max_speed: f32, coefficient: f32) -> Vec3 {
    Vec3::new(
        axial_lift(velocity.x, -roll, max_speed, coefficient),
        axial_lift(velocity.y, pitch, max_speed, coefficient),
        0.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_rest_lift_is_angle_times_coefficient() {
        assert!((axial_lift(0.0, 0.5, 4.0, 15.0) - 7.5).abs() < 1e-5);
        assert_eq!(axial_lift(0.0, 0.0, 4.0, 15.0), 0.0);
    }

    #[test]
    fn co_signed_motion_is_damped() {
        // ratio = (4 - 2) / 4 = 0.5
        assert!((axial_lift(2.0, 0.4, 4.0, 15.0) - 3.0).abs() < 1e-5);
        assert!((axial_lift(-2.0, -0.4, 4.0, 15.0) + 3.0).abs() < 1e-5);
    }

    #[test]
    fn opposed_motion_is_amplified() {
        // 1 / 0.5 = 2
        assert!((axial_lift(2.0, -0.4, 4.0, 15.0) + 12.0).abs() < 1e-5);
    }

    #[test]
    fn stays_finite_at_max_speed() {
        let lift = axial_lift(4.0, -0.4, 4.0, 15.0);
        assert!(lift.is_finite());
        assert!((lift + 0.4 * 15.0 / MIN_RATIO).abs() < 1e-3);
    }

    #[test]
    fn zero_max_speed_stays_finite() {
        assert!(axial_lift(0.0, 0.4, 0.0, 15.0).is_finite());
        assert!(axial_lift(1.0, -0.4, 0.0, 15.0).is_finite());
    }

    #[test]
    fn force_has_no_depth_and_inverts_roll() {
        let force = lift_force(Vec3::ZERO, 0.0, 0.2, 4.0, 15.0);
        assert!(force.x < 0.0);
        assert_eq!(force.y, 0.0);
        assert_eq!(force.z, 0.0);
    }
}
