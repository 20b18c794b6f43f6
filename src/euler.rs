//! Quaternion to Euler angle conversion (aerospace ZYX / yaw-pitch-roll
//! convention).
//!
//! Stateless, pure, thread-safe — no session, no HAL, no allocation. Ported
//! from `original_source/euler.c` including its documented out-parameter
//! order: [`q_to_ypr`] returns `(yaw, pitch, roll)` in that order even
//! though the companion header's doc comment names the parameters
//! `(pRoll, pPitch, pYaw)` (see spec §9 Open Question — the `.c` file's
//! behavior is authoritative).

/// Yaw (rotation about Z), in radians, from a unit quaternion `(r, i, j, k)`.
pub fn q_to_yaw(r: f64, i: f64, j: f64, k: f64) -> f64 {
    let num = 2.0 * i * j - 2.0 * r * k;
    let den = 2.0 * r * r + 2.0 * j * j - 1.0;
    num.atan2(den)
}

/// Pitch (rotation about Y), in radians, from a unit quaternion `(r, i, j, k)`.
///
/// The `asin` argument is clamped to `[-1, 1]` first so a quaternion that is
/// only approximately unit (as floating-point renormalization tends to
/// produce) never yields a domain error.
pub fn q_to_pitch(r: f64, i: f64, j: f64, k: f64) -> f64 {
    let arg = (2.0 * j * k + 2.0 * r * i).clamp(-1.0, 1.0);
    arg.asin()
}

/// Roll (rotation about X), in radians, from a unit quaternion `(r, i, j, k)`.
pub fn q_to_roll(r: f64, i: f64, j: f64, k: f64) -> f64 {
    let num = -2.0 * i * k + 2.0 * r * j;
    let den = 2.0 * r * r + 2.0 * k * k - 1.0;
    num.atan2(den)
}

/// Yaw, pitch, and roll together, in that order, from a unit quaternion
/// `(r, i, j, k)`.
///
/// Equivalent to calling [`q_to_yaw`], [`q_to_pitch`], and [`q_to_roll`]
/// individually.
pub fn q_to_ypr(r: f64, i: f64, j: f64, k: f64) -> (f64, f64, f64) {
    let yaw = q_to_yaw(r, i, j, k);
    let pitch = q_to_pitch(r, i, j, k);
    let roll = q_to_roll(r, i, j, k);
    (yaw, pitch, roll)
}

#[cfg(test)]
mod euler_test {
    use super::*;

    #[test]
    fn identity_quaternion_is_zero_ypr() {
        let (yaw, pitch, roll) = q_to_ypr(1.0, 0.0, 0.0, 0.0);
        assert_eq!(yaw, 0.0);
        assert_eq!(pitch, 0.0);
        assert_eq!(roll, 0.0);
    }

    #[test]
    fn individual_and_combined_functions_agree() {
        let q = (0.7071067811865476, 0.0, 0.7071067811865476, 0.0);
        let (yaw, pitch, roll) = q_to_ypr(q.0, q.1, q.2, q.3);
        assert_eq!(yaw, q_to_yaw(q.0, q.1, q.2, q.3));
        assert_eq!(pitch, q_to_pitch(q.0, q.1, q.2, q.3));
        assert_eq!(roll, q_to_roll(q.0, q.1, q.2, q.3));
    }

    #[test]
    fn pitch_clamps_over_unit_rounding_to_quarter_turn() {
        // r*i term alone pushed past 1.0 by construction; asin would panic
        // on an unclamped NaN-producing argument in some libm builds.
        let pitch = q_to_pitch(1.0, 1.0, 0.0, 0.0);
        assert_eq!(pitch, core::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn ninety_degree_yaw() {
        let half = core::f64::consts::FRAC_1_SQRT_2;
        let yaw = q_to_yaw(half, 0.0, 0.0, half);
        assert!((yaw - (-core::f64::consts::FRAC_PI_2)).abs() < 1e-9);
    }
}
