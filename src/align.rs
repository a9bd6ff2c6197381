//! Rotation correction between the two halves of a plate.

use std::f32::consts::{PI, TAU};

use crate::coords::HalfUv;
use crate::picks::PickSession;

pub const LEFT_INFINITY: &str = "L_inf";
pub const RIGHT_INFINITY: &str = "R_inf";
pub const LEFT_FOREGROUND: &str = "L_fg";
pub const RIGHT_FOREGROUND: &str = "R_fg";

/// Wrap an angle into `(-π, π]`.
pub fn wrap_angle(theta: f32) -> f32 {
    if !theta.is_finite() {
        return 0.0;
    }
    let mut t = theta.rem_euclid(TAU);
    if t > PI {
        t -= TAU;
    }
    t
}

fn heading(from: HalfUv, to: HalfUv) -> f32 {
    (to.v - from.v).atan2(to.u - from.u)
}

/// Angle between the left and right infinity→foreground vectors.
///
/// This is the rotation to apply to the right half's sampling so that its
/// foreground vector lines up with the left half's. Any missing landmark
/// yields `0.0`.
pub fn solve_theta(
    left_inf: Option<HalfUv>,
    right_inf: Option<HalfUv>,
    left_fg: Option<HalfUv>,
    right_fg: Option<HalfUv>,
) -> f32 {
    let (Some(li), Some(ri), Some(lf), Some(rf)) = (left_inf, right_inf, left_fg, right_fg) else {
        return 0.0;
    };
    wrap_angle(heading(li, lf) - heading(ri, rf))
}

/// [`solve_theta`] fed from the four directional landmarks of a session.
pub fn theta_from_picks(picks: &PickSession) -> f32 {
    solve_theta(
        picks.get(LEFT_INFINITY),
        picks.get(RIGHT_INFINITY),
        picks.get(LEFT_FOREGROUND),
        picks.get(RIGHT_FOREGROUND),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Side;
    use std::f32::consts::FRAC_PI_2;

    fn l(u: f32, v: f32) -> Option<HalfUv> {
        Some(HalfUv::new(Side::Left, u, v))
    }

    fn r(u: f32, v: f32) -> Option<HalfUv> {
        Some(HalfUv::new(Side::Right, u, v))
    }

    #[test]
    fn wrap_keeps_pi_and_flips_minus_pi() {
        assert!((wrap_angle(PI) - PI).abs() < 1e-6);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-6);
        assert!((wrap_angle(3.0 * PI / 2.0) + FRAC_PI_2).abs() < 1e-6);
        assert_eq!(wrap_angle(0.0), 0.0);
        assert_eq!(wrap_angle(f32::NAN), 0.0);
    }

    #[test]
    fn symmetric_landmarks_give_zero() {
        let t = solve_theta(l(0.5, 0.5), r(0.5, 0.5), l(0.6, 0.5), r(0.6, 0.5));
        assert_eq!(t, 0.0);
    }

    #[test]
    fn quarter_turn_right_vector() {
        let t = solve_theta(l(0.5, 0.5), r(0.5, 0.5), l(0.6, 0.5), r(0.5, 0.6));
        assert!((t + FRAC_PI_2).abs() < 1e-5, "theta={t}");
        let t = solve_theta(l(0.5, 0.5), r(0.5, 0.5), l(0.5, 0.6), r(0.6, 0.5));
        assert!((t - FRAC_PI_2).abs() < 1e-5, "theta={t}");
    }

    #[test]
    fn opposite_vectors_wrap_to_pi() {
        let t = solve_theta(l(0.5, 0.5), r(0.5, 0.5), l(0.4, 0.5), r(0.6, 0.5));
        assert!((t - PI).abs() < 1e-5, "theta={t}");
    }

    #[test]
    fn missing_landmark_is_zero() {
        assert_eq!(solve_theta(l(0.5, 0.5), None, l(0.6, 0.5), r(0.6, 0.6)), 0.0);
    }
}
