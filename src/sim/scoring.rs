//! Bullseye scoring
//!
//! Converts a click position into integer points by normalized distance from
//! the target center. The falloff exponent is super-linear by default, so
//! clicks near the edge are penalized harder than clicks near the center.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rect::TargetRect;
use crate::clamp01;

/// Targets with an inscribed radius at or below this always score zero
pub const MIN_SCORING_RADIUS: f32 = 1.0;

/// Score falloff parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreCurve {
    /// Points for a dead-center hit
    pub max_points: u32,
    /// Falloff exponent (> 0)
    pub exponent: f32,
}

impl Default for ScoreCurve {
    fn default() -> Self {
        Self {
            max_points: 100,
            exponent: 1.6,
        }
    }
}

impl ScoreCurve {
    /// Exponent actually used (non-positive or non-finite falls back to linear)
    pub fn effective_exponent(&self) -> f32 {
        if self.exponent.is_finite() && self.exponent > 0.0 {
            self.exponent
        } else {
            1.0
        }
    }

    pub fn score(&self, point: Vec2, rect: &TargetRect) -> u32 {
        score(point, rect, self.max_points, self.effective_exponent())
    }
}

/// Score a click against a target rectangle.
///
/// `point` and `rect` must share a coordinate frame. Points farther from the
/// center than the inscribed radius score 0, so a click outside the
/// rectangle naturally scores nothing.
pub fn score(point: Vec2, rect: &TargetRect, max_points: u32, exponent: f32) -> u32 {
    let radius = rect.width().min(rect.height()) / 2.0;
    if radius <= MIN_SCORING_RADIUS {
        return 0;
    }

    let exponent = if exponent.is_finite() && exponent > 0.0 {
        exponent
    } else {
        1.0
    };

    let t = clamp01(1.0 - point.distance(rect.center) / radius);
    let t = t.powf(exponent);

    let points = (t * max_points as f32).round();
    (points.max(0.0) as u32).min(max_points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn target() -> TargetRect {
        TargetRect::square(Vec2::new(40.0, -20.0), 80.0)
    }

    #[test]
    fn test_center_hit_is_max() {
        let rect = target();
        assert_eq!(score(rect.center, &rect, 100, 1.6), 100);
    }

    #[test]
    fn test_at_or_beyond_radius_is_zero() {
        let rect = target();
        let edge = rect.center + Vec2::new(40.0, 0.0);
        assert_eq!(score(edge, &rect, 100, 1.6), 0);
        let outside = rect.center + Vec2::new(200.0, 50.0);
        assert_eq!(score(outside, &rect, 100, 1.6), 0);
    }

    #[test]
    fn test_falloff_is_super_linear() {
        let rect = target();
        // Halfway out: linear would give 50, 0.5^1.6 ≈ 0.33
        let half = rect.center + Vec2::new(20.0, 0.0);
        assert_eq!(score(half, &rect, 100, 1.0), 50);
        assert_eq!(score(half, &rect, 100, 1.6), 33);
    }

    #[test]
    fn test_tiny_target_scores_zero() {
        let rect = TargetRect::square(Vec2::ZERO, 2.0);
        assert_eq!(score(Vec2::ZERO, &rect, 100, 1.6), 0);
    }

    #[test]
    fn test_uses_smaller_dimension() {
        let rect = TargetRect::new(Vec2::ZERO, Vec2::new(200.0, 40.0));
        // Radius is 20, so x = 30 is already outside the scoring circle
        assert_eq!(score(Vec2::new(30.0, 0.0), &rect, 100, 1.6), 0);
    }

    #[test]
    fn test_invalid_exponent_falls_back_to_linear() {
        let rect = target();
        let half = rect.center + Vec2::new(20.0, 0.0);
        assert_eq!(score(half, &rect, 100, 0.0), 50);
        assert_eq!(score(half, &rect, 100, f32::NAN), 50);
        let curve = ScoreCurve {
            max_points: 100,
            exponent: -2.0,
        };
        assert_eq!(curve.score(half, &rect), 50);
    }

    proptest! {
        #[test]
        fn prop_score_non_increasing_with_distance(
            d1 in 0.0f32..120.0,
            d2 in 0.0f32..120.0,
            angle in 0.0f32..std::f32::consts::TAU,
            exponent in 0.1f32..4.0,
        ) {
            let rect = target();
            let dir = crate::unit_from_angle(angle);
            let (near, far) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
            let s_near = score(rect.center + dir * near, &rect, 100, exponent);
            let s_far = score(rect.center + dir * far, &rect, 100, exponent);
            prop_assert!(s_near >= s_far);
            prop_assert!(s_near <= 100);
        }
    }
}
