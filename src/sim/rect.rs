//! Axis-aligned target rectangle geometry
//!
//! Aim targets live on a bounded 2D plane with the origin at the plane
//! center and +y pointing up. A target is described by:
//! - center: position on the plane
//! - half_size: half of the width/height

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle on the aim plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRect {
    /// Center position (plane units)
    pub center: Vec2,
    /// Half extents (plane units)
    pub half_size: Vec2,
}

impl TargetRect {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            half_size: size.abs() * 0.5,
        }
    }

    /// Square rectangle centered on `center`
    pub fn square(center: Vec2, edge: f32) -> Self {
        Self::new(center, Vec2::splat(edge))
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.half_size.x * 2.0
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.half_size.y * 2.0
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.center - self.half_size
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.center + self.half_size
    }

    /// Check if a plane point is inside the rectangle (edges inclusive)
    pub fn contains_point(&self, point: Vec2) -> bool {
        let d = (point - self.center).abs();
        d.x <= self.half_size.x && d.y <= self.half_size.y
    }

    /// Convert a plane point to target-local coordinates (center = origin)
    #[inline]
    pub fn to_local(&self, point: Vec2) -> Vec2 {
        point - self.center
    }
}
