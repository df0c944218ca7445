//! Forward and inverse geometry of one transform hop.
//!
//! Forward order for copy `i`: scale about the origin, then (when radial repeat is on) self-rotate
//! by the copy angle and translate to the copy's slot, then apply the node rotation to everything.
//! Copy slots start at the top (`-90°` in y-down world space) and proceed clockwise.

use smallvec::SmallVec;

use crate::{
    foundation::core::{Affine, Point, Vec2},
    graph::model::NodeParams,
};

/// Determinant magnitude below which a hop is treated as non-invertible.
const MIN_DETERMINANT: f64 = 1e-18;

/// Forward/inverse affine pair for one radial copy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CopyTransform {
    /// Copy index in `0..copy_count`.
    pub index: u32,
    /// Source (parent space) to destination (node space).
    pub forward: Affine,
    /// Destination to source; `None` when the hop collapses (zero scale).
    pub inverse: Option<Affine>,
}

/// Transform pipeline parameterized by one node's parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeTransform {
    params: NodeParams,
}

impl NodeTransform {
    /// Pipeline for the given parameters.
    pub fn new(params: NodeParams) -> Self {
        Self { params }
    }

    /// Parameters this pipeline was built from.
    pub fn params(&self) -> NodeParams {
        self.params
    }

    /// Number of candidate copies: `max(radial_count, 1)`.
    pub fn copy_count(&self) -> u32 {
        self.params.radial_count.max(1)
    }

    /// `true` when radial repeat is active.
    pub fn is_radial(&self) -> bool {
        self.params.radial_count > 0
    }

    /// Placement angle of copy `i` in degrees, `0°` at the top.
    pub fn copy_angle_deg(&self, copy: u32) -> f64 {
        if !self.is_radial() {
            return 0.0;
        }
        f64::from(copy) * 360.0 / f64::from(self.params.radial_count)
    }

    /// World offset of copy `i` from the origin (before the node rotation).
    pub fn copy_offset(&self, copy: u32) -> Vec2 {
        if !self.is_radial() {
            return Vec2::ZERO;
        }
        let a = (self.copy_angle_deg(copy) - 90.0).to_radians();
        Vec2::new(a.cos(), a.sin()) * self.params.radial_radius
    }

    fn self_rotation_rad(&self, copy: u32) -> f64 {
        if self.params.radial_count > 1 {
            self.copy_angle_deg(copy).to_radians()
        } else {
            0.0
        }
    }

    /// Forward affine for copy `i`.
    pub fn forward_affine(&self, copy: u32) -> Affine {
        let scale = Affine::scale(self.params.scale);
        let place =
            Affine::translate(self.copy_offset(copy)) * Affine::rotate(self.self_rotation_rad(copy));
        Affine::rotate(self.params.rotation.to_radians()) * place * scale
    }

    /// Inverse affine for copy `i`, undoing the steps of [`Self::forward_affine`] in reverse.
    ///
    /// Returns `None` when the scale is zero (or too small to invert).
    pub fn inverse_affine(&self, copy: u32) -> Option<Affine> {
        let s = self.params.scale;
        if !s.is_finite() || (s * s).abs() < MIN_DETERMINANT {
            return None;
        }
        let unrotate = Affine::rotate(-self.params.rotation.to_radians());
        let unplace = Affine::rotate(-self.self_rotation_rad(copy))
            * Affine::translate(-self.copy_offset(copy));
        let unscale = Affine::scale(1.0 / s);
        Some(unscale * unplace * unrotate)
    }

    /// Map a parent-space point into node space through copy `i`.
    pub fn forward(&self, p: Point, copy: u32) -> Point {
        self.forward_affine(copy) * p
    }

    /// Map a node-space point back to the parent-space candidate for copy `i`.
    pub fn inverse(&self, p: Point, copy: u32) -> Option<Point> {
        self.inverse_affine(copy).map(|inv| inv * p)
    }

    /// Precomputed affines for every copy, in ascending index order.
    pub fn copies(&self) -> SmallVec<[CopyTransform; 8]> {
        (0..self.copy_count())
            .map(|index| CopyTransform {
                index,
                forward: self.forward_affine(index),
                inverse: self.inverse_affine(index),
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/pipeline.rs"]
mod tests;
