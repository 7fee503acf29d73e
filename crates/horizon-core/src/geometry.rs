use crate::glam::{IVec2, Vec2};
use crate::ilattice::prelude::Extent;

/// Chebyshev ("chessboard") distance between two lattice points.
pub fn chessboard_distance(a: IVec2, b: IVec2) -> i32 {
    (a - b).abs().max_element()
}

/// Distance from `point` to the closest point of the half-open box `aabb`. Zero when `point` is inside.
pub fn closest_distance(point: Vec2, aabb: Extent<IVec2>) -> f32 {
    let min = aabb.minimum.as_vec2();
    let lub = aabb.least_upper_bound().as_vec2();
    let nearest = point.clamp(min, lub);
    point.distance(nearest)
}

/// Distance from `point` to the corner of `aabb` that is farthest away.
pub fn farthest_distance(point: Vec2, aabb: Extent<IVec2>) -> f32 {
    let min = aabb.minimum.as_vec2();
    let lub = aabb.least_upper_bound().as_vec2();
    let far = (point - min).abs().max((point - lub).abs());
    far.length()
}

/// The region between two concentric circles. Used to select nodes within a distance band of an observer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Annulus {
    pub center: Vec2,
    pub min_radius: f32,
    pub max_radius: f32,
}

impl Annulus {
    pub fn new(center: Vec2, min_radius: f32, max_radius: f32) -> Self {
        Self {
            center,
            min_radius,
            max_radius,
        }
    }

    /// True iff some point of `aabb` is closer than `max_radius` and some point is at least `min_radius` away.
    pub fn intersects(&self, aabb: Extent<IVec2>) -> bool {
        closest_distance(self.center, aabb) < self.max_radius
            && farthest_distance(self.center, aabb) >= self.min_radius
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
