//! Static table geometry: cushions as a closed polygon, pockets as points
//!
//! Supplied by a layout provider and immutable for a shot.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Orientation of a cushion segment, used to pick the bounce response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallOrientation {
    Horizontal,
    Vertical,
    /// 45° segment running lower-left to upper-right
    Rising,
    /// 45° segment running lower-right to upper-left
    Falling,
}

/// One edge of the cushion polygon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallSegment {
    pub start: DVec2,
    pub end: DVec2,
}

impl WallSegment {
    pub fn new(start: DVec2, end: DVec2) -> Self {
        Self { start, end }
    }

    /// Closest point on the segment to `p`
    pub fn closest_point(&self, p: DVec2) -> DVec2 {
        let span = self.end - self.start;
        let len_sq = span.length_squared();
        if len_sq == 0.0 {
            return self.start;
        }
        let u = ((p - self.start).dot(span) / len_sq).clamp(0.0, 1.0);
        self.start + span * u
    }

    #[inline]
    pub fn distance_to(&self, p: DVec2) -> f64 {
        (self.closest_point(p) - p).length()
    }

    /// Classify by endpoint deltas. Anything neither axis-aligned nor rising
    /// counts as falling.
    pub fn orientation(&self) -> WallOrientation {
        let d = self.end - self.start;
        if d.x == 0.0 {
            WallOrientation::Vertical
        } else if d.y == 0.0 {
            WallOrientation::Horizontal
        } else if (d.x > 0.0 && d.y > 0.0) || (d.x < 0.0 && d.y < 0.0) {
            WallOrientation::Rising
        } else {
            WallOrientation::Falling
        }
    }
}

/// Closed cushion polygon; the last vertex connects back to the first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WallPolygon {
    pub vertices: Vec<DVec2>,
}

impl WallPolygon {
    pub fn new(vertices: Vec<DVec2>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned rectangle, counter-clockwise from `min`
    pub fn rectangle(min: DVec2, max: DVec2) -> Self {
        Self::new(vec![
            min,
            DVec2::new(max.x, min.y),
            max,
            DVec2::new(min.x, max.y),
        ])
    }

    /// Number of segments (equal to the vertex count)
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Segment `i` runs from vertex `i` to vertex `i + 1`, wrapping
    pub fn segment(&self, i: usize) -> WallSegment {
        let n = self.vertices.len();
        WallSegment::new(self.vertices[i], self.vertices[(i + 1) % n])
    }

    pub fn segments(&self) -> impl Iterator<Item = WallSegment> + '_ {
        (0..self.vertices.len()).map(|i| self.segment(i))
    }
}

/// A pocket mouth, treated as a capture disc around `center`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pocket {
    pub center: DVec2,
}

impl Pocket {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            center: DVec2::new(x, y),
        }
    }

    /// Capture radius for a ball of `ball_radius`
    #[inline]
    pub fn capture_radius(ball_radius: f64, pocket_size: f64) -> f64 {
        ball_radius + pocket_size
    }
}

/// Everything static on a table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableGeometry {
    pub walls: WallPolygon,
    pub pockets: Vec<Pocket>,
}

impl TableGeometry {
    pub fn new(walls: WallPolygon, pockets: Vec<Pocket>) -> Self {
        Self { walls, pockets }
    }
}
