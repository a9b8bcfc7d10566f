use serde::{Deserialize, Serialize};

/// A 2D point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// x coordinate
    pub x: f32,
    /// y coordinate
    pub y: f32,
}

impl Point2 {
    /// Create a new point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point2) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation towards `other`, `t = 0` returns `self`.
    pub fn lerp(&self, other: &Point2, t: f32) -> Point2 {
        Point2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Midpoint between two points.
    pub fn midpoint(&self, other: &Point2) -> Point2 {
        Point2 {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

impl From<[f32; 2]> for Point2 {
    fn from(p: [f32; 2]) -> Self {
        Point2 { x: p[0], y: p[1] }
    }
}

impl From<Point2> for [f32; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

/// An axis-aligned rectangle with its origin at the minimum corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    /// minimum x
    pub x: f32,
    /// minimum y
    pub y: f32,
    /// extent along x
    pub width: f32,
    /// extent along y
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Tight bounding box of a set of points, `None` for an empty set.
    ///
    /// # Examples
    ///
    /// ```
    /// use facemorph_geometry::{Point2, Rect};
    ///
    /// let rect = Rect::from_points(&[Point2::new(1.0, 4.0), Point2::new(3.0, 2.0)]).unwrap();
    /// assert_eq!(rect, Rect::new(1.0, 2.0, 2.0, 2.0));
    /// ```
    pub fn from_points(points: &[Point2]) -> Option<Rect> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points.iter().skip(1) {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Whether the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Minimum x.
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Minimum y.
    pub fn top(&self) -> f32 {
        self.y
    }

    /// Maximum x.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Maximum y.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Vertical center.
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Square with side `factor * max(width, height)` sharing this rectangle's center.
    pub fn expanded_square(&self, factor: f32) -> Rect {
        let side = self.width.max(self.height) * factor;
        Rect::new(
            self.center_x() - side / 2.0,
            self.center_y() - side / 2.0,
            side,
            side,
        )
    }

    /// The four corners in the order min-min, max-min, min-max, max-max.
    pub fn corners(&self) -> [Point2; 4] {
        [
            Point2::new(self.left(), self.top()),
            Point2::new(self.right(), self.top()),
            Point2::new(self.left(), self.bottom()),
            Point2::new(self.right(), self.bottom()),
        ]
    }
}
