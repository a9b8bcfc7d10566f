use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::point::{Point2, Rect};

/// Coordinate convention of a landmark set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordSpace {
    /// Top-left origin, y grows downwards. Detectors report points this way.
    #[default]
    Image,
    /// Bottom-left origin, y grows upwards. Texture and clip space use this.
    Render,
}

/// Indices of the landmarks the alignment relies on.
///
/// The same layout applies to the source and the destination set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkLayout {
    /// index of the left eye center
    pub left_eye: usize,
    /// index of the right eye center
    pub right_eye: usize,
    /// index of the nose tip, reserved
    pub nose: usize,
}

impl LandmarkLayout {
    /// Layout of the 106 point face model.
    pub const FACE_106: LandmarkLayout = LandmarkLayout {
        left_eye: 55,
        right_eye: 52,
        nose: 9,
    };

    /// Check that the eye indices exist in a set of `len` points.
    pub fn check(&self, len: usize) -> Result<(), GeometryError> {
        for index in [self.left_eye, self.right_eye] {
            if index >= len {
                return Err(GeometryError::LandmarkIndexOutOfRange { index, len });
            }
        }
        Ok(())
    }
}

impl Default for LandmarkLayout {
    fn default() -> Self {
        Self::FACE_106
    }
}

/// An ordered set of facial landmarks.
///
/// The set remembers the size of the image it was detected on, its coordinate
/// convention and whether it was normalized to the unit square. Point `i` denotes the
/// same facial feature in every set built from the same detector.
///
/// Internally the points are always kept with a top-left origin; the convention only
/// changes how they are read and how the transforms are interpreted, so switching
/// back and forth between conventions never alters the stored values.
#[derive(Clone, Debug, PartialEq)]
pub struct Landmarks {
    points: Vec<Point2>,
    width: f32,
    height: f32,
    space: CoordSpace,
    normalized: bool,
}

#[inline]
fn flip(space: CoordSpace, extent: f32, p: Point2) -> Point2 {
    match space {
        CoordSpace::Image => p,
        CoordSpace::Render => Point2::new(p.x, extent - p.y),
    }
}

impl Landmarks {
    /// Create a landmark set in image space from pixel coordinates.
    ///
    /// # Arguments
    ///
    /// * `points` - The landmark positions in pixels.
    /// * `width` - The width of the image the points were detected on.
    /// * `height` - The height of the image the points were detected on.
    pub fn new(points: Vec<Point2>, width: f32, height: f32) -> Self {
        Self {
            points,
            width,
            height,
            space: CoordSpace::Image,
            normalized: false,
        }
    }

    /// Create a landmark set from interleaved `x0, y0, x1, y1, ...` values.
    ///
    /// A trailing unpaired value is ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use facemorph_geometry::Landmarks;
    ///
    /// let landmarks = Landmarks::from_flat(&[1.0, 2.0, 3.0, 4.0], 10.0, 10.0);
    /// assert_eq!(landmarks.len(), 2);
    /// assert_eq!(landmarks.point(1).x, 3.0);
    /// ```
    pub fn from_flat(values: &[f32], width: f32, height: f32) -> Self {
        let points = values
            .chunks_exact(2)
            .map(|xy| Point2::new(xy[0], xy[1]))
            .collect();
        Self::new(points, width, height)
    }

    /// The four corners of a `width` x `height` image as a landmark set.
    ///
    /// Transforming this set with the same operations as a face's landmarks gives the
    /// pose of the whole image quad.
    pub fn frame(width: f32, height: f32) -> Self {
        Self::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(width, 0.0),
                Point2::new(0.0, height),
                Point2::new(width, height),
            ],
            width,
            height,
        )
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Width of the source image.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Height of the source image.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Current coordinate convention.
    pub fn space(&self) -> CoordSpace {
        self.space
    }

    /// Whether the coordinates were mapped to the unit square.
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    fn extent_y(&self) -> f32 {
        if self.normalized {
            1.0
        } else {
            self.height
        }
    }

    /// Point `i` in the current convention.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range. Indices come from a fixed layout, not from user input.
    pub fn point(&self, i: usize) -> Point2 {
        flip(self.space, self.extent_y(), self.points[i])
    }

    /// Iterate over the points in the current convention.
    pub fn iter(&self) -> impl Iterator<Item = Point2> + '_ {
        let (space, extent) = (self.space, self.extent_y());
        self.points.iter().map(move |&p| flip(space, extent, p))
    }

    /// Collect the points in the current convention.
    pub fn to_vec(&self) -> Vec<Point2> {
        self.iter().collect()
    }

    /// Distance between points `i` and `j`.
    pub fn distance(&self, i: usize, j: usize) -> f32 {
        self.point(i).distance(&self.point(j))
    }

    /// Horizontal midpoint of points `i` and `j`.
    pub fn center_x(&self, i: usize, j: usize) -> f32 {
        (self.point(i).x + self.point(j).x) / 2.0
    }

    /// Vertical midpoint of points `i` and `j`.
    pub fn center_y(&self, i: usize, j: usize) -> f32 {
        (self.point(i).y + self.point(j).y) / 2.0
    }

    /// Midpoint of points `i` and `j`.
    pub fn center(&self, i: usize, j: usize) -> Point2 {
        Point2::new(self.center_x(i, j), self.center_y(i, j))
    }

    /// Signed angle in radians of the vector from point `i` to point `j`, in `(-π, π]`.
    pub fn angle(&self, i: usize, j: usize) -> f32 {
        let (a, b) = (self.point(i), self.point(j));
        (b.y - a.y).atan2(b.x - a.x)
    }

    fn map_points(&mut self, f: impl Fn(Point2) -> Point2) {
        let (space, extent) = (self.space, self.extent_y());
        for p in self.points.iter_mut() {
            *p = flip(space, extent, f(flip(space, extent, *p)));
        }
    }

    /// Multiply every coordinate by `s`.
    pub fn scale(&mut self, s: f32) {
        self.map_points(|p| Point2::new(p.x * s, p.y * s));
    }

    /// Move every point by `(dx, dy)`.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.map_points(|p| Point2::new(p.x + dx, p.y + dy));
    }

    /// Rotate every point by `angle` radians about the pivot `(cx, cy)`.
    pub fn rotate(&mut self, cx: f32, cy: f32, angle: f32) {
        let (sin, cos) = angle.sin_cos();
        self.map_points(|p| {
            let (dx, dy) = (p.x - cx, p.y - cy);
            Point2::new(cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
        });
    }

    /// Switch to render space (`to_render = true`) or image space.
    ///
    /// The y axis is flipped as `y' = height - y` (or `1 - y` once normalized). Calling
    /// it again with the same target is a no-op and switching back restores the exact
    /// original values.
    pub fn change_coord(&mut self, to_render: bool) {
        self.space = if to_render {
            CoordSpace::Render
        } else {
            CoordSpace::Image
        };
    }

    /// Map the coordinates into the unit square by dividing by the image size.
    ///
    /// Normalizing twice is a no-op.
    pub fn normalize(&mut self) {
        if self.normalized || self.width <= 0.0 || self.height <= 0.0 {
            return;
        }
        let (w, h) = (self.width, self.height);
        for p in self.points.iter_mut() {
            *p = Point2::new(p.x / w, p.y / h);
        }
        self.normalized = true;
    }

    /// Tight bounding box of the points in the current convention.
    pub fn bounding_rect(&self) -> Option<Rect> {
        Rect::from_points(&self.to_vec())
    }

    /// Points used for triangulation: the landmarks plus four synthetic corners.
    ///
    /// The corners belong to a square twice the size of the larger side of the
    /// bounding box, centered on the bounding box center, so the triangulation also
    /// covers the background around the face. An empty set stays empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use facemorph_geometry::{Landmarks, Point2};
    ///
    /// let landmarks = Landmarks::new(vec![Point2::new(2.0, 2.0), Point2::new(4.0, 4.0)], 8.0, 8.0);
    /// let points = landmarks.triangle_points();
    /// assert_eq!(points.len(), 6);
    /// assert_eq!(points[2], Point2::new(1.0, 1.0));
    /// assert_eq!(points[5], Point2::new(5.0, 5.0));
    /// ```
    pub fn triangle_points(&self) -> Vec<Point2> {
        self.triangle_points_with_scale(2.0)
    }

    /// Same as [`Landmarks::triangle_points`] with a custom expansion factor.
    pub fn triangle_points_with_scale(&self, factor: f32) -> Vec<Point2> {
        let mut points = self.to_vec();
        if let Some(rect) = Rect::from_points(&points) {
            points.extend(rect.expanded_square(factor).corners());
        }
        points
    }
}
