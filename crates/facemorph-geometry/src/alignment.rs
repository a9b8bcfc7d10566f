//! Eye-line alignment between two landmark sets.
//!
//! [`TransformStatus::solve`] computes the similarity transform that takes the eye
//! line of one face onto the eye line of another. [`TransformStatus::partial`] then
//! gives the transform at an intermediate blend fraction by interpolating each
//! parameter independently. This parameter-space interpolation is only a good
//! approximation for the small rotations found between near-frontal faces; it
//! degrades as the rotation approaches 180 degrees.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::landmarks::{LandmarkLayout, Landmarks};
use crate::point::Point2;

/// Similarity transform applied to one image at a given blend fraction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformStatus {
    /// uniform scale about the origin
    pub scale: f32,
    /// rotation in radians about the transformed eye center
    pub rotate: f32,
    /// translation along x, applied after scaling
    pub tx: f32,
    /// translation along y, applied after scaling
    pub ty: f32,
}

impl Default for TransformStatus {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Wrap an angle into `(-π, π]`.
fn wrap_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

impl TransformStatus {
    /// The transform that leaves every point in place.
    pub const IDENTITY: TransformStatus = TransformStatus {
        scale: 1.0,
        rotate: 0.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Solve the transform aligning the eye line of `a` onto the eye line of `b`.
    ///
    /// * `scale = eyeDistance(b) / eyeDistance(a)`
    /// * `rotate = eyeAngle(b) - eyeAngle(a)`
    /// * `tx = centerX(b) - centerX(a) * scale`, `ty` likewise
    ///
    /// # Errors
    ///
    /// Fails if the layout does not fit either set, if the sets use different
    /// coordinate conventions or if the eyes of `a` coincide.
    ///
    /// # Examples
    ///
    /// ```
    /// use facemorph_geometry::{LandmarkLayout, Landmarks, Point2, TransformStatus};
    ///
    /// let layout = LandmarkLayout { left_eye: 0, right_eye: 1, nose: 0 };
    /// let a = Landmarks::new(vec![Point2::new(200.0, 150.0), Point2::new(440.0, 150.0)], 640.0, 480.0);
    /// let b = Landmarks::new(vec![Point2::new(220.0, 160.0), Point2::new(420.0, 160.0)], 640.0, 480.0);
    ///
    /// let status = TransformStatus::solve(&a, &b, &layout).unwrap();
    /// assert!((status.scale - 200.0 / 240.0).abs() < 1e-6);
    /// assert!((status.ty - 35.0).abs() < 1e-4);
    /// ```
    pub fn solve(
        a: &Landmarks,
        b: &Landmarks,
        layout: &LandmarkLayout,
    ) -> Result<Self, GeometryError> {
        layout.check(a.len())?;
        layout.check(b.len())?;

        if a.space() != b.space() {
            return Err(GeometryError::CoordSpaceMismatch);
        }

        let (l, r) = (layout.left_eye, layout.right_eye);

        let distance_a = a.distance(l, r);
        if distance_a <= f32::EPSILON {
            return Err(GeometryError::DegenerateEyeLine);
        }

        let scale = b.distance(l, r) / distance_a;
        let rotate = wrap_angle(b.angle(l, r) - a.angle(l, r));
        let tx = b.center_x(l, r) - a.center_x(l, r) * scale;
        let ty = b.center_y(l, r) - a.center_y(l, r) * scale;

        Ok(Self {
            scale,
            rotate,
            tx,
            ty,
        })
    }

    /// The transform at blend fraction `t`, interpolating each parameter linearly.
    ///
    /// `t = 0` gives the identity and `t = 1` gives `self`.
    pub fn partial(&self, t: f32) -> Self {
        Self {
            scale: 1.0 + (self.scale - 1.0) * t,
            rotate: self.rotate * t,
            tx: self.tx * t,
            ty: self.ty * t,
        }
    }

    /// Whether the transform leaves every point in place.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// The rotation pivot: the eye center of `landmarks` after scaling and translating.
    pub fn pivot(
        &self,
        landmarks: &Landmarks,
        layout: &LandmarkLayout,
    ) -> Result<Point2, GeometryError> {
        layout.check(landmarks.len())?;
        let center = landmarks.center(layout.left_eye, layout.right_eye);
        Ok(Point2::new(
            center.x * self.scale + self.tx,
            center.y * self.scale + self.ty,
        ))
    }

    /// Apply the transform in place: scale, translate, then rotate about the eye center.
    pub fn apply(
        &self,
        landmarks: &mut Landmarks,
        layout: &LandmarkLayout,
    ) -> Result<(), GeometryError> {
        let pivot = self.pivot(landmarks, layout)?;
        self.apply_with_pivot(landmarks, pivot);
        Ok(())
    }

    /// Apply the transform in place rotating about a given pivot.
    ///
    /// Used to move a companion set, such as the image corners, exactly like the face.
    pub fn apply_with_pivot(&self, landmarks: &mut Landmarks, pivot: Point2) {
        if self.is_identity() {
            return;
        }
        landmarks.scale(self.scale);
        landmarks.translate(self.tx, self.ty);
        if self.rotate != 0.0 {
            landmarks.rotate(pivot.x, pivot.y, self.rotate);
        }
    }
}
