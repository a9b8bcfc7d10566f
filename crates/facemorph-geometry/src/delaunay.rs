//! Delaunay triangulation of landmark sets.
//!
//! The morph builds one triangulation over the average of the source and
//! destination points and reuses the index list against both point sets, so
//! triangle `i` in the source always corresponds to triangle `i` in the destination.
//! The sweep itself is done by `delaunator`; this module validates the input and
//! normalizes the output.

use std::collections::BTreeSet;

use crate::error::TriangulationError;
use crate::point::Point2;

/// A triangle list as vertex-index triples over a shared point ordering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Triangulation {
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Wrap an existing triangle list.
    pub fn from_triangles(triangles: Vec<[usize; 3]>) -> Self {
        Self { triangles }
    }

    /// Number of triangles.
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Whether there are no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// The index triples.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// The set of point indices referenced by at least one triangle.
    pub fn vertex_indices(&self) -> BTreeSet<usize> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Resolve the triangles against a point array, three points per triangle.
    ///
    /// # Errors
    ///
    /// Fails if a triangle references a point that is not in `points`.
    pub fn gather(&self, points: &[Point2]) -> Result<Vec<Point2>, TriangulationError> {
        self.triangles
            .iter()
            .flatten()
            .map(|&i| {
                points
                    .get(i)
                    .copied()
                    .ok_or(TriangulationError::IndexOutOfRange(i, points.len()))
            })
            .collect()
    }
}

fn orient(a: &delaunator::Point, b: &delaunator::Point, c: &delaunator::Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Check that no two points are closer than `min_separation`.
///
/// Points are swept in x order so only neighbours within the separation band are
/// compared.
fn check_separation(points: &[Point2], min_separation: f32) -> Result<(), TriangulationError> {
    let min_separation = min_separation as f64;
    let min2 = min_separation * min_separation;

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| points[a].x.total_cmp(&points[b].x));

    for (k, &i) in order.iter().enumerate() {
        let a = points[i];
        for &j in order[k + 1..].iter() {
            let b = points[j];
            let dx = (b.x - a.x) as f64;
            if dx > min_separation {
                break;
            }
            let dy = (b.y - a.y) as f64;
            if dx * dx + dy * dy <= min2 {
                return Err(TriangulationError::DuplicatePoints(i.min(j), i.max(j)));
            }
        }
    }
    Ok(())
}

/// Build the Delaunay triangulation of a point set.
///
/// Triangles are returned with a counter-clockwise winding in the coordinate frame
/// of `points`. Near-collinear slivers are kept.
///
/// # Arguments
///
/// * `points` - The points to triangulate.
/// * `min_separation` - Two points closer than this are rejected as duplicates.
///
/// # Errors
///
/// Fails with fewer than 3 points, with points closer than `min_separation`, or when
/// all points lie on a line.
///
/// # Examples
///
/// ```
/// use facemorph_geometry::{triangulate, Point2};
///
/// let points = [
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     Point2::new(0.0, 1.0),
///     Point2::new(1.0, 1.0),
/// ];
/// let triangulation = triangulate(&points, 1e-6).unwrap();
/// assert_eq!(triangulation.len(), 2);
/// ```
pub fn triangulate(
    points: &[Point2],
    min_separation: f32,
) -> Result<Triangulation, TriangulationError> {
    let n = points.len();
    if n < 3 {
        return Err(TriangulationError::NotEnoughPoints(n));
    }
    check_separation(points, min_separation)?;

    let verts: Vec<delaunator::Point> = points
        .iter()
        .map(|p| delaunator::Point {
            x: p.x as f64,
            y: p.y as f64,
        })
        .collect();

    let triangles: Vec<[usize; 3]> = delaunator::triangulate(&verts)
        .triangles
        .chunks_exact(3)
        .filter_map(|t| {
            let area = orient(&verts[t[0]], &verts[t[1]], &verts[t[2]]);
            if area > 0.0 {
                Some([t[0], t[1], t[2]])
            } else if area < 0.0 {
                Some([t[0], t[2], t[1]])
            } else {
                None
            }
        })
        .collect();

    if triangles.is_empty() {
        return Err(TriangulationError::Collinear);
    }

    log::debug!("triangulated {} points into {} triangles", n, triangles.len());

    Ok(Triangulation { triangles })
}

/// Triangulate the elementwise average of two corresponding point sets.
///
/// The returned index list applies verbatim to both `src` and `dst`.
///
/// # Errors
///
/// Fails if the two sets differ in size, or for any reason [`triangulate`] fails.
pub fn triangulate_pair(
    src: &[Point2],
    dst: &[Point2],
    min_separation: f32,
) -> Result<Triangulation, TriangulationError> {
    if src.len() != dst.len() {
        return Err(TriangulationError::CountMismatch(src.len(), dst.len()));
    }
    let average: Vec<Point2> = src
        .iter()
        .zip(dst.iter())
        .map(|(a, b)| a.midpoint(b))
        .collect();

    triangulate(&average, min_separation)
}
