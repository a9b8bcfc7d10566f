use std::path::Path;

use facemorph_geometry::Point2;
use serde::Deserialize;

use crate::error::IoError;

// the shapes a landmark detector usually dumps
#[derive(Deserialize)]
#[serde(untagged)]
enum LandmarkFile {
    Pairs(Vec<[f32; 2]>),
    Points(Vec<Point2>),
    Flat(Vec<f32>),
}

/// Parses landmarks from a JSON string.
///
/// Three layouts are accepted, all in pixel coordinates with a top-left origin:
///
/// * a list of pairs, `[[x0, y0], [x1, y1], ...]`
/// * a list of objects, `[{"x": x0, "y": y0}, ...]`
/// * a flat list, `[x0, y0, x1, y1, ...]`
///
/// # Examples
///
/// ```
/// use facemorph_io::landmarks::landmarks_from_json_str;
///
/// let points = landmarks_from_json_str("[10.0, 20.0, 30.0, 40.0]").unwrap();
/// assert_eq!(points.len(), 2);
/// assert_eq!(points[1].x, 30.0);
/// ```
pub fn landmarks_from_json_str(json: &str) -> Result<Vec<Point2>, IoError> {
    let points = match serde_json::from_str(json)? {
        LandmarkFile::Pairs(pairs) => pairs.into_iter().map(|[x, y]| Point2::new(x, y)).collect(),
        LandmarkFile::Points(points) => points,
        LandmarkFile::Flat(values) => {
            if values.len() % 2 != 0 {
                return Err(IoError::OddCoordinateCount(values.len()));
            }
            values
                .chunks_exact(2)
                .map(|xy| Point2::new(xy[0], xy[1]))
                .collect()
        }
    };
    Ok(points)
}

/// Reads landmarks from a JSON file.
///
/// See [`landmarks_from_json_str`] for the accepted layouts.
pub fn read_landmarks_json(file_path: impl AsRef<Path>) -> Result<Vec<Point2>, IoError> {
    let file_path = file_path.as_ref();

    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let json = std::fs::read_to_string(file_path)?;
    let points = landmarks_from_json_str(&json)?;
    log::debug!("read {} landmarks from {}", points.len(), file_path.display());

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pairs_and_objects() -> Result<(), IoError> {
        let pairs = landmarks_from_json_str("[[1.5, 2.0], [3.0, 4.0]]")?;
        let objects = landmarks_from_json_str(r#"[{"x": 1.5, "y": 2.0}, {"x": 3.0, "y": 4.0}]"#)?;
        assert_eq!(pairs, vec![Point2::new(1.5, 2.0), Point2::new(3.0, 4.0)]);
        assert_eq!(pairs, objects);
        Ok(())
    }

    #[test]
    fn empty_list() -> Result<(), IoError> {
        assert!(landmarks_from_json_str("[]")?.is_empty());
        Ok(())
    }

    #[test]
    fn odd_flat_list() {
        assert!(matches!(
            landmarks_from_json_str("[1.0, 2.0, 3.0]"),
            Err(IoError::OddCoordinateCount(3))
        ));
        assert!(matches!(
            landmarks_from_json_str(r#"{"points": []}"#),
            Err(IoError::LandmarkParseError(_))
        ));
    }

    #[test]
    fn read_file() -> Result<(), IoError> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "[10, 20, 30, 40, 50, 60]")?;

        let points = read_landmarks_json(file.path())?;
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], Point2::new(50.0, 60.0));

        assert!(matches!(
            read_landmarks_json("/does/not/exist.json"),
            Err(IoError::FileDoesNotExist(_))
        ));
        Ok(())
    }
}
