//! The morph session.
//!
//! A frame at blend fraction `t` is built in three steps:
//!
//! 1. both images are scaled onto the canvas and drawn at their aligned pose for `t`
//!    into two offscreen surfaces;
//! 2. the canvas is filled with a cross-dissolve of those two surfaces;
//! 3. the triangulated landmark mesh is drawn on top, each triangle sampling the
//!    source and destination surfaces at their own landmark positions and placed at
//!    the interpolated position.
//!
//! When the landmarks cannot be triangulated the cross-dissolve from step 2 is the
//! frame.

use facemorph_geometry::{triangulate_pair, Landmarks, Point2, TransformStatus, Triangulation};
use facemorph_image::{Image, ImageSize};
use facemorph_render::{
    CpuBackend, MorphVertex, RenderBackend, RenderPass, SurfaceId, TextureId,
};

use crate::config::MorphConfig;
use crate::error::MorphError;
use crate::image::{draw_onto, frame_pass, MorphImage};

// source points, destination points and the triangles shared by both
type Mesh = (Vec<Point2>, Vec<Point2>, Triangulation);

/// A rendered morph frame.
///
/// The frame stays valid until the next call to [`FaceMorph::render`] or
/// [`FaceMorph::release`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    surface: SurfaceId,
    texture: TextureId,
    size: ImageSize,
    t: f32,
}

impl Frame {
    /// The surface holding the frame.
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// The texture to sample the frame from.
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Size of the frame in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Blend fraction the frame was rendered at.
    pub fn t(&self) -> f32 {
        self.t
    }
}

/// One image placed on the canvas for the current frame.
struct Pose {
    texture: TextureId,
    landmarks: Landmarks,
    frame: Landmarks,
}

/// Blend fraction of frame `index` out of `total` evenly spaced frames.
fn frame_fraction(index: usize, total: usize) -> f32 {
    if index == 0 || total <= 1 {
        0.0
    } else if index >= total - 1 {
        1.0
    } else {
        index as f32 / (total - 1) as f32
    }
}

/// Landmarks in normalized render coordinates plus the synthetic boundary corners.
fn mesh_points(landmarks: &Landmarks, boundary_scale: f32) -> Vec<Point2> {
    let mut landmarks = landmarks.clone();
    landmarks.normalize();
    landmarks.change_coord(true);
    landmarks.triangle_points_with_scale(boundary_scale)
}

/// A morph session between a source and a destination image.
///
/// The session owns its backend and both images. Every call is synchronous; a
/// session is meant to be driven from a single thread.
///
/// # Examples
///
/// ```
/// use facemorph_engine::{FaceMorph, MorphConfig, MorphImage};
/// use facemorph_image::{PixelBuffer, PixelFormat};
///
/// let black = PixelBuffer::new([4, 4].into(), PixelFormat::Gray8, vec![0; 16]).unwrap();
/// let white = PixelBuffer::new([4, 4].into(), PixelFormat::Gray8, vec![255; 16]).unwrap();
///
/// let mut morph = FaceMorph::with_cpu_backend(MorphConfig::default());
/// morph.set_source(MorphImage::new(black, vec![]).unwrap()).unwrap();
/// morph.set_destination(MorphImage::new(white, vec![]).unwrap()).unwrap();
///
/// let frame = morph.render(0.25).unwrap();
/// let pixels = morph.read_frame(&frame).unwrap();
/// assert_eq!(pixels.pixel(1, 1), Some(&[64, 64, 64, 255][..]));
/// ```
pub struct FaceMorph<B: RenderBackend> {
    backend: B,
    config: MorphConfig,
    source: Option<MorphImage>,
    destination: Option<MorphImage>,
    output: Option<SurfaceId>,
}

impl FaceMorph<CpuBackend> {
    /// Create a session rendering on the CPU.
    pub fn with_cpu_backend(config: MorphConfig) -> Self {
        let backend = CpuBackend::new(config.pool_max_mb);
        Self::new(backend, config)
    }
}

impl<B: RenderBackend> FaceMorph<B> {
    /// Create a session on a backend.
    pub fn new(backend: B, config: MorphConfig) -> Self {
        Self {
            backend,
            config,
            source: None,
            destination: None,
            output: None,
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &MorphConfig {
        &self.config
    }

    /// The rendering backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The source image, if set.
    pub fn source(&self) -> Option<&MorphImage> {
        self.source.as_ref()
    }

    /// The destination image, if set.
    pub fn destination(&self) -> Option<&MorphImage> {
        self.destination.as_ref()
    }

    /// Set the image the morph starts from, releasing the previous one.
    pub fn set_source(&mut self, image: MorphImage) -> Result<(), MorphError> {
        log::info!(
            "source set: {} with {} landmarks",
            image.size(),
            image.landmarks().len()
        );
        if let Some(mut old) = self.source.replace(image) {
            old.release(&mut self.backend)?;
        }
        Ok(())
    }

    /// Set the image the morph ends at, releasing the previous one.
    ///
    /// The destination decides the canvas size.
    pub fn set_destination(&mut self, image: MorphImage) -> Result<(), MorphError> {
        log::info!(
            "destination set: {} with {} landmarks",
            image.size(),
            image.landmarks().len()
        );
        if let Some(mut old) = self.destination.replace(image) {
            old.release(&mut self.backend)?;
        }
        Ok(())
    }

    /// Size of the output canvas: the destination size, scaled down to
    /// `max_canvas_side` when configured.
    pub fn canvas_size(&self) -> Result<ImageSize, MorphError> {
        let size = self
            .destination
            .as_ref()
            .ok_or(MorphError::MissingImage("destination"))?
            .size();

        let longest = size.width.max(size.height);
        match self.config.max_canvas_side {
            Some(max_side) if max_side > 0 && longest > max_side => {
                let scale = max_side as f32 / longest as f32;
                let side = |v: usize| ((v as f32 * scale).round() as usize).max(1);
                Ok([side(size.width), side(size.height)].into())
            }
            _ => Ok(size),
        }
    }

    /// Scale both images onto the canvas and place them for blend fraction `t`.
    fn poses(&mut self, canvas: ImageSize, t: f32) -> Result<(Pose, Pose), MorphError> {
        let background = self.config.background;
        let (src_texture, src) = self
            .source
            .as_mut()
            .ok_or(MorphError::MissingImage("source"))?
            .fit_canvas(&mut self.backend, canvas, background)?;
        let (dst_texture, dst) = self
            .destination
            .as_mut()
            .ok_or(MorphError::MissingImage("destination"))?
            .fit_canvas(&mut self.backend, canvas, background)?;

        let (w, h) = (canvas.width as f32, canvas.height as f32);
        let mut src_pose = Pose {
            texture: src_texture,
            landmarks: src,
            frame: Landmarks::frame(w, h),
        };
        let mut dst_pose = Pose {
            texture: dst_texture,
            landmarks: dst,
            frame: Landmarks::frame(w, h),
        };

        if self.config.align {
            if let Err(err) = self.align(&mut src_pose, &mut dst_pose, t) {
                log::warn!("skipping alignment: {}", err);
            }
        }

        Ok((src_pose, dst_pose))
    }

    /// Move the source part of the way towards the destination eye line, and the
    /// destination onto wherever the source ended up.
    fn align(&self, src: &mut Pose, dst: &mut Pose, t: f32) -> Result<(), MorphError> {
        let layout = &self.config.layout;

        let src_status =
            TransformStatus::solve(&src.landmarks, &dst.landmarks, layout)?.partial(t);
        let src_pivot = src_status.pivot(&src.landmarks, layout)?;
        let mut src_landmarks = src.landmarks.clone();
        src_status.apply_with_pivot(&mut src_landmarks, src_pivot);

        // at the end the destination stays where it is
        let dst_status = if t >= 1.0 - self.config.endpoint_epsilon {
            TransformStatus::IDENTITY
        } else {
            TransformStatus::solve(&dst.landmarks, &src_landmarks, layout)?
        };
        let dst_pivot = dst_status.pivot(&dst.landmarks, layout)?;

        log::debug!("t={} source {:?} destination {:?}", t, src_status, dst_status);

        src.landmarks = src_landmarks;
        src_status.apply_with_pivot(&mut src.frame, src_pivot);
        dst_status.apply_with_pivot(&mut dst.landmarks, dst_pivot);
        dst_status.apply_with_pivot(&mut dst.frame, dst_pivot);
        Ok(())
    }

    /// The mesh points of both poses in normalized render coordinates.
    fn mesh(&self, src: &Pose, dst: &Pose) -> Result<Mesh, MorphError> {
        if src.landmarks.is_empty() || dst.landmarks.is_empty() {
            return Err(MorphError::EmptyLandmarks);
        }
        let src_points = mesh_points(&src.landmarks, self.config.boundary_scale);
        let dst_points = mesh_points(&dst.landmarks, self.config.boundary_scale);
        let triangulation =
            triangulate_pair(&src_points, &dst_points, self.config.min_point_separation)?;
        Ok((src_points, dst_points, triangulation))
    }

    /// Draw one image at its pose into a fresh surface.
    fn draw_pose(&mut self, pose: &Pose, canvas: ImageSize) -> Result<SurfaceId, MorphError> {
        let surface = self.backend.acquire_surface(canvas)?;
        let pass = frame_pass(pose.texture, &pose.frame.to_vec(), canvas);
        if let Err(err) = draw_onto(&mut self.backend, surface, self.config.background, &pass) {
            self.backend.release_surface(surface)?;
            return Err(err.into());
        }
        Ok(surface)
    }

    /// Blend the two posed surfaces into the output surface.
    fn compose(
        &mut self,
        t: f32,
        canvas: ImageSize,
        surfaces: (SurfaceId, SurfaceId),
        poses: (&Pose, &Pose),
    ) -> Result<SurfaceId, MorphError> {
        let (src_surface, dst_surface) = surfaces;
        let epsilon = self.config.endpoint_epsilon;
        if t <= epsilon {
            self.backend.retain_surface(src_surface)?;
            return Ok(src_surface);
        }
        if t >= 1.0 - epsilon {
            self.backend.retain_surface(dst_surface)?;
            return Ok(dst_surface);
        }

        let src_texture = self.backend.surface_texture(src_surface)?;
        let dst_texture = self.backend.surface_texture(dst_surface)?;

        let output = self.backend.acquire_surface(canvas)?;
        if let Err(err) = self.blend(output, (src_texture, dst_texture), poses, t) {
            self.backend.release_surface(output)?;
            return Err(err);
        }
        Ok(output)
    }

    fn blend(
        &mut self,
        output: SurfaceId,
        textures: (TextureId, TextureId),
        poses: (&Pose, &Pose),
        t: f32,
    ) -> Result<(), MorphError> {
        let (src, dst) = textures;
        self.backend
            .draw(output, &RenderPass::cross_dissolve(src, dst, t))?;

        let (src_points, dst_points, triangulation) = match self.mesh(poses.0, poses.1) {
            Ok(mesh) => mesh,
            Err(err) => {
                log::warn!("falling back to a cross-dissolve: {}", err);
                return Ok(());
            }
        };

        let vertices: Vec<MorphVertex> = triangulation
            .gather(&src_points)?
            .into_iter()
            .zip(triangulation.gather(&dst_points)?)
            .map(|(s, d)| {
                let p = s.lerp(&d, t);
                MorphVertex {
                    position: [p.x * 2.0 - 1.0, p.y * 2.0 - 1.0],
                    src_uv: s.into(),
                    dst_uv: d.into(),
                }
            })
            .collect();

        log::debug!("t={} drawing {} triangles", t, triangulation.len());

        self.backend.draw(
            output,
            &RenderPass::Blend {
                src,
                dst,
                t,
                vertices,
            },
        )?;
        Ok(())
    }

    fn release_output(&mut self) -> Result<(), MorphError> {
        if let Some(output) = self.output.take() {
            self.backend.release_surface(output)?;
        }
        Ok(())
    }

    /// Render the frame at blend fraction `t`.
    ///
    /// `t = 0` gives the source and `t = 1` the destination, both aligned when
    /// alignment is enabled. `t` is not clamped.
    ///
    /// # Errors
    ///
    /// Fails if an image is missing or the backend runs out of resources. Landmark
    /// problems never fail a frame; they degrade it to a cross-dissolve.
    pub fn render(&mut self, t: f32) -> Result<Frame, MorphError> {
        self.release_output()?;

        let canvas = self.canvas_size()?;
        let (src_pose, dst_pose) = self.poses(canvas, t)?;

        let src_surface = self.draw_pose(&src_pose, canvas)?;
        let dst_surface = match self.draw_pose(&dst_pose, canvas) {
            Ok(surface) => surface,
            Err(err) => {
                self.backend.release_surface(src_surface)?;
                return Err(err);
            }
        };

        let output = self.compose(
            t,
            canvas,
            (src_surface, dst_surface),
            (&src_pose, &dst_pose),
        );
        self.backend.release_surface(src_surface)?;
        self.backend.release_surface(dst_surface)?;
        let output = output?;

        self.output = Some(output);
        Ok(Frame {
            surface: output,
            texture: self.backend.surface_texture(output)?,
            size: canvas,
            t,
        })
    }

    /// Render frame `index` of an evenly spaced sequence of `total` frames.
    ///
    /// The first frame is the source and the last frame is the destination.
    pub fn render_frame_at(&mut self, index: usize, total: usize) -> Result<Frame, MorphError> {
        self.render(frame_fraction(index, total))
    }

    /// Download a frame as 8-bit RGBA, top row first.
    pub fn read_frame(&self, frame: &Frame) -> Result<Image<u8, 4>, MorphError> {
        Ok(self.backend.read_pixels(frame.texture)?)
    }

    /// The triangulation the frame at `t` would be drawn with.
    ///
    /// Indices refer to the landmarks followed by the four boundary corners.
    pub fn triangulation_at(&mut self, t: f32) -> Result<Triangulation, MorphError> {
        let canvas = self.canvas_size()?;
        let (src, dst) = self.poses(canvas, t)?;
        let (_, _, triangulation) = self.mesh(&src, &dst)?;
        Ok(triangulation)
    }

    /// Return every surface and texture held by the session to the backend.
    ///
    /// The images are kept and uploaded again by the next render.
    pub fn release(&mut self) -> Result<(), MorphError> {
        self.release_output()?;
        if let Some(source) = self.source.as_mut() {
            source.release(&mut self.backend)?;
        }
        if let Some(destination) = self.destination.as_mut() {
            destination.release(&mut self.backend)?;
        }
        log::info!("morph session released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use facemorph_geometry::LandmarkLayout;
    use facemorph_image::{PixelBuffer, PixelFormat};

    fn config() -> MorphConfig {
        MorphConfig {
            layout: LandmarkLayout {
                left_eye: 0,
                right_eye: 1,
                nose: 2,
            },
            ..Default::default()
        }
    }

    fn flat(width: usize, height: usize, value: u8) -> Result<PixelBuffer, MorphError> {
        Ok(PixelBuffer::new(
            [width, height].into(),
            PixelFormat::Gray8,
            vec![value; width * height],
        )?)
    }

    fn face(scale: f32) -> Vec<Point2> {
        [(20.0, 20.0), (44.0, 20.0), (32.0, 32.0), (24.0, 44.0), (40.0, 44.0)]
            .iter()
            .map(|&(x, y)| Point2::new(x * scale, y * scale))
            .collect()
    }

    #[test]
    fn frame_fraction_spacing() {
        assert_eq!(frame_fraction(0, 5), 0.0);
        assert_eq!(frame_fraction(2, 5), 0.5);
        assert_eq!(frame_fraction(4, 5), 1.0);
        assert_eq!(frame_fraction(9, 5), 1.0);
        assert_eq!(frame_fraction(0, 1), 0.0);
        assert_eq!(frame_fraction(3, 0), 0.0);
    }

    #[test]
    fn missing_images() -> Result<(), MorphError> {
        let mut morph = FaceMorph::with_cpu_backend(config());
        assert!(matches!(
            morph.render(0.5),
            Err(MorphError::MissingImage("destination"))
        ));
        morph.set_destination(MorphImage::new(flat(8, 8, 0)?, vec![])?)?;
        assert!(matches!(
            morph.render(0.5),
            Err(MorphError::MissingImage("source"))
        ));
        Ok(())
    }

    #[test]
    fn canvas_is_scaled_down() -> Result<(), MorphError> {
        let mut morph = FaceMorph::with_cpu_backend(MorphConfig {
            max_canvas_side: Some(32),
            ..config()
        });
        morph.set_destination(MorphImage::new(flat(64, 48, 0)?, vec![])?)?;
        assert_eq!(morph.canvas_size()?, [32, 24].into());
        Ok(())
    }

    #[test]
    fn empty_landmarks_cross_dissolve() -> Result<(), MorphError> {
        let mut morph = FaceMorph::with_cpu_backend(config());
        morph.set_source(MorphImage::new(flat(16, 16, 0)?, vec![])?)?;
        morph.set_destination(MorphImage::new(flat(16, 16, 200)?, face(0.25))?)?;

        let frame = morph.render(0.25)?;
        let pixels = morph.read_frame(&frame)?;
        for px in pixels.as_slice().chunks_exact(4) {
            assert_eq!(px, &[50, 50, 50, 255]);
        }
        assert!(matches!(
            morph.triangulation_at(0.25),
            Err(MorphError::EmptyLandmarks)
        ));
        Ok(())
    }

    #[test]
    fn triangulation_uses_every_landmark() -> Result<(), MorphError> {
        let mut morph = FaceMorph::with_cpu_backend(config());
        morph.set_source(MorphImage::new(flat(64, 64, 0)?, face(1.0))?)?;
        morph.set_destination(MorphImage::new(flat(64, 64, 255)?, face(0.9))?)?;

        let triangulation = morph.triangulation_at(0.5)?;
        // five landmarks plus four corners
        assert_eq!(triangulation.vertex_indices().len(), 9);
        Ok(())
    }

    #[test]
    fn alignment_is_identity_for_the_destination_at_one() -> Result<(), MorphError> {
        let mut morph = FaceMorph::with_cpu_backend(config());
        morph.set_source(MorphImage::new(flat(64, 64, 0)?, face(1.0))?)?;
        morph.set_destination(MorphImage::new(flat(64, 64, 255)?, face(0.8))?)?;

        let canvas = morph.canvas_size()?;
        let (src, dst) = morph.poses(canvas, 1.0)?;
        let original = morph
            .destination()
            .map(|d| d.landmarks().clone())
            .ok_or(MorphError::MissingImage("destination"))?;
        for i in 0..original.len() {
            let (moved, expected) = (dst.landmarks.point(i), original.point(i));
            assert_relative_eq!(moved.x, expected.x, epsilon = 1e-3);
            assert_relative_eq!(moved.y, expected.y, epsilon = 1e-3);
        }
        // the eyes meet
        for i in [0, 1] {
            let (a, b) = (src.landmarks.point(i), dst.landmarks.point(i));
            assert_relative_eq!(a.x, b.x, epsilon = 1e-3);
            assert_relative_eq!(a.y, b.y, epsilon = 1e-3);
        }
        Ok(())
    }

    #[test]
    fn source_pose_half_way() -> Result<(), MorphError> {
        let source = vec![
            Point2::new(200.0, 150.0),
            Point2::new(440.0, 150.0),
            Point2::new(320.0, 260.0),
        ];
        let destination = vec![
            Point2::new(220.0, 160.0),
            Point2::new(420.0, 160.0),
            Point2::new(320.0, 250.0),
        ];
        let mut morph = FaceMorph::with_cpu_backend(config());
        morph.set_source(MorphImage::new(flat(640, 480, 0)?, source.clone())?)?;
        morph.set_destination(MorphImage::new(flat(640, 480, 255)?, destination)?)?;

        let canvas = morph.canvas_size()?;
        let (src, _) = morph.poses(canvas, 0.5)?;
        for (i, p) in source.iter().enumerate() {
            let q = src.landmarks.point(i);
            assert_relative_eq!(q.x, p.x * 0.9166667 + 26.666667, epsilon = 1e-2);
            assert_relative_eq!(q.y, p.y * 0.9166667 + 17.5, epsilon = 1e-2);
        }
        // the image corners follow the landmarks
        assert_relative_eq!(src.frame.point(0).x, 26.666667, epsilon = 1e-2);
        assert_relative_eq!(src.frame.point(0).y, 17.5, epsilon = 1e-2);
        Ok(())
    }

    #[test]
    fn eye_line_moves_monotonically() -> Result<(), MorphError> {
        let mut morph = FaceMorph::with_cpu_backend(config());
        let tilted: Vec<Point2> = face(0.8)
            .into_iter()
            .map(|p| Point2::new(p.x + 6.0, p.y + 0.1 * p.x))
            .collect();
        morph.set_source(MorphImage::new(flat(64, 64, 0)?, face(1.0))?)?;
        morph.set_destination(MorphImage::new(flat(64, 64, 255)?, tilted)?)?;

        let canvas = morph.canvas_size()?;
        let mut eyes = Vec::new();
        for k in 0..=10 {
            let (src, _) = morph.poses(canvas, k as f32 / 10.0)?;
            eyes.push((src.landmarks.distance(0, 1), src.landmarks.angle(0, 1)));
        }
        // the destination eyes are closer together and tilted clockwise on screen
        for pair in eyes.windows(2) {
            assert!(pair[1].0 <= pair[0].0 + 1e-4);
            assert!(pair[1].1 >= pair[0].1 - 1e-6);
        }
        Ok(())
    }

    #[test]
    fn surfaces_are_returned() -> Result<(), MorphError> {
        let mut morph = FaceMorph::with_cpu_backend(config());
        morph.set_source(MorphImage::new(flat(32, 32, 0)?, face(0.5))?)?;
        morph.set_destination(MorphImage::new(flat(32, 32, 255)?, face(0.45))?)?;

        for t in [0.0, 0.3, 0.7, 1.0] {
            let frame = morph.render(t)?;
            // only the output stays referenced between frames
            let pool = morph.backend().pool();
            let referenced = (0..pool.len() as u32 + 4)
                .filter_map(|raw| pool.ref_count(SurfaceId::new(raw)))
                .filter(|count| *count > 0)
                .count();
            assert_eq!(referenced, 1);
            assert_eq!(pool.ref_count(frame.surface()), Some(1));
        }

        morph.release()?;
        assert_eq!(morph.backend().texture_count(), morph.backend().pool().len());
        assert!(!morph.source().is_some_and(MorphImage::is_uploaded));
        Ok(())
    }
}
