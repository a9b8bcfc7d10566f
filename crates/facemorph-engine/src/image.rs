use facemorph_geometry::{Landmarks, Point2};
use facemorph_image::{ImageSize, PixelBuffer};
use facemorph_render::{
    quad_triangles, RenderBackend, RenderError, RenderPass, SurfaceId, TextureId,
};

use crate::error::MorphError;

/// Build a blit of `texture` onto the quad spanned by the corners of an image.
///
/// `corners` are in canvas pixels with a top-left origin, in the order returned by
/// [`Landmarks::frame`]: top-left, top-right, bottom-left, bottom-right.
pub(crate) fn frame_pass(texture: TextureId, corners: &[Point2], canvas: ImageSize) -> RenderPass {
    let (w, h) = (canvas.width as f32, canvas.height as f32);
    let mut positions = [[0.0; 2]; 4];
    for (pos, c) in positions.iter_mut().zip(corners.iter()) {
        *pos = [c.x / w * 2.0 - 1.0, 1.0 - c.y / h * 2.0];
    }
    RenderPass::Blit {
        texture,
        vertices: quad_triangles(
            positions,
            [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
        ),
    }
}

/// Clear a surface and draw a pass into it, returning the surface texture.
pub(crate) fn draw_onto<B: RenderBackend>(
    backend: &mut B,
    surface: SurfaceId,
    background: [f32; 4],
    pass: &RenderPass,
) -> Result<TextureId, RenderError> {
    backend.clear(surface, background)?;
    backend.draw(surface, pass)?;
    backend.surface_texture(surface)
}

/// The image scaled onto a canvas, with its landmarks in canvas pixels.
#[derive(Debug)]
struct CanvasCache {
    size: ImageSize,
    texture: TextureId,
    // the texture is a scaled copy owned by the cache, not the upload itself
    owned: bool,
    landmarks: Landmarks,
}

/// One side of a morph: the pixels, their landmarks and the textures derived from them.
///
/// The backend textures are created lazily the first time the image is rendered and
/// dropped by [`MorphImage::release`].
#[derive(Debug)]
pub struct MorphImage {
    pixels: PixelBuffer,
    landmarks: Landmarks,
    texture: Option<TextureId>,
    canvas: Option<CanvasCache>,
}

impl MorphImage {
    /// Pair a pixel buffer with the landmarks detected on it.
    ///
    /// # Arguments
    ///
    /// * `pixels` - The image.
    /// * `points` - The landmarks in pixel coordinates, top-left origin. May be empty
    ///   when no face was found, in which case the morph degrades to a cross-dissolve.
    ///
    /// # Errors
    ///
    /// Fails if the image has no pixels.
    pub fn new(pixels: PixelBuffer, points: Vec<Point2>) -> Result<Self, MorphError> {
        let size = pixels.size();
        if size.is_empty() {
            return Err(MorphError::EmptyImage);
        }
        let landmarks = Landmarks::new(points, size.width as f32, size.height as f32);
        Ok(Self {
            pixels,
            landmarks,
            texture: None,
            canvas: None,
        })
    }

    /// Size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.pixels.size()
    }

    /// The pixels.
    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// The landmarks in image pixels.
    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    /// Whether the image currently holds backend resources.
    pub fn is_uploaded(&self) -> bool {
        self.texture.is_some()
    }

    fn upload<B: RenderBackend>(&mut self, backend: &mut B) -> Result<TextureId, MorphError> {
        if let Some(texture) = self.texture {
            return Ok(texture);
        }
        let texture = backend.upload_texture(&self.pixels, None)?;
        self.texture = Some(texture);
        Ok(texture)
    }

    /// The image scaled to fit `canvas`, centered, and its landmarks in canvas pixels.
    ///
    /// The result is cached until the canvas size changes.
    pub(crate) fn fit_canvas<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        canvas: ImageSize,
        background: [f32; 4],
    ) -> Result<(TextureId, Landmarks), MorphError> {
        if let Some(cache) = &self.canvas {
            if cache.size == canvas {
                return Ok((cache.texture, cache.landmarks.clone()));
            }
        }
        self.release_canvas(backend)?;

        let texture = self.upload(backend)?;
        let size = self.size();

        let cache = if size == canvas {
            CanvasCache {
                size: canvas,
                texture,
                owned: false,
                landmarks: self.landmarks.clone(),
            }
        } else {
            let (w, h) = (size.width as f32, size.height as f32);
            let (cw, ch) = (canvas.width as f32, canvas.height as f32);
            let scale = (cw / w).min(ch / h);
            let (ox, oy) = ((cw - w * scale) / 2.0, (ch - h * scale) / 2.0);

            let mut frame = Landmarks::frame(w, h);
            frame.scale(scale);
            frame.translate(ox, oy);

            let mut landmarks = Landmarks::new(self.landmarks.to_vec(), cw, ch);
            landmarks.scale(scale);
            landmarks.translate(ox, oy);

            // draw through a pooled surface, then keep a plain copy so the surface
            // goes back to the pool before this call returns
            let surface = backend.acquire_surface(canvas)?;
            let pass = frame_pass(texture, &frame.to_vec(), canvas);
            let scaled = match draw_onto(backend, surface, background, &pass) {
                Ok(drawn) => backend.copy_texture(drawn),
                Err(err) => Err(err),
            };
            backend.release_surface(surface)?;
            let scaled = scaled?;

            log::debug!("scaled {} onto a {} canvas by {}", size, canvas, scale);

            CanvasCache {
                size: canvas,
                texture: scaled,
                owned: true,
                landmarks,
            }
        };

        let result = (cache.texture, cache.landmarks.clone());
        self.canvas = Some(cache);
        Ok(result)
    }

    fn release_canvas<B: RenderBackend>(&mut self, backend: &mut B) -> Result<(), MorphError> {
        if let Some(CanvasCache {
            texture,
            owned: true,
            ..
        }) = self.canvas.take()
        {
            backend.delete_texture(texture)?;
        }
        Ok(())
    }

    /// Return every texture and surface derived from this image to `backend`.
    pub fn release<B: RenderBackend>(&mut self, backend: &mut B) -> Result<(), MorphError> {
        self.release_canvas(backend)?;
        if let Some(texture) = self.texture.take() {
            backend.delete_texture(texture)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use facemorph_image::PixelFormat;
    use facemorph_render::CpuBackend;

    fn white(width: usize, height: usize) -> Result<PixelBuffer, MorphError> {
        Ok(PixelBuffer::new(
            [width, height].into(),
            PixelFormat::Gray8,
            vec![255; width * height],
        )?)
    }

    #[test]
    fn empty_image() -> Result<(), MorphError> {
        let pixels = PixelBuffer::new([0, 3].into(), PixelFormat::Rgb8, vec![])?;
        assert!(matches!(
            MorphImage::new(pixels, vec![]),
            Err(MorphError::EmptyImage)
        ));
        Ok(())
    }

    #[test]
    fn fit_same_size_uses_the_upload() -> Result<(), MorphError> {
        let mut backend = CpuBackend::default();
        let mut image = MorphImage::new(white(8, 6)?, vec![Point2::new(2.0, 3.0)])?;

        let (texture, landmarks) = image.fit_canvas(&mut backend, [8, 6].into(), [0.0; 4])?;
        assert!(image.is_uploaded());
        assert_eq!(landmarks, *image.landmarks());
        assert_eq!(backend.texture_size(texture)?, [8, 6].into());
        assert!(backend.pool().is_empty());
        Ok(())
    }

    #[test]
    fn fit_letterboxes_and_moves_landmarks() -> Result<(), MorphError> {
        let mut backend = CpuBackend::default();
        // 4x2 image onto an 8x8 canvas: scale 2, vertical offset 2
        let mut image = MorphImage::new(white(4, 2)?, vec![Point2::new(1.0, 1.0)])?;
        let (texture, landmarks) =
            image.fit_canvas(&mut backend, [8, 8].into(), [0.0, 0.0, 0.0, 1.0])?;

        assert_relative_eq!(landmarks.point(0).x, 2.0);
        assert_relative_eq!(landmarks.point(0).y, 4.0);
        assert_relative_eq!(landmarks.width(), 8.0);

        let out = backend.read_pixels(texture)?;
        assert_eq!(out.pixel(3, 0), Some(&[0, 0, 0, 255][..]));
        assert_eq!(out.pixel(3, 3), Some(&[255, 255, 255, 255][..]));
        assert_eq!(out.pixel(3, 7), Some(&[0, 0, 0, 255][..]));

        // cached for the same canvas
        let (again, _) = image.fit_canvas(&mut backend, [8, 8].into(), [0.0; 4])?;
        assert_eq!(again, texture);

        // the surface used for scaling is idle again, only the copy is kept
        assert_eq!(backend.pool().len(), 1);
        assert_eq!(backend.pool().ref_count(SurfaceId::new(0)), Some(0));
        assert_eq!(backend.texture_count(), 3);

        image.release(&mut backend)?;
        assert!(!image.is_uploaded());
        // upload and copy are deleted, the pooled surface storage remains
        assert_eq!(backend.texture_count(), 1);
        Ok(())
    }
}
