use std::collections::HashMap;

use rayon::prelude::*;

use facemorph_image::{rgba8_from_rgba_f32, rgba_from_pixels, Image, ImageSize, PixelBuffer};

use crate::backend::{RenderBackend, RenderPass, SurfaceId, TextureId};
use crate::error::RenderError;
use crate::pool::SurfacePool;
use crate::sampler::sample_bilinear;

/// Largest surface side the CPU backend allocates.
pub const MAX_SURFACE_SIDE: usize = 8192;

/// Default memory cap of the surface pool in megabytes.
pub const DEFAULT_POOL_MAX_MB: usize = 50;

// per-vertex data handed to the fragment stage, interpolated across the triangle
type Varying = [f32; 4];

/// A triangle in pixel coordinates, ready to be scanned.
struct RasterTriangle {
    p: [[f32; 2]; 3],
    varyings: [Varying; 3],
    area: f32,
    min_x: f32,
    max_x: f32,
    min_y: f32,
    max_y: f32,
}

#[inline]
fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

impl RasterTriangle {
    /// Map clip space vertices to pixel coordinates, `None` for zero-area triangles.
    fn new(size: ImageSize, positions: [[f32; 2]; 3], varyings: [Varying; 3]) -> Option<Self> {
        let (w, h) = (size.width as f32, size.height as f32);
        let p = positions.map(|pos| [(pos[0] + 1.0) * 0.5 * w, (1.0 - pos[1]) * 0.5 * h]);

        let area = edge(p[0], p[1], p[2]);
        if area.abs() <= f32::EPSILON || !area.is_finite() {
            return None;
        }

        Some(Self {
            p,
            varyings,
            area,
            min_x: p[0][0].min(p[1][0]).min(p[2][0]),
            max_x: p[0][0].max(p[1][0]).max(p[2][0]),
            min_y: p[0][1].min(p[1][1]).min(p[2][1]),
            max_y: p[0][1].max(p[1][1]).max(p[2][1]),
        })
    }

    /// Barycentric weights of `q`, `None` when it lies outside the triangle.
    #[inline]
    fn weights(&self, q: [f32; 2]) -> Option<[f32; 3]> {
        // small slack so pixel centers on a shared edge are never left uncovered
        const SLACK: f32 = -1e-5;
        let w0 = edge(self.p[1], self.p[2], q) / self.area;
        let w1 = edge(self.p[2], self.p[0], q) / self.area;
        let w2 = edge(self.p[0], self.p[1], q) / self.area;
        (w0 >= SLACK && w1 >= SLACK && w2 >= SLACK).then_some([w0, w1, w2])
    }

    #[inline]
    fn interpolate(&self, w: [f32; 3]) -> Varying {
        let mut out = [0.0; 4];
        for (k, o) in out.iter_mut().enumerate() {
            *o = self.varyings[0][k] * w[0]
                + self.varyings[1][k] * w[1]
                + self.varyings[2][k] * w[2];
        }
        out
    }
}

/// Scan a triangle list into `target`, running `shade` for every covered pixel center.
///
/// Rows are processed in parallel. Later triangles overwrite earlier ones.
fn rasterize(
    target: &mut Image<f32, 4>,
    triangles: &[RasterTriangle],
    shade: impl Fn(&Varying) -> [f32; 4] + Send + Sync,
) {
    let width = target.width();
    if width == 0 || triangles.is_empty() {
        return;
    }

    target
        .as_slice_mut()
        .par_chunks_exact_mut(width * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let py = y as f32 + 0.5;
            for tri in triangles.iter() {
                if py < tri.min_y || py > tri.max_y {
                    continue;
                }
                let last = (tri.max_x - 0.5).floor();
                if last < 0.0 {
                    continue;
                }
                let start = (tri.min_x - 0.5).ceil().max(0.0) as usize;
                let end = (last as usize).min(width - 1);

                for x in start..=end {
                    let Some(w) = tri.weights([x as f32 + 0.5, py]) else {
                        continue;
                    };
                    let color = shade(&tri.interpolate(w));
                    row[x * 4..x * 4 + 4].copy_from_slice(&color);
                }
            }
        });
}

/// Build the scan list for a pass, dropping degenerate triangles.
fn setup(size: ImageSize, vertices: &[([f32; 2], Varying)]) -> Vec<RasterTriangle> {
    vertices
        .chunks_exact(3)
        .filter_map(|tri| {
            RasterTriangle::new(
                size,
                [tri[0].0, tri[1].0, tri[2].0],
                [tri[0].1, tri[1].1, tri[2].1],
            )
        })
        .collect()
}

/// Software implementation of [`RenderBackend`].
///
/// Textures are RGBA `f32` images stored top row first. Surfaces come from a
/// [`SurfacePool`] and are backed by textures of the same store.
///
/// # Examples
///
/// ```
/// use facemorph_render::{CpuBackend, RenderBackend};
///
/// let mut backend = CpuBackend::new(8);
/// let surface = backend.acquire_surface([4, 4].into()).unwrap();
/// backend.clear(surface, [1.0, 0.0, 0.0, 1.0]).unwrap();
///
/// let texture = backend.surface_texture(surface).unwrap();
/// let pixels = backend.read_pixels(texture).unwrap();
/// assert_eq!(pixels.pixel(0, 0), Some(&[255, 0, 0, 255][..]));
/// ```
pub struct CpuBackend {
    textures: HashMap<TextureId, Image<f32, 4>>,
    surfaces: HashMap<SurfaceId, TextureId>,
    pool: SurfacePool,
    next_texture: u32,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_MAX_MB)
    }
}

impl CpuBackend {
    /// Create a backend whose surface pool keeps at most `pool_max_mb` megabytes.
    pub fn new(pool_max_mb: usize) -> Self {
        Self {
            textures: HashMap::new(),
            surfaces: HashMap::new(),
            pool: SurfacePool::new(pool_max_mb),
            next_texture: 0,
        }
    }

    /// The surface pool bookkeeping.
    pub fn pool(&self) -> &SurfacePool {
        &self.pool
    }

    /// Number of live textures, surface storage included.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn insert_texture(&mut self, image: Image<f32, 4>) -> TextureId {
        let id = TextureId::new(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id, image);
        id
    }

    fn is_surface_texture(&self, texture: TextureId) -> bool {
        self.surfaces.values().any(|t| *t == texture)
    }

    fn free_surfaces(&mut self, evicted: Vec<SurfaceId>) {
        for surface in evicted {
            if let Some(texture) = self.surfaces.remove(&surface) {
                self.textures.remove(&texture);
            }
        }
    }

    fn texture(&self, texture: TextureId) -> Result<&Image<f32, 4>, RenderError> {
        self.textures
            .get(&texture)
            .ok_or(RenderError::UnknownTexture(texture))
    }

    fn shade_pass(&self, canvas: &mut Image<f32, 4>, pass: &RenderPass) -> Result<(), RenderError> {
        let size = canvas.size();
        match pass {
            RenderPass::Blit { texture, vertices } => {
                let source = self.texture(*texture)?;
                let vertices: Vec<([f32; 2], Varying)> = vertices
                    .iter()
                    .map(|v| (v.position, [v.uv[0], v.uv[1], 0.0, 0.0]))
                    .collect();
                let triangles = setup(size, &vertices);
                rasterize(canvas, &triangles, |a| sample_bilinear(source, [a[0], a[1]]));
            }
            RenderPass::Blend {
                src,
                dst,
                t,
                vertices,
            } => {
                let (src, dst, t) = (self.texture(*src)?, self.texture(*dst)?, *t);
                let vertices: Vec<([f32; 2], Varying)> = vertices
                    .iter()
                    .map(|v| {
                        (
                            v.position,
                            [v.src_uv[0], v.src_uv[1], v.dst_uv[0], v.dst_uv[1]],
                        )
                    })
                    .collect();
                let triangles = setup(size, &vertices);
                rasterize(canvas, &triangles, |a| {
                    let c0 = sample_bilinear(src, [a[0], a[1]]);
                    let c1 = sample_bilinear(dst, [a[2], a[3]]);
                    [
                        c0[0] + (c1[0] - c0[0]) * t,
                        c0[1] + (c1[1] - c0[1]) * t,
                        c0[2] + (c1[2] - c0[2]) * t,
                        1.0,
                    ]
                });
            }
        }
        Ok(())
    }
}

impl RenderBackend for CpuBackend {
    fn upload_texture(
        &mut self,
        pixels: &PixelBuffer,
        existing: Option<TextureId>,
    ) -> Result<TextureId, RenderError> {
        let image = rgba_from_pixels(pixels)?;
        match existing {
            Some(texture) => {
                if self.is_surface_texture(texture) {
                    return Err(RenderError::TextureInUse(texture));
                }
                let slot = self
                    .textures
                    .get_mut(&texture)
                    .ok_or(RenderError::UnknownTexture(texture))?;
                *slot = image;
                Ok(texture)
            }
            None => Ok(self.insert_texture(image)),
        }
    }

    fn create_texture(&mut self, image: Image<f32, 4>) -> Result<TextureId, RenderError> {
        Ok(self.insert_texture(image))
    }

    fn copy_texture(&mut self, texture: TextureId) -> Result<TextureId, RenderError> {
        let image = self.texture(texture)?.clone();
        Ok(self.insert_texture(image))
    }

    fn delete_texture(&mut self, texture: TextureId) -> Result<(), RenderError> {
        if self.is_surface_texture(texture) {
            return Err(RenderError::TextureInUse(texture));
        }
        self.textures
            .remove(&texture)
            .map(|_| ())
            .ok_or(RenderError::UnknownTexture(texture))
    }

    fn texture_size(&self, texture: TextureId) -> Result<ImageSize, RenderError> {
        Ok(self.texture(texture)?.size())
    }

    fn acquire_surface(&mut self, size: ImageSize) -> Result<SurfaceId, RenderError> {
        if size.is_empty() || size.width > MAX_SURFACE_SIDE || size.height > MAX_SURFACE_SIDE {
            return Err(RenderError::SurfaceAllocation {
                width: size.width,
                height: size.height,
            });
        }

        let acquired = self.pool.acquire(size);
        if !acquired.reused {
            let image = Image::from_size_val(size, 0.0)?;
            let texture = self.insert_texture(image);
            self.surfaces.insert(acquired.id, texture);
            log::debug!("allocated surface {:?} of {}", acquired.id, size);

            let evicted = self.pool.trim();
            self.free_surfaces(evicted);
        }
        Ok(acquired.id)
    }

    fn retain_surface(&mut self, surface: SurfaceId) -> Result<(), RenderError> {
        self.pool.retain(surface)
    }

    fn release_surface(&mut self, surface: SurfaceId) -> Result<(), RenderError> {
        let evicted = self.pool.release(surface)?;
        self.free_surfaces(evicted);
        Ok(())
    }

    fn surface_texture(&self, surface: SurfaceId) -> Result<TextureId, RenderError> {
        self.surfaces
            .get(&surface)
            .copied()
            .ok_or(RenderError::UnknownSurface(surface))
    }

    fn clear(&mut self, target: SurfaceId, color: [f32; 4]) -> Result<(), RenderError> {
        let texture = self.surface_texture(target)?;
        let canvas = self
            .textures
            .get_mut(&texture)
            .ok_or(RenderError::UnknownTexture(texture))?;
        canvas
            .as_slice_mut()
            .par_chunks_exact_mut(4)
            .for_each(|px| px.copy_from_slice(&color));
        Ok(())
    }

    fn draw(&mut self, target: SurfaceId, pass: &RenderPass) -> Result<(), RenderError> {
        let count = pass.vertex_count();
        if count % 3 != 0 {
            return Err(RenderError::InvalidVertexCount(count));
        }

        let texture = self.surface_texture(target)?;
        if pass.textures().contains(&texture) {
            return Err(RenderError::FeedbackLoop(texture));
        }

        // take the target out of the store so the sources can be borrowed alongside it
        let mut canvas = self
            .textures
            .remove(&texture)
            .ok_or(RenderError::UnknownTexture(texture))?;
        let result = self.shade_pass(&mut canvas, pass);
        self.textures.insert(texture, canvas);
        result
    }

    fn read_pixels(&self, texture: TextureId) -> Result<Image<u8, 4>, RenderError> {
        Ok(rgba8_from_rgba_f32(self.texture(texture)?)?)
    }
}
