use facemorph_image::{Image, ImageSize, PixelBuffer};

use crate::error::RenderError;

/// Handle to a texture owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(u32);

impl TextureId {
    /// Wrap a raw backend handle.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw backend handle.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Handle to an offscreen render surface owned by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceId(u32);

impl SurfaceId {
    /// Wrap a raw backend handle.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw backend handle.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Vertex of a textured triangle.
///
/// Positions are in clip space, `[-1, 1]` on both axes with y pointing up. Texture
/// coordinates are in `[0, 1]` with the origin at the bottom-left of the texture.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuadVertex {
    /// clip space position
    pub position: [f32; 2],
    /// texture coordinate
    pub uv: [f32; 2],
}

/// Vertex of a morph triangle sampling two textures at once.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MorphVertex {
    /// clip space position
    pub position: [f32; 2],
    /// texture coordinate in the source texture
    pub src_uv: [f32; 2],
    /// texture coordinate in the destination texture
    pub dst_uv: [f32; 2],
}

/// The draw operations a backend has to support.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderPass {
    /// Copy a texture through a triangle list.
    Blit {
        /// texture to sample
        texture: TextureId,
        /// triangle list, three vertices per triangle
        vertices: Vec<QuadVertex>,
    },
    /// Mix two textures through a triangle list: `lerp(src(src_uv), dst(dst_uv), t)`.
    ///
    /// The output is opaque.
    Blend {
        /// source texture
        src: TextureId,
        /// destination texture
        dst: TextureId,
        /// blend fraction
        t: f32,
        /// triangle list, three vertices per triangle
        vertices: Vec<MorphVertex>,
    },
}

impl RenderPass {
    /// A full-frame blend where both textures are sampled at the same coordinates.
    pub fn cross_dissolve(src: TextureId, dst: TextureId, t: f32) -> Self {
        let vertices = full_frame_quad()
            .into_iter()
            .map(|v| MorphVertex {
                position: v.position,
                src_uv: v.uv,
                dst_uv: v.uv,
            })
            .collect();
        RenderPass::Blend {
            src,
            dst,
            t,
            vertices,
        }
    }

    /// Number of vertices in the pass.
    pub fn vertex_count(&self) -> usize {
        match self {
            RenderPass::Blit { vertices, .. } => vertices.len(),
            RenderPass::Blend { vertices, .. } => vertices.len(),
        }
    }

    /// The textures the pass samples from.
    pub fn textures(&self) -> Vec<TextureId> {
        match self {
            RenderPass::Blit { texture, .. } => vec![*texture],
            RenderPass::Blend { src, dst, .. } => vec![*src, *dst],
        }
    }
}

/// Split a quad into two triangles.
///
/// Corners are given in the order min-min, max-min, min-max, max-max.
pub fn quad_triangles(positions: [[f32; 2]; 4], uvs: [[f32; 2]; 4]) -> Vec<QuadVertex> {
    [0, 1, 2, 1, 3, 2]
        .into_iter()
        .map(|i| QuadVertex {
            position: positions[i],
            uv: uvs[i],
        })
        .collect()
}

/// A quad covering the whole target and the whole texture.
pub fn full_frame_quad() -> Vec<QuadVertex> {
    quad_triangles(
        [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]],
        [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
    )
}

/// Capabilities a rendering backend offers to the morph engine.
///
/// Surfaces are pooled render targets. Each one is backed by a texture which can be
/// sampled by later passes once drawing into it is done.
pub trait RenderBackend {
    /// Upload raw pixels into a new texture, or replace the content of `existing`.
    fn upload_texture(
        &mut self,
        pixels: &PixelBuffer,
        existing: Option<TextureId>,
    ) -> Result<TextureId, RenderError>;

    /// Create a texture from an RGBA image in `[0, 1]`.
    fn create_texture(&mut self, image: Image<f32, 4>) -> Result<TextureId, RenderError>;

    /// Copy the content of a texture, surface storage included, into a new plain
    /// texture that does not belong to any surface.
    fn copy_texture(&mut self, texture: TextureId) -> Result<TextureId, RenderError>;

    /// Free a texture created with [`RenderBackend::upload_texture`],
    /// [`RenderBackend::create_texture`] or [`RenderBackend::copy_texture`].
    fn delete_texture(&mut self, texture: TextureId) -> Result<(), RenderError>;

    /// Size of a texture.
    fn texture_size(&self, texture: TextureId) -> Result<ImageSize, RenderError>;

    /// Take a surface of the given size from the pool, with a reference count of one.
    fn acquire_surface(&mut self, size: ImageSize) -> Result<SurfaceId, RenderError>;

    /// Add a reference to an acquired surface.
    fn retain_surface(&mut self, surface: SurfaceId) -> Result<(), RenderError>;

    /// Drop a reference; surfaces without references go back to the pool.
    fn release_surface(&mut self, surface: SurfaceId) -> Result<(), RenderError>;

    /// The texture backing a surface.
    fn surface_texture(&self, surface: SurfaceId) -> Result<TextureId, RenderError>;

    /// Fill a surface with a color.
    fn clear(&mut self, target: SurfaceId, color: [f32; 4]) -> Result<(), RenderError>;

    /// Rasterize a pass into a surface.
    fn draw(&mut self, target: SurfaceId, pass: &RenderPass) -> Result<(), RenderError>;

    /// Download a texture as 8-bit RGBA, top row first.
    fn read_pixels(&self, texture: TextureId) -> Result<Image<u8, 4>, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_split() {
        let quad = full_frame_quad();
        assert_eq!(quad.len(), 6);
        assert_eq!(quad[0].position, [-1.0, -1.0]);
        assert_eq!(quad[4].uv, [1.0, 1.0]);
    }

    #[test]
    fn cross_dissolve_samples_both_alike() {
        let pass = RenderPass::cross_dissolve(TextureId::new(1), TextureId::new(2), 0.25);
        assert_eq!(pass.vertex_count(), 6);
        assert_eq!(pass.textures(), vec![TextureId::new(1), TextureId::new(2)]);
        let RenderPass::Blend { vertices, t, .. } = pass else {
            panic!("expected a blend pass");
        };
        assert_eq!(t, 0.25);
        assert!(vertices.iter().all(|v| v.src_uv == v.dst_uv));
    }
}
