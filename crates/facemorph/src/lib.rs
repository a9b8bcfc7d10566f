#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use facemorph_image as image;

#[doc(inline)]
pub use facemorph_geometry as geometry;

#[doc(inline)]
pub use facemorph_render as render;

#[doc(inline)]
pub use facemorph_engine as engine;

#[doc(inline)]
pub use facemorph_io as io;
