use crate::error::ImageError;
use crate::image::{Image, ImageDtype, ImageSize};

/// Memory layout of an 8-bit pixel buffer handed over by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// single channel luminance
    Gray8,
    /// red, green, blue
    Rgb8,
    /// blue, green, red (OpenCV order)
    Bgr8,
    /// red, green, blue, alpha
    Rgba8,
    /// blue, green, red, alpha
    Bgra8,
}

impl PixelFormat {
    /// Number of bytes per pixel.
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }

    /// Reorder one pixel into RGBA bytes.
    fn to_rgba(self, px: &[u8]) -> [u8; 4] {
        match self {
            PixelFormat::Gray8 => [px[0], px[0], px[0], 255],
            PixelFormat::Rgb8 => [px[0], px[1], px[2], 255],
            PixelFormat::Bgr8 => [px[2], px[1], px[0], 255],
            PixelFormat::Rgba8 => [px[0], px[1], px[2], px[3]],
            PixelFormat::Bgra8 => [px[2], px[1], px[0], px[3]],
        }
    }
}

/// A raw 8-bit pixel buffer together with its size and layout.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    size: ImageSize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw bytes, checking that the length matches `size` and `format`.
    ///
    /// # Examples
    ///
    /// ```
    /// use facemorph_image::{PixelBuffer, PixelFormat};
    ///
    /// let pixels = PixelBuffer::new([2, 1].into(), PixelFormat::Bgr8, vec![0u8; 6]).unwrap();
    /// assert_eq!(pixels.size().width, 2);
    /// ```
    pub fn new(size: ImageSize, format: PixelFormat, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = size.area() * format.channels();
        if data.len() != expected {
            return Err(ImageError::InvalidChannelShape(data.len(), expected));
        }
        Ok(Self { size, format, data })
    }

    /// Size of the buffer in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Layout of the buffer.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

macro_rules! impl_from_image {
    ($channels:literal, $format:expr) => {
        impl From<Image<u8, $channels>> for PixelBuffer {
            fn from(image: Image<u8, $channels>) -> Self {
                Self {
                    size: image.size(),
                    format: $format,
                    data: image.into_vec(),
                }
            }
        }
    };
}

impl_from_image!(1, PixelFormat::Gray8);
impl_from_image!(3, PixelFormat::Rgb8);
impl_from_image!(4, PixelFormat::Rgba8);

/// Convert a raw pixel buffer into a normalized RGBA float image in `[0, 1]`.
///
/// # Examples
///
/// ```
/// use facemorph_image::{rgba_from_pixels, PixelBuffer, PixelFormat};
///
/// let pixels = PixelBuffer::new([1, 1].into(), PixelFormat::Bgr8, vec![0, 0, 255]).unwrap();
/// let rgba = rgba_from_pixels(&pixels).unwrap();
/// assert_eq!(rgba.as_slice(), &[1.0, 0.0, 0.0, 1.0]);
/// ```
pub fn rgba_from_pixels(pixels: &PixelBuffer) -> Result<Image<f32, 4>, ImageError> {
    let data = pixels
        .data
        .chunks_exact(pixels.format.channels())
        .flat_map(|px| pixels.format.to_rgba(px).map(|v| v as f32 / 255.0))
        .collect();

    Image::new(pixels.size, data)
}

/// Quantize a normalized RGBA float image back to 8 bits per channel.
pub fn rgba8_from_rgba_f32(image: &Image<f32, 4>) -> Result<Image<u8, 4>, ImageError> {
    let data = image
        .as_slice()
        .iter()
        .map(|&v| u8::from_f32(v * 255.0))
        .collect();

    Image::new(image.size(), data)
}
