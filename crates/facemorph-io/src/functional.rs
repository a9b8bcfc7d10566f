use std::path::Path;

use facemorph_image::{Image, ImageSize, PixelBuffer, PixelFormat};

use crate::error::IoError;

/// Reads an image from disk into a pixel buffer.
///
/// Grayscale, RGB and RGBA images with 8 bits per channel are kept in their layout.
/// Anything else is converted to RGBA8.
///
/// # Arguments
///
/// * `file_path` - The path to the image file. The format is guessed from the content.
///
/// # Returns
///
/// The decoded pixels, rows top to bottom.
pub fn read_image(file_path: impl AsRef<Path>) -> Result<PixelBuffer, IoError> {
    let file_path = file_path.as_ref();

    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let img = image::ImageReader::open(file_path)?
        .with_guessed_format()?
        .decode()?;

    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    let (format, data) = match img.color() {
        image::ColorType::L8 => (PixelFormat::Gray8, img.into_luma8().into_raw()),
        image::ColorType::Rgb8 => (PixelFormat::Rgb8, img.into_rgb8().into_raw()),
        image::ColorType::Rgba8 => (PixelFormat::Rgba8, img.into_rgba8().into_raw()),
        other => {
            log::debug!("converting {:?} from {} to rgba8", other, file_path.display());
            (PixelFormat::Rgba8, img.into_rgba8().into_raw())
        }
    };

    let pixels = PixelBuffer::new(size, format, data)?;

    Ok(pixels)
}

/// Writes an RGBA8 image to a PNG file.
///
/// # Arguments
///
/// * `file_path` - The destination, which must end in `.png`.
/// * `image` - The image to encode.
pub fn write_image_png(file_path: impl AsRef<Path>, image: &Image<u8, 4>) -> Result<(), IoError> {
    let file_path = file_path.as_ref();

    let is_png = file_path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if !is_png {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }

    image::save_buffer_with_format(
        file_path,
        image.as_slice(),
        image.width() as u32,
        image.height() as u32,
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> Result<Image<u8, 4>, IoError> {
        let mut data = Vec::with_capacity(4 * 3 * 4);
        for y in 0..3 {
            for x in 0..4 {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend([v, x as u8 * 10, y as u8 * 20, 255]);
            }
        }
        Ok(Image::new([4, 3].into(), data)?)
    }

    #[test]
    fn read_write_png() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("frame.png");

        let image = checker()?;
        write_image_png(&file_path, &image)?;
        assert!(file_path.exists(), "File does not exist: {:?}", file_path);

        let pixels = read_image(&file_path)?;
        assert_eq!(pixels.size(), [4, 3].into());
        assert_eq!(pixels.format(), PixelFormat::Rgba8);
        assert_eq!(pixels.as_slice(), image.as_slice());
        Ok(())
    }

    #[test]
    fn read_rgb_png() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("rgb.png");
        image::save_buffer(
            &file_path,
            &[1, 2, 3, 4, 5, 6],
            2,
            1,
            image::ExtendedColorType::Rgb8,
        )?;

        let pixels = read_image(&file_path)?;
        assert_eq!(pixels.format(), PixelFormat::Rgb8);
        assert_eq!(pixels.as_slice(), &[1, 2, 3, 4, 5, 6]);
        Ok(())
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_image("/does/not/exist.png"),
            Err(IoError::FileDoesNotExist(_))
        ));
    }

    #[test]
    fn png_extension_required() -> Result<(), IoError> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("frame.jpg");
        assert!(matches!(
            write_image_png(&file_path, &checker()?),
            Err(IoError::InvalidFileExtension(_))
        ));
        assert!(!file_path.exists());
        Ok(())
    }
}
