use facemorph_image::Image;

/// Sample an RGBA texture with bilinear filtering and clamp-to-edge addressing.
///
/// # Arguments
///
/// * `image` - The texture, stored top row first.
/// * `uv` - The texture coordinate, origin at the bottom-left corner.
///
/// # Returns
///
/// The interpolated pixel, or transparent black for an empty texture.
pub(crate) fn sample_bilinear(image: &Image<f32, 4>, uv: [f32; 2]) -> [f32; 4] {
    let (rows, cols) = (image.rows(), image.cols());
    if rows == 0 || cols == 0 {
        return [0.0; 4];
    }

    // texel centers sit at half-integer coordinates
    let u = (uv[0] * cols as f32 - 0.5).clamp(0.0, (cols - 1) as f32);
    let v = ((1.0 - uv[1]) * rows as f32 - 0.5).clamp(0.0, (rows - 1) as f32);

    let iu0 = (u.trunc() as usize).min(cols - 1);
    let iv0 = (v.trunc() as usize).min(rows - 1);
    let iu1 = if iu0 + 1 < cols { iu0 + 1 } else { iu0 };
    let iv1 = if iv0 + 1 < rows { iv0 + 1 } else { iv0 };

    let frac_u = u.fract();
    let frac_v = v.fract();
    let frac_uu = 1.0 - frac_u;
    let frac_vv = 1.0 - frac_v;

    let w00 = frac_uu * frac_vv;
    let w01 = frac_u * frac_vv;
    let w10 = frac_uu * frac_v;
    let w11 = frac_u * frac_v;

    let data = image.as_slice();
    let texel = |x: usize, y: usize| {
        let base = (y * cols + x) * 4;
        &data[base..base + 4]
    };
    let (p00, p01) = (texel(iu0, iv0), texel(iu1, iv0));
    let (p10, p11) = (texel(iu0, iv1), texel(iu1, iv1));

    let mut pixel = [0.0; 4];
    for k in 0..4 {
        pixel[k] = p00[k] * w00 + p01[k] * w01 + p10[k] * w10 + p11[k] * w11;
    }
    pixel
}
