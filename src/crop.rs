use image::{DynamicImage, GenericImage, GenericImageView};

use crate::error::{Result, RoadviewError};

/// Crop an equirectangular panorama to a perspective view.
///
/// The panorama maps longitude linearly to x (heading 0 at x = 0, wrapping at
/// the right edge) and latitude linearly to y (horizon at h/2). The crop is a
/// square window of `round(fov/360 * w)` pixels per side, a linear
/// approximation of a rectilinear projection that is kept deliberately: the
/// framing is what downstream consumers of these images were built against.
///
/// When the window spans the panorama's horizontal seam it is assembled from
/// two sub-crops composed side by side, so the output is always `crop_w` wide.
/// Near the poles the window is clamped vertically and the output is shorter
/// than `crop_w`.
pub fn crop_view(
    pano: &DynamicImage,
    heading: u16,
    pitch: i16,
    fov: u16,
) -> Result<DynamicImage> {
    if !(1..=360).contains(&fov) {
        return Err(RoadviewError::InvalidView(format!(
            "fov must be in 1..=360, got {fov}"
        )));
    }
    if !(-90..=90).contains(&pitch) {
        return Err(RoadviewError::InvalidView(format!(
            "pitch must be in -90..=90, got {pitch}"
        )));
    }

    let (w, h) = pano.dimensions();
    let w_i = i64::from(w);
    let h_i = i64::from(h);

    let center_x =
        ((f64::from(heading) / 360.0 * f64::from(w)).round() as i64).rem_euclid(w_i);
    let center_y = (f64::from(h) / 2.0 - f64::from(pitch) / 180.0 * f64::from(h)).round() as i64;

    let crop_w = (f64::from(fov) / 360.0 * f64::from(w)).round() as i64;
    let crop_h = crop_w;
    if crop_w == 0 {
        return Err(RoadviewError::InvalidView(format!(
            "fov {fov} on a {w}px panorama produces an empty crop"
        )));
    }

    let left = center_x - crop_w / 2;
    let right = left + crop_w;
    let top = (center_y - crop_h / 2).clamp(0, h_i);
    let bottom = (center_y + crop_h / 2).clamp(0, h_i);
    let out_h = (bottom - top) as u32;

    if left >= 0 && right <= w_i {
        return Ok(pano.crop_imm(left as u32, top as u32, crop_w as u32, out_h));
    }

    // The window spans the seam at x = 0: assemble it from the right edge of
    // the panorama followed by the left edge.
    let (first_x, first_w, second_w) = if left < 0 {
        ((w_i + left) as u32, (-left) as u32, right as u32)
    } else {
        (left as u32, (w_i - left) as u32, (right - w_i) as u32)
    };

    let first = pano.crop_imm(first_x, top as u32, first_w, out_h);
    let second = pano.crop_imm(0, top as u32, second_w, out_h);

    let mut view = DynamicImage::new_rgb8(crop_w as u32, out_h);
    view.copy_from(&first, 0, 0)?;
    view.copy_from(&second, first_w, 0)?;
    Ok(view)
}
