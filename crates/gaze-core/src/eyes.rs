//! Eye-region extraction from a face crop.

use crate::geometry::{FaceSpace, NormalizedPoint, PixelPoint};
use image::{imageops, RgbImage};

/// Eye window side as a fraction of the face crop width.
pub const EYE_WINDOW_FACE_FRACTION: f32 = 0.4;
pub const DEFAULT_EYE_SCALE: f32 = 2.5;

/// An eye crop and the eye center it was cut around.
#[derive(Debug, Clone)]
pub struct EyeCrop {
    /// Empty (0×0) when the clipped window had no area.
    pub image: RgbImage,
    pub center: PixelPoint<FaceSpace>,
}

impl EyeCrop {
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

/// Cut a square window around `center` out of `face`.
///
/// The window side is always `int(0.4 * face_width)`; `scale` is accepted
/// for interface compatibility but does not affect the window size.
pub fn crop_eye(face: &RgbImage, center: NormalizedPoint<FaceSpace>, scale: f32) -> EyeCrop {
    let center = center.to_pixels(face.width(), face.height());
    tracing::trace!(scale, x = center.x, y = center.y, "eye crop");

    let image = match eye_window(face.width(), face.height(), center) {
        Some((x, y, w, h)) => imageops::crop_imm(face, x, y, w, h).to_image(),
        None => RgbImage::new(0, 0),
    };
    EyeCrop { image, center }
}

/// Clipped `(x, y, width, height)` of the eye window, `None` if it is empty.
fn eye_window(face_width: u32, face_height: u32, center: PixelPoint<FaceSpace>) -> Option<(u32, u32, u32, u32)> {
    let side = (face_width as f32 * EYE_WINDOW_FACE_FRACTION) as i32;
    let half = side / 2;

    let x1 = center.x.saturating_sub(half).max(0);
    let y1 = center.y.saturating_sub(half).max(0);
    let x2 = center.x.saturating_add(half).min(face_width as i32);
    let y2 = center.y.saturating_add(half).min(face_height as i32);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn px(x: i32, y: i32) -> PixelPoint<FaceSpace> {
        PixelPoint::new(x, y)
    }

    #[test]
    fn test_window_side_from_face_width() {
        // int(0.4 * 80) = 32, centered.
        assert_eq!(eye_window(80, 80, px(40, 40)), Some((24, 24, 32, 32)));
    }

    #[test]
    fn test_window_clipped_at_edges() {
        assert_eq!(eye_window(80, 80, px(5, 78)), Some((0, 62, 21, 18)));
    }

    #[test]
    fn test_window_outside_face_is_empty() {
        assert_eq!(eye_window(80, 80, px(-20, 40)), None);
        assert_eq!(eye_window(80, 80, px(40, 200)), None);
    }

    #[test]
    fn test_tiny_face_is_degenerate() {
        // int(0.4 * 2) = 0 → zero-size window.
        assert_eq!(eye_window(2, 2, px(1, 1)), None);
    }

    #[test]
    fn test_scale_does_not_change_window() {
        let face = RgbImage::from_pixel(80, 60, Rgb([5, 5, 5]));
        let center = NormalizedPoint::new(0.5, 0.5);
        let a = crop_eye(&face, center, DEFAULT_EYE_SCALE);
        let b = crop_eye(&face, center, 10.0);
        assert_eq!(a.image.dimensions(), b.image.dimensions());
        assert_eq!(a.image.dimensions(), (32, 32));
    }

    #[test]
    fn test_crop_copies_face_pixels() {
        let mut face = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        face.put_pixel(25, 25, Rgb([255, 1, 2]));
        let crop = crop_eye(&face, NormalizedPoint::new(0.5, 0.5), DEFAULT_EYE_SCALE);
        // side 20, half 10 → window starts at (15, 15).
        assert_eq!(crop.center, px(25, 25));
        assert_eq!(crop.image.get_pixel(10, 10), &Rgb([255, 1, 2]));
    }

    #[test]
    fn test_huge_center_is_empty_not_overflow() {
        let face = RgbImage::from_pixel(80, 80, Rgb([0, 0, 0]));
        let crop = crop_eye(&face, NormalizedPoint::new(1.0e12, 0.5), DEFAULT_EYE_SCALE);
        assert!(crop.is_empty());
        assert_eq!(crop.center.x, i32::MAX);
        assert!(crop_eye(&face, NormalizedPoint::new(-1.0e12, 0.5), DEFAULT_EYE_SCALE).is_empty());
        assert_eq!(eye_window(80, 80, px(i32::MIN, i32::MAX)), None);
    }

    #[test]
    fn test_empty_crop_keeps_center() {
        let face = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        let crop = crop_eye(&face, NormalizedPoint::new(1.5, 0.5), DEFAULT_EYE_SCALE);
        assert!(crop.is_empty());
        assert_eq!(crop.center, px(75, 25));
    }
}
