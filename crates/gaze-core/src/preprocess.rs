//! Image region → NCHW model input.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("invalid region: {width}x{height} image cannot be resized")]
    InvalidRegion { width: u32, height: u32 },
}

/// Plane order written into the channel dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    Rgb,
    /// The bundled models were trained on BGR planes.
    #[default]
    Bgr,
}

/// Resize `region` to exactly `target_w × target_h` (bilinear, aspect ratio
/// not preserved) and lay it out as `[1, 3, target_h, target_w]`.
///
/// Pixel values stay in `0.0..=255.0`; the models normalize internally.
pub fn preprocess(
    region: &RgbImage,
    target_h: usize,
    target_w: usize,
    order: ChannelOrder,
) -> Result<Array4<f32>, PreprocessError> {
    if region.width() == 0 || region.height() == 0 {
        return Err(PreprocessError::InvalidRegion {
            width: region.width(),
            height: region.height(),
        });
    }
    debug_assert!(target_h > 0 && target_w > 0, "model input size must be non-zero");

    let resized;
    let source = if region.width() as usize == target_w && region.height() as usize == target_h {
        region
    } else {
        resized = imageops::resize(region, target_w as u32, target_h as u32, FilterType::Triangle);
        &resized
    };

    let planes = match order {
        ChannelOrder::Rgb => [0usize, 1, 2],
        ChannelOrder::Bgr => [2usize, 1, 0],
    };

    let mut tensor = Array4::<f32>::zeros((1, 3, target_h, target_w));
    for (x, y, pixel) in source.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (plane, &channel) in planes.iter().enumerate() {
            tensor[[0, plane, y, x]] = pixel.0[channel] as f32;
        }
    }

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_output_shape() {
        let img = RgbImage::from_pixel(37, 23, Rgb([10, 20, 30]));
        let tensor = preprocess(&img, 60, 62, ChannelOrder::Bgr).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 60, 62]);
    }

    #[test]
    fn test_bgr_planes() {
        let img = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let tensor = preprocess(&img, 4, 4, ChannelOrder::Bgr).unwrap();
        assert_eq!(tensor[[0, 0, 0, 0]], 30.0);
        assert_eq!(tensor[[0, 1, 2, 3]], 20.0);
        assert_eq!(tensor[[0, 2, 3, 3]], 10.0);
    }

    #[test]
    fn test_rgb_planes() {
        let img = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let tensor = preprocess(&img, 4, 4, ChannelOrder::Rgb).unwrap();
        assert_eq!(tensor[[0, 0, 1, 1]], 10.0);
        assert_eq!(tensor[[0, 2, 1, 1]], 30.0);
    }

    #[test]
    fn test_uniform_resize_stays_uniform() {
        let img = RgbImage::from_pixel(100, 50, Rgb([128, 128, 128]));
        let tensor = preprocess(&img, 60, 60, ChannelOrder::Bgr).unwrap();
        assert!(tensor.iter().all(|&v| v == 128.0));
    }

    #[test]
    fn test_layout_is_planar() {
        // Left column red, right column blue; width is preserved so no blending.
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        let tensor = preprocess(&img, 1, 2, ChannelOrder::Rgb).unwrap();
        assert_eq!(tensor[[0, 0, 0, 0]], 255.0);
        assert_eq!(tensor[[0, 0, 0, 1]], 0.0);
        assert_eq!(tensor[[0, 2, 0, 0]], 0.0);
        assert_eq!(tensor[[0, 2, 0, 1]], 255.0);
    }

    #[test]
    fn test_empty_region_rejected() {
        let img = RgbImage::new(0, 12);
        assert_eq!(
            preprocess(&img, 60, 60, ChannelOrder::Bgr).unwrap_err(),
            PreprocessError::InvalidRegion { width: 0, height: 12 }
        );
    }
}
