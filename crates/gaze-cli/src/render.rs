//! Rasterizes pipeline results onto frames.

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use gaze_core::overlay::{self, Segment};
use gaze_core::{FaceBox, FaceResult, FrameResult};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LANDMARK_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
const AXIS_COLORS: [Rgb<u8>; 3] = [Rgb([255, 0, 0]), Rgb([0, 255, 0]), Rgb([0, 0, 255])];
const GAZE_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const FPS_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const LANDMARK_RADIUS: i32 = 2;
/// Arrow head length as a fraction of the shaft.
const ARROW_TIP_FRACTION: f32 = 0.1;
const FONT_SIZE: f32 = 20.0;

pub struct Renderer {
    font: Option<FontArc>,
    font_scale: PxScale,
    arrow_length: f32,
    axis_length: f32,
}

impl Renderer {
    /// Without a font, boxes, landmarks, axes and arrows are still drawn.
    pub fn new(font_path: Option<&Path>, arrow_length: f32, axis_length: f32) -> Result<Self> {
        let font = match font_path {
            Some(path) => {
                let data = std::fs::read(path)
                    .with_context(|| format!("failed to read font {}", path.display()))?;
                Some(FontArc::try_from_vec(data).with_context(|| format!("invalid font {}", path.display()))?)
            }
            None => {
                tracing::debug!("no font configured, overlay labels disabled");
                None
            }
        };

        Ok(Self {
            font,
            font_scale: PxScale::from(FONT_SIZE),
            arrow_length,
            axis_length,
        })
    }

    pub fn draw(&self, image: &mut RgbImage, result: &FrameResult) {
        for face in &result.faces {
            self.draw_face(image, face);
        }
    }

    fn draw_face(&self, image: &mut RgbImage, face: &FaceResult) {
        draw_box(image, &face.face_box);

        let (width, height) = (image.width() as i32, image.height() as i32);
        for p in overlay::landmark_points(face) {
            // Circle rasterization offsets the center in i32; skip far-off points.
            if (0..width).contains(&p.x) && (0..height).contains(&p.y) {
                draw_filled_circle_mut(image, (p.x, p.y), LANDMARK_RADIUS, LANDMARK_COLOR);
            }
        }

        let axes = overlay::head_pose_axes(&face.face_box, face.head_pose, self.axis_length);
        for (axis, color) in [axes.x, axes.y, axes.z].into_iter().zip(AXIS_COLORS) {
            draw_segment(image, axis, color);
        }

        if let Some(arrows) = overlay::gaze_arrows(face, self.arrow_length) {
            for arrow in arrows {
                draw_arrow(image, arrow, GAZE_COLOR);
            }
        }

        if let Some(font) = &self.font {
            for (i, line) in overlay::label_lines(face).iter().enumerate() {
                let origin = overlay::label_origin(&face.face_box, i);
                // Label origins are baselines; imageproc positions text by its top edge.
                let top = origin.y - self.font_scale.y as i32;
                draw_text_mut(image, LABEL_COLOR, origin.x, top, self.font_scale, font, line);
            }
        }
    }

    /// Frames-per-second readout in the top-left corner.
    pub fn draw_fps(&self, image: &mut RgbImage, fps: f64) {
        if let Some(font) = &self.font {
            draw_text_mut(image, FPS_COLOR, 10, 10, self.font_scale, font, &format!("FPS: {fps:.1}"));
        }
    }
}

fn draw_box(image: &mut RgbImage, face_box: &FaceBox) {
    if face_box.is_empty() {
        return;
    }
    let rect = Rect::at(face_box.x_min, face_box.y_min).of_size(face_box.width(), face_box.height());
    draw_hollow_rect_mut(image, rect, BOX_COLOR);

    // Second, inset border for visibility.
    if face_box.width() > 2 && face_box.height() > 2 {
        let inner = Rect::at(face_box.x_min + 1, face_box.y_min + 1)
            .of_size(face_box.width() - 2, face_box.height() - 2);
        draw_hollow_rect_mut(image, inner, BOX_COLOR);
    }
}

fn draw_segment(image: &mut RgbImage, segment: Segment, color: Rgb<u8>) {
    draw_line_segment_mut(
        image,
        (segment.start.x as f32, segment.start.y as f32),
        (segment.end.x as f32, segment.end.y as f32),
        color,
    );
}

fn draw_arrow(image: &mut RgbImage, arrow: Segment, color: Rgb<u8>) {
    draw_segment(image, arrow, color);

    let (sx, sy) = (arrow.start.x as f32, arrow.start.y as f32);
    let (ex, ey) = (arrow.end.x as f32, arrow.end.y as f32);
    let (dx, dy) = (ex - sx, ey - sy);
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1.0 {
        return;
    }

    // Two barbs at ±45° from the reversed shaft direction.
    let tip = len * ARROW_TIP_FRACTION;
    let (ux, uy) = (-dx / len, -dy / len);
    let c = std::f32::consts::FRAC_1_SQRT_2;
    for (bx, by) in [(ux * c - uy * c, ux * c + uy * c), (ux * c + uy * c, -ux * c + uy * c)] {
        draw_line_segment_mut(image, (ex, ey), (ex + bx * tip, ey + by * tip), color);
    }
}
