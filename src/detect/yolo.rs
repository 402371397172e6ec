//! YOLO output decoding.
//!
//! Ultralytics-exported detection heads produce one tensor of shape
//! `[1, 4 + classes, anchors]` (or the transposed `[1, anchors, 4 + classes]`)
//! holding `cx, cy, w, h` in model-input pixels followed by per-class scores.
//! Decoding maps boxes back through the letterbox into normalized frame
//! coordinates, drops low scores and applies per-class non-maximum
//! suppression.

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::detect::result::Detection;

/// Letterbox fill value used by Ultralytics preprocessing.
pub const PAD_VALUE: u8 = 114;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct YoloParams {
    /// Square model input size in pixels.
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

/// Placement of a frame inside the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    /// Fit `width` x `height` into a `size` square, preserving aspect ratio
    /// and centering with padding.
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width.max(1) as f32).min(size as f32 / height.max(1) as f32);
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, size);
        Self {
            scale,
            scaled_width,
            scaled_height,
            pad_x: (size - scaled_width) / 2,
            pad_y: (size - scaled_height) / 2,
        }
    }
}

/// Decode a raw output tensor into detections on the original frame.
pub fn decode(
    output: &[f32],
    shape: &[usize],
    letterbox: &Letterbox,
    frame_width: u32,
    frame_height: u32,
    params: &YoloParams,
) -> Result<Vec<Detection>> {
    let (rows, anchors, channels_first) = match shape {
        [1, a, b] | [a, b] => {
            // Real heads have far more anchors than rows; tiny heads stay channels-first.
            if a <= b || *b < 5 {
                (*a, *b, true)
            } else {
                (*b, *a, false)
            }
        }
        _ => return Err(anyhow!("unsupported YOLO output shape {:?}", shape)),
    };
    if rows < 5 {
        return Err(anyhow!(
            "YOLO output needs at least 5 rows (box + one class), got {}",
            rows
        ));
    }
    if output.len() != rows * anchors {
        return Err(anyhow!(
            "YOLO output has {} values, shape {:?} implies {}",
            output.len(),
            shape,
            rows * anchors
        ));
    }

    let at = |row: usize, anchor: usize| {
        if channels_first {
            output[row * anchors + anchor]
        } else {
            output[anchor * rows + row]
        }
    };

    let frame_w = frame_width.max(1) as f32;
    let frame_h = frame_height.max(1) as f32;
    let mut candidates = Vec::new();

    for anchor in 0..anchors {
        let (class_id, score) = (4..rows)
            .map(|row| (row - 4, at(row, anchor)))
            .fold((0, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if score.is_nan() || score < params.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        let x1 = ((cx - w / 2.0 - letterbox.pad_x as f32) / letterbox.scale).clamp(0.0, frame_w);
        let y1 = ((cy - h / 2.0 - letterbox.pad_y as f32) / letterbox.scale).clamp(0.0, frame_h);
        let x2 = ((cx + w / 2.0 - letterbox.pad_x as f32) / letterbox.scale).clamp(0.0, frame_w);
        let y2 = ((cy + h / 2.0 - letterbox.pad_y as f32) / letterbox.scale).clamp(0.0, frame_h);

        candidates.push(Detection {
            x: x1 / frame_w,
            y: y1 / frame_h,
            w: (x2 - x1) / frame_w,
            h: (y2 - y1) / frame_h,
            confidence: score,
            class_id,
        });
    }

    Ok(non_max_suppression(
        candidates,
        params.iou_threshold,
        params.max_detections,
    ))
}

/// Greedy per-class NMS, highest confidence first.
pub fn non_max_suppression(
    mut candidates: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two classes, three anchors, channels-first.
    fn sample_output() -> Vec<f32> {
        vec![
            100.0, 102.0, 400.0, // cx
            100.0, 101.0, 400.0, // cy
            50.0, 50.0, 40.0, // w
            50.0, 50.0, 40.0, // h
            0.9, 0.8, 0.1, // class 0
            0.1, 0.0, 0.2, // class 1
        ]
    }

    #[test]
    fn letterbox_pads_short_side() {
        let lb = Letterbox::fit(640, 380, 640);
        assert_eq!(lb.scale, 1.0);
        assert_eq!((lb.scaled_width, lb.scaled_height), (640, 380));
        assert_eq!((lb.pad_x, lb.pad_y), (0, 130));

        let lb = Letterbox::fit(1280, 720, 640);
        assert_eq!(lb.scale, 0.5);
        assert_eq!((lb.scaled_width, lb.scaled_height), (640, 360));
        assert_eq!(lb.pad_y, 140);
    }

    #[test]
    fn decodes_thresholds_and_suppresses_overlaps() {
        let lb = Letterbox::fit(640, 640, 640);
        let detections = decode(
            &sample_output(),
            &[1, 6, 3],
            &lb,
            640,
            640,
            &YoloParams::default(),
        )
        .unwrap();

        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_eq!(d.class_id, 0);
        assert_eq!(d.confidence, 0.9);
        assert!((d.x - 75.0 / 640.0).abs() < 1e-6);
        assert!((d.w - 50.0 / 640.0).abs() < 1e-6);
    }

    #[test]
    fn boxes_map_back_through_padding() {
        let lb = Letterbox::fit(640, 380, 640);
        // Centered box in model space: cy = pad_y + 190.
        let output = vec![320.0, 320.0, 64.0, 38.0, 0.6];
        let detections =
            decode(&output, &[1, 5, 1], &lb, 640, 380, &YoloParams::default()).unwrap();
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert!((d.y + d.h / 2.0 - 0.5).abs() < 1e-5);
        assert!((d.h - 0.1).abs() < 1e-5);
    }

    #[test]
    fn different_classes_are_not_suppressed() {
        let a = Detection {
            x: 0.1,
            y: 0.1,
            w: 0.2,
            h: 0.2,
            confidence: 0.9,
            class_id: 0,
        };
        let b = Detection {
            confidence: 0.8,
            class_id: 1,
            ..a.clone()
        };
        let c = Detection {
            confidence: 0.7,
            ..a.clone()
        };
        let kept = non_max_suppression(vec![c, b, a], 0.7, 300);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].class_id, 1);
    }

    #[test]
    fn rejects_malformed_output() {
        let lb = Letterbox::fit(640, 640, 640);
        let params = YoloParams::default();
        assert!(decode(&[0.0; 8], &[1, 4, 2], &lb, 640, 640, &params).is_err());
        assert!(decode(&[0.0; 9], &[1, 6, 2], &lb, 640, 640, &params).is_err());
        assert!(decode(&[0.0; 4], &[2, 2, 1, 1], &lb, 640, 640, &params).is_err());
    }
}
