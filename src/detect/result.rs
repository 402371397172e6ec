use serde::Serialize;

/// One detected object.
///
/// Box coordinates are normalized to the frame (0..1), top-left origin.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    /// A detection covering the whole frame.
    pub fn full_frame(confidence: f32, class_id: usize) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
            confidence,
            class_id,
        }
    }

    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn intersection_area(&self, other: &Detection) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.w).min(other.x + other.w);
        let y2 = (self.y + self.h).min(other.y + other.h);

        if x2 > x1 && y2 > y1 {
            (x2 - x1) * (y2 - y1)
        } else {
            0.0
        }
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Everything the detector reported for one frame. No identity is carried
/// between frames.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DetectionSet {
    pub detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Full-frame detections with the given confidences, class 0.
    pub fn from_confidences(confidences: &[f32]) -> Self {
        Self::new(
            confidences
                .iter()
                .map(|&c| Detection::full_frame(c, 0))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn confidences(&self) -> impl Iterator<Item = f32> + '_ {
        self.detections.iter().map(|d| d.confidence)
    }

    /// Highest confidence, `None` when the set is empty.
    ///
    /// NaN scores are skipped by `f32::max` unless every score is NaN.
    pub fn max_confidence(&self) -> Option<f32> {
        self.confidences()
            .fold(None, |acc: Option<f32>, c| Some(acc.map_or(c, |m| m.max(c))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_has_no_maximum() {
        let set = DetectionSet::default();
        assert!(set.is_empty());
        assert_eq!(set.max_confidence(), None);
    }

    #[test]
    fn maximum_over_all_detections() {
        let set = DetectionSet::from_confidences(&[0.31, 0.87, 0.42]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.max_confidence(), Some(0.87));
    }

    #[test]
    fn nan_scores_are_skipped_when_others_exist() {
        let set = DetectionSet::from_confidences(&[f32::NAN, 0.5]);
        assert_eq!(set.max_confidence(), Some(0.5));

        let all_nan = DetectionSet::from_confidences(&[f32::NAN]);
        assert!(all_nan.max_confidence().unwrap().is_nan());
    }

    #[test]
    fn iou_of_overlapping_boxes() {
        let a = Detection {
            x: 0.0,
            y: 0.0,
            w: 0.5,
            h: 0.5,
            confidence: 0.9,
            class_id: 0,
        };
        let b = Detection {
            x: 0.25,
            y: 0.0,
            ..a.clone()
        };
        let iou = a.iou(&b);
        assert!((iou - 1.0 / 3.0).abs() < 1e-6, "iou was {iou}");

        let far = Detection {
            x: 0.75,
            y: 0.75,
            w: 0.1,
            h: 0.1,
            ..a.clone()
        };
        assert_eq!(a.iou(&far), 0.0);
    }
}
