//! Axis-aligned box geometry shared across pipeline stages.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in image pixel coordinates.
///
/// Produced by the upstream object detector; `x` grows rightward and `y`
/// grows downward, so the visually topmost box has the smallest `y_min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn center_x(&self) -> f32 {
        0.5 * (self.x_min + self.x_max)
    }

    pub fn center_y(&self) -> f32 {
        0.5 * (self.y_min + self.y_max)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Finite coordinates with strictly positive extent on both axes.
    pub fn is_valid(&self) -> bool {
        [self.x_min, self.y_min, self.x_max, self.y_max]
            .iter()
            .all(|v| v.is_finite())
            && self.x_max > self.x_min
            && self.y_max > self.y_min
    }

    /// Overlap area with `other`, 0.0 when disjoint.
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let w = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let h = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        w * h
    }

    /// Horizontal overlap length with `other`, 0.0 when disjoint in x.
    pub fn x_overlap(&self, other: &BoundingBox) -> f32 {
        (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0)
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union_hull(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

/// Bounding hull over a non-empty set of boxes.
pub fn hull(boxes: &[BoundingBox]) -> Option<BoundingBox> {
    let mut iter = boxes.iter();
    let first = *iter.next()?;
    Some(iter.fold(first, |acc, b| acc.union_hull(b)))
}

/// Total length of the union of the boxes' x-extents.
///
/// Intervals are merged before summing, so overlapping boxes are not
/// counted twice.
pub fn union_x_extent(boxes: &[BoundingBox]) -> f32 {
    if boxes.is_empty() {
        return 0.0;
    }

    let mut intervals: Vec<(f32, f32)> = boxes.iter().map(|b| (b.x_min, b.x_max)).collect();
    intervals.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let mut total = 0.0;
    let (mut cur_start, mut cur_end) = intervals[0];
    for &(s, e) in &intervals[1..] {
        if s > cur_end {
            total += cur_end - cur_start;
            cur_start = s;
            cur_end = e;
        } else {
            cur_end = cur_end.max(e);
        }
    }
    total + (cur_end - cur_start)
}

/// Median of a sample; 0.0 for an empty slice.
pub(crate) fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        0.5 * (sorted[mid - 1] + sorted[mid])
    } else {
        sorted[mid]
    }
}

/// Mean of a sample; 0.0 for an empty slice.
pub(crate) fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Population standard deviation; 0.0 for fewer than two samples.
pub(crate) fn std_dev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32;
    var.sqrt()
}
