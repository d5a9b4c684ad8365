use serde::{Deserialize, Serialize};

/// Axis-aligned box in image pixel coordinates.
///
/// Persisted as the four-element array `[x1, y1, x2, y2]`. Construction always
/// orders the corners so that `x1 <= x2` and `y1 <= y2`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BvrBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl From<[f32; 4]> for BvrBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<BvrBox> for [f32; 4] {
    fn from(b: BvrBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl BvrBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    /// Builds a box from `(cx, cy, w, h)`.
    ///
    /// # Arguments
    ///
    /// * `cx` - The x-coordinate of the horizontal center.
    /// * `cy` - The y-coordinate of the vertical center.
    /// * `w` - The width of the bounding box.
    /// * `h` - The height of the bounding box.
    pub fn from_cxcy_wh(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    /// Returns the width of the bounding box.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Returns the height of the bounding box.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Computes the area of the bounding box.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Returns the bounding box coordinates as `(x1, y1, x2, y2)`.
    pub fn xy1_xy2(&self) -> (f32, f32, f32, f32) {
        (self.x1, self.y1, self.x2, self.y2)
    }

    /// Restricts the box to `[0, width] x [0, height]`.
    pub fn clamp_to(self, width: f32, height: f32) -> Self {
        Self::new(
            self.x1.clamp(0., width),
            self.y1.clamp(0., height),
            self.x2.clamp(0., width),
            self.y2.clamp(0., height),
        )
    }

    /// True when every corner coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2].iter().all(|v| v.is_finite())
    }

    pub fn as_xy_wh_i32(&self) -> (i32, i32, i32, i32) {
        (self.x1.round() as i32,
         self.y1.round() as i32,
         self.width().round() as i32,
         self.height().round() as i32)
    }
}
