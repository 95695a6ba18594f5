use serde::Serialize;

/// Axis-aligned box in original image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// Build from a top-left corner and size.
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x.saturating_add(width),
            y2: y.saturating_add(height),
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.x1 as f32 + self.width as f32 / 2.0) as i32,
            y: (self.y1 as f32 + self.height as f32 / 2.0) as i32,
        }
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn intersection_area(&self, other: &Self) -> i64 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 <= x1 || y2 <= y1 {
            return 0;
        }

        (x2 as i64 - x1 as i64) * (y2 as i64 - y1 as i64)
    }

    /// Intersection over union. Two zero-area boxes fully overlap.
    pub fn iou(&self, other: &Self) -> f32 {
        if self.area() == 0 && other.area() == 0 {
            return 1.0;
        }
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0 {
            return 0.0;
        }
        intersection as f32 / union as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_name: String,
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub center: Point,
}

/// Round to three decimals for transport.
pub(crate) fn round_confidence(confidence: f32) -> f32 {
    (confidence * 1000.0).round() / 1000.0
}
