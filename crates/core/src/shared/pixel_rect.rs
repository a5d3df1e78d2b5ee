/// An axis-aligned rectangle in pixel coordinates, as emitted by a
/// candidate detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    /// Intersection with `[0, width) x [0, height)`.
    ///
    /// The result has zero width or height when the rectangle lies fully
    /// outside. Edges are computed in `i64`, so any input is accepted.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let x1 = (self.x as i64).clamp(0, width as i64);
        let y1 = (self.y as i64).clamp(0, height as i64);
        let x2 = (self.x as i64 + self.width as i64).min(width as i64);
        let y2 = (self.y as i64 + self.height as i64).min(height as i64);
        Self {
            x: x1 as i32,
            y: y1 as i32,
            width: (x2 - x1).max(0) as i32,
            height: (y2 - y1).max(0) as i32,
        }
    }

    /// Euclidean distance between this rectangle's center and `point`.
    pub fn center_distance(&self, point: (f64, f64)) -> f64 {
        let (cx, cy) = self.center();
        (cx - point.0).hypot(cy - point.1)
    }
}
