use glam::Vec2;

/// An axis-aligned rectangle represented by its corner points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub const ZERO: Rect = Rect::new(Vec2::ZERO, Vec2::ZERO);

    pub const fn new(min: Vec2, max: Vec2) -> Rect {
        Rect { min, max }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Rect {
        Rect::new(pos, pos + size)
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn union(&self, other: Rect) -> Rect {
        Rect::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Grows the rectangle to enclose `point`.
    pub fn expand(&mut self, point: Vec2) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }
}

/// An arbitrary quadrilateral, usually a transformed [`Rect`].
///
/// Corners are ordered counter-clockwise starting from the top-left of the
/// source rectangle: `p1 = (x1, y1)`, `p2 = (x1, y2)`, `p3 = (x2, y2)`,
/// `p4 = (x2, y1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Quad {
    pub p1: Vec2,
    pub p2: Vec2,
    pub p3: Vec2,
    pub p4: Vec2,
}
