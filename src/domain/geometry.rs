/// Axis-aligned geometry in world pixels.
///
/// `Rect` is the bounding box of every actor, tile and pickup.
/// Overlap tests are strict: rectangles that only share an edge do not
/// overlap, so an actor resting on a tile is not "inside" it.

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn left(&self) -> f32 { self.x }
    pub fn right(&self) -> f32 { self.x + self.w }
    pub fn top(&self) -> f32 { self.y }
    pub fn bottom(&self) -> f32 { self.y + self.h }
    pub fn center_x(&self) -> f32 { self.x + self.w / 2.0 }
    pub fn center_y(&self) -> f32 { self.y + self.h / 2.0 }

    pub fn set_right(&mut self, right: f32) { self.x = right - self.w; }
    pub fn set_bottom(&mut self, bottom: f32) { self.y = bottom - self.h; }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Scale width and height around the bottom-center, keeping the feet planted.
    pub fn shrink_to(&mut self, factor: f32) {
        let cx = self.center_x();
        let bottom = self.bottom();
        self.w *= factor;
        self.h *= factor;
        self.x = cx - self.w / 2.0;
        self.y = bottom - self.h;
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
}

impl Circle {
    /// Closest-point test against a rectangle.
    pub fn overlaps_rect(&self, rect: &Rect) -> bool {
        if self.r <= 0.0 { return false; }
        let nx = self.cx.clamp(rect.left(), rect.right());
        let ny = self.cy.clamp(rect.top(), rect.bottom());
        let dx = self.cx - nx;
        let dy = self.cy - ny;
        dx * dx + dy * dy < self.r * self.r
    }
}

/// Attack geometry for one tick.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Hitbox {
    Rect(Rect),
    Circle(Circle),
}

impl Hitbox {
    pub fn overlaps(&self, target: &Rect) -> bool {
        match self {
            Hitbox::Rect(r) => r.w > 0.0 && r.h > 0.0 && r.overlaps(target),
            Hitbox::Circle(c) => c.overlaps_rect(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_do_not_overlap() {
        let floor = Rect::new(0.0, 48.0, 48.0, 48.0);
        let standing = Rect::new(10.0, 12.0, 24.0, 36.0);
        assert!(!standing.overlaps(&floor));

        let sunk = Rect::new(10.0, 12.5, 24.0, 36.0);
        assert!(sunk.overlaps(&floor));
    }

    #[test]
    fn circle_hits_rect_corner_only_inside_radius() {
        let target = Rect::new(10.0, 10.0, 10.0, 10.0);
        let near = Circle { cx: 7.0, cy: 7.0, r: 5.0 };   // corner at distance ~4.24
        let far = Circle { cx: 5.0, cy: 5.0, r: 5.0 };    // corner at distance ~7.07
        assert!(near.overlaps_rect(&target));
        assert!(!far.overlaps_rect(&target));
    }

    #[test]
    fn zero_sized_hitboxes_never_hit() {
        let target = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!Hitbox::Rect(Rect::new(5.0, 5.0, 0.0, 4.0)).overlaps(&target));
        assert!(!Hitbox::Circle(Circle { cx: 5.0, cy: 5.0, r: 0.0 }).overlaps(&target));
    }

    #[test]
    fn shrink_keeps_feet_planted() {
        let mut r = Rect::new(0.0, 0.0, 40.0, 40.0);
        r.shrink_to(0.5);
        assert_eq!(r.bottom(), 40.0);
        assert_eq!(r.center_x(), 20.0);
        assert_eq!(r.w, 20.0);
    }
}
