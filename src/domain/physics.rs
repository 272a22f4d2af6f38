/// Unified physics layer: static tile collision and body integration.
///
/// ## Architecture
///
/// Two layers:
///   1. COLLISION WORLD: the static tile grid, queried by rectangle.
///   2. INTEGRATION: gravity + velocity for one Actor, resolved
///                  against the collision world one axis at a time.
///
/// ## Axis-separated resolution
///
/// Horizontal first: move by `(vx + knockback_vx)*dt`, then clamp the box to the edge of
/// every overlapping solid tile on the side of approach and zero `vx`.
/// Vertical second: accumulate gravity (capped at terminal velocity),
/// move by `vy*dt`, then clamp. Falling into a tile lands the body on
/// its top (`on_ground`); rising into one stops at its underside.
///
/// ## Player locomotion
///
/// Jumping is allowed on the ground or within the coyote window after
/// leaving it. A dash overrides horizontal velocity for a fixed time and
/// grants invulnerability for the same span. A spent dash re-arms on the
/// first grounded tick after the dash has finished.
///
/// Units: pixels, seconds, px/s, px/s².

use super::entity::{Actor, Player};
use super::geometry::Rect;
use super::tile::Tile;

// ══════════════════════════════════════════════════════════════
// Layer 1: Collision world (static tiles only)
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct CollisionWorld {
    tiles: Vec<Vec<Tile>>,
    cols: usize,
    rows: usize,
    tile_size: f32,
}

impl CollisionWorld {
    /// Build from map rows. Short rows are padded with open air.
    pub fn from_rows<S: AsRef<str>>(rows: &[S], tile_size: f32) -> Self {
        let cols = rows.iter().map(|r| r.as_ref().chars().count()).max().unwrap_or(0);
        let tiles = rows.iter()
            .map(|r| {
                let mut line: Vec<Tile> = r.as_ref().chars().map(Tile::from_char).collect();
                line.resize(cols, Tile::Empty);
                line
            })
            .collect();
        CollisionWorld { tiles, cols, rows: rows.len(), tile_size }
    }

    pub fn cols(&self) -> usize { self.cols }
    pub fn rows(&self) -> usize { self.rows }
    pub fn tile_size(&self) -> f32 { self.tile_size }
    pub fn pixel_width(&self) -> f32 { self.cols as f32 * self.tile_size }
    pub fn pixel_height(&self) -> f32 { self.rows as f32 * self.tile_size }

    /// Out-of-bounds cells read as open air.
    pub fn tile_at(&self, col: usize, row: usize) -> Tile {
        self.tiles.get(row).and_then(|r| r.get(col)).copied().unwrap_or_default()
    }

    pub fn tile_rect(&self, col: usize, row: usize) -> Rect {
        Rect::new(
            col as f32 * self.tile_size,
            row as f32 * self.tile_size,
            self.tile_size,
            self.tile_size,
        )
    }

    /// Rectangles of every solid tile strictly overlapping `area`.
    pub fn solids_overlapping(&self, area: &Rect) -> Vec<Rect> {
        let mut out = Vec::new();
        let Some((c0, c1)) = cell_span(area.left(), area.right(), self.tile_size, self.cols) else {
            return out;
        };
        let Some((r0, r1)) = cell_span(area.top(), area.bottom(), self.tile_size, self.rows) else {
            return out;
        };
        for row in r0..=r1 {
            for col in c0..=c1 {
                if !self.tile_at(col, row).is_solid() { continue; }
                let rect = self.tile_rect(col, row);
                if rect.overlaps(area) {
                    out.push(rect);
                }
            }
        }
        out
    }

    /// True when `area` touches no solid tile.
    pub fn is_clear(&self, area: &Rect) -> bool {
        self.solids_overlapping(area).is_empty()
    }

    /// Shift `rect` horizontally by `dx`, stopping flush against solid
    /// tiles on the side of approach and at the level edges. A rect that
    /// already overlaps tiles (a phased body) only gets the edge clamp.
    /// Returns true when the move was cut short.
    pub fn slide_x(&self, rect: &mut Rect, dx: f32) -> bool {
        let mut blocked = false;
        if dx != 0.0 {
            let was_clear = self.is_clear(rect);
            rect.x += dx;
            if was_clear {
                let solids = self.solids_overlapping(rect);
                if dx > 0.0 {
                    if let Some(edge) = solids.iter().map(|t| t.left()).reduce(f32::min) {
                        rect.set_right(edge);
                        blocked = true;
                    }
                } else if let Some(edge) = solids.iter().map(|t| t.right()).reduce(f32::max) {
                    rect.x = edge;
                    blocked = true;
                }
            }
        }
        let max_x = (self.pixel_width() - rect.w).max(0.0);
        if rect.x < 0.0 || rect.x > max_x {
            rect.x = rect.x.clamp(0.0, max_x);
            blocked = true;
        }
        blocked
    }

    /// Top edge of the highest solid tile in a column.
    pub fn surface_top(&self, col: usize) -> Option<f32> {
        (0..self.rows)
            .find(|&row| self.tile_at(col, row).is_solid())
            .map(|row| row as f32 * self.tile_size)
    }
}

/// Move `v` toward zero by `amount` without crossing it.
fn bleed(v: f32, amount: f32) -> f32 {
    if v > 0.0 { (v - amount).max(0.0) } else { (v + amount).min(0.0) }
}

/// Inclusive cell index range covered by [lo, hi), clamped to the grid.
fn cell_span(lo: f32, hi: f32, size: f32, count: usize) -> Option<(usize, usize)> {
    if count == 0 || hi <= 0.0 || hi <= lo { return None; }
    let first = (lo / size).floor().max(0.0) as usize;
    let last = ((hi / size).ceil() as usize).saturating_sub(1).min(count - 1);
    if first > last { return None; }
    Some((first, last))
}

// ══════════════════════════════════════════════════════════════
// Layer 2: Integration
// ══════════════════════════════════════════════════════════════

/// How fast a knockback impulse bleeds off, px/s².
pub const KNOCKBACK_DRAG: f32 = 1800.0;

/// Per-kind body constants.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BodyParams {
    pub gravity: f32,
    pub terminal_velocity: f32,
    /// false = ignores tiles and gravity (ghosts).
    pub collides: bool,
}

/// What the body touched during one integration step.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Contacts {
    pub hit_wall: bool,
    pub grounded: bool,
    pub hit_ceiling: bool,
}

pub fn integrate(actor: &mut Actor, dt: f32, world: &CollisionWorld, params: &BodyParams) -> Contacts {
    let mut contacts = Contacts::default();
    let vx = actor.vx + actor.knockback_vx;
    actor.knockback_vx = bleed(actor.knockback_vx, KNOCKBACK_DRAG * dt);

    if !params.collides {
        actor.rect.x += vx * dt;
        actor.rect.y += actor.vy * dt;
        actor.on_ground = false;
        return contacts;
    }

    // ── Horizontal ──
    if world.slide_x(&mut actor.rect, vx * dt) {
        actor.vx = 0.0;
        actor.knockback_vx = 0.0;
        contacts.hit_wall = true;
    }

    // ── Vertical ──
    actor.vy = (actor.vy + params.gravity * dt).min(params.terminal_velocity);
    let dir = actor.vy;
    actor.rect.y += actor.vy * dt;
    actor.on_ground = false;
    if dir != 0.0 {
        for tile in world.solids_overlapping(&actor.rect) {
            if dir > 0.0 {
                actor.rect.set_bottom(tile.top());
                actor.on_ground = true;
                contacts.grounded = true;
            } else {
                actor.rect.y = tile.bottom();
                contacts.hit_ceiling = true;
            }
            actor.vy = 0.0;
        }
    }

    contacts
}

// ══════════════════════════════════════════════════════════════
// Player locomotion
// ══════════════════════════════════════════════════════════════

/// Jump if grounded or still inside the coyote window.
/// A successful jump consumes the window so it cannot be reused mid-air.
pub fn try_jump(player: &mut Player, jump_speed: f32, coyote_time: f32) -> bool {
    if !(player.actor.on_ground || player.airborne_for <= coyote_time) {
        return false;
    }
    player.actor.vy = -jump_speed;
    player.actor.on_ground = false;
    player.airborne_for = f32::INFINITY;
    true
}

/// Start a dash in the facing direction. Requires an armed dash.
pub fn try_dash(player: &mut Player, now: f64) -> bool {
    if !player.can_dash || player.is_dashing() {
        return false;
    }
    let stats = player.stats();
    player.dash_remaining = stats.dash_duration;
    player.dash_dir = player.actor.facing.sign();
    player.can_dash = false;
    player.actor.grant_invulnerability(now, stats.dash_duration as f64);
    true
}

/// Post-integration bookkeeping: coyote clock, dash countdown, re-arm.
pub fn settle_player(player: &mut Player, dt: f32) {
    if player.actor.on_ground {
        player.airborne_for = 0.0;
    } else {
        player.airborne_for += dt;
    }
    if player.dash_remaining > 0.0 {
        player.dash_remaining = (player.dash_remaining - dt).max(0.0);
    }
    if !player.can_dash && !player.is_dashing() && player.actor.on_ground {
        player.can_dash = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::class::CharClass;
    use crate::domain::entity::Facing;

    const DT: f32 = 1.0 / 60.0;

    fn params() -> BodyParams {
        BodyParams { gravity: 2160.0, terminal_velocity: 720.0, collides: true }
    }

    /// Helper: 10px tiles for readable coordinates.
    /// Legend: 'G' grass  'R' rock  '.' air
    fn world_from(rows: &[&str]) -> CollisionWorld {
        CollisionWorld::from_rows(rows, 10.0)
    }

    fn body(x: f32, y: f32) -> Actor {
        Actor::new(1, Rect::new(x, y, 8.0, 8.0), 10)
    }

    #[test]
    fn ragged_rows_are_padded() {
        let w = world_from(&["..", "GGGG"]);
        assert_eq!(w.cols(), 4);
        assert_eq!(w.tile_at(3, 0), Tile::Empty);
        assert_eq!(w.tile_at(3, 1), Tile::Grass);
        assert_eq!(w.tile_at(99, 99), Tile::Empty);
        assert_eq!(w.pixel_width(), 40.0);
    }

    #[test]
    fn falls_and_lands_on_top() {
        let w = world_from(&[
            "....",
            "....",
            "GGGG",
        ]);
        let mut a = body(10.0, 0.0);
        let mut landed = false;
        for _ in 0..120 {
            if integrate(&mut a, DT, &w, &params()).grounded { landed = true; }
        }
        assert!(landed);
        assert!(a.on_ground);
        assert_eq!(a.rect.bottom(), 20.0);
        assert_eq!(a.vy, 0.0);
    }

    #[test]
    fn terminal_velocity_caps_fall() {
        let w = world_from(&["....", "...."]);
        let mut a = body(0.0, -5000.0);
        for _ in 0..200 {
            integrate(&mut a, DT, &w, &params());
        }
        assert_eq!(a.vy, 720.0);
    }

    #[test]
    fn wall_stops_horizontal_motion() {
        let w = world_from(&[
            "..R.",
            "GGGG",
        ]);
        let mut a = body(5.0, 1.0);
        a.vx = 600.0;
        let c = integrate(&mut a, DT, &w, &params());
        assert!(c.hit_wall);
        assert_eq!(a.rect.right(), 20.0);
        assert_eq!(a.vx, 0.0);
    }

    #[test]
    fn knockback_rides_on_top_of_intent_and_bleeds_off() {
        let w = world_from(&["..........", "GGGGGGGGGG"]);
        let mut a = body(10.0, 2.0);
        a.knockback_vx = 120.0;
        let mut moved = 0.0;
        for _ in 0..30 {
            a.vx = 0.0;
            let before = a.rect.x;
            integrate(&mut a, DT, &w, &params());
            moved += a.rect.x - before;
        }
        assert_eq!(a.knockback_vx, 0.0);
        // 120 + 90 + 60 + 30 px/s over one tick each.
        assert!((moved - 5.0).abs() < 0.1, "moved {moved}");
    }

    #[test]
    fn knockback_into_a_wall_is_cancelled() {
        let w = world_from(&["..R.", "GGGG"]);
        let mut a = body(11.0, 1.0);
        a.knockback_vx = 600.0;
        assert!(integrate(&mut a, DT, &w, &params()).hit_wall);
        assert_eq!(a.rect.right(), 20.0);
        assert_eq!(a.knockback_vx, 0.0);
    }

    #[test]
    fn slide_stops_at_tiles_but_not_inside_them() {
        let w = world_from(&["..R.....", "GGGGGGGG"]);
        let mut r = Rect::new(8.0, 0.0, 8.0, 8.0);
        assert!(w.slide_x(&mut r, 6.0));
        assert_eq!(r.right(), 20.0);

        let mut r = Rect::new(32.0, 0.0, 8.0, 8.0);
        assert!(w.slide_x(&mut r, -6.0));
        assert_eq!(r.x, 30.0);

        // Already inside rock: free move, edge clamp only.
        let mut r = Rect::new(21.0, 0.0, 8.0, 8.0);
        assert!(!w.slide_x(&mut r, 4.0));
        assert_eq!(r.x, 25.0);
        assert!(w.slide_x(&mut r, 100.0));
        assert_eq!(r.right(), 80.0);
    }

    #[test]
    fn ceiling_clears_upward_velocity() {
        let w = world_from(&[
            "RRRR",
            "....",
            "....",
        ]);
        let mut a = body(10.0, 11.0);
        a.vy = -300.0;
        let c = integrate(&mut a, DT, &w, &params());
        assert!(c.hit_ceiling);
        assert_eq!(a.rect.top(), 10.0);
        assert_eq!(a.vy, 0.0);
    }

    #[test]
    fn level_edges_clamp() {
        let w = world_from(&["....", "GGGG"]);
        let mut a = body(1.0, 2.0);
        a.vx = -600.0;
        assert!(integrate(&mut a, DT, &w, &params()).hit_wall);
        assert_eq!(a.rect.x, 0.0);
    }

    #[test]
    fn non_colliding_bodies_pass_through() {
        let w = world_from(&["RRRR", "RRRR"]);
        let mut a = body(0.0, 0.0);
        a.vx = 60.0;
        a.vy = 60.0;
        let c = integrate(&mut a, 0.5, &w, &BodyParams { gravity: 0.0, terminal_velocity: 0.0, collides: false });
        assert_eq!(c, Contacts::default());
        assert_eq!((a.rect.x, a.rect.y), (30.0, 30.0));
    }

    #[test]
    fn surface_top_finds_highest_solid() {
        let w = world_from(&[
            "....",
            ".R..",
            "GGGG",
        ]);
        assert_eq!(w.surface_top(1), Some(10.0));
        assert_eq!(w.surface_top(0), Some(20.0));
        assert_eq!(w.surface_top(9), None);
    }

    // ── Locomotion ──

    fn grounded_player() -> Player {
        let mut p = Player::new(CharClass::Warrior, 0.0, 0.0);
        p.actor.on_ground = true;
        p
    }

    #[test]
    fn coyote_window_allows_one_late_jump() {
        let mut p = grounded_player();
        p.actor.on_ground = false;
        p.airborne_for = 0.08;
        assert!(try_jump(&mut p, 540.0, 0.1));
        assert_eq!(p.actor.vy, -540.0);
        // Second press mid-air is refused.
        assert!(!try_jump(&mut p, 540.0, 0.1));

        let mut late = grounded_player();
        late.actor.on_ground = false;
        late.airborne_for = 0.15;
        assert!(!try_jump(&mut late, 540.0, 0.1));
    }

    #[test]
    fn dash_rearms_only_after_duration_and_ground_contact() {
        let mut p = grounded_player();
        p.actor.facing = Facing::Left;
        let t0 = 10.0;
        assert!(try_dash(&mut p, t0));
        assert_eq!(p.dash_dir, -1.0);
        assert!(p.actor.is_invulnerable(t0 + 0.1));

        // Grounded the whole time, but the dash has not finished.
        let mut now = t0;
        for _ in 0..6 {
            now += DT as f64;
            settle_player(&mut p, DT);
        }
        assert!(p.is_dashing());
        assert!(!p.can_dash);
        assert!(!try_dash(&mut p, now));

        // Finish the dash in the air: still not re-armed.
        p.actor.on_ground = false;
        for _ in 0..10 {
            now += DT as f64;
            settle_player(&mut p, DT);
        }
        assert!(!p.is_dashing());
        assert!(!p.actor.is_invulnerable(now));
        assert!(!p.can_dash);

        // Touch ground.
        p.actor.on_ground = true;
        settle_player(&mut p, DT);
        assert!(p.can_dash);
        assert!(try_dash(&mut p, now));
    }
}
