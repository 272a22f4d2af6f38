/// Presentation layer: double-buffered, diff-based terminal renderer.
///
///   1. Compose the next frame into `front` (a grid of Cells)
///   2. Compare every cell with `back` (the previous frame)
///   3. Queue terminal commands only for cells that changed
///   4. Flush once, then swap front/back
///
/// World pixels map onto cells at `PX_PER_COL` x `PX_PER_ROW`. The
/// renderer only reads the world; camera and shake come from the sim.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use water41::domain::entity::{DamageTint, VisualState};
use water41::domain::ai::EnemyKind;
use water41::domain::geometry::Rect;
use water41::domain::tile::Tile;
use water41::sim::mode::Mode;
use water41::sim::tactical::{TacticalAction, TacticalEncounter};
use water41::sim::world::{ActorKind, ActorView, StagePhase, WorldState};

const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

const PX_PER_COL: f32 = 8.0;
const PX_PER_ROW: f32 = 16.0;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

// ── Cell / FrameBuffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: BASE_BG };
    /// Never drawn; forces a full repaint when written into `back`.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_stage: Option<usize>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_stage: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(BASE_BG),
            Clear(ClearType::All)
        )?;
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))?;
        }
        if self.last_stage != Some(world.stage_index) {
            self.back.cells.fill(Cell::INVALID);
            self.last_stage = Some(world.stage_index);
        }

        self.front.clear();
        self.compose_hud(world);
        let map_rows = self.compose_map(world);
        self.compose_bars(world, MAP_ROW + map_rows + 1);

        match world.modes.top() {
            Some(Mode::Tactical(enc)) => self.compose_tactical(enc),
            Some(Mode::Inventory(menu)) => self.compose_inventory(world, menu.cursor),
            None => {}
        }
        if let StagePhase::Ending(ending) = world.phase {
            let score = format!("Score: {}", world.final_score());
            self.compose_box(&[ending.title(), score.as_str(), "", "Q to quit"]);
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }
        self.writer.flush()
    }

    // ── Compose ──

    fn compose_hud(&mut self, w: &WorldState) {
        let p = &w.player;
        let hud = format!(
            " {}  {}  HP {}/{}  Lives {}  Defeated {}/{}  EXP {}  STR {} ",
            w.stage_name,
            p.class.name(),
            p.actor.health(),
            p.actor.max_health(),
            w.lives.max(0),
            w.enemies_defeated,
            w.quota,
            p.exp,
            p.strength,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    /// World pixel to screen cell, or None when off screen.
    fn to_cell(&self, w: &WorldState, x: f32, y: f32, rows: usize) -> Option<(usize, usize)> {
        let shake = if w.tick % 2 == 0 { w.feedback.shake } else { -w.feedback.shake };
        let col = ((x - w.camera.x + shake) / PX_PER_COL).floor();
        let row = (y / PX_PER_ROW).floor();
        if col < 0.0 || row < 0.0 || col as usize >= self.front.width || row as usize >= rows {
            return None;
        }
        Some((col as usize, MAP_ROW + row as usize))
    }

    fn fill_rect(&mut self, w: &WorldState, r: &Rect, rows: usize, cell: Cell) {
        let mut y = r.top();
        while y < r.bottom() {
            let mut x = r.left();
            while x < r.right() {
                if let Some((c, row)) = self.to_cell(w, x, y, rows) {
                    self.front.set(c, row, cell);
                }
                x += PX_PER_COL;
            }
            y += PX_PER_ROW;
        }
    }

    /// Returns the number of map rows drawn.
    fn compose_map(&mut self, w: &WorldState) -> usize {
        let rows = ((w.collision.pixel_height() / PX_PER_ROW).ceil() as usize)
            .min(self.front.height.saturating_sub(MAP_ROW + 4));
        let tile = w.collision.tile_size();

        for col in 0..w.collision.cols() {
            for row in 0..w.collision.rows() {
                let cell = match w.collision.tile_at(col, row) {
                    Tile::Grass => Cell::new('▒', Color::Green, Color::Rgb { r: 20, g: 60, b: 20 }),
                    Tile::Rock => Cell::new('▓', Color::Grey, Color::Rgb { r: 50, g: 50, b: 55 }),
                    Tile::Empty => continue,
                };
                let r = Rect::new(col as f32 * tile, row as f32 * tile, tile, tile);
                self.fill_rect(w, &r, rows, cell);
            }
        }

        for cp in &w.checkpoints {
            let fg = if cp.is_activated() { Color::Yellow } else { Color::DarkGrey };
            self.fill_rect(w, &cp.rect, rows, Cell::new('|', fg, BASE_BG));
        }
        for g in &w.ground_items {
            self.fill_rect(w, &g.rect, rows, Cell::new('*', Color::Cyan, BASE_BG));
        }
        for view in w.actor_views() {
            let cell = actor_cell(&view);
            self.fill_rect(w, &view.rect, rows, cell);
        }
        for n in &w.feedback.damage_numbers {
            let fg = match n.tint {
                DamageTint::Dealt => Color::White,
                DamageTint::Taken => Color::Red,
                DamageTint::Dodged => Color::DarkGrey,
            };
            if let Some((c, row)) = self.to_cell(w, n.x, n.y - PX_PER_ROW, rows) {
                self.front.put_str(c, row, &n.amount.to_string(), fg, BASE_BG);
            }
        }
        rows
    }

    fn compose_bars(&mut self, w: &WorldState, row: usize) {
        if row < self.front.height && !w.message.is_empty() {
            self.front.fill_row(row, MSG_BG);
            self.front.put_str(1, row, &w.message, Color::Black, MSG_BG);
        }
        let help = " A/D move  W jump  K dash  J attack  T tactical  I items  B befriend  F fight  Q quit";
        if row + 2 < self.front.height {
            self.front.put_str(0, row + 2, help, Color::DarkGrey, BASE_BG);
        }
    }

    fn compose_tactical(&mut self, enc: &TacticalEncounter) {
        let title = format!("Tactical Combat  turn {}", enc.turns() + 1);
        let mut lines: Vec<String> = vec![title, String::new()];
        for e in &enc.enemies {
            let state = if e.is_down() { " (down)" } else { "" };
            lines.push(format!("{:<8} HP {:>3}{}", e.name, e.hp.max(0), state));
        }
        lines.push(String::new());
        let menu: Vec<String> = TacticalAction::ALL.iter().enumerate()
            .map(|(i, a)| if i == enc.cursor { format!("[{}]", a.label()) } else { format!(" {} ", a.label()) })
            .collect();
        lines.push(menu.join(" "));
        lines.push(String::new());
        let tail = enc.log.len().saturating_sub(4);
        lines.extend(enc.log[tail..].iter().cloned());
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        self.compose_box(&refs);
    }

    fn compose_inventory(&mut self, w: &WorldState, cursor: usize) {
        let mut lines = vec!["Inventory".to_string(), String::new()];
        let items = w.player.inventory.list();
        if items.is_empty() {
            lines.push(water41::domain::inventory::EMPTY_MESSAGE.to_string());
        }
        for (i, line) in items.into_iter().enumerate() {
            let mark = if i == cursor { '>' } else { ' ' };
            lines.push(format!("{mark} {line}"));
        }
        lines.push(String::new());
        lines.push("U use  X discard  I close".to_string());
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        self.compose_box(&refs);
    }

    /// Centered bordered box over the map.
    fn compose_box(&mut self, lines: &[&str]) {
        let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
        let width = inner + 2;
        let height = lines.len() + 2;
        let x0 = self.front.width.saturating_sub(width) / 2;
        let y0 = MAP_ROW + 1;
        let bg = Color::Rgb { r: 30, g: 30, b: 50 };

        for dy in 0..height {
            for dx in 0..width {
                let ch = match (dx, dy) {
                    (0, 0) => '┌',
                    (x, 0) if x == width - 1 => '┐',
                    (0, y) if y == height - 1 => '└',
                    (x, y) if x == width - 1 && y == height - 1 => '┘',
                    (_, 0) => '─',
                    (_, y) if y == height - 1 => '─',
                    (0, _) => '│',
                    (x, _) if x == width - 1 => '│',
                    _ => ' ',
                };
                self.front.set(x0 + dx, y0 + dy, Cell::new(ch, Color::White, bg));
            }
        }
        for (i, line) in lines.iter().enumerate() {
            self.front.put_str(x0 + 2, y0 + 1 + i, line, Color::White, bg);
        }
    }
}

fn actor_cell(view: &ActorView) -> Cell {
    let (ch, fg) = match view.kind {
        ActorKind::Player => ('@', Color::White),
        ActorKind::Enemy(EnemyKind::Grub) => ('g', Color::DarkYellow),
        ActorKind::Enemy(EnemyKind::Spider) => ('s', Color::Magenta),
        ActorKind::Enemy(EnemyKind::Slime) => ('o', Color::Green),
        ActorKind::Enemy(EnemyKind::Ghost) => ('G', Color::Cyan),
        ActorKind::Boss => ('B', Color::Red),
        ActorKind::Guide => ('N', Color::Yellow),
    };
    let fg = match view.visual {
        VisualState::Hurt => Color::Red,
        VisualState::Phased => Color::DarkGrey,
        VisualState::Attacking => Color::White,
        VisualState::Dashing => Color::Blue,
        VisualState::Idle => fg,
    };
    let bg = if view.health_fraction < 0.3 { Color::Rgb { r: 60, g: 20, b: 20 } } else { BASE_BG };
    Cell::new(ch, fg, bg)
}
