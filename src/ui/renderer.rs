/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell), recording
///      every node box and button into a `LayoutSnapshot` as it goes
///   2. Let the caller measure the snapshot (connector geometry)
///   3. Draw connectors onto the blank cells of `front`
///   4. Compare each cell with `back` buffer (previous frame) and only emit
///      terminal commands for cells that changed, batched with `queue!`
///   5. Swap front/back
///
/// Screen layout (desktop journey):
///   row 0        title + step counter
///   row 1        progress bar
///   rows 2..h-2  flowchart body (scrolls)
///   row h-2      navigation buttons
///   row h-1      legend

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::app::{App, Mode, Phase};
use crate::domain::content::{Content, Node, NodeKind, NodeRef};
use crate::domain::evidence::{self, Evidence};
use crate::domain::geometry::{ConnectorPath, Point, Rect};
use crate::domain::progress::{count_of, element_at, Element};
use crate::sim::linear::{LinearNavigator, OverviewHeader};
use crate::sim::navigator::Navigator;
use crate::sim::overlay::Modal;
use crate::ui::layout::{Hit, LayoutSnapshot, NavButton};
use crate::ui::text::{self, Span};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
    bold: bool,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells.
    ///
    /// Using the same RGB for `Clear(ClearType::All)` and every cell keeps
    /// VTE terminals from showing their own default between rows.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG, bold: false };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta, bold: false };

    /// Normalize bg: Color::Reset → BASE_BG so that every cell gets an
    /// explicit background color (never terminal-default).
    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn new(ch: char, fg: Color, bg: Color, bold: bool) -> Self {
        Cell { ch, fg, bg: Self::norm_bg(bg), bold }
    }

    #[cfg(test)]
    fn is_blank(&self) -> bool {
        self.ch == ' ' && self.bg == Self::BASE_BG
    }
}

// ── Palette ──

const NODE_BG: Color = Color::Rgb { r: 32, g: 32, b: 50 };
const MODAL_BG: Color = Color::Rgb { r: 28, g: 28, b: 44 };
const TEXT: Color = Color::Rgb { r: 225, g: 225, b: 232 };
const DIM: Color = Color::Rgb { r: 130, g: 130, b: 150 };
const FAINT: Color = Color::Rgb { r: 72, g: 72, b: 92 };
const ACCENT: Color = Color::Rgb { r: 197, g: 75, b: 50 };
const LINK: Color = Color::Rgb { r: 100, g: 170, b: 255 };
const FOCUS: Color = Color::Rgb { r: 255, g: 220, b: 50 };

fn kind_color(kind: NodeKind) -> Color {
    match kind {
        NodeKind::Starting => Color::Rgb { r: 90, g: 150, b: 220 },
        NodeKind::Bottleneck => Color::Rgb { r: 230, g: 170, b: 60 },
        NodeKind::Impact => Color::Rgb { r: 210, g: 85, b: 85 },
        NodeKind::Reform => Color::Rgb { r: 80, g: 190, b: 120 },
        NodeKind::Destination => Color::Rgb { r: 175, g: 125, b: 225 },
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    /// Rows `clip.0..clip.1` accept writes.
    clip: (i32, i32),
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
            clip: (0, h as i32),
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
        self.unclip();
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
        self.unclip();
    }

    fn clip_rows(&mut self, top: i32, bottom: i32) {
        self.clip = (top.max(0), bottom.min(self.height as i32));
    }

    fn unclip(&mut self) {
        self.clip = (0, self.height as i32);
    }

    fn row_visible(&self, y: i32) -> bool {
        y >= self.clip.0 && y < self.clip.1
    }

    fn set(&mut self, x: i32, y: i32, cell: Cell) {
        if x >= 0 && (x as usize) < self.width && self.row_visible(y) {
            self.cells[y as usize * self.width + x as usize] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn is_open(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || !self.row_visible(y) {
            return false;
        }
        let cell = self.get(x as usize, y as usize);
        cell.bg == Cell::BASE_BG && matches!(cell.ch, ' ' | '╌' | '┆')
    }

    /// Write a string at (x, y). Returns the column after the last char.
    fn put_str(&mut self, x: i32, y: i32, s: &str, fg: Color, bg: Color, bold: bool) -> i32 {
        let mut cx = x;
        for ch in s.chars() {
            self.set(cx, y, Cell::new(ch, fg, bg, bold));
            cx += 1;
        }
        cx
    }

    fn fill(&mut self, r: Rect, bg: Color) {
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                self.set(x, y, Cell::new(' ', TEXT, bg, false));
            }
        }
    }

    /// Filled box with a rounded border.
    fn draw_box(&mut self, r: Rect, fg: Color, bg: Color) {
        if r.w < 2 || r.h < 2 {
            return;
        }
        self.fill(r, bg);
        let (l, t, rt, b) = (r.x, r.y, r.right() - 1, r.bottom() - 1);
        for x in l + 1..rt {
            self.set(x, t, Cell::new('─', fg, bg, false));
            self.set(x, b, Cell::new('─', fg, bg, false));
        }
        for y in t + 1..b {
            self.set(l, y, Cell::new('│', fg, bg, false));
            self.set(rt, y, Cell::new('│', fg, bg, false));
        }
        self.set(l, t, Cell::new('╭', fg, bg, false));
        self.set(rt, t, Cell::new('╮', fg, bg, false));
        self.set(l, b, Cell::new('╰', fg, bg, false));
        self.set(rt, b, Cell::new('╯', fg, bg, false));
    }

    #[cfg(test)]
    fn row_text(&self, y: usize) -> String {
        (0..self.width).map(|x| self.get(x, y).ch).collect()
    }
}

// ── Lines: pre-wrapped rows of rich text ──

#[derive(Clone, Debug)]
struct Line {
    spans: Vec<Span>,
    fg: Color,
    hit: Option<Hit>,
    indent: i32,
}

impl Line {
    fn blank() -> Self {
        Line { spans: Vec::new(), fg: TEXT, hit: None, indent: 0 }
    }

    fn plain(text: impl Into<String>, fg: Color) -> Self {
        Line { spans: vec![Span::plain(text)], fg, hit: None, indent: 0 }
    }

    fn bold(text: impl Into<String>, fg: Color) -> Self {
        Line { spans: vec![Span::bold(text)], fg, hit: None, indent: 0 }
    }

    fn button(text: impl Into<String>, fg: Color, hit: Hit) -> Self {
        Line { spans: vec![Span::plain(text)], fg, hit: Some(hit), indent: 0 }
    }

    fn indented(mut self, indent: i32) -> Self {
        self.indent = indent;
        self
    }

    fn is_blank(&self) -> bool {
        self.spans.iter().all(|s| s.text.trim().is_empty())
    }
}

fn paragraph(lines: &mut Vec<Line>, text: &str, width: i32, fg: Color, indent: i32) {
    for spans in text::wrap_rich(text, (width - indent).max(1) as usize) {
        lines.push(Line { spans, fg, hit: None, indent });
    }
}

fn heading(lines: &mut Vec<Line>, text: &str, width: i32, fg: Color) {
    for row in text::wrap(text, width.max(1) as usize) {
        lines.push(Line::bold(row, fg));
    }
}

// ── Renderer ──

const LEFT_MARGIN: i32 = 4;
const NODE_GAP: i32 = 5;
const NODE_H: i32 = 6;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    layout: LayoutSnapshot,
    last_screen: Option<(Phase, bool)>,
    /// Screen rows of the scrolling body in the last frame.
    body: (i32, i32),
    /// Document rows the viewport should bring into view.
    follow: Option<(i32, i32)>,
    doc_h: i32,
    modal_doc_h: i32,
    modal_view_h: i32,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer::with_size(0, 0)
    }

    /// A renderer with a fixed frame size; nothing touches the terminal
    /// until `init`.
    pub fn with_size(w: u16, h: u16) -> Self {
        let (w, h) = (w as usize, h as usize);
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(w, h),
            back: FrameBuffer::new(w, h),
            term_w: w,
            term_h: h,
            layout: LayoutSnapshot::new(),
            last_screen: None,
            body: (0, h as i32),
            follow: None,
            doc_h: 0,
            modal_doc_h: 0,
            modal_view_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            SetAttribute(Attribute::Reset),
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn size(&self) -> (u16, u16) {
        (self.term_w as u16, self.term_h as u16)
    }

    /// Layout of the frame composed last.
    pub fn layout(&self) -> &LayoutSnapshot {
        &self.layout
    }

    /// Compose the next frame into the front buffer.
    pub fn render(&mut self, app: &mut App) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            // Force full repaint after resize.
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Screen change → clear for clean transition
        let screen = (app.phase, app.is_mobile());
        if self.last_screen != Some(screen) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(screen);
        }

        self.compose_settled(app);
        Ok(())
    }

    /// Draw connectors, emit the diff and swap buffers.
    pub fn present(&mut self, paths: &[ConnectorPath]) -> io::Result<()> {
        self.draw_connectors(paths);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    /// Compose, then let the viewports react to the measured document and
    /// recompose once if they moved.
    pub fn compose_settled(&mut self, app: &mut App) {
        self.compose_frame(app);
        app.doc_h = self.doc_h;
        app.modal_doc_h = self.modal_doc_h;
        app.scroll.view_h = self.body.1 - self.body.0;
        app.modal_scroll.view_h = self.modal_view_h;
        let moved = app.scroll.settle(self.follow, self.doc_h);
        let modal_before = app.modal_scroll.y;
        app.modal_scroll.clamp(self.modal_doc_h);
        if moved {
            app.connector.mark_dirty();
        }
        if moved || modal_before != app.modal_scroll.y {
            self.compose_frame(app);
        }
    }

    fn compose_frame(&mut self, app: &App) {
        self.front.clear();
        self.layout.clear();
        self.follow = None;
        self.doc_h = 0;
        self.modal_doc_h = 0;
        self.modal_view_h = 0;
        if self.front.width == 0 || self.front.height == 0 {
            return;
        }
        match (app.phase, &app.mode) {
            (Phase::Landing, _) => self.compose_landing(app),
            (Phase::Journey, Mode::Desktop(nav)) => self.compose_desktop(app, nav),
            (Phase::Journey, Mode::Mobile(nav)) => self.compose_mobile(app, nav),
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut last_bold = false;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Set explicit base colors at start of frame.
        // IMPORTANT: Do NOT use ResetColor here; it resets to the terminal's
        // native default, which may differ from BASE_BG.
        queue!(
            self.writer,
            SetAttribute(Attribute::NormalIntensity),
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.bold != last_bold {
                    let attr = if cell.bold { Attribute::Bold } else { Attribute::NormalIntensity };
                    queue!(self.writer, SetAttribute(attr))?;
                    last_bold = cell.bold;
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
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Shared drawing helpers ──

    /// Draw `lines` into `area`, skipping the first `skip` rows.
    fn draw_lines(&mut self, lines: &[Line], area: Rect, skip: i32, bg: Color) {
        let rows = lines.iter().skip(skip.max(0) as usize).take(area.h.max(0) as usize);
        for (row, line) in rows.enumerate() {
            let y = area.y + row as i32;
            let x = area.x + line.indent;
            let mut cx = x;
            for span in &line.spans {
                let avail = (area.right() - cx).max(0) as usize;
                let clipped = text::truncate(&span.text, avail);
                cx = self.front.put_str(cx, y, &clipped, line.fg, bg, span.bold);
            }
            if let Some(hit) = line.hit {
                self.add_visible_target(Rect::new(x, y, cx - x, 1), hit);
            }
        }
    }

    /// Register a target, keeping only the rows inside the current clip.
    fn add_visible_target(&mut self, r: Rect, hit: Hit) {
        let top = r.y.max(self.front.clip.0);
        let bottom = r.bottom().min(self.front.clip.1);
        if bottom > top {
            self.layout.add_target(Rect::new(r.x, top, r.w, bottom - top), hit);
        }
    }

    fn progress_bar(&mut self, y: i32, fraction: f32) {
        let w = self.front.width as i32;
        let filled = (fraction.clamp(0.0, 1.0) * w as f32).round() as i32;
        for x in 0..w {
            let (ch, fg) = if x < filled { ('━', ACCENT) } else { ('─', FAINT) };
            self.front.set(x, y, Cell::new(ch, fg, Cell::BASE_BG, false));
        }
    }

    /// Buttons left to right, then an optional right-aligned hint.
    fn button_row(&mut self, y: i32, buttons: &[(&str, Hit, bool)], hint: &str) {
        let mut x = 1;
        for (label, hit, enabled) in buttons {
            let fg = if *enabled { LINK } else { FAINT };
            let end = self.front.put_str(x, y, label, fg, Cell::BASE_BG, false);
            if *enabled {
                self.layout.add_target(Rect::new(x, y, end - x, 1), *hit);
            }
            x = end + 2;
        }
        let w = self.front.width as i32;
        let hint_len = hint.chars().count() as i32;
        if !hint.is_empty() && x + hint_len < w {
            self.front.put_str(w - hint_len - 1, y, hint, DIM, Cell::BASE_BG, false);
        }
    }

    fn draw_node(&mut self, node: &Node, rect: Rect, focused: bool, expanded: bool, animating: bool) {
        let color = kind_color(node.kind);
        let border = if focused {
            FOCUS
        } else if animating {
            TEXT
        } else {
            color
        };
        self.front.draw_box(rect, border, NODE_BG);

        let inner = (rect.w - 4).max(1);
        let x = rect.x + 2;
        let category = if node.category.is_empty() { node.kind.legend() } else { node.category.as_str() };
        let category = text::truncate(&category.to_uppercase(), inner as usize);
        self.front.put_str(x, rect.y + 1, &category, color, NODE_BG, true);

        let title = text::wrap(&node.title, inner as usize);
        for (i, row) in title.iter().take(2).enumerate() {
            let row = if i == 1 && title.len() > 2 {
                text::truncate(&format!("{row} …"), inner as usize)
            } else {
                row.clone()
            };
            self.front.put_str(x, rect.y + 2 + i as i32, &row, TEXT, NODE_BG, true);
        }
        let subtitle = text::truncate(&node.subtitle, inner as usize);
        self.front.put_str(x, rect.y + 4, &subtitle, DIM, NODE_BG, false);

        let marker = if expanded { "[−]" } else { "[+]" };
        self.front.put_str(rect.right() - 5, rect.y, marker, border, NODE_BG, false);
    }

    /// A centered modal box; hides every target drawn before it.
    fn draw_modal(&mut self, lines: &[Line], skip: i32, accent: Color) {
        let w = self.front.width as i32;
        let h = self.front.height as i32;
        let mw = (w - 6).min(84).max(20).min(w);
        let mh = (h - 4).max(6).min(h);
        let r = Rect::new((w - mw) / 2, (h - mh) / 2, mw, mh);

        self.layout.begin_modal(r);
        self.front.draw_box(r, accent, MODAL_BG);

        let area = Rect::new(r.x + 2, r.y + 1, mw - 4, mh - 2);
        self.modal_view_h = area.h;
        self.modal_doc_h = lines.len() as i32;
        self.draw_lines(lines, area, skip, MODAL_BG);

        if self.modal_doc_h > area.h {
            let more = if skip + area.h < self.modal_doc_h { " ↓ more " } else { " ↑ " };
            self.front.put_str(r.x + 2, r.bottom() - 1, more, DIM, MODAL_BG, false);
        }

        let close = Rect::new(r.right() - 5, r.y, 3, 1);
        self.front.put_str(close.x, close.y, "[×]", accent, MODAL_BG, true);
        self.layout.add_target(close, Hit::CloseModal);
    }

    fn compose_modal(&mut self, app: &App, modal: Modal, skip: i32) {
        let width = (self.front.width as i32 - 6).min(84) - 4;
        let (lines, accent) = match modal {
            Modal::Evidence { node, section } => {
                let accent = app.content.node(node).map_or(ACCENT, |n| kind_color(n.kind));
                (evidence_lines(&app.content, node, section, width), accent)
            }
            Modal::Reform { pathway, show_evidence } => (
                reform_lines(&app.content, pathway, show_evidence, width),
                kind_color(NodeKind::Reform),
            ),
            Modal::Overview { .. } => {
                let Mode::Desktop(nav) = &app.mode else { return };
                let progress = nav.progress();
                let pathways = progress.pathways();
                let entries: Vec<Element> = (1..=progress.total())
                    .map(|c| element_at(c, pathways))
                    .filter(|e| match e {
                        Element::Reform { pathway } => app.content.has_reform(*pathway),
                        _ => true,
                    })
                    .collect();
                let lines = overview_lines(
                    &app.content,
                    &entries,
                    progress.latest(),
                    Some(progress.count()),
                    "Select any step to jump there",
                    width,
                );
                (lines, ACCENT)
            }
        };
        self.draw_modal(&lines, skip, accent);
    }

    // ── Landing ──

    fn compose_landing(&mut self, app: &App) {
        let w = self.front.width as i32;
        let h = self.front.height as i32;
        let cw = (w - 8).clamp(20.min(w), 90);
        let x0 = (w - cw) / 2;

        let lines = landing_lines(&app.content, app.show_background, cw);
        self.body = (1, (h - 1).max(1));
        self.doc_h = lines.len() as i32 + 1;

        self.front.clip_rows(self.body.0, self.body.1);
        let area = Rect::new(x0, self.body.0, cw, self.body.1 - self.body.0);
        self.draw_lines(&lines, area, app.scroll.y, Cell::BASE_BG);
        self.front.unclip();

        self.front.put_str(
            1,
            h - 1,
            "Enter start   b background   ↑↓ scroll   q quit",
            DIM,
            Cell::BASE_BG,
            false,
        );
    }

    // ── Desktop flowchart ──

    fn compose_desktop(&mut self, app: &App, nav: &Navigator) {
        let w = self.front.width as i32;
        let h = self.front.height as i32;
        let progress = nav.progress();

        let title = if app.content.landing.title.is_empty() {
            "Bottleneck Pathways"
        } else {
            app.content.landing.title.as_str()
        };
        let counter = format!("Step {} of {}", progress.count(), progress.total());
        let room = (w - counter.chars().count() as i32 - 4).max(0) as usize;
        self.front.put_str(1, 0, &text::truncate(title, room), TEXT, Cell::BASE_BG, true);
        self.front.put_str(w - counter.chars().count() as i32 - 1, 0, &counter, DIM, Cell::BASE_BG, false);
        self.progress_bar(1, progress.fraction());

        self.body = (2, (h - 2).max(2));
        let origin = self.body.0 - app.scroll.y;
        self.front.clip_rows(self.body.0, self.body.1);
        self.doc_h = self.compose_flowchart(app, nav, origin);
        self.front.unclip();

        let overlays = nav.overlays();
        let back_enabled = progress.count() > 1 || !overlays.is_closed();
        let continue_enabled = !progress.is_complete() || overlays.reform_pathway().is_some();
        self.button_row(
            h - 2,
            &[
                ("[‹ Back]", Hit::Nav(NavButton::Back), back_enabled),
                ("[Continue ›]", Hit::Nav(NavButton::Continue), continue_enabled),
                ("[Map]", Hit::Nav(NavButton::Overview), true),
                ("[Start over]", Hit::Nav(NavButton::StartOver), true),
                ("[Intro]", Hit::Nav(NavButton::Intro), true),
            ],
            "←→ move  Tab focus  Enter open  Esc close  q quit",
        );

        let mut x = 1;
        for kind in [NodeKind::Starting, NodeKind::Bottleneck, NodeKind::Impact, NodeKind::Reform] {
            x = self.front.put_str(x, h - 1, "■ ", kind_color(kind), Cell::BASE_BG, false);
            x = self.front.put_str(x, h - 1, kind.legend(), DIM, Cell::BASE_BG, false) + 3;
        }

        if let Some(modal) = overlays.modal() {
            self.compose_modal(app, modal, app.modal_scroll.y);
        }
    }

    /// Pathway rows top to bottom. Returns the document height.
    fn compose_flowchart(&mut self, app: &App, nav: &Navigator, origin: i32) -> i32 {
        let w = self.front.width as i32;
        let content = &app.content;
        let progress = nav.progress();
        let overlays = nav.overlays();
        let expanded = overlays.expanded();
        let animating = nav.animating().map(|a| a.node_ref());
        let bw = ((w - LEFT_MARGIN - 2 - 2 * NODE_GAP) / 3).max(14);
        let row_w = 3 * bw + 2 * NODE_GAP;

        let mut y = 1;
        let mut newest: Option<(i32, i32)> = None;
        let mut panel_span: Option<(i32, i32)> = None;

        for p in 0..progress.pathways() {
            let state = progress.pathway_state(p);
            if state.node_count == 0 {
                break;
            }
            let row_top = y;
            let label = content.pathway_label(p).to_uppercase();
            self.front.put_str(LEFT_MARGIN, origin + y, &label, DIM, Cell::BASE_BG, true);
            y += 2;

            let mut panel_for = None;
            for i in 0..state.node_count {
                let node_ref = NodeRef::Step { pathway: p, node: i };
                let Some(node) = content.node(node_ref) else { continue };
                let x = LEFT_MARGIN + i as i32 * (bw + NODE_GAP);
                let rect = Rect::new(x, origin + y, bw, NODE_H);
                let is_open = expanded == Some(node_ref);
                self.draw_node(node, rect, app.focus == Some(node_ref), is_open, animating == Some(node_ref));
                self.layout.record_node(node_ref, rect);
                self.add_visible_target(rect, Hit::Node(node_ref));
                if i > 0 {
                    self.front.put_str(x - NODE_GAP + 1, rect.y + NODE_H / 2, "──▶", DIM, Cell::BASE_BG, false);
                }
                if is_open {
                    panel_for = Some(node_ref);
                    self.layout.add_inline_zone(rect);
                }
            }
            y += NODE_H;

            if state.show_reform_branch && content.has_reform(p) {
                let open = overlays.reform_pathway() == Some(p);
                let label = if open { "╰─◆ Pathway to Reform" } else { "╰─⊕ Pathway to Reform" };
                let tx = LEFT_MARGIN + 2 * (bw + NODE_GAP) + 1;
                let end = self.front.put_str(tx, origin + y, label, kind_color(NodeKind::Reform), Cell::BASE_BG, open);
                let trigger = Rect::new(tx, origin + y, end - tx, 1);
                self.layout.record_trigger(p, trigger);
                self.add_visible_target(trigger, Hit::ReformTrigger(p));
                y += 1;
            }

            if let Some(node_ref) = panel_for {
                y += 1;
                let panel_h = self.draw_panel(content, node_ref, LEFT_MARGIN, origin + y, row_w);
                panel_span = Some((y, y + panel_h));
                y += panel_h;
            }
            newest = Some((row_top, y));
            y += 2;
        }

        if progress.is_complete() {
            let row_top = y;
            self.front.put_str(LEFT_MARGIN, origin + y, "THE DESTINATION", DIM, Cell::BASE_BG, true);
            y += 2;
            let dw = (2 * bw).min(row_w);
            let dx = LEFT_MARGIN + (row_w - dw) / 2;
            let rect = Rect::new(dx, origin + y, dw, NODE_H);
            let node_ref = NodeRef::Destination;
            let is_open = expanded == Some(node_ref);
            self.draw_node(&content.destination, rect, app.focus == Some(node_ref), is_open, false);
            self.layout.record_node(node_ref, rect);
            self.add_visible_target(rect, Hit::Node(node_ref));
            y += NODE_H;
            if is_open {
                self.layout.add_inline_zone(rect);
                y += 1;
                let panel_h = self.draw_panel(content, node_ref, LEFT_MARGIN, origin + y, row_w);
                panel_span = Some((y, y + panel_h));
                y += panel_h;
            }
            newest = Some((row_top, y));
            y += 2;
        }

        self.follow = if app.follow_panel { panel_span.or(newest) } else { newest };
        y
    }

    /// Inline disclosure under a row. Returns its height.
    fn draw_panel(&mut self, content: &Content, node_ref: NodeRef, x: i32, y: i32, width: i32) -> i32 {
        let Some(node) = content.node(node_ref) else { return 0 };
        let lines = panel_lines(node_ref, node, width - 4);
        let rect = Rect::new(x, y, width, lines.len() as i32 + 2);
        self.front.draw_box(rect, kind_color(node.kind), NODE_BG);
        let area = Rect::new(x + 2, y + 1, width - 4, lines.len() as i32);
        self.draw_lines(&lines, area, 0, NODE_BG);
        self.layout.add_inline_zone(rect);
        rect.h
    }

    // ── Mobile single-item view ──

    fn compose_mobile(&mut self, app: &App, nav: &LinearNavigator) {
        let w = self.front.width as i32;
        let h = self.front.height as i32;
        let content = &app.content;
        let nav_row = [
            ("[‹ Back]", Hit::Nav(NavButton::Back), !nav.back_disabled()),
            ("[Continue ›]", Hit::Nav(NavButton::Continue), !nav.continue_disabled()),
        ];

        if nav.overview().is_some() {
            let screen = Rect::new(0, 0, w, h);
            self.layout.begin_modal(screen);
            let close = Rect::new(1, 0, 9, 1);
            self.front.put_str(close.x, close.y, "[× Close]", LINK, Cell::BASE_BG, false);
            self.layout.add_target(close, Hit::CloseModal);

            let header = match nav.overview_header() {
                OverviewHeader::TapAnyNode => "Tap any node to view details".to_string(),
                OverviewHeader::AllExplored => "You've explored all pathways".to_string(),
                OverviewHeader::Explored { explored, of } => {
                    format!("{explored} of {of} bottlenecks explored")
                }
            };
            let lines = overview_lines(content, &nav.overview_items(), nav.current(), None, &header, w - 4);
            let area = Rect::new(2, 2, w - 4, (h - 4).max(1));
            self.modal_view_h = area.h;
            self.modal_doc_h = lines.len() as i32;
            self.draw_lines(&lines, area, app.modal_scroll.y, Cell::BASE_BG);
            self.mobile_nav_row(h - 1, &nav_row);
            return;
        }

        let intro = Rect::new(1, 0, 7, 1);
        self.front.put_str(intro.x, intro.y, "‹ Intro", LINK, Cell::BASE_BG, false);
        self.layout.add_target(intro, Hit::Nav(NavButton::Intro));
        let position = format!("{}/{}", nav.index() + 1, nav.item_count());
        self.front.put_str(w - position.chars().count() as i32 - 1, 0, &position, DIM, Cell::BASE_BG, false);
        self.progress_bar(1, (nav.index() + 1) as f32 / nav.item_count().max(1) as f32);

        self.body = (3, (h - 3).max(3));
        let area = Rect::new(2, self.body.0, w - 4, self.body.1 - self.body.0);
        let lines = mobile_lines(content, nav, area.w);
        self.doc_h = lines.len() as i32;
        self.front.clip_rows(self.body.0, self.body.1);
        self.draw_lines(&lines, area, app.scroll.y, Cell::BASE_BG);
        self.front.unclip();
        if nav.is_expanded() {
            self.layout.add_inline_zone(area);
        }

        let map = "[ View Flowchart ]";
        let mx = (w - map.chars().count() as i32) / 2;
        let end = self.front.put_str(mx, h - 2, map, LINK, Cell::BASE_BG, false);
        self.layout.add_target(Rect::new(mx, h - 2, end - mx, 1), Hit::Nav(NavButton::Overview));
        self.mobile_nav_row(h - 1, &nav_row);

        if let Some(modal) = nav.overlays().modal() {
            self.compose_modal(app, modal, app.modal_scroll.y);
        }
    }

    /// Back on the left, Continue on the right, the swipe hint between.
    fn mobile_nav_row(&mut self, y: i32, buttons: &[(&str, Hit, bool); 2]) {
        let w = self.front.width as i32;
        let [(back, back_hit, back_on), (next, next_hit, next_on)] = *buttons;
        let end = self.front.put_str(1, y, back, if back_on { LINK } else { FAINT }, Cell::BASE_BG, false);
        if back_on {
            self.layout.add_target(Rect::new(1, y, end - 1, 1), back_hit);
        }
        let nx = w - next.chars().count() as i32 - 1;
        let end = self.front.put_str(nx, y, next, if next_on { LINK } else { FAINT }, Cell::BASE_BG, false);
        if next_on {
            self.layout.add_target(Rect::new(nx, y, end - nx, 1), next_hit);
        }
        let hint = "Swipe to navigate";
        let hx = (w - hint.chars().count() as i32) / 2;
        if hx > 12 && hx + (hint.chars().count() as i32) < nx - 1 {
            self.front.put_str(hx, y, hint, FAINT, Cell::BASE_BG, false);
        }
    }

    // ── Connectors ──

    fn draw_connectors(&mut self, paths: &[ConnectorPath]) {
        if paths.is_empty() {
            return;
        }
        let color = kind_color(NodeKind::Reform);
        self.front.clip_rows(self.body.0, self.body.1);
        for path in paths {
            for (a, b) in path.segments() {
                if a.y == b.y {
                    for x in a.x.min(b.x)..=a.x.max(b.x) {
                        self.put_open(Point::new(x, a.y), '╌', color);
                    }
                } else {
                    for y in a.y.min(b.y)..=a.y.max(b.y) {
                        self.put_open(Point::new(a.x, y), '┆', color);
                    }
                }
            }
            let [start, bend_a, bend_b, end] = path.points;
            let down = bend_b.y >= bend_a.y;
            self.put_open(start, '╌', color);
            self.put_open(bend_a, if down { '┌' } else { '└' }, color);
            self.put_open(bend_b, if down { '└' } else { '┌' }, color);
            self.put_open(end, '▶', color);
            self.put_open(path.label, '◇', color);
        }
        self.front.unclip();
    }

    fn put_open(&mut self, p: Point, ch: char, fg: Color) {
        if self.front.is_open(p.x, p.y) {
            self.front.set(p.x, p.y, Cell::new(ch, fg, Cell::BASE_BG, false));
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new()
    }
}

// ── Line builders ──

fn landing_lines(content: &Content, show_background: bool, width: i32) -> Vec<Line> {
    let l = &content.landing;
    let mut lines = vec![Line::blank()];
    if !l.kicker.is_empty() {
        lines.push(Line::bold(l.kicker.to_uppercase(), ACCENT));
        lines.push(Line::blank());
    }
    if !l.title.is_empty() {
        heading(&mut lines, &l.title, width, TEXT);
        lines.push(Line::blank());
    }
    if !l.authors.is_empty() {
        let names: Vec<String> = l
            .authors
            .iter()
            .map(|a| {
                if a.affiliation.is_empty() {
                    a.name.clone()
                } else {
                    format!("{} ({})", a.name, a.affiliation)
                }
            })
            .collect();
        paragraph(&mut lines, &format!("By {}", names.join(", ")), width, DIM, 0);
        let handles: Vec<&str> = l
            .authors
            .iter()
            .map(|a| a.handle.as_str())
            .filter(|h| !h.is_empty())
            .collect();
        if !handles.is_empty() {
            paragraph(&mut lines, &handles.join("  "), width, FAINT, 0);
        }
        lines.push(Line::blank());
    }
    if !l.claim.is_empty() {
        paragraph(&mut lines, &l.claim, width, TEXT, 0);
        lines.push(Line::blank());
    }
    if !l.context.is_empty() {
        paragraph(&mut lines, &l.context, width, DIM, 0);
        lines.push(Line::blank());
    }
    let cta = if l.cta.is_empty() { "Explore the pathways →" } else { l.cta.as_str() };
    lines.push(Line::button(format!("[ {cta} ]"), ACCENT, Hit::Start));

    if let Some(bg) = &l.background {
        lines.push(Line::blank());
        let toggle = if bg.toggle.is_empty() { "Additional background" } else { bg.toggle.as_str() };
        let sign = if show_background { "−" } else { "+" };
        lines.push(Line::button(format!("[{sign}] {toggle}"), LINK, Hit::BackgroundToggle));
        if show_background {
            if !bg.intro.is_empty() {
                lines.push(Line::blank());
                paragraph(&mut lines, &bg.intro, width, TEXT, 0);
            }
            for (i, factor) in bg.factors.iter().enumerate() {
                lines.push(Line::blank());
                heading(&mut lines, &format!("{}. {}", i + 1, factor.title), width, TEXT);
                paragraph(&mut lines, &factor.body, width, DIM, 3);
            }
            let mut group: Option<&str> = None;
            for stat in &bg.stats {
                if group != Some(stat.group.as_str()) {
                    lines.push(Line::blank());
                    lines.push(Line::bold(stat.group.clone(), ACCENT));
                    group = Some(stat.group.as_str());
                }
                paragraph(&mut lines, &format!("**{}**  {}", stat.value, stat.caption), width, TEXT, 2);
            }
        }
    }
    lines
}

/// Explanation paragraphs followed by numbered evidence CTAs.
fn panel_lines(node_ref: NodeRef, node: &Node, width: i32) -> Vec<Line> {
    let mut lines = Vec::new();
    for para in &node.explanation {
        paragraph(&mut lines, para, width, TEXT, 0);
        lines.push(Line::blank());
    }
    for (i, cta) in evidence::ctas(node).into_iter().enumerate() {
        let hit = Hit::EvidenceCta { node: node_ref, section: cta.section };
        lines.push(Line::button(format!("[{}] {}", i + 1, cta.label), LINK, hit));
    }
    while lines.last().map_or(false, Line::is_blank) {
        lines.pop();
    }
    if lines.is_empty() {
        lines.push(Line::plain("No further details.", DIM));
    }
    lines
}

fn push_evidence_items(lines: &mut Vec<Line>, items: &[Evidence], width: i32) {
    let numbers = evidence::number_items(items);
    for (item, number) in items.iter().zip(numbers) {
        if let Some(label) = &item.label {
            lines.push(Line::bold(label.clone(), LINK));
        }
        let fg = if item.is_context() { DIM } else { TEXT };
        match number {
            Some(n) => paragraph(lines, &format!("{n}. {}", item.quote), width, fg, 0),
            None => paragraph(lines, &item.quote, width, fg, 0),
        }
        if let Some(source) = &item.source {
            paragraph(lines, &format!("— {source}"), width, DIM, 3);
        }
        lines.push(Line::blank());
    }
}

fn evidence_lines(content: &Content, node_ref: NodeRef, section: Option<usize>, width: i32) -> Vec<Line> {
    let Some(node) = content.node(node_ref) else { return Vec::new() };
    let mut lines = Vec::new();
    let Some((title, items)) = evidence::resolve(node, section) else {
        lines.push(Line::plain("No evidence recorded for this step.", DIM));
        return lines;
    };
    heading(&mut lines, title.unwrap_or("Supporting Evidence"), width, ACCENT);
    paragraph(&mut lines, &node.title, width, DIM, 0);
    lines.push(Line::blank());
    push_evidence_items(&mut lines, items, width);
    lines
}

fn reform_lines(content: &Content, pathway: usize, show_evidence: bool, width: i32) -> Vec<Line> {
    let Some(p) = content.pathways.get(pathway) else { return Vec::new() };
    let Some(reform) = &p.reform else { return Vec::new() };
    let mut lines = vec![Line::bold("PATHWAY TO REFORM", kind_color(NodeKind::Reform))];
    paragraph(&mut lines, &format!("Bypassing: {}", p.nodes[1].title), width, DIM, 0);
    lines.push(Line::blank());
    heading(&mut lines, &reform.title, width, TEXT);
    if !reform.subtitle.is_empty() {
        paragraph(&mut lines, &reform.subtitle, width, DIM, 0);
    }
    lines.push(Line::blank());
    for para in &reform.explanation {
        paragraph(&mut lines, para, width, TEXT, 0);
        lines.push(Line::blank());
    }
    if evidence::has_evidence(reform) {
        let label = if show_evidence { "[e] Hide the evidence ▴" } else { "[e] See the evidence ▾" };
        lines.push(Line::button(label, LINK, Hit::ReformEvidenceToggle));
        if show_evidence {
            lines.push(Line::blank());
            for cta in evidence::ctas(reform) {
                if let Some((title, items)) = evidence::resolve(reform, cta.section) {
                    if let Some(title) = title {
                        heading(&mut lines, title, width, ACCENT);
                    }
                    push_evidence_items(&mut lines, items, width);
                }
            }
        }
    }
    lines
}

/// Jump list grouped by pathway. `revealed` dims entries past that count.
fn overview_lines(
    content: &Content,
    entries: &[Element],
    current: Element,
    revealed: Option<usize>,
    header: &str,
    width: i32,
) -> Vec<Line> {
    let pathways = content.pathway_count();
    let mut lines = vec![Line::bold("THE PATHWAYS", ACCENT)];
    paragraph(&mut lines, header, width, DIM, 0);
    let mut last_pathway = None;

    for &element in entries {
        let count = count_of(element, pathways);
        let Some(node) = content.node(element.node_ref()) else { continue };
        let seen = revealed.map_or(true, |c| count <= c);
        let fg = if seen { kind_color(node.kind) } else { FAINT };
        let marker = if element == current { "▶" } else { " " };

        if element.pathway() != last_pathway {
            lines.push(Line::blank());
            let group = match element.pathway() {
                Some(p) => content.pathway_label(p),
                None => "Outcome".to_string(),
            };
            lines.push(Line::bold(group, if seen { TEXT } else { FAINT }));
            last_pathway = element.pathway();
        }
        let line = match element {
            Element::Node { node: i, .. } => {
                Line::button(format!("{marker} {}. {}", i + 1, node.title), fg, Hit::OverviewEntry(count))
            }
            Element::Reform { pathway } => {
                Line::button(format!("{marker} ⚑ Reform: {}", node.title), fg, Hit::ReformFlag(pathway))
            }
            Element::Destination => {
                Line::button(format!("{marker} {}", node.title), fg, Hit::OverviewEntry(count))
            }
        };
        lines.push(line.indented(1));
    }
    lines
}

fn mobile_lines(content: &Content, nav: &LinearNavigator, width: i32) -> Vec<Line> {
    let element = nav.current();
    let node_ref = element.node_ref();
    let mut lines = Vec::new();
    let Some(node) = content.node(node_ref) else { return lines };
    let color = kind_color(node.kind);

    let group = match element.pathway() {
        Some(p) => content.pathway_label(p).to_uppercase(),
        None => "THE DESTINATION".to_string(),
    };
    lines.push(Line::bold(group, DIM));
    let position = match element {
        Element::Node { node: 2, .. } => "Impact Without Reform".to_string(),
        Element::Node { node, .. } => format!("Step {} of 3", node + 1),
        Element::Reform { .. } => "Impact With Reform".to_string(),
        Element::Destination => "Impact with Reforms".to_string(),
    };
    lines.push(Line::plain(position, color));
    lines.push(Line::blank());

    let category = if node.category.is_empty() { node.kind.legend() } else { node.category.as_str() };
    lines.push(Line::bold(category.to_uppercase(), color));
    heading(&mut lines, &node.title, width, TEXT);
    if !node.subtitle.is_empty() {
        paragraph(&mut lines, &node.subtitle, width, DIM, 0);
    }
    lines.push(Line::blank());

    let expanded = nav.is_expanded();
    let toggle = if expanded { "[−] Hide details" } else { "[+] Read more" };
    lines.push(Line::button(toggle, LINK, Hit::Node(node_ref)));
    if expanded {
        lines.push(Line::blank());
        lines.extend(panel_lines(node_ref, node, width));
    }
    if let Element::Reform { pathway } = element {
        lines.push(Line::blank());
        lines.push(Line::button("[⊕] Pathway to Reform details", color, Hit::ReformTrigger(pathway)));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Action;
    use crate::config::{AppConfig, LayoutMode};
    use crate::sim::overlay::ClickZone;
    use std::time::Instant;

    fn app(layout: LayoutMode, width: u16) -> App {
        let content = Content::embedded().unwrap();
        let config = AppConfig { layout, ..AppConfig::default() };
        App::new(content, config, width)
    }

    fn screen_text(r: &Renderer) -> String {
        (0..r.front.height).map(|y| r.front.row_text(y)).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn landing_offers_a_start_button() {
        let mut a = app(LayoutMode::Desktop, 120);
        let mut r = Renderer::with_size(120, 40);
        r.compose_settled(&mut a);
        assert!(r.layout().targets().any(|h| h == Hit::Start));
        let title = a.content.landing.title.clone();
        let head: String = title.chars().take(20).collect();
        assert!(screen_text(&r).contains(&head));
    }

    #[test]
    fn desktop_records_visible_nodes_only() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Desktop, 120);
        a.apply(Action::Continue, t0);
        a.apply(Action::Continue, t0);
        let mut r = Renderer::with_size(120, 40);
        r.compose_settled(&mut a);
        let layout = r.layout();
        use crate::sim::connector::Measure;
        assert!(layout.node_rect(NodeRef::Step { pathway: 0, node: 0 }).is_some());
        assert!(layout.node_rect(NodeRef::Step { pathway: 0, node: 1 }).is_some());
        assert!(layout.node_rect(NodeRef::Step { pathway: 0, node: 2 }).is_none());
        assert!(screen_text(&r).contains("Step 2 of 13"));
    }

    #[test]
    fn expanded_node_draws_an_inline_zone() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Desktop, 120);
        a.apply(Action::Continue, t0);
        a.apply(Action::ToggleFocused, t0);
        let mut r = Renderer::with_size(120, 40);
        r.compose_settled(&mut a);
        use crate::sim::connector::Measure;
        let node = r.layout().node_rect(NodeRef::Step { pathway: 0, node: 0 }).unwrap();
        assert_eq!(r.layout().zone(node.center()), ClickZone::InlinePanel);
        let below = Point::new(node.x + 2, node.bottom() + 2);
        assert_eq!(r.layout().zone(below), ClickZone::InlinePanel);
    }

    #[test]
    fn modal_hides_background_targets() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Desktop, 120);
        a.apply(Action::Continue, t0);
        a.apply(Action::Overview, t0);
        let mut r = Renderer::with_size(120, 40);
        r.compose_settled(&mut a);
        let targets: Vec<Hit> = r.layout().targets().collect();
        assert!(targets.contains(&Hit::CloseModal));
        assert!(!targets.contains(&Hit::Nav(NavButton::Continue)));
        assert!(targets.iter().any(|h| matches!(h, Hit::OverviewEntry(_))));
    }

    #[test]
    fn connector_draws_only_on_blank_cells() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Desktop, 120);
        a.apply(Action::Continue, t0);
        for _ in 0..4 {
            a.apply(Action::Continue, t0);
        }
        assert_eq!(a.count(), 5);
        let mut r = Renderer::with_size(120, 60);
        r.compose_settled(&mut a);
        assert!(a.measure_connectors(r.layout()));
        let paths = a.connector_paths().to_vec();
        assert_eq!(paths.len(), 1);
        let before = r.front.cells.clone();
        r.draw_connectors(&paths);
        let changed: Vec<usize> = (0..before.len()).filter(|&i| before[i] != r.front.cells[i]).collect();
        assert!(!changed.is_empty());
        assert!(changed.iter().all(|&i| before[i].is_blank()));
    }

    #[test]
    fn mobile_shows_position_and_swipe_bar() {
        let t0 = Instant::now();
        let mut a = app(LayoutMode::Mobile, 60);
        a.apply(Action::Continue, t0);
        let mut r = Renderer::with_size(60, 30);
        r.compose_settled(&mut a);
        let text = screen_text(&r);
        assert!(text.contains("1/13"));
        assert!(text.contains("Step 1 of 3"));
        let targets: Vec<Hit> = r.layout().targets().collect();
        assert!(targets.contains(&Hit::Nav(NavButton::Continue)));
        assert!(!targets.contains(&Hit::Nav(NavButton::Back)), "back is disabled on the first item");
    }
}
