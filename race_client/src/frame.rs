//! Frame composition.
//!
//! Turns the active scene into backend draw calls. Hidden drawables are
//! skipped here; they stay in their pools.

use race_shared::{
    palette::{self, Rgb},
    render::{Drawable, RenderBackend, TextItem},
    viewport::Viewport,
};
use tracing::debug;

use crate::scene::Scene;

pub fn render_scene(scene: &Scene, vp: &Viewport, out: &mut dyn RenderBackend) {
    out.begin_frame(palette::BACKGROUND);
    let texts = match scene {
        Scene::Menu(s) => s.text_items(vp),
        Scene::Lobby(s) => s.text_items(vp),
        Scene::Result(s) => s.text_items(vp),
        Scene::Race(s) => {
            for d in s.view().backdrop() {
                out.draw(&d);
            }
            for d in s.view().drawables().filter(|d| d.visible) {
                out.draw(d);
            }
            s.hud().text_items()
        }
    };
    for t in &texts {
        out.draw_text(t);
    }
    out.end_frame();
}

/// Headless backend for the console client: counts what was drawn and
/// keeps the text of the last frame.
#[derive(Debug, Default)]
pub struct TraceRenderer {
    frames: u64,
    drawn: usize,
    lines: Vec<String>,
    last_lines: Vec<String>,
}

impl TraceRenderer {
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Drawables in the last completed frame.
    pub fn drawn(&self) -> usize {
        self.drawn
    }

    /// Text of the last completed frame, top to bottom.
    pub fn lines(&self) -> &[String] {
        &self.last_lines
    }
}

impl RenderBackend for TraceRenderer {
    fn begin_frame(&mut self, _background: Rgb) {
        self.drawn = 0;
        self.lines.clear();
    }

    fn draw(&mut self, _drawable: &Drawable) {
        self.drawn += 1;
    }

    fn draw_text(&mut self, text: &TextItem) {
        self.lines.push(text.text.clone());
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        std::mem::swap(&mut self.lines, &mut self.last_lines);
        if self.frames % 300 == 0 {
            debug!(frames = self.frames, drawn = self.drawn, "Frame");
        }
    }
}
