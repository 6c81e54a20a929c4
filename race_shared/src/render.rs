//! Rendering abstraction.
//!
//! This crate intentionally does not depend on a graphics backend. Scenes
//! produce plain drawable records and text lines; a backend consumes them.

use crate::{math::ScreenPos, palette::Rgb};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rect { width: f32, height: f32 },
    Circle { radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outline {
    pub width: f32,
    pub color: Rgb,
}

/// One on-screen primitive, positioned by its centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub shape: Shape,
    pub fill: Rgb,
    pub pos: ScreenPos,
    pub visible: bool,
    pub alpha: f32,
    pub outline: Option<Outline>,
}

impl Drawable {
    pub fn new(shape: Shape, fill: Rgb) -> Self {
        Self {
            shape,
            fill,
            pos: ScreenPos::default(),
            visible: true,
            alpha: 1.0,
            outline: None,
        }
    }
}

/// A line of text anchored at a screen position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub pos: ScreenPos,
    pub color: Rgb,
}

impl TextItem {
    pub fn new(text: impl Into<String>, pos: ScreenPos, color: Rgb) -> Self {
        Self {
            text: text.into(),
            pos,
            color,
        }
    }
}

/// A minimal rendering API.
pub trait RenderBackend: Send {
    fn begin_frame(&mut self, background: Rgb);
    fn draw(&mut self, drawable: &Drawable);
    fn draw_text(&mut self, text: &TextItem);
    fn end_frame(&mut self);
}

/// A no-op renderer useful for headless tests.
#[derive(Default)]
pub struct NullRenderer;

impl RenderBackend for NullRenderer {
    fn begin_frame(&mut self, _background: Rgb) {}
    fn draw(&mut self, _drawable: &Drawable) {}
    fn draw_text(&mut self, _text: &TextItem) {}
    fn end_frame(&mut self) {}
}
