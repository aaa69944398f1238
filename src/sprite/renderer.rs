use crate::browser;
use crate::engine::{Rect, Renderer};
use crate::sprite::sheet::{self, LoadedSheet, SheetConfig};
use anyhow::Result;
use web_sys::HtmlCanvasElement;

/// Paints single frames of a loaded sheet onto the canvas. The canvas
/// intrinsic size is fixed to one frame at construction; every repaint
/// clears it fully before blitting to avoid ghosting.
pub struct SpriteRenderer {
    renderer: Renderer,
    sheet: LoadedSheet,
    frame_width: u32,
    frame_height: u32,
    debug: bool,
}

impl SpriteRenderer {
    pub fn new(canvas: &HtmlCanvasElement, config: &SheetConfig, sheet: LoadedSheet) -> Result<Self> {
        canvas.set_width(config.frame_width);
        canvas.set_height(config.frame_height);
        Ok(SpriteRenderer {
            renderer: Renderer::new(browser::context_2d(canvas)?),
            sheet,
            frame_width: config.frame_width,
            frame_height: config.frame_height,
            debug: config.debug,
        })
    }

    pub fn render(&self, frame_index: usize) {
        let destination = Rect {
            x: 0.0,
            y: 0.0,
            width: self.frame_width as f32,
            height: self.frame_height as f32,
        };
        self.renderer.clear(&destination);

        let source = sheet::source_rect(
            frame_index,
            self.sheet.columns,
            self.frame_width,
            self.frame_height,
        );
        self.renderer
            .draw_image(&self.sheet.image, &source, &destination);

        if self.debug {
            // 1-based label, matching what an animator counts in the sheet
            self.renderer.draw_label(
                &format!("Frame: {}", frame_index + 1),
                10.0,
                self.frame_height as f32 - 10.0,
            );
        }
    }
}
