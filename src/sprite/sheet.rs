use crate::engine::Rect;
use crate::error::{SpriteError, SpriteResult};
use serde::Deserialize;
use web_sys::HtmlImageElement;

/// Immutable sheet geometry and playback options, supplied once at
/// construction. Field names on the wire match the legacy options object
/// (`frameWidth`, `imgSrc`, `jumpFrame`, `loop`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    pub number_of_frames: usize,
    pub img_src: String,
    pub fps: f64,
    #[serde(rename = "loop", default = "default_loop")]
    pub looped: bool,
    #[serde(default)]
    pub jump_frame: Option<usize>,
    #[serde(default)]
    pub debug: bool,
}

fn default_loop() -> bool {
    true
}

impl SheetConfig {
    pub fn validate(&self) -> SpriteResult<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(SpriteError::InvalidConfig(
                "frame dimensions must be positive".into(),
            ));
        }
        if self.number_of_frames == 0 {
            return Err(SpriteError::InvalidConfig(
                "numberOfFrames must be at least 1".into(),
            ));
        }
        if !(self.fps > 0.0) {
            return Err(SpriteError::InvalidConfig("fps must be positive".into()));
        }
        if let Some(jump) = self.jump_frame {
            if jump >= self.number_of_frames {
                return Err(SpriteError::InvalidConfig(format!(
                    "jumpFrame {} is not a valid frame index (numberOfFrames = {})",
                    jump, self.number_of_frames
                )));
            }
        }
        Ok(())
    }
}

/// The decoded sheet image with its derived column count. Owned by exactly
/// one driver for its whole lifetime.
#[derive(Debug, Clone)]
pub struct LoadedSheet {
    pub image: HtmlImageElement,
    pub width: u32,
    pub height: u32,
    pub columns: u32,
}

impl LoadedSheet {
    /// A well-formed sheet is an exact grid of frames, so the image width
    /// must be a whole multiple of the frame width.
    pub fn new(image: HtmlImageElement, frame_width: u32) -> SpriteResult<Self> {
        let width = image.width();
        let height = image.height();
        if frame_width == 0 || width % frame_width != 0 {
            return Err(SpriteError::InvalidConfig(format!(
                "sheet width {} is not a multiple of frame width {}",
                width, frame_width
            )));
        }
        Ok(LoadedSheet {
            image,
            width,
            height,
            columns: width / frame_width,
        })
    }
}

/// Source rectangle for a frame in a sheet laid out left-to-right,
/// top-to-bottom. The legacy 1-based row/column scheme is reproduced
/// exactly: `col = (i+1) mod columns` (a result of 0 means the last
/// column), `row = ceil((i+1) / columns)`.
pub fn source_rect(frame_index: usize, columns: u32, frame_width: u32, frame_height: u32) -> Rect {
    let columns = columns.max(1) as usize;
    let mut col = (frame_index + 1) % columns;
    let row = (frame_index + columns) / columns; // ceil((i+1) / columns)
    if col == 0 {
        col = columns;
    }
    Rect {
        x: ((col - 1) as u32 * frame_width) as f32,
        y: ((row - 1) as u32 * frame_height) as f32,
        width: frame_width as f32,
        height: frame_height as f32,
    }
}
