//! The sprite-sheet animation component, leaves first:
//! - `clock`    : pure timing state machine (frame advancement policy)
//! - `sheet`    : sheet configuration, decoded-sheet geometry, source rects
//! - `renderer` : paints one frame of the sheet onto the canvas
//! - `driver`   : per-element controller tying clock and renderer to a
//!                frame-sync subscription

pub mod clock;
pub mod driver;
pub mod renderer;
pub mod sheet;

pub use clock::{FrameClock, Tick};
pub use driver::{AnimationDriver, DriverEvent};
pub use renderer::SpriteRenderer;
pub use sheet::{LoadedSheet, SheetConfig};
