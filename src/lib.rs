// ==================== Modules ====================
#[macro_use]
mod browser;
mod engine;
pub mod error;
pub mod registry;
pub mod sprite;

pub use error::{SpriteError, SpriteResult};
pub use registry::SpriteRegistry;
pub use sprite::{AnimationDriver, DriverEvent, SheetConfig};

use wasm_bindgen::prelude::*;

// ==================== Main Functions ====================
/// Main entry for the Webassembly module
/// - installs the panic hook once
/// - the host page then constructs a `SpriteRegistry` and attaches
///   drivers to its canvas elements
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();
    Ok(())
}
