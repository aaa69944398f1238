use crate::browser;
use anyhow::{anyhow, Error, Result};
use futures::channel::oneshot::channel;
use std::cell::RefCell;
use std::rc::Rc;
// unchecked_ref (unsafe) cast from Javascript type to Rust type
// - we control the closure creation and specify the expected type, so this
// is the usual wasm-bindgen callback wiring
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

const LABEL_FILL: &str = "#42C31F";
const LABEL_FONT: &str = "16px sans-serif";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Thin wrapper over the canvas 2d context exposing the drawing surface
/// operations the sprite component needs: clear-rect, scaled blit and the
/// debug text label.
pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(context: CanvasRenderingContext2d) -> Self {
        Renderer { context }
    }

    pub fn clear(&self, rect: &Rect) {
        self.context.clear_rect(
            rect.x.into(),
            rect.y.into(),
            rect.width.into(),
            rect.height.into(),
        );
    }

    pub fn draw_image(&self, image: &HtmlImageElement, frame: &Rect, destination: &Rect) {
        if let Err(err) = self
            .context
            .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                image,
                frame.x.into(),
                frame.y.into(),
                frame.width.into(),
                frame.height.into(),
                destination.x.into(),
                destination.y.into(),
                destination.width.into(),
                destination.height.into(),
            )
        {
            error!("sprite-animate: drawing failed : {:#?}", err);
        }
    }

    /// Debug frame-number label, bottom-left of the canvas.
    pub fn draw_label(&self, text: &str, x: f32, y: f32) {
        self.context.set_fill_style_str(LABEL_FILL);
        self.context.set_font(LABEL_FONT);
        if let Err(err) = self.context.fill_text(text, x.into(), y.into()) {
            error!("sprite-animate: label drawing failed : {:#?}", err);
        }
    }
}

/// Asynchronously decode an image from a source URL.
///
/// The only asynchronous boundary in the component: the browser's
/// `onload`/`onerror` callbacks are bridged onto a oneshot channel so the
/// caller can simply `.await` the decoded element.
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!("Error loading image: {:#?}", err)));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callbacks alive until the image loads or errors
    success_callback.forget();
    error_callback.forget();

    // double ? because the channel yields Result<Result<(), Error>, Canceled>
    rx.await??;

    Ok(image)
}
