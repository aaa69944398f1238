use crate::error::{SpriteError, SpriteResult};
use crate::sprite::driver::{AnimationDriver, DriverEvent};
use crate::sprite::sheet::SheetConfig;
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

struct Entry {
    element: HtmlCanvasElement,
    driver: AnimationDriver,
}

/// Explicit element → driver mapping owned by whoever manages page-level
/// component lifecycles. At most one driver per element; re-attaching
/// returns the existing instance.
#[wasm_bindgen]
#[derive(Default)]
pub struct SpriteRegistry {
    entries: Vec<Entry>,
}

impl SpriteRegistry {
    pub fn attach(
        &mut self,
        element: &HtmlCanvasElement,
        config: SheetConfig,
    ) -> SpriteResult<&AnimationDriver> {
        let index = match self.position(element) {
            Some(existing) => existing,
            None => {
                let driver = AnimationDriver::new(element.clone(), config)?;
                self.entries.push(Entry {
                    element: element.clone(),
                    driver,
                });
                self.entries.len() - 1
            }
        };
        Ok(&self.entries[index].driver)
    }

    /// Dispatch a named public operation on the element's driver. The
    /// match below is the single source of what is dispatchable; the
    /// attach operation and any name carrying the internal-only `_`
    /// prefix are rejected outright.
    pub fn invoke(
        &mut self,
        element: &HtmlCanvasElement,
        operation: &str,
        args: &js_sys::Array,
    ) -> SpriteResult<JsValue> {
        if operation.starts_with('_') || operation == "attach" {
            return Err(SpriteError::UnknownOperation(operation.to_string()));
        }
        let position = self.position(element).ok_or(SpriteError::NoInstance)?;
        let driver = &self.entries[position].driver;
        match operation {
            "play" => driver.play().map(|_| JsValue::UNDEFINED),
            "pause" => driver.pause().map(|_| JsValue::UNDEFINED),
            "restart" => driver.restart().map(|_| JsValue::UNDEFINED),
            "goTo" => {
                let index = args.get(0).as_f64().ok_or_else(|| {
                    SpriteError::InvalidArgument("goTo expects a numeric frame index".into())
                })?;
                driver.go_to(index).map(|_| JsValue::UNDEFINED)
            }
            "getIndex" => driver.index().map(|index| JsValue::from(index as f64)),
            "destroy" => {
                let result = driver.destroy();
                self.entries.remove(position);
                result.map(|_| JsValue::UNDEFINED)
            }
            other => Err(SpriteError::UnknownOperation(other.to_string())),
        }
    }

    /// Remove the association, destroying the driver. A driver that was
    /// already destroyed through `invoke` is still detached cleanly.
    pub fn detach(&mut self, element: &HtmlCanvasElement) -> SpriteResult<()> {
        let position = self.position(element).ok_or(SpriteError::NoInstance)?;
        let entry = self.entries.remove(position);
        match entry.driver.destroy() {
            Ok(()) | Err(SpriteError::AlreadyDestroyed) => Ok(()),
            Err(other) => Err(other),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, element: &HtmlCanvasElement) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.element == *element)
    }
}

/// Host-page boundary. Nothing here throws into the page: every failure
/// is logged to the console and degrades to a no-op, per the component's
/// error policy.
#[wasm_bindgen]
impl SpriteRegistry {
    #[wasm_bindgen(constructor)]
    pub fn new() -> SpriteRegistry {
        SpriteRegistry::default()
    }

    #[wasm_bindgen(js_name = attach)]
    pub fn attach_js(&mut self, element: HtmlCanvasElement, options: JsValue) {
        let config: SheetConfig = match serde_wasm_bindgen::from_value(options.clone()) {
            Ok(config) => config,
            Err(err) => {
                error!("sprite-animate: {}", SpriteError::InvalidConfig(err.to_string()));
                return;
            }
        };
        match self.attach(&element, config) {
            Ok(driver) => {
                // legacy construction surface: onReady/onFinish callbacks
                // ride along on the options object
                register_option_callback(driver, &options, "onReady", DriverEvent::Ready);
                register_option_callback(driver, &options, "onFinish", DriverEvent::Ended);
            }
            Err(err) => error!("sprite-animate: {}", err),
        }
    }

    #[wasm_bindgen(js_name = invoke)]
    pub fn invoke_js(
        &mut self,
        element: HtmlCanvasElement,
        operation: String,
        args: js_sys::Array,
    ) -> JsValue {
        match self.invoke(&element, &operation, &args) {
            Ok(value) => value,
            Err(err) => {
                error!("sprite-animate: {}", err);
                JsValue::UNDEFINED
            }
        }
    }

    #[wasm_bindgen(js_name = detach)]
    pub fn detach_js(&mut self, element: HtmlCanvasElement) {
        if let Err(err) = self.detach(&element) {
            error!("sprite-animate: {}", err);
        }
    }
}

fn register_option_callback(
    driver: &AnimationDriver,
    options: &JsValue,
    property: &str,
    event: DriverEvent,
) {
    let Ok(value) = js_sys::Reflect::get(options, &JsValue::from_str(property)) else {
        return;
    };
    if let Ok(callback) = value.dyn_into::<js_sys::Function>() {
        if let Err(err) = driver.on_event(event, callback) {
            error!("sprite-animate: {}", err);
        }
    }
}
