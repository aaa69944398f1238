//! Browser-mode tests for the registry and driver surfaces. The pure
//! timing and geometry logic is covered by native unit tests next to the
//! modules; everything here needs a real DOM.

#![cfg(target_arch = "wasm32")]

use sprite_animate::{AnimationDriver, DriverEvent, SheetConfig, SpriteError, SpriteRegistry};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::HtmlCanvasElement;

wasm_bindgen_test_configure!(run_in_browser);

/// A 1x1 PNG; with a 1x1 frame it forms a legal single-frame sheet that
/// decodes without any fixture file.
const PIXEL_SHEET: &str = "data:image/png;base64,\
iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn canvas() -> HtmlCanvasElement {
    web_sys::window()
        .unwrap()
        .document()
        .unwrap()
        .create_element("canvas")
        .unwrap()
        .dyn_into()
        .unwrap()
}

fn config() -> SheetConfig {
    SheetConfig {
        frame_width: 50,
        frame_height: 50,
        number_of_frames: 8,
        img_src: "walk.png".into(),
        fps: 24.0,
        looped: true,
        jump_frame: None,
        debug: false,
    }
}

fn pixel_config(looped: bool) -> SheetConfig {
    SheetConfig {
        frame_width: 1,
        frame_height: 1,
        number_of_frames: 1,
        img_src: PIXEL_SHEET.into(),
        fps: 240.0,
        looped,
        jump_frame: None,
        debug: false,
    }
}

/// Resolves once the driver raises the given event.
async fn wait_for(driver: &AnimationDriver, event: DriverEvent) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        driver.on_event(event, resolve).unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

/// Lets the given number of display refreshes go by.
async fn next_frames(count: u32) {
    for _ in 0..count {
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            web_sys::window()
                .unwrap()
                .request_animation_frame(&resolve)
                .unwrap();
        });
        JsFuture::from(promise).await.unwrap();
    }
}

fn counting_listener() -> (Rc<Cell<u32>>, js_sys::Function) {
    let count = Rc::new(Cell::new(0));
    let seen = count.clone();
    let closure = Closure::wrap(Box::new(move || seen.set(seen.get() + 1)) as Box<dyn FnMut()>);
    let function = closure.as_ref().unchecked_ref::<js_sys::Function>().clone();
    closure.forget();
    (count, function)
}

fn options_object() -> js_sys::Object {
    let options = js_sys::Object::new();
    for (key, value) in [
        ("frameWidth", 50.0),
        ("frameHeight", 50.0),
        ("numberOfFrames", 8.0),
        ("fps", 24.0),
    ] {
        js_sys::Reflect::set(&options, &key.into(), &value.into()).unwrap();
    }
    js_sys::Reflect::set(&options, &"imgSrc".into(), &"walk.png".into()).unwrap();
    options
}

#[wasm_bindgen_test]
fn attach_is_idempotent_per_element() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();

    let first = registry.attach(&element, config()).unwrap().clone();
    let second = registry.attach(&element, config()).unwrap().clone();

    assert!(first.ptr_eq(&second));
    assert_eq!(registry.len(), 1);
}

#[wasm_bindgen_test]
fn attach_rejects_invalid_configuration() {
    let mut registry = SpriteRegistry::new();
    let mut bad = config();
    bad.number_of_frames = 0;

    assert!(matches!(
        registry.attach(&canvas(), bad),
        Err(SpriteError::InvalidConfig(_))
    ));
    assert!(registry.is_empty());
}

#[wasm_bindgen_test]
fn invoke_without_an_instance_is_no_instance() {
    let mut registry = SpriteRegistry::new();
    let result = registry.invoke(&canvas(), "play", &js_sys::Array::new());
    assert_eq!(result, Err(SpriteError::NoInstance));
}

#[wasm_bindgen_test]
fn invoke_rejects_unknown_and_internal_operations() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    registry.attach(&element, config()).unwrap();

    for operation in ["bogus", "_stopAnimationLoop", "attach", "init"] {
        assert!(matches!(
            registry.invoke(&element, operation, &js_sys::Array::new()),
            Err(SpriteError::UnknownOperation(_))
        ));
    }
}

#[wasm_bindgen_test]
fn go_to_rejects_non_integer_input_before_touching_state() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    let driver = registry.attach(&element, config()).unwrap().clone();

    assert!(matches!(
        driver.go_to(1.5),
        Err(SpriteError::InvalidArgument(_))
    ));
    assert!(matches!(
        driver.go_to(f64::NAN),
        Err(SpriteError::InvalidArgument(_))
    ));
}

#[wasm_bindgen_test]
fn operations_needing_a_decoded_sheet_report_not_ready_while_loading() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    let driver = registry.attach(&element, config()).unwrap().clone();

    // the decode has not resolved by the time these run
    assert_eq!(driver.index(), Err(SpriteError::NotReady));
    assert_eq!(driver.go_to(2.0), Err(SpriteError::NotReady));
    // play is a documented no-op while loading
    assert_eq!(driver.play(), Ok(()));
}

#[wasm_bindgen_test]
fn destroy_is_terminal_and_idempotent() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    let driver = registry.attach(&element, config()).unwrap().clone();

    assert_eq!(driver.destroy(), Ok(()));
    assert!(driver.is_destroyed());

    assert_eq!(driver.destroy(), Err(SpriteError::AlreadyDestroyed));
    assert_eq!(driver.play(), Err(SpriteError::AlreadyDestroyed));
    assert_eq!(driver.pause(), Err(SpriteError::AlreadyDestroyed));
    assert_eq!(driver.index(), Err(SpriteError::AlreadyDestroyed));
}

#[wasm_bindgen_test]
fn detach_destroys_the_driver_and_removes_the_entry() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    let driver = registry.attach(&element, config()).unwrap().clone();

    assert_eq!(registry.detach(&element), Ok(()));
    assert!(driver.is_destroyed());
    assert!(registry.is_empty());

    assert_eq!(registry.detach(&element), Err(SpriteError::NoInstance));
}

#[wasm_bindgen_test]
fn detach_tolerates_a_driver_destroyed_through_invoke() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    let driver = registry.attach(&element, config()).unwrap().clone();

    driver.destroy().unwrap();
    // the entry is still present; detach cleans it up without error
    assert_eq!(registry.detach(&element), Ok(()));
}

#[wasm_bindgen_test]
fn invoke_destroy_removes_the_entry() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    registry.attach(&element, config()).unwrap();

    registry
        .invoke(&element, "destroy", &js_sys::Array::new())
        .unwrap();
    assert!(registry.is_empty());
    assert_eq!(
        registry.invoke(&element, "play", &js_sys::Array::new()),
        Err(SpriteError::NoInstance)
    );
}

#[wasm_bindgen_test]
async fn ready_fires_once_after_the_first_paint() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    let driver = registry.attach(&element, pixel_config(true)).unwrap().clone();
    let (ready_count, listener) = counting_listener();
    driver.on_event(DriverEvent::Ready, listener).unwrap();

    wait_for(&driver, DriverEvent::Ready).await;
    assert_eq!(driver.index(), Ok(0));
    assert!(element.class_list().contains("loaded"));

    // the notification is one-shot; later refreshes must not repeat it
    next_frames(3).await;
    assert_eq!(ready_count.get(), 1);
}

#[wasm_bindgen_test]
async fn non_looping_playback_ends_exactly_once_and_stops_ticking() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    let driver = registry
        .attach(&element, pixel_config(false))
        .unwrap()
        .clone();
    let (ended_count, listener) = counting_listener();
    driver.on_event(DriverEvent::Ended, listener).unwrap();

    wait_for(&driver, DriverEvent::Ready).await;
    driver.play().unwrap();
    wait_for(&driver, DriverEvent::Ended).await;

    // the subscription is cancelled; nothing may re-emit
    next_frames(4).await;
    assert_eq!(ended_count.get(), 1);
    assert_eq!(driver.index(), Ok(0));
}

#[wasm_bindgen_test]
async fn restart_reestablishes_the_subscription_after_finished() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    let driver = registry
        .attach(&element, pixel_config(false))
        .unwrap()
        .clone();
    let (ended_count, listener) = counting_listener();
    driver.on_event(DriverEvent::Ended, listener).unwrap();

    wait_for(&driver, DriverEvent::Ready).await;
    driver.play().unwrap();
    wait_for(&driver, DriverEvent::Ended).await;

    driver.restart().unwrap();
    wait_for(&driver, DriverEvent::Ended).await;
    assert_eq!(ended_count.get(), 2);
}

#[wasm_bindgen_test]
async fn destroy_cancels_the_subscription_mid_playback() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    let driver = registry
        .attach(&element, pixel_config(false))
        .unwrap()
        .clone();
    let (ended_count, listener) = counting_listener();
    driver.on_event(DriverEvent::Ended, listener).unwrap();

    wait_for(&driver, DriverEvent::Ready).await;
    driver.play().unwrap();
    driver.destroy().unwrap();

    // no tick may run against the destroyed driver
    next_frames(4).await;
    assert_eq!(ended_count.get(), 0);
    assert!(driver.is_destroyed());
}

#[wasm_bindgen_test]
async fn reattach_after_ready_keeps_one_driver_and_one_subscription() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();
    let first = registry
        .attach(&element, pixel_config(false))
        .unwrap()
        .clone();
    let (ended_count, listener) = counting_listener();
    first.on_event(DriverEvent::Ended, listener).unwrap();

    wait_for(&first, DriverEvent::Ready).await;
    let second = registry
        .attach(&element, pixel_config(false))
        .unwrap()
        .clone();
    assert!(first.ptr_eq(&second));

    first.play().unwrap();
    wait_for(&first, DriverEvent::Ended).await;
    // a duplicate subscription would keep ticking and re-emit
    next_frames(3).await;
    assert_eq!(ended_count.get(), 1);
}

#[wasm_bindgen_test]
fn options_parse_with_legacy_defaults() {
    let parsed: SheetConfig = serde_wasm_bindgen::from_value(options_object().into()).unwrap();
    assert!(parsed.looped);
    assert!(!parsed.debug);
    assert_eq!(parsed.jump_frame, None);
    assert_eq!(parsed.number_of_frames, 8);
    assert_eq!(parsed.img_src, "walk.png");
}

#[wasm_bindgen_test]
fn options_parse_honors_explicit_values() {
    let options = options_object();
    js_sys::Reflect::set(&options, &"loop".into(), &false.into()).unwrap();
    js_sys::Reflect::set(&options, &"jumpFrame".into(), &3.0.into()).unwrap();
    js_sys::Reflect::set(&options, &"debug".into(), &true.into()).unwrap();

    let parsed: SheetConfig = serde_wasm_bindgen::from_value(options.into()).unwrap();
    assert!(!parsed.looped);
    assert!(parsed.debug);
    assert_eq!(parsed.jump_frame, Some(3));
}

#[wasm_bindgen_test]
fn the_js_boundary_swallows_failures_instead_of_throwing() {
    let mut registry = SpriteRegistry::new();
    let element = canvas();

    // malformed options: logged, nothing attached
    registry.attach_js(element.clone(), JsValue::from_str("not an object"));
    assert!(registry.is_empty());

    // dispatch against a bare element: logged, returns undefined
    let result = registry.invoke_js(element.clone(), "play".into(), js_sys::Array::new());
    assert!(result.is_undefined());

    registry.detach_js(element);
}
