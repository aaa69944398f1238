use crate::browser::{self, LoopClosure};
use crate::engine;
use crate::error::{SpriteError, SpriteResult};
use crate::sprite::clock::FrameClock;
use crate::sprite::renderer::SpriteRenderer;
use crate::sprite::sheet::{LoadedSheet, SheetConfig};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Event, HtmlCanvasElement, KeyboardEvent};

/// Notifications a driver raises towards the host page.
///
/// `Ended` is deliberately a dual signal: listeners registered here fire
/// alongside a DOM `ended` event dispatched on the element, matching the
/// legacy surface where `onFinish` and the DOM event were both emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    /// First frame painted and the tick subscription is live.
    Ready,
    /// Non-looping playback reached the last frame; the subscription has
    /// been cancelled and the driver needs `restart()` to play again.
    Ended,
}

impl DriverEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DriverEvent::Ready => "ready",
            DriverEvent::Ended => "ended",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ready" => Some(DriverEvent::Ready),
            "ended" => Some(DriverEvent::Ended),
            _ => None,
        }
    }
}

/// Driver lifecycle. `Failed` replaces the legacy behavior of hanging in
/// `Loading` forever when the image never decodes.
enum Playback {
    Loading,
    Ready {
        clock: FrameClock,
        renderer: SpriteRenderer,
        paused: bool,
    },
    Failed,
    Destroyed,
}

struct Inner {
    element: HtmlCanvasElement,
    config: SheetConfig,
    playback: Playback,
    /// Handle of the pending frame-sync registration, None when cancelled.
    raf_id: Option<i32>,
    loop_closure: Option<LoopClosure>,
    listeners: Vec<(DriverEvent, js_sys::Function)>,
    keydown: Option<Closure<dyn FnMut(KeyboardEvent)>>,
    /// Emit `Ready` on the next tick after the first paint.
    pending_ready: bool,
}

/// Per-element animation controller: one frame clock and one sprite
/// renderer behind a continuous `requestAnimationFrame` subscription.
///
/// Cheap to clone; clones are handles onto the same instance.
#[derive(Clone)]
pub struct AnimationDriver {
    inner: Rc<RefCell<Inner>>,
}

impl AnimationDriver {
    /// Begins the asynchronous image decode immediately. The driver stays
    /// in `Loading` until the decode resolves, then paints frame 0, adds
    /// the `loaded` class to the element and starts ticking (paused).
    pub fn new(element: HtmlCanvasElement, config: SheetConfig) -> SpriteResult<Self> {
        config.validate()?;
        let inner = Rc::new(RefCell::new(Inner {
            element,
            config,
            playback: Playback::Loading,
            raf_id: None,
            loop_closure: None,
            listeners: Vec::new(),
            keydown: None,
            pending_ready: false,
        }));

        let loading = inner.clone();
        browser::spawn_local(async move {
            let source = loading.borrow().config.img_src.clone();
            match engine::load_image(&source).await {
                Ok(image) => {
                    if let Err(err) = Inner::finish_loading(&loading, image) {
                        error!("sprite-animate: {:#}", err);
                        Inner::mark_failed(&loading);
                    }
                }
                Err(err) => {
                    error!(
                        "sprite-animate: could not decode '{}' : {:#}",
                        source, err
                    );
                    Inner::mark_failed(&loading);
                }
            }
        });

        Ok(AnimationDriver { inner })
    }

    pub fn play(&self) -> SpriteResult<()> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        match &mut inner.playback {
            Playback::Ready { paused, .. } => {
                *paused = false;
                Ok(())
            }
            // nothing to play yet; the decode continuation leaves the
            // driver paused and the host calls play again
            Playback::Loading => Ok(()),
            Playback::Failed => Err(SpriteError::ImageDecodeFailure(inner.config.img_src.clone())),
            Playback::Destroyed => Err(SpriteError::AlreadyDestroyed),
        }
    }

    pub fn pause(&self) -> SpriteResult<()> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        match &mut inner.playback {
            Playback::Ready { paused, .. } => {
                *paused = true;
                Ok(())
            }
            Playback::Loading => Ok(()),
            Playback::Failed => Err(SpriteError::ImageDecodeFailure(inner.config.img_src.clone())),
            Playback::Destroyed => Err(SpriteError::AlreadyDestroyed),
        }
    }

    /// Back to frame 0, immediate repaint, and the tick subscription is
    /// re-established in case a prior `finished` cancelled it.
    pub fn restart(&self) -> SpriteResult<()> {
        {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            match &mut inner.playback {
                Playback::Ready {
                    clock, renderer, ..
                } => {
                    clock.reset();
                    if let Some(frame) = clock.take_pending_frame() {
                        renderer.render(frame);
                    }
                }
                Playback::Loading => return Err(SpriteError::NotReady),
                Playback::Failed => {
                    return Err(SpriteError::ImageDecodeFailure(inner.config.img_src.clone()))
                }
                Playback::Destroyed => return Err(SpriteError::AlreadyDestroyed),
            }
        }
        if let Err(err) = Inner::start_loop(&self.inner) {
            error!("sprite-animate: could not restart animation loop : {:#}", err);
        }
        Ok(())
    }

    /// Seek to a frame supplied by the host. Rejects non-integer numbers
    /// before touching any state, then range-checks against the sheet.
    pub fn go_to(&self, index: f64) -> SpriteResult<()> {
        if !index.is_finite() || index.fract() != 0.0 {
            return Err(SpriteError::InvalidArgument(format!(
                "goTo expects an integer frame index, got {}",
                index
            )));
        }
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        match &mut inner.playback {
            Playback::Ready {
                clock, renderer, ..
            } => {
                if index < 0.0 {
                    return Err(SpriteError::InvalidFrameIndex(index));
                }
                clock.seek_to(index as usize)?;
                if let Some(frame) = clock.take_pending_frame() {
                    renderer.render(frame);
                }
                Ok(())
            }
            Playback::Loading => Err(SpriteError::NotReady),
            Playback::Failed => Err(SpriteError::ImageDecodeFailure(inner.config.img_src.clone())),
            Playback::Destroyed => Err(SpriteError::AlreadyDestroyed),
        }
    }

    pub fn index(&self) -> SpriteResult<usize> {
        let guard = self.inner.borrow();
        match &guard.playback {
            Playback::Ready { clock, .. } => Ok(clock.current_frame()),
            Playback::Loading => Err(SpriteError::NotReady),
            Playback::Failed => Err(SpriteError::ImageDecodeFailure(guard.config.img_src.clone())),
            Playback::Destroyed => Err(SpriteError::AlreadyDestroyed),
        }
    }

    /// Cancels the frame-sync subscription *before* releasing the sheet
    /// and playback state, so no tick can run against freed state. Every
    /// later public call reports `AlreadyDestroyed`.
    pub fn destroy(&self) -> SpriteResult<()> {
        let mut guard = self.inner.borrow_mut();
        if matches!(guard.playback, Playback::Destroyed) {
            return Err(SpriteError::AlreadyDestroyed);
        }
        guard.stop_loop();
        guard.loop_closure = None;
        if let Some(closure) = guard.keydown.take() {
            let _ = guard
                .element
                .remove_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        }
        guard.listeners.clear();
        guard.pending_ready = false;
        guard.playback = Playback::Destroyed;
        Ok(())
    }

    /// Register a host callback for `ready` or `ended`.
    pub fn on_event(&self, event: DriverEvent, callback: js_sys::Function) -> SpriteResult<()> {
        let mut guard = self.inner.borrow_mut();
        if matches!(guard.playback, Playback::Destroyed) {
            return Err(SpriteError::AlreadyDestroyed);
        }
        guard.listeners.push((event, callback));
        Ok(())
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.inner.borrow().playback, Playback::Destroyed)
    }

    /// Handle identity; `attach` idempotence hands out the same instance.
    pub fn ptr_eq(&self, other: &AnimationDriver) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Inner {
    /// Continuation of the image decode: builds the sheet, clock and
    /// renderer, paints frame 0 and starts the tick subscription. A driver
    /// destroyed while the decode was in flight is left alone.
    fn finish_loading(inner: &Rc<RefCell<Inner>>, image: web_sys::HtmlImageElement) -> anyhow::Result<()> {
        {
            let mut guard = inner.borrow_mut();
            if matches!(guard.playback, Playback::Destroyed) {
                return Ok(());
            }
            let sheet = LoadedSheet::new(image, guard.config.frame_width)?;
            let renderer = SpriteRenderer::new(&guard.element, &guard.config, sheet)?;
            let mut clock = FrameClock::new(&guard.config, browser::now()?);
            if let Some(frame) = clock.take_pending_frame() {
                renderer.render(frame);
            }
            let _ = guard.element.class_list().add_1("loaded");
            guard.playback = Playback::Ready {
                clock,
                renderer,
                paused: true,
            };
            guard.pending_ready = true;
        }
        if inner.borrow().config.debug {
            // stepping is an inspection aid; losing it is not fatal
            if let Err(err) = Inner::install_debug_bindings(inner) {
                error!("sprite-animate: {:#}", err);
            }
        }
        Inner::start_loop(inner)
    }

    /// A decode that resolves after `destroy()` must not resurrect state.
    fn mark_failed(inner: &Rc<RefCell<Inner>>) {
        let mut guard = inner.borrow_mut();
        if !matches!(guard.playback, Playback::Destroyed) {
            guard.playback = Playback::Failed;
        }
    }

    /// Establishes the self-rescheduling frame-sync subscription. The
    /// closure holds only a weak reference, so a dropped driver cannot be
    /// resurrected by a stray tick. No-op when a subscription is live.
    fn start_loop(inner: &Rc<RefCell<Inner>>) -> anyhow::Result<()> {
        if inner.borrow().raf_id.is_some() {
            return Ok(());
        }
        let weak = Rc::downgrade(inner);
        let closure = browser::create_raf_closure(move |now: f64| {
            Inner::tick(&weak, now);
        });
        let mut guard = inner.borrow_mut();
        guard.raf_id = Some(browser::request_animation_frame(&closure)?);
        guard.loop_closure = Some(closure);
        Ok(())
    }

    /// One display-refresh tick. Re-registers at the top so cancellation
    /// takes effect at the next opportunity, then runs the clock if the
    /// driver is playing. Events fire only after the borrow is released.
    fn tick(weak: &Weak<RefCell<Inner>>, now: f64) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut events: Vec<DriverEvent> = Vec::new();
        {
            let mut guard = inner.borrow_mut();
            // cancelled cooperatively between registration and callback
            if guard.raf_id.is_none() {
                return;
            }
            match guard.loop_closure.as_ref().map(browser::request_animation_frame) {
                Some(Ok(id)) => guard.raf_id = Some(id),
                Some(Err(err)) => {
                    error!("sprite-animate: lost animation loop : {:#}", err);
                    guard.raf_id = None;
                }
                None => return,
            }

            if guard.pending_ready {
                guard.pending_ready = false;
                events.push(DriverEvent::Ready);
            }

            let mut finished = false;
            if let Playback::Ready {
                clock,
                renderer,
                paused,
            } = &mut guard.playback
            {
                // the subscription stays warm while paused
                if !*paused {
                    let tick = clock.update(now);
                    if tick.advanced {
                        if let Some(frame) = clock.take_pending_frame() {
                            renderer.render(frame);
                        }
                    }
                    finished = tick.finished;
                }
            }
            if finished {
                guard.stop_loop();
                events.push(DriverEvent::Ended);
            }
        }
        for event in events {
            Inner::emit(&inner, event);
        }
    }

    fn stop_loop(&mut self) {
        if let Some(id) = self.raf_id.take() {
            if let Err(err) = browser::cancel_animation_frame(id) {
                error!("sprite-animate: {:#}", err);
            }
        }
    }

    /// Invoke registered listeners and, for `Ended`, dispatch the DOM
    /// event on the element. Callbacks run without any interior borrow
    /// held, so they may call straight back into the driver.
    fn emit(inner: &Rc<RefCell<Inner>>, event: DriverEvent) {
        let (element, callbacks): (HtmlCanvasElement, Vec<js_sys::Function>) = {
            let guard = inner.borrow();
            (
                guard.element.clone(),
                guard
                    .listeners
                    .iter()
                    .filter(|(kind, _)| *kind == event)
                    .map(|(_, callback)| callback.clone())
                    .collect(),
            )
        };

        if event == DriverEvent::Ended {
            match Event::new(event.name()) {
                Ok(dom_event) => {
                    let _ = element.dispatch_event(&dom_event);
                }
                Err(err) => error!("sprite-animate: could not build ended event : {:#?}", err),
            }
        }

        for callback in callbacks {
            if let Err(err) = callback.call0(&wasm_bindgen::JsValue::NULL) {
                error!(
                    "sprite-animate: '{}' listener threw : {:#?}",
                    event.name(),
                    err
                );
            }
        }
    }

    /// Debug stepping scoped to this driver's own element rather than the
    /// document, so multiple debug-enabled instances cannot race over one
    /// shared handler. The canvas gets a tabindex so it can take focus.
    fn install_debug_bindings(inner: &Rc<RefCell<Inner>>) -> anyhow::Result<()> {
        let weak = Rc::downgrade(inner);
        let closure = browser::closure_wrap(Box::new(move |event: KeyboardEvent| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut guard = inner.borrow_mut();
            match event.key().as_str() {
                "ArrowRight" => Inner::step(&mut guard, true),
                "ArrowLeft" => Inner::step(&mut guard, false),
                _ => {}
            }
        }) as Box<dyn FnMut(KeyboardEvent)>);

        let mut guard = inner.borrow_mut();
        guard
            .element
            .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())
            .map_err(|err| anyhow::anyhow!("Could not bind debug keys : {:#?}", err))?;
        guard
            .element
            .set_attribute("tabindex", "0")
            .map_err(|err| anyhow::anyhow!("Could not set tabindex : {:#?}", err))?;
        let _ = guard.element.style().set_property("outline", "1px dashed red");
        guard.keydown = Some(closure);
        log!(
            "sprite-animate: debug stepping enabled for '{}'",
            guard.config.img_src
        );
        Ok(())
    }

    /// Manual frame-by-frame inspection, bypassing the interval gate.
    fn step(inner: &mut Inner, forward: bool) {
        if let Playback::Ready {
            clock, renderer, ..
        } = &mut inner.playback
        {
            if forward {
                clock.step_forward();
            } else {
                clock.step_backward();
            }
            if let Some(frame) = clock.take_pending_frame() {
                renderer.render(frame);
            }
        }
    }
}
