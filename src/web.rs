//! Browser bindings for the host traits, over `web-sys`.

use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;

use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Event, EventTarget, HtmlCanvasElement, HtmlElement,
    HtmlImageElement, KeyboardEvent, Node, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition,
    Window,
};

use crate::config::InitializationOptions;
use crate::dom::{Dom, ElementId, Rect};
use crate::error::{SelectorError, StorageError};
use crate::page::{HostCapabilities, HostEnvironment, Page, PageEvent};
use crate::particles::{CanvasHost, CanvasStyle, CanvasSurface, FrameHandle, FrameScheduler, ParticleField};
use crate::quality::CapabilityProbe;
use crate::storage::StorageBackend;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// [`Dom`] over the live document. Elements get a stable [`ElementId`] the
/// first time a query returns them; `ElementId(0)` is `<body>`.
pub struct WebDom {
    document: Document,
    elements: RefCell<Vec<Element>>,
}

impl WebDom {
    pub fn new(document: Document) -> Option<Self> {
        let body: Element = document.body()?.into();
        Some(Self {
            document,
            elements: RefCell::new(vec![body]),
        })
    }

    /// Id for an element the host received outside a query (event targets).
    pub fn element_id(&self, element: &Element) -> ElementId {
        self.register(element.clone())
    }

    fn register(&self, element: Element) -> ElementId {
        let mut elements = self.elements.borrow_mut();
        if let Some(index) = elements
            .iter()
            .position(|known| known.is_same_node(Some(&element)))
        {
            return ElementId(index);
        }
        elements.push(element);
        ElementId(elements.len() - 1)
    }

    fn element(&self, el: ElementId) -> Option<Element> {
        self.elements.borrow().get(el.0).cloned()
    }

    fn html(&self, el: ElementId) -> Option<HtmlElement> {
        self.element(el)?.dyn_into::<HtmlElement>().ok()
    }
}

fn check_selector(selector: &str) -> Result<(), SelectorError> {
    if selector.trim().is_empty() {
        Err(SelectorError::Empty)
    } else {
        Ok(())
    }
}

impl Dom for WebDom {
    fn body(&self) -> ElementId {
        ElementId(0)
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementId>, SelectorError> {
        check_selector(selector)?;
        let nodes = self
            .document
            .query_selector_all(selector)
            .map_err(|_| SelectorError::Unsupported(selector.to_string()))?;
        Ok((0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(|element| self.register(element))
            .collect())
    }

    fn query_within(&self, root: ElementId, selector: &str) -> Result<Option<ElementId>, SelectorError> {
        check_selector(selector)?;
        let Some(root) = self.element(root) else {
            return Ok(None);
        };
        let found = root
            .query_selector(selector)
            .map_err(|_| SelectorError::Unsupported(selector.to_string()))?;
        Ok(found.map(|element| self.register(element)))
    }

    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        match (self.element(ancestor), self.element(node)) {
            (Some(ancestor), Some(node)) => ancestor.contains(Some(&node)),
            _ => false,
        }
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.element(el)
            .is_some_and(|e| e.class_list().contains(class))
    }

    fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(e) = self.element(el) {
            let _ = e.class_list().add_1(class);
        }
    }

    fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(e) = self.element(el) {
            let _ = e.class_list().remove_1(class);
        }
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        self.element(el)?.get_attribute(name)
    }

    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str) {
        if let Some(e) = self.element(el) {
            if let Err(err) = e.set_attribute(name, value) {
                warn!(name, ?err, "set_attribute failed");
            }
        }
    }

    fn style(&self, el: ElementId, property: &str) -> Option<String> {
        let value = self.html(el)?.style().get_property_value(property).ok()?;
        (!value.is_empty()).then_some(value)
    }

    fn set_style(&mut self, el: ElementId, property: &str, value: &str) {
        let Some(e) = self.html(el) else {
            return;
        };
        let style = e.style();
        let _ = if value.is_empty() {
            style.remove_property(property).map(|_| ())
        } else {
            style.set_property(property, value)
        };
    }

    fn text(&self, el: ElementId) -> String {
        self.element(el)
            .and_then(|e| e.text_content())
            .unwrap_or_default()
    }

    fn set_text(&mut self, el: ElementId, text: &str) {
        if let Some(e) = self.element(el) {
            e.set_text_content(Some(text));
        }
    }

    fn create_element(&mut self, tag: &str) -> ElementId {
        match self.document.create_element(tag) {
            Ok(element) => self.register(element),
            Err(err) => {
                warn!(tag, ?err, "create_element failed");
                // Resolves to no element, so every later call is a no-op.
                ElementId(usize::MAX)
            }
        }
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if let (Some(parent), Some(child)) = (self.element(parent), self.element(child)) {
            let _ = parent.append_child(&child);
        }
    }

    fn remove(&mut self, el: ElementId) {
        if let Some(e) = self.element(el) {
            e.remove();
        }
    }

    fn bounding_rect(&self, el: ElementId) -> Option<Rect> {
        let e = self.element(el)?;
        if !e.is_connected() {
            return None;
        }
        let r = e.get_bounding_client_rect();
        Some(Rect::new(r.x() as f32, r.y() as f32, r.width() as f32, r.height() as f32))
    }

    fn focus(&mut self, el: ElementId) {
        if let Some(e) = self.html(el) {
            let _ = e.focus();
        }
    }

    fn scroll_into_view(&mut self, el: ElementId) {
        if let Some(e) = self.element(el) {
            let options = ScrollIntoViewOptions::new();
            options.set_behavior(ScrollBehavior::Smooth);
            options.set_block(ScrollLogicalPosition::Start);
            e.scroll_into_view_with_scroll_into_view_options(&options);
        }
    }
}

/// `window.localStorage`. Missing storage (private mode, disabled cookies)
/// reports [`StorageError::Unavailable`].
pub struct LocalStorageBackend {
    storage: Option<web_sys::Storage>,
}

impl LocalStorageBackend {
    pub fn new(window: &Window) -> Self {
        Self {
            storage: window.local_storage().ok().flatten(),
        }
    }

    fn storage(&self) -> Result<&web_sys::Storage, StorageError> {
        self.storage.as_ref().ok_or(StorageError::Unavailable)
    }
}

fn backend_error(err: JsValue) -> StorageError {
    StorageError::Backend(format!("{err:?}"))
}

impl StorageBackend for LocalStorageBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?.get_item(key).map_err(backend_error)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?.set_item(key, value).map_err(backend_error)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage()?.remove_item(key).map_err(backend_error)
    }
}

pub struct NavigatorProbe {
    window: Window,
}

impl NavigatorProbe {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl CapabilityProbe for NavigatorProbe {
    fn device_memory_gb(&self) -> Option<f32> {
        // Not in web-sys: Chromium-only `navigator.deviceMemory`.
        js_sys::Reflect::get(&self.window.navigator(), &JsValue::from_str("deviceMemory"))
            .ok()
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
    }

    fn logical_processors(&self) -> Option<u32> {
        let cores = self.window.navigator().hardware_concurrency();
        (cores > 0.0).then_some(cores as u32)
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.window
            .match_media("(prefers-reduced-motion: reduce)")
            .ok()
            .flatten()
            .is_some_and(|query| query.matches())
    }

    fn viewport(&self) -> (f32, f32) {
        let width = self.window.inner_width().ok().and_then(|v| v.as_f64());
        let height = self.window.inner_height().ok().and_then(|v| v.as_f64());
        (width.unwrap_or(0.0) as f32, height.unwrap_or(0.0) as f32)
    }
}

pub struct CanvasElementSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasSurface for CanvasElementSurface {
    fn set_size(&mut self, width: f32, height: f32) {
        self.canvas.set_width(width.max(0.0) as u32);
        self.canvas.set_height(height.max(0.0) as u32);
    }

    fn size(&self) -> (f32, f32) {
        (self.canvas.width() as f32, self.canvas.height() as f32)
    }

    fn clear(&mut self) {
        let (width, height) = self.size();
        self.context
            .clear_rect(0.0, 0.0, f64::from(width), f64::from(height));
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: &str, alpha: f32) {
        let ctx = &self.context;
        ctx.begin_path();
        if ctx
            .arc(f64::from(x), f64::from(y), f64::from(radius), 0.0, TAU)
            .is_err()
        {
            return;
        }
        ctx.set_fill_style_str(color);
        ctx.set_global_alpha(f64::from(alpha));
        ctx.fill();
    }

    fn remove(&mut self) {
        self.canvas.remove();
    }
}

/// Inserts the backdrop canvas as the first child of `<body>`.
pub struct DocumentCanvasHost {
    document: Document,
}

impl DocumentCanvasHost {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl CanvasHost for DocumentCanvasHost {
    type Surface = CanvasElementSurface;

    fn create_canvas(&mut self, style: &CanvasStyle) -> Option<CanvasElementSurface> {
        let body = self.document.body()?;
        let canvas = self
            .document
            .create_element("canvas")
            .ok()?
            .dyn_into::<HtmlCanvasElement>()
            .ok()?;
        canvas.set_class_name("particle-canvas");
        canvas.set_attribute("aria-hidden", "true").ok()?;
        canvas.set_attribute("style", &style.css_text()).ok()?;
        let context = canvas
            .get_context("2d")
            .ok()
            .flatten()?
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        body.insert_before(&canvas, body.first_child().as_ref()).ok()?;
        Some(CanvasElementSurface { canvas, context })
    }
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// `requestAnimationFrame` bound to one shared callback.
pub struct AnimationFrames {
    window: Window,
    callback: FrameCallback,
}

impl FrameScheduler for AnimationFrames {
    fn request_frame(&mut self) -> FrameHandle {
        let callback = self.callback.borrow();
        let Some(callback) = callback.as_ref() else {
            return FrameHandle(0);
        };
        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(id) => FrameHandle(id as u64),
            Err(err) => {
                warn!(?err, "requestAnimationFrame failed");
                FrameHandle(0)
            }
        }
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let _ = self.window.cancel_animation_frame(handle.0 as i32);
    }
}

struct Mounted {
    field: ParticleField<CanvasElementSurface>,
    frames: AnimationFrames,
}

impl Mounted {
    /// Stop the loop and drop the frame callback, which holds this state.
    fn teardown(&mut self) {
        let Mounted { field, frames } = self;
        field.teardown(frames);
        frames.callback.borrow_mut().take();
    }
}

/// Keeps the particle backdrop and its listeners alive. The field tears
/// itself down on `pagehide`; call [`ParticleMount::teardown`] before
/// dropping it from JS any earlier.
#[wasm_bindgen]
pub struct ParticleMount {
    state: Rc<RefCell<Mounted>>,
    _listeners: Vec<Closure<dyn FnMut()>>,
}

#[wasm_bindgen]
impl ParticleMount {
    pub fn teardown(&self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.teardown();
        }
    }
}

fn page_now(window: &Window) -> u64 {
    window.performance().map_or(0.0, |p| p.now()) as u64
}

/// Build the particle backdrop for the current document. Resolves to
/// `undefined` when the device tier disables it.
#[wasm_bindgen]
pub fn mount_particle_field(seed: u32) -> Result<Option<ParticleMount>, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let probe = NavigatorProbe::new(window.clone());
    let mut host = DocumentCanvasHost::new(document.clone());
    let Some(field) = ParticleField::new(&probe, &mut host, seed) else {
        return Ok(None);
    };

    let callback: FrameCallback = Rc::new(RefCell::new(None));
    let state = Rc::new(RefCell::new(Mounted {
        field,
        frames: AnimationFrames {
            window: window.clone(),
            callback: callback.clone(),
        },
    }));

    {
        let state = state.clone();
        let document = document.clone();
        *callback.borrow_mut() = Some(Closure::new(move |timestamp: f64| {
            let mut state = state.borrow_mut();
            let Mounted { field, frames } = &mut *state;
            field.frame(timestamp as u64, document.hidden(), frames);
        }));
    }

    let on_visibility = {
        let state = state.clone();
        let document = document.clone();
        Closure::<dyn FnMut()>::new(move || {
            let mut state = state.borrow_mut();
            let Mounted { field, frames } = &mut *state;
            field.on_visibility_change(document.hidden(), frames);
        })
    };
    document.add_event_listener_with_callback(
        "visibilitychange",
        on_visibility.as_ref().unchecked_ref(),
    )?;

    let on_resize = {
        let state = state.clone();
        let window = window.clone();
        Closure::<dyn FnMut()>::new(move || {
            let (width, height) = NavigatorProbe::new(window.clone()).viewport();
            state
                .borrow_mut()
                .field
                .request_resize(width, height, page_now(&window));
        })
    };
    window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())?;

    let on_pagehide = {
        let state = state.clone();
        Closure::<dyn FnMut()>::new(move || {
            if let Ok(mut state) = state.try_borrow_mut() {
                state.teardown();
            }
        })
    };
    window.add_event_listener_with_callback("pagehide", on_pagehide.as_ref().unchecked_ref())?;

    {
        let mut state = state.borrow_mut();
        let Mounted { field, frames } = &mut *state;
        field.start(frames);
    }
    web_sys::console::log_1(&"particle field mounted".into());

    Ok(Some(ParticleMount {
        state,
        _listeners: vec![on_visibility, on_resize, on_pagehide],
    }))
}

fn has_property(target: &JsValue, name: &str) -> bool {
    js_sys::Reflect::has(target, &JsValue::from_str(name)).unwrap_or(false)
}

fn detect_capabilities(window: &Window) -> HostCapabilities {
    let native_lazy_loading = js_sys::Reflect::get(window, &JsValue::from_str("HTMLImageElement"))
        .and_then(|image| js_sys::Reflect::get(&image, &JsValue::from_str("prototype")))
        .is_ok_and(|prototype| has_property(&prototype, "loading"));
    HostCapabilities {
        idle_callback: has_property(window, "requestIdleCallback"),
        intersection_observer: has_property(window, "IntersectionObserver"),
        native_lazy_loading,
        touch: has_property(window, "ontouchstart") || window.navigator().max_touch_points() > 0,
        performance_timing: window.performance().is_some(),
    }
}

/// Browser state around one [`Page`]: the pending `setTimeout` for the next
/// timer deadline, the pending animation frame and in-flight image preloads.
struct PageDriver {
    page: Page<WebDom, LocalStorageBackend>,
    window: Window,
    timeout: Option<i32>,
    timeout_deadline: Option<u64>,
    frame: Option<i32>,
    preloads: Vec<(HtmlImageElement, ElementId)>,
    load_end_ms: Option<u64>,
    load_reported: bool,
    closed: bool,
}

impl PageDriver {
    /// Sync host facilities with what the page wants after it handled
    /// something.
    fn settle(&mut self, callbacks: &PageCallbacks) {
        if self.closed {
            return;
        }
        // Load timing is only recorded once the deferred phase wired it.
        if !self.load_reported && self.page.state().deferred_ran() {
            if let Some(load_event_end_ms) = self.load_end_ms {
                self.load_reported = true;
                self.page.dispatch(PageEvent::Load {
                    navigation_start_ms: 0,
                    load_event_end_ms,
                });
            }
        }
        self.start_preloads(callbacks);
        self.arm_timeout(callbacks);
        self.arm_frame(callbacks);
    }

    fn arm_timeout(&mut self, callbacks: &PageCallbacks) {
        let deadline = self.page.next_deadline();
        if deadline == self.timeout_deadline {
            return;
        }
        if let Some(id) = self.timeout.take() {
            self.window.clear_timeout_with_handle(id);
        }
        self.timeout_deadline = None;
        let callback = callbacks.timeout.borrow();
        let (Some(deadline), Some(callback)) = (deadline, callback.as_ref()) else {
            return;
        };
        let delay = deadline.saturating_sub(page_now(&self.window)).min(i32::MAX as u64) as i32;
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), delay)
        {
            Ok(id) => {
                self.timeout = Some(id);
                self.timeout_deadline = Some(deadline);
            }
            Err(err) => warn!(?err, "setTimeout failed"),
        }
    }

    fn arm_frame(&mut self, callbacks: &PageCallbacks) {
        if self.frame.is_some() || !self.page.wants_animation_frame() {
            return;
        }
        let callback = callbacks.frame.borrow();
        let Some(callback) = callback.as_ref() else {
            return;
        };
        match self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())
        {
            Ok(id) => self.frame = Some(id),
            Err(err) => warn!(?err, "requestAnimationFrame failed"),
        }
    }

    fn start_preloads(&mut self, callbacks: &PageCallbacks) {
        for request in self.page.take_image_requests() {
            let image = match HtmlImageElement::new() {
                Ok(image) => image,
                Err(err) => {
                    warn!(?err, source = %request.source, "image preload could not start");
                    self.page.dispatch(PageEvent::ImageFailed { target: request.image });
                    continue;
                }
            };
            if let Some(callback) = callbacks.image_loaded.borrow().as_ref() {
                image.set_onload(Some(callback.as_ref().unchecked_ref()));
            }
            if let Some(callback) = callbacks.image_failed.borrow().as_ref() {
                image.set_onerror(Some(callback.as_ref().unchecked_ref()));
            }
            image.set_src(&request.source);
            self.preloads.push((image, request.image));
        }
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.page.dispose();
        if let Some(id) = self.timeout.take() {
            self.window.clear_timeout_with_handle(id);
        }
        if let Some(id) = self.frame.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        for (image, _) in self.preloads.drain(..) {
            image.set_onload(None);
            image.set_onerror(None);
        }
    }
}

type Driver = Rc<RefCell<PageDriver>>;

/// Closures the driver hands to the browser. Each holds the driver, so
/// [`PageCallbacks::clear`] is what frees a page.
#[derive(Default)]
struct PageCallbacks {
    timeout: RefCell<Option<Closure<dyn FnMut()>>>,
    frame: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    idle: RefCell<Option<Closure<dyn FnMut()>>>,
    image_loaded: RefCell<Option<Closure<dyn FnMut(Event)>>>,
    image_failed: RefCell<Option<Closure<dyn FnMut(Event)>>>,
}

impl PageCallbacks {
    fn install(driver: &Driver) -> Rc<Self> {
        let callbacks = Rc::new(Self::default());

        *callbacks.timeout.borrow_mut() = Some({
            let driver = driver.clone();
            let callbacks = callbacks.clone();
            Closure::new(move || {
                let Ok(mut state) = driver.try_borrow_mut() else {
                    return;
                };
                state.timeout = None;
                state.timeout_deadline = None;
                let now = page_now(&state.window);
                state.page.advance_to(now);
                state.settle(&callbacks);
            })
        });

        *callbacks.frame.borrow_mut() = Some({
            let driver = driver.clone();
            let callbacks = callbacks.clone();
            Closure::new(move |timestamp: f64| {
                let Ok(mut state) = driver.try_borrow_mut() else {
                    return;
                };
                state.frame = None;
                state.page.animation_frame(timestamp as u64);
                state.settle(&callbacks);
            })
        });

        *callbacks.idle.borrow_mut() = Some({
            let driver = driver.clone();
            let callbacks = callbacks.clone();
            Closure::new(move || {
                let Ok(mut state) = driver.try_borrow_mut() else {
                    return;
                };
                let now = page_now(&state.window);
                state.page.advance_to(now);
                state.page.notify_idle();
                state.settle(&callbacks);
            })
        });

        *callbacks.image_loaded.borrow_mut() = Some(image_settled(driver, &callbacks, true));
        *callbacks.image_failed.borrow_mut() = Some(image_settled(driver, &callbacks, false));
        callbacks
    }

    fn request_idle(&self, window: &Window) -> Result<(), JsValue> {
        let callback = self.idle.borrow();
        let Some(callback) = callback.as_ref() else {
            return Ok(());
        };
        // Not in web-sys for every target: look the function up directly.
        let request = js_sys::Reflect::get(window, &JsValue::from_str("requestIdleCallback"))?
            .dyn_into::<js_sys::Function>()?;
        request.call1(window, callback.as_ref())?;
        Ok(())
    }

    fn clear(&self) {
        self.timeout.borrow_mut().take();
        self.frame.borrow_mut().take();
        self.idle.borrow_mut().take();
        self.image_loaded.borrow_mut().take();
        self.image_failed.borrow_mut().take();
    }
}

fn image_settled(driver: &Driver, callbacks: &Rc<PageCallbacks>, loaded: bool) -> Closure<dyn FnMut(Event)> {
    let driver = driver.clone();
    let callbacks = callbacks.clone();
    Closure::new(move |event: Event| {
        let Ok(mut state) = driver.try_borrow_mut() else {
            return;
        };
        let Some(node) = event.target().and_then(|t| t.dyn_into::<Node>().ok()) else {
            return;
        };
        let Some(index) = state
            .preloads
            .iter()
            .position(|(image, _)| image.is_same_node(Some(&node)))
        else {
            return;
        };
        let (_, target) = state.preloads.swap_remove(index);
        let now = page_now(&state.window);
        state.page.advance_to(now);
        let settled = if loaded {
            PageEvent::ImageLoaded { target }
        } else {
            PageEvent::ImageFailed { target }
        };
        state.page.dispatch(settled);
        state.settle(&callbacks);
    })
}

/// Forward one DOM event to the page. `to_event` maps it to a
/// [`PageEvent`], or returns `None` after updating the driver itself.
fn listen(
    target: &EventTarget,
    kind: &str,
    driver: &Driver,
    callbacks: &Rc<PageCallbacks>,
    mut to_event: impl FnMut(&mut PageDriver, &Event) -> Option<PageEvent> + 'static,
) -> Result<Closure<dyn FnMut(Event)>, JsValue> {
    let driver = driver.clone();
    let callbacks = callbacks.clone();
    let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        let Ok(mut state) = driver.try_borrow_mut() else {
            return;
        };
        if state.closed {
            return;
        }
        let now = page_now(&state.window);
        state.page.advance_to(now);
        if let Some(page_event) = to_event(&mut *state, &event) {
            if state.page.dispatch(page_event).default_prevented {
                event.prevent_default();
            }
        }
        state.settle(&callbacks);
    });
    target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
    Ok(closure)
}

fn event_element(driver: &PageDriver, event: &Event) -> Option<ElementId> {
    let element = event.target()?.dyn_into::<Element>().ok()?;
    Some(driver.page.dom().element_id(&element))
}

fn js_text(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Keeps a mounted [`Page`] and its listeners alive. The page disposes itself
/// on `pagehide`; call [`PageMount::teardown`] before dropping it from JS any
/// earlier.
#[wasm_bindgen]
pub struct PageMount {
    driver: Driver,
    callbacks: Rc<PageCallbacks>,
    _listeners: Vec<Closure<dyn FnMut(Event)>>,
}

#[wasm_bindgen]
impl PageMount {
    pub fn teardown(&self) {
        if let Ok(mut state) = self.driver.try_borrow_mut() {
            state.shutdown();
        }
        self.callbacks.clear();
    }
}

/// Initialize the shared page behavior for the current document.
/// `options_json` holds camelCase [`InitializationOptions`]; an empty string
/// takes the defaults.
#[wasm_bindgen]
pub fn mount_page(options_json: &str) -> Result<PageMount, JsValue> {
    let options = if options_json.trim().is_empty() {
        InitializationOptions::default()
    } else {
        InitializationOptions::from_json(options_json).map_err(|err| JsValue::from_str(&err.to_string()))?
    };
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let dom = WebDom::new(document.clone()).ok_or_else(|| JsValue::from_str("no body"))?;

    let capabilities = detect_capabilities(&window);
    let env = HostEnvironment {
        hostname: window.location().hostname().unwrap_or_default(),
        viewport: NavigatorProbe::new(window.clone()).viewport(),
        capabilities,
    };
    let mut page = Page::new(dom, LocalStorageBackend::new(&window), env);
    page.advance_to(page_now(&window));
    let ready_state = js_sys::Reflect::get(&document, &JsValue::from_str("readyState")).unwrap_or_default();
    let load_end_ms = (ready_state.as_string().as_deref() == Some("complete")).then(|| page_now(&window));

    let driver: Driver = Rc::new(RefCell::new(PageDriver {
        page,
        window: window.clone(),
        timeout: None,
        timeout_deadline: None,
        frame: None,
        preloads: Vec::new(),
        load_end_ms,
        load_reported: false,
        closed: false,
    }));
    let callbacks = PageCallbacks::install(&driver);
    let visibility_document = document.clone();

    let mut listeners = vec![
        listen(&document, "click", &driver, &callbacks, |driver, event| {
            event_element(driver, event).map(|target| PageEvent::Click { target })
        })?,
        listen(&document, "keydown", &driver, &callbacks, |_, event| {
            event
                .dyn_ref::<KeyboardEvent>()
                .map(|key| PageEvent::KeyDown { key: key.key() })
        })?,
        listen(&document, "mousedown", &driver, &callbacks, |_, _| Some(PageEvent::MouseDown))?,
        listen(&document, "visibilitychange", &driver, &callbacks, move |_, _| {
            Some(PageEvent::VisibilityChanged {
                hidden: visibility_document.hidden(),
            })
        })?,
        listen(&window, "scroll", &driver, &callbacks, |_, _| Some(PageEvent::Scroll))?,
        listen(&window, "resize", &driver, &callbacks, |driver, _| {
            let (width, height) = NavigatorProbe::new(driver.window.clone()).viewport();
            Some(PageEvent::ViewportChanged { width, height })
        })?,
        listen(&window, "error", &driver, &callbacks, |_, event| {
            let message = js_sys::Reflect::get(event, &JsValue::from_str("message")).unwrap_or_default();
            Some(PageEvent::Error { message: js_text(message) })
        })?,
        listen(&window, "unhandledrejection", &driver, &callbacks, |_, event| {
            let reason = js_sys::Reflect::get(event, &JsValue::from_str("reason")).unwrap_or_default();
            Some(PageEvent::UnhandledRejection { reason: js_text(reason) })
        })?,
        listen(&window, "load", &driver, &callbacks, |driver, _| {
            driver.load_end_ms = Some(page_now(&driver.window));
            None
        })?,
        listen(&window, "beforeunload", &driver, &callbacks, |_, _| Some(PageEvent::BeforeUnload))?,
    ];

    if let Some(section) = document.query_selector(".quotes-section")? {
        listeners.push(listen(&section, "mouseenter", &driver, &callbacks, |driver, event| {
            event_element(driver, event).map(|target| PageEvent::PointerEnter { target })
        })?);
        listeners.push(listen(&section, "mouseleave", &driver, &callbacks, |driver, event| {
            event_element(driver, event).map(|target| PageEvent::PointerLeave { target })
        })?);
    }

    let on_pagehide = {
        let driver = driver.clone();
        let callbacks = callbacks.clone();
        Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            if let Ok(mut state) = driver.try_borrow_mut() {
                state.shutdown();
            }
            callbacks.clear();
        })
    };
    window.add_event_listener_with_callback("pagehide", on_pagehide.as_ref().unchecked_ref())?;
    listeners.push(on_pagehide);

    {
        let mut state = driver.borrow_mut();
        let outcome = state.page.initialize(options);
        web_sys::console::log_1(&format!("page initialized: {outcome:?}").into());
        if capabilities.idle_callback {
            if let Err(err) = callbacks.request_idle(&window) {
                warn!(?err, "requestIdleCallback failed, waiting for the timeout");
            }
        }
        state.settle(&callbacks);
    }

    Ok(PageMount {
        driver,
        callbacks,
        _listeners: listeners,
    })
}
