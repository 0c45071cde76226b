//! Shared page initialization.
//!
//! A [`Page`] is owned by the host (one per document) and runs the common
//! behavioral scaffolding once: an immediate phase (navigation, smooth
//! scrolling, error capture) and a deferred phase scheduled for the next idle
//! point (quote carousel, reveal animations, stat counters, accessibility,
//! lazy images, load timing). Host events, timer deadlines and animation
//! frames are fed in explicitly, so a page behaves the same in a browser and
//! in a test.

pub mod accessibility;
pub mod carousel;
pub mod counters;
pub mod diagnostics;
pub mod engagement;
pub mod lazy_images;
pub mod navigation;
pub mod observer;
pub mod preferences;
pub mod reveal;
pub mod smooth_scroll;

use tracing::{debug, info, warn};

use self::accessibility::Accessibility;
use self::carousel::QuoteCarousel;
use self::counters::StatCounters;
use self::diagnostics::{ErrorCapture, PerformanceLog};
use self::engagement::TimeOnPage;
use self::lazy_images::{ImagePreloader, ImageRequest, LazyImages};
use self::navigation::Navigation;
use self::observer::{ObserverKind, ObserverRegistry};
use self::preferences::PreferenceControls;
use self::reveal::RevealAnimations;
use self::smooth_scroll::SmoothScroll;
use crate::config::{InitializationOptions, PageTimings};
use crate::dom::{Dom, ElementId, Rect};
use crate::storage::{Storage, StorageBackend};
use crate::timers::{TimerId, TimerQueue};

/// Everything the page schedules on the virtual clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTimer {
    DeferredInit,
    CarouselTransitionEnd,
    CarouselAutoplay,
    PerformanceReport { load_time_ms: u64 },
}

/// Optional browser facilities, detected up front by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    pub idle_callback: bool,
    pub intersection_observer: bool,
    pub native_lazy_loading: bool,
    pub touch: bool,
    pub performance_timing: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            idle_callback: true,
            intersection_observer: true,
            native_lazy_loading: true,
            touch: false,
            performance_timing: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostEnvironment {
    /// `location.hostname`, used to tell external links apart.
    pub hostname: String,
    pub viewport: (f32, f32),
    pub capabilities: HostCapabilities,
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            viewport: (1280.0, 720.0),
            capabilities: HostCapabilities::default(),
        }
    }
}

/// Re-entrancy guard, one per page context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitializationState {
    initialized: bool,
    deferred_ran: bool,
}

impl InitializationState {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn deferred_ran(&self) -> bool {
        self.deferred_ran
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Navigation,
    SmoothScroll,
    ErrorHandling,
    TimeOnPage,
    QuotesSlider,
    Animations,
    Counters,
    Accessibility,
    LazyLoading,
    PerformanceMonitoring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    /// Immediate-phase features that found their elements and were wired.
    pub wired: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized(InitReport),
    AlreadyInitialized,
}

/// Host events routed to the wired features.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    Click { target: ElementId },
    KeyDown { key: String },
    MouseDown,
    PointerEnter { target: ElementId },
    PointerLeave { target: ElementId },
    VisibilityChanged { hidden: bool },
    ViewportChanged { width: f32, height: f32 },
    Scroll,
    Error { message: String },
    UnhandledRejection { reason: String },
    Load { navigation_start_ms: u64, load_event_end_ms: u64 },
    BeforeUnload,
    /// A fetch from [`Page::take_image_requests`] finished.
    ImageLoaded { target: ElementId },
    ImageFailed { target: ElementId },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    pub default_prevented: bool,
}

#[derive(Debug, Default)]
struct Features {
    navigation: Option<Navigation>,
    smooth_scroll: Option<SmoothScroll>,
    errors: Option<ErrorCapture>,
    time_on_page: Option<TimeOnPage>,
    carousel: Option<QuoteCarousel>,
    reveal: Option<RevealAnimations>,
    counters: Option<StatCounters>,
    accessibility: Option<Accessibility>,
    preferences: Option<PreferenceControls>,
    lazy_images: Option<LazyImages>,
    preloader: Option<ImagePreloader>,
    performance: Option<PerformanceLog>,
}

pub struct Page<D: Dom, B: StorageBackend> {
    env: HostEnvironment,
    state: InitializationState,
    options: Option<InitializationOptions>,
    dom: D,
    storage: Storage<B>,
    timers: TimerQueue<PageTimer>,
    observers: ObserverRegistry,
    features: Features,
    deferred_timer: Option<TimerId>,
    deferred_report: Vec<Feature>,
    wiring_count: usize,
    viewport: Rect,
    hidden: bool,
    now_ms: u64,
}

impl<D: Dom, B: StorageBackend> Page<D, B> {
    pub fn new(dom: D, storage: B, env: HostEnvironment) -> Self {
        let (width, height) = env.viewport;
        Self {
            env,
            state: InitializationState::default(),
            options: None,
            dom,
            storage: Storage::new(storage),
            timers: TimerQueue::new(),
            observers: ObserverRegistry::default(),
            features: Features::default(),
            deferred_timer: None,
            deferred_report: Vec::new(),
            wiring_count: 0,
            viewport: Rect::new(0.0, 0.0, width, height),
            hidden: false,
            now_ms: 0,
        }
    }

    /// Run the immediate phase and schedule the deferred one. A second call
    /// on the same page only logs.
    pub fn initialize(&mut self, options: InitializationOptions) -> InitOutcome {
        if self.state.initialized {
            warn!("page is already initialized");
            return InitOutcome::AlreadyInitialized;
        }

        let mut wired = Vec::new();
        if options.navigation {
            if let Some(nav) = Navigation::attach(&mut self.dom) {
                self.features.navigation = Some(nav);
                wired.push(Feature::Navigation);
            }
        }
        if options.smooth_scroll {
            self.features.smooth_scroll = Some(SmoothScroll::attach(&self.dom));
            wired.push(Feature::SmoothScroll);
        }
        if options.error_handling {
            self.features.errors = Some(ErrorCapture::default());
            wired.push(Feature::ErrorHandling);
        }
        if let Some(key) = &options.time_on_page_key {
            self.features.time_on_page = Some(TimeOnPage::new(key.clone(), self.now_ms));
            wired.push(Feature::TimeOnPage);
        }

        self.schedule_deferred();

        let body = self.dom.body();
        self.dom.add_class(body, "page-loaded");
        self.state.initialized = true;
        self.options = Some(options);
        self.wiring_count += wired.len();
        info!(features = wired.len(), "page initialized");
        InitOutcome::Initialized(InitReport { wired })
    }

    fn schedule_deferred(&mut self) {
        let delay = if self.env.capabilities.idle_callback {
            PageTimings::IDLE_CALLBACK_TIMEOUT_MS
        } else {
            PageTimings::IDLE_FALLBACK_DELAY_MS
        };
        self.deferred_timer = Some(self.timers.schedule(self.now_ms, delay, PageTimer::DeferredInit));
    }

    /// The host reached an idle point (`requestIdleCallback`).
    pub fn notify_idle(&mut self) {
        if !self.env.capabilities.idle_callback {
            return;
        }
        if let Some(id) = self.deferred_timer.take() {
            self.timers.cancel(id);
            self.run_deferred();
        }
    }

    fn run_deferred(&mut self) {
        if self.state.deferred_ran {
            return;
        }
        let Some(options) = self.options.clone() else {
            return;
        };
        self.state.deferred_ran = true;
        let caps = self.env.capabilities;
        let mut wired = Vec::new();

        if options.quotes_slider {
            if let Some(carousel) = QuoteCarousel::attach(&mut self.dom, &mut self.timers, self.now_ms) {
                self.features.carousel = Some(carousel);
                wired.push(Feature::QuotesSlider);
            }
        }
        if options.animations {
            if caps.intersection_observer {
                self.features.reveal = Some(RevealAnimations::attach(
                    &mut self.dom,
                    &mut self.observers,
                    &options.animation_selectors,
                ));
                wired.push(Feature::Animations);
            } else {
                warn!("intersection observer not supported, reveal animations skipped");
            }
        }
        if caps.intersection_observer {
            if let Some(counters) = StatCounters::attach(
                &self.dom,
                &mut self.observers,
                &options.counter_selectors,
                options.counter_durations,
            ) {
                self.features.counters = Some(counters);
                wired.push(Feature::Counters);
            }
        }
        if options.accessibility {
            self.features.accessibility = Some(Accessibility::attach(
                &mut self.dom,
                caps.touch,
                &self.env.hostname,
            ));
            self.features.preferences = Some(PreferenceControls::attach(&mut self.dom, &mut self.storage));
            wired.push(Feature::Accessibility);
        }
        if options.lazy_loading && options.image_preloading {
            if let Some(preloader) =
                ImagePreloader::attach(&self.dom, &mut self.observers, caps.intersection_observer)
            {
                self.features.preloader = Some(preloader);
                wired.push(Feature::LazyLoading);
            }
        } else if options.lazy_loading {
            if let Some(lazy) = LazyImages::attach(
                &mut self.dom,
                &mut self.observers,
                caps.native_lazy_loading,
                caps.intersection_observer,
            ) {
                self.features.lazy_images = Some(lazy);
                wired.push(Feature::LazyLoading);
            }
        }
        if options.performance_monitoring && caps.performance_timing {
            self.features.performance = Some(PerformanceLog::default());
            wired.push(Feature::PerformanceMonitoring);
        }

        debug!(features = wired.len(), "deferred initialization done");
        self.wiring_count += wired.len();
        self.deferred_report = wired;
        self.evaluate_observers();
    }

    pub fn dispatch(&mut self, event: PageEvent) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        let now = self.now_ms;
        match event {
            PageEvent::Click { target } => {
                if let Some(nav) = &self.features.navigation {
                    nav.on_click(&mut self.dom, target);
                }
                if let Some(carousel) = self.features.carousel.as_mut() {
                    carousel.on_click(&mut self.dom, &mut self.timers, now, target);
                }
                if let Some(prefs) = self.features.preferences.as_mut() {
                    prefs.on_click(&mut self.dom, &mut self.storage, target);
                }
                if let Some(scroll) = &self.features.smooth_scroll {
                    outcome.default_prevented = scroll.on_click(&mut self.dom, target);
                }
            }
            PageEvent::KeyDown { key } => {
                if let Some(nav) = &self.features.navigation {
                    nav.on_key(&mut self.dom, &key);
                }
                if let Some(carousel) = self.features.carousel.as_mut() {
                    carousel.on_key(&mut self.dom, &mut self.timers, now, &key, self.viewport.height);
                }
                if let Some(a11y) = self.features.accessibility.as_mut() {
                    a11y.on_key(&mut self.dom, &key);
                }
            }
            PageEvent::MouseDown => {
                if let Some(a11y) = self.features.accessibility.as_mut() {
                    a11y.on_mouse_down(&mut self.dom);
                }
            }
            PageEvent::PointerEnter { target } => {
                if let Some(carousel) = self.features.carousel.as_mut() {
                    carousel.on_pointer_enter(&mut self.timers, target);
                }
            }
            PageEvent::PointerLeave { target } => {
                if let Some(carousel) = self.features.carousel.as_mut() {
                    carousel.on_pointer_leave(&mut self.timers, now, target);
                }
            }
            PageEvent::VisibilityChanged { hidden } => {
                self.hidden = hidden;
                if let Some(carousel) = self.features.carousel.as_mut() {
                    carousel.on_visibility(&mut self.timers, now, hidden);
                }
            }
            PageEvent::ViewportChanged { width, height } => {
                self.viewport = Rect::new(0.0, 0.0, width, height);
                self.evaluate_observers();
            }
            PageEvent::Scroll => self.evaluate_observers(),
            PageEvent::Error { message } => {
                if let Some(errors) = self.features.errors.as_mut() {
                    errors.on_error(&message);
                }
            }
            PageEvent::UnhandledRejection { reason } => {
                if let Some(errors) = self.features.errors.as_mut() {
                    errors.on_unhandled_rejection(&reason);
                }
            }
            PageEvent::Load {
                navigation_start_ms,
                load_event_end_ms,
            } => {
                if self.features.performance.is_some() {
                    let load_time_ms = load_event_end_ms.saturating_sub(navigation_start_ms);
                    self.timers
                        .schedule(now, 0, PageTimer::PerformanceReport { load_time_ms });
                }
            }
            PageEvent::BeforeUnload => {
                if let Some(tracker) = &self.features.time_on_page {
                    tracker.on_unload(&mut self.storage, now);
                }
            }
            PageEvent::ImageLoaded { target } => {
                if let Some(preloader) = self.features.preloader.as_mut() {
                    preloader.on_loaded(&mut self.dom, target);
                }
            }
            PageEvent::ImageFailed { target } => {
                if let Some(preloader) = self.features.preloader.as_mut() {
                    preloader.on_failed(target);
                }
            }
        }
        outcome
    }

    /// Fire every timer due by `now_ms`, in deadline order.
    pub fn advance_to(&mut self, now_ms: u64) {
        while let Some((id, deadline, timer)) = self.timers.pop_due(now_ms) {
            self.now_ms = self.now_ms.max(deadline);
            self.on_timer(id, timer);
        }
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// One animation frame: running counters redraw.
    pub fn animation_frame(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
        if let Some(counters) = self.features.counters.as_mut() {
            counters.step(&mut self.dom, self.now_ms);
        }
    }

    fn on_timer(&mut self, id: TimerId, timer: PageTimer) {
        let now = self.now_ms;
        match timer {
            PageTimer::DeferredInit => {
                if self.deferred_timer == Some(id) {
                    self.deferred_timer = None;
                    self.run_deferred();
                }
            }
            PageTimer::CarouselTransitionEnd | PageTimer::CarouselAutoplay => {
                if let Some(carousel) = self.features.carousel.as_mut() {
                    carousel.on_timer(&mut self.dom, &mut self.timers, now, id, timer);
                }
            }
            PageTimer::PerformanceReport { load_time_ms } => {
                if let Some(perf) = self.features.performance.as_mut() {
                    perf.report(load_time_ms);
                }
            }
        }
    }

    fn evaluate_observers(&mut self) {
        let now = self.now_ms;
        for (kind, el) in self.observers.take_intersecting(&self.dom, self.viewport) {
            match kind {
                ObserverKind::Reveal => {
                    if let Some(reveal) = self.features.reveal.as_mut() {
                        reveal.reveal(&mut self.dom, el);
                    }
                }
                ObserverKind::Counter => {
                    if let Some(counters) = self.features.counters.as_mut() {
                        counters.begin(&mut self.dom, el, now);
                    }
                }
                ObserverKind::LazyImage => {
                    if let Some(lazy) = self.features.lazy_images.as_mut() {
                        lazy.load(&mut self.dom, el);
                    }
                }
                ObserverKind::PreloadImage => {
                    if let Some(preloader) = self.features.preloader.as_mut() {
                        preloader.request(&self.dom, el);
                    }
                }
            }
        }
    }

    /// Release every timer and observation the features hold.
    pub fn dispose(&mut self) {
        if let Some(carousel) = self.features.carousel.as_mut() {
            carousel.dispose(&mut self.timers);
        }
        self.timers.clear();
        self.observers.clear();
        self.deferred_timer = None;
        self.features = Features::default();
        debug!("page disposed");
    }

    pub fn state(&self) -> InitializationState {
        self.state
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }

    pub fn storage(&self) -> &Storage<B> {
        &self.storage
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Earliest pending timer; the host arms one real timeout for it.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    /// True while a counter is mid-animation and needs frames.
    pub fn wants_animation_frame(&self) -> bool {
        self.features.counters.as_ref().is_some_and(|c| c.running() > 0)
    }

    /// Image fetches the host should start now.
    pub fn take_image_requests(&mut self) -> Vec<ImageRequest> {
        self.features
            .preloader
            .as_mut()
            .map(ImagePreloader::take_requests)
            .unwrap_or_default()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Features wired by the deferred phase, empty until it has run.
    pub fn deferred_report(&self) -> &[Feature] {
        &self.deferred_report
    }

    /// Total feature wirings across both phases.
    pub fn wiring_count(&self) -> usize {
        self.wiring_count
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    pub fn carousel(&self) -> Option<&QuoteCarousel> {
        self.features.carousel.as_ref()
    }

    pub fn reveal(&self) -> Option<&RevealAnimations> {
        self.features.reveal.as_ref()
    }

    pub fn counters(&self) -> Option<&StatCounters> {
        self.features.counters.as_ref()
    }

    pub fn lazy_images(&self) -> Option<&LazyImages> {
        self.features.lazy_images.as_ref()
    }

    pub fn preloader(&self) -> Option<&ImagePreloader> {
        self.features.preloader.as_ref()
    }

    pub fn errors(&self) -> Option<&ErrorCapture> {
        self.features.errors.as_ref()
    }

    pub fn performance(&self) -> Option<&PerformanceLog> {
        self.features.performance.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{EventOutcome, Feature, HostCapabilities, HostEnvironment, InitOutcome, Page, PageEvent};
    use crate::config::{InitializationOptions, PageTimings};
    use crate::dom::{Dom, ElementId, MemoryDom, Rect};
    use crate::logging;
    use crate::page::carousel::CarouselPhase;
    use crate::page::observer::ObserverKind;
    use crate::storage::MemoryStorage;

    fn page(dom: MemoryDom) -> Page<MemoryDom, MemoryStorage> {
        Page::new(dom, MemoryStorage::new(), HostEnvironment::default())
    }

    fn page_with(dom: MemoryDom, capabilities: HostCapabilities) -> Page<MemoryDom, MemoryStorage> {
        let env = HostEnvironment {
            hostname: "lit.example.org".to_string(),
            capabilities,
            ..HostEnvironment::default()
        };
        Page::new(dom, MemoryStorage::new(), env)
    }

    fn quotes_dom(slides: usize) -> (MemoryDom, ElementId, Vec<ElementId>, ElementId, ElementId) {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let section = dom.add(body, "section", "quotes-section");
        dom.set_rect(section, Rect::new(0.0, 200.0, 1280.0, 300.0));
        let quotes = (0..slides).map(|_| dom.add(section, "blockquote", "quote")).collect();
        for _ in 0..slides {
            dom.add(section, "span", "dot");
        }
        let prev = dom.add(section, "button", "quote-prev");
        let next = dom.add(section, "button", "quote-next");
        (dom, section, quotes, prev, next)
    }

    fn active_quote(page: &Page<MemoryDom, MemoryStorage>, quotes: &[ElementId]) -> usize {
        quotes
            .iter()
            .position(|q| page.dom().has_class(*q, "active"))
            .unwrap()
    }

    #[test]
    fn second_initialize_is_a_logged_no_op() {
        let (dom, ..) = quotes_dom(3);
        let mut page = page(dom);
        assert!(matches!(
            page.initialize(InitializationOptions::default()),
            InitOutcome::Initialized(_)
        ));
        page.notify_idle();
        let dom_after_first = page.dom().clone();
        let wirings = page.wiring_count();
        let timers = page.pending_timers();

        let logs = logging::capture(|| {
            assert_eq!(
                page.initialize(InitializationOptions::default()),
                InitOutcome::AlreadyInitialized
            );
        });
        assert!(logs.contains("page is already initialized"));
        page.notify_idle();
        assert_eq!(page.dom(), &dom_after_first);
        assert_eq!(page.wiring_count(), wirings);
        assert_eq!(page.pending_timers(), timers);
    }

    #[test]
    fn separate_pages_do_not_share_initialization() {
        let mut first = page(MemoryDom::new());
        let mut second = page(MemoryDom::new());
        first.initialize(InitializationOptions::default());
        assert!(first.state().is_initialized());
        assert!(!second.state().is_initialized());
        assert!(matches!(
            second.initialize(InitializationOptions::default()),
            InitOutcome::Initialized(_)
        ));
    }

    #[test]
    fn immediate_phase_marks_page_loaded_before_deferred_work() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        dom.add(body, "button", "nav-toggle");
        dom.add(body, "ul", "nav-menu");
        let mut page = page(dom);

        let InitOutcome::Initialized(report) = page.initialize(InitializationOptions::default()) else {
            panic!("expected initialization");
        };
        assert_eq!(
            report.wired,
            vec![Feature::Navigation, Feature::SmoothScroll, Feature::ErrorHandling]
        );
        assert!(page.dom().has_class(page.dom().body(), "page-loaded"));
        assert!(!page.state().deferred_ran());
        assert!(page.deferred_report().is_empty());
    }

    #[test]
    fn deferred_phase_waits_for_idle_or_timeout() {
        let mut page = page(MemoryDom::new());
        page.initialize(InitializationOptions::default());
        page.advance_to(PageTimings::IDLE_CALLBACK_TIMEOUT_MS - 1);
        assert!(!page.state().deferred_ran());
        page.advance_to(PageTimings::IDLE_CALLBACK_TIMEOUT_MS);
        assert!(page.state().deferred_ran());
        assert!(page.deferred_report().contains(&Feature::Accessibility));
    }

    #[test]
    fn deferred_phase_falls_back_to_short_delay_without_idle_support() {
        let caps = HostCapabilities {
            idle_callback: false,
            ..HostCapabilities::default()
        };
        let mut page = page_with(MemoryDom::new(), caps);
        page.initialize(InitializationOptions::default());
        page.notify_idle();
        assert!(!page.state().deferred_ran());
        page.advance_to(PageTimings::IDLE_FALLBACK_DELAY_MS);
        assert!(page.state().deferred_ran());
    }

    #[test]
    fn stat_scenario_reveals_once_without_navigation_or_toggles() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let stats: Vec<ElementId> = (0..3)
            .map(|i| {
                let el = dom.add(body, "div", "stat-1");
                dom.set_rect(el, Rect::new(0.0, 1_000.0 + i as f32 * 120.0, 300.0, 100.0));
                el
            })
            .collect();
        let mut page = page(dom);

        let options = InitializationOptions::from_json(
            r#"{"accessibility":false,"animations":true,"animationSelectors":[".stat-1"]}"#,
        )
        .unwrap();
        let mut outcome = None;
        let logs = logging::capture(|| outcome = Some(page.initialize(options)));
        let Some(InitOutcome::Initialized(report)) = outcome else {
            panic!("expected initialization");
        };
        assert!(logs.contains("WARN"));
        assert!(logs.contains("navigation elements not found"));
        assert!(!report.wired.contains(&Feature::Navigation));
        page.notify_idle();

        for el in &stats {
            assert_eq!(page.dom().style(*el, "opacity").as_deref(), Some("0"));
        }

        // Scroll so each card sits fully inside the viewport minus the 50px
        // bottom margin.
        for (i, el) in stats.iter().enumerate() {
            page.dom_mut()
                .set_rect(*el, Rect::new(0.0, 100.0 + i as f32 * 120.0, 300.0, 100.0));
        }
        page.dispatch(PageEvent::Scroll);
        for el in &stats {
            assert_eq!(page.dom().style(*el, "opacity").as_deref(), Some("1"));
            assert_eq!(page.dom().style(*el, "transform").as_deref(), Some("translateY(0)"));
        }

        // Cross the threshold again: nothing is applied a second time.
        for (i, el) in stats.iter().enumerate() {
            page.dom_mut()
                .set_rect(*el, Rect::new(0.0, 2_000.0 + i as f32 * 120.0, 300.0, 100.0));
        }
        page.dispatch(PageEvent::Scroll);
        for (i, el) in stats.iter().enumerate() {
            page.dom_mut()
                .set_rect(*el, Rect::new(0.0, 100.0 + i as f32 * 120.0, 300.0, 100.0));
        }
        page.dispatch(PageEvent::Scroll);
        assert_eq!(page.reveal().unwrap().revealed().len(), 3);

        assert!(page.dom().query(".contrast-toggle").unwrap().is_none());
        assert!(page.dom().query(".text-size-toggle").unwrap().is_none());
    }

    #[test]
    fn element_in_bottom_margin_stays_hidden() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let card = dom.add(body, "article", "work-card");
        // Bottom 30px of a 720px viewport: inside the -50px margin.
        dom.set_rect(card, Rect::new(0.0, 690.0, 300.0, 200.0));
        let mut page = page(dom);
        page.initialize(InitializationOptions::default());
        page.notify_idle();
        assert_eq!(page.dom().style(card, "opacity").as_deref(), Some("0"));
        assert!(page.observers().is_observed(card, ObserverKind::Reveal));
    }

    #[test]
    fn reveal_is_skipped_without_intersection_observer() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let card = dom.add(body, "div", "fact-item");
        let caps = HostCapabilities {
            intersection_observer: false,
            ..HostCapabilities::default()
        };
        let mut page = page_with(dom, caps);
        page.initialize(InitializationOptions::default());
        let logs = logging::capture(|| page.notify_idle());
        assert!(logs.contains("intersection observer not supported"));
        assert!(page.reveal().is_none());
        assert_eq!(page.dom().style(card, "opacity"), None);
    }

    #[test]
    fn carousel_controls_wrap_and_respect_transition_lock() {
        let (dom, _, quotes, prev, next) = quotes_dom(3);
        let mut page = page(dom);
        page.initialize(InitializationOptions::default());
        page.notify_idle();
        assert_eq!(active_quote(&page, &quotes), 0);

        page.dispatch(PageEvent::Click { target: prev });
        assert_eq!(active_quote(&page, &quotes), 2);
        // Locked for the transition.
        page.dispatch(PageEvent::Click { target: next });
        assert_eq!(active_quote(&page, &quotes), 2);

        page.advance_to(page.now_ms() + PageTimings::TRANSITION_DURATION_MS);
        assert_eq!(page.carousel().unwrap().state().phase(), CarouselPhase::Steady);
        page.dispatch(PageEvent::Click { target: next });
        assert_eq!(active_quote(&page, &quotes), 0);
    }

    #[test]
    fn arrow_keys_only_work_with_section_in_view() {
        let (dom, section, quotes, _, _) = quotes_dom(4);
        let mut page = page(dom);
        page.initialize(InitializationOptions::default());
        page.notify_idle();

        page.dispatch(PageEvent::KeyDown {
            key: "ArrowRight".into(),
        });
        assert_eq!(active_quote(&page, &quotes), 1);

        page.advance_to(page.now_ms() + PageTimings::TRANSITION_DURATION_MS);
        page.dom_mut()
            .set_rect(section, Rect::new(0.0, 900.0, 1280.0, 300.0));
        page.dispatch(PageEvent::KeyDown {
            key: "ArrowLeft".into(),
        });
        assert_eq!(active_quote(&page, &quotes), 1);
    }

    #[test]
    fn autoplay_pauses_on_hover_and_hidden_tab() {
        let (dom, section, quotes, _, _) = quotes_dom(3);
        let mut page = page(dom);
        page.initialize(InitializationOptions::default());
        page.notify_idle();
        let start = page.now_ms();

        page.advance_to(start + PageTimings::AUTOPLAY_INTERVAL_MS);
        assert_eq!(active_quote(&page, &quotes), 1);

        page.dispatch(PageEvent::PointerEnter { target: section });
        assert!(!page.carousel().unwrap().is_autoplaying());
        page.advance_to(start + 4 * PageTimings::AUTOPLAY_INTERVAL_MS);
        assert_eq!(active_quote(&page, &quotes), 1);

        page.dispatch(PageEvent::PointerLeave { target: section });
        let resumed = page.now_ms();
        page.advance_to(resumed + PageTimings::AUTOPLAY_INTERVAL_MS);
        assert_eq!(active_quote(&page, &quotes), 2);

        page.dispatch(PageEvent::VisibilityChanged { hidden: true });
        page.advance_to(resumed + 5 * PageTimings::AUTOPLAY_INTERVAL_MS);
        assert_eq!(active_quote(&page, &quotes), 2);

        page.dispatch(PageEvent::VisibilityChanged { hidden: false });
        let visible = page.now_ms();
        page.advance_to(visible + PageTimings::AUTOPLAY_INTERVAL_MS);
        assert_eq!(active_quote(&page, &quotes), 0);
    }

    #[test]
    fn manual_navigation_restarts_autoplay_interval() {
        let (dom, _, quotes, _, next) = quotes_dom(3);
        let mut page = page(dom);
        page.initialize(InitializationOptions::default());
        page.notify_idle();
        let start = page.now_ms();

        page.advance_to(start + 4_000);
        page.dispatch(PageEvent::Click { target: next });
        assert_eq!(active_quote(&page, &quotes), 1);
        // The first 5s deadline was cleared, not left running.
        page.advance_to(start + 5_000);
        assert_eq!(active_quote(&page, &quotes), 1);
        page.advance_to(start + 9_000);
        assert_eq!(active_quote(&page, &quotes), 2);
    }

    #[test]
    fn smooth_scroll_prevents_default_for_present_targets() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let link = dom.add_with_attrs(body, "a", "", &[("href", "#works")]);
        let dead = dom.add_with_attrs(body, "a", "", &[("href", "#nowhere")]);
        let works = dom.add_with_attrs(body, "section", "", &[("id", "works")]);
        let mut page = page(dom);
        page.initialize(InitializationOptions::default());

        assert_eq!(
            page.dispatch(PageEvent::Click { target: link }),
            EventOutcome {
                default_prevented: true
            }
        );
        assert_eq!(page.dom().scrolled_to(), &[works]);
        assert!(!page.dispatch(PageEvent::Click { target: dead }).default_prevented);
    }

    #[test]
    fn captured_errors_are_counted_not_fatal() {
        let mut page = page(MemoryDom::new());
        page.initialize(InitializationOptions::default());
        page.dispatch(PageEvent::Error {
            message: "TypeError".into(),
        });
        page.dispatch(PageEvent::UnhandledRejection {
            reason: "network".into(),
        });
        assert_eq!(page.errors().unwrap().captured(), (1, 1));
    }

    #[test]
    fn slow_load_is_flagged_after_load_event() {
        let mut page = page(MemoryDom::new());
        let options = InitializationOptions {
            performance_monitoring: true,
            ..InitializationOptions::default()
        };
        page.initialize(options);
        page.notify_idle();
        page.dispatch(PageEvent::Load {
            navigation_start_ms: 0,
            load_event_end_ms: 3_400,
        });
        assert_eq!(page.performance().unwrap().load_time_ms(), None);
        page.advance_to(page.now_ms());
        assert_eq!(page.performance().unwrap().load_time_ms(), Some(3_400));
        assert!(page.performance().unwrap().is_slow());
    }

    #[test]
    fn load_before_deferred_phase_is_dropped() {
        let mut page = page(MemoryDom::new());
        page.initialize(InitializationOptions {
            performance_monitoring: true,
            ..InitializationOptions::default()
        });
        page.dispatch(PageEvent::Load {
            navigation_start_ms: 0,
            load_event_end_ms: 850,
        });
        page.notify_idle();
        page.advance_to(page.now_ms());
        assert_eq!(page.performance().unwrap().load_time_ms(), None);
        assert_eq!(page.next_deadline(), None);

        // Hosts hold the load time until the deferred phase has run.
        assert!(page.state().deferred_ran());
        page.dispatch(PageEvent::Load {
            navigation_start_ms: 0,
            load_event_end_ms: 850,
        });
        assert_eq!(page.next_deadline(), Some(page.now_ms()));
        page.advance_to(page.now_ms());
        assert_eq!(page.performance().unwrap().load_time_ms(), Some(850));
    }

    #[test]
    fn lazy_images_load_on_intersection_without_native_support() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let near = dom.add_with_attrs(
            body,
            "img",
            "",
            &[("loading", "lazy"), ("data-src", "tychyna.jpg"), ("alt", "Тичина")],
        );
        dom.set_rect(near, Rect::new(0.0, 100.0, 200.0, 200.0));
        let far = dom.add_with_attrs(body, "img", "", &[("loading", "lazy"), ("src", "far.jpg")]);
        dom.set_rect(far, Rect::new(0.0, 4_000.0, 200.0, 200.0));

        let caps = HostCapabilities {
            native_lazy_loading: false,
            ..HostCapabilities::default()
        };
        let mut page = page_with(dom, caps);
        page.initialize(InitializationOptions::default());
        page.notify_idle();

        assert_eq!(page.dom().attribute(near, "src").as_deref(), Some("tychyna.jpg"));
        assert!(page.dom().has_class(near, "loaded"));
        assert!(!page.dom().has_class(far, "loaded"));
        assert_eq!(page.lazy_images().unwrap().loaded(), 1);
    }

    #[test]
    fn lazy_images_load_eagerly_without_observer() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let img = dom.add_with_attrs(body, "img", "", &[("loading", "lazy"), ("data-src", "bazhan.jpg")]);
        let caps = HostCapabilities {
            native_lazy_loading: false,
            intersection_observer: false,
            ..HostCapabilities::default()
        };
        let mut page = page_with(dom, caps);
        page.initialize(InitializationOptions::default());
        page.notify_idle();
        assert_eq!(page.dom().attribute(img, "src").as_deref(), Some("bazhan.jpg"));
    }

    #[test]
    fn stat_counters_count_up_with_animation_frames() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let stat = dom.add(body, "div", "theater-stat");
        let number = dom.add(stat, "span", "stat-number");
        dom.set_text(number, "200+");
        dom.set_rect(stat, Rect::new(0.0, 100.0, 200.0, 100.0));
        let mut page = page(dom);
        let options = InitializationOptions {
            counter_selectors: vec![".theater-stat".into()],
            ..InitializationOptions::default()
        };
        page.initialize(options);
        page.notify_idle();
        let start = page.now_ms();

        assert_eq!(page.dom().text(number), "0");
        assert!(page.wants_animation_frame());
        page.animation_frame(start + 750);
        assert_eq!(page.dom().text(number), "100");
        page.animation_frame(start + 1_500);
        assert_eq!(page.dom().text(number), "200+");
        assert_eq!(page.counters().unwrap().finished(), 1);
        assert_eq!(page.counters().unwrap().running(), 0);
        assert!(!page.wants_animation_frame());
    }

    #[test]
    fn preloaded_image_swaps_after_host_reports_load() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let img = dom.add_with_attrs(
            body,
            "img",
            "",
            &[("loading", "lazy"), ("data-src", "semenko.jpg"), ("alt", "Семенко")],
        );
        // Just below the fold, inside the 100px preload margin.
        dom.set_rect(img, Rect::new(0.0, 760.0, 300.0, 200.0));
        let mut page = page(dom);
        page.initialize(InitializationOptions {
            image_preloading: true,
            ..InitializationOptions::default()
        });
        page.notify_idle();
        assert!(page.lazy_images().is_none());

        let requests = page.take_image_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].source, "semenko.jpg");
        assert_eq!(page.dom().attribute(img, "src"), None);

        page.dispatch(PageEvent::ImageLoaded { target: img });
        assert_eq!(page.dom().attribute(img, "src").as_deref(), Some("semenko.jpg"));
        assert!(page.dom().has_class(img, "lazy-loaded"));
        assert_eq!(page.preloader().unwrap().loaded(), 1);
        assert!(page.take_image_requests().is_empty());
    }

    #[test]
    fn failed_preload_is_logged() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let img = dom.add_with_attrs(body, "img", "", &[("loading", "lazy"), ("data-src", "gone.jpg")]);
        dom.set_rect(img, Rect::new(0.0, 100.0, 300.0, 200.0));
        let mut page = page(dom);
        page.initialize(InitializationOptions {
            image_preloading: true,
            ..InitializationOptions::default()
        });
        page.notify_idle();
        page.take_image_requests();

        let logs = logging::capture(|| {
            page.dispatch(PageEvent::ImageFailed { target: img });
        });
        assert!(logs.contains("failed to load image"));
        assert!(logs.contains("gone.jpg"));
        assert!(!page.dom().has_class(img, "lazy-loaded"));
    }

    #[test]
    fn time_on_page_is_stored_at_unload() {
        let mut page = page(MemoryDom::new());
        let options = InitializationOptions {
            time_on_page_key: Some("semenko_time_spent".into()),
            ..InitializationOptions::default()
        };
        page.initialize(options);
        page.advance_to(42_300);
        page.dispatch(PageEvent::BeforeUnload);
        assert_eq!(page.storage().get::<u64>("semenko_time_spent"), Some(42));
    }

    #[test]
    fn accessibility_appends_preference_toggles() {
        let mut dom = MemoryDom::new();
        let body = dom.body();
        let link = dom.add_with_attrs(body, "a", "", &[("href", "https://uk.wikipedia.org/")]);
        let mut page = page_with(dom, HostCapabilities::default());
        page.initialize(InitializationOptions::default());
        page.notify_idle();

        let contrast = page.dom().query(".contrast-toggle").unwrap().unwrap();
        page.dispatch(PageEvent::Click { target: contrast });
        assert!(page.dom().has_class(page.dom().body(), "high-contrast"));
        assert_eq!(page.storage().get::<bool>("highContrastEnabled"), Some(true));
        assert_eq!(page.dom().attribute(link, "target").as_deref(), Some("_blank"));
    }

    #[test]
    fn dispose_releases_timers_and_observers() {
        let (mut dom, ..) = quotes_dom(2);
        let body = dom.body();
        let card = dom.add(body, "div", "timeline-item");
        dom.set_rect(card, Rect::new(0.0, 5_000.0, 100.0, 100.0));
        let mut page = page(dom);
        page.initialize(InitializationOptions::default());
        page.notify_idle();
        assert!(page.pending_timers() > 0);
        assert!(page.observers().observed(ObserverKind::Reveal) > 0);

        page.dispose();
        assert_eq!(page.pending_timers(), 0);
        assert_eq!(page.observers().observed(ObserverKind::Reveal), 0);
        assert!(page.carousel().is_none());
    }
}
