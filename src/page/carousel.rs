use tracing::debug;

use super::PageTimer;
use crate::config::PageTimings;
use crate::dom::{Dom, ElementId};
use crate::timers::{TimerId, TimerQueue};

const ACTIVE: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselPhase {
    Steady,
    Transitioning,
}

/// Index bookkeeping for a rotating single-visible-item display.
///
/// Navigation is refused while a transition is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarouselState {
    len: usize,
    index: usize,
    phase: CarouselPhase,
}

impl CarouselState {
    /// `None` for an empty carousel.
    pub fn new(len: usize) -> Option<Self> {
        (len > 0).then_some(Self {
            len,
            index: 0,
            phase: CarouselPhase::Steady,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn phase(&self) -> CarouselPhase {
        self.phase
    }

    pub fn next_index(&self) -> usize {
        (self.index + 1) % self.len
    }

    pub fn prev_index(&self) -> usize {
        (self.index + self.len - 1) % self.len
    }

    /// Enter `Showing(index)` and lock further navigation.
    pub fn show(&mut self, index: usize) -> bool {
        if self.phase == CarouselPhase::Transitioning || index >= self.len {
            return false;
        }
        self.index = index;
        self.phase = CarouselPhase::Transitioning;
        true
    }

    pub fn finish_transition(&mut self) {
        self.phase = CarouselPhase::Steady;
    }
}

/// Quote slider: prev/next buttons, dot indicators, arrow keys and autoplay
/// that pauses on hover and while the tab is hidden.
#[derive(Debug, Clone)]
pub struct QuoteCarousel {
    quotes: Vec<ElementId>,
    dots: Vec<ElementId>,
    prev: Option<ElementId>,
    next: Option<ElementId>,
    section: Option<ElementId>,
    state: CarouselState,
    autoplay: Option<TimerId>,
    transition: Option<TimerId>,
}

impl QuoteCarousel {
    pub fn attach<D: Dom>(
        dom: &mut D,
        timers: &mut TimerQueue<PageTimer>,
        now_ms: u64,
    ) -> Option<Self> {
        let quotes = dom.query_all(".quote").unwrap_or_default();
        let state = CarouselState::new(quotes.len())?;
        let mut carousel = Self {
            dots: dom.query_all(".dot").unwrap_or_default(),
            prev: dom.query(".quote-prev").ok().flatten(),
            next: dom.query(".quote-next").ok().flatten(),
            section: dom.query(".quotes-section").ok().flatten(),
            quotes,
            state,
            autoplay: None,
            transition: None,
        };
        carousel.render(dom);
        carousel.start_autoplay(timers, now_ms);
        debug!(slides = carousel.quotes.len(), "quote carousel wired");
        Some(carousel)
    }

    pub fn state(&self) -> CarouselState {
        self.state
    }

    pub fn is_autoplaying(&self) -> bool {
        self.autoplay.is_some()
    }

    pub fn show<D: Dom>(
        &mut self,
        dom: &mut D,
        timers: &mut TimerQueue<PageTimer>,
        now_ms: u64,
        index: usize,
    ) -> bool {
        if !self.state.show(index) {
            return false;
        }
        self.render(dom);
        if let Some(id) = self.transition.take() {
            timers.cancel(id);
        }
        self.transition = Some(timers.schedule(
            now_ms,
            PageTimings::TRANSITION_DURATION_MS,
            PageTimer::CarouselTransitionEnd,
        ));
        true
    }

    pub fn next<D: Dom>(&mut self, dom: &mut D, timers: &mut TimerQueue<PageTimer>, now_ms: u64) -> bool {
        let index = self.state.next_index();
        self.show(dom, timers, now_ms, index)
    }

    pub fn prev<D: Dom>(&mut self, dom: &mut D, timers: &mut TimerQueue<PageTimer>, now_ms: u64) -> bool {
        let index = self.state.prev_index();
        self.show(dom, timers, now_ms, index)
    }

    /// Returns true when the click hit one of the carousel controls.
    pub fn on_click<D: Dom>(
        &mut self,
        dom: &mut D,
        timers: &mut TimerQueue<PageTimer>,
        now_ms: u64,
        target: ElementId,
    ) -> bool {
        if self.next.is_some_and(|b| dom.contains(b, target)) {
            self.next(dom, timers, now_ms);
        } else if self.prev.is_some_and(|b| dom.contains(b, target)) {
            self.prev(dom, timers, now_ms);
        } else if let Some(index) = self.dots.iter().position(|d| dom.contains(*d, target)) {
            self.show(dom, timers, now_ms, index);
        } else {
            return false;
        }
        self.start_autoplay(timers, now_ms);
        true
    }

    /// Arrow keys only act while the section overlaps the viewport.
    pub fn on_key<D: Dom>(
        &mut self,
        dom: &mut D,
        timers: &mut TimerQueue<PageTimer>,
        now_ms: u64,
        key: &str,
        viewport_height: f32,
    ) {
        let Some(rect) = self.section.and_then(|s| dom.bounding_rect(s)) else {
            return;
        };
        if !(rect.top() < viewport_height && rect.bottom() >= 0.0) {
            return;
        }
        match key {
            "ArrowLeft" => {
                self.prev(dom, timers, now_ms);
            }
            "ArrowRight" => {
                self.next(dom, timers, now_ms);
            }
            _ => return,
        }
        self.start_autoplay(timers, now_ms);
    }

    pub fn on_pointer_enter(&mut self, timers: &mut TimerQueue<PageTimer>, target: ElementId) {
        if self.section == Some(target) {
            self.stop_autoplay(timers);
        }
    }

    pub fn on_pointer_leave(&mut self, timers: &mut TimerQueue<PageTimer>, now_ms: u64, target: ElementId) {
        if self.section == Some(target) {
            self.start_autoplay(timers, now_ms);
        }
    }

    pub fn on_visibility(&mut self, timers: &mut TimerQueue<PageTimer>, now_ms: u64, hidden: bool) {
        if hidden {
            self.stop_autoplay(timers);
        } else {
            self.start_autoplay(timers, now_ms);
        }
    }

    pub fn on_timer<D: Dom>(
        &mut self,
        dom: &mut D,
        timers: &mut TimerQueue<PageTimer>,
        now_ms: u64,
        id: TimerId,
        timer: PageTimer,
    ) {
        match timer {
            PageTimer::CarouselTransitionEnd if self.transition == Some(id) => {
                self.transition = None;
                self.state.finish_transition();
            }
            PageTimer::CarouselAutoplay if self.autoplay == Some(id) => {
                self.autoplay = Some(timers.schedule(
                    now_ms,
                    PageTimings::AUTOPLAY_INTERVAL_MS,
                    PageTimer::CarouselAutoplay,
                ));
                self.next(dom, timers, now_ms);
            }
            _ => {}
        }
    }

    /// Clears the running autoplay timer before scheduling a fresh one.
    fn start_autoplay(&mut self, timers: &mut TimerQueue<PageTimer>, now_ms: u64) {
        self.stop_autoplay(timers);
        self.autoplay = Some(timers.schedule(
            now_ms,
            PageTimings::AUTOPLAY_INTERVAL_MS,
            PageTimer::CarouselAutoplay,
        ));
    }

    fn stop_autoplay(&mut self, timers: &mut TimerQueue<PageTimer>) {
        if let Some(id) = self.autoplay.take() {
            timers.cancel(id);
        }
    }

    fn render<D: Dom>(&self, dom: &mut D) {
        let index = self.state.index();
        for (i, quote) in self.quotes.iter().enumerate() {
            if i == index {
                dom.add_class(*quote, ACTIVE);
            } else {
                dom.remove_class(*quote, ACTIVE);
            }
        }
        for (i, dot) in self.dots.iter().enumerate() {
            if i == index {
                dom.add_class(*dot, ACTIVE);
            } else {
                dom.remove_class(*dot, ACTIVE);
            }
        }
    }

    pub fn dispose(&mut self, timers: &mut TimerQueue<PageTimer>) {
        self.stop_autoplay(timers);
        if let Some(id) = self.transition.take() {
            timers.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CarouselPhase, CarouselState};

    #[test]
    fn empty_carousel_stays_idle() {
        assert!(CarouselState::new(0).is_none());
    }

    #[test]
    fn indices_wrap_both_ways() {
        let n = 5;
        for i in [0, n - 1, 2] {
            let mut state = CarouselState::new(n).unwrap();
            if i != 0 {
                assert!(state.show(i));
                state.finish_transition();
            }
            assert_eq!(state.next_index(), (i + 1) % n);
            assert_eq!(state.prev_index(), (i + n - 1) % n);
        }
    }

    #[test]
    fn navigation_is_refused_while_transitioning() {
        let mut state = CarouselState::new(3).unwrap();
        assert!(state.show(1));
        assert_eq!(state.phase(), CarouselPhase::Transitioning);
        assert!(!state.show(2));
        assert_eq!(state.index(), 1);
        state.finish_transition();
        assert!(state.show(2));
    }

    #[test]
    fn single_slide_wraps_to_itself() {
        let state = CarouselState::new(1).unwrap();
        assert_eq!(state.next_index(), 0);
        assert_eq!(state.prev_index(), 0);
    }
}
