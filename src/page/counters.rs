use tracing::{debug, warn};

use super::observer::{ObserverKind, ObserverOptions, ObserverRegistry};
use crate::config::{PageTimings, RootMargin};
use crate::dom::{Dom, ElementId};
use crate::timeline::{CounterAnimation, CounterDurations};

/// Stat blocks whose `.stat-number` counts up when half visible.
#[derive(Debug, Clone, Default)]
pub struct StatCounters {
    running: Vec<(ElementId, CounterAnimation)>,
    finished: usize,
    durations: CounterDurations,
}

impl StatCounters {
    pub fn options() -> ObserverOptions {
        ObserverOptions {
            threshold: PageTimings::COUNTER_THRESHOLD,
            root_margin: RootMargin::ZERO,
        }
    }

    pub fn attach<D: Dom>(
        dom: &D,
        observers: &mut ObserverRegistry,
        selectors: &[String],
        durations: CounterDurations,
    ) -> Option<Self> {
        if selectors.is_empty() {
            return None;
        }
        let selector = selectors.join(", ");
        let stats = match dom.query_all(&selector) {
            Ok(stats) => stats,
            Err(err) => {
                warn!(%selector, error = %err, "counter selectors rejected");
                return None;
            }
        };
        if stats.is_empty() {
            return None;
        }
        for stat in &stats {
            observers.observe(*stat, ObserverKind::Counter, Self::options());
        }
        debug!(stats = stats.len(), "stat counters wired");
        Some(Self {
            durations,
            ..Self::default()
        })
    }

    /// Start counting the stat's number from zero.
    pub fn begin<D: Dom>(&mut self, dom: &mut D, stat: ElementId, now_ms: u64) {
        let Some(number) = dom.query_within(stat, ".stat-number").ok().flatten() else {
            return;
        };
        let Some(animation) = CounterAnimation::from_text(&dom.text(number), now_ms, self.durations) else {
            return;
        };
        dom.set_text(number, &animation.sample(now_ms).text);
        self.running.push((number, animation));
    }

    /// Write the current value of every running counter.
    pub fn step<D: Dom>(&mut self, dom: &mut D, now_ms: u64) {
        let mut done = 0;
        self.running.retain(|(number, animation)| {
            let sample = animation.sample(now_ms);
            dom.set_text(*number, &sample.text);
            if sample.finished {
                done += 1;
            }
            !sample.finished
        });
        self.finished += done;
    }

    pub fn running(&self) -> usize {
        self.running.len()
    }

    pub fn finished(&self) -> usize {
        self.finished
    }
}
