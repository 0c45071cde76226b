use serde::Deserialize;

use crate::config::PageTimings;

/// Count-up durations per counter style. Pages tune the plain one (some
/// count to a bare number over two seconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CounterDurations {
    pub plus_ms: u64,
    pub plain_ms: u64,
}

impl Default for CounterDurations {
    fn default() -> Self {
        Self {
            plus_ms: 1_500,
            plain_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStyle {
    /// `"120+"`: counts up, then restores the trailing plus.
    Plus,
    /// `"3"`: counts up to the bare number.
    Plain,
}

/// Count-up animation whose displayed value is a pure function of the time
/// elapsed since it started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterAnimation {
    pub target: i64,
    pub style: CounterStyle,
    pub duration_ms: u64,
    pub started_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSample {
    pub text: String,
    pub finished: bool,
}

impl CounterAnimation {
    /// Build from the element's current text, `None` when it has no leading
    /// integer.
    pub fn from_text(text: &str, started_at_ms: u64, durations: CounterDurations) -> Option<Self> {
        let target = leading_integer(text)?;
        let (style, duration_ms) = if text.contains('+') {
            (CounterStyle::Plus, durations.plus_ms)
        } else {
            (CounterStyle::Plain, durations.plain_ms)
        };
        Some(Self {
            target,
            style,
            duration_ms,
            started_at_ms,
        })
    }

    pub fn progress(&self, now_ms: u64) -> f64 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now_ms.saturating_sub(self.started_at_ms) as f64;
        (elapsed / self.duration_ms as f64).clamp(0.0, 1.0)
    }

    pub fn sample(&self, now_ms: u64) -> CounterSample {
        let progress = self.progress(now_ms);
        if progress >= 1.0 {
            let text = match self.style {
                CounterStyle::Plus => format!("{}+", self.target),
                CounterStyle::Plain => self.target.to_string(),
            };
            return CounterSample { text, finished: true };
        }
        let value = (self.target as f64 * progress).floor() as i64;
        CounterSample {
            text: value.to_string(),
            finished: false,
        }
    }
}

/// `parseInt` semantics: optional whitespace and sign, then digits.
fn leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| n * sign)
}

/// Stagger for the `index`-th revealed element.
pub fn reveal_delay_ms(index: usize) -> u64 {
    index as u64 * PageTimings::ANIMATION_DELAY_MS
}

pub fn reveal_transition(index: usize) -> String {
    let delay = reveal_delay_ms(index);
    format!("opacity 0.6s ease {delay}ms, transform 0.6s ease {delay}ms")
}

#[cfg(test)]
mod tests {
    use super::{reveal_transition, CounterAnimation, CounterDurations, CounterStyle};

    #[test]
    fn parses_plus_counters() {
        let counter = CounterAnimation::from_text(" 120+ ", 0, CounterDurations::default()).unwrap();
        assert_eq!(counter.target, 120);
        assert_eq!(counter.style, CounterStyle::Plus);
        assert_eq!(counter.duration_ms, 1_500);
        assert!(CounterAnimation::from_text("many", 0, CounterDurations::default()).is_none());
    }

    #[test]
    fn sample_depends_only_on_elapsed_time() {
        let counter = CounterAnimation::from_text("120+", 1_000, CounterDurations::default()).unwrap();
        assert_eq!(counter.sample(1_000).text, "0");
        assert_eq!(counter.sample(1_750).text, "60");
        // Same instant, same answer, however often it is sampled.
        assert_eq!(counter.sample(1_750), counter.sample(1_750));
        let done = counter.sample(2_500);
        assert!(done.finished);
        assert_eq!(done.text, "120+");
    }

    #[test]
    fn plain_counter_ends_on_bare_number() {
        let counter = CounterAnimation::from_text("3", 0, CounterDurations::default()).unwrap();
        assert_eq!(counter.sample(500).text, "1");
        let done = counter.sample(5_000);
        assert!(done.finished);
        assert_eq!(done.text, "3");
    }

    #[test]
    fn plain_duration_is_configurable() {
        let durations = CounterDurations {
            plain_ms: 2_000,
            ..CounterDurations::default()
        };
        let counter = CounterAnimation::from_text("40", 0, durations).unwrap();
        assert_eq!(counter.duration_ms, 2_000);
        assert_eq!(counter.sample(1_000).text, "20");
        assert!(!counter.sample(1_999).finished);
        assert!(counter.sample(2_000).finished);
    }

    #[test]
    fn transition_staggers_by_index() {
        assert_eq!(
            reveal_transition(2),
            "opacity 0.6s ease 200ms, transform 0.6s ease 200ms"
        );
    }
}
