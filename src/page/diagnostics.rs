use tracing::{error, info, warn};

use crate::config::PageTimings;

/// Global error and rejection logging. Observability only; nothing is retried.
#[derive(Debug, Clone, Default)]
pub struct ErrorCapture {
    errors: usize,
    rejections: usize,
}

impl ErrorCapture {
    pub fn on_error(&mut self, message: &str) {
        self.errors += 1;
        error!(message, "page error");
    }

    pub fn on_unhandled_rejection(&mut self, reason: &str) {
        self.rejections += 1;
        error!(reason, "unhandled promise rejection");
    }

    pub fn captured(&self) -> (usize, usize) {
        (self.errors, self.rejections)
    }
}

/// Navigation-to-load timing, reported after the load event settles.
#[derive(Debug, Clone, Default)]
pub struct PerformanceLog {
    load_time_ms: Option<u64>,
}

impl PerformanceLog {
    pub fn report(&mut self, load_time_ms: u64) {
        self.load_time_ms = Some(load_time_ms);
        info!(load_time_ms, "page load time");
        if self.is_slow() {
            warn!(
                load_time_ms,
                threshold_ms = PageTimings::SLOW_PAGE_LOAD_MS,
                "page load time exceeds threshold, consider optimization"
            );
        }
    }

    pub fn load_time_ms(&self) -> Option<u64> {
        self.load_time_ms
    }

    pub fn is_slow(&self) -> bool {
        self.load_time_ms
            .is_some_and(|ms| ms > PageTimings::SLOW_PAGE_LOAD_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCapture, PerformanceLog};

    #[test]
    fn flags_loads_over_three_seconds() {
        let mut perf = PerformanceLog::default();
        perf.report(3_000);
        assert!(!perf.is_slow());
        perf.report(3_001);
        assert!(perf.is_slow());
        assert_eq!(perf.load_time_ms(), Some(3_001));
    }

    #[test]
    fn counts_captured_errors() {
        let mut capture = ErrorCapture::default();
        capture.on_error("ReferenceError: x is not defined");
        capture.on_unhandled_rejection("timeout");
        capture.on_unhandled_rejection("timeout");
        assert_eq!(capture.captured(), (1, 2));
    }
}
