use serde::Deserialize;

use crate::error::ConfigError;
use crate::timeline::CounterDurations;

/// Fixed timings and thresholds shared by every page.
#[derive(Debug, Clone, Copy)]
pub struct PageTimings;

impl PageTimings {
    pub const AUTOPLAY_INTERVAL_MS: u64 = 5_000;
    pub const ANIMATION_DELAY_MS: u64 = 100;
    pub const SCROLL_THRESHOLD: f32 = 0.1;
    /// Root margin for reveal observation, `0px 0px -50px 0px`.
    pub const SCROLL_MARGIN: RootMargin = RootMargin {
        top: 0.0,
        right: 0.0,
        bottom: -50.0,
        left: 0.0,
    };
    pub const TRANSITION_DURATION_MS: u64 = 500;
    pub const IDLE_CALLBACK_TIMEOUT_MS: u64 = 2_000;
    pub const IDLE_FALLBACK_DELAY_MS: u64 = 1;
    pub const SLOW_PAGE_LOAD_MS: u64 = 3_000;
    pub const COUNTER_THRESHOLD: f32 = 0.5;
    pub const PRELOAD_THRESHOLD: f32 = 0.1;
    /// Root margin for image preloading, `100px 0px`.
    pub const PRELOAD_MARGIN: RootMargin = RootMargin {
        top: 100.0,
        right: 0.0,
        bottom: 100.0,
        left: 0.0,
    };
}

/// Keys the pages persist preferences under.
#[derive(Debug, Clone, Copy)]
pub struct StorageKeys;

impl StorageKeys {
    pub const HIGH_CONTRAST: &'static str = "highContrastEnabled";
    pub const TEXT_SIZE: &'static str = "textSizeLevel";
    pub const THEME: &'static str = "theme";
}

/// Pixel offsets applied to the observation root, CSS margin order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootMargin {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl RootMargin {
    pub const ZERO: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };
}

/// Which feature groups a page wants wired.
///
/// Built once by the host page and never mutated afterwards. Hosts that
/// configure pages from markup can hand over the same camelCase JSON object
/// the page scripts used, see [`InitializationOptions::from_json`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitializationOptions {
    pub navigation: bool,
    pub quotes_slider: bool,
    pub animations: bool,
    pub animation_selectors: Vec<String>,
    pub accessibility: bool,
    pub smooth_scroll: bool,
    pub lazy_loading: bool,
    /// Lazy images are fetched off-document first and swapped in once the
    /// host reports them loaded.
    pub image_preloading: bool,
    pub error_handling: bool,
    pub performance_monitoring: bool,
    /// Stat blocks whose `.stat-number` counts up once half visible.
    pub counter_selectors: Vec<String>,
    pub counter_durations: CounterDurations,
    /// Storage key that receives the seconds spent on the page at unload.
    pub time_on_page_key: Option<String>,
}

impl Default for InitializationOptions {
    fn default() -> Self {
        Self {
            navigation: true,
            quotes_slider: true,
            animations: true,
            animation_selectors: Vec::new(),
            accessibility: true,
            smooth_scroll: true,
            lazy_loading: true,
            image_preloading: false,
            error_handling: true,
            performance_monitoring: false,
            counter_selectors: Vec::new(),
            counter_durations: CounterDurations::default(),
            time_on_page_key: None,
        }
    }
}

impl InitializationOptions {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::InvalidJson)
    }
}
