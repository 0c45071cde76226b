/// What the host knows about the device. Every probe is optional on the web,
/// so absent values are `None`.
pub trait CapabilityProbe {
    /// `navigator.deviceMemory`, in gigabytes.
    fn device_memory_gb(&self) -> Option<f32>;
    /// `navigator.hardwareConcurrency`.
    fn logical_processors(&self) -> Option<u32>;
    fn prefers_reduced_motion(&self) -> bool;
    fn viewport(&self) -> (f32, f32);
}

/// Fixed answers, for tests and headless runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticProbe {
    pub device_memory_gb: Option<f32>,
    pub logical_processors: Option<u32>,
    pub reduced_motion: bool,
    pub viewport: (f32, f32),
}

impl Default for StaticProbe {
    fn default() -> Self {
        Self {
            device_memory_gb: Some(8.0),
            logical_processors: Some(8),
            reduced_motion: false,
            viewport: (1280.0, 720.0),
        }
    }
}

impl CapabilityProbe for StaticProbe {
    fn device_memory_gb(&self) -> Option<f32> {
        self.device_memory_gb
    }

    fn logical_processors(&self) -> Option<u32> {
        self.logical_processors
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    fn viewport(&self) -> (f32, f32) {
        self.viewport
    }
}

pub const MOBILE_BREAKPOINT_PX: f32 = 768.0;
const MIN_MEMORY_GB: f32 = 4.0;
const MIN_LOGICAL_PROCESSORS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    ReducedMotion,
    LowPowerDevice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Disabled(DisabledReason),
    MobileLow,
    Desktop,
}

#[derive(Debug, Clone, Copy)]
pub struct BudgetProfile {
    pub particle_count: usize,
}

impl QualityTier {
    pub fn classify(probe: &dyn CapabilityProbe) -> Self {
        if probe.prefers_reduced_motion() {
            return Self::Disabled(DisabledReason::ReducedMotion);
        }
        let (width, _) = probe.viewport();
        if width >= MOBILE_BREAKPOINT_PX {
            return Self::Desktop;
        }
        if is_high_performance(probe) {
            Self::MobileLow
        } else {
            Self::Disabled(DisabledReason::LowPowerDevice)
        }
    }

    pub fn budget(self) -> BudgetProfile {
        match self {
            Self::Disabled(_) => BudgetProfile { particle_count: 0 },
            Self::MobileLow => BudgetProfile { particle_count: 15 },
            Self::Desktop => BudgetProfile { particle_count: 30 },
        }
    }

    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled(_))
    }
}

/// Memory gates the decision only when the browser reports it.
pub fn is_high_performance(probe: &dyn CapabilityProbe) -> bool {
    let cores_ok = probe
        .logical_processors()
        .is_some_and(|cores| cores >= MIN_LOGICAL_PROCESSORS);
    match probe.device_memory_gb() {
        Some(memory) => memory >= MIN_MEMORY_GB && cores_ok,
        None => cores_ok,
    }
}

#[cfg(test)]
mod tests {
    use super::{DisabledReason, QualityTier, StaticProbe};

    fn narrow(memory: Option<f32>, cores: Option<u32>) -> StaticProbe {
        StaticProbe {
            device_memory_gb: memory,
            logical_processors: cores,
            viewport: (375.0, 812.0),
            ..StaticProbe::default()
        }
    }

    #[test]
    fn reduced_motion_wins_over_everything() {
        let probe = StaticProbe {
            reduced_motion: true,
            ..StaticProbe::default()
        };
        assert_eq!(
            QualityTier::classify(&probe),
            QualityTier::Disabled(DisabledReason::ReducedMotion)
        );
    }

    #[test]
    fn wide_viewport_ignores_device_class() {
        let probe = StaticProbe {
            device_memory_gb: Some(1.0),
            logical_processors: Some(2),
            ..StaticProbe::default()
        };
        assert_eq!(QualityTier::classify(&probe), QualityTier::Desktop);
        assert_eq!(QualityTier::Desktop.budget().particle_count, 30);
    }

    #[test]
    fn narrow_viewport_needs_memory_and_cores() {
        assert_eq!(QualityTier::classify(&narrow(Some(4.0), Some(4))), QualityTier::MobileLow);
        assert_eq!(
            QualityTier::classify(&narrow(Some(2.0), Some(8))),
            QualityTier::Disabled(DisabledReason::LowPowerDevice)
        );
        assert_eq!(QualityTier::MobileLow.budget().particle_count, 15);
    }

    #[test]
    fn cores_alone_decide_without_memory_reporting() {
        assert_eq!(QualityTier::classify(&narrow(None, Some(6))), QualityTier::MobileLow);
        assert!(!QualityTier::classify(&narrow(None, Some(2))).is_enabled());
        assert!(!QualityTier::classify(&narrow(None, None)).is_enabled());
    }
}
