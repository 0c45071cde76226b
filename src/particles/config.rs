pub const PARTICLE_PALETTE: [&str; 3] = ["#E63946", "#D4A574", "#FFFFFF"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSimConfig {
    pub particle_count: usize,
    pub min_size: f32,
    pub size_range: f32,
    /// Velocity components are drawn from `[-max_speed, max_speed)`.
    pub max_speed: f32,
    pub draw_alpha: f32,
}

impl Default for ParticleSimConfig {
    fn default() -> Self {
        Self {
            particle_count: 30,
            min_size: 1.0,
            size_range: 3.0,
            max_speed: 0.15,
            draw_alpha: 0.2,
        }
    }
}

/// Inline style of the backdrop canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasStyle {
    pub opacity: f32,
    pub z_index: i32,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            opacity: 0.15,
            z_index: 0,
        }
    }
}

impl CanvasStyle {
    pub fn css_text(&self) -> String {
        format!(
            "position: fixed; top: 0; left: 0; width: 100%; height: 100%; \
             pointer-events: none; z-index: {}; opacity: {};",
            self.z_index, self.opacity
        )
    }
}

pub const RESIZE_DEBOUNCE_MS: u64 = 250;
