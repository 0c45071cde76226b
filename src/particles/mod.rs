pub mod config;
pub mod field;
pub mod simulation;

pub use config::{CanvasStyle, ParticleSimConfig, PARTICLE_PALETTE};
pub use field::{
    CanvasHost, CanvasSurface, FrameHandle, FrameOutcome, FrameScheduler, ManualFrames,
    ParticleField, RecordingHost, RecordingSurface,
};
pub use simulation::{Particle, ParticleBatch, ParticleRng};
