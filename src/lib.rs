//! Shared behavioral scaffolding for static literary-portrait pages.
//!
//! The page runtime ([`page::Page`]) and the particle backdrop
//! ([`particles::ParticleField`]) are written against small host traits
//! ([`dom::Dom`], [`storage::StorageBackend`], [`quality::CapabilityProbe`],
//! [`particles::CanvasHost`]) so they run in a browser through the `web`
//! feature and headless under test.

pub mod config;
pub mod dom;
pub mod error;
pub mod logging;
pub mod page;
pub mod particles;
pub mod quality;
pub mod storage;
pub mod timeline;
pub mod timers;

#[cfg(feature = "web")]
pub mod web;

pub use config::{InitializationOptions, PageTimings, StorageKeys};
pub use dom::{Dom, ElementId, MemoryDom, Rect};
pub use error::{ConfigError, SelectorError, StorageError};
pub use page::{HostCapabilities, HostEnvironment, InitOutcome, Page, PageEvent};
pub use particles::ParticleField;
pub use quality::{CapabilityProbe, QualityTier, StaticProbe};
pub use storage::{MemoryStorage, Storage, StorageBackend};
