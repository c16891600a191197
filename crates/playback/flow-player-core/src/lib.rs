//! Flow Player Core (engine-agnostic)
//!
//! A `Player` drives the shape animations of a [`Timeline`] in lockstep with a single
//! timing clock created on a timer element, and a `Driver` layers transport state
//! (play/pause toggle, loop toggle, scrubber, time label) on top of a `Player`.
//!
//! Everything the host owns (timer element, timeline object, shape handles, interval
//! timers, the containing page) is reached through the traits in [`clock`], [`timeline`]
//! and [`host`]. Adapters (wasm) implement those traits; tests use [`VirtualClock`].

pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod host;
pub mod player;
pub mod reveal;
pub mod timeline;
pub mod visibility;

// Re-exports for consumers (adapters)
pub use clock::{PlayState, TimerElement, TimingClock, VirtualClock, VirtualTimer};
pub use config::{AutoPlayConfig, DriverConfig, PlayerConfig, RevealConfig};
pub use driver::{format_time_label, Driver, TransportControls};
pub use error::PlayerError;
pub use host::{ElementResolver, IntervalHandle, IntervalScheduler, PlaybackEvent, PlaybackHost};
pub use player::{clock_duration_ms, FinishCallback, Player, PlayerState, TickReport};
pub use reveal::RevealPlan;
pub use timeline::{Shape, ShapeAnimation, Timeline};
pub use visibility::{TriggerAction, VisibilityTrigger};
