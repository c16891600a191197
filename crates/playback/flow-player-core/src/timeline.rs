//! Timeline contract consumed by the player.
//!
//! A timeline is the opaque data source behind a chart: a fixed duration, the shapes
//! it animates, and a factory for the shape animations. The player never looks at
//! keyframes.

use crate::error::PlayerError;

/// An animatable shape (an SVG root in the browser) with its own animation clock.
pub trait Shape {
    /// Local clock of the shape's internal animations, in seconds.
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn pause_animations(&mut self) -> Result<(), PlayerError>;
    fn unpause_animations(&mut self) -> Result<(), PlayerError>;
}

/// An animation handle bound to one visual element.
pub trait ShapeAnimation {
    fn play(&mut self);
    fn pause(&mut self);
    fn cancel(&mut self);
    /// Drop the reference to the animated element so a cancelled animation cannot
    /// leave stale styles behind when the timeline is swapped.
    fn detach_target(&mut self);
    /// Elapsed time in milliseconds.
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, ms: f64);
    fn set_playback_rate(&mut self, rate: f64);
}

pub trait Timeline {
    /// Total duration in milliseconds; constant for the lifetime of the timeline.
    fn duration_ms(&self) -> f64;

    /// Shapes in iteration order.
    fn shapes_mut(&mut self) -> &mut [Box<dyn Shape>];

    fn load_fill_images(&mut self) {}

    fn load_svg_animations(&mut self) {}

    /// Materialise a fresh set of shape animations (one or more per shape).
    fn create_all_animations(&mut self) -> Vec<Box<dyn ShapeAnimation>>;
}
