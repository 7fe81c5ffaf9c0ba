pub mod animation;
pub mod backend;
pub mod bookmarks;
pub mod controller;
pub mod dispatch;
pub mod easing;
pub mod fractal;
pub mod input;
pub mod store;
pub mod viewport;

pub use animation::{ANIMATION_DURATION_MS, ANIMATION_TICK_MS};
pub use backend::*;
pub use bookmarks::{BOOKMARKS, Bookmark};
pub use controller::ViewController;
pub use dispatch::{DispatchEvent, Dispatcher};
pub use viewport::{Viewport, ZoomInterpolation};
