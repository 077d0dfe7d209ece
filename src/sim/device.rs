//! Handlers for the simulator's peripherals.
//!
//! The core types here are:
//! - [`Keypad`]: The 16-key input array, along with [`KeySender`] to press keys from another thread.
//! - [`Framebuffer`]: The 64x32 pixel grid that sprites are drawn into.
//! - [`Timers`]: The delay and sound timers, driven by a [`Clock`].

mod keyboard;
mod display;
mod timer;

pub use keyboard::{KeyEvent, KeySender, Keypad, KEY_COUNT};
pub(super) use keyboard::KeyChannel;
pub use display::{Framebuffer, Pixel, HEIGHT, WIDTH};
pub use timer::{Clock, ManualClock, SystemClock, Timers, TICK_PERIOD, TIMER_CAP};
