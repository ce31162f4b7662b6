pub mod config;
pub mod input;
mod mainloop;
pub mod video;

pub use mainloop::{NativeDriver, NativeDriverError, NativeDriverResult, NativeFrontend};
