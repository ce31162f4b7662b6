pub mod bindings;
pub mod config;
pub mod resolver;

pub use bindings::{AxisBinding, BindingEntry, BindingTable, LogicalButton, PortBindings};
pub use config::{BindingConfig, InputConfig};
pub use resolver::{InputDevices, InputResolver, JoystickCaps};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Axis threshold must be in (0, 1], was {0}")]
    InvalidAxisThreshold(f32),
    #[error("Unknown key name '{0}'")]
    UnknownKey(String),
    #[error("Error parsing input config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Error opening joystick {index}: {message}")]
    JoystickOpen { index: u32, message: String },
    #[error("Error enumerating joysticks: {0}")]
    JoystickEnumerate(String),
}
