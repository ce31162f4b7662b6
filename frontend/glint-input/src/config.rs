use crate::InputError;
use crate::bindings::{AxisBinding, BindingEntry, BindingTable, LogicalButton, PortBindings};
use crate::resolver::DEFAULT_AXIS_THRESHOLD;
use serde::{Deserialize, Serialize};

/// One binding table entry as written in the config file. Keys are platform key names, e.g.
/// SDL scancode names such as `"Z"` or `"Right Shift"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    pub button: LogicalButton,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joy_button: Option<u8>,
    #[serde(default)]
    pub axis: AxisBinding,
}

impl BindingConfig {
    fn new(button: LogicalButton, key: Option<&str>, joy_button: Option<u8>) -> Self {
        Self { button, key: key.map(String::from), joy_button, axis: AxisBinding::None }
    }

    fn with_axis(self, axis: AxisBinding) -> Self {
        Self { axis, ..self }
    }

    fn resolve<K>(
        &self,
        key_from_name: &impl Fn(&str) -> Option<K>,
    ) -> Result<BindingEntry<K>, InputError> {
        let key = self.key.as_deref().map(|name| resolve_key(name, key_from_name)).transpose()?;
        Ok(BindingEntry { button: self.button, key, joy_button: self.joy_button, axis: self.axis })
    }
}

fn resolve_key<K>(name: &str, key_from_name: &impl Fn(&str) -> Option<K>) -> Result<K, InputError> {
    key_from_name(name).ok_or_else(|| InputError::UnknownKey(name.into()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_exit_key")]
    pub exit_key: String,
    #[serde(default = "default_axis_threshold")]
    pub axis_threshold: f32,
    #[serde(default = "default_port_1")]
    pub port_1: Vec<BindingConfig>,
    #[serde(default = "default_port_2")]
    pub port_2: Vec<BindingConfig>,
}

fn default_exit_key() -> String {
    "Escape".into()
}

fn default_axis_threshold() -> f32 {
    DEFAULT_AXIS_THRESHOLD
}

// Joystick buttons 0-7 and left stick directions, shared by both ports
fn default_joypad(button: LogicalButton) -> (Option<u8>, AxisBinding) {
    match button {
        LogicalButton::B => (Some(0), AxisBinding::None),
        LogicalButton::A => (Some(1), AxisBinding::None),
        LogicalButton::Y => (Some(2), AxisBinding::None),
        LogicalButton::X => (Some(3), AxisBinding::None),
        LogicalButton::L => (Some(4), AxisBinding::None),
        LogicalButton::R => (Some(5), AxisBinding::None),
        LogicalButton::Select => (Some(6), AxisBinding::None),
        LogicalButton::Start => (Some(7), AxisBinding::None),
        LogicalButton::Left => (None, AxisBinding::Negative(0)),
        LogicalButton::Right => (None, AxisBinding::Positive(0)),
        LogicalButton::Up => (None, AxisBinding::Negative(1)),
        LogicalButton::Down => (None, AxisBinding::Positive(1)),
        LogicalButton::FastForward => (None, AxisBinding::None),
    }
}

fn default_port_1_key(button: LogicalButton) -> &'static str {
    match button {
        LogicalButton::B => "Z",
        LogicalButton::Y => "A",
        LogicalButton::Select => "Right Shift",
        LogicalButton::Start => "Return",
        LogicalButton::Up => "Up",
        LogicalButton::Down => "Down",
        LogicalButton::Left => "Left",
        LogicalButton::Right => "Right",
        LogicalButton::A => "X",
        LogicalButton::X => "S",
        LogicalButton::L => "Q",
        LogicalButton::R => "W",
        LogicalButton::FastForward => "Space",
    }
}

fn default_port_1() -> Vec<BindingConfig> {
    LogicalButton::ALL
        .into_iter()
        .map(|button| {
            let (joy_button, axis) = default_joypad(button);
            BindingConfig::new(button, Some(default_port_1_key(button)), joy_button).with_axis(axis)
        })
        .collect()
}

fn default_port_2() -> Vec<BindingConfig> {
    LogicalButton::ALL
        .into_iter()
        .filter(|&button| button != LogicalButton::FastForward)
        .map(|button| {
            let (joy_button, axis) = default_joypad(button);
            BindingConfig::new(button, None, joy_button).with_axis(axis)
        })
        .collect()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            exit_key: default_exit_key(),
            axis_threshold: default_axis_threshold(),
            port_1: default_port_1(),
            port_2: default_port_2(),
        }
    }
}

impl InputConfig {
    /// Parse and validate a TOML input config. Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the config is invalid.
    pub fn from_toml(contents: &str) -> Result<Self, InputError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error if the axis threshold is not in (0, 1].
    pub fn validate(&self) -> Result<(), InputError> {
        if !(self.axis_threshold > 0.0 && self.axis_threshold <= 1.0) {
            return Err(InputError::InvalidAxisThreshold(self.axis_threshold));
        }

        Ok(())
    }

    /// Resolve key names into platform keys.
    ///
    /// # Errors
    ///
    /// Returns an error if any key name is not recognized by `key_from_name`.
    pub fn resolve_exit_key<K>(
        &self,
        key_from_name: impl Fn(&str) -> Option<K>,
    ) -> Result<K, InputError> {
        resolve_key(&self.exit_key, &key_from_name)
    }

    /// Build both ports' binding tables, resolving key names into platform keys.
    ///
    /// # Errors
    ///
    /// Returns an error if any key name is not recognized by `key_from_name`.
    pub fn to_bindings<K>(
        &self,
        key_from_name: impl Fn(&str) -> Option<K>,
    ) -> Result<PortBindings<K>, InputError> {
        let resolve_table = |table: &[BindingConfig]| -> Result<BindingTable<K>, InputError> {
            table.iter().map(|binding| binding.resolve(&key_from_name)).collect()
        };

        Ok(PortBindings {
            port_1: resolve_table(&self.port_1)?,
            port_2: resolve_table(&self.port_2)?,
        })
    }
}
