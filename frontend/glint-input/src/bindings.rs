use glint_common::input::Port;
use glint_proc_macros::{EnumAll, EnumDisplay, EnumFromStr};
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Logical joypad buttons as seen by the emulation core, plus the reserved fast-forward button
/// which only drives the fast-forward flag.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumDisplay,
    EnumFromStr,
    EnumAll,
)]
pub enum LogicalButton {
    B,
    Y,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
    A,
    X,
    L,
    R,
    FastForward,
}

impl LogicalButton {
    #[must_use]
    pub fn id(self) -> u32 {
        match self {
            Self::B => 0,
            Self::Y => 1,
            Self::Select => 2,
            Self::Start => 3,
            Self::Up => 4,
            Self::Down => 5,
            Self::Left => 6,
            Self::Right => 7,
            Self::A => 8,
            Self::X => 9,
            Self::L => 10,
            Self::R => 11,
            Self::FastForward => 12,
        }
    }

    #[must_use]
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|button| button.id() == id)
    }
}

/// One direction of one joystick axis, or no axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AxisBinding {
    #[default]
    None,
    Negative(u8),
    Positive(u8),
}

impl AxisBinding {
    /// Decode a signed axis code: `-(n + 1)` is the negative direction of axis `n`, `n + 1` is
    /// the positive direction, and 0 is no axis.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1.. => u8::try_from(code - 1).ok().map(Self::Positive),
            _ => u8::try_from(-i64::from(code) - 1).ok().map(Self::Negative),
        }
    }

    #[must_use]
    pub fn to_code(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Negative(axis) => -(i32::from(axis) + 1),
            Self::Positive(axis) => i32::from(axis) + 1,
        }
    }
}

impl Display for AxisBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Negative(axis) => write!(f, "-{axis}"),
            Self::Positive(axis) => write!(f, "+{axis}"),
        }
    }
}

impl FromStr for AxisBinding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err_fn = || format!("Invalid axis string: '{s}'");

        if s.eq_ignore_ascii_case("none") {
            return Ok(Self::None);
        }

        let constructor: fn(u8) -> Self = match s.as_bytes().first() {
            Some(b'-') => Self::Negative,
            Some(b'+') => Self::Positive,
            _ => return Err(err_fn()),
        };

        // u8 parsing would accept a second sign character
        let digits = &s[1..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err_fn());
        }

        digits.parse().map(constructor).map_err(|_| err_fn())
    }
}

// Serialized as a single string ("-1", "+0", "none") to keep the TOML config readable
impl Serialize for AxisBinding {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AxisBinding {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AxisBindingVisitor;

        impl Visitor<'_> for AxisBindingVisitor {
            type Value = AxisBinding;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                write!(formatter, "an axis string such as \"-0\", \"+1\", or \"none\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                v.parse().map_err(Error::custom)
            }
        }

        deserializer.deserialize_str(AxisBindingVisitor)
    }
}

/// Maps one logical button to up to three physical sources; the button is active if any source
/// is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingEntry<K> {
    pub button: LogicalButton,
    pub key: Option<K>,
    pub joy_button: Option<u8>,
    pub axis: AxisBinding,
}

impl<K> BindingEntry<K> {
    #[must_use]
    pub fn new(button: LogicalButton) -> Self {
        Self { button, key: None, joy_button: None, axis: AxisBinding::None }
    }

    #[must_use]
    pub fn with_key(self, key: K) -> Self {
        Self { key: Some(key), ..self }
    }

    #[must_use]
    pub fn with_joy_button(self, joy_button: u8) -> Self {
        Self { joy_button: Some(joy_button), ..self }
    }

    #[must_use]
    pub fn with_axis(self, axis: AxisBinding) -> Self {
        Self { axis, ..self }
    }
}

/// Ordered bindings for one port.
pub type BindingTable<K> = Vec<BindingEntry<K>>;

/// Binding tables for both ports. Each table is scanned in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBindings<K> {
    pub port_1: BindingTable<K>,
    pub port_2: BindingTable<K>,
}

impl<K> PortBindings<K> {
    #[must_use]
    pub fn table(&self, port: Port) -> &[BindingEntry<K>] {
        match port {
            Port::One => &self.port_1,
            Port::Two => &self.port_2,
        }
    }
}

impl<K> Default for PortBindings<K> {
    fn default() -> Self {
        Self { port_1: Vec::new(), port_2: Vec::new() }
    }
}
