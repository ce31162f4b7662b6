use glint_proc_macros::{EnumAll, EnumDisplay, EnumFromStr};

/// Controller port on the emulated console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay, EnumFromStr, EnumAll)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Port {
    One,
    Two,
}

impl Port {
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

/// Kind of device the emulation core is querying on a port.
///
/// Only joypads are resolved against bindings; every other kind reads as neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumDisplay, EnumFromStr, EnumAll)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    None,
    Joypad,
    Multitap,
    Mouse,
    LightGun,
}
