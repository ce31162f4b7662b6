use crate::InputError;
use crate::bindings::{AxisBinding, BindingEntry, LogicalButton, PortBindings};
use glint_common::frontend::InputBackend;
use glint_common::input::{DeviceKind, Port};
use glint_common::speed::FastForwardFlag;

/// Full-scale magnitude of a raw joystick axis reading.
const AXIS_FULL_SCALE: f32 = 32768.0;

pub const DEFAULT_AXIS_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoystickCaps {
    pub num_buttons: u32,
    pub num_axes: u32,
}

/// Raw platform input state: event queue, keyboard, and the joystick assigned to each port.
pub trait InputDevices {
    type Key: Copy + PartialEq;

    /// Drain pending platform events. Returns true if a quit event was among them.
    fn poll_events(&mut self) -> bool;

    /// Whether the key is currently held. Keys outside the platform keyboard range are never held.
    fn key_down(&self, key: Self::Key) -> bool;

    /// Capabilities of the joystick assigned to `port`, if there is one.
    fn joystick_caps(&self, port: Port) -> Option<JoystickCaps>;

    fn joystick_button(&self, port: Port, button: u32) -> bool;

    fn joystick_axis(&self, port: Port, axis: u32) -> i16;

    fn identifier(&self) -> &'static str;
}

/// Resolves logical button queries against binding tables, combining keyboard, joystick button,
/// and joystick axis sources.
///
/// Once the platform reports a quit event, the configured exit key reads as pressed for the rest
/// of the resolver's lifetime.
pub struct InputResolver<D: InputDevices> {
    devices: D,
    quitting: bool,
    exit_key: D::Key,
    axis_threshold: f32,
    fast_forward: FastForwardFlag,
}

impl<D: InputDevices> InputResolver<D> {
    /// # Errors
    ///
    /// Returns an error if `axis_threshold` is not in (0, 1].
    pub fn new(
        devices: D,
        exit_key: D::Key,
        axis_threshold: f32,
        fast_forward: FastForwardFlag,
    ) -> Result<Self, InputError> {
        if !(axis_threshold > 0.0 && axis_threshold <= 1.0) {
            return Err(InputError::InvalidAxisThreshold(axis_threshold));
        }

        Ok(Self { devices, quitting: false, exit_key, axis_threshold, fast_forward })
    }

    #[must_use]
    pub fn quitting(&self) -> bool {
        self.quitting
    }

    #[must_use]
    pub fn exit_key(&self) -> D::Key {
        self.exit_key
    }

    #[must_use]
    pub fn devices(&self) -> &D {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut D {
        &mut self.devices
    }

    /// Whether any physical source of `entry` is active for `port`.
    #[must_use]
    pub fn is_pressed(&self, port: Port, entry: &BindingEntry<D::Key>) -> bool {
        if entry.key.is_some_and(|key| self.key_pressed(key)) {
            return true;
        }

        let Some(caps) = self.devices.joystick_caps(port) else { return false };

        if let Some(button) = entry.joy_button {
            let button = u32::from(button);
            if button < caps.num_buttons && self.devices.joystick_button(port, button) {
                return true;
            }
        }

        match entry.axis {
            AxisBinding::None => false,
            AxisBinding::Negative(axis) => {
                self.axis_deflection(port, caps, axis).is_some_and(|d| d < -self.axis_threshold)
            }
            AxisBinding::Positive(axis) => {
                self.axis_deflection(port, caps, axis).is_some_and(|d| d > self.axis_threshold)
            }
        }
    }

    fn axis_deflection(&self, port: Port, caps: JoystickCaps, axis: u8) -> Option<f32> {
        let axis = u32::from(axis);
        (axis < caps.num_axes)
            .then(|| f32::from(self.devices.joystick_axis(port, axis)) / AXIS_FULL_SCALE)
    }
}

impl<D: InputDevices> InputBackend for InputResolver<D> {
    type Key = D::Key;
    type Bindings = PortBindings<D::Key>;

    fn poll(&mut self) {
        if self.devices.poll_events() && !self.quitting {
            log::info!("Received quit event");
            self.quitting = true;
        }
    }

    fn input_state(
        &mut self,
        bindings: &Self::Bindings,
        port: Port,
        device: DeviceKind,
        _index: u32,
        id: u32,
    ) -> i16 {
        if device != DeviceKind::Joypad {
            return 0;
        }

        // Every fast-forward entry is resolved on every query to keep the flag current
        let mut pressed = false;
        for entry in bindings.table(port) {
            if entry.button == LogicalButton::FastForward {
                self.fast_forward.set(self.is_pressed(port, entry));
            } else if !pressed && entry.button.id() == id {
                pressed = self.is_pressed(port, entry);
            }
        }

        pressed.into()
    }

    fn key_pressed(&self, key: Self::Key) -> bool {
        (self.quitting && key == self.exit_key) || self.devices.key_down(key)
    }

    fn identifier(&self) -> &'static str {
        self.devices.identifier()
    }
}
