use glint_common::frontend::FrameSize;
use glint_common::input::Port;
use glint_input::{InputDevices, InputError, JoystickCaps};
use sdl2::event::{Event, WindowEvent};
use sdl2::joystick::Joystick;
use sdl2::keyboard::Scancode;
use sdl2::{EventPump, JoystickSubsystem};

const MAX_JOYSTICKS: u32 = 2;

/// SDL event pump, keyboard state, and up to one joystick per port. Joystick N is assigned to
/// port N + 1 in SDL device order.
pub struct SdlDevices {
    event_pump: EventPump,
    joysticks: [Option<Joystick>; 2],
    pending_resize: Option<FrameSize>,
    _joystick_subsystem: JoystickSubsystem,
}

impl SdlDevices {
    /// Open every connected joystick, up to one per port.
    ///
    /// # Errors
    ///
    /// Returns an error if joysticks cannot be enumerated or any joystick fails to open.
    pub fn new(
        joystick_subsystem: JoystickSubsystem,
        event_pump: EventPump,
    ) -> Result<Self, InputError> {
        let num_joysticks =
            joystick_subsystem.num_joysticks().map_err(InputError::JoystickEnumerate)?;
        if num_joysticks > MAX_JOYSTICKS {
            log::warn!(
                "{num_joysticks} joysticks connected; only the first {MAX_JOYSTICKS} will be used"
            );
        }

        let mut joysticks = [None, None];
        for (device_id, slot) in (0..num_joysticks.min(MAX_JOYSTICKS)).zip(&mut joysticks) {
            let joystick = joystick_subsystem.open(device_id).map_err(|err| {
                log::error!("Failed to open joystick {device_id}: {err}");
                InputError::JoystickOpen { index: device_id, message: err.to_string() }
            })?;

            log::info!(
                "Opened joystick {device_id}: {} ({} axes, {} buttons)",
                joystick.name(),
                joystick.num_axes(),
                joystick.num_buttons()
            );
            *slot = Some(joystick);
        }

        Ok(Self {
            event_pump,
            joysticks,
            pending_resize: None,
            _joystick_subsystem: joystick_subsystem,
        })
    }

    /// The most recent window size reported since the last call, if the window was resized.
    pub fn take_resize(&mut self) -> Option<FrameSize> {
        self.pending_resize.take()
    }

    fn joystick(&self, port: Port) -> Option<&Joystick> {
        self.joysticks[port.index()].as_ref()
    }
}

impl InputDevices for SdlDevices {
    type Key = Scancode;

    fn poll_events(&mut self) -> bool {
        for event in self.event_pump.poll_iter() {
            match event {
                // Anything queued after the quit event is left for the next poll
                Event::Quit { .. } => return true,
                Event::Window { win_event: WindowEvent::SizeChanged(width, height), .. } => {
                    log::debug!("Window resized to {width}x{height}");
                    self.pending_resize =
                        Some(FrameSize::new(width.max(0) as u32, height.max(0) as u32));
                }
                _ => {}
            }
        }

        false
    }

    fn key_down(&self, key: Scancode) -> bool {
        self.event_pump.keyboard_state().is_scancode_pressed(key)
    }

    fn joystick_caps(&self, port: Port) -> Option<JoystickCaps> {
        self.joystick(port).map(|joystick| JoystickCaps {
            num_buttons: joystick.num_buttons(),
            num_axes: joystick.num_axes(),
        })
    }

    fn joystick_button(&self, port: Port, button: u32) -> bool {
        self.joystick(port).and_then(|joystick| joystick.button(button).ok()).unwrap_or(false)
    }

    fn joystick_axis(&self, port: Port, axis: u32) -> i16 {
        self.joystick(port).and_then(|joystick| joystick.axis(axis).ok()).unwrap_or(0)
    }

    fn identifier(&self) -> &'static str {
        "sdl"
    }
}
