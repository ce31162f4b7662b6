//! Per-frame driver connecting an emulation core to one video backend and one input backend

use crate::frontend::{EmulationCore, InputBackend, InputQuery, VideoBackend};
use crate::input::{DeviceKind, Port};
use crate::speed::{FastForwardFlag, SpeedController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Quit,
}

struct BoundInput<'a, I: InputBackend> {
    input: &'a mut I,
    bindings: &'a I::Bindings,
}

impl<I: InputBackend> InputQuery for BoundInput<'_, I> {
    fn input_state(&mut self, port: Port, device: DeviceKind, index: u32, id: u32) -> i16 {
        self.input.input_state(self.bindings, port, device, index, id)
    }
}

pub struct Frontend<V: VideoBackend, I: InputBackend> {
    video: V,
    input: I,
    bindings: I::Bindings,
    exit_key: I::Key,
    speed: SpeedController,
    frame_count: u64,
}

impl<V: VideoBackend, I: InputBackend> Frontend<V, I> {
    /// `fast_forward` must be the same flag the input backend writes to.
    pub fn new(
        video: V,
        input: I,
        bindings: I::Bindings,
        exit_key: I::Key,
        fast_forward: FastForwardFlag,
    ) -> Self {
        log::info!(
            "Using video backend '{}' and input backend '{}'",
            video.identifier(),
            input.identifier()
        );

        Self {
            video,
            input,
            bindings,
            exit_key,
            speed: SpeedController::new(fast_forward),
            frame_count: 0,
        }
    }

    /// Poll input, run the core for one frame, apply fast-forward, and present the frame.
    ///
    /// The core is not run once the exit key reads as pressed.
    ///
    /// # Errors
    ///
    /// Propagates any error from the video backend.
    pub fn run_frame<C: EmulationCore + ?Sized>(
        &mut self,
        core: &mut C,
    ) -> Result<FrameOutcome, V::Err> {
        self.input.poll();
        if self.input.key_pressed(self.exit_key) {
            log::info!("Exit key pressed after {} frames", self.frame_count);
            return Ok(FrameOutcome::Quit);
        }

        core.run_frame(&mut BoundInput { input: &mut self.input, bindings: &self.bindings });

        self.speed.update(&mut self.video);
        self.video.frame(core.frame())?;
        self.frame_count += 1;

        Ok(FrameOutcome::Continue)
    }

    /// Run frames until the exit key is pressed.
    ///
    /// # Errors
    ///
    /// Propagates any error from the video backend.
    pub fn run<C: EmulationCore + ?Sized>(&mut self, core: &mut C) -> Result<(), V::Err> {
        while self.run_frame(core)? == FrameOutcome::Continue {}
        Ok(())
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn video(&self) -> &V {
        &self.video
    }

    pub fn video_mut(&mut self) -> &mut V {
        &mut self.video
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn bindings(&self) -> &I::Bindings {
        &self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::PackedFrame;
    use test_log::test;

    #[derive(Debug, Default)]
    struct RecordingVideo {
        frames: Vec<Vec<u16>>,
        nonblock: Vec<bool>,
        fail: bool,
    }

    impl VideoBackend for RecordingVideo {
        type Err = String;

        fn frame(&mut self, frame: PackedFrame<'_>) -> Result<(), Self::Err> {
            if self.fail {
                return Err("present failed".into());
            }
            self.frames.push(frame.rows().flatten().copied().collect());
            Ok(())
        }

        fn set_nonblock_state(&mut self, nonblock: bool) {
            self.nonblock.push(nonblock);
        }

        fn identifier(&self) -> &'static str {
            "recording"
        }
    }

    // Each poll consumes one scripted step: (held buttons, fast forward, quit)
    struct ScriptedInput {
        steps: Vec<(u32, bool, bool)>,
        current: (u32, bool, bool),
        polls: usize,
        fast_forward: FastForwardFlag,
    }

    impl ScriptedInput {
        fn new(steps: Vec<(u32, bool, bool)>, fast_forward: FastForwardFlag) -> Self {
            Self { steps, current: (0, false, false), polls: 0, fast_forward }
        }
    }

    const EXIT_KEY: u8 = 1;

    impl InputBackend for ScriptedInput {
        type Key = u8;
        type Bindings = u32;

        fn poll(&mut self) {
            if let Some(&step) = self.steps.get(self.polls) {
                self.current = step;
            }
            self.polls += 1;
        }

        fn input_state(
            &mut self,
            bindings: &Self::Bindings,
            _port: Port,
            device: DeviceKind,
            _index: u32,
            id: u32,
        ) -> i16 {
            self.fast_forward.set(self.current.1);
            let held = device == DeviceKind::Joypad && self.current.0 & (bindings << id) != 0;
            held.into()
        }

        fn key_pressed(&self, key: Self::Key) -> bool {
            key == EXIT_KEY && self.current.2
        }

        fn identifier(&self) -> &'static str {
            "scripted"
        }
    }

    // Renders a 1x1 frame containing the number of held buttons among ids 0-3 on port 1
    #[derive(Default)]
    struct CountingCore {
        pixels: [u16; 1],
        runs: u32,
    }

    impl EmulationCore for CountingCore {
        fn run_frame(&mut self, input: &mut dyn InputQuery) {
            self.runs += 1;
            let held: i16 =
                (0..4).map(|id| input.input_state(Port::One, DeviceKind::Joypad, 0, id)).sum();
            self.pixels[0] = held as u16;
        }

        fn frame(&self) -> PackedFrame<'_> {
            PackedFrame::new(&self.pixels, 1, 1, 1)
        }
    }

    fn new_frontend(steps: Vec<(u32, bool, bool)>) -> Frontend<RecordingVideo, ScriptedInput> {
        let flag = FastForwardFlag::new();
        let input = ScriptedInput::new(steps, flag.clone());
        Frontend::new(RecordingVideo::default(), input, 1, EXIT_KEY, flag)
    }

    #[test]
    fn frames_flow_from_input_to_video() {
        let mut frontend = new_frontend(vec![(0b0000, false, false), (0b1011, false, false)]);
        let mut core = CountingCore::default();

        assert_eq!(frontend.run_frame(&mut core), Ok(FrameOutcome::Continue));
        assert_eq!(frontend.run_frame(&mut core), Ok(FrameOutcome::Continue));

        assert_eq!(frontend.video().frames, vec![vec![0], vec![3]]);
        assert_eq!(frontend.frame_count(), 2);
    }

    #[test]
    fn fast_forward_applied_after_core_runs() {
        let mut frontend = new_frontend(vec![
            (0, true, false),
            (0, true, false),
            (0, false, false),
            (0, false, false),
        ]);
        let mut core = CountingCore::default();

        for _ in 0..4 {
            frontend.run_frame(&mut core).unwrap();
        }

        assert_eq!(frontend.video().nonblock, vec![true, false]);
    }

    #[test]
    fn quit_stops_before_running_core() {
        let mut frontend = new_frontend(vec![(0, false, false), (0, false, true)]);
        let mut core = CountingCore::default();

        frontend.run(&mut core).unwrap();

        assert_eq!(core.runs, 1);
        assert_eq!(frontend.video().frames.len(), 1);
        assert_eq!(frontend.input().polls, 2);
    }

    #[test]
    fn video_errors_propagate() {
        let mut frontend = new_frontend(vec![]);
        frontend.video_mut().fail = true;

        let mut core = CountingCore::default();
        assert_eq!(frontend.run_frame(&mut core), Err("present failed".into()));
        assert_eq!(frontend.frame_count(), 0);
    }
}
