use crate::error::{SpriteError, SpriteResult};
use crate::sprite::sheet::SheetConfig;

/// Outcome of one clock update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub advanced: bool,
    pub finished: bool,
}

impl Tick {
    const IDLE: Tick = Tick {
        advanced: false,
        finished: false,
    };
}

/// Mutable playback bookkeeping: the displayed frame, the timestamp of the
/// last advancement and the dirty flag marking that a repaint is owed.
#[derive(Debug, Clone, Copy)]
struct PlaybackState {
    current_frame: usize,
    last_advance: f64,
    dirty: bool,
}

/// Pure timing state machine deciding frame advancement. Knows nothing
/// about the canvas; the driver feeds it timestamps and hands the pending
/// frame to the renderer.
#[derive(Debug)]
pub struct FrameClock {
    number_of_frames: usize,
    frame_interval_ms: f64,
    looped: bool,
    jump_frame: Option<usize>,
    state: PlaybackState,
}

impl FrameClock {
    pub fn new(config: &SheetConfig, start: f64) -> Self {
        let frame_interval_ms = (1000.0 / config.fps).ceil();
        FrameClock {
            number_of_frames: config.number_of_frames.max(1),
            frame_interval_ms,
            looped: config.looped,
            jump_frame: config
                .jump_frame
                .filter(|&jump| jump < config.number_of_frames),
            state: PlaybackState {
                current_frame: 0,
                // primed one interval back: the legacy player kept its
                // last-advance epoch at 0, so its first unpaused tick
                // advanced straight off frame 0
                last_advance: start - frame_interval_ms,
                // frame 0 is owed its first paint
                dirty: true,
            },
        }
    }

    /// Advance at most one frame per elapsed interval.
    ///
    /// Gating is a strict greater-than: a tick landing exactly on the
    /// interval boundary does not yet advance. At the last frame a looping
    /// clock resets to the jump frame (or 0), a non-looping clock reports
    /// `finished` without moving; the caller is expected to stop ticking.
    pub fn update(&mut self, now: f64) -> Tick {
        if now - self.state.last_advance <= self.frame_interval_ms {
            return Tick::IDLE;
        }
        self.state.last_advance = now;

        if self.state.current_frame < self.number_of_frames - 1 {
            self.state.current_frame += 1;
        } else if !self.looped {
            return Tick {
                advanced: false,
                finished: true,
            };
        } else {
            self.state.current_frame = self.jump_frame.unwrap_or(0);
        }

        self.state.dirty = true;
        Tick {
            advanced: true,
            finished: false,
        }
    }

    /// Jump directly to a frame. Out-of-range indices leave the clock
    /// untouched.
    pub fn seek_to(&mut self, index: usize) -> SpriteResult<()> {
        if index >= self.number_of_frames {
            return Err(SpriteError::InvalidFrameIndex(index as f64));
        }
        self.state.current_frame = index;
        self.state.dirty = true;
        Ok(())
    }

    /// Wrap-around step by one, ignoring the interval gate. Debug-mode
    /// frame inspection only.
    pub fn step_forward(&mut self) {
        self.state.current_frame = if self.state.current_frame < self.number_of_frames - 1 {
            self.state.current_frame + 1
        } else {
            0
        };
        self.state.dirty = true;
    }

    pub fn step_backward(&mut self) {
        self.state.current_frame = if self.state.current_frame == 0 {
            self.number_of_frames - 1
        } else {
            self.state.current_frame - 1
        };
        self.state.dirty = true;
    }

    pub fn reset(&mut self) {
        self.state.current_frame = 0;
        self.state.dirty = true;
    }

    pub fn current_frame(&self) -> usize {
        self.state.current_frame
    }

    pub fn frame_interval_ms(&self) -> f64 {
        self.frame_interval_ms
    }

    /// The frame owed a repaint, clearing the dirty flag.
    pub fn take_pending_frame(&mut self) -> Option<usize> {
        if self.state.dirty {
            self.state.dirty = false;
            Some(self.state.current_frame)
        } else {
            None
        }
    }
}
