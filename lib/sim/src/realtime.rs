use std::thread::sleep;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::engine::{SimEngine, FRAME_PERIOD};

/// Fixed period wall clock pacing for `SimEngine::on_frame`.
///
/// A late frame is not made up for: the next deadline is measured from the
/// moment the overrun was noticed, so a slow burst only stretches simulated
/// time relative to wall time.
#[derive(Debug, Clone)]
pub struct FramePacer {
    period: Duration,
    deadline: Instant,
    frames: u64,
    overruns: u64,
}

impl FramePacer {
    pub fn new(period: Duration) -> FramePacer {
        FramePacer {
            period,
            deadline: Instant::now() + period,
            frames: 0,
            overruns: 0,
        }
    }

    /// Sleeps until the current deadline. Returns `false` if it had already
    /// passed.
    pub fn wait(&mut self) -> bool {
        let now = Instant::now();
        self.frames += 1;

        if now < self.deadline {
            sleep(self.deadline - now);
            self.deadline += self.period;
            true
        } else {
            self.overruns += 1;
            debug!("frame {} overran by {:?}", self.frames, now - self.deadline);
            self.deadline = now + self.period;
            false
        }
    }

    /// Runs `frames` paced frames and returns the ticks executed.
    pub fn run(&mut self, engine: &mut SimEngine, frames: usize) -> usize {
        let mut steps = 0;
        for _ in 0..frames {
            steps += engine.on_frame();
            self.wait();
        }
        steps
    }

    pub fn get_period(&self) -> Duration {
        self.period
    }

    pub fn get_frames(&self) -> u64 {
        self.frames
    }

    pub fn get_overruns(&self) -> u64 {
        self.overruns
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        FramePacer::new(FRAME_PERIOD)
    }
}
