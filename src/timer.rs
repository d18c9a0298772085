use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::session::TimerPhase;

/// One second of a countdown, stamped with the ticker that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub epoch: u64,
    pub phase: TimerPhase,
}

/// Owns the single countdown task. Starting a countdown aborts the running
/// one, so at most one ticker is ever alive. Ticks the aborted ticker already
/// queued carry an old epoch and fail [`PhaseTimer::is_current`].
pub struct PhaseTimer {
    phase: TimerPhase,
    epoch: u64,
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl PhaseTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            phase: TimerPhase::Idle,
            epoch: 0,
            handle: None,
            period,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// True only for ticks of the countdown running right now
    pub fn is_current(&self, tick: &Tick) -> bool {
        self.phase != TimerPhase::Idle && tick.epoch == self.epoch && tick.phase == self.phase
    }

    /// Sends one tick per period until stopped or the receiver is gone
    pub fn start(&mut self, phase: TimerPhase, ticks: UnboundedSender<Tick>) {
        self.stop();
        if phase == TimerPhase::Idle {
            return;
        }

        let period = self.period;
        let tick = Tick {
            epoch: self.epoch,
            phase,
        };
        self.phase = phase;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(tick).is_err() {
                    break;
                }
            }
        }));
        debug!(phase = ?phase, epoch = self.epoch, "Countdown started");
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(phase = ?self.phase, epoch = self.epoch, "Countdown stopped");
        }
        self.epoch += 1;
        self.phase = TimerPhase::Idle;
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
