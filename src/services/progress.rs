// src/services/progress.rs
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// The fake analysis progress eases toward this value and never passes it on its own.
pub const PROGRESS_CEILING: u8 = 95;
pub const PROGRESS_COMPLETE: u8 = 100;
const EASE_FACTOR: f64 = 0.1;
const UPLOAD_SIM_STEP: u8 = 10;

pub type ProgressSender = Arc<watch::Sender<u8>>;

pub fn progress_channel() -> (ProgressSender, watch::Receiver<u8>) {
    let (tx, rx) = watch::channel(0);
    (Arc::new(tx), rx)
}

/// One ease-out step: `floor(p + (95 - p) * 0.1)`, pinned at 95.
pub fn next_tick(current: u8) -> u8 {
    if current >= PROGRESS_CEILING {
        return current;
    }
    let next = current as f64 + (PROGRESS_CEILING - current) as f64 * EASE_FACTOR;
    if next >= PROGRESS_CEILING as f64 {
        PROGRESS_CEILING
    } else {
        next.floor() as u8
    }
}

/// Raises the published value to `value`, never lowering it.
pub fn advance(progress: &watch::Sender<u8>, value: u8) {
    progress.send_if_modified(|current| {
        if value > *current {
            *current = value;
            true
        } else {
            false
        }
    });
}

/// Drives the cosmetic analysis progress until the token is cancelled or a tick stops
/// changing the value.
pub fn spawn_fake_progress(
    progress: ProgressSender,
    tick: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("fake progress cancelled at {}%", *progress.borrow());
                    break;
                }
                _ = ticker.tick() => {
                    let mut settled = false;
                    progress.send_if_modified(|current| {
                        let next = next_tick(*current);
                        if next > *current {
                            *current = next;
                            true
                        } else {
                            settled = true;
                            false
                        }
                    });
                    if settled {
                        debug!("fake progress settled at {}%", *progress.borrow());
                        break;
                    }
                }
            }
        }
    })
}

/// Stands in for real upload progress: +10 per tick up to 100.
pub fn spawn_upload_simulation(
    progress: ProgressSender,
    tick: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
        let mut simulated: u8 = 0;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    simulated = simulated.saturating_add(UPLOAD_SIM_STEP).min(PROGRESS_COMPLETE);
                    advance(&progress, simulated);
                    if simulated >= PROGRESS_COMPLETE {
                        break;
                    }
                }
            }
        }
    })
}
