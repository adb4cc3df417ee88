//! Play/pause state machine and the thread that drives it.
//!
//! [`Playback`] decides *when* the next frame advance happens; it never
//! sleeps. [`playback_loop`] is the timer: it owns the single pending
//! deadline and feeds expired ticks back into the state machine.
//!
//! ## Rust concepts
//! - `enum` state machines with data-carrying variants
//! - `mpsc::Receiver::recv_timeout` as an interruptible sleep
//! - `Arc<Mutex<T>>` shared with the HTTP handlers

use crate::animation::Animation;
use crate::editor::Editor;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ── State machine ────────────────────────────────────────────────────

/// A scheduled frame advance.
///
/// Every scheduled tick gets a fresh `id`. Only the tick matching the
/// pending one is accepted, so a tick that was cancelled by `pause` (or
/// already handled) can never advance the animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub id: u64,
    pub delay: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Stopped,
    Playing {
        pending: Tick,
        /// `false` until the immediate tick that follows `play` has fired.
        primed: bool,
    },
}

#[derive(Clone, Debug)]
pub struct Playback {
    state: State,
    last_id: u64,
}

impl Playback {
    pub fn new() -> Self {
        Self {
            state: State::Stopped,
            last_id: 0,
        }
    }

    fn next_tick(&mut self, delay: Duration) -> Tick {
        self.last_id += 1;
        Tick {
            id: self.last_id,
            delay,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, State::Playing { .. })
    }

    /// The tick currently scheduled, if playing.
    pub fn pending(&self) -> Option<Tick> {
        match self.state {
            State::Playing { pending, .. } => Some(pending),
            State::Stopped => None,
        }
    }

    /// Start playing from the current frame.
    ///
    /// Schedules an immediate tick and returns it. Returns `None` when
    /// already playing; the existing pending tick stays in place.
    pub fn play(&mut self) -> Option<Tick> {
        if self.is_playing() {
            return None;
        }
        let tick = self.next_tick(Duration::ZERO);
        self.state = State::Playing {
            pending: tick,
            primed: false,
        };
        Some(tick)
    }

    /// Stop playing and drop the pending tick. Returns `false` if already stopped.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.state = State::Stopped;
        true
    }

    /// Play when stopped, pause when playing. Returns the tick to schedule, if any.
    pub fn toggle(&mut self) -> Option<Tick> {
        if self.is_playing() {
            self.pause();
            None
        } else {
            self.play()
        }
    }

    /// Handle an expired tick and return the next one to schedule.
    ///
    /// The first tick after `play` keeps the current frame on screen; every
    /// later tick advances the animation, wrapping at the end. The next delay
    /// is always the wait of the frame now showing. Stale ticks (already
    /// handled, from an earlier play session, or delivered after `pause`)
    /// return `None` and change nothing.
    pub fn on_tick(&mut self, tick: Tick, animation: &mut Animation) -> Option<Tick> {
        let State::Playing { pending, primed } = self.state else {
            return None;
        };
        if tick != pending {
            return None;
        }

        if primed {
            animation.advance();
        }
        let next = self.next_tick(Duration::from_millis(
            animation.current_frame().wait_ms as u64,
        ));
        self.state = State::Playing {
            pending: next,
            primed: true,
        };
        Some(next)
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new()
    }
}

// ── Timer thread ─────────────────────────────────────────────────────

/// Commands sent from the HTTP handlers to the playback thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Toggle,
}

/// Playback thread: waits for each pending tick and applies it to the editor.
///
/// Runs until the command channel is closed (all senders dropped).
///
/// ## Interrupt pattern
/// While a tick is pending we block in `recv_timeout` until its deadline.
/// A command arriving early wakes us up; we handle it and then keep waiting
/// for the *same* deadline (unless the command replaced the tick), so
/// unrelated commands never stretch a frame.
pub fn playback_loop(rx: Receiver<PlaybackCommand>, editor: Arc<Mutex<Editor>>) {
    let mut scheduled: Option<(Tick, Instant)> = None;

    tracing::info!("Playback thread started");

    loop {
        let received = match scheduled {
            Some((_, deadline)) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(timeout) {
                    Ok(cmd) => Some(cmd),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => break,
            },
        };

        let Ok(mut session) = editor.lock() else {
            tracing::error!("Editor mutex poisoned, stopping playback thread");
            break;
        };

        match received {
            None => {
                let Some((tick, _)) = scheduled.take() else {
                    continue;
                };
                if let Some(next) = session.on_tick(tick) {
                    tracing::debug!(
                        "Showing frame {} for {}ms",
                        session.animation().current(),
                        next.delay.as_millis()
                    );
                    scheduled = Some((next, Instant::now() + next.delay));
                }
            }
            Some(cmd) => {
                let changed = match cmd {
                    PlaybackCommand::Play => session.play(),
                    PlaybackCommand::Pause => {
                        session.pause();
                        None
                    }
                    PlaybackCommand::Toggle => session.toggle_playback(),
                };
                if let Some(tick) = changed {
                    tracing::info!("Playback started at frame {}", session.animation().current());
                    scheduled = Some((tick, Instant::now() + tick.delay));
                } else if !session.is_playing() && scheduled.take().is_some() {
                    tracing::info!("Playback paused at frame {}", session.animation().current());
                }
            }
        }
    }

    tracing::info!("Playback thread: channel closed, shutting down.");
}
