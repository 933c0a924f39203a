use crate::lang::{Instr, Value};
use crate::runtime::{
    Commands, ErrorKind, Process, RuntimeError, Scheduler, SharedTempo, Tempo,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const NOTE_ON: u8 = 0x90;
pub const NOTE_OFF: u8 = 0x80;

pub const CLOCK_TICK: u8 = 0xF8;
pub const SONG_POSITION: u8 = 0xF2;
pub const START: u8 = 0xFA;
pub const STOP: u8 = 0xFC;

/// MIDI clock pulses per quarter note.
pub const TICKS_PER_BEAT: u32 = 24;

const CLOCK_WINDOW: usize = 10;

/// An output port. `timestamp` is in milliseconds of scheduler time.
pub trait MidiOut: Send + Sync {
    fn send(&self, message: &[u8], timestamp: f64);
}

/// Port that logs and records every message instead of sending it.
#[derive(Debug, Default)]
pub struct LogMidi {
    sent: Mutex<Vec<(Vec<u8>, f64)>>,
}

impl LogMidi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Vec<u8>, f64)> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MidiOut for LogMidi {
    fn send(&self, message: &[u8], timestamp: f64) {
        tracing::info!(?message, timestamp, "midi");
        match self.sent.lock() {
            Ok(mut sent) => sent.push((message.to_vec(), timestamp)),
            Err(poisoned) => poisoned.into_inner().push((message.to_vec(), timestamp)),
        }
    }
}

/// `@midi ( status data1 data2 -- )` and
/// `@note ( pitch velocity duration -- )`.
///
/// `@note` plays on the channel bound to `channel` in scope (default 0) and
/// sends the matching note-off `duration` beats later, scaled by the
/// process's rate. Beats become milliseconds through the tempo current when
/// the command runs.
pub fn commands(out: Arc<dyn MidiOut>, tempo: SharedTempo) -> Commands {
    let raw = out.clone();
    let raw_tempo = tempo.clone();
    Commands::new()
        .with("midi", move |p: &mut Process| {
            let data2 = pop_byte(p, 0x7F)?;
            let data1 = pop_byte(p, 0x7F)?;
            let status = pop_byte(p, 0xFF)?;
            let out = raw.clone();
            let tempo = raw_tempo.get();
            p.push_op(Instr::deferred(move |time| {
                out.send(&[status, data1, data2], millis(&tempo, time))
            }));
            Ok(())
        })
        .with("note", move |p: &mut Process| {
            let duration = p.pop_number()? * p.rate();
            let velocity = pop_byte(p, 0x7F)?;
            let pitch = pop_byte(p, 0x7F)?;
            let channel = match p.context().get("channel") {
                Some(Value::Integer(n)) => n.rem_euclid(16) as u8,
                _ => 0,
            };
            let out = out.clone();
            let tempo = tempo.get();
            p.push_op(Instr::deferred(move |time| {
                out.send(&[NOTE_ON | channel, pitch, velocity], millis(&tempo, time));
                out.send(
                    &[NOTE_OFF | channel, pitch, 0],
                    millis(&tempo, time + duration),
                );
            }));
            Ok(())
        })
}

fn millis(tempo: &Tempo, beats: f64) -> f64 {
    tempo.beats_to_seconds(beats) * 1000.0
}

fn pop_byte(p: &mut Process, max: u8) -> Result<u8, RuntimeError> {
    let n = p.pop_int()?;
    if (0..=max as i64).contains(&n) {
        Ok(n as u8)
    } else {
        Err(RuntimeError::new(
            ErrorKind::OutOfRange,
            format!("midi byte out of range: {} (max {})", n, max),
        ))
    }
}

/// What an incoming realtime byte did to the clock follower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    Ignored,
    Reset,
    Start,
    Stop,
    /// A clock pulse while running. `bpm` is the updated tempo estimate once
    /// enough pulses have been seen; `beat` marks every 24th pulse.
    Tick { bpm: Option<f64>, beat: bool },
}

/// Follows an external MIDI clock.
///
/// The tempo estimate is the mean of the last ten pulse intervals.
#[derive(Debug, Default)]
pub struct ClockSync {
    running: bool,
    intervals: VecDeque<f64>,
    pulses: u32,
    last_pulse: Option<f64>,
    bpm: Option<f64>,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn bpm(&self) -> Option<f64> {
        self.bpm
    }

    /// Like [`receive`](Self::receive), and hand any new tempo estimate to
    /// `scheduler`.
    pub fn follow(
        &mut self,
        scheduler: &mut Scheduler,
        status: u8,
        timestamp: f64,
    ) -> ClockEvent {
        let event = self.receive(status, timestamp);
        if let ClockEvent::Tick { bpm: Some(bpm), .. } = event {
            if let Err(e) = scheduler.set_bpm(bpm) {
                tracing::warn!(bpm, "ignoring clock tempo: {}", e.message);
            }
        }
        event
    }

    /// Feed one status byte received at `timestamp` milliseconds.
    pub fn receive(&mut self, status: u8, timestamp: f64) -> ClockEvent {
        match status {
            SONG_POSITION => {
                self.intervals.clear();
                self.pulses = 0;
                self.last_pulse = None;
                ClockEvent::Reset
            }
            START => {
                self.running = true;
                ClockEvent::Start
            }
            STOP => {
                self.running = false;
                ClockEvent::Stop
            }
            CLOCK_TICK if self.running => self.tick(timestamp),
            _ => ClockEvent::Ignored,
        }
    }

    fn tick(&mut self, timestamp: f64) -> ClockEvent {
        let previous = self.last_pulse.replace(timestamp);

        // Warm-up: collect the first interval without estimating yet.
        if self.intervals.is_empty() {
            if let Some(previous) = previous {
                self.intervals.push_front(timestamp - previous);
            }
            self.pulses += 1;
            return ClockEvent::Tick {
                bpm: None,
                beat: false,
            };
        }

        if let Some(previous) = previous {
            self.intervals.push_front(timestamp - previous);
            self.intervals.truncate(CLOCK_WINDOW);
        }
        let avg = self.intervals.iter().sum::<f64>() / self.intervals.len() as f64;
        let bpm = 60_000.0 / (avg * TICKS_PER_BEAT as f64);
        self.bpm = Some(bpm);

        let beat = self.pulses == TICKS_PER_BEAT - 1;
        self.pulses = if beat { 0 } else { self.pulses + 1 };

        ClockEvent::Tick {
            bpm: Some(bpm),
            beat,
        }
    }
}
