use crate::lang::{Instr, Value};
use crate::runtime::runtime_error::type_error;
use crate::runtime::{Commands, Process, RuntimeError};
use std::sync::{Arc, Mutex};

/// Something that makes sound when told to.
///
/// Calls arrive from the effect workers, stamped with the virtual time the
/// process reached the command.
pub trait VoiceEngine: Send + Sync {
    fn trigger(&self, instrument: &str, velocity: f64, time: f64);
    fn set_param(&self, instrument: &str, param: &str, value: f64, time: f64);
}

/// Instruments with a shorthand command of their own.
pub const INSTRUMENTS: [&str; 7] = ["kick", "snare", "hat", "conga", "tom", "strings", "bass"];

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    Trigger {
        instrument: String,
        velocity: f64,
        time: f64,
    },
    Param {
        instrument: String,
        param: String,
        value: f64,
        time: f64,
    },
}

/// Engine that logs and records every event instead of playing it.
#[derive(Debug, Default)]
pub struct LogVoices {
    events: Mutex<Vec<VoiceEvent>>,
}

impl LogVoices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<VoiceEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, event: VoiceEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl VoiceEngine for LogVoices {
    fn trigger(&self, instrument: &str, velocity: f64, time: f64) {
        tracing::info!(instrument, velocity, time, "trigger");
        self.record(VoiceEvent::Trigger {
            instrument: instrument.to_string(),
            velocity,
            time,
        });
    }

    fn set_param(&self, instrument: &str, param: &str, value: f64, time: f64) {
        tracing::info!(instrument, param, value, time, "param");
        self.record(VoiceEvent::Param {
            instrument: instrument.to_string(),
            param: param.to_string(),
            value,
            time,
        });
    }
}

/// `@play ( instrument velocity -- )`, `@param ( instrument param value -- )`
/// and a `( -- )` shorthand per entry of [`INSTRUMENTS`].
///
/// The engine is never called inline: each command schedules a deferred
/// effect as the next instruction of the invoking process.
pub fn commands(engine: Arc<dyn VoiceEngine>) -> Commands {
    let play = engine.clone();
    let param = engine.clone();
    let mut commands = Commands::new()
        .with("play", move |p: &mut Process| {
            let velocity = p.pop_number()?;
            let instrument = pop_name(p)?;
            schedule_trigger(p, &play, instrument, velocity);
            Ok(())
        })
        .with("param", move |p: &mut Process| {
            let value = p.pop_number()?;
            let name = pop_name(p)?;
            let instrument = pop_name(p)?;
            let engine = param.clone();
            p.push_op(Instr::deferred(move |time| {
                engine.set_param(&instrument, &name, value, time)
            }));
            Ok(())
        });

    for instrument in INSTRUMENTS {
        let engine = engine.clone();
        commands.insert(instrument, move |p: &mut Process| {
            schedule_trigger(p, &engine, instrument.to_string(), 1.0);
            Ok(())
        });
    }
    commands
}

fn schedule_trigger(p: &mut Process, engine: &Arc<dyn VoiceEngine>, instrument: String, velocity: f64) {
    let engine = engine.clone();
    p.push_op(Instr::deferred(move |time| {
        engine.trigger(&instrument, velocity, time)
    }));
}

fn pop_name(p: &mut Process) -> Result<String, RuntimeError> {
    match p.pop()? {
        Value::String(name) => Ok(name),
        other => Err(type_error("instrument name", &other)),
    }
}
