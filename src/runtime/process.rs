use super::commands::Commands;
use super::context::Context;
use super::effects::EffectQueue;
use super::runtime_error::{RuntimeError, runaway, stack_underflow, type_error};
use super::scheduler::Fork;
use crate::lang::{Instr, Program, Value};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default per-`resume` instruction budget of a process.
pub const DEFAULT_PROCESS_BUDGET: usize = 10_000;

/// Message reported for a command token with no invocable handler.
pub const ERR_INSTR_NOT_FOUND: &str = "instruction not recognized";

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A process-wide unique identifier such as `proc12`.
pub fn uid(prefix: &str) -> String {
    format!("{}{}", prefix, NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// One frame of a process's continuation: a program and the index of the
/// next instruction to take from it. Frames on the operations stack always
/// have at least one instruction left.
#[derive(Debug, Clone)]
struct Cursor {
    program: Program,
    index: usize,
}

impl Cursor {
    fn remaining(&self) -> usize {
        self.program.len() - self.index
    }
}

/// A non-fatal problem reported by a process.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub location: String,
    pub message: String,
    pub offending: String,
    pub time: f64,
}

/// Work a command asked the scheduler to do once the current dispatch ends.
pub(crate) enum Request {
    Fork(Fork),
    Stop(String),
}

/// A cooperatively scheduled interpreter.
///
/// Its whole continuation is its state: pending operations, data stack,
/// context and clock all persist between `resume` calls.
pub struct Process {
    name: String,
    commands: Rc<Commands>,
    effects: EffectQueue,
    stack: Vec<Value>,
    operations: Vec<Cursor>,
    context: Context,
    time: f64,
    rate: f64,
    diagnostics: Vec<Diagnostic>,
    requests: Vec<Request>,
}

impl Process {
    pub fn new(name: Option<String>, commands: Rc<Commands>, effects: EffectQueue) -> Self {
        Process {
            name: name.unwrap_or_else(|| uid("proc")),
            commands,
            effects,
            stack: Vec::new(),
            operations: Vec::new(),
            context: Context::new(),
            time: 0.0,
            rate: 1.0,
            diagnostics: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Schedule `program` as the initial pending instruction.
    pub fn with_program(mut self, program: impl Into<Program>) -> Self {
        self.push_program(program.into());
        self
    }

    /// Chain this process's scope to `parent`.
    pub fn with_context(mut self, parent: &Context) -> Self {
        self.context = parent.nested();
        self
    }

    pub fn at(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn commands(&self) -> &Rc<Commands> {
        &self.commands
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    // ─────────────────────────── Data stack ──────────────────────────────

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Vec<Value> {
        &mut self.stack
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(stack_underflow)
    }

    pub fn peek(&self) -> Option<&Value> {
        self.stack.last()
    }

    pub fn pop_number(&mut self) -> Result<f64, RuntimeError> {
        let value = self.pop()?;
        value.as_number().ok_or_else(|| type_error("number", &value))
    }

    pub fn pop_int(&mut self) -> Result<i64, RuntimeError> {
        match self.pop()? {
            Value::Integer(n) => Ok(n),
            other => Err(type_error("integer", &other)),
        }
    }

    pub fn pop_string(&mut self) -> Result<String, RuntimeError> {
        match self.pop()? {
            Value::String(s) => Ok(s),
            other => Err(type_error("string", &other)),
        }
    }

    pub fn pop_program(&mut self) -> Result<Program, RuntimeError> {
        match self.pop()? {
            Value::Program(program) => Ok(program),
            other => Err(type_error("program", &other)),
        }
    }

    // ───────────────────────── Operations stack ──────────────────────────

    pub fn has_operations(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.operations.is_empty()
    }

    /// Instructions still pending at the top level of every frame.
    pub fn pending(&self) -> usize {
        self.operations.iter().map(Cursor::remaining).sum()
    }

    /// Run `program` before everything currently pending.
    pub fn push_program(&mut self, program: Program) {
        if !program.is_empty() {
            self.operations.push(Cursor { program, index: 0 });
        }
    }

    /// Run `instr` before everything currently pending.
    pub fn push_op(&mut self, instr: Instr) {
        self.push_program(Program::from([instr]));
    }

    /// Remove and return the next pending instruction.
    pub fn take_op(&mut self) -> Option<Instr> {
        let cursor = self.operations.last_mut()?;
        let instr = cursor.program[cursor.index].clone();
        cursor.index += 1;
        if cursor.remaining() == 0 {
            self.operations.pop();
        }
        Some(instr)
    }

    /// Drop every pending instruction; the process retires at its next dispatch.
    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }

    // ─────────────────────────────── Time ────────────────────────────────

    /// Advance this process's clock by `amount` scaled by its rate.
    pub fn wait(&mut self, amount: f64) {
        self.time += amount * self.rate;
    }

    /// Advance the clock to the next multiple of `period`.
    pub fn sync(&mut self, period: f64) {
        if period > 0.0 {
            let next = (self.time / period).ceil() * period;
            if next > self.time {
                self.time = next;
            }
        }
    }

    // ───────────────────────── Scheduler requests ────────────────────────

    /// Ask the scheduler to fork a child once this dispatch ends.
    ///
    /// Unless the request names its own scope, the child inherits this
    /// process's context and, when no rate is given, its rate. Returns the
    /// child's name.
    pub fn fork(&mut self, fork: Fork) -> String {
        let mut fork = fork.inherit(self);
        let name = fork.name.get_or_insert_with(|| uid("proc")).clone();
        self.requests.push(Request::Fork(fork));
        name
    }

    /// Ask the scheduler to stop the named process once this dispatch ends.
    /// Stopping oneself also drops every pending instruction at once.
    pub fn stop(&mut self, name: &str) {
        if name == self.name {
            self.operations.clear();
        }
        self.requests.push(Request::Stop(name.to_string()));
    }

    pub(crate) fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    // ───────────────────────────── Execution ─────────────────────────────

    /// Execute pending instructions while the clock has not passed
    /// `deadline`, work remains and `budget` allows.
    ///
    /// Returns whether operations remain. Running out of budget with work
    /// still due is a runaway error; passing the deadline is not.
    pub fn resume(&mut self, deadline: f64, budget: usize) -> Result<bool, RuntimeError> {
        let mut steps = 0;
        while self.time <= deadline && self.has_operations() {
            if steps == budget {
                return Err(runaway(budget).with_context(&self.name));
            }
            steps += 1;
            if let Some(instr) = self.take_op() {
                self.step(instr);
            }
        }
        Ok(self.has_operations())
    }

    fn step(&mut self, instr: Instr) {
        match instr {
            Instr::Empty => {}
            Instr::Deferred(effect) => self.effects.submit(effect, self.time),
            Instr::SubProgram(program) => self.push_program(program),
            Instr::Command(name) => self.invoke(&name),
            Instr::Literal(value) => self.stack.push(value),
        }
    }

    fn invoke(&mut self, name: &str) {
        let instr = Instr::Command(name.to_string());
        let Some(handler) = self.commands.get(name).cloned() else {
            self.error("step", ERR_INSTR_NOT_FOUND, &instr);
            return;
        };
        if let Err(err) = handler(self) {
            self.error(&instr.to_string(), &err.message, &instr);
        }
    }

    /// Report a non-fatal problem. Never fails.
    pub fn error(&mut self, location: &str, message: &str, offending: &dyn std::fmt::Display) {
        let offending = offending.to_string();
        tracing::warn!(
            process = %self.name,
            time = self.time,
            "{} {}: {}",
            location,
            message,
            offending
        );
        self.diagnostics.push(Diagnostic {
            location: location.to_string(),
            message: message.to_string(),
            offending,
            time: self.time,
        });
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.name)
            .field("time", &self.time)
            .field("rate", &self.rate)
            .field("stack", &self.stack)
            .field("pending", &self.pending())
            .finish()
    }
}
