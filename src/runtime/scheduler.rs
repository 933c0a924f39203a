use super::commands::{Commands, Library};
use super::context::Context;
use super::effects::EffectQueue;
use super::process::{DEFAULT_PROCESS_BUDGET, Diagnostic, Process, Request};
use super::runtime_error::RuntimeError;
use super::tempo::{SharedTempo, Tempo};
use crate::lang::{Instr, Program, Value};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Shared handle to a scheduled process.
pub type ProcessRef = Rc<RefCell<Process>>;

pub struct SchedulerConfig {
    /// Instructions one process may execute per dispatch.
    pub process_budget: usize,
    /// Dispatches one `resume` call may perform.
    pub dispatch_budget: usize,
    /// Period, in beats, that `@sync` aligns to unless a scope rebinds `pulse`.
    pub pulse: f64,
    pub bpm: f64,
    pub sample_rate: f64,
    pub effect_workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            process_budget: DEFAULT_PROCESS_BUDGET,
            dispatch_budget: 1000,
            pulse: 1.0,
            bpm: 120.0,
            sample_rate: 44_100.0,
            effect_workers: 2,
        }
    }
}

/// A request to start a new process.
pub struct Fork {
    pub(crate) program: Program,
    pub(crate) name: Option<String>,
    pub(crate) delay: f64,
    pub(crate) rate: Option<f64>,
    pub(crate) parent_rate: Option<f64>,
    pub(crate) context: Option<Context>,
}

impl Fork {
    pub fn new(program: impl Into<Program>) -> Self {
        Fork {
            program: program.into(),
            name: None,
            delay: 0.0,
            rate: None,
            parent_rate: None,
            context: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    /// Explicit clock rate. Zero counts as unset.
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Inherit `parent`'s rate and chain to its context.
    pub fn child_of(mut self, parent: &Process) -> Self {
        self.parent_rate = Some(parent.rate());
        self.context = Some(parent.context().clone());
        self
    }

    /// Chain the new process to `context` instead of a parent's.
    pub fn within(mut self, context: &Context) -> Self {
        self.context = Some(context.clone());
        self
    }

    /// Fill in whatever the caller left open from `parent`.
    pub(crate) fn inherit(mut self, parent: &Process) -> Self {
        if self.parent_rate.is_none() {
            self.parent_rate = Some(parent.rate());
        }
        if self.context.is_none() {
            self.context = Some(parent.context().clone());
        }
        self
    }

    fn resolved_rate(&self) -> f64 {
        match self.rate {
            Some(rate) if rate != 0.0 => rate,
            _ => self
                .parent_rate
                .filter(|rate| *rate != 0.0)
                .unwrap_or(1.0),
        }
    }
}

/// Identifies a process to stop: directly or by name.
pub enum Target<'a> {
    Name(&'a str),
    Process(&'a ProcessRef),
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(name: &'a str) -> Self {
        Target::Name(name)
    }
}

impl<'a> From<&'a String> for Target<'a> {
    fn from(name: &'a String) -> Self {
        Target::Name(name)
    }
}

impl<'a> From<&'a ProcessRef> for Target<'a> {
    fn from(process: &'a ProcessRef) -> Self {
        Target::Process(process)
    }
}

/// Virtual-time scheduler for cooperating processes.
///
/// The queue is kept ordered by due time, latest first, so the next process
/// to dispatch is always at the tail. Processes due at the same time run in
/// the order they were forked.
pub struct Scheduler {
    time: f64,
    procs: Vec<ProcessRef>,
    by_name: IndexMap<String, Weak<RefCell<Process>>>,
    commands: Rc<Commands>,
    context: Context,
    effects: EffectQueue,
    config: SchedulerConfig,
    tempo: SharedTempo,
    /// Diagnostics of processes that have left the queue, with their names.
    finished: Vec<(String, Diagnostic)>,
}

impl Scheduler {
    pub fn new() -> Result<Self, RuntimeError> {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Result<Self, RuntimeError> {
        let tempo = Tempo::new(config.bpm, config.sample_rate).validate()?;
        let effects = EffectQueue::new(config.effect_workers)?;
        let context = Context::with_locals([("pulse".to_string(), Value::Float(config.pulse))]);
        Ok(Scheduler {
            time: 0.0,
            procs: Vec::new(),
            by_name: IndexMap::new(),
            commands: Rc::new(Commands::new()),
            context,
            effects,
            tempo: Rc::new(Cell::new(tempo)),
            finished: Vec::new(),
            config,
        })
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// The root context every top-level program runs in.
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn commands(&self) -> &Rc<Commands> {
        &self.commands
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo.get()
    }

    /// Handle for commands that convert beats at dispatch time; it follows
    /// every later [`set_bpm`](Self::set_bpm).
    pub fn shared_tempo(&self) -> SharedTempo {
        self.tempo.clone()
    }

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), RuntimeError> {
        let tempo = Tempo { bpm, ..self.tempo.get() }.validate()?;
        tracing::debug!(bpm, "tempo");
        self.tempo.set(tempo);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    /// Due time of the next process to dispatch.
    pub fn next_due(&self) -> Option<f64> {
        self.procs.last().map(|p| p.borrow().time())
    }

    pub fn get(&self, name: &str) -> Option<ProcessRef> {
        self.by_name.get(name).and_then(Weak::upgrade)
    }

    /// Names of the indexed processes, in fork order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(|k| k.as_str())
    }

    /// Start `program` from the root context.
    ///
    /// When other processes are already scheduled the program is first
    /// aligned to the shared pulse with `@sync`.
    pub fn run(&mut self, program: impl Into<Program>) -> ProcessRef {
        let body = program.into();
        let body = if self.procs.is_empty() {
            body
        } else {
            Program::from([Instr::command("sync"), Instr::SubProgram(body)])
        };
        let fork = Fork::new(body).within(&self.context);
        self.fork(fork)
    }

    pub fn fork(&mut self, fork: Fork) -> ProcessRef {
        let rate = fork.resolved_rate();
        let parent = fork.context.unwrap_or_else(|| self.context.clone());
        let process = Process::new(fork.name, self.commands.clone(), self.effects.clone())
            .with_program(fork.program)
            .with_context(&parent)
            .at(self.time + fork.delay)
            .with_rate(rate);

        let name = process.name().to_string();
        tracing::debug!(process = %name, due = process.time(), rate, "fork");

        let process = Rc::new(RefCell::new(process));
        if self
            .by_name
            .insert(name.clone(), Rc::downgrade(&process))
            .is_some_and(|previous| previous.strong_count() > 0)
        {
            tracing::debug!(process = %name, "name rebound to a new process");
        }
        self.insert(process.clone());
        process
    }

    fn insert(&mut self, process: ProcessRef) {
        let time = process.borrow().time();
        let mut i = self.procs.len();
        while i > 0 && self.procs[i - 1].borrow().time() <= time {
            i -= 1;
        }
        self.procs.insert(i, process);
    }

    /// Advance the scheduler by `duration`, dispatching every process due
    /// before the new horizon, at most `budget` times.
    ///
    /// Returns whether processes remain. Running out of dispatches is logged
    /// and leaves the outstanding work queued. A process that exhausts its
    /// own instruction budget is retired and its error returned.
    pub fn resume(&mut self, duration: f64, budget: usize) -> Result<bool, RuntimeError> {
        let horizon = self.time + duration;
        let mut dispatched = 0;

        while let Some(due) = self.next_due() {
            if due > horizon {
                break;
            }
            if dispatched == budget {
                tracing::warn!(
                    budget,
                    time = self.time,
                    pending = self.procs.len(),
                    "dispatch limit reached, probably runaway scheduling"
                );
                break;
            }
            dispatched += 1;

            let Some(process) = self.procs.pop() else {
                break;
            };
            self.time = self.time.max(due);

            let outcome = process
                .borrow_mut()
                .resume(due, self.config.process_budget);
            let requests = process.borrow_mut().take_requests();

            match outcome {
                Ok(more) => {
                    if self.apply(requests, &process) {
                        continue;
                    }
                    if more {
                        self.insert(process);
                    } else {
                        self.retire(&process);
                    }
                }
                Err(err) => {
                    tracing::error!(process = %process.borrow().name(), "{}", err.message);
                    // Children forked before the limit was hit keep running.
                    self.apply(requests, &process);
                    self.retire(&process);
                    return Err(err);
                }
            }
        }

        self.time = horizon;
        Ok(!self.procs.is_empty())
    }

    /// Carry out the fork and stop requests `current` queued. Returns whether
    /// `current` asked to stop itself.
    fn apply(&mut self, requests: Vec<Request>, current: &ProcessRef) -> bool {
        let mut stopped = false;
        for request in requests {
            match request {
                Request::Fork(fork) => {
                    self.fork(fork);
                }
                Request::Stop(name) => {
                    if name == current.borrow().name() {
                        self.collect(current);
                        self.unindex(current);
                        stopped = true;
                    } else {
                        self.stop(&name);
                    }
                }
            }
        }
        stopped
    }

    fn retire(&mut self, process: &ProcessRef) {
        tracing::debug!(process = %process.borrow().name(), time = self.time, "retire");
        self.collect(process);
        self.unindex(process);
    }

    fn collect(&mut self, process: &ProcessRef) {
        let process = process.borrow();
        self.finished.extend(
            process
                .diagnostics()
                .iter()
                .map(|d| (process.name().to_string(), d.clone())),
        );
    }

    /// Drain the diagnostics of every process that retired or was stopped
    /// since the last call, in the order they left.
    pub fn take_diagnostics(&mut self) -> Vec<(String, Diagnostic)> {
        std::mem::take(&mut self.finished)
    }

    fn unindex(&mut self, process: &ProcessRef) {
        let name = process.borrow().name().to_string();
        if self
            .by_name
            .get(&name)
            .is_some_and(|indexed| Weak::ptr_eq(indexed, &Rc::downgrade(process)))
        {
            self.by_name.shift_remove(&name);
        }
    }

    /// Remove a process from the queue and the name index. Its children are
    /// left running. Returns whether anything was removed.
    pub fn stop<'a>(&mut self, target: impl Into<Target<'a>>) -> bool {
        let process = match target.into() {
            Target::Name(name) => match self.get(name) {
                Some(process) => process,
                None => return false,
            },
            Target::Process(process) => process.clone(),
        };

        let before = self.procs.len();
        self.procs.retain(|p| !Rc::ptr_eq(p, &process));
        self.unindex(&process);

        let removed = self.procs.len() != before;
        if removed {
            tracing::debug!(process = %process.borrow().name(), "stop");
            self.collect(&process);
        }
        removed
    }

    pub fn stop_all(&mut self) {
        for process in std::mem::take(&mut self.procs) {
            self.collect(&process);
        }
        self.by_name.clear();
    }

    /// Install commands. A table is merged into the registry, a builder
    /// replaces it. Running processes keep the registry they were forked with.
    pub fn add_commands(&mut self, library: impl Into<Library>) {
        let current = Commands::clone(&self.commands);
        self.commands = Rc::new(library.into().apply(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::runtime_error::ErrorKind;

    type Log = Rc<RefCell<Vec<String>>>;

    /// `@log ( x -- )` records `x@time`; `@wait ( n -- )` advances the clock.
    fn commands(log: &Log) -> Commands {
        let log = log.clone();
        Commands::new()
            .with("log", move |p: &mut Process| {
                let value = p.pop()?;
                log.borrow_mut().push(format!("{}@{}", value, p.time()));
                Ok(())
            })
            .with("wait", |p: &mut Process| {
                let n = p.pop_number()?;
                p.wait(n);
                Ok(())
            })
            .with("sync", |p: &mut Process| {
                p.sync(1.0);
                Ok(())
            })
    }

    fn scheduler() -> (Scheduler, Log) {
        let log = Log::default();
        let mut scheduler = Scheduler::new().unwrap();
        scheduler.add_commands(commands(&log));
        (scheduler, log)
    }

    fn say(word: &str) -> Vec<Instr> {
        vec![Instr::from(word), Instr::command("log")]
    }

    fn entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[test]
    fn test_smaller_delay_dispatches_first() {
        let (mut s, log) = scheduler();
        s.fork(Fork::new(say("p1")).delay(5.0));
        s.fork(Fork::new(say("p2")).delay(2.0));

        assert!(!s.resume(10.0, 100).unwrap());

        assert_eq!(entries(&log), vec!["p2@2", "p1@5"]);
    }

    #[test]
    fn test_equal_due_times_run_in_fork_order() {
        let (mut s, log) = scheduler();
        for word in ["a", "b", "c"] {
            s.fork(Fork::new(say(word)).delay(1.0));
        }
        s.resume(1.0, 100).unwrap();
        assert_eq!(entries(&log), vec!["a@1", "b@1", "c@1"]);
    }

    #[test]
    fn test_interleaving_by_virtual_time() {
        let (mut s, log) = scheduler();
        let mut slow = say("slow");
        slow.extend([Instr::from(3), Instr::command("wait")]);
        slow.extend(say("slow"));
        let mut fast = say("fast");
        fast.extend([Instr::from(1), Instr::command("wait")]);
        fast.extend(say("fast"));

        s.fork(Fork::new(slow));
        s.fork(Fork::new(fast));
        s.resume(5.0, 100).unwrap();

        assert_eq!(entries(&log), vec!["slow@0", "fast@0", "fast@1", "slow@3"]);
    }

    #[test]
    fn test_rate_scales_only_own_clock() {
        let (mut s, log) = scheduler();
        let mut body = vec![Instr::from(2), Instr::command("wait")];
        body.extend(say("half"));
        s.fork(Fork::new(body.clone()).rate(0.5));
        let mut body = vec![Instr::from(2), Instr::command("wait")];
        body.extend(say("full"));
        s.fork(Fork::new(body));

        s.resume(4.0, 100).unwrap();

        assert_eq!(entries(&log), vec!["half@1", "full@2"]);
    }

    #[test]
    fn test_suspended_process_waits_for_horizon() {
        let (mut s, log) = scheduler();
        let mut body = say("a");
        body.extend([Instr::from(4), Instr::command("wait")]);
        body.extend(say("b"));
        s.fork(Fork::new(body));

        assert!(s.resume(1.0, 100).unwrap());
        assert_eq!(entries(&log), vec!["a@0"]);
        assert_eq!(s.time(), 1.0);
        assert_eq!(s.next_due(), Some(4.0));

        assert!(!s.resume(3.0, 100).unwrap());
        assert_eq!(entries(&log), vec!["a@0", "b@4"]);
    }

    #[test]
    fn test_exhausted_processes_retire() {
        let (mut s, _) = scheduler();
        let p = s.fork(Fork::new(vec![Instr::from(1)]).name("once"));
        assert!(s.get("once").is_some());

        assert!(!s.resume(1.0, 100).unwrap());

        assert!(s.is_empty());
        assert!(s.get("once").is_none());
        assert!(p.borrow().is_exhausted());
        assert!(!s.resume(1.0, 100).unwrap());
    }

    #[test]
    fn test_empty_population_resume() {
        let (mut s, _) = scheduler();
        assert!(!s.resume(2.0, 100).unwrap());
        assert_eq!(s.time(), 2.0);
    }

    #[test]
    fn test_process_runaway_retires_and_reports() {
        let (mut s, _) = scheduler();
        s.add_commands(Commands::new().with("again", |p: &mut Process| {
            p.push_op(Instr::command("again"));
            Ok(())
        }));
        s.fork(Fork::new(vec![Instr::from(2), Instr::command("wait"), Instr::command("again")]).name("spin"));

        let err = s.resume(10.0, 100).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Runaway);
        assert_eq!(err.call_stack, vec!["spin".to_string()]);
        assert_eq!(s.time(), 2.0);
        assert!(s.is_empty());
        assert!(s.get("spin").is_none());
    }

    #[test]
    fn test_children_forked_before_runaway_survive() {
        let (mut s, log) = scheduler();
        s.add_commands(
            Commands::new()
                .with("spawn", |p: &mut Process| {
                    p.fork(Fork::new(say("kid")).name("kid").delay(1.0));
                    Ok(())
                })
                .with("again", |p: &mut Process| {
                    p.push_op(Instr::command("again"));
                    Ok(())
                }),
        );
        s.fork(Fork::new(vec![Instr::command("spawn"), Instr::command("again")]).name("spin"));

        let err = s.resume(10.0, 100).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runaway);
        assert!(s.get("spin").is_none());
        assert!(s.get("kid").is_some());
        assert_eq!(s.next_due(), Some(1.0));

        assert!(!s.resume(2.0, 100).unwrap());
        assert_eq!(entries(&log), vec!["kid@1"]);
    }

    #[test]
    fn test_dispatch_budget_preserves_work() {
        let (mut s, log) = scheduler();
        for word in ["a", "b", "c"] {
            s.fork(Fork::new(say(word)));
        }

        assert!(s.resume(1.0, 2).unwrap());
        assert_eq!(entries(&log), vec!["a@0", "b@0"]);
        assert_eq!(s.len(), 1);

        assert!(!s.resume(1.0, 2).unwrap());
        // The scheduler clock moved on; the late process keeps its own.
        assert_eq!(entries(&log), vec!["a@0", "b@0", "c@0"]);
        assert_eq!(s.time(), 2.0);
    }

    #[test]
    fn test_run_syncs_when_others_scheduled() {
        let (mut s, log) = scheduler();
        let mut first = vec![Instr::from(0.5), Instr::command("wait")];
        first.extend(say("first"));
        s.run(first);
        s.resume(0.25, 100).unwrap();

        let second = s.run(say("second"));
        assert_eq!(
            second.borrow().pending(),
            2,
            "program is wrapped behind @sync"
        );
        s.resume(2.0, 100).unwrap();

        assert_eq!(entries(&log), vec!["first@0.5", "second@1"]);
    }

    #[test]
    fn test_run_alone_is_unwrapped() {
        let (mut s, _) = scheduler();
        let p = s.run(say("solo"));
        assert_eq!(p.borrow().pending(), 2);
        assert!(p.borrow().context().parent().unwrap().ptr_eq(s.context()));
    }

    #[test]
    fn test_fork_request_inherits_rate_and_context() {
        let (mut s, log) = scheduler();
        s.add_commands(Commands::new().with("spawn", |p: &mut Process| {
            p.context().declare("who", Value::from("parent"));
            let child = vec![
                Instr::from(2),
                Instr::command("wait"),
                Instr::command("whoami"),
            ];
            let name = p.fork(Fork::new(child).name("kid").rate(0.0));
            p.push(Value::String(name));
            Ok(())
        }));
        let log2 = log.clone();
        s.add_commands(Commands::new().with("whoami", move |p: &mut Process| {
            let who = p.context().get("who").unwrap_or(Value::from("nobody"));
            log2.borrow_mut().push(format!("{}@{}", who, p.time()));
            Ok(())
        }));

        let parent = s.fork(Fork::new(vec![Instr::command("spawn")]).rate(0.25));
        s.resume(0.0, 100).unwrap();

        assert_eq!(parent.borrow().stack(), &[Value::from("kid")]);
        let kid = s.get("kid").unwrap();
        assert_eq!(kid.borrow().rate(), 0.25);

        s.resume(1.0, 100).unwrap();
        assert_eq!(entries(&log), vec!["parent@0.5"]);
    }

    #[test]
    fn test_stop_by_name_and_handle() {
        let (mut s, _) = scheduler();
        let a = s.fork(Fork::new(say("a")).name("a").delay(1.0));
        s.fork(Fork::new(say("b")).name("b").delay(1.0));

        assert!(s.stop("b"));
        assert!(!s.stop("b"));
        assert!(s.stop(&a));
        assert!(s.is_empty());
        assert_eq!(s.names().count(), 0);
    }

    #[test]
    fn test_stop_request_does_not_cascade() {
        let (mut s, log) = scheduler();
        s.add_commands(Commands::new().with("spawn", |p: &mut Process| {
            let mut child = vec![Instr::from(1), Instr::command("wait")];
            child.extend(say("child"));
            p.fork(Fork::new(child).name("child"));
            Ok(())
        }));
        s.add_commands(Commands::new().with("quit", |p: &mut Process| {
            let me = p.name().to_string();
            p.stop(&me);
            Ok(())
        }));

        let mut body = vec![Instr::command("spawn"), Instr::command("quit")];
        body.extend(say("never"));
        s.fork(Fork::new(body).name("parent"));

        s.resume(2.0, 100).unwrap();

        assert_eq!(entries(&log), vec!["child@1"]);
        assert!(s.get("parent").is_none());
    }

    #[test]
    fn test_name_reuse_after_stop() {
        let (mut s, log) = scheduler();
        s.fork(Fork::new(say("old")).name("x").delay(1.0));
        s.stop("x");
        s.fork(Fork::new(say("new")).name("x").delay(1.0));

        s.resume(1.0, 100).unwrap();

        assert_eq!(entries(&log), vec!["new@1"]);
    }

    #[test]
    fn test_stop_all() {
        let (mut s, log) = scheduler();
        s.fork(Fork::new(say("a")).name("a"));
        s.fork(Fork::new(say("b")));
        s.stop_all();
        assert!(!s.resume(1.0, 100).unwrap());
        assert!(entries(&log).is_empty());
        assert!(s.get("a").is_none());
    }

    #[test]
    fn test_diagnostics_outlive_their_process() {
        let (mut s, _) = scheduler();
        s.fork(Fork::new(vec![Instr::command("nope")]).name("short"));
        let long = vec![Instr::command("wait"), Instr::from(9), Instr::command("wait")];
        s.fork(Fork::new(long).name("long"));

        s.resume(1.0, 100).unwrap();
        let finished = s.take_diagnostics();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].0, "short");
        assert_eq!(finished[0].1.offending, "@nope");
        assert!(s.take_diagnostics().is_empty());

        // Still running; its underflow is handed over when it is stopped.
        s.stop_all();
        let finished = s.take_diagnostics();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].0, "long");
        assert_eq!(finished[0].1.location, "@wait");
    }

    #[test]
    fn test_registry_snapshot_per_process() {
        let (mut s, log) = scheduler();
        let mut body = vec![Instr::from(1), Instr::command("wait")];
        body.extend([Instr::from("x"), Instr::command("shout")]);
        let early = s.fork(Fork::new(body.clone()));

        let log2 = log.clone();
        s.add_commands(Commands::new().with("shout", move |p: &mut Process| {
            let value = p.pop()?;
            log2.borrow_mut().push(format!("{}!", value));
            Ok(())
        }));
        s.fork(Fork::new(body));

        s.resume(2.0, 100).unwrap();

        assert_eq!(entries(&log), vec!["x!"]);
        assert_eq!(early.borrow().diagnostics()[0].offending, "@shout");
    }

    #[test]
    fn test_builder_replaces_registry() {
        let (mut s, _) = scheduler();
        s.add_commands(Library::builder(|mut current| {
            current.remove("log");
            current.alias("pause", "wait")
        }));
        assert!(!s.commands().contains("log"));
        assert!(s.commands().get("pause").is_some());
    }

    #[test]
    fn test_set_bpm_reaches_shared_tempo() {
        let (mut s, _) = scheduler();
        let shared = s.shared_tempo();
        s.set_bpm(90.0).unwrap();
        assert_eq!(shared.get().bpm, 90.0);
        assert_eq!(s.tempo().bpm, 90.0);

        let err = s.set_bpm(0.0).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
        assert_eq!(s.tempo().bpm, 90.0);
    }

    #[test]
    fn test_zero_bpm_config_is_rejected() {
        let config = SchedulerConfig {
            bpm: 0.0,
            ..SchedulerConfig::default()
        };
        let Err(err) = Scheduler::with_config(config) else {
            panic!("scheduler started with zero bpm");
        };
        assert_eq!(err.kind, ErrorKind::Config);
    }

    #[test]
    fn test_root_context_has_pulse() {
        let s = Scheduler::with_config(SchedulerConfig {
            pulse: 4.0,
            ..SchedulerConfig::default()
        })
        .unwrap();
        assert_eq!(s.context().get("pulse"), Some(Value::Float(4.0)));
    }
}
