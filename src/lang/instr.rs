use super::value::Value;
use std::sync::Arc;

/// Leading marker that turns a token into a command reference.
pub const COMMAND_SIGIL: char = '@';

/// An immutable, shareable sequence of instructions.
///
/// Programs are shared between the operations stacks of every process that
/// runs them, so expanding a sub-program never copies it.
pub type Program = Arc<[Instr]>;

/// A side-effecting callable. It receives the virtual time at which the
/// owning process reached it and runs on the effect queue, never inline.
pub type Effect = Arc<dyn Fn(f64) + Send + Sync>;

/// A single instruction of the ash language.
///
/// The kind of every instruction is decided once, when the program is built,
/// so the interpreter dispatches with a plain `match`.
#[derive(Clone)]
pub enum Instr {
    // ───────────────────────────── Data ──────────────────────────────────
    /// Push a literal value onto the data stack.
    ///
    /// Stack effect: `( -- x )`
    Literal(Value),

    // ─────────────────────────── Commands ────────────────────────────────
    /// Invoke a registered command by name (stored without the sigil).
    Command(String),

    // ──────────────────────── Control structure ──────────────────────────
    /// A nested program. Its elements run left to right before the
    /// enclosing continuation resumes.
    SubProgram(Program),

    /// A callable handed to the effect queue with the current virtual time.
    Deferred(Effect),

    /// Explicit no-op marker.
    Empty,
}

impl Instr {
    /// Classify a textual token: `@name` is a command, anything else a string literal.
    pub fn token(token: &str) -> Instr {
        match token.strip_prefix(COMMAND_SIGIL) {
            Some(name) if !name.is_empty() => Instr::Command(name.to_string()),
            _ => Instr::Literal(Value::String(token.to_string())),
        }
    }

    /// Reference a command by name. A leading sigil is accepted and dropped.
    pub fn command(name: &str) -> Instr {
        Instr::Command(name.strip_prefix(COMMAND_SIGIL).unwrap_or(name).to_string())
    }

    /// Build a nested sub-program.
    pub fn seq(items: impl IntoIterator<Item = Instr>) -> Instr {
        Instr::SubProgram(program(items))
    }

    /// Wrap a closure as a deferred effect.
    pub fn deferred(effect: impl Fn(f64) + Send + Sync + 'static) -> Instr {
        Instr::Deferred(Arc::new(effect))
    }

    /// Quote a program so it lands on the data stack instead of running.
    pub fn quote(items: impl IntoIterator<Item = Instr>) -> Instr {
        Instr::Literal(Value::Program(program(items)))
    }
}

/// Collect instructions into a shared [`Program`].
pub fn program(items: impl IntoIterator<Item = Instr>) -> Program {
    items.into_iter().collect()
}

impl From<Value> for Instr {
    fn from(value: Value) -> Self {
        Instr::Literal(value)
    }
}

impl From<i64> for Instr {
    fn from(n: i64) -> Self {
        Instr::Literal(Value::Integer(n))
    }
}

impl From<f64> for Instr {
    fn from(n: f64) -> Self {
        Instr::Literal(Value::Float(n))
    }
}

impl From<bool> for Instr {
    fn from(b: bool) -> Self {
        Instr::Literal(Value::Bool(b))
    }
}

impl From<&str> for Instr {
    fn from(token: &str) -> Self {
        Instr::token(token)
    }
}

impl From<Vec<Instr>> for Instr {
    fn from(items: Vec<Instr>) -> Self {
        Instr::SubProgram(items.into())
    }
}

impl PartialEq for Instr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Instr::Literal(a), Instr::Literal(b)) => a == b,
            (Instr::Command(a), Instr::Command(b)) => a == b,
            (Instr::SubProgram(a), Instr::SubProgram(b)) => a == b,
            (Instr::Deferred(a), Instr::Deferred(b)) => Arc::ptr_eq(a, b),
            (Instr::Empty, Instr::Empty) => true,
            _ => false,
        }
    }
}

impl std::fmt::Debug for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instr::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Instr::Command(name) => f.debug_tuple("Command").field(name).finish(),
            Instr::SubProgram(items) => f.debug_tuple("SubProgram").field(items).finish(),
            Instr::Deferred(_) => write!(f, "Deferred(<fn>)"),
            Instr::Empty => write!(f, "Empty"),
        }
    }
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instr::Literal(Value::String(s)) => write!(f, "{:?}", s),
            Instr::Literal(value) => write!(f, "{}", value),
            Instr::Command(name) => write!(f, "{}{}", COMMAND_SIGIL, name),
            Instr::SubProgram(items) => {
                write!(f, "[")?;
                for item in items.iter() {
                    write!(f, " {}", item)?;
                }
                write!(f, " ]")
            }
            Instr::Deferred(_) => write!(f, "<deferred>"),
            Instr::Empty => write!(f, "_"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_classification() {
        assert_eq!(Instr::token("@add"), Instr::Command("add".to_string()));
        assert_eq!(
            Instr::token("kick"),
            Instr::Literal(Value::String("kick".to_string()))
        );
        // A lone sigil carries no name and stays a literal.
        assert_eq!(Instr::token("@"), Instr::Literal(Value::String("@".to_string())));
    }

    #[test]
    fn test_command_drops_sigil() {
        assert_eq!(Instr::command("@wait"), Instr::command("wait"));
    }

    #[test]
    fn test_display_round_trips_shape() {
        let instr = Instr::seq([Instr::from(1), "@wait".into(), Instr::Empty, "x".into()]);
        assert_eq!(instr.to_string(), "[ 1 @wait _ \"x\" ]");
    }

    #[test]
    fn test_deferred_equality_is_identity() {
        let a = Instr::deferred(|_| {});
        let b = Instr::deferred(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
