use super::process::Process;
use super::runtime_error::RuntimeError;
use crate::lang::COMMAND_SIGIL;
use indexmap::IndexMap;
use std::rc::Rc;

/// A command implementation. It receives the invoking process and acts on it
/// entirely through side effects.
pub type Handler = Rc<dyn Fn(&mut Process) -> Result<(), RuntimeError>>;

#[derive(Clone)]
pub enum Entry {
    Handler(Handler),
    /// Another command's name, rebound to that command's handler when the
    /// registry is installed.
    Alias(String),
}

/// Command registry: name → handler or alias.
///
/// Names are stored without the `@` sigil; either spelling is accepted.
#[derive(Clone, Default)]
pub struct Commands {
    entries: IndexMap<String, Entry>,
}

fn key(name: &str) -> &str {
    name.strip_prefix(COMMAND_SIGIL).unwrap_or(name)
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Commands::insert`].
    pub fn with(
        mut self,
        name: &str,
        handler: impl Fn(&mut Process) -> Result<(), RuntimeError> + 'static,
    ) -> Self {
        self.insert(name, handler);
        self
    }

    /// Builder form of [`Commands::insert_alias`].
    pub fn alias(mut self, name: &str, target: &str) -> Self {
        self.insert_alias(name, target);
        self
    }

    pub fn insert(
        &mut self,
        name: &str,
        handler: impl Fn(&mut Process) -> Result<(), RuntimeError> + 'static,
    ) {
        self.entries
            .insert(key(name).to_string(), Entry::Handler(Rc::new(handler)));
    }

    pub fn insert_alias(&mut self, name: &str, target: &str) {
        self.entries
            .insert(key(name).to_string(), Entry::Alias(key(target).to_string()));
    }

    /// The invocable handler bound to `name`, if any. Unresolved aliases are
    /// not invocable.
    pub fn get(&self, name: &str) -> Option<&Handler> {
        match self.entries.get(key(name)) {
            Some(Entry::Handler(handler)) => Some(handler),
            _ => None,
        }
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(key(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.shift_remove(key(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every entry of `other` into this registry, replacing same-named ones.
    pub fn merge(&mut self, other: Commands) {
        self.entries.extend(other.entries);
    }

    /// Rebind every alias to its target's handler.
    ///
    /// Only one level is followed: targets are looked up in the registry as
    /// it was before this call, so an alias of an alias ends up pointing at
    /// the second name and stays unresolved. Aliases to missing names are left
    /// in place and report as unknown commands when invoked.
    pub fn resolve_aliases(&mut self) {
        let snapshot = self.entries.clone();
        for (name, entry) in self.entries.iter_mut() {
            let Entry::Alias(target) = &*entry else {
                continue;
            };
            match snapshot.get(target.as_str()) {
                Some(resolved) => *entry = resolved.clone(),
                None => tracing::debug!(alias = %name, target = %target, "dangling command alias"),
            }
        }
    }
}

/// What `Scheduler::add_commands` accepts: a table merged into the registry,
/// or a function that builds the new registry from the current one.
pub enum Library {
    Table(Commands),
    Builder(Box<dyn FnOnce(Commands) -> Commands>),
}

impl Library {
    pub fn builder(f: impl FnOnce(Commands) -> Commands + 'static) -> Self {
        Library::Builder(Box::new(f))
    }

    /// Produce the registry that installing this library over `current` yields,
    /// aliases resolved.
    pub fn apply(self, current: Commands) -> Commands {
        let mut next = match self {
            Library::Table(table) => {
                let mut merged = current;
                merged.merge(table);
                merged
            }
            Library::Builder(build) => build(current),
        };
        next.resolve_aliases();
        next
    }
}

impl From<Commands> for Library {
    fn from(table: Commands) -> Self {
        Library::Table(table)
    }
}

impl std::fmt::Debug for Commands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_map();
        for (name, entry) in &self.entries {
            match entry {
                Entry::Handler(_) => list.entry(name, &"<handler>"),
                Entry::Alias(target) => list.entry(name, target),
            };
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Value;

    fn push(n: i64) -> impl Fn(&mut Process) -> Result<(), RuntimeError> {
        move |p: &mut Process| {
            p.push(Value::Integer(n));
            Ok(())
        }
    }

    fn is_handler(commands: &Commands, name: &str) -> bool {
        commands.get(name).is_some()
    }

    #[test]
    fn test_sigil_is_optional() {
        let commands = Commands::new().with("@one", push(1));
        assert!(commands.contains("one"));
        assert!(is_handler(&commands, "@one"));
    }

    #[test]
    fn test_alias_resolves_one_level() {
        let mut commands = Commands::new()
            .with("add", push(0))
            .alias("+", "add")
            .alias("plus", "+");
        commands.resolve_aliases();

        assert!(is_handler(&commands, "+"));
        assert!(Rc::ptr_eq(
            commands.get("+").unwrap(),
            commands.get("add").unwrap()
        ));
        // Two hops: `plus` now names `add` but is not itself invocable.
        assert!(!is_handler(&commands, "plus"));
        assert!(matches!(commands.entry("plus"), Some(Entry::Alias(t)) if t == "add"));
    }

    #[test]
    fn test_dangling_alias_stays_unresolved() {
        let mut commands = Commands::new().alias("ghost", "nowhere");
        commands.resolve_aliases();
        assert!(commands.contains("ghost"));
        assert!(!is_handler(&commands, "ghost"));
    }

    #[test]
    fn test_table_library_merges() {
        let current = Commands::new().with("a", push(1)).with("b", push(2));
        let table = Commands::new().with("b", push(3)).alias("c", "a");

        let next = Library::from(table).apply(current);

        assert_eq!(next.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(Rc::ptr_eq(next.get("c").unwrap(), next.get("a").unwrap()));
    }

    #[test]
    fn test_builder_library_replaces() {
        let current = Commands::new().with("a", push(1)).with("b", push(2));

        let next = Library::builder(|mut current| {
            current.remove("a");
            current.alias("bee", "b")
        })
        .apply(current);

        assert!(!next.contains("a"));
        assert!(is_handler(&next, "bee"));
    }
}
