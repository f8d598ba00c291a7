use std::collections::BTreeMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Name of the entry that holds the shell's working directory.
pub const WORKING_DIR_VAR: &str = "PWD";

/// True for characters allowed in variable names.
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A `NAME=VALUE` pair, either from user input or from the OS environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    pub value: String,
}

impl Assignment {
    /// Parses `NAME=VALUE`.
    ///
    /// The first `=` separates name and value; anything after it, including
    /// further `=` characters, is the value. Returns `None` when there is no
    /// `=`, the name is empty, or the name has characters outside
    /// `[A-Za-z0-9_]`.
    pub fn parse(s: &str) -> Option<Self> {
        let (name, value) = s.split_once('=')?;
        if name.is_empty() || !name.chars().all(is_name_char) {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// The process-wide variable table.
///
/// Only two writers exist: the assignment handler (a line made of
/// assignments only) and `cd`, which keeps [`WORKING_DIR_VAR`] current.
/// Commands see it through a [`CommandEnvironment`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// An empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an environment from `NAME=VALUE` strings, skipping malformed ones.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vars = entries
            .into_iter()
            .filter_map(|entry| Assignment::parse(entry.as_ref()))
            .map(|a| (a.name, a.value))
            .collect();
        Self { vars }
    }

    /// Captures the current process environment.
    ///
    /// Entries that are not valid UTF-8 or do not have a valid name are
    /// skipped. `PWD` is seeded from the process working directory when it is
    /// missing.
    pub fn load() -> Self {
        let entries = stdenv::vars_os().filter_map(|(k, v)| {
            let (k, v) = (k.into_string().ok()?, v.into_string().ok()?);
            Some(format!("{k}={v}"))
        });
        let mut env = Self::from_entries(entries);
        if env.get(WORKING_DIR_VAR).is_none() {
            let cwd = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            env.set(WORKING_DIR_VAR, cwd.to_string_lossy());
        }
        env
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A per-command view of the [`Environment`].
///
/// Lookups check the command's own assignments first, then the global table.
/// [`CommandEnvironment::set_local`] only touches the overlay, so `FOO=bar cmd`
/// never leaks `FOO` into the shell. The one exception is
/// [`CommandEnvironment::change_dir`], the path through which `cd` updates the
/// working directory.
#[derive(Debug)]
pub struct CommandEnvironment<'a> {
    global: &'a mut Environment,
    local: BTreeMap<String, String>,
}

impl<'a> CommandEnvironment<'a> {
    pub fn new(global: &'a mut Environment) -> Self {
        Self {
            global,
            local: BTreeMap::new(),
        }
    }

    /// Builds the overlay and applies the command's assignments to it.
    pub fn with_assignments(global: &'a mut Environment, assignments: &[Assignment]) -> Self {
        let mut env = Self::new(global);
        for a in assignments {
            env.set_local(a.name.clone(), a.value.clone());
        }
        env
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.local
            .get(key)
            .map(String::as_str)
            .or_else(|| self.global.get(key))
    }

    /// Like [`get`](Self::get), but an absent variable reads as empty.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn set_local(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.local.insert(key.into(), val.into());
    }

    /// The shell's working directory, falling back to the process one.
    pub fn working_dir(&self) -> PathBuf {
        match self.get(WORKING_DIR_VAR) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => stdenv::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Records a new working directory in the global environment.
    pub fn change_dir(&mut self, dir: PathBuf) {
        let dir = dir.to_string_lossy().into_owned();
        self.local.remove(WORKING_DIR_VAR);
        self.global.set(WORKING_DIR_VAR, dir);
    }

    /// Flattens the view into `NAME=VALUE` strings for `execve`.
    pub fn to_envp(&self) -> Vec<String> {
        self.global
            .iter()
            .filter(|(k, _)| !self.local.contains_key(*k))
            .chain(self.local.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .map(|(k, v)| format!("{k}={v}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignments() {
        assert_eq!(
            Assignment::parse("FOO=bar=baz"),
            Some(Assignment {
                name: "FOO".into(),
                value: "bar=baz".into()
            })
        );
        assert_eq!(Assignment::parse("EMPTY=").map(|a| a.value), Some(String::new()));
        assert_eq!(Assignment::parse("no_equals"), None);
        assert_eq!(Assignment::parse("=value"), None);
        assert_eq!(Assignment::parse("BAD-NAME=1"), None);
        assert_eq!(Assignment::parse("-DX=1"), None);
    }

    #[test]
    fn from_entries_skips_malformed() {
        let env = Environment::from_entries(["A=1", "garbage", "B-C=2", "D=x=y"]);
        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("D"), Some("x=y"));
        assert_eq!(env.iter().count(), 2);
    }

    #[test]
    fn env_reads_from_process_env() {
        let env = Environment::load();
        assert!(env.get("PATH").is_some());
        assert!(env.get(WORKING_DIR_VAR).is_some());
    }

    #[test]
    fn overlay_shadows_without_touching_global() {
        let mut global = Environment::from_entries(["A=global", "B=kept"]);
        {
            let mut cmd = CommandEnvironment::new(&mut global);
            cmd.set_local("A", "local");
            cmd.set_local("C", "new");
            assert_eq!(cmd.get("A"), Some("local"));
            assert_eq!(cmd.get("B"), Some("kept"));
            assert_eq!(cmd.value("MISSING"), "");

            let mut envp = cmd.to_envp();
            envp.sort();
            assert_eq!(envp, vec!["A=local", "B=kept", "C=new"]);
        }
        assert_eq!(global.get("A"), Some("global"));
        assert_eq!(global.get("C"), None);
    }

    #[test]
    fn change_dir_updates_global() {
        let mut global = Environment::from_entries(["PWD=/old"]);
        {
            let mut cmd = CommandEnvironment::new(&mut global);
            cmd.change_dir(PathBuf::from("/new"));
            assert_eq!(cmd.working_dir(), PathBuf::from("/new"));
        }
        assert_eq!(global.get(WORKING_DIR_VAR), Some("/new"));
    }
}
