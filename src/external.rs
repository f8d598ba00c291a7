use crate::env::CommandEnvironment;
use crate::error::{LexerError, ShellError, ShellResult};
use crate::lexer::{AnnotatedChar, Control, Grammar, PushdownLexer, Token};
use crate::parser::Command;
use std::convert::Infallible;
use std::ffi::CString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathState {
    Zero,
    Escape,
}

/// `PATH` entries: `:` separates, `\` escapes the next character.
struct SearchPathGrammar;

impl Grammar for SearchPathGrammar {
    type State = PathState;

    fn zero(&self) -> PathState {
        PathState::Zero
    }

    fn step(
        &self,
        state: PathState,
        c: char,
        ctl: &mut Control<'_, PathState>,
    ) -> Result<(), LexerError> {
        match (state, c) {
            (PathState::Zero, '\\') => ctl.push(PathState::Escape),
            (PathState::Zero, ':') => {
                if ctl.token_started() {
                    ctl.end_token()?;
                }
                ctl.start_token()?;
            }
            (PathState::Zero, c) => ctl.push_char(AnnotatedChar::plain(c))?,
            (PathState::Escape, c) => {
                ctl.push_char(AnnotatedChar::escaped(c))?;
                ctl.pop()?;
            }
        }
        Ok(())
    }
}

/// Splits a search path into its directories.
///
/// An empty string yields no directories; an empty entry inside a non-empty
/// path (`a::b`) stands for the current directory.
pub fn split_search_path(search_path: &str) -> Result<Vec<String>, LexerError> {
    if search_path.is_empty() {
        return Ok(Vec::new());
    }
    let mut lexer = PushdownLexer::new(SearchPathGrammar);
    // Framing with separators makes every entry, the last one included,
    // end on a `:`.
    lexer.update(":")?;
    lexer.update(search_path)?;
    lexer.update(":")?;
    Ok(lexer.tokens().iter().map(Token::render).collect())
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Empty name: not found.
/// - Name containing a `/` (absolute, `./foo`, `bin/sh`): used as-is, relative
///   names are taken relative to `cwd`.
/// - Single component: each `search_path` directory is tried in order and the
///   first existing file wins.
pub fn find_command_path(
    search_path: &str,
    name: &str,
    cwd: &Path,
) -> Result<Option<PathBuf>, LexerError> {
    if name.is_empty() {
        return Ok(None);
    }
    if name.contains('/') {
        return Ok(find_by_path(cwd.join(name)));
    }
    for dir in split_search_path(search_path)? {
        let found = find_by_path(cwd.join(dir).join(name));
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn find_by_path(path: PathBuf) -> Option<PathBuf> {
    if path.is_file() { Some(path) } else { None }
}

fn to_cstring(s: &str) -> ShellResult<CString> {
    CString::new(s).map_err(|_| ShellError::InvalidArgument(format!("NUL byte in {s:?}")))
}

/// An external program, resolved and ready for `execve`.
pub struct ExternalCommand {
    path: CString,
    argv: Vec<CString>,
    envp: Vec<CString>,
}

impl ExternalCommand {
    /// Resolves the command against `PATH` and flattens its environment.
    ///
    /// Runs before forking, so a missing command aborts without creating a
    /// process.
    pub fn resolve(command: &Command, env: &CommandEnvironment<'_>) -> ShellResult<Self> {
        let name = command.name();
        let path = find_command_path(env.value("PATH"), name, &env.working_dir())?
            .ok_or_else(|| ShellError::CommandNotFound(name.to_string()))?;
        tracing::debug!(command = name, path = %path.display(), "resolved external command");

        Ok(Self {
            path: to_cstring(&path.to_string_lossy())?,
            argv: command
                .words()
                .iter()
                .map(|w| to_cstring(w))
                .collect::<ShellResult<_>>()?,
            envp: env
                .to_envp()
                .iter()
                .map(|e| to_cstring(e))
                .collect::<ShellResult<_>>()?,
        })
    }

    /// Replaces the current process image. Only returns on failure.
    pub fn exec(&self) -> nix::Result<Infallible> {
        nix::unistd::execve(&self.path, &self.argv, &self.envp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use std::fs;

    const SRCH: &str = "/bin";

    fn root() -> &'static Path {
        Path::new("/")
    }

    #[test]
    fn splits_on_colons() {
        assert_eq!(
            split_search_path("/usr/bin:/bin").unwrap(),
            vec!["/usr/bin", "/bin"]
        );
        assert!(split_search_path("").unwrap().is_empty());
    }

    #[test]
    fn escaped_colon_stays_in_entry() {
        assert_eq!(
            split_search_path("/odd\\:dir:/bin").unwrap(),
            vec!["/odd:dir", "/bin"]
        );
    }

    #[test]
    fn empty_entries_are_kept() {
        assert_eq!(split_search_path("a::b").unwrap(), vec!["a", "", "b"]);
        assert_eq!(split_search_path(":a").unwrap(), vec!["", "a"]);
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing() {
        let res = find_command_path(SRCH, "/bin/sh", root()).unwrap();
        assert_eq!(res.as_deref(), Some(Path::new("/bin/sh")));
    }

    #[test]
    #[cfg(unix)]
    fn absolute_nonexisting() {
        let res = find_command_path(SRCH, "/bin/nonexisting", root()).unwrap();
        assert!(res.is_none());
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_path() {
        let found = find_command_path("/does/not/exist:/bin", "sh", root())
            .unwrap()
            .expect("Expected to find 'sh' in /bin via PATH search");
        assert!(found.starts_with("/bin"), "got {found:?}");
        assert!(found.ends_with("sh"));
    }

    #[test]
    fn single_component_not_found_in_path() {
        let res = find_command_path(SRCH, "nonexisting-command-xyz", root()).unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn no_search_path_finds_nothing() {
        let res = find_command_path("", "sh", root()).unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn relative_names_use_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("bin")).unwrap();
        fs::write(tmp.path().join("bin").join("tool"), "").unwrap();
        fs::write(tmp.path().join("foo"), "").unwrap();

        let found = find_command_path(SRCH, "bin/tool", tmp.path()).unwrap();
        assert_eq!(found, Some(tmp.path().join("bin/tool")));

        let found = find_command_path(SRCH, "./foo", tmp.path()).unwrap();
        assert!(found.expect("./foo in cwd").ends_with("foo"));

        // An empty PATH entry means the current directory.
        let found = find_command_path("/nowhere::", "foo", tmp.path()).unwrap();
        assert_eq!(found, Some(tmp.path().join("foo")));
    }

    #[test]
    fn empty_name_is_none() {
        assert!(find_command_path(SRCH, "", root()).unwrap().is_none());
    }

    #[test]
    fn resolve_reports_command_not_found() {
        let mut global = Environment::from_entries(["PATH=/bin:/usr/bin"]);
        let env = CommandEnvironment::new(&mut global);
        let command = Command::new(vec!["definitely-not-a-command-42".into()]);
        match ExternalCommand::resolve(&command, &env) {
            Err(ShellError::CommandNotFound(name)) => {
                assert_eq!(name, "definitely-not-a-command-42")
            }
            other => panic!("unexpected: {:?}", other.err()),
        }
    }
}
