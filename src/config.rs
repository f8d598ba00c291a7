use argh::FromArgs;

pub const DEFAULT_PROMPT: &str = "cli > ";
pub const DEFAULT_CONTINUATION_PROMPT: &str = "> ";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(FromArgs, Debug, Clone, PartialEq, Eq)]
/// A small interactive shell with pipelines and variable expansion.
pub struct ShellConfig {
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    /// prompt printed before each command
    pub prompt: String,

    #[argh(option, default = "DEFAULT_CONTINUATION_PROMPT.to_string()")]
    /// prompt printed while a quote or escaped newline is still open
    pub continuation_prompt: String,

    #[argh(option, default = "DEFAULT_LOG_FILTER.to_string()")]
    /// log filter used when RUST_LOG is not set (e.g. "debug")
    pub log: String,

    #[argh(switch)]
    /// do not record entered lines in the line-editor history
    pub no_history: bool,

    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status
    pub command: Option<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            continuation_prompt: DEFAULT_CONTINUATION_PROMPT.to_string(),
            log: DEFAULT_LOG_FILTER.to_string(),
            no_history: false,
            command: None,
        }
    }
}
