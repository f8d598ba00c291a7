use shell_pipeline::{Environment, Interpreter, ShellConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config: ShellConfig = argh::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut shell = Interpreter::new(Environment::load(), config);
    let code = shell.run()?;
    std::process::exit(code)
}
