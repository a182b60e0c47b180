// Entrypoint for the `qu` binary.
// - Keeps `main` small: set up logging, parse arguments, hand over to `App`.
// - Logs go to stderr so they never mix with the interactive prompt.

use clap::Parser;
use qiniu_uploader::cli::{App, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "qiniu_uploader=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    App::load()?.run(cli)
}
