mod app;
mod logging;
mod output;
mod settings;
mod source;


use clap::Parser;

use crate::app::App;
use crate::settings::{Cli, Settings};

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::get(cli)?;
    tracing::debug!(
        url = %settings.base_url,
        ttl = ?settings.cache.ttl,
        "Starting pokedex"
    );

    let app = App::new(&settings)?;
    let mut stdout = std::io::stdout().lock();

    if settings.names.is_empty() {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        app.interactive(stdin, &mut stdout).await?;
    } else {
        for name in &settings.names {
            app.show(name, &mut stdout).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level);

    if let Err(error) = run(cli).await {
        logging::ensure_log_error(&error);
        std::process::exit(1);
    }
}
