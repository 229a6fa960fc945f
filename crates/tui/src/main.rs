mod app;
mod config;
mod error;
mod export;
mod local_state;
mod logging;
mod section;
mod ui;

use crate::{config::Command, error::Result};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = config::load()?;
    logging::init(&config)?;

    match command {
        Command::Tui => {
            tracing::info!(base_url = %config.base_url, "starting dashboard");
            let mut app = app::App::new(config)?;
            app.run()?;
        }
        Command::Export {
            entity,
            out,
            filters,
            ..
        } => {
            let rows = export::run(&config, entity, &out, &filters).await?;
            println!("{rows} {} row(s) written to {}", entity.slug(), out.display());
        }
    }
    Ok(())
}
