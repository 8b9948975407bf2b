mod config;
mod error;
mod event_manager;
mod listener;
mod logging;
mod queue;
mod reaction;
mod runtime;
mod selector;

use serenity::prelude::*;
use std::process::ExitCode;
use std::sync::Arc;

use crate::config::CONFIG_PATH;
use crate::error::AppError;
use crate::event_manager::Handler;
use crate::listener::Listener;
use crate::queue::reaction_queue;
use crate::runtime::RuntimeContext;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(why) = logging::init(".") {
        eprintln!("{}", why);
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            tracing::error!("{}", why);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    let settings = config::load(CONFIG_PATH)?;
    let reactions = &settings.reaction_settings;
    let handler = Handler::new(
        settings.prefix.clone(),
        settings.owner_id,
        Arc::new(RuntimeContext::new(false)),
        Listener::new(reactions),
        reactions.reaction_delay()?,
        reaction_queue(settings.debug),
    );

    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&settings.token, intents)
        .event_handler(handler)
        .await?;

    tracing::info!("Logging in discord account...");
    client.start().await?;
    Ok(())
}
