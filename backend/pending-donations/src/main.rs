//! Terminal front-end for the pending donations screen.
//!
//! Renders the screen to stdout on every state change and reads commands
//! from stdin. Focus changes are typed in (`focus` / `blur`) since there is
//! no navigation stack here.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pending_donations::api::HttpDonationApi;
use pending_donations::config::Config;
use pending_donations::screen::{self, ScreenEvent, ViewState};
use pending_donations::view;

const HELP: &str = "commands: focus | blur | refresh | edit <id> | cancel | set <id> <status> | image <id> | quit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Event(ScreenEvent),
    Image(String),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(HELP.to_string());
    };
    let args: Vec<&str> = words.collect();

    match (verb, args.as_slice()) {
        ("focus", []) => Ok(Command::Event(ScreenEvent::FocusGained)),
        ("blur", []) => Ok(Command::Event(ScreenEvent::FocusLost)),
        ("refresh", []) => Ok(Command::Event(ScreenEvent::Refresh)),
        ("edit", [id]) => Ok(Command::Event(ScreenEvent::Edit(id.to_string()))),
        ("cancel", []) => Ok(Command::Event(ScreenEvent::CancelEdit)),
        ("set", [id, status]) => ScreenEvent::from_picker(id, status)
            .map(Command::Event)
            .ok_or_else(|| {
                format!("unknown status {status:?} (pending, rejected, received, delivered)")
            }),
        ("image", [id]) => Ok(Command::Image(id.to_string())),
        ("help", []) => Ok(Command::Help),
        ("quit" | "exit", []) => Ok(Command::Quit),
        _ => Err(HELP.to_string()),
    }
}

async fn show_image(api: &HttpDonationApi, state: &watch::Receiver<ViewState>, id: &str) {
    let reference = {
        let state = state.borrow();
        match state.find(id) {
            Some(record) => record.donor.profile_image.clone(),
            None => {
                println!("no donation {id} on screen");
                return;
            }
        }
    };
    let Some(reference) = reference else {
        println!("donation {id} has no donor profile image");
        return;
    };

    match api.fetch_profile_image(&reference).await {
        Ok(bytes) => println!(
            "{} ({} bytes)",
            api.profile_image_url(&reference),
            bytes.len()
        ),
        Err(e) => error!("Failed to download profile image {reference}: {e}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they do not interleave with the rendered screen.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    info!("Using donation service at {}", config.api_base_url);

    let api = Arc::new(HttpDonationApi::new(&config)?);
    let (events, state, mut notices) = screen::spawn(Arc::clone(&api)).into_parts();

    // ─── Rendering ────────────────────────────────────────
    let mut render_rx = state.clone();
    let render_api = Arc::clone(&api);
    tokio::spawn(async move {
        loop {
            let rendered =
                view::render(&render_rx.borrow_and_update(), |r| render_api.profile_image_url(r));
            println!("{rendered}");
            if render_rx.changed().await.is_err() {
                break;
            }
        }
    });
    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("** {}: {}", notice.title(), notice.body());
        }
    });

    // ─── Input ────────────────────────────────────────────
    events.send(ScreenEvent::FocusGained).await?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Event(event)) => events.send(event).await?,
            Ok(Command::Image(id)) => show_image(&api, &state, &id).await,
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Quit) => break,
            Err(msg) => println!("{msg}"),
        }
    }

    events.send(ScreenEvent::Shutdown).await?;
    Ok(())
}
