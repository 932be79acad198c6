use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tandem::AuthError;
use tandem::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Chat and share a "cursor" with everyone on a Tandem broker, from a terminal.
#[derive(Parser, Debug)]
#[command(name = "terminal-chat", about)]
struct Args {
    /// Broker WebSocket URL.
    #[arg(long, env = "TANDEM_BROKER", default_value = tandem::DEFAULT_BROKER_URL)]
    broker: String,

    /// Base URL of the web API; identity is resolved from it when given.
    #[arg(long, env = "TANDEM_API")]
    api: Option<String>,

    /// Chat username (used when no API is given).
    #[arg(long)]
    user: Option<String>,

    /// Participant id (used when no API is given).
    #[arg(long, default_value = "127.0.0.1")]
    ip: String,

    #[arg(long)]
    debug: bool,
}

// ---------------------------------------------------------------------------
// Console surface
// ---------------------------------------------------------------------------

type Cursors = Arc<Mutex<BTreeMap<ParticipantId, Position>>>;

/// Prints chat and status to stdout and keeps a cursor table for `/who`.
struct ConsoleSurface {
    cursors: Cursors,
}

impl Surface for ConsoleSurface {
    fn set_status(&mut self, state: ConnectionState) {
        println!("-- WebSocket Status: {state}");
    }

    fn place_cursor(&mut self, identity: &ParticipantId, at: Position) {
        if let Ok(mut cursors) = self.cursors.lock() {
            cursors.insert(identity.clone(), at);
        }
    }

    fn remove_cursor(&mut self, identity: &ParticipantId) {
        if let Ok(mut cursors) = self.cursors.lock() {
            cursors.remove(identity);
        }
        println!("-- {identity} left");
    }

    fn append_chat_line(&mut self, entry: &ChatEntry) {
        println!("{entry}");
    }

    fn notify(&mut self, notice: &str) {
        println!("!! {notice}");
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Move(i64, i64),
    Who,
    /// The password is required when a web API is configured.
    Login { name: String, password: Option<String> },
    Register { name: String, password: String },
    Logout,
    Quit,
    Say(String),
    Help,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Say(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let cmd = match parts.next()? {
        "move" => {
            let x = parts.next()?.parse().ok()?;
            let y = parts.next()?.parse().ok()?;
            Command::Move(x, y)
        }
        "who" => Command::Who,
        "login" => Command::Login {
            name: parts.next()?.to_string(),
            password: parts.next().map(str::to_owned),
        },
        "register" => Command::Register {
            name: parts.next()?.to_string(),
            password: parts.next()?.to_string(),
        },
        "logout" => Command::Logout,
        "quit" => Command::Quit,
        _ => Command::Help,
    };
    Some(cmd)
}

const HELP: &str = "commands: /move X Y, /who, /login NAME [PASSWORD], /register NAME PASSWORD, \
                    /logout, /quit; anything else is chat";

/// Prints the outcome of a login or registration. Refusals from the web
/// API are shown to the user; anything else is fatal.
fn report_auth(outcome: Result<Option<Username>, TandemError>) -> anyhow::Result<()> {
    match outcome {
        Ok(Some(user)) => println!("-- logged in as {user}"),
        Ok(None) => println!("-- not logged in"),
        Err(TandemError::Auth(AuthError::Rejected { message, .. })) => println!("!! {message}"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "tandem=debug,tandem_transport=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let builder = TandemClient::builder().config(ClientConfig::default().broker_url(&args.broker));
    let api = args.api.as_deref().map(HttpCollaborator::new).transpose()?;
    let builder = match &api {
        Some(api) => builder
            .resolve_identity(api)
            .await
            .context("resolving identity from the web API")?,
        None => {
            let mut identity = LocalIdentity::new(args.ip.as_str());
            identity.username = args.user.as_deref().map(Username::from);
            builder.identity(identity)
        }
    };

    let cursors = Cursors::default();
    let client = builder.start(ConsoleSurface {
        cursors: Arc::clone(&cursors),
    })?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Some(Command::Say(text)) => client.submit_chat(text).await?,
            Some(Command::Move(x, y)) => client.pointer_moved(x, y),
            Some(Command::Who) => {
                let cursors = cursors.lock().map(|c| c.clone()).unwrap_or_default();
                if cursors.is_empty() {
                    println!("-- nobody else here");
                }
                for (id, at) in cursors {
                    println!("-- {id} at ({}, {})", at.x, at.y);
                }
            }
            Some(Command::Login { name, password }) => match (&api, password) {
                (Some(api), Some(password)) => {
                    report_auth(client.login(api, &name, &password).await)?
                }
                (Some(_), None) => println!("!! usage: /login NAME PASSWORD"),
                (None, _) => client.set_username(Some(Username::new(name))).await?,
            },
            Some(Command::Register { name, password }) => match &api {
                Some(api) => report_auth(client.register(api, &name, &password).await)?,
                None => println!("!! /register needs --api"),
            },
            Some(Command::Logout) => match &api {
                Some(api) => match client.logout(api).await {
                    Ok(()) => println!("-- logged out"),
                    Err(TandemError::Auth(e)) => println!("!! logout failed: {e}"),
                    Err(e) => return Err(e.into()),
                },
                None => client.set_username(None).await?,
            },
            Some(Command::Quit) => break,
            Some(Command::Help) | None => println!("{HELP}"),
        }
    }

    let session = client.shutdown().await?;
    println!(
        "-- {} chat lines this session",
        session.dispatcher().chat().len()
    );
    Ok(())
}
