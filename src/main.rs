use std::io::Write;
use std::path::Path;

use clap::Parser;
use colored::*;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use code_battle::api::{ApiClient, Player};
use code_battle::cli::{self, Args};
use code_battle::config::ClientConfig;
use code_battle::editor::{EditorBuffer, Language};
use code_battle::error::ClientError;
use code_battle::session_store::SessionStore;
use code_battle::validate_credentials;
use code_battle::view::TerminalView;
use code_battle::RoomSession;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::load(Path::new(&args.config))?;
    config.base_url = cli::resolve_base_url(&args, &config);

    let store = SessionStore::new(config.resolved_session_path());

    if args.logout {
        store.clear()?;
        println!("Session cleared.");
        return Ok(());
    }

    let api = ApiClient::new(&config)?;

    // Session gate: a stored record means already authenticated; otherwise
    // run the login flow before anything else happens.
    let player = match store.load()? {
        Some(player) => player,
        None => authenticate(&api, &store, &args).await?,
    };
    println!(
        "{} {} (ID: {})",
        "Welcome,".bright_green(),
        player.name.bright_white().bold(),
        player.id
    );

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    // The view runs on its own task, consuming whatever the controller emits.
    tokio::spawn(async move {
        let mut view = TerminalView::new();
        while let Some(event) = ui_rx.recv().await {
            view.render(&event);
        }
    });

    let mut session = RoomSession::new(
        api,
        player,
        config.watchdog_timeout(),
        config.connect_timeout(),
        ui_tx,
        events_tx.clone(),
    );
    let mut editor = EditorBuffer::new(args.language);
    editor.changes_tx = Some(events_tx.clone());

    session.refresh_rooms().await;
    if let Some(room_id) = args.room {
        session.select_room(Some(room_id)).await;
    }
    print_help();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            maybe_line = lines.next_line() => {
                match maybe_line? {
                    Some(line) => {
                        if !handle_command(line.trim(), &mut session, &mut editor).await {
                            break;
                        }
                    }
                    None => break, // stdin closed
                }
            }
            maybe_event = events_rx.recv() => {
                match maybe_event {
                    Some(event) => session.handle_client_event(event).await,
                    None => break,
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Login flow
// ---------------------------------------------------------------------------

async fn authenticate(
    api: &ApiClient,
    store: &SessionStore,
    args: &Args,
) -> Result<Player, ClientError> {
    let name = match &args.name {
        Some(name) => name.clone(),
        None => prompt("Player name: ")?,
    };
    let password = match &args.password {
        Some(password) => password.clone(),
        None => prompt("Password: ")?,
    };
    validate_credentials(&name, &password)?;

    let player = if args.register {
        api.register(name.trim(), &password).await?
    } else {
        api.login(name.trim(), &password).await?
    };

    store.save(&player)?;
    Ok(player)
}

fn prompt(label: &str) -> Result<String, ClientError> {
    print!("{}", label);
    let _ = std::io::stdout().flush();
    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| ClientError::Validation(format!("could not read input: {e}")))?;
    Ok(input.trim().to_string())
}

// ---------------------------------------------------------------------------
// Command loop
// ---------------------------------------------------------------------------

fn print_help() {
    println!("{}", "Commands:".bright_yellow().bold());
    println!("  rooms                      refresh the room list");
    println!("  join <id>                  join a room and follow its leaderboard");
    println!("  leave                      leave the current room");
    println!("  create <name> | <desc>     create a new room");
    println!("  lang <javascript|python|go> switch language (resets the editor)");
    println!("  load <file>                load solution code from a file");
    println!("  show                       print the current solution code");
    println!("  submit                     submit the solution for execution");
    println!("  board                      refresh the leaderboard");
    println!("  help                       show this help");
    println!("  quit                       exit");
}

/// Handle one REPL command. Returns `false` to exit the loop. Command-level
/// failures are printed here and never abort the client.
async fn handle_command(
    line: &str,
    session: &mut RoomSession,
    editor: &mut EditorBuffer,
) -> bool {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "help" => print_help(),
        "rooms" => session.refresh_rooms().await,
        "join" => match rest.parse::<i64>() {
            Ok(room_id) => session.select_room(Some(room_id)).await,
            Err(_) => alert("Usage: join <room id>"),
        },
        "leave" => {
            if let Err(e) = session.leave_room().await {
                alert(&format!("Error leaving room: {e}"));
            }
        }
        "create" => match rest.split_once('|') {
            Some((name, description)) => {
                if let Err(e) = session.create_room(name.trim(), description.trim()).await {
                    alert(&format!("Error creating room: {e}"));
                }
            }
            None => alert("Usage: create <name> | <description>"),
        },
        "lang" => match Language::from_str_loose(rest) {
            Ok(language) => {
                editor.set_language(language);
                println!(
                    "Language set to {}; starter template loaded.",
                    language.to_string().bright_white()
                );
            }
            Err(e) => alert(&e),
        },
        "load" => match tokio::fs::read_to_string(rest).await {
            Ok(code) => {
                editor.set_content(code);
                println!("Loaded {} into the editor.", rest.bright_white());
            }
            Err(e) => alert(&format!("Could not read {rest}: {e}")),
        },
        "show" => {
            println!("{}", format!("--- {} ---", editor.language()).bright_blue());
            println!("{}", editor.content());
        }
        "submit" => {
            let code = editor.content().to_string();
            if let Err(e) = session.submit(editor.language(), &code).await {
                alert(&format!("Error submitting solution: {e}"));
            }
        }
        "board" => session.refresh_leaderboard().await,
        "quit" | "exit" => return false,
        other => alert(&format!("Unknown command: {other} (try \"help\")")),
    }

    true
}

fn alert(message: &str) {
    eprintln!("{} {}", "!".bright_red().bold(), message.bright_red());
}
