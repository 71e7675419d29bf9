use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use postboard_client::view::format_local_time;
use postboard_client::{
    BoardView, ClientConfig, HttpRemote, LoadState, Notification, NotificationKind, PollScheduler,
    Remote, Store, Visibility, identity,
};
use postboard_types::MessageId;

const HELP: &str = "\
Commands:
  <text>               send a message as the current sender
  /user <name>         create a user
  /as <name>           switch sender
  /edit <n> <text>     edit message n
  /delete <n>          delete message n
  /search [query]      filter messages (no query clears)
  /import <file>       replace all server data with an export file
  /export [dir]        write the server's data to a file
  /pause, /resume      stop or restart background refresh
  /quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postboard=info,postboard_client=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env();
    info!("Using API at {}", config.api_url);

    let remote = HttpRemote::new(&config)?;
    let cancel = remote.cancellation_token();
    let remembered = config.identity_file.as_deref().and_then(identity::load);
    let store = Arc::new(Store::new(remote).with_remembered_user(remembered));

    if store.initial_load().await.is_err() {
        let message = match store.load_state() {
            LoadState::Error(message) => message,
            _ => "Initial load failed".to_string(),
        };
        anyhow::bail!(message);
    }
    remember_sender(&config, &store);

    let (visibility, visibility_rx) = watch::channel(Visibility::Visible);
    let mut poller = PollScheduler::new(store.clone(), config.poll_interval);
    poller.attach_visibility(visibility_rx);

    let renderer = tokio::spawn(render_loop(store.clone()));
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match Command::parse(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Unknown(input) => println!("Unknown command {input:?}. Try /help."),
            Command::Pause => {
                visibility.send_replace(Visibility::Hidden);
                println!("Background refresh paused.");
            }
            Command::Resume => {
                visibility.send_replace(Visibility::Visible);
            }
            Command::Search(query) => store.set_search_query(query),
            Command::Send(text) => report(store.send_message(text).await),
            Command::CreateUser(name) => {
                report(store.create_user(name).await);
                remember_sender(&config, &store);
            }
            Command::SelectUser(name) => {
                select_sender(&store, name);
                remember_sender(&config, &store);
            }
            Command::Edit(n, text) => {
                if let Some(message) = own_message(&store, n) {
                    report(store.update_message(&message, text).await);
                }
            }
            Command::Delete(n) => {
                if let Some(message) = own_message(&store, n) {
                    report(store.delete_message(&message).await);
                }
            }
            Command::Import(path) => match tokio::fs::read(path).await {
                Ok(contents) => report(store.import_snapshot(&contents).await),
                Err(e) => store
                    .notifier()
                    .error(format!("Could not read {}: {}", path, e)),
            },
            Command::Export(dir) => {
                if let Ok(artifact) = store.export_snapshot().await {
                    let path = Path::new(dir.unwrap_or(".")).join(&artifact.file_name);
                    match tokio::fs::write(&path, artifact.contents).await {
                        Ok(()) => println!("Wrote {}", path.display()),
                        Err(e) => store
                            .notifier()
                            .error(format!("Could not write {}: {}", path.display(), e)),
                    }
                }
            }
        }
    }

    info!("Shutting down");
    poller.shutdown();
    cancel.cancel();
    renderer.abort();
    Ok(())
}

/// The store has already turned any failure into a notification.
fn report<T, E: std::fmt::Display>(result: Result<T, E>) {
    if let Err(e) = result {
        debug!("Command failed: {}", e);
    }
}

fn select_sender<R: Remote>(store: &Store<R>, name: &str) {
    let user = store
        .users()
        .into_iter()
        .find(|u| u.name.eq_ignore_ascii_case(name.trim()));
    match user {
        Some(user) => report(store.set_current_user(&user.id)),
        None => store.notifier().error(format!("No user named \"{}\".", name.trim())),
    }
}

/// Message `n` (1-based) of the visible list, if the current sender wrote it.
fn own_message<R: Remote>(store: &Store<R>, n: usize) -> Option<MessageId> {
    let view = store.view();
    let Some(message) = n.checked_sub(1).and_then(|i| view.messages.get(i)) else {
        store.notifier().error(format!("There is no message {}.", n));
        return None;
    };
    if !view.can_modify(message) {
        store
            .notifier()
            .error("You can only change your own messages.");
        return None;
    }
    Some(message.id.clone())
}

fn remember_sender<R: Remote>(config: &ClientConfig, store: &Store<R>) {
    let (Some(path), Some(user)) = (config.identity_file.as_ref(), store.current_user()) else {
        return;
    };
    if let Err(e) = identity::save(path, &user.id) {
        warn!("Could not remember sender: {:#}", e);
    }
}

async fn render_loop<R: Remote>(store: Arc<Store<R>>) {
    let mut changes = store.subscribe();
    let mut notifications = store.notifier().subscribe();
    render(&store.view());

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                render(&store.view());
            }
            changed = notifications.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = notifications.borrow_and_update().clone();
                if let Some(notification) = current {
                    print_notification(&notification);
                    // printed once; nothing stays on screen to dismiss
                    store.notifier().hide();
                }
            }
        }
    }
}

fn render(view: &BoardView) {
    let sender = view
        .current_user
        .as_ref()
        .map(|u| u.name.as_str())
        .unwrap_or("none, use /user <name>");

    println!();
    match &view.search_query {
        q if q.is_empty() => println!("== postboard | sender: {} ==", sender),
        q => println!(
            "== postboard | sender: {} | search {:?}: {}/{} ==",
            sender,
            q,
            view.messages.len(),
            view.total_messages
        ),
    }

    if view.messages.is_empty() {
        println!("  (no messages)");
    }
    for (i, message) in view.messages.iter().enumerate() {
        let marker = if view.can_modify(message) { "*" } else { " " };
        let edited = if message.edited { " (edited)" } else { "" };
        println!(
            "{}{:>3}. [{}] {}: {}{}",
            marker,
            i + 1,
            format_local_time(&message.timestamp),
            message.sender_name,
            message.text,
            edited
        );
    }
}

fn print_notification(notification: &Notification) {
    match notification.kind {
        NotificationKind::Success => println!("✓ {}", notification.message),
        NotificationKind::Error => println!("✗ {}", notification.message),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Empty,
    Send(&'a str),
    CreateUser(&'a str),
    SelectUser(&'a str),
    Edit(usize, &'a str),
    Delete(usize),
    Search(&'a str),
    Import(&'a str),
    Export(Option<&'a str>),
    Pause,
    Resume,
    Help,
    Quit,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Send(line);
        };
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        match name {
            "user" => Command::CreateUser(args),
            "as" => Command::SelectUser(args),
            "edit" => {
                let (n, text) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
                match n.parse() {
                    Ok(n) => Command::Edit(n, text.trim()),
                    Err(_) => Command::Unknown(line),
                }
            }
            "delete" => args.parse().map(Command::Delete).unwrap_or(Command::Unknown(line)),
            "search" => Command::Search(args),
            "import" if !args.is_empty() => Command::Import(args),
            "export" => Command::Export((!args.is_empty()).then_some(args)),
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(line),
        }
    }
}
