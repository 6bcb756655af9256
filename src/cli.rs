//! Command-line surface: settings, issue hints and the interactive timer.

use clap::{Parser, Subcommand};
use crossterm::cursor::MoveToColumn;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::bus::MessageBus;
use crate::clock::SystemClock;
use crate::config::{default_config_dir, Config, ConfigManager};
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::error::AppResult;
use crate::issue_store::{fetch_issue_keys, IssueStore};
use crate::messages::{Context, Message};
use crate::popup::PopupController;
use crate::timer::SessionManager;

#[derive(Parser)]
#[command(name = "jira-timer")]
#[command(about = "Track time on a task and log it as a Jira worklog", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding config.json and the stored server address
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store the Jira server address, e.g. https://jira.example.com
    Configure {
        /// Server base URL
        address: String,
    },
    /// List issue keys, or task-name hints for QUERY
    Issues {
        /// Case-insensitive substring of the issue key
        query: Option<String>,
    },
    /// Open the timer form; starts right away when both task and description are given
    Track {
        /// Issue key, e.g. PROJ-1
        #[arg(short, long)]
        task: Option<String>,
        /// Worklog comment
        #[arg(short, long)]
        description: Option<String>,
    },
}

const USAGE: &str =
    "Commands: name <KEY>, desc <TEXT>, pick <N>, start, stop (or empty line), quit";

/// One line typed into the running `track` form.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Name(String),
    Description(String),
    Pick(usize),
    Start,
    Stop,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    match command {
        "" | "stop" => Input::Stop,
        "start" => Input::Start,
        "quit" => Input::Quit,
        "name" => Input::Name(rest.to_string()),
        "desc" => Input::Description(rest.to_string()),
        "pick" => match rest.parse() {
            Ok(position) => Input::Pick(position),
            Err(_) => Input::Unknown(line.to_string()),
        },
        _ => Input::Unknown(line.to_string()),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    StopRequested,
    Quit,
    Usage(String),
}

fn handle_input(popup: &mut PopupController, input: Input) -> Flow {
    match input {
        Input::Name(_) | Input::Description(_) if !popup.view().inputs_enabled => {
            Flow::Usage("The form is locked while the timer runs".to_string())
        }
        Input::Name(text) => {
            popup.type_task_name(&text);
            Flow::Continue
        }
        Input::Description(text) => {
            popup.type_task_description(&text);
            Flow::Continue
        }
        Input::Pick(position) => match popup.choose_nth_suggestion(position) {
            Some(_) => Flow::Continue,
            None => Flow::Usage(format!("No hint number {}", position)),
        },
        Input::Start if !popup.is_idle() => Flow::Usage("The timer is already running".to_string()),
        Input::Start => {
            popup.click_start();
            Flow::Continue
        }
        Input::Stop if popup.is_idle() => Flow::Usage(USAGE.to_string()),
        Input::Stop => {
            popup.click_stop();
            Flow::StopRequested
        }
        Input::Quit => Flow::Quit,
        Input::Unknown(line) => Flow::Usage(format!("Unknown command {:?}. {}", line, USAGE)),
    }
}

pub async fn execute(cli: Cli) -> AppResult<()> {
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => default_config_dir()?,
    };
    let config_manager = ConfigManager::new(&config_dir);
    let config = config_manager.load();
    let credentials = Arc::new(FileCredentialStore::new(&config_dir));

    match cli.command {
        Commands::Configure { address } => {
            credentials.save_server_address(&address)?;
            if !config_manager.exists() {
                config_manager.save(&config)?;
            }
            println!("Saved Jira server address.");
            Ok(())
        }
        Commands::Issues { query } => list_issues(&config, credentials.as_ref(), query).await,
        Commands::Track { task, description } => {
            track(config, credentials, task, description).await
        }
    }
}

async fn list_issues(
    config: &Config,
    credentials: &dyn CredentialStore,
    query: Option<String>,
) -> AppResult<()> {
    let base_url = credentials.server_address()?;
    let store = IssueStore::default();
    store.set(fetch_issue_keys(base_url, config).await?);

    let keys = match query {
        Some(query) => store.suggest(&query, config.autocomplete_min_chars, config.autocomplete_limit),
        None => store.snapshot(),
    };
    for key in keys {
        println!("{}", key);
    }
    Ok(())
}

/// Runs the background manager and the popup side by side until the session is logged or the user quits.
async fn track(
    config: Config,
    credentials: Arc<FileCredentialStore>,
    task: Option<String>,
    description: Option<String>,
) -> AppResult<()> {
    let bus = MessageBus::new();
    let manager = SessionManager::new(
        bus.clone(),
        credentials.clone(),
        Arc::new(SystemClock::default()),
        &config,
    );
    let manager_task = tokio::spawn(manager.run(bus.listen(Context::Background)));

    let mut inbox = bus.listen(Context::Popup);
    let mut popup = PopupController::new(bus.clone(), &config);

    let mut hints: Option<JoinHandle<jira_api::Result<Vec<String>>>> =
        match credentials.server_address() {
            Ok(base_url) => {
                let config = config.clone();
                Some(tokio::spawn(async move {
                    fetch_issue_keys(base_url, &config).await
                }))
            }
            Err(_) => {
                println!("No Jira server address stored. Run `jira-timer configure <URL>` first.");
                None
            }
        };

    if let Some(task) = &task {
        popup.type_task_name(task);
    }
    if let Some(description) = &description {
        popup.type_task_description(description);
    }
    if task.is_some() && description.is_some() {
        popup.click_start();
    } else {
        println!("{}", USAGE);
    }
    render(&popup);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stop_requested = false;
    loop {
        tokio::select! {
            envelope = inbox.recv() => {
                let Some(envelope) = envelope else { break };
                let notification = matches!(envelope.message, Message::TimerNotification(_));
                if popup.apply(envelope) {
                    render(&popup);
                }
                if stop_requested && notification {
                    if popup.is_idle() {
                        break;
                    }
                    stop_requested = false;
                }
            }
            line = stdin.next_line() => match line? {
                Some(line) => {
                    match handle_input(&mut popup, parse_input(&line)) {
                        Flow::Continue => {}
                        Flow::StopRequested => stop_requested = true,
                        Flow::Quit => break,
                        Flow::Usage(text) => println!("{}", text),
                    }
                    render(&popup);
                }
                None => {
                    input_closed(&popup);
                    break;
                }
            },
            loaded = join_hints(&mut hints) => {
                hints = None;
                let changed = match loaded {
                    Ok(result) => popup.issues_loaded(result),
                    Err(err) => {
                        log::warn!("Task hint loader failed: {}", err);
                        false
                    }
                };
                if changed {
                    render(&popup);
                }
            }
            _ = sleep_until(popup.next_deadline()) => {
                if popup.on_deadline(Instant::now()) {
                    render(&popup);
                }
            }
        }
    }
    println!();

    if let Some(handle) = hints {
        handle.abort();
    }
    bus.close(Context::Popup);
    bus.close(Context::Background);
    manager_task.await?;
    Ok(())
}

/// Reports a running session that is about to be dropped because stdin ended.
fn input_closed(popup: &PopupController) -> bool {
    if popup.is_idle() {
        return false;
    }
    log::warn!(
        "Input closed, discarding the running timer for {}",
        popup.view().task_name
    );
    true
}

/// Redraws the single status line in place.
fn render(popup: &PopupController) {
    let mut stdout = std::io::stdout();
    if let Err(err) = crossterm::execute!(
        stdout,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(popup.view().render_line())
    ) {
        log::debug!("Redrawing the timer line failed: {}", err);
    }
}

async fn join_hints(
    hints: &mut Option<JoinHandle<jira_api::Result<Vec<String>>>>,
) -> Result<jira_api::Result<Vec<String>>, tokio::task::JoinError> {
    match hints {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
