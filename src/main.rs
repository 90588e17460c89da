//! Quizmate - terminal client for the quiz agent service
//!
//! Reads commands from stdin; plain lines are chat messages, or answers while
//! a question is on screen.

use quizmate::config::ClientConfig;
use quizmate::gateway::{HttpGateway, LoggingGateway};
use quizmate::runtime::{ClientError, ClientEvent, FileIdentityStore, SessionClient};
use quizmate::state_machine::Mode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Client = SessionClient<LoggingGateway<HttpGateway>, FileIdentityStore>;

const HELP: &str = "\
commands:
  /new [role]    create a session
  /quiz [n]      start a quiz with n questions
  /end           end the quiz
  /answer <x>    submit an answer
  /history       reload history from the service
  /roles         list role cards
  /logout        forget the session
  /delete        delete the session on the service
  /quit          exit
anything else is sent as a message (or an answer during a quiz)";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they don't interleave with the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizmate=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(
        api_url = %config.api_url,
        state_path = %config.state_path.display(),
        "Starting quizmate"
    );

    let gateway = LoggingGateway::new(HttpGateway::new(&config.api_url, config.request_timeout)?);
    let store = FileIdentityStore::new(&config.state_path);
    let client = SessionClient::new(gateway, store, &config);

    tokio::spawn(print_events(client.subscribe()));

    match client.start().await {
        Some(outcome) => println!("resumed session ({})", outcome.mode),
        None => println!("no session yet, type /new to start"),
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        if let Err(e) = run_command(&client, &config, line).await {
            eprintln!("error: {e}");
        }
    }

    Ok(())
}

async fn run_command(client: &Client, config: &ClientConfig, line: &str) -> Result<(), ClientError> {
    let (command, arg) = match line.split_once(' ') {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "/new" => {
            let role = if arg.is_empty() { config.role_card.as_str() } else { arg };
            let user_id = client.create_session(role).await?;
            println!("session {user_id}");
        }
        "/quiz" => {
            let total = arg.parse().ok();
            client.start_quiz(total).await?;
        }
        "/end" => client.end_quiz().await?,
        "/answer" => client.submit_answer(arg).await?,
        "/history" => {
            for message in client.load_history().await? {
                println!("[{:?}] {}", message.role, message.content);
            }
        }
        "/roles" => {
            for card in client.role_cards().await? {
                println!("{:<20} {} - {}", card.id, card.name, card.description);
            }
        }
        "/logout" => client.logout().await?,
        "/delete" => client.delete_session().await?,
        "/help" => println!("{HELP}"),
        _ if client.quiz_progress().is_some() => client.submit_answer(line).await?,
        _ => client.send_message(line).await?,
    }
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<ClientEvent>) {
    loop {
        match events.recv().await {
            Ok(ClientEvent::StateChange { mode, quiz_progress }) => {
                if mode != Mode::Thinking {
                    println!("  ({mode})");
                }
                if let Some(info) = quiz_progress.filter(|_| mode == Mode::Quiz) {
                    println!(
                        "  question {}/{}: {}",
                        info.step,
                        info.total,
                        info.question.unwrap_or_default()
                    );
                    for option in info.options.unwrap_or_default() {
                        println!("    {option}");
                    }
                }
            }
            Ok(ClientEvent::Message { message }) if message.is_agent() => {
                println!("agent> {}", message.content);
            }
            Ok(ClientEvent::Error { message }) => println!("  !! {message}"),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
