//! KnowledgeHub CLI - courses, progress and notes from the terminal.
//!
//! Every command prints pretty JSON on stdout. The session survives between
//! runs in the configured token store, and an expired access token is
//! renewed transparently.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use knowledgehub_core::api::DEFAULT_ACTIVE_USER_DAYS;
use knowledgehub_core::models::{unread_count, Credentials, NoteInput, ProgressUpdate};
use knowledgehub_core::{ApiError, Config, LmsClient, Session, TokenStoreKind};

/// Command-line client for the KnowledgeHub learning platform.
#[derive(Parser)]
#[command(name = "knowledgehub")]
#[command(about = "Command-line client for the KnowledgeHub learning platform")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// API root, e.g. https://lms.example.com/api/v1
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Default request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Where to keep the session tokens (file or keyring)
    #[arg(long, global = true)]
    token_store: Option<TokenStoreKind>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
        /// Read from the environment only; prompted for when absent
        #[arg(long, env = "KNOWLEDGEHUB_PASSWORD", hide_env_values = true, hide = true)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user's profile
    Whoami,
    /// Renew the access token now
    Refresh,
    /// List courses
    Courses {
        /// Only the public catalog; works without logging in
        #[arg(long)]
        public: bool,
    },
    /// Show one course with its videos and resources
    Course { id: i64 },
    /// Enroll in a course
    Enroll { course: i64 },
    /// List the courses you are enrolled in
    Enrolled,
    /// Completion summary for a course
    Progress { course: i64 },
    /// Watch history for a course
    History { course: i64 },
    /// Record the playback position in a video
    Watch {
        course: i64,
        video: i64,
        /// Position in seconds
        #[arg(long)]
        position: u32,
        /// Percentage watched; derived from the video length when omitted
        #[arg(long)]
        percent: Option<f64>,
    },
    /// List your notes on a video
    Notes { video: i64 },
    /// Add a note to a video
    Note {
        video: i64,
        /// Position in seconds the note is pinned to
        #[arg(long, default_value_t = 0)]
        position: u32,
        text: String,
    },
    /// Student dashboard with unread notifications
    Dashboard,
    /// List your notifications
    Notifications,
    /// Mark a notification as read
    MarkRead { id: String },
    /// Platform statistics (admin)
    Stats,
}

/// Initialize the tracing subscriber for logging.
/// The returned guard must live until exit so buffered file logs are flushed.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url.clone() {
        config.api_base_url = Some(url);
    }
    if let Some(secs) = cli.timeout {
        config.request_timeout_secs = Some(secs);
    }
    if let Some(kind) = cli.token_store {
        config.token_store = kind;
    }
    debug!(base_url = config.base_url(), store = %config.token_store, "Configuration loaded");

    let session = Arc::new(Session::restore(config.build_store()?));
    let client = LmsClient::connect(session, config.base_url(), config.request_timeout())?;

    run(cli.command, &client, &mut config).await.map_err(|e| {
        if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_unauthenticated) {
            e.context("Your session has ended - run `knowledgehub login` to sign in again")
        } else {
            e
        }
    })
}

async fn run(command: Command, client: &LmsClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { username, password } => login(client, config, username, password).await,
        Command::Logout => {
            client.logout();
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => {
            if !client.session().is_authenticated() {
                anyhow::bail!("Not logged in - run `knowledgehub login`");
            }
            print_json(&client.fetch_profile().await?)
        }
        Command::Refresh => {
            client.refresh().await?;
            println!("Access token refreshed");
            Ok(())
        }
        Command::Courses { public } => {
            let courses = if public {
                client.fetch_public_courses().await?
            } else {
                client.fetch_courses().await?
            };
            print_json(&courses)
        }
        Command::Course { id } => print_json(&client.fetch_course(id).await?),
        Command::Enroll { course } => print_json(&client.enroll(course).await?),
        Command::Enrolled => print_json(&client.fetch_enrolled_courses().await?),
        Command::Progress { course } => print_json(&client.fetch_course_progress(course).await?),
        Command::History { course } => print_json(&client.fetch_watch_history(course).await?),
        Command::Watch {
            course,
            video,
            position,
            percent,
        } => {
            let update = match percent {
                Some(percent) => ProgressUpdate {
                    progress_percentage: percent.clamp(0.0, 100.0),
                    last_watched_position: position,
                },
                None => {
                    let content = client.fetch_enrolled_course(course).await?;
                    let duration = content
                        .videos
                        .iter()
                        .find(|v| v.id == video)
                        .map(|v| v.duration)
                        .ok_or_else(|| anyhow::anyhow!("Video {} is not part of course {}", video, course))?;
                    ProgressUpdate::at_position(position, duration)
                }
            };
            print_json(&client.save_progress(course, video, &update).await?)
        }
        Command::Notes { video } => print_json(&client.fetch_notes(video).await?),
        Command::Note {
            video,
            position,
            text,
        } => {
            let note = NoteInput {
                content: text,
                video_position: position,
            };
            print_json(&client.create_note(video, &note).await?)
        }
        Command::Dashboard => {
            let (dashboard, notifications) = futures::try_join!(
                client.fetch_student_dashboard(),
                client.fetch_relevant_notifications(),
            )?;
            print_json(&serde_json::json!({
                "dashboard": dashboard,
                "unread_notifications": unread_count(&notifications),
            }))
        }
        Command::Notifications => print_json(&client.fetch_notifications().await?),
        Command::MarkRead { id } => print_json(&client.mark_notification_read(&id).await?),
        Command::Stats => {
            let (stats, completion, active_users) = futures::try_join!(
                client.fetch_platform_stats(),
                client.fetch_course_completion(),
                client.fetch_active_users(DEFAULT_ACTIVE_USER_DAYS),
            )?;
            print_json(&serde_json::json!({
                "platform": stats,
                "course_completion": completion,
                "active_users": active_users,
            }))
        }
    }
}

async fn login(
    client: &LmsClient,
    config: &mut Config,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(username) => username,
        None => prompt_username()?,
    };
    if username.is_empty() {
        anyhow::bail!("Username is required");
    }

    let password = match password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }

    let user = client
        .login(&Credentials::new(username.clone(), password))
        .await
        .context("Login failed")?;
    info!(username = %username, role = %user.role(), "Logged in");

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Logged in as {}", user.display_name());
    Ok(())
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from(["knowledgehub", "watch", "4", "10", "--position", "90"]).unwrap();
        match cli.command {
            Command::Watch {
                course,
                video,
                position,
                percent,
            } => {
                assert_eq!((course, video, position), (4, 10, 90));
                assert_eq!(percent, None);
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "knowledgehub",
            "courses",
            "--public",
            "--token-store",
            "keyring",
            "--timeout",
            "5",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Courses { public: true }));
        assert_eq!(cli.token_store, Some(TokenStoreKind::Keyring));
        assert_eq!(cli.timeout, Some(5));
    }

    #[test]
    fn test_note_requires_text() {
        assert!(Cli::try_parse_from(["knowledgehub", "note", "10"]).is_err());
        let cli = Cli::try_parse_from(["knowledgehub", "note", "10", "--position", "75", "Lifetimes"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Note { video: 10, position: 75, ref text } if text == "Lifetimes"
        ));
    }

    #[test]
    fn test_unknown_token_store_is_rejected() {
        assert!(Cli::try_parse_from(["knowledgehub", "logout", "--token-store", "vault"]).is_err());
    }
}
