//! Application entry point and console frontend
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes the local database
//! - Composes the backend (remote with local fallback, or local-only)
//! - Runs the interactive dashboard loop

use std::env;
use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dotenvy::dotenv;

// Module declarations
mod backend;
mod database;
mod error;
mod identity;
mod local;
mod model;
mod remote;
mod service;
mod session;
mod ui;

use backend::{FallbackBackend, LinkBackend};
use database::init_db;
use identity::IdentityStore;
use local::LocalBackend;
use model::{Credentials, Link};
use remote::RemoteBackend;
use service::LinkService;
use session::{SessionController, SessionStore};
use ui::{Frontend, Notice};

/// Terminal implementation of the display callbacks
///
/// Notifications print with a fixed ANSI color per category; the busy
/// indicator announces only off-to-on transitions so chained operations do
/// not spam the terminal.
struct ConsoleFrontend {
    busy: AtomicBool,
}

impl ConsoleFrontend {
    fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }
}

impl Frontend for ConsoleFrontend {
    fn notify(&self, notice: Notice, message: &str) {
        let color = match notice {
            Notice::Success => "\x1b[32m",
            Notice::Error => "\x1b[31m",
            Notice::Warning => "\x1b[33m",
            Notice::Info => "\x1b[34m",
        };
        println!("{}[{}]\x1b[0m {}", color, notice.title(), message);
    }

    fn set_busy(&self, busy: bool) {
        if self.busy.swap(busy, Ordering::SeqCst) != busy && busy {
            println!("⏳ working...");
        }
    }

    fn confirm(&self, question: &str) -> bool {
        match prompt(&format!("{} [y/N] ", question)) {
            Some(answer) => matches!(answer.trim(), "y" | "Y" | "yes"),
            None => false,
        }
    }
}

/// Prints `text`, then reads one line from stdin. `None` on EOF.
fn prompt(text: &str) -> Option<String> {
    print!("{}", text);
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        Err(_) => None,
    }
}

fn print_dashboard(username: &str, link: Option<&Link>) {
    println!();
    println!("👤 {}", username);
    match link {
        Some(link) => {
            println!("🎫 Referral code: {}", link.referral_code);
            println!("🔗 Download link: {}", link.download_url);
            println!(
                "📈 Downloads: {} | Installs: {} | Reward: {}",
                link.download_count, link.install_count, link.reward_amount
            );
        }
        None => println!("No active link yet. Use [c]reate to generate one."),
    }
    println!("Commands: [c]reate  [y]copy  [d]elete  [r]efresh  [l]ogout  [q]uit");
}

/// Prompts for credentials and attempts a login.
///
/// Returns `false` when stdin is closed.
async fn login_flow(controller: &SessionController, frontend: &dyn Frontend) -> bool {
    println!();
    let Some(username) = prompt("Username: ") else {
        return false;
    };
    let Some(password) = prompt("Password (4 digits): ") else {
        return false;
    };

    // The form validates before anything touches a backend
    if let Err(err) = Credentials::parse(&username, &password) {
        frontend.notify(Notice::Error, &err.to_string());
        return true;
    }

    match controller.login(&username, &password).await {
        Ok(user) => {
            frontend.notify(Notice::Success, &format!("Logged in as {}.", user.username));
            if let Err(err) = controller.refresh_link().await {
                frontend.notify(Notice::Error, &err.to_string());
            }
        }
        Err(err) if err.is_invalid_credentials() => {
            frontend.notify(Notice::Error, "Username or password is incorrect.");
        }
        Err(err) => frontend.notify(Notice::Error, &err.to_string()),
    }
    true
}

/// Shows the dashboard and executes one command.
///
/// Returns `false` when the user quits or stdin is closed.
async fn dashboard_flow(controller: &SessionController, frontend: &dyn Frontend) -> bool {
    let Some(user) = controller.current_user() else {
        return true;
    };
    let link = controller.current_link();
    print_dashboard(&user.username, link.as_ref());

    let Some(input) = prompt("> ") else {
        return false;
    };

    match input.trim() {
        "c" | "create" => match controller.create_link().await {
            Ok(link) => frontend.notify(
                Notice::Success,
                &format!("New referral link created: {}", link.referral_code),
            ),
            Err(err) => frontend.notify(Notice::Error, &err.to_string()),
        },
        "y" | "copy" => match controller.current_link() {
            Some(link) => frontend.notify(
                Notice::Info,
                &format!("Copy this link: {}", link.download_url),
            ),
            None => frontend.notify(Notice::Warning, "There is no link to copy yet."),
        },
        "d" | "delete" => match controller.delete_link().await {
            Ok(true) => frontend.notify(Notice::Success, "Link deleted."),
            Ok(false) => frontend.notify(Notice::Info, "Nothing was deleted."),
            Err(err) => frontend.notify(Notice::Error, &err.to_string()),
        },
        "r" | "refresh" => {
            if let Err(err) = controller.refresh_link().await {
                frontend.notify(Notice::Error, &err.to_string());
            }
        }
        "l" | "logout" => match controller.logout() {
            Ok(()) => frontend.notify(Notice::Success, "Logged out."),
            Err(err) => frontend.notify(Notice::Error, &err.to_string()),
        },
        "q" | "quit" => return false,
        "" => {}
        other => frontend.notify(Notice::Warning, &format!("Unknown command: {}", other)),
    }
    true
}

/// Application entry point
///
/// This asynchronous main function:
/// 1. Loads environment variables from .env file
/// 2. Reads configuration (database path, download base, remote endpoint)
/// 3. Initializes the embedded database
/// 4. Composes the backend and session controller
/// 5. Restores any persisted session and runs the dashboard loop
///
/// # Environment Variables
///
/// - `DATABASE_URL` - Path to the local database file (default: "refdash.db")
/// - `DOWNLOAD_BASE_URL` - Prefix for generated download links (default: "www.newservice.com/download")
/// - `REMOTE_API_URL` - Remote endpoint; unset means local-only mode
/// - `AUTHORIZATION` - Optional API key sent as the Authorization header
#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter("refdash=debug")
        .init();

    // Read the database file path from environment
    let db_path = env::var("DATABASE_URL").unwrap_or_else(|_| "refdash.db".to_string());

    let download_base = env::var("DOWNLOAD_BASE_URL")
        .unwrap_or_else(|_| "www.newservice.com/download".to_string());
    let remote_url = env::var("REMOTE_API_URL").ok().filter(|url| !url.is_empty());
    let api_key = env::var("AUTHORIZATION").ok().filter(|key| !key.is_empty());

    // Initialize the embedded database with the specified path
    let db = Arc::new(init_db(&db_path).expect("Failed to initialize database"));

    // Compose the backend: remote with local fallback when an endpoint is
    // configured, plain local otherwise
    let local = LocalBackend::new(db.clone());
    let backend: Arc<dyn LinkBackend> = match &remote_url {
        Some(url) => Arc::new(FallbackBackend::new(
            RemoteBackend::new(url.clone(), api_key),
            local,
        )),
        None => Arc::new(local),
    };

    let frontend = Arc::new(ConsoleFrontend::new());
    let controller = SessionController::new(
        IdentityStore::new(backend.clone()),
        LinkService::new(backend, download_base),
        SessionStore::new(db),
        frontend.clone(),
    );

    // Print startup information
    println!("🔗 Referral link dashboard");
    println!("📂 Using database: {}", db_path);
    match &remote_url {
        Some(url) => println!("🌐 Remote API: {}", url),
        None => println!("🌐 Remote API: none (local-only mode)"),
    }

    // A restart restores the previous session without re-prompting
    match controller.restore_session().await {
        Ok(Some(user)) => frontend.notify(
            Notice::Info,
            &format!("Welcome back, {}!", user.username),
        ),
        Ok(None) => {}
        Err(err) => frontend.notify(Notice::Error, &err.to_string()),
    }

    loop {
        let keep_going = if controller.state().is_logged_in() {
            dashboard_flow(&controller, frontend.as_ref()).await
        } else {
            login_flow(&controller, frontend.as_ref()).await
        };
        if !keep_going {
            break;
        }
    }

    println!("👋 Bye.");
}
