//! # tally
//!
//! Command-line front end: currency formatting against the saved
//! preference, and sign-in against the Auth API.
//!
//! ## Command Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  args ─► Command::parse ─► SessionConfig::load ─► FileStore::open       │
//! │                                                        │                │
//! │                      ┌─────────────────────────────────┴───────┐        │
//! │                      ▼                                         ▼        │
//! │            currencies / format / parse / use       login / logout /     │
//! │            CurrencyFormatter                       refresh / status /   │
//! │                                                    whoami               │
//! │                                                    SessionManager       │
//! │                                                                         │
//! │  Auth failures print AuthError::user_message() and exit 1.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod command;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tally_core::format::{format_amount, parse_amount};
use tally_core::{Currency, CurrencyFormatter, CurrencyRegistry, Plan, User};
use tally_session::{AuthError, FileStore, HttpAuthApi, SessionConfig, SessionManager};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::command::{Command, USAGE};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<AuthError>() {
                Some(auth) => eprintln!("{}", auth.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so command output stays pipeable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Command) -> Result<()> {
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = SessionConfig::load(None).context("Failed to load configuration")?;
    let storage_path = config
        .storage_path()
        .context("No data directory on this system; set TALLY_STORAGE_PATH")?;
    debug!(path = ?storage_path, "Opening storage");
    let store = Arc::new(
        FileStore::open(&storage_path)
            .with_context(|| format!("Failed to open {}", storage_path.display()))?,
    );

    if command.is_offline() {
        let formatter = CurrencyFormatter::load_with_default(
            CurrencyRegistry::builtin()?,
            store,
            config.default_currency_code(),
        );
        return run_currency(command, formatter);
    }

    let api = Arc::new(HttpAuthApi::from_settings(&config.api)?);
    let manager = SessionManager::new(api, store);
    run_session(command, &manager).await
}

// =============================================================================
// Currency Commands
// =============================================================================

fn run_currency(command: Command, mut formatter: CurrencyFormatter) -> Result<()> {
    match command {
        Command::Currencies => {
            let active = formatter.currency().code.clone();
            for currency in formatter.registry().iter() {
                let marker = if currency.code == active { '*' } else { ' ' };
                println!(
                    "{marker} {:<4} {:<24} {}",
                    currency.code,
                    currency.name,
                    format_amount(currency, 1234.5, true, formatter.rounding_mode())
                );
            }
        }
        Command::Format {
            amount,
            code,
            show_symbol,
        } => {
            let currency = pick(&formatter, code.as_deref())?;
            println!(
                "{}",
                format_amount(&currency, amount, show_symbol, formatter.rounding_mode())
            );
        }
        Command::Parse { text, code } => {
            let currency = pick(&formatter, code.as_deref())?;
            println!("{}", parse_amount(&currency, &text));
        }
        Command::Use { code } => {
            formatter.set_currency_by_code(&code)?;
            let currency = formatter.currency();
            println!("Preferred currency: {} ({})", currency.name, currency.code);
        }
        other => return Err(anyhow!("`{other:?}` is not a currency command")),
    }
    Ok(())
}

/// The currency named by `--code`, or the active one.
fn pick(formatter: &CurrencyFormatter, code: Option<&str>) -> Result<Currency> {
    match code {
        Some(code) => formatter
            .get_currency_by_code(code)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown currency: {code}")),
        None => Ok(formatter.currency().clone()),
    }
}

// =============================================================================
// Session Commands
// =============================================================================

async fn run_session(command: Command, manager: &SessionManager) -> Result<()> {
    match command {
        Command::Login {
            email,
            password,
            remember_me,
        } => {
            let session = manager.login(&email, &password, remember_me).await?;
            if let Some(user) = &session.user {
                println!("Signed in as {}", describe(user));
                if user.is_profile_incomplete() {
                    println!("Your profile is incomplete. Add your business details to continue.");
                }
            }
        }
        Command::Logout => {
            manager.logout().await?;
            println!("Signed out");
        }
        Command::Refresh => match manager.refresh().await {
            Ok(_) => println!("Session refreshed"),
            Err(e) => {
                if e.is_rejection() {
                    if let Err(clear) = manager.logout().await {
                        warn!(error = %clear, "Failed to clear rejected session");
                    }
                }
                return Err(e.into());
            }
        },
        Command::Status => {
            let status = manager.check_auth_status().await;
            println!("{status}");
        }
        Command::WhoAmI => {
            let status = manager.check_auth_status().await;
            let user = manager
                .user()
                .await
                .filter(|_| status.is_authenticated())
                .ok_or(AuthError::NotAuthenticated)?;

            println!("{}", describe(&user));
            println!("Business: {} ({})", user.business_name, user.business_type);
            println!("Plan:     {}", plan_label(user.plan));
        }
        other => return Err(anyhow!("`{other:?}` is not a session command")),
    }
    Ok(())
}

fn describe(user: &User) -> String {
    let name = user.full_name();
    if name.is_empty() {
        user.email.clone()
    } else {
        format!("{name} <{}>", user.email)
    }
}

fn plan_label(plan: Plan) -> &'static str {
    match plan {
        Plan::Free => "free",
        Plan::Pro => "pro",
    }
}
