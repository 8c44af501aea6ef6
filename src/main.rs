use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use user_service::config::Configuration;
use user_service::error::UserError;
use user_service::user::{NewUser, UserPatch, UserService};
use user_service::{initialize_state, telemetry};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path of the `config.yaml` file.
    #[arg(long, short, default_value = "config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Create a user. `password` must already be hashed.
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        permission_flags: Option<i32>,
    },
    /// Show a user.
    Get { id: String },
    /// Permanently delete a user.
    Delete { id: String },
    /// List users, oldest first. Pages start at 0.
    List {
        #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
        limit: i64,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        page: i64,
    },
    /// Change some fields of a user.
    Update {
        id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        permission_flags: Option<i32>,
    },
    /// Find a user by email.
    ByEmail {
        email: String,
        /// Also print the hashed password.
        #[arg(long)]
        with_password: bool,
    },
    /// Replace the refresh token of a user. Omit the token to clear it.
    RefreshToken {
        id: String,
        #[arg(default_value = "")]
        token: String,
    },
    /// Delete every user.
    Purge,
}

fn print(value: &impl Serialize) -> Result<(), UserError> {
    let json = serde_json::to_string_pretty(value).map_err(UserError::store)?;
    println!("{json}");
    Ok(())
}

async fn run(users: UserService, cmd: Commands) -> Result<(), UserError> {
    match cmd {
        Commands::Create {
            email,
            password,
            first_name,
            last_name,
            permission_flags,
        } => {
            let payload = NewUser::builder()
                .email(email)
                .password(password)
                .first_name(first_name)
                .last_name(last_name)
                .permission_flags(permission_flags)
                .build();
            print(&users.create(payload).await?)
        },
        Commands::Get { id } => print(&users.get_by_id(&id).await?),
        Commands::Delete { id } => {
            users.delete_by_id(&id).await?;
            tracing::info!(user_id = %id, "user deleted");
            Ok(())
        },
        Commands::List { limit, page } => print(&users.list(limit, page).await?),
        Commands::Update {
            id,
            email,
            password,
            first_name,
            last_name,
            permission_flags,
        } => {
            let patch = UserPatch {
                email,
                password,
                first_name,
                last_name,
                permission_flags,
            };
            print(&users.update_by_id(&id, patch).await?)
        },
        Commands::ByEmail {
            email,
            with_password: true,
        } => print(&users.get_user_by_email_with_password(&email).await?),
        Commands::ByEmail { email, .. } => {
            print(&users.get_user_by_email(&email).await?)
        },
        Commands::RefreshToken { id, token } => {
            users.update_user_refresh_token_by_id(&id, &token).await?;
            tracing::info!(user_id = %id, cleared = token.is_empty(), "refresh token updated");
            Ok(())
        },
        Commands::Purge => {
            let deleted = users.delete_all_users().await?;
            tracing::info!(deleted, "all users deleted");
            Ok(())
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (config, load_error) =
        match Configuration::default().path(args.config).load() {
            Ok(config) => (Arc::new(config), None),
            Err(err) => (Arc::new(Configuration::fallback()), Some(err)),
        };
    let provider = match telemetry::init(config.telemetry.as_ref()) {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("cannot initialize telemetry: {err}");
            return ExitCode::FAILURE;
        },
    };

    // reported once a subscriber is installed.
    if let Some(err) = load_error {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid, using defaults");
    }

    let code = match initialize_state(config).await {
        Ok(state) => match run(state.users, args.cmd).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!(error = %err, details = ?err, "command failed");
                ExitCode::FAILURE
            },
        },
        Err(err) => {
            tracing::error!(error = %err, "cannot initialize state");
            ExitCode::FAILURE
        },
    };

    if let Some(provider) = provider {
        if let Err(err) = provider.shutdown() {
            eprintln!("cannot flush logs: {err}");
        }
    }

    code
}
