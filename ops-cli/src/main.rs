use anyhow::Result;
use clap::{Parser, Subcommand};
use logger_redacted::{LogFormat, LoggerConfig};

mod commands;

/// Operator tooling for Tessera identities and refresh sessions
///
/// Database and token settings come from `TESSERA_DATABASE__*` and
/// `TESSERA_SESSION__*` environment variables (or `.env`).
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the users and refresh_sessions tables if missing
    Migrate,

    /// Delete refresh sessions whose expiry has passed
    PurgeExpired,

    /// List a user's live refresh sessions
    Sessions {
        /// User id or email
        user: String,
    },

    /// Revoke every refresh session of a user
    RevokeUser {
        /// User id or email
        user: String,
    },

    /// Register a password account
    Register {
        email: String,

        #[arg(long, env = "TESSERA_REGISTER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Verify an access token and print its claims
    VerifyToken {
        /// Raw JWT or `Bearer <jwt>`
        token: String,
    },

    /// Sign in with a provider access token and print the token pair
    ProviderLogin {
        /// GOOGLE or GITHUB
        #[arg(long)]
        provider: auth_identity::Provider,

        #[arg(long)]
        token: String,

        #[arg(long, default_value = "tessera-cli")]
        device: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logger_redacted::init(&LoggerConfig {
        log_level: cli.log_level.clone(),
        format: if cli.json_logs { LogFormat::Json } else { LogFormat::Pretty },
    })?;

    match cli.command {
        Commands::Migrate => commands::migrate().await,
        Commands::PurgeExpired => commands::purge_expired().await,
        Commands::Sessions { user } => commands::sessions(&user).await,
        Commands::RevokeUser { user } => commands::revoke_user(&user).await,
        Commands::Register { email, password } => commands::register(&email, &password).await,
        Commands::VerifyToken { token } => commands::verify_token(&token),
        Commands::ProviderLogin {
            provider,
            token,
            device,
        } => commands::provider_login(provider, &token, &device).await,
    }
}
