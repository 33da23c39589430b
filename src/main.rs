use clap::{Parser, Subcommand};

use codeflow::cli::auth::{self, CommonOptions};
use codeflow::cli::output::print_error;

#[derive(Parser)]
#[command(name = "codeflow", version, about = "OAuth2 / OpenID Connect authorization-code login")]
struct Cli {
    /// Config file (defaults: $CODEFLOW_CONFIG, ./config/codeflow.json, ~/.codeflow/codeflow.json)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Session file (default: ~/.codeflow/<client_id>/session.json)
    #[arg(long, global = true, env = "CODEFLOW_SESSION")]
    session: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the authorization URL
    Url,

    /// Log in through the browser and store the tokens
    Login {
        /// Loopback port for the redirect (default: the redirect URL's port)
        #[arg(long)]
        port: Option<u16>,

        /// Authorization timeout in seconds
        #[arg(long, env = "CODEFLOW_LOGIN_TIMEOUT")]
        timeout: Option<u64>,
    },

    /// Revoke the stored tokens
    Revoke,

    /// Show the stored session
    Status,

    /// Decode the claims of an ID token (no signature check)
    Decode {
        /// Compact token (header.payload.signature)
        token: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CODEFLOW_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli).await {
        print_error(&e, json);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), codeflow::CodeflowError> {
    let opts = CommonOptions {
        config: cli.config,
        session_file: cli.session,
        json: cli.json,
    };

    match cli.command {
        Commands::Url => auth::run_url(&opts),
        Commands::Login { port, timeout } => {
            let timeout = timeout.map(std::time::Duration::from_secs);
            auth::run_login(&opts, port, timeout).await
        }
        Commands::Revoke => auth::run_revoke(&opts).await,
        Commands::Status => auth::run_status(&opts),
        Commands::Decode { token } => auth::run_decode(&token),
    }
}
