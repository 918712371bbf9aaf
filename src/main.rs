use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gmail-auth", version, about = "Authorize and maintain Gmail API access for the MCP server")]
struct Cli {
    /// Directory holding credentials.json and token.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Print errors and results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the OAuth consent flow and save the resulting token
    Login {
        /// Paste the authorization code instead of using a browser and local listener
        #[arg(long)]
        headless: bool,

        /// Authorize again even if a token is already stored
        #[arg(long)]
        force: bool,

        /// Do not try to open the consent URL in a browser
        #[arg(long)]
        no_browser: bool,

        /// How long to wait for the browser redirect, in milliseconds (0 waits forever)
        #[arg(long)]
        oauth_timeout: Option<u64>,
    },

    /// Show whether credentials and a token are stored
    Status,

    /// Print a valid access token, refreshing it if it expired
    Token,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("GMAIL_MCP_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli).await {
        gmail_auth::cli::output::print_error(&e, json);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), gmail_auth::AuthError> {
    let mut config = gmail_auth::AuthConfig::from_env()?;
    if let Some(dir) = cli.config_dir {
        config = config.with_config_dir(dir);
    }

    match cli.command {
        Commands::Login {
            headless,
            force,
            no_browser,
            oauth_timeout,
        } => {
            if headless {
                config.headless = true;
            }
            if no_browser {
                config.open_browser = false;
            }
            if let Some(ms) = oauth_timeout {
                config.callback_timeout =
                    (ms > 0).then(|| std::time::Duration::from_millis(ms));
            }
            gmail_auth::cli::login::run_login(config, force).await
        }
        Commands::Status => gmail_auth::cli::status::run_status(config, cli.json),
        Commands::Token => gmail_auth::cli::status::run_token(config, cli.json).await,
    }
}
