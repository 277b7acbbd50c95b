use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    config::load_settings_from, load_settings, ApiGateway, DashboardOptions,
    DashboardOrchestrator, GateOutcome, HttpGateway, Navigator, RouteGate, SessionStore,
};
use shared::{
    domain::DatasetKind,
    protocol::{LoginCredentials, RegisterCredentials},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "marketplace", about = "Marketplace API client")]
struct Cli {
    /// Overrides the configured API root, e.g. https://market.example.com/api
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Settings file to use instead of ./marketplace.toml and the environment.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probes the current session.
    Whoami,
    /// Checks the credentials and prints the account.
    ///
    /// The session cookie lives in memory and ends with this process, so a
    /// later `whoami` starts signed out; pass `--username`/`--password` to
    /// `dashboard` for a signed-in run.
    Login {
        /// Username or e-mail address.
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Dashboard {
        #[arg(long, value_enum)]
        tab: Option<TabArg>,
        #[arg(long, requires = "password")]
        username: Option<String>,
        #[arg(long, requires = "username")]
        password: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TabArg {
    Buyer,
    Seller,
}

impl From<TabArg> for DatasetKind {
    fn from(value: TabArg) -> Self {
        match value {
            TabArg::Buyer => DatasetKind::Buyer,
            TabArg::Seller => DatasetKind::Seller,
        }
    }
}

/// Terminal stand-in for browser navigation.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn replace(&self, path: &str) {
        eprintln!("Not signed in; continue at {path}");
    }
}

fn credentials(identifier: String, password: String) -> LoginCredentials {
    if identifier.contains('@') {
        LoginCredentials::Email {
            email: identifier,
            password,
        }
    } else {
        LoginCredentials::Username {
            username: identifier,
            password,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings(),
    };
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }
    let gateway: Arc<dyn ApiGateway> = Arc::new(HttpGateway::from_settings(&settings)?);
    let store = SessionStore::new(gateway.clone());

    match cli.command {
        Command::Whoami => {
            store.start().await;
            println!("{}", serde_json::to_string_pretty(&store.session())?);
        }
        Command::Login { username, password } => {
            let user = match store.login(&credentials(username, password)).await {
                Ok(user) => user,
                Err(rejected) => bail!("login failed: {rejected}"),
            };
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let credentials = RegisterCredentials {
                username,
                email,
                password_confirm: password.clone(),
                password,
            };
            let user = match store.register(&credentials).await {
                Ok(user) => user,
                Err(rejected) => bail!("registration failed: {rejected}"),
            };
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Dashboard {
            tab,
            username,
            password,
        } => {
            store.start().await;
            if !store.session().is_authenticated() {
                if let (Some(username), Some(password)) = (username, password) {
                    if let Err(rejected) = store.login(&credentials(username, password)).await {
                        eprintln!("login failed: {rejected}");
                    }
                }
            }

            let session = store.session();
            let mut gate = RouteGate::with_login_path(ConsoleNavigator, settings.login_path.clone());
            match gate.render(&session) {
                GateOutcome::Render => {}
                GateOutcome::Redirect => return Ok(()),
                GateOutcome::Spinner => bail!("session is still being resolved"),
            }

            let role = session.user().map(|user| user.role).unwrap_or_default();
            let dashboard =
                DashboardOrchestrator::new(gateway, role, DashboardOptions::from(&settings));
            let tab = tab.map(DatasetKind::from).unwrap_or_else(|| role.default_tab());
            dashboard.fetch(tab, role).await;

            let view = dashboard.view().await;
            dashboard.teardown().await;
            println!("{}", serde_json::to_string_pretty(&view)?);
            if let Some(error) = view.error {
                bail!("dashboard incomplete: {error}; run the command again to retry");
            }
        }
    }

    store.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{credentials, Cli, Command, TabArg};
    use clap::{CommandFactory, Parser};
    use shared::protocol::LoginCredentials;

    #[test]
    fn command_definitions_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dashboard_login_flags_come_in_pairs() {
        assert!(Cli::try_parse_from(["marketplace", "dashboard", "--username", "ana"]).is_err());

        let cli = Cli::try_parse_from([
            "marketplace",
            "--config",
            "staging.toml",
            "dashboard",
            "--tab",
            "seller",
            "--username",
            "ana",
            "--password",
            "pw",
        ])
        .expect("dashboard args");
        assert_eq!(
            cli.config.as_deref().and_then(|path| path.to_str()),
            Some("staging.toml")
        );
        assert!(matches!(
            cli.command,
            Command::Dashboard {
                tab: Some(TabArg::Seller),
                ..
            }
        ));
    }

    #[test]
    fn identifier_with_at_sign_logs_in_by_email() {
        assert!(matches!(
            credentials("ana@example.com".into(), "pw".into()),
            LoginCredentials::Email { .. }
        ));
        assert!(matches!(
            credentials("ana".into(), "pw".into()),
            LoginCredentials::Username { .. }
        ));
    }
}
