use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::{
    http::request::Parts,
    response::{IntoResponse, Redirect},
};
use clap::Parser;
use federated_login::{
    FederatedIdentity, FederatedLoginConfig, FederatedLoginError, FederatedLoginService,
    FederatedProvider, IdentityResolver, OAuthRouter, OAuthRouterConfig, ServiceRegistry,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "federated-login",
    about = "Serve federated login routes and print resolved identities as JSON."
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "FEDERATED_LOGIN_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Public origin used to build callback URLs.
    #[arg(long, env = "FEDERATED_LOGIN_ORIGIN", default_value = "http://localhost:8080")]
    origin: String,

    /// JSON login configuration; overrides --provider and --group.
    #[arg(long, env = "FEDERATED_LOGIN_CONFIG")]
    config: Option<PathBuf>,

    /// Provider names to enable (github, google).
    #[arg(long = "provider", value_name = "NAME", default_values = ["github"])]
    providers: Vec<String>,

    /// Route group, slash separated (e.g. `api/oauth`).
    #[arg(long, default_value = "connect")]
    group: String,

    /// Timeout in seconds for outbound provider calls.
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

impl Cli {
    fn login_config(&self) -> Result<FederatedLoginConfig, Box<dyn std::error::Error>> {
        if let Some(path) = &self.config {
            let raw = std::fs::read_to_string(path)?;
            return Ok(serde_json::from_str(&raw)?);
        }

        let providers = self
            .providers
            .iter()
            .map(|name| FederatedProvider::new(name.as_str()))
            .collect();
        Ok(FederatedLoginConfig::new(providers)
            .with_route_group(self.group.split('/').filter(|segment| !segment.is_empty())))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = cli.login_config()?;
    let timeout = Duration::from_secs(cli.timeout);

    let service = FederatedLoginService::new(
        ServiceRegistry::default(),
        IdentityResolver::with_timeout(timeout)?,
    );
    let mut client =
        OAuthRouter::new(OAuthRouterConfig::from_origin(&cli.origin)?.with_timeout(timeout))?;

    let redirect_location = config.redirect_location.clone();
    service.register(
        &mut client,
        &config,
        move |_parts: Parts, identity: FederatedIdentity| {
            let location = redirect_location.clone();
            async move {
                match serde_json::to_string_pretty(&identity) {
                    Ok(output) => println!("{output}"),
                    Err(err) => error!("failed to encode identity: {err}"),
                }
                Ok::<_, FederatedLoginError>(Redirect::to(&location).into_response())
            }
        },
    )?;

    let origin = cli.origin.trim_end_matches('/');
    for (login, _) in client.paths() {
        info!("sign in at {origin}{login}");
    }

    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    info!("listening on {}", cli.bind);
    axum::serve(listener, client.into_router()).await?;
    Ok(())
}
