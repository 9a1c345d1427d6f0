//! Node Auto-Healer
//!
//! Bootstraps the cloud provider named in the configuration: registers the
//! built-in backends, constructs the selected one and keeps the resulting
//! service clients for the remediation loop.

use backoff::{future::retry, ExponentialBackoff};
use clap::Parser;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use node_autohealer::{
    default_registry, CloudProviderRef, CloudProviderRegistry, Config, Error,
    OpenStackCloudProvider, Result, StartupAction,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Node Auto-Healer - cloud provider bootstrap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the auto-healer YAML configuration
    #[arg(long, env = "AUTOHEALER_CONFIG", default_value = "/etc/autohealer/config.yaml")]
    config: PathBuf,

    /// Cloud provider to use, overrides the configuration
    #[arg(long, env = "CLOUD_PROVIDER")]
    cloud_provider: Option<String>,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: String,

    /// Give up constructing the cloud provider after this many seconds
    #[arg(long, env = "STARTUP_TIMEOUT_SECS", default_value = "900")]
    startup_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Run without a Kubernetes client
    #[arg(long, env = "STANDALONE")]
    standalone: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting Node Auto-Healer");
    info!("  Version: {}", node_autohealer::VERSION);
    info!("  Config: {}", args.config.display());
    info!("  Standalone mode: {}", args.standalone);

    let mut config = Config::from_file(&args.config)?;
    if let Some(name) = &args.cloud_provider {
        config.cloud_provider = name.clone();
        config.validate()?;
    }

    let registry = default_registry();
    info!("Registered cloud providers: {:?}", registry.names());

    let kube_client = if args.standalone {
        None
    } else {
        Some(build_kube_client(&config).await?)
    };

    let ready = Arc::new(AtomicBool::new(false));
    let health_addr = args.health_addr.clone();
    let health_ready = ready.clone();
    tokio::spawn(async move {
        if let Err(e) = run_health_server(&health_addr, health_ready).await {
            error!("Health server error: {}", e);
        }
    });

    let provider = construct_with_retry(
        &registry,
        &config,
        kube_client,
        Duration::from_secs(args.startup_timeout_secs),
    )
    .await?;

    for (service, endpoint) in provider.endpoints() {
        info!("  {}: {}", service, endpoint);
    }
    if let Some(openstack) = provider.downcast_ref::<OpenStackCloudProvider>() {
        info!(
            "  container-infra microversion: {}",
            openstack.container_infra().microversion().unwrap_or("none")
        );
    }
    ready.store(true, Ordering::SeqCst);
    info!("Cloud provider {} ready", provider.name());

    tokio::signal::ctrl_c().await?;

    info!("Auto-healer shutdown complete");
    Ok(())
}

// =============================================================================
// Cloud Provider Construction
// =============================================================================

/// Construct the configured provider, retrying the whole construction for
/// errors the caller may recover from
async fn construct_with_retry(
    registry: &CloudProviderRegistry,
    config: &Config,
    kube_client: Option<kube::Client>,
    timeout: Duration,
) -> Result<CloudProviderRef> {
    let policy = ExponentialBackoff {
        max_elapsed_time: Some(timeout),
        ..Default::default()
    };

    let attempt = || {
        let config = config.clone();
        let kube_client = kube_client.clone();
        async move {
            let name = config.cloud_provider.clone();
            registry
                .construct(&name, config, kube_client)
                .await
                .map_err(|e| match e.action() {
                    StartupAction::Abort => backoff::Error::permanent(e),
                    StartupAction::RetryAfter(delay) => {
                        warn!("Cloud provider construction failed, retrying in {:?}: {}", delay, e);
                        backoff::Error::retry_after(e, delay)
                    }
                    StartupAction::RetryWithBackoff => {
                        warn!("Cloud provider construction failed, retrying: {}", e);
                        backoff::Error::transient(e)
                    }
                })
        }
    };

    retry(policy, attempt).await
}

async fn build_kube_client(config: &Config) -> Result<kube::Client> {
    let Some(path) = &config.kubeconfig else {
        return Ok(kube::Client::try_default().await?);
    };

    info!("Using kubeconfig {}", path.display());
    let kubeconfig = kube::config::Kubeconfig::read_from(path)
        .map_err(|e| Error::Configuration(format!("invalid kubeconfig {}: {}", path.display(), e)))?;
    let client_config = kube::Config::from_custom_kubeconfig(
        kubeconfig,
        &kube::config::KubeConfigOptions::default(),
    )
    .await
    .map_err(|e| Error::Configuration(format!("invalid kubeconfig {}: {}", path.display(), e)))?;

    Ok(kube::Client::try_from(client_config)?)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},hyper=warn,reqwest=info,kube=info",
            level.as_str().to_lowercase()
        ))
    });

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

// =============================================================================
// Health Server
// =============================================================================

fn plain(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}

async fn run_health_server(addr: &str, ready: Arc<AtomicBool>) -> Result<()> {
    let make_svc = make_service_fn(move |_conn| {
        let ready = ready.clone();
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let ready = ready.load(Ordering::SeqCst);
                async move {
                    let response = match req.uri().path() {
                        "/healthz" | "/livez" => plain(StatusCode::OK, "ok"),
                        "/readyz" if ready => plain(StatusCode::OK, "ok"),
                        "/readyz" => plain(StatusCode::SERVICE_UNAVAILABLE, "cloud provider not ready"),
                        _ => plain(StatusCode::NOT_FOUND, "not found"),
                    };
                    Ok::<_, std::convert::Infallible>(response)
                }
            }))
        }
    });

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Configuration(format!("Invalid health server address: {}", e)))?;

    info!("Health server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Internal(format!("Health server error: {}", e)))?;

    Ok(())
}
