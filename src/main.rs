use std::{process, sync::Arc};

use manifestd::{
    application::{
        cache_admin::CacheAdminService,
        delivery::{DeliveryPolicy, DeliveryService},
        error::AppError,
        repos::ManifestStore,
        resolver::ManifestResolver,
    },
    cache::{CacheBackend, CacheConfig, DisabledBackend, ManifestCache, MemoryBackend},
    config,
    domain::{
        document::{Fingerprint, item_count},
        manifest::ManifestType,
    },
    infra::{
        error::InfraError,
        http::{self, AdminState, HttpState},
        storage::FsManifestStore,
        telemetry,
    },
};
use serde_json::json;
use tokio::{sync::watch, task::JoinHandle, try_join};
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Inspect(args) => run_inspect(settings, args).await,
    }
}

struct ApplicationContext {
    http_state: HttpState,
    admin_state: AdminState,
    memory: Option<Arc<MemoryBackend>>,
}

fn build_application_context(settings: &config::Settings) -> ApplicationContext {
    let store: Arc<dyn ManifestStore> = Arc::new(FsManifestStore::new(
        settings.storage.root.clone(),
        settings.storage.read_timeout,
    ));

    let cache_config = CacheConfig::from(&settings.cache);
    let memory = cache_config.enabled.then(|| Arc::new(MemoryBackend::new()));
    let backend: Arc<dyn CacheBackend> = match memory.as_ref() {
        Some(memory) => memory.clone(),
        None => Arc::new(DisabledBackend),
    };
    let cache = ManifestCache::new(backend, cache_config);

    let secret = settings.admin.cache_clear_secret.as_deref();
    if secret.is_none() {
        warn!(
            target = "manifestd::admin",
            "admin.cache_clear_secret is not set; cache invalidation is open to every caller"
        );
    }
    let cache_admin = CacheAdminService::new(cache.clone(), secret);

    let resolver = ManifestResolver::new(store.clone(), cache);
    let delivery = DeliveryService::new(
        store,
        DeliveryPolicy {
            max_age: settings.delivery.max_age,
        },
    );

    ApplicationContext {
        http_state: HttpState {
            resolver,
            delivery,
            cache_admin: cache_admin.clone(),
        },
        admin_state: AdminState { cache_admin },
        memory,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let app = build_application_context(&settings);

    info!(
        storage_root = %settings.storage.root.display(),
        cache_enabled = settings.cache.enabled,
        cache_ttl_secs = settings.cache.default_ttl.as_secs(),
        "starting manifestd"
    );

    let sweep_handle = app
        .memory
        .clone()
        .map(|memory| spawn_expiry_sweep(memory, settings.cache.sweep_interval));

    let result = serve_http(&settings, app.http_state, app.admin_state).await;

    if let Some(handle) = sweep_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

fn spawn_expiry_sweep(memory: Arc<MemoryBackend>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // Skip the first immediate tick
        loop {
            interval.tick().await;
            let purged = memory.purge_expired();
            if purged > 0 {
                debug!(target = "manifestd::cache", purged, "expired cache entries purged");
            }
        }
    })
}

async fn run_inspect(
    settings: config::Settings,
    args: config::InspectArgs,
) -> Result<(), AppError> {
    let store = FsManifestStore::new(settings.storage.root.clone(), settings.storage.read_timeout);

    for ty in ManifestType::ALL {
        let path = store.path_for(ty);
        let line = match store.read(ty).await {
            Ok(document) => {
                let fingerprint = Fingerprint::of(&document);
                let items = item_count(&document);
                if args.json {
                    json!({
                        "type": ty.as_str(),
                        "path": path.display().to_string(),
                        "itemCount": items,
                        "etag": fingerprint.as_str(),
                    })
                    .to_string()
                } else {
                    format!(
                        "{ty:<10} {items:>6} items  {}  {}",
                        fingerprint.as_str(),
                        path.display()
                    )
                }
            }
            Err(err) => {
                let status = if err.is_not_found() { "missing" } else { "error" };
                if args.json {
                    json!({
                        "type": ty.as_str(),
                        "path": path.display().to_string(),
                        "status": status,
                        "error": err.to_string(),
                    })
                    .to_string()
                } else {
                    format!("{ty:<10} {status:>6}        {err}")
                }
            }
        };
        println!("{line}");
    }

    Ok(())
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        "listeners bound"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(drained(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(drained(shutdown_rx));

    let servers = async { try_join!(public_server, admin_server) };
    tokio::pin!(servers);

    let result = tokio::select! {
        result = &mut servers => result,
        () = shutdown_signal() => {
            info!("shutdown signal received; draining connections");
            let _ = shutdown_tx.send(());
            match tokio::time::timeout(settings.server.graceful_shutdown, &mut servers).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        grace_secs = settings.server.graceful_shutdown.as_secs(),
                        "graceful shutdown window elapsed; dropping open connections"
                    );
                    Ok(((), ()))
                }
            }
        }
    };

    result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
    Ok(())
}

async fn drained(mut shutdown: watch::Receiver<()>) {
    let _ = shutdown.changed().await;
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
