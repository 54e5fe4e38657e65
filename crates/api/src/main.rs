use anyhow::Context;
use uuid::Uuid;

use orders_api::app::{self, Application};
use orders_infra::config::{AppConfig, DiscoveryBackend};
use orders_infra::discovery::{ConsulRegistration, SelfRegistration};
use orders_infra::maintenance;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_default().context("loading configuration")?;
    orders_observability::init_with_default(&config.telemetry.log_level);

    let Application {
        router,
        maintenance: switch,
        consul,
    } = app::build_app(&config).await.context("building application")?;

    let bind_addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    let local_addr = listener.local_addr().context("reading local address")?;
    tracing::info!(addr = %local_addr, service = %config.service.query(), "listening");

    let mut registration = None;
    let mut watcher = None;
    if let (DiscoveryBackend::Consul, Some(client)) = (config.discovery.backend, consul) {
        if config.discovery.register {
            let instance_id = Uuid::now_v7().to_string();
            let reg = ConsulRegistration::for_service(
                &config.service.query(),
                &instance_id,
                config.service.address.clone(),
                local_addr.port(),
                config.discovery.ttl_secs,
            );
            registration = Some(
                SelfRegistration::start(client.clone(), reg, config.discovery.ping_interval())
                    .await
                    .context("registering with consul")?,
            );
        }

        if config.rest.watch {
            let key = maintenance::maintenance_key(&config.service.query());
            tracing::info!(key = %key, "watching maintenance flag");
            watcher = Some(maintenance::spawn_consul_watch(
                client,
                key,
                switch,
                config.rest.watch_interval(),
            ));
        }
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    if let Some(watcher) = watcher {
        watcher.abort();
    }
    if let Some(registration) = registration {
        if let Err(e) = registration.deregister().await {
            tracing::warn!(error = %e, "consul deregistration failed");
        }
    }

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
