use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use moto_workflow::config::{DatabaseConfig, EnvironmentConfig};
use moto_workflow::repositories::{MemoryStore, PgStore, WorkflowStore};
use moto_workflow::routes::create_app_router;
use moto_workflow::services::{LogNotifier, Notifier, WebhookNotifier};
use moto_workflow::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🏍️ Moto Workflow Engine");
    info!("================================================");

    let config = EnvironmentConfig::from_env()?;
    info!("⚙️ Entorno: {}", config.environment);

    // Persistencia: Postgres si hay DATABASE_URL, memoria en caso contrario
    let store: Arc<dyn WorkflowStore> = match &config.database_url {
        Some(url) => {
            let pool = match DatabaseConfig::new(url.clone()).connect_and_migrate().await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            info!("✅ Base de datos conectada");
            Arc::new(PgStore::new(pool))
        }
        None => {
            warn!("⚠️ DATABASE_URL no definida, usando almacenamiento en memoria");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            info!("📣 Notificaciones vía webhook: {}", url);
            Arc::new(WebhookNotifier::new(url.clone())?)
        }
        None => Arc::new(LogNotifier),
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = create_app_router(AppState::new(config, store, notifier));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🏍️ /api/motorcycles - Registro, precio e invariantes");
    info!("✅ /api/approvals - Cadena de aprobación ventas → admin");
    info!("🔧 /api/repairs - Reparaciones");
    info!("🔍 /api/inspections - Inspección RAMA / GIDIONI");
    info!("💰 /api/bills - Facturación y caja");
    info!("📄 /api/contracts/:id - Contratos");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
