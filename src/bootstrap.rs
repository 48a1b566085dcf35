//! Application assembly: store connection, module lifecycle and serving.

use anyhow::Context;
use axum::Router;

use shelf_db::Store;
use shelf_kernel::{InitCtx, ModuleRegistry, Settings};

use crate::modules::{self, AppContext};

/// A fully initialized application, ready to serve.
pub struct Application {
    settings: Settings,
    registry: ModuleRegistry,
    store: Store,
}

impl Application {
    /// Connect the store and run module init, store preparation and start.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let store = Store::connect(&settings.database.endpoint, &settings.database.name)
            .await
            .with_context(|| {
                format!("failed to connect to '{}'", settings.database.endpoint)
            })?;

        Self::with_store(settings, store).await
    }

    /// Same as [`Application::build`] with an already connected store.
    pub async fn with_store(settings: Settings, store: Store) -> anyhow::Result<Self> {
        let ctx = AppContext::new(&settings, store.clone());
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &ctx);

        let init_ctx = InitCtx {
            settings: &settings,
            store: &store,
        };
        registry.init_modules(&init_ctx).await?;
        registry.prepare_store(&store).await?;
        registry.start_modules(&init_ctx).await?;

        tracing::info!(
            env = ?settings.environment,
            backend = store.backend(),
            modules = registry.modules().len(),
            "shelf bootstrap complete"
        );

        Ok(Self {
            settings,
            registry,
            store,
        })
    }

    pub fn router(&self) -> Router {
        shelf_http::build_router(&self.registry, &self.settings)
    }

    /// Serve until Ctrl-C, then stop modules in reverse order.
    pub async fn serve(self) -> anyhow::Result<()> {
        let app = self.router();
        shelf_http::start_server(app, &self.settings, shutdown_signal()).await?;
        self.shutdown().await
    }

    /// Stop modules, then release the store.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.registry.stop_modules().await?;
        self.store.close().await;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
