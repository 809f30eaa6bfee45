//! Application assembly: pool, module registry, migrations, server.

use anyhow::Context;
use axum::Router;
use bookshelf_db::Pool;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// A fully wired application, ready to migrate and serve
pub struct App {
    pub settings: Settings,
    pub pool: Pool,
    pub registry: ModuleRegistry,
}

impl App {
    /// Connect to the database and register every module
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let pool = bookshelf_db::connect(&settings.database)
            .await
            .context("failed to open database")?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, pool.clone())
            .context("failed to register modules")?;

        Ok(Self {
            settings,
            pool,
            registry,
        })
    }

    /// Router with every module mounted, without binding a socket
    pub fn router(&self) -> Router {
        bookshelf_http::build_router(&self.registry, &self.settings)
    }
}

/// Apply pending migrations from every module; returns how many ran
pub async fn migrate(app: &App) -> anyhow::Result<usize> {
    let migrations = app.registry.collect_migrations();
    let applied = bookshelf_db::run_migrations(&app.pool, &migrations)
        .await
        .context("failed to run migrations")?;

    tracing::info!(applied, total = migrations.len(), "migrations complete");
    Ok(applied)
}

/// Migrate, run module lifecycle hooks, and serve HTTP until shutdown
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let app = App::build(settings).await?;
    migrate(&app).await?;

    let ctx = InitCtx {
        settings: &app.settings,
    };
    app.registry.init_all(&ctx).await?;
    app.registry.start_all(&ctx).await?;

    tracing::info!("bookshelf-app bootstrap complete");

    let served = bookshelf_http::start_server(&app.registry, &app.settings).await;

    app.registry.stop_all().await?;
    app.pool.close().await;

    served
}
