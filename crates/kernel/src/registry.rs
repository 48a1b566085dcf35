use anyhow::Context;
use std::sync::Arc;

use shelf_db::{Database, IndexSpec, SqlStore, Store};

use crate::module::{InitCtx, Migration, Module};

/// Module registry driving the init -> prepare store -> start -> stop lifecycle
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module; modules are initialized and started in registration order
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Get all registered modules
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    /// Initialize every module
    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Collect index declarations from all modules, ordered by module name
    pub fn collect_indexes(&self) -> Vec<(String, IndexSpec)> {
        let mut indexes = Vec::new();

        for module in &self.modules {
            for index in module.indexes() {
                indexes.push((module.name().to_string(), index));
            }
        }

        // Sort by module name and index name for deterministic ordering
        indexes.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.name.cmp(b.1.name)));

        indexes
    }

    /// Collect migrations from all modules, ordered by module name then id
    pub fn collect_migrations(&self) -> Vec<(String, Migration)> {
        let mut migrations = Vec::new();

        for module in &self.modules {
            for migration in module.migrations() {
                migrations.push((module.name().to_string(), migration));
            }
        }

        // Sort by module name and migration ID for deterministic ordering
        migrations.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(b.1.id)));

        migrations
    }

    /// Bring the store's schema up to date with what the modules declare
    pub async fn prepare_store(&self, store: &Store) -> anyhow::Result<()> {
        match store {
            Store::Memory(db) => self.apply_indexes(db).await,
            Store::Sql(sql) => {
                self.apply_migrations(sql).await?;
                self.verify_indexes(sql).await
            }
        }
    }

    /// Apply every collected index to the database
    pub async fn apply_indexes(&self, db: &Database) -> anyhow::Result<()> {
        for (module, index) in self.collect_indexes() {
            tracing::info!(module = %module, index = index.name, "applying index");

            db.ensure_index(index.clone()).await.with_context(|| {
                format!("failed to apply index '{}' for module '{}'", index.name, module)
            })?;
        }

        Ok(())
    }

    /// Run pending migrations in collection order
    pub async fn apply_migrations(&self, sql: &SqlStore) -> anyhow::Result<()> {
        for (module, migration) in self.collect_migrations() {
            let applied = sql
                .apply_migration(&module, migration.id, migration.up)
                .await
                .with_context(|| {
                    format!("failed to apply migration '{}' for module '{}'", migration.id, module)
                })?;

            if !applied {
                tracing::debug!(module = %module, migration = migration.id, "migration already applied");
            }
        }

        Ok(())
    }

    /// Every declared index must exist once migrations have run
    async fn verify_indexes(&self, sql: &SqlStore) -> anyhow::Result<()> {
        for (module, index) in self.collect_indexes() {
            if !sql.has_index(index.name).await? {
                anyhow::bail!(
                    "module '{}' declares index '{}' but no migration creates it",
                    module,
                    index.name
                );
            }
        }

        Ok(())
    }

    /// Start every module
    pub async fn start_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("starting {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop modules in reverse registration order
    pub async fn stop_modules(&self) -> anyhow::Result<()> {
        tracing::info!("stopping {} modules", self.modules.len());

        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::sync::Mutex;

    struct TestModule {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn indexes(&self) -> Vec<IndexSpec> {
            vec![IndexSpec {
                collection: "things",
                name: "things_key_unique",
                fields: &["key"],
                unique: true,
            }]
        }

        fn migrations(&self) -> Vec<Migration> {
            vec![Migration {
                id: "0001_things",
                up: "CREATE TABLE IF NOT EXISTS things (key TEXT NOT NULL);
                     CREATE UNIQUE INDEX IF NOT EXISTS things_key_unique ON things (key);",
            }]
        }

        async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("start {}", self.name));
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(format!("stop {}", self.name));
            Ok(())
        }
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.modules().is_empty());
        assert!(registry.collect_indexes().is_empty());
    }

    #[tokio::test]
    async fn test_module_lifecycle() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        let settings = Settings::default();
        let store = Store::Memory(Database::in_memory("test"));
        let ctx = InitCtx {
            settings: &settings,
            store: &store,
        };

        for name in ["first", "second"] {
            registry.register(Arc::new(TestModule {
                name,
                log: log.clone(),
            }));
        }
        assert!(registry.get_module("second").is_some());

        registry.init_modules(&ctx).await.unwrap();
        // Both modules declare the same index name, so the second apply is a no-op.
        registry.prepare_store(&store).await.unwrap();
        registry.start_modules(&ctx).await.unwrap();
        registry.stop_modules().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            ["start first", "start second", "stop second", "stop first"]
        );
    }

    #[test]
    fn migrations_are_ordered_by_module_then_id() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        for name in ["zeta", "alpha"] {
            registry.register(Arc::new(TestModule {
                name,
                log: log.clone(),
            }));
        }

        let order: Vec<_> = registry
            .collect_migrations()
            .into_iter()
            .map(|(module, migration)| format!("{module}/{}", migration.id))
            .collect();
        assert_eq!(order, ["alpha/0001_things", "zeta/0001_things"]);
    }

    #[tokio::test]
    async fn sql_store_is_migrated_and_indexes_verified() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule {
            name: "things",
            log,
        }));

        let store = Store::connect("sqlite::memory:", "test").await.unwrap();
        registry.prepare_store(&store).await.unwrap();
        // Running again finds the migration recorded.
        registry.prepare_store(&store).await.unwrap();
    }

    struct IndexOnly;

    #[async_trait::async_trait]
    impl Module for IndexOnly {
        fn name(&self) -> &'static str {
            "index-only"
        }

        fn indexes(&self) -> Vec<IndexSpec> {
            vec![IndexSpec {
                collection: "orphans",
                name: "orphans_key_unique",
                fields: &["key"],
                unique: true,
            }]
        }
    }

    #[tokio::test]
    async fn sql_store_rejects_index_without_migration() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(IndexOnly));

        let store = Store::connect("sqlite::memory:", "test").await.unwrap();
        let err = registry.prepare_store(&store).await.unwrap_err();
        assert!(err.to_string().contains("orphans_key_unique"));
    }
}
