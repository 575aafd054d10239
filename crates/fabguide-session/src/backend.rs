use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use fabguide_catalog::{Catalog, CatalogStore, InMemoryCatalog, RecordSink};
use fabguide_catalog_sqlite::SqliteCatalog;
use fabguide_notify::{Notifier, NotifyingSink};

use crate::{load_fixture, BackendKind, CatalogFixture, Config, SeedSummary};

/// One catalog backend seen through its three roles.
#[derive(Clone)]
pub struct Backend {
    pub catalog: Arc<dyn Catalog>,
    pub sink: Arc<dyn RecordSink>,
    pub store: Arc<dyn CatalogStore>,
}

impl Backend {
    pub fn from_shared<T>(inner: Arc<T>) -> Self
    where
        T: Catalog + RecordSink + CatalogStore + 'static,
    {
        Self { catalog: inner.clone(), sink: inner.clone(), store: inner }
    }

    /// Open the backend named in `cfg`. The memory backend loads the configured fixture.
    pub fn open(cfg: &Config, root: &Path) -> Result<Self> {
        match cfg.backend()? {
            BackendKind::Sqlite => Ok(Self::from_shared(Arc::new(SqliteCatalog::open(&cfg.db_path(root))?))),
            BackendKind::Memory => {
                let catalog = Arc::new(InMemoryCatalog::new());
                let backend = Self::from_shared(catalog);
                if let Some(path) = cfg.fixture_path(root) {
                    backend.seed(&load_fixture(&path)?)?;
                }
                Ok(backend)
            }
        }
    }

    pub fn seed(&self, fixture: &CatalogFixture) -> Result<SeedSummary> {
        fixture.seed(self.store.as_ref(), self.sink.as_ref())
    }

    /// Route emitted records through `notifier` once the store accepted them.
    pub fn with_notifier<N: Notifier + 'static>(self, notifier: N) -> Self {
        let sink: Arc<dyn RecordSink> = Arc::new(NotifyingSink::new(self.sink, notifier));
        Self { sink, ..self }
    }
}
