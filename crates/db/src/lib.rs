//! Storage backends for the Shelf repositories.
//!
//! [`Store`] is picked from the configured endpoint: `memory://` gives the
//! in-process document store below, `sqlite:` gives [`SqlStore`].
//!
//! In the document store, collections hold JSON documents in insertion order.
//! Queries are expressed with [`Filter`] and [`FindOptions`]; unique indexes
//! declared through [`IndexSpec`] are enforced under the same write lock as the
//! mutation, so a check-then-insert race can never produce two documents with
//! the same key.

mod error;
pub mod filter;
pub mod sql;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

pub use error::DbError;
pub use filter::{Filter, FindOptions, SortDirection};
pub use sql::{SqlStore, SQLITE_SCHEME};

/// A stored JSON object.
pub type Document = serde_json::Map<String, Value>;

/// Endpoint scheme for the in-process store.
pub const MEMORY_SCHEME: &str = "memory://";

/// Index declaration contributed by a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub collection: &'static str,
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub unique: bool,
}

#[derive(Debug, Default)]
struct CollectionState {
    docs: Vec<Document>,
    indexes: Vec<IndexSpec>,
}

impl CollectionState {
    /// Returns the first unique index `candidate` would violate, ignoring the
    /// document at position `skip`.
    fn violated_index(&self, candidate: &Document, skip: Option<usize>) -> Option<&IndexSpec> {
        self.indexes.iter().filter(|index| index.unique).find(|index| {
            let Some(key) = index_key(index, candidate) else {
                return false;
            };
            self.docs
                .iter()
                .enumerate()
                .filter(|(position, _)| Some(*position) != skip)
                .any(|(_, doc)| index_key(index, doc).as_ref() == Some(&key))
        })
    }
}

/// Values of the indexed fields, or `None` when any of them is absent.
fn index_key<'a>(index: &IndexSpec, doc: &'a Document) -> Option<Vec<&'a Value>> {
    index.fields.iter().map(|field| doc.get(*field)).collect()
}

/// The backend the repositories run against.
#[derive(Debug, Clone)]
pub enum Store {
    Memory(Database),
    Sql(SqlStore),
}

impl Store {
    /// Open the backend named by `endpoint`.
    pub async fn connect(endpoint: &str, name: &str) -> Result<Self, DbError> {
        if endpoint.starts_with(MEMORY_SCHEME) {
            tracing::info!(target: "shelf-db", endpoint, database = name, "database opened");
            Ok(Store::Memory(Database::in_memory(name)))
        } else if endpoint.starts_with(SQLITE_SCHEME) {
            Ok(Store::Sql(SqlStore::connect(endpoint).await?))
        } else {
            Err(DbError::UnsupportedEndpoint(endpoint.to_string()))
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sql(_) => "sqlite",
        }
    }

    /// Close pooled connections. The in-process store has none.
    pub async fn close(&self) {
        if let Store::Sql(sql) = self {
            sql.close().await;
        }
    }
}

/// Handle to an in-process database. Cloning is cheap and every clone sees
/// the same data.
#[derive(Debug, Clone)]
pub struct Database {
    name: Arc<str>,
    collections: Arc<RwLock<HashMap<String, CollectionState>>>,
}

impl Database {
    /// Create an empty in-process database.
    pub fn in_memory(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self, name: &str) -> Collection {
        Collection {
            db: self.clone(),
            name: name.to_string(),
        }
    }

    /// Register an index. Re-registering an index with the same name is a no-op.
    pub async fn ensure_index(&self, spec: IndexSpec) -> Result<(), DbError> {
        let mut collections = self.collections.write().await;
        let state = collections.entry(spec.collection.to_string()).or_default();

        if state.indexes.iter().any(|existing| existing.name == spec.name) {
            return Ok(());
        }

        if spec.unique {
            let mut seen = Vec::new();
            for doc in &state.docs {
                if let Some(key) = index_key(&spec, doc) {
                    if seen.contains(&key) {
                        return Err(DbError::DuplicateKey {
                            collection: spec.collection.to_string(),
                            index: spec.name.to_string(),
                        });
                    }
                    seen.push(key);
                }
            }
        }

        tracing::debug!(
            target: "shelf-db",
            collection = spec.collection,
            index = spec.name,
            unique = spec.unique,
            "index registered"
        );
        state.indexes.push(spec);
        Ok(())
    }
}

/// A named collection inside a [`Database`].
#[derive(Debug, Clone)]
pub struct Collection {
    db: Database,
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn insert_one(&self, doc: Document) -> Result<(), DbError> {
        let mut collections = self.db.collections.write().await;
        let state = collections.entry(self.name.clone()).or_default();

        if let Some(index) = state.violated_index(&doc, None) {
            return Err(DbError::DuplicateKey {
                collection: self.name.clone(),
                index: index.name.to_string(),
            });
        }

        state.docs.push(doc);
        Ok(())
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, DbError> {
        let collections = self.db.collections.read().await;
        Ok(collections
            .get(&self.name)
            .and_then(|state| state.docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    pub async fn find(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, DbError> {
        let collections = self.db.collections.read().await;
        let Some(state) = collections.get(&self.name) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Document> =
            state.docs.iter().filter(|doc| filter.matches(doc)).collect();
        options.sort_documents(&mut matched);

        Ok(options.window(matched).into_iter().cloned().collect())
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, DbError> {
        let collections = self.db.collections.read().await;
        Ok(collections.get(&self.name).map_or(0, |state| {
            state.docs.iter().filter(|doc| filter.matches(doc)).count() as u64
        }))
    }

    /// Apply `changes` to the first matching document (`$set` semantics) and
    /// return the updated document.
    pub async fn update_one(
        &self,
        filter: &Filter,
        changes: Document,
    ) -> Result<Option<Document>, DbError> {
        let mut collections = self.db.collections.write().await;
        let Some(state) = collections.get_mut(&self.name) else {
            return Ok(None);
        };
        let Some(position) = state.docs.iter().position(|doc| filter.matches(doc)) else {
            return Ok(None);
        };

        let mut updated = state.docs[position].clone();
        updated.extend(changes);

        if let Some(index) = state.violated_index(&updated, Some(position)) {
            return Err(DbError::DuplicateKey {
                collection: self.name.clone(),
                index: index.name.to_string(),
            });
        }

        state.docs[position] = updated.clone();
        Ok(Some(updated))
    }

    /// Remove the first matching document and return it.
    pub async fn delete_one(&self, filter: &Filter) -> Result<Option<Document>, DbError> {
        let mut collections = self.db.collections.write().await;
        let Some(state) = collections.get_mut(&self.name) else {
            return Ok(None);
        };

        Ok(state
            .docs
            .iter()
            .position(|doc| filter.matches(doc))
            .map(|position| state.docs.remove(position)))
    }
}

/// Serialize a value into a document. Fails for values that are not objects.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, DbError> {
    match serde_json::to_value(value)? {
        Value::Object(doc) => Ok(doc),
        _ => Err(DbError::NotADocument),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, DbError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
