use async_trait::async_trait;
use serde_json::Value;

use shelf_db::{from_document, to_document, Collection, Database, DbError, Document, Filter, FindOptions};

use super::{BookRepository, COLLECTION};
use crate::modules::books::models::{Book, BookChanges};
use crate::modules::books::query::BookQuery;

pub struct MemoryBookRepository {
    books: Collection,
}

impl MemoryBookRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            books: db.collection(COLLECTION),
        }
    }
}

fn change_set(changes: &BookChanges) -> Document {
    let mut doc: Document = changes
        .fields()
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::from(v))))
        .collect();
    doc.insert(
        "updatedAt".into(),
        Value::String(changes.updated_at.to_rfc3339()),
    );
    doc
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn insert(&self, book: &Book) -> Result<(), DbError> {
        self.books.insert_one(to_document(book)?).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Book>, DbError> {
        self.books
            .find_one(&Filter::eq("id", id))
            .await?
            .map(from_document)
            .transpose()
    }

    async fn find(&self, query: &BookQuery, skip: u64, limit: u64) -> Result<Vec<Book>, DbError> {
        let options = FindOptions::new().skip(skip).limit(limit);
        self.books
            .find(&query.to_filter()?, &options)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    async fn count(&self, query: &BookQuery) -> Result<u64, DbError> {
        self.books.count(&query.to_filter()?).await
    }

    async fn update(&self, id: &str, changes: &BookChanges) -> Result<Option<Book>, DbError> {
        self.books
            .update_one(&Filter::eq("id", id), change_set(changes))
            .await?
            .map(from_document)
            .transpose()
    }
}
