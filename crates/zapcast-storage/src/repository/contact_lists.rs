//! Contact list repository

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use zapcast_common::types::ContactListId;
use zapcast_common::{Error, Result};

use crate::models::{ContactList, CreateContactList};

/// Contact list repository
#[async_trait]
pub trait ContactListRepository: Send + Sync {
    /// Create a new contact list
    async fn create(&self, input: CreateContactList) -> Result<ContactList>;

    /// Get a contact list by ID
    async fn get(&self, id: ContactListId) -> Result<Option<ContactList>>;

    /// List contact lists, newest first
    async fn list(&self, limit: i64) -> Result<Vec<ContactList>>;
}

/// PostgreSQL contact list repository implementation
#[derive(Clone)]
pub struct DbContactListRepository {
    pool: PgPool,
}

impl DbContactListRepository {
    /// Create a new repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactListRepository for DbContactListRepository {
    async fn create(&self, input: CreateContactList) -> Result<ContactList> {
        let id = Uuid::new_v4();
        let contacts = serde_json::to_value(&input.contacts)
            .map_err(|e| Error::Internal(format!("Failed to encode contacts: {}", e)))?;

        sqlx::query_as::<_, ContactList>(
            r#"
            INSERT INTO contact_lists (id, name, contacts)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&contacts)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    async fn get(&self, id: ContactListId) -> Result<Option<ContactList>> {
        sqlx::query_as::<_, ContactList>("SELECT * FROM contact_lists WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))
    }

    async fn list(&self, limit: i64) -> Result<Vec<ContactList>> {
        sqlx::query_as::<_, ContactList>(
            "SELECT * FROM contact_lists ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }
}
