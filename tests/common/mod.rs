//! Shared fixtures for the integration suites: a contact-card key set
//! spanning every stock value type, schema setup against SQLite, and
//! provider wrappers for fault injection and I/O accounting.

#![allow(dead_code)]

use attrstore::backend::sqlite::SqliteProvider;
use attrstore::backend::{ConnectionProvider, SqlConnection};
use attrstore::codec::{InstantSecondsCodec, JsonCodec, LongCodec, TextCodec};
use attrstore::{
    AttrError, AttrValues, AttributeKey, MinimalLayout, PersistentLayout, Result, Row, SqlValue,
    TableLayout, TypeHandlerRegistry, TypeHandlerRegistryBuilder, Value, ValueType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub const PREFIX: &str = "contact";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKey {
    FirstName,
    Tags,
    Age,
    SignedUpAt,
    Profile,
}

impl AttributeKey for ContactKey {
    fn type_tag(&self) -> i32 {
        match self {
            ContactKey::FirstName => 1,
            ContactKey::Tags => 2,
            ContactKey::Age => 3,
            ContactKey::SignedUpAt => 4,
            ContactKey::Profile => 5,
        }
    }

    fn value_type(&self) -> ValueType {
        match self {
            ContactKey::FirstName | ContactKey::Tags => ValueType::Text,
            ContactKey::Age => ValueType::Long,
            ContactKey::SignedUpAt => ValueType::Instant,
            ContactKey::Profile => ValueType::Json,
        }
    }

    fn all() -> &'static [Self] {
        &[
            ContactKey::FirstName,
            ContactKey::Tags,
            ContactKey::Age,
            ContactKey::SignedUpAt,
            ContactKey::Profile,
        ]
    }
}

pub fn temp_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("attrs.db");
    (dir, path)
}

fn registry_with(layout: Arc<dyn TableLayout>) -> Arc<TypeHandlerRegistry> {
    Arc::new(
        TypeHandlerRegistryBuilder::new()
            .with_layout(ValueType::Text, layout.clone(), Arc::new(TextCodec))
            .with_layout(ValueType::Long, layout.clone(), Arc::new(LongCodec))
            .with_layout(ValueType::Instant, layout.clone(), Arc::new(InstantSecondsCodec))
            .with_layout(ValueType::Json, layout, Arc::new(JsonCodec))
            .build(),
    )
}

pub fn minimal_registry() -> Arc<TypeHandlerRegistry> {
    registry_with(Arc::new(MinimalLayout::new()))
}

pub fn persistent_registry() -> Arc<TypeHandlerRegistry> {
    registry_with(Arc::new(PersistentLayout::new()))
}

const TABLE_SUFFIXES: [(&str, &str); 4] = [
    ("String", "TEXT"),
    ("Long", "INTEGER"),
    ("Instant", "INTEGER"),
    ("Json", "TEXT"),
];

pub async fn setup_minimal_schema(provider: &SqliteProvider) {
    let mut conn = provider.connection().await.unwrap();
    for (suffix, column_type) in TABLE_SUFFIXES {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {PREFIX}{suffix} \
                 (linkId INTEGER NOT NULL, typeId INTEGER NOT NULL, value {column_type})"
            ),
            &[],
        )
        .await
        .unwrap();
    }
}

pub async fn setup_persistent_schema(provider: &SqliteProvider) {
    let mut conn = provider.connection().await.unwrap();
    for (suffix, column_type) in TABLE_SUFFIXES {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {PREFIX}{suffix} \
                 (linkId INTEGER NOT NULL, typeId INTEGER NOT NULL, \
                  active INTEGER NOT NULL, createdAt INTEGER NOT NULL, value {column_type})"
            ),
            &[],
        )
        .await
        .unwrap();
    }
}

pub fn attrs(pairs: Vec<(ContactKey, Vec<Value>)>) -> AttrValues<ContactKey> {
    pairs.into_iter().collect()
}

pub fn whole_second_instant() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Counts connection acquisitions, for asserting that an operation performed
/// zero backend I/O.
pub struct CountingProvider {
    inner: SqliteProvider,
    pub acquired: Arc<AtomicUsize>,
}

impl CountingProvider {
    pub fn new(inner: SqliteProvider) -> Self {
        Self {
            inner,
            acquired: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn acquisitions(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionProvider for CountingProvider {
    async fn connection(&self) -> Result<Box<dyn SqlConnection>> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.inner.connection().await
    }
}

/// Fails every statement touching a given table, leaving the rest of the
/// backend healthy.
pub struct FailingProvider {
    inner: SqliteProvider,
    fail_table: String,
}

impl FailingProvider {
    pub fn new(inner: SqliteProvider, fail_table: impl Into<String>) -> Self {
        Self {
            inner,
            fail_table: fail_table.into(),
        }
    }
}

#[async_trait]
impl ConnectionProvider for FailingProvider {
    async fn connection(&self) -> Result<Box<dyn SqlConnection>> {
        let inner = self.inner.connection().await?;
        Ok(Box::new(FailingConnection {
            inner,
            fail_table: self.fail_table.clone(),
        }))
    }
}

struct FailingConnection {
    inner: Box<dyn SqlConnection>,
    fail_table: String,
}

impl FailingConnection {
    fn check(&self, sql: &str) -> Result<()> {
        if sql.contains(&self.fail_table) {
            return Err(AttrError::backend_msg(format!(
                "injected failure for table {}",
                self.fail_table
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SqlConnection for FailingConnection {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.check(sql)?;
        self.inner.query(sql, params).await
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.check(sql)?;
        self.inner.execute(sql, params).await
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}
