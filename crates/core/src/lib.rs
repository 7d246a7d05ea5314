use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use thiserror::Error;

mod data;
mod lock;
mod schema;

pub use data::ResourceData;
pub use lock::{LockTable, NamedLockGuard};
pub use schema::{Attribute, AttributeType, Schema};

/// Opaque identity the remote side assigned to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("invalid resource id {id:?}: {reason}")]
    InvalidIdentifier { id: String, reason: String },

    #[error("error {operation} {kind} {name:?} (Resource Group {resource_group:?}): {source}")]
    Remote {
        operation: &'static str,
        kind: &'static str,
        name: String,
        resource_group: String,
        #[source]
        source: BoxError,
    },

    #[error("missing required attribute {0:?}")]
    MissingAttribute(String),

    #[error("invalid attribute {name:?}: {reason}")]
    InvalidAttribute { name: String, reason: String },

    #[error("cannot import non-existent remote object {0:?}")]
    ImportNotFound(String),
}

impl ProviderError {
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        ProviderError::InvalidIdentifier { id: id.into(), reason: reason.into() }
    }
}

/// Lifecycle entry points a host drives for one resource type.
///
/// Every call works on the host's record for a single instance. `read` signals
/// that the remote object is gone by clearing the record's id rather than by
/// returning an error.
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> Schema;
    async fn create(&self, d: &mut ResourceData) -> Result<(), ProviderError>;
    async fn read(&self, d: &mut ResourceData) -> Result<(), ProviderError>;
    async fn update(&self, d: &mut ResourceData) -> Result<(), ProviderError>;
    async fn delete(&self, d: &mut ResourceData) -> Result<(), ProviderError>;

    /// Passthrough import: seed a record with `id` and refresh it.
    async fn import(&self, id: &str) -> Result<ResourceData, ProviderError> {
        let mut d = ResourceData::with_id(id);
        self.read(&mut d).await?;
        if d.id().is_none() {
            return Err(ProviderError::ImportNotFound(id.to_string()));
        }
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixed { exists: AtomicBool }

    #[async_trait]
    impl Resource for Fixed {
        fn type_name(&self) -> &'static str { "test_fixed" }
        fn schema(&self) -> Schema { Schema::new() }
        async fn create(&self, _d: &mut ResourceData) -> Result<(), ProviderError> { Ok(()) }
        async fn read(&self, d: &mut ResourceData) -> Result<(), ProviderError> {
            if self.exists.load(Ordering::SeqCst) {
                d.set("name", "fixed")?;
            } else {
                d.clear_id();
            }
            Ok(())
        }
        async fn update(&self, _d: &mut ResourceData) -> Result<(), ProviderError> { Ok(()) }
        async fn delete(&self, _d: &mut ResourceData) -> Result<(), ProviderError> { Ok(()) }
    }

    #[tokio::test]
    async fn import_reads_existing_object() {
        let r = Fixed { exists: AtomicBool::new(true) };
        let d = r.import("/some/id").await.unwrap();
        assert_eq!(d.id().map(|i| i.as_str()), Some("/some/id"));
        assert_eq!(d.get_str("name"), Some("fixed"));
    }

    #[tokio::test]
    async fn import_of_missing_object_fails() {
        let r = Fixed { exists: AtomicBool::new(false) };
        let err = r.import("/gone").await.unwrap_err();
        assert!(matches!(err, ProviderError::ImportNotFound(id) if id == "/gone"));
    }

    #[test]
    fn remote_error_message_carries_context() {
        let err = ProviderError::Remote {
            operation: "creating",
            kind: "Logic App Workflow",
            name: "wf1".into(),
            resource_group: "rg1".into(),
            source: "boom".into(),
        };
        assert_eq!(
            err.to_string(),
            "error creating Logic App Workflow \"wf1\" (Resource Group \"rg1\"): boom"
        );
    }
}
