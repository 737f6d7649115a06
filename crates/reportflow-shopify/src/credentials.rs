//! Tenant credential lookup.
//!
//! Background execution cannot go through interactive auth middleware, so the
//! fetcher resolves tokens through this seam instead. The production
//! implementation reads the offline session persisted at install time.

use async_trait::async_trait;
use std::sync::Arc;

use reportflow_core::error::{ReportFlowError, Result};
use reportflow_store::Store;

/// Resolves an Admin API access token for a tenant.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self, shop: &str) -> Result<String>;
}

/// Session-table-backed provider.
pub struct StoreCredentials {
    store: Arc<Store>,
}

impl StoreCredentials {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialProvider for StoreCredentials {
    async fn access_token(&self, shop: &str) -> Result<String> {
        self.store.access_token(shop)?.ok_or_else(|| {
            ReportFlowError::Auth(format!("no API session found for shop: {shop}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_lookup() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store.put_session("demo.myshopify.com", "shpat_test").unwrap();

        let creds = StoreCredentials::new(store);
        assert_eq!(
            creds.access_token("demo.myshopify.com").await.unwrap(),
            "shpat_test"
        );

        let err = creds.access_token("other.myshopify.com").await.unwrap_err();
        assert!(matches!(err, ReportFlowError::Auth(_)));
    }
}
