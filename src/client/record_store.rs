//! Typed access to `ClusterUpgrade` records.
//!
//! The gate only needs find / create / mark-upgraded; keeping them behind a
//! trait lets tests swap in a store without an API server.

use async_trait::async_trait;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::controller::error::{Error, Result};
use crate::crd::{ClusterUpgrade, record_name};

/// Upgrade Record Store Adapter.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UpgradeRecordStore: Send + Sync {
    /// Records matching the (cluster, namespace, version) triple.
    ///
    /// Zero or one expected; the list shape mirrors the field-selector query.
    async fn find(
        &self,
        cluster_name: &str,
        namespace: &str,
        version: &str,
    ) -> Result<Vec<ClusterUpgrade>>;

    /// Create a record. Fails with `AlreadyExists` if the name is taken.
    async fn create(&self, record: &ClusterUpgrade) -> Result<ClusterUpgrade>;

    /// Set `spec.upgraded = true` on a previously found record.
    async fn mark_upgraded(&self, record: &ClusterUpgrade) -> Result<()>;
}

/// Merge patch body flipping the completion flag.
pub fn upgraded_patch() -> serde_json::Value {
    serde_json::json!({
        "spec": {
            "upgraded": true
        }
    })
}

/// Field selector addressing a record by its derived name.
pub fn record_field_selector(cluster_name: &str, version: &str) -> String {
    format!("metadata.name={}", record_name(cluster_name, version))
}

/// Store backed by the Kubernetes API server.
pub struct KubeRecordStore {
    client: Client,
}

impl KubeRecordStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<ClusterUpgrade> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl UpgradeRecordStore for KubeRecordStore {
    async fn find(
        &self,
        cluster_name: &str,
        namespace: &str,
        version: &str,
    ) -> Result<Vec<ClusterUpgrade>> {
        let selector = record_field_selector(cluster_name, version);
        let list = self
            .api(namespace)
            .list(&ListParams::default().fields(&selector))
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        debug!(
            namespace = %namespace,
            selector = %selector,
            count = list.items.len(),
            "Listed ClusterUpgrade records"
        );

        Ok(list.items)
    }

    async fn create(&self, record: &ClusterUpgrade) -> Result<ClusterUpgrade> {
        let name = record.name_any();
        let namespace = record
            .namespace()
            .ok_or_else(|| Error::InvalidRequest(format!("record {} has no namespace", name)))?;

        let created = self
            .api(&namespace)
            .create(&PostParams::default(), record)
            .await
            .map_err(|e| Error::from_store(e, &name))?;

        info!(
            record = %name,
            namespace = %namespace,
            nodes = ?created.spec.nodes_ip,
            "Created ClusterUpgrade record"
        );

        Ok(created)
    }

    async fn mark_upgraded(&self, record: &ClusterUpgrade) -> Result<()> {
        let name = record.name_any();
        let namespace = record
            .namespace()
            .ok_or_else(|| Error::InvalidRequest(format!("record {} has no namespace", name)))?;

        let patch = upgraded_patch();
        self.api(&namespace)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_store(e, &name))?;

        info!(record = %name, namespace = %namespace, "Marked ClusterUpgrade as upgraded");
        Ok(())
    }
}
