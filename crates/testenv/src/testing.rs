//! Recording mocks for the installer and cluster-API collaborators.
//!
//! Used by tests across the workspace (stage tests, scenario tests,
//! runner integration tests); not part of the production wiring.
//!
//! Both mocks keep a journal of invocations and can be scripted per
//! operation key:
//! - [`MockInstaller::fail_on`] makes a mutating operation fail.
//! - [`MockClusterApi::delay`] makes a probe report not-ready for the
//!   first `n` invocations.
//! - [`MockClusterApi::fault`] makes a probe return a [`ProbeError`].

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anchorage_core::envstate::{ClusterProvider, ClusterProxy};
use anchorage_core::error::ProbeError;

use crate::error::TestEnvError;
use crate::installer::{ChartRequest, ClusterApi, ClusterRequest, Installer};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// Scriptable [`Installer`] double.
#[derive(Debug, Default)]
pub struct MockInstaller {
    journal: Mutex<Vec<String>>,
    failures: Mutex<HashSet<String>>,
}

impl MockInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the operation recorded under `key` fail.
    ///
    /// Keys match journal entries, e.g. `"install_chart:rancher"` or
    /// `"create_cluster:anchorage-e2e"`.
    pub fn fail_on(&self, key: impl Into<String>) {
        lock(&self.failures).insert(key.into());
    }

    /// Everything invoked so far, in order.
    pub fn journal(&self) -> Vec<String> {
        lock(&self.journal).clone()
    }

    /// Number of journal entries starting with `prefix`.
    pub fn count_of(&self, prefix: &str) -> usize {
        lock(&self.journal)
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    fn record(&self, entry: String) -> Result<(), TestEnvError> {
        let fail = lock(&self.failures).contains(&entry);
        lock(&self.journal).push(entry.clone());
        if fail {
            return Err(TestEnvError::Installer(format!("scripted failure: {entry}")));
        }
        Ok(())
    }
}

impl Installer for MockInstaller {
    async fn add_repository(&self, name: &str, _url: &str) -> Result<(), TestEnvError> {
        self.record(format!("add_repository:{name}"))
    }

    async fn install_chart(&self, request: &ChartRequest) -> Result<(), TestEnvError> {
        self.record(format!("install_chart:{}", request.release_name))
    }

    async fn uninstall_release(
        &self,
        release_name: &str,
        _namespace: &str,
    ) -> Result<(), TestEnvError> {
        self.record(format!("uninstall_release:{release_name}"))
    }

    async fn create_cluster(
        &self,
        request: &ClusterRequest,
    ) -> Result<ClusterProxy, TestEnvError> {
        self.record(format!("create_cluster:{}", request.name))?;
        Ok(ClusterProxy {
            name: request.name.clone(),
            kubeconfig_path: format!("{}/{}.kubeconfig", request.artifacts_dir, request.name),
            provider: request.provider.clone(),
        })
    }

    async fn delete_cluster(&self, proxy: &ClusterProxy) -> Result<(), TestEnvError> {
        self.record(format!("delete_cluster:{}", proxy.name))
    }

    async fn apply_manifest(&self, manifest: &str) -> Result<(), TestEnvError> {
        // First line is enough to tell bundled manifests apart.
        let head = manifest.lines().next().unwrap_or_default();
        self.record(format!("apply_manifest:{head}"))
    }

    async fn delete_manifest(&self, manifest: &str) -> Result<(), TestEnvError> {
        let head = manifest.lines().next().unwrap_or_default();
        self.record(format!("delete_manifest:{head}"))
    }
}

/// Default address `service_address` resolves to.
pub const DEFAULT_SERVICE_ADDRESS: &str = "172.18.0.2:30080";

/// Scriptable [`ClusterApi`] double.
///
/// Probe keys:
/// - `"deployment:<ns>/<name>"`
/// - `"gone:<ns>/<name>"`
/// - `"service:<ns>/<name>"`
/// - `"imported:<cluster>"`
/// - `"cluster-gone:<cluster>"`
#[derive(Debug, Default)]
pub struct MockClusterApi {
    journal: Mutex<Vec<String>>,
    not_ready_remaining: Mutex<HashMap<String, u32>>,
    faults: Mutex<HashSet<String>>,
    addresses: Mutex<HashMap<String, String>>,
}

impl MockClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report not-ready for the first `n` probes of `key`.
    pub fn delay(&self, key: impl Into<String>, n: u32) {
        lock(&self.not_ready_remaining).insert(key.into(), n);
    }

    /// Return a probe error for `key`.
    pub fn fault(&self, key: impl Into<String>) {
        lock(&self.faults).insert(key.into());
    }

    /// Override the address a service resolves to.
    pub fn set_service_address(&self, key: impl Into<String>, address: impl Into<String>) {
        lock(&self.addresses).insert(key.into(), address.into());
    }

    /// Mutating API calls recorded so far, in order.
    pub fn journal(&self) -> Vec<String> {
        lock(&self.journal).clone()
    }

    /// Number of journal entries starting with `prefix`.
    pub fn count_of(&self, prefix: &str) -> usize {
        lock(&self.journal)
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    fn probe(&self, key: &str) -> Result<bool, ProbeError> {
        if lock(&self.faults).contains(key) {
            return Err(ProbeError::new(key, "scripted probe fault"));
        }
        let mut remaining = lock(&self.not_ready_remaining);
        match remaining.get_mut(key) {
            Some(0) | None => Ok(true),
            Some(n) => {
                *n -= 1;
                Ok(false)
            }
        }
    }
}

impl ClusterApi for MockClusterApi {
    async fn deployment_ready(&self, namespace: &str, name: &str) -> Result<bool, ProbeError> {
        self.probe(&format!("deployment:{namespace}/{name}"))
    }

    async fn deployment_gone(&self, namespace: &str, name: &str) -> Result<bool, ProbeError> {
        self.probe(&format!("gone:{namespace}/{name}"))
    }

    async fn service_address(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<String>, ProbeError> {
        let key = format!("service:{namespace}/{name}");
        if !self.probe(&key)? {
            return Ok(None);
        }
        Ok(Some(
            lock(&self.addresses)
                .get(&key)
                .cloned()
                .unwrap_or_else(|| DEFAULT_SERVICE_ADDRESS.to_owned()),
        ))
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool, ProbeError> {
        self.probe(&format!("namespace:{namespace}"))
    }

    async fn cluster_imported(&self, cluster_name: &str) -> Result<bool, ProbeError> {
        self.probe(&format!("imported:{cluster_name}"))
    }

    async fn cluster_gone(&self, cluster_name: &str) -> Result<bool, ProbeError> {
        self.probe(&format!("cluster-gone:{cluster_name}"))
    }

    async fn create_namespace(&self, namespace: &str) -> Result<(), TestEnvError> {
        lock(&self.journal).push(format!("create_namespace:{namespace}"));
        Ok(())
    }

    async fn label_namespace(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), TestEnvError> {
        lock(&self.journal).push(format!("label_namespace:{namespace}:{key}={value}"));
        Ok(())
    }

    async fn create_secret(
        &self,
        namespace: &str,
        name: &str,
        _data: &HashMap<String, String>,
    ) -> Result<(), TestEnvError> {
        lock(&self.journal).push(format!("create_secret:{namespace}/{name}"));
        Ok(())
    }
}

/// A cluster proxy for tests that start mid-pipeline.
pub fn test_proxy(name: &str) -> ClusterProxy {
    ClusterProxy {
        name: name.to_owned(),
        kubeconfig_path: format!("/tmp/{name}.kubeconfig"),
        provider: ClusterProvider::Kind,
    }
}
