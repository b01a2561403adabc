//! Command-backed installer and cluster-API collaborators.
//!
//! Production implementations of the `testenv` traits: charts go
//! through `helm`, the bootstrap cluster through `kind`, manifests and
//! probes through `kubectl`. Probes map a NotFound answer to
//! "not ready yet" and everything else unexpected to a `ProbeError`,
//! so the readiness waiter keeps polling through eventual consistency
//! but stops on real faults.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anchorage_core::envstate::{ClusterProvider, ClusterProxy};
use anchorage_core::error::ProbeError;
use anchorage_testenv::installer::{ChartRequest, ClusterApi, ClusterRequest, Installer};
use anchorage_testenv::TestEnvError;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Run a command to completion, returning stdout.
async fn run(program: &str, args: &[&str]) -> Result<String, TestEnvError> {
    debug!(%program, ?args, "exec");
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| TestEnvError::Installer(format!("failed to spawn {program}: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TestEnvError::Installer(format!(
            "{program} {args:?} failed: {}",
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command with `input` piped to stdin.
async fn run_with_stdin(
    program: &str,
    args: &[&str],
    input: &str,
) -> Result<String, TestEnvError> {
    debug!(%program, ?args, "exec (stdin)");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| TestEnvError::Installer(format!("failed to spawn {program}: {e}")))?;
    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(input.as_bytes())
            .await
            .map_err(|e| TestEnvError::Installer(format!("failed to write {program} stdin: {e}")))?;
    }
    let output = child
        .wait_with_output()
        .await
        .map_err(|e| TestEnvError::Installer(format!("{program} did not exit: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TestEnvError::Installer(format!(
            "{program} {args:?} failed: {}",
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Probe variant of [`run`]: a NotFound answer is `Ok(None)`, any
/// other failure a [`ProbeError`].
async fn probe(component: &str, args: &[&str]) -> Result<Option<String>, ProbeError> {
    let output = Command::new("kubectl")
        .args(args)
        .output()
        .await
        .map_err(|e| ProbeError::new(component, format!("failed to spawn kubectl: {e}")))?;
    if output.status.success() {
        return Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()));
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("NotFound") || stderr.contains("not found") {
        return Ok(None);
    }
    Err(ProbeError::new(component, stderr.trim().to_string()))
}

/// Installer backed by `helm`, `kind`, and `kubectl`.
pub struct CommandInstaller {
    kubeconfig: PathBuf,
}

impl CommandInstaller {
    pub fn new(kubeconfig: impl Into<PathBuf>) -> Self {
        Self {
            kubeconfig: kubeconfig.into(),
        }
    }

    fn kubeconfig_arg(&self) -> String {
        format!("--kubeconfig={}", self.kubeconfig.display())
    }
}

impl Installer for CommandInstaller {
    async fn add_repository(&self, name: &str, url: &str) -> Result<(), TestEnvError> {
        run("helm", &["repo", "add", name, url, "--force-update"]).await?;
        run("helm", &["repo", "update", name]).await?;
        Ok(())
    }

    async fn install_chart(&self, request: &ChartRequest) -> Result<(), TestEnvError> {
        let kubeconfig = self.kubeconfig_arg();
        let chart_ref = format!("{}/{}", request.repo_name, request.chart);
        let mut args: Vec<&str> = vec![
            "upgrade",
            "--install",
            &request.release_name,
            &chart_ref,
            "--namespace",
            &request.namespace,
            "--create-namespace",
            "--version",
            &request.version,
            &kubeconfig,
        ];
        let sets: Vec<String> = request
            .values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        for set in &sets {
            args.push("--set");
            args.push(set);
        }
        run("helm", &args).await?;
        Ok(())
    }

    async fn uninstall_release(
        &self,
        release_name: &str,
        namespace: &str,
    ) -> Result<(), TestEnvError> {
        let kubeconfig = self.kubeconfig_arg();
        run(
            "helm",
            &[
                "uninstall",
                release_name,
                "--namespace",
                namespace,
                "--ignore-not-found",
                &kubeconfig,
            ],
        )
        .await?;
        Ok(())
    }

    async fn create_cluster(&self, request: &ClusterRequest) -> Result<ClusterProxy, TestEnvError> {
        if !matches!(request.provider, ClusterProvider::Kind) {
            return Err(TestEnvError::Provider(format!(
                "provider '{}' has no command-backed provisioner, use an existing cluster",
                request.provider
            )));
        }
        let kubeconfig = self.kubeconfig.display().to_string();
        if request.use_existing {
            run(
                "kind",
                &[
                    "export",
                    "kubeconfig",
                    "--name",
                    &request.name,
                    "--kubeconfig",
                    &kubeconfig,
                ],
            )
            .await?;
        } else {
            if let Some(parent) = self.kubeconfig.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    TestEnvError::Installer(format!("failed to create artifacts dir: {e}"))
                })?;
            }
            let image = format!("kindest/node:{}", request.kubernetes_version);
            run(
                "kind",
                &[
                    "create",
                    "cluster",
                    "--name",
                    &request.name,
                    "--image",
                    &image,
                    "--kubeconfig",
                    &kubeconfig,
                ],
            )
            .await?;
        }
        Ok(ClusterProxy {
            name: request.name.clone(),
            kubeconfig_path: kubeconfig,
            provider: request.provider.clone(),
        })
    }

    async fn delete_cluster(&self, proxy: &ClusterProxy) -> Result<(), TestEnvError> {
        run("kind", &["delete", "cluster", "--name", &proxy.name]).await?;
        Ok(())
    }

    async fn apply_manifest(&self, manifest: &str) -> Result<(), TestEnvError> {
        let kubeconfig = self.kubeconfig_arg();
        run_with_stdin("kubectl", &["apply", "-f", "-", &kubeconfig], manifest).await?;
        Ok(())
    }

    async fn delete_manifest(&self, manifest: &str) -> Result<(), TestEnvError> {
        let kubeconfig = self.kubeconfig_arg();
        run_with_stdin(
            "kubectl",
            &[
                "delete",
                "-f",
                "-",
                "--ignore-not-found",
                "--wait=false",
                &kubeconfig,
            ],
            manifest,
        )
        .await?;
        Ok(())
    }
}

/// Cluster API backed by `kubectl` against the bootstrap cluster.
pub struct KubectlApi {
    kubeconfig: PathBuf,
    /// Namespace the platform tracks imported clusters in.
    import_namespace: String,
}

impl KubectlApi {
    pub fn new(kubeconfig: impl Into<PathBuf>, import_namespace: impl Into<String>) -> Self {
        Self {
            kubeconfig: kubeconfig.into(),
            import_namespace: import_namespace.into(),
        }
    }

    fn kubeconfig_arg(&self) -> String {
        format!("--kubeconfig={}", self.kubeconfig.display())
    }
}

impl ClusterApi for KubectlApi {
    async fn deployment_ready(&self, namespace: &str, name: &str) -> Result<bool, ProbeError> {
        let kubeconfig = self.kubeconfig_arg();
        let out = probe(
            name,
            &[
                "get",
                "deployment",
                name,
                "-n",
                namespace,
                "-o",
                "jsonpath={.status.availableReplicas}/{.spec.replicas}",
                &kubeconfig,
            ],
        )
        .await?;
        let Some(out) = out else { return Ok(false) };
        let mut parts = out.trim().splitn(2, '/');
        let available = parts.next().unwrap_or_default();
        let desired = parts.next().unwrap_or_default();
        Ok(!available.is_empty() && available == desired)
    }

    async fn deployment_gone(&self, namespace: &str, name: &str) -> Result<bool, ProbeError> {
        let kubeconfig = self.kubeconfig_arg();
        let out = probe(
            name,
            &["get", "deployment", name, "-n", namespace, &kubeconfig],
        )
        .await?;
        Ok(out.is_none())
    }

    async fn service_address(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<String>, ProbeError> {
        let kubeconfig = self.kubeconfig_arg();
        // LoadBalancer ingress first; fall back to node IP + NodePort.
        let lb = probe(
            name,
            &[
                "get",
                "service",
                name,
                "-n",
                namespace,
                "-o",
                "jsonpath={.status.loadBalancer.ingress[0].ip}:{.spec.ports[0].port}",
                &kubeconfig,
            ],
        )
        .await?;
        match lb {
            None => return Ok(None),
            Some(out) if !out.trim().starts_with(':') => return Ok(Some(out.trim().to_owned())),
            Some(_) => {}
        }

        let port = probe(
            name,
            &[
                "get",
                "service",
                name,
                "-n",
                namespace,
                "-o",
                "jsonpath={.spec.ports[0].nodePort}",
                &kubeconfig,
            ],
        )
        .await?
        .unwrap_or_default();
        let node_ip = probe(
            name,
            &[
                "get",
                "nodes",
                "-o",
                "jsonpath={.items[0].status.addresses[?(@.type=='InternalIP')].address}",
                &kubeconfig,
            ],
        )
        .await?
        .unwrap_or_default();
        if port.trim().is_empty() || node_ip.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("{}:{}", node_ip.trim(), port.trim())))
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool, ProbeError> {
        let kubeconfig = self.kubeconfig_arg();
        let out = probe(namespace, &["get", "namespace", namespace, &kubeconfig]).await?;
        Ok(out.is_some())
    }

    async fn cluster_imported(&self, cluster_name: &str) -> Result<bool, ProbeError> {
        let kubeconfig = self.kubeconfig_arg();
        let out = probe(
            cluster_name,
            &[
                "get",
                "clusters.provisioning.cattle.io",
                cluster_name,
                "-n",
                &self.import_namespace,
                "-o",
                "jsonpath={.status.ready}",
                &kubeconfig,
            ],
        )
        .await?;
        Ok(out.is_some_and(|s| s.trim() == "true"))
    }

    async fn cluster_gone(&self, cluster_name: &str) -> Result<bool, ProbeError> {
        let kubeconfig = self.kubeconfig_arg();
        let out = probe(
            cluster_name,
            &[
                "get",
                "clusters.cluster.x-k8s.io",
                "-A",
                "--field-selector",
                &format!("metadata.name={cluster_name}"),
                "-o",
                "jsonpath={.items}",
                &kubeconfig,
            ],
        )
        .await?;
        Ok(match out {
            None => true,
            Some(items) => {
                let items = items.trim();
                items.is_empty() || items == "[]"
            }
        })
    }

    async fn create_namespace(&self, namespace: &str) -> Result<(), TestEnvError> {
        let kubeconfig = self.kubeconfig_arg();
        // `create ... --dry-run | apply` keeps this idempotent.
        let manifest = run(
            "kubectl",
            &[
                "create",
                "namespace",
                namespace,
                "--dry-run=client",
                "-o",
                "yaml",
                &kubeconfig,
            ],
        )
        .await?;
        run_with_stdin("kubectl", &["apply", "-f", "-", &kubeconfig], &manifest).await?;
        Ok(())
    }

    async fn label_namespace(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), TestEnvError> {
        let kubeconfig = self.kubeconfig_arg();
        let label = format!("{key}={value}");
        run(
            "kubectl",
            &["label", "namespace", namespace, &label, "--overwrite", &kubeconfig],
        )
        .await?;
        Ok(())
    }

    async fn create_secret(
        &self,
        namespace: &str,
        name: &str,
        data: &std::collections::HashMap<String, String>,
    ) -> Result<(), TestEnvError> {
        let kubeconfig = self.kubeconfig_arg();
        let mut args: Vec<String> = vec![
            "create".into(),
            "secret".into(),
            "generic".into(),
            name.into(),
            "-n".into(),
            namespace.into(),
            "--dry-run=client".into(),
            "-o".into(),
            "yaml".into(),
            kubeconfig.clone(),
        ];
        for (k, v) in data {
            args.push(format!("--from-literal={k}={v}"));
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let manifest = run("kubectl", &arg_refs).await?;
        run_with_stdin("kubectl", &["apply", "-f", "-", &kubeconfig], &manifest).await?;
        Ok(())
    }
}

/// Kubeconfig path the bootstrap cluster's credentials land at.
pub fn kubeconfig_path(artifacts_dir: &str, cluster_name: &str) -> PathBuf {
    Path::new(artifacts_dir).join(format!("{cluster_name}.kubeconfig"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kubeconfig_path_lands_in_artifacts_dir() {
        let path = kubeconfig_path("_artifacts", "anchorage-e2e");
        assert_eq!(path, PathBuf::from("_artifacts/anchorage-e2e.kubeconfig"));
    }

    #[tokio::test]
    async fn eks_provider_is_rejected_without_existing_cluster() {
        let installer = CommandInstaller::new("/tmp/kubeconfig");
        let request = ClusterRequest {
            name: "managed".to_owned(),
            provider: ClusterProvider::Eks,
            kubernetes_version: "v1.31.0".to_owned(),
            use_existing: false,
            artifacts_dir: "_artifacts".to_owned(),
        };
        let err = installer.create_cluster(&request).await.unwrap_err();
        assert!(err.to_string().contains("eks"), "{err}");
    }
}
