//! Workload cluster manifest rendering.
//!
//! The scenario renders one cluster manifest from a topology template
//! by plain `${NAME}` placeholder substitution. Rendering fails when a
//! placeholder is left unresolved, so a typo in the template surfaces
//! before anything touches the cluster.

use crate::input::ScenarioInput;

/// Topology-based workload cluster manifest.
///
/// `${CLUSTER_CLASS}` selects the provider/bootstrap combination
/// (e.g. `docker-kubeadm`); machine counts and the Kubernetes version
/// come from the scenario input.
pub const CLUSTER_TEMPLATE: &str = r#"apiVersion: cluster.x-k8s.io/v1beta1
kind: Cluster
metadata:
  name: ${CLUSTER_NAME}
  namespace: ${NAMESPACE}
spec:
  topology:
    class: ${CLUSTER_CLASS}
    version: ${KUBERNETES_VERSION}
    controlPlane:
      replicas: ${CONTROL_PLANE_MACHINE_COUNT}
    workers:
      machineDeployments:
        - class: default-worker
          name: md-0
          replicas: ${WORKER_MACHINE_COUNT}
"#;

/// Template rendering errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A `${NAME}` placeholder had no substitution.
    #[error("unresolved placeholder '${{{name}}}' in cluster template")]
    UnresolvedPlaceholder { name: String },
}

/// Substitute `${NAME}` placeholders in `template`.
pub fn render(template: &str, vars: &[(&str, String)]) -> Result<String, RenderError> {
    let mut out = template.to_owned();
    for (name, value) in vars {
        out = out.replace(&format!("${{{name}}}"), value);
    }
    if let Some(start) = out.find("${") {
        let name = out[start + 2..]
            .split('}')
            .next()
            .unwrap_or_default()
            .to_owned();
        return Err(RenderError::UnresolvedPlaceholder { name });
    }
    Ok(out)
}

/// Render the workload cluster manifest for a scenario run.
pub fn cluster_manifest(input: &ScenarioInput) -> Result<String, RenderError> {
    render(
        CLUSTER_TEMPLATE,
        &[
            ("CLUSTER_NAME", input.cluster_name.clone()),
            ("NAMESPACE", input.namespace.clone()),
            ("CLUSTER_CLASS", input.template.clone()),
            ("KUBERNETES_VERSION", input.kubernetes_version.clone()),
            (
                "CONTROL_PLANE_MACHINE_COUNT",
                input.control_plane_count.to_string(),
            ),
            ("WORKER_MACHINE_COUNT", input.worker_count.to_string()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_all_placeholders() {
        let input = ScenarioInput::for_tests();
        let manifest = cluster_manifest(&input).unwrap();
        assert!(manifest.contains("name: workload-docker-kubeadm"));
        assert!(manifest.contains("class: docker-kubeadm"));
        assert!(manifest.contains("replicas: 1"));
        assert!(!manifest.contains("${"));
    }

    #[test]
    fn machine_counts_are_substituted_independently() {
        let mut input = ScenarioInput::for_tests();
        input.control_plane_count = 3;
        input.worker_count = 2;
        let manifest = cluster_manifest(&input).unwrap();
        assert!(manifest.contains("replicas: 3"));
        assert!(manifest.contains("replicas: 2"));
    }

    #[test]
    fn unresolved_placeholder_is_an_error() {
        let err = render("name: ${CLUSTER_NAME}", &[]).unwrap_err();
        assert!(err.to_string().contains("CLUSTER_NAME"), "{err}");
    }
}
