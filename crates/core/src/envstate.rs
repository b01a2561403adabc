//! Shared environment record accumulated across setup stages.
//!
//! [`EnvironmentState`] replaces ambient suite globals: the pipeline
//! creates it empty, each stage publishes its outputs exactly once,
//! and later stages (and the scenario) read those outputs through
//! fallible getters. A field is owned by the stage that writes it;
//! rewriting is rejected, so the single-writer discipline holds by
//! construction instead of by convention.

use std::fmt;

use crate::error::EnvStateError;

/// Which provider backs the bootstrap cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterProvider {
    /// Local kind cluster (default).
    Kind,
    /// Managed EKS cluster.
    Eks,
    /// Environment-specific provider supplied by a hook.
    Custom(String),
}

impl fmt::Display for ClusterProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind => write!(f, "kind"),
            Self::Eks => write!(f, "eks"),
            Self::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// How the platform is exposed to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressType {
    /// In-cluster ingress controller deployed from a bundled manifest.
    Classic,
    /// Ngrok operator tunneling to a public endpoint.
    Ngrok,
    /// Provider-native load-balancer ingress (no extra deployment).
    EksNative,
}

impl fmt::Display for IngressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic => write!(f, "classic"),
            Self::Ngrok => write!(f, "ngrok"),
            Self::EksNative => write!(f, "eks-native"),
        }
    }
}

/// Handle to the provisioned bootstrap cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterProxy {
    /// Cluster name as known to the provider.
    pub name: String,
    /// Path to the kubeconfig granting admin access.
    pub kubeconfig_path: String,
    /// Provider that created the cluster.
    pub provider: ClusterProvider,
}

/// Published outputs of the platform install stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformAccess {
    /// Externally reachable host name of the platform UI/API.
    pub host_name: String,
    /// Namespace the platform chart was installed into.
    pub namespace: String,
    /// Bootstrap admin password.
    pub password: String,
}

/// Published outputs of the git-server install stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitAccess {
    /// HTTP address repositories are pushed to.
    pub http_address: String,
    /// Name of the secret holding the admin credentials.
    pub auth_secret_name: String,
    /// Admin user name.
    pub username: String,
    /// Admin password (generated when not configured).
    pub password: String,
}

macro_rules! write_once_field {
    ($field:ident, $setter:ident, $ty:ty) => {
        /// Publish the field. Rejected if an earlier stage already set it.
        pub fn $setter(&mut self, value: $ty) -> Result<(), EnvStateError> {
            if self.$field.is_some() {
                return Err(EnvStateError::AlreadySet {
                    field: stringify!($field),
                });
            }
            self.$field = Some(value);
            Ok(())
        }

        /// Read the field. Errors when the owning stage has not run.
        pub fn $field(&self) -> Result<&$ty, EnvStateError> {
            self.$field.as_ref().ok_or(EnvStateError::Missing {
                field: stringify!($field),
            })
        }
    };
}

/// Write-once record of everything the setup stages provisioned.
#[derive(Debug, Default)]
pub struct EnvironmentState {
    cluster_proxy: Option<ClusterProxy>,
    ingress_type: Option<IngressType>,
    platform: Option<PlatformAccess>,
    controller_namespace: Option<String>,
    controller_version: Option<String>,
    git_access: Option<GitAccess>,
}

impl EnvironmentState {
    /// Create an empty record at pipeline start.
    pub fn new() -> Self {
        Self::default()
    }

    write_once_field!(cluster_proxy, set_cluster_proxy, ClusterProxy);
    write_once_field!(ingress_type, set_ingress_type, IngressType);
    write_once_field!(platform, set_platform, PlatformAccess);
    write_once_field!(controller_namespace, set_controller_namespace, String);
    write_once_field!(controller_version, set_controller_version, String);
    write_once_field!(git_access, set_git_access, GitAccess);

    /// Whether the bootstrap cluster was provisioned.
    ///
    /// The cleanup coordinator uses presence checks to decide which
    /// teardown steps apply after a partial setup.
    pub fn has_cluster(&self) -> bool {
        self.cluster_proxy.is_some()
    }

    /// Whether the git server was installed.
    pub fn has_git_server(&self) -> bool {
        self.git_access.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy() -> ClusterProxy {
        ClusterProxy {
            name: "anchorage-e2e".to_owned(),
            kubeconfig_path: "/tmp/anchorage-e2e.kubeconfig".to_owned(),
            provider: ClusterProvider::Kind,
        }
    }

    #[test]
    fn field_read_before_write_is_missing() {
        let env = EnvironmentState::new();
        let err = env.cluster_proxy().unwrap_err();
        assert!(matches!(
            err,
            EnvStateError::Missing {
                field: "cluster_proxy"
            }
        ));
    }

    #[test]
    fn field_written_once_reads_back() {
        let mut env = EnvironmentState::new();
        env.set_cluster_proxy(proxy()).unwrap();
        assert_eq!(env.cluster_proxy().unwrap().name, "anchorage-e2e");
        assert!(env.has_cluster());
    }

    #[test]
    fn second_write_is_rejected() {
        let mut env = EnvironmentState::new();
        env.set_cluster_proxy(proxy()).unwrap();
        let err = env.set_cluster_proxy(proxy()).unwrap_err();
        assert!(matches!(
            err,
            EnvStateError::AlreadySet {
                field: "cluster_proxy"
            }
        ));
        // First write survives a rejected rewrite.
        assert_eq!(env.cluster_proxy().unwrap().provider, ClusterProvider::Kind);
    }

    #[test]
    fn fields_are_independent() {
        let mut env = EnvironmentState::new();
        env.set_ingress_type(IngressType::Ngrok).unwrap();
        assert!(env.cluster_proxy().is_err());
        assert_eq!(*env.ingress_type().unwrap(), IngressType::Ngrok);
    }

    #[test]
    fn presence_checks_track_setters() {
        let mut env = EnvironmentState::new();
        assert!(!env.has_git_server());
        env.set_git_access(GitAccess {
            http_address: "http://172.18.0.2:30080".to_owned(),
            auth_secret_name: "gitserver-auth".to_owned(),
            username: "gitadmin".to_owned(),
            password: "s3cret".to_owned(),
        })
        .unwrap();
        assert!(env.has_git_server());
    }
}
