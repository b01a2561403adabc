//! Bundled manifests applied by stages.
//!
//! These are the fixed in-tree documents the installer applies
//! verbatim; anything environment-specific flows through config
//! variables or chart values instead.

/// Classic in-cluster ingress controller.
pub const CLASSIC_INGRESS: &str = r#"apiVersion: v1
kind: Namespace
metadata:
  name: ingress-nginx
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: ingress-nginx-controller
  namespace: ingress-nginx
spec:
  replicas: 1
  selector:
    matchLabels:
      app.kubernetes.io/name: ingress-nginx
  template:
    metadata:
      labels:
        app.kubernetes.io/name: ingress-nginx
    spec:
      containers:
        - name: controller
          image: registry.k8s.io/ingress-nginx/controller:v1.11.2
          ports:
            - containerPort: 80
              hostPort: 80
            - containerPort: 443
              hostPort: 443
"#;

/// Marks the nginx ingress class as the cluster default.
pub const DEFAULT_INGRESS_CLASS_PATCH: &str = r#"apiVersion: networking.k8s.io/v1
kind: IngressClass
metadata:
  name: nginx
  annotations:
    ingressclass.kubernetes.io/is-default-class: "true"
spec:
  controller: k8s.io/ingress-nginx
"#;

/// Platform settings applied after the chart install: skip the
/// first-login URL prompt so the scenario can drive the API directly.
pub const PLATFORM_SETTINGS_PATCH: &str = r#"apiVersion: management.cattle.io/v3
kind: Setting
metadata:
  name: first-login
value: "false"
"#;
