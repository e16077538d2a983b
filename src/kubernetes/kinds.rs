use std::fmt;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ComponentStatus, ConfigMap, Endpoints, Event, LimitRange, Namespace, Node, PersistentVolume,
    Pod, PodTemplate, ReplicationController, ResourceQuota, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::ApiResource;

/// The closed set of resource kinds the lookup layer understands.
///
/// Each kind knows whether it is namespace-scoped and which API type its live
/// list query targets, so there is no runtime "unsupported" branch to maintain
/// by hand: the compiler checks every dispatch table for exhaustiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    Service,
    Deployment,
    StatefulSet,
    DaemonSet,
    NetworkPolicy,
    ReplicationController,
    ReplicaSet,
    Ingress,
    Endpoints,
    ConfigMap,
    Event,
    LimitRange,
    Secret,
    ResourceQuota,
    PodTemplate,
    ServiceAccount,
    HorizontalPodAutoscaler,
    Job,
    CronJob,
    Node,
    Namespace,
    PersistentVolume,
    ClusterRole,
    ClusterRoleBinding,
    ComponentStatus,
    CustomResourceDefinition,
}

impl ResourceKind {
    /// Every supported kind.
    pub const ALL: [ResourceKind; 27] = [
        Self::Pod,
        Self::Service,
        Self::Deployment,
        Self::StatefulSet,
        Self::DaemonSet,
        Self::NetworkPolicy,
        Self::ReplicationController,
        Self::ReplicaSet,
        Self::Ingress,
        Self::Endpoints,
        Self::ConfigMap,
        Self::Event,
        Self::LimitRange,
        Self::Secret,
        Self::ResourceQuota,
        Self::PodTemplate,
        Self::ServiceAccount,
        Self::HorizontalPodAutoscaler,
        Self::Job,
        Self::CronJob,
        Self::Node,
        Self::Namespace,
        Self::PersistentVolume,
        Self::ClusterRole,
        Self::ClusterRoleBinding,
        Self::ComponentStatus,
        Self::CustomResourceDefinition,
    ];

    /// The kinds whose names are cached on disk per namespace.
    /// Deployment names are derived from the cached pod list, not fetched.
    pub const CACHED: [ResourceKind; 4] = [Self::Service, Self::Pod, Self::Secret, Self::ConfigMap];

    /// Parse a resource word from the shell into a kind.
    ///
    /// Accepts the canonical singular names plus the legacy spellings some
    /// shells still emit ("thirdpartyresource", "scheduledjob"), which map to
    /// their modern equivalents. Unknown words yield `None`; that is the
    /// expected "no such resource type" outcome and is not logged.
    pub fn parse(word: &str) -> Option<Self> {
        let kind = match word {
            "pod" => Self::Pod,
            "service" => Self::Service,
            "deployment" => Self::Deployment,
            "statefulset" => Self::StatefulSet,
            "daemonset" => Self::DaemonSet,
            "networkpolicy" => Self::NetworkPolicy,
            "replicationcontroller" => Self::ReplicationController,
            "replicaset" => Self::ReplicaSet,
            "ingress" => Self::Ingress,
            "endpoints" => Self::Endpoints,
            "configmap" => Self::ConfigMap,
            "event" => Self::Event,
            "limitrange" => Self::LimitRange,
            "secret" => Self::Secret,
            "resourcequota" => Self::ResourceQuota,
            "podtemplate" => Self::PodTemplate,
            "serviceaccount" => Self::ServiceAccount,
            "horizontalpodautoscaler" => Self::HorizontalPodAutoscaler,
            "job" => Self::Job,
            "cronjob" | "scheduledjob" => Self::CronJob,
            "node" => Self::Node,
            "namespace" => Self::Namespace,
            "persistentvolume" => Self::PersistentVolume,
            "clusterrole" => Self::ClusterRole,
            "clusterrolebinding" => Self::ClusterRoleBinding,
            "componentstatus" => Self::ComponentStatus,
            "customresourcedefinition" | "thirdpartyresource" => Self::CustomResourceDefinition,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical name, also used as the snapshot key for cached kinds.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Service => "service",
            Self::Deployment => "deployment",
            Self::StatefulSet => "statefulset",
            Self::DaemonSet => "daemonset",
            Self::NetworkPolicy => "networkpolicy",
            Self::ReplicationController => "replicationcontroller",
            Self::ReplicaSet => "replicaset",
            Self::Ingress => "ingress",
            Self::Endpoints => "endpoints",
            Self::ConfigMap => "configmap",
            Self::Event => "event",
            Self::LimitRange => "limitrange",
            Self::Secret => "secret",
            Self::ResourceQuota => "resourcequota",
            Self::PodTemplate => "podtemplate",
            Self::ServiceAccount => "serviceaccount",
            Self::HorizontalPodAutoscaler => "horizontalpodautoscaler",
            Self::Job => "job",
            Self::CronJob => "cronjob",
            Self::Node => "node",
            Self::Namespace => "namespace",
            Self::PersistentVolume => "persistentvolume",
            Self::ClusterRole => "clusterrole",
            Self::ClusterRoleBinding => "clusterrolebinding",
            Self::ComponentStatus => "componentstatus",
            Self::CustomResourceDefinition => "customresourcedefinition",
        }
    }

    /// Whether this kind is partitioned by namespace.
    pub fn namespaced(&self) -> bool {
        !matches!(
            self,
            Self::Node
                | Self::Namespace
                | Self::PersistentVolume
                | Self::ClusterRole
                | Self::ClusterRoleBinding
                | Self::ComponentStatus
                | Self::CustomResourceDefinition
        )
    }

    /// The live list-query target for this kind.
    pub fn api_resource(&self) -> ApiResource {
        match self {
            Self::Pod => ApiResource::erase::<Pod>(&()),
            Self::Service => ApiResource::erase::<Service>(&()),
            Self::Deployment => ApiResource::erase::<Deployment>(&()),
            Self::StatefulSet => ApiResource::erase::<StatefulSet>(&()),
            Self::DaemonSet => ApiResource::erase::<DaemonSet>(&()),
            Self::NetworkPolicy => ApiResource::erase::<NetworkPolicy>(&()),
            Self::ReplicationController => ApiResource::erase::<ReplicationController>(&()),
            Self::ReplicaSet => ApiResource::erase::<ReplicaSet>(&()),
            Self::Ingress => ApiResource::erase::<Ingress>(&()),
            Self::Endpoints => ApiResource::erase::<Endpoints>(&()),
            Self::ConfigMap => ApiResource::erase::<ConfigMap>(&()),
            Self::Event => ApiResource::erase::<Event>(&()),
            Self::LimitRange => ApiResource::erase::<LimitRange>(&()),
            Self::Secret => ApiResource::erase::<Secret>(&()),
            Self::ResourceQuota => ApiResource::erase::<ResourceQuota>(&()),
            Self::PodTemplate => ApiResource::erase::<PodTemplate>(&()),
            Self::ServiceAccount => ApiResource::erase::<ServiceAccount>(&()),
            Self::HorizontalPodAutoscaler => ApiResource::erase::<HorizontalPodAutoscaler>(&()),
            Self::Job => ApiResource::erase::<Job>(&()),
            Self::CronJob => ApiResource::erase::<CronJob>(&()),
            Self::Node => ApiResource::erase::<Node>(&()),
            Self::Namespace => ApiResource::erase::<Namespace>(&()),
            Self::PersistentVolume => ApiResource::erase::<PersistentVolume>(&()),
            Self::ClusterRole => ApiResource::erase::<ClusterRole>(&()),
            Self::ClusterRoleBinding => ApiResource::erase::<ClusterRoleBinding>(&()),
            Self::ComponentStatus => ApiResource::erase::<ComponentStatus>(&()),
            Self::CustomResourceDefinition => ApiResource::erase::<CustomResourceDefinition>(&()),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
