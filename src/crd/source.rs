use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a source is turned into a runnable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Buildpack,
    ContainerImage,
}

#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "kf.dev",
    version = "v1alpha1",
    kind = "Source",
    doc = "Custom resource representation of the code or image an app is built from",
    status = "SourceStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Build", "type":"string", "jsonPath":".status.buildName"}"#,
    printcolumn = r#"{"name":"Image", "type":"string", "jsonPath":".status.image"}"#,
    namespaced
)]
pub struct SourceSpec {
    #[serde(default)]
    pub service_account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildpack_build: Option<BuildpackBuild>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_image: Option<ContainerImageBuild>,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildpackBuild {
    /// Image holding the uploaded application source.
    pub source: String,
    #[serde(default)]
    pub stack: String,
    #[serde(default)]
    pub buildpack: String,
    /// Repository the built image is pushed to.
    pub registry: String,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerImageBuild {
    pub image: String,
    pub registry: String,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl SourceSpec {
    /// `None` unless exactly one kind of build is configured.
    pub fn build_mode(&self) -> Option<BuildMode> {
        match (&self.buildpack_build, &self.container_image) {
            (Some(_), None) => Some(BuildMode::Buildpack),
            (None, Some(_)) => Some(BuildMode::ContainerImage),
            _ => None,
        }
    }

    pub fn registry(&self) -> Option<&str> {
        match (&self.buildpack_build, &self.container_image) {
            (Some(build), None) => Some(&build.registry),
            (None, Some(build)) => Some(&build.registry),
            _ => None,
        }
    }
}
