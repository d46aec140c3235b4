use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Knative Build, the pipeline object a Source is translated into.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "build.knative.dev",
    version = "v1alpha1",
    kind = "Build",
    doc = "Knative Build executing a build template",
    derive = "PartialEq",
    namespaced
)]
pub struct BuildSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<BuildSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateInstantiation>,
}

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CustomSource>,
}

/// A container whose filesystem is used as the build workspace.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomSource {
    pub image: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, JsonSchema)]
pub enum TemplateKind {
    BuildTemplate,
    ClusterBuildTemplate,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInstantiation {
    pub name: String,
    pub kind: TemplateKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Argument>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
pub struct Argument {
    pub name: String,
    pub value: String,
}

impl TemplateInstantiation {
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| arg.value.as_str())
    }
}
