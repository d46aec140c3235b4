use super::{Error, MANAGED_BY, MANAGED_BY_LABEL, SOURCE_LABEL};
use crate::crd::build::{
    Argument, Build, BuildSource, BuildSpec, CustomSource, TemplateInstantiation, TemplateKind,
};
use crate::crd::source::{BuildMode, Source, SourceStatus};
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

pub const BUILDPACK_TEMPLATE: &str = "buildpack";
pub const CONTAINER_TEMPLATE: &str = "container-image";

/// Name of the Build for a Source. Stable, so re-syncing a Source updates
/// its existing Build instead of creating a new one.
pub fn build_name(source: &Source) -> String {
    source.name_any()
}

/// Image name for an application.
pub fn app_image_name(namespace: &str, app_name: &str, generation: i64) -> String {
    format!("app-{}-{}:{}", namespace, app_name, generation)
}

pub fn join_repository_image(repository: &str, image_name: &str) -> String {
    format!("{}/{}", repository.trim_end_matches('/'), image_name)
}

fn argument(name: &str, value: impl Into<String>) -> Argument {
    Argument {
        name: name.to_owned(),
        value: value.into(),
    }
}

/// Creates the Build for a Source.
pub fn make_build(source: &Source) -> Result<Build, Error> {
    let name = source.name_any();
    let namespace = source.namespace().ok_or_else(|| Error::MissingNamespace {
        kind: "Source",
        name: name.clone(),
    })?;
    let owner = source
        .controller_owner_ref(&())
        .ok_or_else(|| Error::MissingUid {
            kind: "Source",
            name: name.clone(),
        })?;

    let (mode, registry) = match (source.spec.build_mode(), source.spec.registry()) {
        (Some(mode), Some(registry)) => (mode, registry),
        _ => return Err(Error::AmbiguousBuildMode(name)),
    };
    if registry.trim().trim_end_matches('/').is_empty() {
        return Err(Error::MissingRegistry(name));
    }

    let generation = source.metadata.generation.unwrap_or_default();
    let image_destination =
        join_repository_image(registry, &app_image_name(&namespace, &name, generation));

    let (source_image, template) = match mode {
        BuildMode::Buildpack => {
            let spec = source.spec.buildpack_build.clone().unwrap_or_default();
            let template = TemplateInstantiation {
                name: BUILDPACK_TEMPLATE.to_owned(),
                kind: TemplateKind::ClusterBuildTemplate,
                arguments: vec![
                    argument("IMAGE", image_destination),
                    argument("BUILDPACK", spec.buildpack),
                ],
            };
            (Some(spec.source), template)
        }
        BuildMode::ContainerImage => {
            let spec = source.spec.container_image.clone().unwrap_or_default();
            let template = TemplateInstantiation {
                name: CONTAINER_TEMPLATE.to_owned(),
                kind: TemplateKind::ClusterBuildTemplate,
                arguments: vec![
                    argument("IMAGE", image_destination),
                    argument("SOURCE_IMAGE", spec.image),
                ],
            };
            (None, template)
        }
    };

    // Copy labels from the parent, our own tags win
    let mut labels: BTreeMap<String, String> = source.labels().clone();
    labels.insert(MANAGED_BY_LABEL.to_owned(), MANAGED_BY.to_owned());
    labels.insert(SOURCE_LABEL.to_owned(), name.clone());

    let service_account = Some(source.spec.service_account.clone()).filter(|sa| !sa.is_empty());

    Ok(Build {
        metadata: ObjectMeta {
            name: Some(build_name(source)),
            namespace: Some(namespace),
            owner_references: Some(vec![owner]),
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        spec: BuildSpec {
            service_account_name: service_account,
            source: source_image.map(|image| BuildSource {
                custom: Some(CustomSource { image }),
            }),
            template: Some(template),
        },
    })
}

/// Image the Build pushes to, as recorded in its `IMAGE` argument.
pub fn output_image(build: &Build) -> Option<&str> {
    build.spec.template.as_ref()?.argument("IMAGE")
}

pub fn source_status(build: &Build) -> SourceStatus {
    SourceStatus {
        build_name: build.metadata.name.clone(),
        image: output_image(build).map(str::to_owned),
    }
}
