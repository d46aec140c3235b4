use thiserror::Error;

pub mod build;

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "kf";
pub const SOURCE_LABEL: &str = "kf-source";

/// Errors turning a resource into the objects derived from it.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("missing namespace for {kind} {name}")]
    MissingNamespace { kind: &'static str, name: String },
    #[error("{kind} {name} has no uid to be referenced by its children")]
    MissingUid { kind: &'static str, name: String },
    #[error("Source {0} must set exactly one of buildpackBuild or containerImage")]
    AmbiguousBuildMode(String),
    #[error("Source {0} has no registry to push its image to")]
    MissingRegistry(String),
}
