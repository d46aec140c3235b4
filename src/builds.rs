use crate::client::Client;
use crate::crd::{Build, Source};
use crate::error::Result;
use crate::predicate::{Mutator, Predicate};
use crate::resources::{self, build::make_build, MANAGED_BY, MANAGED_BY_LABEL, SOURCE_LABEL};
use crate::store::Store;
use kube::ResourceExt;
use std::collections::BTreeMap;

pub const KIND: &str = "Build";

pub type BuildClient<S = kube::Client> = Client<Build, S>;

pub fn client<S: Store<Build>>(store: S) -> BuildClient<S> {
    Client::new(store, KIND)
        .with_upsert_mutator(Mutator::set_labels(BTreeMap::from([(
            MANAGED_BY_LABEL.to_owned(),
            MANAGED_BY.to_owned(),
        )])))
        .with_membership_validator(Predicate::all([
            Predicate::label_equals(MANAGED_BY_LABEL, MANAGED_BY),
            Predicate::labels_contains(SOURCE_LABEL),
        ]))
}

/// Keeps the stored object's identity and bookkeeping, takes everything kf
/// decides from the new one.
pub fn merge(new: Build, mut existing: Build) -> Build {
    existing.spec = new.spec;
    existing.metadata.labels = new.metadata.labels;
    existing.metadata.owner_references = new.metadata.owner_references;
    existing
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Translate(#[from] resources::Error),
    #[error(transparent)]
    Client(#[from] crate::error::Error),
}

pub async fn sync_build<S: Store<Build>>(
    builds: &BuildClient<S>,
    source: &Source,
) -> Result<Build, SyncError> {
    let desired = make_build(source)?;
    let namespace = desired.namespace().unwrap_or_default();

    tracing::info!(source = %source.name_any(), %namespace, "syncing build");
    Ok(builds.upsert(&namespace, desired, merge).await?)
}
