use crate::client::Client;
use crate::crd::{Build, Source};
use crate::error::{Error, Operation, Result};
use crate::predicate::{Mutator, Predicate};
use crate::resources::{build::source_status, MANAGED_BY, MANAGED_BY_LABEL};
use crate::store::Store;
use kube::api::{Api, Patch, PatchParams};
use kube::ResourceExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const KIND: &str = "Source";

pub type SourceClient<S = kube::Client> = Client<Source, S>;

pub fn client<S: Store<Source>>(store: S) -> SourceClient<S> {
    Client::new(store, KIND)
        .with_upsert_mutator(Mutator::set_labels(BTreeMap::from([(
            MANAGED_BY_LABEL.to_owned(),
            MANAGED_BY.to_owned(),
        )])))
        .with_membership_validator(Predicate::label_equals(MANAGED_BY_LABEL, MANAGED_BY))
}

fn status_patch(build: &Build) -> Value {
    json!({ "status": source_status(build) })
}

/// Points the Source's status at its Build and the image it produces.
pub async fn record_build(client: kube::Client, source: &Source, build: &Build) -> Result<Source> {
    let name = source.name_any();
    let namespace = source.namespace().unwrap_or_default();
    let api: Api<Source> = Api::namespaced(client, &namespace);

    let patch = status_patch(build);
    let patch: Patch<&Value> = Patch::Merge(&patch);
    api.patch_status(&name, &PatchParams::default(), &patch)
        .await
        .map_err(|err| Error::store(Operation::Update, KIND, Some(&name), err))
}
