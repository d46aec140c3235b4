use crate::client::Client;
use crate::crd::VirtualService;
use crate::predicate::{Mutator, Predicate};
use crate::resources::{MANAGED_BY, MANAGED_BY_LABEL};
use crate::store::Store;
use std::collections::BTreeMap;

pub const KIND: &str = "Route";

pub type RouteClient<S = kube::Client> = Client<VirtualService, S>;

pub fn client<S: Store<VirtualService>>(store: S) -> RouteClient<S> {
    Client::new(store, KIND)
        .with_upsert_mutator(Mutator::set_labels(BTreeMap::from([(
            MANAGED_BY_LABEL.to_owned(),
            MANAGED_BY.to_owned(),
        )])))
        .with_membership_validator(Predicate::label_equals(MANAGED_BY_LABEL, MANAGED_BY))
}
