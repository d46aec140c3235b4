// Nothing is retried here, conflicts surface as errors. See `crate::retry`.

use crate::error::{Error, Operation, Result};
use crate::options::{
    Config, CreateConfig, CreateOption, DeleteConfig, DeleteOption, GetConfig, GetOption,
    ListConfig, ListOption, UpdateConfig, UpdateOption,
};
use crate::predicate::{filter, Mutator, MutatorList, Predicate};
use crate::store::Store;
use kube::api::{DeleteParams, GetParams, ListParams, PostParams};
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

pub struct Client<K, S = kube::Client> {
    store: S,
    kind: &'static str,
    upsert_mutate: MutatorList<K>,
    membership_validator: Predicate<K>,
}

impl<K, S> Client<K, S>
where
    K: Resource + Clone + Send + Sync + 'static,
    S: Store<K>,
{
    /// `kind` is the user facing name of the managed concept, e.g. "Route".
    pub fn new(store: S, kind: &'static str) -> Self {
        Self {
            store,
            kind,
            upsert_mutate: MutatorList::default(),
            membership_validator: Predicate::always(),
        }
    }

    /// Adds a mutator run on every value before it's created or updated.
    pub fn with_upsert_mutator(mut self, mutator: Mutator<K>) -> Self {
        self.upsert_mutate.push(mutator);
        self
    }

    pub fn with_membership_validator(mut self, validator: Predicate<K>) -> Self {
        self.membership_validator = validator;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// True if the object is one this client manages.
    pub fn is_member(&self, obj: &K) -> bool {
        self.membership_validator.test(obj)
    }

    fn preprocess_upsert(&self, obj: &mut K) -> Result<()> {
        if self.upsert_mutate.is_empty() {
            return Ok(());
        }
        self.upsert_mutate
            .apply(obj)
            .map_err(|source| Error::Validation {
                kind: self.kind,
                name: obj.name_any(),
                source,
            })
    }

    /// Runs the mutators, then inserts the object. Nothing is sent if a mutator fails.
    pub async fn create(
        &self,
        namespace: &str,
        mut obj: K,
        options: impl IntoIterator<Item = CreateOption>,
    ) -> Result<K> {
        let cfg = CreateConfig::resolve(options);
        self.preprocess_upsert(&mut obj)?;

        let name = obj.name_any();
        tracing::debug!(
            kind = self.kind,
            %namespace,
            %name,
            mutators = self.upsert_mutate.len(),
            "creating"
        );

        self.store
            .create(namespace, &obj, &PostParams::from(&cfg))
            .await
            .map_err(|err| Error::store(Operation::Create, self.kind, Some(&name), err))
    }

    /// Replaces the existing object in the cluster with the new one.
    ///
    /// The value must carry whatever resource version the store expects, a
    /// stale one fails with a conflict.
    pub async fn update(
        &self,
        namespace: &str,
        mut obj: K,
        options: impl IntoIterator<Item = UpdateOption>,
    ) -> Result<K> {
        let cfg = UpdateConfig::resolve(options);
        self.preprocess_upsert(&mut obj)?;

        let name = match obj.meta().name.clone() {
            Some(name) => name,
            None => {
                return Err(Error::Validation {
                    kind: self.kind,
                    name: String::new(),
                    source: anyhow::anyhow!("an update needs the name of the object"),
                })
            }
        };
        tracing::debug!(kind = self.kind, %namespace, %name, "updating");

        self.store
            .replace(namespace, &name, &obj, &PostParams::from(&cfg))
            .await
            .map_err(|err| Error::store(Operation::Update, self.kind, Some(&name), err))
    }

    /// Read-modify-write of the object with the given name.
    ///
    /// Not atomic: a concurrent write between the get and the update makes the
    /// update fail with a conflict, which is returned as is.
    pub async fn transform(&self, namespace: &str, name: &str, mutator: &Mutator<K>) -> Result<()> {
        let mut obj = self.get(namespace, name, []).await?;

        mutator.apply(&mut obj).map_err(|source| Error::Validation {
            kind: self.kind,
            name: name.to_owned(),
            source,
        })?;

        self.update(namespace, obj, []).await?;
        Ok(())
    }

    /// Fails with [`Error::NotAMember`] if the object exists but isn't managed by this client.
    pub async fn get(
        &self,
        namespace: &str,
        name: &str,
        options: impl IntoIterator<Item = GetOption>,
    ) -> Result<K> {
        let cfg = GetConfig::resolve(options);

        let obj = self
            .store
            .get(namespace, name, &GetParams::from(&cfg))
            .await
            .map_err(|err| Error::store(Operation::Get, self.kind, Some(name), err))?;

        if self.membership_validator.test(&obj) {
            return Ok(obj);
        }

        tracing::warn!(
            kind = self.kind,
            %namespace,
            %name,
            "object exists but isn't managed by this client"
        );
        Err(Error::NotAMember {
            kind: self.kind,
            name: name.to_owned(),
        })
    }

    // Not tested for membership
    pub async fn delete(
        &self,
        namespace: &str,
        name: &str,
        options: impl IntoIterator<Item = DeleteOption>,
    ) -> Result<()> {
        let cfg = DeleteConfig::resolve(options);
        tracing::debug!(kind = self.kind, %namespace, %name, ?cfg, "deleting");

        self.store
            .delete(namespace, name, &DeleteParams::from(&cfg))
            .await
            .map_err(|err| Error::store(Operation::Delete, self.kind, Some(name), err))
    }

    /// Selectors are passed on to the store but never relied upon.
    pub async fn list(
        &self,
        namespace: &str,
        options: impl IntoIterator<Item = ListOption<K>>,
    ) -> Result<Vec<K>> {
        let cfg = ListConfig::resolve(options);

        let items = self
            .store
            .list(namespace, &ListParams::from(&cfg))
            .await
            .map_err(|err| Error::store(Operation::List, self.kind, None, err))?;
        let fetched = items.len();

        let members = filter(items, &self.membership_validator);
        let items = filter(members, &Predicate::all(cfg.filters));

        tracing::debug!(
            kind = self.kind,
            %namespace,
            fetched,
            returned = items.len(),
            "listed"
        );
        Ok(items)
    }

    /// Creates the object if it doesn't exist yet, otherwise writes
    /// `merge(new, existing)` over the existing one.
    ///
    /// Not atomic: the object may be created or deleted by someone else
    /// between the lookup and the write, the resulting conflict or not found
    /// error is returned as is.
    pub async fn upsert<M>(&self, namespace: &str, new_obj: K, merge: M) -> Result<K>
    where
        M: FnOnce(K, K) -> K + Send,
    {
        // Without a name the store picks one, so there is nothing to merge with
        let name = match new_obj.meta().name.clone() {
            Some(name) => name,
            None => return self.create(namespace, new_obj, []).await,
        };

        // The field selector may be ignored by the store, the names are
        // checked again below.
        let selector = BTreeMap::from([("metadata.name".to_owned(), name.clone())]);
        let existing = self
            .list(namespace, [ListOption::FieldSelector(selector)])
            .await?;

        match existing
            .into_iter()
            .find(|obj| obj.meta().name.as_deref() == Some(name.as_str()))
        {
            Some(old_obj) => {
                tracing::debug!(kind = self.kind, %namespace, %name, "merging with existing");
                self.update(namespace, merge(new_obj, old_obj), []).await
            }
            None => self.create(namespace, new_obj, []).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::virtual_service::{VirtualService, VirtualServiceSpec};
    use crate::store::fake::{Call, FakeStore};
    use kube::api::PropagationPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const NS: &str = "space";
    const MANAGED_BY: &str = "app.kubernetes.io/managed-by";

    fn route(name: &str, labels: &[(&str, &str)]) -> VirtualService {
        let mut route = VirtualService::new(name, VirtualServiceSpec::default());
        route.metadata.namespace = Some(NS.to_owned());
        if !labels.is_empty() {
            route.metadata.labels = Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
        }
        route
    }

    fn managed(name: &str) -> VirtualService {
        route(name, &[(MANAGED_BY, "kf")])
    }

    fn routes(store: FakeStore<VirtualService>) -> Client<VirtualService, FakeStore<VirtualService>> {
        Client::new(store, "Route")
            .with_upsert_mutator(Mutator::set_labels(BTreeMap::from([(
                MANAGED_BY.to_owned(),
                "kf".to_owned(),
            )])))
            .with_membership_validator(Predicate::label_equals(MANAGED_BY, "kf"))
    }

    fn plain(store: FakeStore<VirtualService>) -> Client<VirtualService, FakeStore<VirtualService>> {
        Client::new(store, "Route")
    }

    #[tokio::test]
    async fn create_runs_mutators_before_writing() {
        let client = routes(FakeStore::new());

        let created = client.create(NS, route("foo", &[]), []).await.unwrap();

        assert_eq!(created.labels()[MANAGED_BY], "kf");
        let creates = client.store().creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].labels()[MANAGED_BY], "kf");
    }

    #[tokio::test]
    async fn create_with_failing_mutator_never_writes() {
        let client = plain(FakeStore::new())
            .with_upsert_mutator(Mutator::new(|_| Err(anyhow::anyhow!("bad host"))));

        let err = client.create(NS, route("foo", &[]), []).await.unwrap_err();

        assert!(matches!(err, Error::Validation { ref name, .. } if name == "foo"));
        assert!(client.store().calls().is_empty());
    }

    #[tokio::test]
    async fn create_of_existing_name_is_a_conflict() {
        let client = routes(FakeStore::with_objects(NS, [managed("foo")]));

        let err = client.create(NS, route("foo", &[]), []).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn update_replaces_by_name() {
        let client = routes(FakeStore::with_objects(NS, [managed("foo")]));

        let mut changed = managed("foo");
        changed.spec.hosts = vec!["example.com".into()];
        client.update(NS, changed, []).await.unwrap();

        let stored = client.store().stored(NS, "foo").unwrap();
        assert_eq!(stored.spec.hosts, vec!["example.com".to_string()]);
    }

    #[tokio::test]
    async fn update_without_name_is_rejected() {
        let client = plain(FakeStore::new());
        let mut nameless = route("foo", &[]);
        nameless.metadata.name = None;

        let err = client.update(NS, nameless, []).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(client.store().calls().is_empty());
    }

    #[tokio::test]
    async fn update_with_failing_mutator_never_writes() {
        let client = plain(FakeStore::with_objects(NS, [route("foo", &[])]))
            .with_upsert_mutator(Mutator::new(|_| Err(anyhow::anyhow!("bad host"))));

        let err = client.update(NS, route("foo", &[]), []).await.unwrap_err();

        assert!(matches!(err, Error::Validation { ref name, .. } if name == "foo"));
        assert!(client.store().calls().is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_object_is_not_found() {
        let client = plain(FakeStore::new());

        let err = client.update(NS, route("foo", &[]), []).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn get_returns_members() {
        let client = routes(FakeStore::with_objects(NS, [managed("foo")]));

        let obj = client.get(NS, "foo", []).await.unwrap();
        assert_eq!(obj.name_any(), "foo");
    }

    #[tokio::test]
    async fn get_rejects_non_members() {
        let client = routes(FakeStore::with_objects(NS, [route("foo", &[])]));

        let err = client.get(NS, "foo", []).await.unwrap_err();
        assert!(matches!(err, Error::NotAMember { ref name, .. } if name == "foo"));
        assert_eq!(
            err.to_string(),
            "an object with the name foo exists, but it doesn't appear to be a Route"
        );
    }

    #[tokio::test]
    async fn get_store_failure_is_a_store_error() {
        let client = routes(FakeStore::with_objects(NS, [managed("foo")]));
        client.store().fail_reads_with(500);

        let err = client.get(NS, "foo", []).await.unwrap_err();

        assert!(!err.is_not_found());
        assert!(matches!(
            err,
            Error::Store {
                operation: Operation::Get,
                source: kube::Error::Api(ref response),
                ..
            } if response.code == 500
        ));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let client = routes(FakeStore::new());

        let err = client.get(NS, "foo", []).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_drops_non_members_without_filters() {
        let client = routes(FakeStore::with_objects(
            NS,
            [managed("a"), route("b", &[]), route("c", &[(MANAGED_BY, "helm")])],
        ));

        let names: Vec<String> = client
            .list(NS, [])
            .await
            .unwrap()
            .iter()
            .map(|obj| obj.name_any())
            .collect();
        assert_eq!(names, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn list_applies_every_filter() {
        let client = routes(FakeStore::with_objects(
            NS,
            [
                route("a", &[(MANAGED_BY, "kf"), ("team", "payments")]),
                route("b", &[(MANAGED_BY, "kf"), ("team", "search")]),
                route("c", &[("team", "payments")]),
            ],
        ));

        let listed = client
            .list(
                NS,
                [ListOption::Filters(vec![
                    Predicate::labels_contains("team"),
                    Predicate::label_equals("team", "payments"),
                ])],
            )
            .await
            .unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name_any(), "a");
    }

    #[tokio::test]
    async fn list_pushes_selectors_to_store() {
        let client = routes(FakeStore::new());

        client
            .list(
                NS,
                [ListOption::LabelSelector(BTreeMap::from([(
                    "team".to_owned(),
                    "payments".to_owned(),
                )]))],
            )
            .await
            .unwrap();

        match &client.store().calls()[..] {
            [Call::List(lp)] => {
                assert_eq!(lp.label_selector.as_deref(), Some("team=payments"));
                assert!(lp.field_selector.is_none());
            }
            calls => panic!("unexpected calls {:?}", calls.len()),
        }
    }

    #[tokio::test]
    async fn delete_skips_membership_and_uses_options() {
        let client = routes(FakeStore::with_objects(NS, [route("foreign", &[])]));

        client
            .delete(NS, "foreign", [DeleteOption::ForegroundDeletion(true)])
            .await
            .unwrap();

        match &client.store().calls()[..] {
            [Call::Delete(name, dp)] => {
                assert_eq!(name, "foreign");
                assert!(matches!(
                    dp.propagation_policy,
                    Some(PropagationPolicy::Foreground)
                ));
                assert!(dp.grace_period_seconds.is_none());
            }
            calls => panic!("unexpected calls {:?}", calls.len()),
        }
        assert!(client.store().stored(NS, "foreign").is_none());
    }

    #[tokio::test]
    async fn delete_defaults_set_no_policy() {
        let client = routes(FakeStore::with_objects(NS, [managed("foo")]));

        client.delete(NS, "foo", []).await.unwrap();

        match &client.store().calls()[..] {
            [Call::Delete(_, dp)] => {
                assert!(dp.propagation_policy.is_none());
                assert!(dp.grace_period_seconds.is_none());
            }
            calls => panic!("unexpected calls {:?}", calls.len()),
        }
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let client = routes(FakeStore::new());

        let err = client.delete(NS, "foo", []).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn transform_reads_mutates_and_writes() {
        let client = routes(FakeStore::with_objects(NS, [managed("foo")]));

        client
            .transform(
                NS,
                "foo",
                &Mutator::new(|obj: &mut VirtualService| {
                    obj.spec.gateways.push("kf/external-gateway".into());
                    Ok(())
                }),
            )
            .await
            .unwrap();

        let stored = client.store().stored(NS, "foo").unwrap();
        assert_eq!(stored.spec.gateways, vec!["kf/external-gateway".to_string()]);
    }

    #[tokio::test]
    async fn transform_stops_when_mutator_fails() {
        let client = routes(FakeStore::with_objects(NS, [managed("foo")]));

        let err = client
            .transform(NS, "foo", &Mutator::new(|_| Err(anyhow::anyhow!("nope"))))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation { .. }));
        assert!(client.store().replaces().is_empty());
    }

    #[tokio::test]
    async fn transform_surfaces_conflicts() {
        let client = routes(FakeStore::with_objects(NS, [managed("foo")]));
        client.store().fail_writes_with(409);

        let err = client
            .transform(NS, "foo", &Mutator::new(|_| Ok(())))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(client.store().replaces().len(), 1);
    }

    #[tokio::test]
    async fn upsert_creates_when_missing() {
        let client = plain(FakeStore::with_objects(NS, [route("bar", &[])]));
        let merges = Arc::new(AtomicUsize::new(0));

        let counter = merges.clone();
        client
            .upsert(NS, route("foo", &[]), move |new, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                new
            })
            .await
            .unwrap();

        assert_eq!(client.store().creates().len(), 1);
        assert!(client.store().replaces().is_empty());
        assert_eq!(merges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upsert_merges_into_existing() {
        let mut existing = route("foo", &[("old", "label")]);
        existing.metadata.resource_version = Some("7".into());
        existing.spec.gateways = vec!["kf/external-gateway".into()];
        let client = plain(FakeStore::with_objects(NS, [existing.clone(), route("bar", &[])]));

        let merge = |mut new: VirtualService, old: VirtualService| {
            new.metadata.resource_version = old.metadata.resource_version;
            new.spec.gateways = old.spec.gateways;
            new
        };
        let mut new = route("foo", &[]);
        new.spec.hosts = vec!["example.com".into()];

        let written = client.upsert(NS, new.clone(), merge).await.unwrap();

        assert!(client.store().creates().is_empty());
        let replaces = client.store().replaces();
        assert_eq!(replaces.len(), 1);
        assert_eq!(replaces[0], merge(new, existing));
        assert_eq!(written, replaces[0]);
    }

    #[tokio::test]
    async fn upsert_sends_name_selector() {
        let client = plain(FakeStore::new());

        client.upsert(NS, route("foo", &[]), |new, _| new).await.unwrap();

        match &client.store().calls()[0] {
            Call::List(lp) => {
                assert_eq!(lp.field_selector.as_deref(), Some("metadata.name=foo"))
            }
            _ => panic!("upsert should list first"),
        }
    }

    #[tokio::test]
    async fn upsert_over_foreign_object_conflicts() {
        let client = routes(FakeStore::with_objects(NS, [route("foo", &[])]));

        let err = client
            .upsert(NS, route("foo", &[]), |new, _| new)
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert!(client.store().replaces().is_empty());
    }
}
