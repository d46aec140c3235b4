use async_trait::async_trait;
use kube::api::{DeleteParams, GetParams, ListParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Resource};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Errors are passed through untouched so callers can tell a 404 or a 409 apart.
#[async_trait]
pub trait Store<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    async fn create(&self, namespace: &str, obj: &K, pp: &PostParams) -> Result<K, kube::Error>;
    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
        pp: &PostParams,
    ) -> Result<K, kube::Error>;
    async fn get(&self, namespace: &str, name: &str, gp: &GetParams) -> Result<K, kube::Error>;
    async fn list(&self, namespace: &str, lp: &ListParams) -> Result<Vec<K>, kube::Error>;
    async fn delete(&self, namespace: &str, name: &str, dp: &DeleteParams)
        -> Result<(), kube::Error>;
}

#[async_trait]
impl<K> Store<K> for kube::Client
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn create(&self, namespace: &str, obj: &K, pp: &PostParams) -> Result<K, kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        api.create(pp, obj).await
    }

    async fn replace(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
        pp: &PostParams,
    ) -> Result<K, kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        api.replace(name, pp, obj).await
    }

    async fn get(&self, namespace: &str, name: &str, gp: &GetParams) -> Result<K, kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        api.get_with(name, gp).await
    }

    async fn list(&self, namespace: &str, lp: &ListParams) -> Result<Vec<K>, kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        Ok(api.list(lp).await?.items)
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
        dp: &DeleteParams,
    ) -> Result<(), kube::Error> {
        let api: Api<K> = Api::namespaced(self.clone(), namespace);
        api.delete(name, dp).await?;
        Ok(())
    }
}
