use kube::Resource;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub struct Predicate<K>(Arc<dyn Fn(&K) -> bool + Send + Sync>);

impl<K> Clone for Predicate<K> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<K> fmt::Debug for Predicate<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate")
    }
}

impl<K: 'static> Predicate<K> {
    pub fn new<F>(filter: F) -> Self
    where
        F: Fn(&K) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(filter))
    }

    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Passes if all children pass. Children run left to right and stop at the
    /// first failure, an empty list always passes.
    pub fn all(children: impl IntoIterator<Item = Predicate<K>>) -> Self {
        let children: Vec<Predicate<K>> = children.into_iter().collect();
        Self::new(move |obj| children.iter().all(|filter| filter.test(obj)))
    }

    pub fn test(&self, obj: &K) -> bool {
        (self.0)(obj)
    }
}

impl<K: Resource + 'static> Predicate<K> {
    pub fn label_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        Self::new(move |obj| {
            obj.meta()
                .labels
                .as_ref()
                .and_then(|labels| labels.get(&key))
                .is_some_and(|v| *v == value)
        })
    }

    /// Passes when the label exists, whatever its value.
    pub fn labels_contains(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(move |obj| {
            obj.meta()
                .labels
                .as_ref()
                .is_some_and(|labels| labels.contains_key(&key))
        })
    }
}

pub fn filter<K: 'static>(items: Vec<K>, predicate: &Predicate<K>) -> Vec<K> {
    items
        .into_iter()
        .filter(|item| predicate.test(item))
        .collect()
}

/// A change applied to a resource in place, failing if it can't be applied safely.
pub struct Mutator<K>(Arc<dyn Fn(&mut K) -> anyhow::Result<()> + Send + Sync>);

impl<K> Clone for Mutator<K> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<K> fmt::Debug for Mutator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mutator")
    }
}

impl<K: 'static> Mutator<K> {
    pub fn new<F>(mutator: F) -> Self
    where
        F: Fn(&mut K) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(mutator))
    }

    pub fn apply(&self, obj: &mut K) -> anyhow::Result<()> {
        (self.0)(obj)
    }
}

impl<K: Resource + 'static> Mutator<K> {
    /// Sets the given labels on the object, creating the label map if it's missing.
    pub fn set_labels(labels: BTreeMap<String, String>) -> Self {
        Self::new(move |obj| {
            let existing = obj.meta_mut().labels.get_or_insert_with(BTreeMap::new);
            existing.extend(labels.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(())
        })
    }
}

pub struct MutatorList<K>(Vec<Mutator<K>>);

impl<K> Clone for MutatorList<K> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<K> Default for MutatorList<K> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<K> fmt::Debug for MutatorList<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MutatorList").field(&self.0.len()).finish()
    }
}

impl<K> FromIterator<Mutator<K>> for MutatorList<K> {
    fn from_iter<I: IntoIterator<Item = Mutator<K>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K: 'static> MutatorList<K> {
    pub fn push(&mut self, mutator: Mutator<K>) {
        self.0.push(mutator);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stops at the first error, the value keeps whatever earlier mutators changed.
    pub fn apply(&self, obj: &mut K) -> anyhow::Result<()> {
        for mutator in &self.0 {
            mutator.apply(obj)?;
        }

        Ok(())
    }
}
