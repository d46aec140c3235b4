use crate::predicate::Predicate;
use kube::api::{DeleteParams, GetParams, ListParams, PostParams, PropagationPolicy};
use std::collections::BTreeMap;
use std::fmt;

pub trait Config: Clone {
    type Option;

    fn defaults() -> Self;

    fn set(&mut self, option: Self::Option);

    /// Returns a copy with the options applied in order, `self` is left untouched.
    fn extend(&self, options: impl IntoIterator<Item = Self::Option>) -> Self {
        let mut config = self.clone();
        for option in options {
            config.set(option);
        }
        config
    }

    fn resolve(options: impl IntoIterator<Item = Self::Option>) -> Self {
        Self::defaults().extend(options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOption {
    DryRun(bool),
    FieldManager(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateConfig {
    pub dry_run: bool,
    pub field_manager: Option<String>,
}

impl Config for CreateConfig {
    type Option = CreateOption;

    fn defaults() -> Self {
        Self::default()
    }

    fn set(&mut self, option: CreateOption) {
        match option {
            CreateOption::DryRun(dry_run) => self.dry_run = dry_run,
            CreateOption::FieldManager(manager) => self.field_manager = Some(manager),
        }
    }
}

impl From<&CreateConfig> for PostParams {
    fn from(cfg: &CreateConfig) -> PostParams {
        let mut params = PostParams::default();
        params.dry_run = cfg.dry_run;
        params.field_manager = cfg.field_manager.clone();
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOption {
    DryRun(bool),
    FieldManager(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateConfig {
    pub dry_run: bool,
    pub field_manager: Option<String>,
}

impl Config for UpdateConfig {
    type Option = UpdateOption;

    fn defaults() -> Self {
        Self::default()
    }

    fn set(&mut self, option: UpdateOption) {
        match option {
            UpdateOption::DryRun(dry_run) => self.dry_run = dry_run,
            UpdateOption::FieldManager(manager) => self.field_manager = Some(manager),
        }
    }
}

impl From<&UpdateConfig> for PostParams {
    fn from(cfg: &UpdateConfig) -> PostParams {
        let mut params = PostParams::default();
        params.dry_run = cfg.dry_run;
        params.field_manager = cfg.field_manager.clone();
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOption {
    /// Read at a given resource version, `None` reads the most recent one.
    ResourceVersion(Option<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetConfig {
    pub resource_version: Option<String>,
}

impl Config for GetConfig {
    type Option = GetOption;

    fn defaults() -> Self {
        Self::default()
    }

    fn set(&mut self, option: GetOption) {
        match option {
            GetOption::ResourceVersion(version) => self.resource_version = version,
        }
    }
}

impl From<&GetConfig> for GetParams {
    fn from(cfg: &GetConfig) -> GetParams {
        let mut params = GetParams::default();
        params.resource_version = cfg.resource_version.clone();
        params
    }
}

pub enum ListOption<K> {
    FieldSelector(BTreeMap<String, String>),
    LabelSelector(BTreeMap<String, String>),
    Filters(Vec<Predicate<K>>),
}

impl<K> Clone for ListOption<K> {
    fn clone(&self) -> Self {
        match self {
            ListOption::FieldSelector(selector) => ListOption::FieldSelector(selector.clone()),
            ListOption::LabelSelector(selector) => ListOption::LabelSelector(selector.clone()),
            ListOption::Filters(filters) => ListOption::Filters(filters.clone()),
        }
    }
}

impl<K> fmt::Debug for ListOption<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListOption::FieldSelector(selector) => {
                f.debug_tuple("FieldSelector").field(selector).finish()
            }
            ListOption::LabelSelector(selector) => {
                f.debug_tuple("LabelSelector").field(selector).finish()
            }
            ListOption::Filters(filters) => f.debug_tuple("Filters").field(&filters.len()).finish(),
        }
    }
}

pub struct ListConfig<K> {
    pub field_selector: Option<BTreeMap<String, String>>,
    pub label_selector: Option<BTreeMap<String, String>>,
    pub filters: Vec<Predicate<K>>,
}

impl<K> Clone for ListConfig<K> {
    fn clone(&self) -> Self {
        Self {
            field_selector: self.field_selector.clone(),
            label_selector: self.label_selector.clone(),
            filters: self.filters.clone(),
        }
    }
}

impl<K> fmt::Debug for ListConfig<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListConfig")
            .field("field_selector", &self.field_selector)
            .field("label_selector", &self.label_selector)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl<K> Config for ListConfig<K> {
    type Option = ListOption<K>;

    fn defaults() -> Self {
        Self {
            field_selector: None,
            label_selector: None,
            filters: Vec::new(),
        }
    }

    fn set(&mut self, option: ListOption<K>) {
        match option {
            ListOption::FieldSelector(selector) => self.field_selector = Some(selector),
            ListOption::LabelSelector(selector) => self.label_selector = Some(selector),
            ListOption::Filters(filters) => self.filters = filters,
        }
    }
}

impl<K> From<&ListConfig<K>> for ListParams {
    fn from(cfg: &ListConfig<K>) -> ListParams {
        let mut params = ListParams::default();

        if let Some(selector) = &cfg.field_selector {
            params = params.fields(&format_selector(selector));
        }

        if let Some(selector) = &cfg.label_selector {
            params = params.labels(&format_selector(selector));
        }

        params
    }
}

pub fn format_selector(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOption {
    /// Block until dependents are deleted.
    ForegroundDeletion(bool),
    /// Delete with a zero grace period.
    DeleteImmediately(bool),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteConfig {
    pub foreground_deletion: bool,
    pub delete_immediately: bool,
}

impl Config for DeleteConfig {
    type Option = DeleteOption;

    fn defaults() -> Self {
        Self::default()
    }

    fn set(&mut self, option: DeleteOption) {
        match option {
            DeleteOption::ForegroundDeletion(v) => self.foreground_deletion = v,
            DeleteOption::DeleteImmediately(v) => self.delete_immediately = v,
        }
    }
}

impl From<&DeleteConfig> for DeleteParams {
    fn from(cfg: &DeleteConfig) -> DeleteParams {
        let mut params = DeleteParams::default();

        if cfg.foreground_deletion {
            params.propagation_policy = Some(PropagationPolicy::Foreground);
        }

        if cfg.delete_immediately {
            params.grace_period_seconds = Some(0);
        }

        params
    }
}
