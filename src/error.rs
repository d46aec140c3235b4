use std::fmt;

/// Store call that failed, used to give errors some context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Get,
    List,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Delete => "delete",
        };
        f.write_str(verb)
    }
}

/// All errors a resource client can return
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // A mutator rejected the value, nothing was written
    #[error("the {kind} {name:?} failed validation: {source}")]
    Validation {
        kind: &'static str,
        name: String,
        source: anyhow::Error,
    },
    #[error("couldn't find the {kind} with the name {name:?}")]
    NotFound { kind: &'static str, name: String },
    #[error("an object with the name {name} exists, but it doesn't appear to be a {kind}")]
    NotAMember { kind: &'static str, name: String },
    // Any other error originating from the `kube-rs` crate
    #[error("couldn't {operation} the {kind} {}: {source}", .name.as_deref().unwrap_or("collection"))]
    Store {
        operation: Operation,
        kind: &'static str,
        name: Option<String>,
        source: kube::Error,
    },
}

impl Error {
    pub(crate) fn store(
        operation: Operation,
        kind: &'static str,
        name: Option<&str>,
        source: kube::Error,
    ) -> Self {
        // A 404 on create or list is about the namespace, not the object
        let names_object = matches!(
            operation,
            Operation::Get | Operation::Update | Operation::Delete
        );
        match (&source, name) {
            (kube::Error::Api(response), Some(name)) if response.code == 404 && names_object => {
                return Error::NotFound {
                    kind,
                    name: name.to_owned(),
                };
            }
            _ => {}
        }

        Error::Store {
            operation,
            kind,
            name: name.map(str::to_owned),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True when the store rejected a write because the object changed underneath it.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::Store {
                source: kube::Error::Api(response),
                ..
            } if response.code == 409
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
