pub mod builds;
pub mod client;
pub mod crd;
pub mod error;
pub mod options;
pub mod predicate;
pub mod resources;
pub mod retry;
pub mod routes;
pub mod sources;
pub mod store;

pub use client::Client;
pub use error::{Error, Result};
pub use options::{
    Config, CreateOption, DeleteOption, GetOption, ListOption, UpdateOption,
};
pub use predicate::{Mutator, MutatorList, Predicate};
pub use store::Store;
