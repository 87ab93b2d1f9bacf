//! The list engine: turns a `ListConfig` into a runtime `List` with derived
//! GraphQL names, an initialized field set, frozen access tables, an
//! access-controlled query executor and the multi-phase mutation pipeline.

pub mod access;
pub mod fields;
pub mod mutation;
pub mod naming;
pub mod query;

mod list;

pub use access::{FieldCheck, ListAccessTable};
pub use fields::{Field, FieldSet};
pub use list::{AdminFieldMeta, AdminMeta, List, ListRegistry};
pub use mutation::MutationState;
pub use naming::{GqlNames, ListNames};
