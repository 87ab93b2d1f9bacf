//! GraphQL schema generation for a list registry: per-list type fragments
//! derived from field sets and frozen access tables, assembled into a
//! per-variant document and printable as SDL.

pub mod ast;

mod build;
mod print;

pub use ast::{
    FieldDef, InputObjectTypeDef, InputValueDef, ObjectTypeDef, SchemaDocument, TypeDef, TypeRef,
};
pub use build::build_schema;
pub use print::print_sdl;
