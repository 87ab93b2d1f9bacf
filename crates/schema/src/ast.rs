//! A minimal SDL model: enough structure to assemble object and input types
//! deterministically and print them. Only the constructs the generated
//! schema actually uses are represented.

use std::fmt;

/// A reference to a named type with its nullability wrappers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub non_null: bool,
    pub list: bool,
    pub item_non_null: bool,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> TypeRef {
        TypeRef {
            name: name.into(),
            non_null: false,
            list: false,
            item_non_null: false,
        }
    }

    pub fn non_null(name: impl Into<String>) -> TypeRef {
        TypeRef {
            non_null: true,
            ..TypeRef::named(name)
        }
    }

    /// `[Name!]!`
    pub fn list_of(name: impl Into<String>) -> TypeRef {
        TypeRef {
            name: name.into(),
            non_null: true,
            list: true,
            item_non_null: true,
        }
    }

    /// `[Name!]`
    #[must_use]
    pub fn nullable(mut self) -> TypeRef {
        self.non_null = false;
        self
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.list {
            write!(f, "[{}", self.name)?;
            if self.item_non_null {
                f.write_str("!")?;
            }
            f.write_str("]")?;
        } else {
            f.write_str(&self.name)?;
        }
        if self.non_null {
            f.write_str("!")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputValueDef {
    pub name: String,
    pub type_ref: TypeRef,
}

impl InputValueDef {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> InputValueDef {
        InputValueDef {
            name: name.into(),
            type_ref,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub args: Vec<InputValueDef>,
    pub type_ref: TypeRef,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> FieldDef {
        FieldDef {
            name: name.into(),
            args: Vec::new(),
            type_ref,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<InputValueDef>) -> FieldDef {
        self.args = args;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectTypeDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDef>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputObjectTypeDef {
    pub name: String,
    pub fields: Vec<InputValueDef>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDef {
    Object(ObjectTypeDef),
    Input(InputObjectTypeDef),
}

impl TypeDef {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Object(object) => &object.name,
            TypeDef::Input(input) => &input.name,
        }
    }
}

/// The fully-assembled schema for one variant: every generated type plus the
/// root `Query` and `Mutation` field sets, in generation order.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SchemaDocument {
    pub types: Vec<TypeDef>,
    pub query_fields: Vec<FieldDef>,
    pub mutation_fields: Vec<FieldDef>,
}
