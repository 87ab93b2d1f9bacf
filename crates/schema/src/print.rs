//! SDL rendering. Output order follows the document: generated types first,
//! then the `Query` and `Mutation` roots.

use crate::ast::{FieldDef, InputObjectTypeDef, ObjectTypeDef, SchemaDocument, TypeDef};

#[must_use]
pub fn print_sdl(document: &SchemaDocument) -> String {
    let mut out = String::new();
    for type_def in &document.types {
        match type_def {
            TypeDef::Object(object) => print_object(&mut out, object),
            TypeDef::Input(input) => print_input(&mut out, input),
        }
        out.push('\n');
    }
    if !document.query_fields.is_empty() {
        out.push_str("type Query {\n");
        for field in &document.query_fields {
            print_field(&mut out, field);
        }
        out.push_str("}\n\n");
    }
    if !document.mutation_fields.is_empty() {
        out.push_str("type Mutation {\n");
        for field in &document.mutation_fields {
            print_field(&mut out, field);
        }
        out.push_str("}\n\n");
    }
    while out.ends_with('\n') {
        out.pop();
    }
    out.push('\n');
    out
}

fn print_object(out: &mut String, object: &ObjectTypeDef) {
    if let Some(description) = &object.description {
        out.push_str("\"\"\"");
        out.push_str(description);
        out.push_str("\"\"\"\n");
    }
    out.push_str("type ");
    out.push_str(&object.name);
    out.push_str(" {\n");
    for field in &object.fields {
        print_field(out, field);
    }
    out.push_str("}\n");
}

fn print_input(out: &mut String, input: &InputObjectTypeDef) {
    out.push_str("input ");
    out.push_str(&input.name);
    out.push_str(" {\n");
    for field in &input.fields {
        out.push_str("  ");
        out.push_str(&field.name);
        out.push_str(": ");
        out.push_str(&field.type_ref.to_string());
        out.push('\n');
    }
    out.push_str("}\n");
}

fn print_field(out: &mut String, field: &FieldDef) {
    out.push_str("  ");
    out.push_str(&field.name);
    if !field.args.is_empty() {
        out.push('(');
        for (index, arg) in field.args.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            out.push_str(&arg.name);
            out.push_str(": ");
            out.push_str(&arg.type_ref.to_string());
        }
        out.push(')');
    }
    out.push_str(": ");
    out.push_str(&field.type_ref.to_string());
    out.push('\n');
}
