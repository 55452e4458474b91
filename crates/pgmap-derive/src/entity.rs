//! Entity derive macro implementation.

mod attrs;

use crate::syn_types::{last_ident, option_inner, vec_inner};
use attrs::{FieldAttr, HasManyAttr, get_field_attr, get_table_name};
use heck::{ToShoutySnakeCase, ToUpperCamelCase};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Result};

struct ColumnField {
    ident: syn::Ident,
    ty: syn::Type,
    column: String,
    sql_type: TokenStream,
    is_id: bool,
    has_default: bool,
}

struct RelationField {
    ident: syn::Ident,
    ty: syn::Type,
    child: syn::Type,
    attr: HasManyAttr,
}

/// Map a Rust field type to a `pgmap::SqlType` variant name by its last path
/// segment, looking through `Option<_>`.
fn infer_sql_type(ty: &syn::Type) -> Option<&'static str> {
    let ty = option_inner(ty).unwrap_or(ty);
    let variant = match last_ident(ty)?.as_str() {
        "i32" => "Integer",
        "i64" => "BigInt",
        "f64" => "Double",
        "String" => "Text",
        "bool" => "Boolean",
        "NaiveDateTime" => "Timestamp",
        "DateTime" => "TimestampTz",
        "Uuid" => "Uuid",
        _ => return None,
    };
    Some(variant)
}

fn parse_sql_type(lit: &syn::LitStr) -> Result<&'static str> {
    let variant = match lit.value().to_ascii_lowercase().as_str() {
        "integer" | "int" | "int4" => "Integer",
        "bigint" | "int8" => "BigInt",
        "double" | "double precision" | "float8" => "Double",
        "text" => "Text",
        "varchar" | "character varying" => "Varchar",
        "boolean" | "bool" => "Boolean",
        "timestamp" => "Timestamp",
        "timestamptz" => "TimestampTz",
        "uuid" => "Uuid",
        _ => {
            return Err(syn::Error::new(
                lit.span(),
                "unsupported sql_type; expected integer, bigint, double, text, varchar, \
                 boolean, timestamp, timestamptz or uuid",
            ));
        }
    };
    Ok(variant)
}

fn column_field(field: &syn::Field, ident: &syn::Ident, attr: FieldAttr) -> Result<ColumnField> {
    let variant = match &attr.sql_type {
        Some(lit) => parse_sql_type(lit)?,
        None => infer_sql_type(&field.ty).ok_or_else(|| {
            syn::Error::new_spanned(
                &field.ty,
                "unsupported column type; expected i32, i64, f64, String, bool, \
                 NaiveDateTime, DateTime<Utc> or Uuid (optionally in Option<_>)",
            )
        })?,
    };
    let variant = format_ident!("{}", variant);
    Ok(ColumnField {
        ident: ident.clone(),
        ty: field.ty.clone(),
        column: attr.column.unwrap_or_else(|| ident.to_string()),
        sql_type: quote! { ::pgmap::SqlType::#variant },
        is_id: attr.is_id,
        has_default: attr.has_default,
    })
}

fn relation_field(
    field: &syn::Field,
    ident: &syn::Ident,
    attr: HasManyAttr,
) -> Result<RelationField> {
    let child = option_inner(&field.ty)
        .and_then(vec_inner)
        .ok_or_else(|| {
            syn::Error::new_spanned(&field.ty, "has_many field must be Option<Vec<Child>>")
        })?;
    Ok(RelationField {
        ident: ident.clone(),
        ty: field.ty.clone(),
        child: child.clone(),
        attr,
    })
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let table_name = get_table_name(&input)?;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let mut columns: Vec<ColumnField> = Vec::new();
    let mut relations: Vec<RelationField> = Vec::new();
    for field in fields {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let mut attr = get_field_attr(field)?;
        if attr.skip {
            continue;
        }
        match attr.has_many.take() {
            Some(has_many) => relations.push(relation_field(field, ident, has_many)?),
            None => columns.push(column_field(field, ident, attr)?),
        }
    }

    let primary_key: Vec<&str> = columns
        .iter()
        .filter(|c| c.is_id)
        .map(|c| c.column.as_str())
        .collect();
    if primary_key.is_empty() {
        return Err(syn::Error::new_spanned(
            &input,
            "Entity requires at least one #[orm(id)] field",
        ));
    }

    let all: Vec<&str> = columns.iter().map(|c| c.column.as_str()).collect();
    let with_default: Vec<&str> = columns
        .iter()
        .filter(|c| c.has_default)
        .map(|c| c.column.as_str())
        .collect();
    let without_default: Vec<&str> = columns
        .iter()
        .filter(|c| !c.has_default)
        .map(|c| c.column.as_str())
        .collect();
    let types = columns.iter().map(|c| {
        let column = &c.column;
        let sql_type = &c.sql_type;
        quote! { (#column, #sql_type) }
    });

    let column_count = columns.len();
    let column_entries = columns.iter().map(|c| {
        let ident = &c.ident;
        let ty = &c.ty;
        let column = &c.column;
        quote! {
            ::pgmap::Column {
                name: #column,
                get: |entity: &#name| -> ::pgmap::Value {
                    ::pgmap::Value::from(::core::clone::Clone::clone(&entity.#ident))
                },
                set: |entity: &mut #name, value: ::pgmap::Value| -> ::pgmap::OrmResult<()> {
                    entity.#ident = <#ty as ::pgmap::FromValue>::from_value(value)
                        .map_err(|message| ::pgmap::OrmError::decode(#column, message))?;
                    ::core::result::Result::Ok(())
                },
            }
        }
    });

    let mut relation_consts = Vec::new();
    let mut relation_refs = Vec::new();
    for relation in &relations {
        let field_ident = &relation.ident;
        let field_ty = &relation.ty;
        let child = &relation.child;
        let field_name = field_ident.to_string();

        let local_key = match &relation.attr.local_key {
            Some(key) => key.clone(),
            None if primary_key.len() == 1 => primary_key[0].to_string(),
            None => {
                return Err(syn::Error::new_spanned(
                    field_ident,
                    "has_many on a composite primary key requires local_key = \"...\"",
                ));
            }
        };
        if !all.contains(&local_key.as_str()) {
            return Err(syn::Error::new_spanned(
                field_ident,
                format!("local_key '{local_key}' is not a column of {table_name}"),
            ));
        }
        let relation_name = relation
            .attr
            .name
            .clone()
            .unwrap_or_else(|| field_name.to_upper_camel_case());
        let foreign_key = &relation.attr.foreign_key;
        let model = &relation.attr.model;
        let model_ident = model.segments.last().map(|s| s.ident.to_string());
        if model_ident != last_ident(child) {
            return Err(syn::Error::new_spanned(
                model,
                "has_many model does not match the Option<Vec<_>> element type",
            ));
        }

        let const_ident = format_ident!("{}", field_name.to_shouty_snake_case());
        let slot_fn = format_ident!("__pgmap_slot_{}", field_ident);
        let select_fn = format_ident!("select_{}", field_ident);
        let const_doc =
            format!("The `{relation_name}` relation: `{field_name}` by `{foreign_key}`.");
        let select_doc =
            format!("Query the `{field_name}` of this row, independent of any eager load.");

        relation_consts.push(quote! {
            #[doc(hidden)]
            fn #slot_fn(entity: &mut #name) -> &mut #field_ty {
                &mut entity.#field_ident
            }

            #[doc = #const_doc]
            pub const #const_ident: ::pgmap::HasMany<#name, #child> = ::pgmap::HasMany::new(
                #relation_name,
                #local_key,
                #foreign_key,
                #name::#slot_fn,
            );

            #[doc = #select_doc]
            pub fn #select_fn(&self) -> ::pgmap::Query<#child> {
                #name::#const_ident.query_for(self)
            }
        });
        relation_refs.push(quote! { &#name::#const_ident });
    }

    let relation_count = relation_refs.len();
    let relations_fn = if relations.is_empty() {
        quote! {}
    } else {
        quote! {
            fn relations() -> &'static [&'static dyn ::pgmap::Relation<Self>] {
                static RELATIONS: [&'static dyn ::pgmap::Relation<#name>; #relation_count] =
                    [#(#relation_refs),*];
                &RELATIONS
            }
        }
    };

    let inherent = if relation_consts.is_empty() {
        quote! {}
    } else {
        quote! {
            impl #name {
                #(#relation_consts)*
            }
        }
    };

    Ok(quote! {
        impl ::pgmap::Entity for #name {
            fn schema() -> &'static ::pgmap::TableSchema {
                static SCHEMA: ::pgmap::TableSchema = ::pgmap::TableSchema {
                    table: #table_name,
                    all: &[#(#all),*],
                    primary_key: &[#(#primary_key),*],
                    with_default: &[#(#with_default),*],
                    without_default: &[#(#without_default),*],
                    types: &[#(#types),*],
                };
                &SCHEMA
            }

            fn columns() -> &'static [::pgmap::Column<Self>] {
                static COLUMNS: [::pgmap::Column<#name>; #column_count] = [#(#column_entries),*];
                &COLUMNS
            }

            #relations_fn
        }

        #inherent
    })
}
