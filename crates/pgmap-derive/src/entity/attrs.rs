//! Attribute parsing for the Entity derive macro.
//!
//! Handles struct-level `#[orm(table = "...")]` and field-level
//! `#[orm(...)]` attributes.

use proc_macro2::Span;
use syn::{DeriveInput, Result};

/// A `has_many(...)` declaration on a relation slot field.
pub(super) struct HasManyAttr {
    /// The child entity type (e.g., Movie)
    pub model: syn::Path,
    /// The foreign key column in the child table (e.g., "user_id")
    pub foreign_key: String,
    /// Relation name used by `Query::load`
    pub name: Option<String>,
    /// Parent column the foreign key points at; the primary key by default
    pub local_key: Option<String>,
}

impl syn::parse::Parse for HasManyAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let model: syn::Path = input.parse()?;

        let mut foreign_key: Option<String> = None;
        let mut name: Option<String> = None;
        let mut local_key: Option<String> = None;

        while input.peek(syn::Token![,]) {
            let _: syn::Token![,] = input.parse()?;
            if input.is_empty() {
                break;
            }

            let key: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;
            let value: syn::LitStr = input.parse()?;

            if key == "foreign_key" {
                foreign_key = Some(value.value());
            } else if key == "name" {
                name = Some(value.value());
            } else if key == "local_key" {
                local_key = Some(value.value());
            } else {
                return Err(syn::Error::new(
                    key.span(),
                    "unknown has_many option; expected foreign_key, name or local_key",
                ));
            }
        }

        let foreign_key = foreign_key.ok_or_else(|| {
            syn::Error::new(Span::call_site(), "has_many requires foreign_key = \"...\"")
        })?;

        Ok(HasManyAttr {
            model,
            foreign_key,
            name,
            local_key,
        })
    }
}

/// Parsed field-level `#[orm(...)]` options.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub is_id: bool,
    pub has_default: bool,
    pub skip: bool,
    pub column: Option<String>,
    pub sql_type: Option<syn::LitStr>,
    pub has_many: Option<HasManyAttr>,
}

impl FieldAttr {
    fn merge(&mut self, other: FieldAttr) {
        self.is_id |= other.is_id;
        self.has_default |= other.has_default;
        self.skip |= other.skip;
        if other.column.is_some() {
            self.column = other.column;
        }
        if other.sql_type.is_some() {
            self.sql_type = other.sql_type;
        }
        if other.has_many.is_some() {
            self.has_many = other.has_many;
        }
    }
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        loop {
            if input.is_empty() {
                break;
            }

            let ident: syn::Ident = input.parse()?;
            if ident == "id" {
                attr.is_id = true;
            } else if ident == "default" {
                attr.has_default = true;
            } else if ident == "skip" {
                attr.skip = true;
            } else if ident == "has_many" {
                let content;
                syn::parenthesized!(content in input);
                attr.has_many = Some(content.parse()?);
            } else if ident == "column" || ident == "sql_type" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                if ident == "column" {
                    attr.column = Some(value.value());
                } else {
                    attr.sql_type = Some(value);
                }
            } else {
                return Err(syn::Error::new(
                    ident.span(),
                    "unknown orm attribute; expected id, default, skip, column, sql_type or has_many",
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Extract table name from struct-level `#[orm(table = "...")]` attribute.
pub(super) fn get_table_name(input: &DeriveInput) -> Result<String> {
    for attr in &input.attrs {
        if attr.path().is_ident("orm")
            && let Ok(nested) = attr.parse_args::<syn::MetaNameValue>()
            && nested.path.is_ident("table")
            && let syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit),
                ..
            }) = &nested.value
        {
            return Ok(lit.value());
        }
    }
    Err(syn::Error::new_spanned(
        input,
        "Entity requires #[orm(table = \"table_name\")] attribute",
    ))
}

/// Merge every `#[orm(...)]` attribute on a field.
pub(super) fn get_field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if attr.path().is_ident("orm") {
            merged.merge(attr.parse_args::<FieldAttr>()?);
        }
    }
    Ok(merged)
}
