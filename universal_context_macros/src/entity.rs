use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, Type};

struct Column {
    ident: Ident,
    ty: Type,
    wire_name: String,
    key: bool,
}

#[derive(Default)]
struct FieldAttrs {
    key: bool,
    skip: bool,
    rename: Option<String>,
}

pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity derive does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Entity derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Entity derive only supports structs",
            ))
        }
    };

    let set_name = extract_set_name(input)?;
    let rename_all = extract_rename_all(input)?;

    let mut columns = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let raw_name = ident.to_string();
        let raw_name = raw_name.trim_start_matches("r#").to_string();
        let wire_name = attrs
            .rename
            .unwrap_or_else(|| apply_rename_all(&raw_name, rename_all.as_deref()));

        columns.push(Column {
            ident,
            ty: field.ty.clone(),
            wire_name,
            key: attrs.key,
        });
    }

    // Default key: a field named `id`
    if !columns.iter().any(|c| c.key) {
        match columns.iter_mut().find(|c| c.ident == "id") {
            Some(column) => column.key = true,
            None => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Entity derive: no field marked with #[entity(key)] and no field named `id`",
                ))
            }
        }
    }

    let key_names: Vec<_> = columns
        .iter()
        .filter(|c| c.key)
        .map(|c| c.wire_name.as_str())
        .collect();

    let mut accessors = Vec::new();
    let mut entries = Vec::new();
    for column in &columns {
        let ident = &column.ident;
        let ty = &column.ty;
        let wire_name = &column.wire_name;
        let plain = ident.to_string();
        let plain = plain.trim_start_matches("r#");
        let getter = format_ident!("__get_{}", plain);
        let setter = format_ident!("__set_{}", plain);

        accessors.push(quote! {
            fn #getter(
                entity: &#name,
            ) -> ::std::result::Result<::universal_context::Value, ::universal_context::ConversionError> {
                ::universal_context::convert::to_value(&entity.#ident)
            }

            fn #setter(
                entity: &mut #name,
                value: ::universal_context::Value,
            ) -> ::std::result::Result<(), ::universal_context::ConversionError> {
                entity.#ident = ::universal_context::convert::convert::<#ty>(value)?;
                Ok(())
            }
        });

        entries.push(quote! {
            ::universal_context::Field::new(
                #wire_name,
                #getter,
                #setter,
                ::universal_context::convert::normalize::<#ty>,
            )
        });
    }

    Ok(quote! {
        impl ::universal_context::Entity for #name {
            const SET: &'static str = #set_name;
            const KEYS: &'static [&'static str] = &[#(#key_names),*];

            fn fields() -> &'static [::universal_context::Field<Self>] {
                #(#accessors)*

                static FIELDS: &[::universal_context::Field<#name>] = &[#(#entries),*];
                FIELDS
            }
        }
    })
}

fn extract_set_name(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        let mut set = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("set") {
                let value: LitStr = meta.value()?.parse()?;
                set = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported entity attribute, expected `set = \"...\"`"))
            }
        })?;

        if let Some(set) = set {
            return Ok(set);
        }
    }

    // Default: struct name + "s"
    Ok(format!("{}s", input.ident))
}

fn extract_rename_all(input: &DeriveInput) -> syn::Result<Option<String>> {
    let mut rename_all = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(syn::Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rename_all = Some(value.value());
                Ok(())
            } else {
                skip_meta(&meta)
            }
        })?;
    }
    Ok(rename_all)
}

fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("key") {
                    parsed.key = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    parsed.skip = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported entity field attribute, expected `key` or `skip`"))
                }
            })?;
        } else if attr.path().is_ident("serde") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    parsed.skip = true;
                    Ok(())
                } else if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                    let value: LitStr = meta.value()?.parse()?;
                    parsed.rename = Some(value.value());
                    Ok(())
                } else {
                    skip_meta(&meta)
                }
            })?;
        }
    }

    Ok(parsed)
}

/// Consume a serde meta item this derive does not care about.
fn skip_meta(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: TokenStream2 = content.parse()?;
    }
    Ok(())
}

/// Apply a serde `rename_all` rule to a snake_case field name.
fn apply_rename_all(field: &str, rule: Option<&str>) -> String {
    match rule {
        Some("lowercase") => field.to_ascii_lowercase(),
        Some("UPPERCASE") | Some("SCREAMING_SNAKE_CASE") => field.to_ascii_uppercase(),
        Some("PascalCase") => to_pascal_case(field),
        Some("camelCase") => {
            let pascal = to_pascal_case(field);
            let mut chars = pascal.chars();
            match chars.next() {
                Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                None => pascal,
            }
        }
        Some("kebab-case") => field.replace('_', "-"),
        Some("SCREAMING-KEBAB-CASE") => field.replace('_', "-").to_ascii_uppercase(),
        _ => field.to_string(),
    }
}

fn to_pascal_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize = true;
    for ch in s.chars() {
        if ch == '_' {
            capitalize = true;
        } else if capitalize {
            result.push(ch.to_ascii_uppercase());
            capitalize = false;
        } else {
            result.push(ch);
        }
    }
    result
}
