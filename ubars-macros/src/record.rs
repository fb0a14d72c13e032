use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, DeriveInput, Field, Ident, LitStr, Type, parse_macro_input};

/// `isNew = is_new` maps template name `isNew` to `self.is_new()`.
struct MethodEntry {
    key: String,
    method: Ident,
}

#[derive(Default)]
struct RecordOptions {
    getters: bool,
    methods: Vec<MethodEntry>,
}

struct FieldOptions {
    key: String,
    ignore: bool,
}

pub fn derive_record_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let type_name = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        syn::Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record can only be derived for structs",
            ));
        }
    };
    let options = parse_record_attrs(&input.attrs)?;

    let mut field_arms = Vec::new();
    let mut getter_arms = Vec::new();
    for field in fields.iter() {
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(
                field,
                "Record requires named fields",
            ));
        };
        let field_opts = parse_field_attrs(field, ident)?;
        if field_opts.ignore {
            continue;
        }

        let key = &field_opts.key;
        field_arms.push(quote! {
            #key => ::std::option::Option::Some(::ubars::ToValue::to_value(&self.#ident)),
        });

        if options.getters {
            let pascal = to_pascal_case(key);
            let getter = format!("get{}", pascal);
            getter_arms.push(quote! {
                #getter => ::std::option::Option::Some(::ubars::ToValue::to_value(&self.#ident)),
            });
            if is_bool(&field.ty) {
                let is_getter = format!("is{}", pascal);
                getter_arms.push(quote! {
                    #is_getter => ::std::option::Option::Some(::ubars::ToValue::to_value(&self.#ident)),
                });
            }
        }
    }

    let method_arms = options.methods.iter().map(|entry| {
        let key = &entry.key;
        let method = &entry.method;
        quote! {
            #key => ::std::option::Option::Some(::ubars::ToValue::to_value(&self.#method())),
        }
    });

    Ok(quote! {
        impl #impl_generics ::ubars::Record for #name #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                #type_name
            }

            fn field(&self, name: &str) -> ::std::option::Option<::ubars::Value> {
                match name {
                    #(#field_arms)*
                    _ => ::std::option::Option::None,
                }
            }

            fn method(&self, name: &str) -> ::std::option::Option<::ubars::Value> {
                match name {
                    #(#method_arms)*
                    #(#getter_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl #impl_generics ::ubars::ToValue for #name #ty_generics #where_clause {
            fn to_value(&self) -> ::ubars::Value {
                ::ubars::Value::object(::std::clone::Clone::clone(self))
            }
        }
    })
}

/// Parses `#[record(getters)]` and `#[record(methods(isNew = is_new, hi))]`.
fn parse_record_attrs(attrs: &[Attribute]) -> syn::Result<RecordOptions> {
    let mut options = RecordOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("getters") {
                options.getters = true;
                Ok(())
            } else if meta.path.is_ident("methods") {
                meta.parse_nested_meta(|entry| {
                    let Some(key) = entry.path.get_ident() else {
                        return Err(entry.error("expected a method name"));
                    };
                    let method = if entry.input.peek(syn::Token![=]) {
                        entry.value()?.parse::<Ident>()?
                    } else {
                        key.clone()
                    };
                    options.methods.push(MethodEntry {
                        key: key.to_string(),
                        method,
                    });
                    Ok(())
                })
            } else {
                Err(meta.error("unsupported record attribute, expected `getters` or `methods(..)`"))
            }
        })?;
    }
    Ok(options)
}

/// Parses `#[record("name")]`, `#[record(rename = "name")]` and `#[record(ignore)]`.
fn parse_field_attrs(field: &Field, ident: &Ident) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions {
        key: ident.to_string().trim_start_matches("r#").to_string(),
        ignore: false,
    };

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("record")) {
        if let Ok(lit) = attr.parse_args::<LitStr>() {
            options.key = lit.value();
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("ignore") {
                options.ignore = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                options.key = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(meta.error("unsupported field attribute, expected `rename` or `ignore`"))
            }
        })?;
    }
    Ok(options)
}

fn is_bool(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.qself.is_none() && p.path.is_ident("bool"))
}

/// `create_time` -> `CreateTime`, `name` -> `Name`.
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
