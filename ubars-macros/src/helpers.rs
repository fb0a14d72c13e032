use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, ReturnType, Type, Visibility, parse_macro_input};

pub fn helpers_impl(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[helpers] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let item = parse_macro_input!(input as ItemImpl);
    match expand(item) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(mut item: ItemImpl) -> syn::Result<proc_macro2::TokenStream> {
    if item.trait_.is_some() {
        return Err(syn::Error::new_spanned(
            &item.self_ty,
            "#[helpers] must be placed on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[helpers] does not support generic impl blocks",
        ));
    }

    let self_ty = item.self_ty.clone();
    let mut entries = Vec::new();
    for impl_item in item.items.iter_mut() {
        let ImplItem::Fn(func) = impl_item else {
            continue;
        };
        let name = take_helper_name(func)?;
        if !matches!(func.vis, Visibility::Public(_)) || func.sig.receiver().is_some() {
            continue;
        }
        entries.push(helper_entry(&self_ty, func, name)?);
    }

    Ok(quote! {
        #item

        impl ::ubars::HelperSource for #self_ty {
            fn helpers() -> ::std::vec::Vec<(&'static str, ::std::sync::Arc<dyn ::ubars::Helper>)> {
                ::std::vec![
                    #(#entries),*
                ]
            }
        }
    })
}

/// Removes a `#[helper("name")]` attribute and returns the helper name.
fn take_helper_name(func: &mut ImplItemFn) -> syn::Result<String> {
    let mut name = func.sig.ident.to_string();
    let mut error = None;
    func.attrs.retain(|attr| {
        if !attr.path().is_ident("helper") {
            return true;
        }
        match attr.parse_args::<LitStr>() {
            Ok(lit) => name = lit.value(),
            Err(e) => error = Some(e),
        }
        false
    });
    match error {
        Some(e) => Err(e),
        None => Ok(name),
    }
}

fn helper_entry(
    self_ty: &Type,
    func: &ImplItemFn,
    name: String,
) -> syn::Result<proc_macro2::TokenStream> {
    let method = &func.sig.ident;
    let wrapper = format_ident!("__ubars_helper_{}", method);

    let mut conversions = Vec::new();
    let mut call_args = Vec::new();
    let mut position = 0usize;
    for arg in func.sig.inputs.iter() {
        let FnArg::Typed(pat) = arg else {
            continue;
        };
        let ty = &*pat.ty;
        if is_options_ref(ty) {
            call_args.push(quote! { options });
            continue;
        }
        if let Type::Reference(_) = ty {
            return Err(syn::Error::new_spanned(
                ty,
                "helper arguments must be owned types (or `&Options`)",
            ));
        }

        let var = format_ident!("__arg{}", position);
        let index = position;
        let label = position + 1;
        conversions.push(quote! {
            let #var = <#ty as ::ubars::FromValue>::from_value(
                params.get(#index).cloned().unwrap_or(::ubars::Value::Null),
            )
            .map_err(|e| ::ubars::TemplateError::Helper(
                ::std::format!("{}: argument {}: {}", #name, #label, e),
            ))?;
        });
        call_args.push(quote! { #var });
        position += 1;
    }

    let call = if returns_result(&func.sig.output) {
        quote! { <#self_ty>::#method(#(#call_args),*)? }
    } else {
        quote! { <#self_ty>::#method(#(#call_args),*) }
    };

    Ok(quote! {
        {
            #[allow(non_snake_case, unused_variables)]
            fn #wrapper(
                params: &[::ubars::Value],
                options: &::ubars::Options<'_>,
            ) -> ::ubars::Result<::ubars::Value> {
                #(#conversions)*
                let result = #call;
                ::std::result::Result::Ok(::ubars::ToValue::to_value(&result))
            }
            (#name, ::std::sync::Arc::new(#wrapper) as ::std::sync::Arc<dyn ::ubars::Helper>)
        }
    })
}

fn is_options_ref(ty: &Type) -> bool {
    let Type::Reference(reference) = ty else {
        return false;
    };
    matches!(&*reference.elem, Type::Path(p)
        if p.path.segments.last().is_some_and(|s| s.ident == "Options"))
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => matches!(&**ty, Type::Path(p)
            if p.path.segments.last().is_some_and(|s| s.ident == "Result")),
    }
}
