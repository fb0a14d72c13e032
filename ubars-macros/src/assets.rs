use glob::glob;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use std::collections::hash_map::DefaultHasher;
use std::env;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{LitStr, Token};

pub fn template_assets_impl(input: TokenStream) -> TokenStream {
    let args = match Punctuated::<LitStr, Token![,]>::parse_terminated.parse(input) {
        Ok(args) => args,
        Err(e) => return e.to_compile_error().into(),
    };
    let args: Vec<LitStr> = args.into_iter().collect();
    let (root_lit, pattern) = match args.as_slice() {
        [pattern] => (None, pattern.clone()),
        [root, pattern] => (Some(root.value()), pattern.clone()),
        _ => {
            return syn::Error::new(
                proc_macro2::Span::call_site(),
                "expected `template_assets!(\"root\", \"pattern\")` or `template_assets!(\"pattern\")`",
            )
            .to_compile_error()
            .into();
        }
    };
    let pattern_str = pattern.value();

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            return syn::Error::new(pattern.span(), "CARGO_MANIFEST_DIR is not set")
                .to_compile_error()
                .into();
        }
    };
    let root = match &root_lit {
        Some(r) => manifest_dir.join(r),
        None => manifest_dir,
    };

    let full_pattern = root.join(&pattern_str);
    let files: Vec<PathBuf> = match glob(&full_pattern.to_string_lossy()) {
        Ok(paths) => paths
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            return syn::Error::new(pattern.span(), format!("Invalid glob pattern: {}", e))
                .to_compile_error()
                .into();
        }
    };

    let assets: Vec<_> = files
        .iter()
        .map(|path| {
            let key = asset_key(&root, path);
            let file = path.to_string_lossy().to_string();
            quote! {
                (#key, include_str!(#file))
            }
        })
        .collect();

    // One registration fn per (root, pattern) so the macro can be used several times.
    let mut hasher = DefaultHasher::new();
    root_lit.hash(&mut hasher);
    pattern_str.hash(&mut hasher);
    let fn_name = format_ident!("__ubars_register_template_assets_{}", hasher.finish());

    let output = quote! {
        #[ubars::ctor::ctor]
        fn #fn_name() {
            let assets: ::std::vec::Vec<(&str, &str)> = vec![
                #(#assets),*
            ];
            // Keys are produced above and never empty, so this cannot fail.
            let _ = ubars::assets::load_assets(assets);
        }
    };

    output.into()
}

fn asset_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", parts.join("/"))
}
