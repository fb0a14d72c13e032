mod assets;
mod helpers;
mod record;

use proc_macro::TokenStream;

/// Embeds template files at compile time and registers them in the asset
/// store before `main` runs.
///
/// `template_assets!("tests/resources", "templates/**/*.hbs")` registers each
/// matching file under its path relative to the root, e.g.
/// `/templates/home.hbs`. With a single argument the crate root is the root.
#[proc_macro]
pub fn template_assets(input: TokenStream) -> TokenStream {
    assets::template_assets_impl(input)
}

/// Exposes every `pub fn` without receiver of an impl block as a template
/// helper, by implementing `ubars::HelperSource` for the type.
#[proc_macro_attribute]
pub fn helpers(args: TokenStream, input: TokenStream) -> TokenStream {
    helpers::helpers_impl(args, input)
}

/// Implements `ubars::Record` and `ubars::ToValue` for a struct.
///
/// The struct must be `Clone`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record_impl(input)
}
