extern crate self as ubars;

pub mod assets;
pub mod context;
pub mod error;
pub mod handlebars;
pub mod helper;
pub mod loader;
pub mod resolver;
pub mod template;
pub(crate) mod tpl;
pub mod value;

pub use context::{Context, ContextBuilder};
pub use error::TemplateError;
pub use handlebars::Handlebars;
pub use helper::{Helper, HelperRegistry, HelperSource, Options};
pub use loader::{AssetSource, FileSource, Location, MemorySource, TemplateSource};
pub use resolver::{
    AccessorResolver, FieldResolver, MapResolver, MethodResolver, ResolverChain, ValueResolver,
};
pub use template::Template;
pub use tpl::escape::escape_html;
pub use value::{FromValue, Record, ToValue, Value};

#[doc(hidden)]
pub use ctor;
pub use ubars_macros::{Record, helpers, template_assets};

pub type Result<T> = std::result::Result<T, TemplateError>;
