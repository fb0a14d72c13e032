use crate::Result;
use crate::error::TemplateError;
use crate::helper::{Helper, HelperRegistry, HelperSource, Options};
use crate::loader::{AssetSource, TemplateSource};
use crate::resolver::ResolverChain;
use crate::template::Template;
use crate::tpl::ast::Node;
use crate::tpl::cache::{self, AstCache};
use crate::value::Value;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Shared state behind every [`Handlebars`] handle and the templates it compiled.
///
/// Helpers and the AST cache stay shared when a handle detaches to change its
/// resolver chain, so templates compiled earlier still see later registrations.
#[derive(Clone)]
pub(crate) struct Engine {
    pub(crate) helpers: Arc<HelperRegistry>,
    pub(crate) resolvers: ResolverChain,
    source: Option<Arc<dyn TemplateSource>>,
    cache: Arc<AstCache>,
}

impl Engine {
    fn new(source: Option<Arc<dyn TemplateSource>>) -> Self {
        Self {
            helpers: Arc::new(HelperRegistry::new()),
            resolvers: ResolverChain::default(),
            source,
            cache: Arc::new(AstCache::new()),
        }
    }

    /// Returns the parsed template `name`, reading it from the source on first use.
    pub(crate) fn load(&self, name: &str) -> Result<Arc<Vec<Node>>> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| TemplateError::NotFound(format!("{} (no template source)", name)))?;
        self.cache.get_or_parse(name, || {
            debug!("Loading template '{}'", name);
            source.resolve(name)
        })
    }
}

/// The template engine: configuration, helper registry and compiler.
///
/// Cloning is cheap and clones share helpers and the template cache. The
/// `with_*` builder methods detach the resolver configuration of the handle
/// they are called on; helpers and the cache remain shared with its clones
/// and with every template compiled before.
///
/// ```
/// use ubars::Handlebars;
///
/// let handlebars = Handlebars::new();
/// let template = handlebars.compile_inline("Hello {{this}}!").unwrap();
/// assert_eq!(template.apply(&"Handlebars.rs").unwrap(), "Hello Handlebars.rs!");
/// ```
#[derive(Clone)]
pub struct Handlebars {
    engine: Arc<Engine>,
}

impl Default for Handlebars {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Handlebars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlebars")
            .field("helpers", &self.engine.helpers.len())
            .field("resolvers", &self.engine.resolvers)
            .field("has_source", &self.engine.source.is_some())
            .field("cached", &self.engine.cache.len())
            .finish()
    }
}

impl Handlebars {
    /// An engine reading named templates from the embedded asset store
    /// (prefix `/`, suffix `.hbs`).
    pub fn new() -> Self {
        Self::with_source(AssetSource::new())
    }

    pub fn with_source(source: impl TemplateSource + 'static) -> Self {
        Self {
            engine: Arc::new(Engine::new(Some(Arc::new(source)))),
        }
    }

    /// An engine that only compiles inline text; named templates and partials
    /// fail with [`TemplateError::NotFound`].
    pub fn without_source() -> Self {
        Self {
            engine: Arc::new(Engine::new(None)),
        }
    }

    /// Replaces the resolver chain used when a context does not bring its own.
    ///
    /// Templates compiled before keep the chain they were compiled with.
    pub fn with_resolvers(mut self, chain: ResolverChain) -> Self {
        Arc::make_mut(&mut self.engine).resolvers = chain;
        self
    }

    /// Compiles template text. The result is not cached.
    pub fn compile_inline(&self, text: &str) -> Result<Template> {
        let nodes = cache::parse("inline", text)?;
        Ok(Template::new("inline", Arc::new(nodes), self.engine.clone()))
    }

    /// Compiles the template `name` from the configured source.
    pub fn compile(&self, name: &str) -> Result<Template> {
        let nodes = self.engine.load(name)?;
        Ok(Template::new(name, nodes, self.engine.clone()))
    }

    /// Registers a closure helper, replacing any helper with the same name.
    ///
    /// ```
    /// use ubars::{Handlebars, Value};
    ///
    /// let handlebars = Handlebars::without_source();
    /// handlebars.register_helper("hello", |params, _| {
    ///     Ok(Value::Str(format!("hello {}", params[0])))
    /// });
    /// let template = handlebars.compile_inline("{{hello this}}").unwrap();
    /// assert_eq!(template.apply(&"world").unwrap(), "hello world");
    /// ```
    pub fn register_helper<F>(&self, name: &str, helper: F)
    where
        F: Fn(&[Value], &Options<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.engine.helpers.register(name, Arc::new(helper));
    }

    pub fn register(&self, name: &str, helper: impl Helper + 'static) {
        self.engine.helpers.register(name, Arc::new(helper));
    }

    /// Registers every helper of a `#[helpers]` impl block.
    pub fn register_helpers<T: HelperSource>(&self) {
        let helpers = T::helpers();
        debug!("Registering {} helper(s)", helpers.len());
        for (name, helper) in helpers {
            self.engine.helpers.register(name, helper);
        }
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.engine.helpers
    }

    pub fn resolvers(&self) -> &ResolverChain {
        &self.engine.resolvers
    }

    /// Drops all parsed named templates; the next use re-reads the source.
    pub fn clear_cache(&self) {
        self.engine.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemorySource;

    #[test]
    fn test_compile_named_is_cached() {
        let handlebars = Handlebars::with_source(MemorySource::new().with("page", "{{title}}"));
        handlebars.compile("page").unwrap();
        handlebars.compile("page").unwrap();
        assert_eq!(handlebars.engine.cache.len(), 1);

        handlebars.clear_cache();
        assert_eq!(handlebars.engine.cache.len(), 0);
    }

    #[test]
    fn test_without_source() {
        let handlebars = Handlebars::without_source();
        let err = handlebars.compile("page").unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
    }

    #[test]
    fn test_with_resolvers_detaches_shared_engine() {
        let shared = Handlebars::without_source();
        let other = shared.clone().with_resolvers(ResolverChain::new());
        assert_eq!(shared.resolvers().len(), 4);
        assert!(other.resolvers().is_empty());
    }

    #[test]
    fn test_with_resolvers_keeps_helpers_shared() {
        let handlebars = Handlebars::without_source();
        let template = handlebars.compile_inline("{{later 1}}").unwrap();

        let handlebars = handlebars.with_resolvers(ResolverChain::default());
        handlebars.register_helper("later", |_, _| Ok(Value::Str("now".to_string())));

        assert_eq!(template.apply(&()).unwrap(), "now");
    }
}
