use crate::resolver::ResolverChain;
use crate::value::{ToValue, Value};
use std::collections::HashMap;

/// The data a template is rendered against.
///
/// Holds the model, optional extra top-level values and an optional resolver
/// chain that overrides the engine's.
///
/// ```
/// use ubars::Context;
///
/// let context = Context::builder(&"Title")
///     .combine("time", &10)
///     .build();
/// assert_eq!(context.model().to_string(), "Title");
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    model: Value,
    extras: Option<Value>,
    resolvers: Option<ResolverChain>,
}

impl Context {
    pub fn new(model: &impl ToValue) -> Self {
        Self::builder(model).build()
    }

    pub fn builder(model: &impl ToValue) -> ContextBuilder {
        ContextBuilder {
            model: model.to_value(),
            extras: HashMap::new(),
            resolvers: None,
        }
    }

    pub fn model(&self) -> &Value {
        &self.model
    }

    pub(crate) fn extras(&self) -> Option<&Value> {
        self.extras.as_ref()
    }

    pub(crate) fn resolvers(&self) -> Option<&ResolverChain> {
        self.resolvers.as_ref()
    }
}

#[derive(Debug)]
pub struct ContextBuilder {
    model: Value,
    extras: HashMap<String, Value>,
    resolvers: Option<ResolverChain>,
}

impl ContextBuilder {
    /// Adds a top-level value visible behind the model: names the model
    /// resolves take precedence.
    pub fn combine(mut self, name: &str, value: &impl ToValue) -> Self {
        self.extras.insert(name.to_string(), value.to_value());
        self
    }

    /// Resolves paths with `chain` instead of the engine's chain.
    pub fn resolver(mut self, chain: ResolverChain) -> Self {
        self.resolvers = Some(chain);
        self
    }

    pub fn build(self) -> Context {
        Context {
            model: self.model,
            extras: (!self.extras.is_empty()).then_some(Value::Map(self.extras)),
            resolvers: self.resolvers,
        }
    }
}
