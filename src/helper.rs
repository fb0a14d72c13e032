use crate::Result;
use crate::tpl::ast::Node;
use crate::tpl::parser::parse_path;
use crate::tpl::render::Renderer;
use crate::tpl::render_context::Frame;
use crate::value::Value;
use dashmap::DashMap;
use log::debug;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// A function callable from templates as `{{name arg ...}}` or
/// `{{#name arg ...}}...{{/name}}`.
///
/// Positional arguments arrive resolved (missing paths become [`Value::Null`]);
/// the returned value is emitted like a variable.
pub trait Helper: Send + Sync {
    fn call(&self, params: &[Value], options: &Options<'_>) -> Result<Value>;
}

impl<F> Helper for F
where
    F: Fn(&[Value], &Options<'_>) -> Result<Value> + Send + Sync,
{
    fn call(&self, params: &[Value], options: &Options<'_>) -> Result<Value> {
        self(params, options)
    }
}

/// A table of helpers registered together, usually generated by `#[helpers]`.
pub trait HelperSource {
    fn helpers() -> Vec<(&'static str, Arc<dyn Helper>)>;
}

/// Name-to-helper mapping owned by one engine instance.
///
/// Registering a name twice replaces the earlier helper.
#[derive(Clone, Default)]
pub struct HelperRegistry {
    helpers: DashMap<String, Arc<dyn Helper>>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, helper: Arc<dyn Helper>) {
        if self.helpers.insert(name.to_string(), helper).is_some() {
            debug!("Helper '{}' re-registered, previous binding replaced", name);
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Helper>> {
        self.helpers.get(name).map(|h| h.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}

/// Call-site information handed to a helper.
///
/// For block helpers it also carries the body and `{{else}}` body, which the
/// helper may render any number of times.
pub struct Options<'a> {
    name: &'a str,
    hash: HashMap<String, Value>,
    renderer: &'a Renderer<'a>,
    frame: &'a Frame<'a>,
    body: Option<&'a [Node]>,
    inverse: Option<&'a [Node]>,
    /// Subject for [`Options::render_body`]: the first argument, when present.
    body_subject: Option<Value>,
}

impl<'a> Options<'a> {
    pub(crate) fn new(
        name: &'a str,
        hash: HashMap<String, Value>,
        renderer: &'a Renderer<'a>,
        frame: &'a Frame<'a>,
        body: Option<&'a [Node]>,
        inverse: Option<&'a [Node]>,
        body_subject: Option<Value>,
    ) -> Self {
        Self {
            name,
            hash,
            renderer,
            frame,
            body,
            inverse,
            body_subject: body_subject.filter(|v| !v.is_null()),
        }
    }

    /// The helper name as written in the template.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Resolved `key=value` arguments.
    pub fn hash(&self) -> &HashMap<String, Value> {
        &self.hash
    }

    pub fn hash_value(&self, key: &str) -> Option<&Value> {
        self.hash.get(key)
    }

    /// Whether the helper was invoked in block position.
    pub fn is_block(&self) -> bool {
        self.body.is_some()
    }

    /// The subject of the current scope.
    pub fn context(&self) -> &Value {
        self.frame.subject()
    }

    /// Resolves a path (`a.b`, `this`, `@index`) in the caller's scope.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let path = parse_path(path)?;
        self.frame
            .lookup(&path, self.renderer.resolvers())
            .map(Cow::into_owned)
    }

    /// Renders the block body with the first argument as subject, or with the
    /// current subject when the helper got no argument.
    pub fn render_body(&self) -> Result<String> {
        match &self.body_subject {
            Some(subject) => self.render_body_with(subject),
            None => self.render_nodes(self.body, self.frame.subject()),
        }
    }

    /// Renders the block body with `subject` as the current value.
    pub fn render_body_with(&self, subject: &Value) -> Result<String> {
        self.render_nodes(self.body, subject)
    }

    /// Renders the `{{else}}` body in the current scope; empty when absent.
    pub fn render_inverse(&self) -> Result<String> {
        self.render_nodes(self.inverse, self.frame.subject())
    }

    fn render_nodes(&self, nodes: Option<&[Node]>, subject: &Value) -> Result<String> {
        let Some(nodes) = nodes else {
            return Ok(String::new());
        };
        let frame = Frame::child(self.frame, Cow::Borrowed(subject));
        let mut out = String::new();
        self.renderer.render(nodes, &frame, &mut out)?;
        Ok(out)
    }
}
