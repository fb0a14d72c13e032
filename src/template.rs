use crate::Result;
use crate::context::Context;
use crate::handlebars::Engine;
use crate::tpl::ast::Node;
use crate::tpl::render::render_template;
use crate::value::ToValue;
use std::fmt;
use std::sync::Arc;

/// A compiled template. Immutable and safe to render from many threads.
#[derive(Clone)]
pub struct Template {
    name: String,
    nodes: Arc<Vec<Node>>,
    engine: Arc<Engine>,
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl Template {
    pub(crate) fn new(name: &str, nodes: Arc<Vec<Node>>, engine: Arc<Engine>) -> Self {
        Self {
            name: name.to_string(),
            nodes,
            engine,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders with `model` as the root subject.
    pub fn apply(&self, model: &impl ToValue) -> Result<String> {
        self.render(&Context::new(model))
    }

    pub fn render(&self, context: &Context) -> Result<String> {
        render_template(&self.engine, &self.name, &self.nodes, context)
    }
}
