use crate::Result;
use crate::tpl::ast::Node;
use crate::tpl::parser::parse_template;
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;
use std::time::Instant;

/// Parsed templates keyed by their resolved name.
#[derive(Default)]
pub(crate) struct AstCache {
    entries: DashMap<String, Arc<Vec<Node>>>,
}

impl AstCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached AST for `name`, parsing the text from `load` on a miss.
    ///
    /// Failed parses are not cached.
    pub(crate) fn get_or_parse<F>(&self, name: &str, load: F) -> Result<Arc<Vec<Node>>>
    where
        F: FnOnce() -> Result<String>,
    {
        if let Some(ast) = self.entries.get(name) {
            return Ok(ast.value().clone());
        }

        let text = load()?;
        let ast = Arc::new(parse(name, &text)?);
        self.entries.insert(name.to_string(), ast.clone());
        Ok(ast)
    }

    pub(crate) fn clear(&self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Parses `text`, logging node count and elapsed time.
pub(crate) fn parse(name: &str, text: &str) -> Result<Vec<Node>> {
    let start = Instant::now();
    let nodes = parse_template(text)?;
    debug!(
        "Compile: template={}, nodes={}, elapsed={}us",
        name,
        nodes.len(),
        start.elapsed().as_micros()
    );
    Ok(nodes)
}
