use crate::Result;
use crate::context::Context;
use crate::error::TemplateError;
use crate::handlebars::Engine;
use crate::helper::Options;
use crate::resolver::ResolverChain;
use crate::tpl::ast::{Hash, Keyword, Node, Param};
use crate::tpl::escape::push_escaped;
use crate::tpl::render_context::Frame;
use crate::value::Value;
use log::{debug, trace};
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// Partials nested deeper than this are assumed to recurse forever.
const MAX_PARTIAL_DEPTH: usize = 64;

/// Walks an AST against a frame stack. One renderer serves one render call.
pub(crate) struct Renderer<'a> {
    engine: &'a Engine,
    resolvers: &'a ResolverChain,
    /// Layout regions supplied by `{{#partial "name"}}`, last declaration wins.
    overrides: RefCell<HashMap<String, Arc<Vec<Node>>>>,
    depth: Cell<usize>,
}

/// Renders `nodes` against a caller-supplied context.
pub(crate) fn render_template(
    engine: &Engine,
    name: &str,
    nodes: &[Node],
    context: &Context,
) -> Result<String> {
    let start = Instant::now();
    let resolvers = context.resolvers().unwrap_or(&engine.resolvers);
    let renderer = Renderer {
        engine,
        resolvers,
        overrides: RefCell::new(HashMap::new()),
        depth: Cell::new(0),
    };

    let mut out = String::new();
    match context.extras() {
        // Combined values sit behind the model in the top-level scope.
        Some(extras) => {
            let base = Frame::root(Cow::Borrowed(extras));
            let root = Frame::child(&base, Cow::Borrowed(context.model()));
            renderer.render(nodes, &root, &mut out)?;
        }
        None => {
            let root = Frame::root(Cow::Borrowed(context.model()));
            renderer.render(nodes, &root, &mut out)?;
        }
    }

    debug!(
        "Render: template={}, elapsed={}us, output={} bytes",
        name,
        start.elapsed().as_micros(),
        out.len()
    );
    Ok(out)
}

impl<'a> Renderer<'a> {
    pub(crate) fn resolvers(&self) -> &ResolverChain {
        self.resolvers
    }

    pub(crate) fn render(&self, nodes: &[Node], frame: &Frame<'_>, out: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Variable { path, escape } => {
                    if let Some(v) = frame.lookup(path, self.resolvers) {
                        emit(&v, *escape, out);
                    }
                }
                Node::Block {
                    keyword,
                    params,
                    body,
                    inverse,
                } => self.render_block(*keyword, params, body, inverse.as_deref(), frame, out)?,
                Node::BlockHelper {
                    name,
                    params,
                    hash,
                    body,
                    inverse,
                } => {
                    let v = self.call_helper(
                        name,
                        params,
                        hash,
                        frame,
                        Some(body.as_slice()),
                        inverse.as_deref(),
                    )?;
                    emit(&v, false, out);
                }
                Node::HelperCall {
                    name,
                    params,
                    hash,
                    escape,
                } => {
                    let v = self.call_helper(name, params, hash, frame, None, None)?;
                    emit(&v, *escape, out);
                }
                Node::Partial { name, context } => {
                    self.render_partial(name, context.as_ref(), frame, out)?
                }
                Node::Region { name, body } => {
                    let replacement = self.overrides.borrow().get(name).cloned();
                    match replacement {
                        Some(replacement) => self.render(&replacement, frame, out)?,
                        None => self.render(body, frame, out)?,
                    }
                }
                Node::Override { name, body } => {
                    self.overrides
                        .borrow_mut()
                        .insert(name.clone(), Arc::clone(body));
                }
            }
        }
        Ok(())
    }

    fn render_block(
        &self,
        keyword: Keyword,
        params: &[Param],
        body: &[Node],
        inverse: Option<&[Node]>,
        frame: &Frame<'_>,
        out: &mut String,
    ) -> Result<()> {
        let value = params.first().and_then(|p| self.eval_param(p, frame));

        match keyword {
            Keyword::If | Keyword::Unless => {
                let truthy = value.as_deref().is_some_and(Value::is_truthy);
                if truthy == (keyword == Keyword::If) {
                    let child = Frame::child(frame, Cow::Borrowed(frame.subject()));
                    self.render(body, &child, out)
                } else {
                    self.render_inverse(inverse, frame, out)
                }
            }
            Keyword::With => match value {
                Some(v) => {
                    let child = Frame::child(frame, v);
                    self.render(body, &child, out)
                }
                None => self.render_inverse(inverse, frame, out),
            },
            Keyword::Each => match value.as_deref() {
                Some(Value::List(items)) if !items.is_empty() => {
                    let len = items.len();
                    for (i, item) in items.iter().enumerate() {
                        let mut child = Frame::child(frame, Cow::Borrowed(item));
                        bind_iteration(&mut child, i, len);
                        self.render(body, &child, out)?;
                    }
                    Ok(())
                }
                Some(Value::Map(map)) if !map.is_empty() => {
                    let sorted: BTreeMap<_, _> = map.iter().collect();
                    let len = sorted.len();
                    for (i, (key, item)) in sorted.into_iter().enumerate() {
                        let mut child = Frame::child(frame, Cow::Borrowed(item));
                        bind_iteration(&mut child, i, len);
                        child.bind("key", Value::Str(key.clone()));
                        self.render(body, &child, out)?;
                    }
                    Ok(())
                }
                _ => self.render_inverse(inverse, frame, out),
            },
        }
    }

    fn render_inverse(
        &self,
        inverse: Option<&[Node]>,
        frame: &Frame<'_>,
        out: &mut String,
    ) -> Result<()> {
        match inverse {
            Some(nodes) => self.render(nodes, frame, out),
            None => Ok(()),
        }
    }

    fn call_helper(
        &self,
        name: &str,
        params: &[Param],
        hash: &Hash,
        frame: &Frame<'_>,
        body: Option<&[Node]>,
        inverse: Option<&[Node]>,
    ) -> Result<Value> {
        let helper = self
            .engine
            .helpers
            .resolve(name)
            .ok_or_else(|| TemplateError::HelperNotFound(name.to_string()))?;

        let args: Vec<Value> = params
            .iter()
            .map(|p| self.resolve_owned(p, frame))
            .collect();
        let hash: HashMap<String, Value> = hash
            .iter()
            .map(|(k, p)| (k.clone(), self.resolve_owned(p, frame)))
            .collect();

        trace!("Helper: name={}, args={:?}", name, args);
        let options = Options::new(name, hash, self, frame, body, inverse, args.first().cloned());
        helper.call(&args, &options)
    }

    fn render_partial(
        &self,
        name: &str,
        context: Option<&Param>,
        frame: &Frame<'_>,
        out: &mut String,
    ) -> Result<()> {
        let depth = self.depth.get();
        if depth >= MAX_PARTIAL_DEPTH {
            return Err(TemplateError::Render(format!(
                "partial '{}' nested more than {} levels deep",
                name, MAX_PARTIAL_DEPTH
            )));
        }

        let ast = self.engine.load(name)?;
        self.depth.set(depth + 1);
        let result = match context {
            Some(param) => {
                let subject = self
                    .eval_param(param, frame)
                    .unwrap_or(Cow::Owned(Value::Null));
                let child = Frame::child(frame, subject);
                self.render(&ast, &child, out)
            }
            None => self.render(&ast, frame, out),
        };
        self.depth.set(depth);
        result
    }

    /// Evaluates an argument: paths are looked up, literals are used as-is.
    /// `None` means absent (missing path or a null value).
    fn eval_param<'x>(&self, param: &'x Param, frame: &'x Frame<'_>) -> Option<Cow<'x, Value>> {
        match param {
            Param::Path(path) => frame.lookup(path, self.resolvers),
            Param::Literal(Value::Null) => None,
            Param::Literal(v) => Some(Cow::Borrowed(v)),
        }
    }

    fn resolve_owned(&self, param: &Param, frame: &Frame<'_>) -> Value {
        self.eval_param(param, frame)
            .map(Cow::into_owned)
            .unwrap_or(Value::Null)
    }
}

/// Binds `@index`, `@index_1`, `@first`, `@last`, `@odd` and `@even`.
///
/// `@index` and `@index_1` are numbers. They print as decimal text, but
/// `{{#if @index}}` is false on the first item because zero is falsy.
/// Markers that do not apply are bound to null so they hide the markers of an
/// enclosing `each`.
fn bind_iteration(frame: &mut Frame<'_>, index: usize, len: usize) {
    let marker = |on: bool, text: &str| {
        if on {
            Value::Str(text.to_string())
        } else {
            Value::Null
        }
    };
    frame.bind("index", Value::U64(index as u64));
    frame.bind("index_1", Value::U64(index as u64 + 1));
    frame.bind("first", marker(index == 0, "first"));
    frame.bind("last", marker(index + 1 == len, "last"));
    frame.bind("odd", marker(index % 2 == 1, "odd"));
    frame.bind("even", marker(index % 2 == 0, "even"));
}

fn emit(value: &Value, escape: bool, out: &mut String) {
    match value {
        Value::Null => {}
        Value::Str(s) if !escape => out.push_str(s),
        Value::Str(s) => push_escaped(out, s),
        other if escape => push_escaped(out, &other.to_string()),
        other => out.push_str(&other.to_string()),
    }
}
