use crate::resolver::ResolverChain;
use crate::tpl::ast::Path;
use crate::value::Value;
use std::borrow::Cow;

/// One level of the scope stack during rendering.
///
/// Frames live on the call stack of a single render: a block creates a child
/// frame that borrows its parent, and dropping the child pops it.
pub struct Frame<'a> {
    subject: Cow<'a, Value>,
    parent: Option<&'a Frame<'a>>,
    /// `@`-variables bound by this frame, stored without the `@`.
    locals: Vec<(String, Value)>,
}

impl<'a> Frame<'a> {
    pub fn root(subject: Cow<'a, Value>) -> Self {
        Self {
            subject,
            parent: None,
            locals: Vec::new(),
        }
    }

    pub fn child(parent: &'a Frame<'a>, subject: Cow<'a, Value>) -> Self {
        Self {
            subject,
            parent: Some(parent),
            locals: Vec::new(),
        }
    }

    /// Binds a local variable. A `Null` binding hides same-named locals of
    /// enclosing frames.
    pub fn bind(&mut self, name: &str, value: Value) {
        self.locals.push((name.to_string(), value));
    }

    pub fn subject(&self) -> &Value {
        &self.subject
    }

    /// Resolves a path against this frame.
    ///
    /// The first segment of a named path falls back to enclosing frames when the
    /// current subject cannot resolve it; later segments only resolve against
    /// the value produced by the previous one.
    pub fn lookup(&self, path: &Path, resolvers: &ResolverChain) -> Option<Cow<'_, Value>> {
        match path {
            Path::Local(name) => self.lookup_local(name),
            Path::This(segments) => {
                Self::resolve_rest(Cow::Borrowed(self.subject()), segments, resolvers)
            }
            Path::Named(segments) => {
                let (first, rest) = segments.split_first()?;
                let head = self.lookup_first(first, resolvers)?;
                Self::resolve_rest(head, rest, resolvers)
            }
        }
    }

    fn lookup_local(&self, name: &str) -> Option<Cow<'_, Value>> {
        let mut frame = self;
        loop {
            if let Some((_, v)) = frame.locals.iter().rev().find(|(k, _)| k == name) {
                return (!v.is_null()).then_some(Cow::Borrowed(v));
            }
            frame = frame.parent?;
        }
    }

    fn lookup_first(&self, name: &str, resolvers: &ResolverChain) -> Option<Cow<'_, Value>> {
        let mut frame = self;
        loop {
            if let Some(v) = resolvers.resolve(frame.subject(), name) {
                return Some(v);
            }
            frame = frame.parent?;
        }
    }

    /// Resolve the remaining path segments (no upward fallback).
    fn resolve_rest<'v>(
        mut current: Cow<'v, Value>,
        segments: &[String],
        resolvers: &ResolverChain,
    ) -> Option<Cow<'v, Value>> {
        for segment in segments {
            current = resolvers.resolve_cow(current, segment)?;
        }
        (!current.is_null()).then_some(current)
    }
}
