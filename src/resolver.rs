use crate::value::Value;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// One strategy for resolving a name against a subject value.
///
/// Resolvers return `None` when they do not apply to the subject or cannot find
/// the name. A `Null` result is treated the same as `None` by the chain.
pub trait ValueResolver: Send + Sync {
    /// Short name used in debug output.
    fn name(&self) -> &'static str;

    fn resolve<'v>(&self, subject: &'v Value, name: &str) -> Option<Cow<'v, Value>>;
}

/// Key lookup in [`Value::Map`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MapResolver;

impl ValueResolver for MapResolver {
    fn name(&self) -> &'static str {
        "map"
    }

    fn resolve<'v>(&self, subject: &'v Value, name: &str) -> Option<Cow<'v, Value>> {
        match subject {
            Value::Map(m) => m.get(name).map(Cow::Borrowed),
            _ => None,
        }
    }
}

/// Bean-style accessors: `title` resolves through the record method `getTitle`
/// or `isTitle`. The accessor spelling itself (`getTitle`) resolves too.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessorResolver;

impl ValueResolver for AccessorResolver {
    fn name(&self) -> &'static str {
        "accessor"
    }

    fn resolve<'v>(&self, subject: &'v Value, name: &str) -> Option<Cow<'v, Value>> {
        let Value::Object(record) = subject else {
            return None;
        };
        if is_accessor_name(name)
            && let Some(v) = record.method(name)
        {
            return Some(Cow::Owned(v));
        }
        let property = capitalize(name)?;
        record
            .method(&format!("get{}", property))
            .or_else(|| record.method(&format!("is{}", property)))
            .map(Cow::Owned)
    }
}

/// Direct field access on records. Falls back to the snake_case spelling of a
/// camelCase name (`createTime` → `create_time`). Map entries are matched by
/// exact key only, through [`MapResolver`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldResolver;

impl ValueResolver for FieldResolver {
    fn name(&self) -> &'static str {
        "field"
    }

    fn resolve<'v>(&self, subject: &'v Value, name: &str) -> Option<Cow<'v, Value>> {
        match subject {
            Value::Object(record) => record
                .field(name)
                .or_else(|| to_snake_case(name).and_then(|snake| record.field(&snake)))
                .map(Cow::Owned),
            _ => None,
        }
    }
}

/// Zero-argument record methods by exact name (`hi`, `isNew`, `getName`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodResolver;

impl ValueResolver for MethodResolver {
    fn name(&self) -> &'static str {
        "method"
    }

    fn resolve<'v>(&self, subject: &'v Value, name: &str) -> Option<Cow<'v, Value>> {
        match subject {
            Value::Object(record) => record.method(name).map(Cow::Owned),
            _ => None,
        }
    }
}

/// An ordered list of resolvers; the first one producing a non-null value wins.
#[derive(Clone)]
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn ValueResolver>>,
}

impl Default for ResolverChain {
    /// Map entries, then accessors, then fields, then exact-name methods.
    fn default() -> Self {
        Self::new()
            .with(MapResolver)
            .with(AccessorResolver)
            .with(FieldResolver)
            .with(MethodResolver)
    }
}

impl fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|r| r.name()))
            .finish()
    }
}

impl ResolverChain {
    /// Creates an empty chain, which resolves nothing.
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Appends a resolver at the lowest priority.
    pub fn with(mut self, resolver: impl ValueResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn resolve<'v>(&self, subject: &'v Value, name: &str) -> Option<Cow<'v, Value>> {
        self.resolvers
            .iter()
            .filter_map(|r| r.resolve(subject, name))
            .find(|v| !v.is_null())
    }

    /// Resolves `name` against a value that may be owned by the caller.
    pub(crate) fn resolve_cow<'v>(
        &self,
        subject: Cow<'v, Value>,
        name: &str,
    ) -> Option<Cow<'v, Value>> {
        match subject {
            Cow::Borrowed(v) => self.resolve(v, name),
            Cow::Owned(v) => self
                .resolve(&v, name)
                .map(|found| Cow::Owned(found.into_owned())),
        }
    }
}

fn is_accessor_name(name: &str) -> bool {
    let rest = name
        .strip_prefix("get")
        .or_else(|| name.strip_prefix("is"));
    rest.is_some_and(|r| r.starts_with(|c: char| c.is_uppercase()))
}

fn capitalize(name: &str) -> Option<String> {
    let mut chars = name.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Converts a camelCase string to snake_case.
/// Returns None if the string does not contain uppercase letters (no conversion needed).
fn to_snake_case(s: &str) -> Option<String> {
    if !s.chars().any(|c| c.is_uppercase()) {
        return None;
    }

    let mut snake = String::with_capacity(s.len() + 2);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                snake.push('_');
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    Some(snake)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;
    use std::collections::HashMap;

    #[derive(Clone)]
    struct Person {
        first_name: String,
        active: bool,
    }

    impl Record for Person {
        fn type_name(&self) -> &'static str {
            "Person"
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "first_name" => Some(Value::Str(self.first_name.clone())),
                "active" => Some(Value::Bool(self.active)),
                _ => None,
            }
        }

        fn method(&self, name: &str) -> Option<Value> {
            match name {
                "getFirstName" => Some(Value::Str(self.first_name.clone())),
                "isActive" => Some(Value::Bool(self.active)),
                "shout" => Some(Value::Str(self.first_name.to_uppercase())),
                _ => None,
            }
        }
    }

    fn person() -> Value {
        Value::object(Person {
            first_name: "Ada".to_string(),
            active: true,
        })
    }

    #[test]
    fn test_map_resolver() {
        let mut map = HashMap::new();
        map.insert("a".to_string(), Value::I64(1));
        let subject = Value::Map(map);

        assert_eq!(
            MapResolver.resolve(&subject, "a").as_deref(),
            Some(&Value::I64(1))
        );
        assert!(MapResolver.resolve(&subject, "b").is_none());
        assert!(MapResolver.resolve(&person(), "firstName").is_none());
    }

    #[test]
    fn test_accessor_resolver_both_spellings() {
        let p = person();
        let expected = Value::Str("Ada".to_string());
        assert_eq!(
            AccessorResolver.resolve(&p, "firstName").as_deref(),
            Some(&expected)
        );
        assert_eq!(
            AccessorResolver.resolve(&p, "getFirstName").as_deref(),
            Some(&expected)
        );
        assert_eq!(
            AccessorResolver.resolve(&p, "active").as_deref(),
            Some(&Value::Bool(true))
        );
        assert_eq!(
            AccessorResolver.resolve(&p, "isActive").as_deref(),
            Some(&Value::Bool(true))
        );
        // Plain methods are not accessors.
        assert!(AccessorResolver.resolve(&p, "shout").is_none());
    }

    #[test]
    fn test_field_resolver_camel_to_snake() {
        let p = person();
        assert_eq!(
            FieldResolver.resolve(&p, "firstName").as_deref(),
            Some(&Value::Str("Ada".to_string()))
        );

        let mut map = HashMap::new();
        map.insert("tenant_id".to_string(), Value::U64(123));
        let subject = Value::Map(map);
        // Map keys are exact, even through the field resolver.
        assert!(FieldResolver.resolve(&subject, "tenantId").is_none());
        assert!(ResolverChain::default().resolve(&subject, "tenantId").is_none());
    }

    #[test]
    fn test_method_resolver_exact_name() {
        let p = person();
        assert_eq!(
            MethodResolver.resolve(&p, "shout").as_deref(),
            Some(&Value::Str("ADA".to_string()))
        );
        assert!(MethodResolver.resolve(&p, "firstName").is_none());
    }

    #[test]
    fn test_chain_order_and_reduced_chain() {
        let p = person();
        let chain = ResolverChain::default();
        assert_eq!(chain.len(), 4);
        assert!(chain.resolve(&p, "firstName").is_some());
        assert!(chain.resolve(&p, "shout").is_some());

        let fields_only = ResolverChain::new().with(FieldResolver);
        assert!(fields_only.resolve(&p, "first_name").is_some());
        assert!(fields_only.resolve(&p, "getFirstName").is_none());

        assert!(ResolverChain::new().resolve(&p, "first_name").is_none());
    }

    #[test]
    fn test_chain_skips_null() {
        let mut map = HashMap::new();
        map.insert("first_name".to_string(), Value::Null);
        map.insert("firstName".to_string(), Value::Null);
        let subject = Value::Map(map);
        assert!(ResolverChain::default().resolve(&subject, "firstName").is_none());
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("tenantId"), Some("tenant_id".to_string()));
        assert_eq!(to_snake_case("name"), None);
    }
}
