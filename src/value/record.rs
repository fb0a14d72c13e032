use crate::value::Value;
use std::fmt;

/// A structured value whose fields and zero-argument methods are visible to
/// templates.
///
/// A record answers lookups by name; nothing is introspected at runtime. It is
/// normally implemented with `#[derive(Record)]`:
///
/// ```ignore
/// #[derive(Clone, Record)]
/// #[record(getters, methods(isNew = is_new))]
/// struct Model {
///     name: Option<String>,
/// }
/// ```
///
/// With `getters`, every field `name` is also exposed as the method `getName`
/// (and `isName` for `bool` fields). `methods(...)` maps template method names
/// onto Rust methods taking only `&self`.
pub trait Record: Send + Sync {
    /// Type name used in debug output.
    fn type_name(&self) -> &'static str;

    /// Field lookup by exact name.
    fn field(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Zero-argument method lookup by exact template name (`getTitle`, `isNew`, `hi`).
    fn method(&self, _name: &str) -> Option<Value> {
        None
    }

    /// The string form emitted when the record itself is rendered.
    fn to_text(&self) -> String {
        self.type_name().to_string()
    }
}

impl fmt::Debug for dyn Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.type_name())
    }
}

// Records compare by identity; two clones of the same data are distinct objects.
impl PartialEq for dyn Record {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(self as *const dyn Record, other as *const dyn Record)
    }
}
