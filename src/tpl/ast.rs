use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A lookup path inside a `{{...}}` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Path {
    /// `this`, `.` or `this.a.b`: resolved against the current subject only.
    This(Vec<String>),
    /// `@index`, `@first`, ...: a local variable bound by an enclosing block.
    Local(String),
    /// `a.b.c`: the first segment may fall back to enclosing frames.
    Named(Vec<String>),
}

/// A tag argument: either a path to resolve or a literal written in the template.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Path(Path),
    Literal(Value),
}

/// Built-in block keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Unless,
    Each,
    With,
}

impl Keyword {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "if" => Some(Keyword::If),
            "unless" => Some(Keyword::Unless),
            "each" => Some(Keyword::Each),
            "with" => Some(Keyword::With),
            _ => None,
        }
    }
}

pub type Hash = HashMap<String, Param>;

#[derive(Debug, Clone)]
pub enum Node {
    Text(String),
    Variable {
        path: Path,
        escape: bool,
    },
    Block {
        keyword: Keyword,
        params: Vec<Param>,
        body: Vec<Node>,
        inverse: Option<Vec<Node>>,
    },
    BlockHelper {
        name: String,
        params: Vec<Param>,
        hash: Hash,
        body: Vec<Node>,
        inverse: Option<Vec<Node>>,
    },
    HelperCall {
        name: String,
        params: Vec<Param>,
        hash: Hash,
        escape: bool,
    },
    Partial {
        name: String,
        context: Option<Param>,
    },
    /// `{{#block "name"}}default{{/block}}`: a region a child template may override.
    Region {
        name: String,
        body: Arc<Vec<Node>>,
    },
    /// `{{#partial "name"}}...{{/partial}}`: content replacing a same-named region.
    Override {
        name: String,
        body: Arc<Vec<Node>>,
    },
}
