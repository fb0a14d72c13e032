use crate::Result;
use crate::error::TemplateError;
use crate::tpl::ast::{Hash, Keyword, Node, Param, Path};
use crate::tpl::escape::escape_html;
use crate::value::Value;
use std::sync::Arc;

/// Represents a stack frame during template parsing to handle nested blocks.
///
/// When a block opener (like `{{#if x}}`) is encountered, a new `TagFrame` is pushed onto
/// the stack, together with a fresh node collection for its body.
enum TagFrame {
    Block {
        keyword: Keyword,
        params: Vec<Param>,
    },
    BlockHelper {
        name: String,
        params: Vec<Param>,
        hash: Hash,
    },
    Region {
        name: String,
    },
    Override {
        name: String,
    },
}

/// An open block together with the bookkeeping needed to close it.
struct OpenTag {
    frame: TagFrame,
    /// The name a matching `{{/name}}` must carry.
    closer: String,
    /// Byte offset of the opener, for error messages.
    pos: usize,
    /// Set once `{{else}}` has been seen: holds the finished main body.
    body: Option<Vec<Node>>,
}

/// A hand-written, stack-based parser for `{{...}}` templates.
///
/// It supports:
/// - Plain text
/// - Variables: `{{path}}`, raw `{{{path}}}` / `{{&path}}`
/// - Comments: `{{! ... }}`, `{{!-- ... --}}`
/// - Blocks: `{{#if}}`, `{{#unless}}`, `{{#each}}`, `{{#with}}` with optional `{{else}}`
/// - Block helpers: `{{#name args}}...{{/name}}`
/// - Helper calls: `{{name arg1 arg2 key=value}}`
/// - Partials: `{{> name}}`, `{{> name contextPath}}`
/// - Layout regions: `{{#block "name"}}` and overrides `{{#partial "name"}}`
struct Parser<'a> {
    /// The original template string being parsed.
    template: &'a str,
    /// Current byte position in the template.
    pos: usize,
    /// A stack of node collections. Each level corresponds to the children of a nested block.
    /// The first element is always the root-level nodes.
    nodes_stack: Vec<Vec<Node>>,
    /// A stack of blocks still waiting for their closer.
    tag_stack: Vec<OpenTag>,
}

impl<'a> Parser<'a> {
    fn new(template: &'a str) -> Self {
        Self {
            template,
            pos: 0,
            nodes_stack: vec![Vec::new()],
            tag_stack: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Node>> {
        while self.pos < self.template.len() {
            let remaining = &self.template[self.pos..];
            match remaining.find("{{") {
                Some(0) => self.parse_tag()?,
                Some(next) => {
                    self.append_text(&remaining[..next]);
                    self.pos += next;
                }
                None => {
                    self.append_text(remaining);
                    self.pos = self.template.len();
                }
            }
        }

        if let Some(open) = self.tag_stack.last() {
            return Err(self.error_at(
                open.pos,
                &format!("unclosed block '{{{{#{}}}}}'", open.closer),
            ));
        }

        Ok(self.nodes_stack.pop().unwrap_or_default())
    }

    /// Parses one `{{...}}` tag starting at the current position.
    fn parse_tag(&mut self) -> Result<()> {
        let start = self.pos;
        let remaining = &self.template[start..];

        if remaining.starts_with("{{!--") {
            let end = remaining
                .find("--}}")
                .ok_or_else(|| self.error_at(start, "unterminated comment"))?;
            self.pos += end + 4;
            self.skip_standalone(start);
            return Ok(());
        }
        if remaining.starts_with("{{!") {
            let end = remaining
                .find("}}")
                .ok_or_else(|| self.error_at(start, "unterminated comment"))?;
            self.pos += end + 2;
            self.skip_standalone(start);
            return Ok(());
        }
        if let Some(inner) = remaining.strip_prefix("{{{") {
            let end = find_tag_end(inner, "}}}")
                .ok_or_else(|| self.error_at(start, "unterminated tag, expected '}}}'"))?;
            let content = inner[..end].trim();
            self.pos += 3 + end + 3;
            return self.handle_expression(content, false, start);
        }

        let inner = &remaining[2..];
        let end = find_tag_end(inner, "}}")
            .ok_or_else(|| self.error_at(start, "unterminated tag, expected '}}'"))?;
        let content = inner[..end].trim();
        self.pos += 2 + end + 2;

        if let Some(rest) = content.strip_prefix('#') {
            self.skip_standalone(start);
            self.handle_open_block(rest.trim_start(), start)
        } else if let Some(rest) = content.strip_prefix('/') {
            self.skip_standalone(start);
            self.handle_close_block(rest.trim(), start)
        } else if let Some(rest) = content.strip_prefix('>') {
            self.handle_partial(rest.trim_start(), start)
        } else if let Some(rest) = content.strip_prefix('&') {
            self.handle_expression(rest.trim_start(), false, start)
        } else if content == "else" {
            self.skip_standalone(start);
            self.handle_else(start)
        } else {
            self.handle_expression(content, true, start)
        }
    }

    /// Handle `{{path}}` or `{{helper arg ...}}`.
    fn handle_expression(&mut self, content: &str, escape: bool, start: usize) -> Result<()> {
        let tokens = self.tokenize(content, start)?;
        let mut tokens = tokens.into_iter();
        let Some(first) = tokens.next() else {
            return Err(self.error_at(start, "empty tag"));
        };
        let rest: Vec<Token> = tokens.collect();

        if rest.is_empty() {
            match first {
                // A single token is always a lookup, even if a helper shares its name.
                Token::Param(Param::Path(path)) => self.append_node(Node::Variable { path, escape }),
                Token::Param(Param::Literal(value)) => {
                    let text = value.to_string();
                    if escape {
                        self.append_text(&escape_html(&text));
                    } else {
                        self.append_text(&text);
                    }
                }
                Token::Hash(..) => return Err(self.error_at(start, "expected a name before '='")),
            }
            return Ok(());
        }

        let name = self.helper_name(first, start)?;
        let (params, hash) = self.split_args(rest, start)?;
        self.append_node(Node::HelperCall {
            name,
            params,
            hash,
            escape,
        });
        Ok(())
    }

    /// Handle `{{#name args}}`.
    fn handle_open_block(&mut self, content: &str, start: usize) -> Result<()> {
        let tokens = self.tokenize(content, start)?;
        let mut tokens = tokens.into_iter();
        let Some(first) = tokens.next() else {
            return Err(self.error_at(start, "block without a name"));
        };
        let name = self.helper_name(first, start)?;
        let (params, hash) = self.split_args(tokens.collect(), start)?;

        let built_in = Keyword::from_name(&name).is_some() || name == "block" || name == "partial";
        if built_in && !hash.is_empty() {
            return Err(self.error_at(
                start,
                &format!("'{{{{#{}}}}}' does not take hash arguments", name),
            ));
        }

        let frame = if let Some(keyword) = Keyword::from_name(&name) {
            if params.len() != 1 {
                return Err(self.error_at(
                    start,
                    &format!("'{{{{#{}}}}}' expects exactly one argument", name),
                ));
            }
            TagFrame::Block { keyword, params }
        } else if name == "block" || name == "partial" {
            let region = match params.as_slice() {
                [Param::Literal(Value::Str(s))] => s.clone(),
                [Param::Path(Path::Named(segments))] => segments.join("."),
                _ => {
                    return Err(self.error_at(
                        start,
                        &format!("'{{{{#{}}}}}' expects a region name", name),
                    ));
                }
            };
            if name == "block" {
                TagFrame::Region { name: region }
            } else {
                TagFrame::Override { name: region }
            }
        } else {
            TagFrame::BlockHelper {
                name: name.clone(),
                params,
                hash,
            }
        };

        self.nodes_stack.push(Vec::new());
        self.tag_stack.push(OpenTag {
            frame,
            closer: name,
            pos: start,
            body: None,
        });
        Ok(())
    }

    /// Handle `{{else}}`: the collected nodes become the main body and a new
    /// collection starts for the inverse body.
    fn handle_else(&mut self, start: usize) -> Result<()> {
        let Some(open) = self.tag_stack.last() else {
            return Err(self.error_at(start, "'{{else}}' outside of a block"));
        };
        if matches!(open.frame, TagFrame::Region { .. } | TagFrame::Override { .. }) {
            return Err(self.error_at(start, "'{{else}}' is not allowed in a layout region"));
        }
        if open.body.is_some() {
            return Err(self.error_at(
                start,
                &format!("duplicate '{{{{else}}}}' in '{{{{#{}}}}}'", open.closer),
            ));
        }

        let body = self.nodes_stack.pop().unwrap_or_default();
        if let Some(open) = self.tag_stack.last_mut() {
            open.body = Some(body);
        }
        self.nodes_stack.push(Vec::new());
        Ok(())
    }

    /// Handle `{{/name}}`.
    fn handle_close_block(&mut self, name: &str, start: usize) -> Result<()> {
        let Some(open) = self.tag_stack.pop() else {
            return Err(self.error_at(
                start,
                &format!("unexpected closing tag '{{{{/{}}}}}'", name),
            ));
        };
        if open.closer != name {
            return Err(self.error_at(
                start,
                &format!(
                    "mismatched closing tag: expected '{{{{/{}}}}}' but found '{{{{/{}}}}}'",
                    open.closer, name
                ),
            ));
        }

        let last = self.nodes_stack.pop().unwrap_or_default();
        let (body, inverse) = match open.body {
            Some(body) => (body, Some(last)),
            None => (last, None),
        };

        let node = match open.frame {
            TagFrame::Block { keyword, params } => Node::Block {
                keyword,
                params,
                body,
                inverse,
            },
            TagFrame::BlockHelper { name, params, hash } => Node::BlockHelper {
                name,
                params,
                hash,
                body,
                inverse,
            },
            TagFrame::Region { name } => Node::Region {
                name,
                body: Arc::new(body),
            },
            TagFrame::Override { name } => Node::Override {
                name,
                body: Arc::new(body),
            },
        };
        self.append_node(node);
        Ok(())
    }

    /// Handle `{{> name}}` and `{{> name contextPath}}`.
    fn handle_partial(&mut self, content: &str, start: usize) -> Result<()> {
        let mut tokens = self.tokenize(content, start)?.into_iter();
        let name = match tokens.next() {
            Some(Token::Param(Param::Literal(Value::Str(s)))) => s,
            Some(Token::Param(Param::Path(Path::Named(segments)))) => segments.join("."),
            _ => {
                return Err(self.error_at(start, "partial without a name"));
            }
        };
        let context = match tokens.next() {
            Some(Token::Param(param)) => Some(param),
            Some(Token::Hash(..)) => {
                return Err(self.error_at(start, "partial hash arguments are not supported"));
            }
            None => None,
        };
        if tokens.next().is_some() {
            return Err(self.error_at(start, "a partial takes at most one context argument"));
        }

        self.append_node(Node::Partial { name, context });
        Ok(())
    }

    fn helper_name(&self, token: Token, start: usize) -> Result<String> {
        match token {
            Token::Param(Param::Path(Path::Named(segments))) if segments.len() == 1 => {
                Ok(segments.into_iter().next().unwrap_or_default())
            }
            _ => Err(self.error_at(start, "expected an identifier")),
        }
    }

    fn split_args(&self, tokens: Vec<Token>, start: usize) -> Result<(Vec<Param>, Hash)> {
        let mut params = Vec::new();
        let mut hash = Hash::new();
        for token in tokens {
            match token {
                Token::Param(param) => {
                    if !hash.is_empty() {
                        return Err(
                            self.error_at(start, "positional arguments must precede hash arguments")
                        );
                    }
                    params.push(param);
                }
                Token::Hash(key, param) => {
                    hash.insert(key, param);
                }
            }
        }
        Ok((params, hash))
    }

    /// Splits tag content into arguments, honouring quoted strings.
    fn tokenize(&self, content: &str, start: usize) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut rest = content.trim_start();

        while !rest.is_empty() {
            // `key=value`
            let key_end = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
                .unwrap_or(rest.len());
            if key_end > 0 && rest[key_end..].starts_with('=') {
                let key = rest[..key_end].to_string();
                let (param, next) = self.read_param(&rest[key_end + 1..], start)?;
                tokens.push(Token::Hash(key, param));
                rest = next.trim_start();
                continue;
            }

            let (param, next) = self.read_param(rest, start)?;
            tokens.push(Token::Param(param));
            rest = next.trim_start();
        }
        Ok(tokens)
    }

    /// Reads a single argument and returns it together with the unread remainder.
    fn read_param<'s>(&self, input: &'s str, start: usize) -> Result<(Param, &'s str)> {
        let mut chars = input.char_indices();
        match chars.next() {
            Some((_, quote @ ('"' | '\''))) => {
                let mut literal = String::new();
                let mut escaped = false;
                for (i, c) in chars {
                    if escaped {
                        literal.push(c);
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == quote {
                        return Ok((Param::Literal(Value::Str(literal)), &input[i + 1..]));
                    } else {
                        literal.push(c);
                    }
                }
                Err(self.error_at(start, "unterminated string literal"))
            }
            Some(_) => {
                let end = input.find(char::is_whitespace).unwrap_or(input.len());
                let word = &input[..end];
                Ok((self.parse_word(word, start)?, &input[end..]))
            }
            None => Err(self.error_at(start, "missing argument value")),
        }
    }

    fn parse_word(&self, word: &str, start: usize) -> Result<Param> {
        match word {
            "true" => return Ok(Param::Literal(Value::Bool(true))),
            "false" => return Ok(Param::Literal(Value::Bool(false))),
            "null" | "undefined" => return Ok(Param::Literal(Value::Null)),
            _ => {}
        }
        if looks_numeric(word) {
            if let Ok(n) = word.parse::<i64>() {
                return Ok(Param::Literal(Value::I64(n)));
            }
            if let Ok(n) = word.parse::<f64>() {
                return Ok(Param::Literal(Value::F64(n)));
            }
        }
        parse_path(word)
            .map(Param::Path)
            .ok_or_else(|| self.error_at(start, &format!("invalid path '{}'", word)))
    }

    /// Append a node to the current active scope.
    fn append_node(&mut self, node: Node) {
        if let Some(nodes) = self.nodes_stack.last_mut() {
            nodes.push(node);
        }
    }

    /// Append text, merging with the previous text node when possible.
    fn append_text(&mut self, text: &str) {
        if let Some(nodes) = self.nodes_stack.last_mut() {
            if let Some(Node::Text(last_text)) = nodes.last_mut() {
                last_text.push_str(text);
            } else {
                nodes.push(Node::Text(text.to_string()));
            }
        }
    }

    /// A tag alone on its line takes the whole line with it: neither the
    /// indentation before it nor the line break after it is emitted.
    /// Must run before the tag changes the node stack.
    fn skip_standalone(&mut self, start: usize) {
        let line_start = self.template[..start].rfind('\n').map_or(0, |nl| nl + 1);
        let indent = &self.template[line_start..start];
        if !indent.chars().all(|c| c == ' ' || c == '\t') {
            return;
        }
        let rest = &self.template[self.pos..];
        let line_end = rest.find('\n').map_or(rest.len(), |nl| nl + 1);
        if !rest[..line_end].chars().all(char::is_whitespace) {
            return;
        }

        let indent_len = indent.len();
        self.pos += line_end;
        if indent_len > 0
            && let Some(nodes) = self.nodes_stack.last_mut()
            && let Some(Node::Text(text)) = nodes.last_mut()
        {
            text.truncate(text.len().saturating_sub(indent_len));
            if text.is_empty() {
                nodes.pop();
            }
        }
    }

    fn error_at(&self, pos: usize, message: &str) -> TemplateError {
        let before = &self.template[..pos.min(self.template.len())];
        let line = before.matches('\n').count() + 1;
        let column = before.rfind('\n').map_or(pos, |nl| pos - nl - 1) + 1;
        TemplateError::Syntax(format!("{} at line {}, column {}", message, line, column))
    }
}

enum Token {
    Param(Param),
    Hash(String, Param),
}

/// Main entry point: parse a template string into an AST.
pub fn parse_template(template: &str) -> Result<Vec<Node>> {
    Parser::new(template).parse()
}

/// Parses `this`, `.`, `this.a`, `./a`, `@name` and `a.b.c`.
pub(crate) fn parse_path(word: &str) -> Option<Path> {
    if word == "this" || word == "." {
        return Some(Path::This(Vec::new()));
    }
    if let Some(local) = word.strip_prefix('@') {
        return is_segment(local).then(|| Path::Local(local.to_string()));
    }
    let (this, rest) = if let Some(rest) = word.strip_prefix("this.") {
        (true, rest)
    } else if let Some(rest) = word.strip_prefix("./") {
        (true, rest)
    } else {
        (false, word)
    };

    let segments: Vec<String> = rest.split('.').map(str::to_string).collect();
    if !segments.iter().all(|s| is_segment(s)) {
        return None;
    }
    Some(if this {
        Path::This(segments)
    } else {
        Path::Named(segments)
    })
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '$' | '/'))
}

fn looks_numeric(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    digits.starts_with(|c: char| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Finds `closer` in tag content, skipping over quoted string literals.
fn find_tag_end(inner: &str, closer: &str) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;
    for (i, c) in inner.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if inner[i..].starts_with(closer) => return Some(i),
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax_error(tpl: &str) -> String {
        match parse_template(tpl) {
            Err(TemplateError::Syntax(msg)) => msg,
            other => panic!("Expected syntax error for {:?}, got {:?}", tpl, other),
        }
    }

    #[test]
    fn test_parse_simple_text() {
        let nodes = parse_template("hello world").unwrap();
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            Node::Text(t) => assert_eq!(t, "hello world"),
            _ => panic!("Expected Text"),
        }
    }

    #[test]
    fn test_parse_single_brace_is_text() {
        let nodes = parse_template("a { b } c").unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_parse_var() {
        let nodes = parse_template("hello {{name}}!").unwrap();
        assert_eq!(nodes.len(), 3);
        match &nodes[1] {
            Node::Variable { path, escape } => {
                assert_eq!(*path, Path::Named(vec!["name".to_string()]));
                assert!(*escape);
            }
            other => panic!("Expected Variable, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_raw_forms() {
        for tpl in ["{{{ body }}}", "{{& body}}"] {
            let nodes = parse_template(tpl).unwrap();
            match &nodes[0] {
                Node::Variable { escape, .. } => assert!(!*escape),
                other => panic!("Expected Variable, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(parse_path("this"), Some(Path::This(vec![])));
        assert_eq!(
            parse_path("this.name"),
            Some(Path::This(vec!["name".to_string()]))
        );
        assert_eq!(parse_path("@index"), Some(Path::Local("index".to_string())));
        assert_eq!(
            parse_path("data.model.name"),
            Some(Path::Named(vec![
                "data".to_string(),
                "model".to_string(),
                "name".to_string()
            ]))
        );
        assert_eq!(parse_path("a..b"), None);
    }

    #[test]
    fn test_bare_identifier_is_variable_not_helper() {
        let nodes = parse_template("{{hello}}").unwrap();
        assert!(matches!(nodes[0], Node::Variable { .. }));

        let nodes = parse_template("{{hello title}}").unwrap();
        match &nodes[0] {
            Node::HelperCall { name, params, .. } => {
                assert_eq!(name, "hello");
                assert_eq!(
                    params,
                    &vec![Param::Path(Path::Named(vec!["title".to_string()]))]
                );
            }
            other => panic!("Expected HelperCall, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_literals_and_hash() {
        let nodes = parse_template(r#"{{fmt "a b" 'c' 1 -2.5 true null size=10}}"#).unwrap();
        match &nodes[0] {
            Node::HelperCall { params, hash, .. } => {
                assert_eq!(
                    params,
                    &vec![
                        Param::Literal(Value::Str("a b".to_string())),
                        Param::Literal(Value::Str("c".to_string())),
                        Param::Literal(Value::I64(1)),
                        Param::Literal(Value::F64(-2.5)),
                        Param::Literal(Value::Bool(true)),
                        Param::Literal(Value::Null),
                    ]
                );
                assert_eq!(hash.get("size"), Some(&Param::Literal(Value::I64(10))));
            }
            other => panic!("Expected HelperCall, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_else() {
        let nodes = parse_template("{{#if x}}OK{{else}}ERROR{{/if}}").unwrap();
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            Node::Block {
                keyword,
                params,
                body,
                inverse,
            } => {
                assert_eq!(*keyword, Keyword::If);
                assert_eq!(params.len(), 1);
                assert!(matches!(&body[0], Node::Text(t) if t == "OK"));
                let inverse = inverse.as_ref().expect("Expected inverse body");
                assert!(matches!(&inverse[0], Node::Text(t) if t == "ERROR"));
            }
            other => panic!("Expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested() {
        let nodes = parse_template("{{#with a}}{{#each list}}{{name}}{{/each}}{{/with}}").unwrap();
        match &nodes[0] {
            Node::Block { keyword, body, .. } => {
                assert_eq!(*keyword, Keyword::With);
                match &body[0] {
                    Node::Block { keyword, body, .. } => {
                        assert_eq!(*keyword, Keyword::Each);
                        assert_eq!(body.len(), 1);
                    }
                    other => panic!("Expected each Block, got {:?}", other),
                }
            }
            other => panic!("Expected with Block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_block_helper_partial_and_regions() {
        let nodes =
            parse_template(r#"{{#bold title}}x{{/bold}}{{> header data}}{{#block "content"}}d{{/block}}{{#partial "content"}}o{{/partial}}"#)
                .unwrap();
        assert!(matches!(&nodes[0], Node::BlockHelper { name, .. } if name == "bold"));
        match &nodes[1] {
            Node::Partial { name, context } => {
                assert_eq!(name, "header");
                assert_eq!(
                    context,
                    &Some(Param::Path(Path::Named(vec!["data".to_string()])))
                );
            }
            other => panic!("Expected Partial, got {:?}", other),
        }
        assert!(matches!(&nodes[2], Node::Region { name, .. } if name == "content"));
        assert!(matches!(&nodes[3], Node::Override { name, .. } if name == "content"));
    }

    #[test]
    fn test_comments_are_dropped() {
        let nodes = parse_template("a{{! note }}b{{!-- {{x}} --}}c").unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(matches!(&nodes[0], Node::Text(t) if t == "abc"));
    }

    #[test]
    fn test_standalone_block_lines() {
        let nodes = parse_template("{{#if x}}\n  line\n{{/if}}").unwrap();
        match &nodes[0] {
            Node::Block { body, .. } => {
                assert!(matches!(&body[0], Node::Text(t) if t == "  line\n"));
            }
            other => panic!("Expected Block, got {:?}", other),
        }

        let nodes = parse_template("  {{#if x}}\n  a\n  {{/if}}\nb").unwrap();
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            Node::Block { body, .. } => {
                assert_eq!(body.len(), 1);
                assert!(matches!(&body[0], Node::Text(t) if t == "  a\n"));
            }
            other => panic!("Expected Block, got {:?}", other),
        }
        assert!(matches!(&nodes[1], Node::Text(t) if t == "b"));

        let nodes = parse_template("{{#if x}} line {{/if}}").unwrap();
        match &nodes[0] {
            Node::Block { body, .. } => {
                assert!(matches!(&body[0], Node::Text(t) if t == " line "));
            }
            other => panic!("Expected Block, got {:?}", other),
        }
    }

    #[test]
    fn test_tag_on_shared_line_keeps_text() {
        let nodes = parse_template("<pre>{{#if x}}\n  a\n{{/if}}</pre>").unwrap();
        match &nodes[1] {
            Node::Block { body, .. } => {
                assert!(matches!(&body[0], Node::Text(t) if t == "\n  a\n"));
            }
            other => panic!("Expected Block, got {:?}", other),
        }
        assert!(matches!(&nodes[2], Node::Text(t) if t == "</pre>"));
    }

    #[test]
    fn test_quoted_closer_inside_tag() {
        let nodes = parse_template(r#"{{id "a}}b"}}"#).unwrap();
        match &nodes[0] {
            Node::HelperCall { name, params, .. } => {
                assert_eq!(name, "id");
                assert_eq!(params, &vec![Param::Literal(Value::Str("a}}b".to_string()))]);
            }
            other => panic!("Expected HelperCall, got {:?}", other),
        }
        assert_eq!(find_tag_end(r#"x 'a\'}}' }}"#, "}}"), Some(10));
    }

    #[test]
    fn test_hash_on_built_in_block() {
        let msg = syntax_error("{{#if x a=1}}y{{/if}}");
        assert!(msg.contains("does not take hash arguments"), "{}", msg);
        syntax_error(r#"{{#block "body" a=1}}y{{/block}}"#);
    }

    #[test]
    fn test_unclosed_block() {
        let msg = syntax_error("{{#if x}}content");
        assert!(msg.contains("unclosed block"), "{}", msg);
        assert!(msg.contains("line 1, column 1"), "{}", msg);
    }

    #[test]
    fn test_mismatched_closer() {
        let msg = syntax_error("{{#if x}}a{{/each}}");
        assert!(msg.contains("mismatched closing tag"), "{}", msg);
    }

    #[test]
    fn test_malformed_tags() {
        syntax_error("{{/if}}");
        syntax_error("{{else}}");
        syntax_error("{{#if x}}a{{else}}b{{else}}c{{/if}}");
        syntax_error("hello {{name");
        syntax_error("{{{name}}");
        syntax_error("{{}}");
        syntax_error("{{#}}{{/}}");
        syntax_error("{{>}}");
        syntax_error(r#"{{hello "unterminated}}"#);
        syntax_error("{{#if}}x{{/if}}");
        syntax_error("{{a..b}}");
    }

    #[test]
    fn test_error_position() {
        let msg = syntax_error("line one\n  {{/if}}");
        assert!(msg.contains("line 2, column 3"), "{}", msg);
    }
}
