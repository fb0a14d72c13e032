pub(crate) mod ast;
pub(crate) mod cache;
pub mod escape;
pub(crate) mod parser;
pub(crate) mod render;
pub(crate) mod render_context;
