use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Syntax Error: {0}")]
    Syntax(String),
    #[error("Template Not Found: {0}")]
    NotFound(String),
    #[error("Helper Not Found: {0}")]
    HelperNotFound(String),
    #[error("Helper Error: {0}")]
    Helper(String),
    #[error("Render Error: {0}")]
    Render(String),
    #[error("Type Mismatch: {0}")]
    TypeMismatch(String),
    #[error("Serialization Error: {0}")]
    Serialization(String),
    #[error("Template Load Error: {0}")]
    TemplateLoad(String),
}

impl serde::ser::Error for TemplateError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        TemplateError::Serialization(msg.to_string())
    }
}
