//! Parsed subscription documents and the parser seam.

use crate::errors::{GatewayError, ValidationError};

/// A parsed subscription document.
///
/// Produced by a [`DocumentParser`]; the transport stores the original text
/// alongside it so handlers can re-execute against the engine's own AST.
#[derive(Clone, Debug)]
pub struct Document {
    text: String,
    operations: Vec<String>,
}

impl Document {
    /// Build a document from its source text and the operation names the
    /// parser found, in definition order.
    pub fn new(text: impl Into<String>, operations: Vec<String>) -> Self {
        Self {
            text: text.into(),
            operations,
        }
    }

    /// Original document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Operation names in definition order.
    pub fn operations(&self) -> &[String] {
        &self.operations
    }

    /// The trigger name of this document.
    ///
    /// Requires exactly one operation definition. Documents with zero or
    /// several operations are rejected here rather than silently picking
    /// one, so the error reaches the client as a validation failure.
    pub fn subscription_name(&self) -> Result<&str, ValidationError> {
        match self.operations.as_slice() {
            [single] => Ok(single),
            [] => Err(ValidationError::new(
                "subscription document contains no operation definition",
            )),
            many => Err(ValidationError::new(format!(
                "subscription document must contain exactly one operation definition, found {}",
                many.len()
            ))),
        }
    }
}

/// Parses and validates subscription documents.
///
/// Implemented by the embedding application on top of its GraphQL engine;
/// the transport only calls these two methods at subscribe time.
pub trait DocumentParser: Send + Sync {
    /// Parse document text. Syntax errors fail here.
    fn parse(&self, text: &str) -> Result<Document, GatewayError>;

    /// Validate a parsed document against the schema.
    ///
    /// An empty list means the document is acceptable.
    fn validate(&self, document: &Document) -> Vec<ValidationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_operation_resolves() {
        let doc = Document::new("subscription OnPost { x }", vec!["OnPost".into()]);
        assert_eq!(doc.subscription_name().unwrap(), "OnPost");
    }

    #[test]
    fn empty_document_is_a_validation_error() {
        let doc = Document::new("", vec![]);
        let err = doc.subscription_name().unwrap_err();
        assert!(err.message.contains("no operation"));
    }

    #[test]
    fn multi_operation_document_is_a_validation_error() {
        let doc = Document::new(
            "subscription A { x } subscription B { y }",
            vec!["A".into(), "B".into()],
        );
        let err = doc.subscription_name().unwrap_err();
        assert!(err.message.contains("exactly one"));
        assert!(err.message.contains('2'));
    }

    #[test]
    fn text_and_operations_accessors() {
        let doc = Document::new("subscription A { x }", vec!["A".into()]);
        assert_eq!(doc.text(), "subscription A { x }");
        assert_eq!(doc.operations(), ["A".to_owned()]);
    }
}
