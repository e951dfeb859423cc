use std::{io, path::Path};

use roxmltree::{Document, Node, ParsingOptions};

use crate::domain::DocumentNode;

/// Errors that can occur when loading the specification document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The document file was not found.
    #[error("specification document not found")]
    NotFound,
    /// An I/O error occurred.
    #[error("failed to read specification document")]
    Io(#[from] io::Error),
    /// The document is not well-formed XML.
    #[error("failed to parse specification document: {0}")]
    Parse(#[from] roxmltree::Error),
}

/// Reads the document at `path` into memory.
///
/// # Errors
///
/// Returns [`DocumentError::NotFound`] if the file does not exist, or
/// [`DocumentError::Io`] if it cannot be read.
pub fn read(path: &Path) -> Result<String, DocumentError> {
    std::fs::read_to_string(path).map_err(|io_error| match io_error.kind() {
        io::ErrorKind::NotFound => DocumentError::NotFound,
        _ => DocumentError::Io(io_error),
    })
}

/// Parses XHTML text into a navigable tree.
///
/// Document type declarations are allowed, since published XHTML carries one.
///
/// # Errors
///
/// Returns [`DocumentError::Parse`] if the text is not well-formed.
pub fn parse(text: &str) -> Result<Document<'_>, DocumentError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Ok(Document::parse_with_options(text, options)?)
}

impl<'a, 'input: 'a> DocumentNode for Node<'a, 'input> {
    fn tag(&self) -> Option<&str> {
        self.is_element().then(|| self.tag_name().name())
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        Node::attribute(self, name)
    }

    fn children(&self) -> impl Iterator<Item = Self> {
        Node::children(self)
    }

    fn text(&self) -> String {
        self.descendants()
            .filter(Node::is_text)
            .filter_map(|node| Node::text(&node))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
  <body>
    <div class="section">
      <h2 class="title"><a id="commandbuffers-pools"></a>5.1.Command Pools</h2>
    </div>
  </body>
</html>"#;

    #[test]
    fn parses_xhtml_with_doctype() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.root_element().tag(), Some("html"));
    }

    #[test]
    fn tags_ignore_the_namespace() {
        let doc = parse(SAMPLE).unwrap();
        let heading = doc
            .descendants()
            .find(|node| node.is("h2"))
            .expect("heading should be present");

        assert!(heading.has_class("title"));
        assert_eq!(DocumentNode::text(&heading), "5.1.Command Pools");
        assert_eq!(
            DocumentNode::first_element_child(&heading)
                .and_then(|anchor| anchor.attribute("id").map(str::to_string)),
            Some("commandbuffers-pools".to_string())
        );
    }

    #[test]
    fn text_nodes_have_no_tag() {
        let doc = parse("<p>hello <b>world</b></p>").unwrap();
        let root = doc.root_element();
        let first = DocumentNode::children(&root).next().unwrap();
        assert_eq!(first.tag(), None);
        assert_eq!(DocumentNode::text(&root), "hello world");
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        assert!(matches!(parse("<p>unclosed"), Err(DocumentError::Parse(_))));
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let error = read(&tmp.path().join("missing.html")).unwrap_err();
        assert!(matches!(error, DocumentError::NotFound));
    }

    #[test]
    fn read_returns_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        assert_eq!(read(file.path()).unwrap(), SAMPLE);
    }
}
