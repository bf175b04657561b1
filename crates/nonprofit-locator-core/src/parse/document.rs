// crates/nonprofit-locator-core/src/parse/document.rs
// ============================================================================
// Module: Document Tree Parser
// Description: Parses one XML filing into a namespace-free element tree.
// Purpose: Extract canonical fields from filings with varying schemas.
// Dependencies: quick-xml, serde, thiserror
// ============================================================================

//! ## Overview
//! Filings are published under several schema generations, so the same
//! logical field can live at different element paths and every element name
//! carries a namespace qualification. Parsing therefore:
//! 1. decodes the bytes (a leading UTF-8 BOM is tolerated; anything that is
//!    not UTF-8 or not well-formed XML is a [`DocumentError`]);
//! 2. keeps only each element's local name, dropping prefixes and attributes;
//! 3. resolves each [`DocumentField`] by trying its candidate paths in order.
//!
//! A candidate path such as `Filer/USAddress/CityNm` matches a chain of
//! directly nested elements starting anywhere in the tree. The first chain in
//! document order wins. No matching path yields [`FieldValue::Missing`].
//!
//! Element nesting is capped at [`MAX_DOCUMENT_DEPTH`]; deeper documents fail
//! while parsing, before any path lookup. Text is trimmed once per element, after
//! all of its fragments have been joined.

// ============================================================================
// SECTION: Imports
// ============================================================================

use quick_xml::Reader;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use serde::Serialize;
use thiserror::Error;

use crate::core::DocumentField;
use crate::core::DocumentRecord;
use crate::core::FieldValue;
use crate::core::RawRecord;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// UTF-8 byte-order mark.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Separator between path segments in candidate paths.
const PATH_SEPARATOR: char = '/';

/// Maximum element nesting depth accepted in one document.
pub const MAX_DOCUMENT_DEPTH: usize = 256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a document cannot be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum DocumentError {
    /// The bytes are not valid text.
    #[error("document is not decodable: {0}")]
    Undecodable(String),
    /// The text is not a well-formed XML document.
    #[error("document is malformed: {0}")]
    Malformed(String),
    /// Elements are nested deeper than [`MAX_DOCUMENT_DEPTH`].
    #[error("document nesting exceeds {max_depth} elements")]
    DepthLimitExceeded {
        /// Depth limit that was exceeded.
        max_depth: usize,
    },
}

// ============================================================================
// SECTION: Tree
// ============================================================================

/// Namespace-free element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentNode {
    /// Local element name.
    pub name: String,
    /// Text content directly inside the element, trimmed at both ends.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Self>,
}

impl DocumentNode {
    /// Creates an empty element.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Finds the first element chain matching `segments` in document order.
    #[must_use]
    pub fn find_path(&self, segments: &[&str]) -> Option<&Self> {
        let (first, rest) = segments.split_first()?;
        if self.name == *first
            && let Some(found) = self.descend(rest)
        {
            return Some(found);
        }
        self.children.iter().find_map(|child| child.find_path(segments))
    }

    /// Follows `segments` through direct children only.
    fn descend(&self, segments: &[&str]) -> Option<&Self> {
        let Some((next, rest)) = segments.split_first() else {
            return Some(self);
        };
        self.children.iter().filter(|child| child.name == *next).find_map(|child| child.descend(rest))
    }

    /// Returns the text of the first candidate path that matches.
    #[must_use]
    pub fn lookup(&self, candidates: &[String]) -> FieldValue {
        candidates
            .iter()
            .find_map(|candidate| {
                let segments: Vec<&str> =
                    candidate.split(PATH_SEPARATOR).filter(|segment| !segment.is_empty()).collect();
                self.find_path(&segments)
            })
            .map_or(FieldValue::Missing, |node| FieldValue::Present(node.text.clone()))
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses document bytes into a namespace-free tree.
///
/// # Errors
///
/// Returns [`DocumentError::Undecodable`] for non-UTF-8 input,
/// [`DocumentError::DepthLimitExceeded`] when nesting passes
/// [`MAX_DOCUMENT_DEPTH`], and [`DocumentError::Malformed`] for anything that
/// is not a single well-formed root element.
pub fn parse_document(bytes: &[u8]) -> Result<DocumentNode, DocumentError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text =
        std::str::from_utf8(bytes).map_err(|err| DocumentError::Undecodable(err.to_string()))?;
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<DocumentNode> = Vec::new();
    let mut root: Option<DocumentNode> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                check_depth(&stack)?;
                stack.push(DocumentNode::named(local_name(&start)));
            }
            Ok(Event::Empty(start)) => {
                check_depth(&stack)?;
                attach(&mut stack, &mut root, DocumentNode::named(local_name(&start)))?;
            }
            Ok(Event::End(_)) => {
                let mut node = stack
                    .pop()
                    .ok_or_else(|| DocumentError::Malformed("unbalanced end tag".to_string()))?;
                node.text = node.text.trim().to_string();
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(content)) => {
                if let Some(node) = stack.last_mut() {
                    let value =
                        content.unescape().map_err(|err| DocumentError::Malformed(err.to_string()))?;
                    node.text.push_str(&value);
                }
            }
            Ok(Event::CData(content)) => {
                if let Some(node) = stack.last_mut() {
                    let raw = content.into_inner();
                    let value = std::str::from_utf8(&raw)
                        .map_err(|err| DocumentError::Undecodable(err.to_string()))?;
                    node.text.push_str(value);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(DocumentError::Malformed(err.to_string())),
        }
    }
    if let Some(open) = stack.last() {
        return Err(DocumentError::Malformed(format!("unclosed element {}", open.name)));
    }
    root.ok_or_else(|| DocumentError::Malformed("document has no root element".to_string()))
}

/// Parses a document and extracts `fields` into a record.
///
/// # Errors
///
/// Returns [`DocumentError`] when the document cannot be parsed; missing
/// fields are never an error.
pub fn parse_document_record(
    bytes: &[u8],
    fields: &[DocumentField],
) -> Result<RawRecord, DocumentError> {
    let root = parse_document(bytes)?;
    Ok(RawRecord::Document(extract_fields(&root, fields)))
}

/// Extracts `fields` from a parsed tree in canonical order.
#[must_use]
pub fn extract_fields(root: &DocumentNode, fields: &[DocumentField]) -> DocumentRecord {
    DocumentRecord::new(
        fields.iter().map(|field| (field.column.clone(), root.lookup(&field.candidates))).collect(),
    )
}

/// Returns an element's name without its namespace prefix.
fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

/// Rejects a new element when the open chain is already at the depth cap.
const fn check_depth(stack: &[DocumentNode]) -> Result<(), DocumentError> {
    if stack.len() >= MAX_DOCUMENT_DEPTH {
        return Err(DocumentError::DepthLimitExceeded {
            max_depth: MAX_DOCUMENT_DEPTH,
        });
    }
    Ok(())
}

/// Attaches a completed element to its parent, or makes it the root.
fn attach(
    stack: &mut [DocumentNode],
    root: &mut Option<DocumentNode>,
    node: DocumentNode,
) -> Result<(), DocumentError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        Ok(())
    } else if root.is_none() {
        *root = Some(node);
        Ok(())
    } else {
        Err(DocumentError::Malformed("multiple root elements".to_string()))
    }
}
