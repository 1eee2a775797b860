//! Stage 1: syntactic validity.
//!
//! Builds the document tree that later stages reuse, or reports a single FATAL
//! `MALFORMED_XML` error that ends the pipeline.

use crate::diagnostics::{ErrorCode, Locator, ValidationError};
use crate::tree::XmlTree;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const DTD_REJECTED: &str = "Document type declarations are rejected by the DTD policy; \
     enable allow_dtd (--allow-dtd) to accept this document";

/// Outcome of the well-formedness check
pub enum WellFormedness<'input> {
    WellFormed(XmlTree<'input>),
    Malformed(ValidationError),
}

impl<'input> WellFormedness<'input> {
    pub fn is_well_formed(&self) -> bool {
        matches!(self, WellFormedness::WellFormed(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct WellFormednessChecker {
    allow_dtd: bool,
}

impl WellFormednessChecker {
    pub fn new(allow_dtd: bool) -> Self {
        Self { allow_dtd }
    }

    pub fn check<'input>(&self, bytes: &'input [u8]) -> WellFormedness<'input> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        if bytes.starts_with(b"\xFF\xFE") || bytes.starts_with(b"\xFE\xFF") {
            return WellFormedness::Malformed(
                ValidationError::fatal(
                    ErrorCode::MalformedXml,
                    "UTF-16 input is not supported; re-encode the file as UTF-8",
                )
                .at(Locator::position(1, 1)),
            );
        }

        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                let (line, column) = position_of(&bytes[..e.valid_up_to()]);
                return WellFormedness::Malformed(
                    ValidationError::fatal(
                        ErrorCode::MalformedXml,
                        format!("Invalid UTF-8 byte sequence: {}", e),
                    )
                    .at(Locator::position(line, column)),
                );
            }
        };

        match XmlTree::parse(text, self.allow_dtd) {
            Ok(tree) => WellFormedness::WellFormed(tree),
            Err(e) => {
                let pos = e.pos();
                let message = match e {
                    roxmltree::Error::DtdDetected => DTD_REJECTED.to_string(),
                    e => e.to_string(),
                };
                WellFormedness::Malformed(
                    ValidationError::fatal(ErrorCode::MalformedXml, message)
                        .at(Locator::position(pos.row, pos.col)),
                )
            }
        }
    }
}

/// 1-based line and column just past the given prefix
fn position_of(prefix: &[u8]) -> (u32, u32) {
    let text = String::from_utf8_lossy(prefix);
    let line = text.matches('\n').count() + 1;
    let column = match text.rfind('\n') {
        Some(idx) => text[idx + 1..].chars().count() + 1,
        None => text.chars().count() + 1,
    };
    (line as u32, column as u32)
}
