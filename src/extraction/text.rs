use super::{ExtractionError, Extractor};

/// Direct UTF-8 decode; invalid sequences become U+FFFD.
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn name(&self) -> &'static str {
        "plain-text"
    }
}
