use super::{DocxExtractor, Extractor, Format, PdfExtractor, PlainTextExtractor, PptxExtractor};
use std::collections::HashMap;

/// Deferred constructor for a format's extractor.
pub type ExtractorFactory = fn() -> Box<dyn Extractor>;

/// Maps each text-bearing [`Format`] to the factory of its extractor.
///
/// Lookups are pure data; an extractor is only built once its format has been selected for a
/// request, so parsers for unused formats never pay their setup cost.
#[derive(Clone)]
pub struct ExtractorRegistry {
    factories: HashMap<Format, ExtractorFactory>,
}

impl ExtractorRegistry {
    /// Registry with the built-in pdf, docx, pptx, and plain-text extractors.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Format::Pdf, || Box::new(PdfExtractor));
        registry.register(Format::Docx, || Box::new(DocxExtractor));
        registry.register(Format::Pptx, || Box::new(PptxExtractor));
        registry.register(Format::PlainText, || Box::new(PlainTextExtractor));
        registry
    }

    /// Registry without any extractors.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Install or replace the factory for `format`.
    pub fn register(&mut self, format: Format, factory: ExtractorFactory) {
        self.factories.insert(format, factory);
    }

    /// Whether an extractor is registered for `format`.
    pub fn supports(&self, format: Format) -> bool {
        self.factories.contains_key(&format)
    }

    /// Build the extractor for `format`, if one is registered.
    pub fn resolve(&self, format: Format) -> Option<Box<dyn Extractor>> {
        self.factories.get(&format).map(|factory| factory())
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_covers_text_bearing_formats() {
        let registry = ExtractorRegistry::new();
        for format in [Format::Pdf, Format::Docx, Format::Pptx, Format::PlainText] {
            assert!(registry.supports(format), "{format} should be registered");
        }
        assert!(registry.resolve(Format::Image).is_none());
        assert!(registry.resolve(Format::Unsupported).is_none());
    }

    #[test]
    fn resolve_builds_matching_extractor() {
        let registry = ExtractorRegistry::new();
        let extractor = registry.resolve(Format::PlainText).expect("text extractor");
        assert_eq!(extractor.name(), "plain-text");
        assert_eq!(extractor.extract(b"hello").expect("text"), "hello");
    }

    #[test]
    fn register_overrides_builtin_factory() {
        struct Shouty;
        impl Extractor for Shouty {
            fn extract(&self, bytes: &[u8]) -> Result<String, crate::extraction::ExtractionError> {
                Ok(String::from_utf8_lossy(bytes).to_uppercase())
            }
            fn name(&self) -> &'static str {
                "shouty"
            }
        }

        let mut registry = ExtractorRegistry::new();
        registry.register(Format::PlainText, || Box::new(Shouty));
        let extractor = registry.resolve(Format::PlainText).expect("override");
        assert_eq!(extractor.extract(b"quiet").expect("text"), "QUIET");
    }
}
