use super::ooxml::{OoxmlPackage, resolve_target};
use super::{ExtractionError, Extractor, Format};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const NOTES_SLIDE_REL_SUFFIX: &str = "/notesSlide";

/// Presentation extraction over the raw OOXML package.
///
/// Slides are emitted in presentation order. Each slide contributes its text followed by its
/// speaker notes on the next line; slides are separated by a blank line.
pub struct PptxExtractor;

impl Extractor for PptxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut package = OoxmlPackage::open(bytes, Format::Pptx)?;
        if !package.has_part(PRESENTATION_PART) {
            return Err(ExtractionError::unsupported(
                Format::Pptx,
                format!("package has no {PRESENTATION_PART} part"),
            ));
        }

        let slide_parts = ordered_slide_parts(&mut package)?;
        let mut slides = Vec::with_capacity(slide_parts.len());
        for slide_part in &slide_parts {
            let xml = package.read_part(slide_part)?.ok_or_else(|| {
                ExtractionError::corrupt(Format::Pptx, format!("missing slide part {slide_part}"))
            })?;
            let text = paragraphs(&xml, TextScope::AllShapes, slide_part)?.join("\n");
            let notes = slide_notes(&mut package, slide_part)?;

            let combined = [text, notes]
                .into_iter()
                .filter(|part| !part.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if !combined.is_empty() {
                slides.push(combined);
            }
        }

        tracing::debug!(
            slides = slide_parts.len(),
            with_text = slides.len(),
            "PPTX extracted"
        );
        Ok(slides.join("\n\n").trim().to_string())
    }

    fn name(&self) -> &'static str {
        "pptx"
    }
}

/// Slide parts in presentation order, falling back to slide-file numbering.
fn ordered_slide_parts(package: &mut OoxmlPackage<'_>) -> Result<Vec<String>, ExtractionError> {
    let presentation = package.read_part(PRESENTATION_PART)?.unwrap_or_default();
    let slide_ids = slide_relationship_ids(&presentation)
        .map_err(|error| ExtractionError::corrupt(Format::Pptx, error))?;
    let relationships = package.relationships(PRESENTATION_PART)?;

    let ordered: Vec<String> = slide_ids
        .iter()
        .filter_map(|id| relationships.iter().find(|rel| &rel.id == id))
        .map(|rel| resolve_target(PRESENTATION_PART, &rel.target))
        .filter(|part| package.has_part(part))
        .collect();
    if !ordered.is_empty() {
        return Ok(ordered);
    }

    let mut numbered: Vec<(u32, String)> = package
        .part_names()
        .into_iter()
        .filter_map(|name| slide_number(&name).map(|number| (number, name)))
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

fn slide_number(part: &str) -> Option<u32> {
    part.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn slide_relationship_ids(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"sldId" =>
            {
                if let Some(id) = relationship_id(&element)? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// The prefixed `id` attribute (`r:id` in most decks); the bare `id` is the slide number.
fn relationship_id(element: &BytesStart<'_>) -> Result<Option<String>, quick_xml::Error> {
    for attribute in element.attributes() {
        let attribute = attribute?;
        let key = attribute.key;
        if key.prefix().is_some()
            && key.as_namespace_binding().is_none()
            && key.local_name().as_ref() == b"id"
        {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn slide_notes(
    package: &mut OoxmlPackage<'_>,
    slide_part: &str,
) -> Result<String, ExtractionError> {
    let notes_part = package
        .relationships(slide_part)?
        .into_iter()
        .find(|rel| rel.rel_type.ends_with(NOTES_SLIDE_REL_SUFFIX))
        .map(|rel| resolve_target(slide_part, &rel.target));

    let Some(notes_part) = notes_part else {
        return Ok(String::new());
    };
    match package.read_part(&notes_part)? {
        Some(xml) => Ok(paragraphs(&xml, TextScope::BodyPlaceholder, &notes_part)?.join("\n")),
        None => Ok(String::new()),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TextScope {
    /// Every DrawingML paragraph on the slide, shapes and tables alike.
    AllShapes,
    /// Only shapes bound to the body placeholder (speaker notes text).
    BodyPlaceholder,
}

#[derive(Default)]
struct ShapeText {
    is_body: bool,
    paragraphs: Vec<String>,
}

fn paragraphs(xml: &str, scope: TextScope, part: &str) -> Result<Vec<String>, ExtractionError> {
    collect_paragraphs(xml, scope)
        .map_err(|error| ExtractionError::corrupt(Format::Pptx, format!("{part}: {error}")))
}

fn collect_paragraphs(xml: &str, scope: TextScope) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut collected = Vec::new();
    let mut shape: Option<ShapeText> = None;
    let mut paragraph: Option<String> = None;
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => match element.local_name().as_ref() {
                b"sp" => shape = Some(ShapeText::default()),
                b"ph" => mark_placeholder(&element, shape.as_mut())?,
                b"p" => paragraph = Some(String::new()),
                b"t" => in_text_run = true,
                _ => {}
            },
            Event::Empty(element) => match element.local_name().as_ref() {
                b"ph" => mark_placeholder(&element, shape.as_mut())?,
                b"br" => {
                    if let Some(text) = paragraph.as_mut() {
                        text.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(text) if in_text_run => {
                if let Some(current) = paragraph.as_mut() {
                    current.push_str(&text.unescape()?);
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    let Some(text) = paragraph.take() else {
                        continue;
                    };
                    if text.trim().is_empty() {
                        continue;
                    }
                    match shape.as_mut() {
                        Some(shape) => shape.paragraphs.push(text),
                        None if scope == TextScope::AllShapes => collected.push(text),
                        None => {}
                    }
                }
                b"sp" => {
                    if let Some(finished) = shape.take() {
                        if scope == TextScope::AllShapes || finished.is_body {
                            collected.extend(finished.paragraphs);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(collected)
}

fn mark_placeholder(
    element: &BytesStart<'_>,
    shape: Option<&mut ShapeText>,
) -> Result<(), quick_xml::Error> {
    if let Some(shape) = shape {
        if let Some(kind) = element.try_get_attribute("type")? {
            if kind.value.as_ref() == b"body" {
                shape.is_body = true;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ooxml::build_package;

    const SLIDE_REL: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    const NOTES_REL: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";

    fn slide_xml(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|text| format!("<a:p><a:r><a:t>{text}</a:t></a:r></a:p>"))
            .collect();
        format!(
            r#"<p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree><p:sp><p:txBody>{body}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
        )
    }

    fn notes_xml(text: &str) -> String {
        format!(
            r#"<p:notes xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree>
<p:sp><p:nvSpPr><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr></p:sp>
<p:sp><p:nvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>
<p:sp><p:nvSpPr><p:nvPr><p:ph type="sldNum" idx="5"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>7</a:t></a:r></a:p></p:txBody></p:sp>
</p:spTree></p:cSld></p:notes>"#
        )
    }

    fn presentation(order: &[&str]) -> String {
        let ids: String = order
            .iter()
            .enumerate()
            .map(|(index, rid)| format!(r#"<p:sldId id="{}" r:id="{rid}"/>"#, 256 + index))
            .collect();
        format!(
            r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
        )
    }

    fn presentation_rels() -> String {
        format!(
            r#"<Relationships><Relationship Id="rId2" Type="{SLIDE_REL}" Target="slides/slide1.xml"/><Relationship Id="rId3" Type="{SLIDE_REL}" Target="slides/slide2.xml"/></Relationships>"#
        )
    }

    #[test]
    fn follows_presentation_order_and_appends_notes() {
        let slide1 = slide_xml(&["Intro", "Agenda"]);
        let slide2 = slide_xml(&["Results &amp; outlook"]);
        let notes2 = notes_xml("Mention the Q3 dip");
        let slide2_rels = format!(
            r#"<Relationships><Relationship Id="rId1" Type="{NOTES_REL}" Target="../notesSlides/notesSlide1.xml"/></Relationships>"#
        );
        let presentation = presentation(&["rId3", "rId2"]);
        let rels = presentation_rels();
        let bytes = build_package(&[
            ("ppt/presentation.xml", presentation.as_str()),
            ("ppt/_rels/presentation.xml.rels", rels.as_str()),
            ("ppt/slides/slide1.xml", slide1.as_str()),
            ("ppt/slides/slide2.xml", slide2.as_str()),
            ("ppt/slides/_rels/slide2.xml.rels", slide2_rels.as_str()),
            ("ppt/notesSlides/notesSlide1.xml", notes2.as_str()),
        ]);

        let text = PptxExtractor.extract(&bytes).expect("pptx text");
        assert_eq!(
            text,
            "Results & outlook\nMention the Q3 dip\n\nIntro\nAgenda"
        );
    }

    #[test]
    fn falls_back_to_numeric_slide_order() {
        let slide2 = slide_xml(&["second"]);
        let slide10 = slide_xml(&["tenth"]);
        let slide1 = slide_xml(&["first"]);
        let bytes = build_package(&[
            ("ppt/presentation.xml", "<p:presentation xmlns:p=\"p\"/>"),
            ("ppt/slides/slide10.xml", slide10.as_str()),
            ("ppt/slides/slide2.xml", slide2.as_str()),
            ("ppt/slides/slide1.xml", slide1.as_str()),
        ]);

        let text = PptxExtractor.extract(&bytes).expect("pptx text");
        assert_eq!(text, "first\n\nsecond\n\ntenth");
    }

    #[test]
    fn notes_only_slide_keeps_notes() {
        let empty_slide = slide_xml(&[]);
        let notes = notes_xml("Speaker only");
        let slide_rels = format!(
            r#"<Relationships><Relationship Id="rId1" Type="{NOTES_REL}" Target="../notesSlides/notesSlide1.xml"/></Relationships>"#
        );
        let bytes = build_package(&[
            ("ppt/presentation.xml", "<p:presentation xmlns:p=\"p\"/>"),
            ("ppt/slides/slide1.xml", empty_slide.as_str()),
            ("ppt/slides/_rels/slide1.xml.rels", slide_rels.as_str()),
            ("ppt/notesSlides/notesSlide1.xml", notes.as_str()),
        ]);

        let text = PptxExtractor.extract(&bytes).expect("pptx text");
        assert_eq!(text, "Speaker only");
    }

    #[test]
    fn namespace_prefixes_do_not_matter() {
        let presentation = r#"<pp:presentation xmlns:pp="p" xmlns:rr="r"><pp:sldIdLst><pp:sldId id="256" rr:id="rId3"/><pp:sldId id="257" rr:id="rId2"/></pp:sldIdLst></pp:presentation>"#;
        let rels = presentation_rels();
        let slide1 = r#"<sld xmlns="p" xmlns:d="a"><cSld><spTree><sp><txBody><d:p><d:r><d:t>Default namespace</d:t></d:r></d:p></txBody></sp></spTree></cSld></sld>"#;
        let slide2 = r#"<x:sld xmlns:x="p" xmlns:dd="a"><x:cSld><x:spTree><x:sp><x:txBody><dd:p><dd:r><dd:t>Renamed</dd:t></dd:r><dd:br/><dd:r><dd:t>prefixes</dd:t></dd:r></dd:p></x:txBody></x:sp></x:spTree></x:cSld></x:sld>"#;
        let bytes = build_package(&[
            ("ppt/presentation.xml", presentation),
            ("ppt/_rels/presentation.xml.rels", rels.as_str()),
            ("ppt/slides/slide1.xml", slide1),
            ("ppt/slides/slide2.xml", slide2),
        ]);

        let text = PptxExtractor.extract(&bytes).expect("pptx text");
        assert_eq!(text, "Renamed\nprefixes\n\nDefault namespace");
    }

    #[test]
    fn package_without_presentation_is_unsupported_subformat() {
        let bytes = build_package(&[("word/document.xml", "<w:document/>")]);
        let error = PptxExtractor.extract(&bytes).expect_err("unsupported");
        assert!(matches!(
            error,
            ExtractionError::UnsupportedSubformat {
                format: Format::Pptx,
                ..
            }
        ));
    }

    #[test]
    fn malformed_slide_xml_is_corrupt() {
        let bytes = build_package(&[
            ("ppt/presentation.xml", "<p:presentation xmlns:p=\"p\"/>"),
            ("ppt/slides/slide1.xml", "<p:sld><a:p><a:t>oops</a:p></p:sld>"),
        ]);
        let error = PptxExtractor.extract(&bytes).expect_err("corrupt");
        assert!(matches!(error, ExtractionError::Corrupt { .. }));
    }
}
