//! Shared helpers for Office Open XML packages (ZIP containers of XML parts).

use super::{ExtractionError, Format};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

/// An opened OOXML package.
pub(crate) struct OoxmlPackage<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    format: Format,
}

/// `Relationship` entry from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub(crate) id: String,
    pub(crate) rel_type: String,
    pub(crate) target: String,
}

impl<'a> OoxmlPackage<'a> {
    pub(crate) fn open(bytes: &'a [u8], format: Format) -> Result<Self, ExtractionError> {
        if !bytes.starts_with(ZIP_SIGNATURE) {
            return Err(ExtractionError::corrupt(format, "missing ZIP signature"));
        }
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|error| ExtractionError::corrupt(format, error))?;
        Ok(Self { archive, format })
    }

    pub(crate) fn has_part(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    pub(crate) fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Read a part as UTF-8; `Ok(None)` when the package does not contain it.
    pub(crate) fn read_part(&mut self, name: &str) -> Result<Option<String>, ExtractionError> {
        let format = self.format;
        match self.archive.by_name(name) {
            Ok(mut file) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents)
                    .map_err(|error| ExtractionError::corrupt(format, format!("{name}: {error}")))?;
                Ok(Some(contents))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(ExtractionError::corrupt(format, format!("{name}: {error}"))),
        }
    }

    /// Relationships declared for `part`, read from its sibling `_rels/<file>.rels`.
    pub(crate) fn relationships(
        &mut self,
        part: &str,
    ) -> Result<Vec<Relationship>, ExtractionError> {
        let rels_name = rels_path_for(part);
        match self.read_part(&rels_name)? {
            Some(xml) => parse_relationships(&xml).map_err(|error| {
                ExtractionError::corrupt(self.format, format!("{rels_name}: {error}"))
            }),
            None => Ok(Vec::new()),
        }
    }
}

fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut relationships = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = String::new();
                let mut rel_type = String::new();
                let mut target = String::new();
                for attribute in element.attributes() {
                    let attribute = attribute?;
                    let value = attribute.unescape_value()?.into_owned();
                    match attribute.key.as_ref() {
                        b"Id" => id = value,
                        b"Type" => rel_type = value,
                        b"Target" => target = value,
                        _ => {}
                    }
                }
                relationships.push(Relationship {
                    id,
                    rel_type,
                    target,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(relationships)
}

/// Resolve a relationship target against the directory of the part that declared it.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
pub(crate) fn build_package(parts: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, contents) in parts {
        writer.start_file(*name, options).expect("start part");
        writer.write_all(contents.as_bytes()).expect("write part");
    }
    writer.finish().expect("finish package").into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute_targets() {
        assert_eq!(
            resolve_target("ppt/presentation.xml", "slides/slide1.xml"),
            "ppt/slides/slide1.xml"
        );
        assert_eq!(
            resolve_target("ppt/slides/slide3.xml", "../notesSlides/notesSlide3.xml"),
            "ppt/notesSlides/notesSlide3.xml"
        );
        assert_eq!(
            resolve_target("ppt/presentation.xml", "/ppt/slides/slide9.xml"),
            "ppt/slides/slide9.xml"
        );
    }

    #[test]
    fn rels_path_sits_beside_the_part() {
        assert_eq!(
            rels_path_for("ppt/slides/slide2.xml"),
            "ppt/slides/_rels/slide2.xml.rels"
        );
        assert_eq!(rels_path_for("document.xml"), "_rels/document.xml.rels");
    }

    #[test]
    fn parses_relationship_entries() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>
</Relationships>"#;
        let relationships = parse_relationships(xml).expect("rels");
        assert_eq!(relationships.len(), 2);
        assert_eq!(relationships[0].id, "rId2");
        assert!(relationships[0].rel_type.ends_with("/slide"));
        assert_eq!(relationships[0].target, "slides/slide1.xml");
    }

    #[test]
    fn open_rejects_non_zip_bytes() {
        let error = OoxmlPackage::open(b"plain words", Format::Docx)
            .err()
            .expect("corrupt");
        assert!(matches!(
            error,
            ExtractionError::Corrupt {
                format: Format::Docx,
                ..
            }
        ));
    }

    #[test]
    fn reads_present_and_missing_parts() {
        let bytes = build_package(&[("word/document.xml", "<w:document/>")]);
        let mut package = OoxmlPackage::open(&bytes, Format::Docx).expect("package");
        assert!(package.has_part("word/document.xml"));
        assert_eq!(
            package.read_part("word/document.xml").expect("read"),
            Some("<w:document/>".to_string())
        );
        assert_eq!(package.read_part("word/missing.xml").expect("read"), None);
    }
}
