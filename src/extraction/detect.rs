use super::Format;

const IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".webp"];
const PDF_MIME: &str = "application/pdf";
const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
const TEXT_MIME: &str = "text/plain";

/// Classify an artifact from its declared filename and mime type.
///
/// Both inputs may be empty and are compared case-insensitively. Mime parameters such as
/// `; charset=utf-8` are ignored. The first matching rule wins: image, pdf, docx, pptx, text.
pub fn detect_format(filename: &str, mime: &str) -> Format {
    let name = filename.trim().to_lowercase();
    let mime = mime_essence(mime);

    if mime.starts_with("image/") || IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        Format::Image
    } else if name.ends_with(".pdf") || mime == PDF_MIME {
        Format::Pdf
    } else if name.ends_with(".docx") {
        Format::Docx
    } else if name.ends_with(".pptx") || mime == PPTX_MIME {
        Format::Pptx
    } else if mime == TEXT_MIME || name.ends_with(".txt") {
        Format::PlainText
    } else {
        Format::Unsupported
    }
}

fn mime_essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}
