use std::io::BufWriter;

use printpdf::{
    BuiltinFont, CustomPdfConformance, Mm, OffsetDateTime, PdfConformance, PdfDocument,
};

use super::layout::{FontWeight, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Page};
use crate::error::{IntakeError, Result};

const DOCUMENT_ID: &str = "symptom-analysis-report";

/// Renders laid-out pages to PDF bytes.
///
/// Metadata that would otherwise vary between runs (document id, timestamps,
/// XMP instance id) is pinned so that identical pages give identical bytes.
pub fn render_pdf(title: &str, pages: &[Page]) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let doc = doc
        .with_conformance(PdfConformance::Custom(CustomPdfConformance {
            requires_icc_profile: false,
            requires_xmp_metadata: false,
            allows_default_fonts: true,
            ..Default::default()
        }))
        .with_document_id(DOCUMENT_ID.to_string())
        .with_creation_date(OffsetDateTime::UNIX_EPOCH)
        .with_mod_date(OffsetDateTime::UNIX_EPOCH)
        .with_metadata_date(OffsetDateTime::UNIX_EPOCH);

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| IntakeError::ExportFailed(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| IntakeError::ExportFailed(format!("PDF font error: {e}")))?;

    let mut first = Some((first_page, first_layer));
    for page in pages {
        let (page_index, layer_index) = match first.take() {
            Some(indices) => indices,
            None => doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1"),
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        for line in &page.lines {
            let font = match line.weight {
                FontWeight::Regular => &regular,
                FontWeight::Bold => &bold,
            };
            layer.use_text(
                &line.text,
                line.size_pt,
                Mm(line.x_mm),
                Mm(PAGE_HEIGHT_MM - line.y_mm),
                font,
            );
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| IntakeError::ExportFailed(format!("PDF save error: {e}")))?;
    let mut bytes = buf
        .into_inner()
        .map_err(|e| IntakeError::ExportFailed(format!("PDF buffer error: {e}")))?;
    pin_trailer_id(&mut bytes);
    Ok(bytes)
}

/// The writer puts a random instance id into the trailer's `/ID` array. Overwrites the
/// array's string contents in place with a fixed character; lengths are unchanged, so
/// the cross-reference offsets stay valid.
fn pin_trailer_id(bytes: &mut [u8]) {
    let Some(trailer) = rfind(bytes, b"trailer") else {
        return;
    };
    let Some(id) = find(&bytes[trailer..], b"/ID") else {
        return;
    };
    let start = trailer + id;
    let Some(len) = bytes[start..].iter().position(|&b| b == b']') else {
        return;
    };

    let mut close = None;
    for b in &mut bytes[start..start + len] {
        match (*b, close) {
            (b'(', None) => close = Some(b')'),
            (b'<', None) => close = Some(b'>'),
            (c, Some(end)) if c == end => close = None,
            (_, Some(_)) => *b = b'0',
            _ => {}
        }
    }
}

fn find(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).position(|w| w == needle)
}

fn rfind(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len()).rposition(|w| w == needle)
}
