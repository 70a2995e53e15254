//! PDF to Markdown conversion.
//!
//! Text extraction is delegated to the `pdf-extract` crate; [`markdown`] only shapes the
//! extracted text into Markdown.

pub mod markdown;

use thiserror::Error;

/// Leading bytes of every PDF document.
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Errors raised while converting a PDF document.
#[derive(Debug, Error)]
pub enum PdfError {
    /// Input is not a well-formed PDF document.
    #[error("Invalid PDF document: {0}")]
    InvalidInput(String),
    /// Converter failed for reasons unrelated to the input.
    #[error("PDF converter unavailable: {0}")]
    Unavailable(String),
}

/// Converts PDF bytes into Markdown text.
///
/// Implementations are synchronous and CPU bound; callers run them on a blocking thread.
pub trait PdfConverter: Send + Sync {
    /// Convert a complete PDF document into Markdown.
    fn to_markdown(&self, bytes: &[u8]) -> Result<String, PdfError>;
}

/// Converter backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractConverter;

impl PdfExtractConverter {
    /// Construct a new converter.
    pub const fn new() -> Self {
        Self
    }
}

impl PdfConverter for PdfExtractConverter {
    fn to_markdown(&self, bytes: &[u8]) -> Result<String, PdfError> {
        ensure_pdf_signature(bytes)?;
        // pdf-extract panics on some malformed object graphs instead of returning an error.
        let extracted =
            std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
        let pages = extracted
            .map_err(|_| PdfError::InvalidInput("document structure is malformed".to_string()))?
            .map_err(|error| PdfError::InvalidInput(format!("text extraction failed: {error}")))?;
        Ok(markdown::pages_to_markdown(&pages))
    }
}

/// Reject input that does not start with the PDF signature.
pub fn ensure_pdf_signature(bytes: &[u8]) -> Result<(), PdfError> {
    if bytes.is_empty() {
        return Err(PdfError::InvalidInput("document is empty".to_string()));
    }
    if bytes.starts_with(PDF_SIGNATURE) {
        Ok(())
    } else {
        Err(PdfError::InvalidInput("missing %PDF- header".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdf_bytes() {
        let error = PdfExtractConverter::new()
            .to_markdown(b"hello, this is plain text")
            .expect_err("plain text");
        assert!(matches!(error, PdfError::InvalidInput(ref message) if message.contains("header")));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            ensure_pdf_signature(&[]),
            Err(PdfError::InvalidInput(_))
        ));
    }

    #[test]
    fn truncated_pdf_is_invalid_input() {
        let error = PdfExtractConverter::new()
            .to_markdown(b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog")
            .expect_err("truncated document");
        assert!(matches!(error, PdfError::InvalidInput(_)));
    }

    #[test]
    fn signature_must_open_the_document() {
        assert!(ensure_pdf_signature(b"%PDF-1.4").is_ok());

        let mut bytes = vec![b'\n'; 16];
        bytes.extend_from_slice(b"%PDF-1.4");
        assert!(ensure_pdf_signature(&bytes).is_err());
    }

    /// Assemble a minimal PDF with one Helvetica text run per page.
    fn text_pdf(pages: &[&str]) -> Vec<u8> {
        let font_id = 3 + 2 * pages.len();
        let kids: Vec<String> = (0..pages.len())
            .map(|index| format!("{} 0 R", 3 + 2 * index))
            .collect();

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                pages.len()
            ),
        ];
        for (index, text) in pages.iter().enumerate() {
            let content_id = 4 + 2 * index;
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {content_id} 0 R >>"
            ));
            let stream = format!("BT /F1 24 Tf 72 700 Td ({text}) Tj ET");
            objects.push(format!(
                "<< /Length {} >>\nstream\n{stream}\nendstream",
                stream.len()
            ));
        }
        objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (index, object) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{object}\nendobj\n", index + 1).as_bytes());
        }

        let xref_offset = pdf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            xref.push_str(&format!("{offset:010} 00000 n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        ));
        pdf.extend_from_slice(xref.as_bytes());
        pdf
    }

    #[test]
    fn multi_page_document_keeps_page_boundaries() {
        let pdf = text_pdf(&["Page one text", "Page two text"]);

        let markdown = PdfExtractConverter::new()
            .to_markdown(&pdf)
            .expect("well-formed document");

        assert_eq!(markdown, "Page one text\n\n---\n\nPage two text\n");
    }

    #[test]
    fn headings_survive_extraction() {
        let pdf = text_pdf(&["QUARTERLY REPORT"]);

        let markdown = PdfExtractConverter::new()
            .to_markdown(&pdf)
            .expect("well-formed document");

        assert_eq!(markdown, "## QUARTERLY REPORT\n");
    }
}
