//! Paginated document export of a finished intake.

mod layout;
mod pdf;

pub use layout::{FontWeight, Page, PlacedText, layout_report, wrap_text};
pub use pdf::render_pdf;

use crate::error::Result;
use crate::models::{FollowUp, PatientInfo};
use crate::report::Condition;

pub const EXPORT_FILE_NAME: &str = "symptom_analysis_report.pdf";
pub const EXPORT_CONTENT_TYPE: &str = "application/pdf";
pub const REPORT_TITLE: &str = "Symptom Analysis Report";

#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub page_count: usize,
    pub bytes: Vec<u8>,
}

pub fn export_document(
    patient: &PatientInfo,
    symptoms: &str,
    follow_ups: &[FollowUp],
    conditions: &[Condition],
) -> Result<ExportedDocument> {
    let pages = layout_report(REPORT_TITLE, patient, symptoms, follow_ups, conditions);
    let bytes = render_pdf(REPORT_TITLE, &pages)?;

    Ok(ExportedDocument {
        file_name: EXPORT_FILE_NAME,
        content_type: EXPORT_CONTENT_TYPE,
        page_count: pages.len(),
        bytes,
    })
}
