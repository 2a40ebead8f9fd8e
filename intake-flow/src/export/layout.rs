//! Page layout for the exported report: wraps text to the page width and breaks
//! pages before content would cross the bottom margin. Pure and deterministic, so
//! the same input always places the same text at the same coordinates.

use crate::models::{FollowUp, PatientInfo};
use crate::report::Condition;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_LEFT_MM: f32 = 10.0;
pub const MARGIN_TOP_MM: f32 = 10.0;
pub const MARGIN_BOTTOM_MM: f32 = 15.0;
pub const TEXT_WIDTH_MM: f32 = 180.0;

const PT_TO_MM: f32 = 0.3528;
// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;

const TITLE_PT: f32 = 20.0;
const SECTION_PT: f32 = 16.0;
const CONDITION_PT: f32 = 14.0;
const BODY_PT: f32 = 12.0;
const LINE_MM: f32 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// A line of text placed on a page. `y_mm` is the baseline measured from the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub x_mm: f32,
    pub y_mm: f32,
    pub size_pt: f32,
    pub weight: FontWeight,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<PlacedText>,
}

struct Composer {
    pages: Vec<Page>,
    y: f32,
}

impl Composer {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: MARGIN_TOP_MM,
        }
    }

    fn line(&mut self, text: String, x_mm: f32, size_pt: f32, weight: FontWeight, advance: f32) {
        if self.y > PAGE_HEIGHT_MM - MARGIN_BOTTOM_MM {
            self.pages.push(Page::default());
            self.y = MARGIN_TOP_MM;
        }
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(PlacedText {
                text,
                x_mm,
                y_mm: self.y,
                size_pt,
                weight,
            });
        }
        self.y += advance;
    }

    fn wrapped(&mut self, text: &str, x_mm: f32, size_pt: f32, weight: FontWeight) {
        let width = TEXT_WIDTH_MM - (x_mm - MARGIN_LEFT_MM);
        for line in wrap_text(text, chars_per_line(width, size_pt)) {
            self.line(line, x_mm, size_pt, weight, LINE_MM);
        }
    }

    fn heading(&mut self, text: &str) {
        self.line(text.to_string(), MARGIN_LEFT_MM, SECTION_PT, FontWeight::Bold, 10.0);
    }

    fn gap(&mut self, mm: f32) {
        self.y += mm;
    }

    fn finish(self) -> Vec<Page> {
        self.pages
    }
}

fn chars_per_line(width_mm: f32, size_pt: f32) -> usize {
    let glyph_mm = size_pt * PT_TO_MM * AVG_GLYPH_EM;
    ((width_mm / glyph_mm) as usize).max(1)
}

/// Greedy word wrap. Words longer than a line are split. Explicit newlines
/// start new lines; an empty input still produces one (empty) line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            if current_len > 0 && current_len + 1 + word.len() > max_chars {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }

        if current_len > 0 {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Lays out the full report: title, patient block, symptoms, one block per
/// question/answer, then one numbered block per condition in rank order.
pub fn layout_report(
    title: &str,
    patient: &PatientInfo,
    symptoms: &str,
    follow_ups: &[FollowUp],
    conditions: &[Condition],
) -> Vec<Page> {
    let mut c = Composer::new();

    let title_width = title.chars().count() as f32 * TITLE_PT * PT_TO_MM * AVG_GLYPH_EM;
    let title_x = ((PAGE_WIDTH_MM - title_width) / 2.0).max(MARGIN_LEFT_MM);
    c.line(title.to_string(), title_x, TITLE_PT, FontWeight::Bold, 20.0);

    c.heading("Patient Information:");
    for (label, value) in patient.summary_lines() {
        c.wrapped(&format!("{}: {}", label, value), MARGIN_LEFT_MM, BODY_PT, FontWeight::Regular);
    }
    c.gap(10.0);

    c.heading("Symptoms:");
    c.wrapped(symptoms, MARGIN_LEFT_MM, BODY_PT, FontWeight::Regular);
    c.gap(10.0);

    if !follow_ups.is_empty() {
        c.heading("Medical History Questions:");
        for follow_up in follow_ups {
            c.wrapped(
                &follow_up.question.display_text(),
                MARGIN_LEFT_MM,
                BODY_PT,
                FontWeight::Bold,
            );
            c.wrapped(
                &format!("Answer: {}", follow_up.answer.choice),
                MARGIN_LEFT_MM,
                BODY_PT,
                FontWeight::Regular,
            );
            if let Some(details) = follow_up.answer.shown_details() {
                c.wrapped(
                    &format!("Additional details: {}", details),
                    MARGIN_LEFT_MM,
                    BODY_PT,
                    FontWeight::Regular,
                );
            }
            c.gap(3.0);
        }
        c.gap(7.0);
    }

    c.heading("Analysis:");
    for (i, condition) in conditions.iter().enumerate() {
        layout_condition(&mut c, i + 1, condition);
    }

    c.finish()
}

fn layout_condition(c: &mut Composer, rank: usize, condition: &Condition) {
    let likelihood = condition.likelihood.trim();
    let heading = if likelihood.is_empty() {
        format!("{}. {}", rank, condition.name.trim())
    } else {
        format!("{}. {} ({})", rank, condition.name.trim(), likelihood)
    };
    c.wrapped(&heading, MARGIN_LEFT_MM, CONDITION_PT, FontWeight::Bold);

    if !condition.description.trim().is_empty() {
        c.wrapped(condition.description.trim(), MARGIN_LEFT_MM, BODY_PT, FontWeight::Regular);
        c.gap(3.0);
    }

    let treatments: Vec<&str> = non_blank(&condition.treatments);
    if !treatments.is_empty() {
        c.line("Treatments:".to_string(), MARGIN_LEFT_MM, BODY_PT, FontWeight::Bold, LINE_MM);
        for treatment in treatments {
            c.wrapped(&format!("- {}", treatment), 15.0, BODY_PT, FontWeight::Regular);
        }
    }

    if !condition.medicines.is_empty() {
        c.line("Medicines:".to_string(), MARGIN_LEFT_MM, BODY_PT, FontWeight::Bold, LINE_MM);
        for medicine in &condition.medicines {
            c.wrapped(&format!("- {}", medicine.name.trim()), 15.0, BODY_PT, FontWeight::Regular);
            if !medicine.dosage.trim().is_empty() {
                c.wrapped(
                    &format!("Dosage: {}", medicine.dosage.trim()),
                    20.0,
                    BODY_PT,
                    FontWeight::Regular,
                );
            }
            let alternatives = non_blank(&medicine.alternatives);
            if !alternatives.is_empty() {
                c.line("Alternatives:".to_string(), 20.0, BODY_PT, FontWeight::Regular, LINE_MM);
                for alternative in alternatives {
                    c.wrapped(&format!("- {}", alternative), 25.0, BODY_PT, FontWeight::Regular);
                }
            }
        }
    }

    c.gap(10.0);
}

fn non_blank(items: &[String]) -> Vec<&str> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}
