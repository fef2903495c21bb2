//! Section extraction from generated output.
//!
//! A model response is one unstructured string. The display surface wants three parts of it:
//! the operative note, the ICD-10 codes and the CPT codes, each introduced by a fixed label
//! (`"Operative Note:"`, `"ICD-10 Codes:"`, `"CPT Codes:"`). Labels may appear in any order
//! and any of them may be missing.
//!
//! A section starts right after the first occurrence of its label and ends at the next
//! occurrence of any label (its own included) or at the end of the output. The content is
//! trimmed; a missing label or an empty section yields `None`.

use serde::Serialize;

/// One of the three labelled sections of a generated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionLabel {
    OperativeNote,
    Icd10Codes,
    CptCodes,
}

impl SectionLabel {
    pub const ALL: [SectionLabel; 3] = [
        SectionLabel::OperativeNote,
        SectionLabel::Icd10Codes,
        SectionLabel::CptCodes,
    ];

    /// The literal marker searched for in the output.
    pub fn marker(self) -> &'static str {
        match self {
            SectionLabel::OperativeNote => "Operative Note:",
            SectionLabel::Icd10Codes => "ICD-10 Codes:",
            SectionLabel::CptCodes => "CPT Codes:",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SectionLabel::OperativeNote => "Operative Note",
            SectionLabel::Icd10Codes => "ICD-10 Codes",
            SectionLabel::CptCodes => "CPT Codes",
        }
    }
}

/// Extracts the trimmed content of `label`'s section from `output`.
pub fn extract_section(output: &str, label: SectionLabel) -> Option<String> {
    let marker = label.marker();
    let start = output.find(marker)? + marker.len();
    let rest = &output[start..];

    let end = SectionLabel::ALL
        .iter()
        .filter_map(|l| rest.find(l.marker()))
        .min()
        .unwrap_or(rest.len());

    let content = rest[..end].trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// All three sections of one output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedSections {
    pub operative_note: Option<String>,
    pub icd10_codes: Option<String>,
    pub cpt_codes: Option<String>,
}

impl ExtractedSections {
    pub fn from_output(output: &str) -> Self {
        Self {
            operative_note: extract_section(output, SectionLabel::OperativeNote),
            icd10_codes: extract_section(output, SectionLabel::Icd10Codes),
            cpt_codes: extract_section(output, SectionLabel::CptCodes),
        }
    }

    pub fn get(&self, label: SectionLabel) -> Option<&str> {
        match label {
            SectionLabel::OperativeNote => self.operative_note.as_deref(),
            SectionLabel::Icd10Codes => self.icd10_codes.as_deref(),
            SectionLabel::CptCodes => self.cpt_codes.as_deref(),
        }
    }

    /// True when no section was found; callers then show the full output instead.
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    /// Sections that were found, in display order.
    pub fn present(&self) -> impl Iterator<Item = (SectionLabel, &str)> + '_ {
        SectionLabel::ALL
            .into_iter()
            .filter_map(move |label| self.get(label).map(|text| (label, text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "Operative Note:\nLaparoscopic appendectomy performed.\n\nICD-10 Codes:\nK35.80\n\nCPT Codes:\n44970\n";

    #[test]
    fn missing_trailing_section_is_none() {
        let output = "Operative Note:\nRemoved appendix.\nICD-10 Codes:\nK35.80";
        assert_eq!(
            extract_section(output, SectionLabel::Icd10Codes).as_deref(),
            Some("K35.80")
        );
        assert_eq!(extract_section(output, SectionLabel::CptCodes), None);
        assert_eq!(
            extract_section(output, SectionLabel::OperativeNote).as_deref(),
            Some("Removed appendix.")
        );
    }

    #[test]
    fn all_sections_present() {
        let sections = ExtractedSections::from_output(FULL);
        assert_eq!(
            sections.operative_note.as_deref(),
            Some("Laparoscopic appendectomy performed.")
        );
        assert_eq!(sections.icd10_codes.as_deref(), Some("K35.80"));
        assert_eq!(sections.cpt_codes.as_deref(), Some("44970"));
        assert!(!sections.is_empty());
    }

    #[test]
    fn sections_in_any_order() {
        let output = "CPT Codes: 44970\nOperative Note: Appendix removed.\nICD-10 Codes: K35.80";
        let sections = ExtractedSections::from_output(output);
        assert_eq!(sections.cpt_codes.as_deref(), Some("44970"));
        assert_eq!(sections.operative_note.as_deref(), Some("Appendix removed."));
        assert_eq!(sections.icd10_codes.as_deref(), Some("K35.80"));
    }

    #[test]
    fn no_labels_yields_nothing() {
        let sections = ExtractedSections::from_output("The model declined to answer.");
        assert_eq!(sections, ExtractedSections::default());
        assert!(sections.is_empty());
        assert_eq!(sections.present().count(), 0);
    }

    #[test]
    fn empty_section_is_none() {
        let output = "Operative Note:   \nICD-10 Codes:\nK35.80";
        assert_eq!(extract_section(output, SectionLabel::OperativeNote), None);
    }

    #[test]
    fn preamble_before_first_label_is_ignored() {
        let output = "Here is your documentation.\n\nOperative Note:\nAppendix removed.";
        assert_eq!(
            extract_section(output, SectionLabel::OperativeNote).as_deref(),
            Some("Appendix removed.")
        );
    }

    #[test]
    fn repeated_label_first_occurrence_opens_and_next_closes() {
        let output = "Operative Note: first\nOperative Note: second\nCPT Codes: 44970";
        assert_eq!(
            extract_section(output, SectionLabel::OperativeNote).as_deref(),
            Some("first")
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let once = ExtractedSections::from_output(FULL);
        let twice = ExtractedSections::from_output(FULL);
        assert_eq!(once, twice);
        assert_eq!(
            extract_section(FULL, SectionLabel::CptCodes),
            extract_section(FULL, SectionLabel::CptCodes)
        );
    }

    #[test]
    fn present_lists_found_sections_in_display_order() {
        let sections = ExtractedSections::from_output("CPT Codes: 44970\nOperative Note: done");
        let labels: Vec<SectionLabel> = sections.present().map(|(label, _)| label).collect();
        assert_eq!(labels, vec![SectionLabel::OperativeNote, SectionLabel::CptCodes]);
    }
}
