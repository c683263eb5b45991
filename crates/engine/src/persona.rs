//! The persona the assistant speaks for: a free-text summary plus the text of
//! a LinkedIn export and a CV, loaded once at startup.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use persona_shared::tools::toolbelts::contact::{RECORD_UNKNOWN_QUESTION, RECORD_USER_DETAILS};

pub const SUMMARY_PLACEHOLDER: &str = "Summary not available.";
pub const DOCUMENT_PLACEHOLDER: &str = "Not available.";

const SUMMARY_FILE: &str = "summary.txt";
const LINKEDIN_FILE: &str = "linkedin.pdf";
const CV_FILE: &str = "cv.pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaDocument {
    pub summary: String,
    pub cv: String,
    pub linkedin: String,
}

impl PersonaDocument {
    /// Reads the three documents from `dir`. Anything missing or unreadable is
    /// replaced by a placeholder so the assistant can still start.
    pub fn load(dir: &Path) -> Self {
        let summary = read_text(&dir.join(SUMMARY_FILE)).unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{:#}", e), "using placeholder summary");
            SUMMARY_PLACEHOLDER.to_string()
        });

        Self {
            summary,
            linkedin: read_pdf_or_placeholder(&dir.join(LINKEDIN_FILE)),
            cv: read_pdf_or_placeholder(&dir.join(CV_FILE)),
        }
    }

    pub fn system_prompt(&self, name: &str) -> String {
        format!(
            "You are acting as {name}. You are answering questions on {name}'s website, \
             representing {name} professionally to visitors who may be potential clients or employers. \
             Use the summary, LinkedIn profile and CV below to answer as faithfully as you can.\n\n\
             ## Summary:\n{summary}\n\n\
             ## LinkedIn:\n{linkedin}\n\n\
             ## CV:\n{cv}\n\n\
             If you don't know the answer to a question, use the {unknown} tool to record it, \
             even if it is trivial or unrelated to {name}'s career.\n\
             Encourage the user to stay in touch by email: ask for their email address and \
             record it with the {details} tool once they share it.",
            name = name,
            summary = self.summary,
            linkedin = self.linkedin,
            cv = self.cv,
            unknown = RECORD_UNKNOWN_QUESTION,
            details = RECORD_USER_DETAILS,
        )
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_pdf_or_placeholder(path: &Path) -> String {
    read_pdf(path).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %format!("{:#}", e), "using placeholder document");
        DOCUMENT_PLACEHOLDER.to_string()
    })
}

fn read_pdf(path: &Path) -> Result<String> {
    if !path.is_file() {
        bail!("{} does not exist", path.display());
    }

    // The extractor panics on some malformed documents.
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text(path))
        .map_err(|_| anyhow!("pdf extraction panicked on {}", path.display()))?;

    extracted.map_err(|e| anyhow!("failed to extract text from {}: {:?}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> PersonaDocument {
        PersonaDocument {
            summary: "Builds data platforms.".to_string(),
            cv: "2019-2024 Engineer".to_string(),
            linkedin: "Open to work".to_string(),
        }
    }

    #[test]
    fn missing_directory_degrades_to_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let persona = PersonaDocument::load(&dir.path().join("absent"));

        assert_eq!(persona.summary, SUMMARY_PLACEHOLDER);
        assert_eq!(persona.cv, DOCUMENT_PLACEHOLDER);
        assert_eq!(persona.linkedin, DOCUMENT_PLACEHOLDER);
    }

    #[test]
    fn reads_summary_and_rejects_garbage_pdf() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SUMMARY_FILE), "Hello, I write Rust.").unwrap();
        std::fs::write(dir.path().join(CV_FILE), "definitely not a pdf").unwrap();

        let persona = PersonaDocument::load(dir.path());

        assert_eq!(persona.summary, "Hello, I write Rust.");
        assert_eq!(persona.cv, DOCUMENT_PLACEHOLDER);
        assert_eq!(persona.linkedin, DOCUMENT_PLACEHOLDER);
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(persona().system_prompt("Ada"), persona().system_prompt("Ada"));
        assert_ne!(persona().system_prompt("Ada"), persona().system_prompt("Grace"));
    }

    #[test]
    fn prompt_contains_documents_and_tool_instructions() {
        let prompt = persona().system_prompt("Ada Lovelace");

        assert!(prompt.starts_with("You are acting as Ada Lovelace."));
        assert!(prompt.contains("## Summary:\nBuilds data platforms."));
        assert!(prompt.contains("## LinkedIn:\nOpen to work"));
        assert!(prompt.contains("## CV:\n2019-2024 Engineer"));
        assert!(prompt.contains("record_unknown_question"));
        assert!(prompt.contains("record_user_details"));
    }
}
