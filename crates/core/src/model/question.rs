use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("question catalog cannot be empty")]
    Empty,

    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A true/false knowledge-check question shown during rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub correct_answer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Question {
    #[must_use]
    pub fn new(id: impl Into<String>, prompt: impl Into<String>, correct_answer: bool) -> Self {
        Self {
            id: QuestionId::new(id),
            prompt: prompt.into(),
            correct_answer,
            explanation: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn is_correct(&self, answer: bool) -> bool {
        self.correct_answer == answer
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Fixed, non-empty set of questions with unique ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    /// Builds a catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Empty` if `questions` is empty, or
    /// `CatalogError::DuplicateId` if two questions share an id.
    pub fn new(questions: Vec<Question>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(&question.id) {
                return Err(CatalogError::DuplicateId(question.id.clone()));
            }
        }
        Ok(Self { questions })
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.get(id).is_some()
    }
}

//
// ─── BUILT-IN CONTENT ──────────────────────────────────────────────────────────
//

/// Catalog shipped with the app: well-known CVEs plus everyday security hygiene.
///
/// # Errors
///
/// Never fails for the built-in data.
pub fn builtin_catalog() -> Result<QuestionCatalog, CatalogError> {
    QuestionCatalog::new(vec![
        Question::new(
            "cve-2024-3094",
            "Did a compromised release of xz/liblzma introduce a backdoor reachable via OpenSSH?",
            true,
        )
        .with_source("CVE-2024-3094 (XZ Utils backdoor)"),
        Question::new(
            "cve-2021-44228",
            "Does a crafted JNDI lookup in logs allow remote code execution?",
            true,
        )
        .with_source("CVE-2021-44228 (Log4Shell)"),
        Question::new(
            "cve-2021-26855",
            "Is this a server-side request forgery that enabled pre-auth compromise of Exchange servers?",
            true,
        )
        .with_source("CVE-2021-26855 (ProxyLogon)"),
        Question::new(
            "cve-2022-22965",
            "Can certain Spring MVC apps be exploited for remote code execution via data binding?",
            true,
        )
        .with_source("CVE-2022-22965 (Spring4Shell)"),
        Question::new(
            "cve-2023-3519",
            "Can path traversal let attackers execute code on Citrix appliances?",
            true,
        )
        .with_source("CVE-2023-3519 (Citrix NetScaler ADC)"),
        Question::new(
            "cve-2022-30190",
            "Can a crafted document trigger code execution via the MSDT handler without macros?",
            true,
        )
        .with_source("CVE-2022-30190 (Follina)"),
        Question::new(
            "password-reuse",
            "Is it safe to use the same password for multiple accounts?",
            false,
        )
        .with_explanation("Reusing a password turns one breach into many."),
        Question::new(
            "public-wifi-banking",
            "Should you do online banking on public Wi-Fi?",
            false,
        )
        .with_explanation("Open networks can be monitored by anyone sharing them."),
        Question::new(
            "software-updates",
            "Are software updates important for security?",
            true,
        )
        .with_explanation("Updates ship the patches for known vulnerabilities."),
        Question::new(
            "email-links",
            "Should you click links in emails from unknown senders?",
            false,
        )
        .with_explanation("Unknown links may lead to phishing pages or malware."),
        Question::new(
            "two-factor-auth",
            "Does two-factor authentication make your accounts more secure?",
            true,
        )
        .with_explanation("A second factor stops most stolen-password logins."),
        Question::new(
            "usb-devices",
            "Is it safe to plug in USB drives you find lying around?",
            false,
        )
        .with_explanation("Dropped drives are a classic malware delivery trick."),
    ])
}
