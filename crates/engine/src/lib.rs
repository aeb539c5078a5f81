//! Declarative bank-statement parsing engine. One bank profile, authored in
//! YAML, drives header location, column mapping, number and date parsing,
//! reference splitting and pay-in classification across delimited,
//! spreadsheet and PDF statements.

pub mod detect;
pub mod header;
pub mod profile;

mod delimited;
mod pdf;
mod row;
mod sheet;

use std::io::Read;

pub use detect::detect;
pub use header::HeaderMapping;
pub use passbook_core::{EngineError, FormatKind, ParsedRow, SemanticField, SourceLocation};
pub use profile::{BankProfile, FormatProfile, ProfileStore};

/// Statement parsing facade over an immutable profile tree. Invocations
/// share nothing but the profiles, so one engine may serve any number of
/// concurrent callers.
#[derive(Debug, Clone)]
pub struct Engine {
    profiles: ProfileStore,
}

impl Engine {
    pub fn new(profiles: ProfileStore) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Parse one statement stream into normalized rows, in document order.
    /// The stream is consumed exactly once and materialized eagerly; any
    /// stage failure aborts the invocation with no partial result.
    /// `account_no_override` never influences parsing — it is carried for
    /// downstream collaborators, which receive it unchanged.
    pub fn parse<R: Read>(
        &self,
        mut input: R,
        filename: Option<&str>,
        content_type: Option<&str>,
        parser_key: &str,
        account_no_override: Option<&str>,
    ) -> Result<Vec<ParsedRow>, EngineError> {
        let format = detect::detect(filename, content_type)?;
        let profile = self.profiles.profile_for(parser_key, format)?;
        let key = parser_key.trim().to_lowercase();
        tracing::debug!(
            parser_key = %key,
            format = %format,
            account_no = ?account_no_override,
            "parse invocation"
        );

        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes).map_err(|e| EngineError::IoFailure {
            parser_key: key.clone(),
            format,
            detail: format!("stream read failed: {e}"),
        })?;

        let rows = match profile {
            FormatProfile::Delimited(delimited) => {
                delimited::parse(&bytes, delimited, &key, format)?
            }
            FormatProfile::Sheet(sheet) => sheet::parse(bytes, sheet, &key, format)?,
            FormatProfile::Pdf(pdf) => pdf::parse(&bytes, pdf, &key, format)?,
        };
        tracing::debug!(rows = rows.len(), "parse complete");
        Ok(rows)
    }
}
