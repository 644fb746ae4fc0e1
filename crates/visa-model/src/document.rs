//! Required-document checklist records
//!
//! Documents for a country are always replaced as a whole set; there is no
//! per-item patch path.

use crate::error::ValidationError;
use crate::ids::{CountryId, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized checklist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChecklistItem {
    /// Store id
    pub id: RecordId,
    /// Owning country
    pub country_id: CountryId,
    /// Document name
    pub name: String,
    /// What the applicant must provide
    pub description: String,
    /// Whether the document is mandatory
    pub required: bool,
    /// Insertion time, used for ordering
    pub created_at: DateTime<Utc>,
}

impl From<DocumentRow> for DocumentChecklistItem {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            country_id: row.country_id,
            name: row.document_name.trim().to_string(),
            description: row.document_description.unwrap_or_default().trim().to_string(),
            required: row.required.unwrap_or(true),
            created_at: row.created_at,
        }
    }
}

/// Document row as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRow {
    /// Row id
    pub id: RecordId,
    /// Owning country
    pub country_id: CountryId,
    /// Document name column
    pub document_name: String,
    /// Description column, nullable in the store
    pub document_description: Option<String>,
    /// Required flag, nullable in the store
    pub required: Option<bool>,
    /// Insertion time
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the document table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocumentRow {
    /// Owning country
    pub country_id: CountryId,
    /// Document name column
    pub document_name: String,
    /// Description column
    pub document_description: String,
    /// Required flag
    pub required: bool,
}

/// Caller-supplied checklist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    /// Document name
    pub name: String,
    /// Description, defaults to the name when omitted
    #[serde(default)]
    pub description: Option<String>,
    /// Mandatory flag
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl DocumentDraft {
    /// Required document with the given name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: true,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark as optional
    #[inline]
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Validate and convert into an insert payload.
    ///
    /// # Errors
    /// `ValidationError::BlankDocumentName` / `BlankDocumentDescription` at
    /// `index` when a field is empty after trimming.
    pub fn to_row(
        &self,
        country_id: &CountryId,
        index: usize,
    ) -> Result<NewDocumentRow, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankDocumentName { index });
        }
        let description = match self.description.as_deref().map(str::trim) {
            Some("") => return Err(ValidationError::BlankDocumentDescription { index }),
            Some(d) => d,
            None => name,
        };

        Ok(NewDocumentRow {
            country_id: country_id.clone(),
            document_name: name.to_string(),
            document_description: description.to_string(),
            required: self.required,
        })
    }
}

/// Validate a full replacement set.
///
/// # Errors
/// `ValidationError::EmptyDocumentSet` for an empty slice, otherwise the first
/// per-item failure.
pub fn validate_document_set(
    country_id: &CountryId,
    items: &[DocumentDraft],
) -> Result<Vec<NewDocumentRow>, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyDocumentSet);
    }
    items
        .iter()
        .enumerate()
        .map(|(index, item)| item.to_row(country_id, index))
        .collect()
}

/// Baseline checklist seeded for countries that have none
#[must_use]
pub fn default_document_set() -> Vec<DocumentDraft> {
    vec![
        DocumentDraft::new("Passport")
            .with_description("Valid passport with at least 6 months validity remaining"),
        DocumentDraft::new("Photographs")
            .with_description("Two recent passport-sized photographs on a white background"),
        DocumentDraft::new("Travel Itinerary")
            .with_description("Flight bookings and accommodation details for the whole stay"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_is_rejected() {
        let err = validate_document_set(&CountryId::new("fr"), &[]).unwrap_err();
        assert_eq!(err, ValidationError::EmptyDocumentSet);
    }

    #[test]
    fn blank_name_reports_index() {
        let items = vec![DocumentDraft::new("Passport"), DocumentDraft::new("   ")];
        let err = validate_document_set(&CountryId::new("fr"), &items).unwrap_err();
        assert_eq!(err, ValidationError::BlankDocumentName { index: 1 });
    }

    #[test]
    fn description_defaults_to_name() {
        let row = DocumentDraft::new(" Visa Form ")
            .to_row(&CountryId::new("fr"), 0)
            .unwrap();
        assert_eq!(row.document_name, "Visa Form");
        assert_eq!(row.document_description, "Visa Form");
        assert!(row.required);
    }

    #[test]
    fn default_set_has_three_required_items() {
        let set = default_document_set();
        assert_eq!(set.len(), 3);
        assert!(set.iter().all(|d| d.required));
        assert_eq!(set[0].name, "Passport");
    }

    #[test]
    fn draft_required_defaults_true_when_deserialized() {
        let draft: DocumentDraft = serde_json::from_str(r#"{"name":"Passport"}"#).unwrap();
        assert!(draft.required);
    }
}
