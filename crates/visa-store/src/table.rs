//! Logical tables and their expected columns

use serde::{Deserialize, Serialize};

/// The two tables this subsystem reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    /// One canonical pricing row per country
    Packages,
    /// Required-document checklist rows
    Documents,
}

impl Table {
    /// Physical table name
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Table::Packages => "visa_packages",
            Table::Documents => "document_checklists",
        }
    }

    /// Columns the engine depends on
    #[must_use]
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Table::Packages => &[
                "id",
                "country_id",
                "name",
                "government_fee",
                "service_fee",
                "processing_days",
                "processing_time",
                "total_price",
                "created_at",
            ],
            Table::Documents => &[
                "id",
                "country_id",
                "document_name",
                "document_description",
                "required",
                "created_at",
            ],
        }
    }

    /// Required columns absent from `present`
    #[must_use]
    pub fn missing_columns<S: AsRef<str>>(self, present: &[S]) -> Vec<&'static str> {
        self.required_columns()
            .iter()
            .copied()
            .filter(|col| !present.iter().any(|p| p.as_ref() == *col))
            .collect()
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
