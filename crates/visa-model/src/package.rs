//! Visa pricing package records
//!
//! Three shapes of the same record:
//! - [`PackageRow`]: what the store hands back, every column optional
//! - [`PackageDraft`]: what a caller submits for saving, equally loose
//! - [`VisaPackage`]: the strict record the engine works with
//!
//! [`PackageFields`] is the normalized write payload. Conversion from the
//! loose shapes happens once, at the repository boundary.

use crate::coerce::{coerce_days, coerce_fee};
use crate::ids::{CountryId, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical, normalized visa package for one country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaPackage {
    /// Store id, `None` until first save
    pub id: Option<RecordId>,
    /// Owning country
    pub country_id: CountryId,
    /// Display label
    pub name: String,
    /// Government fee, never negative
    pub government_fee: f64,
    /// Service fee, never negative
    pub service_fee: f64,
    /// Always `government_fee + service_fee`
    pub total_price: f64,
    /// Processing duration in days, at least one
    pub processing_days: u32,
    /// Display string persisted next to `processing_days`
    pub processing_time: String,
    /// Synthesized at read time; not backed by a column
    pub is_active: bool,
    /// Creation time of the backing row
    pub created_at: Option<DateTime<Utc>>,
}

impl VisaPackage {
    /// Normalize a store row.
    ///
    /// `total_price` is recomputed from the fees rather than read back.
    #[must_use]
    pub fn from_row(row: &PackageRow, default_days: u32) -> Self {
        let processing_days = coerce_days(row.processing_days.as_ref(), default_days);
        let government_fee = coerce_fee(row.government_fee.as_ref());
        let service_fee = coerce_fee(row.service_fee.as_ref());

        Self {
            id: Some(row.id.clone()),
            country_id: row.country_id.clone(),
            name: non_blank(row.name.as_deref())
                .map_or_else(|| default_package_name(&row.country_id), str::to_string),
            government_fee,
            service_fee,
            total_price: government_fee + service_fee,
            processing_days,
            processing_time: non_blank(row.processing_time.as_deref())
                .map_or_else(|| default_processing_time(processing_days), str::to_string),
            is_active: true,
            created_at: Some(row.created_at),
        }
    }

    /// Attach the in-memory active flag
    #[inline]
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}

/// Raw package row as stored.
///
/// Column names follow the store schema. Numeric columns stay as JSON values
/// because the store does not guarantee their type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRow {
    /// Row id
    pub id: RecordId,
    /// Owning country
    pub country_id: CountryId,
    /// Display label
    pub name: Option<String>,
    /// Government fee
    pub government_fee: Option<Value>,
    /// Service fee
    pub service_fee: Option<Value>,
    /// Processing days
    pub processing_days: Option<Value>,
    /// Processing time display string
    pub processing_time: Option<String>,
    /// Generated total column
    pub total_price: Option<Value>,
    /// Insertion time
    pub created_at: DateTime<Utc>,
}

/// Normalized write payload for the package table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageFields {
    /// Owning country
    pub country_id: CountryId,
    /// Display label
    pub name: String,
    /// Government fee
    pub government_fee: f64,
    /// Service fee
    pub service_fee: f64,
    /// Recomputed total
    pub total_price: f64,
    /// Processing days
    pub processing_days: u32,
    /// Processing time display string
    pub processing_time: String,
}

impl PackageFields {
    /// Zero-fee package used when a country has none yet
    #[must_use]
    pub fn default_for(country_id: &CountryId, processing_days: u32) -> Self {
        Self {
            country_id: country_id.clone(),
            name: default_package_name(country_id),
            government_fee: 0.0,
            service_fee: 0.0,
            total_price: 0.0,
            processing_days,
            processing_time: default_processing_time(processing_days),
        }
    }
}

/// Caller-supplied package for create-or-update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageDraft {
    /// Existing row to update, if known
    pub id: Option<RecordId>,
    /// Owning country
    pub country_id: CountryId,
    /// Display label
    pub name: Option<String>,
    /// Government fee, any JSON shape
    pub government_fee: Option<Value>,
    /// Service fee, any JSON shape
    pub service_fee: Option<Value>,
    /// Processing days, any JSON shape
    pub processing_days: Option<Value>,
    /// Processing time display string
    pub processing_time: Option<String>,
    /// Requested active flag
    pub is_active: Option<bool>,
}

impl PackageDraft {
    /// New draft for a country
    #[inline]
    #[must_use]
    pub fn new(country_id: impl Into<CountryId>) -> Self {
        Self {
            country_id: country_id.into(),
            ..Self::default()
        }
    }

    /// With explicit row id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With numeric fees
    #[inline]
    #[must_use]
    pub fn with_fees(mut self, government_fee: f64, service_fee: f64) -> Self {
        self.government_fee = Some(Value::from(government_fee));
        self.service_fee = Some(Value::from(service_fee));
        self
    }

    /// With raw fee values, as submitted by a form
    #[inline]
    #[must_use]
    pub fn with_raw_fees(mut self, government_fee: Value, service_fee: Value) -> Self {
        self.government_fee = Some(government_fee);
        self.service_fee = Some(service_fee);
        self
    }

    /// With processing days
    #[inline]
    #[must_use]
    pub fn with_processing_days(mut self, days: u32) -> Self {
        self.processing_days = Some(Value::from(days));
        self
    }

    /// With active flag
    #[inline]
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    /// Coerce every field into a write payload
    #[must_use]
    pub fn normalize(&self, default_days: u32) -> PackageFields {
        let government_fee = coerce_fee(self.government_fee.as_ref());
        let service_fee = coerce_fee(self.service_fee.as_ref());
        let processing_days = coerce_days(self.processing_days.as_ref(), default_days);

        PackageFields {
            country_id: self.country_id.clone(),
            name: non_blank(self.name.as_deref())
                .map_or_else(|| default_package_name(&self.country_id), str::to_string),
            government_fee,
            service_fee,
            total_price: government_fee + service_fee,
            processing_days,
            processing_time: non_blank(self.processing_time.as_deref())
                .map_or_else(|| default_processing_time(processing_days), str::to_string),
        }
    }
}

/// Generated label for packages saved without a name
#[must_use]
pub fn default_package_name(country_id: &CountryId) -> String {
    format!("{country_id} Visa Package")
}

/// `"{days} days"`
#[must_use]
pub fn default_processing_time(days: u32) -> String {
    format!("{days} days")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
