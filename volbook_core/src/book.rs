//! # Measurement Book Data Structures
//!
//! The `MeasurementBook` struct is the root container for a day's field
//! measurements. Books serialize to `.vbk` files as human-readable JSON.
//!
//! ## Structure
//!
//! ```text
//! MeasurementBook
//! ├── meta: BookMetadata (version, work detail, work type, timestamps)
//! └── rows: Vec<MeasurementRow> (ordered measurement entries)
//! ```
//!
//! Rows are kept in a `Vec` rather than a map: the serial number printed in
//! the report is positional, and field books are read top to bottom.
//!
//! ## Example
//!
//! ```rust
//! use volbook_core::book::MeasurementBook;
//!
//! let mut book = MeasurementBook::new("Canal desilting\nSector 7", "Crate");
//! let id = book.add_row();
//!
//! let row = book.row_mut(&id).unwrap();
//! row.length = "10".to_string();
//! row.height_readings = "5+5+5".to_string();
//! row.top_readings = "4+4+4".to_string();
//! row.bed_width = "6".to_string();
//! row.recompute();
//!
//! let totals = book.grand_totals();
//! assert!((totals.ft3.value() - 250.0).abs() < 1e-9);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::engine::compute_volume;
use crate::units::{CubicFeet, CubicMeters};

/// Current schema version for .vbk files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// One measurement entry: four raw field strings plus the derived volumes.
///
/// The string fields hold exactly what the engineer typed, in feet.inches
/// notation (readings joined by `+`). Volumes are derived by the engine and
/// never set independently; call [`recompute`](MeasurementRow::recompute)
/// after editing a field.
///
/// The serde aliases accept row JSON written by early releases (camelCase
/// field names).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRow {
    /// Stable row identity, survives reordering and deletion of neighbors
    #[serde(default = "Uuid::new_v4", deserialize_with = "row_id_compat")]
    pub id: Uuid,

    /// Length in feet.inches notation (e.g. "5.6" = 5 ft 6 in)
    #[serde(default)]
    pub length: String,

    /// Height readings joined by `+` (e.g. "5+5+5")
    #[serde(default, alias = "heightReadings")]
    pub height_readings: String,

    /// Top readings joined by `+`, same notation as heights
    #[serde(default, alias = "topReadings")]
    pub top_readings: String,

    /// Bed width in feet.inches notation
    #[serde(default, alias = "bedWidth")]
    pub bed_width: String,

    /// Derived volume in cubic feet
    #[serde(default, alias = "volFt3")]
    pub vol_ft3: f64,

    /// Derived volume in cubic meters
    #[serde(default, alias = "volM3")]
    pub vol_m3: f64,
}

/// Accepts both current UUID row ids and the numeric ids written by early
/// releases (which stamped rows with a millisecond clock value). Legacy
/// numeric ids are replaced with fresh UUIDs on load.
fn row_id_compat<'de, D>(de: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Modern(Uuid),
        Legacy(f64),
    }

    Ok(match RawId::deserialize(de)? {
        RawId::Modern(id) => id,
        RawId::Legacy(_) => Uuid::new_v4(),
    })
}

impl MeasurementRow {
    /// Create a blank row with a fresh id and zero volumes.
    pub fn new() -> Self {
        MeasurementRow {
            id: Uuid::new_v4(),
            length: String::new(),
            height_readings: String::new(),
            top_readings: String::new(),
            bed_width: String::new(),
            vol_ft3: 0.0,
            vol_m3: 0.0,
        }
    }

    /// Whether all four measurement fields have been entered.
    ///
    /// Volumes are only meaningful once the row is complete; the data-entry
    /// surface shows zero for partially-typed rows.
    pub fn is_complete(&self) -> bool {
        !self.length.is_empty()
            && !self.height_readings.is_empty()
            && !self.top_readings.is_empty()
            && !self.bed_width.is_empty()
    }

    /// Recompute the derived volumes from the raw fields.
    ///
    /// An incomplete row computes to zero. This is cheap enough to call on
    /// every edit.
    pub fn recompute(&mut self) {
        if self.is_complete() {
            let vol = compute_volume(
                &self.length,
                &self.height_readings,
                &self.top_readings,
                &self.bed_width,
            );
            self.vol_ft3 = vol.vol_ft3.value();
            self.vol_m3 = vol.vol_m3.value();
        } else {
            self.vol_ft3 = 0.0;
            self.vol_m3 = 0.0;
        }
    }
}

impl Default for MeasurementRow {
    fn default() -> Self {
        MeasurementRow::new()
    }
}

/// Book metadata stored in the file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,

    /// Work detail: name of the work, site location, anything else worth
    /// printing at the top of the report. First line doubles as the report
    /// file name.
    pub work_info: String,

    /// Work type (e.g. "Crate", "DRSM")
    pub work_type: String,

    /// When the book was created
    pub created: DateTime<Utc>,

    /// When the book was last modified
    pub modified: DateTime<Utc>,
}

/// Grand totals over all rows, summed from un-rounded volumes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GrandTotals {
    pub ft3: CubicFeet,
    pub m3: CubicMeters,
}

/// Root measurement book container.
///
/// This is the top-level struct that gets serialized to `.vbk` files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementBook {
    /// Book metadata (version, work detail, timestamps)
    pub meta: BookMetadata,

    /// Measurement rows in entry order
    pub rows: Vec<MeasurementRow>,
}

impl MeasurementBook {
    /// Create a new empty book.
    ///
    /// # Arguments
    ///
    /// * `work_info` - Work detail text (may be multi-line)
    /// * `work_type` - Work type label (e.g. "Crate", "DRSM")
    pub fn new(work_info: impl Into<String>, work_type: impl Into<String>) -> Self {
        let now = Utc::now();
        MeasurementBook {
            meta: BookMetadata {
                version: SCHEMA_VERSION.to_string(),
                work_info: work_info.into(),
                work_type: work_type.into(),
                created: now,
                modified: now,
            },
            rows: Vec::new(),
        }
    }

    /// Append a blank row and return its id.
    pub fn add_row(&mut self) -> Uuid {
        let row = MeasurementRow::new();
        let id = row.id;
        self.rows.push(row);
        self.touch();
        id
    }

    /// Remove a row by id. Returns the removed row if it existed.
    pub fn remove_row(&mut self, id: &Uuid) -> Option<MeasurementRow> {
        let index = self.rows.iter().position(|r| &r.id == id)?;
        self.touch();
        Some(self.rows.remove(index))
    }

    /// Remove all rows.
    pub fn clear_rows(&mut self) {
        if !self.rows.is_empty() {
            self.rows.clear();
            self.touch();
        }
    }

    /// Get a row by id.
    pub fn row(&self, id: &Uuid) -> Option<&MeasurementRow> {
        self.rows.iter().find(|r| &r.id == id)
    }

    /// Get a mutable reference to a row by id.
    ///
    /// Note: getting a mutable reference marks the book as modified; the
    /// caller is expected to be editing.
    pub fn row_mut(&mut self, id: &Uuid) -> Option<&mut MeasurementRow> {
        if self.rows.iter().any(|r| &r.id == id) {
            self.meta.modified = Utc::now();
            self.rows.iter_mut().find(|r| &r.id == id)
        } else {
            None
        }
    }

    /// Update the modified timestamp.
    pub fn touch(&mut self) {
        self.meta.modified = Utc::now();
    }

    /// Number of measurement rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Sum volumes over all rows.
    ///
    /// Totals are summed from un-rounded values; round only the displayed
    /// sum.
    pub fn grand_totals(&self) -> GrandTotals {
        let ft3: f64 = self.rows.iter().map(|r| r.vol_ft3).sum();
        let m3: f64 = self.rows.iter().map(|r| r.vol_m3).sum();
        GrandTotals {
            ft3: CubicFeet(ft3),
            m3: CubicMeters(m3),
        }
    }
}

impl Default for MeasurementBook {
    fn default() -> Self {
        MeasurementBook::new("", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::format_for_display;

    fn complete_row(book: &mut MeasurementBook, length: &str, h: &str, t: &str, bed: &str) -> Uuid {
        let id = book.add_row();
        let row = book.row_mut(&id).unwrap();
        row.length = length.to_string();
        row.height_readings = h.to_string();
        row.top_readings = t.to_string();
        row.bed_width = bed.to_string();
        row.recompute();
        id
    }

    #[test]
    fn test_book_creation() {
        let book = MeasurementBook::new("Canal desilting", "Crate");
        assert_eq!(book.meta.work_info, "Canal desilting");
        assert_eq!(book.meta.work_type, "Crate");
        assert_eq!(book.meta.version, SCHEMA_VERSION);
        assert_eq!(book.row_count(), 0);
    }

    #[test]
    fn test_add_remove_row() {
        let mut book = MeasurementBook::default();
        let id = book.add_row();
        assert_eq!(book.row_count(), 1);
        assert!(book.row(&id).is_some());

        let removed = book.remove_row(&id);
        assert!(removed.is_some());
        assert_eq!(book.row_count(), 0);
    }

    #[test]
    fn test_recompute_requires_complete_row() {
        let mut book = MeasurementBook::default();
        let id = book.add_row();

        let row = book.row_mut(&id).unwrap();
        row.length = "10".to_string();
        row.height_readings = "5+5+5".to_string();
        row.top_readings = "4+4+4".to_string();
        // bed_width still empty
        row.recompute();
        assert_eq!(row.vol_ft3, 0.0);
        assert_eq!(row.vol_m3, 0.0);

        row.bed_width = "6".to_string();
        row.recompute();
        assert!((row.vol_ft3 - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_grand_totals_sum_unrounded() {
        let mut book = MeasurementBook::default();
        // Two rows whose individually-rounded volumes would drift from the
        // rounded total
        complete_row(&mut book, "1", "1.1", "1.1", "1.1");
        complete_row(&mut book, "1", "1.1", "1.1", "1.1");

        let per_row = book.rows[0].vol_ft3;
        let totals = book.grand_totals();
        assert!((totals.ft3.value() - per_row * 2.0).abs() < 1e-12);

        let displayed = format_for_display(totals.ft3.value(), 2);
        assert_eq!(displayed, format_for_display(per_row * 2.0, 2));
    }

    #[test]
    fn test_clear_rows() {
        let mut book = MeasurementBook::default();
        complete_row(&mut book, "10", "5", "4", "6");
        complete_row(&mut book, "8", "3", "2", "4");
        book.clear_rows();
        assert_eq!(book.row_count(), 0);
        assert_eq!(book.grand_totals().ft3.value(), 0.0);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut book = MeasurementBook::new("Desilting\nSector 7", "DRSM");
        complete_row(&mut book, "10", "5+5+5", "4+4+4", "6");

        let json = serde_json::to_string_pretty(&book).unwrap();
        assert!(json.contains("Desilting"));
        assert!(json.contains("height_readings"));

        let roundtrip: MeasurementBook = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.meta.work_type, "DRSM");
        assert_eq!(roundtrip.rows.len(), 1);
        assert!((roundtrip.rows[0].vol_ft3 - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_legacy_camel_case_row_deserializes() {
        // Row JSON as written by early releases
        let json = r#"{
            "id": 1735689600000,
            "length": "10",
            "heightReadings": "5+5+5",
            "topReadings": "4+4+4",
            "bedWidth": "6",
            "volFt3": 250.0,
            "volM3": 7.08
        }"#;
        let row: MeasurementRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.height_readings, "5+5+5");
        assert_eq!(row.bed_width, "6");
        assert!((row.vol_ft3 - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_row_mut_missing_id() {
        let mut book = MeasurementBook::default();
        let missing = Uuid::new_v4();
        assert!(book.row_mut(&missing).is_none());
    }
}
