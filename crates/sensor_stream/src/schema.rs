use std::collections::HashSet;

use thiserror::Error;

/// Column prepended to every output row.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

pub const DEFAULT_DELIMITER: char = ',';

/// Delimiters accepted by [`FieldSchema`]. Tabs are excluded because control
/// characters are stripped before a line is split.
pub const SUPPORTED_DELIMITERS: &[char] = &[',', ';', '|'];

/// Number of leading field names joined to form the header marker.
const MARKER_FIELDS: usize = 3;

/// IMU + GPS frame emitted by the reference sensor unit.
pub const IMU_GPS_FIELDS: [&str; 21] = [
    "AccX", "AccY", "AccZ", "GyroX", "GyroY", "GyroZ", "Roll", "Pitch", "YawIMU", "MagX", "MagY",
    "MagZ", "Lat", "Lon", "Alt", "Speed", "Course", "Sats", "PDOP", "HDOP", "VDOP",
];

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FieldName(String);

impl FieldName {
    pub const MAX_BYTES: usize = 64;

    pub fn new(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.len() > Self::MAX_BYTES || !raw.is_ascii() {
            return None;
        }
        let mut chars = raw.chars();
        let first = chars.next()?;
        if !first.is_ascii_alphanumeric() {
            return None;
        }
        for ch in chars {
            if !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '/' | '-')) {
                return None;
            }
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum SchemaError {
    #[error("field schema must contain at least one field")]
    Empty,
    #[error("invalid field name `{name}` at position {index}")]
    InvalidFieldName { index: usize, name: String },
    #[error("duplicate field name `{name}`")]
    DuplicateField { name: String },
    #[error("unsupported field delimiter {delimiter:?} (expected one of , ; |)")]
    UnsupportedDelimiter { delimiter: char },
}

/// Ordered, immutable description of the record shape every data row must
/// satisfy.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldSchema {
    fields: Vec<FieldName>,
    delimiter: char,
    marker: String,
}

impl FieldSchema {
    pub fn new<I, S>(fields: I, delimiter: char) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !SUPPORTED_DELIMITERS.contains(&delimiter) {
            return Err(SchemaError::UnsupportedDelimiter { delimiter });
        }

        let mut seen = HashSet::new();
        let mut validated = Vec::new();
        for (index, raw) in fields.into_iter().enumerate() {
            let raw = raw.as_ref();
            let name = FieldName::new(raw).ok_or_else(|| SchemaError::InvalidFieldName {
                index,
                name: raw.to_string(),
            })?;
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateField {
                    name: raw.to_string(),
                });
            }
            validated.push(name);
        }
        if validated.is_empty() {
            return Err(SchemaError::Empty);
        }

        Ok(Self::from_validated(validated, delimiter))
    }

    /// The 21-field IMU/GPS schema of the reference sensor unit.
    pub fn imu_gps() -> Self {
        let fields = IMU_GPS_FIELDS
            .iter()
            .map(|name| FieldName((*name).to_string()))
            .collect();
        Self::from_validated(fields, DEFAULT_DELIMITER)
    }

    fn from_validated(fields: Vec<FieldName>, delimiter: char) -> Self {
        let mut marker = String::new();
        for (idx, field) in fields.iter().take(MARKER_FIELDS).enumerate() {
            if idx > 0 {
                marker.push(delimiter);
            }
            marker.push_str(field.as_str());
        }
        Self {
            fields,
            delimiter,
            marker,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Substring whose presence marks a line as the device's header echo.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(FieldName::as_str)
    }

    /// Output header: [`TIMESTAMP_COLUMN`] followed by every field name.
    pub fn header_columns(&self) -> Vec<&str> {
        std::iter::once(TIMESTAMP_COLUMN)
            .chain(self.field_names())
            .collect()
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::imu_gps()
    }
}
