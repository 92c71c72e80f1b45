//! Parser for per-record upload error strings
//!
//! The portal reports record errors as `#`-delimited segments of the form
//! `path/to/field:message`, e.g.
//! `#sample_collection/host_age:must be a number#sample_collection/host_age:out of range`.
//! Only the last path segment is kept as the field label, and consecutive
//! segments for the same label are merged.

use std::fmt;

/// Messages reported against one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Last path segment of the field, `None` when the segment had no path
    pub field: Option<String>,
    pub messages: Vec<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.messages.join("; ")),
            None => write!(f, "{}", self.messages.join("; ")),
        }
    }
}

/// Parsed error string of one record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorTrail {
    pub fields: Vec<FieldError>,
}

impl ErrorTrail {
    pub fn parse(raw: &str) -> Self {
        let mut fields: Vec<FieldError> = Vec::new();

        for segment in raw.split('#').map(str::trim).filter(|s| !s.is_empty()) {
            let (field, message) = match segment.split_once(':') {
                Some((path, message)) => {
                    let label = path.rsplit('/').next().unwrap_or(path).trim();
                    ((!label.is_empty()).then(|| label.to_string()), message.trim())
                },
                None => (None, segment),
            };

            match fields.last_mut() {
                Some(last) if last.field == field => last.messages.push(message.to_string()),
                _ => fields.push(FieldError {
                    field,
                    messages: vec![message.to_string()],
                }),
            }
        }

        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
