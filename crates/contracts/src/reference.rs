//! TimeReference - Time-Reference Resolver output
//!
//! `reference_time = device_time + offset_s`, one offset per (subject, device).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{ContractError, Device, SubjectId, Table};

/// Lookup key of a time reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReferenceKey {
    pub subject_id: SubjectId,
    pub device: Device,
}

impl ReferenceKey {
    pub fn new(subject_id: SubjectId, device: Device) -> Self {
        Self { subject_id, device }
    }
}

/// Linear clock offset for one device of one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeReference {
    pub key: ReferenceKey,
    /// Seconds added to device time to obtain reference time
    pub offset_s: f64,
}

impl TimeReference {
    /// Offset from one paired observation of the same physical instant.
    pub fn from_pair(key: ReferenceKey, reference_time: f64, device_time: f64) -> Self {
        Self {
            key,
            offset_s: reference_time - device_time,
        }
    }

    #[inline]
    pub fn to_reference(&self, device_time: f64) -> f64 {
        device_time + self.offset_s
    }

    #[inline]
    pub fn to_device(&self, reference_time: f64) -> f64 {
        reference_time - self.offset_s
    }
}

/// Read-only lookup built once per run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeReferenceTable {
    entries: HashMap<ReferenceKey, TimeReference>,
}

impl TimeReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reference. Returns the displaced entry, if any.
    pub fn insert(&mut self, reference: TimeReference) -> Option<TimeReference> {
        self.entries.insert(reference.key.clone(), reference)
    }

    pub fn get(&self, subject_id: &SubjectId, device: Device) -> Option<&TimeReference> {
        self.entries
            .get(&ReferenceKey::new(subject_id.clone(), device))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key.
    pub fn sorted(&self) -> Vec<&TimeReference> {
        let mut refs: Vec<_> = self.entries.values().collect();
        refs.sort_by(|a, b| a.key.cmp(&b.key));
        refs
    }

    /// Export as a row-oriented table.
    pub fn to_table(&self) -> Result<Table, ContractError> {
        let mut table = Table::new("time_references", ["subject_id", "device", "offset_s"]);
        for reference in self.sorted() {
            table.push_row(vec![
                Some(reference.key.subject_id.to_string()),
                Some(reference.key.device.to_string()),
                Some(format!("{:.6}", reference.offset_s)),
            ])?;
        }
        Ok(table)
    }
}
