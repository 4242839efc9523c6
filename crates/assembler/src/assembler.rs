//! Segment Assembler: pivots per-file segments into one table keyed by
//! segment id (and sensor location for multi-site recordings).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use contracts::{
    AssembledRow, AssembledTable, BoundarySet, Cell, CurationBlueprint, PivotColumn, Segment,
    SegmentId, SegmentKey,
};
use tracing::{debug, instrument, warn};

/// Pivots segments into an [`AssembledTable`]
#[derive(Debug, Clone)]
pub struct SegmentAssembler {
    pivot_columns: Vec<PivotColumn>,
    has_location: bool,
}

impl SegmentAssembler {
    pub fn new(pivot_columns: Vec<PivotColumn>, has_location: bool) -> Self {
        Self {
            pivot_columns,
            has_location,
        }
    }

    pub fn from_blueprint(blueprint: &CurationBlueprint) -> Self {
        Self::new(blueprint.pivot_columns(), blueprint.has_locations())
    }

    pub fn pivot_columns(&self) -> &[PivotColumn] {
        &self.pivot_columns
    }

    /// Build the segment table.
    ///
    /// Every boundary yields at least one row, in boundary order. Boundaries
    /// seen at several sensor locations yield one row per location. Segments
    /// are joined to boundaries on the exact segment id; segments whose id
    /// matches no boundary are dropped with a warning. Reserved slots follow
    /// as rows whose every column is a null payload.
    #[instrument(
        name = "assembler_assemble",
        skip_all,
        fields(boundaries = boundaries.len(), segments = segments.len())
    )]
    pub fn assemble(&self, boundaries: &BoundarySet, segments: Vec<Segment>) -> AssembledTable {
        let known: HashSet<&str> = boundaries
            .boundaries()
            .iter()
            .map(|b| b.segment_id.as_str())
            .collect();
        let mut cells: HashMap<SegmentId, BTreeMap<Option<String>, Vec<Cell>>> = HashMap::new();
        let mut orphans = 0usize;
        let mut duplicates = 0usize;

        for segment in segments {
            if !known.contains(segment.segment_id.as_str()) {
                orphans += 1;
                continue;
            }
            let Some(idx) = self.column_index(segment.column()) else {
                warn!(column = %segment.column(), "segment for undeclared pivot column");
                continue;
            };
            let location = if self.has_location {
                segment.location.clone()
            } else {
                None
            };
            let row = cells
                .entry(segment.segment_id.clone())
                .or_default()
                .entry(location)
                .or_insert_with(|| vec![Cell::Absent; self.pivot_columns.len()]);

            let incoming = match segment.payload {
                Some(series) => Cell::Series(series),
                None => Cell::Null,
            };
            if !matches!(row[idx], Cell::Absent) {
                duplicates += 1;
            }
            row[idx] = prefer(std::mem::replace(&mut row[idx], Cell::Absent), incoming);
        }

        if orphans > 0 {
            warn!(orphans, "segments without a matching boundary were dropped");
        }
        if duplicates > 0 {
            debug!(duplicates, "overlapping segments merged, larger series kept");
        }

        let mut rows = Vec::with_capacity(boundaries.len() + boundaries.reserved().len());
        for boundary in boundaries.boundaries() {
            let labels = boundary.label.values();
            let by_location = cells.remove(&boundary.segment_id).unwrap_or_default();
            if by_location.is_empty() {
                rows.push(AssembledRow {
                    key: SegmentKey::new(boundary.segment_id.clone(), None),
                    subject_id: boundary.subject_id.clone(),
                    labels,
                    cells: vec![Cell::Absent; self.pivot_columns.len()],
                });
                continue;
            }
            for (location, row_cells) in by_location {
                rows.push(AssembledRow {
                    key: SegmentKey::new(boundary.segment_id.clone(), location),
                    subject_id: boundary.subject_id.clone(),
                    labels: labels.clone(),
                    cells: row_cells,
                });
            }
        }
        for slot in boundaries.reserved() {
            rows.push(AssembledRow {
                key: SegmentKey::new(slot.segment_id.clone(), None),
                subject_id: slot.subject_id.clone(),
                labels: slot.label.values(),
                cells: vec![Cell::Null; self.pivot_columns.len()],
            });
        }

        let table = AssembledTable {
            label_columns: boundaries
                .regime
                .label_columns()
                .iter()
                .map(|c| c.to_string())
                .collect(),
            pivot_columns: self.pivot_columns.clone(),
            has_location: self.has_location,
            rows,
        };
        record_table_metrics(&table);
        table
    }

    fn column_index(&self, column: PivotColumn) -> Option<usize> {
        self.pivot_columns.iter().position(|c| *c == column)
    }
}

/// A series beats a null marker; between two series the longer one wins.
fn prefer(current: Cell, incoming: Cell) -> Cell {
    match (current, incoming) {
        (Cell::Series(a), Cell::Series(b)) => {
            if b.len() > a.len() {
                Cell::Series(b)
            } else {
                Cell::Series(a)
            }
        }
        (Cell::Series(a), _) => Cell::Series(a),
        (_, incoming @ Cell::Series(_)) => incoming,
        (Cell::Null, _) | (_, Cell::Null) => Cell::Null,
        _ => Cell::Absent,
    }
}

fn record_table_metrics(table: &AssembledTable) {
    let mut present = 0u64;
    let mut absent = 0u64;
    for cell in table.rows.iter().flat_map(|row| &row.cells) {
        match cell {
            Cell::Series(_) => present += 1,
            Cell::Absent => absent += 1,
            Cell::Null => {}
        }
    }
    metrics::gauge!("curation_assembled_rows").set(table.len() as f64);
    metrics::counter!("curation_cells_present_total").increment(present);
    metrics::counter!("curation_cells_absent_total").increment(absent);

    let subjects: BTreeSet<_> = table.rows.iter().map(|r| &r.subject_id).collect();
    debug!(
        rows = table.len(),
        subjects = subjects.len(),
        present,
        absent,
        "segment table assembled"
    );
}
