//! The selection-driven recompute: from a set of patients to the radar
//! figure and metadata table.
//!
//! [`render_selection`] is a pure function over the immutable store. An
//! absent selection (no gesture yet, or an explicit reset) is distinct from
//! an empty one (a gesture that enclosed zero points): the former renders the
//! initial skeleton and a bare placeholder table, the latter renders the same
//! skeleton but a table that already carries the metadata columns.

use hashbrown::HashSet;
use serde::Serialize;
use thiserror::Error;

use crate::figure::{Column, Figure, Layout, PolarTrace, TableRow, TableSpec, Trace};
use crate::store::{DatasetStore, PatientKey};

/// An ordered set of patient keys, as produced by one lasso/box gesture.
/// Duplicates are dropped on construction, first occurrence wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    keys: Vec<PatientKey>,
}

impl Selection {
    pub fn new(keys: impl IntoIterator<Item = PatientKey>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for key in keys {
            if seen.insert(key.clone()) {
                unique.push(key);
            }
        }
        Self { keys: unique }
    }

    pub fn keys(&self) -> &[PatientKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("unknown patient key {0:?}")]
    UnknownKey(PatientKey),
}

/// What one render cycle produces: the radar figure and the table spec.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    pub radar: Figure,
    pub table: TableSpec,
}

/// The initial (no selection made) state: a single skeleton trace so the
/// angular axis labels stay visible, and the bare table placeholder.
pub fn initial_output(store: &DatasetStore) -> RenderOutput {
    RenderOutput {
        radar: skeleton_figure(store),
        table: TableSpec::placeholder(),
    }
}

/// Recomputes the radar figure and metadata table for one selection.
///
/// The whole selection is validated before any output is built: a single
/// unknown key fails the cycle with [`SelectionError::UnknownKey`] and the
/// store is left untouched. Identical inputs produce identical outputs.
pub fn render_selection(
    store: &DatasetStore,
    selection: Option<&Selection>,
) -> Result<RenderOutput, SelectionError> {
    let Some(selection) = selection else {
        return Ok(initial_output(store));
    };

    let mut rows = Vec::with_capacity(selection.len());
    for key in selection.keys() {
        match store.row_of(key) {
            Some(row) => rows.push(row),
            None => return Err(SelectionError::UnknownKey(key.clone())),
        }
    }

    if rows.is_empty() {
        // An explicit empty selection: skeleton chart, but the table already
        // shows its columns.
        return Ok(RenderOutput {
            radar: skeleton_figure(store),
            table: TableSpec::with_columns(meta_columns(store), Vec::new()),
        });
    }

    let theta: Vec<String> = store.feature_names().to_vec();
    let mut data = Vec::with_capacity(rows.len() + 1);
    for (key, &row) in selection.keys().iter().zip(&rows) {
        data.push(Trace::Scatterpolar(PolarTrace::patient(
            key.as_str(),
            store.phenotype_row(row).to_vec(),
            theta.clone(),
        )));
    }
    // A selection of one still gets both traces; the mean of one vector is
    // that vector.
    data.push(Trace::Scatterpolar(PolarTrace::mean(
        feature_means(store, &rows),
        theta,
    )));

    let table_rows = selection
        .keys()
        .iter()
        .zip(&rows)
        .map(|(key, &row)| TableRow {
            key: key.to_string(),
            cells: store.meta_row(row).to_vec(),
        })
        .collect();

    Ok(RenderOutput {
        radar: Figure {
            data,
            layout: Layout::default(),
        },
        table: TableSpec::with_columns(meta_columns(store), table_rows),
    })
}

fn skeleton_figure(store: &DatasetStore) -> Figure {
    Figure {
        data: vec![Trace::Scatterpolar(PolarTrace::skeleton(
            store.feature_names().to_vec(),
        ))],
        layout: Layout::default(),
    }
}

fn meta_columns(store: &DatasetStore) -> Vec<Column> {
    store
        .meta_columns()
        .iter()
        .map(|name| Column {
            id: name.clone(),
            name: name.clone(),
        })
        .collect()
}

/// Feature-wise arithmetic mean over the given rows. Missing values are
/// excluded from both numerator and denominator; a feature with no present
/// value stays missing.
fn feature_means(store: &DatasetStore, rows: &[usize]) -> Vec<Option<f64>> {
    (0..store.feature_names().len())
        .map(|feature| {
            let mut sum = 0.0;
            let mut count = 0usize;
            for &row in rows {
                if let Some(value) = store.phenotype_row(row)[feature] {
                    sum += value;
                    count += 1;
                }
            }
            if count == 0 {
                None
            } else {
                Some(sum / count as f64)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMBEDDING: &str = "id,x,y\nP1,0.1,1.5\nP2,-0.4,0.2\nP3,2.0,-1.1\n";
    const PHENOTYPES: &str = "id,A,B\nP1,2,4\nP2,4,6\nP3,6,2\n";
    const PATIENTS: &str = "id,sex,age,time\n\
                            P1,F,44,0\n\
                            P2,M,51,0\n\
                            P3,F,38,0\n";

    fn store() -> DatasetStore {
        DatasetStore::from_readers(
            EMBEDDING.as_bytes(),
            PHENOTYPES.as_bytes(),
            PATIENTS.as_bytes(),
        )
        .unwrap()
    }

    fn store_with_gaps() -> DatasetStore {
        let phenotypes = "id,A,B\nP1,2,\nP2,4,6\nP3,6,2\n";
        DatasetStore::from_readers(
            EMBEDDING.as_bytes(),
            phenotypes.as_bytes(),
            PATIENTS.as_bytes(),
        )
        .unwrap()
    }

    fn select(keys: &[&str]) -> Selection {
        Selection::new(keys.iter().copied().map(PatientKey::from))
    }

    fn polar(trace: &Trace) -> &PolarTrace {
        match trace {
            Trace::Scatterpolar(t) => t,
            other => panic!("expected a polar trace, got {other:?}"),
        }
    }

    #[test]
    fn same_selection_renders_identically() {
        let store = store();
        let sel = select(&["P1", "P3"]);
        let first = render_selection(&store, Some(&sel)).unwrap();
        let second = render_selection(&store, Some(&sel)).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn mean_is_the_feature_wise_average_of_the_selection() {
        let store = store();
        let out = render_selection(&store, Some(&select(&["P1", "P2"]))).unwrap();
        // P1 = (A:2, B:4), P2 = (A:4, B:6)
        let mean = polar(out.radar.data.last().unwrap());
        assert_eq!(mean.name.as_deref(), Some("mean"));
        assert_eq!(mean.r, vec![Some(3.0), Some(5.0)]);
        assert_eq!(mean.theta, vec!["A", "B"]);
    }

    #[test]
    fn mean_skips_missing_values() {
        let store = store_with_gaps();
        // B is missing for P1, so the B mean averages P2 and P3 only.
        let out = render_selection(&store, Some(&select(&["P1", "P2", "P3"]))).unwrap();
        let mean = polar(out.radar.data.last().unwrap());
        assert_eq!(mean.r, vec![Some(4.0), Some(4.0)]);
    }

    #[test]
    fn feature_missing_everywhere_stays_missing_in_the_mean() {
        let phenotypes = "id,A,B\nP1,2,\nP2,4,\nP3,6,2\n";
        let store = DatasetStore::from_readers(
            EMBEDDING.as_bytes(),
            phenotypes.as_bytes(),
            PATIENTS.as_bytes(),
        )
        .unwrap();
        let out = render_selection(&store, Some(&select(&["P1", "P2"]))).unwrap();
        let mean = polar(out.radar.data.last().unwrap());
        assert_eq!(mean.r, vec![Some(3.0), None]);
    }

    #[test]
    fn singleton_selection_produces_patient_and_identical_mean() {
        let store = store();
        let out = render_selection(&store, Some(&select(&["P2"]))).unwrap();
        assert_eq!(out.radar.data.len(), 2);
        let patient = polar(&out.radar.data[0]);
        let mean = polar(&out.radar.data[1]);
        assert_eq!(patient.hovertext.as_deref(), Some("P2"));
        assert_eq!(patient.showlegend, Some(false));
        assert_eq!(patient.r, mean.r);
        assert_eq!(mean.r, vec![Some(4.0), Some(6.0)]);
    }

    #[test]
    fn absent_selection_renders_skeleton_and_placeholder() {
        let store = store();
        let out = render_selection(&store, None).unwrap();
        assert_eq!(out.radar.data.len(), 1);
        let skeleton = polar(&out.radar.data[0]);
        assert!(skeleton.r.is_empty());
        assert_eq!(skeleton.theta, vec!["A", "B"]);
        assert_eq!(out.table, TableSpec::placeholder());
    }

    #[test]
    fn empty_selection_is_distinct_from_absent() {
        let store = store();
        let absent = render_selection(&store, None).unwrap();
        let empty = render_selection(&store, Some(&select(&[]))).unwrap();
        // Same chart shape...
        assert_eq!(absent.radar, empty.radar);
        // ...but the empty selection's table already carries its columns.
        assert!(empty.table.rows.is_empty());
        assert_eq!(empty.table.columns.len(), 2);
        assert!(absent.table.columns.is_empty());
        assert_ne!(absent.table, empty.table);
    }

    #[test]
    fn table_holds_exactly_the_selected_patients() {
        let store = store();
        let out = render_selection(&store, Some(&select(&["P3", "P1"]))).unwrap();
        let ids: Vec<&str> = out.table.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["sex", "age"]);
        assert_eq!(out.table.rows.len(), 2);
        // Rows follow selection order, not store order.
        assert_eq!(out.table.rows[0].key, "P3");
        assert_eq!(out.table.rows[0].cells, vec!["F", "38"]);
        assert_eq!(out.table.rows[1].key, "P1");
        assert!(out.table.row_selectable);
        assert!(out.table.sortable);
    }

    #[test]
    fn unknown_key_fails_the_whole_cycle() {
        let store = store();
        let err = render_selection(&store, Some(&select(&["P1", "PX9999"]))).unwrap_err();
        assert_eq!(err, SelectionError::UnknownKey(PatientKey::from("PX9999")));
        // The store is untouched and keeps serving good selections.
        let out = render_selection(&store, Some(&select(&["P1"]))).unwrap();
        assert_eq!(out.table.rows.len(), 1);
    }

    #[test]
    fn duplicate_keys_in_one_gesture_collapse() {
        let store = store();
        let sel = select(&["P1", "P1", "P2"]);
        assert_eq!(sel.len(), 2);
        let out = render_selection(&store, Some(&sel)).unwrap();
        // Two patient traces plus the mean; the duplicate cannot skew it.
        assert_eq!(out.radar.data.len(), 3);
        let mean = polar(out.radar.data.last().unwrap());
        assert_eq!(mean.r, vec![Some(3.0), Some(5.0)]);
    }
}
