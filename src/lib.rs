//! # phenoscope
//!
//! Interactive dashboard for exploring a precomputed 2-D embedding of
//! patient records alongside their phenotype vectors.
//!
//! The service loads three CSV tables at startup (embedding coordinates, a
//! phenotype feature matrix, and per-visit patient metadata), serves a single
//! page with a scatter plot of the embedding, and answers each lasso
//! selection by recomputing a radial chart (one line per selected patient
//! plus a mean line) and a metadata table.
//!
//! ## Quick Start
//!
//! The recompute is a pure function over the immutable store, so it can be
//! driven without the server:
//!
//! ```
//! use phenoscope::prelude::*;
//!
//! let store = DatasetStore::from_readers(
//!     "id,x,y\nP1,0.1,0.2\nP2,0.3,0.4\n".as_bytes(),
//!     "id,IL-5,FEV1\nP1,2.0,4.0\nP2,4.0,6.0\n".as_bytes(),
//!     "id,sex,age,time\nP1,F,44,0\nP2,M,51,0\n".as_bytes(),
//! )
//! .unwrap();
//!
//! let selection = Selection::new(["P1"].map(PatientKey::from));
//! let output = render_selection(&store, Some(&selection)).unwrap();
//! assert_eq!(output.radar.data.len(), 2); // the patient's line plus the mean
//! assert_eq!(output.table.rows.len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`store`]: CSV loading, key alignment, the immutable [`store::DatasetStore`]
//! - [`selection`]: the selection-driven recompute
//! - [`figure`]: chart and table payload types
//! - [`server`]: the HTTP shell and embedded page

pub mod figure;
pub mod selection;
pub mod server;
pub mod store;

/// Prelude module for convenient imports.
///
/// ```
/// use phenoscope::prelude::*;
/// ```
pub mod prelude {
    pub use crate::figure::{Figure, PolarTrace, ScatterTrace, TableSpec, Trace};
    pub use crate::selection::{
        initial_output, render_selection, RenderOutput, Selection, SelectionError,
    };
    pub use crate::store::{DataPaths, DatasetStore, LoadError, PatientKey};
}
