//! HTTP shell: the embedded single page and the JSON API around the
//! selection recompute.
//!
//! The page is assembled once at router construction (the description
//! markdown is rendered server-side) and served as-is. All interactivity
//! goes through two JSON endpoints: `/api/init` for the initial figures and
//! `/api/select` for each lasso/reset gesture.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::figure::{Figure, Layout, ScatterTrace, TableSpec, Trace};
use crate::selection::{initial_output, render_selection, RenderOutput, Selection, SelectionError};
use crate::store::{DatasetStore, PatientKey};

const DESCRIPTION_MD: &str = "\
The visualizations displayed here are the result of an embedding model. Each \
point corresponds to a patient in the embedding space.

**Usage: select points in the scatter plot with the lasso tool to see their \
phenotypic features in the radar chart and their patient profiles in the \
table below. Double-click the scatter plot to reset.**

All data was extracted from the following publication and belongs to the \
original authors:

> [Lodin, Karin et al. \u{201c}Longitudinal co-variations between inflammatory \
cytokines, lung function and patient reported outcomes in patients with \
asthma.\u{201d} PloS one vol. 12,9 e0185019. 15 Sep. 2017, \
doi:10.1371/journal.pone.0185019](https://www.ncbi.nlm.nih.gov/pmc/articles/PMC5600400/)";

#[derive(Clone)]
struct AppState {
    store: Arc<DatasetStore>,
    page: Arc<String>,
}

/// Builds the application router over an already-loaded store.
pub fn router(store: Arc<DatasetStore>) -> Router {
    let state = AppState {
        store,
        page: Arc::new(render_page()),
    };
    Router::new()
        .route("/", get(index))
        .route("/api/init", get(init))
        .route("/api/select", post(select_points))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.page.as_ref().clone())
}

async fn healthz() -> &'static str {
    "ok"
}

/// Initial page state: the fixed scatter plot plus the absent-selection
/// radar skeleton and table placeholder.
#[derive(Debug, Serialize)]
struct InitResponse {
    scatter: Figure,
    radar: Figure,
    table: TableSpec,
}

async fn init(State(state): State<AppState>) -> Json<InitResponse> {
    let RenderOutput { radar, table } = initial_output(&state.store);
    Json(InitResponse {
        scatter: scatter_figure(&state.store),
        radar,
        table,
    })
}

/// One gesture from the scatter plot. `points: null` (or a missing field)
/// means no selection — the reset state — while an empty list is an explicit
/// selection of zero points.
#[derive(Debug, Deserialize)]
struct SelectRequest {
    points: Option<Vec<String>>,
}

async fn select_points(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<RenderOutput>, ApiError> {
    let selection = request
        .points
        .map(|keys| Selection::new(keys.into_iter().map(PatientKey::from)));
    debug!(
        selected = selection.as_ref().map_or(0, Selection::len),
        "recomputing selection"
    );
    match render_selection(&state.store, selection.as_ref()) {
        Ok(output) => Ok(Json(output)),
        Err(err) => {
            warn!("selection rejected: {err}");
            Err(ApiError::from(err))
        }
    }
}

/// A failed render cycle. The client keeps its previous radar/table state.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl From<SelectionError> for ApiError {
    fn from(err: SelectionError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// The fixed scatter figure: one marker per patient, identity on hovertext.
fn scatter_figure(store: &DatasetStore) -> Figure {
    let x = store.embedding().iter().map(|p| p[0]).collect();
    let y = store.embedding().iter().map(|p| p[1]).collect();
    let hovertext = store.keys().iter().map(|k| k.to_string()).collect();
    Figure {
        data: vec![Trace::Scatter(ScatterTrace::markers(x, y, hovertext))],
        layout: Layout::lasso(),
    }
}

fn render_markdown(md: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    let parser = Parser::new_ext(md, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn render_page() -> String {
    PAGE_TEMPLATE.replace("<!-- description -->", &render_markdown(DESCRIPTION_MD))
}

const PAGE_TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Patient Embedding Explorer</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
body { font-family: sans-serif; margin: 0 auto; max-width: 1200px; padding: 0 16px; color: #222; }
h1 { text-align: center; }
.subtitle { text-align: center; font-style: italic; }
.description { margin: 30px; width: 60%; }
.graphs { display: flex; }
.graphs > div { flex: 1; min-width: 0; }
.caption { text-align: center; }
.instructions { text-align: center; font-size: 11pt; font-style: italic; margin-top: 5px; }
table { border-collapse: collapse; margin: 10px 0 40px; }
th, td { border: 1px solid #ccc; padding: 4px 10px; }
th { background: #f2f2f2; }
tr.picked { background: #fff4dd; }
</style>
</head>
<body>
<div class="intro">
<h1>Asthma Phenotyping Project - Interactive Dashboard</h1>
<div class="subtitle">Prototype under development</div>
<div class="description"><!-- description --></div>
</div>
<div class="graphs">
<div>
<div class="caption">Figure 1: 2-dimensional embedding</div>
<div class="instructions">Instructions: select a region with the lasso tool; double-click to reset</div>
<div id="scatter"></div>
</div>
<div>
<div class="caption">Figure 2: phenotype profiles</div>
<div id="radar"></div>
</div>
</div>
<div class="table-intro">Selected patients appear here &#8595; &#8595;</div>
<div id="table-cont"></div>
<script>
let tableSpec = null;
let sortState = { col: -1, asc: true };

function renderTable(spec) {
  tableSpec = spec;
  sortState = { col: -1, asc: true };
  drawTable();
}

function drawTable() {
  const cont = document.getElementById('table-cont');
  cont.innerHTML = '';
  if (!tableSpec || tableSpec.columns.length === 0) return;
  const table = document.createElement('table');
  const thead = document.createElement('thead');
  const headRow = document.createElement('tr');
  if (tableSpec.row_selectable) headRow.appendChild(document.createElement('th'));
  tableSpec.columns.forEach((col, i) => {
    const th = document.createElement('th');
    th.textContent = col.name + (sortState.col === i ? (sortState.asc ? ' ▲' : ' ▼') : '');
    if (tableSpec.sortable) {
      th.style.cursor = 'pointer';
      th.onclick = () => {
        sortState = { col: i, asc: sortState.col === i ? !sortState.asc : true };
        drawTable();
      };
    }
    headRow.appendChild(th);
  });
  thead.appendChild(headRow);
  table.appendChild(thead);
  const rows = tableSpec.rows.slice();
  if (sortState.col >= 0) {
    const i = sortState.col;
    const dir = sortState.asc ? 1 : -1;
    rows.sort((a, b) => {
      const av = a.cells[i], bv = b.cells[i];
      const an = parseFloat(av), bn = parseFloat(bv);
      const cmp = (!isNaN(an) && !isNaN(bn)) ? an - bn : av.localeCompare(bv);
      return dir * cmp;
    });
  }
  const tbody = document.createElement('tbody');
  rows.forEach(row => {
    const tr = document.createElement('tr');
    if (tableSpec.row_selectable) {
      const td = document.createElement('td');
      const cb = document.createElement('input');
      cb.type = 'checkbox';
      cb.onchange = () => tr.classList.toggle('picked', cb.checked);
      td.appendChild(cb);
      tr.appendChild(td);
    }
    row.cells.forEach(value => {
      const td = document.createElement('td');
      td.textContent = value;
      tr.appendChild(td);
    });
    tbody.appendChild(tr);
  });
  table.appendChild(tbody);
  cont.appendChild(table);
}

async function postSelection(points) {
  const resp = await fetch('/api/select', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ points })
  });
  if (!resp.ok) {
    // Failed cycle: keep the current radar and table.
    console.error('selection failed:', await resp.text());
    return;
  }
  const out = await resp.json();
  Plotly.react('radar', out.radar.data, out.radar.layout);
  renderTable(out.table);
}

async function main() {
  const init = await fetch('/api/init').then(r => r.json());
  await Plotly.newPlot('scatter', init.scatter.data, init.scatter.layout);
  await Plotly.newPlot('radar', init.radar.data, init.radar.layout);
  renderTable(init.table);
  const scatter = document.getElementById('scatter');
  scatter.on('plotly_selected', ev => {
    if (!ev || !ev.points) return;
    postSelection(ev.points.map(p => p.hovertext));
  });
  scatter.on('plotly_doubleclick', () => postSelection(null));
}

main();
</script>
</body>
</html>
"#;
