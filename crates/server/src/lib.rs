use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use idolboard_engine::{
    codec, grid::BLOCKED_CELLS, BoardStore, Cell, DirSource, Idol, IdolId, ModifierSource,
    Planner, PlannerError, Point, Size, SourceFetchError, UnknownSize, COLS, ROWS,
};
use idolboard_protocol::{
    targets, AddIdolInput, BoardView, CellView, DropInput, IdolView, ModifierOptions, Patch,
    RestoreInput, RestoreView, StateView, UiUpdate,
};
use serde::Deserialize;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

pub mod config;
pub mod persist;

use config::ServerConfig;
use persist::{spawn_persister, PersistHandle};

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<Mutex<Planner>>,
    pub source: Arc<dyn ModifierSource + Send + Sync>,
    pub persist: PersistHandle,
    loading: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(source: Arc<dyn ModifierSource + Send + Sync>, persist: PersistHandle) -> Self {
        Self {
            planner: Arc::new(Mutex::new(Planner::new())),
            source,
            persist,
            loading: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    fn planner(&self) -> MutexGuard<'_, Planner> {
        self.planner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes sure the sources behind `sizes` are loaded. A miss loads every pending source in
    /// canonical order, one loader at a time, so registry IDs match across restarts. The planner
    /// lock is not held while a file is read.
    pub async fn ensure_sources(&self, sizes: &[Size]) {
        let _loading = self.loading.lock().await;
        let pending = {
            let planner = self.planner();
            let catalog = planner.catalog();
            if sizes.iter().all(|size| catalog.is_loaded(*size)) {
                return;
            }
            catalog.pending_sources()
        };
        for size in pending {
            let source = self.source.clone();
            let fetched = match tokio::task::spawn_blocking(move || source.fetch(size)).await {
                Ok(fetched) => fetched,
                Err(err) => Err(SourceFetchError::Io {
                    name: size.source_file_name(),
                    source: std::io::Error::other(err.to_string()),
                }),
            };
            self.planner().catalog_mut().ingest(size, fetched);
        }
    }

    fn persist_board(&self, planner: &Planner) {
        self.persist.schedule(planner.encode());
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/api/board", get(api_board))
        .route("/api/modifiers/{size}", get(api_modifiers))
        .route("/api/idols", post(api_add_idol))
        .route("/api/idols/{id}", delete(api_remove_idol))
        .route("/api/idols/{id}/drop", post(api_drop_idol))
        .route("/api/totals", get(api_totals))
        .route("/api/ui/totals", post(ui_totals))
        .route("/api/state", get(api_get_state).put(api_put_state))
        .with_state(Arc::new(state))
        .layer(SetResponseHeaderLayer::if_not_present(
            axum::http::header::CACHE_CONTROL,
            axum::http::HeaderValue::from_static("no-store"),
        ))
        .layer(middleware::from_fn(ip_allowlist))
        .layer(local_only_cors())
}

type ApiError = (StatusCode, String);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn planner_error(err: PlannerError) -> ApiError {
    let status = match err {
        PlannerError::UnknownIdol(_) => StatusCode::NOT_FOUND,
        PlannerError::PlacementRejected { .. } => StatusCode::CONFLICT,
    };
    (status, err.to_string())
}

fn bad_size(err: UnknownSize) -> ApiError {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn cell_view(cell: Cell) -> CellView {
    CellView {
        row: cell.row,
        col: cell.col,
    }
}

fn idol_view(idol: &Idol) -> IdolView {
    IdolView {
        id: idol.id.0,
        size: idol.size.to_string(),
        position: idol.position.map(cell_view),
        slots: idol
            .slots
            .iter()
            .map(|slot| slot.as_ref().map(|m| m.text.clone()))
            .collect(),
    }
}

fn board_view(planner: &Planner) -> BoardView {
    BoardView {
        rows: ROWS,
        cols: COLS,
        blocked: BLOCKED_CELLS.iter().copied().map(cell_view).collect(),
        idols: planner.idols().iter().map(idol_view).collect(),
        totals: planner.totals(),
        fragment: codec::to_fragment(&planner.encode()),
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn api_board(State(state): State<Arc<AppState>>) -> Json<BoardView> {
    Json(board_view(&state.planner()))
}

#[derive(Debug, Default, Deserialize)]
pub struct ModifierQuery {
    #[serde(default)]
    pub q: Option<String>,
}

async fn api_modifiers(
    State(state): State<Arc<AppState>>,
    Path(size): Path<String>,
    Query(query): Query<ModifierQuery>,
) -> ApiResult<ModifierOptions> {
    let size: Size = size.parse().map_err(bad_size)?;
    state.ensure_sources(&[size]).await;
    let planner = state.planner();
    let q = query.q.unwrap_or_default();
    Ok(Json(ModifierOptions {
        size: size.to_string(),
        prefixes: planner
            .catalog()
            .search(size, idolboard_engine::Section::Prefix, &q),
        suffixes: planner
            .catalog()
            .search(size, idolboard_engine::Section::Suffix, &q),
    }))
}

async fn api_add_idol(
    State(state): State<Arc<AppState>>,
    Json(input): Json<AddIdolInput>,
) -> ApiResult<IdolView> {
    let size: Size = input.size.parse().map_err(bad_size)?;
    state.ensure_sources(&[size]).await;

    let mut planner = state.planner();
    let id = planner.add_idol(size, &input.slots());
    if let Some(at) = input.at {
        // A rejected drop still leaves the new idol in the tray.
        if let Err(err) = planner.drop_idol(id, Point::new(at.x, at.y)) {
            log::debug!("{err}");
        }
    }
    state.persist_board(&planner);
    let idol = planner.idol(id).map_err(planner_error)?;
    Ok(Json(idol_view(idol)))
}

async fn api_drop_idol(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(at): Json<DropInput>,
) -> ApiResult<IdolView> {
    let mut planner = state.planner();
    let id = IdolId(id);
    planner
        .drop_idol(id, Point::new(at.x, at.y))
        .map_err(planner_error)?;
    state.persist_board(&planner);
    let idol = planner.idol(id).map_err(planner_error)?;
    Ok(Json(idol_view(idol)))
}

async fn api_remove_idol(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<BoardView> {
    let mut planner = state.planner();
    planner.remove_idol(IdolId(id)).map_err(planner_error)?;
    state.persist_board(&planner);
    Ok(Json(board_view(&planner)))
}

async fn api_totals(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.planner().totals())
}

async fn ui_totals(State(state): State<Arc<AppState>>) -> Json<UiUpdate> {
    let (totals, placed) = {
        let planner = state.planner();
        (planner.totals(), planner.board().placed().count())
    };
    let html = if totals.is_empty() {
        "<p class=\"muted\">No modifiers on the board.</p>".to_string()
    } else {
        totals
            .iter()
            .map(|line| format!("<p>{}</p>", html_escape::encode_text(line)))
            .collect::<Vec<_>>()
            .join("")
    };
    let patches = vec![
        Patch {
            target: targets::PANEL_TOTALS.to_string(),
            html: Some(html),
            payload: Some(serde_json::json!({ "totals": totals })),
        },
        Patch {
            target: targets::PANEL_STATUS.to_string(),
            html: Some(format!("{placed} placed")),
            payload: None,
        },
    ];
    Json(UiUpdate::new("ui.totals", patches))
}

async fn api_get_state(State(state): State<Arc<AppState>>) -> Json<StateView> {
    let encoded = state.planner().encode();
    Json(StateView {
        fragment: codec::to_fragment(&encoded),
        state: encoded,
    })
}

async fn api_put_state(
    State(state): State<Arc<AppState>>,
    Json(input): Json<RestoreInput>,
) -> Json<RestoreView> {
    let encoded = codec::from_fragment(&input.fragment);
    state
        .ensure_sources(&codec::referenced_sizes(&encoded))
        .await;
    let mut planner = state.planner();
    let report = planner.restore(&encoded);
    if report.dropped > 0 {
        log::info!(
            "restored board: {} placed, {} dropped",
            report.placed,
            report.dropped
        );
    }
    state.persist_board(&planner);
    Json(RestoreView {
        placed: report.placed,
        dropped: report.dropped,
    })
}

/// Wires the store, modifier directory and persister, and reloads the saved board.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let store = BoardStore::new(&config.db_path);
    // Fail fast if sqlite is unavailable.
    store.open()?;

    let persist = spawn_persister(store.clone(), config.board.clone(), config.debounce);
    let state = AppState::new(Arc::new(DirSource::new(&config.mods_dir)), persist);

    // Load every source up front so saved IDs resolve the same way they were written.
    state.ensure_sources(&Size::ALL).await;
    if let Some(saved) = store.load(&config.board)? {
        let report = state.planner().restore(&saved.state);
        log::info!(
            "loaded board {:?} rev {}: {} placed, {} dropped",
            saved.name,
            saved.rev,
            report.placed,
            report.dropped
        );
    }
    Ok(state)
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    serve_listener(listener, &config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;
    Ok(())
}

pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    config: &ServerConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<SocketAddr> {
    let state = build_state(config).await?;
    let app = build_router(state);
    let addr = listener.local_addr()?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(addr)
}

async fn ip_allowlist(
    axum::extract::ConnectInfo(peer): axum::extract::ConnectInfo<SocketAddr>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    if !is_allowed_peer_ip(peer.ip()) {
        log::debug!("rejecting request from {peer}");
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }
    next.run(req).await
}

/// Loopback, plus the Tailscale CGNAT block 100.64.0.0/10.
fn is_allowed_peer_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_loopback() || (a == 100 && b & 0xc0 == 0x40)
        }
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

fn local_only_cors() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            is_allowed_local_origin(origin)
        }))
}

fn is_allowed_local_origin(origin: &axum::http::HeaderValue) -> bool {
    origin.to_str().is_ok_and(|origin| {
        ["localhost", "127.0.0.1"]
            .iter()
            .any(|host| is_http_origin_for_host(origin, host))
    })
}

/// True for `http(s)://<host>` with an optional port and nothing else.
fn is_http_origin_for_host(origin: &str, host: &str) -> bool {
    let Some(rest) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    rest.strip_prefix(host)
        .is_some_and(|port| port.is_empty() || port.starts_with(':'))
}


const DASHBOARD_HTML: &str = r###"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Idolboard</title>
  <style>
    :root{--cell:52px;--bg:#10131a;--panel:#1a1f2b;--edge:#2f3a4f;--ink:#e8ecf4;--muted:#8b96aa;--idol:#4b7bd8;--blocked:#3a2230}
    *{box-sizing:border-box;margin:0;padding:0}
    body{font-family:system-ui,sans-serif;background:var(--bg);color:var(--ink);padding:16px;display:flex;gap:16px;flex-wrap:wrap}
    .panel{background:var(--panel);border:1px solid var(--edge);border-radius:10px;padding:12px}
    .panel h2{font-size:13px;letter-spacing:.5px;margin-bottom:8px;color:var(--muted)}
    label{display:block;font-size:12px;color:var(--muted);margin-top:8px}
    input,select,button{width:100%;padding:6px;border-radius:6px;border:1px solid var(--edge);background:#0d1016;color:var(--ink)}
    button{margin-top:10px;cursor:pointer}
    #grid{position:relative;display:grid;grid-template-columns:repeat(6,var(--cell));grid-template-rows:repeat(7,var(--cell))}
    .cell{border:1px solid var(--edge)}
    .cell.blocked{background:var(--blocked)}
    .idol{position:absolute;background:var(--idol);border:1px solid #9cc0ff;border-radius:4px;display:flex;align-items:center;justify-content:center;font-size:11px;cursor:grab}
    #tray{display:flex;flex-wrap:wrap;gap:6px;min-height:60px;margin-top:8px}
    #tray .idol{position:relative}
    #panel\.totals p{font-size:13px;margin:3px 0}
    .muted{color:var(--muted)}
  </style>
</head>
<body>
  <section class="panel">
    <h2>NEW IDOL</h2>
    <label>Size<select id="size"><option>1x1</option><option>1x2</option><option>2x1</option><option>1x3</option><option>3x1</option><option>2x2</option></select></label>
    <label>Prefix 1<input id="prefix1" list="prefixes"></label>
    <label>Prefix 2<input id="prefix2" list="prefixes"></label>
    <label>Suffix 1<input id="suffix1" list="suffixes"></label>
    <label>Suffix 2<input id="suffix2" list="suffixes"></label>
    <datalist id="prefixes"></datalist><datalist id="suffixes"></datalist>
    <button id="add" type="button">Add idol</button>
    <h2 style="margin-top:12px">TRAY</h2>
    <div id="tray"></div>
  </section>
  <section class="panel">
    <h2>BOARD <span id="panel.status" class="muted"></span></h2>
    <div id="grid"></div>
  </section>
  <section class="panel" style="min-width:260px">
    <h2>TOTALS</h2>
    <div id="panel.totals" class="muted">loading</div>
  </section>
  <script>
  (function(){
    const CELL = 52;
    const $ = (id) => document.getElementById(id);
    const grid = $("grid"), tray = $("tray");

    async function api(method, url, body){
      const r = await fetch(url, {
        method,
        headers: body ? { "content-type": "application/json" } : {},
        body: body ? JSON.stringify(body) : undefined,
      });
      if (!r.ok && r.status !== 409) throw new Error(await r.text());
      return r.status === 409 ? null : r.json();
    }

    async function loadOptions(){
      const o = await api("GET", "/api/modifiers/" + $("size").value);
      for (const [id, list] of [["prefixes", o.prefixes], ["suffixes", o.suffixes]]){
        const dl = $(id);
        dl.innerHTML = "";
        for (const m of list){ const op = document.createElement("option"); op.value = m; dl.appendChild(op); }
      }
    }

    function idolEl(idol){
      const [w, h] = idol.size.split("x").map(Number);
      const el = document.createElement("div");
      el.className = "idol";
      el.draggable = true;
      el.textContent = idol.size;
      el.title = idol.slots.filter(Boolean).join("\n");
      el.style.width = (w * CELL) + "px";
      el.style.height = (h * CELL) + "px";
      el.addEventListener("dragstart", (e) => e.dataTransfer.setData("text/plain", String(idol.id)));
      el.addEventListener("dblclick", async () => { await api("DELETE", "/api/idols/" + idol.id); refresh(); });
      return el;
    }

    async function refresh(){
      const b = await api("GET", "/api/board");
      grid.innerHTML = ""; tray.innerHTML = "";
      for (let r = 0; r < b.rows; r++){
        for (let c = 0; c < b.cols; c++){
          const cell = document.createElement("div");
          cell.className = "cell";
          if (b.blocked.some((x) => x.row === r && x.col === c)) cell.classList.add("blocked");
          grid.appendChild(cell);
        }
      }
      for (const idol of b.idols){
        const el = idolEl(idol);
        if (idol.position){
          el.style.left = (idol.position.col * CELL) + "px";
          el.style.top = (idol.position.row * CELL) + "px";
          grid.appendChild(el);
        } else {
          tray.appendChild(el);
        }
      }
      history.replaceState(null, "", b.fragment ? "#" + b.fragment : location.pathname);
      const u = await api("POST", "/api/ui/totals", {});
      for (const p of u.patches){ const t = $(p.target); if (t && p.html !== undefined) t.innerHTML = p.html; }
    }

    grid.addEventListener("dragover", (e) => e.preventDefault());
    grid.addEventListener("drop", async (e) => {
      e.preventDefault();
      const id = e.dataTransfer.getData("text/plain");
      const rect = grid.getBoundingClientRect();
      await api("POST", "/api/idols/" + id + "/drop", { x: e.clientX - rect.left, y: e.clientY - rect.top });
      refresh();
    });

    $("size").addEventListener("change", loadOptions);
    $("add").addEventListener("click", async () => {
      const v = (id) => $(id).value || null;
      await api("POST", "/api/idols", { size: $("size").value, prefix1: v("prefix1"), prefix2: v("prefix2"), suffix1: v("suffix1"), suffix2: v("suffix2") });
      refresh();
    });

    (async () => {
      if (location.hash.length > 1) await api("PUT", "/api/state", { fragment: location.hash });
      await loadOptions();
      await refresh();
    })();
  })();
  </script>
</body>
</html>
"###;
