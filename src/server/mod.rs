use axum::{
    routing::get,
    Router,
    extract::{Path, State},
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::kind::RecordKind;
use crate::storage::factory::SharedBackend;
use crate::ui::Icons;

pub mod routes;

/// Server state, shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub backend: SharedBackend,
    pub max_limit: usize,
}

impl AppState {
    pub fn new(backend: SharedBackend, max_limit: usize) -> Self {
        Self { backend, max_limit }
    }
}

/// Build the full route table.
///
/// Every kind gets a listing, a record, a sparse record and its link
/// listings: `linkedRelationships` for entities, `linkedObjects`,
/// `linkedEvents`, `linkedAgents` and `linkedRights` for relationships.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(routes::root))
        .route("/version", get(routes::version));

    for &kind in RecordKind::all() {
        let base = format!("/{}", kind.list_segment());

        app = app
            .route(
                &base,
                get(move |state: State<AppState>, query: routes::PageQuery| {
                    routes::list_records(state, kind, query)
                })
                .post(move |state: State<AppState>, body: routes::JsonBody<routes::CreateRecordRequest>| {
                    routes::create_record(state, kind, body)
                }),
            )
            .route(
                &format!("{}/{{id}}", base),
                get(move |state: State<AppState>, id: Path<String>| {
                    routes::get_record(state, kind, id)
                }),
            )
            .route(
                &format!("{}/{{id}}/sparse", base),
                get(move |state: State<AppState>, id: Path<String>| {
                    routes::get_sparse_record(state, kind, id)
                }),
            );

        for &target in kind.linkable_kinds() {
            let linked = format!("{}/{{id}}/linked{}", base, target.plural_title());
            app = app.route(
                &linked,
                get(
                    move |state: State<AppState>,
                          id: Path<String>,
                          query: routes::PageQuery| {
                        routes::list_linked(state, kind, target, id, query)
                    },
                )
                .post(
                    move |state: State<AppState>,
                          id: Path<String>,
                          body: routes::JsonBody<routes::LinkRequest>| {
                        routes::add_linked(state, kind, target, id, body)
                    },
                ),
            );
        }
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: &ServiceConfig, backend: SharedBackend) -> anyhow::Result<()> {
    let state = AppState::new(backend, config.pagination.max_limit);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Starting server on {}", addr);
    println!("{} Server running at http://{}", Icons::GLOBE, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
