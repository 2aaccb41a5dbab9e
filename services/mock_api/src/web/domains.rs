//! services/mock_api/src/web/domains.rs
//!
//! `/rest/v1/resource_session_domains`: query and bulk insert.

use crate::web::postgrest::{collection, wants_exact_count, Filters};
use crate::web::protocol::{DomainRecord, NewDomainRecord, OneOrMany};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Query domains by session or by repository.
#[utoipa::path(
    get,
    path = "/rest/v1/resource_session_domains",
    params(
        ("resource_session_id" = Option<String>, Query, description = "`eq.<session id>`"),
        ("resource_repository_id" = Option<String>, Query, description = "`eq.<repository id>`"),
        ("Prefer" = Option<String>, Header, description = "`count=exact` answers an empty body and a Content-Range count"),
    ),
    responses(
        (status = 200, description = "Matching domains", body = Vec<DomainRecord>)
    )
)]
pub async fn list_domains_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let filters = Filters::from(params);
    let domains = if let Some(session_id) = filters.eq("resource_session_id") {
        app_state.store.get_domains_by_session_id(session_id).await
    } else if let Some(repository_id) = filters.eq("resource_repository_id") {
        app_state.store.get_domains_by_repository_id(repository_id).await
    } else {
        Vec::new()
    };
    debug!(rows = domains.len(), "Domain query");

    let rows: Vec<DomainRecord> = domains.into_iter().map(DomainRecord::from).collect();
    collection(rows, wants_exact_count(&headers))
}

/// Insert one domain or an array of domains. Domains whose session does not
/// exist are dropped.
#[utoipa::path(
    post,
    path = "/rest/v1/resource_session_domains",
    request_body(content = Vec<NewDomainRecord>, description = "One domain object or an array of them"),
    responses(
        (status = 201, description = "The created domains", body = Vec<DomainRecord>)
    )
)]
pub async fn create_domains_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<OneOrMany<NewDomainRecord>>,
) -> impl IntoResponse {
    let now = Utc::now();
    let domains = body
        .into_vec()
        .into_iter()
        .map(|record| record.into_domain(now))
        .collect();
    let stored = app_state.store.add_domains(domains).await;
    info!(count = stored.len(), "Domains inserted");

    let rows: Vec<DomainRecord> = stored.into_iter().map(DomainRecord::from).collect();
    (StatusCode::CREATED, Json(rows))
}
