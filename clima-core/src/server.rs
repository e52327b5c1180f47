//! HTTP surface of the three services.
//!
//! - [`clima_router`]: `GET /clima`, used by the monolithic service
//!   ([`ReportShape::Compact`]) and by the back service ([`ReportShape::WithCity`]).
//! - [`relay_router`]: `POST /consulta`, the front service.
//!
//! Both routers continue any trace context found on inbound requests.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{MatchedPath, Query, Request, State, rejection::QueryRejection},
    http::header::CONTENT_TYPE,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{Instrument, field, info_span};

use crate::{
    error::{ClimaError, RelayError},
    model::{CityReportBody, CompactReportBody, PostalCode, ReportShape},
    pipeline::ClimatePipeline,
    propagation::set_parent_from_headers,
    relay::RelayClient,
};

#[derive(Debug, Clone)]
struct ClimaState {
    pipeline: Arc<ClimatePipeline>,
    shape: ReportShape,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConsultaRequest {
    cep: String,
}

/// Build the `/clima` router around a pipeline.
pub fn clima_router(pipeline: ClimatePipeline, shape: ReportShape) -> Router {
    let state = ClimaState {
        pipeline: Arc::new(pipeline),
        shape,
    };

    Router::new()
        .route("/clima", get(clima))
        .route_layer(middleware::from_fn(trace_requests))
        .with_state(state)
}

/// Build the front service's `/consulta` router.
pub fn relay_router(relay: RelayClient) -> Router {
    Router::new()
        .route("/consulta", post(consulta))
        .route_layer(middleware::from_fn(trace_requests))
        .with_state(relay)
}

async fn clima(
    State(state): State<ClimaState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ClimaError> {
    let Query(params) = query.map_err(|_| ClimaError::InvalidInput)?;
    let cep = first_value(&params, "cep");
    let api_key = first_value(&params, "apiKey");

    let report = state.pipeline.run(cep, api_key).await?;

    let response = match state.shape {
        ReportShape::Compact => Json(CompactReportBody::from(&report)).into_response(),
        ReportShape::WithCity => Json(CityReportBody::from(&report)).into_response(),
    };
    Ok(response)
}

/// First value of a repeated query parameter; absent reads as empty.
fn first_value<'a>(params: &'a [(String, String)], name: &str) -> &'a str {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map_or("", |(_, value)| value.as_str())
}

async fn consulta(State(relay): State<RelayClient>, body: Bytes) -> Result<Response, RelayError> {
    // `null` decodes like an empty object.
    let request = serde_json::from_slice::<Option<ConsultaRequest>>(&body)
        .map_err(|_| RelayError::InvalidRequest)?
        .unwrap_or_default();
    let postal_code = PostalCode::parse(&request.cep)?;

    let relayed = relay.forward(&postal_code).await?;

    let mut response = (relayed.status, relayed.body).into_response();
    match relayed.content_type {
        Some(content_type) => {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        None => {
            response.headers_mut().remove(CONTENT_TYPE);
        }
    }
    Ok(response)
}

/// Opens the per-request span, parented on the caller's trace context when
/// one was propagated.
async fn trace_requests(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path().to_owned(), |path| path.as_str().to_owned());
    let otel_name = format!("{} {}", req.method(), route);
    let span = info_span!(
        "http_request",
        otel.name = %otel_name,
        http.method = %req.method(),
        http.route = %route,
        url.path = req.uri().path(),
        http.status_code = field::Empty,
        otel.status_code = field::Empty,
    );
    set_parent_from_headers(&span, req.headers());

    let response = next.run(req).instrument(span.clone()).await;

    let status = response.status();
    span.record("http.status_code", status.as_u16());
    if status.is_server_error() {
        span.record("otel.status_code", "ERROR");
    }
    response
}
