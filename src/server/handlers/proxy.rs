use crate::{
    error::{ApiError, Endpoint, ResultExt, apply_cors},
    hls::{Classification, PLAYLIST_CONTENT_TYPE, rewrite_playlist},
    metrics,
    server::{state::AppState, target::parse_target_url},
    upstream::UpstreamResponse,
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};
use url::Url;

/// Same-origin HLS proxy.
///
/// Fetches `?url=` upstream (forwarding only `Range`). Successful playlist
/// answers are read in full, rewritten so nested URIs come back through this
/// route, and always sent as a complete `200`. Anything else, error pages at a
/// playlist URL included, is streamed through with its status and the
/// allow-listed headers.
pub async fn proxy(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let start = Instant::now();

    let Some(raw_target) = params.get("url").filter(|url| !url.is_empty()) else {
        debug!("Proxy request without url parameter");
        metrics::record_request("proxy", 400);
        metrics::record_duration("proxy", start);
        return Ok((StatusCode::BAD_REQUEST, "Missing url query param").into_response());
    };

    let target = parse_target_url(raw_target).for_endpoint(Endpoint::Proxy, start)?;
    let range = headers.get(header::RANGE);
    info!("Proxying {} (range: {:?})", target, range);

    let mut upstream = fetch(&state, &target, range, start).await?;
    let classification = Classification::of(upstream.content_type(), raw_target);
    debug!("{} classified as {:?}", target, classification);

    if classification.is_playlist && upstream.status() == StatusCode::PARTIAL_CONTENT {
        // Rewriting needs the whole playlist, not the requested window
        debug!("Playlist {} answered a range, refetching in full", target);
        upstream = fetch(&state, &target, None, start).await?;
    }

    let status = upstream.status();

    let cache_control = HeaderValue::from_static(classification.cache_control());

    let mut response = if classification.is_playlist && status.is_success() {
        let body = upstream
            .into_text(state.config.max_playlist_bytes)
            .await
            .for_endpoint(Endpoint::Proxy, start)?;
        let rewritten = rewrite_playlist(&body, &target);
        metrics::record_playlist_rewrite();

        // The rewritten text is the whole playlist, whatever window was asked for
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static(PLAYLIST_CONTENT_TYPE))],
            rewritten,
        )
            .into_response()
    } else {
        let relayed = upstream.relayed_headers();
        let body = upstream.into_body(state.config.relay_buffer_chunks, &state.relays);

        (status, relayed, body).into_response()
    };

    let served = response.status();
    let response_headers = response.headers_mut();
    response_headers.insert(header::CACHE_CONTROL, cache_control);
    apply_cors(response_headers);

    metrics::record_request("proxy", served.as_u16());
    metrics::record_duration("proxy", start);

    Ok(response)
}

async fn fetch(
    state: &AppState,
    target: &Url,
    range: Option<&HeaderValue>,
    start: Instant,
) -> Result<UpstreamResponse, ApiError> {
    state.upstream.fetch(target, range).await.map_err(|e| {
        metrics::record_upstream_error();
        ApiError {
            endpoint: Endpoint::Proxy,
            source: e,
            started: start,
        }
    })
}
