use std::collections::HashMap;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value, json};
use tokio::time::{Duration, sleep};

use crate::cache::{KEY_PAKET_LIST, KEY_STATS, TTL_PAKET_LIST_SECS, TTL_STATS_SECS};
use crate::store::{Store, StoreError};
use crate::{AppState, CacheMode};

const X_CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");
const X_CACHE_KEY: HeaderName = HeaderName::from_static("x-cache-key");
const X_CACHE_TTL: HeaderName = HeaderName::from_static("x-cache-ttl");

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn failure(status: StatusCode, error: &str) -> Response {
    reply(status, json!({ "success": false, "error": error }))
}

fn store_failure(err: StoreError) -> Response {
    match err {
        StoreError::NotFound => failure(StatusCode::NOT_FOUND, "not found"),
        StoreError::Conflict => failure(StatusCode::CONFLICT, "already exists"),
        StoreError::Unauthorized => failure(StatusCode::UNAUTHORIZED, "invalid credentials"),
    }
}

fn json_object(body: &Bytes) -> Result<Map<String, Value>, Response> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(failure(StatusCode::BAD_REQUEST, "invalid json body")),
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn bearer_user(state: &AppState, headers: &HeaderMap) -> Result<u64, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    state
        .store()
        .user_for_token(token)
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "invalid or expired token"))
}

/// Serves `build` through the response cache, emitting the `X-Cache-*` headers.
async fn serve_cached(
    state: &AppState,
    key: String,
    ttl_secs: u64,
    build: impl FnOnce(&Store) -> Value,
) -> Response {
    let opts = state.options().clone();
    let n = state.stats().next_cached_request();
    if opts.stall_request == Some(n) {
        sleep(opts.stall_for).await;
    }

    if opts.cache_mode == CacheMode::Enabled {
        let hit = state.cache().get(&key, Instant::now());
        if let Some(hit) = hit {
            state.stats().inc_cache_hits();
            let ttl = hit.remaining.as_secs().to_string();
            return (
                StatusCode::OK,
                [(X_CACHE_STATUS, "HIT".to_string()), (X_CACHE_KEY, key), (X_CACHE_TTL, ttl)],
                Json(hit.body),
            )
                .into_response();
        }
    }

    sleep(opts.miss_delay).await;
    let body = {
        let store = state.store();
        build(&store)
    };
    state.stats().inc_cache_misses();

    match opts.cache_mode {
        CacheMode::Enabled => {
            state.cache().set(
                key.clone(),
                body.clone(),
                Duration::from_secs(ttl_secs),
                Instant::now(),
            );
            (
                StatusCode::OK,
                [
                    (X_CACHE_STATUS, "MISS".to_string()),
                    (X_CACHE_KEY, key),
                    (X_CACHE_TTL, ttl_secs.to_string()),
                ],
                Json(body),
            )
                .into_response()
        }
        CacheMode::Disabled => (
            StatusCode::OK,
            [
                (X_CACHE_STATUS, "MISS".to_string()),
                (X_CACHE_KEY, key),
                (X_CACHE_TTL, "0".to_string()),
            ],
            Json(body),
        )
            .into_response(),
        CacheMode::NoHeaders => reply(StatusCode::OK, body),
    }
}

fn invalidate_paket_cache(state: &AppState) {
    let removed = state.cache().delete_pattern(KEY_PAKET_LIST);
    state.cache().delete_pattern(KEY_STATS);
    tracing::debug!(removed, "invalidated paket list cache");
}

pub(crate) async fn handle_health(State(state): State<AppState>) -> Response {
    state.stats().inc_requests_total();
    let status =
        StatusCode::from_u16(state.options().health_status).unwrap_or(StatusCode::OK);
    let healthy = status == StatusCode::OK;
    let (message, database) = if healthy {
        ("API is healthy", "connected")
    } else {
        ("Health check failed", "disconnected")
    };
    reply(
        status,
        json!({ "success": healthy, "message": message, "database": database }),
    )
}

pub(crate) async fn handle_docs(State(state): State<AppState>) -> Response {
    state.stats().inc_requests_total();
    reply(
        StatusCode::OK,
        json!({
            "success": true,
            "endpoints": [
                "GET /health",
                "POST /api/auth/register",
                "POST /api/auth/login",
                "GET/PUT /api/users/profile",
                "PUT /api/users/change-password",
                "DELETE /api/users/account",
                "GET/POST /api/paket",
                "GET/PUT/DELETE /api/paket/:id",
                "GET/POST/DELETE /api/favorites",
                "DELETE /api/favorites/:md5_hash",
                "GET /api/favorites/check/:md5_hash",
                "GET /api/favorites/stats",
            ],
        }),
    )
}

pub(crate) async fn handle_stats(State(state): State<AppState>) -> Response {
    state.stats().inc_requests_total();
    serve_cached(&state, KEY_STATS.to_string(), TTL_STATS_SECS, |store| {
        let (total, this_month) = store.paket_counts();
        json!({
            "totalTender": total,
            "thisMonthCount": this_month,
            "lastMonthCount": 0,
            "percentageChange": 0,
        })
    })
    .await
}

pub(crate) async fn handle_paket_list(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.stats().inc_requests_total();

    let q = query.get("q").cloned().unwrap_or_default();
    let page = query
        .get("page")
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(1);
    let limit = query
        .get("limit")
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(10);

    let key = format!("{KEY_PAKET_LIST}:{q}:{page}:{limit}");
    serve_cached(&state, key, TTL_PAKET_LIST_SECS, move |store| {
        let (rows, total) = store.list_paket(&q, page, limit);
        json!({
            "success": true,
            "data": rows,
            "pagination": {
                "total": total,
                "page": page,
                "limit": limit,
                "totalPages": total.div_ceil(limit),
            },
        })
    })
    .await
}

pub(crate) async fn handle_paket_create(State(state): State<AppState>, body: Bytes) -> Response {
    state.stats().inc_requests_total();
    let row = match json_object(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };
    if str_field(&row, "nama_paket").is_none() || str_field(&row, "kode_paket").is_none() {
        return failure(StatusCode::BAD_REQUEST, "nama_paket and kode_paket are required");
    }

    let created = state.store().insert_paket(row);
    invalidate_paket_cache(&state);
    reply(
        StatusCode::CREATED,
        json!({ "success": true, "data": created, "message": "Created successfully" }),
    )
}

pub(crate) async fn handle_paket_get(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Response {
    state.stats().inc_requests_total();
    let row = state.store().paket(id).cloned();
    match row {
        Some(row) => reply(StatusCode::OK, json!({ "success": true, "data": row })),
        None => store_failure(StoreError::NotFound),
    }
}

pub(crate) async fn handle_paket_update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Bytes,
) -> Response {
    state.stats().inc_requests_total();
    let patch = match json_object(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let updated = state.store().update_paket(id, patch);
    match updated {
        Ok(row) => {
            invalidate_paket_cache(&state);
            reply(
                StatusCode::OK,
                json!({ "success": true, "data": row, "message": "Updated successfully" }),
            )
        }
        Err(err) => store_failure(err),
    }
}

pub(crate) async fn handle_paket_delete(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Response {
    state.stats().inc_requests_total();
    let deleted = state.store().delete_paket(id);
    match deleted {
        Ok(()) => {
            invalidate_paket_cache(&state);
            reply(
                StatusCode::OK,
                json!({ "success": true, "message": "Deleted successfully" }),
            )
        }
        Err(err) => store_failure(err),
    }
}

pub(crate) async fn handle_register(State(state): State<AppState>, body: Bytes) -> Response {
    state.stats().inc_requests_total();
    let req = match json_object(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let (Some(username), Some(email), Some(password)) = (
        str_field(&req, "username"),
        str_field(&req, "email"),
        str_field(&req, "password"),
    ) else {
        return failure(
            StatusCode::BAD_REQUEST,
            "username, email and password are required",
        );
    };
    let full_name = str_field(&req, "full_name").unwrap_or_default();

    let registered = state
        .store()
        .register(username, email, password, full_name);
    match registered {
        Ok((user, token)) => reply(
            StatusCode::CREATED,
            json!({ "success": true, "token": token, "data": user }),
        ),
        Err(err) => store_failure(err),
    }
}

pub(crate) async fn handle_login(State(state): State<AppState>, body: Bytes) -> Response {
    state.stats().inc_requests_total();
    let req = match json_object(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let (Some(email), Some(password)) = (str_field(&req, "email"), str_field(&req, "password"))
    else {
        return failure(StatusCode::BAD_REQUEST, "email and password are required");
    };

    let logged_in = state.store().login(email, password);
    match logged_in {
        Ok((user, token)) => reply(
            StatusCode::OK,
            json!({ "success": true, "token": token, "data": user }),
        ),
        Err(err) => store_failure(err),
    }
}

pub(crate) async fn handle_profile_get(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    state.stats().inc_requests_total();
    let user_id = match bearer_user(&state, &headers) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let user = state.store().user(user_id).cloned();
    match user {
        Some(user) => reply(StatusCode::OK, json!({ "success": true, "data": user })),
        None => store_failure(StoreError::NotFound),
    }
}

pub(crate) async fn handle_profile_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.stats().inc_requests_total();
    let user_id = match bearer_user(&state, &headers) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let req = match json_object(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let updated = state.store().update_profile(
        user_id,
        str_field(&req, "username"),
        str_field(&req, "full_name"),
    );
    match updated {
        Ok(user) => reply(StatusCode::OK, json!({ "success": true, "data": user })),
        Err(err) => store_failure(err),
    }
}

pub(crate) async fn handle_change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.stats().inc_requests_total();
    let user_id = match bearer_user(&state, &headers) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let req = match json_object(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let (Some(current), Some(new)) = (
        str_field(&req, "currentPassword"),
        str_field(&req, "newPassword"),
    ) else {
        return failure(
            StatusCode::BAD_REQUEST,
            "currentPassword and newPassword are required",
        );
    };

    let changed = state.store().change_password(user_id, current, new);
    match changed {
        Ok(()) => reply(
            StatusCode::OK,
            json!({ "success": true, "message": "Password changed successfully" }),
        ),
        Err(err) => store_failure(err),
    }
}

pub(crate) async fn handle_delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    state.stats().inc_requests_total();
    let user_id = match bearer_user(&state, &headers) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let deleted = state.store().delete_user(user_id);
    match deleted {
        Ok(()) => reply(
            StatusCode::OK,
            json!({ "success": true, "message": "Account deleted successfully" }),
        ),
        Err(err) => store_failure(err),
    }
}

pub(crate) async fn handle_favorites_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    state.stats().inc_requests_total();
    let user_id = match bearer_user(&state, &headers) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let favorites = state.store().favorites(user_id).to_vec();
    reply(
        StatusCode::OK,
        json!({ "success": true, "count": favorites.len(), "data": favorites }),
    )
}

pub(crate) async fn handle_favorites_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.stats().inc_requests_total();
    let user_id = match bearer_user(&state, &headers) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let req = match json_object(&body) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Some(md5_hash) = str_field(&req, "md5_hash") else {
        return failure(StatusCode::BAD_REQUEST, "md5_hash is required");
    };
    let notes = str_field(&req, "notes").map(str::to_string);

    let added = state.store().add_favorite(user_id, md5_hash, notes);
    match added {
        Ok(fav) => reply(
            StatusCode::CREATED,
            json!({ "success": true, "data": fav, "message": "Added to favorites" }),
        ),
        Err(err) => store_failure(err),
    }
}

pub(crate) async fn handle_favorites_clear(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    state.stats().inc_requests_total();
    let user_id = match bearer_user(&state, &headers) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let removed = state.store().clear_favorites(user_id);
    reply(
        StatusCode::OK,
        json!({ "success": true, "message": format!("Removed {removed} favorites") }),
    )
}

pub(crate) async fn handle_favorites_remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(md5_hash): Path<String>,
) -> Response {
    state.stats().inc_requests_total();
    let user_id = match bearer_user(&state, &headers) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let removed = state.store().remove_favorite(user_id, &md5_hash);
    match removed {
        Ok(()) => reply(
            StatusCode::OK,
            json!({ "success": true, "message": "Removed from favorites" }),
        ),
        Err(err) => store_failure(err),
    }
}

pub(crate) async fn handle_favorites_check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(md5_hash): Path<String>,
) -> Response {
    state.stats().inc_requests_total();
    let user_id = match bearer_user(&state, &headers) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let is_favorite = state
        .store()
        .favorites(user_id)
        .iter()
        .any(|f| f.md5_hash == md5_hash);
    reply(
        StatusCode::OK,
        json!({ "success": true, "data": { "md5_hash": md5_hash, "is_favorite": is_favorite } }),
    )
}

pub(crate) async fn handle_favorites_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    state.stats().inc_requests_total();
    let user_id = match bearer_user(&state, &headers) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let total = state.store().favorites(user_id).len();
    reply(
        StatusCode::OK,
        json!({
            "success": true,
            "data": { "total_favorites": total, "recent_favorites": total },
        }),
    )
}
