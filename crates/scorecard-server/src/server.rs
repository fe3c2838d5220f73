use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
        HeaderMap, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use scorecard_common::api::{self, HealthResponse};
use scorecard_common::filters::Filters;
use scorecard_common::model::Dataset;
use scorecard_common::sort::MemberSort;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::AppError;
use crate::lookup::find_lawmakers;
use crate::news;
use crate::share::{render_svg, ShareCard, ShareParams};
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, IF_NONE_MATCH])
        .expose_headers([ETAG])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health))
        .route("/api/members", get(members))
        .route("/api/members/{id}", get(member))
        .route("/api/bills", get(bills))
        .route("/api/bills/{column}", get(bill))
        .route("/api/categories", get(categories))
        .route("/api/aipac", get(aipac))
        .route("/api/find-lawmakers", get(lawmakers))
        .route("/api/news", get(articles))
        .route("/api/og/member/{id}", get(share_image))
        .layer(cors)
        .with_state(state)
}

/// JSON body tagged with the dataset fingerprint; a matching `If-None-Match` yields 304.
fn versioned<T: Serialize>(headers: &HeaderMap, dataset: &Dataset, body: T) -> Response {
    let tag = format!("\"{}\"", dataset.fingerprint);
    let fresh = headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').map(str::trim).any(|t| t == tag || t == "*"));
    if fresh {
        return (StatusCode::NOT_MODIFIED, [(ETAG, tag)]).into_response();
    }
    ([(ETAG, tag)], Json(body)).into_response()
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cached = state.store.cached();
    Json(HealthResponse {
        status: if cached.is_some() { "ok" } else { "starting" }.to_string(),
        dataset_version: cached.as_ref().map(|d| d.fingerprint.clone()),
        members: cached.as_ref().map(|d| d.members.len()),
    })
}

async fn members(
    State(state): State<SharedState>,
    Query(filters): Query<Filters>,
    Query(sort): Query<MemberSort>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let ds = state.dataset().await?;
    Ok(versioned(&headers, &ds, api::member_list(&ds, &filters, &sort)))
}

#[derive(Debug, Default, Deserialize)]
struct MemberQuery {
    category: Option<String>,
}

async fn member(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<MemberQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let ds = state.dataset().await?;
    let member = ds
        .member(id.trim())
        .ok_or_else(|| AppError::NotFound(format!("member {id} not found")))?;
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    Ok(versioned(&headers, &ds, api::member_detail(&ds, member, category)))
}

async fn bills(
    State(state): State<SharedState>,
    Query(filters): Query<Filters>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let ds = state.dataset().await?;
    Ok(versioned(&headers, &ds, api::bill_list(&ds, &filters)))
}

async fn bill(
    State(state): State<SharedState>,
    Path(column): Path<String>,
    Query(filters): Query<Filters>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let ds = state.dataset().await?;
    let detail = api::bill_detail(&ds, column.trim(), &filters)
        .ok_or_else(|| AppError::NotFound(format!("bill {column} not found")))?;
    Ok(versioned(&headers, &ds, detail))
}

async fn categories(State(state): State<SharedState>, headers: HeaderMap) -> Result<Response, AppError> {
    let ds = state.dataset().await?;
    Ok(versioned(&headers, &ds, api::category_list(&ds)))
}

async fn aipac(
    State(state): State<SharedState>,
    Query(filters): Query<Filters>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let ds = state.dataset().await?;
    Ok(versioned(&headers, &ds, api::lobby_view(&ds, &filters)))
}

#[derive(Debug, Default, Deserialize)]
struct LookupQuery {
    address: Option<String>,
}

async fn lawmakers(
    State(state): State<SharedState>,
    Query(query): Query<LookupQuery>,
) -> Result<Response, AppError> {
    let address = query.address.unwrap_or_default();
    if address.trim().is_empty() {
        return Err(AppError::BadRequest("Address is required".to_string()));
    }
    state.gate().await?;
    let found = find_lawmakers(&state.upstream, &address).await?;
    info!(
        state = %found.district.state,
        district = %found.district.number,
        lawmakers = found.lawmakers.len(),
        "lawmakers found"
    );
    Ok(Json(found).into_response())
}

#[derive(Debug, Default, Deserialize)]
struct NewsQuery {
    id: Option<String>,
}

async fn articles(
    State(state): State<SharedState>,
    Query(query): Query<NewsQuery>,
) -> Result<Response, AppError> {
    let articles = state.news.articles(&state.upstream).await?;
    Ok(Json(news::select(&articles, query.id.as_deref())?).into_response())
}

async fn share_image(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(params): Query<ShareParams>,
) -> Result<Response, AppError> {
    // The card can be drawn from query parameters alone when the dataset is down.
    let ds = state.dataset().await.ok();
    let member = ds.as_deref().and_then(|d| d.member(id.trim()));
    if member.is_none() && params.name.is_none() {
        return Err(AppError::NotFound(format!("member {id} not found")));
    }
    let card = ShareCard::resolve(params, member, ds.as_deref());
    Ok((
        [
            (CONTENT_TYPE, "image/svg+xml"),
            (CACHE_CONTROL, "public, max-age=3600"),
        ],
        render_svg(&card),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use std::path::Path as FsPath;

    use axum::body::to_bytes;
    use axum::http::HeaderValue;
    use scorecard_common::loader::{AnySource, DataStore, FsSource, META_FILE, SCORES_FILE};
    use scorecard_common::upstream::{UpstreamClient, UpstreamConfig};
    use serde_json::Value;
    use tempfile::TempDir;

    use super::*;
    use crate::state::AppState;

    const META: &str = "\
column,display_name,bill_number,chamber,position_to_score,action_types,points,categories
HR1,Iran War Powers,H.Con.Res.38,HOUSE,SUPPORT,cosponsor,4,Iran
S1,Block the Bombs,S.J.Res.41,SENATE,SUPPORT,vote,4,Israel/Gaza
";

    const SCORES: &str = "\
bioguide_id,full_name,party,chamber,state,district,Total,Max_Possible,Grade,HR1,HR1_cosponsor,S1
A000001,Ann Alpha,Democratic,HOUSE,California,12,4,4,A,4,1,
B000002,Bob Beta,Republican,HOUSE,OH,3,0,4,F,0,0,
C000003,Cat Gamma,Democrat,SENATE,Ohio,,4,4,A,,,4
";

    fn state_for(dir: &FsPath) -> SharedState {
        AppState::new(
            DataStore::new(AnySource::Fs(FsSource::new(dir))),
            UpstreamClient::new(UpstreamConfig::default()).unwrap(),
            None,
        )
    }

    fn fixture() -> (TempDir, SharedState) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(META_FILE), META).unwrap();
        std::fs::write(dir.path().join(SCORES_FILE), SCORES).unwrap();
        let state = state_for(dir.path());
        (dir, state)
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_load_state() {
        let (_dir, state) = fixture();
        assert_eq!(health(State(state.clone())).await.0.status, "starting");

        state.dataset().await.unwrap();
        let Json(resp) = health(State(state)).await;
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.members, Some(3));
        assert!(resp.dataset_version.is_some());
    }

    #[tokio::test]
    async fn member_list_is_filtered_and_tagged() {
        let (_dir, state) = fixture();
        let filters = Filters {
            state: Some("oh".to_string()),
            ..Default::default()
        };
        let resp = members(
            State(state),
            Query(filters),
            Query(MemberSort::default()),
            HeaderMap::new(),
        )
        .await
        .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(ETAG));

        let body = json_body(resp).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["members"][0]["full_name"], "Bob Beta");
    }

    #[tokio::test]
    async fn member_list_follows_sort_query() {
        let (_dir, state) = fixture();
        let uri: axum::http::Uri = "/api/members?state=oh&sort=district&dir=asc".parse().unwrap();
        let Query(filters) = Query::<Filters>::try_from_uri(&uri).unwrap();
        let Query(sort) = Query::<MemberSort>::try_from_uri(&uri).unwrap();

        let resp = members(State(state), Query(filters), Query(sort), HeaderMap::new())
            .await
            .unwrap();
        let body = json_body(resp).await;
        let names: Vec<&str> = body["members"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["full_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Cat Gamma", "Bob Beta"]);
    }

    #[tokio::test]
    async fn matching_etag_is_not_modified() {
        let (_dir, state) = fixture();
        let first = categories(State(state.clone()), HeaderMap::new()).await.unwrap();
        let tag = first.headers()[ETAG].clone();

        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, tag);
        let second = categories(State(state.clone()), headers).await.unwrap();
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);

        let mut stale = HeaderMap::new();
        stale.insert(IF_NONE_MATCH, HeaderValue::from_static("\"old\""));
        let third = categories(State(state), stale).await.unwrap();
        assert_eq!(third.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn member_detail_and_missing_member() {
        let (_dir, state) = fixture();
        let resp = member(
            State(state.clone()),
            Path("A000001".to_string()),
            Query(MemberQuery::default()),
            HeaderMap::new(),
        )
        .await
        .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["location"], "CA-12");
        assert_eq!(body["record"].as_array().map(Vec::len), Some(1));

        let err = member(
            State(state),
            Path("Z999999".to_string()),
            Query(MemberQuery::default()),
            HeaderMap::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bill_detail_groups_members() {
        let (_dir, state) = fixture();
        let resp = bill(
            State(state.clone()),
            Path("HR1".to_string()),
            Query(Filters::default()),
            HeaderMap::new(),
        )
        .await
        .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["bill"]["label"], "Iran War Powers");
        assert_eq!(body["grouping"]["sections"][0]["label"], "Cosponsors");
        assert_eq!(body["map"]["districts"]["CA-12"]["tone"], "favorable");

        let err = bill(
            State(state),
            Path("HR404".to_string()),
            Query(Filters::default()),
            HeaderMap::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_data_is_unavailable_then_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_for(dir.path());
        let err = bills(State(state.clone()), Query(Filters::default()), HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        std::fs::write(dir.path().join(META_FILE), META).unwrap();
        std::fs::write(dir.path().join(SCORES_FILE), SCORES).unwrap();
        let resp = bills(State(state), Query(Filters::default()), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["count"], 2);
    }

    #[tokio::test]
    async fn bills_filter_by_action_type() {
        let (_dir, state) = fixture();
        let uri: axum::http::Uri = "/api/bills?action_type=vote".parse().unwrap();
        let Query(filters) = Query::<Filters>::try_from_uri(&uri).unwrap();
        let resp = bills(State(state), Query(filters), HeaderMap::new()).await.unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["bills"][0]["column"], "S1");

        let bad: axum::http::Uri = "/api/bills?action_type=amend".parse().unwrap();
        assert!(Query::<Filters>::try_from_uri(&bad).is_err());
    }

    #[tokio::test]
    async fn blank_address_is_a_bad_request() {
        let (_dir, state) = fixture();
        let err = lawmakers(State(state), Query(LookupQuery { address: None }))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn share_image_is_svg() {
        let (_dir, state) = fixture();
        let resp = share_image(
            State(state.clone()),
            Path("C000003".to_string()),
            Query(ShareParams::default()),
        )
        .await
        .unwrap();
        assert_eq!(resp.headers()[CONTENT_TYPE], "image/svg+xml");
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let svg = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(svg.contains("Cat Gamma"));
        assert!(svg.contains("SENATE"));

        let err = share_image(
            State(state),
            Path("nobody".to_string()),
            Query(ShareParams::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
