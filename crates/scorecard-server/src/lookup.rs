/// Address → congressional district → current lawmakers, via three public services.
use std::sync::LazyLock;

use regex::Regex;
use scorecard_common::error::CommonError;
use scorecard_common::model::Chamber;
use scorecard_common::normalize::state_code_from_fips;
use scorecard_common::upstream::UpstreamClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AppError;

/// TIGERweb layer for the 119th Congress districts.
const DISTRICT_LAYER: &str = "tigerWMS_Current/MapServer/54/query";

static ZIP_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lawmaker {
    pub name: String,
    pub office: String,
    pub chamber: Chamber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictInfo {
    pub state: String,
    pub number: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub lawmakers: Vec<Lawmaker>,
    pub district: DistrictInfo,
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
}

#[derive(Debug, Default, Deserialize)]
struct DistrictQuery {
    #[serde(default)]
    features: Vec<DistrictFeature>,
}

#[derive(Debug, Deserialize)]
struct DistrictFeature {
    attributes: DistrictAttributes,
}

#[derive(Debug, Deserialize)]
struct DistrictAttributes {
    #[serde(rename = "STATE")]
    state: Option<String>,
    #[serde(rename = "CD119")]
    district: Option<String>,
    #[serde(rename = "NAME")]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Officials {
    #[serde(default)]
    results: Vec<Official>,
}

#[derive(Debug, Deserialize)]
struct Official {
    #[serde(default)]
    name: String,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    state: String,
}

/// "Jane Q Public" → "Public, Jane Q"; single-word names pass through.
pub fn last_name_first(name: &str) -> String {
    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{last}, {}", rest.join(" ")),
        _ => name.trim().to_string(),
    }
}

fn district_int(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok()).unwrap_or(0)
}

fn collect_lawmakers(reps: Officials, senators: Officials, district: &str) -> Vec<Lawmaker> {
    let target = district_int(Some(district));
    let house = reps
        .results
        .into_iter()
        .filter(|o| district_int(o.district.as_deref()) == target)
        .filter(|o| !o.name.trim().is_empty())
        .map(|o| Lawmaker {
            name: last_name_first(&o.name),
            office: format!(
                "U.S. Representative - District {}",
                o.district.as_deref().unwrap_or_default().trim()
            ),
            chamber: Chamber::House,
        });
    let senate = senators
        .results
        .into_iter()
        .filter(|o| !o.name.trim().is_empty())
        .map(|o| Lawmaker {
            name: last_name_first(&o.name),
            office: format!("U.S. Senator from {}", o.state.trim()),
            chamber: Chamber::Senate,
        });
    house.chain(senate).collect()
}

/// The geocoded point as `lon,lat`, or `None` when the geocoder found nothing usable.
async fn geocode(client: &UpstreamClient, address: &str) -> Result<Option<String>, AppError> {
    let url = format!("{}/search", client.config().geocoder_base_url);
    let hits: Vec<GeocodeHit> = client
        .get_json(
            &url,
            &[
                ("q", address),
                ("format", "json"),
                ("countrycodes", "us"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ],
        )
        .await?;
    Ok(hits
        .into_iter()
        .next()
        .filter(|h| !h.lat.trim().is_empty() && !h.lon.trim().is_empty())
        .map(|h| format!("{},{}", h.lon.trim(), h.lat.trim())))
}

async fn locate_district(client: &UpstreamClient, point: &str) -> Result<DistrictInfo, AppError> {
    let url = format!("{}/{DISTRICT_LAYER}", client.config().district_base_url);
    let query: DistrictQuery = client
        .get_json(
            &url,
            &[
                ("geometry", point),
                ("geometryType", "esriGeometryPoint"),
                ("inSR", "4326"),
                ("spatialRel", "esriSpatialRelWithin"),
                ("returnGeometry", "false"),
                ("f", "json"),
                ("outFields", "STATE,CD119,NAME,GEOID"),
            ],
        )
        .await?;

    let Some(feature) = query.features.into_iter().next() else {
        return Err(AppError::NotFound(
            "No congressional district found for this location. This may be a territory or non-voting district."
                .to_string(),
        ));
    };
    let attrs = feature.attributes;
    let (Some(fips), Some(number)) = (attrs.state, attrs.district) else {
        return Err(AppError::NotFound(
            "Unable to determine district information".to_string(),
        ));
    };
    let state = state_code_from_fips(fips.trim())
        .ok_or_else(|| AppError::NotFound(format!("Unknown state FIPS code: {fips}")))?;
    Ok(DistrictInfo {
        state: state.to_string(),
        number,
        name: attrs.name,
    })
}

async fn officials(client: &UpstreamClient, endpoint: &str, state: &str) -> Result<Officials, CommonError> {
    let url = format!("{}/{endpoint}", client.config().reps_base_url);
    client
        .get_json(&url, &[("state", state), ("output", "json")])
        .await
}

/// Resolve `address` (street address or ZIP) to its House member and senators.
///
/// The caller is responsible for rate limiting; this makes exactly one geocoder request.
pub async fn find_lawmakers(client: &UpstreamClient, address: &str) -> Result<LookupResponse, AppError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AppError::BadRequest("Address is required".to_string()));
    }
    let is_zip = ZIP_CODE.is_match(address);

    let point = geocode(client, address).await?.ok_or_else(|| {
        AppError::NotFound(if is_zip { "ZIP code not found" } else { "Address not found" }.to_string())
    })?;
    debug!(%point, "address geocoded");

    let district = locate_district(client, &point).await?;
    info!(state = %district.state, district = %district.number, "district resolved");

    let (reps, senators) = tokio::join!(
        officials(client, "getall_reps_bystate.php", &district.state),
        officials(client, "getall_sens_bystate.php", &district.state),
    );
    let reps = reps?;
    let senators = senators.unwrap_or_else(|e| {
        warn!(error = %e, state = %district.state, "senator lookup failed, continuing with House only");
        Officials::default()
    });

    let lawmakers = collect_lawmakers(reps, senators, &district.number);
    if lawmakers.is_empty() {
        return Err(AppError::NotFound(format!(
            "No lawmakers found for {} district {}",
            district.state, district.number
        )));
    }
    Ok(LookupResponse { lawmakers, district })
}
