//! Asset catalog and Asset Directory listing

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::models::{AssetRecord, AssetType, WalletAddress, ASSET_TYPES};
use crate::{ApiError, ApiResult, AppState};

/// GET /vaults/assets query
#[derive(Debug, Deserialize)]
pub struct AssetListQuery {
    pub owner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssetTypesResponse {
    pub asset_types: Vec<AssetType>,
}

#[derive(Debug, Serialize)]
pub struct AssetListResponse {
    pub assets: Vec<AssetRecord>,
}

/// GET /vaults/asset-types
pub async fn list_asset_types() -> Json<AssetTypesResponse> {
    Json(AssetTypesResponse {
        asset_types: ASSET_TYPES.to_vec(),
    })
}

/// GET /vaults/assets?owner=0x...
///
/// Owner addresses are normalized the same way wallet connections are.
pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<AssetListQuery>,
) -> ApiResult<Json<AssetListResponse>> {
    let owner = match query.owner.as_deref() {
        Some(raw) => Some(
            WalletAddress::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Invalid owner address: {}", raw)))?,
        ),
        None => None,
    };

    let assets = state
        .directory
        .list(owner.as_ref().map(WalletAddress::as_str))
        .await?;

    Ok(Json(AssetListResponse { assets }))
}

/// Build asset routes
pub fn asset_routes() -> Router<AppState> {
    Router::new()
        .route("/vaults/asset-types", get(list_asset_types))
        .route("/vaults/assets", get(list_assets))
}
