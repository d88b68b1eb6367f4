//! Public reference data: mobile providers, bill providers, deposit locations.

use axum::{Json, extract::State};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        DataResponse,
        directory::{BillProvider, DepositLocation},
        mobile::MobileProvider,
    },
};

pub async fn list_mobile_providers(
    State(pool): State<DbPool>,
) -> Result<Json<DataResponse<Vec<MobileProvider>>>, AppError> {
    let providers = sqlx::query_as::<_, MobileProvider>(
        "SELECT id, code, name, prefixes, is_active FROM mobile_providers WHERE is_active = true ORDER BY name",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(DataResponse::ok(providers)))
}

pub async fn list_bill_providers(
    State(pool): State<DbPool>,
) -> Result<Json<DataResponse<Vec<BillProvider>>>, AppError> {
    let providers = sqlx::query_as::<_, BillProvider>(
        "SELECT id, code, name, category, is_active FROM bill_providers WHERE is_active = true ORDER BY category, name",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(DataResponse::ok(providers)))
}

pub async fn list_deposit_locations(
    State(pool): State<DbPool>,
) -> Result<Json<DataResponse<Vec<DepositLocation>>>, AppError> {
    let locations = sqlx::query_as::<_, DepositLocation>(
        "SELECT id, name, address, kind, is_active FROM deposit_locations WHERE is_active = true ORDER BY kind, name",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(DataResponse::ok(locations)))
}
