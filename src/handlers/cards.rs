//! Card handlers.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    extract::{AppJson, AppPath},
    middleware::auth::AuthContext,
    models::{
        DataResponse,
        card::{CardResponse, CardSettingsRequest, IssueCardRequest, IssuedCardResponse},
    },
    services::card_service,
};

/// Issue a card. The full number and CVV are only returned here.
pub async fn issue_card(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<IssueCardRequest>,
) -> Result<(StatusCode, Json<IssuedCardResponse>), AppError> {
    let card = card_service::issue_card(&pool, auth.user_id, request.account_id).await?;
    let card_number = card.card_number.clone();
    let cvv = card.cvv.clone();

    Ok((
        StatusCode::CREATED,
        Json(IssuedCardResponse {
            success: true,
            card: card.into(),
            card_number,
            cvv,
        }),
    ))
}

pub async fn list_cards(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<DataResponse<Vec<CardResponse>>>, AppError> {
    let cards = card_service::list_cards(&pool, auth.user_id).await?;

    Ok(Json(DataResponse::ok(
        cards.into_iter().map(Into::into).collect(),
    )))
}

pub async fn lock_card(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(card_id): AppPath<Uuid>,
) -> Result<Json<DataResponse<CardResponse>>, AppError> {
    let card = card_service::set_card_locked(&pool, auth.user_id, card_id, true).await?;

    Ok(Json(DataResponse::ok(card.into())))
}

pub async fn unlock_card(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(card_id): AppPath<Uuid>,
) -> Result<Json<DataResponse<CardResponse>>, AppError> {
    let card = card_service::set_card_locked(&pool, auth.user_id, card_id, false).await?;

    Ok(Json(DataResponse::ok(card.into())))
}

pub async fn update_settings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(card_id): AppPath<Uuid>,
    AppJson(request): AppJson<CardSettingsRequest>,
) -> Result<Json<DataResponse<CardResponse>>, AppError> {
    let card = card_service::update_settings(&pool, auth.user_id, card_id, request).await?;

    Ok(Json(DataResponse::ok(card.into())))
}
