//! Card issuance and card controls.

use chrono::{Datelike, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::card::{Card, CardSettingsRequest},
    services::{account_store, policy},
};

const CARD_COLUMNS: &str = "id, account_id, card_number, expiry_month, expiry_year, cvv, is_locked, daily_limit, monthly_limit, nfc_enabled, magnetic_enabled, created_at";

const CARD_VALIDITY_YEARS: i32 = 5;

/// Issue a new card for an account, at most [`policy::MAX_CARDS_PER_DAY`] per day.
pub async fn issue_card(
    pool: &DbPool,
    user_id: Uuid,
    account_id: Option<Uuid>,
) -> Result<Card, AppError> {
    let mut tx = pool.begin().await?;
    let account = account_store::find_owned(&mut tx, user_id, account_id).await?;

    // Lock the account row so concurrent issuances count each other.
    let snapshots = account_store::lock_many(&mut tx, &[account.id]).await?;
    if snapshots.iter().any(|s| s.is_locked) {
        return Err(AppError::AccountLocked);
    }

    let issued_today: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM cards WHERE account_id = $1 AND created_at >= $2",
    )
    .bind(account.id)
    .bind(policy::utc_day_start(Utc::now()))
    .fetch_one(&mut *tx)
    .await?;

    if issued_today >= policy::MAX_CARDS_PER_DAY {
        return Err(AppError::precondition(format!(
            "At most {} cards can be issued per day",
            policy::MAX_CARDS_PER_DAY
        )));
    }

    let now = Utc::now();
    let (number, cvv) = generate_card_details();

    let card = sqlx::query_as::<_, Card>(&format!(
        r#"
        INSERT INTO cards (account_id, card_number, expiry_month, expiry_year, cvv)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {CARD_COLUMNS}
        "#
    ))
    .bind(account.id)
    .bind(&number)
    .bind(now.month() as i16)
    .bind((now.year() + CARD_VALIDITY_YEARS) as i16)
    .bind(&cvv)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(card_id = %card.id, account_id = %account.id, "card issued");
    Ok(card)
}

pub async fn list_cards(pool: &DbPool, user_id: Uuid) -> Result<Vec<Card>, AppError> {
    let cards = sqlx::query_as::<_, Card>(&format!(
        r#"
        SELECT {CARD_COLUMNS}
        FROM cards c
        WHERE EXISTS (SELECT 1 FROM accounts a WHERE a.id = c.account_id AND a.user_id = $1)
        ORDER BY c.created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(cards)
}

pub async fn set_card_locked(
    pool: &DbPool,
    user_id: Uuid,
    card_id: Uuid,
    locked: bool,
) -> Result<Card, AppError> {
    let card = sqlx::query_as::<_, Card>(&format!(
        r#"
        UPDATE cards c
        SET is_locked = $1
        WHERE c.id = $2
          AND EXISTS (SELECT 1 FROM accounts a WHERE a.id = c.account_id AND a.user_id = $3)
        RETURNING {CARD_COLUMNS}
        "#
    ))
    .bind(locked)
    .bind(card_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Card"))?;

    tracing::info!(%card_id, locked, "card lock changed");
    Ok(card)
}

/// Apply a partial settings update; absent fields keep their current value.
pub async fn update_settings(
    pool: &DbPool,
    user_id: Uuid,
    card_id: Uuid,
    settings: CardSettingsRequest,
) -> Result<Card, AppError> {
    let mut tx = pool.begin().await?;

    let card = sqlx::query_as::<_, Card>(&format!(
        r#"
        SELECT {CARD_COLUMNS}
        FROM cards c
        WHERE c.id = $1
          AND EXISTS (SELECT 1 FROM accounts a WHERE a.id = c.account_id AND a.user_id = $2)
        FOR UPDATE
        "#
    ))
    .bind(card_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Card"))?;

    let daily = settings.daily_limit.unwrap_or(card.daily_limit);
    let monthly = settings.monthly_limit.unwrap_or(card.monthly_limit);
    policy::ensure_limits(daily, monthly)?;

    let card = sqlx::query_as::<_, Card>(&format!(
        r#"
        UPDATE cards
        SET daily_limit = $1, monthly_limit = $2, nfc_enabled = $3, magnetic_enabled = $4
        WHERE id = $5
        RETURNING {CARD_COLUMNS}
        "#
    ))
    .bind(daily)
    .bind(monthly)
    .bind(settings.nfc_enabled.unwrap_or(card.nfc_enabled))
    .bind(settings.magnetic_enabled.unwrap_or(card.magnetic_enabled))
    .bind(card.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(card)
}

/// 16-digit Luhn-valid number on the `9704` prefix and a 3-digit CVV.
fn generate_card_details() -> (String, String) {
    let mut rng = rand::rng();
    let mut digit = || char::from(b'0' + rng.random_range(0..10u8));

    let body: String = "9704".chars().chain((0..11).map(|_| digit())).collect();
    let number = format!("{body}{}", policy::luhn_check_digit(&body));
    let cvv: String = (0..3).map(|_| digit()).collect();

    (number, cvv)
}
