//! Payment card models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A card issued against an account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Card {
    pub id: Uuid,
    pub account_id: Uuid,
    pub card_number: String,
    pub expiry_month: i16,
    pub expiry_year: i16,
    pub cvv: String,
    pub is_locked: bool,
    pub daily_limit: i64,
    pub monthly_limit: i64,
    pub nfc_enabled: bool,
    pub magnetic_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueCardRequest {
    pub account_id: Option<Uuid>,
}

/// Partial update of card controls; absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct CardSettingsRequest {
    pub daily_limit: Option<i64>,
    pub monthly_limit: Option<i64>,
    pub nfc_enabled: Option<bool>,
    pub magnetic_enabled: Option<bool>,
}

/// Card as shown in listings: the number is masked and the CVV omitted.
#[derive(Debug, Serialize)]
pub struct CardResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub masked_number: String,
    pub expiry: String,
    pub is_locked: bool,
    pub daily_limit: i64,
    pub monthly_limit: i64,
    pub nfc_enabled: bool,
    pub magnetic_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Card> for CardResponse {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            account_id: card.account_id,
            masked_number: mask_card_number(&card.card_number),
            expiry: format!("{:02}/{:02}", card.expiry_month, card.expiry_year % 100),
            is_locked: card.is_locked,
            daily_limit: card.daily_limit,
            monthly_limit: card.monthly_limit,
            nfc_enabled: card.nfc_enabled,
            magnetic_enabled: card.magnetic_enabled,
            created_at: card.created_at,
        }
    }
}

/// Full card details, returned only once at issuance.
#[derive(Debug, Serialize)]
pub struct IssuedCardResponse {
    pub success: bool,
    pub card: CardResponse,
    pub card_number: String,
    pub cvv: String,
}

fn mask_card_number(number: &str) -> String {
    let visible = number.len().saturating_sub(4);
    format!("**** **** **** {}", &number[visible..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_last_four_digits() {
        assert_eq!(mask_card_number("9704123412341234"), "**** **** **** 1234");
    }
}
