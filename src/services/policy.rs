//! Money policy: fees, cashback, savings interest and input rules.
//!
//! Everything here is pure so the numbers can be checked without a database.
//! Amounts are whole VND; rates are basis points (1 bp = 0.01%). Rounding is
//! half-up on the final integer amount.

use chrono::{DateTime, Datelike, Months, NaiveTime, Utc};

use crate::error::AppError;

/// Transfer and withdrawal fee rate, 0.5%.
pub const FEE_RATE_BP: i64 = 50;

/// Cashback accrual rate on bill payments and mobile recharges, 0.5%.
pub const CASHBACK_RATE_BP: i64 = 50;

/// Cashback can only be redeemed once the balance reaches this amount.
pub const CASHBACK_REDEEM_THRESHOLD: i64 = 100_000;

/// Credited once, when a customer's first account is opened.
pub const WELCOME_BONUS: i64 = 100_000;

/// Upper bound on any single amount, far below `i64` overflow territory.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

pub const MIN_TRANSFER: i64 = 1_000;
pub const MIN_DEPOSIT: i64 = 10_000;
pub const MIN_WITHDRAW: i64 = 50_000;
pub const WITHDRAW_STEP: i64 = 10_000;
pub const MIN_BILL_PAYMENT: i64 = 1_000;
pub const MIN_SAVINGS_PRINCIPAL: i64 = 100_000;
pub const MIN_PIGGY_DEPOSIT: i64 = 1_000;
pub const MIN_PIGGY_TARGET: i64 = 10_000;

pub const RECHARGE_AMOUNTS: [i64; 6] = [10_000, 20_000, 50_000, 100_000, 200_000, 500_000];

/// Cards an account may be issued per calendar day.
pub const MAX_CARDS_PER_DAY: i64 = 3;

/// Supported savings terms and their annual rates.
pub const SAVINGS_TERMS: [(i32, i32); 5] = [(1, 300), (3, 400), (6, 550), (12, 750), (24, 800)];

/// `amount * bp / 10_000`, rounded half-up.
fn apply_rate_bp(amount: i64, bp: i64) -> i64 {
    let scaled = i128::from(amount) * i128::from(bp);
    ((scaled + 5_000) / 10_000) as i64
}

/// Fee added on top of a transfer or withdrawal.
pub fn fee_for(amount: i64) -> i64 {
    apply_rate_bp(amount, FEE_RATE_BP)
}

/// Cashback accrued for an amount actually charged.
pub fn cashback_for(amount_charged: i64) -> i64 {
    apply_rate_bp(amount_charged, CASHBACK_RATE_BP)
}

pub fn savings_rate_bp(term_months: i32) -> Option<i32> {
    SAVINGS_TERMS
        .iter()
        .find(|(term, _)| *term == term_months)
        .map(|(_, rate)| *rate)
}

pub fn maturity_date(created_at: DateTime<Utc>, term_months: i32) -> Option<DateTime<Utc>> {
    let months = u32::try_from(term_months).ok()?;
    created_at.checked_add_months(Months::new(months))
}

/// Midnight UTC of the day containing `now`. Daily limits and card quotas
/// reset here regardless of the database session time zone.
pub fn utc_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Midnight UTC on the first of the month containing `now`.
pub fn utc_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let day = now.date_naive();
    day.with_day(1).unwrap_or(day).and_time(NaiveTime::MIN).and_utc()
}

/// Interest earned by a savings deposit withdrawn at `now`.
///
/// At or after maturity the full term rate applies: `principal * rate / 100`.
/// Before maturity only elapsed whole 30-day months count, at half the rate:
/// `principal * rate * months / (12 * 100) * 0.5`.
///
/// Returns the interest and whether the deposit had matured.
pub fn savings_interest(
    principal: i64,
    rate_bp: i32,
    created_at: DateTime<Utc>,
    maturity: DateTime<Utc>,
    now: DateTime<Utc>,
) -> (i64, bool) {
    if now >= maturity {
        return (apply_rate_bp(principal, i64::from(rate_bp)), true);
    }

    let months = i128::from((now - created_at).num_days().max(0) / 30);
    // bp -> percent is /100, percent -> fraction is /100, per-month is /12, penalty is /2
    let scaled = i128::from(principal) * i128::from(rate_bp) * months;
    let interest = (scaled + 120_000) / 240_000;

    (interest as i64, false)
}

pub fn ensure_amount_in_range(amount: i64, minimum: i64) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::validation("Amount must be positive"));
    }
    if amount < minimum {
        return Err(AppError::validation(format!(
            "Minimum amount is {minimum} VND"
        )));
    }
    if amount > MAX_AMOUNT {
        return Err(AppError::validation(format!(
            "Maximum amount is {MAX_AMOUNT} VND"
        )));
    }
    Ok(())
}

pub fn ensure_withdraw_amount(amount: i64) -> Result<(), AppError> {
    ensure_amount_in_range(amount, MIN_WITHDRAW)?;
    if amount % WITHDRAW_STEP != 0 {
        return Err(AppError::validation(format!(
            "Withdrawal amount must be a multiple of {WITHDRAW_STEP} VND"
        )));
    }
    Ok(())
}

pub fn ensure_recharge_amount(amount: i64) -> Result<(), AppError> {
    if RECHARGE_AMOUNTS.contains(&amount) {
        Ok(())
    } else {
        Err(AppError::validation("Unsupported recharge amount"))
    }
}

/// Normalize a Vietnamese mobile number to its 10-digit local form.
///
/// Accepts `0xxxxxxxxx` and `+84xxxxxxxxx`, ignoring spaces, dots and dashes.
pub fn normalize_phone(raw: &str) -> Result<String, AppError> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-'))
        .collect();

    let local = match compact.strip_prefix("+84") {
        Some(rest) => format!("0{rest}"),
        None => compact,
    };

    let valid = local.len() == 10
        && local.chars().all(|c| c.is_ascii_digit())
        && local.starts_with('0')
        && matches!(local.as_bytes()[1], b'3' | b'5' | b'7' | b'8' | b'9');

    if valid {
        Ok(local)
    } else {
        Err(AppError::validation("Invalid phone number format"))
    }
}

pub fn is_account_number(value: &str) -> bool {
    value.len() == 12 && value.chars().all(|c| c.is_ascii_digit())
}

pub fn ensure_pin_format(pin: &str) -> Result<(), AppError> {
    if pin.len() == 6 && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AppError::validation("PIN must be exactly 6 digits"))
    }
}

pub fn ensure_username(username: &str) -> Result<(), AppError> {
    let valid = (3..=32).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(
            "Username must be 3-32 letters, digits, '_' or '.'",
        ))
    }
}

pub fn ensure_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() >= 8 {
        Ok(())
    } else {
        Err(AppError::validation("Password must be at least 8 characters"))
    }
}

pub fn ensure_limits(daily: i64, monthly: i64) -> Result<(), AppError> {
    if daily <= 0 || monthly <= 0 {
        return Err(AppError::validation("Limits must be positive"));
    }
    if daily > monthly {
        return Err(AppError::validation(
            "Daily limit cannot exceed the monthly limit",
        ));
    }
    Ok(())
}

/// Luhn check digit for a card number prefix.
pub fn luhn_check_digit(digits: &str) -> u32 {
    let sum: u32 = digits
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    (10 - sum % 10) % 10
}

pub fn is_luhn_valid(number: &str) -> bool {
    match number.split_at_checked(number.len().saturating_sub(1)) {
        Some((body, check)) if !body.is_empty() => check
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .is_some_and(|d| d == luhn_check_digit(body)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    #[rstest]
    #[case::hundred_thousand(100_000, 500)]
    #[case::rounds_half_up(100, 1)]
    #[case::rounds_down(99, 0)]
    #[case::large(1_000_000_000, 5_000_000)]
    fn transfer_fee(#[case] amount: i64, #[case] expected: i64) {
        assert_eq!(fee_for(amount), expected);
    }

    #[rstest]
    #[case::midday((2025, 3, 14, 13, 45, 9), (2025, 3, 14), (2025, 3, 1))]
    #[case::just_after_midnight((2025, 3, 1, 0, 0, 1), (2025, 3, 1), (2025, 3, 1))]
    #[case::last_second_of_year((2024, 12, 31, 23, 59, 59), (2024, 12, 31), (2024, 12, 1))]
    #[case::leap_day((2024, 2, 29, 7, 0, 0), (2024, 2, 29), (2024, 2, 1))]
    fn period_starts_are_utc_midnight(
        #[case] now: (i32, u32, u32, u32, u32, u32),
        #[case] day: (i32, u32, u32),
        #[case] month: (i32, u32, u32),
    ) {
        let (y, mo, d, h, mi, se) = now;
        let now = Utc.with_ymd_and_hms(y, mo, d, h, mi, se).unwrap();

        assert_eq!(
            utc_day_start(now),
            Utc.with_ymd_and_hms(day.0, day.1, day.2, 0, 0, 0).unwrap()
        );
        assert_eq!(
            utc_month_start(now),
            Utc.with_ymd_and_hms(month.0, month.1, month.2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn transfer_of_100k_debits_100_500() {
        let amount = 100_000;
        assert_eq!(amount + fee_for(amount), 100_500);
    }

    #[rstest]
    #[case::bill(200_000, 1_000)]
    #[case::recharge(50_000, 250)]
    #[case::small(10_000, 50)]
    fn cashback_accrual(#[case] charged: i64, #[case] expected: i64) {
        assert_eq!(cashback_for(charged), expected);
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn matured_savings_earn_full_rate() {
        let created = at(2025, 1, 1);
        let maturity = maturity_date(created, 12).unwrap();

        let (interest, matured) = savings_interest(1_000_000, 750, created, maturity, maturity);

        assert_eq!(interest, 75_000);
        assert!(matured);
    }

    #[test]
    fn withdrawal_after_maturity_still_full_rate() {
        let created = at(2025, 1, 1);
        let maturity = maturity_date(created, 12).unwrap();

        let (interest, _) = savings_interest(
            1_000_000,
            750,
            created,
            maturity,
            maturity + Duration::days(40),
        );

        assert_eq!(interest, 75_000);
    }

    #[test]
    fn early_withdrawal_pays_half_rate_for_elapsed_months() {
        let created = at(2025, 1, 1);
        let maturity = maturity_date(created, 12).unwrap();

        let (interest, matured) = savings_interest(
            1_000_000,
            750,
            created,
            maturity,
            created + Duration::days(95),
        );

        assert_eq!(interest, 9_375);
        assert!(!matured);
    }

    #[test]
    fn early_withdrawal_in_first_month_earns_nothing() {
        let created = at(2025, 1, 1);
        let maturity = maturity_date(created, 6).unwrap();

        let (interest, _) = savings_interest(
            5_000_000,
            550,
            created,
            maturity,
            created + Duration::days(29),
        );

        assert_eq!(interest, 0);
    }

    #[test]
    fn maturity_adds_calendar_months() {
        assert_eq!(maturity_date(at(2025, 1, 31), 1).unwrap(), at(2025, 2, 28));
        assert_eq!(maturity_date(at(2025, 3, 15), 12).unwrap(), at(2026, 3, 15));
    }

    #[rstest]
    #[case(12, Some(750))]
    #[case(1, Some(300))]
    #[case(5, None)]
    fn savings_terms(#[case] term: i32, #[case] rate: Option<i32>) {
        assert_eq!(savings_rate_bp(term), rate);
    }

    #[rstest]
    #[case::zero(0, MIN_TRANSFER, false)]
    #[case::negative(-5, MIN_TRANSFER, false)]
    #[case::below_min(999, MIN_TRANSFER, false)]
    #[case::at_min(1_000, MIN_TRANSFER, true)]
    #[case::too_large(MAX_AMOUNT + 1, MIN_TRANSFER, false)]
    fn amount_range(#[case] amount: i64, #[case] min: i64, #[case] ok: bool) {
        assert_eq!(ensure_amount_in_range(amount, min).is_ok(), ok);
    }

    #[rstest]
    #[case(50_000, true)]
    #[case(55_000, false)]
    #[case(40_000, false)]
    #[case(1_230_000, true)]
    fn withdraw_amounts(#[case] amount: i64, #[case] ok: bool) {
        assert_eq!(ensure_withdraw_amount(amount).is_ok(), ok);
    }

    #[rstest]
    #[case("0987654321", Some("0987654321"))]
    #[case("+84 987 654 321", Some("0987654321"))]
    #[case("098.765.4321", Some("0987654321"))]
    #[case("0187654321", None)]
    #[case("09876543", None)]
    #[case("09876543ab", None)]
    fn phone_numbers(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_phone(raw).ok().as_deref(), expected);
    }

    #[rstest]
    #[case("123456", true)]
    #[case("12345", false)]
    #[case("12345a", false)]
    fn pin_format(#[case] pin: &str, #[case] ok: bool) {
        assert_eq!(ensure_pin_format(pin).is_ok(), ok);
    }

    #[test]
    fn recharge_amounts_are_fixed() {
        assert!(ensure_recharge_amount(50_000).is_ok());
        assert!(ensure_recharge_amount(30_000).is_err());
    }

    #[test]
    fn limits_must_be_ordered() {
        assert!(ensure_limits(10, 100).is_ok());
        assert!(ensure_limits(100, 10).is_err());
        assert!(ensure_limits(0, 10).is_err());
    }

    #[test]
    fn luhn_round_trip() {
        assert_eq!(luhn_check_digit("7992739871"), 3);
        assert!(is_luhn_valid("79927398713"));
        assert!(!is_luhn_valid("79927398710"));
    }

    #[test]
    fn account_numbers_are_twelve_digits() {
        assert!(is_account_number("970412345678"));
        assert!(!is_account_number("quoc"));
        assert!(!is_account_number("97041234567"));
    }
}
