//! Order validator: a pure function over a submit request,
//! the resolved market, and config — no I/O of its own.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::market::{Market, MarketNotTradableReason};
use crate::models::order::SubmitOrderRequest;

const MAX_PRICE_FRACTIONAL_DIGITS: u32 = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("address does not match the configured address shape")]
    InvalidAddress,
    #[error("price must be strictly between 0 and 1")]
    PriceOutOfRange,
    #[error("price must have at most {MAX_PRICE_FRACTIONAL_DIGITS} fractional digits")]
    PriceTooPrecise,
    #[error("quantity must be a positive integer")]
    NonPositiveQuantity,
    #[error("market {0} not found")]
    MarketNotFound(Uuid),
    #[error("market is not tradable: {0:?}")]
    MarketNotTradable(MarketNotTradableReason),
}

/// Checks address format, price bounds, quantity positivity, and market
/// existence/liveness. Market lookup itself (I/O) happens by the caller;
/// this function is handed the already-resolved `Option<&Market>`.
pub fn validate(
    config: &AppConfig,
    user_address: &str,
    request: &SubmitOrderRequest,
    market: Option<&Market>,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if !is_well_formed_address(config, user_address) {
        return Err(ValidationError::InvalidAddress);
    }

    if request.price <= Decimal::ZERO || request.price >= Decimal::ONE {
        return Err(ValidationError::PriceOutOfRange);
    }

    if request.price.normalize().scale() > MAX_PRICE_FRACTIONAL_DIGITS {
        return Err(ValidationError::PriceTooPrecise);
    }

    if request.quantity <= 0 {
        return Err(ValidationError::NonPositiveQuantity);
    }

    match market {
        None => Err(ValidationError::MarketNotFound(request.market_id)),
        Some(market) => market
            .tradable_at(now)
            .map_err(ValidationError::MarketNotTradable),
    }
}

fn is_well_formed_address(config: &AppConfig, address: &str) -> bool {
    let Some(rest) = address.strip_prefix(config.address_prefix.as_str()) else {
        return false;
    };
    rest.len() == config.address_length && rest.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::market::{MarketStatus, Outcome};
    use crate::models::order::OrderSide;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn config() -> AppConfig {
        AppConfig::for_test()
    }

    fn request() -> SubmitOrderRequest {
        SubmitOrderRequest {
            market_id: Uuid::new_v4(),
            side: OrderSide::Buy,
            outcome: Outcome::Yes,
            price: dec!(0.5),
            quantity: 10,
        }
    }

    fn active_market(id: Uuid) -> Market {
        Market {
            id,
            question: "Will it rain?".to_string(),
            end_time: Utc::now() + Duration::hours(1),
            oracle_address: "0x0000000000000000000000000000000000000001".to_string(),
            status: MarketStatus::Active,
            outcome: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn accepts_a_well_formed_request() {
        let cfg = config();
        let req = request();
        let market = active_market(req.market_id);
        assert!(validate(&cfg, "0x1111111111111111111111111111111111111111", &req, Some(&market), Utc::now()).is_ok());
    }

    #[test]
    fn rejects_malformed_address() {
        let cfg = config();
        let req = request();
        let market = active_market(req.market_id);
        assert_eq!(
            validate(&cfg, "not-an-address", &req, Some(&market), Utc::now()),
            Err(ValidationError::InvalidAddress)
        );
    }

    #[test]
    fn rejects_price_at_zero_and_one() {
        let cfg = config();
        let market_id = Uuid::new_v4();
        let market = active_market(market_id);
        let addr = "0x1111111111111111111111111111111111111111";

        let mut req = request();
        req.market_id = market_id;
        req.price = Decimal::ZERO;
        assert_eq!(
            validate(&cfg, addr, &req, Some(&market), Utc::now()),
            Err(ValidationError::PriceOutOfRange)
        );

        req.price = Decimal::ONE;
        assert_eq!(
            validate(&cfg, addr, &req, Some(&market), Utc::now()),
            Err(ValidationError::PriceOutOfRange)
        );
    }

    #[test]
    fn rejects_price_with_more_than_eight_fractional_digits() {
        let cfg = config();
        let market_id = Uuid::new_v4();
        let market = active_market(market_id);
        let addr = "0x1111111111111111111111111111111111111111";

        let mut req = request();
        req.market_id = market_id;
        req.price = dec!(0.1000000000000000000000000001);
        assert_eq!(
            validate(&cfg, addr, &req, Some(&market), Utc::now()),
            Err(ValidationError::PriceTooPrecise)
        );
    }

    #[test]
    fn accepts_price_with_trailing_zeros_beyond_eight_digits() {
        let cfg = config();
        let market_id = Uuid::new_v4();
        let market = active_market(market_id);
        let addr = "0x1111111111111111111111111111111111111111";

        let mut req = request();
        req.market_id = market_id;
        req.price = dec!(0.10000000000000000000000000);
        assert!(validate(&cfg, addr, &req, Some(&market), Utc::now()).is_ok());
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let cfg = config();
        let market_id = Uuid::new_v4();
        let market = active_market(market_id);
        let addr = "0x1111111111111111111111111111111111111111";
        let mut req = request();
        req.market_id = market_id;
        req.quantity = 0;
        assert_eq!(
            validate(&cfg, addr, &req, Some(&market), Utc::now()),
            Err(ValidationError::NonPositiveQuantity)
        );
    }

    #[test]
    fn rejects_missing_market() {
        let cfg = config();
        let req = request();
        let addr = "0x1111111111111111111111111111111111111111";
        assert_eq!(
            validate(&cfg, addr, &req, None, Utc::now()),
            Err(ValidationError::MarketNotFound(req.market_id))
        );
    }

    #[test]
    fn revalidating_an_accepted_request_still_returns_ok() {
        let cfg = config();
        let req = request();
        let market = active_market(req.market_id);
        let addr = "0x1111111111111111111111111111111111111111";

        let first = validate(&cfg, addr, &req, Some(&market), Utc::now());
        let second = validate(&cfg, addr, &req, Some(&market), Utc::now());
        assert!(first.is_ok());
        assert!(second.is_ok());
    }

    #[test]
    fn rejects_ended_market() {
        let cfg = config();
        let market_id = Uuid::new_v4();
        let mut market = active_market(market_id);
        market.end_time = Utc::now() - Duration::seconds(1);
        let addr = "0x1111111111111111111111111111111111111111";
        let mut req = request();
        req.market_id = market_id;
        assert_eq!(
            validate(&cfg, addr, &req, Some(&market), Utc::now()),
            Err(ValidationError::MarketNotTradable(MarketNotTradableReason::Ended))
        );
    }
}
