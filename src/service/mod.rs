//! OrderSubmitService: orchestrates validation, the
//! admission and matching locks, the matching engine, persistence, the
//! audit log, and receipt signing for a single `POST /orders` submission.
//!
//! Grounded in `OrderFlowOrchestrator`/`MatchingEngine`
//! (`services/matching/orchestrator.rs`, `services/matching/mod.rs`):
//! same "validate, lock, match, persist, respond" shape, generalized to
//! binary-outcome books and widened with the admission lock, audit log,
//! and receipt signature on top of what that orchestrator does.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::audit::{AuditError, AuditLog};
use crate::config::AppConfig;
use crate::locks::{AdmissionLock, MatchingLockRegistry};
use crate::matching::{MakerFill, MatchResult, MatchingEngine};
use crate::models::market::Outcome;
use crate::models::order::{status_for_fill, Order, OrderStatus, SubmitOrderRequest};
use crate::models::receipt::{Receipt, TradeReceipt};
use crate::models::trade::Trade;
use crate::orderbook::{OrderBook, OrderBookRegistry};
use crate::persistence::{
    MakerUpdate, PersistenceError, PersistenceGateway, SubmitTransactionInput,
};
use crate::metrics;
use crate::signer::{ReceiptSigner, SigningError};
use crate::validator::{self, ValidationError};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("admission lock busy for this user and market")]
    RateLimited,
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("audit log unavailable: {0}")]
    Audit(#[from] AuditError),
    #[error("signing failed for order {order_id}: {source}")]
    Signing {
        order_id: Uuid,
        /// The order and trades are already durably committed; only the
        /// receipt's signature is missing. The transaction already
        /// committed — the order exists, the receipt is unsigned; mark
        /// and log this rather than retrying the whole submission.
        receipt: Box<Receipt>,
        source: SigningError,
    },
}

impl SubmitError {
    pub fn code(&self) -> &'static str {
        match self {
            SubmitError::Validation(e) => validation_code(e),
            SubmitError::RateLimited => "RATE_LIMITED",
            SubmitError::Persistence(_) => "SERIALIZATION_CONFLICT",
            SubmitError::Audit(_) => "AUDIT_UNAVAILABLE",
            SubmitError::Signing { .. } => "SIGNING_FAILURE",
        }
    }

    pub fn order_id(&self) -> Option<Uuid> {
        match self {
            SubmitError::Signing { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}

fn validation_code(error: &ValidationError) -> &'static str {
    match error {
        ValidationError::InvalidAddress => "INVALID_ADDRESS",
        ValidationError::PriceOutOfRange => "PRICE_OUT_OF_RANGE",
        ValidationError::NonPositiveQuantity => "NON_POSITIVE_QUANTITY",
        ValidationError::MarketNotFound(_) => "MARKET_NOT_FOUND",
        ValidationError::MarketNotTradable(_) => "MARKET_NOT_TRADABLE",
    }
}

pub struct OrderSubmitService {
    config: Arc<AppConfig>,
    orderbooks: Arc<OrderBookRegistry>,
    matching_locks: Arc<MatchingLockRegistry>,
    admission_locks: Arc<AdmissionLock>,
    matching_engine: MatchingEngine,
    persistence: Arc<dyn PersistenceGateway>,
    audit: Arc<dyn AuditLog>,
    signer: Arc<dyn ReceiptSigner>,
}

impl OrderSubmitService {
    pub fn new(
        config: Arc<AppConfig>,
        orderbooks: Arc<OrderBookRegistry>,
        matching_locks: Arc<MatchingLockRegistry>,
        admission_locks: Arc<AdmissionLock>,
        persistence: Arc<dyn PersistenceGateway>,
        audit: Arc<dyn AuditLog>,
        signer: Arc<dyn ReceiptSigner>,
    ) -> Self {
        OrderSubmitService {
            config,
            orderbooks,
            matching_locks,
            admission_locks,
            matching_engine: MatchingEngine::new(),
            persistence,
            audit,
            signer,
        }
    }

    /// Runs the full submit pipeline: validate, lock, match, persist, sign.
    pub async fn submit(
        &self,
        user_address: &str,
        request: SubmitOrderRequest,
    ) -> Result<Receipt, SubmitError> {
        let submit_started = std::time::Instant::now();

        // Step 1: validate. Market liveness is re-checked under the
        // matching lock below to guard against a resolution race;
        // this first check rejects the common
        // case of a bad request before any lock is taken.
        let market = self.persistence.get_market(request.market_id).await?;
        if let Err(e) = validator::validate(&self.config, user_address, &request, market.as_ref(), Utc::now()) {
            metrics::record_validation_rejected(validation_code(&e));
            return Err(SubmitError::Validation(e));
        }
        let market = market.expect("validator confirmed the market exists");

        // Step 2: admission lock, per (user, market), non-blocking.
        let _admission_guard = self.admission_locks.try_acquire(user_address, request.market_id).ok_or_else(|| {
            metrics::record_admission_lock_contention();
            SubmitError::RateLimited
        })?;

        // Step 3: matching lock, per (market, outcome), held for the
        // whole match + book-mutation critical section.
        let lock_wait_started = std::time::Instant::now();
        let _matching_guard = self.matching_locks.acquire(request.market_id, request.outcome).await;
        metrics::record_matching_lock_wait(lock_wait_started.elapsed().as_secs_f64());

        // 3a: re-read the market for liveness under the matching lock.
        let market = self.persistence.get_market(request.market_id).await?.unwrap_or(market);
        if let Err(e) = market.tradable_at(Utc::now()) {
            return Err(SubmitError::Validation(ValidationError::MarketNotTradable(e)));
        }

        let book = self.orderbooks.get_or_create(request.market_id, request.outcome);

        // 3b/3c: the taker order is created OPEN with its full quantity
        // and added to the book before matching, so matching's book
        // state always reflects "this taker is already resting" even
        // though it is immediately (and usually fully) consumed.
        let taker_id = Uuid::new_v4();
        let taker_initial = Order {
            id: taker_id,
            market_id: request.market_id,
            user_address: user_address.to_string(),
            side: request.side,
            outcome: request.outcome,
            price: request.price,
            quantity: request.quantity,
            filled_quantity: 0,
            status: OrderStatus::Open,
            created_at: Utc::now(),
        };
        book.add(&taker_initial).expect("freshly generated order id cannot already be in the book");

        // 3d: match.
        let match_started = std::time::Instant::now();
        let result = self.matching_engine.match_order(&taker_initial, &book);
        metrics::record_match_duration(match_started.elapsed().as_secs_f64());

        // 3f: rest or remove the taker's residual.
        if result.taker_remaining == 0 {
            book.remove(taker_id);
        } else {
            book.update_quantity(taker_id, result.taker_remaining)
                .expect("taker_remaining is always non-negative");
        }

        let filled_quantity = request.quantity - result.taker_remaining;
        let taker_final = Order {
            filled_quantity,
            status: status_for_fill(request.quantity, filled_quantity),
            ..taker_initial.clone()
        };

        self.record_book_gauges(&request.market_id.to_string(), &book);

        // Audit append happens before the durable write: the concrete
        // PersistenceGateway commits its transaction internally (it does
        // not expose a pre-commit hook), so the only way to guarantee every
        // persisted trade has an audit entry, or the submission rolls back,
        // is to require the audit entry to exist
        // *before* the trade is durably written, not after (see
        // DESIGN.md open-question log).
        let audit_started = std::time::Instant::now();
        if let Err(e) = self.append_audit_entries(&result.trades, request.side).await {
            metrics::record_audit_append_failure();
            self.rollback_book(&book, &taker_initial, &result, request.market_id, request.outcome);
            return Err(SubmitError::Audit(e));
        }
        metrics::record_audit_append_duration(audit_started.elapsed().as_secs_f64());

        // 3e/3g: persist orders, trades, and position deltas atomically.
        let maker_updates = result
            .maker_fills
            .iter()
            .map(|fill| MakerUpdate {
                order_id: fill.order_id,
                filled_quantity: fill.filled_quantity(),
                status: status_for_fill(fill.original_quantity, fill.filled_quantity()),
            })
            .collect();

        let submit_input = SubmitTransactionInput {
            taker_order: taker_final.clone(),
            maker_updates,
            trades: result.trades.clone(),
            taker_side: request.side,
        };

        let persisted = match self.persistence.run_submit_transaction(submit_input).await {
            Ok(output) => output,
            Err(e) => {
                if matches!(e, PersistenceError::SerializationConflict) {
                    metrics::record_persistence_retry();
                }
                self.rollback_book(&book, &taker_initial, &result, request.market_id, request.outcome);
                return Err(SubmitError::Persistence(e));
            }
        };
        let _ = persisted.position_deltas;

        metrics::record_order_submitted(&request.side.to_string(), &request.outcome.to_string());
        metrics::record_trades_executed(result.trades.len() as u64);

        // Step 5: sign and return the receipt.
        let receipt = self.build_receipt(&taker_final, &result, request.side);
        let signed = self.sign(receipt).await?;

        metrics::record_submit_duration(submit_started.elapsed().as_secs_f64());
        Ok(signed)

        // `_admission_guard` and `_matching_guard` are dropped here,
        // releasing both locks on every exit path including the early
        // returns above.
    }

    /// Publishes the post-match book depth and spread gauges for this
    /// (market, outcome) book.
    fn record_book_gauges(&self, market_id: &str, book: &OrderBook) {
        metrics::set_orderbook_depth(
            market_id,
            "bid",
            book.depth(crate::models::order::OrderSide::Buy, usize::MAX)
                .iter()
                .map(|level| level.total_quantity)
                .sum(),
        );
        metrics::set_orderbook_depth(
            market_id,
            "ask",
            book.depth(crate::models::order::OrderSide::Sell, usize::MAX)
                .iter()
                .map(|level| level.total_quantity)
                .sum(),
        );

        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            let spread = ask.price - bid.price;
            metrics::set_orderbook_spread(market_id, spread.to_f64().unwrap_or(0.0));
        }
    }

    async fn append_audit_entries(
        &self,
        trades: &[Trade],
        taker_side: crate::models::order::OrderSide,
    ) -> Result<(), AuditError> {
        for trade in trades {
            self.audit.append(trade, taker_side).await?;
        }
        Ok(())
    }

    /// Reverses the in-memory book mutations performed by a submit that
    /// did not durably commit. `result` records exactly what was consumed,
    /// so replaying its inverse is sufficient without a DB round trip.
    fn rollback_book(
        &self,
        book: &OrderBook,
        taker_initial: &Order,
        result: &MatchResult,
        market_id: Uuid,
        outcome: Outcome,
    ) {
        book.remove(taker_initial.id);

        let maker_side = taker_initial.side.opposite();
        for (trade, fill) in result.trades.iter().zip(result.maker_fills.iter()) {
            self.restore_maker(book, maker_side, market_id, outcome, trade, fill);
        }
    }

    fn restore_maker(
        &self,
        book: &OrderBook,
        maker_side: crate::models::order::OrderSide,
        market_id: Uuid,
        outcome: Outcome,
        trade: &Trade,
        fill: &MakerFill,
    ) {
        let pre_trade_remaining = fill.remaining_quantity + trade.quantity;
        if book.has_order(fill.order_id) {
            let _ = book.update_quantity(fill.order_id, pre_trade_remaining);
            return;
        }
        let restored = Order {
            id: fill.order_id,
            market_id,
            user_address: trade.maker_address.clone(),
            side: maker_side,
            outcome,
            price: trade.price,
            quantity: fill.original_quantity,
            filled_quantity: fill.original_quantity - pre_trade_remaining,
            status: status_for_fill(fill.original_quantity, fill.original_quantity - pre_trade_remaining),
            created_at: Utc::now(),
        };
        let _ = book.add(&restored);
    }

    fn build_receipt(&self, taker: &Order, result: &MatchResult, _taker_side: crate::models::order::OrderSide) -> Receipt {
        // The taker never appears as its own counterparty (self-trades
        // are skipped by the matching engine), so the counterparty in
        // every trade is unconditionally the maker.
        let trades = result
            .trades
            .iter()
            .map(|t| TradeReceipt {
                trade_id: t.id,
                price: t.price,
                quantity: t.quantity,
                counterparty_address: t.maker_address.clone(),
            })
            .collect();

        Receipt {
            order_id: taker.id,
            market_id: taker.market_id,
            side: taker.side,
            outcome: taker.outcome,
            price: taker.price,
            quantity: taker.quantity,
            filled_quantity: taker.filled_quantity,
            status: taker.status,
            trades,
            timestamp: Utc::now(),
            signature: String::new(),
        }
    }

    async fn sign(&self, mut receipt: Receipt) -> Result<Receipt, SubmitError> {
        match self.signer.sign(&receipt).await {
            Ok(signature) => {
                receipt.signature = signature;
                Ok(receipt)
            }
            Err(source) => {
                tracing::error!(order_id = %receipt.order_id, error = %source, "receipt signing failed after commit");
                Err(SubmitError::Signing {
                    order_id: receipt.order_id,
                    receipt: Box::new(receipt),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::memory::InMemoryAuditLog;
    use crate::models::market::{Market, MarketStatus};
    use crate::persistence::memory::InMemoryGateway;
    use crate::signer::memory::FakeSigner;
    use rust_decimal_macros::dec;

    const ADDR_A: &str = "0x1111111111111111111111111111111111111111";
    const ADDR_B: &str = "0x2222222222222222222222222222222222222222";

    fn service() -> (OrderSubmitService, Arc<InMemoryGateway>, Uuid) {
        let config = Arc::new(AppConfig::for_test());
        let gateway = Arc::new(InMemoryGateway::new());
        let market_id = Uuid::new_v4();
        gateway.seed_market(Market {
            id: market_id,
            question: "Will it rain?".to_string(),
            end_time: Utc::now() + chrono::Duration::hours(1),
            oracle_address: "0x0000000000000000000000000000000000000001".to_string(),
            status: MarketStatus::Active,
            outcome: None,
            created_at: Utc::now(),
        });

        let service = OrderSubmitService::new(
            config,
            Arc::new(OrderBookRegistry::new()),
            Arc::new(MatchingLockRegistry::new()),
            Arc::new(AdmissionLock::new(std::time::Duration::from_secs(5))),
            gateway.clone(),
            Arc::new(InMemoryAuditLog::new()),
            Arc::new(FakeSigner::new()),
        );
        (service, gateway, market_id)
    }

    fn request(market_id: Uuid, side: crate::models::order::OrderSide, price: rust_decimal::Decimal, qty: i64) -> SubmitOrderRequest {
        SubmitOrderRequest {
            market_id,
            side,
            outcome: Outcome::Yes,
            price,
            quantity: qty,
        }
    }

    #[tokio::test]
    async fn resting_order_on_an_empty_book_produces_no_trades() {
        let (service, _gateway, market_id) = service();
        let receipt = service
            .submit(ADDR_A, request(market_id, crate::models::order::OrderSide::Buy, dec!(0.6), 100))
            .await
            .unwrap();

        assert!(receipt.trades.is_empty());
        assert_eq!(receipt.status, OrderStatus::Open);
        assert_eq!(receipt.filled_quantity, 0);
        assert!(!receipt.signature.is_empty());
    }

    #[tokio::test]
    async fn exact_cross_fills_taker_and_maker_completely() {
        let (service, gateway, market_id) = service();
        service
            .submit(ADDR_B, request(market_id, crate::models::order::OrderSide::Sell, dec!(0.55), 100))
            .await
            .unwrap();

        let receipt = service
            .submit(ADDR_A, request(market_id, crate::models::order::OrderSide::Buy, dec!(0.60), 100))
            .await
            .unwrap();

        assert_eq!(receipt.trades.len(), 1);
        assert_eq!(receipt.trades[0].price, dec!(0.55));
        assert_eq!(receipt.status, OrderStatus::Filled);

        let buyer = gateway.position_for(market_id, ADDR_A, Outcome::Yes);
        assert_eq!(buyer.yes_shares, 100);
        let seller = gateway.position_for(market_id, ADDR_B, Outcome::Yes);
        assert_eq!(seller.yes_shares, -100);
    }

    #[tokio::test]
    async fn partial_fill_leaves_a_resting_residual() {
        let (service, _gateway, market_id) = service();
        service
            .submit(ADDR_B, request(market_id, crate::models::order::OrderSide::Sell, dec!(0.55), 40))
            .await
            .unwrap();

        let receipt = service
            .submit(ADDR_A, request(market_id, crate::models::order::OrderSide::Buy, dec!(0.60), 100))
            .await
            .unwrap();

        assert_eq!(receipt.trades.len(), 1);
        assert_eq!(receipt.trades[0].quantity, 40);
        assert_eq!(receipt.status, OrderStatus::PartiallyFilled);
        assert_eq!(receipt.filled_quantity, 40);
    }

    #[tokio::test]
    async fn self_trade_is_skipped_and_both_orders_rest() {
        let (service, _gateway, market_id) = service();
        service
            .submit(ADDR_A, request(market_id, crate::models::order::OrderSide::Sell, dec!(0.55), 50))
            .await
            .unwrap();

        let receipt = service
            .submit(ADDR_A, request(market_id, crate::models::order::OrderSide::Buy, dec!(0.60), 50))
            .await
            .unwrap();

        assert!(receipt.trades.is_empty());
        assert_eq!(receipt.status, OrderStatus::Open);
    }

    #[tokio::test]
    async fn submit_is_rate_limited_while_the_admission_slot_is_already_held() {
        let config = Arc::new(AppConfig::for_test());
        let gateway = Arc::new(InMemoryGateway::new());
        let market_id = Uuid::new_v4();
        gateway.seed_market(Market {
            id: market_id,
            question: "Will it rain?".to_string(),
            end_time: Utc::now() + chrono::Duration::hours(1),
            oracle_address: "0x0000000000000000000000000000000000000001".to_string(),
            status: MarketStatus::Active,
            outcome: None,
            created_at: Utc::now(),
        });
        let admission_locks = Arc::new(AdmissionLock::new(std::time::Duration::from_secs(5)));

        let service = OrderSubmitService::new(
            config,
            Arc::new(OrderBookRegistry::new()),
            Arc::new(MatchingLockRegistry::new()),
            admission_locks.clone(),
            gateway,
            Arc::new(InMemoryAuditLog::new()),
            Arc::new(FakeSigner::new()),
        );
        let req = request(market_id, crate::models::order::OrderSide::Buy, dec!(0.5), 10);

        let held = admission_locks.try_acquire(ADDR_A, market_id);
        assert!(held.is_some());

        let result = service.submit(ADDR_A, req).await;
        assert!(matches!(result, Err(SubmitError::RateLimited)));
    }

    #[tokio::test]
    async fn validation_failure_leaves_no_book_entry() {
        let (service, _gateway, market_id) = service();
        let mut req = request(market_id, crate::models::order::OrderSide::Buy, dec!(0.5), 10);
        req.price = dec!(1.5);

        let result = service.submit(ADDR_A, req).await;
        assert!(matches!(result, Err(SubmitError::Validation(ValidationError::PriceOutOfRange))));

        let book = service.orderbooks.get_or_create(market_id, Outcome::Yes);
        assert_eq!(book.order_count(), 0);
    }

    #[tokio::test]
    async fn unknown_market_is_rejected() {
        let (service, _gateway, _market_id) = service();
        let result = service.submit(ADDR_A, request(Uuid::new_v4(), crate::models::order::OrderSide::Buy, dec!(0.5), 10)).await;
        assert!(matches!(result, Err(SubmitError::Validation(ValidationError::MarketNotFound(_)))));
    }
}
