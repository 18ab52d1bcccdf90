//! The per-(market,outcome) in-memory order book.
//!
//! Grounded in `services/matching/orderbook.rs`'s `Orderbook`: bids/asks as
//! `BTreeMap<PriceLevel, VecDeque<_>>` guarded by `parking_lot::RwLock`, an
//! order-id index for O(1) cancellation, and the same "pop front of the
//! matched level, drop the level if empty" removal shape. The matching
//! algorithm itself is deliberately not implemented here: the OrderBook
//! stays a pure data structure and the MatchingEngine is the
//! component that consumes it, so this exposes `next_match`/`consume` as
//! the removal-tolerant primitives the engine drives instead of a
//! single `match_order` method.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::market::Outcome;
use crate::models::order::{Order, OrderSide};

use super::types::{BookEntry, DepthLevel, OrderBookError, PriceLevel};

pub struct OrderBook {
    market_id: Uuid,
    outcome: Outcome,
    bids: RwLock<BTreeMap<PriceLevel, VecDeque<BookEntry>>>,
    asks: RwLock<BTreeMap<PriceLevel, VecDeque<BookEntry>>>,
    index: DashMap<Uuid, (OrderSide, PriceLevel)>,
    order_count: AtomicI64,
}

impl OrderBook {
    pub fn new(market_id: Uuid, outcome: Outcome) -> Self {
        OrderBook {
            market_id,
            outcome,
            bids: RwLock::new(BTreeMap::new()),
            asks: RwLock::new(BTreeMap::new()),
            index: DashMap::new(),
            order_count: AtomicI64::new(0),
        }
    }

    pub fn market_id(&self) -> Uuid {
        self.market_id
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn order_count(&self) -> i64 {
        self.order_count.load(AtomicOrdering::Relaxed)
    }

    fn side_book(&self, side: OrderSide) -> &RwLock<BTreeMap<PriceLevel, VecDeque<BookEntry>>> {
        match side {
            OrderSide::Buy => &self.bids,
            OrderSide::Sell => &self.asks,
        }
    }

    /// Inserts a resting order. Fails if the order doesn't belong to this
    /// book or if its id is already present.
    pub fn add(&self, order: &Order) -> Result<(), OrderBookError> {
        if order.market_id != self.market_id || order.outcome != self.outcome {
            return Err(OrderBookError::OrderBookMismatch);
        }
        if self.index.contains_key(&order.id) {
            return Err(OrderBookError::DuplicateOrder(order.id));
        }

        let price_level = PriceLevel::from_decimal(order.price);
        let entry = BookEntry {
            order_id: order.id,
            user_address: order.user_address.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            remaining_quantity: order.remaining(),
            arrived_at: Utc::now(),
        };

        self.side_book(order.side)
            .write()
            .entry(price_level)
            .or_default()
            .push_back(entry);
        self.index.insert(order.id, (order.side, price_level));
        self.order_count.fetch_add(1, AtomicOrdering::Relaxed);
        Ok(())
    }

    /// Removes an order by id, returning it if present.
    pub fn remove(&self, order_id: Uuid) -> Option<BookEntry> {
        let (side, price_level) = self.index.remove(&order_id)?.1;
        let mut book = self.side_book(side).write();
        let removed = {
            let queue = book.get_mut(&price_level)?;
            let pos = queue.iter().position(|e| e.order_id == order_id)?;
            let entry = queue.remove(pos);
            if queue.is_empty() {
                book.remove(&price_level);
            }
            entry
        };
        if removed.is_some() {
            self.order_count.fetch_sub(1, AtomicOrdering::Relaxed);
        }
        removed
    }

    /// Adjusts a resting order's remaining quantity. `new_quantity == 0`
    /// removes it outright.
    pub fn update_quantity(
        &self,
        order_id: Uuid,
        new_quantity: i64,
    ) -> Result<(), OrderBookError> {
        if new_quantity < 0 {
            return Err(OrderBookError::NegativeQuantity);
        }
        if new_quantity == 0 {
            self.remove(order_id);
            return Ok(());
        }
        let Some(entry) = self.index.get(&order_id) else {
            return Ok(());
        };
        let (side, price_level) = *entry;
        drop(entry);
        let mut book = self.side_book(side).write();
        if let Some(queue) = book.get_mut(&price_level) {
            if let Some(order) = queue.iter_mut().find(|e| e.order_id == order_id) {
                order.remaining_quantity = new_quantity;
            }
        }
        Ok(())
    }

    /// Oldest resting order at the best bid price, or `None` if the side is empty.
    pub fn best_bid(&self) -> Option<BookEntry> {
        self.bids.read().iter().next_back().and_then(|(_, q)| q.front().cloned())
    }

    /// Oldest resting order at the best ask price, or `None` if the side is empty.
    pub fn best_ask(&self) -> Option<BookEntry> {
        self.asks.read().iter().next().and_then(|(_, q)| q.front().cloned())
    }

    /// Top-`n` aggregated levels for one side, best price first.
    pub fn depth(&self, side: OrderSide, n: usize) -> Vec<DepthLevel> {
        let book = self.side_book(side).read();
        let levels: Box<dyn Iterator<Item = (&PriceLevel, &VecDeque<BookEntry>)>> = match side {
            OrderSide::Buy => Box::new(book.iter().rev()),
            OrderSide::Sell => Box::new(book.iter()),
        };
        levels
            .take(n)
            .map(|(price_level, queue)| DepthLevel {
                price: price_level.to_decimal(),
                total_quantity: queue.iter().map(|e| e.remaining_quantity).sum(),
                order_count: queue.len(),
            })
            .collect()
    }

    /// Finds the next resting order opposite `taker_side` eligible to
    /// match against `taker_address`, honoring the limit price and
    /// skipping any maker order owned by `taker_address` itself — self-trades
    /// are skipped rather than executed. Price-time
    /// priority is preserved: price levels are scanned best-first, and
    /// within a level entries are scanned in arrival order, so a skipped
    /// self-order never causes a later, worse-priced level to be matched
    /// ahead of an eligible one at a better price.
    pub fn next_match(
        &self,
        taker_side: OrderSide,
        limit_price: Decimal,
        taker_address: &str,
    ) -> Option<BookEntry> {
        let maker_side = taker_side.opposite();
        let book = self.side_book(maker_side).read();
        let levels: Box<dyn Iterator<Item = &VecDeque<BookEntry>>> = match taker_side {
            OrderSide::Buy => Box::new(book.values()),
            OrderSide::Sell => Box::new(book.values().rev()),
        };
        for queue in levels {
            let Some(front) = queue.front() else { continue };
            let crosses = match taker_side {
                OrderSide::Buy => front.price <= limit_price,
                OrderSide::Sell => front.price >= limit_price,
            };
            if !crosses {
                break;
            }
            if let Some(entry) = queue.iter().find(|e| e.user_address != taker_address) {
                return Some(entry.clone());
            }
        }
        None
    }

    /// Consumes `quantity` from the maker order `order_id` on `maker_side`,
    /// wherever it currently sits in its level's queue. Removes it if now
    /// fully filled, and removes the level if it becomes empty. Returns
    /// `false` if the order is no longer present (already fully consumed
    /// by a concurrent caller).
    pub fn consume(&self, maker_side: OrderSide, order_id: Uuid, quantity: i64) -> bool {
        let Some((side, price_level)) = self.index.get(&order_id).map(|e| *e) else {
            return false;
        };
        if side != maker_side {
            return false;
        }
        let mut book = self.side_book(maker_side).write();
        let Some(queue) = book.get_mut(&price_level) else {
            return false;
        };
        let Some(pos) = queue.iter().position(|e| e.order_id == order_id) else {
            return false;
        };
        queue[pos].remaining_quantity -= quantity;
        if queue[pos].remaining_quantity <= 0 {
            queue.remove(pos);
            self.index.remove(&order_id);
            self.order_count.fetch_sub(1, AtomicOrdering::Relaxed);
        }
        if queue.is_empty() {
            book.remove(&price_level);
        }
        true
    }

    pub fn has_order(&self, order_id: Uuid) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Rebuilds a book from a snapshot of its resting (OPEN/PARTIALLY_FILLED)
    /// orders: the in-memory book is a cache
    /// rebuildable from OPEN/PARTIALLY_FILLED rows. Orders are added in
    /// `created_at` order so arrival-sequence time priority within a level
    /// is reconstructed exactly as it would have been built up live; ties in
    /// `created_at` fall back to `id` for a stable order. Fails if any two
    /// orders collide on id or if an order doesn't belong to this book.
    pub fn rebuild(
        market_id: Uuid,
        outcome: Outcome,
        orders: &[Order],
    ) -> Result<Self, OrderBookError> {
        let book = OrderBook::new(market_id, outcome);
        let mut sorted: Vec<&Order> = orders.iter().collect();
        sorted.sort_by_key(|o| (o.created_at, o.id));
        for order in sorted {
            book.add(order)?;
        }
        Ok(book)
    }
}
