//! Process-wide registry of order books, one per `(market_id, outcome)`.
//! Grounded in the use of
//! `DashMap` for concurrent, lock-free-at-the-map-level lookup
//! (`services/matching/orderbook.rs`'s `order_index`, `auth/rate_limit.rs`'s
//! entry map).

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::market::Outcome;

use super::book::OrderBook;

#[derive(Default)]
pub struct OrderBookRegistry {
    books: DashMap<(Uuid, Outcome), Arc<OrderBook>>,
}

impl OrderBookRegistry {
    pub fn new() -> Self {
        OrderBookRegistry {
            books: DashMap::new(),
        }
    }

    /// Returns the book for `(market_id, outcome)`, creating an empty one
    /// on first access.
    pub fn get_or_create(&self, market_id: Uuid, outcome: Outcome) -> Arc<OrderBook> {
        self.books
            .entry((market_id, outcome))
            .or_insert_with(|| Arc::new(OrderBook::new(market_id, outcome)))
            .clone()
    }

    pub fn get(&self, market_id: Uuid, outcome: Outcome) -> Option<Arc<OrderBook>> {
        self.books.get(&(market_id, outcome)).map(|e| e.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_returns_the_same_book_on_repeat_access() {
        let registry = OrderBookRegistry::new();
        let market_id = Uuid::new_v4();
        let a = registry.get_or_create(market_id, Outcome::Yes);
        let b = registry.get_or_create(market_id, Outcome::Yes);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_outcomes_get_distinct_books() {
        let registry = OrderBookRegistry::new();
        let market_id = Uuid::new_v4();
        let yes = registry.get_or_create(market_id, Outcome::Yes);
        let no = registry.get_or_create(market_id, Outcome::No);
        assert!(!Arc::ptr_eq(&yes, &no));
    }

    #[test]
    fn unknown_book_lookup_returns_none() {
        let registry = OrderBookRegistry::new();
        assert!(registry.get(Uuid::new_v4(), Outcome::Yes).is_none());
    }
}
