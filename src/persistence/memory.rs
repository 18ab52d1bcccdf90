//! In-memory `PersistenceGateway` fake used by scenario tests
//! in place of a real database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::matching::PositionCalculator;
use crate::models::market::{Market, Outcome};
use crate::models::position::Position;

use super::{PersistenceError, PersistenceGateway, SubmitTransactionInput, SubmitTransactionOutput};

#[derive(Default)]
struct FakeStore {
    markets: HashMap<Uuid, Market>,
    positions: HashMap<(Uuid, String, Outcome), Position>,
}

/// Backs scenario tests without a live Postgres. Not behind a trait
/// object in tests that need to inspect state directly — `seed_market`
/// and `position_for` read through the same lock the gateway uses.
pub struct InMemoryGateway {
    store: Mutex<FakeStore>,
    calculator: PositionCalculator,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        InMemoryGateway {
            store: Mutex::new(FakeStore::default()),
            calculator: PositionCalculator::new(),
        }
    }

    pub fn seed_market(&self, market: Market) {
        self.store.lock().unwrap().markets.insert(market.id, market);
    }

    pub fn position_for(&self, market_id: Uuid, user_address: &str, outcome: Outcome) -> Position {
        self.store
            .lock()
            .unwrap()
            .positions
            .get(&(market_id, user_address.to_string(), outcome))
            .cloned()
            .unwrap_or_else(|| Position::empty(market_id, user_address.to_string()))
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn run_submit_transaction(
        &self,
        input: SubmitTransactionInput,
    ) -> Result<SubmitTransactionOutput, PersistenceError> {
        let mut store = self.store.lock().unwrap();

        let market_id = input.taker_order.market_id;
        let mut current = HashMap::new();
        for trade in &input.trades {
            for address in [trade.maker_address.clone(), trade.taker_address.clone()] {
                let key = (market_id, address.clone(), trade.outcome);
                let position = store
                    .positions
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| Position::empty(market_id, address.clone()));
                current.insert((address, trade.outcome), position);
            }
        }

        let deltas = self.calculator.compute_deltas(
            market_id,
            input.taker_side,
            &input.taker_order.user_address,
            &input.trades,
            &current,
        );

        for delta in &deltas {
            let key = (market_id, delta.user_address.clone(), delta.outcome);
            let position = store
                .positions
                .entry(key)
                .or_insert_with(|| Position::empty(market_id, delta.user_address.clone()));
            match delta.outcome {
                Outcome::Yes => {
                    position.yes_shares += delta.share_delta;
                    if let Some(avg) = delta.new_avg_price {
                        position.yes_avg_price = avg;
                    }
                }
                Outcome::No => {
                    position.no_shares += delta.share_delta;
                    if let Some(avg) = delta.new_avg_price {
                        position.no_avg_price = avg;
                    }
                }
            }
            position.locked_collateral += delta.collateral_delta;
        }

        Ok(SubmitTransactionOutput {
            position_deltas: deltas,
        })
    }

    async fn get_market(&self, market_id: Uuid) -> Result<Option<Market>, PersistenceError> {
        Ok(self.store.lock().unwrap().markets.get(&market_id).cloned())
    }
}
