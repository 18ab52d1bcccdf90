//! Postgres-backed `PersistenceGateway`. Grounded in
//! `services/matching/orchestrator.rs`'s `persist_trade`/`batch_persist_trades`
//! (`sqlx::query(..).bind(..).execute(pool)`, `pool.begin()`), generalized
//! to a single `Serializable`-isolation transaction with retry-with-backoff
//! on SQLSTATE `40001`.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::matching::PositionCalculator;
use crate::models::market::{Market, MarketStatus, Outcome};
use crate::models::position::Position;

use super::{
    PersistenceError, PersistenceGateway, RetryPolicy, SubmitTransactionInput,
    SubmitTransactionOutput,
};

pub struct PgGateway {
    pool: PgPool,
    retry: RetryPolicy,
    calculator: PositionCalculator,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        PgGateway {
            pool,
            retry: RetryPolicy::default(),
            calculator: PositionCalculator::new(),
        }
    }

    async fn try_once(
        &self,
        input: &SubmitTransactionInput,
    ) -> Result<SubmitTransactionOutput, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let market_id = input.taker_order.market_id;

        sqlx::query(
            r#"
            INSERT INTO orders (id, market_id, user_address, side, outcome, price, quantity, filled_quantity, status, created_at)
            VALUES ($1, $2, $3, $4::order_side, $5::outcome, $6, $7, $8, $9::order_status, $10)
            ON CONFLICT (id) DO UPDATE SET filled_quantity = EXCLUDED.filled_quantity, status = EXCLUDED.status
            "#,
        )
        .bind(input.taker_order.id)
        .bind(market_id)
        .bind(&input.taker_order.user_address)
        .bind(input.taker_order.side)
        .bind(input.taker_order.outcome)
        .bind(input.taker_order.price)
        .bind(input.taker_order.quantity)
        .bind(input.taker_order.filled_quantity)
        .bind(input.taker_order.status)
        .bind(input.taker_order.created_at)
        .execute(&mut *tx)
        .await?;

        for maker in &input.maker_updates {
            sqlx::query(
                "UPDATE orders SET filled_quantity = $2, status = $3::order_status WHERE id = $1",
            )
            .bind(maker.order_id)
            .bind(maker.filled_quantity)
            .bind(maker.status)
            .execute(&mut *tx)
            .await?;
        }

        for trade in &input.trades {
            sqlx::query(
                r#"
                INSERT INTO trades (id, market_id, outcome, price, quantity, maker_order_id, taker_order_id, maker_address, taker_address, executed_at)
                VALUES ($1, $2, $3::outcome, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(trade.id)
            .bind(trade.market_id)
            .bind(trade.outcome)
            .bind(trade.price)
            .bind(trade.quantity)
            .bind(trade.maker_order_id)
            .bind(trade.taker_order_id)
            .bind(&trade.maker_address)
            .bind(&trade.taker_address)
            .bind(trade.executed_at)
            .execute(&mut *tx)
            .await?;
        }

        let mut current: HashMap<(String, Outcome), Position> = HashMap::new();
        for trade in &input.trades {
            for address in [trade.maker_address.clone(), trade.taker_address.clone()] {
                let key = (address.clone(), trade.outcome);
                if current.contains_key(&key) {
                    continue;
                }
                let row = sqlx::query(
                    r#"
                    SELECT yes_shares, yes_avg_price, no_shares, no_avg_price, locked_collateral, is_settled
                    FROM user_positions WHERE market_id = $1 AND user_address = $2
                    FOR UPDATE
                    "#,
                )
                .bind(market_id)
                .bind(&address)
                .fetch_optional(&mut *tx)
                .await?;

                let position = match row {
                    Some(row) => Position {
                        market_id,
                        user_address: address.clone(),
                        yes_shares: row.try_get("yes_shares")?,
                        yes_avg_price: row.try_get("yes_avg_price")?,
                        no_shares: row.try_get("no_shares")?,
                        no_avg_price: row.try_get("no_avg_price")?,
                        locked_collateral: row.try_get("locked_collateral")?,
                        is_settled: row.try_get("is_settled")?,
                    },
                    None => Position::empty(market_id, address.clone()),
                };
                current.insert(key, position);
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
            sqlx::query(
                r#"
                INSERT INTO user_positions (market_id, user_address, yes_shares, yes_avg_price, no_shares, no_avg_price, locked_collateral, is_settled)
                VALUES ($1, $2,
                    CASE WHEN $6::outcome = 'YES' THEN $3 ELSE 0 END,
                    CASE WHEN $6::outcome = 'YES' THEN COALESCE($4, 0) ELSE 0 END,
                    CASE WHEN $6::outcome = 'NO' THEN $3 ELSE 0 END,
                    CASE WHEN $6::outcome = 'NO' THEN COALESCE($4, 0) ELSE 0 END,
                    $5, false)
                ON CONFLICT (market_id, user_address) DO UPDATE SET
                    yes_shares = user_positions.yes_shares + (CASE WHEN $6::outcome = 'YES' THEN $3 ELSE 0 END),
                    yes_avg_price = CASE WHEN $6::outcome = 'YES' AND $4 IS NOT NULL THEN $4 ELSE user_positions.yes_avg_price END,
                    no_shares = user_positions.no_shares + (CASE WHEN $6::outcome = 'NO' THEN $3 ELSE 0 END),
                    no_avg_price = CASE WHEN $6::outcome = 'NO' AND $4 IS NOT NULL THEN $4 ELSE user_positions.no_avg_price END,
                    locked_collateral = user_positions.locked_collateral + $5
                "#,
            )
            .bind(market_id)
            .bind(&delta.user_address)
            .bind(delta.share_delta)
            .bind(delta.new_avg_price)
            .bind(delta.collateral_delta)
            .bind(delta.outcome)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(SubmitTransactionOutput {
            position_deltas: deltas,
        })
    }
}

fn is_serialization_conflict(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("40001"))
}

#[async_trait]
impl PersistenceGateway for PgGateway {
    async fn run_submit_transaction(
        &self,
        input: SubmitTransactionInput,
    ) -> Result<SubmitTransactionOutput, PersistenceError> {
        for attempt in 0..self.retry.max_attempts {
            match self.try_once(&input).await {
                Ok(output) => return Ok(output),
                Err(err) if is_serialization_conflict(&err) => {
                    tracing::warn!(attempt, "serialization conflict on order submit, retrying");
                    if attempt + 1 < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.backoff_for_attempt(attempt)).await;
                        continue;
                    }
                    return Err(PersistenceError::SerializationConflict);
                }
                Err(err) => return Err(PersistenceError::Backend(err.to_string())),
            }
        }
        Err(PersistenceError::SerializationConflict)
    }

    async fn get_market(&self, market_id: Uuid) -> Result<Option<Market>, PersistenceError> {
        let row = sqlx::query(
            "SELECT id, question, end_time, oracle_address, status, outcome, created_at FROM markets WHERE id = $1",
        )
        .bind(market_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PersistenceError::Backend(e.to_string()))?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(Market {
            id: row.try_get("id").map_err(|e| PersistenceError::Backend(e.to_string()))?,
            question: row.try_get("question").map_err(|e| PersistenceError::Backend(e.to_string()))?,
            end_time: row.try_get("end_time").map_err(|e| PersistenceError::Backend(e.to_string()))?,
            oracle_address: row
                .try_get("oracle_address")
                .map_err(|e| PersistenceError::Backend(e.to_string()))?,
            status: row
                .try_get::<MarketStatus, _>("status")
                .map_err(|e| PersistenceError::Backend(e.to_string()))?,
            outcome: row.try_get("outcome").map_err(|e| PersistenceError::Backend(e.to_string()))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| PersistenceError::Backend(e.to_string()))?,
        }))
    }
}
