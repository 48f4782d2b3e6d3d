//! Unit-of-work wrapper dispatching first-blood evaluation after commit.

use std::sync::Arc;

use chrono::NaiveDateTime;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::evaluator::{Evaluation, FirstBloodEvaluator};
use crate::notifier::ChatSink;
use crate::settings::SettingsStore;

use super::PendingSolves;

/// Long-lived half of the hook: owns the evaluator and hands out sessions.
///
/// The host keeps one of these for the lifetime of the process and opens a
/// [`SolveSession`] wherever it would otherwise open a bare transaction that
/// may insert solves.
pub struct FirstBloodHook {
    pool: SqlitePool,
    evaluator: FirstBloodEvaluator,
}

impl FirstBloodHook {
    pub fn new(pool: SqlitePool, settings: SettingsStore, sink: Arc<dyn ChatSink>) -> Self {
        let evaluator = FirstBloodEvaluator::new(pool.clone(), settings, sink);
        Self { pool, evaluator }
    }

    /// Begin a transaction with an attached pending-solve accumulator.
    pub async fn begin(self: &Arc<Self>) -> Result<SolveSession, sqlx::Error> {
        let tx = self.pool.begin().await?;
        Ok(SolveSession {
            tx,
            pending: PendingSolves::new(),
            hook: Arc::clone(self),
        })
    }

    /// Evaluate each committed id, swallowing failures.
    ///
    /// Runs strictly after the transaction is durable, on pool connections
    /// that see the committed state. A failed evaluation (or delivery) is
    /// logged; the commit that triggered it has already returned.
    async fn after_commit(&self, solve_ids: Vec<i64>) {
        for solve_id in solve_ids {
            match self.evaluator.evaluate(solve_id).await {
                Ok(Evaluation::Announced) => {}
                Ok(Evaluation::Skipped(reason)) => {
                    tracing::debug!(solve_id, ?reason, "no announcement for solve");
                }
                Err(error) => {
                    tracing::error!(
                        solve_id,
                        error = %error,
                        "first-blood evaluation failed after commit"
                    );
                }
            }
        }
    }
}

/// One transaction plus its pending-solve accumulator.
///
/// Dropping the session without calling [`commit`](Self::commit) rolls the
/// transaction back and the captured ids die with it.
pub struct SolveSession {
    tx: Transaction<'static, Sqlite>,
    pending: PendingSolves,
    hook: Arc<FirstBloodHook>,
}

impl SolveSession {
    /// The transaction's connection, for whatever else the host's unit of
    /// work needs to do atomically with the solve.
    pub fn executor(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    /// Capture a solve id the host inserted itself on [`executor`](Self::executor).
    pub fn record(&mut self, solve_id: i64) {
        self.pending.record(solve_id);
    }

    /// Insert a solve row and capture its id in one step.
    pub async fn insert_solve(
        &mut self,
        challenge_id: i64,
        account_id: i64,
        date: NaiveDateTime,
    ) -> Result<i64, sqlx::Error> {
        let solve_id =
            sqlx::query("INSERT INTO solves (challenge_id, account_id, date) VALUES (?1, ?2, ?3)")
                .bind(challenge_id)
                .bind(account_id)
                .bind(date)
                .execute(&mut *self.tx)
                .await?
                .last_insert_rowid();
        self.pending.record(solve_id);
        Ok(solve_id)
    }

    /// Number of solve ids captured so far.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Commit, then evaluate the captured ids.
    ///
    /// The drain happens atomically with the commit from the caller's point
    /// of view: ids are taken exactly once, and only when the commit itself
    /// succeeded. A commit error propagates with nothing evaluated.
    pub async fn commit(mut self) -> Result<(), sqlx::Error> {
        self.tx.commit().await?;

        let solve_ids = self.pending.drain();
        if solve_ids.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = solve_ids.len(), "evaluating committed solves");
        self.hook.after_commit(solve_ids).await;
        Ok(())
    }

    /// Roll back and discard the captured ids unconditionally.
    pub async fn rollback(mut self) -> Result<(), sqlx::Error> {
        self.pending.discard();
        self.tx.rollback().await
    }
}
