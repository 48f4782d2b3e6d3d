//! First-blood evaluation for a committed solve.
//!
//! Given the id of a solve that is already durable, decide whether it is the
//! first solve of its challenge among eligible accounts and, if so, announce
//! it. Every early exit here is expected filtering, not a failure.
//!
//! Invariants:
//! - Evaluation only ever reads committed state (it runs against the pool,
//!   never inside the inserting transaction).
//! - "First" means the smallest `(date, id)` among solves whose account is
//!   visible and not banned; equal dates break by lower id.
//!
//! Two solves for the same challenge committing near-simultaneously on
//! separate connections can, depending on read ordering, each observe the
//! other; this race is accepted rather than locked away (see DESIGN.md).

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::notifier::{render_template, ChatSink};
use crate::settings::{SettingsError, SettingsStore};
use crate::store;

/// Errors from an evaluation pass. Callers on the commit path log these and
/// move on; they never propagate into the committing request.
#[derive(Error, Debug)]
pub enum EvaluateError {
    #[error("solve lookup failed: {0}")]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// What an evaluation pass decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// The solve was first blood and a notification was handed to the sink.
    Announced,
    Skipped(Skip),
}

/// Why a solve produced no announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Feature flag off.
    Disabled,
    /// Token or chat id blank.
    Unconfigured,
    /// No solve row for this id.
    SolveMissing,
    /// Owning account gone, hidden, or banned.
    AccountIneligible,
    /// An earlier eligible solve already holds first blood.
    NotFirst,
}

/// Decides first blood and formats the announcement.
#[derive(Clone)]
pub struct FirstBloodEvaluator {
    pool: SqlitePool,
    settings: SettingsStore,
    sink: Arc<dyn ChatSink>,
}

impl FirstBloodEvaluator {
    pub fn new(pool: SqlitePool, settings: SettingsStore, sink: Arc<dyn ChatSink>) -> Self {
        Self {
            pool,
            settings,
            sink,
        }
    }

    /// Evaluate one committed solve id.
    pub async fn evaluate(&self, solve_id: i64) -> Result<Evaluation, EvaluateError> {
        let settings = self.settings.snapshot().await?;
        if !settings.enabled {
            return Ok(Evaluation::Skipped(Skip::Disabled));
        }
        let token = settings.token.trim();
        let chat_id = settings.chat_id.trim();
        if token.is_empty() || chat_id.is_empty() {
            return Ok(Evaluation::Skipped(Skip::Unconfigured));
        }

        // Should exist for a just-committed row; defends against the id
        // arriving from a reader that saw a different snapshot.
        let Some(solve) = store::solve_by_id(&self.pool, solve_id).await? else {
            tracing::debug!(solve_id, "solve not found, skipping");
            return Ok(Evaluation::Skipped(Skip::SolveMissing));
        };

        let mode = self.settings.competition_mode().await?;
        let account = store::account_by_id(&self.pool, mode, solve.account_id).await?;
        let account = match account {
            Some(account) if account.is_eligible() => account,
            _ => {
                tracing::debug!(
                    solve_id,
                    account_id = solve.account_id,
                    "account missing or ineligible, skipping"
                );
                return Ok(Evaluation::Skipped(Skip::AccountIneligible));
            }
        };

        let first = store::first_eligible_solve(&self.pool, mode, solve.challenge_id).await?;
        match first {
            Some(first) if first.id == solve.id => {}
            _ => return Ok(Evaluation::Skipped(Skip::NotFirst)),
        }

        let challenge = store::challenge_by_id(&self.pool, solve.challenge_id).await?;
        let challenge_name = challenge
            .as_ref()
            .map(|c| c.name.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("challenge:{}", solve.challenge_id));
        let category = challenge
            .as_ref()
            .map(|c| c.category.clone())
            .unwrap_or_default();
        let points = challenge
            .as_ref()
            .map(|c| c.value.to_string())
            .unwrap_or_default();

        let solver = if account.name.trim().is_empty() {
            format!("account:{}", solve.account_id)
        } else {
            account.name.clone()
        };

        let vars = [
            ("solver", solver),
            ("solver_type", mode.solver_type().to_string()),
            ("challenge", challenge_name),
            ("category", category),
            ("points", points),
            ("solve_id", solve.id.to_string()),
            ("challenge_id", solve.challenge_id.to_string()),
            (
                "date_utc",
                Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
        ];

        let message = render_template(&settings.template, &vars);
        self.sink
            .send(token, chat_id, &message, settings.parse_mode)
            .await;

        tracing::info!(
            solve_id,
            challenge_id = solve.challenge_id,
            account_id = solve.account_id,
            "announced first blood"
        );
        Ok(Evaluation::Announced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::testing::RecordingSink;
    use crate::settings::{
        CFG_CHAT_ID, CFG_ENABLED, CFG_TEMPLATE, CFG_TOKEN, CFG_USER_MODE,
    };
    use crate::store::fixtures::*;

    async fn evaluator(pool: &sqlx::SqlitePool) -> (FirstBloodEvaluator, Arc<RecordingSink>) {
        let settings = SettingsStore::new(pool.clone());
        settings.set(CFG_ENABLED, "1").await.unwrap();
        settings.set(CFG_TOKEN, "123456:ABCDEF").await.unwrap();
        settings.set(CFG_CHAT_ID, "-100123").await.unwrap();

        let sink = Arc::new(RecordingSink::default());
        let evaluator = FirstBloodEvaluator::new(pool.clone(), settings, sink.clone());
        (evaluator, sink)
    }

    #[tokio::test]
    async fn test_first_solve_is_announced_second_is_not() {
        let pool = pool().await;
        let (evaluator, sink) = evaluator(&pool).await;

        let alice = insert_user(&pool, "alice", false, false).await;
        let bob = insert_user(&pool, "bob", false, false).await;
        let chal = insert_challenge(&pool, "heap feng shui", "pwn", 500).await;

        let first = insert_solve(&pool, chal, alice, ts(1_000)).await;
        assert_eq!(
            evaluator.evaluate(first).await.unwrap(),
            Evaluation::Announced
        );

        let second = insert_solve(&pool, chal, bob, ts(2_000)).await;
        assert_eq!(
            evaluator.evaluate(second).await.unwrap(),
            Evaluation::Skipped(Skip::NotFirst)
        );

        let sent = sink.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, "-100123");
        assert!(sent[0].text.contains("alice"));
        assert!(sent[0].text.contains("heap feng shui"));
    }

    #[tokio::test]
    async fn test_hidden_earliest_solver_yields_to_next_eligible() {
        let pool = pool().await;
        let (evaluator, sink) = evaluator(&pool).await;

        let ghost = insert_user(&pool, "ghost", true, false).await;
        let alice = insert_user(&pool, "alice", false, false).await;
        let chal = insert_challenge(&pool, "web3", "web", 200).await;

        let ghost_solve = insert_solve(&pool, chal, ghost, ts(500)).await;
        assert_eq!(
            evaluator.evaluate(ghost_solve).await.unwrap(),
            Evaluation::Skipped(Skip::AccountIneligible)
        );

        // alice is later in wall-clock but first among eligible accounts
        let alice_solve = insert_solve(&pool, chal, alice, ts(900)).await;
        assert_eq!(
            evaluator.evaluate(alice_solve).await.unwrap(),
            Evaluation::Announced
        );
        assert_eq!(sink.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_reevaluating_announced_solve_is_idempotent_downstream() {
        // Re-running on the same first solve matches the first-row query
        // again; exactly-once delivery is the commit hook's job. Re-running
        // on any *other* solve of the challenge never sends.
        let pool = pool().await;
        let (evaluator, sink) = evaluator(&pool).await;

        let alice = insert_user(&pool, "alice", false, false).await;
        let bob = insert_user(&pool, "bob", false, false).await;
        let chal = insert_challenge(&pool, "forensics1", "forensics", 100).await;

        let first = insert_solve(&pool, chal, alice, ts(1_000)).await;
        let later = insert_solve(&pool, chal, bob, ts(2_000)).await;
        evaluator.evaluate(first).await.unwrap();

        assert_eq!(
            evaluator.evaluate(later).await.unwrap(),
            Evaluation::Skipped(Skip::NotFirst)
        );
        assert_eq!(sink.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_suppresses_announcement() {
        let pool = pool().await;
        let (evaluator, sink) = evaluator(&pool).await;
        let settings = SettingsStore::new(pool.clone());
        settings.set(CFG_ENABLED, "0").await.unwrap();

        let alice = insert_user(&pool, "alice", false, false).await;
        let chal = insert_challenge(&pool, "misc1", "misc", 50).await;
        let solve = insert_solve(&pool, chal, alice, ts(1_000)).await;

        assert_eq!(
            evaluator.evaluate(solve).await.unwrap(),
            Evaluation::Skipped(Skip::Disabled)
        );
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_blank_chat_id_suppresses_announcement() {
        let pool = pool().await;
        let (evaluator, sink) = evaluator(&pool).await;
        let settings = SettingsStore::new(pool.clone());
        settings.set(CFG_CHAT_ID, "   ").await.unwrap();

        let alice = insert_user(&pool, "alice", false, false).await;
        let chal = insert_challenge(&pool, "misc2", "misc", 50).await;
        let solve = insert_solve(&pool, chal, alice, ts(1_000)).await;

        assert_eq!(
            evaluator.evaluate(solve).await.unwrap(),
            Evaluation::Skipped(Skip::Unconfigured)
        );
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_missing_solve_is_a_silent_noop() {
        let pool = pool().await;
        let (evaluator, sink) = evaluator(&pool).await;

        assert_eq!(
            evaluator.evaluate(4242).await.unwrap(),
            Evaluation::Skipped(Skip::SolveMissing)
        );
        assert!(sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_placeholder_rendering_and_fallback_labels() {
        let pool = pool().await;
        let (evaluator, sink) = evaluator(&pool).await;
        let settings = SettingsStore::new(pool.clone());
        settings
            .set(
                CFG_TEMPLATE,
                "{solver_type} {solver} took {challenge} ({category}, {points}) #{solve_id}",
            )
            .await
            .unwrap();

        // Blank challenge name forces the synthesized label
        let alice = insert_user(&pool, "alice", false, false).await;
        let chal = insert_challenge(&pool, "  ", "stego", 123).await;
        let solve = insert_solve(&pool, chal, alice, ts(1_000)).await;

        evaluator.evaluate(solve).await.unwrap();
        let sent = sink.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].text,
            format!("user alice took challenge:{chal} (stego, 123) #{solve}")
        );
    }

    #[tokio::test]
    async fn test_team_mode_uses_teams_table_and_tag() {
        let pool = pool().await;
        let (evaluator, sink) = evaluator(&pool).await;
        let settings = SettingsStore::new(pool.clone());
        settings.set(CFG_USER_MODE, "teams").await.unwrap();
        settings
            .set(CFG_TEMPLATE, "{solver_type}:{solver}")
            .await
            .unwrap();

        let team = sqlx::query("INSERT INTO teams (name) VALUES ('red team')")
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let chal = insert_challenge(&pool, "infra", "misc", 400).await;
        let solve = insert_solve(&pool, chal, team, ts(1_000)).await;

        assert_eq!(
            evaluator.evaluate(solve).await.unwrap(),
            Evaluation::Announced
        );
        assert_eq!(sink.messages()[0].text, "team:red team");
    }
}
