//! Read-only access to the host platform's solve/account/challenge tables.
//!
//! The host owns this schema; we only ever SELECT from it (plus the solve
//! INSERT issued through [`crate::hooks::SolveSession`] on the host's behalf).
//! Accounts are polymorphic by competition mode: the same columns live in
//! either `users` or `teams`, selected via [`CompetitionMode`].

use chrono::NaiveDateTime;
use sqlx::{Executor, FromRow, Sqlite};

use crate::settings::CompetitionMode;

/// One committed solve: (account, challenge, timestamp).
///
/// Immutable once created; ids are monotonic and unique, which is what makes
/// `(date, id)` a total order.
#[derive(Debug, Clone, FromRow)]
pub struct Solve {
    pub id: i64,
    pub challenge_id: i64,
    pub account_id: i64,
    pub date: NaiveDateTime,
}

/// A scoring account, user or team depending on mode.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub hidden: bool,
    pub banned: bool,
}

impl Account {
    /// Hidden or banned accounts never trigger, nor count as, first blood.
    pub fn is_eligible(&self) -> bool {
        !self.hidden && !self.banned
    }
}

/// Challenge display attributes.
#[derive(Debug, Clone, FromRow)]
pub struct Challenge {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub value: i64,
}

pub async fn solve_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Solve>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Solve>(
        "SELECT id, challenge_id, account_id, date FROM solves WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn challenge_by_id<'e, E>(
    executor: E,
    id: i64,
) -> Result<Option<Challenge>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Challenge>(
        "SELECT id, name, category, value FROM challenges WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn account_by_id<'e, E>(
    executor: E,
    mode: CompetitionMode,
    id: i64,
) -> Result<Option<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    // Table name comes from a closed enum, not user input.
    let sql = format!(
        "SELECT id, name, hidden, banned FROM {} WHERE id = ?1",
        mode.account_table()
    );
    sqlx::query_as::<_, Account>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// The first solve of a challenge among visible, non-banned accounts.
///
/// Ordered by `(date, id)` ascending; equal timestamps fall back to insertion
/// order, so the result is deterministic and total.
pub async fn first_eligible_solve<'e, E>(
    executor: E,
    mode: CompetitionMode,
    challenge_id: i64,
) -> Result<Option<Solve>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT s.id, s.challenge_id, s.account_id, s.date \
         FROM solves s \
         JOIN {} a ON s.account_id = a.id \
         WHERE s.challenge_id = ?1 AND a.hidden = 0 AND a.banned = 0 \
         ORDER BY s.date ASC, s.id ASC \
         LIMIT 1",
        mode.account_table()
    );
    sqlx::query_as::<_, Solve>(&sql)
        .bind(challenge_id)
        .fetch_optional(executor)
        .await
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn test_lookups() {
        let pool = pool().await;
        let alice = insert_user(&pool, "alice", false, false).await;
        let chal = insert_challenge(&pool, "pwn me", "pwn", 500).await;
        let solve = insert_solve(&pool, chal, alice, ts(1_000)).await;

        let loaded = solve_by_id(&pool, solve).await.unwrap().unwrap();
        assert_eq!(loaded.challenge_id, chal);
        assert_eq!(loaded.account_id, alice);

        let challenge = challenge_by_id(&pool, chal).await.unwrap().unwrap();
        assert_eq!(challenge.name, "pwn me");
        assert_eq!(challenge.value, 500);

        let account = account_by_id(&pool, CompetitionMode::Users, alice)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.name, "alice");
        assert!(account.is_eligible());

        assert!(solve_by_id(&pool, 999).await.unwrap().is_none());
        assert!(account_by_id(&pool, CompetitionMode::Teams, alice)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_first_eligible_solve_orders_by_date_then_id() {
        let pool = pool().await;
        let alice = insert_user(&pool, "alice", false, false).await;
        let bob = insert_user(&pool, "bob", false, false).await;
        let chal = insert_challenge(&pool, "web1", "web", 100).await;

        // bob solved later in wall-clock time but was inserted first
        let later = insert_solve(&pool, chal, bob, ts(2_000)).await;
        let earlier = insert_solve(&pool, chal, alice, ts(1_000)).await;
        assert!(later < earlier);

        let first = first_eligible_solve(&pool, CompetitionMode::Users, chal)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.id, earlier);
    }

    #[tokio::test]
    async fn test_first_eligible_solve_tie_breaks_on_id() {
        let pool = pool().await;
        let alice = insert_user(&pool, "alice", false, false).await;
        let bob = insert_user(&pool, "bob", false, false).await;
        let chal = insert_challenge(&pool, "web1", "web", 100).await;

        let first_inserted = insert_solve(&pool, chal, alice, ts(1_000)).await;
        let _second_inserted = insert_solve(&pool, chal, bob, ts(1_000)).await;

        let first = first_eligible_solve(&pool, CompetitionMode::Users, chal)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.id, first_inserted);
    }

    #[tokio::test]
    async fn test_first_eligible_solve_skips_hidden_and_banned() {
        let pool = pool().await;
        let ghost = insert_user(&pool, "ghost", true, false).await;
        let cheat = insert_user(&pool, "cheat", false, true).await;
        let alice = insert_user(&pool, "alice", false, false).await;
        let chal = insert_challenge(&pool, "rev2", "rev", 300).await;

        insert_solve(&pool, chal, ghost, ts(500)).await;
        insert_solve(&pool, chal, cheat, ts(600)).await;
        let visible = insert_solve(&pool, chal, alice, ts(700)).await;

        let first = first_eligible_solve(&pool, CompetitionMode::Users, chal)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.id, visible);
    }

    #[tokio::test]
    async fn test_first_eligible_solve_none_when_no_eligible_rows() {
        let pool = pool().await;
        let ghost = insert_user(&pool, "ghost", true, false).await;
        let chal = insert_challenge(&pool, "crypto1", "crypto", 200).await;
        insert_solve(&pool, chal, ghost, ts(500)).await;

        assert!(first_eligible_solve(&pool, CompetitionMode::Users, chal)
            .await
            .unwrap()
            .is_none());
    }
}
