use anyhow::Result;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::entities::{players, prelude::*};
use game_types::{LeaderboardEntry, PlayerIdentity};

pub struct PlayerRepository {
    db: DatabaseConnection,
}

impl PlayerRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_identity(model: &players::Model) -> PlayerIdentity {
        PlayerIdentity {
            id: model.id,
            display_name: model.display_name.clone(),
            is_guest: model.is_guest,
            created_at: model.created_at.to_rfc3339(),
        }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PlayerIdentity>> {
        let model = Players::find_by_id(id).one(&self.db).await?;
        Ok(model.as_ref().map(Self::model_to_identity))
    }

    /// Persist a freshly minted identity. Registering an id that
    /// already exists returns the stored row unchanged.
    pub async fn register(&self, identity: &PlayerIdentity) -> Result<PlayerIdentity> {
        if let Some(existing) = self.find_by_id(identity.id).await? {
            return Ok(existing);
        }

        let now = chrono::Utc::now().into();
        let model = players::ActiveModel {
            id: ActiveValue::Set(identity.id),
            display_name: ActiveValue::Set(identity.display_name.clone()),
            is_guest: ActiveValue::Set(identity.is_guest),
            total_wins: ActiveValue::Set(0),
            last_win_at: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };

        let saved = Players::insert(model).exec(&self.db).await?;
        let created = Players::find_by_id(saved.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve registered player"))?;

        Ok(Self::model_to_identity(&created))
    }

    /// Credit one win to a player. The increment is a single UPDATE
    /// expression executed by the store, so concurrent wins from
    /// simultaneous sessions cannot clobber each other. Creates the
    /// row with one win if the player was never registered.
    pub async fn record_win(&self, id: Uuid, display_name: &str) -> Result<()> {
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();

        let update = Players::update_many()
            .col_expr(
                players::Column::TotalWins,
                Expr::col(players::Column::TotalWins).add(1),
            )
            .col_expr(players::Column::LastWinAt, Expr::value(Some(now)))
            .col_expr(players::Column::UpdatedAt, Expr::value(now))
            .filter(players::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if update.rows_affected == 0 {
            tracing::debug!(%id, "crediting win to unregistered player, creating row");
            let model = players::ActiveModel {
                id: ActiveValue::Set(id),
                display_name: ActiveValue::Set(display_name.to_string()),
                is_guest: ActiveValue::Set(true),
                total_wins: ActiveValue::Set(1),
                last_win_at: ActiveValue::Set(Some(now)),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
            };
            Players::insert(model).exec(&self.db).await?;
        }

        Ok(())
    }

    pub async fn get_leaderboard(&self, limit: u64) -> Result<Vec<LeaderboardEntry>> {
        let players = Players::find()
            .order_by_desc(players::Column::TotalWins)
            .limit(limit)
            .all(&self.db)
            .await?;

        let leaderboard = players
            .into_iter()
            .enumerate()
            .map(|(index, model)| LeaderboardEntry {
                user_id: model.id,
                display_name: model.display_name,
                total_wins: model.total_wins,
                last_win_at: model.last_win_at.map(|t| t.to_rfc3339()),
                rank: (index + 1) as u32,
            })
            .collect();

        Ok(leaderboard)
    }

    pub async fn total_wins(&self, id: Uuid) -> Result<i32> {
        let model = Players::find_by_id(id).one(&self.db).await?;
        Ok(model.map(|m| m.total_wins).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use migration::{Migrator, MigratorTrait};
    use uuid::Uuid;

    async fn setup_test_db() -> PlayerRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        PlayerRepository::new(db)
    }

    fn test_identity(name: &str) -> PlayerIdentity {
        PlayerIdentity {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
            is_guest: true,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_register_and_find_player() {
        let repo = setup_test_db().await;
        let identity = test_identity("Alice");

        let registered = repo.register(&identity).await.unwrap();
        assert_eq!(registered.id, identity.id);
        assert_eq!(registered.display_name, "Alice");

        let found = repo.find_by_id(identity.id).await.unwrap().unwrap();
        assert_eq!(found.display_name, "Alice");
        assert!(found.is_guest);
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let repo = setup_test_db().await;
        let identity = test_identity("Alice");

        repo.register(&identity).await.unwrap();
        let second = repo.register(&identity).await.unwrap();
        assert_eq!(second.id, identity.id);
    }

    #[tokio::test]
    async fn test_record_win_increments() {
        let repo = setup_test_db().await;
        let identity = test_identity("Alice");
        repo.register(&identity).await.unwrap();

        repo.record_win(identity.id, &identity.display_name)
            .await
            .unwrap();
        repo.record_win(identity.id, &identity.display_name)
            .await
            .unwrap();

        assert_eq!(repo.total_wins(identity.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_record_win_for_unregistered_player_creates_row() {
        let repo = setup_test_db().await;
        let id = Uuid::new_v4();

        repo.record_win(id, "Drifter").await.unwrap();

        assert_eq!(repo.total_wins(id).await.unwrap(), 1);
        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.display_name, "Drifter");
    }

    #[tokio::test]
    async fn test_leaderboard_ordering_and_ranks() {
        let repo = setup_test_db().await;

        let alice = test_identity("Alice");
        let bob = test_identity("Bob");
        let carol = test_identity("Carol");
        for identity in [&alice, &bob, &carol] {
            repo.register(identity).await.unwrap();
        }

        for _ in 0..3 {
            repo.record_win(bob.id, "Bob").await.unwrap();
        }
        repo.record_win(alice.id, "Alice").await.unwrap();

        let leaderboard = repo.get_leaderboard(10).await.unwrap();
        assert_eq!(leaderboard.len(), 3);
        assert_eq!(leaderboard[0].display_name, "Bob");
        assert_eq!(leaderboard[0].total_wins, 3);
        assert_eq!(leaderboard[0].rank, 1);
        assert!(leaderboard[0].last_win_at.is_some());
        assert_eq!(leaderboard[1].display_name, "Alice");
        assert_eq!(leaderboard[1].rank, 2);
        assert_eq!(leaderboard[2].total_wins, 0);
        assert!(leaderboard[2].last_win_at.is_none());
    }

    #[tokio::test]
    async fn test_leaderboard_limit() {
        let repo = setup_test_db().await;

        for i in 0..5 {
            let identity = test_identity(&format!("Player{}", i));
            repo.register(&identity).await.unwrap();
        }

        let leaderboard = repo.get_leaderboard(3).await.unwrap();
        assert_eq!(leaderboard.len(), 3);
    }
}
