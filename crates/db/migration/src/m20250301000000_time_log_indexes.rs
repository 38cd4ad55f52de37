use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_time_logs_project_started_at")
                    .table(TimeLogs::Table)
                    .col(TimeLogs::ProjectId)
                    .col(TimeLogs::StartedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_time_logs_user_started_at")
                    .table(TimeLogs::Table)
                    .col(TimeLogs::UserId)
                    .col(TimeLogs::StartedAt)
                    .to_owned(),
            )
            .await?;

        // Running timers are looked up by author far more often than stopped ones.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_time_logs_running \
                 ON time_logs (user_id) \
                 WHERE ended_at IS NULL;",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS idx_time_logs_running;")
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_time_logs_user_started_at")
                    .table(TimeLogs::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_time_logs_project_started_at")
                    .table(TimeLogs::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum TimeLogs {
    Table,
    ProjectId,
    UserId,
    StartedAt,
}
