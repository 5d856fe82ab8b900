use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Attempts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Attempts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Attempts::AccountId).big_integer().not_null())
                    .col(ColumnDef::new(Attempts::EventId).uuid().not_null())
                    .col(ColumnDef::new(Attempts::RegistrationId).uuid().not_null())
                    .col(ColumnDef::new(Attempts::DestinationUrl).string().not_null())
                    .col(ColumnDef::new(Attempts::AttemptNumber).integer().not_null())
                    .col(ColumnDef::new(Attempts::Outcome).string_len(16).not_null())
                    .col(ColumnDef::new(Attempts::HttpStatus).integer())
                    .col(ColumnDef::new(Attempts::ErrorMessage).string())
                    .col(ColumnDef::new(Attempts::ResponseBody).text())
                    .col(ColumnDef::new(Attempts::DurationMs).big_integer().not_null())
                    .col(
                        ColumnDef::new(Attempts::AttemptedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Attempts::Table, Attempts::EventId)
                            .to(Events::Table, Events::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Attempts::Table, Attempts::RegistrationId)
                            .to(Registrations::Table, Registrations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Attempt history is listed per account in attempted_at order.
        manager
            .create_index(
                Index::create()
                    .table(Attempts::Table)
                    .col(Attempts::AccountId)
                    .col(Attempts::AttemptedAt)
                    .name("idx_attempts_account_id_attempted_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Attempts::Table)
                    .col(Attempts::EventId)
                    .name("idx_attempts_event_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Attempts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Attempts {
    Table,
    Id,
    AccountId,
    EventId,
    RegistrationId,
    DestinationUrl,
    AttemptNumber,
    Outcome,
    HttpStatus,
    ErrorMessage,
    ResponseBody,
    DurationMs,
    AttemptedAt,
}

#[derive(Iden)]
enum Events {
    Table,
    Id,
}

#[derive(Iden)]
enum Registrations {
    Table,
    Id,
}
