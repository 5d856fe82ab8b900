use sea_orm_migration::prelude::*;

mod m20261001_000001_create_registrations;
mod m20261001_000002_create_events;
mod m20261001_000003_create_attempts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_registrations::Migration),
            Box::new(m20261001_000002_create_events::Migration),
            Box::new(m20261001_000003_create_attempts::Migration),
        ]
    }
}
