use sea_orm_migration::{prelude::*, sea_orm::DbBackend};
use sha2::Digest as _;

use crate::m20250702_101500_init::{Employee, User};

const DEPARTMENTS: [(&str, &str); 4] = [
    ("Production", "Machine Operator"),
    ("Quality", "Inspector"),
    ("Maintenance", "Technician"),
    ("Logistics", "Forklift Driver"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Demo data only belongs in the deployed database
        if manager.get_database_backend() != DbBackend::Postgres {
            return Ok(());
        }

        let time = Expr::val("2025-07-02T11:30:00.000Z").cast_as("timestamptz");

        // Creates 40 workers spread over the departments
        for i in 1..=40u32 {
            let uuid = format!("{:032x}", i as u128);
            let (department, position) = DEPARTMENTS[i as usize % DEPARTMENTS.len()];
            let name = format!("Worker {i}");
            let salary = rand::random_range(12_000..=45_000) as f64;
            let joining_date = format!("2024-{:02}-01", (i % 12) + 1);

            manager
                .exec_stmt(Query::insert()
                    .into_table(Employee::Table)
                    .columns([
                        "id", "created_at", "updated_at", "name", "email", "employee_code", "department",
                        "position", "joining_date", "salary", "status", "account_holder_name",
                    ])
                    .values_panic([
                        Expr::val(uuid).cast_as("uuid"), time.clone(), time.clone(), name.clone().into(),
                        format!("worker{i}@factory.local").into(), format!("EMP{i:04}").into(),
                        department.into(), position.into(), Expr::val(joining_date).cast_as("date"),
                        salary.into(), "Active".into(), name.into(),
                    ])
                    .to_owned()
            ).await?;
        }

        // Create an admin

        let hashed_password = &sha2::Sha256::digest("admin:admin@factory.local")[..];

        manager
            .exec_stmt(Query::insert()
                .into_table(User::Table)
                .columns(["id", "created_at", "updated_at", "email", "name", "password", "role"])
                .values_panic([
                    Expr::val(format!("{:032x}", 12345 as u128)).cast_as("uuid"), time.clone(), time.clone(),
                    "admin@factory.local".into(), "Administrator".into(), hashed_password.into(), "admin".into(),
                ])
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() != DbBackend::Postgres {
            return Ok(());
        }

        manager
            .exec_stmt(Query::delete()
                .from_table(Employee::Table)
                .and_where(Expr::col(Employee::Email).like("worker%@factory.local"))
                .to_owned()
        ).await?;

        manager
            .exec_stmt(Query::delete()
                .from_table(User::Table)
                .and_where(Expr::col(User::Email).eq("admin@factory.local"))
                .to_owned()
        ).await?;

        Ok(())
    }
}
