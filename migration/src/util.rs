use sea_orm_migration::prelude::*;

/// `id`, `created_at` and `updated_at`, shared by every table.
///
/// Ids are generated by the application, so the statement carries no
/// backend-specific default and runs on SQLite as well as PostgreSQL.
pub(crate) fn default_table_statement() -> TableCreateStatement {
    TableCreateStatement::new()
        .if_not_exists()
        .col(ColumnDef::new(DefaultColumn::Id)
            .uuid()
            .not_null()
            .primary_key()
            .take())
        .col(ColumnDef::new(DefaultColumn::CreatedAt)
            .timestamp_with_time_zone()
            .not_null()
            .take())
        .col(ColumnDef::new(DefaultColumn::UpdatedAt)
            .timestamp_with_time_zone()
            .not_null()
            .take())
        .take()
}

#[derive(DeriveIden)]
pub(crate) enum DefaultColumn {
    Id,
    CreatedAt,
    UpdatedAt,
}

/// Foreign key declared inline with the table, since SQLite cannot add one
/// through `ALTER TABLE`.
///
/// # Example
///
/// ```rs
/// manager
///     .create_table(default_table_statement()
///         .table(Attendance::Table)
///         .col(ColumnDef::new(Attendance::EmployeeId)
///             .uuid()
///             .not_null())
///         .foreign_key(&mut reference(Attendance::Table, Attendance::EmployeeId, Employee::Table, ForeignKeyAction::Cascade))
///         .take()
///     ).await?;
/// ```
pub(crate) fn reference<T, C, R>(table: T, column: C, referenced: R, on_delete: ForeignKeyAction) -> ForeignKeyCreateStatement
where
    T: IntoTableRef,
    C: IntoIden,
    R: IntoTableRef,
{
    ForeignKeyCreateStatement::new()
        .from(table, column)
        .to(referenced, DefaultColumn::Id)
        .on_delete(on_delete)
        .on_update(ForeignKeyAction::Cascade)
        .take()
}
