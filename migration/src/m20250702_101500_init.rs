use sea_orm_migration::prelude::*;

use crate::util::{default_table_statement, reference};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(default_table_statement()
                .table(User::Table)
                .col(ColumnDef::new(User::Email)
                    .text()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(User::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(User::Password)
                    .binary()
                    .not_null()) // sha256 of `{password}:{email}`
                .col(ColumnDef::new(User::Role)
                    .string()
                    .not_null())
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Employee::Table)
                .col(ColumnDef::new(Employee::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::Email)
                    .text()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(Employee::EmployeeCode)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::Department)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::Position)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Employee::JoiningDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Employee::Salary)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Employee::Status)
                    .string()
                    .not_null())
                .col(ColumnDef::new(Employee::BankName)
                    .text())
                .col(ColumnDef::new(Employee::AccountNumber)
                    .text())
                .col(ColumnDef::new(Employee::AccountHolderName)
                    .text())
                .col(ColumnDef::new(Employee::IfscCode)
                    .text())
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Payroll::Table)
                .col(ColumnDef::new(Payroll::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Payroll::Month)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Payroll::Year)
                    .integer()
                    .not_null())
                .col(ColumnDef::new(Payroll::EmployeeDetails)
                    .json_binary()
                    .not_null())
                .col(ColumnDef::new(Payroll::OriginalSalary)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::BasicSalary)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::Allowances)
                    .json_binary()
                    .not_null())
                .col(ColumnDef::new(Payroll::Deductions)
                    .json_binary()
                    .not_null())
                .col(ColumnDef::new(Payroll::LeaveDeduction)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::Overtime)
                    .json_binary()
                    .not_null())
                .col(ColumnDef::new(Payroll::Bonus)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::BonusDetails)
                    .json_binary())
                .col(ColumnDef::new(Payroll::AttendanceSummary)
                    .json_binary()
                    .not_null())
                .col(ColumnDef::new(Payroll::GrossSalary)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::TotalDeductions)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::NetSalary)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Payroll::PaymentStatus)
                    .string()
                    .not_null())
                .col(ColumnDef::new(Payroll::PaymentMethod)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Payroll::PaymentDate)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(Payroll::Remarks)
                    .text())
                .col(ColumnDef::new(Payroll::ManuallyEdited)
                    .boolean()
                    .not_null()
                    .default(false))
                .col(ColumnDef::new(Payroll::IsAutoGenerated)
                    .boolean()
                    .not_null()
                    .default(false))
                .col(ColumnDef::new(Payroll::LastCalculated)
                    .timestamp_with_time_zone()
                    .not_null())
                .col(ColumnDef::new(Payroll::CreatedBy)
                    .uuid())
                .foreign_key(&mut reference(Payroll::Table, Payroll::EmployeeId, Employee::Table, ForeignKeyAction::Cascade))
                .foreign_key(&mut reference(Payroll::Table, Payroll::CreatedBy, User::Table, ForeignKeyAction::SetNull))
                .take()
            ).await?;

        // One payroll per employee per period
        manager
            .create_index(Index::create()
                .name("idx-payroll-employee-period")
                .table(Payroll::Table)
                .col(Payroll::EmployeeId)
                .col(Payroll::Month)
                .col(Payroll::Year)
                .unique()
                .take()
            ).await?;

        manager
            .create_table(default_table_statement()
                .table(Attendance::Table)
                .col(ColumnDef::new(Attendance::EmployeeId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Attendance::Date)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Attendance::Status)
                    .string()
                    .not_null())
                .col(ColumnDef::new(Attendance::OvertimeHours)
                    .double())
                .col(ColumnDef::new(Attendance::OvertimeRate)
                    .double())
                .col(ColumnDef::new(Attendance::PayrollMonth)
                    .integer())
                .col(ColumnDef::new(Attendance::PayrollYear)
                    .integer())
                .col(ColumnDef::new(Attendance::PayrollId)
                    .uuid())
                .foreign_key(&mut reference(Attendance::Table, Attendance::EmployeeId, Employee::Table, ForeignKeyAction::Cascade))
                .foreign_key(&mut reference(Attendance::Table, Attendance::PayrollId, Payroll::Table, ForeignKeyAction::SetNull))
                .take()
            ).await?;

        manager
            .create_index(Index::create()
                .name("idx-attendance-employee-date")
                .table(Attendance::Table)
                .col(Attendance::EmployeeId)
                .col(Attendance::Date)
                .take()
            ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Attendance::Table.into_iden(),
            Payroll::Table.into_iden(),
            Employee::Table.into_iden(),
            User::Table.into_iden(),
        ] {
            manager
                .drop_table(TableDropStatement::new()
                    .table(table)
                    .take()
                ).await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum User {
    Table,
    Email,
    Name,
    Password,
    Role,
}

#[derive(DeriveIden)]
pub(crate) enum Employee {
    Table,
    Name,
    Email,
    EmployeeCode,
    Department,
    Position,
    JoiningDate,
    Salary,
    Status,
    BankName,
    AccountNumber,
    AccountHolderName,
    IfscCode,
}

#[derive(DeriveIden)]
enum Payroll {
    Table,
    EmployeeId,
    Month,
    Year,
    EmployeeDetails,
    OriginalSalary,
    BasicSalary,
    Allowances,
    Deductions,
    LeaveDeduction,
    Overtime,
    Bonus,
    BonusDetails,
    AttendanceSummary,
    GrossSalary,
    TotalDeductions,
    NetSalary,
    PaymentStatus,
    PaymentMethod,
    PaymentDate,
    Remarks,
    ManuallyEdited,
    IsAutoGenerated,
    LastCalculated,
    CreatedBy,
}

#[derive(DeriveIden)]
enum Attendance {
    Table,
    EmployeeId,
    Date,
    Status,
    OvertimeHours,
    OvertimeRate,
    PayrollMonth,
    PayrollYear,
    PayrollId,
}
