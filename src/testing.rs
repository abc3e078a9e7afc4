//! Fixtures shared by the test modules

use chrono::{Local, NaiveDate};
use sea_orm::{ActiveModelTrait as _, ConnectOptions, Database, DatabaseConnection, IntoActiveModel as _};
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use crate::entity::{
    attendance, employee, user,
    sea_orm_active_enums::{AttendanceStatus, EmployeeStatus, RoleType},
};

/// Fresh SQLite database with the real schema applied.
///
/// Every in-memory connection is its own database, so the pool holds one.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await.expect("Unable to open in-memory database");

    <migration::Migrator as migration::MigratorTrait>::up(&db, None).await
        .expect("Unable to migrate in-memory database");

    db
}

pub fn employee_fixture(name: &str, salary: f64, joined: (i32, u32, u32)) -> employee::Model {
    let id = Uuid::new_v4();
    let tag = &id.simple().to_string()[..8];

    employee::Model {
        id,
        created_at: Local::now().into(),
        updated_at: Local::now().into(),
        name: name.to_string(),
        email: format!("{}.{tag}@factory.local", name.to_lowercase()),
        employee_code: format!("EMP-{tag}"),
        department: "Production".to_string(),
        position: "Machine Operator".to_string(),
        joining_date: NaiveDate::from_ymd_opt(joined.0, joined.1, joined.2).expect("valid joining date"),
        salary,
        status: EmployeeStatus::Active,
        bank_name: None,
        account_number: None,
        account_holder_name: None,
        ifsc_code: None,
    }
}

pub fn attendance_fixture(employee: &employee::Model, date: NaiveDate, status: AttendanceStatus) -> attendance::Model {
    attendance::Model {
        id: Uuid::new_v4(),
        created_at: Local::now().into(),
        updated_at: Local::now().into(),
        employee_id: employee.id,
        date,
        status,
        overtime_hours: None,
        overtime_rate: None,
        payroll_month: None,
        payroll_year: None,
        payroll_id: None,
    }
}

/// User whose password is `secret`
pub fn user_fixture(email: &str, role: RoleType) -> user::Model {
    user::Model {
        id: Uuid::new_v4(),
        created_at: Local::now().into(),
        updated_at: Local::now().into(),
        email: email.to_string(),
        name: email.split('@').next().unwrap_or_default().to_string(),
        password: Sha256::digest(format!("secret:{email}")).to_vec(),
        role,
    }
}

pub async fn insert_employee(db: &DatabaseConnection, employee: employee::Model) -> employee::Model {
    employee.into_active_model().reset_all().insert(db).await.expect("Unable to insert employee")
}

pub async fn insert_attendance(db: &DatabaseConnection, attendance: attendance::Model) -> attendance::Model {
    attendance.into_active_model().reset_all().insert(db).await.expect("Unable to insert attendance")
}

pub async fn insert_user(db: &DatabaseConnection, user: user::Model) -> user::Model {
    user.into_active_model().reset_all().insert(db).await.expect("Unable to insert user")
}
