use std::{collections::HashSet, str::FromStr};

use actix_web::{delete, dev, get, http::StatusCode, post, put, web, FromRequest, HttpRequest, HttpResponse, Responder};
use chrono::{Datelike, NaiveDate};
use futures_util::future::{join_all, LocalBoxFuture};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{Admin, Privileged},
    clock::Clock,
    consts::SUMMARY_YEARS,
    entity::{
        employee, payroll, prelude::*, user,
        sea_orm_active_enums::{EmployeeStatus, PaymentStatus},
    },
    payroll::{
        analytics::{aggregate, summarize},
        bonus::{assign_bulk_bonus, set_bonus, BonusAssignment, BonusKind},
        edit::{delete_payroll, update_payroll, PayrollPatch},
        generate::{generate_bulk, generate_payroll},
        payment::{parse_payment_status, update_payment_status, PaymentUpdate},
        reconcile::has_joined,
        sync::{recalculate_payroll, sync_all, sync_employee_payroll, sync_payroll, validate_period},
        tax::{calculate_tax, compare_regimes, FinancialYear},
        BatchItemResult, PayrollError, PayrollResult,
    },
    utils::{month_index, month_index_of},
};

use super::Envelope;

use extractor::UnpaidPayroll;
use model::*;

mod extractor;
mod model;

pub(super) fn config(cfg: &mut web::ServiceConfig) {
    // Fixed paths first, `/{payroll_id}` would swallow them
    cfg
        .service(list_payrolls)
        .service(get_summary)
        .service(get_reports)
        .service(generate)
        .service(generate_for_all)
        .service(calculate_tax_breakdown)
        .service(manage_bonus)
        .service(manage_bulk_bonus)
        .service(update_payment_statuses)
        .service(get_payroll)
        .service(update_fields)
        .service(update_single_payment_status)
        .service(recalculate)
        .service(remove_payroll);
}

/// Employee record of a login, matched by email
async fn employee_of(db: &DatabaseConnection, user: &user::Model) -> Result<Option<employee::Model>, DbErr> {
    Employee::find()
        .filter(employee::Column::Email.eq(&user.email))
        .one(db).await
}

/// Admins and managers reach every payroll, users only their own
async fn ensure_own(db: &DatabaseConnection, user: &user::Model, payroll: &payroll::Model, message: &str) -> PayrollResult<()> {
    if user.is_privileged() {
        return Ok(())
    }

    match employee_of(db, user).await? {
        Some(employee) if employee.id == payroll.employee_id => Ok(()),
        _ => Err(PayrollError::forbidden(message)),
    }
}

#[get("")]
async fn list_payrolls(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    user: user::Model,
    query: web::Query<ListQuery>,
) -> PayrollResult<HttpResponse> {
    let db = db.get_ref();
    let today = clock.today();

    let month = query.month.unwrap_or(today.month());
    let year = query.year.unwrap_or(today.year());
    validate_period(month, year)?;

    let employees = match query.employee_id {
        Some(employee_id) => Employee::find_by_id(employee_id).all(db).await?,
        None => Employee::find().all(db).await?,
    };

    let employees = employees.into_iter()
        .filter(|employee| has_joined(employee, month, year))
        .collect::<Vec<_>>();

    sync_all(db, clock.get_ref(), &employees, month, year).await;

    let mut select = Payroll::find()
        .filter(payroll::Column::Month.eq(month as i32))
        .filter(payroll::Column::Year.eq(year));

    if let Some(employee_id) = query.employee_id {
        select = select.filter(payroll::Column::EmployeeId.eq(employee_id));
    }

    if let Some(status) = query.status {
        select = select.filter(payroll::Column::PaymentStatus.eq(status));
    }

    if !user.is_privileged() {
        // Without a matching employee record nothing is visible
        let own = employee_of(db, &user).await?.map(|employee| employee.id).unwrap_or(Uuid::nil());
        select = select.filter(payroll::Column::EmployeeId.eq(own));
    }

    let joined = employees.iter().map(|employee| employee.id).collect::<HashSet<_>>();

    let mut payrolls = select.all(db).await?.into_iter()
        .filter(|payroll| joined.contains(&payroll.employee_id))
        .collect::<Vec<_>>();

    payrolls.sort_by(|a, b| a.employee_details.name.cmp(&b.employee_details.name));

    Ok(HttpResponse::Ok().json(Envelope::data(PayrollList {
        count: payrolls.len(),
        month,
        year,
        last_calculated: clock.now(),
        payrolls,
    })))
}

#[get("/{payroll_id}")]
async fn get_payroll(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    user: user::Model,
    payroll: payroll::Model,
) -> PayrollResult<HttpResponse> {
    ensure_own(&db, &user, &payroll, "Access denied: You can only view your own payroll records").await?;

    let synced = sync_payroll(db.get_ref(), clock.get_ref(), payroll.employee_id, payroll.month as u32, payroll.year).await?;

    Ok(match synced {
        Some(synced) => HttpResponse::Ok().json(Envelope::data(synced)),
        None => HttpResponse::Ok().json(
            Envelope::data(payroll).message("Could not process payroll for this period")
        ),
    })
}

#[post("/generate")]
async fn generate(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    user: user::Model,
    payload: web::Json<GeneratePayroll>,
) -> PayrollResult<HttpResponse> {
    let GeneratePayroll { employee_id: Some(employee_id), month: Some(month), year: Some(year) } = *payload else {
        return Err(PayrollError::validation("Employee ID, month, and year are required"))
    };

    let payroll = generate_payroll(db.get_ref(), clock.get_ref(), employee_id, month, year, Some(user.id)).await?;

    Ok(HttpResponse::Created().json(Envelope::data(payroll).message("Payroll generated successfully")))
}

#[post("/generate/bulk")]
async fn generate_for_all(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    admin: Admin,
    payload: web::Json<PayPeriodPayload>,
) -> PayrollResult<HttpResponse> {
    let PayPeriodPayload { month: Some(month), year: Some(year) } = *payload else {
        return Err(PayrollError::validation("Month and year are required"))
    };

    let bulk = generate_bulk(db.get_ref(), clock.get_ref(), month, year, Some(admin.id)).await?;

    let message = format!("Generated {} payrolls successfully", bulk.processed);

    Ok(Envelope::batch(StatusCode::CREATED, bulk.all_succeeded(), message, bulk))
}

async fn update_one_payment_status(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    payroll_id: &str,
    update: &PaymentUpdate,
) -> PayrollResult<payroll::Model> {
    let payroll_id = Uuid::from_str(payroll_id)
        .map_err(|_| PayrollError::validation("Invalid payroll ID format"))?;

    let payroll = Payroll::find_by_id(payroll_id)
        .one(db).await?
        .ok_or(PayrollError::NotFound("Payroll"))?;

    update_payment_status(db, clock, payroll, update).await
}

#[put("/payment-status")]
async fn update_payment_statuses(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    _admin: Admin,
    payload: web::Json<BatchPaymentUpdate>,
) -> PayrollResult<HttpResponse> {
    if payload.payroll_ids.is_empty() {
        return Err(PayrollError::validation("No payroll IDs provided"))
    }

    match payload.update.payment_status.as_deref() {
        Some(status) if !status.is_empty() => parse_payment_status(status)?,
        _ => return Err(PayrollError::validation("Payment status is required")),
    };

    let outcomes = join_all(
        payload.payroll_ids.iter().map(|payroll_id|
            update_one_payment_status(&db, clock.get_ref(), payroll_id, &payload.update)
        )
    ).await;

    let results = payload.payroll_ids.iter().zip(outcomes)
        .map(|(payroll_id, outcome)| match outcome {
            Ok(_) => BatchItemResult::succeeded(payroll_id),
            Err(err) => {
                warn!(payroll = %payroll_id, %err, "unable to update payment status");
                BatchItemResult::failed(payroll_id, &err)
            }
        })
        .collect::<Vec<_>>();

    let updated = results.iter().filter(|result| result.success).count();
    let all_succeeded = updated == results.len();

    let message = if all_succeeded {
        format!("Successfully updated {updated} payroll records")
    } else {
        format!("Updated {updated} out of {} payroll records", results.len())
    };

    Ok(Envelope::batch(StatusCode::OK, all_succeeded, message, results))
}

#[put("/{payroll_id}/payment-status")]
async fn update_single_payment_status(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    _user: Privileged,
    payroll: payroll::Model,
    payload: web::Json<PaymentUpdate>,
) -> PayrollResult<HttpResponse> {
    let payroll = update_payment_status(db.get_ref(), clock.get_ref(), payroll, &payload).await?;

    Ok(HttpResponse::Ok().json(Envelope::data(payroll).message("Payment status updated successfully")))
}

#[put("/{payroll_id}")]
async fn update_fields(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    user: user::Model,
    payroll: payroll::Model,
    payload: web::Json<PayrollPatch>,
) -> PayrollResult<HttpResponse> {
    if !user.is_privileged() {
        ensure_own(&db, &user, &payroll, "Access denied: You can only update your own payroll records").await?;

        if let Some(status) = payload.payment_status.as_deref().filter(|status| !status.is_empty()) {
            if parse_payment_status(status)? != payroll.payment_status {
                return Err(PayrollError::forbidden("Access denied: You cannot change payment status"))
            }
        }
    }

    let payroll = update_payroll(db.get_ref(), clock.get_ref(), payroll, &payload).await?;

    Ok(HttpResponse::Ok().json(Envelope::data(payroll).message("Payroll updated successfully")))
}

#[delete("/{payroll_id}")]
async fn remove_payroll(db: web::Data<DatabaseConnection>, _admin: Admin, payroll: UnpaidPayroll) -> PayrollResult<impl Responder> {
    delete_payroll(db.get_ref(), &payroll).await?;

    Ok(web::Json(Envelope::done("Payroll deleted successfully")))
}

#[post("/{payroll_id}/recalculate")]
async fn recalculate(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    _user: Privileged,
    payroll: payroll::Model,
) -> PayrollResult<HttpResponse> {
    let payroll = recalculate_payroll(db.get_ref(), clock.get_ref(), payroll).await?;

    Ok(HttpResponse::Ok().json(Envelope::data(payroll).message("Payroll recalculated successfully")))
}

#[get("/summary")]
async fn get_summary(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    _user: user::Model,
    query: web::Query<SummaryQuery>,
) -> PayrollResult<HttpResponse> {
    let db = db.get_ref();

    let (Some(month), Some(year)) = (
        query.month.as_deref().filter(|month| !month.is_empty()),
        query.year.as_deref().filter(|year| !year.is_empty()),
    ) else {
        return Err(PayrollError::validation("Month and year are required"))
    };

    let month = month.trim().parse::<u32>().ok()
        .filter(|month| (1..=12).contains(month))
        .ok_or_else(|| PayrollError::validation("Invalid month format. Month must be between 1-12."))?;

    let year = year.trim().parse::<i32>().ok()
        .filter(|year| SUMMARY_YEARS.contains(year))
        .ok_or_else(|| PayrollError::validation(format!(
            "Invalid year format. Year must be between {}-{}.", SUMMARY_YEARS.start(), SUMMARY_YEARS.end()
        )))?;

    // One at a time, a failing employee only drops out of the figures
    for employee in Employee::find().all(db).await? {
        if let Err(err) = sync_employee_payroll(db, clock.get_ref(), &employee, month, year).await {
            warn!(employee = %employee.id, month, year, %err, "unable to sync payroll for summary");
        }
    }

    let active_employees = Employee::find()
        .filter(employee::Column::Status.eq(EmployeeStatus::Active))
        .count(db).await?;

    let payrolls = Payroll::find()
        .filter(payroll::Column::Month.eq(month as i32))
        .filter(payroll::Column::Year.eq(year))
        .all(db).await?;

    Ok(HttpResponse::Ok().json(Envelope::data(summarize(&payrolls, active_employees, month, year))))
}

#[get("/reports")]
async fn get_reports(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    _user: user::Model,
    query: web::Query<ReportQuery>,
) -> PayrollResult<HttpResponse> {
    let today = clock.today();

    let start_date = query.start_date
        .or_else(|| NaiveDate::from_ymd_opt(today.year(), 1, 1))
        .unwrap_or(today);
    let end_date = query.end_date.unwrap_or(today);

    if start_date > end_date {
        return Err(PayrollError::validation("start_date must not be after end_date"))
    }

    let months = month_index_of(start_date)..=month_index_of(end_date);

    let departments = query.departments.as_deref().map(|departments|
        departments.split(',')
            .map(str::trim)
            .filter(|department| !department.is_empty())
            .collect::<Vec<_>>()
    );

    let payrolls = Payroll::find()
        .filter(payroll::Column::Year.between(start_date.year(), end_date.year()))
        .order_by_asc(payroll::Column::Year)
        .order_by_asc(payroll::Column::Month)
        .all(db.get_ref()).await?
        .into_iter()
        .filter(|payroll| months.contains(&month_index(payroll.month as u32, payroll.year)))
        .filter(|payroll| departments.as_ref()
            .is_none_or(|departments| departments.contains(&payroll.employee_details.department.as_str()))
        )
        .collect::<Vec<_>>();

    let analytics = aggregate(&payrolls);

    let payrolls = if query.format.as_deref() == Some("detailed") {
        ReportRows::Detailed(payrolls)
    } else {
        ReportRows::Compact(payrolls.into_iter().map(CompactPayroll::from).collect())
    };

    Ok(HttpResponse::Ok().json(Envelope::data(PayrollReport {
        period: ReportPeriod { start_date, end_date },
        analytics,
        payrolls,
    })))
}

#[post("/tax")]
async fn calculate_tax_breakdown(
    db: web::Data<DatabaseConnection>,
    _user: user::Model,
    payload: web::Json<TaxRequest>,
) -> PayrollResult<HttpResponse> {
    let (Some(employee_id), Some(financial_year)) = (
        payload.employee_id,
        payload.financial_year.as_deref().filter(|year| !year.is_empty()),
    ) else {
        return Err(PayrollError::validation("Employee ID and financial year are required"))
    };

    FinancialYear::from_str(financial_year)?;

    let employee = Employee::find_by_id(employee_id)
        .one(db.get_ref()).await?
        .ok_or(PayrollError::NotFound("Employee"))?;

    let income = payload.income.unwrap_or(employee.salary * 12.0);
    if income < 0.0 {
        return Err(PayrollError::validation("Income must not be negative"))
    }

    let breakdown = calculate_tax(income, &payload.deductions, payload.tax_regime);
    let comparison = compare_regimes(income, &payload.deductions, &breakdown);

    Ok(HttpResponse::Ok().json(Envelope::data(TaxReport {
        employee: TaxEmployee {
            name: employee.name,
            employee_code: employee.employee_code,
            department: employee.department,
            position: employee.position,
        },
        financial_year: financial_year.to_string(),
        regime_description: payload.tax_regime.description(),
        breakdown,
        comparison,
    })))
}

#[post("/bonus")]
async fn manage_bonus(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    _user: Privileged,
    payload: web::Json<BonusRequest>,
) -> PayrollResult<HttpResponse> {
    let Some(payroll_id) = payload.payroll_id.as_deref().filter(|id| !id.is_empty()) else {
        return Err(PayrollError::validation("Payroll ID is required"))
    };
    let payroll_id = Uuid::from_str(payroll_id)
        .map_err(|_| PayrollError::validation("Invalid payroll ID format"))?;

    let payroll = Payroll::find_by_id(payroll_id)
        .one(db.get_ref()).await?
        .ok_or(PayrollError::NotFound("Payroll"))?;

    let payroll = set_bonus(
        db.get_ref(), clock.get_ref(), payroll, &payload.bonus_details, payload.description.as_deref()
    ).await?;

    Ok(HttpResponse::Ok().json(Envelope::data(payroll).message("Bonus and incentives updated successfully")))
}

#[post("/bonus/bulk")]
async fn manage_bulk_bonus(
    db: web::Data<DatabaseConnection>,
    clock: web::Data<dyn Clock>,
    _user: Privileged,
    payload: web::Json<BulkBonusRequest>,
) -> PayrollResult<HttpResponse> {
    if payload.employees.is_empty() {
        return Err(PayrollError::validation("Employees array is required"))
    }

    let (Some(kind), Some(amount)) = (
        payload.bonus_type.as_deref().filter(|kind| !kind.is_empty()),
        payload.bonus_amount.filter(|amount| *amount != 0.0),
    ) else {
        return Err(PayrollError::validation("Bonus type and amount are required"))
    };

    let today = clock.today();

    let assignment = BonusAssignment {
        kind: kind.parse::<BonusKind>()?,
        amount,
        description: payload.description.clone(),
        month: payload.month.unwrap_or(today.month()),
        year: payload.year.unwrap_or(today.year()),
    };

    let bulk = assign_bulk_bonus(db.get_ref(), clock.get_ref(), &payload.employees, &assignment).await?;

    let message = format!("Processed bonus for {} employees ({} failed)", bulk.success.len(), bulk.failed.len());

    Ok(Envelope::batch(StatusCode::OK, bulk.failed.is_empty(), message, bulk))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::Method, test, App};
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    use crate::{
        auth::Authority,
        clock::FixedClock,
        entity::sea_orm_active_enums::RoleType,
        testing::{employee_fixture, insert_employee, insert_user, setup_db, user_fixture},
    };

    use super::*;

    const SECRET: &[u8] = b"secret";

    macro_rules! init_app {
        ($data:expr) => {
            test::init_service(
                App::new()
                    .app_data($data.clone())
                    .app_data(web::Data::new(Authority::new(SECRET)))
                    .app_data(web::Data::from(Arc::new(FixedClock::on(2025, 6, 18).unwrap()) as Arc<dyn Clock>))
                    .service(web::scope("/payroll").configure(config))
            ).await
        };
    }

    fn bearer(user: &user::Model) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", Authority::new(SECRET).issue_for(user).unwrap()))
    }

    #[actix_web::test]
    async fn test_list_is_scoped_by_role() {
        let data = web::Data::new(setup_db().await);
        let db = data.get_ref();
        let app = init_app!(data);

        let asha = insert_employee(db, employee_fixture("Asha", 24_000.0, (2024, 1, 1))).await;
        let bala = insert_employee(db, employee_fixture("Bala", 30_000.0, (2024, 1, 1))).await;
        // Joined after April, left out of the list
        insert_employee(db, employee_fixture("Chitra", 18_000.0, (2025, 5, 10))).await;

        let admin = user_fixture("admin@factory.local", RoleType::Admin);
        let worker = user_fixture(&asha.email, RoleType::User);

        let req = test::TestRequest::default()
            .uri("/payroll?month=4&year=2025")
            .insert_header(bearer(&admin))
            .to_request();

        let response: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(response["data"]["count"], 2);
        assert_eq!(response["data"]["payrolls"][0]["employee_details"]["name"], "Asha");
        assert_eq!(response["data"]["payrolls"][1]["employee_details"]["name"], "Bala");

        let req = test::TestRequest::default()
            .uri("/payroll?month=4&year=2025")
            .insert_header(bearer(&worker))
            .to_request();

        let response: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(response["data"]["count"], 1);
        assert_eq!(response["data"]["payrolls"][0]["employee_id"], json!(asha.id));

        let other = Payroll::find()
            .filter(payroll::Column::EmployeeId.eq(bala.id))
            .one(db).await.unwrap().unwrap();

        let req = test::TestRequest::default()
            .uri(&format!("/payroll/{}", other.id))
            .insert_header(bearer(&worker))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::default()
            .uri("/payroll?month=4&year=2025")
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_worker_cannot_change_status() {
        let data = web::Data::new(setup_db().await);
        let db = data.get_ref();
        let app = init_app!(data);

        let asha = insert_employee(db, employee_fixture("Asha", 24_000.0, (2024, 1, 1))).await;
        let worker = user_fixture(&asha.email, RoleType::User);

        let payroll = sync_payroll(db, &FixedClock::on(2025, 6, 18).unwrap(), asha.id, 4, 2025).await
            .unwrap().unwrap();

        let req = test::TestRequest::default()
            .uri(&format!("/payroll/{}", payroll.id))
            .method(Method::PUT)
            .insert_header(bearer(&worker))
            .set_json(json!({ "payment_status": "Paid" }))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::default()
            .uri(&format!("/payroll/{}", payroll.id))
            .method(Method::PUT)
            .insert_header(bearer(&worker))
            .set_json(json!({ "remarks": "checked" }))
            .to_request();

        let response: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(response["message"], "Payroll updated successfully");
        assert_eq!(response["data"]["remarks"], "checked");
        assert_eq!(response["data"]["manually_edited"], true);
    }

    #[actix_web::test]
    async fn test_summary_validation() {
        let data = web::Data::new(setup_db().await);
        let db = data.get_ref();
        let app = init_app!(data);

        let manager = user_fixture("manager@factory.local", RoleType::Manager);
        insert_employee(db, employee_fixture("Asha", 24_000.0, (2024, 1, 1))).await;

        for (uri, message) in [
            ("/payroll/summary?month=4", "Month and year are required"),
            ("/payroll/summary?month=13&year=2025", "Invalid month format. Month must be between 1-12."),
            ("/payroll/summary?month=4&year=1999", "Invalid year format. Year must be between 2020-2100."),
        ] {
            let req = test::TestRequest::default()
                .uri(uri)
                .insert_header(bearer(&manager))
                .to_request();

            let response = test::call_service(&app, req).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");

            let body: Value = test::read_body_json(response).await;
            assert_eq!(body["message"], message);
        }

        let req = test::TestRequest::default()
            .uri("/payroll/summary?month=4&year=2025")
            .insert_header(bearer(&manager))
            .to_request();

        let response: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["total_employees"], 1);
    }

    #[actix_web::test]
    async fn test_generate() {
        let data = web::Data::new(setup_db().await);
        let db = data.get_ref();
        let app = init_app!(data);

        let admin = insert_user(db, user_fixture("admin@factory.local", RoleType::Admin)).await;
        let asha = insert_employee(db, employee_fixture("Asha", 24_000.0, (2024, 1, 1))).await;
        let late = insert_employee(db, employee_fixture("Chitra", 18_000.0, (2025, 5, 10))).await;

        let generate_request = |employee_id: Uuid| test::TestRequest::default()
            .uri("/payroll/generate")
            .method(Method::POST)
            .insert_header(bearer(&admin))
            .set_json(json!({ "employee_id": employee_id, "month": 4, "year": 2025 }))
            .to_request();

        let response = test::call_service(&app, generate_request(asha.id)).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["data"]["created_by"], json!(admin.id));

        let response = test::call_service(&app, generate_request(asha.id)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test::call_service(&app, generate_request(late.id)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::default()
            .uri("/payroll/generate")
            .method(Method::POST)
            .insert_header(bearer(&admin))
            .set_json(json!({ "month": 4, "year": 2025 }))
            .to_request();

        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["message"], "Employee ID, month, and year are required");
    }

    #[actix_web::test]
    async fn test_generate_bulk_requires_admin() {
        let data = web::Data::new(setup_db().await);
        let db = data.get_ref();
        let app = init_app!(data);

        let admin = insert_user(db, user_fixture("admin@factory.local", RoleType::Admin)).await;
        let manager = user_fixture("manager@factory.local", RoleType::Manager);

        insert_employee(db, employee_fixture("Asha", 24_000.0, (2024, 1, 1))).await;
        insert_employee(db, employee_fixture("Bala", 30_000.0, (2024, 1, 1))).await;

        let bulk_request = |user: &user::Model| test::TestRequest::default()
            .uri("/payroll/generate/bulk")
            .method(Method::POST)
            .insert_header(bearer(user))
            .set_json(json!({ "month": 5, "year": 2025 }))
            .to_request();

        let response = test::call_service(&app, bulk_request(&manager)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = test::call_service(&app, bulk_request(&admin)).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Generated 2 payrolls successfully");
        assert_eq!(body["data"]["processed"], 2);
    }

    #[actix_web::test]
    async fn test_batch_payment_status() {
        let data = web::Data::new(setup_db().await);
        let db = data.get_ref();
        let app = init_app!(data);
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let admin = user_fixture("admin@factory.local", RoleType::Admin);
        let asha = insert_employee(db, employee_fixture("Asha", 24_000.0, (2024, 1, 1))).await;
        let payroll = sync_payroll(db, &clock, asha.id, 4, 2025).await.unwrap().unwrap();

        let req = test::TestRequest::default()
            .uri("/payroll/payment-status")
            .method(Method::PUT)
            .insert_header(bearer(&admin))
            .set_json(json!({ "payroll_ids": [payroll.id, Uuid::new_v4()], "payment_status": "Paid" }))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);

        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Updated 1 out of 2 payroll records");
        assert_eq!(body["data"][0]["success"], true);
        assert_eq!(body["data"][1]["message"], "Payroll not found");

        let paid = Payroll::find_by_id(payroll.id).one(db).await.unwrap().unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert!(paid.payment_date.is_some());

        let req = test::TestRequest::default()
            .uri(&format!("/payroll/{}", payroll.id))
            .method(Method::DELETE)
            .insert_header(bearer(&admin))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(Payroll::find_by_id(payroll.id).one(db).await.unwrap().is_some());

        let req = test::TestRequest::default()
            .uri("/payroll/payment-status")
            .method(Method::PUT)
            .insert_header(bearer(&admin))
            .set_json(json!({ "payroll_ids": [payroll.id], "payment_status": "Settled" }))
            .to_request();

        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["message"], "Invalid payment status");
    }

    #[actix_web::test]
    async fn test_delete_and_recalculate() {
        let data = web::Data::new(setup_db().await);
        let db = data.get_ref();
        let app = init_app!(data);
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let admin = user_fixture("admin@factory.local", RoleType::Admin);
        let manager = user_fixture("manager@factory.local", RoleType::Manager);
        let asha = insert_employee(db, employee_fixture("Asha", 24_000.0, (2024, 1, 1))).await;
        let payroll = sync_payroll(db, &clock, asha.id, 4, 2025).await.unwrap().unwrap();

        let req = test::TestRequest::default()
            .uri(&format!("/payroll/{}/recalculate", payroll.id))
            .method(Method::POST)
            .insert_header(bearer(&manager))
            .to_request();

        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Payroll recalculated successfully");
        assert_eq!(body["data"]["manually_edited"], false);

        let delete_request = |user: &user::Model| test::TestRequest::default()
            .uri(&format!("/payroll/{}", payroll.id))
            .method(Method::DELETE)
            .insert_header(bearer(user))
            .to_request();

        let response = test::call_service(&app, delete_request(&manager)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body: Value = test::call_and_read_body_json(&app, delete_request(&admin)).await;
        assert_eq!(body["message"], "Payroll deleted successfully");
        assert!(Payroll::find_by_id(payroll.id).one(db).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_bulk_bonus() {
        let data = web::Data::new(setup_db().await);
        let db = data.get_ref();
        let app = init_app!(data);

        let manager = user_fixture("manager@factory.local", RoleType::Manager);
        let asha = insert_employee(db, employee_fixture("Asha", 24_000.0, (2024, 1, 1))).await;
        let stranger = Uuid::new_v4();

        let req = test::TestRequest::default()
            .uri("/payroll/bonus/bulk")
            .method(Method::POST)
            .insert_header(bearer(&manager))
            .set_json(json!({
                "employees": [asha.id, stranger],
                "bonus_type": "festival_bonus",
                "bonus_amount": 2500.0,
                "description": "Diwali",
                "month": 5,
                "year": 2025,
            }))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::MULTI_STATUS);

        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Processed bonus for 1 employees (1 failed)");
        assert_eq!(body["data"]["success"][0]["total_bonus"], 2500.0);
        assert_eq!(body["data"]["failed"][0]["employee_id"], json!(stranger));

        let req = test::TestRequest::default()
            .uri("/payroll/bonus/bulk")
            .method(Method::POST)
            .insert_header(bearer(&manager))
            .set_json(json!({ "employees": [asha.id], "bonus_type": "lottery", "bonus_amount": 10.0 }))
            .to_request();

        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["message"], "Invalid bonus type");
    }

    #[actix_web::test]
    async fn test_reports() {
        let data = web::Data::new(setup_db().await);
        let db = data.get_ref();
        let app = init_app!(data);
        let clock = FixedClock::on(2025, 6, 18).unwrap();

        let manager = user_fixture("manager@factory.local", RoleType::Manager);
        let asha = insert_employee(db, employee_fixture("Asha", 24_000.0, (2024, 1, 1))).await;

        for month in [3, 4] {
            sync_payroll(db, &clock, asha.id, month, 2025).await.unwrap().unwrap();
        }
        // Outside the requested range
        sync_payroll(db, &clock, asha.id, 12, 2024).await.unwrap().unwrap();

        let req = test::TestRequest::default()
            .uri("/payroll/reports?start_date=2025-01-01&end_date=2025-04-30&departments=Production")
            .insert_header(bearer(&manager))
            .to_request();

        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["period"]["start_date"], "2025-01-01");
        assert_eq!(body["data"]["payrolls"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["payrolls"][0]["month"], 3);
        assert!(body["data"]["payrolls"][0].get("allowances").is_none());

        let req = test::TestRequest::default()
            .uri("/payroll/reports?start_date=2025-01-01&end_date=2025-04-30&departments=Packing")
            .insert_header(bearer(&manager))
            .to_request();

        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"]["payrolls"].as_array().unwrap().is_empty());

        let req = test::TestRequest::default()
            .uri("/payroll/reports?start_date=2025-05-01&end_date=2025-04-30")
            .insert_header(bearer(&manager))
            .to_request();

        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_tax() {
        let data = web::Data::new(setup_db().await);
        let db = data.get_ref();
        let app = init_app!(data);

        let manager = user_fixture("manager@factory.local", RoleType::Manager);
        let asha = insert_employee(db, employee_fixture("Asha", 50_000.0, (2024, 1, 1))).await;

        let tax_request = |payload: Value| test::TestRequest::default()
            .uri("/payroll/tax")
            .method(Method::POST)
            .insert_header(bearer(&manager))
            .set_json(payload)
            .to_request();

        let body: Value = test::call_and_read_body_json(&app, tax_request(json!({
            "employee_id": asha.id,
            "financial_year": "2025-2026",
        }))).await;
        assert_eq!(body["data"]["financial_year"], "2025-2026");
        assert_eq!(body["data"]["employee"]["name"], "Asha");
        assert!(body["data"]["comparison"].is_object());

        let response = test::call_service(&app, tax_request(json!({
            "employee_id": asha.id,
            "financial_year": "2025-2027",
        }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test::call_service(&app, tax_request(json!({
            "employee_id": Uuid::new_v4(),
            "financial_year": "2025-2026",
        }))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(test::call_service(&app, tax_request(json!({ "employee_id": asha.id }))).await).await;
        assert_eq!(body["message"], "Employee ID and financial year are required");
    }

    #[actix_web::test]
    async fn test_report_query_dates() {
        let query = web::Query::<ReportQuery>::from_query("start_date=2025-01-01&format=detailed").unwrap();

        assert_eq!(query.start_date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert!(query.end_date.is_none());
        assert_eq!(query.format.as_deref(), Some("detailed"));
    }
}
