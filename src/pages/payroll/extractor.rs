use std::ops::Deref;

use super::*;

impl FromRequest for payroll::Model {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let Some(payroll_id) = req.match_info().get("payroll_id") else {
                return Err(PayrollError::validation("Payroll ID is required").into())
            };
            let Ok(payroll_id) = Uuid::from_str(payroll_id) else {
                return Err(PayrollError::validation("Invalid payroll ID format").into())
            };

            let Some(db) = req.app_data::<web::Data<DatabaseConnection>>() else {
                return Err(actix_web::error::ErrorInternalServerError("database is not configured"))
            };

            let payroll = Payroll::find_by_id(payroll_id)
                .one(db.get_ref()).await
                .map_err(PayrollError::from)?
                .ok_or(PayrollError::NotFound("Payroll"))?;

            Ok(payroll)
        })
    }
}

/// Payroll that has not been paid out yet
pub(super) struct UnpaidPayroll(pub(super) payroll::Model);

impl Deref for UnpaidPayroll {
    type Target = payroll::Model;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for UnpaidPayroll {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let payroll = payroll::Model::from_request(&req, &mut dev::Payload::None).await?;

            if payroll.is_paid() {
                return Err(PayrollError::conflict("Payroll has already been paid").into());
            }

            Ok(Self(payroll))
        })
    }
}
