use crate::entity::{employee, payroll::{BankDetails, EmployeeDetails}};

impl From<&employee::Model> for EmployeeDetails {
    /// Copies the employee's current profile, never a live reference
    fn from(employee: &employee::Model) -> Self {
        Self {
            name: employee.name.clone(),
            employee_code: employee.employee_code.clone(),
            department: employee.department.clone(),
            position: employee.position.clone(),
            joining_date: employee.joining_date,
            bank_details: BankDetails {
                bank_name: employee.bank_name.clone().unwrap_or_default(),
                account_number: employee.account_number.clone().unwrap_or_default(),
                account_holder_name: employee.account_holder_name.clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| employee.name.clone()),
                ifsc_code: employee.ifsc_code.clone().unwrap_or_default(),
            },
        }
    }
}
