pub use super::attendance::Entity as Attendance;
pub use super::employee::Entity as Employee;
pub use super::payroll::Entity as Payroll;
pub use super::user::Entity as User;
