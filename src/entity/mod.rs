pub mod prelude;

pub mod attendance;
pub mod employee;
pub mod payroll;
pub mod sea_orm_active_enums;
pub mod user;
