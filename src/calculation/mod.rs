//! Salary calculation for the payroll engine.
//!
//! Each rule lives in its own module and returns its result together with
//! an [`AuditStep`](crate::models::AuditStep). [`SalaryCalculator`] runs the
//! rules in order: gross salary, daily rate, working-hours penalty, unpaid
//! leave, manual penalties, tax, insurance, refunds, leave valuation and
//! net pay.

mod brackets;
mod calculator;
mod daily_rate;
mod gross;
mod leave_valuation;
mod manual_penalties;
mod refunds;
mod rounding;
mod unpaid_leave;
mod working_hours;

pub use brackets::{
    BracketSlice, InsuranceResult, TaxResult, apply_brackets, calculate_insurance, calculate_tax,
};
pub use calculator::{SalaryCalculation, SalaryCalculator};
pub use daily_rate::{DailyRateResult, calculate_daily_rate};
pub use gross::{GrossSalaryResult, calculate_gross_salary};
pub use leave_valuation::{LeaveValuationResult, value_leave};
pub use manual_penalties::{ManualPenaltiesResult, collect_manual_penalties};
pub use refunds::{RefundsResult, collect_refunds};
pub use rounding::round_money;
pub use unpaid_leave::{UnpaidLeaveResult, calculate_unpaid_leave};
pub use working_hours::{WorkingHoursPenaltyResult, calculate_working_hours_penalty};
