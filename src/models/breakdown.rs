//! Salary calculation breakdown models.
//!
//! [`SalaryCalculationBreakdown`] is the full decomposition of one
//! employee's pay for one run. It can only be built by
//! [`SalaryCalculationBreakdown::assemble`], which derives every total and
//! the display summary from the itemized lines. Deserialization goes through
//! the same derivation and rejects records whose stored totals disagree with
//! their lines.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PayrollError;

/// An itemized line that carries a monetary amount.
pub trait LineAmount {
    /// The amount this line contributes to its section total.
    fn amount(&self) -> Decimal;
}

/// A list of line items and their total.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{Itemized, ManualPenalty};
/// use rust_decimal::Decimal;
///
/// let penalties = Itemized::from_entries(vec![
///     ManualPenalty { reason: "Late".to_string(), amount: Decimal::from(50) },
///     ManualPenalty { reason: "Damage".to_string(), amount: Decimal::from(25) },
/// ]);
/// assert_eq!(penalties.total, Decimal::from(75));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itemized<T> {
    /// The listed items.
    pub entries: Vec<T>,
    /// Sum of the listed amounts.
    pub total: Decimal,
}

impl<T: LineAmount> Itemized<T> {
    /// Builds a section whose total is the sum of its entries.
    pub fn from_entries(entries: Vec<T>) -> Self {
        let total = entries.iter().map(LineAmount::amount).sum();
        Self { entries, total }
    }

    /// An empty section.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    fn rederived(self) -> Self {
        Self::from_entries(self.entries)
    }
}

/// Salary components making up gross pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryComponents {
    /// Contractual base salary for the period.
    pub base_salary: Decimal,
    /// Sum of recurring allowances.
    pub allowances: Decimal,
    /// Approved signing bonus.
    pub bonus_amount: Decimal,
    /// Approved exit benefit.
    pub exit_benefit_amount: Decimal,
    /// Sum of the four components above.
    pub gross_salary: Decimal,
}

impl SalaryComponents {
    /// Builds the components and derives gross salary.
    pub fn new(
        base_salary: Decimal,
        allowances: Decimal,
        bonus_amount: Decimal,
        exit_benefit_amount: Decimal,
    ) -> Self {
        Self {
            base_salary,
            allowances,
            bonus_amount,
            exit_benefit_amount,
            gross_salary: base_salary + allowances + bonus_amount + exit_benefit_amount,
        }
    }
}

/// A manual penalty taken from an adjustment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPenalty {
    /// Why the penalty was applied.
    pub reason: String,
    /// Penalty amount (never negative).
    pub amount: Decimal,
}

impl LineAmount for ManualPenalty {
    fn amount(&self) -> Decimal {
        self.amount
    }
}

/// A working-hours shortfall penalty for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHoursPenalty {
    /// The work day.
    pub day: NaiveDate,
    /// Minutes the employee was expected to work.
    pub expected_minutes: u32,
    /// Minutes the employee actually worked.
    pub actual_minutes: u32,
    /// Monetary penalty for the shortfall.
    pub penalty: Decimal,
}

impl LineAmount for WorkingHoursPenalty {
    fn amount(&self) -> Decimal {
        self.penalty
    }
}

/// An unpaid-leave deduction for one leave span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpaidLeaveDeduction {
    /// Unpaid days in the span.
    pub days: Decimal,
    /// Daily rate the days are valued at.
    pub daily_rate: Decimal,
    /// `days × daily_rate`.
    pub total: Decimal,
}

impl LineAmount for UnpaidLeaveDeduction {
    fn amount(&self) -> Decimal {
        self.total
    }
}

/// All penalties for the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyBreakdown {
    /// Manual penalties from adjustment records.
    pub manual: Itemized<ManualPenalty>,
    /// Working-hours shortfall penalties (non-zero days only).
    pub working_hours: Itemized<WorkingHoursPenalty>,
    /// Unpaid-leave deductions.
    pub unpaid_leave: Itemized<UnpaidLeaveDeduction>,
    /// Sum of the three section totals.
    pub total_penalties: Decimal,
}

impl PenaltyBreakdown {
    /// Builds the section and derives `total_penalties`.
    pub fn new(
        manual: Itemized<ManualPenalty>,
        working_hours: Itemized<WorkingHoursPenalty>,
        unpaid_leave: Itemized<UnpaidLeaveDeduction>,
    ) -> Self {
        let total_penalties = manual.total + working_hours.total + unpaid_leave.total;
        Self {
            manual,
            working_hours,
            unpaid_leave,
            total_penalties,
        }
    }
}

/// Tax owed on one bracket slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxDeduction {
    /// Name of the tax rule.
    pub rule_name: String,
    /// Rate applied to the slice.
    pub rate: Decimal,
    /// Tax owed on the slice.
    pub amount: Decimal,
}

impl LineAmount for TaxDeduction {
    fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Insurance owed on one bracket slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceDeduction {
    /// Name of the insurance bracket.
    pub bracket_name: String,
    /// Rate applied to the slice.
    pub rate: Decimal,
    /// Contribution owed on the slice.
    pub amount: Decimal,
}

impl LineAmount for InsuranceDeduction {
    fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Statutory deductions for the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionBreakdown {
    /// Tax per bracket.
    pub tax: Itemized<TaxDeduction>,
    /// Insurance per bracket.
    pub insurance: Itemized<InsuranceDeduction>,
    /// Tax total plus insurance total.
    pub total_deductions: Decimal,
}

impl DeductionBreakdown {
    /// Builds the section and derives `total_deductions`.
    pub fn new(tax: Itemized<TaxDeduction>, insurance: Itemized<InsuranceDeduction>) -> Self {
        let total_deductions = tax.total + insurance.total;
        Self {
            tax,
            insurance,
            total_deductions,
        }
    }
}

/// Leave taken in the period.
///
/// `total_paid_leave_value` is informational: paid leave is already inside
/// base salary and is never added again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveBreakdown {
    /// Approved paid leave days.
    pub paid_leave_days: Decimal,
    /// Approved unpaid leave days.
    pub unpaid_leave_days: Decimal,
    /// Paid leave days valued at the daily rate.
    pub total_paid_leave_value: Decimal,
}

/// A refund paid back to the employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundLine {
    /// The refund record this line consumes.
    pub refund_id: String,
    /// Where the refund came from.
    pub source: String,
    /// Refund amount.
    pub amount: Decimal,
}

impl LineAmount for RefundLine {
    fn amount(&self) -> Decimal {
        self.amount
    }
}

/// The five-number recap shown on payslips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownSummary {
    /// Gross salary.
    pub gross_salary: Decimal,
    /// Total penalties.
    pub minus_all_penalties: Decimal,
    /// Total deductions.
    pub minus_all_deductions: Decimal,
    /// Total refunds.
    pub plus_refunds: Decimal,
    /// Final payable amount.
    pub final_net_pay: Decimal,
}

/// The full salary decomposition for one employee in one run.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{
///     DeductionBreakdown, Itemized, LeaveBreakdown, PenaltyBreakdown, SalaryCalculationBreakdown,
///     SalaryComponents,
/// };
/// use rust_decimal::Decimal;
///
/// let breakdown = SalaryCalculationBreakdown::assemble(
///     SalaryComponents::new(Decimal::from(1000), Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
///     PenaltyBreakdown::new(Itemized::empty(), Itemized::empty(), Itemized::empty()),
///     DeductionBreakdown::new(Itemized::empty(), Itemized::empty()),
///     LeaveBreakdown::default(),
///     Itemized::empty(),
/// );
/// assert_eq!(breakdown.net_pay(), Decimal::from(1000));
/// assert_eq!(breakdown.summary().final_net_pay, breakdown.net_pay());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BreakdownRecord", into = "BreakdownRecord")]
pub struct SalaryCalculationBreakdown {
    salary: SalaryComponents,
    penalties: PenaltyBreakdown,
    deductions: DeductionBreakdown,
    leaves: LeaveBreakdown,
    refunds: Itemized<RefundLine>,
    net_salary: Decimal,
    net_pay: Decimal,
    summary: BreakdownSummary,
}

impl SalaryCalculationBreakdown {
    /// Assembles a breakdown, deriving net salary, net pay and the summary.
    ///
    /// Net salary is clamped at zero; callers that need to know whether
    /// clamping happened check [`Self::unclamped_net_salary`].
    pub fn assemble(
        salary: SalaryComponents,
        penalties: PenaltyBreakdown,
        deductions: DeductionBreakdown,
        leaves: LeaveBreakdown,
        refunds: Itemized<RefundLine>,
    ) -> Self {
        let raw_net = salary.gross_salary - penalties.total_penalties - deductions.total_deductions;
        let net_salary = raw_net.max(Decimal::ZERO);
        let net_pay = net_salary + refunds.total;
        let summary = BreakdownSummary {
            gross_salary: salary.gross_salary,
            minus_all_penalties: penalties.total_penalties,
            minus_all_deductions: deductions.total_deductions,
            plus_refunds: refunds.total,
            final_net_pay: net_pay,
        };

        Self {
            salary,
            penalties,
            deductions,
            leaves,
            refunds,
            net_salary,
            net_pay,
            summary,
        }
    }

    /// Salary components and gross salary.
    pub fn salary(&self) -> &SalaryComponents {
        &self.salary
    }

    /// Penalties section.
    pub fn penalties(&self) -> &PenaltyBreakdown {
        &self.penalties
    }

    /// Deductions section.
    pub fn deductions(&self) -> &DeductionBreakdown {
        &self.deductions
    }

    /// Leave section.
    pub fn leaves(&self) -> &LeaveBreakdown {
        &self.leaves
    }

    /// Refunds section.
    pub fn refunds(&self) -> &Itemized<RefundLine> {
        &self.refunds
    }

    /// Gross minus penalties and deductions, clamped at zero.
    pub fn net_salary(&self) -> Decimal {
        self.net_salary
    }

    /// Net salary plus refunds: the final payable amount.
    pub fn net_pay(&self) -> Decimal {
        self.net_pay
    }

    /// The display recap.
    pub fn summary(&self) -> &BreakdownSummary {
        &self.summary
    }

    /// Gross minus penalties and deductions before clamping.
    pub fn unclamped_net_salary(&self) -> Decimal {
        self.salary.gross_salary - self.penalties.total_penalties - self.deductions.total_deductions
    }

    /// Ids of the refund records this breakdown pays out.
    pub fn refund_ids(&self) -> impl Iterator<Item = &str> {
        self.refunds.entries.iter().map(|r| r.refund_id.as_str())
    }
}

/// Serialized form of [`SalaryCalculationBreakdown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownRecord {
    salary: SalaryComponents,
    penalties: PenaltyBreakdown,
    deductions: DeductionBreakdown,
    leaves: LeaveBreakdown,
    refunds: Itemized<RefundLine>,
    net_salary: Decimal,
    net_pay: Decimal,
    summary: BreakdownSummary,
}

impl From<SalaryCalculationBreakdown> for BreakdownRecord {
    fn from(b: SalaryCalculationBreakdown) -> Self {
        Self {
            salary: b.salary,
            penalties: b.penalties,
            deductions: b.deductions,
            leaves: b.leaves,
            refunds: b.refunds,
            net_salary: b.net_salary,
            net_pay: b.net_pay,
            summary: b.summary,
        }
    }
}

impl TryFrom<BreakdownRecord> for SalaryCalculationBreakdown {
    type Error = PayrollError;

    fn try_from(record: BreakdownRecord) -> Result<Self, Self::Error> {
        let r = record.clone();
        let rebuilt = Self::assemble(
            SalaryComponents::new(
                r.salary.base_salary,
                r.salary.allowances,
                r.salary.bonus_amount,
                r.salary.exit_benefit_amount,
            ),
            PenaltyBreakdown::new(
                r.penalties.manual.rederived(),
                r.penalties.working_hours.rederived(),
                r.penalties.unpaid_leave.rederived(),
            ),
            DeductionBreakdown::new(r.deductions.tax.rederived(), r.deductions.insurance.rederived()),
            r.leaves,
            r.refunds.rederived(),
        );

        if BreakdownRecord::from(rebuilt.clone()) != record {
            return Err(PayrollError::CalculationError {
                message: "breakdown totals do not match their line items".to_string(),
            });
        }
        Ok(rebuilt)
    }
}
