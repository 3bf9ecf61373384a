//! Core data models for the payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod approval;
mod audit;
mod breakdown;
mod facts;
mod payslip;
mod run;

pub use approval::{
    ApprovalDecision, ApprovalItem, ApprovalKind, ApprovalPatch, ApprovalStatus, RunSignoffs,
    Signoff, SignoffStage,
};
pub use audit::{AuditStep, AuditTrace, CalculationWarning, NEGATIVE_NET_PAY};
pub use breakdown::{
    BreakdownSummary, DeductionBreakdown, InsuranceDeduction, Itemized, LeaveBreakdown,
    LineAmount, ManualPenalty, PenaltyBreakdown, RefundLine, SalaryCalculationBreakdown,
    SalaryComponents, TaxDeduction, UnpaidLeaveDeduction, WorkingHoursPenalty,
};
pub use facts::{
    AdjustmentKind, Allowance, AttendanceDay, BracketBase, BracketRule, EmployeeProfile,
    EmploymentStatus, HrEvent, LeaveKind, LeaveSpan, ManualAdjustment, PeriodFacts, RefundEntry,
    RefundStatus,
};
pub use payslip::Payslip;
pub use run::{
    EmployeePayrollLine, LineFailure, LineStatus, PayrollPeriod, PayrollPhase, PayrollRun,
    RunEvent, validate_run_id,
};
