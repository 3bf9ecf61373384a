//! Payslip emission.

mod emitter;

pub use emitter::PayslipEmitter;
