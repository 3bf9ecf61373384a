//! Run-level manager and finance sign-offs.

use chrono::{DateTime, Utc};

use crate::error::{PayrollError, PayrollResult};
use crate::models::{RunSignoffs, Signoff, SignoffStage};

impl RunSignoffs {
    /// Records a sign-off.
    ///
    /// Finance may only sign after the manager; recording finance first
    /// fails with `OutOfOrderApproval` and leaves the sign-offs unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::{RunSignoffs, SignoffStage};
    /// use chrono::Utc;
    ///
    /// let mut signoffs = RunSignoffs::default();
    /// assert!(signoffs.record(SignoffStage::Finance, "fin-1", Utc::now()).is_err());
    /// signoffs.record(SignoffStage::Manager, "mgr-1", Utc::now()).unwrap();
    /// signoffs.record(SignoffStage::Finance, "fin-1", Utc::now()).unwrap();
    /// assert!(signoffs.is_complete());
    /// ```
    pub fn record(
        &mut self,
        stage: SignoffStage,
        approver_id: &str,
        signed_at: DateTime<Utc>,
    ) -> PayrollResult<()> {
        let signoff = Signoff {
            approver_id: approver_id.to_string(),
            signed_at,
        };

        match stage {
            SignoffStage::Manager => self.manager = Some(signoff),
            SignoffStage::Finance => {
                if self.manager.is_none() {
                    return Err(PayrollError::OutOfOrderApproval {
                        attempted: SignoffStage::Finance,
                        required: SignoffStage::Manager,
                    });
                }
                self.finance = Some(signoff);
            }
        }
        Ok(())
    }

    /// Returns true once both sign-offs are recorded.
    pub fn is_complete(&self) -> bool {
        self.manager.is_some() && self.finance.is_some()
    }

    /// Drops both sign-offs.
    pub fn clear(&mut self) {
        self.manager = None;
        self.finance = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finance_before_manager_is_out_of_order() {
        let mut signoffs = RunSignoffs::default();

        let result = signoffs.record(SignoffStage::Finance, "fin-1", Utc::now());

        assert_eq!(
            result,
            Err(PayrollError::OutOfOrderApproval {
                attempted: SignoffStage::Finance,
                required: SignoffStage::Manager,
            })
        );
        assert_eq!(signoffs, RunSignoffs::default());
    }

    #[test]
    fn test_sequential_signoffs_then_clear() {
        let mut signoffs = RunSignoffs::default();
        signoffs.record(SignoffStage::Manager, "mgr-1", Utc::now()).unwrap();
        assert!(!signoffs.is_complete());

        signoffs.record(SignoffStage::Finance, "fin-1", Utc::now()).unwrap();
        assert!(signoffs.is_complete());
        assert_eq!(signoffs.finance.as_ref().unwrap().approver_id, "fin-1");

        signoffs.clear();
        assert_eq!(signoffs, RunSignoffs::default());
    }
}
