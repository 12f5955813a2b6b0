use tokio::sync::watch;
use wallet_primitives::{StepLog, VerificationStep};

use crate::error::WalletError;

/// Publishes the step log of one running sequence.
///
/// Each attempt records into its own channel. Every recorded step produces a fresh [`StepLog`]
/// snapshot; observers never see a step change after it was sent.
#[derive(Debug)]
pub(crate) struct StepRecorder<'a> {
    tx: &'a watch::Sender<StepLog>,
}

impl<'a> StepRecorder<'a> {
    /// Start an attempt on `tx`, clearing whatever it held.
    pub(crate) fn start(tx: &'a watch::Sender<StepLog>) -> Self {
        tx.send_replace(StepLog::default());
        Self { tx }
    }

    pub(crate) fn snapshot(&self) -> StepLog {
        self.tx.borrow().clone()
    }

    /// Seal `step` with the outcome of its action and append it.
    pub(crate) fn finish<T>(
        &self,
        step: VerificationStep,
        result: Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        let step = match &result {
            Ok(_) => step.complete(),
            Err(err) => step.fail(err),
        };
        self.tx.send_modify(|log| *log = log.appended(step));
        result
    }
}
