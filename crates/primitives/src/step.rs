//! Ordered log of the actions taken by an upgrade or recovery sequence.

use std::sync::Arc;

use alloy_primitives::B256;

/// One sealed entry in a [`StepLog`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStep {
    pub description: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    /// Digest signed for this step, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_hash: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationStep {
    /// A step that has not finished yet.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            completed: false,
            transaction_hash: None,
            operation_hash: None,
            error: None,
        }
    }

    pub fn with_transaction_hash(mut self, hash: B256) -> Self {
        self.transaction_hash = Some(hash);
        self
    }

    pub fn with_operation_hash(mut self, hash: B256) -> Self {
        self.operation_hash = Some(hash);
        self
    }

    pub fn complete(mut self) -> Self {
        self.completed = true;
        self.error = None;
        self
    }

    pub fn fail(mut self, error: impl ToString) -> Self {
        self.completed = false;
        self.error = Some(error.to_string());
        self
    }

    pub const fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Append-only sequence of sealed steps.
///
/// Appending yields a new log sharing the existing entries, so snapshots handed to observers
/// never change underneath them.
#[derive(Clone, Debug, Default, PartialEq, Eq, derive_more::Deref, derive_more::IntoIterator)]
#[into_iterator(owned, ref)]
pub struct StepLog(Vec<Arc<VerificationStep>>);

impl StepLog {
    pub fn appended(&self, step: VerificationStep) -> Self {
        let mut steps = self.0.clone();
        steps.push(Arc::new(step));
        Self(steps)
    }

    pub fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|step| step.description.as_str())
    }

    pub fn transaction_hashes(&self) -> impl Iterator<Item = B256> + '_ {
        self.0.iter().filter_map(|step| step.transaction_hash)
    }

    pub fn first_failure(&self) -> Option<&VerificationStep> {
        self.0.iter().map(Arc::as_ref).find(|step| step.is_failed())
    }
}
