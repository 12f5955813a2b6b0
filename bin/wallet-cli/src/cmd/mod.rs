pub mod hash;
pub mod inspect;
pub mod recover;
pub mod upgrade;

use tokio::{sync::watch, task::JoinHandle};
use wallet_primitives::{StepLog, VerificationStep};

fn print_step(step: &VerificationStep) {
    let status = match (&step.error, step.completed) {
        (Some(_), _) => "failed",
        (None, true) => "done",
        (None, false) => "pending",
    };
    println!("  [{status}] {}", step.description);
    if let Some(hash) = step.operation_hash {
        println!("      signed:      {hash}");
    }
    if let Some(hash) = step.transaction_hash {
        println!("      transaction: {hash}");
    }
    if let Some(error) = &step.error {
        println!("      error:       {error}");
    }
}

/// Step channel for a single attempt.
///
/// Steps are printed as they are sealed until the returned sender is dropped.
fn follow_steps() -> (watch::Sender<StepLog>, JoinHandle<()>) {
    let (tx, mut steps) = watch::channel(StepLog::default());
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        while steps.changed().await.is_ok() {
            let log = steps.borrow_and_update().clone();
            for step in log.iter().skip(printed) {
                print_step(step);
            }
            printed = log.len();
        }
    });
    (tx, printer)
}
