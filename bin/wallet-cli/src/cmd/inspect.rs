use alloy::primitives::{Address, U256};
use clap::Parser;
use eyre::{Result, WrapErr};
use serde::Serialize;
use wallet_primitives::{IssueVector, OwnerCredential};
use wallet_upgrade::{
    AlloyLedger, ExpectedState, Inspection, OwnershipFinding, RecoveryPlan, StateInspector,
};

use crate::opts::{ConnectionArgs, parse_owner};

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Account to inspect
    account: Address,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Expected owner, as an address or 64-byte public key (defaults to the account)
    #[arg(long, value_parser = parse_owner)]
    owner: Option<OwnerCredential>,

    /// Index the expected owner was registered at
    #[arg(long)]
    owner_index: Option<U256>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    account: Address,
    delegate: Option<String>,
    implementation: Address,
    next_owner_index: U256,
    ownership: String,
    issues: IssueVector,
    plan: String,
}

impl InspectReport {
    fn new(inspection: &Inspection) -> Self {
        Self {
            account: inspection.account,
            delegate: inspection.delegate_mismatch.as_ref().map(ToString::to_string),
            implementation: inspection.implementation,
            next_owner_index: inspection.next_owner_index,
            ownership: describe_ownership(&inspection.ownership),
            issues: inspection.issues,
            plan: format!("{:?}", RecoveryPlan::for_issues(inspection.issues)),
        }
    }
}

fn describe_ownership(finding: &OwnershipFinding) -> String {
    match finding {
        OwnershipFinding::Registered => "registered".to_string(),
        OwnershipFinding::Missing => "owner not registered".to_string(),
        OwnershipFinding::IndexDrift { index, found } => {
            format!("index {index} holds {found}")
        }
        OwnershipFinding::Unreadable(err) => format!("unreadable: {err}"),
    }
}

impl InspectArgs {
    pub async fn run(self) -> Result<()> {
        let config = self.connection.resolve()?;
        let ledger = AlloyLedger::connect_read_only(&config)
            .await
            .wrap_err("failed to connect to RPC")?;

        let expected = ExpectedState {
            delegate: config.contracts.proxy_template,
            implementation: config.contracts.implementation,
            owner: self
                .owner
                .unwrap_or_else(|| OwnerCredential::address(self.account)),
            owner_index: self.owner_index,
        };
        let inspection = StateInspector::new(ledger)
            .inspect(self.account, &expected)
            .await
            .wrap_err_with(|| format!("failed to inspect {}", self.account))?;
        let report = InspectReport::new(&inspection);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("Account {}", report.account);
        println!("==================================================");
        println!(
            "  Delegate:         {}",
            report.delegate.as_deref().unwrap_or("ok")
        );
        println!("  Implementation:   {}", report.implementation);
        println!("  Ownership:        {}", report.ownership);
        println!("  Next owner index: {}", report.next_owner_index);
        println!();
        println!("  Issues: {}", report.issues);
        println!("  Plan:   {}", report.plan);

        Ok(())
    }
}
