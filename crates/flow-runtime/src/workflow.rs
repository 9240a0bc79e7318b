//! Demonstration workflow: register an identity, bind a compliance module,
//! mint tokens. The two setup steps are idempotent; re-running against the
//! same ledger skips them.

use flow_orchestrator::{
    GuardOutcome, SimulatedLedger, StepContext, StepOutcome, WorkflowResult, WorkflowStepDef,
};
use flow_telemetry::log_tx_event;
use serde_json::json;
use shared_types::{AccountId, LedgerCall};
use std::sync::Arc;

pub const IDENTITY_REGISTRY: &str = "identity_registry";
pub const COMPLIANCE: &str = "compliance";
pub const TOKEN: &str = "token";

/// Parameters of the demonstration run.
#[derive(Debug, Clone)]
pub struct IssuanceParams {
    pub issuer: AccountId,
    pub investor: AccountId,
    pub amount: u64,
    /// Depth the mint waits for; `None` uses the configured default
    pub required_confirmations: Option<u64>,
}

impl Default for IssuanceParams {
    fn default() -> Self {
        Self {
            issuer: AccountId::repeat(0x01),
            investor: AccountId::repeat(0x02),
            amount: 1_000,
            required_confirmations: None,
        }
    }
}

/// Steps of the issuance workflow, in execution order.
pub fn issuance_workflow(ledger: Arc<SimulatedLedger>, params: IssuanceParams) -> Vec<WorkflowStepDef> {
    let register = {
        let ledger = ledger.clone();
        let params = params.clone();
        WorkflowStepDef::from_fn("Register investor identity", move |ctx| {
            let ledger = ledger.clone();
            let params = params.clone();
            async move {
                let call = LedgerCall::new(IDENTITY_REGISTRY, "registerIdentity")
                    .with_args(json!({ "investor": params.investor.to_string() }));
                let outcome =
                    ensure_executed(&ctx, &ledger, "investor identity registered", &params.issuer, call)
                        .await?;
                Ok(StepOutcome::with_info(describe(outcome, "identity registered")))
            }
        })
    };

    let bind = {
        let ledger = ledger.clone();
        let params = params.clone();
        WorkflowStepDef::from_fn("Bind compliance module", move |ctx| {
            let ledger = ledger.clone();
            let params = params.clone();
            async move {
                let call = LedgerCall::new(COMPLIANCE, "addModule")
                    .with_args(json!({ "module": "country_allow" }));
                let outcome =
                    ensure_executed(&ctx, &ledger, "compliance module bound", &params.issuer, call)
                        .await?;
                Ok(StepOutcome::with_info(describe(outcome, "module bound")))
            }
        })
    };

    let mint = WorkflowStepDef::from_fn("Mint tokens", move |ctx| {
        let params = params.clone();
        async move {
            let call = LedgerCall::new(TOKEN, "mint").with_args(json!({
                "to": params.investor.to_string(),
                "amount": params.amount,
            }));
            let handle = ctx
                .submit_and_confirm(&params.issuer, &call, params.required_confirmations)
                .await?;
            log_tx_event!(info, "issuance", "Mint confirmed", handle, amount = params.amount);
            ctx.set_payload("mint_tx", json!(handle.to_string()))?;
            ctx.set_payload("minted", json!(params.amount))?;
            Ok(StepOutcome::with_info(format!(
                "Minted {} to {}",
                params.amount, params.investor
            )))
        }
    });

    vec![register, bind, mint]
}

/// Submit `call` unless it has already been applied on the ledger.
async fn ensure_executed(
    ctx: &StepContext,
    ledger: &SimulatedLedger,
    goal: &str,
    account: &AccountId,
    call: LedgerCall,
) -> WorkflowResult<GuardOutcome> {
    let (target, method) = (call.target.clone(), call.method.clone());
    let (target, method, call) = (&target, &method, &call);
    let applied = || async move { Ok(ledger.has_executed(target, method)) };
    ctx.ensure(
        goal,
        applied,
        || async move {
            ctx.submit_and_confirm(account, call, None).await?;
            Ok(())
        },
        applied,
    )
    .await
}

fn describe(outcome: GuardOutcome, achieved: &str) -> String {
    match outcome {
        GuardOutcome::AlreadySatisfied => format!("{achieved} (already in place)"),
        GuardOutcome::Achieved => achieved.to_string(),
    }
}
