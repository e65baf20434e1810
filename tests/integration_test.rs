use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use solana_trace_debugger::models::report::{
    DiagnosticKind, EfficiencyNarrative, Severity, TransactionStatus,
};
use solana_trace_debugger::models::trace::{AccountRegion, ComputeSource};
use solana_trace_debugger::{
    debug_transaction, debug_transaction_json, DebuggerError, ErrorRuleSet, ProgramRegistry,
    TraceDebugger, TransactionRecord,
};

const FAILED_SWAP: &str = include_str!("fixtures/failed_swap.json");
const ROUTED_SWAP: &str = include_str!("fixtures/routed_swap_with_lookup_tables.json");

const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
const COMPUTE_BUDGET: &str = "ComputeBudget111111111111111111111111111111";
const RAYDIUM_AMM: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
const JUPITER: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";
const WHIRLPOOL: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn minimal_record(header: Value, key_count: usize) -> Value {
    let keys: Vec<String> = (0..key_count)
        .map(|i| format!("Account{}11111111111111111111111111111111", i))
        .collect();
    json!({
        "signature": "integration",
        "slot": 1,
        "accountKeys": keys,
        "header": header,
        "instructions": [],
        "meta": { "err": null, "fee": 5000 }
    })
}

#[test]
fn test_failed_swap_report() {
    init_logger();

    let report = debug_transaction_json(FAILED_SWAP).unwrap();

    assert_eq!(report.status, TransactionStatus::Failed);
    assert_eq!(report.slot, 245112233);

    // Two compute budget instructions, the AMM call and its token transfer
    let programs: Vec<&str> = report.cpi_flow.iter().map(|s| s.program_id.as_str()).collect();
    assert_eq!(programs, vec![COMPUTE_BUDGET, COMPUTE_BUDGET, RAYDIUM_AMM, TOKEN_PROGRAM]);
    let depths: Vec<u8> = report.cpi_flow.iter().map(|s| s.depth).collect();
    assert_eq!(depths, vec![0, 0, 0, 1]);
    assert!(report.cpi_flow.iter().all(|step| !step.success));

    let amm = &report.cpi_flow[2];
    assert_eq!(amm.program_name, "Raydium AMM v4");
    assert_eq!(amm.instruction_kind, "unknown");
    assert_eq!(amm.compute_units, 31000);
    assert_eq!(amm.compute_source, ComputeSource::Measured);
    // The pool authority is not one of this transaction's keys
    assert_eq!(amm.accounts[0].index, None);
    assert_eq!(amm.accounts[0].region, AccountRegion::Unknown);

    let transfer = &report.cpi_flow[3];
    assert_eq!(transfer.program_name, "Token Program");
    assert_eq!(transfer.instruction_kind, "transfer");
    assert_eq!(transfer.stack_height, Some(2));
    assert_eq!(transfer.compute_units, 4381);
    let labels: Vec<&str> = transfer.accounts.iter().map(|a| a.role_label.as_str()).collect();
    assert_eq!(labels, vec!["source", "destination", "authority"]);
    assert!(transfer.accounts[2].is_signer);

    // What the AMM did not account for is shared by the budget instructions
    for step in &report.cpi_flow[..2] {
        assert_eq!(step.compute_source, ComputeSource::Apportioned);
        assert_eq!(step.compute_units, 125);
    }

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, DiagnosticKind::ProgramError);
    assert_eq!(report.errors[0].severity, Severity::Critical);
    assert!(report.errors[0].message.contains("Instruction #2"));

    let suspected = report.suspected_failure.as_ref().unwrap();
    assert_eq!(suspected.step_id, Some(3));
    assert_eq!(suspected.program_id, TOKEN_PROGRAM);
    assert_eq!(suspected.log_message, "custom program error: 0x1");

    assert_eq!(report.performance.compute_units_used, Some(31250));
    assert_eq!(report.performance.compute_units_requested_estimate, Some(200_000));
    assert_eq!(report.performance.efficiency_percent, Some(15.6));
    assert_eq!(report.performance.efficiency_narrative, EfficiencyNarrative::Poor);
    assert_eq!(report.performance.declared_compute_unit_limit, Some(200_000));
    assert_eq!(report.performance.fee, 15000);

    assert_eq!(report.metadata.total_instructions, 4);
    assert_eq!(report.metadata.skipped_instructions, 0);
    assert_eq!(report.metadata.accounts_modified, 5);
    assert_eq!(
        report.metadata.programs_involved,
        vec![COMPUTE_BUDGET, RAYDIUM_AMM, TOKEN_PROGRAM]
    );
}

#[test]
fn test_routed_swap_with_lookup_tables() {
    init_logger();

    let report = debug_transaction_json(ROUTED_SWAP).unwrap();

    assert_eq!(report.status, TransactionStatus::Success);
    assert!(report.suspected_failure.is_none());

    // The third top-level instruction names program index 15 and is skipped
    assert_eq!(report.metadata.total_instructions, 4);
    assert_eq!(report.metadata.skipped_instructions, 1);

    let programs: Vec<&str> = report.cpi_flow.iter().map(|s| s.program_id.as_str()).collect();
    assert_eq!(programs, vec![COMPUTE_BUDGET, JUPITER, WHIRLPOOL, TOKEN_PROGRAM]);
    let ids: Vec<usize> = report.cpi_flow.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);

    let route = &report.cpi_flow[1];
    assert_eq!(route.instruction_kind, "compiled");
    assert_eq!(route.data_length, Some(11));
    // Index 12 lies beyond the static and loaded keys
    assert_eq!(route.accounts.len(), 8);
    assert_eq!(route.accounts[3].region, AccountRegion::WritableNonSigner);
    assert!(route.accounts[3].is_writable);
    assert_eq!(route.accounts[5].region, AccountRegion::ReadonlyNonSigner);
    assert_eq!(route.accounts[5].pubkey, WHIRLPOOL);
    assert_eq!(route.compute_units, 880_000);

    // The whirlpool program itself comes from a lookup table
    let pool = &report.cpi_flow[2];
    assert_eq!(pool.program_name, "Orca Whirlpool");
    assert_eq!(pool.depth, 1);
    assert_eq!(pool.compute_units, 120_000);
    assert_eq!(pool.compute_source, ComputeSource::Measured);

    let budget = &report.cpi_flow[0];
    assert_eq!(budget.compute_source, ComputeSource::Apportioned);
    assert_eq!(budget.compute_units, 20_000);

    assert_eq!(report.performance.declared_compute_unit_limit, Some(1_200_000));
    assert_eq!(report.metadata.accounts_modified, 5);
}

#[test]
fn test_scenario_a_account_roles() {
    let mut record = minimal_record(
        json!({
            "numRequiredSignatures": 1,
            "numReadonlySignedAccounts": 0,
            "numReadonlyUnsignedAccounts": 2
        }),
        4,
    );
    record["instructions"] = json!([
        { "programIdIndex": 3, "accounts": [0, 3], "data": "" }
    ]);

    let report = debug_transaction_json(&record.to_string()).unwrap();
    let accounts = &report.cpi_flow[0].accounts;

    assert!(accounts[0].is_signer && accounts[0].is_writable);
    assert!(!accounts[1].is_signer && !accounts[1].is_writable);
    assert_eq!(accounts[1].region, AccountRegion::ReadonlyNonSigner);
}

#[test]
fn test_scenario_b_balance_mismatch() {
    let mut record = minimal_record(
        json!({
            "numRequiredSignatures": 1,
            "numReadonlySignedAccounts": 0,
            "numReadonlyUnsignedAccounts": 0
        }),
        1,
    );
    record["meta"]["err"] = json!("insufficient balance");

    let report = debug_transaction_json(&record.to_string()).unwrap();

    assert_eq!(report.status, TransactionStatus::Failed);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, DiagnosticKind::AccountBalanceMismatch);
    assert_eq!(report.errors[0].severity, Severity::Critical);
    assert!(report.has_critical_errors());
}

#[test]
fn test_scenario_c_high_consumption() {
    let mut record = minimal_record(
        json!({
            "numRequiredSignatures": 1,
            "numReadonlySignedAccounts": 0,
            "numReadonlyUnsignedAccounts": 0
        }),
        1,
    );
    record["meta"]["computeUnitsConsumed"] = json!(900_000);

    let report = debug_transaction_json(&record.to_string()).unwrap();

    assert_eq!(report.status, TransactionStatus::Success);
    assert_eq!(report.performance.compute_units_requested_estimate, Some(1_080_000));
    assert_eq!(report.performance.efficiency_percent, Some(83.3));
    assert_eq!(report.performance.efficiency_narrative, EfficiencyNarrative::Good);

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, DiagnosticKind::ComputeBudgetExceeded);
    assert_eq!(report.errors[0].severity, Severity::Warning);
    assert!(!report.has_critical_errors());
}

#[test]
fn test_scenario_d_unresolvable_program_is_skipped() {
    let mut record = minimal_record(
        json!({
            "numRequiredSignatures": 1,
            "numReadonlySignedAccounts": 0,
            "numReadonlyUnsignedAccounts": 1
        }),
        2,
    );
    record["instructions"] = json!([
        { "programIdIndex": 7, "accounts": [0], "data": "3Bxs" }
    ]);

    let report = debug_transaction_json(&record.to_string()).unwrap();

    assert!(report.cpi_flow.is_empty());
    assert_eq!(report.metadata.total_instructions, 0);
    assert_eq!(report.metadata.skipped_instructions, 1);
}

#[test]
fn test_malformed_instructions_are_skipped() {
    init_logger();

    let mut record = minimal_record(
        json!({
            "numRequiredSignatures": 1,
            "numReadonlySignedAccounts": 0,
            "numReadonlyUnsignedAccounts": 1
        }),
        2,
    );
    record["instructions"] = json!([
        { "programIdIndex": 1, "accounts": [0], "data": "3Bxs" },
        { "accounts": [0] },
        { "programIdIndex": -1, "accounts": [0], "data": "" }
    ]);
    record["innerInstructions"] = json!([
        { "index": 0, "instructions": [{ "programIdIndex": 1, "accounts": [0] }, "garbage"] },
        { "instructions": [{ "programIdIndex": 1, "accounts": [] }] }
    ]);

    let report = debug_transaction_json(&record.to_string()).unwrap();

    let depths: Vec<u8> = report.cpi_flow.iter().map(|s| s.depth).collect();
    assert_eq!(depths, vec![0, 1]);
    assert_eq!(report.metadata.total_instructions, 2);
    // Two bad top-level entries and one bad inner entry; the group without
    // an index is ignored outright
    assert_eq!(report.metadata.skipped_instructions, 3);
}

#[test]
fn test_structural_errors_produce_no_report() {
    let missing_header = json!({ "accountKeys": ["a"], "instructions": [] });
    assert!(matches!(
        debug_transaction_json(&missing_header.to_string()),
        Err(DebuggerError::MissingField("header"))
    ));

    let empty_keys = minimal_record(
        json!({
            "numRequiredSignatures": 0,
            "numReadonlySignedAccounts": 0,
            "numReadonlyUnsignedAccounts": 0
        }),
        0,
    );
    assert!(matches!(
        debug_transaction_json(&empty_keys.to_string()),
        Err(DebuggerError::EmptyAccountKeys)
    ));

    let oversized_header = minimal_record(
        json!({
            "numRequiredSignatures": 3,
            "numReadonlySignedAccounts": 0,
            "numReadonlyUnsignedAccounts": 0
        }),
        2,
    );
    assert!(matches!(
        debug_transaction_json(&oversized_header.to_string()),
        Err(DebuggerError::InvalidHeader { account_count: 2, .. })
    ));

    assert!(matches!(
        debug_transaction_json("not json"),
        Err(DebuggerError::Decode(_))
    ));
}

#[test]
fn test_report_serializes_with_wire_names() {
    let report = debug_transaction_json(FAILED_SWAP).unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["status"], "failed");
    assert_eq!(value["cpiFlow"][3]["computeSource"], "measured");
    assert_eq!(value["cpiFlow"][0]["computeSource"], "apportioned");
    assert_eq!(value["cpiFlow"][3]["accounts"][2]["region"], "writable_signer");
    assert_eq!(value["errors"][0]["kind"], "program_error");
    assert_eq!(value["performance"]["efficiencyNarrative"], "poor");
    assert_eq!(value["metadata"]["totalInstructions"], 4);
    assert_eq!(value["metadata"]["logsTruncated"], false);
    assert_eq!(value["suspectedFailure"]["stepId"], 3);
}

#[test]
fn test_reports_are_deterministic() {
    let record = TransactionRecord::from_json(ROUTED_SWAP).unwrap();

    let first = debug_transaction(&record).unwrap();
    let second = debug_transaction(&record).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_registry_overrides_from_file() {
    init_logger();

    let registry = ProgramRegistry::builtin()
        .load_overrides(&fixture_path("program_overrides.json"))
        .unwrap();
    assert_eq!(
        registry.name_of("PhoeNiXZ8ByJGLkxNfZRnkUfjvmuYqLR89jjFHGqdXY"),
        "Phoenix"
    );
    // Built-in names survive the overrides
    assert_eq!(registry.name_of(TOKEN_PROGRAM), "Token Program");

    let missing = ProgramRegistry::builtin().load_overrides(&fixture_path("does_not_exist.json"));
    let message = format!("{:#}", missing.unwrap_err());
    assert!(message.contains("Failed to read program overrides"));
}

#[test]
fn test_injected_tables() {
    let registry = ProgramRegistry::empty()
        .with_program(RAYDIUM_AMM, "Pool")
        .unwrap();
    let debugger = TraceDebugger::new(Arc::new(registry), Arc::new(ErrorRuleSet::new(Vec::new())));

    let report = debugger.debug_json(FAILED_SWAP).unwrap();

    assert_eq!(report.cpi_flow[2].program_name, "Pool");
    assert_eq!(report.cpi_flow[3].program_name, "Unknown Program");
    // No rules and consumption under the high-water mark
    assert!(report.errors.is_empty());
    assert_eq!(report.status, TransactionStatus::Failed);
}

#[tokio::test]
async fn test_concurrent_debugging() {
    init_logger();

    let debugger = Arc::new(TraceDebugger::default());
    let expected = debugger.debug_json(FAILED_SWAP).unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let debugger = Arc::clone(&debugger);
        handles.push(tokio::task::spawn_blocking(move || {
            let json = if i % 2 == 0 { FAILED_SWAP } else { ROUTED_SWAP };
            debugger.debug_json(json)
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let report = handle.await.unwrap().unwrap();
        if i % 2 == 0 {
            assert_eq!(report, expected);
        } else {
            assert_eq!(report.status, TransactionStatus::Success);
        }
    }
}
