//! Failure classification
//!
//! The failure object of a rejected transaction is serialized to canonical
//! JSON and tested against an ordered rule table. Rules are independent: every
//! rule that matches contributes one diagnostic, in table order.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::constants::{anchor, COMPUTE_HIGH_WATER_MARK, MAX_COMPUTE_UNITS};
use crate::models::report::{Diagnostic, DiagnosticKind, Severity};
use crate::models::transaction::TransactionMeta;

static BUILTIN: Lazy<Arc<ErrorRuleSet>> = Lazy::new(|| Arc::new(ErrorRuleSet::builtin()));

const ERRORS_DOC: &str = "https://solana.com/docs/core/transactions";
const FEES_DOC: &str = "https://solana.com/docs/core/fees";
const ACCOUNTS_DOC: &str = "https://solana.com/docs/core/accounts";
const ANCHOR_ERRORS_DOC: &str = "https://www.anchor-lang.com/docs/errors";

/// What could be pulled out of a failure object beyond its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDetails {
    /// Canonical JSON of the failure object
    pub raw: String,
    /// Top-level instruction the runtime blamed, for `InstructionError`
    pub instruction_index: Option<usize>,
    /// Program-defined error code, for `Custom` instruction errors
    pub custom_code: Option<u32>,
}

impl FailureDetails {
    pub fn from_err(err: &Value) -> Self {
        // Objects keep the node's key order; sort them so rules see one text
        let canonical = canonicalize(err);
        let raw = serde_json::to_string(&canonical).unwrap_or_else(|_| canonical.to_string());

        let instruction_error = err
            .get("InstructionError")
            .and_then(Value::as_array)
            .filter(|parts| parts.len() == 2);

        let instruction_index = instruction_error
            .and_then(|parts| parts[0].as_u64())
            .map(|index| index as usize);

        let custom_code = instruction_error
            .and_then(|parts| parts[1].get("Custom"))
            .and_then(Value::as_u64)
            .and_then(|code| u32::try_from(code).ok());

        Self {
            raw,
            instruction_index,
            custom_code,
        }
    }

    fn location(&self) -> String {
        match self.instruction_index {
            Some(index) => format!("Instruction #{}", index),
            None => "The transaction".to_string(),
        }
    }
}

/// Copy of `value` with every object's keys in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Builds the diagnostic message from the decoded failure.
pub type DetailBuilder = fn(&FailureDetails) -> String;

/// One row of the rule table.
#[derive(Clone)]
pub struct ErrorRule {
    pub pattern: Regex,
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub detail: DetailBuilder,
    pub suggested_fix: String,
    pub documentation_link: Option<String>,
    pub estimated_fix_time: Option<String>,
}

impl fmt::Debug for ErrorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRule")
            .field("pattern", &self.pattern.as_str())
            .field("kind", &self.kind)
            .field("severity", &self.severity)
            .finish()
    }
}

impl ErrorRule {
    pub fn new(
        pattern: &str,
        kind: DiagnosticKind,
        severity: Severity,
        detail: DetailBuilder,
        suggested_fix: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            kind,
            severity,
            detail,
            suggested_fix: suggested_fix.to_string(),
            documentation_link: None,
            estimated_fix_time: None,
        })
    }

    pub fn documented(mut self, link: &str) -> Self {
        self.documentation_link = Some(link.to_string());
        self
    }

    pub fn fix_time(mut self, estimate: &str) -> Self {
        self.estimated_fix_time = Some(estimate.to_string());
        self
    }

    fn diagnose(&self, details: &FailureDetails) -> Diagnostic {
        Diagnostic {
            kind: self.kind,
            severity: self.severity,
            message: (self.detail)(details),
            suggested_fix: self.suggested_fix.clone(),
            documentation_link: self.documentation_link.clone(),
            estimated_fix_time: self.estimated_fix_time.clone(),
        }
    }
}

/// Ordered rule table plus the unconditional compute high-water check.
#[derive(Debug, Clone)]
pub struct ErrorRuleSet {
    rules: Vec<ErrorRule>,
}

impl ErrorRuleSet {
    pub fn new(rules: Vec<ErrorRule>) -> Self {
        Self { rules }
    }

    /// The process-wide built-in rule table.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Classify the failure and compute usage recorded in `meta`.
    pub fn diagnose(&self, meta: Option<&TransactionMeta>) -> Vec<Diagnostic> {
        let meta = match meta {
            Some(meta) => meta,
            None => return Vec::new(),
        };

        let mut diagnostics = Vec::new();

        if let Some(err) = &meta.err {
            let details = FailureDetails::from_err(err);
            diagnostics.extend(
                self.rules
                    .iter()
                    .filter(|rule| rule.pattern.is_match(&details.raw))
                    .map(|rule| rule.diagnose(&details)),
            );
        }

        // Runs whether or not the transaction failed.
        if let Some(consumed) = meta.compute_units_consumed {
            if consumed > COMPUTE_HIGH_WATER_MARK {
                diagnostics.push(high_water_warning(consumed));
            }
        }

        diagnostics
    }

    /// The rule table shipped with the crate.
    pub fn builtin() -> Self {
        let rules = vec![
            ErrorRule::new(
                r#"(?i:insufficient[ _]?(funds|balance|lamports)\b)"#,
                DiagnosticKind::AccountBalanceMismatch,
                Severity::Critical,
                |d| format!(
                    "{} failed because a source account could not cover the requested amount",
                    d.location()
                ),
                "Check the balance of the paying or source account before sending, and account for fees and any wrapped SOL that still needs syncing",
            ),
            ErrorRule::new(
                r#"InvalidRealloc|AccountDataSizeChanged|ConstraintViolation|(?i:constraint (was )?violated)|"Custom":2\d{3}\b"#,
                DiagnosticKind::AccountConstraintViolation,
                Severity::Critical,
                |d| match d.custom_code.and_then(anchor::error_name) {
                    Some(name) => format!("{} violated the account constraint {}", d.location(), name),
                    None => format!("{} violated an account constraint or resized an account illegally", d.location()),
                },
                "Compare the accounts passed in with the program's account constraints (mutability, seeds, owners) and make sure reallocations stay within the permitted growth",
            ),
            ErrorRule::new(
                r#""Custom":\d+|(?i:custom program error)|ProgramFailedToComplete|InvalidInstructionData|InvalidArgument"#,
                DiagnosticKind::ProgramError,
                Severity::Critical,
                describe_program_error,
                "Look up the error code in the failing program's error definitions and check the instruction arguments it was given",
            ),
            ErrorRule::new(
                r#"ComputationalBudgetExceeded|(?i:exceeded (maximum )?(compute units|cus))|(?i:compute budget exceeded)"#,
                DiagnosticKind::ComputeBudgetExceeded,
                Severity::Critical,
                |d| format!("{} ran out of compute units before finishing", d.location()),
                "Raise the limit with a setComputeUnitLimit instruction or split the work across several transactions",
            ),
            ErrorRule::new(
                r#"InsufficientFundsForRent|NotRentExempt|InvalidRentPayingAccount|(?i:rent[- ]exempt)"#,
                DiagnosticKind::RentViolation,
                Severity::Critical,
                |d| format!("{} would leave an account below the rent-exempt minimum", d.location()),
                "Fund new or resized accounts with at least the rent-exempt minimum for their data size",
            ),
            ErrorRule::new(
                r#"AccountDataTooSmall|InvalidAccountDataLength|MaxAccountsDataAllocationsExceeded|(?i:account data too (small|large))|(?i:exceeds? (the )?max(imum)? (account )?(data )?size)"#,
                DiagnosticKind::AccountSizeExceeded,
                Severity::Critical,
                |d| format!("{} needed more account data space than was allocated or allowed", d.location()),
                "Allocate the account with the space the program expects, or grow it in steps that respect the per-instruction realloc limit",
            ),
            ErrorRule::new(
                r#"MissingRequiredSignature|IllegalOwner|InvalidAccountOwner|IncorrectProgramId|(?i:owner does not match)|(?i:authority mismatch)|(?i:invalid authority)|"Custom":(2001|2002|2004|3007|3010)\b"#,
                DiagnosticKind::AuthorityMismatch,
                Severity::Critical,
                |d| format!("{} was signed or owned by the wrong authority", d.location()),
                "Verify that the expected authority signs the transaction and that each account is owned by the program that checks it",
            ),
        ];

        let docs = [
            (FEES_DOC, "5 minutes"),
            (ANCHOR_ERRORS_DOC, "30 minutes"),
            (ERRORS_DOC, "1 hour"),
            (FEES_DOC, "15 minutes"),
            (ACCOUNTS_DOC, "10 minutes"),
            (ACCOUNTS_DOC, "20 minutes"),
            (ACCOUNTS_DOC, "15 minutes"),
        ];

        let rules = rules
            .into_iter()
            .zip(docs)
            .map(|(rule, (link, time))| {
                rule.expect("built-in error pattern must compile")
                    .documented(link)
                    .fix_time(time)
            })
            .collect();

        Self::new(rules)
    }
}

impl Default for ErrorRuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

fn describe_program_error(details: &FailureDetails) -> String {
    let location = details.location();
    match details.custom_code {
        Some(code) if code >= anchor::ANCHOR_USER_ERROR_START => format!(
            "{} returned program-defined error {} (0x{:x}), variant #{} of the program's error enum",
            location,
            code,
            code,
            code - anchor::ANCHOR_USER_ERROR_START
        ),
        Some(code) => match anchor::error_name(code) {
            Some(name) => format!("{} returned Anchor error {} ({})", location, code, name),
            None => format!("{} returned custom program error {} (0x{:x})", location, code, code),
        },
        None => format!("{} failed inside the program: {}", location, details.raw),
    }
}

fn high_water_warning(consumed: u64) -> Diagnostic {
    let percent = consumed as f64 / MAX_COMPUTE_UNITS as f64 * 100.0;
    Diagnostic {
        kind: DiagnosticKind::ComputeBudgetExceeded,
        severity: Severity::Warning,
        message: format!(
            "Transaction consumed {} compute units, {:.1}% of the {} unit maximum",
            consumed, percent, MAX_COMPUTE_UNITS
        ),
        suggested_fix: format!(
            "Keep consumption under {} units: profile the heaviest instructions and set an explicit compute unit limit with headroom",
            COMPUTE_HIGH_WATER_MARK
        ),
        documentation_link: Some(FEES_DOC.to_string()),
        estimated_fix_time: Some("2 hours".to_string()),
    }
}
