//! Program log analysis
//!
//! The runtime brackets every invocation with `invoke [depth]` and
//! `success` / `failed` lines, and BPF programs also log how many compute
//! units they consumed. Replaying those brackets recovers which trace slot each
//! measurement belongs to: the n-th depth-1 invocation is top-level
//! instruction n, and deeper invocations are the inner instructions of the
//! current top-level instruction in order.

use std::collections::BTreeMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

const PROGRAM_ID: &str = "[1-9A-HJ-NP-Za-km-z]{32,44}";

static INVOKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^Program ({}) invoke \[(\d+)\]$", PROGRAM_ID)).expect("valid log pattern"));
static CONSUMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^Program ({}) consumed (\d+) of (\d+) compute units$",
        PROGRAM_ID
    ))
    .expect("valid log pattern")
});
static SUCCESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^Program ({}) success$", PROGRAM_ID)).expect("valid log pattern"));
static FAILED: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^Program ({}) failed: (.*)$", PROGRAM_ID)).expect("valid log pattern"));

/// Position of an invocation in the two-level trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvocationSlot {
    TopLevel(usize),
    Inner { top_level: usize, ordinal: usize },
}

/// One bracketed invocation seen in the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    program_id: String,
    consumed: Option<u64>,
}

/// The first invocation that logged a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFailure {
    pub slot: InvocationSlot,
    pub program_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogAnalysis {
    invocations: BTreeMap<InvocationSlot, Invocation>,
    failure: Option<LogFailure>,
    truncated: bool,
}

impl LogAnalysis {
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut analysis = Self::default();
        let mut stack: Vec<InvocationSlot> = Vec::new();
        let mut top_level: Option<usize> = None;
        let mut next_inner = 0;

        for line in lines.iter().map(AsRef::as_ref) {
            if let Some(caps) = INVOKE.captures(line) {
                let program_id = caps[1].to_string();
                let depth: u32 = caps[2].parse().unwrap_or(1);

                let slot = if depth <= 1 {
                    let index = top_level.map_or(0, |index| index + 1);
                    top_level = Some(index);
                    next_inner = 0;
                    stack.clear();
                    InvocationSlot::TopLevel(index)
                } else if let Some(index) = top_level {
                    next_inner += 1;
                    InvocationSlot::Inner {
                        top_level: index,
                        ordinal: next_inner - 1,
                    }
                } else {
                    debug!("Ignoring depth {} invoke before any top-level invoke", depth);
                    continue;
                };

                analysis.invocations.insert(
                    slot,
                    Invocation {
                        program_id,
                        consumed: None,
                    },
                );
                stack.push(slot);
            } else if let Some(caps) = CONSUMED.captures(line) {
                let units = caps[2].parse().ok();
                if let Some(invocation) = analysis.current(&stack, &caps[1]) {
                    invocation.consumed = units;
                }
            } else if let Some(caps) = SUCCESS.captures(line) {
                if analysis.current(&stack, &caps[1]).is_some() {
                    stack.pop();
                }
            } else if let Some(caps) = FAILED.captures(line) {
                if analysis.current(&stack, &caps[1]).is_some() {
                    if let Some(slot) = stack.pop() {
                        if analysis.failure.is_none() {
                            analysis.failure = Some(LogFailure {
                                slot,
                                program_id: caps[1].to_string(),
                                message: caps[2].to_string(),
                            });
                        }
                    }
                }
            } else if line == "Log truncated" {
                analysis.truncated = true;
            }
        }

        analysis
    }

    /// The open invocation, if it belongs to `program_id`.
    fn current(&mut self, stack: &[InvocationSlot], program_id: &str) -> Option<&mut Invocation> {
        let slot = stack.last()?;
        self.invocations
            .get_mut(slot)
            .filter(|invocation| invocation.program_id == program_id)
    }

    /// Units the program at `slot` reported consuming, provided the logs
    /// attribute that slot to the same program.
    pub fn measured_units(&self, slot: InvocationSlot, program_id: &str) -> Option<u64> {
        self.invocations
            .get(&slot)
            .filter(|invocation| invocation.program_id == program_id)
            .and_then(|invocation| invocation.consumed)
    }

    pub fn failure(&self) -> Option<&LogFailure> {
        self.failure.as_ref()
    }

    /// Whether the node cut the logs short; later slots have no measurements.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AMM: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
    const TOKEN: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    const BUDGET: &str = "ComputeBudget111111111111111111111111111111";

    fn swap_logs() -> Vec<String> {
        vec![
            format!("Program {} invoke [1]", BUDGET),
            format!("Program {} success", BUDGET),
            format!("Program {} invoke [1]", AMM),
            "Program log: ray_log: A0BCDEF".to_string(),
            format!("Program {} invoke [2]", TOKEN),
            "Program log: Instruction: Transfer".to_string(),
            format!("Program {} consumed 4645 of 180000 compute units", TOKEN),
            format!("Program {} success", TOKEN),
            format!("Program {} invoke [2]", TOKEN),
            "Program log: Instruction: Transfer".to_string(),
            format!("Program {} consumed 4736 of 170000 compute units", TOKEN),
            format!("Program {} success", TOKEN),
            format!("Program {} consumed 31000 of 199850 compute units", AMM),
            format!("Program {} success", AMM),
        ]
    }

    #[test]
    fn test_measurements_map_to_slots() {
        let analysis = LogAnalysis::parse(&swap_logs());

        assert_eq!(analysis.invocations.len(), 4);
        assert_eq!(analysis.measured_units(InvocationSlot::TopLevel(0), BUDGET), None);
        assert_eq!(analysis.measured_units(InvocationSlot::TopLevel(1), AMM), Some(31_000));
        assert_eq!(
            analysis.measured_units(InvocationSlot::Inner { top_level: 1, ordinal: 0 }, TOKEN),
            Some(4_645)
        );
        assert_eq!(
            analysis.measured_units(InvocationSlot::Inner { top_level: 1, ordinal: 1 }, TOKEN),
            Some(4_736)
        );
        assert!(analysis.failure().is_none());
    }

    #[test]
    fn test_measurement_requires_matching_program() {
        let analysis = LogAnalysis::parse(&swap_logs());
        assert_eq!(analysis.measured_units(InvocationSlot::TopLevel(1), TOKEN), None);
    }

    #[test]
    fn test_innermost_failure_is_kept() {
        let logs = vec![
            format!("Program {} invoke [1]", AMM),
            format!("Program {} invoke [2]", TOKEN),
            "Program log: Error: insufficient funds".to_string(),
            format!("Program {} consumed 4381 of 190000 compute units", TOKEN),
            format!("Program {} failed: custom program error: 0x1", TOKEN),
            format!("Program {} consumed 15000 of 200000 compute units", AMM),
            format!("Program {} failed: custom program error: 0x1", AMM),
        ];
        let analysis = LogAnalysis::parse(&logs);

        let failure = analysis.failure().unwrap();
        assert_eq!(failure.slot, InvocationSlot::Inner { top_level: 0, ordinal: 0 });
        assert_eq!(failure.program_id, TOKEN);
        assert_eq!(failure.message, "custom program error: 0x1");
        assert_eq!(analysis.measured_units(InvocationSlot::TopLevel(0), AMM), Some(15_000));
    }

    #[test]
    fn test_program_log_lines_are_not_brackets() {
        let logs = vec![
            format!("Program {} invoke [1]", AMM),
            "Program log: success".to_string(),
            format!("Program {} consumed 900 of 200000 compute units", AMM),
        ];
        let analysis = LogAnalysis::parse(&logs);
        assert_eq!(analysis.measured_units(InvocationSlot::TopLevel(0), AMM), Some(900));
    }

    #[test]
    fn test_truncated_logs() {
        let logs = vec![format!("Program {} invoke [1]", AMM), "Log truncated".to_string()];
        let analysis = LogAnalysis::parse(&logs);
        assert!(analysis.is_truncated());
        assert_eq!(analysis.measured_units(InvocationSlot::TopLevel(0), AMM), None);
    }

    #[test]
    fn test_empty_logs() {
        let analysis = LogAnalysis::parse::<String>(&[]);
        assert_eq!(analysis, LogAnalysis::default());
    }
}
