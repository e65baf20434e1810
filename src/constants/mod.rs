//! Constants used throughout the debugger

pub mod anchor;
pub mod programs;

/// Largest compute budget a single transaction may request.
pub const MAX_COMPUTE_UNITS: u64 = 1_400_000;

/// Consumption above this mark earns a compute-budget warning even when the
/// transaction succeeded. Roughly 57% of [`MAX_COMPUTE_UNITS`].
pub const COMPUTE_HIGH_WATER_MARK: u64 = 800_000;

/// Smallest budget request assumed when estimating what a transaction asked for.
pub const MIN_REQUESTED_COMPUTE_UNITS: u64 = 200_000;

/// Label returned for program ids missing from the registry.
pub const UNKNOWN_PROGRAM_NAME: &str = "Unknown Program";

/// Instruction kind for instructions carrying program and account addresses
/// but no decoded payload.
pub const KIND_UNKNOWN: &str = "unknown";

/// Instruction kind for fully compiled (index-only) instructions.
pub const KIND_COMPILED: &str = "compiled";

/// Steps touching more accounts than this get an account-reduction hint.
pub const ACCOUNT_HEAVY_THRESHOLD: usize = 10;

/// Per-account compute thresholds for step efficiency ratings.
pub const OPTIMAL_UNITS_PER_ACCOUNT: u64 = 5_000;
pub const GOOD_UNITS_PER_ACCOUNT: u64 = 15_000;

/// Base cost assumed for instruction kinds missing from the cost table.
pub const DEFAULT_INSTRUCTION_COST: u64 = 5_000;

/// Heuristic base compute cost per decoded instruction kind.
pub const INSTRUCTION_COSTS: &[(&str, u64)] = &[
    // System program
    ("transfer", 2_000),
    ("transferWithSeed", 2_500),
    ("createAccount", 3_000),
    ("createAccountWithSeed", 3_500),
    ("allocate", 1_500),
    ("assign", 1_500),
    ("advanceNonce", 1_500),
    // Token program
    ("transferChecked", 6_000),
    ("initializeMint", 3_000),
    ("initializeMint2", 3_000),
    ("initializeAccount", 4_500),
    ("initializeAccount3", 4_000),
    ("mintTo", 4_500),
    ("mintToChecked", 4_800),
    ("burn", 4_800),
    ("burnChecked", 5_000),
    ("approve", 3_000),
    ("revoke", 2_800),
    ("closeAccount", 3_000),
    ("syncNative", 3_000),
    ("setAuthority", 3_200),
    // Associated token account program
    ("create", 25_000),
    ("createIdempotent", 25_000),
    // Compute budget program
    ("setComputeUnitLimit", 150),
    ("setComputeUnitPrice", 150),
    // DEX aggregators and AMMs
    ("swap", 40_000),
    ("route", 60_000),
];
