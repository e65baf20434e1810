//! Well-known program addresses and their display names

use solana_sdk_ids::{
    address_lookup_table, bpf_loader, bpf_loader_upgradeable, compute_budget, config,
    ed25519_program, secp256k1_program, stake, system_program, vote,
};

/// SPL and ecosystem programs that are not part of the runtime.
pub const ECOSYSTEM_PROGRAMS: &[(&str, &str)] = &[
    ("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA", "Token Program"),
    ("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb", "Token-2022 Program"),
    ("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL", "Associated Token Account Program"),
    ("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr", "Memo Program"),
    ("Memo1UhkJRfHyvLMcVucJwxXeuD728EqVDDwQDxFMNo", "Memo Program (v1)"),
    ("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s", "Metaplex Token Metadata"),
    ("JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4", "Jupiter Aggregator v6"),
    ("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc", "Orca Whirlpool"),
    ("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8", "Raydium AMM v4"),
    ("CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK", "Raydium CLMM"),
    ("srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX", "OpenBook DEX"),
];

/// Every program the built-in registry knows, as (address, name) pairs.
pub fn builtin_programs() -> Vec<(String, &'static str)> {
    let mut programs = vec![
        (system_program::ID.to_string(), "System Program"),
        (compute_budget::ID.to_string(), "Compute Budget Program"),
        (vote::ID.to_string(), "Vote Program"),
        (stake::ID.to_string(), "Stake Program"),
        (config::ID.to_string(), "Config Program"),
        (bpf_loader::ID.to_string(), "BPF Loader"),
        (bpf_loader_upgradeable::ID.to_string(), "BPF Upgradeable Loader"),
        (address_lookup_table::ID.to_string(), "Address Lookup Table Program"),
        (ed25519_program::ID.to_string(), "Ed25519 SigVerify Precompile"),
        (secp256k1_program::ID.to_string(), "Secp256k1 SigVerify Precompile"),
    ];

    programs.extend(
        ECOSYSTEM_PROGRAMS
            .iter()
            .map(|(address, name)| (address.to_string(), *name)),
    );

    programs
}

/// Address of the compute budget program, used to read declared limits.
pub fn compute_budget_program() -> String {
    compute_budget::ID.to_string()
}
