//! Anchor framework error codes
//!
//! Programs built with Anchor reserve custom error codes below 6000 for
//! framework-level failures. Naming them turns an opaque `Custom(2003)` into
//! something a developer can search for.

/// First custom error code available to user-defined Anchor errors.
pub const ANCHOR_USER_ERROR_START: u32 = 6000;

/// Framework error codes and their names.
pub const ERROR_CODES: &[(u32, &str)] = &[
    // Instruction errors
    (100, "InstructionMissing"),
    (101, "InstructionFallbackNotFound"),
    (102, "InstructionDidNotDeserialize"),
    (103, "InstructionDidNotSerialize"),
    // Constraint errors (2000-2999)
    (2000, "ConstraintMut"),
    (2001, "ConstraintHasOne"),
    (2002, "ConstraintSigner"),
    (2003, "ConstraintRaw"),
    (2004, "ConstraintOwner"),
    (2005, "ConstraintRentExempt"),
    (2006, "ConstraintSeeds"),
    (2007, "ConstraintExecutable"),
    (2008, "ConstraintState"),
    (2009, "ConstraintAssociated"),
    (2010, "ConstraintAssociatedInit"),
    (2011, "ConstraintClose"),
    (2012, "ConstraintAddress"),
    (2013, "ConstraintZero"),
    (2014, "ConstraintTokenMint"),
    (2015, "ConstraintTokenOwner"),
    (2016, "ConstraintMintMintAuthority"),
    (2017, "ConstraintMintFreezeAuthority"),
    (2018, "ConstraintMintDecimals"),
    (2019, "ConstraintSpace"),
    // Account errors (3000-3999)
    (3000, "AccountDiscriminatorAlreadySet"),
    (3001, "AccountDiscriminatorNotFound"),
    (3002, "AccountDiscriminatorMismatch"),
    (3003, "AccountDidNotDeserialize"),
    (3004, "AccountDidNotSerialize"),
    (3005, "AccountNotEnoughKeys"),
    (3006, "AccountNotMutable"),
    (3007, "AccountOwnedByWrongProgram"),
    (3008, "InvalidProgramId"),
    (3009, "InvalidProgramExecutable"),
    (3010, "AccountNotSigner"),
    (3011, "AccountNotSystemOwned"),
    (3012, "AccountNotInitialized"),
    (3013, "AccountNotProgramData"),
    (3014, "AccountNotAssociatedTokenAccount"),
    (3015, "AccountSysvarMismatch"),
    (3016, "AccountReallocExceedsLimit"),
    (3017, "AccountDuplicateReallocs"),
    // State errors (4000-4999)
    (4000, "StateInvalidAddress"),
    // Deprecated (5000-5999)
    (5000, "Deprecated"),
];

/// Name of an Anchor framework error code, if it is one.
pub fn error_name(code: u32) -> Option<&'static str> {
    ERROR_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, name)| *name)
}
