//! Account role resolution
//!
//! A message header partitions the account key list into four contiguous
//! regions: writable signers, read-only signers, writable non-signers and
//! read-only non-signers. Roles are derived from position and the three
//! header counts only.

use std::collections::HashMap;

use crate::errors::{DebuggerError, DebuggerResult};
use crate::models::trace::AccountRegion;
use crate::models::transaction::{LoadedAddresses, MessageHeader};

/// Signer and writable status of one account position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountRole {
    pub is_signer: bool,
    pub is_writable: bool,
    pub region: AccountRegion,
}

impl AccountRole {
    /// Role reported for positions outside the account list. Callers must
    /// read this as "unknown", not as a statement about the account.
    pub const UNKNOWN: AccountRole = AccountRole {
        is_signer: false,
        is_writable: false,
        region: AccountRegion::Unknown,
    };

    fn in_region(region: AccountRegion) -> Self {
        Self {
            is_signer: matches!(
                region,
                AccountRegion::WritableSigner | AccountRegion::ReadonlySigner
            ),
            is_writable: matches!(
                region,
                AccountRegion::WritableSigner | AccountRegion::WritableNonSigner
            ),
            region,
        }
    }
}

/// Resolve the role of the static account at `index`.
pub fn resolve(account_keys: &[String], header: &MessageHeader, index: usize) -> AccountRole {
    resolve_position(account_keys.len(), header, index)
}

fn resolve_position(account_count: usize, header: &MessageHeader, index: usize) -> AccountRole {
    if index >= account_count {
        return AccountRole::UNKNOWN;
    }

    let signers = header.num_required_signatures as usize;
    let readonly_signed = header.num_readonly_signed_accounts as usize;
    let readonly_unsigned = header.num_readonly_unsigned_accounts as usize;

    let region = if index < signers {
        if index < signers.saturating_sub(readonly_signed) {
            AccountRegion::WritableSigner
        } else {
            AccountRegion::ReadonlySigner
        }
    } else if index < account_count.saturating_sub(readonly_unsigned) {
        AccountRegion::WritableNonSigner
    } else {
        AccountRegion::ReadonlyNonSigner
    };

    AccountRole::in_region(region)
}

/// Check that the header counts can partition `account_count` keys.
pub fn validate_header(account_count: usize, header: &MessageHeader) -> DebuggerResult<()> {
    let signers = header.num_required_signatures as usize;
    let readonly_signed = header.num_readonly_signed_accounts as usize;
    let readonly_unsigned = header.num_readonly_unsigned_accounts as usize;

    let reason = if signers > account_count {
        Some(format!("{} required signatures", signers))
    } else if readonly_signed > signers {
        Some(format!(
            "{} read-only signers but only {} signers",
            readonly_signed, signers
        ))
    } else if readonly_unsigned > account_count - signers {
        Some(format!(
            "{} read-only non-signers but only {} non-signers",
            readonly_unsigned,
            account_count - signers
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DebuggerError::InvalidHeader {
            account_count,
            reason,
        }),
        None => Ok(()),
    }
}

/// Role lookup over the full account list of one transaction: the static
/// keys followed by any addresses loaded from lookup tables.
pub struct AccountRoles<'a> {
    keys: &'a [String],
    header: MessageHeader,
    loaded_writable: &'a [String],
    loaded_readonly: &'a [String],
    positions: HashMap<&'a str, usize>,
}

impl<'a> AccountRoles<'a> {
    pub fn new(
        keys: &'a [String],
        header: MessageHeader,
        loaded: Option<&'a LoadedAddresses>,
    ) -> Self {
        let (loaded_writable, loaded_readonly): (&[String], &[String]) = match loaded {
            Some(loaded) => (loaded.writable.as_slice(), loaded.readonly.as_slice()),
            None => (&[], &[]),
        };

        let mut positions = HashMap::new();
        for (index, key) in keys
            .iter()
            .chain(loaded_writable)
            .chain(loaded_readonly)
            .enumerate()
        {
            positions.entry(key.as_str()).or_insert(index);
        }

        Self {
            keys,
            header,
            loaded_writable,
            loaded_readonly,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len() + self.loaded_writable.len() + self.loaded_readonly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Address at a position of the full account list.
    pub fn pubkey_at(&self, index: usize) -> Option<&'a str> {
        let (keys, writable, readonly) = (self.keys, self.loaded_writable, self.loaded_readonly);
        let writable_end = keys.len() + writable.len();

        if index < keys.len() {
            Some(keys[index].as_str())
        } else if index < writable_end {
            Some(writable[index - keys.len()].as_str())
        } else {
            readonly.get(index - writable_end).map(String::as_str)
        }
    }

    /// First position of an address in the full account list.
    pub fn position_of(&self, pubkey: &str) -> Option<usize> {
        self.positions.get(pubkey).copied()
    }

    pub fn resolve(&self, index: usize) -> AccountRole {
        let static_count = self.keys.len();
        if index < static_count {
            return resolve_position(static_count, &self.header, index);
        }

        let writable_end = static_count + self.loaded_writable.len();
        if index < writable_end {
            AccountRole::in_region(AccountRegion::WritableNonSigner)
        } else if index < self.len() {
            AccountRole::in_region(AccountRegion::ReadonlyNonSigner)
        } else {
            AccountRole::UNKNOWN
        }
    }

    /// Number of positions the transaction may write to.
    pub fn writable_count(&self) -> usize {
        (0..self.len())
            .filter(|&index| self.resolve(index).is_writable)
            .count()
    }
}
