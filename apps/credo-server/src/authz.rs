//! Per-operation ability checks.
//!
//! Abilities are per-target predicates over (caller, target), distinct from
//! the scope checks on the token itself. Every rule here is
//! ownership-or-admin; they stay as separate functions because the surface
//! is keyed by operation, not because the rules differ today.

use credo_storage::Account;

pub fn can_view(caller: &Account, target: &Account) -> bool {
    caller.is_admin || caller.id == target.id
}

pub fn can_update(caller: &Account, target: &Account) -> bool {
    caller.is_admin || caller.id == target.id
}

pub fn can_delete(caller: &Account, target: &Account) -> bool {
    caller.is_admin || caller.id == target.id
}
