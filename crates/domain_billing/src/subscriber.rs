//! Subscriber records

use serde::{Deserialize, Serialize};

use core_kernel::{Identity, SubscriberId, TokenAmount};

/// A registered buyer funding a spendable balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Unique identifier
    pub id: SubscriberId,
    /// Owning identity
    pub owner: Identity,
    /// Spendable balance
    pub current_balance: TokenAmount,
    /// Lifetime deposits, never decreases
    pub total_deposits: TokenAmount,
}

impl Subscriber {
    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        &self.owner == identity
    }
}
