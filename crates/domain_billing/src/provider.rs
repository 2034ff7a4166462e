//! Provider records

use serde::{Deserialize, Serialize};

use core_kernel::{Identity, MoneyError, ProviderId, TokenAmount};

/// A registered seller of a recurring service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Unique identifier
    pub id: ProviderId,
    /// Owning identity
    pub owner: Identity,
    /// Fee charged per billing period
    pub fee: TokenAmount,
    /// Accrued earnings not yet withdrawn
    pub balance: TokenAmount,
    /// Whether the provider accepts new subscribers
    pub is_active: bool,
}

impl Provider {
    /// Creates an active provider with an empty balance
    pub fn new(id: ProviderId, owner: Identity, fee: TokenAmount) -> Self {
        Self {
            id,
            owner,
            fee,
            balance: TokenAmount::ZERO,
            is_active: true,
        }
    }

    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        &self.owner == identity
    }

    /// Balance after crediting `amount`
    pub(crate) fn credited(&self, amount: TokenAmount) -> Result<TokenAmount, MoneyError> {
        self.balance.checked_add(amount)
    }
}
