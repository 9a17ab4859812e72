//! In-memory [`Chain`] used by unit tests. Balances move like on chain so sequences can be
//! asserted end to end.

use crate::chain::{AccountState, Chain, Token};
use alloy::primitives::U256;
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tron::protocol::ResourceCode;
use tron::{AccountResources, ResourceStakeTotals, TronAddress, TxSigner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Account(TronAddress),
    Transfer {
        from: TronAddress,
        to: TronAddress,
        amount_sun: u64,
        memo: Option<String>,
    },
    Freeze {
        owner: TronAddress,
        amount_sun: u64,
        resource: ResourceCode,
    },
    Unfreeze {
        owner: TronAddress,
        amount_sun: u64,
    },
    Delegate {
        owner: TronAddress,
        receiver: TronAddress,
        amount_sun: u64,
    },
    Undelegate {
        owner: TronAddress,
        receiver: TronAddress,
        amount_sun: u64,
    },
    Withdraw(TronAddress),
    TokenTransfer {
        from: TronAddress,
        to: TronAddress,
        amount: U256,
    },
}

#[derive(Default)]
struct State {
    accounts: HashMap<TronAddress, AccountState>,
    energy_limit: HashMap<TronAddress, u64>,
    token_balances: HashMap<TronAddress, U256>,
    delegations: HashMap<(TronAddress, TronAddress), u64>,
    fail_balance: HashSet<TronAddress>,
    fail_freeze: HashSet<TronAddress>,
    fail_delegate: HashSet<TronAddress>,
    fail_transfer_to: HashSet<TronAddress>,
    calls: Vec<Call>,
    next_txid: u64,
}

impl State {
    fn txid(&mut self) -> String {
        self.next_txid += 1;
        format!("{:064x}", self.next_txid)
    }

    fn account_mut(&mut self, addr: TronAddress) -> &mut AccountState {
        self.accounts.entry(addr).or_default()
    }
}

#[derive(Default)]
pub(crate) struct FakeChain {
    state: Mutex<State>,
}

impl FakeChain {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn fund(&self, addr: TronAddress, sun: u64) {
        let mut s = self.lock();
        let a = s.account_mut(addr);
        a.exists = true;
        a.balance_sun += sun;
    }

    pub fn set_energy_limit(&self, addr: TronAddress, energy: u64) {
        self.lock().energy_limit.insert(addr, energy);
    }

    pub fn set_token_balance(&self, addr: TronAddress, v: U256) {
        self.lock().token_balances.insert(addr, v);
    }

    pub fn fail_balance(&self, addr: TronAddress) {
        self.lock().fail_balance.insert(addr);
    }

    pub fn fail_freeze(&self, addr: TronAddress) {
        self.lock().fail_freeze.insert(addr);
    }

    pub fn fail_delegate(&self, addr: TronAddress) {
        self.lock().fail_delegate.insert(addr);
    }

    pub fn fail_transfer_to(&self, addr: TronAddress) {
        self.lock().fail_transfer_to.insert(addr);
    }

    pub fn state_of(&self, addr: TronAddress) -> AccountState {
        self.lock().accounts.get(&addr).copied().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls that would have broadcast a transaction.
    pub fn submissions(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Account(_)))
            .collect()
    }
}

impl Chain for FakeChain {
    async fn account(&self, addr: TronAddress) -> Result<AccountState> {
        let mut s = self.lock();
        s.calls.push(Call::Account(addr));
        if s.fail_balance.contains(&addr) {
            anyhow::bail!("getaccount: connection reset");
        }
        Ok(s.accounts.get(&addr).copied().unwrap_or_default())
    }

    async fn resources(&self, addr: TronAddress) -> Result<AccountResources> {
        let s = self.lock();
        let limit = s.energy_limit.get(&addr).copied().unwrap_or(0);
        Ok(AccountResources {
            energy_limit: limit,
            free_net_limit: 600,
            ..AccountResources::default()
        })
    }

    async fn energy_totals(&self, _addr: TronAddress) -> Result<ResourceStakeTotals> {
        Ok(ResourceStakeTotals {
            total_limit: 180_000_000_000,
            total_weight: 19_000_000_000 * tron::SUN_PER_TRX,
        })
    }

    async fn delegated_to(
        &self,
        owner: TronAddress,
        receiver: TronAddress,
        _resource: ResourceCode,
    ) -> Result<u64> {
        let s = self.lock();
        Ok(s.delegations.get(&(owner, receiver)).copied().unwrap_or(0))
    }

    async fn can_delegate_max(&self, owner: TronAddress, resource: ResourceCode) -> Result<u64> {
        Ok(self
            .lock()
            .accounts
            .get(&owner)
            .map(|a| a.frozen_sun(resource))
            .unwrap_or(0))
    }

    async fn transfer_trx(
        &self,
        signer: &dyn TxSigner,
        to: TronAddress,
        amount_sun: u64,
        memo: Option<&str>,
    ) -> Result<String> {
        let from = signer.address();
        let mut s = self.lock();
        s.calls.push(Call::Transfer {
            from,
            to,
            amount_sun,
            memo: memo.map(str::to_string),
        });
        if s.fail_transfer_to.contains(&to) {
            anyhow::bail!("broadcasthex failed: SERVER_BUSY");
        }
        let a = s.account_mut(from);
        if a.balance_sun < amount_sun {
            anyhow::bail!("Validate TransferContract error, balance is not sufficient");
        }
        a.balance_sun -= amount_sun;
        let b = s.account_mut(to);
        b.exists = true;
        b.balance_sun += amount_sun;
        Ok(s.txid())
    }

    async fn freeze(
        &self,
        signer: &dyn TxSigner,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String> {
        let owner = signer.address();
        let mut s = self.lock();
        s.calls.push(Call::Freeze {
            owner,
            amount_sun,
            resource,
        });
        if s.fail_freeze.contains(&owner) {
            anyhow::bail!("Validate FreezeBalanceV2Contract error, frozenBalance must be positive");
        }
        let a = s.account_mut(owner);
        if a.balance_sun < amount_sun {
            anyhow::bail!("Validate FreezeBalanceV2Contract error, balance is not sufficient");
        }
        a.balance_sun -= amount_sun;
        match resource {
            ResourceCode::Bandwidth => a.frozen_bandwidth_sun += amount_sun,
            _ => a.frozen_energy_sun += amount_sun,
        }
        Ok(s.txid())
    }

    async fn unfreeze(
        &self,
        signer: &dyn TxSigner,
        amount_sun: u64,
        resource: ResourceCode,
    ) -> Result<String> {
        let owner = signer.address();
        let mut s = self.lock();
        s.calls.push(Call::Unfreeze { owner, amount_sun });
        let a = s.account_mut(owner);
        let frozen = match resource {
            ResourceCode::Bandwidth => &mut a.frozen_bandwidth_sun,
            _ => &mut a.frozen_energy_sun,
        };
        if *frozen < amount_sun {
            anyhow::bail!("Validate UnfreezeBalanceV2Contract error, no frozen balance");
        }
        *frozen -= amount_sun;
        Ok(s.txid())
    }

    async fn delegate(
        &self,
        signer: &dyn TxSigner,
        receiver: TronAddress,
        amount_sun: u64,
        _resource: ResourceCode,
    ) -> Result<String> {
        let owner = signer.address();
        let mut s = self.lock();
        s.calls.push(Call::Delegate {
            owner,
            receiver,
            amount_sun,
        });
        if s.fail_delegate.contains(&owner) {
            anyhow::bail!(
                "Validate DelegateResourceContract error, \
                 delegateBalance must be less than available"
            );
        }
        let a = s.account_mut(owner);
        if a.frozen_energy_sun < amount_sun {
            anyhow::bail!("Validate DelegateResourceContract error, no frozen balance");
        }
        a.frozen_energy_sun -= amount_sun;
        a.delegated_energy_sun += amount_sun;
        *s.delegations.entry((owner, receiver)).or_default() += amount_sun;
        Ok(s.txid())
    }

    async fn undelegate(
        &self,
        signer: &dyn TxSigner,
        receiver: TronAddress,
        amount_sun: u64,
        _resource: ResourceCode,
    ) -> Result<String> {
        let owner = signer.address();
        let mut s = self.lock();
        s.calls.push(Call::Undelegate {
            owner,
            receiver,
            amount_sun,
        });
        let pair = s.delegations.entry((owner, receiver)).or_default();
        if *pair < amount_sun {
            anyhow::bail!("Validate UnDelegateResourceContract error, insufficient delegated");
        }
        *pair -= amount_sun;
        let a = s.account_mut(owner);
        a.delegated_energy_sun -= amount_sun;
        a.frozen_energy_sun += amount_sun;
        Ok(s.txid())
    }

    async fn withdraw_unfrozen(&self, signer: &dyn TxSigner) -> Result<String> {
        let mut s = self.lock();
        s.calls.push(Call::Withdraw(signer.address()));
        Ok(s.txid())
    }

    async fn transfer_token(
        &self,
        signer: &dyn TxSigner,
        _token: &Token,
        to: TronAddress,
        amount: U256,
    ) -> Result<String> {
        let from = signer.address();
        let mut s = self.lock();
        s.calls.push(Call::TokenTransfer { from, to, amount });
        let have = s.token_balances.get(&from).copied().unwrap_or_default();
        if have < amount {
            anyhow::bail!("REVERT opcode executed");
        }
        s.token_balances.insert(from, have - amount);
        let to_have = s.token_balances.get(&to).copied().unwrap_or_default();
        s.token_balances.insert(to, to_have + amount);
        Ok(s.txid())
    }

    async fn token_balance(&self, owner: TronAddress, _token: &Token) -> Result<U256> {
        Ok(self
            .lock()
            .token_balances
            .get(&owner)
            .copied()
            .unwrap_or_default())
    }
}
