use super::SUN_PER_TRX;
use super::http::{AccountResourceMessage, ChainParameters};
use anyhow::{Context, Result};

/// Key names returned by `/wallet/getchainparameters`.
///
/// Tron nodes expose a list of (key,value) params. We only consume the fee-related ones.
pub const CHAIN_PARAM_ENERGY_FEE: &str = "getEnergyFee";
pub const CHAIN_PARAM_TX_FEE_PER_BYTE: &str = "getTransactionFee";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFees {
    /// Sun per energy unit.
    pub energy_fee_sun_per_energy: u64,
    /// Sun per bandwidth byte.
    pub tx_fee_sun_per_byte: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountResources {
    pub energy_used: u64,
    pub energy_limit: u64,
    pub net_used: u64,
    pub net_limit: u64,
    pub free_net_used: u64,
    pub free_net_limit: u64,
}

impl AccountResources {
    pub fn energy_available(self) -> u64 {
        self.energy_limit.saturating_sub(self.energy_used)
    }

    /// Staked plus daily free bandwidth left, in bytes.
    pub fn bandwidth_available(self) -> u64 {
        let staked = self.net_limit.saturating_sub(self.net_used);
        let free = self.free_net_limit.saturating_sub(self.free_net_used);
        staked.saturating_add(free)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStakeTotals {
    /// Total resource capacity on the network (energy units or bandwidth units).
    pub total_limit: u64,
    /// Total stake weight backing this resource (in sun).
    pub total_weight: u64,
}

fn ceil_div_u128(n: u128, d: u128) -> u128 {
    if d == 0 {
        return u128::MAX;
    }
    n.div_ceil(d)
}

/// Energy units implied by staking `frozen_sun` at the current network totals (rounded down).
pub fn energy_for_frozen_sun(frozen_sun: u64, totals: ResourceStakeTotals) -> u64 {
    let l = u128::from(totals.total_limit);
    let w = u128::from(totals.total_weight.max(1));
    let e = u128::from(frozen_sun).saturating_mul(l) / w;
    u64::try_from(e).unwrap_or(u64::MAX)
}

/// Minimum stake (sun) that yields at least `units` of the resource at the current totals,
/// with optional headroom in parts-per-million.
pub fn trx_sun_for_resource_units(
    units: u64,
    totals: ResourceStakeTotals,
    headroom_ppm: u64,
) -> u64 {
    let l = u128::from(totals.total_limit.max(1));
    let w = u128::from(totals.total_weight.max(1));
    let mut sun = ceil_div_u128(u128::from(units).saturating_mul(w), l);
    sun = ceil_div_u128(
        sun.saturating_mul(u128::from(1_000_000 + headroom_ppm)),
        1_000_000,
    );
    u64::try_from(sun).unwrap_or(u64::MAX)
}

pub fn parse_chain_fees(params: &ChainParameters) -> Result<ChainFees> {
    let mut energy_fee: Option<u64> = None;
    let mut tx_fee: Option<u64> = None;

    for p in &params.chain_parameter {
        match p.key.as_str() {
            CHAIN_PARAM_ENERGY_FEE => {
                energy_fee = Some(u64::try_from(p.value).context("energy_fee out of range")?);
            }
            CHAIN_PARAM_TX_FEE_PER_BYTE => {
                tx_fee = Some(u64::try_from(p.value).context("tx_fee_per_byte out of range")?);
            }
            _ => {}
        }
    }

    Ok(ChainFees {
        energy_fee_sun_per_energy: energy_fee.context("missing chain parameter getEnergyFee")?,
        tx_fee_sun_per_byte: tx_fee.context("missing chain parameter getTransactionFee")?,
    })
}

pub fn parse_account_resources(msg: &AccountResourceMessage) -> Result<AccountResources> {
    Ok(AccountResources {
        energy_used: u64::try_from(msg.energy_used).context("EnergyUsed out of range")?,
        energy_limit: u64::try_from(msg.energy_limit).context("EnergyLimit out of range")?,
        net_used: u64::try_from(msg.net_used).context("NetUsed out of range")?,
        net_limit: u64::try_from(msg.net_limit).context("NetLimit out of range")?,
        free_net_used: u64::try_from(msg.free_net_used).context("freeNetUsed out of range")?,
        free_net_limit: u64::try_from(msg.free_net_limit).context("freeNetLimit out of range")?,
    })
}

/// The HTTP API reports `TotalEnergyWeight` in whole TRX; totals are kept in sun.
pub fn parse_energy_stake_totals(msg: &AccountResourceMessage) -> Result<ResourceStakeTotals> {
    let weight_trx =
        u64::try_from(msg.total_energy_weight).context("TotalEnergyWeight out of range")?;
    Ok(ResourceStakeTotals {
        total_limit: u64::try_from(msg.total_energy_limit)
            .context("TotalEnergyLimit out of range")?,
        total_weight: weight_trx.saturating_mul(SUN_PER_TRX),
    })
}

/// Worst-case fee limit (sun):
/// `energy_required * energy_fee + tx_size_bytes * tx_fee_per_byte`.
pub fn quote_fee_limit_sun(energy_required: u64, tx_size_bytes: u64, fees: ChainFees) -> u64 {
    energy_required
        .saturating_mul(fees.energy_fee_sun_per_energy)
        .saturating_add(tx_size_bytes.saturating_mul(fees.tx_fee_sun_per_byte))
}
