//! Human-readable output for operation results.

use crate::amount::format_sun;
use crate::history::TxRecord;
use crate::ops::{EnergyPlan, Overview, StepOutcome, WalletStep};
use crate::rotation::{DelegateOutcome, RotationReport, WalletOutcome};
use crate::store::WalletFile;
use crate::strategy::StrategyReport;
use anyhow::Result;
use std::io::Write;

const RULE: &str = "------------------------------------------------------------";

pub fn print_overview(out: &mut dyn Write, o: &Overview, show_savings: bool) -> Result<()> {
    writeln!(out, "{}", o.title)?;
    writeln!(out, "{RULE}")?;
    for w in &o.wallets {
        writeln!(out, "{} [{}] {}", w.label, w.role.label(), w.address)?;
        match &w.error {
            Some(err) => writeln!(out, "  query failed: {err}")?,
            None => {
                writeln!(out, "  balance: {} TRX", format_sun(w.balance_sun))?;
                writeln!(out, "  frozen:  {} TRX", format_sun(w.frozen_sun))?;
                writeln!(
                    out,
                    "  energy:  {} / {}",
                    w.energy_available, w.energy_limit
                )?;
                writeln!(out, "  bandwidth: {} bytes", w.bandwidth_available)?;
            }
        }
    }
    writeln!(out, "{RULE}")?;
    writeln!(out, "total balance: {} TRX", format_sun(o.total_balance_sun))?;
    writeln!(out, "total frozen:  {} TRX", format_sun(o.total_frozen_sun))?;
    writeln!(out, "total energy:  {}", o.total_energy)?;
    writeln!(
        out,
        "transfers possible: {} ({} energy each)",
        o.transfers_possible, o.energy_per_transfer
    )?;
    if show_savings {
        writeln!(out, "saved fees: {} TRX", o.saved_fee_trx)?;
        writeln!(out, "return on frozen TRX: {:.1}%", o.roi_percent)?;
    }
    Ok(())
}

fn outcome_line(o: &StepOutcome) -> String {
    match o {
        StepOutcome::Sent { txid } => format!("ok {txid}"),
        StepOutcome::Skipped { reason } => format!("skipped: {reason}"),
        StepOutcome::Failed { error } => format!("FAILED: {error}"),
    }
}

pub fn print_steps(out: &mut dyn Write, title: &str, steps: &[WalletStep]) -> Result<()> {
    writeln!(out, "{title}")?;
    for s in steps {
        writeln!(out, "  {} {}: {}", s.wallet, s.address, outcome_line(&s.outcome))?;
    }
    let ok = steps.iter().filter(|s| s.outcome.is_sent()).count();
    writeln!(out, "  {ok}/{} succeeded", steps.len())?;
    Ok(())
}

pub fn print_rotation(out: &mut dyn Write, r: &RotationReport) -> Result<()> {
    writeln!(
        out,
        "rotation: {} TRX per wallet, delegating to {}",
        format_sun(r.amount_sun),
        r.main_wallet
    )?;
    for w in &r.wallets {
        let line = match &w.outcome {
            WalletOutcome::Skipped { balance_sun } => {
                format!("skipped, balance {} TRX", format_sun(*balance_sun))
            }
            WalletOutcome::SignerUnavailable { error } => format!("no usable key: {error}"),
            WalletOutcome::BalanceQueryFailed { error } => {
                format!("balance query FAILED: {error}")
            }
            WalletOutcome::FreezeFailed { error } => format!("freeze FAILED: {error}"),
            WalletOutcome::Frozen {
                freeze_txid,
                delegate,
            } => match delegate {
                DelegateOutcome::Delegated { txid } => {
                    format!("frozen {freeze_txid}, delegated {txid}")
                }
                DelegateOutcome::Failed { error } => {
                    format!("frozen {freeze_txid}, delegate FAILED: {error}")
                }
            },
        };
        writeln!(out, "  {} {}: {line}", w.wallet, w.address)?;
    }
    writeln!(
        out,
        "  frozen {}, delegated {} of {}",
        r.frozen_count(),
        r.delegated_count(),
        r.wallets.len()
    )?;
    Ok(())
}

pub fn print_strategy(out: &mut dyn Write, r: &StrategyReport) -> Result<()> {
    print_steps(out, "1. distribute", &r.distribute)?;
    if !r.freeze.is_empty() {
        print_steps(out, "2. freeze", &r.freeze)?;
    }
    if !r.delegate.is_empty() {
        print_steps(out, "3. delegate", &r.delegate)?;
    }
    match r.stopped_at {
        None => writeln!(out, "strategy completed")?,
        Some(step) => writeln!(out, "strategy stopped at: {}", step.label())?,
    }
    Ok(())
}

/// Lists wallets; private keys only when `show_keys`.
pub fn print_wallets(out: &mut dyn Write, file: &WalletFile, show_keys: bool) -> Result<()> {
    for (name, w) in &file.wallets {
        writeln!(out, "{name} [{}] {}", w.role.label(), w.address)?;
        if let Some(d) = &w.display_name {
            writeln!(out, "  name: {d}")?;
        }
        if let Some(d) = &w.description {
            writeln!(out, "  {d}")?;
        }
        if let Some(r) = w.recommended_trx {
            writeln!(out, "  recommended: {r} TRX")?;
        }
        if show_keys {
            writeln!(out, "  private key: {}", w.private_key)?;
        }
    }
    if let Some(main) = &file.main_wallet {
        writeln!(out, "main wallet: {main}")?;
    }
    Ok(())
}

pub fn print_history(out: &mut dyn Write, records: &[TxRecord]) -> Result<()> {
    if records.is_empty() {
        writeln!(out, "no transactions recorded")?;
        return Ok(());
    }
    for r in records {
        writeln!(
            out,
            "{} {:<14} {} -> {} {} [{}] {}",
            r.timestamp.format("%Y-%m-%d %H:%M:%S"),
            r.kind.label(),
            r.from_address,
            r.to_address,
            r.amount,
            r.status,
            r.txid
        )?;
    }
    Ok(())
}

pub fn print_plan(out: &mut dyn Write, p: &EnergyPlan) -> Result<()> {
    writeln!(
        out,
        "{} energy needs about {} TRX frozen ({} energy per TRX at current network totals)",
        p.target_energy,
        format_sun(p.required_sun),
        p.energy_per_trx
    )?;
    Ok(())
}
