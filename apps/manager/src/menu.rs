//! Numbered interactive menu. Each item collects its arguments and runs the matching command.

use crate::chain::Chain;
use crate::cli::{Command, execute};
use crate::ops::Manager;
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const ITEMS: &[(&str, &str)] = &[
    ("1", "Wallet balances and energy"),
    ("2", "Generate wallets"),
    ("3", "Import wallet"),
    ("4", "Distribute TRX to energy wallets"),
    ("5", "Freeze and delegate (rotation)"),
    ("6", "Freeze TRX"),
    ("7", "Delegate energy to main wallet"),
    ("8", "Reclaim delegated energy"),
    ("9", "Unfreeze TRX"),
    ("10", "Withdraw unfrozen TRX"),
    ("11", "Send TRX"),
    ("12", "Send token"),
    ("13", "Token balance"),
    ("14", "Account status"),
    ("15", "Run small-budget strategy"),
    ("16", "Energy plan"),
    ("17", "Show wallets and private keys"),
    ("18", "Backup wallet file"),
    ("19", "Transaction history"),
    ("0", "Quit"),
];

async fn prompt<R: AsyncBufRead + Unpin>(
    input: &mut R,
    out: &mut dyn Write,
    label: &str,
) -> Result<Option<String>> {
    write!(out, "{label}: ")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Empty answer means "use the default".
fn optional(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn yes(s: &str) -> bool {
    matches!(s.to_ascii_lowercase().as_str(), "y" | "yes")
}

macro_rules! ask {
    ($input:expr, $out:expr, $label:expr) => {
        match prompt($input, $out, $label).await? {
            Some(v) => v,
            None => return Ok(None),
        }
    };
}

/// Builds the command for `choice`. `Ok(None)` means input ended or the item was cancelled.
async fn command_for<C: Chain, R: AsyncBufRead + Unpin>(
    m: &Manager<C>,
    choice: &str,
    input: &mut R,
    out: &mut dyn Write,
) -> Result<Option<Command>> {
    let cmd = match choice {
        "1" => Command::Balances,
        "2" => {
            let mut force = false;
            if !m.store().is_empty() {
                let a = ask!(input, out, "Existing wallets will be replaced. Continue? (y/N)");
                if !yes(&a) {
                    return Ok(None);
                }
                force = true;
            }
            Command::Generate { force }
        }
        "3" => Command::Import {
            private_key: ask!(input, out, "Private key (64 hex)"),
            name: optional(ask!(input, out, "Wallet name (empty for next free)")),
        },
        "4" => Command::Distribute {
            amount: optional(ask!(
                input,
                out,
                &format!(
                    "TRX per wallet (empty for {})",
                    m.profile().distribute_default_trx
                )
            )),
        },
        "5" => Command::Rotate {
            amount: optional(ask!(
                input,
                out,
                &format!(
                    "TRX to freeze per wallet (empty for {})",
                    m.profile().freeze_default_trx
                )
            )),
        },
        "6" => Command::Freeze {
            wallet: ask!(input, out, "Wallet"),
            amount: ask!(input, out, "TRX to freeze"),
            resource: optional(ask!(input, out, "Resource ENERGY/BANDWIDTH (empty for ENERGY)"))
                .unwrap_or_else(|| "ENERGY".to_string()),
        },
        "7" => Command::Delegate {
            wallet: ask!(input, out, "Wallet"),
            amount: optional(ask!(input, out, "TRX of stake (empty for all)")),
        },
        "8" => Command::Undelegate {
            wallet: ask!(input, out, "Wallet"),
            amount: optional(ask!(input, out, "TRX of stake (empty for all)")),
        },
        "9" => Command::Unfreeze {
            wallet: ask!(input, out, "Wallet"),
            amount: optional(ask!(input, out, "TRX (empty for all)")),
            resource: optional(ask!(input, out, "Resource ENERGY/BANDWIDTH (empty for ENERGY)"))
                .unwrap_or_else(|| "ENERGY".to_string()),
        },
        "10" => Command::Withdraw {
            wallet: ask!(input, out, "Wallet"),
        },
        "11" => Command::SendTrx {
            wallet: ask!(input, out, "From wallet"),
            to: ask!(input, out, "To address"),
            amount: ask!(input, out, "TRX"),
            memo: optional(ask!(input, out, "Memo (optional)")),
        },
        "12" => Command::SendToken {
            wallet: ask!(input, out, "From wallet"),
            to: ask!(input, out, "To address"),
            amount: ask!(input, out, &format!("{} amount", m.token().symbol)),
            abi_file: optional(ask!(input, out, "ABI file (optional)")).map(PathBuf::from),
        },
        "13" => Command::TokenBalance {
            wallet: ask!(input, out, "Wallet"),
            abi_file: None,
        },
        "14" => Command::Status {
            wallet: ask!(input, out, "Wallet"),
        },
        "15" => Command::Strategy,
        "16" => {
            let energy = ask!(input, out, "Target energy");
            match energy.parse::<u64>() {
                Ok(energy) => Command::Plan { energy },
                Err(_) => anyhow::bail!("invalid energy amount {energy:?}"),
            }
        }
        "17" => {
            writeln!(out, "WARNING: private keys will be shown on screen.")?;
            let a = ask!(input, out, "Show them? (y/N)");
            if !yes(&a) {
                return Ok(None);
            }
            Command::Export { yes: true }
        }
        "18" => Command::Backup {
            path: optional(ask!(input, out, "Backup file (empty for timestamped name)"))
                .map(PathBuf::from),
            note: ask!(input, out, "Note (optional)"),
        },
        "19" => Command::History,
        other => anyhow::bail!("unknown menu item {other:?}"),
    };
    Ok(Some(cmd))
}

/// Loops until `0` or end of input. Errors from an item are printed and the menu continues.
pub async fn run_menu<C: Chain, R: AsyncBufRead + Unpin>(
    m: &mut Manager<C>,
    input: &mut R,
    out: &mut dyn Write,
) -> Result<()> {
    loop {
        writeln!(out)?;
        writeln!(out, "== {} ==", m.profile().title)?;
        for (key, label) in ITEMS {
            writeln!(out, "{key:>3}. {label}")?;
        }
        let Some(choice) = prompt(input, out, "Choose").await? else {
            return Ok(());
        };
        match choice.as_str() {
            "0" | "q" | "quit" => return Ok(()),
            "" => continue,
            _ => {}
        }

        let result = match command_for(m, &choice, input, out).await {
            Ok(Some(cmd)) => execute(m, cmd, out).await,
            Ok(None) => continue,
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            writeln!(out, "error: {err:#}")?;
            if let Some(hint) = tron::error::classify_error(&err).hint() {
                writeln!(out, "hint: {hint}")?;
            }
        }
    }
}
