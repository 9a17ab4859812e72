use crate::amount::{format_sun, format_token, parse_token_units, parse_trx_to_sun, trx_to_sun};
use crate::chain::{Chain, Token, TronChain};
use crate::config::AppConfig;
use crate::history::History;
use crate::menu::run_menu;
use crate::ops::Manager;
use crate::pacer::Pacer;
use crate::profile::{BudgetKind, BudgetProfile};
use crate::report;
use crate::secrets::EnvSecrets;
use crate::store::WalletStore;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tron::protocol::ResourceCode;
use tron::{Trc20Abi, TronAddress, TronHttp};

#[derive(Debug, Parser)]
#[command(author, version, about = "TRON wallet and energy manager", long_about = None)]
pub struct Cli {
    /// Wallet layout and defaults.
    #[arg(long, value_enum, default_value = "multi", env = "MANAGER_PROFILE")]
    pub profile: BudgetKind,

    /// Wallet file; overrides MANAGER_WALLET_FILE and the profile default.
    #[arg(long)]
    pub wallet_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Numbered interactive menu (default)
    Menu,

    /// Generate a fresh wallet set for the profile
    Generate {
        /// Replace an existing wallet set
        #[arg(long)]
        force: bool,
    },

    /// Import a wallet from a 64-hex private key
    Import {
        #[arg(env = "MANAGER_IMPORT_PRIVATE_KEY_HEX", hide_env_values = true)]
        private_key: String,

        /// Wallet name (default: next free wallet_X)
        #[arg(long)]
        name: Option<String>,
    },

    /// Balances, frozen TRX and energy of every wallet
    Balances,

    /// Send TRX from the main wallet to every energy provider
    Distribute {
        /// TRX per provider (default: profile default)
        amount: Option<String>,
    },

    /// Freeze in every provider and delegate the energy to the main wallet
    Rotate {
        /// TRX to freeze per provider (default: profile default)
        amount: Option<String>,
    },

    /// Freeze TRX for ENERGY or BANDWIDTH
    Freeze {
        /// Wallet name or address
        wallet: String,
        /// TRX, at least 1
        amount: String,
        #[arg(long, default_value = "ENERGY")]
        resource: String,
    },

    /// Delegate energy to the main wallet
    Delegate {
        wallet: String,
        /// TRX of stake (default: everything delegatable)
        amount: Option<String>,
    },

    /// Reclaim energy delegated to the main wallet
    Undelegate {
        wallet: String,
        /// TRX of stake (default: everything delegated to the main wallet)
        amount: Option<String>,
    },

    /// Start unstaking frozen TRX
    Unfreeze {
        wallet: String,
        /// TRX (default: everything frozen for the resource)
        amount: Option<String>,
        #[arg(long, default_value = "ENERGY")]
        resource: String,
    },

    /// Withdraw TRX whose unstaking period has passed
    Withdraw { wallet: String },

    /// Send TRX
    SendTrx {
        wallet: String,
        to: String,
        amount: String,
        #[arg(long)]
        memo: Option<String>,
    },

    /// Send the configured TRC20 token
    SendToken {
        wallet: String,
        to: String,
        amount: String,
        /// Contract ABI JSON used to resolve `transfer`
        #[arg(long)]
        abi_file: Option<PathBuf>,
    },

    /// Balance of the configured TRC20 token
    TokenBalance {
        wallet: String,
        #[arg(long)]
        abi_file: Option<PathBuf>,
    },

    /// Whether an account is activated on chain
    Status { wallet: String },

    /// distribute, freeze all, delegate all
    Strategy,

    /// TRX that must be frozen for a target amount of energy
    Plan { energy: u64 },

    /// Print wallets including private keys
    Export {
        /// Confirm printing private keys
        #[arg(long)]
        yes: bool,
    },

    /// Write a backup of the wallet file
    Backup {
        path: Option<PathBuf>,
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Transactions sent by this tool
    History,
}

pub async fn run(cli: Cli, cfg: AppConfig) -> Result<()> {
    let profile = BudgetProfile::for_kind(cli.profile);
    let wallet_file = cli
        .wallet_file
        .or_else(|| cfg.files.wallet_file.clone())
        .unwrap_or_else(|| PathBuf::from(profile.default_wallet_file));

    let http = TronHttp::new(
        &cfg.tron.api_url,
        cfg.tron.api_key.as_deref(),
        cfg.tron.http_timeout,
    )?;
    let chain = TronChain::new(http, cfg.tron.fee_policy);

    let mut token = Token::new(cfg.token.contract, cfg.token.decimals, cfg.token.symbol.clone());
    if let Some(path) = &cfg.token.abi_file {
        token = token.with_abi(Trc20Abi::load(path)?);
    }

    let store = WalletStore::load(wallet_file)?;
    let mut manager = Manager::new(
        chain,
        store,
        History::new(cfg.files.history_file.clone()),
        profile,
        token,
    )
    .with_pacer(Pacer::new(cfg.pacing))
    .with_energy_per_transfer(cfg.strategy.energy_per_transfer);
    if !cfg.secrets.private_keys.is_empty() {
        let secrets = EnvSecrets::new(&cfg.secrets.private_keys)?;
        tracing::info!(keys = secrets.len(), "using keys from MANAGER_PRIVATE_KEYS_HEX_CSV");
        manager = manager.with_secrets(Box::new(secrets));
    }

    let command = cli.command.unwrap_or(Command::Menu);
    let mut stdout = std::io::stdout();
    if command == Command::Menu {
        let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
        return run_menu(&mut manager, &mut stdin, &mut stdout).await;
    }
    execute(&mut manager, command, &mut stdout).await
}

/// Accepts a wallet name (`wallet_B`) or a stored address.
pub fn resolve_wallet<C: Chain>(m: &Manager<C>, wallet: &str) -> Result<String> {
    let wallet = wallet.trim();
    let file = m.store().file();
    if file.wallets.contains_key(wallet) {
        return Ok(wallet.to_string());
    }
    match file.find_by_address(wallet) {
        Some((name, _)) => Ok(name.clone()),
        None => anyhow::bail!(
            "unknown wallet {wallet} (use a name such as wallet_A or a stored address)"
        ),
    }
}

fn parse_to(to: &str) -> Result<TronAddress> {
    TronAddress::parse_text(to.trim()).with_context(|| format!("invalid recipient address {to}"))
}

fn opt_sun(label: &str, amount: Option<&str>) -> Result<Option<u64>> {
    amount.map(|a| parse_trx_to_sun(label, a)).transpose()
}

fn load_abi<C: Chain>(m: &mut Manager<C>, abi_file: Option<&PathBuf>) -> Result<()> {
    if let Some(path) = abi_file {
        m.token = m.token.clone().with_abi(Trc20Abi::load(path)?);
    }
    Ok(())
}

/// Runs one command against `m`, writing results to `out`.
pub async fn execute<C: Chain>(
    m: &mut Manager<C>,
    command: Command,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Menu => anyhow::bail!("menu cannot be nested"),
        Command::Generate { force } => {
            if !m.store().is_empty() && !force {
                anyhow::bail!(
                    "{} already holds {} wallets; pass --force to replace them",
                    m.store().path().display(),
                    m.store().file().wallets.len()
                );
            }
            m.generate()?;
            writeln!(
                out,
                "generated {} wallets in {}",
                m.store().file().wallets.len(),
                m.store().path().display()
            )?;
            writeln!(
                out,
                "WARNING: the file stores private keys in plaintext; back it up and keep it private"
            )?;
            report::print_wallets(out, m.store().file(), false)?;
        }
        Command::Import { private_key, name } => {
            let name = m.import(&private_key, name)?;
            let rec = m.store().get(&name)?;
            writeln!(out, "imported {name} [{}] {}", rec.role.label(), rec.address)?;
        }
        Command::Balances => {
            let o = m.overview().await?;
            let show_savings = m.profile().kind == BudgetKind::SmallBudget;
            report::print_overview(out, &o, show_savings)?;
        }
        Command::Distribute { amount } => {
            let sun = match amount {
                Some(a) => parse_trx_to_sun("distribute amount", &a)?,
                None => trx_to_sun(m.profile().distribute_default_trx),
            };
            let steps = m.distribute(sun).await?;
            report::print_steps(out, &format!("distribute {} TRX", format_sun(sun)), &steps)?;
        }
        Command::Rotate { amount } => {
            let sun = match amount {
                Some(a) => parse_trx_to_sun("freeze amount", &a)?,
                None => trx_to_sun(m.profile().freeze_default_trx),
            };
            let r = m.rotate(sun).await?;
            report::print_rotation(out, &r)?;
        }
        Command::Freeze {
            wallet,
            amount,
            resource,
        } => {
            let sun = parse_trx_to_sun("freeze amount", &amount)?;
            let resource = ResourceCode::parse(&resource)?;
            let name = resolve_wallet(m, &wallet)?;
            let txid = m.freeze(&name, sun, resource).await?;
            writeln!(
                out,
                "froze {} TRX for {} in {name}: {txid}",
                format_sun(sun),
                resource.as_api_str()
            )?;
        }
        Command::Delegate { wallet, amount } => {
            let sun = opt_sun("delegate amount", amount.as_deref())?;
            let name = resolve_wallet(m, &wallet)?;
            match m.delegate(&name, sun).await? {
                Some(txid) => writeln!(out, "delegated energy from {name}: {txid}")?,
                None => {
                    writeln!(out, "{name} has nothing to delegate; freeze TRX for energy first")?
                }
            }
        }
        Command::Undelegate { wallet, amount } => {
            let sun = opt_sun("undelegate amount", amount.as_deref())?;
            let name = resolve_wallet(m, &wallet)?;
            match m.undelegate(&name, sun).await? {
                Some(txid) => writeln!(out, "reclaimed energy delegated by {name}: {txid}")?,
                None => writeln!(out, "{name} has no delegated energy")?,
            }
        }
        Command::Unfreeze {
            wallet,
            amount,
            resource,
        } => {
            let sun = opt_sun("unfreeze amount", amount.as_deref())?;
            let resource = ResourceCode::parse(&resource)?;
            let name = resolve_wallet(m, &wallet)?;
            match m.unfreeze(&name, sun, resource).await? {
                Some(txid) => writeln!(
                    out,
                    "unfreeze started for {name}: {txid} (withdraw after the unstaking period)"
                )?,
                None => writeln!(out, "{name} has no TRX frozen for {}", resource.as_api_str())?,
            }
        }
        Command::Withdraw { wallet } => {
            let name = resolve_wallet(m, &wallet)?;
            let txid = m.withdraw(&name).await?;
            writeln!(out, "withdrew unfrozen TRX of {name}: {txid}")?;
        }
        Command::SendTrx {
            wallet,
            to,
            amount,
            memo,
        } => {
            let sun = parse_trx_to_sun("transfer amount", &amount)?;
            let to = parse_to(&to)?;
            let name = resolve_wallet(m, &wallet)?;
            let txid = m.send_trx(&name, to, sun, memo.as_deref()).await?;
            writeln!(out, "sent {} TRX from {name} to {to}: {txid}", format_sun(sun))?;
        }
        Command::SendToken {
            wallet,
            to,
            amount,
            abi_file,
        } => {
            let value = parse_token_units("token amount", &amount, m.token().decimals)?;
            let to = parse_to(&to)?;
            let name = resolve_wallet(m, &wallet)?;
            load_abi(m, abi_file.as_ref())?;
            let txid = m.send_token(&name, to, value).await?;
            writeln!(
                out,
                "sent {} {} from {name} to {to}: {txid}",
                format_token(value, m.token().decimals),
                m.token().symbol
            )?;
        }
        Command::TokenBalance { wallet, abi_file } => {
            let name = resolve_wallet(m, &wallet)?;
            load_abi(m, abi_file.as_ref())?;
            let v = m.token_balance(&name).await?;
            writeln!(
                out,
                "{name}: {} {}",
                format_token(v, m.token().decimals),
                m.token().symbol
            )?;
        }
        Command::Status { wallet } => {
            let name = resolve_wallet(m, &wallet)?;
            let status = m.status(&name).await?;
            writeln!(out, "{name}: {}", status.label())?;
        }
        Command::Strategy => {
            let r = m.run_small_budget_strategy().await?;
            report::print_strategy(out, &r)?;
        }
        Command::Plan { energy } => {
            let p = m.plan(energy).await?;
            report::print_plan(out, &p)?;
        }
        Command::Export { yes } => {
            writeln!(
                out,
                "WARNING: the following output contains private keys. \
                 Anyone who sees them controls the funds."
            )?;
            if !yes {
                anyhow::bail!("re-run with --yes to print private keys");
            }
            report::print_wallets(out, m.export(), true)?;
        }
        Command::Backup { path, note } => {
            let path = path.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "wallet_backup_{}.json",
                    chrono::Utc::now().format("%Y%m%d_%H%M%S")
                ))
            });
            m.backup(&path, &note)?;
            writeln!(out, "backup written to {}", path.display())?;
        }
        Command::History => {
            let records = m.history_list()?;
            report::print_history(out, &records)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::tests::{addr, manager_with};
    use crate::testing::Call;

    #[test]
    fn parses_profile_and_subcommands() {
        let cli = Cli::try_parse_from([
            "manager",
            "--profile",
            "small-budget",
            "freeze",
            "wallet_B",
            "10",
            "--resource",
            "bandwidth",
        ])
        .unwrap();
        assert_eq!(cli.profile, BudgetKind::SmallBudget);
        assert_eq!(
            cli.command,
            Some(Command::Freeze {
                wallet: "wallet_B".into(),
                amount: "10".into(),
                resource: "bandwidth".into(),
            })
        );

        let cli = Cli::try_parse_from(["manager"]).unwrap();
        assert_eq!(cli.profile, BudgetKind::Multi);
        assert_eq!(cli.command, None);
    }

    #[tokio::test]
    async fn malformed_amounts_never_reach_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager_with(&dir, crate::profile::BudgetProfile::multi());
        let mut out = Vec::new();
        for amount in ["0", "-5", "1e3", "abc", "0.0000001"] {
            let rotate = Command::Rotate {
                amount: Some(amount.into()),
            };
            let r = execute(&mut m, rotate, &mut out).await;
            assert!(r.is_err(), "{amount} accepted");
            let r = execute(
                &mut m,
                Command::Freeze {
                    wallet: "wallet_B".into(),
                    amount: amount.into(),
                    resource: "ENERGY".into(),
                },
                &mut out,
            )
            .await;
            assert!(r.is_err(), "{amount} accepted");
        }
        assert!(m.chain().calls().is_empty());
    }

    #[tokio::test]
    async fn wallets_resolve_by_name_or_address() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager_with(&dir, crate::profile::BudgetProfile::multi());
        let b = addr(&m, "wallet_B");
        m.chain().fund(b, trx_to_sun(5));

        let mut out = Vec::new();
        execute(
            &mut m,
            Command::Freeze {
                wallet: b.to_base58check(),
                amount: "1.5".into(),
                resource: "ENERGY".into(),
            },
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(
            m.chain().submissions(),
            vec![Call::Freeze {
                owner: b,
                amount_sun: 1_500_000,
                resource: ResourceCode::Energy,
            }]
        );
        assert!(resolve_wallet(&m, "wallet_Z").is_err());
    }

    #[tokio::test]
    async fn generate_and_export_require_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager_with(&dir, crate::profile::BudgetProfile::multi());
        let mut out = Vec::new();
        assert!(execute(&mut m, Command::Generate { force: false }, &mut out).await.is_err());
        assert!(execute(&mut m, Command::Export { yes: false }, &mut out).await.is_err());
        let key = m.store().get("wallet_A").unwrap().private_key.clone();
        assert!(!String::from_utf8_lossy(&out).contains(&key));

        execute(&mut m, Command::Export { yes: true }, &mut out).await.unwrap();
        assert!(String::from_utf8_lossy(&out).contains(&key));

        execute(&mut m, Command::Generate { force: true }, &mut out).await.unwrap();
        assert_ne!(m.store().get("wallet_A").unwrap().private_key, key);
    }
}
