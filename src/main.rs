//! `dan-settle` - command line front end for the DAN settlement client
//!
//! ```text
//! dan-settle login
//! dan-settle deposit --amount 100
//! dan-settle withdraw --amount 25 [--to 0x...]
//! dan-settle history --type deposit --page 2
//! dan-settle register --firstname Ada --lastname Lovelace --ref SQQFCV --side left
//! dan-settle team
//! ```
//!
//! Amounts must be plain decimals (`100`, `0.5`); exponents, signs and
//! separators are refused before anything is sent.
//!
//! Wallet keys come from the environment (`DAN_USER_PRIVATE_KEY`,
//! `DAN_PAYMENT_PRIVATE_KEY`); a `.env` file is read when present.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use ethers::signers::Signer;

use dan_settlement::account::{AccountService, HistoryQuery};
use dan_settlement::auth::{LoginOutcome, TokenStore, WalletAuth};
use dan_settlement::chain::{RpcTokenConnector, checksummed};
use dan_settlement::config::AppConfig;
use dan_settlement::ledger::LedgerClient;
use dan_settlement::ledger::types::{PlacementSide, SignUpRequest};
use dan_settlement::logging::init_logging;
use dan_settlement::money::parse_amount;
use dan_settlement::settlement::{SettlementReport, SettlementService, SettlementState};

#[derive(Parser)]
#[command(name = "dan-settle")]
#[command(about = "Deposit, withdraw and manage DAN against the platform ledger")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
struct Cli {
    /// Loads config/<env>.yaml
    #[arg(short, long, env = "DAN_ENV", default_value = "dev")]
    env: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a member account for a wallet
    Register {
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: String,
        /// Defaults to the user wallet
        #[arg(long)]
        wallet: Option<String>,
        /// Sponsor's referral code
        #[arg(long = "ref")]
        referrer: Option<String>,
        /// Placement leg under the sponsor: left or right
        #[arg(long)]
        side: Option<PlacementSide>,
    },
    /// Sign in with the user wallet
    Login,
    /// Drop the stored session token
    Logout,
    /// Ledger balance, or the wallet's token balance with --on-chain
    Balance {
        #[arg(long)]
        on_chain: bool,
    },
    /// Send DAN from the user wallet to the platform and record it
    Deposit {
        #[arg(long, value_parser = parse_amount)]
        amount: Decimal,
    },
    /// Pay out DAN from the platform wallet and record it
    Withdraw {
        #[arg(long, value_parser = parse_amount)]
        amount: Decimal,
        /// Recipient, defaults to the user wallet
        #[arg(long)]
        to: Option<String>,
    },
    /// Move ledger balance to another member (no on-chain transfer)
    Transfer {
        #[arg(long, value_parser = parse_amount)]
        amount: Decimal,
        #[arg(long)]
        to: String,
    },
    /// List investment packages
    Packages,
    /// Buy an investment package
    BuyPackage {
        #[arg(long)]
        id: i64,
    },
    /// Transaction history
    History {
        #[arg(long = "type", default_value = "all")]
        tran_type: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        per_page: usize,
    },
    /// Account summary
    Dashboard,
    /// Member profile
    Profile,
    /// Change first and last name
    UpdateName {
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: String,
    },
    /// Binary team tree: sponsor, upline and both legs
    Team,
    /// Directly referred members
    Referrals,
    /// Referral code and sign-up links
    RefLink,
    /// Investment packages held
    Investments,
    /// Recorded deposits
    DepositHistory,
    /// Token balance of the platform payment wallet
    PaymentBalance,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_logging(&config);
    info!(env = %cli.env, git = env!("GIT_HASH"), "dan-settle starting");

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<ExitCode> {
    let client = Arc::new(
        LedgerClient::new(&config.ledger)?
            .with_token_store(TokenStore::new(&config.auth.token_path)),
    );

    match cli.command {
        Commands::Register {
            firstname,
            lastname,
            wallet,
            referrer,
            side,
        } => {
            let wallet_address = match wallet {
                Some(address) => address,
                None => checksummed(&config.wallets.user_wallet()?.address()),
            };
            let registration = AccountService::new(client)
                .register(&SignUpRequest {
                    referrer,
                    side,
                    firstname,
                    lastname,
                    wallet_address,
                })
                .await?;
            println!(
                "{}",
                registration
                    .message
                    .unwrap_or_else(|| "Registered, log in with your wallet".to_string())
            );
            if let Some(user) = registration.user {
                println!("userid {} ({})", user.userid, user.username);
            }
        }
        Commands::Login => {
            let wallet = config.wallets.user_wallet()?;
            let outcome = WalletAuth::new(client).login(&wallet).await?;
            match &outcome {
                LoginOutcome::Resumed { .. } => println!("Already logged in"),
                LoginOutcome::LoggedIn { .. } => println!("Logged in"),
            }
            if let Some(user) = outcome.user() {
                print(cli.json, user, || {
                    format!("userid {} ({})", user.userid, user.wallet_address)
                })?;
            }
        }
        Commands::Logout => {
            WalletAuth::new(client).logout().await?;
            println!("Logged out");
        }
        Commands::Balance { on_chain: true } => {
            let mut service = settlement_service(&config, client, false)?;
            let balance = service.user_wallet_balance().await?;
            print(cli.json, &balance, || {
                format!("{} {} ({})", balance.balance, balance.symbol, balance.address)
            })?;
        }
        Commands::Balance { on_chain: false } => {
            let balance = AccountService::new(client).balance().await?;
            print(cli.json, &serde_json::json!({
                "userid": balance.userid,
                "dan_balance": balance.dan_balance,
            }), || format!("{} DAN", balance.dan_balance))?;
        }
        Commands::Deposit { amount } => {
            let mut service = settlement_service(&config, client, false)?;
            let report = service.deposit(amount).await;
            return report_exit(cli.json, &report);
        }
        Commands::Withdraw { amount, to } => {
            let mut service = settlement_service(&config, client, true)?;
            let recipient = to.unwrap_or_else(|| service.user_address());
            let report = service.withdraw(amount, &recipient).await;
            return report_exit(cli.json, &report);
        }
        Commands::Transfer { amount, to } => {
            let reply = AccountService::new(client).transfer(amount, &to).await?;
            println!(
                "{}",
                reply
                    .message()
                    .unwrap_or_else(|| format!("Transferred {} DAN to {}", amount, to))
            );
        }
        Commands::Packages => {
            let list = AccountService::new(client).packages().await?;
            if cli.json {
                let packages: Vec<_> = list
                    .packages
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "p_id": p.p_id, "p_name": p.p_name, "p_percent": p.p_percent,
                            "p_period": p.p_period, "required_dan": p.required_dan,
                            "can_afford": p.can_afford,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&packages)?);
            } else {
                println!("DAN price {}, your balance {} DAN", list.dan_price, list.user_balance);
                for p in &list.packages {
                    println!(
                        "#{:<3} {:<20} {:>6}% / {:<10} requires {:>12} DAN{}",
                        p.p_id,
                        p.p_name,
                        p.p_percent,
                        p.p_period,
                        p.required_dan,
                        if p.can_afford { "" } else { "  (insufficient balance)" }
                    );
                }
            }
        }
        Commands::BuyPackage { id } => {
            let reply = AccountService::new(client).buy_package(id).await?;
            println!(
                "{}",
                reply
                    .message()
                    .unwrap_or_else(|| format!("Package {} purchased", id))
            );
        }
        Commands::History {
            tran_type,
            page,
            per_page,
        } => {
            let query = HistoryQuery {
                tran_type,
                page,
                per_page,
            };
            let page = AccountService::new(client).history_page(&query).await?;
            for t in &page.entries {
                println!(
                    "{:>6}  {:<19}  {:<12} +{:<12} -{:<12} {}",
                    t.t_id, t.created_datetime, t.tran_type, t.in_amount, t.out_amount, t.detail
                );
            }
            println!(
                "page {}/{} ({} matching)",
                page.page,
                page.total_pages.max(1),
                page.matched
            );
        }
        Commands::Dashboard => {
            let data = AccountService::new(client).dashboard().await?;
            let b = &data.balances;
            println!("Member since      {}", data.member.created_at);
            println!("Account balance   {} DAN", b.account_balance);
            println!("Total deposit     {} DAN", b.total_deposit);
            println!("Total withdraw    {} DAN", b.total_withdraw);
            println!("Total earned      {} DAN", b.total_earned);
            println!("Active investment {} DAN", b.total_investment_active);
            println!("Referrals         {}", b.total_referrals);
        }
        Commands::Profile => {
            let profile = AccountService::new(client).profile().await?;
            print(cli.json, &profile, || {
                format!(
                    "#{} {} {} ({})\n  wallet {}\n  registered {}",
                    profile.userid,
                    profile.firstname,
                    profile.lastname,
                    profile.username,
                    profile.wallet_address,
                    profile.registration_date
                )
            })?;
        }
        Commands::UpdateName {
            firstname,
            lastname,
        } => {
            let reply = AccountService::new(client)
                .update_fullname(&firstname, &lastname)
                .await?;
            println!(
                "{}",
                reply.message().unwrap_or_else(|| "Profile updated".to_string())
            );
        }
        Commands::Team => {
            let team = AccountService::new(client).team().await?;
            print(cli.json, &team, || {
                let mut text = format!(
                    "#{} {} (ref {})  pv {} / left {} / right {}",
                    team.user.userid,
                    team.user.firstname,
                    team.user.ref_code,
                    team.user.volume.s_pv,
                    team.user.volume.l_pv,
                    team.user.volume.r_pv
                );
                if let Some(sponsor) = &team.sponsor {
                    text.push_str(&format!("\nSponsor  #{} {}", sponsor.userid, sponsor.name));
                }
                if let Some(upline) = &team.upline {
                    text.push_str(&format!("\nUpline   #{} {}", upline.userid, upline.name));
                }
                for (leg, members) in [("Left", &team.children.left), ("Right", &team.children.right)] {
                    for m in members {
                        text.push_str(&format!(
                            "\n{:<5} #{} {}  pv {}",
                            leg, m.userid, m.firstname, m.volume.s_pv
                        ));
                    }
                }
                text.push_str(&format!("\nReferrals {}", team.total_referrals));
                text
            })?;
        }
        Commands::Referrals => {
            let list = AccountService::new(client).direct_referrals().await?;
            print(cli.json, &list, || {
                let mut text = String::new();
                for r in &list.referrals {
                    text.push_str(&format!(
                        "{:>3}  #{:<6} {:<20} {:<10} {}\n",
                        r.no, r.userid, r.name, r.status, r.register_date
                    ));
                }
                text.push_str(&format!("{} direct referrals", list.total_count));
                text
            })?;
        }
        Commands::RefLink => {
            let data = AccountService::new(client).referral_links().await?;
            print(cli.json, &data, || {
                format!(
                    "Code  {}\nLeft  {}\nRight {}",
                    data.ref_code,
                    data.link(PlacementSide::Left),
                    data.link(PlacementSide::Right)
                )
            })?;
        }
        Commands::Investments => {
            let list = AccountService::new(client).investments().await?;
            print(cli.json, &list, || {
                let mut text = String::new();
                for i in &list.investments {
                    text.push_str(&format!(
                        "#{:<5} {:<19} {:>12} {} (package {})  {}\n",
                        i.inv_id, i.inv_date, i.inv_amount, i.coin_name, i.p_amount, i.status
                    ));
                }
                text.push_str(&format!("Active total {} DAN", list.active_total()));
                text
            })?;
        }
        Commands::DepositHistory => {
            let rows = AccountService::new(client).deposit_history().await?;
            print(cli.json, &rows, || {
                rows.iter()
                    .map(|d| format!("{:<25} {:>12} DAN  {}", d.timestamp, d.dan_amount, d.txn_hash))
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
        Commands::PaymentBalance => {
            let mut service = settlement_service(&config, client, true)?;
            let balance = service.payment_wallet_balance().await?;
            print(cli.json, &balance, || {
                format!("{} {} ({})", balance.balance, balance.symbol, balance.address)
            })?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn settlement_service(
    config: &AppConfig,
    client: Arc<LedgerClient>,
    with_payment: bool,
) -> Result<SettlementService> {
    let connector = Arc::new(RpcTokenConnector::new(config.chain.clone()));
    let user = config
        .wallets
        .user_wallet()
        .context("user wallet is required")?;

    let mut service = SettlementService::new(
        connector.clone(),
        client,
        user,
        config.chain.deposit_wallet.clone(),
    )
    .with_token_symbol(config.chain.token_symbol.clone());

    if with_payment {
        let payment = config
            .wallets
            .payment_wallet()
            .context("payment wallet is required for withdrawals")?;
        service = service.with_payment_wallet(connector, payment);
    }
    Ok(service)
}

fn print<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

/// Exit 0 when recorded, 2 when funds moved (or may have) without a
/// ledger record, 1 otherwise.
fn report_exit(json: bool, report: &SettlementReport) -> Result<ExitCode> {
    print(json, report, || {
        let mut text = format!("[{}] {}", report.state, report.message);
        if let Some(on_chain) = &report.on_chain {
            text.push_str(&format!(
                "\n  tx {} (block {})",
                on_chain.hash_hex(),
                on_chain.block_number
            ));
        }
        text
    })?;
    Ok(match report.state {
        SettlementState::Recorded => ExitCode::SUCCESS,
        SettlementState::NeedsReconciliation | SettlementState::Unconfirmed => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    })
}
