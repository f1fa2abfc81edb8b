//! KoboPay interactive harness
//!
//! Wires the in-memory stack to the sandbox gateway and drives the session
//! engine from stdin. This binary stands in for the chat transport: a small
//! stateless command router for non-flow actions, everything else fed to
//! the engine. No business logic lives here.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use kobopay_accounts::{InMemoryUserStore, PinGuard, UserStore, WalletLedger};
use kobopay_core::{Amount, KycStatus, UserId};
use kobopay_deposit::{
    DepositProcessor, InMemoryVirtualAccountStore, SandboxAccountProvider, VirtualAccounts,
    WebhookEvent,
};
use kobopay_gateway::{SandboxGateway, SandboxResolver, StaticCatalog, TracingNotifier};
use kobopay_ledger::{InMemoryTransactionStore, TransactionStore};
use kobopay_session::{EngineConfig, EngineDeps, FlowType, InMemorySessionStore, SessionEngine};

#[derive(Parser)]
#[command(name = "kobopay", about = "KoboPay interactive harness (sandbox gateway)")]
struct Args {
    /// User id to chat as
    #[arg(long, default_value = "demo")]
    user: String,

    /// Opening wallet balance in naira
    #[arg(long, default_value_t = 5000)]
    balance: u64,

    /// Transaction PIN seeded for the user
    #[arg(long, default_value = "1234")]
    pin: String,

    /// Transfers at or above this amount (naira) demand the sandbox OTP
    #[arg(long, default_value_t = 100_000)]
    otp_threshold: u64,
}

const HELP: &str = "\
Commands:
  /airtime            start an airtime purchase
  /data               start a data purchase
  /transfer           start a bank transfer
  /deposit <naira>    simulate an incoming-payment webhook
  /balance            show wallet balance
  /history            show recent transactions
  /account            show your virtual deposit account
  /setpin <pin>       set a new transaction PIN
  /cancel             cancel the transaction in progress
  /help               this text
  /quit               exit
Anything else is sent to the session in progress.";

struct Harness {
    user: UserId,
    engine: SessionEngine,
    wallet: WalletLedger,
    pin_guard: PinGuard,
    ledger: Arc<InMemoryTransactionStore>,
    accounts: VirtualAccounts,
    deposits: DepositProcessor,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let harness = build(&args).await?;
    println!("KoboPay sandbox. You are '{}'.", harness.user);
    println!("{HELP}");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().ok();
        let Some(line) = lines.next() else { break };
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        match route(&harness, line).await {
            Ok(output) => println!("{output}"),
            Err(err) => println!("error: {err:#}"),
        }
    }
    Ok(())
}

async fn build(args: &Args) -> Result<Harness> {
    let users = Arc::new(InMemoryUserStore::new());
    let ledger = Arc::new(InMemoryTransactionStore::new());
    let account_store = Arc::new(InMemoryVirtualAccountStore::new());
    let notifier = Arc::new(TracingNotifier);

    let engine = SessionEngine::new(
        EngineDeps {
            users: users.clone(),
            sessions: Arc::new(InMemorySessionStore::new()),
            ledger: ledger.clone(),
            gateway: Arc::new(SandboxGateway::with_otp_threshold(Amount::from_naira(
                args.otp_threshold,
            ))),
            resolver: Arc::new(SandboxResolver::new()),
            catalog: Arc::new(StaticCatalog::nigerian_default()),
            notifier: notifier.clone(),
        },
        EngineConfig::from_env(),
    );

    // Seed the demo user: approved KYC, opening balance, PIN set.
    let user = UserId::from(args.user.as_str());
    let mut record = users.get_or_create(&user).await?;
    record.kyc_status = KycStatus::Approved;
    users.save(record).await?;
    users.credit(&user, Amount::from_naira(args.balance)).await?;
    let pin_guard = PinGuard::new(users.clone());
    pin_guard.set_pin(&user, &args.pin).await?;

    Ok(Harness {
        user,
        engine,
        wallet: WalletLedger::new(users.clone()),
        pin_guard,
        ledger: ledger.clone(),
        accounts: VirtualAccounts::new(
            account_store.clone(),
            Arc::new(SandboxAccountProvider::new()),
        ),
        deposits: DepositProcessor::new(account_store, users, ledger.clone(), notifier),
    })
}

async fn route(h: &Harness, line: &str) -> Result<String> {
    let (command, rest) = match line.split_once(' ') {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    Ok(match command {
        "/help" => HELP.to_string(),
        "/airtime" => h.engine.start_flow(&h.user, FlowType::Airtime).await?.text,
        "/data" => h.engine.start_flow(&h.user, FlowType::Data).await?.text,
        "/transfer" => h.engine.start_flow(&h.user, FlowType::BankTransfer).await?.text,
        "/cancel" => h.engine.cancel(&h.user).await?.text,
        "/balance" => format!("Balance: ₦{}", h.wallet.balance(&h.user).await?),
        "/setpin" => {
            h.pin_guard.set_pin(&h.user, rest).await?;
            "PIN updated.".to_string()
        }
        "/account" => {
            let account = h.accounts.ensure(&h.user).await?;
            format!(
                "Deposit to {} ({}) to fund your wallet.",
                account.account_number, account.bank_name
            )
        }
        "/history" => {
            let txns = h.ledger.list_for_user(&h.user, 10).await?;
            if txns.is_empty() {
                "No transactions yet.".to_string()
            } else {
                txns.iter()
                    .map(|t| {
                        format!(
                            "{}  {:<13} ₦{:>12}  {}{}",
                            t.created_at.format("%H:%M:%S"),
                            t.kind.to_string(),
                            t.total.to_string(),
                            t.status,
                            t.reason
                                .as_deref()
                                .map(|r| format!(" ({r})"))
                                .unwrap_or_default()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        "/deposit" => {
            let amount: Amount = rest
                .parse()
                .context("usage: /deposit <naira>")?;
            let account = h.accounts.ensure(&h.user).await?;
            let outcome = h
                .deposits
                .process(WebhookEvent {
                    amount,
                    destination_account_number: account.account_number,
                    provider_reference: format!("cli-{}", uuid::Uuid::new_v4().simple()),
                })
                .await?;
            format!("{outcome:?}")
        }
        _ if command.starts_with('/') => format!("Unknown command {command}. Try /help."),
        _ => h.engine.handle(&h.user, line).await?.text,
    })
}
