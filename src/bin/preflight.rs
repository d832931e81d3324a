use alloy_primitives::utils::format_units;
use alloy_sol_types::SolCall;

use erc20_transfer::domain::IERC20;
use erc20_transfer::infra::logging;
use erc20_transfer::infra::rpc::call_request;
use erc20_transfer::{Config, Denomination, LedgerClient, TransferSubmitter};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight\n\
         \n\
         Checks the endpoint, the sender and the token contract without sending anything.\n\
         \n\
         Requires env vars:\n\
           RPC_URL, TOKEN_CONTRACT_ADDRESS, PRIVATE_KEY (or PRIVATE_KEY_FILE)\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }

    // Force-read config (nice error messages if missing)
    let config = Config::from_env()?;
    let submitter = TransferSubmitter::from_config(&config)?;
    let client = submitter.client();
    let sender = submitter.sender();
    let token = config.submitter.token;

    println!("> Preflight:");
    println!("  RPC_URL={}", config.rpc_url);
    println!("  TOKEN_CONTRACT_ADDRESS={}", token);
    println!("  Sender (derived from key): {}", sender);

    // Basic RPC connectivity
    let chain_id = client.chain_id().await?;
    let head = client.block_number().await?;
    println!("  Chain id: {} (head block {})", chain_id, head);
    match config.submitter.chain_id {
        Some(configured) if configured != chain_id => {
            anyhow::bail!("CHAIN_ID={} but the endpoint reports {}", configured, chain_id)
        }
        _ => {}
    }

    // Native balance pays for gas
    let balance = client.balance(sender).await?;
    println!("  Sender balance: {} wei (~{} ETH)", balance, format_units(balance, "ether")?);
    if balance.is_zero() {
        eprintln!("  Warning: sender has no native balance; every transfer will fail.");
    }
    let nonce = client.transaction_count(sender).await?;
    println!("  Sender next nonce: {}", nonce);

    // Informational only: the sender always comes from the key.
    match client.accounts().await {
        Ok(accounts) if accounts.contains(&sender) => {
            println!("  Node also manages the sender account.")
        }
        Ok(accounts) => println!("  Node manages {} account(s); none is the sender.", accounts.len()),
        Err(e) => println!("  eth_accounts unavailable ({}).", e),
    }

    // Contract existence
    let code = client.code_at(token).await?;
    if code.is_empty() {
        anyhow::bail!("No contract code at {}", token);
    }
    println!("  Token contract deployed ({} bytes of code).", code.len());

    let read = |data: Vec<u8>| call_request(None, token, data.into());

    let symbol = client
        .call(&read(IERC20::symbolCall {}.abi_encode()))
        .await
        .ok()
        .and_then(|out| IERC20::symbolCall::abi_decode_returns(&out).ok())
        .unwrap_or_else(|| "?".to_string());
    let decimals = client
        .call(&read(IERC20::decimalsCall {}.abi_encode()))
        .await
        .ok()
        .and_then(|out| IERC20::decimalsCall::abi_decode_returns(&out).ok());
    let out = client
        .call(&read(IERC20::balanceOfCall { account: sender }.abi_encode()))
        .await?;
    let token_balance = IERC20::balanceOfCall::abi_decode_returns(&out)?;

    match decimals {
        Some(decimals) => {
            println!("  Token: {} ({} decimals)", symbol, decimals);
            println!(
                "  Sender token balance: {} base units (~{} {})",
                token_balance,
                format_units(token_balance, decimals)?,
                symbol
            );
            if let Denomination::Decimals(configured) = config.submitter.denomination {
                if configured != decimals {
                    eprintln!(
                        "  Warning: TOKEN_DECIMALS={} but the contract reports {}.",
                        configured, decimals
                    );
                }
            }
        }
        None => {
            println!("  Token: {} (decimals() not implemented)", symbol);
            println!("  Sender token balance: {} base units", token_balance);
        }
    }

    println!("> Preflight OK.");
    Ok(())
}
