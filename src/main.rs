use anyhow::Context;

use erc20_transfer::infra::logging;
use erc20_transfer::{Config, TransferSubmitter};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin erc20-transfer -- <recipient> <amount>\n\
         \n\
         <amount> is in the token's smallest unit unless TOKEN_DECIMALS is set.\n\
         \n\
         Requires env vars:\n\
           RPC_URL, TOKEN_CONTRACT_ADDRESS, PRIVATE_KEY (or PRIVATE_KEY_FILE)\n\
         Optional:\n\
           CHAIN_ID, GAS_PRICE_GWEI (default 10, or `auto`), CONFIRMATIONS (default 1),\n\
           RPC_TIMEOUT_SECS, RECEIPT_TIMEOUT_SECS, RECEIPT_POLL_INTERVAL_MS, TOKEN_DECIMALS\n"
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
    let [recipient, amount] = args.as_slice() else {
        usage_and_exit();
    };

    let config = Config::from_env()?;
    let submitter = TransferSubmitter::from_config(&config)?;
    tracing::info!(
        sender = %submitter.sender(),
        token = %config.submitter.token,
        rpc = %config.rpc_url,
        "submitting transfer"
    );

    let receipt = match submitter.submit_transfer(recipient, amount).await {
        Ok(receipt) => receipt,
        Err(e) => {
            let stage = e.stage();
            if e.possibly_broadcast() {
                eprintln!("> The transaction may still be included. Check its hash before sending again.");
            }
            return Err(e).with_context(|| format!("transfer failed after stage `{stage}`"));
        }
    };

    println!("{}", serde_json::to_string_pretty(&receipt)?);
    if !receipt.succeeded() && receipt.block_number.is_some() {
        anyhow::bail!("transaction {} reverted", receipt.transaction_hash);
    }
    Ok(())
}
