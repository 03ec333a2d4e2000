use clap::{Parser, Subcommand};
use estate_sdk::EstateClient;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "estate-cli")]
#[command(about = "Operator CLI for the estate coordinator", long_about = None)]
struct Cli {
    #[arg(short, long, env = "ESTATE_API_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token from `estate-cli login`.
    #[arg(short, long, env = "ESTATE_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server status and ledger head
    Health,
    /// Exchange credentials for a token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ESTATE_PASSWORD")]
        password: String,
    },
    /// Approve a wallet on-chain
    ApproveUser { wallet: String },
    /// Deposit revenue for a property token
    Distribute {
        #[arg(long)]
        token_address: String,
        #[arg(long)]
        stablecoin_address: String,
        /// Integer amount in the stablecoin's base units
        #[arg(long)]
        amount: String,
    },
    /// List property upload requests
    Requests,
    /// Approve a pending upload request and mint the property
    ApproveRequest { id: String },
    /// Reject a pending upload request
    RejectRequest {
        id: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut client = EstateClient::new(&cli.url);
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Health => print_json(&client.health().await?)?,
        Commands::Login { email, password } => {
            let session = client.login(&email, &password).await?;
            println!("{}", session.token);
        }
        Commands::ApproveUser { wallet } => print_json(&client.approve_user(&wallet).await?)?,
        Commands::Distribute {
            token_address,
            stablecoin_address,
            amount,
        } => {
            let pending = client
                .distribute_revenue(&token_address, &stablecoin_address, &amount)
                .await?;
            print_json(&pending)?;
        }
        Commands::Requests => print_json(&client.upload_requests().await?)?,
        Commands::ApproveRequest { id } => print_json(&client.approve_request(&id).await?)?,
        Commands::RejectRequest { id, reason } => print_json(&client.reject_request(&id, &reason).await?)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
