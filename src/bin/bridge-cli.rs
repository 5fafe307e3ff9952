use clap::{Parser, Subcommand};
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "bridge-cli")]
#[command(about = "Operator CLI for the legacy API bridge", long_about = None)]
struct Cli {
    #[arg(short, long, env = "BRIDGE_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate health report
    Health,
    /// Circuit breaker state
    Breaker,
    /// Readiness probe
    Ready,
    /// Fetch one payment through /v2
    Payment { id: String },
    /// List customers through /v2
    Customers {
        #[arg(long)]
        page: Option<u32>,
    },
    /// Drop cached v2 responses, optionally for one resource only
    ClearCache { resource: Option<String> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Breaker => {
            let res = client.get(format!("{}/health/circuit-breaker", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Ready => {
            let res = client.get(format!("{}/health/ready", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Payment { id } => {
            let mut url = reqwest::Url::parse(&format!("{}/v2/payments", base))?;
            url.path_segments_mut()
                .map_err(|_| "bridge url cannot carry a path")?
                .push(&id);
            let res = client.get(url).send().await?;
            print_response(res).await?;
        }
        Commands::Customers { page } => {
            let mut req = client.get(format!("{}/v2/customers", base));
            if let Some(page) = page {
                req = req.query(&[("page", page)]);
            }
            print_response(req.send().await?).await?;
        }
        Commands::ClearCache { resource } => {
            let url = match resource {
                Some(resource) => format!("{}/v2/cache/{}", base, resource),
                None => format!("{}/v2/cache", base),
            };
            let res = client.delete(url).send().await?;
            if res.status() == StatusCode::NO_CONTENT {
                println!("Cache cleared");
            } else {
                print_response(res).await?;
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: bridge returned status {}", status);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
