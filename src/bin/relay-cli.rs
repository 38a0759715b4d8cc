use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Diagnostic CLI for the upload relay", long_about = None)]
struct Cli {
    #[arg(short, long, env = "RELAY_URL", default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay health
    Status,
    /// Start a login and print the identity provider URL
    Login {
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Show the user behind a session token
    Me {
        #[arg(long, env = "RELAY_TOKEN")]
        token: String,
    },
    /// End a session
    Logout {
        #[arg(long, env = "RELAY_TOKEN")]
        token: Option<String>,
    },
    /// Upload a file for analysis
    Upload {
        path: PathBuf,
        #[arg(long, env = "RELAY_TOKEN")]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Status => client.get(format!("{base}/health")),
        Commands::Login { redirect_uri } => {
            let request = client.get(format!("{base}/api/auth/login"));
            match redirect_uri {
                Some(uri) => request.query(&[("redirect_uri", uri)]),
                None => request,
            }
        }
        Commands::Me { token } => client
            .get(format!("{base}/api/auth/me"))
            .bearer_auth(token),
        Commands::Logout { token } => {
            with_token(client.post(format!("{base}/api/auth/logout")), token)
        }
        Commands::Upload { path, token } => {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_owned());
            let bytes = tokio::fs::read(&path).await?;
            let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

            with_token(client.post(format!("{base}/upload")), token).multipart(form)
        }
    };

    print_response(request.send().await?).await
}

fn with_token(request: reqwest::RequestBuilder, token: Option<String>) -> reqwest::RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
