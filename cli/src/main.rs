use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use peerchat_client::{Client, ClientConfig, ClientError};
use peerchat_server::logging;

const EXIT_COMMANDS: [&str; 3] = ["q", "quit", "exit"];

#[tokio::main]
async fn main() -> Result<()> {
    let config = ClientConfig::parse();
    logging::init(config.verbose, "warn");

    let client = match Client::connect(&config).await {
        Ok(client) => client,
        Err(e) => {
            println!("Error connecting to server: {}", e);
            std::process::exit(1);
        }
    };
    println!("Welcome {}!", client.username());

    let printer = client.clone();
    tokio::spawn(async move {
        while let Some(message) = printer.receive_message().await {
            println!("{}", message.body);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if EXIT_COMMANDS.contains(&line.trim()) {
            println!("Exiting...");
            break;
        }

        let client = client.clone();
        tokio::spawn(async move {
            match client.handle_input(&line).await {
                Ok(Some(reply)) => println!("{}", reply),
                Ok(None) => {}
                Err(e @ ClientError::UnknownCommand(_)) => println!("{}", e),
                Err(e) => println!("Error sending msg: {}", e),
            }
        });
    }

    if let Err(e) = client.disconnect().await {
        error!("Error sending disconnect: {}", e);
    }
    Ok(())
}
