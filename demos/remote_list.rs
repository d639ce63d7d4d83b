//! Fetch the fixed product list and print it.
//!
//! Run with: cargo run --example remote_list

use showcase_core::{HttpFetcher, RemoteListScreen, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("showcase_core=debug".parse().unwrap()),
        )
        .init();

    let screen = RemoteListScreen::new(HttpFetcher::new()?);

    if let Err(e) = screen.load().await {
        // A failed fetch leaves the list empty; there is no retry.
        println!("{e}");
        return Ok(());
    }

    let items = screen.items();
    println!("{} items:", items.len());
    for item in items {
        println!("  [{}] {}", item.id, item.title);
    }

    Ok(())
}
