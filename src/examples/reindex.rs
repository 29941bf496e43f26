//! Reindex Example
//!
//! Drains one index's documents through the lazy traversal and feeds them
//! into another in batches, e.g. to apply new settings to a fresh index.
//!
//! Run with: cargo run --example reindex -- <source-uid> <target-uid>

use meili_rs::Client;

const BATCH: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let source = args.next().unwrap_or_else(|| "movies".to_string());
    let target = args.next().unwrap_or_else(|| "movies-new".to_string());

    let client = Client::new("http://localhost:7700")?;

    let from = client.index(&source).await?;
    let to = client.locate(&target);
    if !to.exists().await? {
        client.create(&target, from.primary_key().await?).await?;
    }

    // Carry the source settings over before feeding
    to.configure(&from.settings().await?).await?;

    let mut pages = from.documents().iterator(BATCH)?;
    let mut batch = Vec::with_capacity(BATCH);
    let mut total = 0;

    while let Some(document) = pages.next().await? {
        batch.push(document);
        if batch.len() == BATCH {
            to.add(&batch).await?;
            total += batch.len();
            println!("📝 {total} document(s) fed");
            batch.clear();
        }
    }
    if !batch.is_empty() {
        to.add(&batch).await?;
        total += batch.len();
    }

    println!("✅ Reindexed {total} document(s) from {source} into {target}");
    Ok(())
}
