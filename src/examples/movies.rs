//! Movies Search Example
//!
//! A minimal example showing the basic usage of the client: create an
//! index, feed a few documents and run searches against a local
//! Meilisearch instance.
//!
//! Run with: cargo run --example movies

use meili_rs::{document, Client, IndexChanges};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Pass the API key as userinfo when the instance requires one, e.g.
    // http://masterKey@localhost:7700
    let client = Client::new("http://localhost:7700")?;
    println!("Connected: {:?}", client.health().await?.status);

    let index = client.locate("movies");
    if !index.exists().await? {
        client.create("movies", Some("id")).await?;
        println!("✅ Index created");
    }

    // Feed a few documents; the service indexes them asynchronously
    let movies = [
        json!({"id": 1, "title": "Carol", "genres": ["Romance", "Drama"]}),
        json!({"id": 2, "title": "Wonder Woman", "genres": ["Action", "Adventure"]}),
        json!({"id": 3, "title": "Life of Pi", "genres": ["Adventure", "Drama"]}),
    ];
    let update = index
        .add(&movies.into_iter().filter_map(document).collect::<Vec<_>>())
        .await?;
    println!("📝 Documents queued as update {}", update.update_id);

    // Search, inspecting the result window
    let search = index.search("wonder");
    println!(
        "🔍 {} hit(s) in {:?}",
        search.hits().await?,
        search.elapsed_time().await?
    );
    for hit in search.result().await?.hits.iter() {
        println!("   {}", hit["title"]);
    }

    // Page through every document lazily, two per fetch
    let mut pages = index.documents().iterator(2)?;
    while let Some(movie) = pages.next().await? {
        println!("   #{} {}", movie["id"], movie["title"]);
    }

    // Rename the index, then clean up
    let mut index = client.index("movies").await?;
    index.modify(IndexChanges::default().name("films")).await?;
    index.delete().await?;
    println!("🗑  Index deleted");

    Ok(())
}
