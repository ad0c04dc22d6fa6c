//! Creating, editing and reordering a user's documents.
//!
//! Run with: `cargo run --example reorder`

use doc_throttle::{
    CollectionError, Document, DocumentCollection, DocumentPatch, InMemoryDocumentStore,
    NewDocument, OwnerId, ReorderRequest, SystemClock,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn print_list(label: &str, documents: &[Document]) {
    println!("{label}:");
    for doc in documents {
        println!(
            "    [{}] {} (v{}, {} words)",
            doc.sort_position(),
            doc.title(),
            doc.version(),
            doc.word_count()
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), CollectionError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Document Ordering Example ===\n");

    let docs = DocumentCollection::new(InMemoryDocumentStore::new(), Arc::new(SystemClock::new()));
    let owner = OwnerId::new("alice");

    let intro = docs.create(&owner, NewDocument::new("Introduction", "Why we write")).await?;
    let draft = docs.create(&owner, NewDocument::new("Draft", "A first pass")).await?;
    let notes = docs.create(&owner, NewDocument::new("Notes", "Loose ends")).await?;
    print_list("Creation order", &docs.list_by_owner(&owner).await?);

    docs.update_content(&owner, draft.id(), "A second, longer pass at the draft").await?;
    docs.update(
        &owner,
        notes.id(),
        DocumentPatch {
            title: Some("Research notes".into()),
            content: Some("Sources and loose ends".into()),
        },
    )
    .await?;
    docs.update_title(&owner, intro.id(), "Preface").await?;
    print_list("\nAfter edits", &docs.list_by_owner(&owner).await?);

    let request = ReorderRequest {
        owner_id: owner.clone(),
        ordered_ids: vec![notes.id(), intro.id(), draft.id()],
    };
    docs.reorder_request(&request).await?;
    print_list("\nAfter reorder", &docs.list_by_owner(&owner).await?);

    println!("\nA partial reorder is rejected:");
    match docs.reorder(&owner, &[draft.id(), intro.id()]).await {
        Err(err) => println!("    {err}"),
        Ok(()) => println!("    unexpectedly accepted"),
    }

    docs.delete(&owner, intro.id()).await?;
    print_list("\nAfter delete (positions keep their gaps)", &docs.list_by_owner(&owner).await?);

    Ok(())
}
