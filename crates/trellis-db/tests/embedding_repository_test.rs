//! Integration tests for the concept embedding repository.
//!
//! This test suite validates:
//! - Upsert creates a row, then replaces it in place for the same (concept, model)
//! - Get and remove round-trip
//! - Active-only counting (trashed concepts are excluded)
//! - Missing-embedding scan respects model, status, and limit
//! - last_updated reflects the newest write
//!
//! **IMPORTANT**: These tests require a running PostgreSQL server with the
//! pgvector extension. Each test creates its own schema, so no migrated
//! database is needed.

use pgvector::Vector;

use trellis_db::test_fixtures::TestDatabase;
use trellis_db::{ConceptEmbeddingRepository, ConceptRepository, ConceptStatus};

const MODEL: &str = "nomic-embed-text";

#[tokio::test]
#[ignore = "requires live Postgres with pgvector"]
async fn test_upsert_creates_then_replaces() {
    let test_db = TestDatabase::new().await;
    let concept_id = test_db.seed_concept("Rust", "A systems language.").await;

    test_db
        .db
        .embeddings
        .upsert(concept_id, &Vector::from(vec![1.0, 0.0, 0.0]), MODEL)
        .await
        .expect("Failed to upsert embedding");

    let stored = test_db
        .db
        .embeddings
        .get(concept_id, MODEL)
        .await
        .expect("Failed to get embedding")
        .expect("Embedding should exist after upsert");
    assert_eq!(stored.concept_id, concept_id);
    assert_eq!(stored.model, MODEL);
    assert_eq!(stored.vector.as_slice(), &[1.0, 0.0, 0.0]);

    // Second upsert for the same (concept, model) replaces the vector.
    test_db
        .db
        .embeddings
        .upsert(concept_id, &Vector::from(vec![0.0, 1.0, 0.0]), MODEL)
        .await
        .expect("Failed to re-upsert embedding");

    let replaced = test_db
        .db
        .embeddings
        .get(concept_id, MODEL)
        .await
        .expect("Failed to get embedding")
        .expect("Embedding should still exist");
    assert_eq!(replaced.vector.as_slice(), &[0.0, 1.0, 0.0]);

    let all = test_db
        .db
        .embeddings
        .list_for_model(MODEL)
        .await
        .expect("Failed to list embeddings");
    assert_eq!(all.len(), 1, "Upsert must not create a second row");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires live Postgres with pgvector"]
async fn test_models_do_not_collide() {
    let test_db = TestDatabase::new().await;
    let concept_id = test_db.seed_concept("Graphs", "Nodes and edges.").await;

    test_db
        .seed_embedding(concept_id, vec![1.0, 0.0], "model-a")
        .await;
    test_db
        .seed_embedding(concept_id, vec![0.0, 1.0], "model-b")
        .await;

    let a = test_db
        .db
        .embeddings
        .get(concept_id, "model-a")
        .await
        .expect("Failed to get embedding")
        .expect("model-a row should exist");
    let b = test_db
        .db
        .embeddings
        .get(concept_id, "model-b")
        .await
        .expect("Failed to get embedding")
        .expect("model-b row should exist");

    assert_eq!(a.vector.as_slice(), &[1.0, 0.0]);
    assert_eq!(b.vector.as_slice(), &[0.0, 1.0]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires live Postgres with pgvector"]
async fn test_remove_deletes_row() {
    let test_db = TestDatabase::new().await;
    let concept_id = test_db.seed_concept("Ephemeral", "").await;
    test_db
        .seed_embedding(concept_id, vec![0.5, 0.5], MODEL)
        .await;

    test_db
        .db
        .embeddings
        .remove(concept_id, MODEL)
        .await
        .expect("Failed to remove embedding");

    let gone = test_db
        .db
        .embeddings
        .get(concept_id, MODEL)
        .await
        .expect("Failed to get embedding");
    assert!(gone.is_none(), "Embedding should be gone after remove");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires live Postgres with pgvector"]
async fn test_count_for_model_excludes_trash() {
    let test_db = TestDatabase::new().await;
    let kept = test_db.seed_concept("Kept", "stays active").await;
    let trashed = test_db.seed_concept("Trashed", "goes away").await;
    test_db.seed_embedding(kept, vec![1.0, 0.0], MODEL).await;
    test_db.seed_embedding(trashed, vec![0.0, 1.0], MODEL).await;

    let before = test_db
        .db
        .embeddings
        .count_for_model(MODEL)
        .await
        .expect("Failed to count embeddings");
    assert_eq!(before, 2);

    test_db
        .db
        .concepts
        .set_status(trashed, ConceptStatus::Trash)
        .await
        .expect("Failed to trash concept");

    let after = test_db
        .db
        .embeddings
        .count_for_model(MODEL)
        .await
        .expect("Failed to count embeddings");
    assert_eq!(after, 1, "Trashed concepts must not count");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires live Postgres with pgvector"]
async fn test_missing_embeddings_scan() {
    let test_db = TestDatabase::new().await;
    let covered = test_db.seed_concept("Covered", "has a vector").await;
    let missing_a = test_db.seed_concept("Missing A", "no vector yet").await;
    let missing_b = test_db.seed_concept("Missing B", "no vector yet").await;
    test_db.seed_embedding(covered, vec![1.0, 0.0], MODEL).await;

    let missing = test_db
        .db
        .concepts
        .missing_embeddings(MODEL, 10)
        .await
        .expect("Failed to scan for missing embeddings");
    let ids: Vec<_> = missing.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![missing_a, missing_b], "Oldest first, covered skipped");

    // A row under a different model does not satisfy this model.
    test_db
        .seed_embedding(missing_a, vec![0.0, 1.0], "other-model")
        .await;
    let still_missing = test_db
        .db
        .concepts
        .missing_embeddings(MODEL, 10)
        .await
        .expect("Failed to scan for missing embeddings");
    assert_eq!(still_missing.len(), 2);

    // Limit caps the batch.
    let capped = test_db
        .db
        .concepts
        .missing_embeddings(MODEL, 1)
        .await
        .expect("Failed to scan for missing embeddings");
    assert_eq!(capped.len(), 1);

    // Trashed concepts fall out of the scan entirely.
    test_db
        .db
        .concepts
        .set_status(missing_b, ConceptStatus::Trash)
        .await
        .expect("Failed to trash concept");
    let after_trash = test_db
        .db
        .concepts
        .missing_embeddings(MODEL, 10)
        .await
        .expect("Failed to scan for missing embeddings");
    assert_eq!(after_trash.len(), 1);
    assert_eq!(after_trash[0].id, missing_a);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires live Postgres with pgvector"]
async fn test_last_updated_tracks_writes() {
    let test_db = TestDatabase::new().await;

    let empty = test_db
        .db
        .embeddings
        .last_updated(MODEL)
        .await
        .expect("Failed to query last_updated");
    assert!(empty.is_none(), "No rows means no timestamp");

    let concept_id = test_db.seed_concept("Timestamped", "").await;
    test_db
        .seed_embedding(concept_id, vec![1.0, 0.0], MODEL)
        .await;

    let first = test_db
        .db
        .embeddings
        .last_updated(MODEL)
        .await
        .expect("Failed to query last_updated")
        .expect("Timestamp should exist after a write");

    test_db
        .seed_embedding(concept_id, vec![0.0, 1.0], MODEL)
        .await;

    let second = test_db
        .db
        .embeddings
        .last_updated(MODEL)
        .await
        .expect("Failed to query last_updated")
        .expect("Timestamp should exist after a write");
    assert!(second >= first, "Re-upsert must not move the clock backwards");

    test_db.cleanup().await;
}
