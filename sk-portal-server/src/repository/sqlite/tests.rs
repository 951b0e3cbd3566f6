//! Tests for SQLite repository implementation.

use rusqlite::params;

use super::super::{contract, PortalRepository, RepositoryError, RequestUpdate};
use super::{SqliteRepository, CURRENT_SCHEMA_VERSION};
use sk_portal_core::{Bureau, Gender, OfficerDetails, RequestStatus, StructureCategory};

use proptest::prelude::*;

#[tokio::test]
async fn test_contract() {
    let repo = SqliteRepository::new_in_memory().unwrap();
    contract::run_all(&repo).await;
}

#[tokio::test]
async fn test_get_returns_none_for_missing() {
    let repo = SqliteRepository::new_in_memory().unwrap();
    let id = sk_portal_core::RequestId::new();
    assert!(repo.get_request(id).await.unwrap().is_none());
    assert!(repo.officers(id).await.unwrap().is_empty());
}

#[test]
fn test_schema_version_recorded() {
    let repo = SqliteRepository::new_in_memory().unwrap();
    let conn = repo.conn.lock().unwrap();
    let version: i64 = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_newer_schema_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portal.db");
    {
        let repo = SqliteRepository::new(&path).unwrap();
        let conn = repo.conn.lock().unwrap();
        conn.execute(
            "UPDATE schema_version SET version = ?1 WHERE id = 1",
            params![CURRENT_SCHEMA_VERSION + 1],
        )
        .unwrap();
    }
    assert!(matches!(
        SqliteRepository::new(&path),
        Err(RepositoryError::Storage { .. })
    ));
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("portal.db");
    let chapter = contract::filer("DPD Sumedang");
    let created = {
        let repo = SqliteRepository::new(&path).unwrap();
        repo.put_profile(chapter.clone()).await.unwrap();
        repo.create_request(contract::draft_for(chapter.id))
            .await
            .unwrap()
    };

    let repo = SqliteRepository::new(&path).unwrap();
    assert_eq!(repo.get_request(created.id).await.unwrap(), Some(created));
    assert_eq!(repo.get_profile(chapter.id).await.unwrap(), Some(chapter));
}

#[tokio::test]
async fn test_read_only_open_leaves_database_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portal.db");
    let chapter = contract::filer("DPD Sukabumi");
    let created = {
        let repo = SqliteRepository::new(&path).unwrap();
        repo.put_profile(chapter.clone()).await.unwrap();
        repo.create_request(contract::draft_for(chapter.id))
            .await
            .unwrap()
    };
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    }

    let repo = SqliteRepository::open_read_only(&path).unwrap();
    assert_eq!(repo.get_request(created.id).await.unwrap(), Some(created));
    assert!(matches!(
        repo.put_profile(contract::filer("DPD Lain")).await,
        Err(RepositoryError::Storage { .. })
    ));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}

#[test]
fn test_read_only_open_requires_existing_schema() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.db");
    assert!(SqliteRepository::open_read_only(&missing).is_err());
    assert!(!missing.exists());

    let blank = dir.path().join("blank.db");
    rusqlite::Connection::open(&blank).unwrap();
    assert!(matches!(
        SqliteRepository::open_read_only(&blank),
        Err(RepositoryError::Storage { .. })
    ));
}

#[tokio::test]
async fn test_primary_key_collision_is_not_reported_as_active_request() {
    let repo = SqliteRepository::new_in_memory().unwrap();
    let chapter = contract::filer("DPD Purwakarta");
    let created = repo
        .create_request(contract::draft_for(chapter.id))
        .await
        .unwrap();
    let mut issued = created.clone();
    issued.status = RequestStatus::DecreeIssued;
    repo.apply_update(RequestUpdate::new(issued.clone(), created.version))
        .await
        .unwrap();

    // Only the primary key is violated: the issued row is outside the partial index.
    let err = repo.create_request(issued).await.unwrap_err();
    assert_eq!(err, RepositoryError::RequestExists { id: created.id });
}

#[tokio::test]
async fn test_partial_index_blocks_second_active_request() {
    let repo = SqliteRepository::new_in_memory().unwrap();
    let chapter = contract::filer("DPD Karawang");
    let first = repo
        .create_request(contract::draft_for(chapter.id))
        .await
        .unwrap();

    // The database itself refuses a second row in a non-terminal status.
    let conn = repo.conn.clone();
    let chapter_id = chapter.id.to_string();
    let result = tokio::task::spawn_blocking(move || {
        let conn = conn.lock().unwrap();
        conn.execute(
            "INSERT INTO requests (id, chapter_id, meeting_date, meeting_location, status,
                 created_at, updated_at, version)
             VALUES ('other', ?1, '2024-01-01', 'x', 'submitted', 'a', 'a', 1)",
            params![chapter_id],
        )
    })
    .await
    .unwrap();
    assert!(result.is_err());
    assert_eq!(
        repo.active_request(chapter.id).await.unwrap().map(|r| r.id),
        Some(first.id)
    );
}

#[tokio::test]
async fn test_corrupt_status_is_reported() {
    let repo = SqliteRepository::new_in_memory().unwrap();
    let chapter = contract::filer("DPD Subang");
    let created = repo
        .create_request(contract::draft_for(chapter.id))
        .await
        .unwrap();
    {
        let conn = repo.conn.lock().unwrap();
        conn.execute(
            "UPDATE requests SET status = 'archived' WHERE id = ?1",
            params![created.id.to_string()],
        )
        .unwrap();
    }
    assert!(matches!(
        repo.get_request(created.id).await,
        Err(RepositoryError::Corruption { .. })
    ));
}

#[tokio::test]
async fn test_status_counts() {
    let repo = SqliteRepository::new_in_memory().unwrap();
    for name in ["DPD A", "DPD B"] {
        let chapter = contract::filer(name);
        repo.create_request(contract::draft_for(chapter.id))
            .await
            .unwrap();
    }
    let counts = repo.status_counts().await.unwrap();
    assert_eq!(counts, vec![(RequestStatus::Draft, 2)]);
}

fn details_strategy() -> impl Strategy<Value = OfficerDetails> {
    (
        prop::sample::select(vec![
            StructureCategory::AdvisoryBoard,
            StructureCategory::ExecutiveBoard,
            StructureCategory::Bureaus,
            StructureCategory::BranchCoordinators,
        ]),
        prop::sample::select(Bureau::ALL.to_vec()),
        "[A-Za-z ]{1,30}",
        "[A-Za-z' ]{1,40}",
        prop::bool::ANY,
    )
        .prop_map(|(structure, bureau, title, full_name, female)| OfficerDetails {
            structure,
            bureau: structure.requires_bureau().then_some(bureau),
            title,
            full_name,
            gender: if female { Gender::Female } else { Gender::Male },
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: a committed roster reads back with the same fields in the same order.
    #[test]
    fn roster_round_trip_preserves_fields_and_positions(
        roster in prop::collection::vec(details_strategy(), 1..12)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let repo = SqliteRepository::new_in_memory().unwrap();
            let chapter = contract::filer("DPD Roster");
            let created = repo
                .create_request(contract::draft_for(chapter.id))
                .await
                .unwrap();

            let officers: Vec<_> = roster
                .into_iter()
                .enumerate()
                .map(|(i, details)| sk_portal_core::Officer {
                    request_id: created.id,
                    details,
                    id_document: format!("{}/{}.png", created.id, i),
                    position: i as u32,
                })
                .collect();

            repo.apply_update(
                RequestUpdate::new(created.clone(), created.version).with_roster(officers.clone()),
            )
            .await
            .unwrap();

            let stored = repo.officers(created.id).await.unwrap();
            assert_eq!(stored, officers);
        });
    }
}
