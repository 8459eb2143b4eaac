use super::*;
#[cfg(feature = "live-db-tests")]
use crate::state::test_helpers::{integration_pool, seed_user};

#[test]
fn enums_round_trip_through_text() {
    for t in [NotebookType::Voyage, NotebookType::Daily, NotebookType::Reportage] {
        assert_eq!(NotebookType::parse(t.as_str()), Some(t));
    }
    for f in [PaperFormat::A4, PaperFormat::A5] {
        assert_eq!(PaperFormat::parse(f.as_str()), Some(f));
    }
    for o in [Orientation::Portrait, Orientation::Landscape] {
        assert_eq!(Orientation::parse(o.as_str()), Some(o));
    }
    for s in [NotebookStatus::Active, NotebookStatus::Archived] {
        assert_eq!(NotebookStatus::parse(s.as_str()), Some(s));
    }
    assert_eq!(NotebookType::parse("Voyage"), None);
    assert_eq!(PaperFormat::parse("a3"), None);
}

#[test]
fn new_notebook_defaults() {
    let draft = NewNotebook { title: "  Lisbon trip ".into(), ..NewNotebook::default() }
        .validate()
        .unwrap();
    assert_eq!(
        draft,
        NotebookDraft {
            title: "Lisbon trip".into(),
            description: None,
            notebook_type: NotebookType::Voyage,
            format: PaperFormat::A4,
            orientation: Orientation::Portrait,
            pages: 1,
        }
    );
}

#[test]
fn new_notebook_accepts_mixed_case_choices() {
    let draft = NewNotebook {
        title: "Diary".into(),
        notebook_type: Some("Daily".into()),
        format: Some(" A5 ".into()),
        orientation: Some("LANDSCAPE".into()),
        page_count: Some(12),
        ..NewNotebook::default()
    }
    .validate()
    .unwrap();
    assert_eq!(draft.notebook_type, NotebookType::Daily);
    assert_eq!(draft.format, PaperFormat::A5);
    assert_eq!(draft.orientation, Orientation::Landscape);
    assert_eq!(draft.pages, 12);
}

#[test]
fn new_notebook_rejects_bad_input() {
    let blank = NewNotebook { title: "   ".into(), ..NewNotebook::default() };
    assert_eq!(blank.validate().unwrap_err().to_string(), "title is required");

    let bad_type = NewNotebook { title: "x".into(), notebook_type: Some("novel".into()), ..NewNotebook::default() };
    assert_eq!(
        bad_type.validate().unwrap_err().to_string(),
        "type must be one of: voyage, daily, reportage"
    );

    let no_pages = NewNotebook { title: "x".into(), page_count: Some(0), ..NewNotebook::default() };
    assert!(no_pages.validate().is_err());
}

#[test]
fn new_notebook_deserializes_type_field() {
    let body: NewNotebook = serde_json::from_str(r#"{"title":"Rome","type":"reportage"}"#).unwrap();
    assert_eq!(body.notebook_type.as_deref(), Some("reportage"));
}

#[test]
fn patch_empty_description_clears() {
    let changes = NotebookPatch { description: Some("  ".into()), ..NotebookPatch::default() }
        .validate()
        .unwrap();
    assert_eq!(changes.description, Some(None));
    assert_eq!(changes.title, None);
}

#[test]
fn patch_absent_fields_untouched() {
    let changes = NotebookPatch::default().validate().unwrap();
    assert_eq!(changes, NotebookChanges::default());
}

#[test]
fn patch_rejects_blank_title() {
    let patch = NotebookPatch { title: Some(String::new()), ..NotebookPatch::default() };
    assert!(patch.validate().is_err());
}

#[test]
fn parse_status_names_choices() {
    assert_eq!(parse_status("Archived").unwrap(), NotebookStatus::Archived);
    assert_eq!(parse_status("gone").unwrap_err().to_string(), "status must be one of: active, archived");
}

#[test]
fn row_serializes_with_type_key() {
    let row = NotebookRow {
        id: Uuid::nil(),
        title: "t".into(),
        description: None,
        notebook_type: NotebookType::Daily,
        format: PaperFormat::A5,
        orientation: Orientation::Portrait,
        page_count: 1,
        status: NotebookStatus::Active,
        created_at: 0,
        updated_at: 0,
    };
    let value = serde_json::to_value(&row).unwrap();
    assert_eq!(value["type"], "daily");
    assert_eq!(value["format"], "a5");
    assert_eq!(value["status"], "active");
}

// =============================================================================
// LIVE DB
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn notebook_lifecycle() {
    let pool = integration_pool().await;
    let owner = seed_user(&pool).await;
    let stranger = seed_user(&pool).await;

    let draft = NewNotebook { title: "Japan".into(), page_count: Some(3), ..NewNotebook::default() }
        .validate()
        .unwrap();
    let created = create_notebook(&pool, owner, &draft).await.unwrap();
    assert_eq!(created.page_count, 3);
    assert_eq!(created.status, NotebookStatus::Active);

    let pages: i64 = sqlx::query("SELECT COUNT(*) AS n FROM pages WHERE notebook_id = $1")
        .bind(created.id)
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
    assert_eq!(pages, 3);

    assert!(matches!(
        get_notebook(&pool, stranger, created.id).await,
        Err(NotebookError::NotFound(_))
    ));

    let changes = NotebookPatch { description: Some("Spring".into()), ..NotebookPatch::default() }
        .validate()
        .unwrap();
    let updated = update_notebook(&pool, owner, created.id, &changes).await.unwrap();
    assert_eq!(updated.description.as_deref(), Some("Spring"));
    assert_eq!(updated.title, "Japan");

    set_status(&pool, owner, created.id, NotebookStatus::Archived).await.unwrap();
    let active = list_notebooks(&pool, owner, Some(NotebookStatus::Active)).await.unwrap();
    assert!(active.iter().all(|n| n.id != created.id));
    let archived = list_notebooks(&pool, owner, Some(NotebookStatus::Archived)).await.unwrap();
    assert!(archived.iter().any(|n| n.id == created.id));
    set_status(&pool, owner, created.id, NotebookStatus::Active).await.unwrap();

    delete_notebook(&pool, owner, created.id).await.unwrap();
    assert!(matches!(
        delete_notebook(&pool, owner, created.id).await,
        Err(NotebookError::NotFound(_))
    ));
    assert!(list_notebooks(&pool, owner, None).await.unwrap().is_empty());
}
