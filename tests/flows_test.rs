//! Integration tests for the conversation state machine over a real store
//!
//! These walk the admin flows the way the Telegram handlers do: advance the
//! per-user session step by step, then commit the collected fields through
//! the storage layer, asserting the spec scenarios end to end.

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use jamaatbot::flows::{AdvanceOutcome, EventField, FlowKind, Session, SessionStore};
use jamaatbot::storage::db::{self, DbConnection, DbPool};
use jamaatbot::storage::stats;
use jamaatbot::storage::{create_pool, get_connection};

struct TestDb {
    _dir: TempDir,
    pool: DbPool,
}

fn test_db() -> TestDb {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.sqlite");
    let pool = create_pool(path.to_str().expect("utf-8 path")).expect("create pool");
    TestDb { _dir: dir, pool }
}

fn conn(db: &TestDb) -> DbConnection {
    get_connection(&db.pool).expect("get connection")
}

/// Прогоняет сессию по списку вводов, ожидая завершение на последнем.
async fn drive_to_completion(store: &SessionStore, user_id: i64, inputs: &[&str]) -> Session {
    for (idx, input) in inputs.iter().enumerate() {
        match store.advance(user_id, input).await {
            Some(AdvanceOutcome::Next { .. }) => {
                assert!(idx + 1 < inputs.len(), "completed too early on {:?}", input);
            }
            Some(AdvanceOutcome::Complete(session)) => {
                assert_eq!(idx + 1, inputs.len(), "completed too early on {:?}", input);
                return session;
            }
            other => panic!("unexpected outcome on {:?}: {:?}", input, other),
        }
    }
    panic!("flow did not complete");
}

#[tokio::test]
async fn add_mentor_flow_commits_all_four_fields() {
    let db = test_db();
    let store = SessionStore::new();

    store.begin(1, Session::new(FlowKind::AddMentor)).await;
    let session = drive_to_completion(&store, 1, &["Aisha", "Backend", "10 лет опыта", "@aisha"]).await;

    let conn = conn(&db);
    db::insert_mentor(
        &conn,
        session.field_text("name").unwrap(),
        session.field_text("specialization").unwrap(),
        session.field_text("bio").unwrap(),
        session.field_text("contact").unwrap(),
    )
    .unwrap();

    let mentors = db::active_mentors(&conn).unwrap();
    assert_eq!(mentors.len(), 1);
    let mentor = &mentors[0];
    assert!(mentor.is_active);
    assert_eq!(mentor.name, "Aisha");
    assert_eq!(mentor.specialization.as_deref(), Some("Backend"));
    assert_eq!(mentor.bio.as_deref(), Some("10 лет опыта"));
    assert_eq!(mentor.contact_info.as_deref(), Some("@aisha"));
}

#[tokio::test]
async fn bad_date_reprompts_without_losing_fields() {
    let store = SessionStore::new();
    store.begin(1, Session::new(FlowKind::AddEvent)).await;

    store.advance(1, "Intro to Python").await;
    store.advance(1, "Вводная лекция").await;

    // Невалидная дата: шаг повторяется, сессия жива, поля на месте
    for bad in ["когда-нибудь", "2026-09-15 18:30", "15.09.2026"] {
        match store.advance(1, bad).await {
            Some(AdvanceOutcome::Invalid { .. }) => {}
            other => panic!("expected Invalid for {:?}, got {:?}", bad, other),
        }
    }

    match store.advance(1, "15.09.2026 18:30").await {
        Some(AdvanceOutcome::Next { prompt }) => assert!(prompt.contains("место")),
        other => panic!("expected Next, got {:?}", other),
    }

    let session = match store.advance(1, "Казань").await {
        Some(AdvanceOutcome::Complete(session)) => session,
        other => panic!("expected Complete, got {:?}", other),
    };
    assert_eq!(session.field_text("title"), Some("Intro to Python"));
    assert_eq!(session.field_text("description"), Some("Вводная лекция"));
    assert_eq!(session.field_text("location"), Some("Казань"));
    assert!(session.field_date_time("date_time").is_some());
}

#[tokio::test]
async fn concurrent_sessions_do_not_mix_fields() {
    let db = test_db();
    let store = SessionStore::new();

    let conn = conn(&db);
    let admin_a = db::create_user(&conn, 111, Some("admin_a"), None).unwrap();
    let admin_b = db::create_user(&conn, 222, Some("admin_b"), None).unwrap();

    store.begin(111, Session::new(FlowKind::AddEvent)).await;
    store.begin(222, Session::new(FlowKind::AddEvent)).await;

    // Чередуем шаги двух администраторов
    store.advance(111, "Событие A").await;
    store.advance(222, "Событие B").await;
    store.advance(111, "Описание A").await;
    store.advance(222, "Описание B").await;
    store.advance(111, "01.10.2026 10:00").await;
    store.advance(222, "02.10.2026 20:00").await;

    let session_a = match store.advance(111, "Казань").await {
        Some(AdvanceOutcome::Complete(session)) => session,
        other => panic!("expected Complete for A, got {:?}", other),
    };
    // B еще не завершил сценарий, его сессия в работе
    assert!(store.has_session(222).await);

    db::insert_event(
        &conn,
        session_a.field_text("title").unwrap(),
        session_a.field_text("description").unwrap(),
        session_a.field_date_time("date_time").unwrap(),
        session_a.field_text("location").unwrap(),
        None,
        admin_a,
    )
    .unwrap();

    let session_b = match store.advance(222, "Онлайн").await {
        Some(AdvanceOutcome::Complete(session)) => session,
        other => panic!("expected Complete for B, got {:?}", other),
    };
    db::insert_event(
        &conn,
        session_b.field_text("title").unwrap(),
        session_b.field_text("description").unwrap(),
        session_b.field_date_time("date_time").unwrap(),
        session_b.field_text("location").unwrap(),
        None,
        admin_b,
    )
    .unwrap();

    let events = db::upcoming_events(&conn, 10).unwrap();
    assert_eq!(events.len(), 2);
    let a = events.iter().find(|e| e.event.title == "Событие A").expect("A exists");
    let b = events.iter().find(|e| e.event.title == "Событие B").expect("B exists");
    assert_eq!(a.event.description.as_deref(), Some("Описание A"));
    assert_eq!(a.event.location.as_deref(), Some("Казань"));
    assert_eq!(a.event.created_by, Some(admin_a));
    assert_eq!(b.event.description.as_deref(), Some("Описание B"));
    assert_eq!(b.event.location.as_deref(), Some("Онлайн"));
    assert_eq!(b.event.created_by, Some(admin_b));
}

#[tokio::test]
async fn editing_concurrently_deleted_event_reports_not_found() {
    let db = test_db();
    let store = SessionStore::new();
    let conn = conn(&db);
    let creator = db::create_user(&conn, 1, None, None).unwrap();

    let event_id = db::insert_event(
        &conn,
        "t",
        "d",
        Utc::now().naive_utc() + Duration::days(1),
        "loc",
        None,
        creator,
    )
    .unwrap();

    store
        .begin(
            1,
            Session::new(FlowKind::EditEventField {
                event_id,
                field: EventField::Title,
            }),
        )
        .await;

    // Другой администратор успел удалить мероприятие
    assert!(db::soft_delete_event(&conn, event_id).unwrap());

    let session = match store.advance(1, "Новое название").await {
        Some(AdvanceOutcome::Complete(session)) => session,
        other => panic!("expected Complete, got {:?}", other),
    };
    // Коммит сообщает not-found, мутации нет
    assert!(!db::update_event_title(&conn, event_id, session.field_text("title").unwrap()).unwrap());
    // Сессия сброшена: следующее сообщение вне сценария
    assert!(store.advance(1, "еще текст").await.is_none());
}

#[tokio::test]
async fn cancel_leaves_no_partial_writes() {
    let db = test_db();
    let store = SessionStore::new();
    let conn = conn(&db);

    store.begin(1, Session::new(FlowKind::AddMentor)).await;
    store.advance(1, "Aisha").await;
    store.advance(1, "Backend").await;

    assert!(store.cancel(1).await);

    assert!(db::active_mentors(&conn).unwrap().is_empty());
    assert!(store.advance(1, "bio").await.is_none());
}

#[tokio::test]
async fn assign_mentor_scenario_updates_views_and_ranking() {
    let db = test_db();
    let store = SessionStore::new();
    let conn = conn(&db);
    let admin = db::create_user(&conn, 1, None, None).unwrap();

    // Создаем ментора через сценарий
    store.begin(1, Session::new(FlowKind::AddMentor)).await;
    let session = drive_to_completion(&store, 1, &["Aisha", "Backend", "bio", "@aisha"]).await;
    let aisha = db::insert_mentor(
        &conn,
        session.field_text("name").unwrap(),
        session.field_text("specialization").unwrap(),
        session.field_text("bio").unwrap(),
        session.field_text("contact").unwrap(),
    )
    .unwrap();

    // Создаем будущее мероприятие без ментора
    store.begin(1, Session::new(FlowKind::AddEvent)).await;
    let future_date = (Utc::now().naive_utc() + Duration::days(30)).format("%d.%m.%Y %H:%M").to_string();
    let session = drive_to_completion(&store, 1, &["Intro to Python", "Вводная", &future_date, "Онлайн"]).await;
    let session = session.into_mentor_pick();
    assert_eq!(*session.flow(), FlowKind::AddEventMentorPick);

    let event_id = db::insert_event(
        &conn,
        session.field_text("title").unwrap(),
        session.field_text("description").unwrap(),
        session.field_date_time("date_time").unwrap(),
        session.field_text("location").unwrap(),
        None, // выбрано "Без ментора"
        admin,
    )
    .unwrap();

    let upcoming = db::upcoming_events(&conn, 10).unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].mentor_name, None);

    // AssignMentor: одно нажатие, один коммит
    assert!(db::update_event_mentor(&conn, event_id, Some(aisha)).unwrap());

    let upcoming = db::upcoming_events(&conn, 10).unwrap();
    assert_eq!(upcoming[0].mentor_name.as_deref(), Some("Aisha"));

    let top = stats::top_mentors(&conn, 5).unwrap();
    assert_eq!(top, vec![("Aisha".to_string(), 1)]);
}

#[tokio::test]
async fn reentering_flow_replaces_previous_session() {
    let store = SessionStore::new();

    store.begin(1, Session::new(FlowKind::AddMentor)).await;
    store.advance(1, "Aisha").await;

    // Администратор передумал и начал сценарий заново
    let prompt = store.begin(1, Session::new(FlowKind::AddEvent)).await;
    assert_eq!(prompt, Some("📅 Введите название мероприятия:"));

    // Первый же ввод идет в новый сценарий
    match store.advance(1, "Событие").await {
        Some(AdvanceOutcome::Next { prompt }) => assert!(prompt.contains("описание")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}
