//! Integration tests for the entity store and read-model queries
//!
//! Each test runs against a fresh tempfile-backed SQLite database with the
//! real migrations applied.

use chrono::{Duration, NaiveDateTime, Utc};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use jamaatbot::core::LectureCategory;
use jamaatbot::storage::db::{self, DbConnection, DbPool};
use jamaatbot::storage::stats;
use jamaatbot::storage::{create_pool, get_connection};

struct TestDb {
    // Держит каталог с базой живым на время теста
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

fn future(days: i64) -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::days(days)
}

fn past(days: i64) -> NaiveDateTime {
    Utc::now().naive_utc() - Duration::days(days)
}

fn seed_user(conn: &DbConnection, telegram_id: i64) -> i64 {
    db::create_user(conn, telegram_id, Some("tester"), Some("Test User")).expect("create user")
}

#[test]
fn registration_is_upsert_by_lookup() {
    let db = test_db();
    let conn = conn(&db);

    assert!(db::get_user(&conn, 100).unwrap().is_none());
    seed_user(&conn, 100);

    let user = db::get_user(&conn, 100).unwrap().expect("user exists");
    assert_eq!(user.telegram_id, 100);
    assert_eq!(user.username.as_deref(), Some("tester"));

    // Повторная вставка того же telegram_id нарушает UNIQUE:
    // повторный /start должен идти через lookup, а не insert
    assert!(db::create_user(&conn, 100, None, None).is_err());
}

#[test]
fn mentor_soft_delete_hides_but_keeps_row() {
    let db = test_db();
    let conn = conn(&db);

    let mentor_id = db::insert_mentor(&conn, "Aisha", "Backend", "10 лет опыта", "@aisha").unwrap();
    let active = db::active_mentors(&conn).unwrap();
    assert_eq!(active.len(), 1);
    assert!(active[0].is_active);
    assert_eq!(active[0].name, "Aisha");
    assert_eq!(active[0].specialization.as_deref(), Some("Backend"));
    assert_eq!(active[0].bio.as_deref(), Some("10 лет опыта"));
    assert_eq!(active[0].contact_info.as_deref(), Some("@aisha"));

    assert!(db::soft_delete_mentor(&conn, mentor_id).unwrap());
    assert!(db::active_mentors(&conn).unwrap().is_empty());

    // Строка осталась и достижима по id
    let mentor = db::get_mentor(&conn, mentor_id).unwrap().expect("row kept");
    assert!(!mentor.is_active);

    // Повторное удаление сообщает, что активной записи уже нет
    assert!(!db::soft_delete_mentor(&conn, mentor_id).unwrap());
}

#[test]
fn upcoming_events_are_future_ascending_capped() {
    let db = test_db();
    let conn = conn(&db);
    let creator = seed_user(&conn, 1);

    // 12 будущих, 1 прошедшее, 1 будущее но удаленное
    for day in 1..=12 {
        db::insert_event(&conn, &format!("Event {day}"), "d", future(day), "loc", None, creator).unwrap();
    }
    db::insert_event(&conn, "Past", "d", past(1), "loc", None, creator).unwrap();
    let deleted = db::insert_event(&conn, "Deleted", "d", future(3), "loc", None, creator).unwrap();
    db::soft_delete_event(&conn, deleted).unwrap();

    let upcoming = db::upcoming_events(&conn, 10).unwrap();
    assert_eq!(upcoming.len(), 10);
    assert_eq!(upcoming[0].event.title, "Event 1");
    for pair in upcoming.windows(2) {
        assert!(pair[0].event.date_time <= pair[1].event.date_time);
    }
    assert!(upcoming.iter().all(|e| e.event.title != "Past"));
    assert!(upcoming.iter().all(|e| e.event.title != "Deleted"));
}

#[test]
fn event_field_update_touches_single_column() {
    let db = test_db();
    let conn = conn(&db);
    let creator = seed_user(&conn, 1);
    let mentor_id = db::insert_mentor(&conn, "Umar", "Frontend", "bio", "@umar").unwrap();

    let event_id = db::insert_event(
        &conn,
        "Старое название",
        "Описание",
        future(5),
        "Казань",
        Some(mentor_id),
        creator,
    )
    .unwrap();

    assert!(db::update_event_title(&conn, event_id, "Новое название").unwrap());

    let item = db::get_event(&conn, event_id).unwrap().expect("event exists");
    assert_eq!(item.event.title, "Новое название");
    assert_eq!(item.event.description.as_deref(), Some("Описание"));
    assert_eq!(item.event.location.as_deref(), Some("Казань"));
    assert_eq!(item.event.mentor_id, Some(mentor_id));
    assert!(item.event.is_active);
}

#[test]
fn updates_on_soft_deleted_event_report_not_found() {
    let db = test_db();
    let conn = conn(&db);
    let creator = seed_user(&conn, 1);

    let event_id = db::insert_event(&conn, "t", "d", future(1), "loc", None, creator).unwrap();
    assert!(db::soft_delete_event(&conn, event_id).unwrap());

    assert!(db::get_event(&conn, event_id).unwrap().is_none());
    assert!(!db::update_event_title(&conn, event_id, "x").unwrap());
    assert!(!db::update_event_mentor(&conn, event_id, None).unwrap());
    assert!(!db::soft_delete_event(&conn, event_id).unwrap());
}

#[test]
fn mentor_reassignment_is_idempotent() {
    let db = test_db();
    let conn = conn(&db);
    let creator = seed_user(&conn, 1);
    let aisha = db::insert_mentor(&conn, "Aisha", "Backend", "bio", "@aisha").unwrap();

    let direct = db::insert_event(&conn, "a", "d", future(1), "loc", Some(aisha), creator).unwrap();

    let roundabout = db::insert_event(&conn, "b", "d", future(1), "loc", None, creator).unwrap();
    assert!(db::update_event_mentor(&conn, roundabout, Some(aisha)).unwrap());
    assert!(db::update_event_mentor(&conn, roundabout, None).unwrap());
    assert!(db::update_event_mentor(&conn, roundabout, Some(aisha)).unwrap());

    let direct = db::get_event(&conn, direct).unwrap().unwrap();
    let roundabout = db::get_event(&conn, roundabout).unwrap().unwrap();
    assert_eq!(direct.event.mentor_id, roundabout.event.mentor_id);
    assert_eq!(roundabout.mentor_name.as_deref(), Some("Aisha"));
}

#[test]
fn deactivated_mentor_stays_joinable_from_event() {
    let db = test_db();
    let conn = conn(&db);
    let creator = seed_user(&conn, 1);
    let mentor_id = db::insert_mentor(&conn, "Aisha", "Backend", "bio", "@aisha").unwrap();
    let event_id = db::insert_event(&conn, "t", "d", future(1), "loc", Some(mentor_id), creator).unwrap();

    db::soft_delete_mentor(&conn, mentor_id).unwrap();

    // Из списков ментор исчез, но историческая ссылка жива
    assert!(db::active_mentors(&conn).unwrap().is_empty());
    let item = db::get_event(&conn, event_id).unwrap().unwrap();
    assert_eq!(item.mentor_name.as_deref(), Some("Aisha"));
}

#[test]
fn lectures_filter_by_exact_category() {
    let db = test_db();
    let conn = conn(&db);

    db::insert_lecture(
        &conn,
        "Rust для начинающих",
        Some(LectureCategory::Programming.db_value()),
        None,
        None,
        Some(60),
        None,
    )
    .unwrap();
    db::insert_lecture(
        &conn,
        "OWASP Top 10",
        Some(LectureCategory::Security.db_value()),
        None,
        None,
        Some(45),
        None,
    )
    .unwrap();
    db::insert_lecture(&conn, "Вне словаря", Some("DevOps"), None, None, None, None).unwrap();

    let programming = db::lectures_by_category(&conn, Some(LectureCategory::Programming), 10).unwrap();
    assert_eq!(programming.len(), 1);
    assert_eq!(programming[0].lecture.title, "Rust для начинающих");

    let all = db::lectures_by_category(&conn, None, 10).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn statistics_counts_are_consistent() {
    let db = test_db();
    let conn = conn(&db);
    let creator = seed_user(&conn, 1);
    seed_user(&conn, 2);

    let aisha = db::insert_mentor(&conn, "Aisha", "Backend", "bio", "@aisha").unwrap();
    let retired = db::insert_mentor(&conn, "Umar", "Frontend", "bio", "@umar").unwrap();
    db::soft_delete_mentor(&conn, retired).unwrap();

    db::insert_event(&conn, "future-1", "d", future(2), "loc", Some(aisha), creator).unwrap();
    db::insert_event(&conn, "future-2", "d", future(4), "loc", None, creator).unwrap();
    db::insert_event(&conn, "past-1", "d", past(2), "loc", Some(aisha), creator).unwrap();
    let gone = db::insert_event(&conn, "gone", "d", future(1), "loc", Some(aisha), creator).unwrap();
    db::soft_delete_event(&conn, gone).unwrap();

    db::insert_lecture(&conn, "l1", Some(LectureCategory::Programming.db_value()), None, None, None, None).unwrap();
    db::insert_lecture(&conn, "l2", Some(LectureCategory::Programming.db_value()), None, None, None, None).unwrap();

    db::insert_vacancy(&conn, "Rust dev", Some("Acme"), None, None, None, None, None).unwrap();

    db::insert_project(&conn, "p1", None, "discussion", None, None).unwrap();
    db::insert_project(&conn, "p2", None, "development", None, None).unwrap();
    db::insert_project(&conn, "p3", None, "archived", None, None).unwrap(); // вне словаря

    let statistics = stats::collect_statistics(&conn).unwrap();

    assert_eq!(statistics.total_users, 2);
    assert_eq!(statistics.active_mentors, 1);
    assert_eq!(statistics.active_events, 3);
    assert_eq!(
        statistics.future_events + statistics.past_events,
        statistics.active_events
    );
    assert_eq!(statistics.future_events, 2);
    assert_eq!(statistics.past_events, 1);
    assert_eq!(statistics.total_lectures, 2);
    let programming = statistics
        .lectures_by_category
        .iter()
        .find(|(c, _)| *c == LectureCategory::Programming)
        .map(|(_, n)| *n);
    assert_eq!(programming, Some(2));
    assert_eq!(statistics.active_vacancies, 1);
    // Неизвестный статус остается в общем счетчике, но не в корзинах
    assert_eq!(statistics.active_projects, 3);
    let bucketed: i64 = statistics.projects_by_status.iter().map(|(_, n)| n).sum();
    assert_eq!(bucketed, 2);
}

#[test]
fn top_mentors_rank_deterministically() {
    let db = test_db();
    let conn = conn(&db);
    let creator = seed_user(&conn, 1);

    let zaynab = db::insert_mentor(&conn, "Zaynab", "Mobile", "bio", "@z").unwrap();
    let aisha = db::insert_mentor(&conn, "Aisha", "Backend", "bio", "@a").unwrap();
    let umar = db::insert_mentor(&conn, "Umar", "Frontend", "bio", "@u").unwrap();

    for _ in 0..2 {
        db::insert_event(&conn, "e", "d", future(1), "loc", Some(umar), creator).unwrap();
    }
    // Aisha и Zaynab по одному мероприятию: при равенстве счетчиков
    // порядок определяет имя
    db::insert_event(&conn, "e", "d", future(1), "loc", Some(aisha), creator).unwrap();
    db::insert_event(&conn, "e", "d", future(1), "loc", Some(zaynab), creator).unwrap();
    // Удаленное мероприятие не считается
    let gone = db::insert_event(&conn, "e", "d", future(1), "loc", Some(umar), creator).unwrap();
    db::soft_delete_event(&conn, gone).unwrap();

    let top = stats::top_mentors(&conn, 5).unwrap();
    assert_eq!(
        top,
        vec![
            ("Umar".to_string(), 2),
            ("Aisha".to_string(), 1),
            ("Zaynab".to_string(), 1),
        ]
    );
}

#[test]
fn missing_optional_table_reports_zero() {
    let db = test_db();
    let conn = conn(&db);
    seed_user(&conn, 1);

    assert!(stats::table_exists(&conn, "vacancies").unwrap());
    conn.execute("DROP TABLE vacancies", []).unwrap();
    conn.execute("DROP TABLE projects", []).unwrap();
    assert!(!stats::table_exists(&conn, "vacancies").unwrap());

    // Снимок не падает, отсутствующие подресурсы дают нули
    let statistics = stats::collect_statistics(&conn).unwrap();
    assert_eq!(statistics.total_users, 1);
    assert_eq!(statistics.active_vacancies, 0);
    assert_eq!(statistics.active_projects, 0);
    assert!(statistics.projects_by_status.is_empty());

    let window = stats::collect_activity_window(&conn).unwrap();
    assert_eq!(window.new_vacancies, 0);
    assert_eq!(window.new_projects, 0);

    let daily = stats::collect_daily_stats(&conn).unwrap();
    assert_eq!(daily.today_vacancies, 0);
    assert_eq!(daily.today_projects, 0);
}

#[test]
fn daily_and_window_counters_see_fresh_rows() {
    let db = test_db();
    let conn = conn(&db);
    let creator = seed_user(&conn, 1);
    db::insert_event(&conn, "t", "d", future(1), "loc", None, creator).unwrap();
    db::insert_lecture(&conn, "l", None, None, None, None, None).unwrap();
    db::insert_vacancy(&conn, "v", None, None, None, None, None, None).unwrap();
    db::insert_project(&conn, "p", None, "discussion", None, None).unwrap();

    let daily = stats::collect_daily_stats(&conn).unwrap();
    assert_eq!(daily.today_users, 1);
    assert_eq!(daily.today_lectures, 1);
    assert_eq!(daily.today_vacancies, 1);
    assert_eq!(daily.today_projects, 1);
    assert_eq!(daily.yesterday_users, 0);
    assert_eq!(daily.week_users, 1);

    let window = stats::collect_activity_window(&conn).unwrap();
    assert_eq!(window.new_users, 1);
    assert_eq!(window.new_events, 1);
    assert_eq!(window.new_lectures, 1);
    assert_eq!(window.new_vacancies, 1);
    assert_eq!(window.new_projects, 1);
}

#[test]
fn vacancies_and_projects_lists_hide_inactive() {
    let db = test_db();
    let conn = conn(&db);

    let v1 = db::insert_vacancy(&conn, "v1", None, None, None, None, None, None).unwrap();
    db::insert_vacancy(&conn, "v2", None, None, None, None, None, None).unwrap();
    conn.execute("UPDATE vacancies SET is_active = 0 WHERE id = ?1", [v1]).unwrap();

    let vacancies = db::active_vacancies(&conn, 10).unwrap();
    assert_eq!(vacancies.len(), 1);
    assert_eq!(vacancies[0].title, "v2");

    let p1 = db::insert_project(&conn, "p1", None, "discussion", None, None).unwrap();
    db::insert_project(&conn, "p2", None, "development", None, None).unwrap();
    conn.execute("UPDATE projects SET is_active = 0 WHERE id = ?1", [p1]).unwrap();

    let projects = db::active_projects(&conn, 10).unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].title, "p2");
}
