use chrono::NaiveDateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Result;

use crate::storage::migrations;

/// Формат, в котором events.date_time хранится в базе. Совпадает с
/// выводом sqlite-функции datetime('now'), поэтому сравнения в SQL
/// работают лексикографически.
pub const SQL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and runs schema
/// migrations on the first connection.
pub fn create_pool(database_path: &str) -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    let mut conn = pool.get()?;
    migrations::run_migrations(&mut conn)?;

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

fn parse_db_datetime(idx: usize, raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, SQL_DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Структура, представляющая пользователя в базе данных.
#[derive(Debug, Clone)]
pub struct User {
    /// Суррогатный id (на него ссылаются created_by / posted_by)
    pub id: i64,
    /// Telegram ID пользователя (уникален)
    pub telegram_id: i64,
    /// Имя пользователя (username) в Telegram, если доступно
    pub username: Option<String>,
    /// Отображаемое имя пользователя
    pub full_name: Option<String>,
    /// Флаг администратора (информационный, доступ решает allow-list)
    pub is_admin: bool,
    /// Дата регистрации
    pub created_at: String,
}

/// Получает пользователя из базы данных по Telegram ID.
pub fn get_user(conn: &DbConnection, telegram_id: i64) -> Result<Option<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, telegram_id, username, full_name, is_admin, created_at FROM users WHERE telegram_id = ?",
    )?;
    let mut rows = stmt.query(&[&telegram_id as &dyn rusqlite::ToSql])?;

    if let Some(row) = rows.next()? {
        Ok(Some(User {
            id: row.get(0)?,
            telegram_id: row.get(1)?,
            username: row.get(2)?,
            full_name: row.get(3)?,
            is_admin: row.get::<_, i32>(4)? == 1,
            created_at: row.get(5)?,
        }))
    } else {
        Ok(None)
    }
}

/// Создает нового пользователя.
///
/// # Errors
///
/// Возвращает ошибку если пользователь с таким telegram_id уже существует.
pub fn create_user(
    conn: &DbConnection,
    telegram_id: i64,
    username: Option<&str>,
    full_name: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (telegram_id, username, full_name) VALUES (?1, ?2, ?3)",
        &[
            &telegram_id as &dyn rusqlite::ToSql,
            &username as &dyn rusqlite::ToSql,
            &full_name as &dyn rusqlite::ToSql,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Mentors
// ---------------------------------------------------------------------------

/// Структура, представляющая ментора.
#[derive(Debug, Clone)]
pub struct Mentor {
    pub id: i64,
    pub name: String,
    pub bio: Option<String>,
    pub specialization: Option<String>,
    pub contact_info: Option<String>,
    pub is_active: bool,
}

fn mentor_from_row(row: &rusqlite::Row<'_>) -> Result<Mentor> {
    Ok(Mentor {
        id: row.get(0)?,
        name: row.get(1)?,
        bio: row.get(2)?,
        specialization: row.get(3)?,
        contact_info: row.get(4)?,
        is_active: row.get::<_, i32>(5)? == 1,
    })
}

const MENTOR_COLUMNS: &str = "id, name, bio, specialization, contact_info, is_active";

/// Создает ментора (is_active = 1) и возвращает его id.
pub fn insert_mentor(
    conn: &DbConnection,
    name: &str,
    specialization: &str,
    bio: &str,
    contact_info: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO mentors (name, specialization, bio, contact_info, is_active) VALUES (?1, ?2, ?3, ?4, 1)",
        &[
            &name as &dyn rusqlite::ToSql,
            &specialization as &dyn rusqlite::ToSql,
            &bio as &dyn rusqlite::ToSql,
            &contact_info as &dyn rusqlite::ToSql,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Все активные менторы (порядок не специфицирован, берем порядок вставки).
pub fn active_mentors(conn: &DbConnection) -> Result<Vec<Mentor>> {
    let mut stmt = conn.prepare(&format!("SELECT {MENTOR_COLUMNS} FROM mentors WHERE is_active = 1"))?;
    let rows = stmt.query_map([], |row| mentor_from_row(row))?;

    let mut mentors = Vec::new();
    for row in rows {
        mentors.push(row?);
    }
    Ok(mentors)
}

/// Получает ментора по id независимо от is_active: на деактивированного
/// ментора могут ссылаться исторические записи.
pub fn get_mentor(conn: &DbConnection, mentor_id: i64) -> Result<Option<Mentor>> {
    let mut stmt = conn.prepare(&format!("SELECT {MENTOR_COLUMNS} FROM mentors WHERE id = ?"))?;
    let mut rows = stmt.query(&[&mentor_id as &dyn rusqlite::ToSql])?;

    if let Some(row) = rows.next()? {
        Ok(Some(mentor_from_row(row)?))
    } else {
        Ok(None)
    }
}

/// Мягкое удаление ментора. Возвращает false, если активного ментора
/// с таким id уже нет.
pub fn soft_delete_mentor(conn: &DbConnection, mentor_id: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE mentors SET is_active = 0 WHERE id = ?1 AND is_active = 1",
        &[&mentor_id as &dyn rusqlite::ToSql],
    )?;
    Ok(affected > 0)
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Структура, представляющая мероприятие.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub date_time: NaiveDateTime,
    pub location: Option<String>,
    pub mentor_id: Option<i64>,
    pub is_active: bool,
    pub created_by: Option<i64>,
}

/// Мероприятие вместе с именем ментора (LEFT JOIN, имя может отсутствовать).
#[derive(Debug, Clone)]
pub struct EventWithMentor {
    pub event: Event,
    pub mentor_name: Option<String>,
}

const EVENT_JOIN_COLUMNS: &str = "e.id, e.title, e.description, e.date_time, e.location, e.mentor_id, e.is_active, e.created_by, m.name";

fn event_from_row(row: &rusqlite::Row<'_>) -> Result<EventWithMentor> {
    let raw_dt: String = row.get(3)?;
    Ok(EventWithMentor {
        event: Event {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            date_time: parse_db_datetime(3, &raw_dt)?,
            location: row.get(4)?,
            mentor_id: row.get(5)?,
            is_active: row.get::<_, i32>(6)? == 1,
            created_by: row.get(7)?,
        },
        mentor_name: row.get(8)?,
    })
}

/// Создает мероприятие (is_active = 1) и возвращает его id.
///
/// # Arguments
///
/// * `mentor_id` - None означает "без ментора", это валидное состояние
/// * `created_by` - id пользователя-создателя (users.id)
pub fn insert_event(
    conn: &DbConnection,
    title: &str,
    description: &str,
    date_time: NaiveDateTime,
    location: &str,
    mentor_id: Option<i64>,
    created_by: i64,
) -> Result<i64> {
    let date_time = date_time.format(SQL_DATETIME_FORMAT).to_string();
    conn.execute(
        "INSERT INTO events (title, description, date_time, location, mentor_id, is_active, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
        &[
            &title as &dyn rusqlite::ToSql,
            &description as &dyn rusqlite::ToSql,
            &date_time as &dyn rusqlite::ToSql,
            &location as &dyn rusqlite::ToSql,
            &mentor_id as &dyn rusqlite::ToSql,
            &created_by as &dyn rusqlite::ToSql,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Получает активное мероприятие по id. Мягко удаленные мероприятия
/// считаются несуществующими для всех операций редактирования.
pub fn get_event(conn: &DbConnection, event_id: i64) -> Result<Option<EventWithMentor>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_JOIN_COLUMNS} FROM events e
         LEFT JOIN mentors m ON m.id = e.mentor_id
         WHERE e.id = ? AND e.is_active = 1"
    ))?;
    let mut rows = stmt.query(&[&event_id as &dyn rusqlite::ToSql])?;

    if let Some(row) = rows.next()? {
        Ok(Some(event_from_row(row)?))
    } else {
        Ok(None)
    }
}

/// Ближайшие мероприятия: активные, строго в будущем, по возрастанию даты.
pub fn upcoming_events(conn: &DbConnection, limit: i64) -> Result<Vec<EventWithMentor>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_JOIN_COLUMNS} FROM events e
         LEFT JOIN mentors m ON m.id = e.mentor_id
         WHERE e.is_active = 1 AND e.date_time > datetime('now')
         ORDER BY e.date_time ASC
         LIMIT ?"
    ))?;
    let rows = stmt.query_map(&[&limit as &dyn rusqlite::ToSql], |row| event_from_row(row))?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Все активные мероприятия по возрастанию даты: списки выбора
/// в админских сценариях редактирования и удаления.
pub fn active_events_by_date(conn: &DbConnection, limit: i64) -> Result<Vec<EventWithMentor>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_JOIN_COLUMNS} FROM events e
         LEFT JOIN mentors m ON m.id = e.mentor_id
         WHERE e.is_active = 1
         ORDER BY e.date_time ASC
         LIMIT ?"
    ))?;
    let rows = stmt.query_map(&[&limit as &dyn rusqlite::ToSql], |row| event_from_row(row))?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

fn update_event_column(conn: &DbConnection, event_id: i64, column: &str, value: &dyn rusqlite::ToSql) -> Result<bool> {
    // column is always one of the fixed names below, never user input
    let affected = conn.execute(
        &format!("UPDATE events SET {column} = ?1 WHERE id = ?2 AND is_active = 1"),
        &[value, &event_id as &dyn rusqlite::ToSql],
    )?;
    Ok(affected > 0)
}

/// Точечные обновления одного поля мероприятия. Каждое обновление
/// выполняется одиночным UPDATE; остальные колонки и is_active не затрагиваются.
/// Возвращают false, если активного мероприятия с таким id нет.
pub fn update_event_title(conn: &DbConnection, event_id: i64, title: &str) -> Result<bool> {
    update_event_column(conn, event_id, "title", &title)
}

pub fn update_event_description(conn: &DbConnection, event_id: i64, description: &str) -> Result<bool> {
    update_event_column(conn, event_id, "description", &description)
}

pub fn update_event_date_time(conn: &DbConnection, event_id: i64, date_time: NaiveDateTime) -> Result<bool> {
    let formatted = date_time.format(SQL_DATETIME_FORMAT).to_string();
    update_event_column(conn, event_id, "date_time", &formatted)
}

pub fn update_event_location(conn: &DbConnection, event_id: i64, location: &str) -> Result<bool> {
    update_event_column(conn, event_id, "location", &location)
}

pub fn update_event_mentor(conn: &DbConnection, event_id: i64, mentor_id: Option<i64>) -> Result<bool> {
    update_event_column(conn, event_id, "mentor_id", &mentor_id)
}

/// Мягкое удаление мероприятия.
pub fn soft_delete_event(conn: &DbConnection, event_id: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE events SET is_active = 0 WHERE id = ?1 AND is_active = 1",
        &[&event_id as &dyn rusqlite::ToSql],
    )?;
    Ok(affected > 0)
}

// ---------------------------------------------------------------------------
// Lectures
// ---------------------------------------------------------------------------

/// Запись лекции (загружается вне бота, бот только показывает).
#[derive(Debug, Clone)]
pub struct Lecture {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub mentor_id: Option<i64>,
    pub file_path: Option<String>,
    pub video_url: Option<String>,
    pub duration: Option<i64>,
    pub uploaded_at: String,
    pub uploaded_by: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct LectureWithMentor {
    pub lecture: Lecture,
    pub mentor_name: Option<String>,
}

const LECTURE_JOIN_COLUMNS: &str = "l.id, l.title, l.description, l.category, l.mentor_id, l.file_path, l.video_url, l.duration, l.uploaded_at, l.uploaded_by, m.name";

fn lecture_from_row(row: &rusqlite::Row<'_>) -> Result<LectureWithMentor> {
    Ok(LectureWithMentor {
        lecture: Lecture {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            mentor_id: row.get(4)?,
            file_path: row.get(5)?,
            video_url: row.get(6)?,
            duration: row.get(7)?,
            uploaded_at: row.get(8)?,
            uploaded_by: row.get(9)?,
        },
        mentor_name: row.get(10)?,
    })
}

/// Лекции по категории (None = все), новые сверху.
pub fn lectures_by_category(
    conn: &DbConnection,
    category: Option<crate::core::LectureCategory>,
    limit: i64,
) -> Result<Vec<LectureWithMentor>> {
    let mut lectures = Vec::new();

    match category {
        Some(category) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LECTURE_JOIN_COLUMNS} FROM lectures l
                 LEFT JOIN mentors m ON m.id = l.mentor_id
                 WHERE l.category = ?1
                 ORDER BY l.uploaded_at DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(
                &[&category.db_value() as &dyn rusqlite::ToSql, &limit as &dyn rusqlite::ToSql],
                |row| lecture_from_row(row),
            )?;
            for row in rows {
                lectures.push(row?);
            }
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LECTURE_JOIN_COLUMNS} FROM lectures l
                 LEFT JOIN mentors m ON m.id = l.mentor_id
                 ORDER BY l.uploaded_at DESC
                 LIMIT ?"
            ))?;
            let rows = stmt.query_map(&[&limit as &dyn rusqlite::ToSql], |row| lecture_from_row(row))?;
            for row in rows {
                lectures.push(row?);
            }
        }
    }

    Ok(lectures)
}

/// Сохраняет запись лекции.
pub fn insert_lecture(
    conn: &DbConnection,
    title: &str,
    category: Option<&str>,
    mentor_id: Option<i64>,
    video_url: Option<&str>,
    duration: Option<i64>,
    uploaded_by: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO lectures (title, category, mentor_id, video_url, duration, uploaded_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        &[
            &title as &dyn rusqlite::ToSql,
            &category as &dyn rusqlite::ToSql,
            &mentor_id as &dyn rusqlite::ToSql,
            &video_url as &dyn rusqlite::ToSql,
            &duration as &dyn rusqlite::ToSql,
            &uploaded_by as &dyn rusqlite::ToSql,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Vacancies
// ---------------------------------------------------------------------------

/// Вакансия.
#[derive(Debug, Clone)]
pub struct Vacancy {
    pub id: i64,
    pub title: String,
    pub company: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub salary_range: Option<String>,
    pub location: Option<String>,
    pub contact_info: Option<String>,
    pub is_active: bool,
    pub posted_at: String,
    pub posted_by: Option<i64>,
}

/// Активные вакансии, новые сверху.
pub fn active_vacancies(conn: &DbConnection, limit: i64) -> Result<Vec<Vacancy>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, company, description, requirements, salary_range, location, contact_info, is_active, posted_at, posted_by
         FROM vacancies WHERE is_active = 1 ORDER BY posted_at DESC LIMIT ?",
    )?;
    let rows = stmt.query_map(&[&limit as &dyn rusqlite::ToSql], |row| {
        Ok(Vacancy {
            id: row.get(0)?,
            title: row.get(1)?,
            company: row.get(2)?,
            description: row.get(3)?,
            requirements: row.get(4)?,
            salary_range: row.get(5)?,
            location: row.get(6)?,
            contact_info: row.get(7)?,
            is_active: row.get::<_, i32>(8)? == 1,
            posted_at: row.get(9)?,
            posted_by: row.get(10)?,
        })
    })?;

    let mut vacancies = Vec::new();
    for row in rows {
        vacancies.push(row?);
    }
    Ok(vacancies)
}

/// Сохраняет вакансию.
pub fn insert_vacancy(
    conn: &DbConnection,
    title: &str,
    company: Option<&str>,
    description: Option<&str>,
    salary_range: Option<&str>,
    location: Option<&str>,
    contact_info: Option<&str>,
    posted_by: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO vacancies (title, company, description, salary_range, location, contact_info, posted_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        &[
            &title as &dyn rusqlite::ToSql,
            &company as &dyn rusqlite::ToSql,
            &description as &dyn rusqlite::ToSql,
            &salary_range as &dyn rusqlite::ToSql,
            &location as &dyn rusqlite::ToSql,
            &contact_info as &dyn rusqlite::ToSql,
            &posted_by as &dyn rusqlite::ToSql,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Совместный проект. status хранится как текст: значения вне словаря
/// ProjectStatus показываются как "неизвестный" статус, но не ломают
/// агрегаты.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub required_skills: Option<String>,
    pub contact_person: Option<i64>,
    pub is_active: bool,
    pub created_at: String,
}

/// Активные проекты, новые сверху.
pub fn active_projects(conn: &DbConnection, limit: i64) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, status, required_skills, contact_person, is_active, created_at
         FROM projects WHERE is_active = 1 ORDER BY created_at DESC LIMIT ?",
    )?;
    let rows = stmt.query_map(&[&limit as &dyn rusqlite::ToSql], |row| {
        Ok(Project {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            status: row.get(3)?,
            required_skills: row.get(4)?,
            contact_person: row.get(5)?,
            is_active: row.get::<_, i32>(6)? == 1,
            created_at: row.get(7)?,
        })
    })?;

    let mut projects = Vec::new();
    for row in rows {
        projects.push(row?);
    }
    Ok(projects)
}

/// Сохраняет проект.
pub fn insert_project(
    conn: &DbConnection,
    title: &str,
    description: Option<&str>,
    status: &str,
    required_skills: Option<&str>,
    contact_person: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO projects (title, description, status, required_skills, contact_person)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        &[
            &title as &dyn rusqlite::ToSql,
            &description as &dyn rusqlite::ToSql,
            &status as &dyn rusqlite::ToSql,
            &required_skills as &dyn rusqlite::ToSql,
            &contact_person as &dyn rusqlite::ToSql,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}
