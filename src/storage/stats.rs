//! Aggregate read-models for the admin statistics views.
//!
//! Every query here is a pure projection of the current store contents.
//! Optional sub-resources (vacancies, projects, lectures) are guarded by an
//! explicit table-presence check and report zero when the table is absent,
//! so a partially provisioned database never fails the whole snapshot.

use rusqlite::Result;
use std::str::FromStr;

use crate::core::{LectureCategory, ProjectStatus};
use crate::storage::db::DbConnection;

/// Общий снимок статистики сообщества.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub total_users: i64,
    pub active_mentors: i64,
    pub active_events: i64,
    pub future_events: i64,
    pub past_events: i64,
    pub total_lectures: i64,
    /// Количество лекций по каждой категории словаря (в порядке меню)
    pub lectures_by_category: Vec<(LectureCategory, i64)>,
    pub active_vacancies: i64,
    pub active_projects: i64,
    /// Активные проекты по трем известным статусам
    pub projects_by_status: Vec<(ProjectStatus, i64)>,
}

/// Активность за последние 30 дней + топ менторов.
#[derive(Debug, Clone, Default)]
pub struct ActivityWindow {
    pub new_users: i64,
    pub new_events: i64,
    pub new_lectures: i64,
    pub new_vacancies: i64,
    pub new_projects: i64,
    /// Топ-5 менторов по числу активных мероприятий:
    /// (имя, количество), убывание количества, затем имя.
    pub top_mentors: Vec<(String, i64)>,
}

/// Счетчики за сегодня / вчера / неделю.
#[derive(Debug, Clone, Default)]
pub struct DailyStats {
    pub today_users: i64,
    pub today_events: i64,
    pub today_lectures: i64,
    pub today_vacancies: i64,
    pub today_projects: i64,
    pub yesterday_users: i64,
    pub week_users: i64,
    pub week_events: i64,
}

/// Checks whether a table is present in the schema. Sub-metrics over
/// missing tables are reported as zero instead of failing the snapshot.
pub fn table_exists(conn: &DbConnection, table: &str) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
        &[&table as &dyn rusqlite::ToSql],
        |row| Ok(row.get::<_, i32>(0)? > 0),
    )
}

fn count(conn: &DbConnection, sql: &str) -> Result<i64> {
    conn.query_row(sql, [], |row| row.get(0))
}

fn count_if_present(conn: &DbConnection, table: &str, sql: &str) -> Result<i64> {
    if table_exists(conn, table)? {
        count(conn, sql)
    } else {
        Ok(0)
    }
}

/// Собирает общий снимок статистики.
pub fn collect_statistics(conn: &DbConnection) -> Result<Statistics> {
    let total_users = count(conn, "SELECT COUNT(*) FROM users")?;
    let active_mentors = count(conn, "SELECT COUNT(*) FROM mentors WHERE is_active = 1")?;
    let active_events = count(conn, "SELECT COUNT(*) FROM events WHERE is_active = 1")?;
    let future_events = count(
        conn,
        "SELECT COUNT(*) FROM events WHERE is_active = 1 AND date_time > datetime('now')",
    )?;
    let past_events = count(
        conn,
        "SELECT COUNT(*) FROM events WHERE is_active = 1 AND date_time <= datetime('now')",
    )?;

    let lectures_present = table_exists(conn, "lectures")?;
    let total_lectures = if lectures_present {
        count(conn, "SELECT COUNT(*) FROM lectures")?
    } else {
        0
    };
    let lectures_by_category = if lectures_present {
        lecture_category_counts(conn)?
    } else {
        Vec::new()
    };

    let active_vacancies = count_if_present(conn, "vacancies", "SELECT COUNT(*) FROM vacancies WHERE is_active = 1")?;

    let projects_present = table_exists(conn, "projects")?;
    let active_projects = if projects_present {
        count(conn, "SELECT COUNT(*) FROM projects WHERE is_active = 1")?
    } else {
        0
    };
    let projects_by_status = if projects_present {
        project_status_counts(conn)?
    } else {
        Vec::new()
    };

    Ok(Statistics {
        total_users,
        active_mentors,
        active_events,
        future_events,
        past_events,
        total_lectures,
        lectures_by_category,
        active_vacancies,
        active_projects,
        projects_by_status,
    })
}

/// Количество лекций по каждой категории словаря. Категории вне словаря
/// не учитываются (они видны только в общем счетчике и в списке "все").
fn lecture_category_counts(conn: &DbConnection) -> Result<Vec<(LectureCategory, i64)>> {
    let mut stmt = conn.prepare("SELECT category, COUNT(*) FROM lectures GROUP BY category")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, Option<String>>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut by_value = std::collections::HashMap::new();
    for row in rows {
        let (category, cnt) = row?;
        if let Some(category) = category.as_deref().and_then(LectureCategory::from_db_value) {
            by_value.insert(category, cnt);
        }
    }

    Ok(LectureCategory::ALL
        .iter()
        .map(|c| (*c, by_value.get(c).copied().unwrap_or(0)))
        .collect())
}

/// Активные проекты по известным статусам. Неизвестный статус не попадает
/// ни в одну корзину, но остается в общем счетчике активных проектов.
fn project_status_counts(conn: &DbConnection) -> Result<Vec<(ProjectStatus, i64)>> {
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM projects WHERE is_active = 1 GROUP BY status")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

    let mut by_status = std::collections::HashMap::new();
    for row in rows {
        let (status, cnt) = row?;
        if let Ok(status) = ProjectStatus::from_str(&status) {
            by_status.insert(status, cnt);
        }
    }

    Ok(ProjectStatus::ALL
        .iter()
        .map(|s| (*s, by_status.get(s).copied().unwrap_or(0)))
        .collect())
}

/// Собирает активность за последние 30 дней и топ менторов.
pub fn collect_activity_window(conn: &DbConnection) -> Result<ActivityWindow> {
    let new_users = count(
        conn,
        "SELECT COUNT(*) FROM users WHERE created_at >= datetime('now', '-30 days')",
    )?;
    let new_events = count(
        conn,
        "SELECT COUNT(*) FROM events WHERE is_active = 1 AND date_time >= datetime('now', '-30 days')",
    )?;
    let new_lectures = count_if_present(
        conn,
        "lectures",
        "SELECT COUNT(*) FROM lectures WHERE uploaded_at >= datetime('now', '-30 days')",
    )?;
    let new_vacancies = count_if_present(
        conn,
        "vacancies",
        "SELECT COUNT(*) FROM vacancies WHERE posted_at >= datetime('now', '-30 days')",
    )?;
    let new_projects = count_if_present(
        conn,
        "projects",
        "SELECT COUNT(*) FROM projects WHERE created_at >= datetime('now', '-30 days')",
    )?;

    Ok(ActivityWindow {
        new_users,
        new_events,
        new_lectures,
        new_vacancies,
        new_projects,
        top_mentors: top_mentors(conn, 5)?,
    })
}

/// Топ менторов по числу активных мероприятий. Одна группирующая выборка;
/// при равенстве счетчиков порядок детерминирован вторичной сортировкой
/// по имени.
pub fn top_mentors(conn: &DbConnection, limit: i64) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT m.name, COUNT(e.id) as cnt
         FROM events e
         JOIN mentors m ON m.id = e.mentor_id
         WHERE e.is_active = 1
         GROUP BY e.mentor_id, m.name
         ORDER BY cnt DESC, m.name ASC
         LIMIT ?",
    )?;
    let rows = stmt.query_map(&[&limit as &dyn rusqlite::ToSql], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut mentors = Vec::new();
    for row in rows {
        mentors.push(row?);
    }
    Ok(mentors)
}

/// Собирает счетчики за сегодня, вчера и последнюю неделю.
pub fn collect_daily_stats(conn: &DbConnection) -> Result<DailyStats> {
    let today_users = count(conn, "SELECT COUNT(*) FROM users WHERE date(created_at) = date('now')")?;
    let today_events = count(
        conn,
        "SELECT COUNT(*) FROM events WHERE is_active = 1 AND date(date_time) = date('now')",
    )?;
    let today_lectures = count_if_present(
        conn,
        "lectures",
        "SELECT COUNT(*) FROM lectures WHERE date(uploaded_at) = date('now')",
    )?;
    let today_vacancies = count_if_present(
        conn,
        "vacancies",
        "SELECT COUNT(*) FROM vacancies WHERE date(posted_at) = date('now')",
    )?;
    let today_projects = count_if_present(
        conn,
        "projects",
        "SELECT COUNT(*) FROM projects WHERE date(created_at) = date('now')",
    )?;

    let yesterday_users = count(
        conn,
        "SELECT COUNT(*) FROM users WHERE date(created_at) = date('now', '-1 day')",
    )?;

    let week_users = count(
        conn,
        "SELECT COUNT(*) FROM users WHERE created_at >= datetime('now', '-7 days')",
    )?;
    let week_events = count(
        conn,
        "SELECT COUNT(*) FROM events WHERE is_active = 1 AND date_time >= datetime('now', '-7 days')",
    )?;

    Ok(DailyStats {
        today_users,
        today_events,
        today_lectures,
        today_vacancies,
        today_projects,
        yesterday_users,
        week_users,
        week_events,
    })
}
