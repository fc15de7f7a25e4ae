//! User-facing views: main menu and the read-only list screens
//!
//! Text assembly is kept in pure functions over read-model rows so the
//! rendering is testable without a Telegram connection; the thin senders
//! below only push the result through the API.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};

use crate::core::{AppResult, LectureCategory, ProjectStatus};
use crate::storage::db::{self, EventWithMentor, LectureWithMentor, Mentor, Project, Vacancy};
use crate::storage::get_connection;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::markdown::{escape_markdown, truncate_string_safe};

/// Сколько записей показывает каждый список.
pub const LIST_LIMIT: i64 = 10;

/// Переводит дату из формата базы (ГГГГ-ММ-ДД ...) в ДД.ММ.ГГГГ.
fn format_db_date(raw: &str) -> String {
    let date_part = raw.split(' ').next().unwrap_or(raw);
    let parts: Vec<&str> = date_part.split('-').collect();
    if parts.len() == 3 {
        format!("{}.{}.{}", parts[2], parts[1], parts[0])
    } else {
        raw.to_string()
    }
}

pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📅 Мероприятия", "events")],
        vec![InlineKeyboardButton::callback("👨‍🏫 Менторы", "mentors")],
        vec![InlineKeyboardButton::callback("📚 Лекции", "lectures")],
        vec![InlineKeyboardButton::callback("💼 Вакансии", "vacancies")],
        vec![InlineKeyboardButton::callback("🚀 Проекты", "projects")],
    ])
}

fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("◀️ Назад", "back_to_main")]])
}

fn lectures_keyboard() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = LectureCategory::ALL
        .iter()
        .map(|c| {
            vec![InlineKeyboardButton::callback(
                format!("{} {}", c.emoji(), c.db_value()),
                format!("lectures_{}", c.code()),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("🎯 Все лекции", "lectures_all")]);
    rows.push(vec![InlineKeyboardButton::callback("◀️ Назад", "back_to_main")]);
    InlineKeyboardMarkup::new(rows)
}

/// Приветствие /start.
pub fn greeting_text() -> &'static str {
    "Ассаляму алейкум\\! Добро пожаловать в IT Jama'at\\! 🕌💻\n\n\
     Здесь мусульмане\\-айтишники находят единомышленников, учатся и развиваются вместе\\.\n\n\
     Выберите интересующий раздел:"
}

/// Собирает текст списка ближайших мероприятий.
pub fn format_events_list(events: &[EventWithMentor]) -> String {
    let mut text = "📅 *Ближайшие мероприятия:*\n\n".to_string();
    for item in events {
        let event = &item.event;
        let mentor_name = item.mentor_name.as_deref().unwrap_or("Не указан");
        text.push_str(&format!("🔸 *{}*\n", escape_markdown(&event.title)));
        text.push_str(&format!(
            "📍 {}\n",
            escape_markdown(event.location.as_deref().unwrap_or("Онлайн"))
        ));
        text.push_str(&format!(
            "⏰ {}\n",
            escape_markdown(&event.date_time.format("%d.%m.%Y %H:%M").to_string())
        ));
        text.push_str(&format!("👨‍🏫 {}\n", escape_markdown(mentor_name)));
        if let Some(description) = event.description.as_deref() {
            text.push_str(&format!(
                "📝 {}\n",
                escape_markdown(&truncate_string_safe(description, 100))
            ));
        }
        text.push('\n');
    }
    text
}

/// Краткий текст для команды /events.
pub fn format_events_brief(events: &[EventWithMentor]) -> String {
    events
        .iter()
        .map(|item| {
            format!(
                "📅 {} — {} (ментор: {})",
                item.event.date_time.format("%d.%m.%Y %H:%M"),
                item.event.title,
                item.mentor_name.as_deref().unwrap_or("не назначен")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Собирает текст списка активных менторов.
pub fn format_mentors_list(mentors: &[Mentor]) -> String {
    let mut text = "👨‍🏫 *Наши менторы:*\n\n".to_string();
    for mentor in mentors {
        text.push_str(&format!("🔸 *{}*\n", escape_markdown(&mentor.name)));
        text.push_str(&format!(
            "💼 {}\n",
            escape_markdown(mentor.specialization.as_deref().unwrap_or("Специализация не указана"))
        ));
        if let Some(bio) = mentor.bio.as_deref() {
            text.push_str(&format!("📝 {}\n", escape_markdown(&truncate_string_safe(bio, 100))));
        }
        if let Some(contact) = mentor.contact_info.as_deref() {
            text.push_str(&format!("📞 {}\n", escape_markdown(contact)));
        }
        text.push('\n');
    }
    text
}

/// Собирает текст списка лекций выбранной категории.
pub fn format_lectures_list(category: Option<LectureCategory>, lectures: &[LectureWithMentor]) -> String {
    let mut text = match category {
        Some(category) => format!("📚 *Лекции: {}*\n\n", escape_markdown(category.db_value())),
        None => "📚 *Лекции по всем категориям:*\n\n".to_string(),
    };
    for item in lectures {
        let lecture = &item.lecture;
        text.push_str(&format!("🔸 *{}*\n", escape_markdown(&lecture.title)));
        text.push_str(&format!(
            "👨‍🏫 {}\n",
            escape_markdown(item.mentor_name.as_deref().unwrap_or("Неизвестно"))
        ));
        let category_label = lecture
            .category
            .as_deref()
            .filter(|c| LectureCategory::from_db_value(c).is_some())
            .unwrap_or("Без категории");
        text.push_str(&format!("📂 {}\n", escape_markdown(category_label)));
        if let Some(duration) = lecture.duration {
            text.push_str(&format!("⏱ {} мин\n", duration));
        }
        if let Some(description) = lecture.description.as_deref() {
            text.push_str(&format!(
                "📝 {}\n",
                escape_markdown(&truncate_string_safe(description, 80))
            ));
        }
        text.push_str(&format!("📅 {}\n\n", escape_markdown(&format_db_date(&lecture.uploaded_at))));
    }
    text
}

/// Собирает текст списка активных вакансий.
pub fn format_vacancies_list(vacancies: &[Vacancy]) -> String {
    let mut text = "💼 *Актуальные вакансии:*\n\n".to_string();
    for vacancy in vacancies {
        text.push_str(&format!("🔸 *{}*\n", escape_markdown(&vacancy.title)));
        text.push_str(&format!(
            "🏢 {}\n",
            escape_markdown(vacancy.company.as_deref().unwrap_or("Компания не указана"))
        ));
        if let Some(salary) = vacancy.salary_range.as_deref() {
            text.push_str(&format!("💰 {}\n", escape_markdown(salary)));
        }
        text.push_str(&format!(
            "📍 {}\n",
            escape_markdown(vacancy.location.as_deref().unwrap_or("Не указано"))
        ));
        if let Some(description) = vacancy.description.as_deref() {
            text.push_str(&format!(
                "📝 {}\n",
                escape_markdown(&truncate_string_safe(description, 100))
            ));
        }
        if let Some(contact) = vacancy.contact_info.as_deref() {
            text.push_str(&format!("📞 {}\n", escape_markdown(contact)));
        }
        text.push('\n');
    }
    text
}

/// Собирает текст списка активных проектов. Статус вне словаря
/// показывается как есть с нейтральным значком.
pub fn format_projects_list(projects: &[Project]) -> String {
    let mut text = "🚀 *Активные проекты:*\n\n".to_string();
    for project in projects {
        text.push_str(&format!("🔸 *{}*\n", escape_markdown(&project.title)));
        match project.status.parse::<ProjectStatus>() {
            Ok(status) => text.push_str(&format!("{} {}\n", status.emoji(), status.display_name())),
            Err(_) => text.push_str(&format!("📋 {}\n", escape_markdown(&project.status))),
        }
        if let Some(description) = project.description.as_deref() {
            text.push_str(&format!(
                "📝 {}\n",
                escape_markdown(&truncate_string_safe(description, 100))
            ));
        }
        if let Some(skills) = project.required_skills.as_deref() {
            text.push_str(&format!(
                "🛠 Нужны: {}\n",
                escape_markdown(&truncate_string_safe(skills, 50))
            ));
        }
        text.push_str(&format!("📅 {}\n\n", escape_markdown(&format_db_date(&project.created_at))));
    }
    text
}

/// Отправляет главное меню.
pub async fn show_main_menu(bot: &Bot, chat_id: ChatId) -> AppResult<()> {
    bot.send_message(chat_id, greeting_text())
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(main_menu_keyboard())
        .await?;
    Ok(())
}

async fn edit_markdown(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: String,
    keyboard: InlineKeyboardMarkup,
) -> AppResult<()> {
    bot.edit_message_text(chat_id, message_id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/// Обрабатывает callback-кнопки пользовательского меню.
pub async fn handle_menu_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> AppResult<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let (Some(chat_id), Some(message_id)) = (
        q.message.as_ref().map(|m| m.chat().id),
        q.message.as_ref().map(|m| m.id()),
    ) else {
        return Ok(());
    };

    let _ = bot.answer_callback_query(q.id.clone()).await;

    match data {
        "back_to_main" => {
            edit_markdown(
                bot,
                chat_id,
                message_id,
                "🕌💻 *IT Jama'at*\n\nВыберите интересующий раздел:".to_string(),
                main_menu_keyboard(),
            )
            .await?;
        }
        "events" => {
            let conn = get_connection(&deps.db_pool)?;
            let events = db::upcoming_events(&conn, LIST_LIMIT)?;
            if events.is_empty() {
                bot.edit_message_text(chat_id, message_id, "📅 Пока нет запланированных мероприятий")
                    .reply_markup(back_keyboard())
                    .await?;
            } else {
                edit_markdown(bot, chat_id, message_id, format_events_list(&events), back_keyboard()).await?;
            }
        }
        "mentors" => {
            let conn = get_connection(&deps.db_pool)?;
            let mentors = db::active_mentors(&conn)?;
            if mentors.is_empty() {
                bot.edit_message_text(chat_id, message_id, "👨‍🏫 Пока нет активных менторов")
                    .reply_markup(back_keyboard())
                    .await?;
            } else {
                edit_markdown(bot, chat_id, message_id, format_mentors_list(&mentors), back_keyboard()).await?;
            }
        }
        "lectures" => {
            edit_markdown(
                bot,
                chat_id,
                message_id,
                "📚 *Выберите категорию лекций:*".to_string(),
                lectures_keyboard(),
            )
            .await?;
        }
        "vacancies" => {
            let conn = get_connection(&deps.db_pool)?;
            let vacancies = db::active_vacancies(&conn, LIST_LIMIT)?;
            if vacancies.is_empty() {
                bot.edit_message_text(chat_id, message_id, "💼 Пока нет активных вакансий")
                    .reply_markup(back_keyboard())
                    .await?;
            } else {
                edit_markdown(
                    bot,
                    chat_id,
                    message_id,
                    format_vacancies_list(&vacancies),
                    back_keyboard(),
                )
                .await?;
            }
        }
        "projects" => {
            let conn = get_connection(&deps.db_pool)?;
            let projects = db::active_projects(&conn, LIST_LIMIT)?;
            if projects.is_empty() {
                bot.edit_message_text(chat_id, message_id, "🚀 Пока нет активных проектов")
                    .reply_markup(back_keyboard())
                    .await?;
            } else {
                edit_markdown(bot, chat_id, message_id, format_projects_list(&projects), back_keyboard()).await?;
            }
        }
        _ if data.starts_with("lectures_") => {
            let code = data.trim_start_matches("lectures_");
            let category = if code == "all" { None } else { LectureCategory::from_code(code) };
            let conn = get_connection(&deps.db_pool)?;
            let lectures = db::lectures_by_category(&conn, category, LIST_LIMIT)?;
            if lectures.is_empty() {
                let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                    "◀️ К категориям",
                    "lectures",
                )]]);
                bot.edit_message_text(chat_id, message_id, "📚 В данной категории пока нет лекций")
                    .reply_markup(keyboard)
                    .await?;
            } else {
                let keyboard = InlineKeyboardMarkup::new(vec![
                    vec![InlineKeyboardButton::callback("◀️ К категориям", "lectures")],
                    vec![InlineKeyboardButton::callback("🏠 Главное меню", "back_to_main")],
                ]);
                edit_markdown(
                    bot,
                    chat_id,
                    message_id,
                    format_lectures_list(category, &lectures),
                    keyboard,
                )
                .await?;
            }
        }
        _ => {
            log::warn!("Unknown menu callback: {}", data);
        }
    }

    Ok(())
}
