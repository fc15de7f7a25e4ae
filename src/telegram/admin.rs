//! Admin panel for the Telegram bot
//!
//! This module contains all admin-facing functionality:
//! - The /admin panel and its callback routing
//! - Multi-step flows (add mentor, add/edit event) driven by `flows`
//! - Mentor assignment and delete confirmations
//! - Usage statistics views
//!
//! Every entry point checks the operator allow-list before doing anything;
//! an unauthorized action produces no state transition and no store write.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};

use crate::core::{AppResult, ProjectStatus};
use crate::flows::{AdvanceOutcome, EventField, FlowKind, Session};
use crate::storage::db::{self, EventWithMentor};
use crate::storage::get_connection;
use crate::storage::stats::{self, ActivityWindow, DailyStats, Statistics};
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::markdown::{escape_markdown, truncate_string_safe};

const NO_RIGHTS_MESSAGE: &str = "❌ У вас нет прав администратора";

/// Сколько мероприятий показывают списки выбора.
const PICKER_LIMIT: i64 = 10;

fn admin_panel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("➕ Добавить ментора", "admin_add_mentor")],
        vec![InlineKeyboardButton::callback("➖ Удалить ментора", "admin_remove_mentor")],
        vec![InlineKeyboardButton::callback("📅 Добавить мероприятие", "admin_add_event")],
        vec![InlineKeyboardButton::callback("✏️ Редактировать мероприятие", "admin_edit_event")],
        vec![InlineKeyboardButton::callback("🗑 Удалить мероприятие", "admin_delete_event")],
        vec![InlineKeyboardButton::callback("📊 Статистика", "admin_stats")],
    ])
}

fn cancel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("❌ Отмена", "admin_cancel")]])
}

/// Handle /admin command - show the admin panel (operators only)
pub async fn handle_admin_command(bot: &Bot, chat_id: ChatId, user_id: i64, deps: &HandlerDeps) -> AppResult<()> {
    if !deps.admin_ids.is_authorized(user_id) {
        bot.send_message(chat_id, NO_RIGHTS_MESSAGE).await?;
        return Ok(());
    }

    bot.send_message(chat_id, "🔧 *Панель администратора*")
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(admin_panel_keyboard())
        .await?;
    Ok(())
}

/// Returns true for callback data owned by the admin router.
pub fn is_admin_callback(data: &str) -> bool {
    data.starts_with("admin_")
        || data.starts_with("show_edit_options_")
        || data.starts_with("edit_")
        || data.starts_with("assign_mentor_")
        || data.starts_with("newevent_mentor_")
        || data.starts_with("delete_event_")
        || data.starts_with("confirm_delete_")
        || data.starts_with("remove_mentor_")
        || data.starts_with("confirm_remove_mentor_")
        || data == "detailed_stats"
        || data == "daily_stats"
}

/// Intercepts text messages from an admin with an active flow session.
///
/// Returns `Ok(true)` when the message was consumed by a flow, `Ok(false)`
/// when there is nothing to advance and normal handling should continue.
pub async fn handle_admin_text(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<bool> {
    let user_id = match msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()) {
        Some(id) => id,
        None => return Ok(false),
    };
    if !deps.admin_ids.is_authorized(user_id) {
        return Ok(false);
    }
    let Some(text) = msg.text() else {
        return Ok(false);
    };

    let outcome = match deps.sessions.advance(user_id, text).await {
        Some(outcome) => outcome,
        None => return Ok(false),
    };

    match outcome {
        AdvanceOutcome::Next { prompt } => {
            bot.send_message(msg.chat.id, prompt)
                .reply_markup(cancel_keyboard())
                .await?;
        }
        AdvanceOutcome::Invalid { error } => {
            // Шаг не продвинулся, собранные поля не потеряны
            bot.send_message(msg.chat.id, error).reply_markup(cancel_keyboard()).await?;
        }
        AdvanceOutcome::Complete(session) => {
            commit_session(bot, msg.chat.id, user_id, session, deps).await?;
        }
    }

    Ok(true)
}

/// Коммит завершенной сессии: вставка или точечное обновление.
async fn commit_session(bot: &Bot, chat_id: ChatId, user_id: i64, session: Session, deps: &HandlerDeps) -> AppResult<()> {
    match session.flow().clone() {
        FlowKind::AddMentor => {
            let conn = get_connection(&deps.db_pool)?;
            let name = session.field_text("name").unwrap_or_default().to_string();
            db::insert_mentor(
                &conn,
                &name,
                session.field_text("specialization").unwrap_or_default(),
                session.field_text("bio").unwrap_or_default(),
                session.field_text("contact").unwrap_or_default(),
            )?;
            log::info!("Admin {} created mentor {:?}", user_id, name);
            bot.send_message(chat_id, format!("✅ Ментор *{}* успешно добавлен\\!", escape_markdown(&name)))
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        FlowKind::AddEvent => {
            // Текстовые шаги собраны, остался выбор ментора кнопкой
            let conn = get_connection(&deps.db_pool)?;
            let mentors = db::active_mentors(&conn)?;

            let mut rows = vec![vec![InlineKeyboardButton::callback("🚫 Без ментора", "newevent_mentor_none")]];
            for mentor in &mentors {
                rows.push(vec![InlineKeyboardButton::callback(
                    format!("👨‍🏫 {}", mentor.name),
                    format!("newevent_mentor_{}", mentor.id),
                )]);
            }
            rows.push(vec![InlineKeyboardButton::callback("❌ Отмена", "admin_cancel")]);

            deps.sessions.begin(user_id, session.into_mentor_pick()).await;

            bot.send_message(chat_id, "👨‍🏫 Выберите ментора мероприятия:")
                .reply_markup(InlineKeyboardMarkup::new(rows))
                .await?;
        }
        FlowKind::EditEventField { event_id, field } => {
            commit_event_field(bot, chat_id, event_id, field, &session, deps).await?;
        }
        FlowKind::AddEventMentorPick => {
            // Текстом эта стадия не завершается, advance() не пропустит
            log::warn!("Unexpected text completion of mentor pick for user {}", user_id);
        }
    }
    Ok(())
}

async fn commit_event_field(
    bot: &Bot,
    chat_id: ChatId,
    event_id: i64,
    field: EventField,
    session: &Session,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;

    let (found, confirmation) = match field {
        EventField::Title => {
            let title = session.field_text("title").unwrap_or_default();
            (
                db::update_event_title(&conn, event_id, title)?,
                format!("✅ Название изменено на: *{}*", escape_markdown(title)),
            )
        }
        EventField::Description => {
            let description = session.field_text("description").unwrap_or_default();
            (
                db::update_event_description(&conn, event_id, description)?,
                "✅ Описание успешно изменено\\!".to_string(),
            )
        }
        EventField::DateTime => match session.field_date_time("date_time") {
            Some(date_time) => (
                db::update_event_date_time(&conn, event_id, date_time)?,
                format!(
                    "✅ Дата изменена на: *{}*",
                    escape_markdown(&date_time.format("%d.%m.%Y %H:%M").to_string())
                ),
            ),
            None => (false, String::new()),
        },
        EventField::Location => {
            let location = session.field_text("location").unwrap_or_default();
            (
                db::update_event_location(&conn, event_id, location)?,
                format!("✅ Место изменено на: *{}*", escape_markdown(location)),
            )
        }
    };

    if found {
        bot.send_message(chat_id, confirmation)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
    } else {
        // Мероприятие исчезло между выбором и коммитом; сессия уже сброшена
        bot.send_message(chat_id, "❌ Мероприятие не найдено").await?;
    }
    Ok(())
}

/// Обрабатывает callback-кнопки админской панели.
pub async fn handle_admin_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> AppResult<()> {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let (Some(chat_id), Some(message_id)) = (
        q.message.as_ref().map(|m| m.chat().id),
        q.message.as_ref().map(|m| m.id()),
    ) else {
        return Ok(());
    };
    let user_id = match i64::try_from(q.from.id.0) {
        Ok(id) => id,
        Err(_) => return Ok(()),
    };

    if !deps.admin_ids.is_authorized(user_id) {
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(NO_RIGHTS_MESSAGE)
            .show_alert(true)
            .await;
        return Ok(());
    }
    let _ = bot.answer_callback_query(q.id.clone()).await;

    match data {
        "admin_back" => {
            edit_markdown(bot, chat_id, message_id, "🔧 *Панель администратора*".to_string(), admin_panel_keyboard())
                .await?;
        }
        "admin_cancel" => {
            deps.sessions.cancel(user_id).await;
            edit_markdown(
                bot,
                chat_id,
                message_id,
                "❌ Действие отменено\\.\n\n🔧 *Панель администратора*".to_string(),
                admin_panel_keyboard(),
            )
            .await?;
        }
        "admin_add_mentor" => {
            let prompt = deps.sessions.begin(user_id, Session::new(FlowKind::AddMentor)).await;
            if let Some(prompt) = prompt {
                bot.edit_message_text(chat_id, message_id, prompt)
                    .reply_markup(cancel_keyboard())
                    .await?;
            }
        }
        "admin_add_event" => {
            let prompt = deps.sessions.begin(user_id, Session::new(FlowKind::AddEvent)).await;
            if let Some(prompt) = prompt {
                bot.edit_message_text(chat_id, message_id, prompt)
                    .reply_markup(cancel_keyboard())
                    .await?;
            }
        }
        "admin_edit_event" => {
            show_event_picker(
                bot,
                chat_id,
                message_id,
                deps,
                "✏️ *Выберите мероприятие для редактирования:*",
                "📅 Нет активных мероприятий для редактирования",
                "show_edit_options_",
            )
            .await?;
        }
        "admin_delete_event" => {
            show_event_picker(
                bot,
                chat_id,
                message_id,
                deps,
                "🗑 *Выберите мероприятие для удаления:*",
                "📅 Нет активных мероприятий для удаления",
                "delete_event_",
            )
            .await?;
        }
        "admin_remove_mentor" => {
            show_mentor_picker(bot, chat_id, message_id, deps).await?;
        }
        "admin_stats" => {
            let conn = get_connection(&deps.db_pool)?;
            let statistics = stats::collect_statistics(&conn)?;
            let keyboard = InlineKeyboardMarkup::new(vec![
                vec![InlineKeyboardButton::callback("📈 Детальная статистика", "detailed_stats")],
                vec![InlineKeyboardButton::callback("📊 Статистика по дням", "daily_stats")],
                vec![InlineKeyboardButton::callback("◀️ Назад", "admin_back")],
            ]);
            edit_markdown(bot, chat_id, message_id, format_statistics(&statistics), keyboard).await?;
        }
        "detailed_stats" => {
            let conn = get_connection(&deps.db_pool)?;
            let window = stats::collect_activity_window(&conn)?;
            let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                "◀️ К общей статистике",
                "admin_stats",
            )]]);
            edit_markdown(bot, chat_id, message_id, format_activity_window(&window), keyboard).await?;
        }
        "daily_stats" => {
            let conn = get_connection(&deps.db_pool)?;
            let daily = stats::collect_daily_stats(&conn)?;
            let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                "◀️ К общей статистике",
                "admin_stats",
            )]]);
            edit_markdown(bot, chat_id, message_id, format_daily_stats(&daily), keyboard).await?;
        }
        _ if data.starts_with("show_edit_options_") => {
            let event_id = parse_trailing_id(data);
            show_edit_options(bot, chat_id, message_id, event_id, deps).await?;
        }
        _ if data.starts_with("edit_mentor_") => {
            let event_id = parse_trailing_id(data);
            show_mentor_assignment(bot, chat_id, message_id, event_id, deps).await?;
        }
        _ if data.starts_with("assign_mentor_") => {
            assign_mentor(bot, chat_id, message_id, data, deps).await?;
        }
        _ if data.starts_with("newevent_mentor_") => {
            commit_new_event(bot, chat_id, message_id, user_id, data, q, deps).await?;
        }
        _ if data.starts_with("edit_") => {
            begin_field_edit(bot, chat_id, message_id, user_id, data, deps).await?;
        }
        _ if data.starts_with("confirm_delete_") => {
            confirm_delete_event(bot, chat_id, message_id, parse_trailing_id(data), deps).await?;
        }
        _ if data.starts_with("delete_event_") => {
            show_delete_event_confirmation(bot, chat_id, message_id, parse_trailing_id(data), deps).await?;
        }
        _ if data.starts_with("confirm_remove_mentor_") => {
            confirm_remove_mentor(bot, chat_id, message_id, parse_trailing_id(data), deps).await?;
        }
        _ if data.starts_with("remove_mentor_") => {
            show_remove_mentor_confirmation(bot, chat_id, message_id, parse_trailing_id(data), deps).await?;
        }
        _ => {
            log::warn!("Unknown admin callback: {}", data);
        }
    }

    Ok(())
}

fn parse_trailing_id(data: &str) -> i64 {
    data.rsplit('_').next().and_then(|raw| raw.parse().ok()).unwrap_or(0)
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

fn event_picker_label(item: &EventWithMentor) -> String {
    let label = format!(
        "{} ({})",
        item.event.title,
        item.event.date_time.format("%d.%m %H:%M")
    );
    truncate_string_safe(&label, 50)
}

async fn show_event_picker(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    deps: &HandlerDeps,
    title: &str,
    empty_message: &str,
    callback_prefix: &str,
) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let events = db::active_events_by_date(&conn, PICKER_LIMIT)?;

    if events.is_empty() {
        bot.edit_message_text(chat_id, message_id, empty_message).await?;
        return Ok(());
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = events
        .iter()
        .map(|item| {
            vec![InlineKeyboardButton::callback(
                event_picker_label(item),
                format!("{}{}", callback_prefix, item.event.id),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("◀️ Назад", "admin_back")]);

    edit_markdown(bot, chat_id, message_id, title.to_string(), InlineKeyboardMarkup::new(rows)).await
}

async fn show_edit_options(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    event_id: i64,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let Some(item) = db::get_event(&conn, event_id)? else {
        bot.edit_message_text(chat_id, message_id, "❌ Мероприятие не найдено").await?;
        return Ok(());
    };

    let event = &item.event;
    let mut text = format!("📅 *Мероприятие:* {}\n", escape_markdown(&event.title));
    text.push_str(&format!(
        "📝 *Описание:* {}\n",
        escape_markdown(event.description.as_deref().unwrap_or("Не указано"))
    ));
    text.push_str(&format!(
        "⏰ *Дата:* {}\n",
        escape_markdown(&event.date_time.format("%d.%m.%Y %H:%M").to_string())
    ));
    text.push_str(&format!(
        "📍 *Место:* {}\n",
        escape_markdown(event.location.as_deref().unwrap_or("Не указано"))
    ));
    text.push_str(&format!(
        "👨‍🏫 *Ментор:* {}\n\n",
        escape_markdown(item.mentor_name.as_deref().unwrap_or("Не назначен"))
    ));
    text.push_str("Что хотите изменить?");

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("📝 Название", format!("edit_title_{event_id}"))],
        vec![InlineKeyboardButton::callback("📄 Описание", format!("edit_desc_{event_id}"))],
        vec![InlineKeyboardButton::callback("⏰ Дата и время", format!("edit_datetime_{event_id}"))],
        vec![InlineKeyboardButton::callback("📍 Место", format!("edit_location_{event_id}"))],
        vec![InlineKeyboardButton::callback("👨‍🏫 Назначить ментора", format!("edit_mentor_{event_id}"))],
        vec![InlineKeyboardButton::callback("◀️ К списку мероприятий", "admin_edit_event")],
    ]);

    edit_markdown(bot, chat_id, message_id, text, keyboard).await
}

/// Начинает одношаговую сессию редактирования текстового поля.
async fn begin_field_edit(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    user_id: i64,
    data: &str,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let Some(rest) = data.strip_prefix("edit_") else {
        return Ok(());
    };
    let Some((code, raw_id)) = rest.rsplit_once('_') else {
        return Ok(());
    };
    let (Some(field), Ok(event_id)) = (EventField::from_code(code), raw_id.parse::<i64>()) else {
        log::warn!("Malformed edit callback: {}", data);
        return Ok(());
    };

    // Не начинаем сессию над уже удаленным мероприятием
    let conn = get_connection(&deps.db_pool)?;
    if db::get_event(&conn, event_id)?.is_none() {
        bot.edit_message_text(chat_id, message_id, "❌ Мероприятие не найдено").await?;
        return Ok(());
    }
    drop(conn);

    let prompt = deps
        .sessions
        .begin(user_id, Session::new(FlowKind::EditEventField { event_id, field }))
        .await;
    if let Some(prompt) = prompt {
        bot.edit_message_text(chat_id, message_id, prompt)
            .reply_markup(cancel_keyboard())
            .await?;
    }
    Ok(())
}

/// AssignMentor: показывает активных менторов с отметкой текущего выбора.
async fn show_mentor_assignment(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    event_id: i64,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let Some(item) = db::get_event(&conn, event_id)? else {
        bot.edit_message_text(chat_id, message_id, "❌ Мероприятие не найдено").await?;
        return Ok(());
    };
    let mentors = db::active_mentors(&conn)?;

    if mentors.is_empty() {
        bot.edit_message_text(chat_id, message_id, "❌ Нет доступных менторов").await?;
        return Ok(());
    }

    let current_mentor_id = item.event.mentor_id;
    let mut rows = Vec::new();

    let no_mentor_emoji = if current_mentor_id.is_none() { "✅" } else { "🚫" };
    rows.push(vec![InlineKeyboardButton::callback(
        format!("{} Без ментора", no_mentor_emoji),
        format!("assign_mentor_none_{event_id}"),
    )]);

    for mentor in &mentors {
        let emoji = if Some(mentor.id) == current_mentor_id { "✅" } else { "👨‍🏫" };
        rows.push(vec![InlineKeyboardButton::callback(
            format!("{} {}", emoji, mentor.name),
            format!("assign_mentor_{}_{}", mentor.id, event_id),
        )]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "◀️ Назад",
        format!("show_edit_options_{event_id}"),
    )]);

    let text = format!(
        "👨‍🏫 *Назначение ментора мероприятию*\n\nТекущий ментор: *{}*\n\nВыберите нового ментора:",
        escape_markdown(item.mentor_name.as_deref().unwrap_or("Не назначен"))
    );

    edit_markdown(bot, chat_id, message_id, text, InlineKeyboardMarkup::new(rows)).await
}

/// Коммит выбора ментора: одно нажатие, одна запись, сценарий завершен.
async fn assign_mentor(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    data: &str,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let Some(rest) = data.strip_prefix("assign_mentor_") else {
        return Ok(());
    };
    let (mentor_id, event_id) = match rest.strip_prefix("none_") {
        Some(raw_event) => (None, raw_event.parse::<i64>().ok()),
        None => match rest.split_once('_') {
            Some((raw_mentor, raw_event)) => (raw_mentor.parse::<i64>().ok(), raw_event.parse::<i64>().ok()),
            None => (None, None),
        },
    };
    let Some(event_id) = event_id else {
        log::warn!("Malformed assign callback: {}", data);
        return Ok(());
    };

    let conn = get_connection(&deps.db_pool)?;
    if !db::update_event_mentor(&conn, event_id, mentor_id)? {
        bot.edit_message_text(chat_id, message_id, "❌ Мероприятие не найдено").await?;
        return Ok(());
    }

    let mentor_name = match mentor_id {
        Some(id) => db::get_mentor(&conn, id)?.map(|m| m.name).unwrap_or_else(|| "не назначен".to_string()),
        None => "не назначен".to_string(),
    };

    edit_markdown(
        bot,
        chat_id,
        message_id,
        format!(
            "✅ Ментор мероприятия успешно обновлен\\!\n\nНазначенный ментор: *{}*",
            escape_markdown(&mentor_name)
        ),
        InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("◀️ Назад", "admin_back")]]),
    )
    .await
}

/// Финальный шаг AddEvent: выбор ментора получен, создаем мероприятие.
async fn commit_new_event(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    user_id: i64,
    data: &str,
    q: &CallbackQuery,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let Some(session) = deps.sessions.take(user_id).await else {
        bot.edit_message_text(chat_id, message_id, "❌ Нет активного сценария создания мероприятия")
            .await?;
        return Ok(());
    };
    if *session.flow() != FlowKind::AddEventMentorPick {
        // Кнопка от устаревшего сообщения; вернем сессию на место
        deps.sessions.begin(user_id, session).await;
        return Ok(());
    }

    let mentor_id = match data.trim_start_matches("newevent_mentor_") {
        "none" => None,
        raw => raw.parse::<i64>().ok(),
    };

    let title = session.field_text("title").unwrap_or_default().to_string();
    let description = session.field_text("description").unwrap_or_default().to_string();
    let location = session.field_text("location").unwrap_or_default().to_string();
    let Some(date_time) = session.field_date_time("date_time") else {
        bot.edit_message_text(chat_id, message_id, "❌ Сценарий поврежден, начните заново").await?;
        return Ok(());
    };

    let conn = get_connection(&deps.db_pool)?;
    // Создатель мероприятия: регистрируем админа, если он не нажимал /start
    let creator = match db::get_user(&conn, user_id)? {
        Some(user) => user.id,
        None => {
            let full_name = q.from.full_name();
            db::create_user(&conn, user_id, q.from.username.as_deref(), Some(full_name.as_str()))?
        }
    };

    let event_id = db::insert_event(&conn, &title, &description, date_time, &location, mentor_id, creator)?;
    log::info!("Admin {} created event {} ({:?})", user_id, event_id, title);

    let mentor_name = match mentor_id {
        Some(id) => db::get_mentor(&conn, id)?.map(|m| m.name).unwrap_or_else(|| "не назначен".to_string()),
        None => "не назначен".to_string(),
    };

    edit_markdown(
        bot,
        chat_id,
        message_id,
        format!(
            "✅ Мероприятие *{}* успешно создано\\!\n\n⏰ {}\n👨‍🏫 Ментор: {}",
            escape_markdown(&title),
            escape_markdown(&date_time.format("%d.%m.%Y %H:%M").to_string()),
            escape_markdown(&mentor_name)
        ),
        InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("◀️ Назад", "admin_back")]]),
    )
    .await
}

async fn show_delete_event_confirmation(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    event_id: i64,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let Some(item) = db::get_event(&conn, event_id)? else {
        bot.edit_message_text(chat_id, message_id, "❌ Мероприятие не найдено").await?;
        return Ok(());
    };

    let event = &item.event;
    let mut text = "🗑 *Подтвердите удаление мероприятия:*\n\n".to_string();
    text.push_str(&format!("📅 *Название:* {}\n", escape_markdown(&event.title)));
    text.push_str(&format!(
        "⏰ *Дата:* {}\n",
        escape_markdown(&event.date_time.format("%d.%m.%Y %H:%M").to_string())
    ));
    text.push_str(&format!(
        "📍 *Место:* {}\n\n",
        escape_markdown(event.location.as_deref().unwrap_or("Не указано"))
    ));
    text.push_str("⚠️ Мероприятие исчезнет из всех списков\\.");

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("✅ Да, удалить", format!("confirm_delete_{event_id}"))],
        vec![InlineKeyboardButton::callback("❌ Отмена", "admin_delete_event")],
    ]);

    edit_markdown(bot, chat_id, message_id, text, keyboard).await
}

async fn confirm_delete_event(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    event_id: i64,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let title = db::get_event(&conn, event_id)?.map(|item| item.event.title);

    match title {
        Some(title) if db::soft_delete_event(&conn, event_id)? => {
            log::info!("Event {} soft-deleted", event_id);
            edit_markdown(
                bot,
                chat_id,
                message_id,
                format!("✅ Мероприятие *{}* успешно удалено\\!", escape_markdown(&title)),
                InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("◀️ Назад", "admin_back")]]),
            )
            .await?;
        }
        _ => {
            bot.edit_message_text(chat_id, message_id, "❌ Мероприятие не найдено").await?;
        }
    }
    Ok(())
}

async fn show_mentor_picker(bot: &Bot, chat_id: ChatId, message_id: MessageId, deps: &HandlerDeps) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let mentors = db::active_mentors(&conn)?;

    if mentors.is_empty() {
        bot.edit_message_text(chat_id, message_id, "👨‍🏫 Нет активных менторов для удаления")
            .await?;
        return Ok(());
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = mentors
        .iter()
        .map(|mentor| {
            let label = match mentor.specialization.as_deref() {
                Some(spec) => format!("{} ({})", mentor.name, spec),
                None => mentor.name.clone(),
            };
            vec![InlineKeyboardButton::callback(label, format!("remove_mentor_{}", mentor.id))]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback("◀️ Назад", "admin_back")]);

    edit_markdown(
        bot,
        chat_id,
        message_id,
        "👨‍🏫 *Выберите ментора для удаления:*".to_string(),
        InlineKeyboardMarkup::new(rows),
    )
    .await
}

async fn show_remove_mentor_confirmation(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    mentor_id: i64,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let mentor = db::get_mentor(&conn, mentor_id)?.filter(|m| m.is_active);
    let Some(mentor) = mentor else {
        bot.edit_message_text(chat_id, message_id, "❌ Ментор не найден").await?;
        return Ok(());
    };

    let mut text = "🗑 *Подтвердите удаление ментора:*\n\n".to_string();
    text.push_str(&format!("👨‍🏫 *Имя:* {}\n", escape_markdown(&mentor.name)));
    text.push_str(&format!(
        "💼 *Специализация:* {}\n\n",
        escape_markdown(mentor.specialization.as_deref().unwrap_or("Не указана"))
    ));
    text.push_str("⚠️ Ментор исчезнет из списков, но останется в прошедших мероприятиях\\.");

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("✅ Да, удалить", format!("confirm_remove_mentor_{mentor_id}"))],
        vec![InlineKeyboardButton::callback("❌ Отмена", "admin_remove_mentor")],
    ]);

    edit_markdown(bot, chat_id, message_id, text, keyboard).await
}

async fn confirm_remove_mentor(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    mentor_id: i64,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let name = db::get_mentor(&conn, mentor_id)?.map(|m| m.name);

    match name {
        Some(name) if db::soft_delete_mentor(&conn, mentor_id)? => {
            log::info!("Mentor {} soft-deleted", mentor_id);
            edit_markdown(
                bot,
                chat_id,
                message_id,
                format!("✅ Ментор *{}* успешно удален\\!", escape_markdown(&name)),
                InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("◀️ Назад", "admin_back")]]),
            )
            .await?;
        }
        _ => {
            bot.edit_message_text(chat_id, message_id, "❌ Ментор не найден").await?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Statistics rendering
// ---------------------------------------------------------------------------

/// Собирает текст общей статистики.
pub fn format_statistics(statistics: &Statistics) -> String {
    let mut text = "📊 *Статистика IT Jama'at*\n\n".to_string();

    text.push_str("👥 *Пользователи:*\n");
    text.push_str(&format!("• Всего пользователей: {}\n", statistics.total_users));
    text.push_str(&format!("• Активных менторов: {}\n\n", statistics.active_mentors));

    text.push_str("📅 *Мероприятия:*\n");
    text.push_str(&format!("• Всего активных: {}\n", statistics.active_events));
    text.push_str(&format!("• Предстоящих: {}\n", statistics.future_events));
    text.push_str(&format!("• Прошедших: {}\n\n", statistics.past_events));

    text.push_str("📚 *Лекции:*\n");
    text.push_str(&format!("• Всего лекций: {}\n", statistics.total_lectures));
    for (category, count) in &statistics.lectures_by_category {
        if *count > 0 {
            text.push_str(&format!("• {}: {}\n", escape_markdown(category.db_value()), count));
        }
    }

    text.push_str("\n💼 *Работа:*\n");
    text.push_str(&format!("• Активных вакансий: {}\n\n", statistics.active_vacancies));

    text.push_str("🚀 *Проекты:*\n");
    text.push_str(&format!("• Всего активных: {}\n", statistics.active_projects));
    for (status, count) in &statistics.projects_by_status {
        if *count > 0 {
            let label = match status {
                ProjectStatus::Discussion => "На обсуждении",
                ProjectStatus::Development => "В разработке",
                ProjectStatus::Completed => "Завершенных",
            };
            text.push_str(&format!("• {}: {}\n", label, count));
        }
    }

    text
}

/// Собирает текст детальной статистики за 30 дней.
pub fn format_activity_window(window: &ActivityWindow) -> String {
    let mut text = "📈 *Детальная статистика \\(последние 30 дней\\)*\n\n".to_string();

    text.push_str("📊 *Активность:*\n");
    text.push_str(&format!("• Новых пользователей: {}\n", window.new_users));
    text.push_str(&format!("• Новых мероприятий: {}\n", window.new_events));
    text.push_str(&format!("• Новых лекций: {}\n", window.new_lectures));
    text.push_str(&format!("• Новых вакансий: {}\n", window.new_vacancies));
    text.push_str(&format!("• Новых проектов: {}\n", window.new_projects));

    if !window.top_mentors.is_empty() {
        text.push_str("\n🏆 *Топ менторов по мероприятиям:*\n");
        for (idx, (name, count)) in window.top_mentors.iter().enumerate() {
            text.push_str(&format!(
                "{}\\. {}: {} мероприятий\n",
                idx + 1,
                escape_markdown(name),
                count
            ));
        }
    }

    text
}

/// Собирает текст статистики по дням.
pub fn format_daily_stats(daily: &DailyStats) -> String {
    let mut text = "📊 *Статистика по дням*\n\n".to_string();

    text.push_str("📅 *Сегодня:*\n");
    text.push_str(&format!("• Новых пользователей: {}\n", daily.today_users));
    text.push_str(&format!("• Мероприятий: {}\n", daily.today_events));
    text.push_str(&format!("• Новых лекций: {}\n", daily.today_lectures));
    text.push_str(&format!("• Новых вакансий: {}\n", daily.today_vacancies));
    text.push_str(&format!("• Новых проектов: {}\n\n", daily.today_projects));

    text.push_str("📅 *Вчера:*\n");
    text.push_str(&format!("• Новых пользователей: {}\n\n", daily.yesterday_users));

    text.push_str("📅 *За неделю:*\n");
    text.push_str(&format!("• Новых пользователей: {}\n", daily.week_users));
    text.push_str(&format!("• Мероприятий: {}\n", daily.week_events));

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LectureCategory;
    use crate::storage::db::Event;
    use chrono::NaiveDate;

    #[test]
    fn test_is_admin_callback() {
        for data in [
            "admin_stats",
            "admin_add_mentor",
            "show_edit_options_3",
            "edit_title_3",
            "assign_mentor_none_3",
            "newevent_mentor_7",
            "confirm_delete_2",
            "daily_stats",
        ] {
            assert!(is_admin_callback(data), "{} should be admin", data);
        }
        for data in ["events", "mentors", "lectures_all", "back_to_main"] {
            assert!(!is_admin_callback(data), "{} should not be admin", data);
        }
    }

    #[test]
    fn test_parse_trailing_id() {
        assert_eq!(parse_trailing_id("confirm_delete_42"), 42);
        assert_eq!(parse_trailing_id("show_edit_options_7"), 7);
        assert_eq!(parse_trailing_id("garbage"), 0);
    }

    #[test]
    fn test_event_picker_label_truncates() {
        let item = EventWithMentor {
            event: Event {
                id: 1,
                title: "Очень длинное название мероприятия которое не влезает в кнопку".to_string(),
                description: None,
                date_time: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap().and_hms_opt(18, 30, 0).unwrap(),
                location: None,
                mentor_id: None,
                is_active: true,
                created_by: None,
            },
            mentor_name: None,
        };
        let label = event_picker_label(&item);
        assert!(label.chars().count() <= 50);
        assert!(label.ends_with("..."));
    }

    #[test]
    fn test_format_statistics_sections() {
        let statistics = Statistics {
            total_users: 12,
            active_mentors: 3,
            active_events: 5,
            future_events: 2,
            past_events: 3,
            total_lectures: 4,
            lectures_by_category: vec![(LectureCategory::Programming, 4)],
            active_vacancies: 1,
            active_projects: 2,
            projects_by_status: vec![
                (ProjectStatus::Discussion, 1),
                (ProjectStatus::Development, 1),
                (ProjectStatus::Completed, 0),
            ],
        };
        let text = format_statistics(&statistics);
        assert!(text.contains("• Всего пользователей: 12"));
        assert!(text.contains("• Предстоящих: 2"));
        assert!(text.contains("• Прошедших: 3"));
        assert!(text.contains("Программирование: 4"));
        assert!(text.contains("• На обсуждении: 1"));
        // Нулевые корзины не показываются
        assert!(!text.contains("Завершенных"));
    }

    #[test]
    fn test_format_activity_window_ranks_mentors() {
        let window = ActivityWindow {
            new_users: 1,
            new_events: 2,
            new_lectures: 0,
            new_vacancies: 0,
            new_projects: 0,
            top_mentors: vec![("Aisha".to_string(), 3), ("Umar".to_string(), 1)],
        };
        let text = format_activity_window(&window);
        assert!(text.contains("1\\. Aisha: 3"));
        assert!(text.contains("2\\. Umar: 1"));
    }

    #[test]
    fn test_format_daily_stats() {
        let daily = DailyStats {
            today_users: 2,
            week_events: 4,
            ..Default::default()
        };
        let text = format_daily_stats(&daily);
        assert!(text.contains("*Сегодня:*"));
        assert!(text.contains("• Новых пользователей: 2"));
        assert!(text.contains("• Мероприятий: 4"));
    }
}
