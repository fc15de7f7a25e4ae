//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{ensure_user_exists, HandlerDeps, HandlerError, UserInfo};
use crate::storage::db;
use crate::storage::get_connection;
use crate::telegram::admin;
use crate::telegram::bot::Command;
use crate::telegram::menu;

const HELP_TEXT: &str = "Доступные команды:\n\
    /start — начать работу с ботом\n\
    /help — список доступных команд\n\
    /events — ближайшие события";

/// Сколько событий показывает краткая команда /events.
const EVENTS_BRIEF_LIMIT: i64 = 5;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// This function returns a handler tree that can be used with teloxide's
/// Dispatcher. The same schema is used in production and from tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

/// Handler for bot commands (/start, /help, /events, /admin)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);

                match cmd {
                    Command::Start => {
                        let user = UserInfo::from_message(&msg);
                        ensure_user_exists(&deps, &bot, &user);
                        if let Err(e) = menu::show_main_menu(&bot, msg.chat.id).await {
                            log::error!("Failed to show main menu: {}", e);
                        }
                    }
                    Command::Help => {
                        if let Err(e) = bot.send_message(msg.chat.id, HELP_TEXT).await {
                            log::error!("Failed to send help: {}", e);
                        }
                    }
                    Command::Events => {
                        if let Err(e) = handle_events_command(&bot, &msg, &deps).await {
                            log::error!("Failed to handle /events: {}", e);
                        }
                    }
                    Command::Admin => {
                        let user_id = msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0);
                        if let Err(e) = admin::handle_admin_command(&bot, msg.chat.id, user_id, &deps).await {
                            log::error!("Failed to handle /admin: {}", e);
                        }
                    }
                }
                Ok(())
            }
        },
    ))
}

/// Краткий список ближайших событий (команда /events).
async fn handle_events_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> crate::core::AppResult<()> {
    let conn = get_connection(&deps.db_pool)?;
    let events = db::upcoming_events(&conn, EVENTS_BRIEF_LIMIT)?;

    if events.is_empty() {
        bot.send_message(msg.chat.id, "Нет запланированных событий.").await?;
    } else {
        bot.send_message(msg.chat.id, menu::format_events_brief(&events)).await?;
    }
    Ok(())
}

/// Handler for plain text messages: feeds an admin's active flow session
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().map(|text| !text.starts_with('/')).unwrap_or(false))
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                match admin::handle_admin_text(&bot, &msg, &deps).await {
                    Ok(consumed) => {
                        if !consumed {
                            // Вне сценария свободный текст бот не трактует
                            log::debug!("Ignoring free text from chat {}", msg.chat.id);
                        }
                    }
                    Err(e) => {
                        log::error!("Admin flow input failed for chat {}: {}", msg.chat.id, e);
                        let _ = bot
                            .send_message(msg.chat.id, "⚠️ Не получилось обработать ввод, попробуйте еще раз")
                            .await;
                    }
                }
                Ok(())
            }
        })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let is_admin_data = q.data.as_deref().map(admin::is_admin_callback).unwrap_or(false);

            let result = if is_admin_data {
                admin::handle_admin_callback(&bot, &q, &deps).await
            } else {
                menu::handle_menu_callback(&bot, &q, &deps).await
            };

            if let Err(e) = result {
                log::error!("Callback handler failed for data {:?}: {}", q.data, e);
            }
            Ok(())
        }
    })
}
