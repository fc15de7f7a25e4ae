//! Operator notifications
//!
//! Best-effort messages to the configured operators; a failed delivery is
//! logged and never fails the triggering action.

use teloxide::prelude::*;

use crate::core::AdminIds;
use crate::telegram::handlers::UserInfo;
use crate::telegram::markdown::escape_markdown;

/// Уведомляет операторов о новом зарегистрированном пользователе.
pub async fn notify_admins_new_user(bot: &Bot, admin_ids: &AdminIds, user: &UserInfo) {
    if admin_ids.is_empty() {
        return;
    }

    let username = user
        .username
        .as_deref()
        .map(|u| format!("@{}", u))
        .unwrap_or_else(|| "N/A".to_string());
    let text = format!(
        "👤 *Новый пользователь*\n\nID: {}\nUsername: {}\nИмя: {}",
        user.telegram_id,
        escape_markdown(&username),
        escape_markdown(user.full_name.as_deref().unwrap_or("N/A"))
    );

    for admin_id in admin_ids.iter() {
        if let Err(e) = bot
            .send_message(ChatId(admin_id), text.clone())
            .parse_mode(teloxide::types::ParseMode::MarkdownV2)
            .await
        {
            log::warn!("Failed to notify admin {} about new user: {}", admin_id, e);
        }
    }
}
