//! Handler types, dependencies, and user management helpers

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::Message;

use crate::core::AdminIds;
use crate::flows::SessionStore;
use crate::storage::db::{self, create_user, get_user};
use crate::storage::get_connection;
use crate::telegram::notifications::notify_admins_new_user;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
///
/// Everything a handler needs travels here explicitly: the connection
/// pool, the operator allow-list and the conversation session store.
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<db::DbPool>,
    pub admin_ids: Arc<AdminIds>,
    pub sessions: Arc<SessionStore>,
}

impl HandlerDeps {
    pub fn new(db_pool: Arc<db::DbPool>, admin_ids: Arc<AdminIds>, sessions: Arc<SessionStore>) -> Self {
        Self {
            db_pool,
            admin_ids,
            sessions,
        }
    }
}

/// User info extracted from a Telegram message
#[derive(Clone)]
pub struct UserInfo {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

impl UserInfo {
    pub fn from_message(msg: &Message) -> Self {
        Self {
            telegram_id: msg.chat.id.0,
            username: msg.from.as_ref().and_then(|u| u.username.clone()),
            full_name: msg.from.as_ref().map(|u| u.full_name()),
        }
    }
}

/// Result of ensure_user_exists operation
pub enum UserCreationResult {
    /// User already existed
    Existed,
    /// User was newly created
    Created,
    /// Failed to get DB connection or to write
    DbError,
}

/// Ensures a user exists in the database, creating them if needed.
///
/// Registration is an upsert-by-lookup: a repeated /start from the same
/// telegram id is a no-op, never a duplicate insert. Newly registered
/// users trigger an operator notification in the background.
pub fn ensure_user_exists(deps: &HandlerDeps, bot: &Bot, user: &UserInfo) -> UserCreationResult {
    let conn = match get_connection(&deps.db_pool) {
        Ok(c) => c,
        Err(_) => return UserCreationResult::DbError,
    };

    match get_user(&conn, user.telegram_id) {
        Ok(Some(_)) => UserCreationResult::Existed,
        Ok(None) => {
            let created = create_user(&conn, user.telegram_id, user.username.as_deref(), user.full_name.as_deref());
            match created {
                Ok(_) => {
                    let bot_clone = bot.clone();
                    let admin_ids = Arc::clone(&deps.admin_ids);
                    let user = user.clone();
                    tokio::spawn(async move {
                        notify_admins_new_user(&bot_clone, &admin_ids, &user).await;
                    });
                    UserCreationResult::Created
                }
                Err(e) => {
                    log::error!("Failed to create user {}: {}", user.telegram_id, e);
                    UserCreationResult::DbError
                }
            }
        }
        Err(e) => {
            log::error!("Failed to get user {}: {}", user.telegram_id, e);
            UserCreationResult::DbError
        }
    }
}
