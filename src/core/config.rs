use once_cell::sync::Lazy;
use std::env;

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: jamaat.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "jamaat.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: bot.log
pub static LOG_FILE_PATH: Lazy<String> = Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "bot.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

fn parse_admin_ids(raw: &str) -> Vec<i64> {
    raw.split([',', ' ', '\n', '\t'])
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

/// The static operator allow-list, loaded once at startup and carried
/// explicitly in `HandlerDeps`; authorization is never consulted through
/// ambient global state.
#[derive(Debug, Clone, Default)]
pub struct AdminIds(Vec<i64>);

impl AdminIds {
    /// Builds the allow-list from the ADMIN_IDS environment variable
    /// (comma- or whitespace-separated numeric Telegram ids).
    pub fn from_env() -> Self {
        let ids = env::var("ADMIN_IDS").ok().map(|raw| parse_admin_ids(&raw)).unwrap_or_default();
        if ids.is_empty() {
            log::warn!("ADMIN_IDS is empty, the admin panel will be unreachable");
        }
        Self(ids)
    }

    /// Builds an allow-list from explicit ids (used by tests).
    pub fn from_ids(ids: Vec<i64>) -> Self {
        Self(ids)
    }

    /// Проверяет, входит ли пользователь в список операторов.
    /// Без состояния и побочных эффектов.
    pub fn is_authorized(&self, user_id: i64) -> bool {
        self.0.contains(&user_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the configured operator ids (for notifications).
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_ids_commas() {
        assert_eq!(parse_admin_ids("123456789,987654321"), vec![123456789, 987654321]);
    }

    #[test]
    fn test_parse_admin_ids_mixed_separators() {
        assert_eq!(parse_admin_ids("1, 2\n3\t4"), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_admin_ids_skips_garbage() {
        assert_eq!(parse_admin_ids("12,abc,,34"), vec![12, 34]);
    }

    #[test]
    fn test_is_authorized() {
        let ids = AdminIds::from_ids(vec![10, 20]);
        assert!(ids.is_authorized(10));
        assert!(ids.is_authorized(20));
        assert!(!ids.is_authorized(30));
    }

    #[test]
    fn test_empty_allow_list_rejects_everyone() {
        let ids = AdminIds::from_ids(vec![]);
        assert!(!ids.is_authorized(0));
        assert!(!ids.is_authorized(1));
    }
}
