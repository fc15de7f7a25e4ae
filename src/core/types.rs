use std::fmt;
use std::str::FromStr;

/// Закрытый словарь категорий лекций. В базе категория хранится как
/// отображаемое название (так её вводили исторически), всё не входящее
/// в словарь попадает в `Uncategorized` только при отображении.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LectureCategory {
    Programming,
    Security,
    DataScience,
    Web,
    Mobile,
}

impl LectureCategory {
    /// The five fixed menu categories, in menu order.
    pub const ALL: [LectureCategory; 5] = [
        LectureCategory::Programming,
        LectureCategory::Security,
        LectureCategory::DataScience,
        LectureCategory::Web,
        LectureCategory::Mobile,
    ];

    /// Short code used in callback data ("lectures_<code>").
    pub fn code(&self) -> &'static str {
        match self {
            LectureCategory::Programming => "programming",
            LectureCategory::Security => "security",
            LectureCategory::DataScience => "data",
            LectureCategory::Web => "web",
            LectureCategory::Mobile => "mobile",
        }
    }

    /// Значение, хранящееся в колонке lectures.category.
    pub fn db_value(&self) -> &'static str {
        match self {
            LectureCategory::Programming => "Программирование",
            LectureCategory::Security => "Кибербезопасность",
            LectureCategory::DataScience => "Data Science",
            LectureCategory::Web => "Web разработка",
            LectureCategory::Mobile => "Mobile разработка",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LectureCategory::Programming => "💻",
            LectureCategory::Security => "🔒",
            LectureCategory::DataScience => "📊",
            LectureCategory::Web => "🌐",
            LectureCategory::Mobile => "📱",
        }
    }

    /// Matches a stored category value against the vocabulary.
    /// Returns `None` for values outside it (displayed as "Без категории").
    pub fn from_db_value(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.db_value() == value)
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }
}

impl fmt::Display for LectureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.db_value())
    }
}

/// Статус совместного проекта.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProjectStatus {
    #[default]
    Discussion,
    Development,
    Completed,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [
        ProjectStatus::Discussion,
        ProjectStatus::Development,
        ProjectStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Discussion => "discussion",
            ProjectStatus::Development => "development",
            ProjectStatus::Completed => "completed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectStatus::Discussion => "Обсуждение",
            ProjectStatus::Development => "Разработка",
            ProjectStatus::Completed => "Завершен",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ProjectStatus::Discussion => "💬",
            ProjectStatus::Development => "⚙️",
            ProjectStatus::Completed => "✅",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discussion" => Ok(ProjectStatus::Discussion),
            "development" => Ok(ProjectStatus::Development),
            "completed" => Ok(ProjectStatus::Completed),
            _ => Err(format!("Unknown project status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in LectureCategory::ALL {
            assert_eq!(LectureCategory::from_db_value(category.db_value()), Some(category));
            assert_eq!(LectureCategory::from_code(category.code()), Some(category));
        }
    }

    #[test]
    fn test_category_outside_vocabulary() {
        assert_eq!(LectureCategory::from_db_value("DevOps"), None);
        assert_eq!(LectureCategory::from_code("devops"), None);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(ProjectStatus::from_str("discussion").unwrap(), ProjectStatus::Discussion);
        assert_eq!(ProjectStatus::from_str("development").unwrap(), ProjectStatus::Development);
        assert_eq!(ProjectStatus::from_str("completed").unwrap(), ProjectStatus::Completed);
        assert!(ProjectStatus::from_str("archived").is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ProjectStatus::Discussion.to_string(), "discussion");
        assert_eq!(ProjectStatus::Completed.display_name(), "Завершен");
        assert_eq!(ProjectStatus::Development.emoji(), "⚙️");
    }

    #[test]
    fn test_status_default() {
        assert_eq!(ProjectStatus::default(), ProjectStatus::Discussion);
    }
}
