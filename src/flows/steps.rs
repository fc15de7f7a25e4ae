//! Declarative step definitions for the admin data-entry flows.
//!
//! Every flow is a linear list of `FieldSpec` entries executed by the one
//! engine in [`super::session`]. Add and edit variants share the same
//! specs; the edit flow just runs a single-entry list for the chosen field.

use chrono::NaiveDateTime;

/// Формат даты, который вводят администраторы.
pub const EVENT_DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Провалидированное значение одного поля формы.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    DateTime(NaiveDateTime),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::DateTime(_) => None,
        }
    }

    pub fn as_date_time(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            FieldValue::Text(_) => None,
        }
    }
}

pub type Validator = fn(&str) -> Result<FieldValue, String>;

/// Один шаг формы: какое поле заполняет, что показать пользователю
/// и как проверить ввод.
pub struct FieldSpec {
    pub field: &'static str,
    pub prompt: &'static str,
    pub validate: Validator,
}

fn non_empty(input: &str) -> Result<FieldValue, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Err("❌ Текст не должен быть пустым. Попробуйте еще раз.".to_string())
    } else {
        Ok(FieldValue::Text(trimmed.to_string()))
    }
}

fn event_date_time(input: &str) -> Result<FieldValue, String> {
    NaiveDateTime::parse_from_str(input.trim(), EVENT_DATE_FORMAT)
        .map(FieldValue::DateTime)
        .map_err(|_| "❌ Неверный формат! Используйте ДД.ММ.ГГГГ ЧЧ:ММ".to_string())
}

/// AddMentor: имя → специализация → описание → контакты.
pub const ADD_MENTOR_STEPS: &[FieldSpec] = &[
    FieldSpec {
        field: "name",
        prompt: "👨‍🏫 Введите имя нового ментора:",
        validate: non_empty,
    },
    FieldSpec {
        field: "specialization",
        prompt: "📝 Введите специализацию ментора:",
        validate: non_empty,
    },
    FieldSpec {
        field: "bio",
        prompt: "📖 Введите краткое описание ментора:",
        validate: non_empty,
    },
    FieldSpec {
        field: "contact",
        prompt: "📞 Введите контактную информацию ментора:",
        validate: non_empty,
    },
];

/// AddEvent (текстовая часть): название → описание → дата → место.
/// Дальше идет выбор ментора кнопками.
pub const ADD_EVENT_STEPS: &[FieldSpec] = &[
    FieldSpec {
        field: "title",
        prompt: "📅 Введите название мероприятия:",
        validate: non_empty,
    },
    FieldSpec {
        field: "description",
        prompt: "📝 Введите описание мероприятия:",
        validate: non_empty,
    },
    FieldSpec {
        field: "date_time",
        prompt: "⏰ Введите дату и время в формате ДД.ММ.ГГГГ ЧЧ:ММ:",
        validate: event_date_time,
    },
    FieldSpec {
        field: "location",
        prompt: "📍 Введите место проведения:",
        validate: non_empty,
    },
];

/// Редактируемое текстовое поле мероприятия. Ментор назначается отдельной
/// веткой (кнопки, без текстового ввода).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    Title,
    Description,
    DateTime,
    Location,
}

impl EventField {
    /// Short code carried in callback data ("edit_<code>_<event_id>").
    pub fn code(&self) -> &'static str {
        match self {
            EventField::Title => "title",
            EventField::Description => "desc",
            EventField::DateTime => "datetime",
            EventField::Location => "location",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "title" => Some(EventField::Title),
            "desc" => Some(EventField::Description),
            "datetime" => Some(EventField::DateTime),
            "location" => Some(EventField::Location),
            _ => None,
        }
    }

    /// Одношаговая спецификация сбора нового значения: те же валидаторы,
    /// что и в AddEvent.
    pub fn spec(&self) -> &'static FieldSpec {
        match self {
            EventField::Title => &EDIT_TITLE_STEP,
            EventField::Description => &EDIT_DESCRIPTION_STEP,
            EventField::DateTime => &EDIT_DATE_TIME_STEP,
            EventField::Location => &EDIT_LOCATION_STEP,
        }
    }
}

static EDIT_TITLE_STEP: FieldSpec = FieldSpec {
    field: "title",
    prompt: "📝 Введите новое название мероприятия:",
    validate: non_empty,
};

static EDIT_DESCRIPTION_STEP: FieldSpec = FieldSpec {
    field: "description",
    prompt: "📄 Введите новое описание мероприятия:",
    validate: non_empty,
};

static EDIT_DATE_TIME_STEP: FieldSpec = FieldSpec {
    field: "date_time",
    prompt: "⏰ Введите новую дату и время в формате ДД.ММ.ГГГГ ЧЧ:ММ:",
    validate: event_date_time,
};

static EDIT_LOCATION_STEP: FieldSpec = FieldSpec {
    field: "location",
    prompt: "📍 Введите новое место проведения:",
    validate: non_empty,
};
