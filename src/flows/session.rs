//! Per-admin conversation sessions and the store that owns them.
//!
//! The store is a plain map keyed by the initiating user's Telegram id
//! behind one async mutex: advances for the same user are serialized, flows
//! of different users never share state, and entering a new flow
//! unconditionally replaces whatever session the user had before. The
//! store is owned by `HandlerDeps` and injected, never ambient.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;

use super::steps::{EventField, FieldSpec, FieldValue, ADD_EVENT_STEPS, ADD_MENTOR_STEPS};

/// Какой сценарий выполняет сессия.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowKind {
    /// Добавление ментора (четыре текстовых шага)
    AddMentor,
    /// Добавление мероприятия (текстовые шаги, затем выбор ментора)
    AddEvent,
    /// Текстовые шаги AddEvent пройдены, ждем выбора ментора кнопкой
    AddEventMentorPick,
    /// Редактирование одного поля существующего мероприятия
    EditEventField { event_id: i64, field: EventField },
}

/// Результат одного шага: следующий вопрос, повтор текущего шага
/// или завершение сбора полей.
#[derive(Debug)]
pub enum StepOutcome {
    Next { prompt: &'static str },
    Invalid { error: String },
    Complete,
}

/// Сессия одного администратора: текущий сценарий, номер шага
/// и накопленные значения полей.
#[derive(Debug)]
pub struct Session {
    flow: FlowKind,
    step: usize,
    fields: HashMap<&'static str, FieldValue>,
}

impl Session {
    pub fn new(flow: FlowKind) -> Self {
        Self {
            flow,
            step: 0,
            fields: HashMap::new(),
        }
    }

    pub fn flow(&self) -> &FlowKind {
        &self.flow
    }

    fn spec(&self) -> &'static [FieldSpec] {
        match &self.flow {
            FlowKind::AddMentor => ADD_MENTOR_STEPS,
            FlowKind::AddEvent => ADD_EVENT_STEPS,
            FlowKind::AddEventMentorPick => &[],
            FlowKind::EditEventField { field, .. } => std::slice::from_ref(field.spec()),
        }
    }

    /// Вопрос текущего шага (None, когда текстовых шагов не осталось).
    pub fn current_prompt(&self) -> Option<&'static str> {
        self.spec().get(self.step).map(|s| s.prompt)
    }

    /// Продвигает сессию на один шаг. При ошибке валидации шаг не
    /// меняется и собранные ранее поля сохраняются.
    pub fn advance(&mut self, input: &str) -> StepOutcome {
        let Some(spec) = self.spec().get(self.step) else {
            // Ждем нажатия кнопки, а не текста
            return StepOutcome::Invalid {
                error: "Выберите ментора кнопкой ниже или нажмите ❌ Отмена.".to_string(),
            };
        };

        match (spec.validate)(input) {
            Ok(value) => {
                self.fields.insert(spec.field, value);
                self.step += 1;
                match self.current_prompt() {
                    Some(prompt) => StepOutcome::Next { prompt },
                    None => StepOutcome::Complete,
                }
            }
            Err(error) => StepOutcome::Invalid { error },
        }
    }

    /// Переводит завершенную текстовую часть AddEvent в ожидание
    /// выбора ментора, сохраняя собранные поля.
    pub fn into_mentor_pick(self) -> Session {
        Session {
            flow: FlowKind::AddEventMentorPick,
            step: 0,
            fields: self.fields,
        }
    }

    pub fn field_text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    pub fn field_date_time(&self, name: &str) -> Option<NaiveDateTime> {
        self.fields.get(name).and_then(FieldValue::as_date_time)
    }

    #[cfg(test)]
    pub fn fields_len(&self) -> usize {
        self.fields.len()
    }
}

/// Результат продвижения сессии через хранилище. При завершении сессия
/// извлекается из хранилища и отдается вызывающему для коммита.
#[derive(Debug)]
pub enum AdvanceOutcome {
    Next { prompt: &'static str },
    Invalid { error: String },
    Complete(Session),
}

/// Хранилище активных сессий: не более одной на пользователя.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Начинает сценарий, безусловно заменяя прежнюю сессию пользователя.
    /// Возвращает вопрос первого шага, если сценарий начинается с текста.
    pub async fn begin(&self, user_id: i64, session: Session) -> Option<&'static str> {
        let prompt = session.current_prompt();
        self.sessions.lock().await.insert(user_id, session);
        prompt
    }

    /// Продвигает сессию пользователя на один шаг. None означает, что
    /// активной сессии нет. Завершенная сессия удаляется из хранилища до того,
    /// как вызывающий начнет коммит: повторное сообщение того же
    /// пользователя уже не найдет ее.
    pub async fn advance(&self, user_id: i64, input: &str) -> Option<AdvanceOutcome> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&user_id)?;

        match session.advance(input) {
            StepOutcome::Next { prompt } => Some(AdvanceOutcome::Next { prompt }),
            StepOutcome::Invalid { error } => Some(AdvanceOutcome::Invalid { error }),
            StepOutcome::Complete => sessions.remove(&user_id).map(AdvanceOutcome::Complete),
        }
    }

    /// Забирает сессию пользователя (для коммитов по нажатию кнопки).
    pub async fn take(&self, user_id: i64) -> Option<Session> {
        self.sessions.lock().await.remove(&user_id)
    }

    /// Сбрасывает сессию без каких-либо записей в базу.
    pub async fn cancel(&self, user_id: i64) -> bool {
        self.sessions.lock().await.remove(&user_id).is_some()
    }

    pub async fn has_session(&self, user_id: i64) -> bool {
        self.sessions.lock().await.contains_key(&user_id)
    }
}
