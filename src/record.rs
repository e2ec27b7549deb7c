//! Finished form records and the confirmation summary.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::FormError;
use crate::form::{AnswerValue, FormId, Step};
use crate::pricing::Money;
use crate::session::{Session, SessionId};

pub const CLIENT_ID_LABEL: &str = "Id клиента";
pub const CLIENT_NAME_LABEL: &str = "Имя клиента";
pub const SELECTION_LABEL: &str = "Выбранные услуги";
pub const TOTAL_LABEL: &str = "Стоимость";

/// One `label: value` line of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordField {
    pub label: String,
    pub value: String,
}

impl RecordField {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Immutable result of a confirmed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub form: FormId,
    pub session_id: SessionId,
    pub fields: Vec<RecordField>,
    /// Present for priced forms.
    pub total: Option<Money>,
}

impl Record {
    /// Build the record of a session waiting for confirmation.
    ///
    /// Fields: client id and name, one per data step in chain order, then the
    /// selected add-ons and the total where the form has them.
    pub fn assemble(session: &Session) -> Result<Self, FormError> {
        if !session.is_terminal() {
            return Err(incomplete(session));
        }

        let form = &session.form;
        let mut fields = vec![
            RecordField::new(CLIENT_ID_LABEL, session.client.id.as_str()),
            RecordField::new(CLIENT_NAME_LABEL, session.client.full_name.as_str()),
        ];

        for (step, answer) in answered_steps(session)? {
            fields.push(RecordField::new(step.record_label, answer.to_string()));
        }

        if form.has_toggle_step() {
            let selected = selected_labels(session);
            let value = if selected.is_empty() {
                "нет".to_string()
            } else {
                selected.join(", ")
            };
            fields.push(RecordField::new(SELECTION_LABEL, value));
        }

        let total = quote(session)?;
        if let Some(total) = total {
            fields.push(RecordField::new(TOTAL_LABEL, format!("{total} руб.")));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            form: form.id(),
            session_id: session.id.clone(),
            fields,
            total,
        })
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.value.as_str())
    }

    /// Plain-text export: one `label: value` line per field.
    pub fn to_text(&self) -> String {
        self.fields
            .iter()
            .map(|field| format!("{}: {}", field.label, field.value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// File name for the exported record, stamped with local time.
    pub fn file_name(&self) -> String {
        let stamp = self.created_at.with_timezone(&Local).format("%d%m%Y_%H_%M");
        let short_id = &self.id.simple().to_string()[..8];
        format!("Order_from_{stamp}_{short_id}.txt")
    }
}

/// Summary shown before the yes/no confirmation.
pub fn summary(session: &Session) -> Result<String, FormError> {
    let texts = session.form.texts();
    let mut lines = vec![texts.summary_header.to_string()];

    for (step, answer) in answered_steps(session)? {
        lines.push(step.summary_line(answer));
    }

    if session.form.has_toggle_step() {
        let selected = selected_labels(session);
        if !selected.is_empty() {
            lines.push(texts.selection_header.to_string());
            lines.extend(selected.iter().map(|label| label.to_string()));
        }
    }

    if let Some(total) = quote(session)? {
        lines.push(texts.price_line.replacen("{}", &total.to_string(), 1));
    }

    lines.push(texts.summary_footer.to_string());
    Ok(lines.join("\n"))
}

/// Price of the session's answers and selections, if the form is priced.
pub fn quote(session: &Session) -> Result<Option<Money>, FormError> {
    let form = &session.form;
    form.tariff()
        .map(|tariff| tariff.price(form.options(), &session.answers, &session.toggles))
        .transpose()
}

fn answered_steps(session: &Session) -> Result<Vec<(&Step, &AnswerValue)>, FormError> {
    session
        .form
        .steps()
        .iter()
        .filter(|step| step.kind.collects_answer())
        .map(|step| {
            session
                .answers
                .get(step.id)
                .map(|answer| (step, answer))
                .ok_or_else(|| incomplete(session))
        })
        .collect()
}

fn selected_labels(session: &Session) -> Vec<&'static str> {
    session
        .form
        .options()
        .iter()
        .filter(|option| session.toggles.is_selected(option.id))
        .map(|option| option.label)
        .collect()
}

fn incomplete(session: &Session) -> FormError {
    FormError::IncompleteSession {
        session_id: session.id.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::form::catalog::{self, option_ids};
    use crate::session::ClientInfo;

    fn session(form: crate::form::Form) -> Session {
        Session::new(
            SessionId::new("100"),
            Arc::new(form),
            ClientInfo::new("100", "Мария Иванова"),
        )
    }

    fn finished_inspection() -> Session {
        let mut session = session(catalog::inspection_form().unwrap());
        session.advance(Some(AnswerValue::Number("50".into()))).unwrap();
        session.advance(Some(AnswerValue::Choice("Студия".into()))).unwrap();
        session.toggle(option_ids::AREA_CHECK).unwrap();
        session.toggle(option_ids::LEGAL_PENALTY).unwrap();
        session.advance(None).unwrap();
        session
    }

    #[test]
    fn assemble_requires_terminal() {
        let session = session(catalog::inspection_form().unwrap());
        assert_eq!(
            Record::assemble(&session).unwrap_err(),
            FormError::IncompleteSession {
                session_id: "100".into()
            }
        );
    }

    #[test]
    fn inspection_record_fields_in_order() {
        let record = Record::assemble(&finished_inspection()).unwrap();
        let labels: Vec<_> = record.fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                CLIENT_ID_LABEL,
                CLIENT_NAME_LABEL,
                "Площадь квартиры",
                "Количество комнат",
                SELECTION_LABEL,
                TOTAL_LABEL,
            ]
        );
        assert_eq!(
            record.get(SELECTION_LABEL),
            Some("Проверка площади, Юридическое взыскание")
        );
        assert_eq!(record.total, Some(dec!(4200)));
        assert_eq!(record.get(TOTAL_LABEL), Some("4200 руб."));
    }

    #[test]
    fn renovation_record_has_no_total() {
        let mut session = session(catalog::renovation_form().unwrap());
        let answers = [
            AnswerValue::Choice("в доме".into()),
            AnswerValue::Number("120".into()),
            AnswerValue::Choice("лофт".into()),
            AnswerValue::Choice("Да".into()),
            AnswerValue::Choice("другое".into()),
            AnswerValue::Text("ЖК Солнечный".into()),
            AnswerValue::Choice("в другом городе".into()),
            AnswerValue::Choice("в Telegram".into()),
            AnswerValue::Text("89171234567".into()),
        ];
        for answer in answers {
            session.advance(Some(answer)).unwrap();
        }

        let record = Record::assemble(&session).unwrap();
        assert_eq!(record.total, None);
        assert_eq!(record.fields.len(), 11);
        assert_eq!(record.get("Телефон клиента"), Some("89171234567"));
        assert!(record.get(SELECTION_LABEL).is_none());
        assert!(
            record
                .to_text()
                .starts_with("Id клиента: 100\nИмя клиента: Мария Иванова\nРемонт планируется: в доме")
        );
    }

    #[test]
    fn assemble_does_not_mutate_session() {
        let session = finished_inspection();
        let before = (session.position, session.answers.clone(), session.toggles.clone());
        Record::assemble(&session).unwrap();
        assert_eq!(
            (session.position, session.answers.clone(), session.toggles.clone()),
            before
        );
    }

    #[test]
    fn summary_lists_answers_selection_and_price() {
        let text = summary(&finished_inspection()).unwrap();
        assert_eq!(
            text,
            "Давайте еще раз перепроверим:\n\
             1. Площадь квартиры 50 м2\n\
             2. Количество комнат: Студия\n\
             Вы выбрали следующие услуги:\n\
             Проверка площади\n\
             Юридическое взыскание\n\
             Стоимость приемки квартиры составляет: 4200 руб.\n\
             Всё верно?"
        );
    }

    #[test]
    fn file_name_format() {
        let record = Record::assemble(&finished_inspection()).unwrap();
        let name = record.file_name();
        assert!(name.starts_with("Order_from_"));
        assert!(name.ends_with(".txt"));
        // Order_from_ddmmYYYY_HH_MM_xxxxxxxx.txt
        assert_eq!(name.len(), "Order_from_".len() + 8 + 1 + 2 + 1 + 2 + 1 + 8 + ".txt".len());
    }
}
