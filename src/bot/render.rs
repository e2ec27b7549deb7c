//! Turns engine prompts into chat messages.
//!
//! This is the only place that knows about keyboards and ✅/❌ markers.

use std::path::Path;

use crate::channels::{Attachment, InlineButton, Keyboard, OutgoingResponse};
use crate::engine::{ExpectedInput, Prompt, ToggleItem};
use crate::error::Rejection;
use crate::form::FormTexts;
use crate::record::Record;

pub const SELECTED_MARK: &str = "✅";
pub const UNSELECTED_MARK: &str = "❌";

/// Inline button of one add-on, labelled with its current state.
pub fn toggle_button(item: &ToggleItem) -> InlineButton {
    let mark = if item.selected {
        SELECTED_MARK
    } else {
        UNSELECTED_MARK
    };
    InlineButton::callback(format!("{} {mark}", item.label), item.id.as_str())
}

/// Keyboard matching what the prompt expects.
fn keyboard_for(expected: &ExpectedInput) -> Keyboard {
    match expected {
        ExpectedInput::FreeText | ExpectedInput::Number | ExpectedInput::Phone => Keyboard::Remove,
        ExpectedInput::Choice { rows } => Keyboard::Reply(
            rows.iter()
                .map(|row| row.iter().map(|choice| choice.to_string()).collect())
                .collect(),
        ),
        ExpectedInput::Toggles { continue_label, .. } => {
            Keyboard::Reply(vec![vec![continue_label.to_string()]])
        }
        ExpectedInput::Confirmation { yes, no } => {
            Keyboard::Reply(vec![vec![yes.to_string(), no.to_string()]])
        }
    }
}

/// Messages asking `prompt`, in send order.
pub fn prompt(prompt: &Prompt, images_dir: &Path) -> Vec<OutgoingResponse> {
    let text = match prompt.preamble {
        Some(preamble) => format!("{preamble}\n{}", prompt.text),
        None => prompt.text.clone(),
    };

    let mut head = OutgoingResponse::text(text);
    for item in &prompt.gallery {
        head = head.with_attachment(Attachment::Photo {
            path: images_dir.join(item.file_name),
            caption: Some(item.caption.to_string()),
        });
    }

    let ExpectedInput::Toggles {
        items,
        continue_label,
    } = &prompt.expected
    else {
        return vec![head.with_keyboard(keyboard_for(&prompt.expected))];
    };

    // One message per add-on so each button can be edited on its own.
    let mut messages = vec![head.with_keyboard(Keyboard::Remove)];
    messages.extend(items.iter().map(|item| {
        OutgoingResponse::text(item.description)
            .with_keyboard(Keyboard::Inline(vec![vec![toggle_button(item)]]))
    }));
    messages.push(
        OutgoingResponse::text(format!(
            "Нажмите \"{continue_label}\", когда закончите выбор."
        ))
        .with_keyboard(keyboard_for(&prompt.expected)),
    );
    messages
}

/// Explanation of a rejected answer, keeping the step's buttons on screen.
pub fn rejection(reason: Rejection, prompt: &Prompt) -> OutgoingResponse {
    OutgoingResponse::text(reason.user_message()).with_keyboard(keyboard_for(&prompt.expected))
}

/// Thank-you message after a confirmed form.
pub fn completed(record: &Record, texts: &FormTexts) -> OutgoingResponse {
    let text = match record.total {
        Some(total) => format!(
            "{}\n{}",
            texts.price_line.replacen("{}", &total.to_string(), 1),
            texts.completed
        ),
        None => texts.completed.to_string(),
    };
    OutgoingResponse::text(text).with_keyboard(Keyboard::Remove)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::engine::{CONFIRM_NO, CONFIRM_YES};
    use crate::form::{FormId, GalleryItem, OptionId, Position, StepId};

    fn base(expected: ExpectedInput) -> Prompt {
        Prompt {
            form: FormId::new("inspection"),
            position: Position::Step(StepId::new("x")),
            preamble: None,
            text: "Вопрос?".into(),
            expected,
            gallery: Vec::new(),
        }
    }

    fn item(id: &'static str, label: &'static str, selected: bool) -> ToggleItem {
        ToggleItem {
            id: OptionId::new(id),
            label,
            description: "описание",
            selected,
        }
    }

    #[test]
    fn toggle_button_marks_state() {
        let off = toggle_button(&item("bank_evaluation", "Оценка для банка", false));
        assert_eq!(off, InlineButton::callback("Оценка для банка ❌", "bank_evaluation"));
        let on = toggle_button(&item("bank_evaluation", "Оценка для банка", true));
        assert_eq!(on.text, "Оценка для банка ✅");
    }

    #[test]
    fn number_prompt_hides_keyboard_and_joins_preamble() {
        let mut p = base(ExpectedInput::Number);
        p.preamble = Some("Для отмены набейте \"cancel\".");
        let messages = prompt(&p, Path::new("images"));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Для отмены набейте \"cancel\".\nВопрос?");
        assert_eq!(messages[0].keyboard, Keyboard::Remove);
    }

    #[test]
    fn choice_prompt_uses_reply_rows() {
        let p = base(ExpectedInput::Choice {
            rows: vec![vec!["1", "2"], vec!["Студия"]],
        });
        let messages = prompt(&p, Path::new("images"));
        assert_eq!(
            messages[0].keyboard,
            Keyboard::Reply(vec![
                vec!["1".to_string(), "2".to_string()],
                vec!["Студия".to_string()]
            ])
        );
    }

    #[test]
    fn gallery_becomes_photo_attachments() {
        let mut p = base(ExpectedInput::Choice {
            rows: vec![vec!["лофт"]],
        });
        p.gallery = vec![GalleryItem::new("Loft_style.jpg", "лофт")];
        let messages = prompt(&p, Path::new("/srv/images"));
        assert_eq!(
            messages[0].attachments,
            vec![Attachment::Photo {
                path: PathBuf::from("/srv/images/Loft_style.jpg"),
                caption: Some("лофт".into()),
            }]
        );
    }

    #[test]
    fn toggle_prompt_is_one_message_per_option() {
        let p = base(ExpectedInput::Toggles {
            items: vec![
                item("area_check", "Проверка площади", false),
                item("legal_penalty", "Юридическое взыскание", true),
            ],
            continue_label: "продолжить",
        });
        let messages = prompt(&p, Path::new("images"));
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].content, "Вопрос?");
        assert_eq!(
            messages[2].keyboard,
            Keyboard::Inline(vec![vec![InlineButton::callback(
                "Юридическое взыскание ✅",
                "legal_penalty"
            )]])
        );
        assert_eq!(
            messages[3].keyboard,
            Keyboard::Reply(vec![vec!["продолжить".to_string()]])
        );
    }

    #[test]
    fn confirmation_offers_yes_and_no() {
        let p = base(ExpectedInput::Confirmation {
            yes: CONFIRM_YES,
            no: CONFIRM_NO,
        });
        let messages = prompt(&p, Path::new("images"));
        assert_eq!(
            messages[0].keyboard,
            Keyboard::Reply(vec![vec!["✅ да".to_string(), "❌ нет".to_string()]])
        );
    }

    #[test]
    fn rejection_keeps_choice_buttons() {
        let p = base(ExpectedInput::Choice {
            rows: vec![vec!["Да", "Нет"]],
        });
        let response = rejection(Rejection::NotAnOption, &p);
        assert_eq!(response.content, "Нажмите одну из кнопок ниже.");
        assert!(matches!(response.keyboard, Keyboard::Reply(_)));
    }
}
