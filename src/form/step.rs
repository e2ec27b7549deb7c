//! Step and answer types shared by every form.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

/// Stable identifier of a step inside a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StepId(&'static str);

impl StepId {
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Stable identifier of a toggleable add-on option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OptionId(&'static str);

impl OptionId {
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for OptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Where a session currently is in its form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "position", content = "step")]
pub enum Position {
    /// Waiting for the answer to this step.
    Step(StepId),
    /// Every step is answered; waiting for the yes/no confirmation.
    Terminal,
}

impl Position {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }

    pub fn step(&self) -> Option<StepId> {
        match self {
            Self::Step(id) => Some(*id),
            Self::Terminal => None,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step(id) => write!(f, "{id}"),
            Self::Terminal => f.write_str("terminal"),
        }
    }
}

/// What kind of answer a step expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Any text, stored verbatim.
    FreeText,
    /// Non-empty string of decimal digits.
    NumericText,
    /// Digits only, at least `min_len` of them.
    Phone { min_len: usize },
    /// One of a fixed set of labels, case-sensitive. Rows are a layout hint.
    SingleChoice { rows: Vec<Vec<&'static str>> },
    /// A set of add-ons the user switches on and off before moving on.
    MultiToggle {
        options: Vec<OptionId>,
        continue_label: &'static str,
    },
}

impl StepKind {
    pub fn choices(&self) -> impl Iterator<Item = &'static str> + '_ {
        let rows: &[Vec<&'static str>] = match self {
            Self::SingleChoice { rows } => rows,
            _ => &[],
        };
        rows.iter().flatten().copied()
    }

    pub fn collects_answer(&self) -> bool {
        !matches!(self, Self::MultiToggle { .. })
    }
}

/// A picture shown before a step is asked (e.g. interior style samples).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryItem {
    pub file_name: &'static str,
    pub caption: &'static str,
}

impl GalleryItem {
    pub const fn new(file_name: &'static str, caption: &'static str) -> Self {
        Self { file_name, caption }
    }
}

/// A single question of a form.
#[derive(Debug, Clone)]
pub struct Step {
    pub id: StepId,
    pub kind: StepKind,
    pub prompt: &'static str,
    /// Follow-up step; `None` on the last step.
    pub next: Option<StepId>,
    /// Field name in the exported record.
    pub record_label: &'static str,
    /// Confirmation summary line; `{}` is replaced with the answer.
    pub summary: &'static str,
    pub gallery: Vec<GalleryItem>,
}

impl Step {
    pub fn new(id: &'static str, kind: StepKind, prompt: &'static str) -> Self {
        Self {
            id: StepId::new(id),
            kind,
            prompt,
            next: None,
            record_label: id,
            summary: "{}",
            gallery: Vec::new(),
        }
    }

    pub fn free_text(id: &'static str, prompt: &'static str) -> Self {
        Self::new(id, StepKind::FreeText, prompt)
    }

    pub fn numeric(id: &'static str, prompt: &'static str) -> Self {
        Self::new(id, StepKind::NumericText, prompt)
    }

    pub fn phone(id: &'static str, prompt: &'static str, min_len: usize) -> Self {
        Self::new(id, StepKind::Phone { min_len }, prompt)
    }

    pub fn choice(id: &'static str, prompt: &'static str, rows: Vec<Vec<&'static str>>) -> Self {
        Self::new(id, StepKind::SingleChoice { rows }, prompt)
    }

    pub fn toggles(
        id: &'static str,
        prompt: &'static str,
        options: Vec<OptionId>,
        continue_label: &'static str,
    ) -> Self {
        Self::new(
            id,
            StepKind::MultiToggle {
                options,
                continue_label,
            },
            prompt,
        )
    }

    pub fn then(mut self, next: &'static str) -> Self {
        self.next = Some(StepId::new(next));
        self
    }

    pub fn recorded_as(mut self, record_label: &'static str, summary: &'static str) -> Self {
        self.record_label = record_label;
        self.summary = summary;
        self
    }

    pub fn with_gallery(mut self, gallery: Vec<GalleryItem>) -> Self {
        self.gallery = gallery;
        self
    }

    /// Render the confirmation summary line for an answer.
    pub fn summary_line(&self, answer: &AnswerValue) -> String {
        self.summary.replacen("{}", &answer.to_string(), 1)
    }
}

/// A validated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum AnswerValue {
    Text(String),
    /// Digits exactly as typed. Any length is kept.
    Number(String),
    Choice(String),
}

impl AnswerValue {
    /// Numeric value of a `Number` answer, `None` when it does not fit a `Decimal`.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(digits) => Decimal::from_str(digits).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Choice(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl std::fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) | Self::Number(s) | Self::Choice(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn oversized_number_has_no_decimal_value() {
        assert_eq!(AnswerValue::Number("054".into()).as_number(), Some(dec!(54)));
        let huge = AnswerValue::Number("9".repeat(40));
        assert_eq!(huge.as_number(), None);
        assert_eq!(huge.to_string().len(), 40);
    }

    #[test]
    fn choices_flatten_rows_in_order() {
        let step = Step::choice("rooms", "Кол-во комнат?", vec![vec!["1", "2"], vec!["Студия"]]);
        let choices: Vec<_> = step.kind.choices().collect();
        assert_eq!(choices, vec!["1", "2", "Студия"]);
    }

    #[test]
    fn non_choice_steps_have_no_choices() {
        let step = Step::numeric("area", "Площадь?");
        assert_eq!(step.kind.choices().count(), 0);
    }

    #[test]
    fn summary_line_substitutes_answer() {
        let step = Step::numeric("area", "Площадь?")
            .recorded_as("Площадь", "2. Площадь вашего дома/квартиры {} м2");
        assert_eq!(
            step.summary_line(&AnswerValue::Number("54".into())),
            "2. Площадь вашего дома/квартиры 54 м2"
        );
    }

    #[test]
    fn toggle_steps_do_not_collect_answers() {
        let step = Step::toggles("services", "Выберите", vec![OptionId::new("a")], "продолжить");
        assert!(!step.kind.collects_answer());
        assert!(Step::free_text("address", "Адрес?").kind.collects_answer());
    }

    #[test]
    fn position_display() {
        assert_eq!(Position::Step(StepId::new("area")).to_string(), "area");
        assert_eq!(Position::Terminal.to_string(), "terminal");
        assert!(Position::Terminal.is_terminal());
        assert_eq!(Position::Terminal.step(), None);
    }
}
