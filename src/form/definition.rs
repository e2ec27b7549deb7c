//! The validated, read-only step table of one form.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::option::AddOn;
use super::step::{OptionId, Position, Step, StepId, StepKind};
use crate::error::FormError;
use crate::pricing::Tariff;

/// Identifier of a built-in form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FormId(&'static str);

impl FormId {
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for FormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Fixed texts a form uses around its questions.
#[derive(Debug, Clone)]
pub struct FormTexts {
    /// Sent once before the first question.
    pub intro: &'static str,
    pub summary_header: &'static str,
    pub summary_footer: &'static str,
    /// Heads the list of selected add-ons in the summary.
    pub selection_header: &'static str,
    /// Total line; `{}` is replaced with the amount.
    pub price_line: &'static str,
    /// Sent to the user after a confirmed submission.
    pub completed: &'static str,
    /// Sent when the user rejects the summary.
    pub discarded: &'static str,
}

impl Default for FormTexts {
    fn default() -> Self {
        Self {
            intro: "Для отмены набейте \"cancel\".",
            summary_header: "Давайте еще раз перепроверим:",
            summary_footer: "Всё верно?",
            selection_header: "Вы выбрали следующие услуги:",
            price_line: "Стоимость: {} руб.",
            completed: "Спасибо! Ваш заказ обрабатывается. Ожидайте уведомления!",
            discarded: "Данные сброшены, начнём заново.",
        }
    }
}

/// A validated form: a linear chain of steps plus its add-on catalog.
#[derive(Debug, Clone)]
pub struct Form {
    id: FormId,
    title: &'static str,
    texts: FormTexts,
    steps: Vec<Step>,
    index: HashMap<StepId, usize>,
    options: Vec<AddOn>,
    tariff: Option<Tariff>,
}

impl Form {
    pub fn builder(id: &'static str, title: &'static str) -> FormBuilder {
        FormBuilder {
            id: FormId::new(id),
            title,
            texts: FormTexts::default(),
            steps: Vec::new(),
            options: Vec::new(),
            tariff: None,
        }
    }

    pub fn id(&self) -> FormId {
        self.id
    }

    pub fn title(&self) -> &'static str {
        self.title
    }

    pub fn texts(&self) -> &FormTexts {
        &self.texts
    }

    pub fn first_step(&self) -> StepId {
        self.steps[0].id
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.index.get(&id).map(|&i| &self.steps[i])
    }

    /// Position reached after `current` is answered.
    pub fn step_after(&self, current: StepId) -> Option<Position> {
        let step = self.step(current)?;
        Some(step.next.map_or(Position::Terminal, Position::Step))
    }

    /// Steps in chain order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn options(&self) -> &[AddOn] {
        &self.options
    }

    /// Look up an add-on by its raw id (e.g. callback data).
    pub fn option(&self, raw_id: &str) -> Option<&AddOn> {
        self.options.iter().find(|o| o.id.as_str() == raw_id)
    }

    pub fn tariff(&self) -> Option<&Tariff> {
        self.tariff.as_ref()
    }

    /// Toggle step that offers `option`, if any.
    pub fn toggle_step_for(&self, option: OptionId) -> Option<StepId> {
        self.steps.iter().find_map(|step| match &step.kind {
            StepKind::MultiToggle { options, .. } if options.contains(&option) => Some(step.id),
            _ => None,
        })
    }

    pub fn has_toggle_step(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step.kind, StepKind::MultiToggle { .. }))
    }
}

/// Collects steps and options, then validates them into a [`Form`].
pub struct FormBuilder {
    id: FormId,
    title: &'static str,
    texts: FormTexts,
    steps: Vec<Step>,
    options: Vec<AddOn>,
    tariff: Option<Tariff>,
}

impl FormBuilder {
    pub fn texts(mut self, texts: FormTexts) -> Self {
        self.texts = texts;
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn option(mut self, option: AddOn) -> Self {
        self.options.push(option);
        self
    }

    pub fn tariff(mut self, tariff: Tariff) -> Self {
        self.tariff = Some(tariff);
        self
    }

    /// Validate the table. Steps must form one finite chain starting at the
    /// first step and visiting every step exactly once.
    pub fn build(self) -> Result<Form, FormError> {
        let invalid = |reason: String| FormError::FormDefinition {
            form: self.id.to_string(),
            reason,
        };

        if self.steps.is_empty() {
            return Err(invalid("form has no steps".into()));
        }

        let mut index = HashMap::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            if index.insert(step.id, i).is_some() {
                return Err(invalid(format!("duplicate step id {}", step.id)));
            }
        }

        let mut option_ids = HashSet::new();
        for option in &self.options {
            if !option_ids.insert(option.id) {
                return Err(invalid(format!("duplicate option id {}", option.id)));
            }
        }

        for step in &self.steps {
            if let Some(next) = step.next
                && !index.contains_key(&next)
            {
                return Err(invalid(format!(
                    "step {} continues to unknown step {next}",
                    step.id
                )));
            }
            match &step.kind {
                StepKind::SingleChoice { rows } if rows.iter().flatten().next().is_none() => {
                    return Err(invalid(format!("choice step {} has no options", step.id)));
                }
                StepKind::MultiToggle { options, .. } => {
                    if let Some(unknown) = options.iter().find(|id| !option_ids.contains(*id)) {
                        return Err(FormError::UnrecognizedOption {
                            form: self.id.to_string(),
                            option: *unknown,
                        });
                    }
                }
                _ => {}
            }
        }

        let mut visited = HashSet::new();
        let mut cursor = Some(self.steps[0].id);
        while let Some(id) = cursor {
            if !visited.insert(id) {
                return Err(invalid(format!("step chain loops back to {id}")));
            }
            cursor = self.steps[index[&id]].next;
        }
        if visited.len() != self.steps.len() {
            let unreachable: Vec<_> = self
                .steps
                .iter()
                .filter(|step| !visited.contains(&step.id))
                .map(|step| step.id.as_str())
                .collect();
            return Err(invalid(format!(
                "steps unreachable from the first step: {}",
                unreachable.join(", ")
            )));
        }

        if let Some(tariff) = &self.tariff {
            match index.get(&tariff.area_step).map(|&i| &self.steps[i].kind) {
                Some(StepKind::NumericText) => {}
                _ => {
                    return Err(invalid(format!(
                        "tariff area step {} is not a numeric step",
                        tariff.area_step
                    )));
                }
            }
            if let Some(tier_step) = tariff.tier_step {
                match index.get(&tier_step).map(|&i| &self.steps[i].kind) {
                    Some(StepKind::SingleChoice { .. }) => {}
                    _ => {
                        return Err(invalid(format!(
                            "tariff tier step {tier_step} is not a choice step"
                        )));
                    }
                }
            }
        }

        Ok(Form {
            id: self.id,
            title: self.title,
            texts: self.texts,
            steps: self.steps,
            index,
            options: self.options,
            tariff: self.tariff,
        })
    }
}
