//! Pricing engine: table-driven totals from answers and selected add-ons.
//!
//! The total is `area * base_rate` plus one surcharge per selected add-on.
//! Surcharges are plain data ([`PriceRule`]) so a tariff can be tested
//! without a session.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::error::FormError;
use crate::form::{AddOn, AnswerValue, StepId};
use crate::session::{Answers, ToggleSet};

/// Monetary amount in roubles.
pub type Money = Decimal;

/// Base rate per square metre of the observed tariff.
pub const BASE_RATE_PER_UNIT: Money = dec!(80);

/// Room-count band used by tiered surcharges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomTier {
    Studio,
    One,
    Two,
    Three,
    FourOrMore,
}

impl RoomTier {
    pub const ALL: [Self; 5] = [
        Self::Studio,
        Self::One,
        Self::Two,
        Self::Three,
        Self::FourOrMore,
    ];

    /// Map a room-count answer to its band. Anything unrecognized is billed
    /// as four or more rooms.
    pub fn from_answer(answer: &str) -> Self {
        match answer {
            "Студия" => Self::Studio,
            "1" => Self::One,
            "2" => Self::Two,
            "3" => Self::Three,
            _ => Self::FourOrMore,
        }
    }
}

/// Surcharge per room-count band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTable {
    pub studio: Money,
    pub one: Money,
    pub two: Money,
    pub three: Money,
    pub four_or_more: Money,
}

impl TierTable {
    pub const fn new(
        studio: Money,
        one: Money,
        two: Money,
        three: Money,
        four_or_more: Money,
    ) -> Self {
        Self {
            studio,
            one,
            two,
            three,
            four_or_more,
        }
    }

    pub fn lookup(&self, tier: RoomTier) -> Money {
        match tier {
            RoomTier::Studio => self.studio,
            RoomTier::One => self.one,
            RoomTier::Two => self.two,
            RoomTier::Three => self.three,
            RoomTier::FourOrMore => self.four_or_more,
        }
    }
}

/// How much a selected add-on costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceRule {
    /// Offered without charge.
    Free,
    /// Same amount regardless of the apartment.
    Flat(Money),
    /// Amount depends on the room-count band.
    Tiered(TierTable),
    /// Rate per square metre.
    PerArea(Money),
}

/// The answers a price rule may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingInput {
    pub area: Decimal,
    pub tier: RoomTier,
}

impl PriceRule {
    /// Surcharge for `input`, `None` if it overflows.
    pub fn evaluate(&self, input: &PricingInput) -> Option<Money> {
        match self {
            Self::Free => Some(Money::ZERO),
            Self::Flat(amount) => Some(*amount),
            Self::Tiered(table) => Some(table.lookup(input.tier)),
            Self::PerArea(rate) => rate.checked_mul(input.area),
        }
    }
}

/// Which answers a priced form bills on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tariff {
    pub base_rate_per_unit: Money,
    /// Numeric step holding the area.
    pub area_step: StepId,
    /// Choice step holding the room count, if the tariff is tiered.
    pub tier_step: Option<StepId>,
}

impl Tariff {
    pub fn new(area_step: &'static str, tier_step: Option<&'static str>) -> Self {
        Self {
            base_rate_per_unit: BASE_RATE_PER_UNIT,
            area_step: StepId::new(area_step),
            tier_step: tier_step.map(StepId::new),
        }
    }

    /// Extract the billing inputs from an answer set.
    pub fn input(&self, answers: &Answers) -> Result<PricingInput, FormError> {
        let area = answers
            .get(self.area_step)
            .and_then(|answer| answer.as_number())
            .ok_or_else(|| self.invalid_area("no numeric area answer"))?;
        let tier = self
            .tier_step
            .and_then(|step| answers.get(step))
            .and_then(|answer| answer.as_str())
            .map(RoomTier::from_answer)
            .unwrap_or(RoomTier::FourOrMore);
        Ok(PricingInput { area, tier })
    }

    /// Compute the total for `answers` with the add-ons selected in `toggles`.
    ///
    /// Add-ons are summed in catalog order; unselected or unknown ids cost
    /// nothing.
    pub fn price(
        &self,
        catalog: &[AddOn],
        answers: &Answers,
        toggles: &ToggleSet,
    ) -> Result<Money, FormError> {
        let input = self.input(answers)?;
        let selected = catalog
            .iter()
            .filter(|option| toggles.is_selected(option.id));
        self.total(&input, selected)
            .ok_or_else(|| self.invalid_area("area too large to price"))
    }

    /// Whether `answer` to `step` keeps every selection and room band
    /// priceable. Steps other than the area step are always admitted.
    pub fn admits(&self, catalog: &[AddOn], step: StepId, answer: &AnswerValue) -> bool {
        if step != self.area_step {
            return true;
        }
        let Some(area) = answer.as_number() else {
            return false;
        };
        RoomTier::ALL
            .into_iter()
            .all(|tier| self.total(&PricingInput { area, tier }, catalog).is_some())
    }

    fn total<'a>(
        &self,
        input: &PricingInput,
        selected: impl IntoIterator<Item = &'a AddOn>,
    ) -> Option<Money> {
        let mut total = input.area.checked_mul(self.base_rate_per_unit)?;
        for option in selected {
            total = total.checked_add(option.rule.evaluate(input)?)?;
        }
        Some(total)
    }

    fn invalid_area(&self, reason: &str) -> FormError {
        FormError::InvalidAnswer {
            step: self.area_step,
            reason: reason.into(),
        }
    }
}
