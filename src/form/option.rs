//! Optional add-ons offered on toggle steps.

use super::step::OptionId;
use crate::pricing::PriceRule;

/// An add-on the user can switch on or off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOn {
    pub id: OptionId,
    /// Button label, without any selection marker.
    pub label: &'static str,
    /// Explanation shown next to the button.
    pub description: &'static str,
    pub rule: PriceRule,
}

impl AddOn {
    pub const fn new(
        id: OptionId,
        label: &'static str,
        description: &'static str,
        rule: PriceRule,
    ) -> Self {
        Self {
            id,
            label,
            description,
            rule,
        }
    }
}
