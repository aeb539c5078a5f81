use rust_decimal::Decimal;

/// Per-bank rule deciding whether a row is a credit to the account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PayInRule {
    #[default]
    AmountPositive,
    CreditColumn,
    OrderIdNoSpace,
    UtrNoSpace,
    NarrationContains(Vec<String>),
}

/// Evaluate the configured rule against one row's extracted values.
pub fn classify(
    amount: Decimal,
    order_id: Option<&str>,
    utr: Option<&str>,
    reference: &str,
    rule: &PayInRule,
) -> bool {
    match rule {
        PayInRule::AmountPositive | PayInRule::CreditColumn => amount > Decimal::ZERO,
        PayInRule::OrderIdNoSpace => {
            amount > Decimal::ZERO && order_id.map_or(true, |id| !id.contains(' '))
        }
        PayInRule::UtrNoSpace => {
            amount > Decimal::ZERO && utr.map_or(true, |u| !u.contains(' '))
        }
        PayInRule::NarrationContains(needles) => {
            let reference = reference.to_lowercase();
            needles
                .iter()
                .filter(|needle| !needle.trim().is_empty())
                .any(|needle| reference.contains(&needle.to_lowercase()))
        }
    }
}
