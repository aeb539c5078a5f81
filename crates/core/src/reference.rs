use regex::Regex;

/// How to split a free-form reference string into order-id and UTR parts.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSpec {
    /// Literal separator. `None` means the reference is never split.
    pub splitter: Option<String>,
    pub parts_count: PartsRule,
    pub order_id: Option<PartSpec>,
    pub utr: Option<PartSpec>,
    /// Applied to the whole reference only when the split produced no UTR.
    pub utr_fallback: Option<Regex>,
}

/// Accepted number of parts after splitting. A mismatch means "not
/// splittable": no order-id or UTR is taken from the parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PartsRule {
    #[default]
    Any,
    Exact(usize),
    OneOf(Vec<usize>),
}

impl PartsRule {
    fn accepts(&self, count: usize) -> bool {
        match self {
            PartsRule::Any => true,
            PartsRule::Exact(n) => count == *n,
            PartsRule::OneOf(choices) => choices.contains(&count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    pub index: usize,
    pub clean_digits_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitReference {
    pub order_id: Option<String>,
    pub utr: Option<String>,
}

/// Split a reference into its order-id and UTR parts. Blank extracted
/// parts normalize to `None`; an out-of-range index yields `None` for that
/// part.
pub fn split(reference: &str, spec: &ReferenceSpec) -> SplitReference {
    let mut order_id = None;
    let mut utr = None;

    if let Some(splitter) = spec.splitter.as_deref().filter(|s| !s.is_empty()) {
        let parts: Vec<&str> = reference.split(splitter).collect();
        if spec.parts_count.accepts(parts.len()) {
            order_id = extract(&parts, spec.order_id.as_ref());
            utr = extract(&parts, spec.utr.as_ref());
        }
    }

    if utr.is_none() {
        if let Some(pattern) = &spec.utr_fallback {
            utr = pattern.find(reference).map(|m| m.as_str().to_string());
        }
    }

    SplitReference { order_id, utr }
}

fn extract(parts: &[&str], spec: Option<&PartSpec>) -> Option<String> {
    let spec = spec?;
    let part = parts.get(spec.index)?;
    let cleaned = clean(part, spec.clean_digits_only);
    (!cleaned.is_empty()).then_some(cleaned)
}

fn clean(raw: &str, digits_only: bool) -> String {
    let text = raw.replace('\u{a0}', " ");
    let text = text.trim();
    if digits_only {
        text.chars().filter(char::is_ascii_digit).collect()
    } else {
        text.to_string()
    }
}
