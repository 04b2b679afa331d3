use lazy_static::lazy_static;
use regex::Regex;

/// Default value pre-filled by the order form.
pub const PLACEHOLDER_PHONE: &str = "010-1234-5678";

lazy_static! {
    static ref MOBILE_FORMATTED_REGEX: Regex = Regex::new(r"^010-\d{4}-\d{4}$").unwrap();
    static ref MOBILE_DIGITS_REGEX: Regex = Regex::new(r"^010\d{8}$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhonePattern {
    Placeholder,
    MobileFormatted,
    MobileDigits,
    Other,
}

impl PhonePattern {
    pub fn label(&self) -> &'static str {
        match self {
            PhonePattern::Placeholder => "form placeholder",
            PhonePattern::MobileFormatted => "mobile, 010-XXXX-XXXX",
            PhonePattern::MobileDigits => "mobile, digits only",
            PhonePattern::Other => "unrecognised format",
        }
    }

    pub fn is_suspicious(&self) -> bool {
        matches!(self, PhonePattern::Placeholder | PhonePattern::Other)
    }
}

pub fn classify(phone: &str) -> PhonePattern {
    let phone = phone.trim();

    if phone == PLACEHOLDER_PHONE {
        PhonePattern::Placeholder
    } else if MOBILE_FORMATTED_REGEX.is_match(phone) {
        PhonePattern::MobileFormatted
    } else if MOBILE_DIGITS_REGEX.is_match(phone) {
        PhonePattern::MobileDigits
    } else {
        PhonePattern::Other
    }
}
