use std::collections::BTreeMap;

/// Field name -> error message, rendered as `{"errors": {...}}`.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &'static str, ok: bool, rule: &str) -> &mut Self {
        if !ok {
            self.errors
                .entry(field)
                .or_insert_with(|| format!("Invalid {}", rule));
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}

pub fn char_len_between(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    len >= min && len <= max
}

/// Local mobile number: digits only, leading zero, 10 to 12 digits.
pub fn is_phone_number(value: &str) -> bool {
    value.starts_with('0')
        && (10..=12).contains(&value.len())
        && value.bytes().all(|b| b.is_ascii_digit())
}

/// Shape check only: one `@`, something before it, a dotted domain after.
pub fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !value.chars().any(char::is_whitespace)
}
