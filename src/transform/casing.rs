use std::{borrow::Cow, fmt, str::FromStr};

/// Capitalization applied to string fields before translation lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Capitalization {
    #[default]
    None,
    Lower,
    Upper,
    Title,
}

impl Capitalization {
    pub fn as_str(self) -> &'static str {
        match self {
            Capitalization::None => "none",
            Capitalization::Lower => "lower",
            Capitalization::Upper => "upper",
            Capitalization::Title => "title",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["lower", "upper", "title"]
    }

    pub fn apply(self, input: &str) -> Cow<'_, str> {
        match self {
            Capitalization::None => Cow::Borrowed(input),
            Capitalization::Lower => lowercase(input),
            Capitalization::Upper => uppercase(input),
            Capitalization::Title => title_case(input),
        }
    }
}

impl fmt::Display for Capitalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capitalization {
    type Err = String;

    /// An empty token means no capitalization.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" | "none" => Ok(Capitalization::None),
            "lower" => Ok(Capitalization::Lower),
            "upper" => Ok(Capitalization::Upper),
            "title" => Ok(Capitalization::Title),
            other => Err(format!(
                "unknown capitalization '{other}', expected one of: {}",
                Capitalization::variants().join(", ")
            )),
        }
    }
}

/// Returns a lowercase representation, reusing the original string if already lowercase.
pub fn lowercase(input: &str) -> Cow<'_, str> {
    if input.chars().all(|ch| !ch.is_uppercase()) {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(input.to_lowercase())
    }
}

/// Returns an uppercase representation, avoiding allocation when unnecessary.
pub fn uppercase(input: &str) -> Cow<'_, str> {
    if input.chars().all(|ch| !ch.is_lowercase()) {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(input.to_uppercase())
    }
}

/// Upper-cases the first letter of every word and lower-cases the rest.
///
/// Words are runs of alphanumeric characters; an apostrophe inside a word
/// does not start a new one, so `o'neil` becomes `O'neil`.
pub fn title_case(input: &str) -> Cow<'_, str> {
    let mut converted = String::with_capacity(input.len());
    let mut in_word = false;
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if in_word {
                converted.extend(ch.to_lowercase());
            } else {
                converted.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            converted.push(ch);
            in_word = in_word && ch == '\'';
        }
    }
    if converted == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(converted)
    }
}
