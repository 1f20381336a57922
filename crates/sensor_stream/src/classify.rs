use crate::schema::FieldSchema;

/// Outcome of classifying a single device line. Every line maps to exactly
/// one variant.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LineClass {
    Header,
    Noise,
    Candidate,
    Unrecognized,
}

/// Case-insensitive substrings that mark a line as device chatter (status,
/// boot banners, errors, command echoes) no matter how numeric it looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseDenylist {
    keywords: Vec<String>,
}

impl NoiseDenylist {
    pub const DEFAULT_KEYWORDS: &'static [&'static str] = &[
        "hello",
        "error",
        "system",
        "baud",
        "find",
        "sensor",
        "connection",
        "boot",
        "rudder",
        "propeller",
        "zero",
        "unknown",
        "command",
    ];

    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        Self {
            keywords: normalized,
        }
    }

    /// An empty denylist; every line falls through to the shape checks.
    pub fn empty() -> Self {
        Self {
            keywords: Vec::new(),
        }
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> + '_ {
        self.keywords.iter().map(String::as_str)
    }

    /// `lowered` must already be lowercase.
    fn matches_lowered(&self, lowered: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()))
    }

    pub fn matches(&self, line: &str) -> bool {
        self.matches_lowered(&line.to_lowercase())
    }
}

impl Default for NoiseDenylist {
    fn default() -> Self {
        Self::new(Self::DEFAULT_KEYWORDS)
    }
}

/// Width band and numeric density a line must meet to be a candidate record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeTolerance {
    pub min_parts: usize,
    pub max_parts: usize,
    pub min_numeric_ratio: f64,
}

impl Default for ShapeTolerance {
    fn default() -> Self {
        Self {
            min_parts: 15,
            max_parts: 25,
            min_numeric_ratio: 0.8,
        }
    }
}

pub(crate) fn is_control(ch: char) -> bool {
    matches!(ch, '\u{00}'..='\u{1f}' | '\u{7f}'..='\u{9f}')
}

/// Removes C0/C1 control characters and surrounding whitespace.
pub fn clean_line(line: &str) -> String {
    let stripped: String = line.chars().filter(|ch| !is_control(*ch)).collect();
    stripped.trim().to_string()
}

pub fn is_numeric(token: &str) -> bool {
    token.trim().parse::<f64>().is_ok()
}

pub(crate) fn split_parts(cleaned: &str, delimiter: char) -> Vec<&str> {
    cleaned.split(delimiter).map(str::trim).collect()
}

/// Stateless line classifier built from a schema, a denylist and a shape
/// tolerance.
#[derive(Debug, Clone)]
pub struct Classifier {
    marker: String,
    delimiter: char,
    denylist: NoiseDenylist,
    tolerance: ShapeTolerance,
}

impl Classifier {
    pub fn new(schema: &FieldSchema, denylist: NoiseDenylist, tolerance: ShapeTolerance) -> Self {
        Self {
            marker: schema.marker().to_string(),
            delimiter: schema.delimiter(),
            denylist,
            tolerance,
        }
    }

    pub fn denylist(&self) -> &NoiseDenylist {
        &self.denylist
    }

    pub fn tolerance(&self) -> ShapeTolerance {
        self.tolerance
    }

    pub fn classify(&self, line: &str) -> LineClass {
        self.classify_cleaned(&clean_line(line))
    }

    /// Classifies a line that already went through [`clean_line`].
    pub(crate) fn classify_cleaned(&self, cleaned: &str) -> LineClass {
        if cleaned.contains(self.marker.as_str()) {
            return LineClass::Header;
        }
        if self.denylist.matches_lowered(&cleaned.to_lowercase()) {
            return LineClass::Noise;
        }

        let parts = split_parts(cleaned, self.delimiter);
        let part_count = parts.len();
        if part_count < self.tolerance.min_parts || part_count > self.tolerance.max_parts {
            return LineClass::Unrecognized;
        }

        let numeric = parts.iter().filter(|part| is_numeric(part)).count();
        if (numeric as f64) >= (part_count as f64) * self.tolerance.min_numeric_ratio {
            LineClass::Candidate
        } else {
            LineClass::Unrecognized
        }
    }
}
