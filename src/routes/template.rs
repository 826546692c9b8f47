/// Characters permitted inside a single route segment matched by `**`:
/// letters, digits, `-`, `_`, `.`.
pub fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// One segment of a whitelist template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    Literal(String),
    /// `**`: one or more `is_segment_char` characters within a single segment.
    Wildcard,
}

/// A whitelist entry, parsed once at startup. The set of templates never
/// mutates at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    raw: String,
    segments: Vec<TemplateSegment>,
}

/// A malformed whitelist entry. Raised while the route table is built at
/// startup, never at request time.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("route template is empty")]
    Empty,
    #[error("route template '{0}' contains an empty segment")]
    EmptySegment(String),
    #[error("route template '{0}': segment '{1}' mixes '**' with other characters")]
    MixedWildcard(String, String),
    #[error("route template '{0}': segment '{1}' contains invalid characters")]
    InvalidSegment(String, String),
}

impl RouteTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        if raw.is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut segments = Vec::new();
        for part in raw.split('/') {
            if part.is_empty() {
                return Err(TemplateError::EmptySegment(raw.to_string()));
            }
            if part == "**" {
                segments.push(TemplateSegment::Wildcard);
            } else if part.contains('*') {
                return Err(TemplateError::MixedWildcard(raw.to_string(), part.to_string()));
            } else if part.chars().all(is_segment_char) {
                segments.push(TemplateSegment::Literal(part.to_string()));
            } else {
                return Err(TemplateError::InvalidSegment(raw.to_string(), part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, TemplateSegment::Literal(_)))
    }

    /// First segment when it is a literal; wildcard-first templates go into
    /// the matcher's catch-all bucket.
    pub fn first_literal_segment(&self) -> Option<&str> {
        match self.segments.first() {
            Some(TemplateSegment::Literal(l)) => Some(l.as_str()),
            _ => None,
        }
    }
}
