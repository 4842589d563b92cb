use std::fmt;

/// One way to locate an element in the active document.
///
/// Several strategies for the same logical element form an ordered candidate
/// list; earlier entries are preferred, but any match is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocationStrategy {
    /// Select by exact `id` attribute
    Id(String),
    /// Select by exact `name` attribute
    Name(String),
    /// Select elements of `tag` whose `attribute` contains `value`
    /// (`*` matches any tag). Survives volatile generated suffixes.
    AttributeContains {
        tag: String,
        attribute: String,
        value: String,
    },
    /// Select using a raw CSS selector
    Css(String),
    /// Select using a structural XPath expression
    Path(String),
    /// Select by tag name
    Tag(String),
    /// Represents an invalid selector string, with a reason.
    Invalid(String),
}

/// What must hold for a located element before it is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyCondition {
    /// Attached to the document
    #[default]
    Present,
    /// Attached, displayed and enabled
    Clickable,
}

/// The query language a strategy is translated to for the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Css(String),
    XPath(String),
}

impl LocationStrategy {
    pub fn id(value: impl Into<String>) -> Self {
        LocationStrategy::Id(value.into())
    }

    pub fn name(value: impl Into<String>) -> Self {
        LocationStrategy::Name(value.into())
    }

    pub fn attribute_contains(
        tag: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        LocationStrategy::AttributeContains {
            tag: tag.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn css(value: impl Into<String>) -> Self {
        LocationStrategy::Css(value.into())
    }

    pub fn path(value: impl Into<String>) -> Self {
        LocationStrategy::Path(value.into())
    }

    pub fn tag(value: impl Into<String>) -> Self {
        LocationStrategy::Tag(value.into())
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, LocationStrategy::Invalid(_))
    }

    /// Translate into a CSS or XPath query.
    ///
    /// Identifiers on the target portal contain `$`, which is not valid in a
    /// CSS `#id` shorthand, so ids and names are emitted as quoted attribute
    /// selectors.
    pub fn to_query(&self) -> Option<Query> {
        match self {
            LocationStrategy::Id(id) => Some(Query::Css(format!("[id=\"{}\"]", escape(id)))),
            LocationStrategy::Name(name) => {
                Some(Query::Css(format!("[name=\"{}\"]", escape(name))))
            }
            LocationStrategy::AttributeContains {
                tag,
                attribute,
                value,
            } => {
                let tag = if tag.is_empty() { "*" } else { tag.as_str() };
                Some(Query::Css(format!("{tag}[{attribute}*=\"{}\"]", escape(value))))
            }
            LocationStrategy::Css(css) => Some(Query::Css(css.clone())),
            LocationStrategy::Path(xpath) => Some(Query::XPath(xpath.clone())),
            LocationStrategy::Tag(tag) => Some(Query::Css(tag.clone())),
            LocationStrategy::Invalid(_) => None,
        }
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for LocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationStrategy::Id(id) => write!(f, "id:{id}"),
            LocationStrategy::Name(name) => write!(f, "name:{name}"),
            LocationStrategy::AttributeContains {
                tag,
                attribute,
                value,
            } => write!(f, "attr:{tag}:{attribute}*={value}"),
            LocationStrategy::Css(css) => write!(f, "css:{css}"),
            LocationStrategy::Path(xpath) => write!(f, "xpath:{xpath}"),
            LocationStrategy::Tag(tag) => write!(f, "tag:{tag}"),
            LocationStrategy::Invalid(reason) => write!(f, "invalid:{reason}"),
        }
    }
}

impl From<&str> for LocationStrategy {
    fn from(s: &str) -> Self {
        let s = s.trim();
        let lower = s.to_lowercase();
        match s {
            _ if lower.starts_with("id:") => LocationStrategy::Id(s[3..].to_string()),
            _ if s.starts_with('#') => LocationStrategy::Id(s[1..].to_string()),
            _ if lower.starts_with("name:") => LocationStrategy::Name(s[5..].to_string()),
            _ if lower.starts_with("css:") => LocationStrategy::Css(s[4..].to_string()),
            _ if lower.starts_with("xpath:") => LocationStrategy::Path(s[6..].to_string()),
            _ if s.starts_with('/') || s.starts_with("(/") => {
                LocationStrategy::Path(s.to_string())
            }
            _ if lower.starts_with("tag:") => LocationStrategy::Tag(s[4..].to_string()),
            _ if lower.starts_with("attr:") => parse_attribute_contains(&s[5..]),
            _ => LocationStrategy::Invalid(format!(
                "Unknown selector format: \"{s}\". Use prefixes like 'id:', 'name:', 'css:', 'attr:', 'xpath:' or 'tag:' to specify the strategy."
            )),
        }
    }
}

// attr:<tag>:<attribute>*=<value>, tag may be empty or `*`
fn parse_attribute_contains(rest: &str) -> LocationStrategy {
    let Some((tag, condition)) = rest.split_once(':') else {
        return LocationStrategy::Invalid(format!(
            "Attribute selector '{rest}' must look like 'tag:attribute*=value'"
        ));
    };
    match condition.split_once("*=") {
        Some((attribute, value)) if !attribute.trim().is_empty() && !value.is_empty() => {
            LocationStrategy::AttributeContains {
                tag: tag.trim().to_string(),
                attribute: attribute.trim().to_string(),
                value: value.to_string(),
            }
        }
        _ => LocationStrategy::Invalid(format!(
            "Attribute selector '{rest}' is missing 'attribute*=value'"
        )),
    }
}

impl From<String> for LocationStrategy {
    fn from(s: String) -> Self {
        LocationStrategy::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_strategies_parse() {
        assert_eq!(
            LocationStrategy::from("id:Z_ESS_TIMEREPORTED$2"),
            LocationStrategy::id("Z_ESS_TIMEREPORTED$2")
        );
        assert_eq!(
            LocationStrategy::from("#userid"),
            LocationStrategy::id("userid")
        );
        assert_eq!(
            LocationStrategy::from("name:Submit"),
            LocationStrategy::name("Submit")
        );
        assert_eq!(
            LocationStrategy::from("tag:body"),
            LocationStrategy::tag("body")
        );
        assert_eq!(
            LocationStrategy::from("//div[@role='link']"),
            LocationStrategy::path("//div[@role='link']")
        );
    }

    #[test]
    fn test_attribute_contains_parse() {
        assert_eq!(
            LocationStrategy::from("attr:select:id*=TL_RPTD_TIME_PUNCH_TYPE"),
            LocationStrategy::attribute_contains("select", "id", "TL_RPTD_TIME_PUNCH_TYPE")
        );
        assert!(!LocationStrategy::from("attr:select:id").is_valid());
        assert!(!LocationStrategy::from("attr:nocolon").is_valid());
    }

    #[test]
    fn test_unknown_format_is_invalid() {
        let strategy = LocationStrategy::from("button with text");
        assert!(!strategy.is_valid());
        assert_eq!(strategy.to_query(), None);
    }

    #[test]
    fn test_dollar_ids_become_attribute_css() {
        assert_eq!(
            LocationStrategy::id("TL_RPTD_TIME_PUNCH_TYPE$0").to_query(),
            Some(Query::Css("[id=\"TL_RPTD_TIME_PUNCH_TYPE$0\"]".to_string()))
        );
        assert_eq!(
            LocationStrategy::attribute_contains("", "src", "TL_WEB_CLOCK").to_query(),
            Some(Query::Css("*[src*=\"TL_WEB_CLOCK\"]".to_string()))
        );
    }

    #[test]
    fn test_display_matches_parse_form() {
        let strategy = LocationStrategy::attribute_contains("iframe", "src", "TL_WEB_CLOCK");
        assert_eq!(strategy.to_string(), "attr:iframe:src*=TL_WEB_CLOCK");
        assert_eq!(LocationStrategy::from(strategy.to_string().as_str()), strategy);
    }
}
