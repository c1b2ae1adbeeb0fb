//! Event-to-text rendering in LINE and YAML styles.
//!
//! Both styles produce text that a generic YAML reader accepts: LINE output
//! is one sequence of `{log, children}` mappings, YAML output is a stream of
//! documents, one per root event. The [`Transition`] chosen by the tracker
//! decides whether an entry opens a new `children` block.

mod line;
mod scalar;
mod yaml;

use std::fmt::Write as _;
use std::sync::LazyLock;

use nrt_logging_config::{LogElement, LogStyle, Settings, defaults};
use regex::Regex;

use crate::error::{LogError, Result};
use crate::event::LogEvent;
use crate::tracker::Transition;

/// `$name$` placeholders in a line template.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_]+)\$")
        .expect("template placeholder regex is a compile-time constant and must be valid")
});

/// Everything a handler needs to turn an event into text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub style: LogStyle,
    pub date_format: String,
    pub line_template: String,
    pub yaml_elements: Vec<LogElement>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            style: defaults::style(),
            date_format: defaults::date_format(),
            line_template: defaults::log_line_template(),
            yaml_elements: defaults::log_yaml_elements(),
        }
    }
}

impl From<&Settings> for RenderSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            style: settings.style,
            date_format: settings.date_format.clone(),
            line_template: settings.log_line_template.clone(),
            yaml_elements: settings.log_yaml_elements.clone(),
        }
    }
}

impl RenderSettings {
    /// Render `event` at `transition`, using `message` in place of the
    /// event's own text (the handler may append a debug trailer).
    pub fn render(&self, event: &LogEvent, message: &str, transition: &Transition) -> Result<String> {
        let fields = Fields {
            event,
            message,
            date_format: &self.date_format,
        };
        match self.style {
            LogStyle::Line => {
                let text = self.substitute(&fields)?;
                line::render(&text, transition)
            }
            LogStyle::Yaml => yaml::render(&self.yaml_elements, &fields, transition),
        }
    }

    /// Substitute every known placeholder of the line template in one pass.
    /// Unknown placeholders are kept verbatim.
    fn substitute(&self, fields: &Fields<'_>) -> Result<String> {
        let mut out = String::with_capacity(self.line_template.len() + fields.message.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(&self.line_template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&self.line_template[last..whole.start()]);
            match name.as_str().parse::<LogElement>() {
                Ok(element) => out.push_str(&fields.value(element)?),
                Err(_) => out.push_str(whole.as_str()),
            }
            last = whole.end();
        }
        out.push_str(&self.line_template[last..]);
        Ok(out)
    }
}

/// Element values of one event.
pub(crate) struct Fields<'a> {
    event: &'a LogEvent,
    message: &'a str,
    date_format: &'a str,
}

impl Fields<'_> {
    fn value(&self, element: LogElement) -> Result<String> {
        Ok(match element {
            LogElement::Date => {
                let mut date = String::new();
                write!(date, "{}", self.event.timestamp.format(self.date_format)).map_err(|_| {
                    LogError::Internal(format!("date format [{}] failed to render", self.date_format))
                })?;
                date
            }
            LogElement::LogLevel => self.event.level.name().to_string(),
            LogElement::Path => self.event.chain.frame.path(),
            LogElement::Method => self.event.chain.frame.method().to_string(),
            LogElement::LineNumber => self.event.line.to_string(),
            LogElement::Message => self.message.to_string(),
        })
    }
}
