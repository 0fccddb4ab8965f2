/*
 * form.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! HTML form markup builder.
//!
//! Compiled views never produce form markup themselves; they call methods on
//! a host-provided `form` object (`form.start(...)`, `form.input(...)`, ...)
//! and flush it with `form.output()`. [`Form`] is that object on the Rust
//! side. It only concatenates strings: values are written as given, so
//! callers escape anything untrusted before passing it in.

use serde_json::Value;

use crate::error::{ViewError, ViewResult};

static NULL: Value = Value::Null;

/// A single HTML attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// Rendered as `key="value"`.
    Pair(String, String),
    /// Rendered as a bare token, e.g. `required`.
    Flag(String),
}

impl Attribute {
    pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attribute::Pair(key.into(), value.into())
    }

    pub fn flag(token: impl Into<String>) -> Self {
        Attribute::Flag(token.into())
    }
}

/// Accumulating form markup builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    output: String,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// An independent builder with an empty buffer.
    pub fn new_scope(&self) -> Form {
        Form::new()
    }

    pub fn clear(&mut self) {
        self.output.clear();
    }

    /// Return the accumulated markup and clear the buffer.
    pub fn output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Append raw markup.
    pub fn html(&mut self, html: &str) -> &mut Self {
        self.output.push_str(html);
        self
    }

    /// Open a `<form>` tag. An empty `action` is omitted.
    pub fn start(&mut self, action: &str, method: &str, attributes: &[Attribute]) -> &mut Self {
        self.output.push_str("<form");
        if !action.is_empty() {
            self.output.push_str(&format!(" action=\"{action}\""));
        }
        self.output.push_str(&format!(
            " method=\"{method}\"{}>",
            render_attributes(attributes)
        ));
        self
    }

    pub fn end(&mut self) -> &mut Self {
        self.output.push_str("</form>");
        self
    }

    pub fn label(&mut self, text: &str, for_id: &str) -> &mut Self {
        self.output
            .push_str(&format!("<label for=\"{}\">{text}</label>", for_id.trim()));
        self
    }

    /// An `<input>`; an empty `name` is omitted.
    pub fn input(&mut self, name: &str, input_type: &str, attributes: &[Attribute]) -> &mut Self {
        let name = name.trim();
        self.output
            .push_str(&format!("<input type=\"{}\"", input_type.trim()));
        if !name.is_empty() {
            self.output.push_str(&format!(" name=\"{name}\""));
        }
        self.output
            .push_str(&format!("{} />", render_attributes(attributes)));
        self
    }

    pub fn submit(&mut self, value: &str) -> &mut Self {
        self.input("", "submit", &[Attribute::pair("value", value)])
    }

    pub fn button(&mut self, value: &str, attributes: &[Attribute]) -> &mut Self {
        self.output.push_str(&format!(
            "<button{}>{value}</button>",
            render_attributes(attributes)
        ));
        self
    }

    pub fn textarea(&mut self, name: &str, value: &str, attributes: &[Attribute]) -> &mut Self {
        let name = name.trim();
        self.output.push_str("<textarea");
        if !name.is_empty() {
            self.output.push_str(&format!(" name=\"{name}\""));
        }
        self.output.push_str(&format!(
            "{}>{value}</textarea>",
            render_attributes(attributes)
        ));
        self
    }

    /// A `<select>` with one `<option>` per `(value, label)` pair.
    pub fn select(
        &mut self,
        name: &str,
        options: &[(String, String)],
        attributes: &[Attribute],
        selected: Option<&str>,
    ) -> &mut Self {
        self.output.push_str(&format!(
            "<select name=\"{}\"{}>",
            name.trim(),
            render_attributes(attributes)
        ));
        for (value, label) in options {
            let marker = if selected == Some(value.as_str()) {
                " selected"
            } else {
                ""
            };
            self.output
                .push_str(&format!("<option value=\"{value}\"{marker}>{label}</option>"));
        }
        self.output.push_str("</select>");
        self
    }

    /// Invoke a builder method from JSON arguments.
    ///
    /// This is the bridge for executors: a `form.input("email", "email",
    /// {"required": ...})` call in compiled code arrives here as
    /// `dispatch("input", [...])`. Returns the flushed markup for `output`
    /// and `None` for every other method.
    pub fn dispatch(&mut self, method: &str, args: &[Value]) -> ViewResult<Option<String>> {
        let arg = |i: usize| args.get(i).unwrap_or(&NULL);
        match method {
            "start" => {
                let method = match arg(1) {
                    Value::Null => "POST".to_string(),
                    other => scalar(other),
                };
                self.start(&scalar(arg(0)), &method, &attributes(arg(2)));
            }
            "end" => {
                self.end();
            }
            "input" => {
                let input_type = match arg(1) {
                    Value::Null => "text".to_string(),
                    other => scalar(other),
                };
                self.input(&scalar(arg(0)), &input_type, &attributes(arg(2)));
            }
            "textarea" => {
                self.textarea(&scalar(arg(0)), &scalar(arg(1)), &attributes(arg(2)));
            }
            "submit" => {
                let value = match arg(0) {
                    Value::Null => "Submit".to_string(),
                    other => scalar(other),
                };
                self.submit(&value);
            }
            "button" => {
                self.button(&scalar(arg(0)), &attributes(arg(1)));
            }
            "label" => {
                self.label(&scalar(arg(0)), &scalar(arg(1)));
            }
            "select" => {
                let selected = match arg(3) {
                    Value::Null => None,
                    other => Some(scalar(other)),
                };
                self.select(
                    &scalar(arg(0)),
                    &options(arg(1)),
                    &attributes(arg(2)),
                    selected.as_deref(),
                );
            }
            "html" => {
                self.html(&scalar(arg(0)));
            }
            "output" => return Ok(Some(self.output())),
            other => {
                return Err(ViewError::Execution {
                    message: format!("unknown form method \"{other}\""),
                });
            }
        }
        Ok(None)
    }
}

fn render_attributes(attributes: &[Attribute]) -> String {
    if attributes.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = attributes
        .iter()
        .map(|attribute| match attribute {
            Attribute::Pair(key, value) => format!("{key}=\"{value}\""),
            Attribute::Flag(token) => token.clone(),
        })
        .collect();
    format!(" {}", rendered.join(" "))
}

/// Render a JSON scalar the way it would print in markup.
fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Objects become attribute lists (integer keys are flags); arrays are all
/// flags. Keys keep the order the host wrote them in.
fn attributes(value: &Value) -> Vec<Attribute> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                if key.parse::<i64>().is_ok() {
                    Attribute::Flag(scalar(value))
                } else {
                    Attribute::Pair(key.clone(), scalar(value))
                }
            })
            .collect(),
        Value::Array(items) => items.iter().map(|v| Attribute::Flag(scalar(v))).collect(),
        _ => Vec::new(),
    }
}

/// Objects map option values to labels, in host order; arrays use each index
/// as the value.
fn options(value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, label)| (key.clone(), scalar(label)))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, label)| (i.to_string(), scalar(label)))
            .collect(),
        _ => Vec::new(),
    }
}
