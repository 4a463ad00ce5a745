//! Normalised instruction: the action table and the `Command` record

use std::fmt;

use crate::value::Value;

/// Element mutation requested by an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Attr,
    Event,
    Call,
    Class,
    Html,
    Text,
    Value,
    Toggle,
    Remove,
    Debugger,
}

/// Shortcut prefixes. A `*` stands for "followed by at least one character",
/// and those characters become the parameter.
const SHORTCUTS: &[(&str, Action)] = &[
    ("@*", Action::Attr),
    (":*", Action::Event),
    ("**", Action::Call),
    (".*", Action::Class),
    ("+", Action::Html),
    (".", Action::Text),
    ("=", Action::Value),
    ("?", Action::Toggle),
    ("!", Action::Remove),
    ("`", Action::Debugger),
];

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Attr,
        Action::Event,
        Action::Call,
        Action::Class,
        Action::Html,
        Action::Text,
        Action::Value,
        Action::Toggle,
        Action::Remove,
        Action::Debugger,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Action::Attr => "attr",
            Action::Event => "event",
            Action::Call => "call",
            Action::Class => "class",
            Action::Html => "html",
            Action::Text => "text",
            Action::Value => "value",
            Action::Toggle => "toggle",
            Action::Remove => "remove",
            Action::Debugger => "debugger",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.keyword() == word)
    }

    /// Resolve an action word, either a shortcut or a keyword.
    ///
    /// Returns the action and, for shortcuts longer than one character, the
    /// parameter embedded after the prefix (`@title` gives `title`).
    pub fn resolve(word: &str) -> Option<(Action, Option<String>)> {
        let mut chars = word.chars();
        let first = chars.next()?;
        let rest = chars.as_str();
        let pattern = if rest.is_empty() {
            first.to_string()
        } else {
            format!("{}*", first)
        };

        if let Some((_, action)) = SHORTCUTS.iter().find(|(p, _)| *p == pattern) {
            let param = (!rest.is_empty()).then(|| rest.to_string());
            return Some((*action, param));
        }
        Action::from_keyword(word).map(|action| (action, None))
    }

    /// Supported action words, for error messages
    pub fn supported() -> String {
        Action::ALL
            .iter()
            .map(|a| a.keyword())
            .chain(SHORTCUTS.iter().map(|(p, _)| *p))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Only `call` and `event` take a `( … )` argument list
    pub fn accepts_arguments(self) -> bool {
        matches!(self, Action::Call | Action::Event)
    }

    /// Actions applied after all immediate mutations of an element
    pub fn is_deferred(self) -> bool {
        matches!(self, Action::Remove | Action::Event | Action::Call)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// A fully resolved instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Number of leading `!` (0, 1 or 2)
    pub negate_count: u8,
    /// Variable path when the value came from a lookup
    pub variable: Option<String>,
    pub value: Value,
    pub value_as_bool: bool,
    pub action: Action,
    pub parameter: Option<String>,
    pub arguments: Vec<Value>,
    /// Guard result; `true` when the instruction has no `{condition}`
    pub condition: bool,
}

impl Command {
    pub fn new(action: Action, value: Value) -> Self {
        let value_as_bool = value.is_truthy();
        Self {
            negate_count: 0,
            variable: None,
            value,
            value_as_bool,
            action,
            parameter: None,
            arguments: Vec::new(),
            condition: true,
        }
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.action)?;
        if let Some(param) = &self.parameter {
            write!(f, " {}", param)?;
        }
        write!(f, " value=")?;
        match &self.value {
            Value::String(s) => write!(f, "{:?}", s)?,
            other => write!(f, "{}", other)?,
        }
        write!(f, " bool={}", self.value_as_bool)?;
        if let Some(variable) = &self.variable {
            write!(f, " variable={}", variable)?;
        }
        if !self.arguments.is_empty() {
            let args: Vec<String> = self.arguments.iter().map(|a| a.to_string()).collect();
            write!(f, " arguments=[{}]", args.join(", "))?;
        }
        if !self.condition {
            write!(f, " (guard false)")?;
        }
        Ok(())
    }
}
