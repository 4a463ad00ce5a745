//! Applies commands to elements
//!
//! A render works on a copy of the element with every backed-up original
//! restored and the toggle markers cleared, so rendering the same element
//! again with new data starts from the template and not from the last result.
//! Immediate actions mutate the copy; `remove`, `event` and `call` run once
//! the copy has replaced the element.

pub mod dispatch;
pub mod element;

pub use dispatch::{Callback, Callbacks, Detail, DispatchError, Dispatcher, RecordedEvent};
pub use element::Element;

use std::fmt::Write;

use crate::config::EngineConfig;
use crate::error::ParseError;
use crate::parser::{Action, Command};
use crate::value::{Context, Value};

/// Outcome of rendering one element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    /// Commands that were applied
    pub applied: usize,
    /// Commands skipped for a false guard or a null value
    pub skipped: usize,
    /// Instructions that failed to parse; their siblings still ran
    pub errors: Vec<ParseError>,
    pub dispatch_errors: Vec<DispatchError>,
}

impl RenderReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.dispatch_errors.is_empty()
    }
}

/// Text a value renders as; `null` and `false` render empty
fn display_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        other => other.to_string(),
    }
}

/// Attributes whose placeholders may arrive percent-encoded
const ENCODED_ATTRIBUTES: [&str; 2] = ["href", "src"];

/// Percent-encode everything except the characters `encodeURIComponent`
/// leaves alone
fn encode_component(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

/// Substitute the first `${variable}` placeholder of `template`, or replace
/// the whole template when it has none. In `href` and `src` the placeholder
/// may be percent-encoded, and then the value is encoded too.
fn substitute(
    template: &str,
    variable: Option<&str>,
    value: &str,
    attribute: Option<&str>,
) -> String {
    if let Some(variable) = variable {
        let placeholder = format!("${{{}}}", variable);
        if template.contains(&placeholder) {
            return template.replacen(&placeholder, value, 1);
        }
        if attribute.is_some_and(|name| ENCODED_ATTRIBUTES.contains(&name)) {
            let encoded = encode_component(&placeholder);
            if template.contains(&encoded) {
                return template.replacen(&encoded, &encode_component(value), 1);
            }
        }
    }
    value.to_string()
}

fn has_placeholder(template: &str) -> bool {
    template.contains("${") || template.contains("%24%7B")
}

/// What an `option` submits: its `value` attribute, or its text
fn option_value(option: &Element) -> &str {
    option.attribute("value").unwrap_or(option.content())
}

/// Split a class parameter on spaces, commas and dots
fn class_names(param: &str) -> impl Iterator<Item = &str> {
    param
        .split(|c: char| c == ' ' || c == ',' || c == '.')
        .filter(|name| !name.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct Projector {
    config: EngineConfig,
}

impl Projector {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Render the instructions in the element's instruction attribute
    pub fn render(
        &self,
        element: &mut Element,
        context: &Context,
        dispatcher: &mut dyn Dispatcher,
    ) -> RenderReport {
        let Some(source) = element
            .attribute(&self.config.attributes.instruction)
            .map(str::to_string)
        else {
            return RenderReport::default();
        };

        let commands = crate::prepare_each(&source, context);
        self.apply(element, commands, context, dispatcher)
    }

    /// Apply already parsed commands to the element
    pub fn apply(
        &self,
        element: &mut Element,
        commands: Vec<Result<Command, ParseError>>,
        context: &Context,
        dispatcher: &mut dyn Dispatcher,
    ) -> RenderReport {
        let mut report = RenderReport::default();
        let mut proto = self.restore(element);
        let mut later = Vec::new();

        for command in commands {
            let command = match command {
                Ok(command) => command,
                Err(err) => {
                    log::error!("{}", err);
                    report.errors.push(err);
                    continue;
                }
            };
            if !command.condition {
                report.skipped += 1;
                continue;
            }
            if command.value.is_null() {
                log::warn!("value of '{}' is null, skipping the instruction", command);
                report.skipped += 1;
                continue;
            }

            report.applied += 1;
            if command.action.is_deferred() {
                later.push(command);
            } else {
                self.apply_immediate(&mut proto, &command);
            }
        }

        *element = proto;

        for command in later {
            if element.is_removed() {
                log::warn!("element was removed before '{}' ran", command);
            }
            if let Err(err) = self.apply_deferred(element, &command, context, dispatcher) {
                log::error!("{}", err);
                report.dispatch_errors.push(err);
            }
        }
        report
    }

    /// Copy of the element with backed-up originals restored and toggle
    /// markers removed
    fn restore(&self, element: &Element) -> Element {
        let mut proto = element.clone();
        let prefix = &self.config.attributes.backup_prefix;
        for (name, original) in element.attributes() {
            let Some(rest) = name.strip_prefix(prefix.as_str()) else {
                continue;
            };
            match rest.strip_prefix('-') {
                Some(attribute) if !attribute.is_empty() => {
                    proto.set_attribute(attribute, original.clone())
                }
                _ if rest.is_empty() => proto.set_text(original.clone()),
                _ => {}
            }
        }
        proto.remove_class(&self.config.markers.visible);
        proto.remove_class(&self.config.markers.hidden);
        proto
    }

    /// Keep the original `template` in a backup attribute the first time a
    /// placeholder in it gets replaced
    fn backup(&self, proto: &mut Element, param: Option<&str>, template: &str, result: &str) {
        let backup = self.config.backup_attribute(param);
        if template != result
            && !template.is_empty()
            && has_placeholder(template)
            && !proto.has_attribute(&backup)
        {
            proto.set_attribute(backup, template);
        }
    }

    fn apply_immediate(&self, proto: &mut Element, command: &Command) {
        match command.action {
            Action::Attr => {
                let Some(name) = command.parameter.as_deref() else {
                    log::warn!("'{}' has no attribute name", command);
                    return;
                };
                match command.value {
                    Value::Bool(true) => proto.set_attribute(name, name),
                    Value::Bool(false) => {
                        proto.remove_attribute(name);
                    }
                    ref value => {
                        let template = proto.attribute(name).unwrap_or_default().to_string();
                        let result = substitute(
                            &template,
                            command.variable.as_deref(),
                            &value.to_string(),
                            Some(name),
                        );
                        self.backup(proto, Some(name), &template, &result);
                        proto.set_attribute(name, result);
                    }
                }
            }
            Action::Text => {
                let template = proto.content().to_string();
                let result = substitute(
                    &template,
                    command.variable.as_deref(),
                    &display_text(&command.value),
                    None,
                );
                self.backup(proto, None, &template, &result);
                proto.set_text(result);
            }
            Action::Html => proto.set_html(command.value.to_string()),
            Action::Value => {
                if proto.is_checkable() {
                    let checked = match &command.value {
                        Value::Bool(b) => *b,
                        other => proto.attribute("value") == Some(other.to_string().as_str()),
                    };
                    if checked {
                        proto.set_attribute("checked", "checked");
                    } else {
                        proto.remove_attribute("checked");
                    }
                } else if proto.tag().eq_ignore_ascii_case("select") {
                    let wanted = command.value.to_string();
                    for option in proto
                        .children_mut()
                        .iter_mut()
                        .filter(|child| child.tag().eq_ignore_ascii_case("option"))
                    {
                        if option_value(option) == wanted {
                            option.set_attribute("selected", "selected");
                        } else {
                            option.remove_attribute("selected");
                        }
                    }
                } else if proto.tag().eq_ignore_ascii_case("textarea") {
                    proto.set_text(command.value.to_string());
                } else {
                    proto.set_attribute("value", command.value.to_string());
                }
            }
            Action::Class => {
                let Some(param) = command.parameter.as_deref() else {
                    log::warn!("'{}' has no class name", command);
                    return;
                };
                for name in class_names(param) {
                    let (name, state) = match name.strip_prefix('!') {
                        Some(inverted) => (inverted, !command.value_as_bool),
                        None => (name, command.value_as_bool),
                    };
                    if state {
                        proto.add_class(name);
                    } else {
                        proto.remove_class(name);
                    }
                }
            }
            Action::Toggle => {
                let markers = &self.config.markers;
                if proto.has_class(&markers.hidden) {
                    return;
                }
                if command.value_as_bool {
                    proto.add_class(&markers.visible);
                } else {
                    proto.remove_class(&markers.visible);
                    proto.add_class(&markers.hidden);
                }
            }
            Action::Debugger => {
                if command.value_as_bool {
                    log::debug!("debugger: {}", command);
                }
            }
            Action::Remove | Action::Event | Action::Call => {}
        }
    }

    fn apply_deferred(
        &self,
        element: &mut Element,
        command: &Command,
        context: &Context,
        dispatcher: &mut dyn Dispatcher,
    ) -> Result<(), DispatchError> {
        let detail = Detail {
            value: &command.value,
            data: context.data(),
            arguments: &command.arguments,
        };
        match command.action {
            Action::Remove => {
                if command.value_as_bool {
                    element.mark_removed();
                }
                Ok(())
            }
            Action::Event => match command.parameter.as_deref() {
                Some(name) => dispatcher.dispatch_event(element, name, detail),
                None => {
                    log::warn!("'{}' has no event name", command);
                    Ok(())
                }
            },
            Action::Call => {
                let name = command.parameter.as_deref().unwrap_or_default();
                dispatcher.invoke(element, name, detail)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(element: &mut Element, data: serde_json::Value) -> RenderReport {
        let data = Value::from(data);
        let ctx = Context::new(&data);
        let mut callbacks = Callbacks::new();
        Projector::default().render(element, &ctx, &mut callbacks)
    }

    fn with_instructions(tag: &str, instructions: &str) -> Element {
        Element::new(tag).with_attribute("z-var", instructions)
    }

    #[test]
    fn test_substitute() {
        assert_eq!(substitute("Hi ${name}!", Some("name"), "Ann", None), "Hi Ann!");
        assert_eq!(substitute("${a} ${a}", Some("a"), "x", None), "x ${a}");
        assert_eq!(substitute("plain", Some("name"), "Ann", None), "Ann");
        assert_eq!(substitute("Hi ${name}!", None, "Ann", None), "Ann");
    }

    #[test]
    fn test_encoded_placeholder_in_links() {
        assert_eq!(encode_component("${user.id}"), "%24%7Buser.id%7D");
        assert_eq!(
            substitute("/u/%24%7Bid%7D", Some("id"), "a b/c", Some("href")),
            "/u/a%20b%2Fc"
        );
        assert_eq!(
            substitute("/u/%24%7Bid%7D", Some("id"), "7", Some("title")),
            "7"
        );

        let mut element = with_instructions("img", "photo.name @src")
            .with_attribute("src", "/img/%24%7Bphoto.name%7D.png");
        render(&mut element, json!({"photo": {"name": "café"}}));
        assert_eq!(element.attribute("src"), Some("/img/caf%C3%A9.png"));
        assert_eq!(
            element.attribute("z-var-content-src"),
            Some("/img/%24%7Bphoto.name%7D.png")
        );

        render(&mut element, json!({"photo": {"name": "tea"}}));
        assert_eq!(element.attribute("src"), Some("/img/tea.png"));
    }

    #[test]
    fn test_select_marks_matching_option() {
        let mut select = with_instructions("select", "size =")
            .with_child(Element::new("option").with_attribute("value", "s").with_text("Small"))
            .with_child(Element::new("option").with_text("m"))
            .with_child(
                Element::new("option")
                    .with_attribute("value", "l")
                    .with_attribute("selected", "selected"),
            );
        render(&mut select, json!({"size": "m"}));
        let selected: Vec<bool> = select
            .children()
            .iter()
            .map(|option| option.has_attribute("selected"))
            .collect();
        assert_eq!(selected, vec![false, true, false]);

        render(&mut select, json!({"size": "s"}));
        assert!(select.children()[0].has_attribute("selected"));
        assert!(!select.children()[1].has_attribute("selected"));
    }

    #[test]
    fn test_text_with_placeholder_is_backed_up() {
        let mut element = with_instructions("p", "user.name .").with_text("Hi ${user.name}!");
        render(&mut element, json!({"user": {"name": "Ann"}}));
        assert_eq!(element.content(), "Hi Ann!");
        assert_eq!(element.attribute("z-var-content"), Some("Hi ${user.name}!"));

        render(&mut element, json!({"user": {"name": "Bob"}}));
        assert_eq!(element.content(), "Hi Bob!");
    }

    #[test]
    fn test_attr_values() {
        let mut element = with_instructions("a", "url @href, hidden @hidden, busy @aria-busy")
            .with_attribute("href", "/users/${url}")
            .with_attribute("aria-busy", "true");
        render(
            &mut element,
            json!({"url": "ann", "hidden": true, "busy": false}),
        );
        assert_eq!(element.attribute("href"), Some("/users/ann"));
        assert_eq!(element.attribute("hidden"), Some("hidden"));
        assert_eq!(element.attribute("aria-busy"), None);
        assert_eq!(element.attribute("z-var-content-href"), Some("/users/${url}"));
    }

    #[test]
    fn test_class_with_inversion() {
        let mut element = with_instructions("li", "done class 'done !open'")
            .with_attribute("class", "item open");
        render(&mut element, json!({"done": true}));
        assert_eq!(element.classes(), vec!["item", "done"]);

        render(&mut element, json!({"done": false}));
        assert_eq!(element.classes(), vec!["item", "open"]);
    }

    #[test]
    fn test_toggle_stays_hidden() {
        let mut element = with_instructions("div", "a ?, b ?");
        render(&mut element, json!({"a": false, "b": true}));
        assert!(element.has_class("z-template-hidden"));
        assert!(!element.has_class("z-template-visible"));

        render(&mut element, json!({"a": true, "b": true}));
        assert!(element.has_class("z-template-visible"));
        assert!(!element.has_class("z-template-hidden"));
    }

    #[test]
    fn test_value_on_form_controls() {
        let mut checkbox =
            with_instructions("input", "agreed =").with_attribute("type", "checkbox");
        render(&mut checkbox, json!({"agreed": true}));
        assert_eq!(checkbox.attribute("checked"), Some("checked"));

        let mut radio = with_instructions("input", "size =")
            .with_attribute("type", "radio")
            .with_attribute("value", "m");
        render(&mut radio, json!({"size": "l"}));
        assert_eq!(radio.attribute("checked"), None);

        let mut area = with_instructions("textarea", "note =");
        render(&mut area, json!({"note": "hello"}));
        assert_eq!(area.content(), "hello");

        let mut input = with_instructions("input", "qty =");
        render(&mut input, json!({"qty": 4}));
        assert_eq!(input.attribute("value"), Some("4"));
    }

    #[test]
    fn test_html() {
        let mut element = with_instructions("div", "body +");
        render(&mut element, json!({"body": "<b>hi</b>"}));
        assert!(element.is_html());
        assert_eq!(element.content(), "<b>hi</b>");
    }

    #[test]
    fn test_guard_and_null_skip() {
        let mut element = with_instructions("p", "name . {show}, missing @title").with_text("orig");
        let report = render(&mut element, json!({"name": "Ann", "show": false}));
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(element.content(), "orig");
    }

    #[test]
    fn test_parse_errors_do_not_stop_siblings() {
        let mut element = with_instructions("p", "name bogus, name .");
        let report = render(&mut element, json!({"name": "Ann"}));
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(report.errors[0], ParseError::UnknownAction { .. }));
        assert_eq!(report.applied, 1);
        assert_eq!(element.content(), "Ann");
    }

    #[test]
    fn test_remove() {
        let mut element = with_instructions("div", "expired !");
        render(&mut element, json!({"expired": true}));
        assert!(element.is_removed());

        let mut element = with_instructions("div", "!isPaid !");
        render(&mut element, json!({"isPaid": true}));
        assert!(!element.is_removed());
    }

    #[test]
    fn test_event_and_call_are_dispatched() {
        let data = Value::from(json!({"user": {"id": 5}}));
        let ctx = Context::new(&data);
        let mut callbacks = Callbacks::new().with("greet", |element, detail| {
            element.set_attribute("greeted", detail.value.to_string());
            Ok(())
        });
        let mut element = with_instructions(
            "button",
            "user.id :clicked(1, 'two'), user.id *greet, user.id *nobody",
        );
        let report = Projector::default().render(&mut element, &ctx, &mut callbacks);

        assert_eq!(element.attribute("greeted"), Some("5"));
        assert_eq!(callbacks.events().len(), 1);
        assert_eq!(callbacks.events()[0].name, "clicked");
        assert_eq!(
            callbacks.events()[0].arguments,
            vec![Value::Number(1.0), Value::from("two")]
        );
        assert_eq!(
            report.dispatch_errors,
            vec![DispatchError::UnknownCallback {
                name: "nobody".to_string()
            }]
        );
    }

    #[test]
    fn test_custom_markers() {
        let config = EngineConfig::new()
            .with_instruction_attribute("data-bind")
            .with_markers("on", "off");
        let data = Value::from(json!({"ready": false}));
        let ctx = Context::new(&data);
        let mut element = Element::new("div").with_attribute("data-bind", "ready ?");
        Projector::new(config).render(&mut element, &ctx, &mut Callbacks::new());
        assert!(element.has_class("off"));
    }
}
