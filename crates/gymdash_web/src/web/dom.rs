//! The content container: mounting fragments, reading their controls into a
//! form and writing session state back into them.

use gymdash::config_sync::CONFIG_SELECT_ID;
use gymdash::form::{Control, Field, Form, SelectOption, ToggleGroup};
use gymdash::logs::LOG_CAPACITY;
use gymdash::shell::FragmentHost;
use gymdash::ui_model::Page;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, HtmlElement, HtmlInputElement, HtmlOptionElement,
    HtmlSelectElement, HtmlTextAreaElement,
};

use crate::events::{shader_id, Target, SHADER_ALL_ID, TOKEN_INPUT_ID};
use crate::scan::{
    build_form, ControlKind, ScannedControl, CALLBACK_CHECKBOX, FILTER_KEYS_DROPDOWN_ID,
    FILTER_KEY_CHECKBOX, SELECT_ALL_KEYS_ID, WRAPPER_CHECKBOX,
};
use crate::snapshot::{LogDelta, Snapshot};

pub(super) const CONTENT_ID: &str = "dynamic-content";
pub(super) const LOGS_ID: &str = "training-logs";
const CREDENTIALS_WARNING_ID: &str = "credentials-warning";
const CREDENTIALS_SUCCESS_ID: &str = "credentials-success";

fn document() -> Option<Document> {
    web_sys::window()?.document()
}

fn by_id(id: &str) -> Option<Element> {
    document()?.get_element_by_id(id)
}

fn elements(root: &Element, selector: &str) -> Vec<Element> {
    let Ok(list) = root.query_selector_all(selector) else {
        tracing::warn!(selector, "invalid selector");
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

fn classes(element: &Element) -> Vec<String> {
    let list = element.class_list();
    (0..list.length()).filter_map(|i| list.item(i)).collect()
}

fn non_empty(text: String) -> Option<String> {
    Some(text).filter(|t| !t.is_empty())
}

/// Mounts fragments into the `#dynamic-content` container.
#[derive(Debug, Default)]
pub(super) struct DomHost;

impl FragmentHost for DomHost {
    fn mount(&mut self, page: Page, html: &str) -> Form {
        let Some(container) = by_id(CONTENT_ID) else {
            tracing::error!("content container missing");
            return Form::new();
        };
        container.set_inner_html(html);
        let controls: Vec<ScannedControl> = elements(&container, "input, select, textarea")
            .iter()
            .filter_map(scan)
            .collect();
        tracing::debug!(page = page.label(), controls = controls.len(), "fragment mounted");
        build_form(controls)
    }

    fn show_error(&mut self, text: &str) {
        let Some(container) = by_id(CONTENT_ID) else {
            return;
        };
        container.set_inner_html("");
        let Some(doc) = document() else { return };
        if let Ok(p) = doc.create_element("p") {
            p.set_class_name("error");
            p.set_text_content(Some(text));
            let _ = container.append_child(&p);
        }
    }
}

fn scan(element: &Element) -> Option<ScannedControl> {
    let (kind, value, checked, disabled) = if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        let kind = match input.type_().as_str() {
            "checkbox" => ControlKind::Checkbox,
            "number" | "range" => ControlKind::Number,
            "text" | "password" | "email" | "search" | "url" | "" => ControlKind::Text,
            _ => ControlKind::Other,
        };
        (kind, input.value(), input.checked(), input.disabled())
    } else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
        let options = select_options(select);
        (ControlKind::Select(options), select.value(), false, select.disabled())
    } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
        (ControlKind::Text, area.value(), false, area.disabled())
    } else {
        return None;
    };

    Some(ScannedControl {
        kind,
        name: element.get_attribute("name").and_then(non_empty),
        id: non_empty(element.id()),
        value,
        checked,
        disabled,
        classes: classes(element),
    })
}

fn select_options(select: &HtmlSelectElement) -> Vec<SelectOption> {
    (0..select.length())
        .filter_map(|i| select.item(i))
        .filter_map(|e| e.dyn_into::<HtmlOptionElement>().ok())
        .map(|o| SelectOption {
            value: o.value(),
            label: o.text(),
            disabled: o.disabled(),
        })
        .collect()
}

fn fill_select(select: &HtmlSelectElement, options: &[SelectOption], value: &str) {
    if select_options(select) != options {
        select.set_inner_html("");
        let Some(doc) = document() else { return };
        for option in options {
            let Ok(element) = doc.create_element("option") else {
                continue;
            };
            let Ok(element) = element.dyn_into::<HtmlOptionElement>() else {
                continue;
            };
            element.set_value(&option.value);
            element.set_text(&option.label);
            element.set_disabled(option.disabled);
            let _ = select.append_child(&element);
        }
    }
    if select.value() != value {
        select.set_value(value);
    }
}

fn set_checked(element: &Element, checked: bool) {
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        if input.checked() != checked {
            input.set_checked(checked);
        }
    }
}

fn set_text(element: &Element, value: &str) {
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        if input.value() != value {
            input.set_value(value);
        }
    } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
        if area.value() != value {
            area.set_value(value);
        }
    }
}

fn element_for(container: &Element, field: &Field) -> Option<Element> {
    if let Some(id) = &field.id {
        return by_id(id);
    }
    let name = field.name.as_ref()?;
    container
        .query_selector(&format!("[name=\"{name}\"]"))
        .ok()
        .flatten()
}

/// Writes the form back into the mounted controls.
pub(super) fn render_form(form: &Form) {
    let Some(container) = by_id(CONTENT_ID) else {
        return;
    };
    for field in form.fields() {
        let Some(element) = element_for(&container, field) else {
            continue;
        };
        match &field.control {
            Control::Select { options, value } => {
                if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
                    fill_select(select, options, value);
                }
            }
            Control::Text(value) | Control::Number(value) => set_text(&element, value),
            Control::Checkbox(checked) => set_checked(&element, *checked),
        }
    }

    for (class, group) in [
        (WRAPPER_CHECKBOX, ToggleGroup::Wrappers),
        (CALLBACK_CHECKBOX, ToggleGroup::Callbacks),
    ] {
        for element in elements(&container, &format!("input.{class}")) {
            let Some(input) = element.dyn_ref::<HtmlInputElement>() else {
                continue;
            };
            let value = input.value();
            if let Some(toggle) = form
                .toggles()
                .iter()
                .find(|t| t.group == group && t.value == value)
            {
                set_checked(&element, toggle.checked);
            }
        }
    }

    render_filter_keys(form);
}

fn render_filter_keys(form: &Form) {
    let Some(dropdown) = by_id(FILTER_KEYS_DROPDOWN_ID) else {
        return;
    };
    let checklist = form.filter_keys();
    let rendered: Vec<String> = elements(&dropdown, &format!("input.{FILTER_KEY_CHECKBOX}"))
        .iter()
        .filter_map(|e| e.dyn_ref::<HtmlInputElement>().map(HtmlInputElement::value))
        .collect();
    let keys: Vec<&str> = checklist.entries().iter().map(|e| e.key.as_str()).collect();
    if rendered != keys {
        rebuild_filter_keys(&dropdown, &keys);
    }

    for element in elements(&dropdown, &format!("input.{FILTER_KEY_CHECKBOX}")) {
        let Some(input) = element.dyn_ref::<HtmlInputElement>() else {
            continue;
        };
        let value = input.value();
        if let Some(entry) = checklist.entries().iter().find(|e| e.key == value) {
            set_checked(&element, entry.checked);
        }
    }
    if let Some(all) = by_id(SELECT_ALL_KEYS_ID) {
        set_checked(&all, checklist.select_all_checked());
    }
    if let Some(Ok(Some(button))) = document().map(|d| d.query_selector(".dropdown-toggle")) {
        button.set_inner_html(&format!(
            "{} <i class=\"fas fa-chevron-down\"></i>",
            checklist.label()
        ));
    }
}

fn checkbox_item(doc: &Document, input_setup: impl FnOnce(&HtmlInputElement), text: &str) -> Option<Element> {
    let item = doc.create_element("div").ok()?;
    item.set_class_name("dropdown-item");
    let label = doc.create_element("label").ok()?;
    let input = doc.create_element("input").ok()?.dyn_into::<HtmlInputElement>().ok()?;
    input.set_type("checkbox");
    input_setup(&input);
    label.append_child(&input).ok()?;
    label
        .append_child(&doc.create_text_node(&format!(" {text}")))
        .ok()?;
    item.append_child(&label).ok()?;
    Some(item)
}

fn rebuild_filter_keys(dropdown: &Element, keys: &[&str]) {
    let Some(doc) = document() else { return };
    dropdown.set_inner_html("");
    let select_all = checkbox_item(&doc, |input| input.set_id(SELECT_ALL_KEYS_ID), "Select All");
    if let Some(item) = select_all {
        let _ = dropdown.append_child(&item);
    }
    for key in keys {
        let item = checkbox_item(
            &doc,
            |input| {
                input.set_class_name(FILTER_KEY_CHECKBOX);
                input.set_name("wrapper_settings[filter_keys][]");
                input.set_value(key);
            },
            key,
        );
        if let Some(item) = item {
            let _ = dropdown.append_child(&item);
        }
    }
}

fn set_display(id: &str, visible: bool) {
    let Some(element) = by_id(id).and_then(|e| e.dyn_into::<HtmlElement>().ok()) else {
        return;
    };
    let _ = element
        .style()
        .set_property("display", if visible { "block" } else { "none" });
}

/// Writes the parts of the session that live inside the fragment but are
/// not form fields: selector, shader switches, credential banners.
pub(super) fn render_page(snapshot: &Snapshot) {
    if let Some(select) = by_id(CONFIG_SELECT_ID).and_then(|e| e.dyn_into::<HtmlSelectElement>().ok()) {
        fill_select(&select, &snapshot.selector, &snapshot.selected);
    }
    for (key, enabled) in &snapshot.shaders {
        if let Some(element) = by_id(&shader_id(key)) {
            set_checked(&element, *enabled);
        }
    }
    if let Some(element) = by_id(SHADER_ALL_ID) {
        set_checked(&element, snapshot.shader_all);
    }
    set_display(CREDENTIALS_WARNING_ID, snapshot.credentials_warning);
    set_display(CREDENTIALS_SUCCESS_ID, snapshot.credentials_success);

    if let Some(doc) = document() {
        if doc.title() != snapshot.header.title {
            doc.set_title(snapshot.header.title);
        }
    }
}

/// Appends streamed lines to the log pane, keeping it bounded.
pub(super) fn append_logs(delta: LogDelta) {
    let Some(pane) = by_id(LOGS_ID) else { return };
    let Some(doc) = document() else { return };
    for line in &delta.append {
        if let Ok(entry) = doc.create_element("div") {
            entry.set_text_content(Some(line));
            let _ = pane.append_child(&entry);
        }
    }
    while pane.child_element_count() as usize > LOG_CAPACITY {
        match pane.first_element_child() {
            Some(first) => first.remove(),
            None => break,
        }
    }
    if delta.scroll {
        pane.set_scroll_top(pane.scroll_height());
    }
}

pub(super) fn token_value() -> String {
    by_id(TOKEN_INPUT_ID)
        .and_then(|e| e.dyn_into::<HtmlInputElement>().ok())
        .map(|input| input.value())
        .unwrap_or_default()
}

/// Reads the event target. `closest` picks the control when the click landed
/// on an icon inside it.
pub(super) fn target_of(ev: &Event, closest: Option<&str>) -> Option<Target> {
    let element: Element = ev.target()?.dyn_into().ok()?;
    let element = match closest {
        Some(selector) => element.closest(selector).ok().flatten()?,
        None => element,
    };

    let (value, checkbox, checked) = if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        (input.value(), input.type_() == "checkbox", input.checked())
    } else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
        (select.value(), false, false)
    } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
        (area.value(), false, false)
    } else {
        (String::new(), false, false)
    };

    Some(Target {
        id: non_empty(element.id()),
        name: element.get_attribute("name").and_then(non_empty),
        classes: classes(&element),
        value,
        checkbox,
        checked,
        tooltip_key: element.get_attribute("data-tooltip-key"),
    })
}

/// Scroll position of the log pane, if the event came from it.
pub(super) fn log_scroll(ev: &Event) -> Option<(i32, i32, i32)> {
    let element: Element = ev.target()?.dyn_into().ok()?;
    (element.id() == LOGS_ID).then(|| {
        (
            element.scroll_height(),
            element.scroll_top(),
            element.client_height(),
        )
    })
}
