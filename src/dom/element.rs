use indexmap::IndexMap;

/// Tag of an element, with the form-related tags spelled out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Form,
    Fieldset,
    Legend,
    Input,
    Textarea,
    Select,
    /// Any other element (`div`, `label`, ...), kept by tag name.
    Container(String),
}

impl ElementKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "form" => ElementKind::Form,
            "fieldset" => ElementKind::Fieldset,
            "legend" => ElementKind::Legend,
            "input" => ElementKind::Input,
            "textarea" => ElementKind::Textarea,
            "select" => ElementKind::Select,
            other => ElementKind::Container(other.to_string()),
        }
    }

    pub fn tag_name(&self) -> &str {
        match self {
            ElementKind::Form => "form",
            ElementKind::Fieldset => "fieldset",
            ElementKind::Legend => "legend",
            ElementKind::Input => "input",
            ElementKind::Textarea => "textarea",
            ElementKind::Select => "select",
            ElementKind::Container(tag) => tag,
        }
    }

    /// `input`, `textarea` and `select` hold user-editable values.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            ElementKind::Input | ElementKind::Textarea | ElementKind::Select
        )
    }
}

/// An element node: tag, attributes, and the live state an editable control
/// carries next to its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    kind: ElementKind,
    attrs: IndexMap<String, String>,
    value: String,
    checked: bool,
    text: String,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            attrs: IndexMap::new(),
            value: String::new(),
            checked: false,
            text: String::new(),
        }
    }

    pub fn form() -> Self {
        Self::new(ElementKind::Form)
    }

    pub fn fieldset() -> Self {
        Self::new(ElementKind::Fieldset)
    }

    pub fn legend(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Legend).with_text(text)
    }

    /// `<input type=...>`.
    pub fn input(input_type: &str) -> Self {
        Self::new(ElementKind::Input).with_attr("type", input_type)
    }

    pub fn textarea() -> Self {
        Self::new(ElementKind::Textarea)
    }

    pub fn select() -> Self {
        Self::new(ElementKind::Select)
    }

    pub fn container(tag: &str) -> Self {
        Self::new(ElementKind::from_tag(tag))
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with_attr("name", name)
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attr("id", id)
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// Non-empty `name` attribute.
    pub fn name(&self) -> Option<&str> {
        self.attr("name").filter(|n| !n.is_empty())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.set_attr("name", name);
    }

    /// Non-empty `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.is_empty())
    }

    /// Lower-cased `type` of an input, `"text"` when absent.
    pub fn input_type(&self) -> String {
        self.attr("type")
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn is_checkbox(&self) -> bool {
        self.kind == ElementKind::Input && self.input_type() == "checkbox"
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == ElementKind::Input && self.input_type() == "number"
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip_is_case_insensitive() {
        assert_eq!(ElementKind::from_tag("FieldSet"), ElementKind::Fieldset);
        assert_eq!(ElementKind::from_tag("div").tag_name(), "div");
        assert!(ElementKind::from_tag("SELECT").is_editable());
        assert!(!ElementKind::Legend.is_editable());
    }

    #[test]
    fn empty_name_and_id_count_as_missing() {
        let el = Element::input("text").with_name("").with_id("");
        assert_eq!(el.name(), None);
        assert_eq!(el.id(), None);
    }

    #[test]
    fn input_type_defaults_to_text() {
        let el = Element::new(ElementKind::Input);
        assert_eq!(el.input_type(), "text");
        assert!(Element::input("CheckBox").is_checkbox());
        assert!(Element::input("number").is_numeric());
        assert!(!Element::textarea().with_attr("type", "number").is_numeric());
    }
}
