use odk_model::{FormSchema, Label};

/// Picks the display text of labels for the export language.
///
/// The target language wins when a label carries it. Otherwise the form's
/// default language is used if the label has it, else the first language in
/// sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelResolver {
    language: Option<String>,
    default_language: Option<String>,
}

impl LabelResolver {
    pub fn new(form: &FormSchema, target_language: Option<&str>) -> Self {
        Self {
            language: target_language.map(str::to_string),
            default_language: form.default_language.clone(),
        }
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Resolved label text; `None` when missing or empty.
    pub fn resolve(&self, label: Option<&Label>) -> Option<String> {
        let text = match label? {
            Label::Text(text) => text.as_str(),
            Label::Translations(map) => {
                let default = self
                    .default_language
                    .as_deref()
                    .and_then(|lang| map.get(lang))
                    .or_else(|| map.values().next());
                self.language
                    .as_deref()
                    .and_then(|lang| map.get(lang))
                    .or(default)?
                    .as_str()
            }
        };
        (!text.is_empty()).then(|| text.to_string())
    }
}
