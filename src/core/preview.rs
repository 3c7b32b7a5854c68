use crate::domain::model::{SendPayload, TemplateInfo};

/// Human-readable rendering of what a recipient would receive.
///
/// Templates are looked up by name in `templates`; `{{n}}` in the body text is
/// replaced by the n-th parameter (1-based). Falls back to `"name (language)"`
/// when the template or its body is unknown.
pub fn render_preview(payload: &SendPayload, templates: &[TemplateInfo]) -> String {
    match payload {
        SendPayload::Text { body } => body.clone(),
        SendPayload::Media { kind, caption, .. } => {
            format!("{} caption: {}", kind, caption.as_deref().unwrap_or(""))
        }
        SendPayload::Template {
            name,
            language,
            parameters,
        } => {
            let fallback = || format!("{} ({})", name, language);

            let candidates: Vec<&TemplateInfo> = templates.iter().filter(|t| &t.name == name).collect();
            // prefer the matching language, otherwise any template with that name
            let template = candidates
                .iter()
                .find(|t| t.language.as_deref() == Some(language.as_str()))
                .or_else(|| candidates.first());

            match template.and_then(|t| t.body_text()) {
                Some(body) if !body.is_empty() => {
                    let mut rendered = body.to_string();
                    for (i, value) in parameters.iter().enumerate() {
                        rendered = rendered.replace(&format!("{{{{{}}}}}", i + 1), value);
                    }
                    rendered
                }
                _ => fallback(),
            }
        }
    }
}
