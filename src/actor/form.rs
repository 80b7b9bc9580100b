use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::fmt;

use crate::error::{Error, Result};

static FORM: Lazy<Selector> = Lazy::new(|| Selector::parse("form").unwrap());
static FIELDS: Lazy<Selector> = Lazy::new(|| Selector::parse("input, select, textarea").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

impl fmt::Display for FormMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormMethod::Get => write!(f, "GET"),
            FormMethod::Post => write!(f, "POST"),
        }
    }
}

/// The first form of an unsubscribe page, ready to submit.
#[derive(Clone, Debug, PartialEq)]
pub struct FilledForm {
    pub action: Url,
    pub method: FormMethod,
    pub fields: Vec<(String, String)>,
}

/// Find the first form on `page` and fill it in.
///
/// Checkboxes and radio buttons only count when checked and keep their
/// `value`. Other fields whose name mentions `email` get `email` (or an
/// empty value), every other named field keeps its `value` attribute. A
/// relative action is resolved against `page_url`, a missing one submits to
/// `page_url` itself.
pub fn fill_first_form(page: &str, page_url: &Url, email: Option<&str>) -> Result<Option<FilledForm>> {
    let document = Html::parse_document(page);
    let Some(form) = document.select(&FORM).next() else {
        return Ok(None);
    };

    let action = match form.value().attr("action") {
        Some(action) => page_url
            .join(action.trim())
            .map_err(|e| Error::Parse(format!("form action {action}: {e}")))?,
        None => page_url.clone(),
    };

    let method = match form.value().attr("method") {
        Some(method) if method.eq_ignore_ascii_case("post") => FormMethod::Post,
        _ => FormMethod::Get,
    };

    let mut fields: Vec<(String, String)> = Vec::new();
    for element in form.select(&FIELDS) {
        if let Some((name, value)) = field_value(element, email) {
            // later fields with the same name win, in the position of the first
            match fields.iter_mut().find(|(existing, _)| *existing == name) {
                Some(field) => field.1 = value,
                None => fields.push((name, value)),
            }
        }
    }

    Ok(Some(FilledForm {
        action,
        method,
        fields,
    }))
}

fn field_value(element: ElementRef, email: Option<&str>) -> Option<(String, String)> {
    let field = element.value();
    let name = field.attr("name")?;

    let kind = field.attr("type").unwrap_or_default().to_ascii_lowercase();
    let value = if kind == "checkbox" || kind == "radio" {
        // toggles keep their own value, whatever their name
        field.attr("checked")?;
        field.attr("value").unwrap_or_default()
    } else if name.to_lowercase().contains("email") {
        email.unwrap_or_default()
    } else {
        field.attr("value").unwrap_or_default()
    };

    Some((name.to_owned(), value.to_owned()))
}
