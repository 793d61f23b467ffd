// ABOUTME: HTTP backend for the metrics service: fills the statement form and follows the export link.
// ABOUTME: Uses a blocking reqwest client with a cookie store so the export matches the submission.

use reqwest::blocking::{Client, RequestBuilder};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{MetricsService, ServiceError};
use crate::config::Config;

/// Input types that never carry a value in a plain form submission.
const SKIPPED_INPUT_TYPES: &[&str] = &[
    "submit", "button", "reset", "image", "file", "checkbox", "radio",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

impl From<Option<&str>> for FormMethod {
    fn from(method: Option<&str>) -> Self {
        match method.map(|m| m.trim().to_lowercase()) {
            Some(m) if m == "get" => FormMethod::Get,
            _ => FormMethod::Post,
        }
    }
}

/// A resolved request: where to send which fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRequest {
    pub method: FormMethod,
    pub url: Url,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct ResultPage {
    url: Url,
    html: String,
}

/// Submits statements through the service's HTML form.
#[derive(Debug)]
pub struct HttpMetricsService {
    client: Client,
    page_url: Url,
    text_control: String,
    export_control: String,
    result: Option<ResultPage>,
}

impl HttpMetricsService {
    pub fn new(
        client: Client,
        page_url: &str,
        text_control: impl Into<String>,
        export_control: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let page_url = Url::parse(page_url).map_err(|e| ServiceError::InvalidUrl {
            url: page_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            page_url,
            text_control: text_control.into(),
            export_control: export_control.into(),
            result: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .cookie_store(true)
            .build()?;
        Self::new(
            client,
            &config.service_url,
            config.text_control.as_str(),
            config.export_control.as_str(),
        )
    }

    fn send(&self, request: FormRequest) -> Result<reqwest::blocking::Response, ServiceError> {
        let builder: RequestBuilder = match request.method {
            FormMethod::Get => self.client.get(request.url).query(&request.fields),
            FormMethod::Post => self.client.post(request.url).form(&request.fields),
        };
        Ok(builder.send()?.error_for_status()?)
    }
}

impl MetricsService for HttpMetricsService {
    fn submit(&mut self, text: &str) -> Result<(), ServiceError> {
        self.result = None;

        let response = self
            .client
            .get(self.page_url.clone())
            .send()?
            .error_for_status()?;
        let page_url = response.url().clone();
        let html = response.text()?;

        let request = build_text_submission(&html, &page_url, &self.text_control, text)?;
        tracing::debug!(url = %request.url, method = ?request.method, "submitting statement");

        let response = self.send(request)?;
        let url = response.url().clone();
        let html = response.text()?;
        self.result = Some(ResultPage { url, html });
        Ok(())
    }

    fn fetch_result(&mut self) -> Result<Vec<u8>, ServiceError> {
        let page = self.result.as_ref().ok_or(ServiceError::NotSubmitted)?;
        let request = build_export_request(&page.html, &page.url, &self.export_control)?;
        tracing::debug!(url = %request.url, "downloading metrics");
        let response = self.send(request)?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Finds the element whose `id` attribute equals `id`.
fn element_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse("[id]").ok()?;
    document
        .select(&selector)
        .find(|element| element.value().id() == Some(id))
}

fn enclosing_form<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "form")
}

fn resolve(base: &Url, target: &str) -> Result<Url, ServiceError> {
    base.join(target.trim()).map_err(|e| ServiceError::InvalidUrl {
        url: target.to_string(),
        reason: e.to_string(),
    })
}

/// Where a form submits to; an empty `action` means the page itself.
fn form_action(form: &ElementRef<'_>, page_url: &Url) -> Result<Url, ServiceError> {
    match form.value().attr("action").map(str::trim) {
        Some(action) if !action.is_empty() => resolve(page_url, action),
        _ => Ok(page_url.clone()),
    }
}

/// Named, valued controls of `form`, in document order, except `skip`.
fn form_fields(form: &ElementRef<'_>, skip: Option<&ElementRef<'_>>) -> Vec<(String, String)> {
    let Ok(selector) = Selector::parse("input[name], textarea[name], select[name]") else {
        return Vec::new();
    };

    let mut fields = Vec::new();
    for control in form.select(&selector) {
        if skip.is_some_and(|s| s.id() == control.id()) {
            continue;
        }
        let element = control.value();
        let Some(name) = element.attr("name") else {
            continue;
        };
        let value = match element.name() {
            "input" => {
                let kind = element.attr("type").unwrap_or("text").to_lowercase();
                if SKIPPED_INPUT_TYPES.contains(&kind.as_str()) {
                    continue;
                }
                element.attr("value").unwrap_or_default().to_string()
            }
            "textarea" => control.text().collect::<String>(),
            _ => first_option_value(&control),
        };
        fields.push((name.to_string(), value));
    }
    fields
}

fn first_option_value(select: &ElementRef<'_>) -> String {
    let Ok(selector) = Selector::parse("option") else {
        return String::new();
    };
    let mut options = select.select(&selector);
    let chosen = select
        .select(&selector)
        .find(|o| o.value().attr("selected").is_some())
        .or_else(|| options.next());
    chosen
        .map(|o| {
            o.value()
                .attr("value")
                .map(str::to_string)
                .unwrap_or_else(|| o.text().collect())
        })
        .unwrap_or_default()
}

/// Builds the request that submits `text` through the form holding the
/// text control.
pub fn build_text_submission(
    html: &str,
    page_url: &Url,
    control_id: &str,
    text: &str,
) -> Result<FormRequest, ServiceError> {
    let document = Html::parse_document(html);
    let control = element_by_id(&document, control_id)
        .ok_or_else(|| ServiceError::missing_control(control_id, page_url.as_str()))?;
    let name = control.value().attr("name").unwrap_or(control_id).to_string();

    let (method, url, mut fields) = match enclosing_form(&control) {
        Some(form) => (
            FormMethod::from(form.value().attr("method")),
            form_action(&form, page_url)?,
            form_fields(&form, Some(&control)),
        ),
        None => (FormMethod::Post, page_url.clone(), Vec::new()),
    };
    fields.insert(0, (name, text.to_string()));

    Ok(FormRequest {
        method,
        url,
        fields,
    })
}

/// Builds the request behind the export control of a result page.
pub fn build_export_request(
    html: &str,
    page_url: &Url,
    control_id: &str,
) -> Result<FormRequest, ServiceError> {
    let document = Html::parse_document(html);
    let control = element_by_id(&document, control_id)
        .ok_or_else(|| ServiceError::missing_control(control_id, page_url.as_str()))?;
    let element = control.value();

    for attr in ["href", "formaction", "data-url", "data-href"] {
        if let Some(target) = element.attr(attr).map(str::trim) {
            if target.is_empty() || target.starts_with('#') || target.starts_with("javascript:") {
                continue;
            }
            let method = if attr == "formaction" {
                FormMethod::from(element.attr("formmethod"))
            } else {
                FormMethod::Get
            };
            let fields = match (attr, enclosing_form(&control)) {
                ("formaction", Some(form)) => form_fields(&form, None),
                _ => Vec::new(),
            };
            return Ok(FormRequest {
                method,
                url: resolve(page_url, target)?,
                fields,
            });
        }
    }

    if let Some(form) = enclosing_form(&control) {
        let mut fields = form_fields(&form, None);
        if let (Some(name), Some(value)) = (element.attr("name"), element.attr("value")) {
            fields.push((name.to_string(), value.to_string()));
        }
        return Ok(FormRequest {
            method: FormMethod::from(form.value().attr("method")),
            url: form_action(&form, page_url)?,
            fields,
        });
    }

    Err(ServiceError::UnresolvableExport {
        control: control_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page_url() -> Url {
        Url::parse("http://metrics.example.org/cohmetrixport").unwrap()
    }

    #[test]
    fn test_text_submission_uses_enclosing_form() {
        let html = r#"<html><body>
            <form action="/cohmetrixport/analyze" method="POST">
                <input type="hidden" name="csrf" value="abc123">
                <textarea id="text" name="content">old text</textarea>
                <select name="lang"><option value="pt">pt</option><option value="en" selected>en</option></select>
                <input type="checkbox" name="extra" value="1">
                <input type="submit" name="go" value="Analisar">
            </form>
        </body></html>"#;
        let request = build_text_submission(html, &page_url(), "text", "leia dois números").unwrap();
        assert_eq!(request.method, FormMethod::Post);
        assert_eq!(request.url.as_str(), "http://metrics.example.org/cohmetrixport/analyze");
        assert_eq!(
            request.fields,
            vec![
                ("content".to_string(), "leia dois números".to_string()),
                ("csrf".to_string(), "abc123".to_string()),
                ("lang".to_string(), "en".to_string()),
            ]
        );
    }

    #[test]
    fn test_text_submission_without_form_posts_to_page() {
        let html = r#"<textarea id="text"></textarea>"#;
        let request = build_text_submission(html, &page_url(), "text", "abc").unwrap();
        assert_eq!(request.method, FormMethod::Post);
        assert_eq!(request.url, page_url());
        assert_eq!(request.fields, vec![("text".to_string(), "abc".to_string())]);
    }

    #[test]
    fn test_missing_text_control() {
        let err = build_text_submission("<p>manutenção</p>", &page_url(), "text", "abc").unwrap_err();
        assert!(err.is_missing_control());
        assert!(err.to_string().contains("'#text'"), "{}", err);
    }

    #[test]
    fn test_export_link() {
        let html = r#"<a id="export" href="export?format=csv">Exportar</a>"#;
        let request = build_export_request(html, &page_url(), "export").unwrap();
        assert_eq!(request.method, FormMethod::Get);
        assert_eq!(request.url.as_str(), "http://metrics.example.org/export?format=csv");
        assert!(request.fields.is_empty());
    }

    #[test]
    fn test_export_button_in_form() {
        let html = r#"<form action="/download" method="post">
            <input type="hidden" name="result" value="r-42">
            <button id="export" name="action" value="csv">Exportar</button>
        </form>"#;
        let request = build_export_request(html, &page_url(), "export").unwrap();
        assert_eq!(request.method, FormMethod::Post);
        assert_eq!(request.url.as_str(), "http://metrics.example.org/download");
        assert_eq!(
            request.fields,
            vec![
                ("result".to_string(), "r-42".to_string()),
                ("action".to_string(), "csv".to_string()),
            ]
        );
    }

    #[test]
    fn test_export_without_target() {
        let html = r#"<button id="export" onclick="download()">Exportar</button>"#;
        let err = build_export_request(html, &page_url(), "export").unwrap_err();
        assert!(matches!(err, ServiceError::UnresolvableExport { .. }));

        let err = build_export_request("<p>sem resultado</p>", &page_url(), "export").unwrap_err();
        assert!(err.is_missing_control());
    }
}
