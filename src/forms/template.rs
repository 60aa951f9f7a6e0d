use crate::forms::form::items_to_batch_requests;
use crate::utils::error::{OpsError, Result};
use serde_json::{json, Value};
use std::path::Path;

/// 表單範本：標題加上 batchUpdate 的 requests
///
/// 範本檔格式：
/// ```json
/// {"title_header": {"info": {"title": "..."}}, "form_body": {"requests": [...]}}
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FormTemplate {
    pub title: String,
    pub batch_update: Value,
}

impl FormTemplate {
    pub fn new(title: impl Into<String>, batch_update: Option<Value>) -> Self {
        Self {
            title: title.into(),
            batch_update: batch_update.unwrap_or_else(|| json!({"requests": []})),
        }
    }

    pub fn from_value(data: &Value) -> Option<Self> {
        let title = data
            .get("title_header")?
            .get("info")?
            .get("title")?
            .as_str()?;

        let batch_update = match data.get("form_body") {
            Some(body) if body.get("requests").is_some() => body.clone(),
            _ => json!({"requests": []}),
        };

        Some(Self::new(title, Some(batch_update)))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P, key: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let obj: Value = serde_json::from_str(&content)?;

        let payload = match key {
            Some(key) => obj.get(key).ok_or_else(|| OpsError::ConfigError {
                message: format!("Template key '{}' not found in {}", key, path.display()),
            })?,
            None => &obj,
        };

        Self::from_value(payload).ok_or_else(|| OpsError::ValidationError {
            message: format!(
                "{} has no title_header.info.title, not a form template",
                path.display()
            ),
        })
    }

    /// 把從 API 取回的表單 JSON 轉回範本，方便複製既有的表單
    pub fn from_form_json(form: &Value) -> Result<Self> {
        let info = &form["info"];
        let title = info["title"]
            .as_str()
            .or_else(|| info["documentTitle"].as_str())
            .ok_or_else(|| OpsError::ValidationError {
                message: "Form JSON has no info.title".to_string(),
            })?;

        let mut requests = Vec::new();
        if let Some(description) = info["description"].as_str() {
            requests.push(json!({
                "updateFormInfo": {
                    "info": {"description": description},
                    "updateMask": "description"
                }
            }));
        }
        if let Some(items) = form["items"].as_array() {
            requests.extend(items_to_batch_requests(items));
        }

        Ok(Self::new(title, Some(json!({ "requests": requests }))))
    }

    pub fn requests(&self) -> &[Value] {
        self.batch_update["requests"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn to_value(&self) -> Value {
        json!({
            "title_header": {"info": {"title": self.title}},
            "form_body": self.batch_update,
        })
    }
}

impl std::fmt::Display for FormTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FormTemplate(title={}, requests={})",
            self.title,
            self.requests().len()
        )
    }
}
