use crate::domain::ports::FormsApi;
use crate::forms::template::FormTemplate;
use crate::utils::error::{OpsError, Result};
use serde_json::{json, Value};

/// 伺服器指派的 ID，建立新項目時不能帶上
const SERVER_ASSIGNED_KEYS: [&str; 2] = ["itemId", "questionId"];

fn strip_server_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in SERVER_ASSIGNED_KEYS {
                map.remove(key);
            }
            map.values_mut().for_each(strip_server_ids);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_server_ids),
        _ => {}
    }
}

/// 把既有表單的 items 轉成 batchUpdate 的 createItem requests
///
/// 支援所有題型 (textQuestion、choiceQuestion、dateQuestion、timeQuestion ...)，
/// 內容原樣複製，只移除伺服器指派的 ID，位置依原本順序。
pub fn items_to_batch_requests(items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mut item = item.clone();
            strip_server_ids(&mut item);
            json!({
                "createItem": {
                    "item": item,
                    "location": {"index": index}
                }
            })
        })
        .collect()
}

/// 以範本建立並維護一份 Google 表單
pub struct GoogleForm<C: FormsApi> {
    client: C,
    pub template: FormTemplate,
    pub form_id: Option<String>,
    pub responder_uri: Option<String>,
}

impl<C: FormsApi> GoogleForm<C> {
    pub fn new(client: C, template: FormTemplate) -> Self {
        Self {
            client,
            template,
            form_id: None,
            responder_uri: None,
        }
    }

    fn require_form_id(&self, action: &str) -> Result<&str> {
        self.form_id
            .as_deref()
            .ok_or_else(|| OpsError::ProcessingError {
                message: format!("Could not {}, form not created", action),
            })
    }

    /// 建立表單、套用範本內容，回傳最新的表單 JSON
    pub async fn create_and_apply(&mut self) -> Result<Value> {
        let metadata = self.client.create_form(&self.template.title).await?;
        let form_id = metadata["formId"]
            .as_str()
            .ok_or_else(|| OpsError::ProcessingError {
                message: "Forms API response has no formId".to_string(),
            })?
            .to_string();

        self.responder_uri = metadata["responderUri"].as_str().map(str::to_string);
        self.form_id = Some(form_id.clone());
        tracing::info!("📝 Created form {} ({})", self.template.title, form_id);

        let requests = self.template.requests();
        if !requests.is_empty() {
            tracing::debug!("Applying {} template requests", requests.len());
            self.client
                .batch_update(&form_id, &json!({ "requests": requests }))
                .await?;
        }

        self.client.get_form(&form_id).await
    }

    pub async fn append_items(&self, requests_block: &Value) -> Result<Value> {
        let form_id = self.require_form_id("append")?;
        self.client.batch_update(form_id, requests_block).await
    }

    pub async fn refresh(&self) -> Result<Value> {
        let form_id = self.require_form_id("refresh")?;
        self.client.get_form(form_id).await
    }

    /// 新版 Forms API 建立的表單預設不公開，需要另外發布
    pub async fn publish(&self) -> Result<Value> {
        let form_id = self.require_form_id("publish")?;
        self.client.set_publish_settings(form_id, true).await
    }
}

impl<C: FormsApi> std::fmt::Display for GoogleForm<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "GoogleForm(title={:?}, form_id={})",
            self.template.title,
            self.form_id.as_deref().unwrap_or("None")
        )
    }
}
