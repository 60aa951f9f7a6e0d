use crate::domain::ports::FormsApi;
use crate::forms::form::GoogleForm;
use crate::forms::template::FormTemplate;
use crate::utils::error::Result;
use serde_json::Value;
use std::path::Path;

pub const PRACTICE_FORM_TITLE: &str = "Odyssey-Attendance";

/// 建立一份空白的練習出席表單
pub async fn create_practice_form<C: FormsApi>(client: C) -> Result<GoogleForm<C>> {
    create_from_template(client, FormTemplate::new(PRACTICE_FORM_TITLE, None)).await
}

pub async fn create_from_template<C: FormsApi>(
    client: C,
    template: FormTemplate,
) -> Result<GoogleForm<C>> {
    let mut form = GoogleForm::new(client, template);
    form.create_and_apply().await?;

    tracing::info!("✅ Created form: {}", form);
    if let Some(uri) = &form.responder_uri {
        tracing::info!("🔗 Responder URI: {}", uri);
    }
    Ok(form)
}

/// 取回既有表單的 JSON，有給路徑就順便寫檔
pub async fn pull_form_json<C: FormsApi>(
    client: &C,
    form_id: &str,
    output: Option<&Path>,
) -> Result<Value> {
    let form = client.get_form(form_id).await?;

    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&form)?)?;
        tracing::info!("📁 Form {} saved to {}", form_id, path.display());
    }

    Ok(form)
}
