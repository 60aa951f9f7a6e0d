pub mod client;
pub mod form;
pub mod oauth;
pub mod template;
pub mod workflow;

pub use client::{FormsApiClient, FormsApiConfig, FORMS_BODY_SCOPE};
pub use form::{items_to_batch_requests, GoogleForm};
pub use oauth::GoogleAuthenticator;
pub use template::FormTemplate;
pub use workflow::{create_from_template, create_practice_form, pull_form_json, PRACTICE_FORM_TITLE};
