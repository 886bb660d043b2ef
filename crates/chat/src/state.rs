//! Readers for submitted modal state and validation of the shorten form.
//!
//! Modal state arrives as `{"values": {block_id: {action_id: field}}}` where the field shape
//! depends on the element type. Every reader tolerates missing or malformed state.

use chrono::{DateTime, Utc};
use linkbot_core::{expiry_end_of_day, ShortenRequest};
use serde_json::Value;

use crate::blocks::{
    FieldErrors, EXPIRES_ACTION_ID, EXPIRES_BLOCK_ID, MASKED_ACTION_ID, MASKED_BLOCK_ID,
    PASSWORD_ACTION_ID, PASSWORD_BLOCK_ID, URL_ACTION_ID, URL_BLOCK_ID,
};
use crate::input::normalize_http_url;

const PASSWORD_MIN_CHARS: usize = 3;
const PASSWORD_MAX_CHARS: usize = 64;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModalViewState(Option<Value>);

impl ModalViewState {
    pub fn new(state: Value) -> Self {
        Self(Some(state))
    }

    pub fn empty() -> Self {
        Self(None)
    }

    fn field(&self, block_id: &str, action_id: &str) -> Option<&Value> {
        self.0
            .as_ref()?
            .get("values")?
            .get(block_id)?
            .get(action_id)
            .filter(|field| field.is_object())
    }

    /// Trimmed text input value, empty when absent.
    pub fn read_input(&self, block_id: &str, action_id: &str) -> String {
        self.field(block_id, action_id)
            .and_then(|field| field.get("value"))
            .and_then(Value::as_str)
            .map(|value| value.trim().to_owned())
            .unwrap_or_default()
    }

    /// First selected checkbox option interpreted as a boolean.
    pub fn read_checkbox(&self, block_id: &str, action_id: &str) -> bool {
        let Some(field) = self.field(block_id, action_id) else {
            return false;
        };

        let first_selected = ["selected_options", "values"]
            .iter()
            .find_map(|key| {
                field.get(*key).and_then(Value::as_array).and_then(|items| items.first())
            });
        let raw = match first_selected {
            Some(Value::Object(option)) => option.get("value"),
            Some(other) => Some(other),
            None => field.get("value"),
        };

        match raw {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Selected date as the last second of that day in UTC.
    pub fn read_datepicker(&self, block_id: &str, action_id: &str) -> Option<DateTime<Utc>> {
        let field = self.field(block_id, action_id)?;
        let raw = ["selected_date", "selectedDate", "value"]
            .iter()
            .find_map(|key| field.get(*key).and_then(Value::as_str))?;
        expiry_end_of_day(raw)
    }

    pub fn read_static_select(&self, block_id: &str, action_id: &str) -> Option<String> {
        let field = self.field(block_id, action_id)?;
        let selected = ["selected_option", "selectedOption"]
            .iter()
            .find_map(|key| {
                field.get(*key).and_then(|option| option.get("value")).and_then(Value::as_str)
            });
        selected
            .or_else(|| field.get("value").and_then(Value::as_str))
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    }
}

/// Validates the shorten form, returning the request or per-block error messages.
pub fn validate_shorten_form(state: &ModalViewState) -> Result<ShortenRequest, FieldErrors> {
    let mut errors = FieldErrors::new();

    let raw_url = state.read_input(URL_BLOCK_ID, URL_ACTION_ID);
    let long_url = if raw_url.is_empty() {
        errors.insert(URL_BLOCK_ID.to_owned(), "URL is required.".to_owned());
        None
    } else {
        match normalize_http_url(&raw_url) {
            Ok(url) => Some(url),
            Err(error) => {
                errors.insert(URL_BLOCK_ID.to_owned(), format!("Invalid URL: {error}"));
                None
            }
        }
    };

    let masked = state.read_checkbox(MASKED_BLOCK_ID, MASKED_ACTION_ID);
    let expires_at = state.read_datepicker(EXPIRES_BLOCK_ID, EXPIRES_ACTION_ID);

    let raw_password = state.read_input(PASSWORD_BLOCK_ID, PASSWORD_ACTION_ID);
    let password = (!raw_password.is_empty()).then_some(raw_password);
    if let Some(message) = password.as_deref().and_then(password_error) {
        errors.insert(PASSWORD_BLOCK_ID.to_owned(), message.to_owned());
    }

    match long_url {
        Some(long_url) if errors.is_empty() => Ok(ShortenRequest {
            long_url,
            masked,
            expires_at,
            password,
            default_redirect_url: None,
        }),
        _ => Err(errors),
    }
}

/// Whitespace is reported ahead of length problems.
pub fn password_error(password: &str) -> Option<&'static str> {
    let length = password.chars().count();
    if password.chars().any(char::is_whitespace) {
        Some("Password cannot contain spaces.")
    } else if length < PASSWORD_MIN_CHARS {
        Some("Password must be at least 3 characters.")
    } else if length > PASSWORD_MAX_CHARS {
        Some("Password must be at most 64 characters.")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{validate_shorten_form, ModalViewState};

    fn state(values: serde_json::Value) -> ModalViewState {
        ModalViewState::new(json!({ "values": values }))
    }

    #[test]
    fn input_reader_trims_and_tolerates_missing_state() {
        let state = state(json!({"block1": {"action1": {"value": "  trimmed  "}}}));
        assert_eq!(state.read_input("block1", "action1"), "trimmed");
        assert_eq!(state.read_input("block1", "missing"), "");
        assert_eq!(state.read_input("missing", "action1"), "");
        assert_eq!(ModalViewState::empty().read_input("block1", "action1"), "");
    }

    #[test]
    fn checkbox_reader_supports_both_shapes() {
        let checked = state(json!({"b": {"a": {"selected_options": [{"value": "true"}]}}}));
        assert!(checked.read_checkbox("b", "a"));

        let alternate = state(json!({"b": {"a": {"values": [{"value": "TRUE"}]}}}));
        assert!(alternate.read_checkbox("b", "a"));

        let unchecked = state(json!({"b": {"a": {"selected_options": []}}}));
        assert!(!unchecked.read_checkbox("b", "a"));
        assert!(!ModalViewState::empty().read_checkbox("b", "a"));
    }

    #[test]
    fn datepicker_reader_uses_end_of_day_utc() {
        let picked = state(json!({"b": {"a": {"selected_date": "2026-01-30"}}}));
        assert_eq!(
            picked.read_datepicker("b", "a"),
            Utc.with_ymd_and_hms(2026, 1, 30, 23, 59, 59).single()
        );

        let with_time = state(json!({"b": {"a": {"selectedDate": "2026-02-01T08:00:00Z"}}}));
        assert_eq!(
            with_time.read_datepicker("b", "a"),
            Utc.with_ymd_and_hms(2026, 2, 1, 23, 59, 59).single()
        );

        assert_eq!(state(json!({"b": {"a": {}}})).read_datepicker("b", "a"), None);
        assert_eq!(state(json!({"b": {"a": {"value": "soon"}}})).read_datepicker("b", "a"), None);
    }

    #[test]
    fn static_select_reader_handles_absent_selection() {
        let selected = state(json!({"b": {"a": {"selected_option": {"value": "d2"}}}}));
        assert_eq!(selected.read_static_select("b", "a").as_deref(), Some("d2"));

        let cleared = state(json!({"b": {"a": {"selected_option": null}}}));
        assert_eq!(cleared.read_static_select("b", "a"), None);
        assert_eq!(ModalViewState::empty().read_static_select("b", "a"), None);
    }

    #[test]
    fn valid_form_produces_request() {
        let form = state(json!({
            "b_long_url": {"a_long_url": {"value": " example.com/docs "}},
            "b_masked": {"a_masked": {"selected_options": [{"value": "true"}]}},
            "b_expires": {"a_expires": {"selected_date": "2026-03-01"}},
            "b_password": {"a_password": {"value": "hunter2"}}
        }));

        let request = validate_shorten_form(&form).expect("valid form");
        assert_eq!(request.long_url, "https://example.com/docs");
        assert!(request.masked);
        assert_eq!(request.expires_at, Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).single());
        assert_eq!(request.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn missing_url_is_reported() {
        let errors = validate_shorten_form(&state(json!({}))).expect_err("missing url");
        assert_eq!(errors.get("b_long_url").map(String::as_str), Some("URL is required."));
    }

    #[test]
    fn invalid_url_and_password_are_reported_together() {
        let form = state(json!({
            "b_long_url": {"a_long_url": {"value": "ftp://example.com"}},
            "b_password": {"a_password": {"value": "ab"}}
        }));

        let errors = validate_shorten_form(&form).expect_err("invalid form");
        assert_eq!(
            errors.get("b_long_url").map(String::as_str),
            Some("Invalid URL: Only http/https URLs are allowed.")
        );
        assert_eq!(
            errors.get("b_password").map(String::as_str),
            Some("Password must be at least 3 characters.")
        );
    }

    #[test]
    fn password_rules_cover_whitespace_and_length() {
        let with_password = |password: &str| {
            state(json!({
                "b_long_url": {"a_long_url": {"value": "https://a.io"}},
                "b_password": {"a_password": {"value": password}}
            }))
        };

        let spaced = validate_shorten_form(&with_password("two words")).expect_err("spaces");
        assert_eq!(spaced["b_password"], "Password cannot contain spaces.");

        let long = validate_shorten_form(&with_password(&"x".repeat(65))).expect_err("too long");
        assert_eq!(long["b_password"], "Password must be at most 64 characters.");

        assert!(validate_shorten_form(&with_password(&"x".repeat(64))).is_ok());
        assert!(validate_shorten_form(&with_password("   ")).is_ok());
    }
}
