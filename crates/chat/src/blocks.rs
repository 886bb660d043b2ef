use std::collections::BTreeMap;

use linkbot_core::DomainRef;
use serde::Serialize;

pub const SHORTEN_MODAL_CALLBACK_ID: &str = "shorturl_modal";
pub const SUBMIT_ACTION_ID: &str = "a_shorten_submit";

pub const URL_BLOCK_ID: &str = "b_long_url";
pub const URL_ACTION_ID: &str = "a_long_url";
pub const DOMAIN_BLOCK_ID: &str = "b_domain";
pub const DOMAIN_ACTION_ID: &str = "a_domain";
pub const MASKED_BLOCK_ID: &str = "b_masked";
pub const MASKED_ACTION_ID: &str = "a_masked";
pub const EXPIRES_BLOCK_ID: &str = "b_expires";
pub const EXPIRES_ACTION_ID: &str = "a_expires";
pub const PASSWORD_BLOCK_ID: &str = "b_password";
pub const PASSWORD_ACTION_ID: &str = "a_password";

/// Validation messages keyed by input block id.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub text: TextObject,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { text: TextObject::plain(label), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    PlainTextInput {
        #[serde(rename = "onAction")]
        on_action: String,
        initial_value: String,
        placeholder: TextObject,
    },
    StaticSelectMenu {
        #[serde(rename = "onAction")]
        on_action: String,
        placeholder: TextObject,
        options: Vec<SelectOption>,
        #[serde(skip_serializing_if = "Option::is_none")]
        initial_option: Option<SelectOption>,
    },
    Checkboxes {
        #[serde(rename = "onAction")]
        on_action: String,
        options: Vec<SelectOption>,
    },
    DatePicker {
        #[serde(rename = "onAction")]
        on_action: String,
        placeholder: TextObject,
    },
    Button {
        #[serde(rename = "onAction")]
        on_action: String,
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        text: TextObject,
    },
    Input {
        #[serde(rename = "blockId")]
        block_id: String,
        label: TextObject,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        optional: bool,
        #[serde(rename = "validationError", skip_serializing_if = "Option::is_none")]
        validation_error: Option<String>,
        element: Element,
    },
    Actions {
        elements: Vec<Element>,
    },
}

impl Block {
    pub fn block_id(&self) -> Option<&str> {
        match self {
            Self::Input { block_id, .. } => Some(block_id),
            Self::Section { .. } | Self::Actions { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalView {
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    pub view_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "callbackId")]
    pub callback_id: String,
    pub title: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<TextObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close: Option<TextObject>,
    #[serde(rename = "notifyOnClose")]
    pub notify_on_close: bool,
    pub blocks: Vec<Block>,
}

impl ModalView {
    /// Targets an already open view so the platform replaces it in place.
    pub fn with_view_id(mut self, view_id: impl Into<String>) -> Self {
        self.view_id = Some(view_id.into());
        self
    }

    pub fn input_block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.block_id() == Some(block_id))
    }
}

pub struct ModalBuilder {
    view: ModalView,
}

impl ModalBuilder {
    pub fn new(callback_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            view: ModalView {
                view_id: None,
                kind: "MODAL",
                callback_id: callback_id.into(),
                title: TextObject::plain(title),
                submit: None,
                close: None,
                notify_on_close: false,
                blocks: Vec::new(),
            },
        }
    }

    pub fn submit(mut self, label: impl Into<String>) -> Self {
        self.view.submit = Some(TextObject::plain(label));
        self
    }

    pub fn close(mut self, label: impl Into<String>) -> Self {
        self.view.close = Some(TextObject::plain(label));
        self
    }

    pub fn section(mut self, text: impl Into<String>) -> Self {
        self.view.blocks.push(Block::Section { text: TextObject::plain(text) });
        self
    }

    pub fn input<F>(
        mut self,
        block_id: impl Into<String>,
        label: impl Into<String>,
        element: Element,
        build: F,
    ) -> Self
    where
        F: FnOnce(&mut InputBuilder),
    {
        let mut builder = InputBuilder::default();
        build(&mut builder);
        self.view.blocks.push(Block::Input {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            optional: builder.optional,
            validation_error: builder.validation_error,
            element,
        });
        self
    }

    pub fn actions(mut self, elements: Vec<Element>) -> Self {
        self.view.blocks.push(Block::Actions { elements });
        self
    }

    pub fn build(self) -> ModalView {
        self.view
    }
}

#[derive(Default)]
pub struct InputBuilder {
    optional: bool,
    validation_error: Option<String>,
}

impl InputBuilder {
    pub fn optional(&mut self) -> &mut Self {
        self.optional = true;
        self
    }

    pub fn validation_error(&mut self, message: Option<&String>) -> &mut Self {
        self.validation_error = message.cloned();
        self
    }
}

/// Inputs for rendering the shorten form.
#[derive(Clone, Debug, Default)]
pub struct ShortenModalParams<'a> {
    pub initial_url: Option<&'a str>,
    pub errors: Option<&'a FieldErrors>,
    pub domains: &'a [DomainRef],
    pub selected_domain_id: Option<&'a str>,
}

/// The shorten form. The domain dropdown is only rendered when domains are known; it
/// pre-selects `selected_domain_id`, falling back to the first domain.
pub fn shorten_modal(params: ShortenModalParams<'_>) -> ModalView {
    let error_for = |block_id: &str| params.errors.and_then(|errors| errors.get(block_id));

    let mut builder = ModalBuilder::new(SHORTEN_MODAL_CALLBACK_ID, "Shorten URL")
        .close("Close")
        .input(
            URL_BLOCK_ID,
            "URL",
            Element::PlainTextInput {
                on_action: URL_ACTION_ID.to_owned(),
                initial_value: params.initial_url.unwrap_or_default().to_owned(),
                placeholder: TextObject::plain("https://example.com"),
            },
            |input| {
                input.validation_error(error_for(URL_BLOCK_ID));
            },
        );

    if !params.domains.is_empty() {
        let options: Vec<SelectOption> = params
            .domains
            .iter()
            .map(|domain| SelectOption::new(domain.label(), domain.id.as_str()))
            .collect();
        let default_id = params
            .selected_domain_id
            .or_else(|| params.domains.first().map(|domain| domain.id.as_str()));
        let initial_option =
            default_id.and_then(|id| options.iter().find(|option| option.value == id).cloned());

        builder = builder.input(
            DOMAIN_BLOCK_ID,
            "Domain",
            Element::StaticSelectMenu {
                on_action: DOMAIN_ACTION_ID.to_owned(),
                placeholder: TextObject::plain("Select domain"),
                options,
                initial_option,
            },
            |_| {},
        );
    }

    builder
        .input(
            MASKED_BLOCK_ID,
            "Enable link masking",
            Element::Checkboxes {
                on_action: MASKED_ACTION_ID.to_owned(),
                options: vec![SelectOption::new("Hide link destination from visitors", "true")],
            },
            |input| {
                input.optional();
            },
        )
        .input(
            EXPIRES_BLOCK_ID,
            "Expiration (optional)",
            Element::DatePicker {
                on_action: EXPIRES_ACTION_ID.to_owned(),
                placeholder: TextObject::plain("Select expiration date"),
            },
            |input| {
                input.optional();
            },
        )
        .input(
            PASSWORD_BLOCK_ID,
            "Password (optional)",
            Element::PlainTextInput {
                on_action: PASSWORD_ACTION_ID.to_owned(),
                initial_value: String::new(),
                placeholder: TextObject::plain("password"),
            },
            |input| {
                input.optional().validation_error(error_for(PASSWORD_BLOCK_ID));
            },
        )
        .actions(vec![Element::Button {
            on_action: SUBMIT_ACTION_ID.to_owned(),
            text: TextObject::plain("Shorten"),
            style: Some(ButtonStyle::Primary),
        }])
        .build()
}

pub fn success_modal(short_url: &str) -> ModalView {
    ModalBuilder::new(SHORTEN_MODAL_CALLBACK_ID, "Done!")
        .submit("Close")
        .section(format!("Your shortened URL:\n\n{short_url}"))
        .build()
}
