//! Structured message templates and buttons

use serde::{Deserialize, Serialize};

/// Template attachment payload, tagged by `template_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "template_type", rename_all = "snake_case")]
pub enum Template {
    Generic {
        elements: Vec<GenericElement>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_aspect_ratio: Option<ImageAspectRatio>,
    },
    Button {
        text: String,
        buttons: Vec<Button>,
    },
    Media {
        elements: Vec<MediaElement>,
    },
    Product {
        elements: Vec<ProductRef>,
    },
}

impl Template {
    pub fn generic(elements: Vec<GenericElement>) -> Self {
        Self::Generic {
            elements,
            image_aspect_ratio: None,
        }
    }

    pub fn button(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self::Button {
            text: text.into(),
            buttons,
        }
    }

    pub fn media(element: MediaElement) -> Self {
        Self::Media {
            elements: vec![element],
        }
    }

    /// Product template from catalog product ids
    pub fn product<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Product {
            elements: ids.into_iter().map(|id| ProductRef { id: id.into() }).collect(),
        }
    }

    pub fn template_type(&self) -> &'static str {
        match self {
            Self::Generic { .. } => "generic",
            Self::Button { .. } => "button",
            Self::Media { .. } => "media",
            Self::Product { .. } => "product",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageAspectRatio {
    Horizontal,
    Square,
}

/// Button shown in templates and the persistent menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Button {
    WebUrl {
        title: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        webview_height_ratio: Option<WebviewHeightRatio>,
    },
    Postback {
        title: String,
        payload: String,
    },
    PhoneNumber {
        title: String,
        /// Phone number in `+<country><number>` form
        payload: String,
    },
}

impl Button {
    pub fn web_url(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self::WebUrl {
            title: title.into(),
            url: url.into(),
            webview_height_ratio: None,
        }
    }

    pub fn postback(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Postback {
            title: title.into(),
            payload: payload.into(),
        }
    }

    pub fn phone_number(title: impl Into<String>, number: impl Into<String>) -> Self {
        Self::PhoneNumber {
            title: title.into(),
            payload: number.into(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::WebUrl { title, .. } | Self::Postback { title, .. } | Self::PhoneNumber { title, .. } => {
                title
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebviewHeightRatio {
    Compact,
    Tall,
    Full,
}

/// One card of a generic template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericElement {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_action: Option<DefaultAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl GenericElement {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            image_url: None,
            default_action: None,
            buttons: Vec::new(),
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn default_action(mut self, url: impl Into<String>) -> Self {
        self.default_action = Some(DefaultAction::web_url(url));
        self
    }

    pub fn button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }
}

/// Action taken when the card itself is tapped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl DefaultAction {
    pub fn web_url(url: impl Into<String>) -> Self {
        Self {
            kind: "web_url".to_string(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

/// The single element of a media template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaElement {
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl MediaElement {
    pub fn from_attachment_id(media_type: MediaType, attachment_id: impl Into<String>) -> Self {
        Self {
            media_type,
            attachment_id: Some(attachment_id.into()),
            url: None,
            buttons: Vec::new(),
        }
    }

    /// Facebook URL of a page photo or video
    pub fn from_url(media_type: MediaType, url: impl Into<String>) -> Self {
        Self {
            media_type,
            attachment_id: None,
            url: Some(url.into()),
            buttons: Vec::new(),
        }
    }

    pub fn button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: String,
}

/// Persistent menu for one locale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistentMenu {
    pub locale: String,
    #[serde(default)]
    pub composer_input_disabled: bool,
    pub call_to_actions: Vec<Button>,
}

impl PersistentMenu {
    /// Menu shown when no locale-specific menu matches
    pub fn default_locale(call_to_actions: Vec<Button>) -> Self {
        Self {
            locale: "default".to_string(),
            composer_input_disabled: false,
            call_to_actions,
        }
    }
}
