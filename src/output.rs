use clap::ValueEnum;
use serde::Serialize;
use std::path::Path;

use crate::entry::Credential;
use crate::totp::TotpWindow;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Generic structured records
    #[default]
    Json,
    /// Alfred script-filter items
    Alfred,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct JsonItem {
    pub service_name: String,
    pub username: String,
    pub current_totp: String,
    pub next_totp: String,
    pub time_remaining: u64,
    pub service_data: String,
    pub icon_path: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AlfredIcon {
    pub path: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AlfredItem {
    pub title: String,
    pub subtitle: String,
    pub arg: String,
    pub icon: AlfredIcon,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Item {
    Json(JsonItem),
    Alfred(AlfredItem),
}

/// Top-level document printed by `get`.
#[derive(Debug, Serialize, Default)]
pub struct Items {
    pub items: Vec<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Items {
    pub fn failed(error: &anyhow::Error) -> Self {
        Items {
            items: Vec::new(),
            error: Some(format!("{error:#}")),
        }
    }

    /// Pretty JSON with 4-space indentation.
    pub fn to_json(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// "Current TOTP: 123456 | Next TOTP: 654321, 12 seconds left"
pub fn summary(window: &TotpWindow) -> String {
    let unit = if window.seconds_remaining == 1 {
        "second"
    } else {
        "seconds"
    };
    format!(
        "Current TOTP: {} | Next TOTP: {}, {} {unit} left",
        window.current, window.next, window.seconds_remaining
    )
}

pub fn format_item(cred: &Credential, window: &TotpWindow, icon: &Path, format: OutputFormat) -> Item {
    let subtitle = summary(window);
    let icon_path = icon.display().to_string();

    match format {
        OutputFormat::Alfred => Item::Alfred(AlfredItem {
            title: cred.display_name(),
            subtitle,
            arg: format!("{},{}", window.current, window.next),
            icon: AlfredIcon { path: icon_path },
        }),
        OutputFormat::Json => Item::Json(JsonItem {
            service_name: cred.service.clone(),
            username: cred.account.clone(),
            current_totp: window.current.clone(),
            next_totp: window.next.clone(),
            time_remaining: window.seconds_remaining,
            service_data: subtitle,
            icon_path,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn window(secs: u64) -> TotpWindow {
        TotpWindow {
            current: "081804".to_string(),
            next: "050471".to_string(),
            seconds_remaining: secs,
        }
    }

    #[test]
    fn summary_pluralizes() {
        assert_eq!(
            summary(&window(1)),
            "Current TOTP: 081804 | Next TOTP: 050471, 1 second left"
        );
        assert_eq!(
            summary(&window(30)),
            "Current TOTP: 081804 | Next TOTP: 050471, 30 seconds left"
        );
    }

    #[test]
    fn json_record() {
        let cred = Credential::new("GitHub", "octocat", "SECRET");
        let item = format_item(&cred, &window(12), Path::new("icon.png"), OutputFormat::Json);
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({
                "service_name": "GitHub",
                "username": "octocat",
                "current_totp": "081804",
                "next_totp": "050471",
                "time_remaining": 12,
                "service_data": "Current TOTP: 081804 | Next TOTP: 050471, 12 seconds left",
                "icon_path": "icon.png",
            })
        );
    }

    #[test]
    fn alfred_record() {
        let cred = Credential::new("Gitea", "", "SECRET");
        let item = format_item(&cred, &window(5), Path::new("/icons/gitea.png"), OutputFormat::Alfred);
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({
                "title": "Gitea",
                "subtitle": "Current TOTP: 081804 | Next TOTP: 050471, 5 seconds left",
                "arg": "081804,050471",
                "icon": {"path": "/icons/gitea.png"},
            })
        );

        let cred = Credential::new("GitHub", "work", "SECRET");
        match format_item(&cred, &window(5), Path::new("icon.png"), OutputFormat::Alfred) {
            Item::Alfred(a) => assert_eq!(a.title, "GitHub - work"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn envelope() {
        let empty = Items::default().to_json().unwrap();
        assert_eq!(empty, "{\n    \"items\": []\n}");

        let err = Items::failed(&anyhow::anyhow!("boom")).to_json().unwrap();
        let v: serde_json::Value = serde_json::from_str(&err).unwrap();
        assert_eq!(v, json!({"items": [], "error": "boom"}));
    }
}
