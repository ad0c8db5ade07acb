use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Productive,
    Entertainment,
    Learning,
    Distraction,
    Unproductive,
    Depends,
    #[default]
    Uncategorized,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Productive,
        Category::Entertainment,
        Category::Learning,
        Category::Distraction,
        Category::Unproductive,
        Category::Depends,
        Category::Uncategorized,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Productive => "Productive",
            Category::Entertainment => "Entertainment",
            Category::Learning => "Learning",
            Category::Distraction => "Distraction",
            Category::Unproductive => "Unproductive",
            Category::Depends => "Depends",
            Category::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategory(trimmed.to_owned()))
    }
}

/// One entry of the ordered rule list.
///
/// A rule matches when every marker group has at least one marker contained in the
/// lower-cased window title, and, for `browser_only` rules, the app is a known browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub browser_only: bool,
    pub title_markers: Vec<Vec<String>>,
    pub category: Category,
}

impl Rule {
    fn new(name: &str, browser_only: bool, groups: &[&[&str]], category: Category) -> Self {
        Self {
            name: name.to_owned(),
            browser_only,
            title_markers: groups
                .iter()
                .map(|group| group.iter().map(|m| (*m).to_owned()).collect())
                .collect(),
            category,
        }
    }

    fn matches(&self, title: &str, is_browser: bool) -> bool {
        if self.browser_only && !is_browser {
            return false;
        }
        self.title_markers
            .iter()
            .all(|group| group.iter().any(|marker| title.contains(marker.as_str())))
    }
}

/// Immutable categorization configuration: the ordered rule list plus the app table.
///
/// Built once at startup and handed to whoever needs to categorize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub browsers: Vec<String>,
    pub rules: Vec<Rule>,
    pub app_categories: BTreeMap<String, Category>,
}

const DISTRACTION: &[&str] = &["shorts", "anime", "hainime"];
const STREAMING: &[&str] = &["youtube", "netflix", "primevideo"];
const EDUCATIONAL: &[&str] = &["tutorial", "course", "lesson"];
const EDUCATION_PLATFORMS: &[&str] = &["coursera", "udemy", "edx"];
const DEVELOPER_SITES: &[&str] = &["github", "stackoverflow"];

const APP_TABLE: &[(&str, Category)] = &[
    ("code", Category::Productive),
    ("pycharm", Category::Productive),
    ("pycharm64", Category::Productive),
    ("notepad", Category::Productive),
    ("word", Category::Productive),
    ("excel", Category::Productive),
    ("gedit", Category::Productive),
    ("libreoffice", Category::Productive),
    ("chrome", Category::Depends),
    ("firefox", Category::Depends),
    ("vlc", Category::Entertainment),
    ("spotify", Category::Entertainment),
    ("netflix", Category::Entertainment),
    ("discord", Category::Unproductive),
    ("zoom", Category::Learning),
];

impl Default for RuleSet {
    fn default() -> Self {
        let rules = vec![
            Rule::new("distraction", false, &[DISTRACTION], Category::Distraction),
            Rule::new("streaming-educational", true, &[STREAMING, EDUCATIONAL], Category::Learning),
            Rule::new("streaming", true, &[STREAMING], Category::Entertainment),
            Rule::new("education-platform", true, &[EDUCATION_PLATFORMS], Category::Learning),
            Rule::new("developer-site", true, &[DEVELOPER_SITES], Category::Productive),
        ];
        Self {
            browsers: vec!["chrome".to_owned(), "firefox".to_owned()],
            rules,
            app_categories: APP_TABLE
                .iter()
                .map(|(app, category)| ((*app).to_owned(), *category))
                .collect(),
        }
    }
}

impl RuleSet {
    /// Reads a JSON rule file with the same shape as the serialized default set.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rule file: {}", path.display()))?;
        let rules: RuleSet = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse rule file: {}", path.display()))?;
        Ok(rules.normalized())
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn normalized(self) -> Self {
        let lower = |values: Vec<String>| -> Vec<String> {
            values.into_iter().map(|v| v.trim().to_lowercase()).collect()
        };
        Self {
            browsers: self.browsers.iter().map(|b| normalize_app_key(b)).collect(),
            rules: self
                .rules
                .into_iter()
                .map(|rule| Rule {
                    title_markers: rule.title_markers.into_iter().map(lower).collect(),
                    ..rule
                })
                .collect(),
            app_categories: self
                .app_categories
                .into_iter()
                .map(|(app, category)| (normalize_app_key(&app), category))
                .collect(),
        }
    }

    /// First matching rule wins; then the app table; otherwise `Uncategorized`.
    pub fn categorize(&self, app_name: &str, window_title: &str) -> Category {
        let title = window_title.to_lowercase();
        let app_key = normalize_app_key(app_name);
        let is_browser = self.browsers.iter().any(|browser| *browser == app_key);

        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(&title, is_browser)) {
            return rule.category;
        }

        self.app_categories
            .get(&app_key)
            .copied()
            .unwrap_or(Category::Uncategorized)
    }
}

/// Lower-cased app name with a trailing `.exe` / `.app` removed.
pub fn normalize_app_key(app_name: &str) -> String {
    let lowered = app_name.trim().to_lowercase();
    for suffix in [".exe", ".app"] {
        if lowered.len() > suffix.len() && lowered.ends_with(suffix) {
            return lowered[..lowered.len() - suffix.len()].to_owned();
        }
    }
    lowered
}
