//! Comment records handed to the engine by the page-scraping collaborator.

use serde::{Deserialize, Serialize};
use url::Url;

/// A user reference: the comment author or a tagged user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserRef {
    /// Platform user id
    pub id: Option<String>,
    /// Vanity username / handle
    pub username: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Profile URL
    pub profile_url: Option<String>,
    /// Account age in days, when the scraper could determine it
    #[serde(alias = "accountAge")]
    pub account_age_days: Option<u32>,
}

impl UserRef {
    /// Create a user reference with an id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Create a user reference with a username.
    pub fn with_username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Default::default()
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the account age in days.
    pub fn aged(mut self, days: u32) -> Self {
        self.account_age_days = Some(days);
        self
    }

    /// Identifiers usable for list lookups (id first, then username).
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.id.iter().chain(self.username.iter()).map(String::as_str)
    }
}

/// A single comment to classify.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Comment {
    /// Comment text (may be empty)
    pub text: String,
    /// Author, if known
    pub author: Option<UserRef>,
    /// Users tagged in the comment, in order of appearance
    pub tagged_users: Vec<UserRef>,
    /// Absolute URLs extracted from the comment
    pub links: Vec<String>,
    /// Opaque timestamp; never used for scoring
    pub timestamp: Option<String>,
}

impl Comment {
    /// Create a comment with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Set the author.
    pub fn with_author(mut self, author: UserRef) -> Self {
        self.author = Some(author);
        self
    }

    /// Add a tagged user.
    pub fn with_tagged_user(mut self, user: UserRef) -> Self {
        self.tagged_users.push(user);
        self
    }

    /// Tag `count` anonymous users, named `user0`, `user1`, ...
    pub fn with_tagged_count(mut self, count: usize) -> Self {
        for i in 0..count {
            self.tagged_users.push(UserRef::with_username(format!("user{}", i)));
        }
        self
    }

    /// Add a link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    /// Text length in characters.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Lowercased hostnames of every link that parses as a URL.
    ///
    /// Malformed links are skipped.
    pub fn link_hosts(&self) -> impl Iterator<Item = String> + '_ {
        self.links.iter().filter_map(|link| link_host(link))
    }
}

/// Parse a link and return its lowercased hostname.
pub fn link_host(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    url.host_str().map(|h| h.to_lowercase())
}
