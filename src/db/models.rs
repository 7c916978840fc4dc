use serde::{Deserialize, Serialize};

/// A registered or guest user. The password hash never leaves the database
/// layer; handlers expose [`UserProfile`] instead.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub points: i64,
    pub is_guest: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub points: i64,
    pub is_guest: bool,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        UserProfile {
            id: u.id,
            username: u.username,
            nickname: u.nickname,
            email: u.email,
            avatar: u.avatar,
            points: u.points,
            is_guest: u.is_guest,
        }
    }
}

/// One parsed name candidate from the upstream reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedName {
    pub text: String,
    pub association: String,
    pub translation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub username: String,
    pub english_name: String,
    pub character_count: String,
    pub unwanted_hanzi: String,
    pub generated_names: Vec<GeneratedName>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageHistoryRecord {
    pub id: String,
    pub user: String,
    pub prompt: String,
    pub image_urls: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub username: String,
    pub content: String,
    pub timestamp: String,
}
