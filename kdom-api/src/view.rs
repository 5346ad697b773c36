use std::{fmt, str::FromStr};

use chrono::Utc;

use crate::{Error, TargetType, Time, UserId};

/// Kind of content whose impressions are reported to analytics
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    bolero::generator::TypeGenerator,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Post,
    KDom,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "post",
            ContentType::KDom => "kdom",
        }
    }
}

impl From<TargetType> for ContentType {
    fn from(t: TargetType) -> ContentType {
        match t {
            TargetType::Post => ContentType::Post,
            TargetType::KDom => ContentType::KDom,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<ContentType, Error> {
        match s {
            "post" => Ok(ContentType::Post),
            "kdom" => Ok(ContentType::KDom),
            _ => Err(Error::UnknownContentType(String::from(s))),
        }
    }
}

/// Unique per piece of content, written `content_type:content_id`
#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingKey {
    content_type: ContentType,
    content_id: String,
}

impl TrackingKey {
    pub fn new(content_type: ContentType, content_id: &str) -> TrackingKey {
        TrackingKey {
            content_type,
            content_id: String::from(content_id),
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }
}

impl fmt::Display for TrackingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.content_id)
    }
}

impl TryFrom<String> for TrackingKey {
    type Error = Error;

    fn try_from(s: String) -> Result<TrackingKey, Error> {
        s.parse()
    }
}

impl From<TrackingKey> for String {
    fn from(k: TrackingKey) -> String {
        k.to_string()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEvent {
    pub content_type: ContentType,
    pub content_id: String,
    #[serde(default)]
    pub viewer_id: Option<UserId>,
    pub viewed_at: Time,
}

impl ViewEvent {
    pub fn now(
        content_type: ContentType,
        content_id: String,
        viewer_id: Option<UserId>,
    ) -> ViewEvent {
        ViewEvent {
            content_type,
            content_id,
            viewer_id,
            viewed_at: Utc::now(),
        }
    }

    pub fn key(&self) -> TrackingKey {
        TrackingKey::new(self.content_type, &self.content_id)
    }
}

impl FromStr for TrackingKey {
    type Err = Error;

    /// Parses the `content_type:content_id` form, as typed on a command line
    fn from_str(s: &str) -> Result<TrackingKey, Error> {
        let (content_type, content_id) = s
            .split_once(':')
            .ok_or_else(|| Error::UnknownContentType(String::from(s)))?;
        let content_type = ContentType::from_str(content_type)?;
        crate::validate_string(content_id)?;
        Ok(TrackingKey::new(content_type, content_id))
    }
}
