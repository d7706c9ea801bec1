// Logic for checking if events match a search keyword.
//
// Matching is a case-insensitive substring test against the name, the
// description and the type label. The keyword is used as typed, spaces
// included; only an empty keyword matches everything.

use crate::model::event::Event;

/// A lowercased keyword, prepared once and reused for a whole day.
#[derive(Debug, Clone)]
pub struct Keyword(String);

impl Keyword {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, event: &Event) -> bool {
        if self.is_empty() {
            return true;
        }
        let kw = self.0.as_str();

        event.name.to_lowercase().contains(kw)
            || event
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(kw))
            || event.event_type.to_string().to_lowercase().contains(kw)
    }
}

impl Event {
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        Keyword::new(keyword).matches(self)
    }
}
