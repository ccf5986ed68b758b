//! Saved searches.
//!
//! A [`Filter`] knows how to render itself into a query tail, which icon to
//! show, and which field values to stamp onto tasks created while it is the
//! active list. Time bounds are emitted as [`Placeholder`] tokens so that
//! they are evaluated when the query runs, not when the filter is built.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{icons, tag_link, TagData, Task};
use crate::placeholder::Placeholder;
use crate::sql::{Criterion, Join, QueryTemplate, Value};
use crate::values::{self, ValueMap};

const TWO_WEEKS_MILLIS: i64 = 14 * 24 * 60 * 60 * 1000;

/// Not completed, not deleted, and not hidden until a later time
pub fn active_and_visible() -> Criterion {
    Criterion::and([
        Task::COMPLETION_DATE.lte(0),
        Task::DELETION_DATE.lte(0),
        Task::HIDE_UNTIL.lte(Placeholder::Now),
    ])
}

/// Tasks due on or before the end of today
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayFilter {
    pub title: String,
    #[serde(default)]
    pub filter_override: Option<String>,
}

impl TodayFilter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            filter_override: None,
        }
    }

    fn template(&self) -> QueryTemplate {
        QueryTemplate::new().where_clause(Criterion::and([
            active_and_visible(),
            Task::DUE_DATE.gt(0),
            Task::DUE_DATE.lte(Placeholder::EndOfDay),
        ]))
    }

    fn default_values(&self) -> ValueMap {
        let mut map = ValueMap::new();
        map.insert(Task::DUE_DATE.name().to_string(), Placeholder::Noon.into());
        map
    }
}

/// Tasks carrying a given tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub tag: TagData,
    #[serde(default)]
    pub filter_override: Option<String>,
}

impl TagFilter {
    pub fn new(tag: TagData) -> Self {
        Self {
            tag,
            filter_override: None,
        }
    }

    fn uuid(&self) -> &str {
        self.tag.remote_id.as_deref().unwrap_or("")
    }

    fn template(&self) -> QueryTemplate {
        QueryTemplate::new()
            .join(Join::inner(tag_link::TABLE, tag_link::TASK.eq(Task::ID)))
            .where_clause(Criterion::and([
                active_and_visible(),
                tag_link::TAG_UID.eq(self.uuid()),
            ]))
    }

    fn default_values(&self) -> ValueMap {
        let mut map = ValueMap::new();
        if let Some(ref uid) = self.tag.remote_id {
            map.insert(tag_link::TAG_UID.name().to_string(), uid.as_str().into());
        }
        map
    }
}

/// Tasks touched in the last two weeks, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentlyModifiedFilter {
    pub title: String,
}

impl RecentlyModifiedFilter {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    fn template(&self) -> QueryTemplate {
        QueryTemplate::new()
            .where_clause(Criterion::and([
                active_and_visible(),
                Task::MODIFICATION_DATE.gt(Value::Offset(Placeholder::Now, -TWO_WEEKS_MILLIS)),
            ]))
            .order_by(Task::MODIFICATION_DATE.desc())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    Today(TodayFilter),
    Tag(TagFilter),
    Recent(RecentlyModifiedFilter),
}

impl Filter {
    pub fn today(title: impl Into<String>) -> Self {
        Filter::Today(TodayFilter::new(title))
    }

    pub fn tag(tag: TagData) -> Self {
        Filter::Tag(TagFilter::new(tag))
    }

    pub fn recent(title: impl Into<String>) -> Self {
        Filter::Recent(RecentlyModifiedFilter::new(title))
    }

    /// Label to show, honouring any override
    pub fn title(&self) -> &str {
        match self {
            Filter::Today(f) => f.filter_override.as_deref().unwrap_or(&f.title),
            Filter::Tag(f) => f
                .filter_override
                .as_deref()
                .unwrap_or_else(|| f.tag.display_name()),
            Filter::Recent(f) => &f.title,
        }
    }

    pub fn template(&self) -> QueryTemplate {
        match self {
            Filter::Today(f) => f.template(),
            Filter::Tag(f) => f.template(),
            Filter::Recent(f) => f.template(),
        }
    }

    /// Query tail with placeholders still unresolved
    pub fn sql(&self) -> String {
        self.template().to_string()
    }

    pub fn icon(&self) -> i32 {
        match self {
            Filter::Today(_) => icons::TODAY,
            Filter::Tag(f) => f.tag.icon(),
            Filter::Recent(_) => icons::HISTORY,
        }
    }

    pub fn default_values(&self) -> ValueMap {
        match self {
            Filter::Today(f) => f.default_values(),
            Filter::Tag(f) => f.default_values(),
            Filter::Recent(_) => ValueMap::new(),
        }
    }

    /// Default values for tasks created in this list, serialized
    pub fn values_for_new_tasks(&self) -> String {
        values::serialize_map(&self.default_values())
    }

    /// Whether `other` is the same list entry, for list diffing
    pub fn are_items_the_same(&self, other: &Filter) -> bool {
        match (self, other) {
            (Filter::Today(_), Filter::Today(_)) => true,
            (Filter::Recent(_), Filter::Recent(_)) => true,
            (Filter::Tag(a), Filter::Tag(b)) => match (&a.tag.remote_id, &b.tag.remote_id) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::FieldValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_today_sql() {
        assert_eq!(
            Filter::today("Today").sql(),
            "WHERE ((tasks.completed<=0 AND tasks.deleted<=0 AND tasks.hideUntil<=NOW()) \
             AND tasks.dueDate>0 AND tasks.dueDate<=EOD())"
        );
    }

    #[test]
    fn test_today_values_for_new_tasks() {
        assert_eq!(Filter::today("Today").values_for_new_tasks(), "dueDate|sNOON()|");
    }

    #[test]
    fn test_today_icon() {
        assert_eq!(Filter::today("Today").icon(), icons::TODAY);
    }

    #[test]
    fn test_today_identity_ignores_title_and_override() {
        let a = Filter::today("Today");
        let b = Filter::Today(TodayFilter {
            title: "Heute".to_string(),
            filter_override: Some("Custom".to_string()),
        });
        assert!(a.are_items_the_same(&b));
        assert!(b.are_items_the_same(&a));
        assert!(!a.are_items_the_same(&Filter::recent("Today")));
        assert!(!a.are_items_the_same(&Filter::tag(TagData::new("Today"))));
    }

    #[test]
    fn test_every_variant_includes_base_visibility() {
        let base = active_and_visible();
        for filter in [
            Filter::today("Today"),
            Filter::tag(TagData::new("home")),
            Filter::recent("Recent"),
        ] {
            let template = filter.template();
            let condition = template.condition().expect("filter has a condition");
            assert!(condition.contains(&base), "{} lacks base visibility", filter);
        }
    }

    #[test]
    fn test_predicate_and_defaults_use_same_field() {
        let filter = Filter::today("Today");
        let due = Task::DUE_DATE.name();

        let template = filter.template();
        let fields = template.condition().unwrap().fields();
        assert!(fields.iter().any(|f| f.name() == due));
        assert!(filter.sql().contains(due));

        let defaults = filter.default_values();
        assert_eq!(defaults.get(due), Some(&FieldValue::Placeholder(Placeholder::Noon)));
        assert!(filter.values_for_new_tasks().contains(due));
    }

    #[test]
    fn test_title_override() {
        let mut today = TodayFilter::new("Today");
        assert_eq!(Filter::Today(today.clone()).title(), "Today");
        today.filter_override = Some("Due today".to_string());
        assert_eq!(Filter::Today(today).to_string(), "Due today");
    }

    #[test]
    fn test_tag_filter() {
        let tag = TagData::new("home").with_icon(Some(9));
        let uuid = tag.remote_id.clone().unwrap();
        let filter = Filter::tag(tag.clone());

        assert_eq!(filter.title(), "home");
        assert_eq!(filter.icon(), 9);
        assert!(filter.sql().starts_with("INNER JOIN tags ON tags.task=tasks._id WHERE"));
        assert!(filter.sql().contains(&format!("tags.tag_uid='{}'", uuid)));
        assert_eq!(filter.values_for_new_tasks(), format!("tag_uid|s{}|", uuid));

        let renamed = Filter::tag(tag.with_name("house"));
        assert!(filter.are_items_the_same(&renamed));
        assert!(!filter.are_items_the_same(&Filter::tag(TagData::new("home"))));
    }

    #[test]
    fn test_tag_predicate_and_defaults_use_same_field() {
        let tag = TagData::new("home");
        let uuid = tag.remote_id.clone().unwrap();
        let filter = Filter::tag(tag);
        let key = tag_link::TAG_UID.name();

        let template = filter.template();
        let fields = template.condition().unwrap().fields();
        assert!(fields.contains(&tag_link::TAG_UID));
        assert!(template
            .condition()
            .unwrap()
            .contains(&tag_link::TAG_UID.eq(uuid.as_str())));

        let defaults = filter.default_values();
        assert_eq!(defaults.get(key), Some(&FieldValue::Text(uuid)));
        assert_eq!(defaults.len(), 1);
    }

    #[test]
    fn test_tag_without_remote_id() {
        let mut tag = TagData::new("loose");
        tag.remote_id = None;
        let filter = Filter::tag(tag);

        assert!(filter.default_values().is_empty());
        assert!(!filter.are_items_the_same(&filter.clone()));
    }

    #[test]
    fn test_recent_filter() {
        let filter = Filter::recent("Recently modified");
        assert!(filter.sql().contains("tasks.modified>(NOW()-1209600000)"));
        assert!(filter.sql().ends_with("ORDER BY tasks.modified DESC"));
        assert_eq!(filter.values_for_new_tasks(), "");
        assert_eq!(filter.icon(), icons::HISTORY);
    }

    #[test]
    fn test_serde_round_trip() {
        let filter = Filter::today("Today");
        let json = serde_json::to_string(&filter).unwrap();
        assert!(json.contains("\"kind\":\"today\""));
        let back: Filter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filter);
    }
}
