use tracing::info;

use droplink_core::{new_id, ListParams, ListResult};
use droplink_sql::{Row, Value};

use crate::model::{
    CreateCategory, CreateReply, CreateTopic, ForumCategory, ForumReply, ForumTopic,
};
use crate::service::{check_len, decode_row, non_empty, DroplinkError, DroplinkService};

const MAX_CATEGORY_NAME: usize = 60;
const MAX_CATEGORY_DESCRIPTION: usize = 280;
const MIN_TOPIC_TITLE: usize = 3;
const MAX_TOPIC_TITLE: usize = 150;
const MAX_BODY: usize = 10_000;

/// Categories created on first start.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("General", "Anything about Droplink and the Pi community"),
    ("Announcements", "Product news and updates"),
    ("Help & Support", "Questions about setting up your page"),
    ("Showcase", "Share your Droplink page"),
    ("Feature Requests", "Ideas for what to build next"),
];

const TOPIC_COLUMNS: &str = "data, pinned, locked, reply_count, view_count, last_activity_at";

/// Decode a topic row, taking counters and flags from their columns.
fn topic_from_row(row: &Row) -> Result<ForumTopic, DroplinkError> {
    let mut topic: ForumTopic = decode_row(row)?;
    topic.pinned = row.get_i64("pinned").unwrap_or(0) != 0;
    topic.locked = row.get_i64("locked").unwrap_or(0) != 0;
    topic.reply_count = row.get_i64("reply_count").unwrap_or(0).max(0) as u64;
    topic.view_count = row.get_i64("view_count").unwrap_or(0).max(0) as u64;
    if let Some(at) = row.get_str("last_activity_at") {
        topic.last_activity_at = at.to_string();
    }
    Ok(topic)
}

impl DroplinkService {
    // ── Categories ──

    pub fn create_category(&self, input: CreateCategory) -> Result<ForumCategory, DroplinkError> {
        let name = input.name.trim().to_string();
        check_len("name", &name, 1, MAX_CATEGORY_NAME)?;
        let description = non_empty(input.description);
        if let Some(d) = &description {
            check_len("description", d, 0, MAX_CATEGORY_DESCRIPTION)?;
        }

        let position = self.count("SELECT COUNT(*) AS cnt FROM forum_categories", &[])?;
        let now = self.timestamp();
        let category = ForumCategory {
            id: new_id(),
            name,
            description,
            icon: non_empty(input.icon),
            position: position as u32,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        self.insert_record(
            "forum_categories",
            &category.id,
            &category,
            &[
                ("name", Value::Text(category.name.clone())),
                ("position", Value::Integer(category.position as i64)),
                ("created_at", Value::Text(now.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )
        .map_err(|e| match e {
            DroplinkError::Conflict(_) => {
                DroplinkError::Conflict(format!("category '{}' already exists", category.name))
            }
            other => other,
        })?;
        info!(category_id = %category.id, name = %category.name, "forum category created");
        Ok(category)
    }

    pub fn list_categories(&self) -> Result<Vec<ForumCategory>, DroplinkError> {
        self.query_records("SELECT data FROM forum_categories ORDER BY position, name", &[])
    }

    pub fn get_category(&self, id: &str) -> Result<ForumCategory, DroplinkError> {
        self.get_record("forum_categories", id)
    }

    /// Create [`DEFAULT_CATEGORIES`] when there are none. Returns how many
    /// were created.
    pub fn seed_default_categories(&self) -> Result<usize, DroplinkError> {
        if self.count("SELECT COUNT(*) AS cnt FROM forum_categories", &[])? > 0 {
            return Ok(0);
        }
        for (name, description) in DEFAULT_CATEGORIES {
            self.create_category(CreateCategory {
                name: name.to_string(),
                description: Some(description.to_string()),
                icon: None,
            })?;
        }
        Ok(DEFAULT_CATEGORIES.len())
    }

    // ── Topics ──

    pub fn create_topic(
        &self,
        author_id: &str,
        category_id: &str,
        input: CreateTopic,
    ) -> Result<ForumTopic, DroplinkError> {
        let author = self.get_profile(author_id)?;
        self.get_category(category_id)?;

        let title = input.title.trim().to_string();
        check_len("title", &title, MIN_TOPIC_TITLE, MAX_TOPIC_TITLE)?;
        let body = input.body.trim().to_string();
        check_len("body", &body, 1, MAX_BODY)?;

        let now = self.timestamp();
        let topic = ForumTopic {
            id: new_id(),
            category_id: category_id.to_string(),
            author_id: author.id,
            author_username: author.username,
            title,
            body,
            pinned: false,
            locked: false,
            reply_count: 0,
            view_count: 0,
            last_activity_at: now.clone(),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        self.insert_record(
            "forum_topics",
            &topic.id,
            &topic,
            &[
                ("category_id", Value::Text(topic.category_id.clone())),
                ("author_id", Value::Text(topic.author_id.clone())),
                ("last_activity_at", Value::Text(now.clone())),
                ("created_at", Value::Text(now.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )?;
        info!(topic_id = %topic.id, category_id = %category_id, "forum topic created");
        Ok(topic)
    }

    /// Topics in a category: pinned first, then most recently active.
    pub fn list_topics(
        &self,
        category_id: &str,
        params: &ListParams,
    ) -> Result<ListResult<ForumTopic>, DroplinkError> {
        self.get_category(category_id)?;
        let cat = Value::Text(category_id.to_string());
        let total = self.count(
            "SELECT COUNT(*) AS cnt FROM forum_topics WHERE category_id = ?1",
            &[cat.clone()],
        )?;
        let sql = format!(
            "SELECT {} FROM forum_topics WHERE category_id = ?1 \
             ORDER BY pinned DESC, last_activity_at DESC, id LIMIT ?2 OFFSET ?3",
            TOPIC_COLUMNS
        );
        let items = self
            .sql
            .query(
                &sql,
                &[
                    cat,
                    Value::Integer(params.clamped_limit() as i64),
                    Value::Integer(params.offset as i64),
                ],
            )?
            .iter()
            .map(topic_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ListResult {
            items,
            total: total as usize,
        })
    }

    /// Read a topic without counting a view.
    pub fn peek_topic(&self, topic_id: &str) -> Result<ForumTopic, DroplinkError> {
        let sql = format!("SELECT {} FROM forum_topics WHERE id = ?1", TOPIC_COLUMNS);
        match self.sql.query_one(&sql, &[Value::Text(topic_id.to_string())])? {
            Some(row) => topic_from_row(&row),
            None => Err(DroplinkError::NotFound(format!("forum topic '{}' not found", topic_id))),
        }
    }

    /// Read a topic and count the view.
    pub fn view_topic(&self, topic_id: &str) -> Result<ForumTopic, DroplinkError> {
        self.sql.exec(
            "UPDATE forum_topics SET view_count = view_count + 1 WHERE id = ?1",
            &[Value::Text(topic_id.to_string())],
        )?;
        self.peek_topic(topic_id)
    }

    /// A topic `actor_id` may moderate.
    fn authored_topic(&self, actor_id: &str, topic_id: &str) -> Result<ForumTopic, DroplinkError> {
        let topic = self.peek_topic(topic_id)?;
        if topic.author_id != actor_id {
            return Err(DroplinkError::Forbidden(
                "only the topic author can do this".into(),
            ));
        }
        Ok(topic)
    }

    fn save_topic_flags(&self, mut topic: ForumTopic) -> Result<ForumTopic, DroplinkError> {
        topic.updated_at = self.timestamp();
        self.update_record(
            "forum_topics",
            &topic.id,
            &topic,
            &[
                ("pinned", topic.pinned.into()),
                ("locked", topic.locked.into()),
                ("updated_at", Value::Text(topic.updated_at.clone())),
            ],
        )?;
        Ok(topic)
    }

    pub fn set_topic_pinned(&self, actor_id: &str, topic_id: &str, pinned: bool) -> Result<ForumTopic, DroplinkError> {
        let mut topic = self.authored_topic(actor_id, topic_id)?;
        topic.pinned = pinned;
        self.save_topic_flags(topic)
    }

    pub fn set_topic_locked(&self, actor_id: &str, topic_id: &str, locked: bool) -> Result<ForumTopic, DroplinkError> {
        let mut topic = self.authored_topic(actor_id, topic_id)?;
        topic.locked = locked;
        self.save_topic_flags(topic)
    }

    /// Delete a topic and its replies.
    pub fn delete_topic(&self, actor_id: &str, topic_id: &str) -> Result<(), DroplinkError> {
        self.authored_topic(actor_id, topic_id)?;
        self.delete_record("forum_topics", topic_id)?;
        info!(topic_id = %topic_id, "forum topic deleted");
        Ok(())
    }

    // ── Replies ──

    pub fn create_reply(&self, author_id: &str, topic_id: &str, input: CreateReply) -> Result<ForumReply, DroplinkError> {
        let author = self.get_profile(author_id)?;
        let topic = self.peek_topic(topic_id)?;
        if topic.locked {
            return Err(DroplinkError::Conflict("topic is locked".into()));
        }
        let body = input.body.trim().to_string();
        check_len("body", &body, 1, MAX_BODY)?;

        let now = self.timestamp();
        let reply = ForumReply {
            id: new_id(),
            topic_id: topic.id,
            author_id: author.id,
            author_username: author.username,
            body,
            created_at: now.clone(),
        };
        self.insert_record(
            "forum_replies",
            &reply.id,
            &reply,
            &[
                ("topic_id", Value::Text(reply.topic_id.clone())),
                ("author_id", Value::Text(reply.author_id.clone())),
                ("created_at", Value::Text(now.clone())),
            ],
        )?;
        self.sql.exec(
            "UPDATE forum_topics SET reply_count = reply_count + 1, last_activity_at = ?1 WHERE id = ?2",
            &[Value::Text(now), Value::Text(topic_id.to_string())],
        )?;
        Ok(reply)
    }

    /// Replies in posting order.
    pub fn list_replies(&self, topic_id: &str, params: &ListParams) -> Result<ListResult<ForumReply>, DroplinkError> {
        let topic = Value::Text(topic_id.to_string());
        self.peek_topic(topic_id)?;
        let total = self.count(
            "SELECT COUNT(*) AS cnt FROM forum_replies WHERE topic_id = ?1",
            &[topic.clone()],
        )?;
        let items = self.query_records(
            "SELECT data FROM forum_replies WHERE topic_id = ?1 ORDER BY created_at, id LIMIT ?2 OFFSET ?3",
            &[
                topic,
                Value::Integer(params.clamped_limit() as i64),
                Value::Integer(params.offset as i64),
            ],
        )?;
        Ok(ListResult {
            items,
            total: total as usize,
        })
    }
}
