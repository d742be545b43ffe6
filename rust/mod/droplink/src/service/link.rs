use std::collections::HashSet;

use tracing::{debug, info};

use droplink_core::new_id;
use droplink_sql::{Row, Value};

use crate::model::{CreateLink, EventKind, Link, UpdateLink};
use crate::plan::{can_add_link, plan_features, Limit};
use crate::service::{check_len, decode_row, non_empty, DroplinkError, DroplinkService};

const MAX_TITLE: usize = 100;
const MAX_URL: usize = 2048;

fn validate_url(url: &str) -> Result<(), DroplinkError> {
    check_len("url", url, 1, MAX_URL)?;
    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(DroplinkError::Validation(
            "url must start with http:// or https://".into(),
        )),
    }
}

/// Decode a link row, taking the click count from its column.
fn link_from_row(row: &Row) -> Result<Link, DroplinkError> {
    let mut link: Link = decode_row(row)?;
    link.clicks = row.get_i64("clicks").unwrap_or(0).max(0) as u64;
    Ok(link)
}

impl DroplinkService {
    fn link_columns(link: &Link) -> Vec<(&'static str, Value)> {
        vec![
            ("position", Value::Integer(link.position as i64)),
            ("active", link.active.into()),
            ("updated_at", Value::Text(link.updated_at.clone())),
        ]
    }

    fn link_count(&self, profile_id: &str) -> Result<u64, DroplinkError> {
        self.count(
            "SELECT COUNT(*) AS cnt FROM links WHERE profile_id = ?1",
            &[Value::Text(profile_id.to_string())],
        )
    }

    /// Append a link to the profile, subject to the plan's link quota.
    pub fn add_link(&self, profile_id: &str, input: CreateLink) -> Result<Link, DroplinkError> {
        let profile = self.get_profile(profile_id)?;

        let title = input.title.trim().to_string();
        check_len("title", &title, 1, MAX_TITLE)?;
        let url = input.url.trim().to_string();
        validate_url(&url)?;

        let current = self.link_count(profile_id)?;
        if !can_add_link(profile.plan, current as usize) {
            let max = match plan_features(profile.plan).max_links {
                Limit::Limited(n) => n.to_string(),
                Limit::Unlimited => "unlimited".to_string(),
            };
            return Err(DroplinkError::PlanLimit(format!(
                "the {} plan allows {} links; upgrade to add more",
                profile.plan, max
            )));
        }

        let now = self.timestamp();
        let link = Link {
            id: new_id(),
            profile_id: profile_id.to_string(),
            title,
            url,
            icon: non_empty(input.icon),
            position: current as u32,
            active: input.active.unwrap_or(true),
            clicks: 0,
            created_at: now.clone(),
            updated_at: now.clone(),
        };

        let mut columns = Self::link_columns(&link);
        columns.push(("profile_id", Value::Text(link.profile_id.clone())));
        columns.push(("created_at", Value::Text(now)));
        self.insert_record("links", &link.id, &link, &columns)?;

        info!(profile_id = %profile_id, link_id = %link.id, "link added");
        Ok(link)
    }

    /// The profile's links in display order.
    pub fn list_links(&self, profile_id: &str) -> Result<Vec<Link>, DroplinkError> {
        self.sql
            .query(
                "SELECT data, clicks FROM links WHERE profile_id = ?1 ORDER BY position, created_at",
                &[Value::Text(profile_id.to_string())],
            )?
            .iter()
            .map(link_from_row)
            .collect()
    }

    pub fn get_link(&self, link_id: &str) -> Result<Link, DroplinkError> {
        match self
            .sql
            .query_one(
                "SELECT data, clicks FROM links WHERE id = ?1",
                &[Value::Text(link_id.to_string())],
            )? {
            Some(row) => link_from_row(&row),
            None => Err(DroplinkError::NotFound(format!("link '{}' not found", link_id))),
        }
    }

    /// A link that belongs to `profile_id`. Links of other profiles are
    /// reported as missing.
    fn owned_link(&self, profile_id: &str, link_id: &str) -> Result<Link, DroplinkError> {
        let link = self.get_link(link_id)?;
        if link.profile_id != profile_id {
            return Err(DroplinkError::NotFound(format!("link '{}' not found", link_id)));
        }
        Ok(link)
    }

    pub fn update_link(&self, profile_id: &str, link_id: &str, patch: UpdateLink) -> Result<Link, DroplinkError> {
        let mut link = self.owned_link(profile_id, link_id)?;

        if let Some(title) = patch.title {
            let title = title.trim().to_string();
            check_len("title", &title, 1, MAX_TITLE)?;
            link.title = title;
        }
        if let Some(url) = patch.url {
            let url = url.trim().to_string();
            validate_url(&url)?;
            link.url = url;
        }
        if let Some(icon) = patch.icon {
            link.icon = non_empty(icon);
        }
        if let Some(active) = patch.active {
            link.active = active;
        }
        link.updated_at = self.timestamp();

        self.update_record("links", link_id, &link, &Self::link_columns(&link))?;
        Ok(link)
    }

    /// Delete a link and close the gap in positions.
    pub fn delete_link(&self, profile_id: &str, link_id: &str) -> Result<(), DroplinkError> {
        self.owned_link(profile_id, link_id)?;
        self.delete_record("links", link_id)?;
        self.repack_links(self.list_links(profile_id)?)?;
        info!(profile_id = %profile_id, link_id = %link_id, "link deleted");
        Ok(())
    }

    /// Reorder links. `ordered_ids` must name every link of the profile
    /// exactly once.
    pub fn reorder_links(&self, profile_id: &str, ordered_ids: &[String]) -> Result<Vec<Link>, DroplinkError> {
        self.get_profile(profile_id)?;
        let mut links = self.list_links(profile_id)?;

        let existing: HashSet<&str> = links.iter().map(|l| l.id.as_str()).collect();
        let requested: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();
        if requested.len() != ordered_ids.len() || requested != existing {
            return Err(DroplinkError::Validation(
                "linkIds must list each of the profile's links exactly once".into(),
            ));
        }

        links.sort_by_key(|l| {
            ordered_ids
                .iter()
                .position(|id| *id == l.id)
                .unwrap_or(usize::MAX)
        });
        self.repack_links(links)
    }

    /// Rewrite positions as 0..n in the given order.
    fn repack_links(&self, links: Vec<Link>) -> Result<Vec<Link>, DroplinkError> {
        let now = self.timestamp();
        let mut out = Vec::with_capacity(links.len());
        for (i, mut link) in links.into_iter().enumerate() {
            if link.position != i as u32 {
                link.position = i as u32;
                link.updated_at = now.clone();
                self.update_record("links", &link.id, &link, &Self::link_columns(&link))?;
            }
            out.push(link);
        }
        Ok(out)
    }

    /// Count a click on a link and log a `click` event.
    pub fn record_click(
        &self,
        link_id: &str,
        referrer: Option<String>,
        user_agent: Option<String>,
    ) -> Result<Link, DroplinkError> {
        let affected = self.sql.exec(
            "UPDATE links SET clicks = clicks + 1 WHERE id = ?1",
            &[Value::Text(link_id.to_string())],
        )?;
        if affected == 0 {
            return Err(DroplinkError::NotFound(format!("link '{}' not found", link_id)));
        }
        let link = self.get_link(link_id)?;
        self.record_event(
            &link.profile_id,
            EventKind::Click,
            Some(link.id.clone()),
            referrer,
            user_agent,
        )?;
        debug!(link_id = %link_id, clicks = link.clicks, "link click");
        Ok(link)
    }
}
