use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorQuery {
    pub last_entry_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl CursorQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    /// Rows to request from storage: one extra to detect a following page.
    pub fn fetch_limit(&self) -> i64 {
        self.effective_limit() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub next_cursor: Option<Uuid>,
}

impl<T> Page<T> {
    /// Builds a page from up to `limit + 1` fetched rows.
    pub fn from_overfetch(mut rows: Vec<T>, limit: i64, id_of: impl Fn(&T) -> Uuid) -> Self {
        let limit = limit.max(0) as usize;
        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next_cursor = if has_more { rows.last().map(&id_of) } else { None };
        Page {
            items: rows,
            has_more,
            next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Newest-first list standing in for the storage query.
    fn fetch(entries: &[Uuid], query: &CursorQuery) -> Vec<Uuid> {
        let start = match query.last_entry_id {
            Some(cursor) => entries.iter().position(|id| *id == cursor).map_or(entries.len(), |p| p + 1),
            None => 0,
        };
        entries
            .iter()
            .skip(start)
            .take(query.fetch_limit() as usize)
            .copied()
            .collect()
    }

    #[test]
    fn test_limit_defaults_and_bounds() {
        assert_eq!(CursorQuery::default().effective_limit(), 10);
        assert_eq!(CursorQuery { limit: Some(500), ..Default::default() }.effective_limit(), 50);
        assert_eq!(CursorQuery { limit: Some(0), ..Default::default() }.effective_limit(), 1);
        assert_eq!(CursorQuery { limit: Some(7), ..Default::default() }.fetch_limit(), 8);
    }

    #[test]
    fn test_walks_25_entries_in_pages_of_10() {
        let entries: Vec<Uuid> = (0..25).map(|_| Uuid::new_v4()).collect();
        let mut query = CursorQuery { last_entry_id: None, limit: Some(10) };
        let mut sizes = Vec::new();
        let mut seen = Vec::new();

        loop {
            let page = Page::from_overfetch(fetch(&entries, &query), query.effective_limit(), |id| *id);
            sizes.push(page.items.len());
            seen.extend(page.items.iter().copied());
            if !page.has_more {
                assert_eq!(page.next_cursor, None);
                break;
            }
            assert_eq!(page.next_cursor, page.items.last().copied());
            query.last_entry_id = page.next_cursor;
        }

        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(seen, entries);
    }

    #[test]
    fn test_exact_fit_has_no_more() {
        let entries: Vec<Uuid> = (0..10).map(|_| Uuid::new_v4()).collect();
        let query = CursorQuery { last_entry_id: None, limit: Some(10) };
        let page = Page::from_overfetch(fetch(&entries, &query), 10, |id| *id);
        assert_eq!(page.items.len(), 10);
        assert!(!page.has_more);
    }
}
