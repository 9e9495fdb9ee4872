//! Shared paging resolution for scoped queries
//!
//! Offset paging wins over cursor paging; cursors translate into
//! lexicographic id predicates. Results are always ordered by id so cursor
//! iteration is stable under concurrent writes.

use faultline_core::PagingOptions;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select};

pub fn apply_paging<E>(
    mut select: Select<E>,
    options: &PagingOptions,
    id_column: E::Column,
) -> Select<E>
where
    E: EntityTrait,
{
    if let Some(skip) = options.skip() {
        select = select.offset(skip);
    } else if let Some((before, after)) = options.cursors() {
        if let Some(before) = before {
            select = select.filter(id_column.lt(before));
        }
        if let Some(after) = after {
            select = select.filter(id_column.gt(after));
        }
    }

    select
        .order_by_asc(id_column)
        .limit(options.clamped_limit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_entities::events;
    use sea_orm::{DbBackend, QueryTrait};

    fn sql(options: &PagingOptions) -> String {
        apply_paging(events::Entity::find(), options, events::Column::Id)
            .build(DbBackend::Sqlite)
            .to_string()
    }

    #[test]
    fn test_page_produces_offset_and_ignores_cursors() {
        let options = PagingOptions::new()
            .with_page(2)
            .with_limit(25)
            .with_after("abc");
        let query = sql(&options);
        assert!(query.contains("OFFSET 25"), "query was: {query}");
        assert!(query.contains("LIMIT 25"));
        assert!(!query.contains("abc"));
    }

    #[test]
    fn test_cursors_become_id_predicates() {
        let options = PagingOptions::new().with_after("abc").with_before("xyz");
        let query = sql(&options);
        assert!(query.contains(r#""id" > 'abc'"#), "query was: {query}");
        assert!(query.contains(r#""id" < 'xyz'"#));
        assert!(!query.contains("OFFSET"));
    }

    #[test]
    fn test_default_limit_applied() {
        let query = sql(&PagingOptions::new());
        assert!(query.contains("LIMIT 10"), "query was: {query}");
    }

    #[test]
    fn test_results_ordered_by_id() {
        let query = sql(&PagingOptions::new());
        assert!(query.contains(r#"ORDER BY "events"."id" ASC"#), "query was: {query}");
    }
}
