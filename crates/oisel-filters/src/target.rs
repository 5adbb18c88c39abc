//! Target filter: rows whose TARGET_ID designates a target UID.

use std::sync::Arc;

use oisel_core::model::{DataTable, TargetIdMatcher, TargetManager};
use oisel_core::schema::columns;

use crate::traits::{FilterSpec, FilterState, TableFilter};

#[derive(Debug, Clone)]
pub struct TargetUidFilter {
    spec: FilterSpec<String>,
    manager: Arc<TargetManager>,
    matcher: Option<TargetIdMatcher>,
    ids: Option<Arc<[i16]>>,
}

impl TargetUidFilter {
    pub fn new(manager: Arc<TargetManager>, uid: impl Into<String>, include: bool) -> Self {
        Self {
            spec: FilterSpec::new(columns::TARGET_ID, vec![uid.into()], include),
            manager,
            matcher: None,
            ids: None,
        }
    }

    pub fn uid(&self) -> &str {
        self.spec.values.first().map(String::as_str).unwrap_or_default()
    }
}

impl TableFilter for TargetUidFilter {
    fn name(&self) -> &'static str {
        "target_uid"
    }

    fn column_name(&self) -> &str {
        &self.spec.column
    }

    fn is_include(&self) -> bool {
        self.spec.include
    }

    fn prepare(&mut self, table: &dyn DataTable) -> FilterState {
        let include = self.spec.include;
        let Some(matcher) = table.target_id_matcher(&self.manager, self.uid()) else {
            return FilterState::none_match(include);
        };
        let distinct = table.distinct_target_id();
        if distinct.is_empty() {
            tracing::warn!(table = %table.table_ref(), "no TARGET_ID column, filter ignored");
            return FilterState::Full;
        }
        if matcher.match_all(distinct) {
            return FilterState::all_match(include);
        }
        // covers a single non-matching target too
        if !matcher.match_any(distinct) {
            return FilterState::none_match(include);
        }
        match table.target_id() {
            Some(ids) => {
                self.matcher = Some(matcher);
                self.ids = Some(ids);
                FilterState::Mask
            }
            None => FilterState::Full,
        }
    }

    #[inline]
    fn accept(&self, row: usize, _col: usize) -> bool {
        match (&self.matcher, self.ids.as_ref().and_then(|ids| ids.get(row))) {
            (Some(m), Some(id)) => m.matches(*id) == self.spec.include,
            _ => false,
        }
    }

    fn reset(&mut self) {
        self.matcher = None;
        self.ids = None;
    }
}
